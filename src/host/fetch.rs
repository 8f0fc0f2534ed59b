//! Archive download and checksum verification

use sha2::{Digest, Sha256};
use std::fmt;

/// Distribution archives are a few tens of megabytes
const MAX_BODY_SIZE: u64 = 200 * 1024 * 1024;

/// Broad classes of fetch failures, for operator feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection or transfer failure
    Network,
    /// The mirror does not carry the requested version
    NotFound,
    /// The archive does not match the expected digest
    Integrity,
}

impl ErrorCategory {
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check connectivity to the mirror and try again",
            Self::NotFound => "Verify the mirror URL and version are correct",
            Self::Integrity => "Verify the configured checksum, or try another mirror",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network error"),
            Self::NotFound => write!(f, "not found"),
            Self::Integrity => write!(f, "integrity error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request for {url} failed: {message}")]
    Http {
        url: String,
        message: String,
        status: Option<u16>,
    },

    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },
}

impl FetchError {
    fn http(url: &str, err: ureq::Error) -> Self {
        let status = match &err {
            ureq::Error::StatusCode(code) => Some(*code),
            _ => None,
        };
        Self::Http {
            url: url.to_string(),
            message: err.to_string(),
            status,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http {
                status: Some(404), ..
            } => ErrorCategory::NotFound,
            Self::Http { .. } => ErrorCategory::Network,
            Self::ChecksumMismatch { .. } => ErrorCategory::Integrity,
        }
    }
}

/// Retrieves remote archives
pub trait Fetcher: Send + Sync + fmt::Debug {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a blocking HTTP client
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::info!("Downloading {url}");

        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", concat!("tomcat-bin/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| FetchError::http(url, e))?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| FetchError::http(url, e))
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compare `data` against an expected hex digest (case-insensitive)
pub fn verify_checksum(url: &str, data: &[u8], expected: &str) -> Result<(), FetchError> {
    let actual = sha256_hex(data);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(FetchError::ChecksumMismatch {
            url: url.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn checksum_accepts_uppercase() {
        let digest = sha256_hex(b"tomcat").to_uppercase();
        assert!(verify_checksum("u", b"tomcat", &digest).is_ok());
    }

    #[test]
    fn checksum_mismatch_is_integrity_error() {
        let err = verify_checksum("https://m/t.tar.gz", b"tomcat", "deadbeef").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Integrity);
        assert!(err.to_string().contains("expected deadbeef"));
    }

    #[test]
    fn http_404_is_not_found() {
        let err = FetchError::http("u", ureq::Error::StatusCode(404));
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err = FetchError::http("u", ureq::Error::StatusCode(503));
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(!err.category().advice().is_empty());
    }
}
