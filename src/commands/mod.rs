pub mod create;
pub mod diff;
