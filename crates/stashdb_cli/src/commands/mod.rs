//! CLI command implementations.

pub mod dump;
pub mod get;
pub mod inspect;
pub mod remove;
pub mod set;
