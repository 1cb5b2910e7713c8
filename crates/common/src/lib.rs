//! Shared building blocks for the category service crates:
//! logging setup, small HTTP payload types and startup environment checks.

pub mod types;
pub mod env;

pub mod utils {
    pub mod logging;
}
