//! CLI command implementations.

pub mod get;
pub mod list;
pub mod max_brightness;
pub mod orientation;
pub mod session;
pub mod set;
pub mod show;
