//! ferry-cli: Command-line interface for ferry
//!
//! Provides the `ferry` binary, which deploys a local image to a remote
//! host and swaps it in on a published port.

pub mod commands;
pub mod output;
