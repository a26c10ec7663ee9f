//! TF-AVM Check - external tool adapters
//!
//! Implements the core's capability traits on top of subprocesses:
//! - [`TerraformFmt`] checks formatting with `terraform fmt -check`
//! - [`CommandTextGenerator`] asks an external command for corrections

pub mod command;
pub mod fmt;
pub mod generator;

pub use command::{run_command, CommandOutput, CommandSpec};
pub use fmt::TerraformFmt;
pub use generator::CommandTextGenerator;
