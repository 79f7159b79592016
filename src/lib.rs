//! sysmend library crate
//!
//! Poll-detect-repair loops for Windows machine upkeep.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface (channel, network, status)
//! - [`config`] - Configuration loading and validation
//! - [`credential`] - Repair credentials and their sources
//! - [`error`] - Failure taxonomy and exit codes
//! - [`logging`] - Tracing setup and run transcript
//! - [`platform`] - PowerShell, registry and file-store collaborators
//! - [`probe`] - Read-only state probers
//! - [`repair`] - Reconciliation, actuators, retry controller
//! - [`scheduler`] - Poll driver
//! - [`state`] - Applied state model
//! - [`util`] - Time helpers

// Allow common stylistic patterns.
#![allow(async_fn_in_trait)] // Probers and actuators are used generically, never as dyn
#![allow(clippy::doc_markdown)] // Doc formatting is secondary
#![allow(clippy::uninlined_format_args)] // Format string style preference
#![allow(clippy::missing_const_for_fn)] // Const fn optimization is low priority
#![allow(clippy::module_name_repetitions)] // Explicit type names read better in logs
#![allow(clippy::missing_errors_doc)] // Errors are documented on MendError

pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod platform;
pub mod probe;
pub mod repair;
pub mod scheduler;
pub mod state;
pub mod util;

pub use error::{MendError, MendResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
