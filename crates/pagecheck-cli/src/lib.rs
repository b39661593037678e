//! Pagecheck CLI Library
//!
//! Command-line and HTTP front end for the Pagecheck QA engine.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;
pub mod server;

pub use commands::{
    CategoryArg, CheckArgs, Cli, ColorArg, Commands, DriverArg, FormatArg, GenerateArgs,
    ServeArgs, SuggestArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_text, OutputFormat, ProgressReporter};
pub use server::{router, serve, AppState};
