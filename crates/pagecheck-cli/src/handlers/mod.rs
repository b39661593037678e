//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains the execution logic for a CLI command and
//! the pure helpers it renders with.

pub mod check;
pub mod generate;
#[cfg(feature = "llm")]
pub mod suggest;

pub use check::{build_engine, defect_gate, emit, engine_config, execute_check, resolve_source};
pub use generate::{build_fixture, check_fixture, render_catalog};
#[cfg(feature = "llm")]
pub use suggest::{execute_suggest, llm_config, render_suggestions};
