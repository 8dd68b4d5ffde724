//! Error types for the lesson pipeline.
//!
//! - [`MalformedDirectiveError`]: a directive is missing structurally required data.
//! - [`ExecutionError`]: why a sandboxed run or a test case did not succeed.
//! - [`ConfigError`]: configuration could not be read or parsed.

pub mod config_error;
pub mod directive_error;
pub mod execution_error;

pub use config_error::ConfigError;
pub use directive_error::{DirectiveFault, MalformedDirectiveError};
pub use execution_error::ExecutionError;

/// Convenience alias for directive parsing results.
pub type DirectiveResult<T> = Result<T, MalformedDirectiveError>;
