//! Rich diagnostic error types for fenceline.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. The design principle is containment:
//! a bad input file degrades to a reported violation for that file only, so
//! most of these errors are caught inside the batch and never cross it.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for fenceline.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum FenceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Check(#[from] CheckError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read ownership map {path}: {source}")]
    #[diagnostic(
        code(fenceline::config::io),
        help(
            "The ownership map could not be read. Check that the file exists \
             and has read permissions, or pass an explicit path with --config."
        )
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ownership map {path}: {message}")]
    #[diagnostic(
        code(fenceline::config::parse),
        help(
            "The ownership map is not valid TOML, or its tables do not match \
             the expected layout. Each instance is an [[instance]] table with \
             `id` and `owned_paths`; shared territory goes in [[shared]] tables."
        )
    )]
    Parse { path: PathBuf, message: String },

    #[error("duplicate ownership: \"{prefix}\" is declared by both {first} and {second}")]
    #[diagnostic(
        code(fenceline::config::duplicate_ownership),
        help(
            "No two instances may declare the identical path prefix. \
             Remove the prefix from one of the instances, or move it into \
             a [[shared]] category if both genuinely need it."
        )
    )]
    DuplicateOwnership {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("unknown instance \"{instance}\"")]
    #[diagnostic(
        code(fenceline::config::unknown_instance),
        help(
            "The instance is not declared in the ownership map. \
             Run `fenceline boundaries` to list the known instances."
        )
    )]
    UnknownInstance { instance: String },

    #[error("no acting instance configured")]
    #[diagnostic(
        code(fenceline::config::no_instance),
        help(
            "Pass --instance <id>, write the instance id into a `.instance` \
             file at the project root, or set the FENCELINE_INSTANCE \
             environment variable."
        )
    )]
    NoInstance,
}

// ---------------------------------------------------------------------------
// Import extraction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error("file not found: {path}")]
    #[diagnostic(
        code(fenceline::extract::not_found),
        help(
            "The candidate file does not exist on disk. Paths in a diff may \
             refer to deleted files; the batch checker downgrades this to a \
             warning instead of aborting."
        )
    )]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    #[diagnostic(
        code(fenceline::extract::io),
        help("Check file permissions and encoding. Source files must be valid UTF-8.")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse failure in {path} at line {line}: {message}")]
    #[diagnostic(
        code(fenceline::extract::parse_failure),
        help(
            "The import statement could not be parsed. The batch checker \
             converts this into a warning-severity `parse_error` violation \
             rather than failing the whole run."
        )
    )]
    ParseFailure {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Checker errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error("failed to write report to {path}: {source}")]
    #[diagnostic(
        code(fenceline::check::export_io),
        help("Check that the target directory exists and is writable.")
    )]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {message}")]
    #[diagnostic(
        code(fenceline::check::export_serde),
        help("This indicates an internal bug in the export types. Please file a report.")
    )]
    ExportSerde { message: String },
}

/// Convenience alias for functions returning fenceline results.
pub type FenceResult<T> = std::result::Result<T, FenceError>;
