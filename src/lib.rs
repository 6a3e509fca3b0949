//! # fenceline
//!
//! Static ownership-boundary checker for codebases worked on by multiple
//! independent contributors. Each instance owns a subtree of paths, some
//! paths are shared, and cross-boundary writes or imports are detected and
//! reported — by static path and import inspection only, never by running
//! the code.
//!
//! ## Architecture
//!
//! - **Ownership map** (`ownership`): instance → owned prefixes, shared
//!   categories, loaded once from TOML and frozen for the run
//! - **Path resolution** (`filepath`): raw path → [`filepath::FilePath`]
//!   value object with owner/shared/test/config attributes
//! - **Policy** (`policy`): composable AND/OR/NOT specifications, ending in
//!   the `BoundaryAllowed` modification policy
//! - **Import extraction** (`extract`): hand-rolled Python import parser
//! - **Validation chain** (`validate`): accumulating per-import validators
//! - **Contracts** (`contract`): capability-descriptor interface checks
//! - **Reporting** (`report`, `checker`): severity-ranked merged reports,
//!   JSON export, rayon-parallel batch orchestration
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use fenceline::checker::BoundaryChecker;
//! use fenceline::ownership::OwnershipMap;
//!
//! let map = OwnershipMap::load(Path::new(".fenceline.toml")).unwrap();
//! let checker = BoundaryChecker::new(map, Path::new("."), "instance1").unwrap();
//! let report = checker.check_files(&[PathBuf::from("src/storage/gcs.py")]);
//! std::process::exit(if report.failed(false) { 1 } else { 0 });
//! ```

pub mod checker;
pub mod contract;
pub mod error;
pub mod extract;
pub mod filepath;
pub mod ownership;
pub mod policy;
pub mod report;
pub mod validate;
