//! hdpatch - incremental game updates from hdiff archives
//!
//! Applies vendor-supplied update archives to a locally installed game:
//! extracts single and multi-part archives, migrates the audio layout when
//! an update crosses 3.6, deletes files listed in `deletefiles.txt`, applies
//! binary diffs listed in `hdifffiles.txt`, and leaves the installation in a
//! clean state with an up-to-date `config.ini`.
//!
//! # Architecture
//!
//! - [`archive::ArchiveResolver`] finds logical archives.
//! - [`engine::PatchEngine`] runs one archive through extraction, migration
//!   or deletion, and diff application.
//! - [`patcher::Patcher`] composes the above and hands off to
//!   [`cleanup::CleanupManager`].
//! - External programs sit behind the [`tools::Archiver`] and
//!   [`tools::DiffTool`] traits.

pub mod archive;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod fsutil;
pub mod install_config;
pub mod manifest;
pub mod migration;
pub mod paths;
pub mod patcher;
pub mod tools;
pub mod version;

pub use config::PatcherConfig;
pub use error::{PatchError, ToolError};
pub use patcher::{Patcher, RunSummary};
pub use version::Version;
