//! Per-archive patch sequence.
//!
//! Each logical archive walks the same states:
//!
//! ```text
//! Pending -> Extracted -> MigrationChecked -> Patched -> Done
//! ```
//!
//! Extraction failures are logged and the archive continues with whatever
//! payload exists. The delete manifest runs only when no migration is due.
//! The diff manifest always runs; its failure is the only fatal outcome.

use std::fmt;

use crate::archive::LogicalArchive;
use crate::error::PatchError;
use crate::manifest::ManifestProcessor;
use crate::migration::{AudioMigration, MigrationOutcome, MigrationPolicy};
use crate::paths::WorkTree;
use crate::tools::{Archiver, DiffTool};
use crate::version::VersionTransition;

/// Where an archive is in its patch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatchState {
    /// Not started.
    Pending,
    /// Payload extracted (or extraction failed) and parts deleted.
    Extracted,
    /// Migration ran, or the delete manifest was processed instead.
    MigrationChecked,
    /// Diff manifest processed.
    Patched,
    /// Finished.
    Done,
}

impl fmt::Display for PatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Extracted => "extracted",
            Self::MigrationChecked => "migration-checked",
            Self::Patched => "patched",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// What happened to one logical archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Logical archive name.
    pub name: String,
    /// Whether the archiver succeeded.
    pub extracted: bool,
    /// Version pair parsed from the name, if any.
    pub transition: Option<VersionTransition>,
    /// Migration result when one was due.
    pub migration: Option<MigrationOutcome>,
    /// Whether at least one diff was applied.
    pub patched: bool,
    /// Final state.
    pub state: PatchState,
}

/// Drives one logical archive through extraction, migration or deletion,
/// and diff application.
#[derive(Debug)]
pub struct PatchEngine<'a, A: ?Sized, D: ?Sized> {
    tree: &'a WorkTree,
    archiver: &'a A,
    diff_tool: &'a D,
    policy: MigrationPolicy,
}

impl<'a, A, D> PatchEngine<'a, A, D>
where
    A: Archiver + ?Sized,
    D: DiffTool + ?Sized,
{
    /// Engine operating on `tree` with the given collaborators.
    pub fn new(
        tree: &'a WorkTree,
        archiver: &'a A,
        diff_tool: &'a D,
        policy: MigrationPolicy,
    ) -> Self {
        Self {
            tree,
            archiver,
            diff_tool,
            policy,
        }
    }

    /// Process `archive` end to end.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::DiffApply`] if the diff tool fails; the archive
    /// is then not reported as patched.
    pub fn process(&self, archive: &LogicalArchive) -> Result<ArchiveReport, PatchError> {
        let mut report = ArchiveReport {
            name: archive.name().to_string(),
            extracted: false,
            transition: VersionTransition::from_archive_name(archive.name()),
            migration: None,
            patched: false,
            state: PatchState::Pending,
        };

        report.extracted = archive.extract_and_consume(self.archiver, self.tree.work_dir());
        advance(&mut report, PatchState::Extracted);

        let manifests = ManifestProcessor::new(self.tree.work_dir());
        let migrate = report
            .transition
            .is_some_and(|t| self.policy.requires_migration(&t));
        if migrate {
            let to = report.transition.map(|t| t.to);
            let outcome = AudioMigration::new(self.tree, self.policy).run(to);
            if !outcome.is_complete() {
                tracing::warn!(
                    "Migration indicated but did not complete; continuing to apply hdiff may fail."
                );
            }
            report.migration = Some(outcome);
        } else {
            manifests.process_deletes(&self.tree.delete_manifest());
        }
        advance(&mut report, PatchState::MigrationChecked);

        report.patched = manifests.apply_diffs(&self.tree.diff_manifest(), self.diff_tool)?;
        advance(&mut report, PatchState::Patched);

        advance(&mut report, PatchState::Done);
        Ok(report)
    }
}

fn advance(report: &mut ArchiveReport, next: PatchState) {
    debug_assert!(next > report.state, "{} -> {next}", report.state);
    tracing::debug!("{}: {} -> {next}", report.name, report.state);
    report.state = next;
}
