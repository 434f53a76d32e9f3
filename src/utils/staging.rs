//! Per-call staging directories and phase tracking for the remote workflows.
use std::fmt;
use std::io;
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, TempDir};
use tracing::{debug, error, info, warn};

use crate::errors::{BackupError, Result};
use crate::store;

/// A private directory holding an archive between local work and transfer.
///
/// The name carries a random suffix, so concurrent calls never share one. The
/// directory is removed by [`StagingArea::finalize`], or on drop if an early
/// return skips it.
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Creates `staging_root` if needed, then a fresh directory inside it.
    ///
    /// `staging_root` is shared between calls and is never removed; only the
    /// per-call directory is.
    pub fn create(staging_root: &Path, label: &str) -> Result<Self> {
        store::ensure_dir(staging_root).map_err(|e| {
            BackupError::from_io(
                e,
                format!("create staging root {}", staging_root.display()),
                BackupError::Internal,
            )
        })?;
        let dir = TempFileBuilder::new()
            .prefix(&format!("{}_", label))
            .tempdir_in(staging_root)
            .map_err(|e| {
                BackupError::from_io(
                    e,
                    format!("create staging directory in {}", staging_root.display()),
                    BackupError::Internal,
                )
            })?;
        debug!(staging = %dir.path().display(), "Staging directory created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Deletes the staging directory. A directory that is already gone counts
    /// as cleaned up; any other failure is logged and does not change the
    /// outcome of the workflow.
    pub fn finalize(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(staging = %path.display(), "Staging directory removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                staging = %path.display(),
                error = %e,
                "Failed to remove staging directory"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Staging,
    Transferring,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Staging => "staging",
            Phase::Transferring => "transferring",
            Phase::Finalizing => "finalizing",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Linear phase tracker for one orchestrator call. Transitions only move forward.
pub struct Workflow {
    name: &'static str,
    phase: Phase,
}

impl Workflow {
    pub fn start(name: &'static str) -> Self {
        info!(workflow = name, phase = %Phase::Staging, "Workflow started");
        Self {
            name,
            phase: Phase::Staging,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn enter(&mut self, phase: Phase) {
        debug_assert!(phase as u8 > self.phase as u8, "phases only move forward");
        info!(workflow = self.name, from = %self.phase, to = %phase, "Phase transition");
        self.phase = phase;
    }

    /// Moves to `Done` or `Failed` according to `outcome`.
    pub fn finish<T>(&mut self, outcome: &Result<T>) {
        match outcome {
            Ok(_) => {
                self.enter(Phase::Done);
                info!(workflow = self.name, "✓ Workflow completed");
            }
            Err(e) => {
                self.enter(Phase::Failed);
                error!(workflow = self.name, kind = ?e.kind(), error = %e, "Workflow failed");
            }
        }
    }
}
