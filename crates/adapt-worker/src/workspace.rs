//! Per-job scratch space.
//!
//! Each job gets its own directory under the worker's work dir. The directory
//! is removed when the [`JobWorkspace`] is dropped, on success and failure
//! alike.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::WorkerResult;

/// Scratch directory exclusively owned by one job.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh directory under `work_dir`, creating `work_dir` if needed.
    pub async fn create(work_dir: &Path, job_id: &str) -> WorkerResult<Self> {
        tokio::fs::create_dir_all(work_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(work_dir)?;
        debug!(path = %dir.path().display(), "Created job workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
