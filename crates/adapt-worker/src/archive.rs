//! Packaging succeeded outputs into a single ZIP archive.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{WorkerError, WorkerResult};

/// Write every `(entry name, file)` pair of `manifest` into a ZIP at `archive_path`.
///
/// Entry names come from the batch naming scheme (`{format_name}.{extension}`).
/// Returns the archive size in bytes.
pub async fn package_archive(manifest: &BTreeMap<String, PathBuf>, archive_path: &Path) -> WorkerResult<u64> {
    if manifest.is_empty() {
        return Err(WorkerError::archive_failed("nothing to package"));
    }
    if let Some(parent) = archive_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let manifest = manifest.clone();
    let path = archive_path.to_path_buf();
    let (bytes, entries) = tokio::task::spawn_blocking(move || write_zip(&manifest, &path))
        .await
        .map_err(|e| WorkerError::archive_failed(format!("archive task failed: {}", e)))??;

    info!(archive = %archive_path.display(), entries, bytes, "Packaged archive");
    Ok(bytes)
}

fn write_zip(manifest: &BTreeMap<String, PathBuf>, archive_path: &Path) -> WorkerResult<(u64, usize)> {
    let file = File::create(archive_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    // Video streams are already compressed
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(1))
        .large_file(true);

    for (name, source) in manifest {
        zip.start_file(name.as_str(), options)?;
        let mut reader = BufReader::new(File::open(source)?);
        io::copy(&mut reader, &mut zip)?;
    }

    let writer = zip.finish()?;
    let file = writer
        .into_inner()
        .map_err(|e| WorkerError::archive_failed(format!("flush failed: {}", e.error())))?;
    Ok((file.metadata()?.len(), manifest.len()))
}
