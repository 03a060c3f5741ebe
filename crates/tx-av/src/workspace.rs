//! Working-folder management for conversion jobs.
//!
//! A [`Workspace`] provides a temporary directory that holds the extracted
//! elementary streams and every intermediate file a job produces. The
//! directory is removed when the workspace is dropped, so a failed job never
//! leaves partial files behind.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Working folder for a single conversion job.
pub struct Workspace {
    temp_dir: TempDir,
    input_path: PathBuf,
}

impl Workspace {
    /// Create a new workspace for converting a file.
    pub fn new(input: &Path) -> tx_core::Result<Self> {
        let temp_dir = TempDir::new()
            .map_err(|e| tx_core::Error::pipeline("workspace", format!("failed to create working folder: {e}")))?;

        Ok(Self {
            temp_dir,
            input_path: input.to_path_buf(),
        })
    }

    /// The original input file path.
    pub fn input(&self) -> &Path {
        &self.input_path
    }

    /// Path to the working folder.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a named file inside the working folder.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Path for an extracted elementary stream, named after its kind and
    /// demuxer track id (e.g. `video0.h264`, `audio1.dts`).
    pub fn stream_file(&self, kind: &str, id: u32, extension: &str) -> PathBuf {
        self.temp_dir.path().join(format!("{kind}{id}{extension}"))
    }

    /// Move `file` out of the working folder into `output_dir`, keeping its
    /// filename. An existing file at the destination is replaced. Rename is
    /// tried first; a cross-filesystem move falls back to copy + remove.
    pub fn export(&self, file: &Path, output_dir: &Path) -> tx_core::Result<PathBuf> {
        let name = file
            .file_name()
            .ok_or_else(|| tx_core::Error::pipeline("workspace", format!("not a file: {}", file.display())))?;
        let dest = output_dir.join(name);

        if dest.exists() {
            std::fs::remove_file(&dest).map_err(|e| {
                tx_core::Error::pipeline("workspace", format!("failed to replace {}: {e}", dest.display()))
            })?;
        }

        if std::fs::rename(file, &dest).is_err() {
            std::fs::copy(file, &dest).map_err(|e| {
                tx_core::Error::pipeline("workspace", format!("failed to copy to {}: {e}", dest.display()))
            })?;
            let _ = std::fs::remove_file(file);
        }

        Ok(dest)
    }
}

/// Rename `file` in place to carry `extension`, replacing any existing file
/// at the new name. Used by mux steps whose tool dictates the container
/// extension (the transport-stream muxer insists on `.m2ts`).
pub fn change_extension(file: &Path, extension: &str) -> tx_core::Result<PathBuf> {
    let dest = file.with_extension(extension);

    if dest.exists() {
        std::fs::remove_file(&dest).map_err(|e| {
            tx_core::Error::pipeline("workspace", format!("failed to replace {}: {e}", dest.display()))
        })?;
    }

    std::fs::rename(file, &dest).map_err(|e| {
        tx_core::Error::pipeline(
            "workspace",
            format!("failed to rename {} to {}: {e}", file.display(), dest.display()),
        )
    })?;

    Ok(dest)
}
