use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use uuid::Uuid;

/// Extension used when an upload's filename has nothing usable.
pub const FALLBACK_EXTENSION: &str = "bin";

const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Video,
    Audio,
}

impl ArtifactKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Video => "video",
            ArtifactKind::Audio => "audio",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Hands out request-scoped temp paths under a single root directory.
#[derive(Debug, Clone)]
pub struct TempArtifacts {
    root: PathBuf,
}

impl TempArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a unique path. Nothing is created on disk; whatever ends up at
    /// the path is removed when the handle is released or dropped.
    pub fn allocate(&self, kind: ArtifactKind, extension: &str) -> TempArtifact {
        let extension = sanitize_extension(extension);
        let path = self
            .root
            .join(format!("{}-{}.{}", kind.prefix(), Uuid::new_v4(), extension));

        tracing::trace!(kind = %kind, path = %path.display(), "Allocated temp artifact");

        TempArtifact {
            path,
            kind,
            released: false,
        }
    }
}

impl Default for TempArtifacts {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

/// A temp file owned by exactly one request.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    kind: ArtifactKind,
    released: bool,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Delete the file now. Never fails; problems are only logged.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(kind = %self.kind, path = %self.path.display(), "Removed temp artifact");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    kind = %self.kind,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove temp artifact"
                );
            }
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Extension to use for an uploaded file, taken from its logical name when it
/// is short and plain ASCII alphanumeric.
pub fn extension_from_filename(file_name: &str) -> &str {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| is_safe_extension(ext))
        .unwrap_or(FALLBACK_EXTENSION)
}

fn sanitize_extension(extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if is_safe_extension(extension) {
        extension.to_ascii_lowercase()
    } else {
        FALLBACK_EXTENSION.to_string()
    }
}

fn is_safe_extension(extension: &str) -> bool {
    !extension.is_empty()
        && extension.len() <= MAX_EXTENSION_LEN
        && extension.chars().all(|c| c.is_ascii_alphanumeric())
}
