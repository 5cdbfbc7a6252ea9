//! Files that receive an injected scheme

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::markers::{TemplateRef, locate, splice};
use crate::core::error::{Error, Result};

/// A target file held in memory while it is being rewritten
#[derive(Debug, Clone)]
pub struct Recipient {
    path: PathBuf,
    content: String,
}

impl Recipient {
    /// Read the file at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::FileNotFound`] if nothing exists at `path`, [`Error::IsADirectory`]
    /// if it is a directory.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        if metadata.is_dir() {
            return Err(Error::IsADirectory(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = content.len(), "Loaded recipient");
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Wrap content that is already in memory
    pub fn from_content(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Template reference named by the file's marker pair
    pub fn locate(&self) -> Result<TemplateRef> {
        locate(&self.content, &self.path)
    }

    /// Replace the marked region with `rendered`, in memory only
    pub fn splice(&mut self, rendered: &str) -> Result<()> {
        self.content = splice(&self.content, rendered, &self.path)?;
        Ok(())
    }

    /// Write the content back over the original file.
    ///
    /// The content goes to a temporary file in the same directory which is
    /// then renamed over the original, keeping the original permissions.
    pub async fn persist(&self) -> Result<()> {
        let path = self.path.clone();
        let content = self.content.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let permissions = std::fs::metadata(&path)?.permissions();

            let mut tmp = tempfile::Builder::new()
                .prefix(".base16-inject")
                .tempfile_in(&dir)?;
            tmp.write_all(content.as_bytes())?;
            tmp.as_file().sync_all()?;
            std::fs::set_permissions(tmp.path(), permissions)?;
            tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        debug!(path = %self.path.display(), "Wrote recipient");
        Ok(())
    }
}
