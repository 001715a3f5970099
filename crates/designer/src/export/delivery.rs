//! Getting the finished document to the user.
//!
//! A [`Delivery`] first tries a regular download. If that fails the
//! pipeline falls back to [`Delivery::open_in_viewer`] and tells the user
//! about the substitution instead of reporting a failure.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("download of {file_name} failed: {reason}")]
    Download { file_name: String, reason: String },

    #[error("could not open {file_name} for viewing: {reason}")]
    Viewer { file_name: String, reason: String },
}

/// Where the document ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Downloaded { location: String },
    OpenedInViewer { location: String },
}

impl DeliveryOutcome {
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Downloaded { location } | Self::OpenedInViewer { location } => location,
        }
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::OpenedInViewer { .. })
    }
}

#[async_trait(?Send)]
pub trait Delivery {
    /// Save `bytes` as `file_name`; returns where it went
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Download` when the download is rejected.
    async fn download(&self, file_name: &str, bytes: &[u8]) -> Result<String, DeliveryError>;

    /// Show `bytes` in a separate viewing context
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Viewer` when no viewer can be opened.
    async fn open_in_viewer(&self, file_name: &str, bytes: &[u8]) -> Result<String, DeliveryError>;
}

#[cfg(feature = "runtime")]
pub use file::FileDelivery;

#[cfg(feature = "runtime")]
mod file {
    use std::path::{Component, Path, PathBuf};

    use async_trait::async_trait;
    use tracing::info;

    use super::{Delivery, DeliveryError};

    /// Writes documents to disk.
    ///
    /// Downloads land in `out_dir`; the viewer fallback uses a scratch
    /// directory, the system temp directory unless configured otherwise.
    #[derive(Debug, Clone)]
    pub struct FileDelivery {
        out_dir: PathBuf,
        viewer_dir: PathBuf,
    }

    impl FileDelivery {
        pub fn new(out_dir: impl Into<PathBuf>) -> Self {
            Self {
                out_dir: out_dir.into(),
                viewer_dir: std::env::temp_dir(),
            }
        }

        #[must_use]
        pub fn with_viewer_dir(mut self, viewer_dir: impl Into<PathBuf>) -> Self {
            self.viewer_dir = viewer_dir.into();
            self
        }

        #[must_use]
        pub fn out_dir(&self) -> &Path {
            &self.out_dir
        }
    }

    /// Write `bytes` as `dir/file_name`. `file_name` must be a single
    /// normal path component; anything else could land outside `dir`.
    async fn write_into(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let mut components = Path::new(file_name).components();
        let (Some(Component::Normal(name)), None) = (components.next(), components.next()) else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a plain file name: {file_name}"),
            ));
        };
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    #[async_trait(?Send)]
    impl Delivery for FileDelivery {
        async fn download(&self, file_name: &str, bytes: &[u8]) -> Result<String, DeliveryError> {
            let path = write_into(&self.out_dir, file_name, bytes)
                .await
                .map_err(|e| DeliveryError::Download {
                    file_name: file_name.to_string(),
                    reason: e.to_string(),
                })?;
            info!(path = %path.display(), bytes = bytes.len(), "Wrote PDF");
            Ok(path.display().to_string())
        }

        async fn open_in_viewer(&self, file_name: &str, bytes: &[u8]) -> Result<String, DeliveryError> {
            let path = write_into(&self.viewer_dir, file_name, bytes)
                .await
                .map_err(|e| DeliveryError::Viewer {
                    file_name: file_name.to_string(),
                    reason: e.to_string(),
                })?;
            info!(path = %path.display(), "Wrote PDF for viewing");
            Ok(path.display().to_string())
        }
    }
}
