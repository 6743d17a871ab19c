use crate::config::FileReaderSettings;
use crate::domain::model::Note;
use crate::domain::ports::NoteSource;
use crate::utils::error::{PipelineError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Reads every note file in a single directory (non-recursive).
#[derive(Debug, Clone)]
pub struct FileReader {
    settings: FileReaderSettings,
}

impl FileReader {
    pub fn new(settings: FileReaderSettings) -> Self {
        Self { settings }
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.settings.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.settings
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    async fn list_files(&self) -> Result<Vec<PathBuf>> {
        let directory = &self.settings.directory_path;
        let source_error = |e: std::io::Error| PipelineError::Source {
            path: directory.clone(),
            message: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(directory).await.map_err(source_error)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(source_error)? {
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::warn!("Skipping {}: cannot stat entry: {}", entry.path().display(), e);
                    continue;
                }
            };
            if file_type.is_dir() {
                continue;
            }

            let path = entry.path();
            if self.accepts(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl NoteSource for FileReader {
    async fn read_notes(&self, cancel: &CancellationToken) -> Result<Vec<Note>> {
        tracing::debug!("Listing notes in {}", self.settings.directory_path);
        let files = self.list_files().await?;
        let mut notes = Vec::with_capacity(files.len());

        for path in files {
            if cancel.is_cancelled() {
                return Err(PipelineError::cancelled("reading note files"));
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    tracing::debug!("Read {} ({} bytes)", name, text.len());
                    notes.push(Note::new(name, text));
                }
                Err(e) => {
                    tracing::warn!("Failed to read file {}: {}", path.display(), e);
                }
            }
        }

        if notes.is_empty() {
            return Err(PipelineError::NoNotesFound {
                directory: self.settings.directory_path.clone(),
            });
        }

        tracing::info!(
            "Read {} note file(s) from {}",
            notes.len(),
            self.settings.directory_path
        );
        Ok(notes)
    }
}
