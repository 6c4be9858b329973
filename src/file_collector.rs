//! # File Collector Module
//!
//! Questo modulo gestisce la selezione corrente di immagini da inviare.
//!
//! ## Responsabilità:
//! - Accetta file grezzi (da path su disco o bytes in memoria)
//! - Filtra per media type: solo `image/*`, il resto viene scartato in silenzio
//! - Assegna ad ogni file un indice sequenziale immutabile (identità stabile)
//! - Applica il limite massimo di immagini per batch
//! - Discovery ricorsiva di file in directory per la CLI
//!
//! ## Identità dei file:
//! - L'indice non viene mai riassegnato, nemmeno dopo `remove()` o `clear()`
//! - Le anteprime in volo che puntano ad un indice rimosso diventano no-op
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut collector = FileCollector::new(10);
//! let raw = FileCollector::collect_paths(&[PathBuf::from("/scans")])?;
//! let accepted = collector.accept(raw)?;
//! ```

use crate::error::PipelineError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Where the bytes of a file come from
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

impl FileSource {
    /// Read the full contents of the file
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            FileSource::Path(path) => tokio::fs::read(path).await,
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// A file handed over by the user, not yet filtered
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub media_type: String,
    pub source: FileSource,
}

impl RawFile {
    /// Build a raw file from disk, guessing the media type from the extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let media_type = mime_guess::from_path(&path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Self {
            name,
            media_type,
            source: FileSource::Path(path),
        }
    }

    /// Build a raw file from bytes already in memory (drag-and-drop style input)
    pub fn from_bytes(name: &str, media_type: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            media_type: media_type.to_string(),
            source: FileSource::Memory(Arc::from(bytes.into())),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.to_ascii_lowercase().starts_with("image/")
    }
}

/// An accepted image with its stable identity
#[derive(Debug, Clone)]
pub struct SelectedFile {
    index: usize,
    name: String,
    media_type: String,
    source: FileSource,
}

impl SelectedFile {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }
}

/// Owns the live selection
#[derive(Debug)]
pub struct FileCollector {
    files: Vec<SelectedFile>,
    next_index: usize,
    max_batch_size: usize,
}

impl FileCollector {
    /// `max_batch_size == 0` disables the limit
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            files: Vec::new(),
            next_index: 0,
            max_batch_size,
        }
    }

    /// Append the image items of `raw_files` to the selection.
    ///
    /// Non-image items are dropped without error. If the images would push the
    /// selection over the batch limit nothing is accepted.
    pub fn accept<I>(&mut self, raw_files: I) -> Result<Vec<SelectedFile>, PipelineError>
    where
        I: IntoIterator<Item = RawFile>,
    {
        let images: Vec<RawFile> = raw_files
            .into_iter()
            .filter(|raw| {
                let keep = raw.is_image();
                if !keep {
                    debug!("Dropping non-image file {} ({})", raw.name, raw.media_type);
                }
                keep
            })
            .collect();

        if self.max_batch_size > 0 && self.files.len() + images.len() > self.max_batch_size {
            return Err(PipelineError::Selection(format!(
                "batch limit is {} images, selection has {} and {} more were offered",
                self.max_batch_size,
                self.files.len(),
                images.len()
            )));
        }

        let mut accepted = Vec::with_capacity(images.len());
        for raw in images {
            let selected = SelectedFile {
                index: self.next_index,
                name: raw.name,
                media_type: raw.media_type,
                source: raw.source,
            };
            self.next_index += 1;
            accepted.push(selected.clone());
            self.files.push(selected);
        }

        Ok(accepted)
    }

    /// Remove one file; other indices are untouched
    pub fn remove(&mut self, index: usize) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.index != index);
        before != self.files.len()
    }

    /// Empty the selection. Indices keep increasing so stale previews never match new files.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.files.iter().any(|f| f.index == index)
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Expand files and directories into raw files, in a stable order
    pub fn collect_paths(paths: &[PathBuf]) -> Result<Vec<RawFile>> {
        let mut raw_files = Vec::new();

        for path in paths {
            if !path.exists() {
                return Err(anyhow::anyhow!("Path does not exist: {}", path.display()));
            }

            if path.is_dir() {
                raw_files.extend(Self::walk_dir(path));
            } else {
                raw_files.push(RawFile::from_path(path.clone()));
            }
        }

        Ok(raw_files)
    }

    fn walk_dir(dir: &Path) -> Vec<RawFile> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| RawFile::from_path(e.into_path()))
            .collect()
    }
}
