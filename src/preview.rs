//! # Preview Generation Module
//!
//! Questo modulo genera le anteprime delle immagini selezionate, in modo
//! asincrono e indipendente dall'invio del batch.
//!
//! ## Responsabilità:
//! - Un task per file, con concorrenza limitata da un `Semaphore`
//! - Encoding come `data:` URL (base64), direttamente visualizzabile
//! - Ridimensionamento opzionale con `image` quando è configurato un lato massimo
//! - Consegna dei risultati via canale, etichettati con l'indice del file
//!
//! ## Ordine di completamento:
//! - I task completano in ordine arbitrario
//! - `PreviewStore` associa ogni risultato al suo slot tramite `file_index`
//! - Risultati per file già rimossi vengono scartati
//!
//! ## Errori:
//! - Un errore di lettura/decodifica diventa `PreviewSlot::Unavailable` per quel
//!   solo indice, senza interrompere gli altri file

use crate::error::PreviewError;
use crate::file_collector::SelectedFile;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

const PREVIEW_QUALITY: u8 = 80;

/// Displayable representation of one selected file
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRecord {
    pub file_index: usize,
    pub encoded: String,
}

/// What a preview task reports back
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub file_index: usize,
    pub result: Result<PreviewRecord, PreviewError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewSlot {
    Pending,
    Ready(PreviewRecord),
    Unavailable(PreviewError),
}

/// Spawns preview tasks and hands their outcomes to a channel
pub struct PreviewGenerator {
    semaphore: Arc<Semaphore>,
    max_dimension: Option<u32>,
    tx: mpsc::UnboundedSender<PreviewOutcome>,
}

impl PreviewGenerator {
    /// Create a generator and the receiver its outcomes arrive on
    pub fn new(workers: usize, max_dimension: Option<u32>) -> (Self, mpsc::UnboundedReceiver<PreviewOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generator = Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            max_dimension,
            tx,
        };
        (generator, rx)
    }

    /// Start generating the preview of `file` without waiting for it
    pub fn spawn(&self, file: SelectedFile) {
        let file_index = file.index();
        let semaphore = self.semaphore.clone();
        let max_dimension = self.max_dimension;
        let tx = self.tx.clone();

        let work = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| PreviewError::Aborted(e.to_string()))?;
            generate_preview(&file, max_dimension).await
        });

        // Il secondo task garantisce un outcome anche se il primo va in panic
        tokio::spawn(async move {
            let result = match work.await {
                Ok(result) => result,
                Err(e) => Err(PreviewError::Aborted(e.to_string())),
            };
            if let Err(ref e) = result {
                warn!("Preview for file #{} unavailable: {}", file_index, e);
            }
            if tx.send(PreviewOutcome { file_index, result }).is_err() {
                debug!("Preview receiver dropped, discarding outcome for #{}", file_index);
            }
        });
    }
}

/// Read a file and turn it into a `data:` URL
pub async fn generate_preview(
    file: &SelectedFile,
    max_dimension: Option<u32>,
) -> Result<PreviewRecord, PreviewError> {
    let bytes = file
        .source()
        .read()
        .await
        .map_err(|e| PreviewError::Read(format!("{}: {}", file.name(), e)))?;

    if bytes.is_empty() {
        return Err(PreviewError::Read(format!("{}: file is empty", file.name())));
    }

    let encoded = match max_dimension {
        None => data_url(file.media_type(), &bytes),
        Some(dimension) => {
            let jpeg = tokio::task::spawn_blocking(move || downscale(&bytes, dimension))
                .await
                .map_err(|e| PreviewError::Aborted(e.to_string()))??;
            data_url("image/jpeg", &jpeg)
        }
    };

    debug!("Preview ready for #{} ({} chars)", file.index(), encoded.len());

    Ok(PreviewRecord {
        file_index: file.index(),
        encoded,
    })
}

pub fn data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

/// Decode, shrink to fit `dimension` and re-encode as JPEG
fn downscale(bytes: &[u8], dimension: u32) -> Result<Vec<u8>, PreviewError> {
    let img = image::load_from_memory(bytes).map_err(|e| PreviewError::Decode(e.to_string()))?;

    let img = if img.width() > dimension || img.height() > dimension {
        img.thumbnail(dimension, dimension)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, PREVIEW_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| PreviewError::Encode(e.to_string()))?;
    Ok(out)
}

/// Preview slots of the live selection, keyed by file index
#[derive(Debug, Default)]
pub struct PreviewStore {
    slots: BTreeMap<usize, PreviewSlot>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a pending slot for a newly accepted file
    pub fn register(&mut self, file_index: usize) {
        self.slots.entry(file_index).or_insert(PreviewSlot::Pending);
    }

    /// Store an outcome in its slot. Returns false when the outcome was discarded.
    pub fn apply(&mut self, outcome: PreviewOutcome) -> bool {
        match self.slots.get_mut(&outcome.file_index) {
            Some(slot @ PreviewSlot::Pending) => {
                *slot = match outcome.result {
                    Ok(record) => PreviewSlot::Ready(record),
                    Err(e) => PreviewSlot::Unavailable(e),
                };
                true
            }
            Some(_) => {
                debug!("Ignoring duplicate preview for #{}", outcome.file_index);
                false
            }
            None => {
                debug!("Discarding preview for removed file #{}", outcome.file_index);
                false
            }
        }
    }

    pub fn remove(&mut self, file_index: usize) {
        self.slots.remove(&file_index);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn slot(&self, file_index: usize) -> Option<&PreviewSlot> {
        self.slots.get(&file_index)
    }

    /// Completed previews, ordered by file index
    pub fn records(&self) -> Vec<&PreviewRecord> {
        self.slots
            .values()
            .filter_map(|slot| match slot {
                PreviewSlot::Ready(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, PreviewSlot::Pending))
            .count()
    }
}
