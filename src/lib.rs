//! # Scan Batch Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline di batch
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tassonomia degli errori della pipeline
//! - `file_collector`: Selezione corrente e filtro per media type
//! - `preview`: Generazione asincrona delle anteprime
//! - `client`: Client HTTP verso il servizio di classificazione
//! - `submitter`: Invio single-flight del batch
//! - `aggregator`: Conteggi per categoria e righe di visualizzazione
//! - `pipeline`: Macchina a stati e sessione CLI
//! - `progress` / `json_output`: Feedback per terminale e per programmi
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use scan_batch::{BatchRunner, Config};
//!
//! let mut runner = BatchRunner::new(Config::default())?;
//! let summary = runner.run(&[PathBuf::from("/scans")]).await?;
//! ```

pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod file_collector;
pub mod json_output;
pub mod models;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod submitter;

#[cfg(test)]
mod test_support;

pub use aggregator::{summarize, to_view_model, BatchSummary, Category, DisplayRow};
pub use client::{HttpPredictionClient, PredictionService};
pub use config::Config;
pub use error::{PipelineError, PreviewError, SubmissionError};
pub use file_collector::{FileCollector, RawFile, SelectedFile};
pub use models::PredictionResult;
pub use pipeline::{BatchRunner, PipelineController, PipelineState};
pub use preview::{PreviewGenerator, PreviewRecord};
pub use submitter::{BatchRequest, BatchSubmitter};
