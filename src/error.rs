//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore della pipeline di batch.
//!
//! ## Responsabilità:
//! - Definisce `PipelineError` per categorizzare gli errori visibili al chiamante
//! - Separa gli errori di rete/protocollo in `SubmissionError`
//! - Isola gli errori di anteprima in `PreviewError` (mai propagati al batch)
//! - Integra con `thiserror` per conversioni automatiche
//!
//! ## Categorie di errori:
//! - `Selection`: submit su selezione vuota o limite batch superato
//! - `Concurrency`: operazione tentata mentre un batch è in volo
//! - `NotSubmitting`: esito consegnato senza un invio in corso
//! - `Submission`: rete, status HTTP non 2xx, body non parsabile
//! - `Validation`: categoria sconosciuta o confidence fuori range
//!
//! ## Esempio:
//! ```rust,ignore
//! if request.is_empty() {
//!     return Err(PipelineError::Selection("nothing to submit".to_string()));
//! }
//! ```

/// Errors surfaced by pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Selection error: {0}")]
    Selection(String),

    #[error("A batch submission is already in flight")]
    Concurrency,

    #[error("No batch submission is in progress")]
    NotSubmitting,

    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Result validation error: {0}")]
    Validation(String),
}

impl PipelineError {
    /// Failures the user can retry without changing the selection.
    /// An unreadable selected file fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Submission(SubmissionError::Payload { .. }) => false,
            PipelineError::Submission(_) => true,
            _ => false,
        }
    }
}

/// Failure talking to the classification service
#[derive(thiserror::Error, Debug)]
pub enum SubmissionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Failed to read {filename}: {source}")]
    Payload {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// Per-file preview failure, reported as "no preview available" for that index
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PreviewError {
    #[error("Read error: {0}")]
    Read(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Preview task aborted: {0}")]
    Aborted(String),
}
