//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico.
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout
//! - Riusa i tipi della pipeline (`DisplayRow`, `BatchSummary`)
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio sessione (file trovati, file accettati, endpoint)
//! - `preview`: Anteprima pronta o non disponibile per un file
//! - `submit`: Invio del batch al servizio
//! - `result`: Riga di risultato per una singola immagine
//! - `summary`: Conteggi per categoria e durata
//! - `error`: Errore della sessione

use crate::aggregator::{BatchSummary, DisplayRow};
use crate::config::Config;
use serde::Serialize;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        files_found: usize,
        files_accepted: usize,
        config: JsonConfig,
    },

    Preview {
        file_index: usize,
        filename: String,
        available: bool,
        error: Option<String>,
    },

    Submit {
        file_count: usize,
    },

    Result {
        #[serde(flatten)]
        row: DisplayRow,
    },

    Summary {
        summary: BatchSummary,
        total: usize,
        duration_seconds: f64,
    },

    Error {
        message: String,
        retryable: bool,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub endpoint: String,
    pub max_batch_size: usize,
    pub preview_max_dimension: Option<u32>,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(files_found: usize, files_accepted: usize, config: JsonConfig) -> Self {
        Self::Start {
            files_found,
            files_accepted,
            config,
        }
    }

    pub fn preview(file_index: usize, filename: &str, error: Option<String>) -> Self {
        Self::Preview {
            file_index,
            filename: filename.to_string(),
            available: error.is_none(),
            error,
        }
    }

    pub fn submit(file_count: usize) -> Self {
        Self::Submit { file_count }
    }

    pub fn result(row: DisplayRow) -> Self {
        Self::Result { row }
    }

    pub fn summary(summary: BatchSummary, duration_seconds: f64) -> Self {
        Self::Summary {
            total: summary.total(),
            summary,
            duration_seconds,
        }
    }

    pub fn error(message: String, retryable: bool) -> Self {
        Self::Error { message, retryable }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            endpoint: config.base_url().to_string(),
            max_batch_size: config.max_batch_size,
            preview_max_dimension: config.preview_max_dimension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{summarize, to_view_model};
    use crate::test_support::result;

    #[test]
    fn test_result_row_is_flattened() {
        let message = JsonMessage::result(to_view_model(&result("a.jpg", "glioma")));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["filename"], "a.jpg");
        assert_eq!(value["confidence"], "91.5%");
    }

    #[test]
    fn test_summary_message_includes_total() {
        let summary = summarize(&[result("a.jpg", "notumor"), result("b.jpg", "notumor")]).unwrap();
        let value = serde_json::to_value(JsonMessage::summary(summary, 1.5)).unwrap();
        assert_eq!(value["type"], "summary");
        assert_eq!(value["total"], 2);
        assert_eq!(value["summary"]["notumor"], 2);
    }

    #[test]
    fn test_preview_failure_is_unavailable() {
        let value = serde_json::to_value(JsonMessage::preview(3, "x.jpg", Some("Read error".to_string()))).unwrap();
        assert_eq!(value["type"], "preview");
        assert_eq!(value["available"], false);
        assert_eq!(value["file_index"], 3);
    }
}
