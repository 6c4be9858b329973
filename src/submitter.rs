//! # Batch Submitter Module
//!
//! Impacchetta la selezione corrente in una singola richiesta verso il servizio
//! e garantisce che al massimo un batch sia in volo.
//!
//! ## Responsabilità:
//! - `BatchRequest`: snapshot immutabile e ordinato della selezione
//! - Precondizioni: richiesta non vuota, nessun altro invio in corso
//! - Un secondo `submit` durante un invio viene rifiutato (non accodato)
//! - Nessun retry automatico e nessun risultato parziale
//!
//! ## Single-flight:
//! - Flag atomico condiviso tra i cloni del submitter
//! - Rilasciato da un guard RAII su ogni percorso di uscita

use crate::client::PredictionService;
use crate::error::PipelineError;
use crate::file_collector::SelectedFile;
use crate::models::PredictionResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered snapshot of the selection taken at submit time
#[derive(Debug, Clone)]
pub struct BatchRequest {
    files: Arc<[SelectedFile]>,
}

impl BatchRequest {
    pub fn new(files: Vec<SelectedFile>) -> Self {
        Self { files: Arc::from(files) }
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

    pub fn filenames(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name()).collect()
    }
}

/// Clears the in-flight flag when dropped
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends batches through a `PredictionService`, one at a time
#[derive(Clone)]
pub struct BatchSubmitter {
    service: Arc<dyn PredictionService>,
    in_flight: Arc<AtomicBool>,
}

impl BatchSubmitter {
    pub fn new(service: Arc<dyn PredictionService>) -> Self {
        Self {
            service,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit the whole request and return the results exactly as received
    pub async fn submit(&self, request: &BatchRequest) -> Result<Vec<PredictionResult>, PipelineError> {
        if request.is_empty() {
            return Err(PipelineError::Selection("no images selected".to_string()));
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected submission of {} images: another batch is in flight", request.len());
            return Err(PipelineError::Concurrency);
        }
        let _guard = InFlightGuard(self.in_flight.clone());

        info!("Submitting batch of {} images", request.len());
        let results = self.service.predict_batch(request).await?;

        // L'allineamento risultati/file è un contratto del servizio, qui solo segnalato
        if results.len() != request.len() {
            warn!(
                "Service returned {} results for {} submitted images",
                results.len(),
                request.len()
            );
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmissionError;
    use crate::file_collector::FileCollector;
    use crate::test_support::{jpegs, result, Reply, ScriptedService};
    use tokio_test::{assert_err, assert_ok};

    fn request(names: &[&str]) -> BatchRequest {
        BatchRequest::new(FileCollector::new(0).accept(jpegs(names)).unwrap())
    }

    #[tokio::test]
    async fn test_submit_returns_results_in_received_order() {
        let service = Arc::new(ScriptedService::new(vec![Reply::Results(vec![
            result("b.jpg", "notumor"),
            result("a.jpg", "glioma"),
        ])]));
        let submitter = BatchSubmitter::new(service.clone());

        let results = assert_ok!(submitter.submit(&request(&["a.jpg", "b.jpg"])).await);
        assert_eq!(results[0].filename, "b.jpg");
        assert_eq!(results[1].filename, "a.jpg");
        assert_eq!(service.seen(), vec![vec!["a.jpg".to_string(), "b.jpg".to_string()]]);
        assert!(!submitter.is_in_flight());
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_call() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let submitter = BatchSubmitter::new(service.clone());

        let err = assert_err!(submitter.submit(&BatchRequest::new(Vec::new())).await);
        assert!(matches!(err, PipelineError::Selection(_)));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_rejected() {
        let (service, gate) = ScriptedService::gated(vec![Reply::Results(vec![result("a.jpg", "glioma")])]);
        let service = Arc::new(service);
        let submitter = BatchSubmitter::new(service.clone());
        let batch = request(&["a.jpg"]);

        let first = {
            let submitter = submitter.clone();
            let batch = batch.clone();
            tokio::spawn(async move { submitter.submit(&batch).await })
        };

        while !submitter.is_in_flight() {
            tokio::task::yield_now().await;
        }

        let err = assert_err!(submitter.submit(&batch).await);
        assert!(matches!(err, PipelineError::Concurrency));

        gate.notify_one();
        let results = first.await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(service.calls(), 1);
        assert!(!submitter.is_in_flight());
    }

    #[tokio::test]
    async fn test_failure_releases_guard_and_allows_retry() {
        let service = Arc::new(ScriptedService::new(vec![
            Reply::Network,
            Reply::Results(vec![result("a.jpg", "pituitary")]),
        ]));
        let submitter = BatchSubmitter::new(service.clone());
        let batch = request(&["a.jpg"]);

        let err = assert_err!(submitter.submit(&batch).await);
        assert!(matches!(err, PipelineError::Submission(SubmissionError::Network(_))));
        assert!(err.is_retryable());
        assert!(!submitter.is_in_flight());

        let results = assert_ok!(submitter.submit(&batch).await);
        assert_eq!(results[0].predicted_class, "pituitary");
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_yields_no_results() {
        let service = Arc::new(ScriptedService::new(vec![Reply::Malformed]));
        let submitter = BatchSubmitter::new(service);

        let err = assert_err!(submitter.submit(&request(&["a.jpg"])).await);
        assert!(matches!(err, PipelineError::Submission(SubmissionError::MalformedBody(_))));
    }

    #[test]
    fn test_request_keeps_selection_order() {
        let batch = request(&["c.jpg", "a.jpg", "b.jpg"]);
        assert_eq!(batch.filenames(), vec!["c.jpg", "a.jpg", "b.jpg"]);
        assert_eq!(batch.len(), 3);
    }
}
