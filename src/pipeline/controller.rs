//! # Pipeline Controller
//!
//! Orchestratore della sessione di batch: possiede lo stato autorevole e
//! applica ogni transizione in modo esplicito.
//!
//! ## Transizioni:
//! - `accept`: qualunque stato tranne `Submitting` → `Ready` (o `Selecting` se vuoto),
//!   i risultati precedenti vengono scartati
//! - `begin_submit`: `Ready`/`Succeeded`/`Failed` → `Submitting`
//! - `finish_submit`: `Submitting` → `Succeeded` o `Failed`, rifiutato negli altri stati
//! - `submit` interrotto (future droppato): `Submitting` → `Failed` ritentabile
//! - `remove`/`clear`: qualunque stato tranne `Submitting`; selezione vuota → `Selecting`
//!
//! ## Anteprime:
//! - Ogni file accettato apre uno slot e avvia un task di anteprima
//! - Gli outcome arrivano su un canale e vengono applicati per indice

use crate::aggregator::{summarize, BatchSummary};
use crate::client::PredictionService;
use crate::config::Config;
use crate::error::PipelineError;
use crate::file_collector::{FileCollector, RawFile, SelectedFile};
use crate::models::PredictionResult;
use crate::pipeline::state::{BatchOutcome, Failure, PipelineState};
use crate::preview::{PreviewGenerator, PreviewOutcome, PreviewStore};
use crate::submitter::{BatchRequest, BatchSubmitter};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Moves a dropped submission from `Submitting` to a retryable `Failed`
struct SubmittingGuard<'a> {
    state: &'a mut PipelineState,
    armed: bool,
}

impl<'a> SubmittingGuard<'a> {
    fn new(state: &'a mut PipelineState) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.state.is_submitting() {
            warn!("Batch submission cancelled before a response arrived");
            *self.state = PipelineState::Failed(Failure {
                message: "submission cancelled before a response arrived".to_string(),
                retryable: true,
            });
        }
    }
}

pub struct PipelineController {
    state: PipelineState,
    collector: FileCollector,
    previews: PreviewStore,
    generator: PreviewGenerator,
    preview_rx: mpsc::UnboundedReceiver<PreviewOutcome>,
    submitter: BatchSubmitter,
}

impl PipelineController {
    /// Must be called inside a tokio runtime: previews are spawned on it
    pub fn new(config: &Config, service: Arc<dyn PredictionService>) -> Self {
        let (generator, preview_rx) = PreviewGenerator::new(config.preview_workers, config.preview_max_dimension);

        Self {
            state: PipelineState::Idle,
            collector: FileCollector::new(config.max_batch_size),
            previews: PreviewStore::new(),
            generator,
            preview_rx,
            submitter: BatchSubmitter::new(service),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn selection(&self) -> &[SelectedFile] {
        self.collector.files()
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    fn ensure_not_submitting(&self) -> Result<(), PipelineError> {
        if self.state.is_submitting() {
            return Err(PipelineError::Concurrency);
        }
        Ok(())
    }

    fn settle_selection_state(&mut self) {
        self.state = if self.collector.is_empty() {
            PipelineState::Selecting
        } else {
            PipelineState::Ready
        };
    }

    /// Add files to the selection and start their previews
    pub fn accept<I>(&mut self, raw_files: I) -> Result<Vec<SelectedFile>, PipelineError>
    where
        I: IntoIterator<Item = RawFile>,
    {
        self.ensure_not_submitting()?;

        let accepted = self.collector.accept(raw_files)?;
        for file in &accepted {
            self.previews.register(file.index());
            self.generator.spawn(file.clone());
        }

        self.settle_selection_state();
        info!(
            "Accepted {} images ({} selected, state: {})",
            accepted.len(),
            self.collector.len(),
            self.state.name()
        );
        Ok(accepted)
    }

    /// Drop one file and its preview. Returns false for unknown indices.
    pub fn remove(&mut self, index: usize) -> Result<bool, PipelineError> {
        self.ensure_not_submitting()?;

        if !self.collector.remove(index) {
            return Ok(false);
        }
        self.previews.remove(index);
        self.settle_selection_state();
        debug!("Removed file #{} ({} left)", index, self.collector.len());
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), PipelineError> {
        self.ensure_not_submitting()?;

        self.collector.clear();
        self.previews.clear();
        self.state = PipelineState::Selecting;
        Ok(())
    }

    /// Enter `Submitting` and snapshot the selection
    pub fn begin_submit(&mut self) -> Result<BatchRequest, PipelineError> {
        self.ensure_not_submitting()?;

        if self.collector.is_empty() {
            return Err(PipelineError::Selection("no images selected".to_string()));
        }

        self.state = PipelineState::Submitting;
        Ok(BatchRequest::new(self.collector.files().to_vec()))
    }

    /// Leave `Submitting` with the outcome of the request
    pub fn finish_submit(
        &mut self,
        outcome: Result<Vec<PredictionResult>, PipelineError>,
    ) -> Result<BatchSummary, PipelineError> {
        if !self.state.is_submitting() {
            warn!("Ignoring batch outcome in state {}", self.state.name());
            return Err(PipelineError::NotSubmitting);
        }

        let aggregated = outcome.and_then(|results| summarize(&results).map(|summary| (results, summary)));

        match aggregated {
            Ok((results, summary)) => {
                info!("Batch succeeded: {}", summary.format_summary());
                self.state = PipelineState::Succeeded(BatchOutcome { results, summary });
                Ok(summary)
            }
            Err(e) => {
                warn!("Batch failed: {}", e);
                self.state = PipelineState::Failed(Failure::from(&e));
                Err(e)
            }
        }
    }

    /// Submit the current selection and aggregate the response
    pub async fn submit(&mut self) -> Result<BatchSummary, PipelineError> {
        let request = self.begin_submit()?;
        let submitter = self.submitter.clone();

        let outcome = {
            let guard = SubmittingGuard::new(&mut self.state);
            let outcome = submitter.submit(&request).await;
            guard.disarm();
            outcome
        };

        self.finish_submit(outcome)
    }

    /// Apply one preview outcome by file index
    pub fn apply_preview(&mut self, outcome: PreviewOutcome) -> bool {
        self.previews.apply(outcome)
    }

    /// Apply every outcome already delivered, without waiting
    pub fn poll_previews(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.preview_rx.try_recv() {
            if self.previews.apply(outcome) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next preview of a live file; None once nothing is pending
    pub async fn settle_next_preview(&mut self) -> Option<usize> {
        while self.previews.pending_count() > 0 {
            let outcome = self.preview_rx.recv().await?;
            let file_index = outcome.file_index;
            if self.previews.apply(outcome) {
                return Some(file_index);
            }
        }
        None
    }

    pub async fn wait_for_previews(&mut self) {
        while self.settle_next_preview().await.is_some() {}
    }
}
