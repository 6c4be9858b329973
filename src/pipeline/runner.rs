//! # Batch Runner
//!
//! Sessione completa per la CLI, che delega ogni transizione al controller.
//!
//! ## Flusso:
//! 1. Raccoglie i file dai path indicati (directory ricorsive)
//! 2. Accetta le immagini nella selezione e avvia le anteprime
//! 3. Attende le anteprime mostrando il progresso
//! 4. Invia il batch una sola volta e aggrega i risultati
//! 5. Stampa righe e riepilogo (log o JSON)

use crate::aggregator::BatchSummary;
use crate::client::{HttpPredictionClient, PredictionService};
use crate::config::Config;
use crate::error::PipelineError;
use crate::file_collector::FileCollector;
use crate::json_output::{JsonConfig, JsonMessage};
use crate::pipeline::controller::PipelineController;
use crate::pipeline::state::BatchOutcome;
use crate::preview::PreviewSlot;
use crate::progress::{PreviewProgress, SubmitSpinner};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct BatchRunner {
    config: Config,
    controller: PipelineController,
}

impl BatchRunner {
    /// Runner talking to the configured HTTP endpoint
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = HttpPredictionClient::new(&config)?;
        Ok(Self::with_service(config, Arc::new(client)))
    }

    pub fn with_service(config: Config, service: Arc<dyn PredictionService>) -> Self {
        let controller = PipelineController::new(&config, service);
        Self { config, controller }
    }

    pub fn controller(&self) -> &PipelineController {
        &self.controller
    }

    /// Run one batch session over `paths`. Returns None when no image was found.
    pub async fn run(&mut self, paths: &[PathBuf]) -> Result<Option<BatchSummary>> {
        let start_time = Instant::now();

        let raw_files = FileCollector::collect_paths(paths)?;
        let files_found = raw_files.len();

        let accepted = match self.controller.accept(raw_files) {
            Ok(accepted) => accepted,
            Err(e) => return Err(self.report_error(e)),
        };

        self.emit_start_message(files_found, accepted.len());

        if accepted.is_empty() {
            if !self.config.json_output {
                info!("No images found to classify");
            }
            return Ok(None);
        }

        self.collect_previews().await;

        let file_count = self.controller.selection().len();
        if self.config.json_output {
            JsonMessage::submit(file_count).emit();
        }
        let spinner = SubmitSpinner::start(file_count, self.config.base_url(), !self.config.json_output);

        let outcome = self.controller.submit().await;
        spinner.stop();

        match outcome {
            Ok(summary) => {
                if let Some(outcome) = self.controller.state().outcome() {
                    self.print_results(outcome, start_time.elapsed().as_secs_f64());
                }
                Ok(Some(summary))
            }
            Err(e) => Err(self.report_error(e)),
        }
    }

    fn emit_start_message(&self, files_found: usize, files_accepted: usize) {
        if self.config.json_output {
            JsonMessage::start(files_found, files_accepted, JsonConfig::from(&self.config)).emit();
        } else {
            info!("Service endpoint: {}", self.config.base_url());
            if self.config.max_batch_size > 0 {
                info!("Batch limit: {} images", self.config.max_batch_size);
            }
            info!(
                "Found {} files, {} images selected",
                files_found, files_accepted
            );
        }
    }

    /// Wait for every preview, reporting each as it settles
    async fn collect_previews(&mut self) {
        let pending = self.controller.previews().pending_count() as u64;
        let mut progress = PreviewProgress::new(pending, !self.config.json_output);

        while let Some(file_index) = self.controller.settle_next_preview().await {
            let filename = self
                .controller
                .selection()
                .iter()
                .find(|f| f.index() == file_index)
                .map(|f| f.name().to_string())
                .unwrap_or_default();

            let error = match self.controller.previews().slot(file_index) {
                Some(PreviewSlot::Unavailable(e)) => Some(e.to_string()),
                _ => None,
            };

            match &error {
                Some(e) => progress.unavailable(&filename, e),
                None => progress.ready(&filename),
            }
            if self.config.json_output {
                JsonMessage::preview(file_index, &filename, error).emit();
            }
        }

        let message = progress.finish();
        if !self.config.json_output {
            info!("{}", message);
        }
    }

    fn print_results(&self, outcome: &BatchOutcome, duration: f64) {
        let rows = outcome.rows();

        if self.config.json_output {
            for row in rows {
                JsonMessage::result(row).emit();
            }
            JsonMessage::summary(outcome.summary, duration).emit();
            return;
        }

        info!("=== Individual Results ===");
        for row in &rows {
            info!(
                "{:<32} {:<16} {:>7}  {}",
                row.filename, row.display_name, row.confidence, row.color
            );
        }
        info!("=== Batch Summary ===");
        for (category, count) in outcome.summary.iter() {
            info!("{:<12} {}", category.label(), count);
        }
        info!("Completed in {:.2}s", duration);
    }

    /// Surface a failure to the user and turn it into the caller's error
    fn report_error(&self, e: PipelineError) -> anyhow::Error {
        let retryable = e.is_retryable();
        if self.config.json_output {
            JsonMessage::error(e.to_string(), retryable).emit();
        } else if retryable {
            warn!("{} - the selection is kept, run again to retry", e);
        } else {
            error!("{}", e);
        }
        e.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Category;
    use crate::pipeline::state::PipelineState;
    use crate::test_support::{result, Reply, ScriptedService};
    use tempfile::TempDir;

    fn runner(dir: &TempDir, replies: Vec<Reply>, max_batch_size: usize) -> (BatchRunner, Arc<ScriptedService>) {
        let service = Arc::new(ScriptedService::new(replies));
        let config = Config {
            max_batch_size,
            json_output: true,
            ..Default::default()
        };
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("b.png"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();
        (BatchRunner::with_service(config, service.clone()), service)
    }

    #[tokio::test]
    async fn test_run_submits_images_only() {
        let dir = TempDir::new().unwrap();
        let (mut runner, service) = runner(
            &dir,
            vec![Reply::Results(vec![result("a.jpg", "glioma"), result("b.png", "notumor")])],
            10,
        );

        let summary = runner.run(&[dir.path().to_path_buf()]).await.unwrap().unwrap();
        assert_eq!(summary.get(Category::Glioma), 1);
        assert_eq!(summary.get(Category::Notumor), 1);
        assert_eq!(service.seen(), vec![vec!["a.jpg", "b.png"]]);
        assert_eq!(runner.controller().previews().records().len(), 2);
    }

    #[tokio::test]
    async fn test_run_failure_keeps_selection() {
        let dir = TempDir::new().unwrap();
        let (mut runner, _) = runner(&dir, vec![Reply::Status(500)], 10);

        let err = runner.run(&[dir.path().to_path_buf()]).await.unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
        assert!(matches!(runner.controller().state(), PipelineState::Failed(_)));
        assert_eq!(runner.controller().selection().len(), 2);
    }

    #[tokio::test]
    async fn test_run_over_limit_makes_no_call() {
        let dir = TempDir::new().unwrap();
        let (mut runner, service) = runner(&dir, vec![], 1);

        assert!(runner.run(&[dir.path().to_path_buf()]).await.is_err());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_without_images_returns_none() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"# scans").unwrap();
        let service = Arc::new(ScriptedService::new(vec![]));
        let config = Config {
            json_output: true,
            ..Default::default()
        };
        let mut runner = BatchRunner::with_service(config, service.clone());

        assert!(runner.run(&[dir.path().to_path_buf()]).await.unwrap().is_none());
        assert_eq!(service.calls(), 0);
    }
}
