//! # Scan Batch - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione da file e override dai flag CLI
//! - Dispatch dei sottocomandi `batch`, `single` e `health`
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (endpoint, limite batch, anteprime, etc.)
//! 2. Carica `~/.scan-batch/config.json` (o il file passato con `--config`)
//! 3. Applica gli override e valida la configurazione
//! 4. Configura il logging (INFO o DEBUG a seconda del flag verbose, su stderr
//!    quando gli eventi JSON occupano stdout, sia da flag che da file)
//! 5. Esegue il sottocomando richiesto
//!
//! ## Esempio di utilizzo:
//! ```bash
//! scan-batch --endpoint http://10.0.0.4:5000 batch /path/to/scans --preview-size 256
//! scan-batch single /path/to/scan.jpg --json
//! scan-batch health
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use scan_batch::{BatchRunner, Config, FileCollector, HttpPredictionClient, RawFile};

#[derive(Parser)]
#[command(name = "scan-batch")]
#[command(about = "Classify batches of brain MRI scans through a remote prediction service")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (default: ~/.scan-batch/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the classification service
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Maximum images per batch (0 = unlimited)
    #[arg(short, long, global = true)]
    max_batch_size: Option<usize>,

    /// Number of previews generated in parallel
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Downscale previews to fit this many pixels per side
    #[arg(long, global = true)]
    preview_size: Option<u32>,

    /// Request timeout in seconds
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    /// Output progress and results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Write the effective configuration back to the config file
    #[arg(long, global = true)]
    save_config: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Classify every image found in the given files and directories as one batch
    Batch {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Classify one image and print the per-class probabilities
    Single {
        /// Image file
        path: PathBuf,
    },
    /// Check that the service is up and the model is loaded
    Health,
}

impl Args {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(max_batch_size) = self.max_batch_size {
            config.max_batch_size = max_batch_size;
        }
        if let Some(workers) = self.workers {
            config.preview_workers = workers;
        }
        if let Some(size) = self.preview_size {
            config.preview_max_dimension = Some(size);
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        if self.json {
            config.json_output = true;
        }
    }
}

/// Effective configuration: file (or defaults) plus CLI overrides
async fn load_config(args: &Args) -> Result<(Option<PathBuf>, Config)> {
    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok((config_path, config))
}

/// Log to stderr whenever JSON events own stdout
fn init_logging(verbose: bool, json_output: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    if json_output {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config_path, config) = load_config(&args).await?;
    init_logging(args.verbose, config.json_output)?;

    if args.save_config {
        match &config_path {
            Some(path) => {
                config.save_to_file(path).await?;
                info!("Saved configuration to {}", path.display());
            }
            None => warn!("No home directory found, configuration not saved"),
        }
    }

    match &args.command {
        Command::Batch { paths } => {
            let mut runner = BatchRunner::new(config)?;
            runner.run(paths).await?;
        }
        Command::Single { path } => {
            if !path.is_file() {
                return Err(anyhow::anyhow!("Image file does not exist: {}", path.display()));
            }

            let mut collector = FileCollector::new(1);
            let selected = collector.accept(vec![RawFile::from_path(path.clone())])?;
            let file = selected
                .first()
                .ok_or_else(|| anyhow::anyhow!("Not an image file: {}", path.display()))?;

            let client = HttpPredictionClient::new(&config)?;
            let prediction = client.predict_single(file).await?;

            if config.json_output {
                println!("{}", serde_json::to_string(&prediction)?);
            } else {
                info!(
                    "{}: {} ({:.1}%) on {}",
                    file.name(),
                    prediction.predicted_class_name,
                    prediction.confidence,
                    prediction.device
                );
                for class in &prediction.predictions {
                    info!("  {:<12} {:>6.2}%  {}", class.class_name, class.probability, class.info.severity);
                }
            }
        }
        Command::Health => {
            let client = HttpPredictionClient::new(&config)?;
            let health = client.health().await?;

            if config.json_output {
                println!("{}", serde_json::to_string(&health)?);
            } else {
                info!(
                    "Service at {} is {} (model loaded: {}, device: {})",
                    client.base_url(),
                    health.status,
                    health.model_loaded,
                    health.device.as_deref().unwrap_or("unknown")
                );
            }

            if !health.model_loaded {
                return Err(anyhow::anyhow!("Model is not loaded on {}", client.base_url()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_output_from_config_file_without_flag() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "json_output": true }"#).await.unwrap();

        let args = Args::try_parse_from([
            "scan-batch",
            "--config",
            config_path.to_str().unwrap(),
            "batch",
            "/scans",
        ])
        .unwrap();
        assert!(!args.json);

        let (path, config) = load_config(&args).await.unwrap();
        assert_eq!(path, Some(config_path));
        assert!(config.json_output);
    }

    #[tokio::test]
    async fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "max_batch_size": 3, "endpoint": "http://a:1" }"#)
            .await
            .unwrap();

        let args = Args::try_parse_from([
            "scan-batch",
            "health",
            "--config",
            config_path.to_str().unwrap(),
            "--endpoint",
            "http://b:2",
            "--json",
        ])
        .unwrap();

        let (_, config) = load_config(&args).await.unwrap();
        assert_eq!(config.endpoint, "http://b:2");
        assert_eq!(config.max_batch_size, 3);
        assert!(config.json_output);
    }
}
