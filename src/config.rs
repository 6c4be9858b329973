//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione del client batch.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri della pipeline
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `endpoint`: URL base del servizio di classificazione (default: "http://localhost:5000")
//! - `max_batch_size`: Numero massimo di immagini per batch (default: 10, 0 = illimitato)
//! - `preview_workers`: Anteprime generate in parallelo (default: 4)
//! - `preview_max_dimension`: Lato massimo dell'anteprima ridimensionata (default: None = bytes originali)
//! - `request_timeout_secs`: Timeout della richiesta HTTP (default: 120)
//! - `json_output`: Eventi JSON su stdout invece dei log (default: false)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     endpoint: "http://10.0.0.4:5000".to_string(),
//!     max_batch_size: 25,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a batch session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the classification service
    pub endpoint: String,
    /// Maximum number of images in one selection (0 = unlimited)
    pub max_batch_size: usize,
    /// Number of previews generated concurrently
    pub preview_workers: usize,
    /// Downscale previews to fit this bound (None = embed original bytes)
    pub preview_max_dimension: Option<u32>,
    /// Transport timeout for service requests
    pub request_timeout_secs: u64,
    /// Output progress and results as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            max_batch_size: 10,
            preview_workers: 4,
            preview_max_dimension: None,
            request_timeout_secs: 120,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(anyhow::anyhow!("Service endpoint must not be empty"));
        }

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(anyhow::anyhow!("Service endpoint must be an http(s) URL: {}", endpoint));
        }

        if self.preview_workers == 0 {
            return Err(anyhow::anyhow!("Number of preview workers must be greater than 0"));
        }

        if self.preview_max_dimension == Some(0) {
            return Err(anyhow::anyhow!("Preview dimension must be greater than 0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0 seconds"));
        }

        Ok(())
    }

    /// Endpoint without trailing slash, ready for path concatenation
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }

    /// Default location of the configuration file (~/.scan-batch/config.json)
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".scan-batch").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.endpoint = "ftp://scanner".to_string();
        assert!(config.validate().is_err());

        config.endpoint = "http://localhost:5000".to_string();
        config.preview_workers = 0;
        assert!(config.validate().is_err());

        config.preview_workers = 2;
        config.preview_max_dimension = Some(0);
        assert!(config.validate().is_err());

        config.preview_max_dimension = Some(256);
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://localhost:5000");
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.preview_workers, 4);
        assert_eq!(config.preview_max_dimension, None);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(!config.json_output);
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let config = Config {
            endpoint: " https://scans.example.org/ ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://scans.example.org");
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.max_batch_size, 10);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            endpoint: "http://10.0.0.4:5000".to_string(),
            max_batch_size: 25,
            preview_workers: 8,
            preview_max_dimension: Some(320),
            request_timeout_secs: 30,
            json_output: true,
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.endpoint, "http://10.0.0.4:5000");
        assert_eq!(loaded_config.max_batch_size, 25);
        assert_eq!(loaded_config.preview_workers, 8);
        assert_eq!(loaded_config.preview_max_dimension, Some(320));
        assert_eq!(loaded_config.request_timeout_secs, 30);
        assert!(loaded_config.json_output);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults_for_missing_keys() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "max_batch_size": 3 }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.max_batch_size, 3);
        assert_eq!(config.preview_workers, 4);
    }
}
