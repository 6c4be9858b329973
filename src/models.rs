//! # Wire Types Module
//!
//! Strutture dei payload JSON scambiati con il servizio di classificazione.
//! Il client le riceve soltanto, non le produce mai.
//!
//! ## Endpoint:
//! - `POST /api/predict-batch` → `BatchResponse`
//! - `POST /api/predict` → `SinglePrediction`
//! - `GET /api/health` → `HealthStatus`
//!
//! I campi extra (`success`, `timestamp`, `report`, ...) vengono ignorati.

use serde::{Deserialize, Serialize};

/// One classified image of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub filename: String,
    /// Raw category string, validated during aggregation
    pub predicted_class: String,
    #[serde(rename = "predicted_class_name")]
    pub display_name: String,
    /// Percentage, 0-100
    pub confidence: f64,
    /// CSS hex color
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<PredictionResult>,
}

/// Response of the single-image endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePrediction {
    pub predicted_class_name: String,
    pub confidence: f64,
    pub predictions: Vec<ClassProbability>,
    pub device: String,
}

impl SinglePrediction {
    /// Entry with the highest probability
    pub fn top(&self) -> Option<&ClassProbability> {
        self.predictions
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub class: String,
    #[serde(rename = "className")]
    pub class_name: String,
    /// Percentage, 0-100
    pub probability: f64,
    pub info: ClassInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub color: String,
    pub description: String,
    pub severity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub model_loaded: bool,
}

/// Body of a non-2xx response
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
