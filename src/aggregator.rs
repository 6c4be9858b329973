//! # Result Aggregation Module
//!
//! Questo modulo riduce l'insieme dei risultati in conteggi per categoria e
//! prepara le righe da mostrare per ogni immagine.
//!
//! ## Responsabilità:
//! - `Category`: insieme chiuso delle quattro categorie di classificazione
//! - `summarize()`: conteggi per categoria, validati contro l'insieme chiuso
//! - `to_view_model()`: formattazione della confidence, senza trasformazioni semantiche
//!
//! ## Invarianti:
//! - `summary.total() == results.len()` per ogni insieme di risultati valido
//! - Una categoria sconosciuta o una confidence fuori [0, 100] fa fallire
//!   l'intera aggregazione con `PipelineError::Validation`
//!
//! ## Esempio:
//! ```rust,ignore
//! let summary = summarize(&results)?;
//! info!("{}", summary.format_summary());
//! ```

use crate::error::PipelineError;
use crate::models::PredictionResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of classification outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Glioma,
    Meningioma,
    Notumor,
    Pituitary,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Glioma,
        Category::Meningioma,
        Category::Notumor,
        Category::Pituitary,
    ];

    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Glioma => "glioma",
            Category::Meningioma => "meningioma",
            Category::Notumor => "notumor",
            Category::Pituitary => "pituitary",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Glioma => "Glioma",
            Category::Meningioma => "Meningioma",
            Category::Notumor => "No Tumor",
            Category::Pituitary => "Pituitary",
        }
    }

    fn slot(&self) -> usize {
        match self {
            Category::Glioma => 0,
            Category::Meningioma => 1,
            Category::Notumor => 2,
            Category::Pituitary => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PipelineError::Validation(format!("unknown category '{}'", s)))
    }
}

/// Per-category counts of one result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    counts: [usize; 4],
}

impl BatchSummary {
    pub fn get(&self, category: Category) -> usize {
        self.counts[category.slot()]
    }

    /// Counts in fixed category order
    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn format_summary(&self) -> String {
        let parts: Vec<String> = self
            .iter()
            .map(|(category, count)| format!("{}: {}", category.label(), count))
            .collect();
        format!("Total: {} | {}", self.total(), parts.join(" | "))
    }
}

// Serializzato come mappa categoria -> conteggio, nell'ordine fisso
impl Serialize for BatchSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.as_str(), &count)?;
        }
        map.end()
    }
}

/// Count results per category, rejecting anything outside the known set
pub fn summarize(results: &[PredictionResult]) -> Result<BatchSummary, PipelineError> {
    let mut summary = BatchSummary::default();

    for result in results {
        let category: Category = result.predicted_class.parse().map_err(|_| {
            PipelineError::Validation(format!(
                "unknown category '{}' for {}",
                result.predicted_class, result.filename
            ))
        })?;

        if !result.confidence.is_finite() || !(0.0..=100.0).contains(&result.confidence) {
            return Err(PipelineError::Validation(format!(
                "confidence {} out of range for {}",
                result.confidence, result.filename
            )));
        }

        summary.counts[category.slot()] += 1;
    }

    Ok(summary)
}

/// Presentation row for one result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub filename: String,
    pub predicted_class: String,
    pub display_name: String,
    pub confidence: String,
    pub color: String,
}

pub fn to_view_model(result: &PredictionResult) -> DisplayRow {
    DisplayRow {
        filename: result.filename.clone(),
        predicted_class: result.predicted_class.clone(),
        display_name: result.display_name.clone(),
        confidence: format!("{:.1}%", result.confidence),
        color: result.color.clone(),
    }
}
