//! # Pipeline State
//!
//! Stati espliciti della sessione di batch:
//! `Idle → Selecting → Ready → Submitting → { Succeeded | Failed }`.

use crate::aggregator::{to_view_model, BatchSummary, DisplayRow};
use crate::error::PipelineError;
use crate::models::PredictionResult;

/// Results of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<PredictionResult>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    pub fn rows(&self) -> Vec<DisplayRow> {
        self.results.iter().map(to_view_model).collect()
    }
}

/// What the user sees after a failed submission
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub message: String,
    pub retryable: bool,
}

impl From<&PipelineError> for Failure {
    fn from(error: &PipelineError) -> Self {
        Self {
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Selecting,
    Ready,
    Submitting,
    Succeeded(BatchOutcome),
    Failed(Failure),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Selecting => "selecting",
            PipelineState::Ready => "ready",
            PipelineState::Submitting => "submitting",
            PipelineState::Succeeded(_) => "succeeded",
            PipelineState::Failed(_) => "failed",
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, PipelineState::Submitting)
    }

    pub fn outcome(&self) -> Option<&BatchOutcome> {
        match self {
            PipelineState::Succeeded(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            PipelineState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}
