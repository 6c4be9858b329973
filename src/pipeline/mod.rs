//! # Pipeline Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `controller`: Macchina a stati della sessione di batch
//! - `state`: Stati e payload (risultati, fallimento)
//! - `runner`: Sessione completa per la CLI (progress, log, JSON)

pub mod controller;
pub mod runner;
pub mod state;

pub use controller::PipelineController;
pub use runner::BatchRunner;
pub use state::{BatchOutcome, Failure, PipelineState};
