//! Helpers shared by the unit tests: fixture builders and a scripted
//! `PredictionService` that never touches the network.

use crate::client::PredictionService;
use crate::error::SubmissionError;
use crate::file_collector::RawFile;
use crate::models::{BatchResponse, PredictionResult};
use crate::submitter::BatchRequest;
use futures::future::{BoxFuture, FutureExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub(crate) fn jpegs(names: &[&str]) -> Vec<RawFile> {
    names
        .iter()
        .map(|name| RawFile::from_bytes(name, "image/jpeg", name.as_bytes().to_vec()))
        .collect()
}

pub(crate) fn result(filename: &str, class: &str) -> PredictionResult {
    PredictionResult {
        filename: filename.to_string(),
        predicted_class: class.to_string(),
        display_name: class.to_string(),
        confidence: 91.5,
        color: "#10b981".to_string(),
        severity: None,
    }
}

pub(crate) enum Reply {
    Results(Vec<PredictionResult>),
    Network,
    Status(u16),
    Malformed,
}

impl Reply {
    fn into_result(self) -> Result<Vec<PredictionResult>, SubmissionError> {
        match self {
            Reply::Results(results) => Ok(results),
            // builder error: a real reqwest::Error without any I/O
            Reply::Network => Err(reqwest::Client::new().get("not a url").build().unwrap_err().into()),
            Reply::Status(status) => Err(SubmissionError::Status {
                status,
                message: "scripted failure".to_string(),
            }),
            Reply::Malformed => Err(serde_json::from_str::<BatchResponse>("{").unwrap_err().into()),
        }
    }
}

/// Replies from a script, records what it was asked
pub(crate) struct ScriptedService {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedService {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Every call blocks until the returned `Notify` is signalled
    pub(crate) fn gated(replies: Vec<Reply>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut service = Self::new(replies);
        service.gate = Some(gate.clone());
        (service, gate)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

impl PredictionService for ScriptedService {
    fn predict_batch<'a>(
        &'a self,
        request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<Vec<PredictionResult>, SubmissionError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push(request.filenames().into_iter().map(str::to_string).collect());

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Status(500));
            reply.into_result()
        }
        .boxed()
    }
}
