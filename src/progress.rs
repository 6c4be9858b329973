//! # Progress Reporting Module
//!
//! Feedback visivo della CLI per le due fasi che richiedono attesa.
//!
//! ## Responsabilità:
//! - `PreviewProgress`: una barra per le anteprime, con conteggio di quelle non disponibili
//! - `SubmitSpinner`: spinner mentre il batch è in volo verso il servizio
//! - Entrambi diventano invisibili quando l'output è in formato JSON
//!
//! ## Visual feedback:
//! ```text
//! ⠋ previews [=======================>----------------] 6/10 scan_07.jpg
//! ⠙ Classifying 10 images at http://localhost:5000 [00:00:03]
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

/// Preview generation progress, one step per settled file
pub struct PreviewProgress {
    bar: ProgressBar,
    unavailable: usize,
}

impl PreviewProgress {
    /// `visible == false` draws nothing (JSON mode) but still counts
    pub fn new(pending: u64, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new(pending);
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} previews [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("=>-"));
            }
            bar.enable_steady_tick(TICK);
            bar
        } else {
            let bar = ProgressBar::hidden();
            bar.set_length(pending);
            bar
        };

        Self { bar, unavailable: 0 }
    }

    pub fn ready(&mut self, filename: &str) {
        self.bar.inc(1);
        self.bar.set_message(filename.to_string());
    }

    pub fn unavailable(&mut self, filename: &str, reason: &str) {
        self.unavailable += 1;
        self.bar.inc(1);
        self.bar.set_message(format!("{} (no preview: {})", filename, reason));
    }

    pub fn settled(&self) -> u64 {
        self.bar.position()
    }

    pub fn unavailable_count(&self) -> usize {
        self.unavailable
    }

    /// Close the bar with a per-phase summary line
    pub fn finish(self) -> String {
        let ready = self.settled() as usize - self.unavailable;
        let message = if self.unavailable == 0 {
            format!("{} previews ready", ready)
        } else {
            format!("{} previews ready, {} unavailable", ready, self.unavailable)
        };
        self.bar.finish_with_message(message.clone());
        message
    }
}

/// Spinner shown while one batch request is in flight
pub struct SubmitSpinner {
    bar: Option<ProgressBar>,
}

impl SubmitSpinner {
    pub fn start(file_count: usize, endpoint: &str, visible: bool) -> Self {
        if !visible {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
            bar.set_style(style);
        }
        bar.set_message(format!("Classifying {} images at {}", file_count, endpoint));
        bar.enable_steady_tick(TICK);

        Self { bar: Some(bar) }
    }

    /// Remove the spinner once the response (or the error) is in
    pub fn stop(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_preview_progress_counts_outcomes() {
        let mut progress = PreviewProgress::new(3, false);
        progress.ready("a.jpg");
        progress.unavailable("b.jpg", "Read error: empty");
        progress.ready("c.jpg");

        assert_eq!(progress.settled(), 3);
        assert_eq!(progress.unavailable_count(), 1);
        assert_eq!(progress.finish(), "2 previews ready, 1 unavailable");
    }

    #[test]
    fn test_finish_without_failures() {
        let mut progress = PreviewProgress::new(1, false);
        progress.ready("a.jpg");
        assert_eq!(progress.finish(), "1 previews ready");
    }

    #[test]
    fn test_hidden_spinner_stops_cleanly() {
        SubmitSpinner::start(4, "http://localhost:5000", false).stop();
    }
}
