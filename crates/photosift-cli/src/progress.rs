use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use photosift_core::progress::{ProgressReporter, ScanPhase, ScanProgress};
use std::sync::Mutex;
use std::time::Duration;

const REDRAW_EVERY: Duration = Duration::from_millis(120);

/// Terminal progress rendering.
///
/// One bar slot, keyed by the phase that owns it: indeterminate phases
/// get a pulsing dot spinner, the two hash phases get a counted bar fed
/// by the engine's current/total ticks. A tick for a phase that no
/// longer owns the slot is ignored, so late events from worker threads
/// cannot resurrect a finished bar.
pub struct CliReporter {
    slot: Mutex<Option<(ScanPhase, ProgressBar)>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn replace(&self, phase: ScanPhase, pb: ProgressBar) {
        let mut slot = self.slot.lock().unwrap();
        if let Some((_, previous)) = slot.replace((phase, pb)) {
            previous.finish_and_clear();
        }
    }

    fn start_spinner(&self, phase: ScanPhase, message: &str) {
        let pb = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner:.magenta.bold} {wide_msg}")
                .unwrap()
                .tick_strings(&["∙∙∙", "●∙∙", "∙●∙", "∙∙●", "∙∙∙"]),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(REDRAW_EVERY);
        self.replace(phase, pb);
    }

    fn start_bar(&self, phase: ScanPhase, label: &'static str, total: usize) {
        let pb = ProgressBar::new(total as u64).with_style(
            ProgressStyle::with_template(
                "{msg:<12} {wide_bar:.magenta/white.dim} {pos}/{len} {percent:>3}%",
            )
            .unwrap()
            .progress_chars("█▌ "),
        );
        pb.set_message(label);
        pb.enable_steady_tick(REDRAW_EVERY);
        self.replace(phase, pb);
    }

    fn advance(&self, phase: ScanPhase, current: usize) {
        let slot = self.slot.lock().unwrap();
        if let Some((owner, pb)) = slot.as_ref() {
            if *owner == phase {
                pb.set_position(current as u64);
            }
        }
    }

    fn close(&self, outcome: &str, message: &str) {
        let mut slot = self.slot.lock().unwrap();
        if let Some((_, pb)) = slot.take() {
            pb.finish_and_clear();
        }
        eprintln!("{} {}", outcome, message);
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_progress(&self, progress: &ScanProgress) {
        match progress.phase {
            ScanPhase::TrailingHash | ScanPhase::Hashing => {
                if progress.boundary && progress.current == 0 {
                    let label = if progress.phase == ScanPhase::TrailingHash {
                        "quick hash"
                    } else {
                        "full hash"
                    };
                    self.start_bar(progress.phase, label, progress.total);
                } else {
                    self.advance(progress.phase, progress.current);
                }
            }
            ScanPhase::Complete => {
                self.close(&format!("{}", "done".green().bold()), &progress.message);
            }
            ScanPhase::Cancelled => {
                self.close(&format!("{}", "cancelled".yellow().bold()), &progress.message);
            }
            _ => {
                if progress.boundary {
                    self.start_spinner(progress.phase, &progress.message);
                }
            }
        }
    }
}
