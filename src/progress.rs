use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::tracker::TrackingProgress;

pub fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:<10} {bar:40.cyan/blue} {percent:>3}% {pos}/{len} frames [{elapsed_precise}<{eta_precise}] {msg}",
    )
    .expect("invalid progress bar template")
}

pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<10} {spinner:.cyan.bold} [{elapsed_precise}] {msg}")
        .expect("invalid spinner template")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

/// Spinner for steps without a frame count, such as background estimation.
pub fn spinner(label: &'static str, message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(spinner_style());
    bar.set_prefix(label);
    bar.set_message(message.into());
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

/// Drives a progress bar from tracker notifications until the sender side
/// is dropped.
pub fn spawn_monitor(
    label: &'static str,
    total_frames: u64,
    mut updates: UnboundedReceiver<TrackingProgress>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut monitor = ProgressMonitor::new(label, total_frames);
        while let Some(progress) = updates.recv().await {
            monitor.observe(progress);
        }
        monitor.finish();
    })
}

struct ProgressMonitor {
    bar: ProgressBar,
    total_frames: u64,
    completed: u64,
    started: Instant,
}

impl ProgressMonitor {
    fn new(label: &'static str, total_frames: u64) -> Self {
        let bar = ProgressBar::new(total_frames);
        bar.set_style(bar_style());
        bar.set_prefix(label);
        Self {
            bar,
            total_frames,
            completed: 0,
            started: Instant::now(),
        }
    }

    fn observe(&mut self, progress: TrackingProgress) {
        self.completed = progress.completed as u64;
        self.bar.set_position(self.completed.min(self.total_frames));
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = self.completed as f64 / elapsed;
            self.bar.set_message(format!("{rate:.1} fps"));
        }
    }

    fn finish(&mut self) {
        if self.completed >= self.total_frames {
            self.bar.finish_with_message(format!(
                "processed {}/{} frames",
                self.total_frames, self.total_frames
            ));
        } else {
            self.bar
                .abandon_with_message(format!("stopped after {} frames", self.completed));
        }
    }
}
