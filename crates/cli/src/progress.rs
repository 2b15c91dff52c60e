//! Terminal progress bar for job runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use nodes::ProgressObserver;

/// Draws one bar per job on stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Creates a bar labelled with the job name. A hidden bar draws nothing.
    pub fn new(job: &str, visible: bool) -> Self {
        let bar = ProgressBar::with_draw_target(
            Some(0),
            if visible {
                ProgressDrawTarget::stderr()
            } else {
                ProgressDrawTarget::hidden()
            },
        );
        let style = ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
        bar.set_style(style);
        bar.set_prefix(job.to_string());
        Self { bar }
    }
}

impl ProgressObserver for BarProgress {
    fn started(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn item_finished(&self, item: &str) {
        self.bar.set_message(item.to_string());
        self.bar.inc(1);
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}
