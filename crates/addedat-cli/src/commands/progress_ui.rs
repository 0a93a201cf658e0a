use addedat_core::{ItemOutcome, ItemProgress};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Progress bar on a terminal, structured log lines otherwise.
pub struct ProgressUi {
    bar: ProgressBar,
    interactive: bool,
    label: String,
}

impl ProgressUi {
    /// Percent-driven bar for page walks.
    pub fn percent(label: &str, enabled: bool) -> Self {
        Self::build(
            label,
            100,
            enabled,
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent}% {msg}",
        )
    }

    /// Item-driven bar for batch updates.
    pub fn items(label: &str, total: usize, enabled: bool) -> Self {
        Self::build(
            label,
            total as u64,
            enabled,
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
    }

    fn build(label: &str, len: u64, enabled: bool, template: &str) -> Self {
        let interactive = enabled && is_interactive();
        let bar = if interactive {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(template)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▉▊▋▌▍▎▏  "),
            );
            bar.set_message(label.to_string());
            bar
        } else {
            ProgressBar::hidden()
        };

        if !interactive {
            tracing::debug!(operation = "ui_init", mode = "non_interactive", "Progress bars disabled");
        }

        Self {
            bar,
            interactive,
            label: label.to_string(),
        }
    }

    pub fn set_percent(&self, percent: u8) {
        if self.interactive {
            self.bar.set_position(u64::from(percent));
        } else {
            tracing::info!(operation = "progress", percent = percent, "{}", self.label);
        }
    }

    pub fn item_done(&self, progress: &ItemProgress) {
        if self.interactive {
            self.bar.set_position(progress.index as u64);
            if let ItemOutcome::Failed { error, .. } = &progress.outcome {
                self.bar
                    .println(format!("[{}/{}] Failed id={}: {}", progress.index, progress.total, progress.rating_key, error));
            }
        } else {
            tracing::info!(
                operation = "progress",
                current = progress.index,
                total = progress.total,
                percent = progress.percent(),
                rating_key = %progress.rating_key,
                success = progress.outcome.is_success(),
                "{}",
                self.label
            );
        }
    }

    pub fn finish(&self) {
        if self.interactive {
            self.bar.finish_and_clear();
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
