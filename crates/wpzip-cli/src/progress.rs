//! Transfer progress rendered with `indicatif`.

use indicatif::{ProgressBar, ProgressStyle};
use wpzip_packager::{ProgressReporter, ProgressTask};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec}) {msg}";

/// Draws a bar when the size is known and a spinner otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BarProgress;

impl ProgressReporter for BarProgress {
    fn start(&self, label: &str, total: Option<u64>) -> Box<dyn ProgressTask> {
        let bar = total.map_or_else(
            || {
                ProgressBar::new_spinner().with_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                )
            },
            |total| {
                ProgressBar::new(total).with_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .map(|style| style.progress_chars("#>-"))
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                )
            },
        );
        bar.set_message(label.to_string());
        Box::new(BarTask { bar })
    }
}

struct BarTask {
    bar: ProgressBar,
}

impl ProgressTask for BarTask {
    fn advance(&mut self, bytes: u64) {
        self.bar.inc(bytes);
        if self.bar.length().is_none() {
            self.bar.tick();
        }
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_count_bytes_with_and_without_a_total() {
        let mut sized = BarProgress.start("files", Some(10));
        sized.advance(4);
        sized.advance(6);
        sized.finish();

        let mut unsized_task = BarProgress.start("database", None);
        unsized_task.advance(1024);
        unsized_task.finish();
    }

    #[test]
    fn templates_are_valid() {
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(SPINNER_TEMPLATE).is_ok());
    }
}
