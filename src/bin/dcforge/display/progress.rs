use std::io::{self, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

pub struct StepSpinner {
    bar: Option<ProgressBar>,
    start: Instant,
    step: u8,
    total_steps: u8,
    step_start: Instant,
}

impl StepSpinner {
    pub fn new(total_steps: u8) -> Self {
        let now = Instant::now();
        Self {
            bar: None,
            start: now,
            step: 0,
            total_steps,
            step_start: now,
        }
    }

    /// Starts a step; with `len` the step shows a counter over that many
    /// records instead of a plain spinner.
    pub fn step(&mut self, description: &str, len: Option<u64>) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }

        self.step += 1;
        self.step_start = Instant::now();

        let bar = match len {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("  {spinner:.cyan} {msg} {bar:24.cyan/blue} {human_pos}/{human_len} {per_sec}")
                        .expect("invalid template")
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .progress_chars("━╸ "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("  {spinner:.cyan} {msg} {human_pos}")
                        .expect("invalid template")
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
                );
                bar
            }
        };
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.set_message(format!(
            "[{}/{}] {}...",
            self.step, self.total_steps, description
        ));

        self.bar = Some(bar);
    }

    pub fn tracker(&self) -> Tracker {
        Tracker(self.bar.clone())
    }

    pub fn complete_step(&mut self, description: &str, substeps: &[String]) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }

        let elapsed = self.step_start.elapsed();
        let mut stderr = io::stderr().lock();

        let _ = writeln!(
            stderr,
            "  \x1b[32m✓\x1b[0m {:<44} {:>5.1}s",
            description,
            elapsed.as_secs_f64()
        );

        for substep in substeps {
            let _ = writeln!(stderr, "      \x1b[2m·\x1b[0m {}", substep);
        }
    }

    pub fn finish(mut self, label: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }

        print_footer(label, self.start.elapsed());
    }
}

fn print_footer(label: &str, elapsed: Duration) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "  \x1b[2m╺━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━╸\x1b[0m"
    );
    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "  \x1b[32m✓\x1b[0m {:<20} {:>30}",
        label,
        format!("Total: {:.2}s", elapsed.as_secs_f64())
    );
    let _ = writeln!(stderr);
}

/// Cheap handle for advancing the current step from inside a run, possibly
/// from several threads.
#[derive(Clone, Default)]
pub struct Tracker(Option<ProgressBar>);

impl Tracker {
    #[inline]
    pub fn inc(&self) {
        if let Some(bar) = &self.0 {
            bar.inc(1);
        }
    }
}

pub enum Progress {
    Interactive(StepSpinner),
    Silent,
}

impl Progress {
    pub fn new(interactive: bool, total_steps: u8) -> Self {
        if interactive {
            Self::Interactive(StepSpinner::new(total_steps))
        } else {
            Self::Silent
        }
    }

    pub fn step(&mut self, description: &str, len: Option<u64>) {
        if let Self::Interactive(s) = self {
            s.step(description, len);
        }
    }

    pub fn tracker(&self) -> Tracker {
        match self {
            Self::Interactive(s) => s.tracker(),
            Self::Silent => Tracker::default(),
        }
    }

    pub fn complete_step(&mut self, description: &str, substeps: &[String]) {
        if let Self::Interactive(s) = self {
            s.complete_step(description, substeps);
        }
    }

    pub fn finish(self, label: &str) {
        if let Self::Interactive(s) = self {
            s.finish(label);
        }
    }
}
