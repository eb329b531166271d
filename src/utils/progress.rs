//! Progress reporting for long-running operations.
//!
//! A supply chain calculation runs through a few slow stages (loading collections,
//! downloading code, traversing) and, in verbose mode, reports every rule it visits.
//! Library code reports through the [`ProgressReporter`] trait so that it never
//! writes to the terminal itself:
//!
//! - [`ConsoleReporter`] shows an `indicatif` spinner per stage and prints a summary
//!   line when the stage ends
//! - [`SilentReporter`] discards everything, for tests and library callers
//!
//! # Environment Variables
//!
//! - `RALLY_NO_PROGRESS`: set to any value to replace spinners with plain lines

use std::sync::{Arc, Mutex};
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::constants::NO_PROGRESS_ENV;
use crate::models::{Entity, Preset, Rule};

/// Whether `RALLY_NO_PROGRESS` is set.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// What the traversal learned from one rule.
#[derive(Debug, Clone, Copy)]
pub struct TraversalStep<'a> {
    /// The rule that was processed
    pub rule: &'a Rule,
    /// Its bound preset, if any
    pub preset: Option<&'a Preset>,
    /// Next rule on success
    pub pass_next: Option<&'a Rule>,
    /// Next rule on failure
    pub error_next: Option<&'a Rule>,
    /// Rules referenced by name from the preset's code
    pub found_rules: &'a [Arc<Rule>],
    /// Presets referenced by name from the preset's code
    pub found_presets: &'a [Arc<Preset>],
}

/// Receives progress from long-running operations.
pub trait ProgressReporter: Send + Sync {
    /// A stage began, e.g. "Downloading code".
    fn stage_started(&self, stage: &str);

    /// The current stage ended; `summary` is a short result such as a count.
    fn stage_finished(&self, summary: &str);

    /// A rule was processed by the traversal.
    fn step(&self, _step: &TraversalStep<'_>) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn stage_started(&self, _stage: &str) {}

    fn stage_finished(&self, _summary: &str) {}
}

/// Terminal reporter with one spinner per stage.
///
/// With `verbose` every traversal step is printed: the rule's preset, both
/// successors and the rules and presets found in its code.
#[derive(Debug)]
pub struct ConsoleReporter {
    verbose: bool,
    spinners: bool,
    current: Mutex<Option<(String, ProgressBar)>>,
}

impl ConsoleReporter {
    /// Create a reporter. Spinners are used unless `no_progress` is set or
    /// `RALLY_NO_PROGRESS` is present.
    #[must_use]
    pub fn new(verbose: bool, no_progress: bool) -> Self {
        Self {
            verbose,
            spinners: !no_progress && !is_progress_disabled(),
            current: Mutex::new(None),
        }
    }

    fn println(&self, line: &str) {
        let current = self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match current.as_ref() {
            Some((_, bar)) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn stage_started(&self, stage: &str) {
        let bar = if self.spinners {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(format!("{stage}..."));

        let mut current = self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some((_, previous)) = current.replace((stage.to_string(), bar)) {
            previous.finish_and_clear();
        }
    }

    fn stage_finished(&self, summary: &str) {
        let finished = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some((stage, bar)) = finished {
            bar.finish_and_clear();
            println!("{stage}... {}", summary.green());
        }
    }

    fn step(&self, step: &TraversalStep<'_>) {
        if !self.verbose {
            return;
        }

        let describe = |rule: Option<&Rule>| rule.map_or_else(|| "None".to_string(), |r| r.chalk_print(false));
        let mut lines = vec![
            format!(
                "{}:",
                step.preset.map_or_else(|| step.rule.chalk_print(false), |p| p.chalk_print(false))
            ),
            format!("  Pass Next: {}", describe(step.pass_next)),
            format!("  Err  Next: {}", describe(step.error_next)),
            "  Rules:".to_string(),
        ];
        lines.extend(step.found_rules.iter().map(|r| format!("    {}", r.chalk_print(true))));
        lines.push("  Presets:".to_string());
        lines.extend(step.found_presets.iter().map(|p| format!("    {}", p.chalk_print(true))));
        lines.push(String::new());

        self.println(&lines.join("\n"));
    }
}
