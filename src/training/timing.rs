//! Wall-clock time per training phase.

use std::fmt;
use std::time::{Duration, Instant};

/// Accumulates elapsed time of named phases.
///
/// A phase may be started and stopped many times; its durations add up.
/// Phases are reported in the order they were first started.
#[derive(Debug, Default)]
pub struct TimeTracker {
    running: Vec<(&'static str, Instant)>,
    totals: Vec<(&'static str, Duration)>,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing `phase`. Restarting a running phase resets its start.
    pub fn start(&mut self, phase: &'static str) {
        let now = Instant::now();
        match self.running.iter_mut().find(|(name, _)| *name == phase) {
            Some((_, start)) => *start = now,
            None => self.running.push((phase, now)),
        }
        if !self.totals.iter().any(|(name, _)| *name == phase) {
            self.totals.push((phase, Duration::ZERO));
        }
    }

    /// Stop timing `phase` and return the elapsed time of this run, or
    /// `None` if the phase was not running.
    pub fn stop(&mut self, phase: &'static str) -> Option<Duration> {
        let at = self.running.iter().position(|(name, _)| *name == phase)?;
        let (_, start) = self.running.swap_remove(at);
        let elapsed = start.elapsed();
        if let Some((_, total)) = self.totals.iter_mut().find(|(name, _)| *name == phase) {
            *total += elapsed;
        }
        Some(elapsed)
    }

    /// Accumulated time of `phase`.
    pub fn total(&self, phase: &str) -> Option<Duration> {
        self.totals.iter().find(|(name, _)| *name == phase).map(|(_, d)| *d)
    }

    /// Phases in first-start order with their accumulated time.
    pub fn phases(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.totals.iter().copied()
    }
}

impl fmt::Display for TimeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (phase, total) in self.phases() {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "  {phase}: {:.6}s", total.as_secs_f64())?;
        }
        Ok(())
    }
}
