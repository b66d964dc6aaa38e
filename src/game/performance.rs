//! Frame pacing and frame-rate reporting
//!
//! - `FramePacer` holds each tick to the configured target rate
//! - `FpsMeter` reports a smoothed observed rate over a rolling window
//! - `TickBudget` tracks how much of the frame budget tick work consumes

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::game::constants::frame::{BUDGET_SAMPLES, FPS_WINDOW, SPIN_MARGIN};

/// Target frame duration for a desired rate; `fps` must be at least 1
#[inline]
pub fn frame_duration(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

/// How the end-of-tick wait is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStrategy {
    /// Busy-wait on the monotonic clock; tightest timing, burns a core
    Spin,
    /// Sleep until just before the deadline, then spin the remainder
    #[default]
    Sleep,
}

impl fmt::Display for PacingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PacingStrategy::Spin => "spin",
            PacingStrategy::Sleep => "sleep",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pacing strategy '{0}' (expected spin or sleep)")]
pub struct ParsePacingError(pub String);

impl FromStr for PacingStrategy {
    type Err = ParsePacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spin" | "busy" => Ok(PacingStrategy::Spin),
            "sleep" | "yield" => Ok(PacingStrategy::Sleep),
            _ => Err(ParsePacingError(s.to_string())),
        }
    }
}

/// Waits out the remainder of each frame
#[derive(Debug, Clone)]
pub struct FramePacer {
    target: Duration,
    strategy: PacingStrategy,
}

impl FramePacer {
    pub fn new(fps: u32, strategy: PacingStrategy) -> Self {
        Self {
            target: frame_duration(fps),
            strategy,
        }
    }

    pub fn set_fps(&mut self, fps: u32) {
        self.target = frame_duration(fps);
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    pub fn strategy(&self) -> PacingStrategy {
        self.strategy
    }

    /// Block until `target` has elapsed since `tick_start`
    ///
    /// Returns immediately when the tick already overran its budget.
    pub fn wait(&self, tick_start: Instant) {
        let deadline = tick_start + self.target;

        if self.strategy == PacingStrategy::Sleep {
            let now = Instant::now();
            if let Some(remaining) = deadline.checked_duration_since(now) {
                if remaining > SPIN_MARGIN {
                    std::thread::sleep(remaining - SPIN_MARGIN);
                }
            }
        }

        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Smoothed observed frame rate over a rolling window of completion times
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl FpsMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: VecDeque::with_capacity(64),
        }
    }

    pub fn record(&mut self) {
        self.record_at(Instant::now());
    }

    /// Record a tick completion at `now` and drop stamps older than the window
    pub fn record_at(&mut self, now: Instant) {
        self.stamps.push_back(now);
        while let Some(&oldest) = self.stamps.front() {
            if now.duration_since(oldest) > self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// `(count - 1) / (newest - oldest)`, or 0.0 without enough history
    pub fn fps(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.stamps.front(), self.stamps.back()) else {
            return 0.0;
        };
        let span = newest.duration_since(*oldest).as_secs_f64();
        if self.stamps.len() < 2 || span <= 0.0 {
            return 0.0;
        }
        (self.stamps.len() - 1) as f64 / span
    }

    pub fn samples(&self) -> usize {
        self.stamps.len()
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(FPS_WINDOW)
    }
}

/// Budget usage levels for tick work relative to the frame budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Tick work uses under 30% of the frame
    Excellent,
    /// Normal operation
    Good,
    /// Above 70%, little headroom left
    Warning,
    /// Above 90%, the target rate is at risk
    Critical,
}

/// Rolling tick work-duration statistics
#[derive(Debug, Clone)]
pub struct TickBudget {
    durations: VecDeque<Duration>,
    max_samples: usize,
    target: Duration,
    excellent_threshold: f32,
    warning_threshold: f32,
    critical_threshold: f32,
    status: BudgetStatus,
    last_entity_count: usize,
}

impl TickBudget {
    pub fn new(fps: u32) -> Self {
        Self {
            durations: VecDeque::with_capacity(BUDGET_SAMPLES),
            max_samples: BUDGET_SAMPLES,
            target: frame_duration(fps),
            excellent_threshold: 0.3,
            warning_threshold: 0.7,
            critical_threshold: 0.9,
            status: BudgetStatus::Excellent,
            last_entity_count: 0,
        }
    }

    /// Change the frame budget; recorded history is kept
    pub fn set_fps(&mut self, fps: u32) {
        self.target = frame_duration(fps);
        self.update_status();
    }

    pub fn record(&mut self, work: Duration, entity_count: usize) {
        self.durations.push_back(work);
        while self.durations.len() > self.max_samples {
            self.durations.pop_front();
        }
        self.last_entity_count = entity_count;
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.durations.len() < 10 {
            return;
        }
        let ratio = self.budget_usage_percent() / 100.0;

        self.status = if ratio < self.excellent_threshold {
            BudgetStatus::Excellent
        } else if ratio < self.warning_threshold {
            BudgetStatus::Good
        } else if ratio < self.critical_threshold {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Critical
        };
    }

    pub fn average(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.durations.iter().sum();
        sum / self.durations.len() as u32
    }

    /// 95th percentile tick work duration
    pub fn p95(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.durations.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Average work as a percentage of the frame budget (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        self.average().as_secs_f32() / self.target.as_secs_f32() * 100.0
    }

    pub fn status(&self) -> BudgetStatus {
        self.status
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget (p95 {:.2}ms), {} entities",
            self.status,
            self.budget_usage_percent(),
            self.p95().as_secs_f64() * 1000.0,
            self.last_entity_count
        )
    }
}

impl Default for TickBudget {
    fn default() -> Self {
        Self::new(crate::game::constants::frame::DEFAULT_FPS)
    }
}
