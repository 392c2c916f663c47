//! Frame-time-driven render quality governor.
//!
//! Consumes one frame duration per tick, keeps a bounded window of
//! recent samples, and steps a three-tier quality level up or down from
//! the window's 95th percentile. A cooldown between switches keeps the
//! tier from oscillating when frame times sit near a threshold. The
//! renderer owns the mapping from tier to framebuffer scale and
//! instance density; this module only decides the tier.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ── Quality tier ───────────────────────────────────────────

/// Discrete render quality level, totally ordered low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Next tier down, saturating at `Low`.
    pub fn step_down(&self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }

    /// Next tier up, saturating at `High`.
    pub fn step_up(&self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }
}

// ── Config ─────────────────────────────────────────────────

/// Governor thresholds and window sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfConfig {
    /// Number of recent frame durations kept.
    pub window: usize,
    /// p95 above this (ms) steps the tier down.
    pub downgrade_above_ms: f64,
    /// p95 below this (ms) steps the tier up.
    pub upgrade_below_ms: f64,
    /// Minimum time between tier switches (ms).
    pub cooldown_ms: f64,
    /// Frame budget (ms) for over-budget accounting, 90Hz by default.
    pub budget_ms: f64,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            window: 120,
            downgrade_above_ms: 28.0,
            upgrade_below_ms: 18.0,
            cooldown_ms: 5000.0,
            budget_ms: 11.1,
        }
    }
}

// ── Monitor ────────────────────────────────────────────────

/// Reading returned from every `record_frame` call, for the caller to
/// act on (apply quality knobs) and display (debug overlay).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfReading {
    pub tier: QualityTier,
    pub p95_ms: f64,
    pub total_frames: u64,
    pub over_budget_frames: u64,
}

/// Frame-timing governor. Independent of the gesture layer; the host
/// feeds it one render duration per presentation frame.
#[derive(Debug)]
pub struct PerfMonitor {
    config: PerfConfig,
    samples: VecDeque<f64>,
    tier: QualityTier,
    /// Frame clock of the last tier switch; `None` means no switch has
    /// happened in this window's lifetime, so evaluation is immediate.
    last_switch_ms: Option<f64>,
    total_frames: u64,
    over_budget_frames: u64,
}

impl PerfMonitor {
    pub fn new(config: PerfConfig) -> Self {
        let capacity = config.window;
        Self {
            config,
            samples: VecDeque::with_capacity(capacity),
            tier: QualityTier::High,
            last_switch_ms: None,
            total_frames: 0,
            over_budget_frames: 0,
        }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// Record one frame's render duration and re-evaluate the tier.
    ///
    /// `now_ms` is the host frame clock, used for the switch cooldown.
    pub fn record_frame(&mut self, duration_ms: f64, now_ms: f64) -> PerfReading {
        self.samples.push_back(duration_ms);
        while self.samples.len() > self.config.window {
            self.samples.pop_front();
        }
        self.total_frames += 1;
        if duration_ms > self.config.budget_ms {
            self.over_budget_frames += 1;
        }

        let p95 = self.p95(duration_ms);

        let cooldown_over = self
            .last_switch_ms
            .map_or(true, |t| now_ms - t >= self.config.cooldown_ms);
        if cooldown_over {
            if p95 > self.config.downgrade_above_ms && self.tier != QualityTier::Low {
                let next = self.tier.step_down();
                info!(
                    "quality tier {} -> {} (p95 {:.1}ms)",
                    self.tier.as_str(),
                    next.as_str(),
                    p95,
                );
                self.tier = next;
                self.last_switch_ms = Some(now_ms);
            } else if p95 < self.config.upgrade_below_ms && self.tier != QualityTier::High {
                let next = self.tier.step_up();
                info!(
                    "quality tier {} -> {} (p95 {:.1}ms)",
                    self.tier.as_str(),
                    next.as_str(),
                    p95,
                );
                self.tier = next;
                self.last_switch_ms = Some(now_ms);
            }
        }

        PerfReading {
            tier: self.tier,
            p95_ms: p95,
            total_frames: self.total_frames,
            over_budget_frames: self.over_budget_frames,
        }
    }

    /// Force a tier and discard all history. Used when entering or
    /// leaving an XR session or switching devices: samples from a
    /// different rendering context are not comparable.
    pub fn reset(&mut self, tier: QualityTier) {
        debug!("perf monitor reset to {}", tier.as_str());
        self.samples.clear();
        self.tier = tier;
        self.last_switch_ms = None;
        self.total_frames = 0;
        self.over_budget_frames = 0;
    }

    /// Nearest-rank 95th percentile of the window, no interpolation.
    fn p95(&self, fallback: f64) -> f64 {
        if self.samples.is_empty() {
            return fallback;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((0.95 * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for PerfMonitor {
    fn default() -> Self {
        Self::new(PerfConfig::default())
    }
}

// ── Tests ──────────────────────────────────────────────────
