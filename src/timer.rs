//! Deadline-based countdown.
//!
//! While running, remaining time is derived from the absolute end time and the
//! clock on every observation. It is never decremented per frame.

use crate::chime::Chime;
use chrono::Utc;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const MS_PER_MINUTE: u64 = 60_000;
/// Longest duration whose millisecond count still fits an `i64` deadline.
pub const MAX_MINUTES: u64 = i64::MAX as u64 / MS_PER_MINUTE;

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
}

impl TimerState {
    pub fn label(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Expired => "expired",
        }
    }
}

pub struct Countdown<C: Clock> {
    clock: C,
    chime: Box<dyn Chime>,
    configured_minutes: u64,
    remaining_ms: u64,
    end_time_ms: Option<i64>,
    frame_scheduled: bool,
    state: TimerState,
}

impl<C: Clock> Countdown<C> {
    pub fn new(clock: C, chime: Box<dyn Chime>, minutes: u64) -> Self {
        let minutes = minutes.min(MAX_MINUTES);
        Countdown {
            clock,
            chime,
            configured_minutes: minutes,
            remaining_ms: minutes_to_ms(minutes),
            end_time_ms: None,
            frame_scheduled: false,
            state: TimerState::Idle,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// True while the frame callback should keep firing.
    pub fn wants_frame(&self) -> bool {
        self.frame_scheduled
    }

    pub fn configured_minutes(&self) -> u64 {
        self.configured_minutes
    }

    pub fn end_time_ms(&self) -> Option<i64> {
        self.end_time_ms
    }

    /// Remaining time as of the last observation (frame, pause, or reset).
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn display(&self) -> String {
        format_remaining(self.remaining_ms as i64)
    }

    /// Records the duration. Remaining time is only replaced while not running.
    pub fn configure(&mut self, minutes: i64) {
        let minutes = minutes.clamp(0, MAX_MINUTES as i64) as u64;
        self.configured_minutes = minutes;
        if self.is_running() {
            debug!(minutes, "duration changed while running, applies on reset");
            return;
        }
        self.remaining_ms = minutes_to_ms(minutes);
        self.state = TimerState::Idle;
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        if self.remaining_ms == 0 {
            self.remaining_ms = minutes_to_ms(self.configured_minutes);
        }
        let end = self.clock.now_ms().saturating_add(self.remaining_ms as i64);
        self.end_time_ms = Some(end);
        self.state = TimerState::Running;
        self.frame_scheduled = true;
        info!(remaining_ms = self.remaining_ms, end_ms = end, "timer started");
    }

    /// Per-frame callback. Returns the state after the observation.
    pub fn on_frame(&mut self) -> TimerState {
        if !self.frame_scheduled {
            return self.state;
        }
        self.remaining_ms = self.observe();
        if self.remaining_ms == 0 {
            self.cancel_frame();
            self.state = TimerState::Expired;
            info!("timer expired");
            if let Err(err) = self.chime.play() {
                warn!(error = %err, "completion chime failed");
            }
        }
        self.state
    }

    pub fn pause(&mut self) {
        if !self.is_running() {
            return;
        }
        self.remaining_ms = self.observe();
        self.cancel_frame();
        self.state = TimerState::Paused;
        info!(remaining_ms = self.remaining_ms, "timer paused");
    }

    pub fn reset(&mut self) {
        self.cancel_frame();
        self.remaining_ms = minutes_to_ms(self.configured_minutes);
        self.state = TimerState::Idle;
        debug!(remaining_ms = self.remaining_ms, "timer reset");
    }

    fn observe(&self) -> u64 {
        match self.end_time_ms {
            Some(end) => end.saturating_sub(self.clock.now_ms()).max(0) as u64,
            None => self.remaining_ms,
        }
    }

    fn cancel_frame(&mut self) {
        self.frame_scheduled = false;
        self.end_time_ms = None;
    }
}

/// Durations beyond [`MAX_MINUTES`] are clamped.
pub fn minutes_to_ms(minutes: u64) -> u64 {
    minutes.min(MAX_MINUTES) * MS_PER_MINUTE
}

/// Renders `MM:SS:mmm`. Negative input is shown as zero.
pub fn format_remaining(ms: i64) -> String {
    let total = ms.max(0) as u64;
    let minutes = total / MS_PER_MINUTE;
    let seconds = (total % MS_PER_MINUTE) / 1000;
    let millis = total % 1000;
    format!("{:02}:{:02}:{:03}", minutes, seconds, millis)
}

/// Parses a duration input in whole minutes.
///
/// Blank or non-numeric input falls back to `default`; negative numbers clamp to zero.
pub fn parse_minutes(input: &str, default: u64) -> u64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return default;
    }
    match trimmed.parse::<i64>() {
        Ok(value) => value.max(0) as u64,
        Err(_) => default,
    }
}
