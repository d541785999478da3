use std::{fmt, time::Duration};

use instant::Instant;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Trace, TraceStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No trace loaded.
    Idle,
    /// Trace loaded, positioned on the first step, not started.
    Ready,
    Playing,
    Paused,
    /// Last step reached.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackAction {
    Play,
    Pause,
    StepForward,
    StepBack,
    Reset,
}

impl fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackAction::Play => "play",
            PlaybackAction::Pause => "pause",
            PlaybackAction::StepForward => "step forward",
            PlaybackAction::StepBack => "step back",
            PlaybackAction::Reset => "reset",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: PlaybackState,
        action: PlaybackAction,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Time between automatic steps.
    pub interval: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
        }
    }
}

impl PlaybackSettings {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn clamp(&self, interval: Duration) -> Duration {
        interval.clamp(self.min_interval, self.max_interval.max(self.min_interval))
    }
}

/// Step-indexed playback of a [`Trace`].
///
/// Time is passed in explicitly; the player never reads a clock. The host calls
/// [`TracePlayer::tick`] every frame while playing.
#[derive(Debug, Clone)]
pub struct TracePlayer {
    trace: Trace,
    state: PlaybackState,
    index: usize,
    settings: PlaybackSettings,
    interval: Duration,

    last_advance: Option<Instant>,
    next_tick: Option<Instant>,
}

impl Default for TracePlayer {
    fn default() -> Self {
        Self::new(PlaybackSettings::default())
    }
}

impl TracePlayer {
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            trace: Trace::default(),
            state: PlaybackState::Idle,
            index: 0,
            interval: settings.clamp(settings.interval),
            settings,
            last_advance: None,
            next_tick: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&TraceStep> {
        self.trace.get(self.index)
    }

    pub fn steps(&self) -> &[TraceStep] {
        self.trace.steps()
    }

    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Output printed by every step up to and including the current one.
    pub fn outputs_so_far(&self) -> Vec<&str> {
        self.trace
            .steps()
            .iter()
            .take(self.index + 1)
            .filter_map(|s| s.output.as_deref())
            .collect()
    }

    /// Time left until the next automatic step, `None` unless playing.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        let next = self.next_tick?;
        Some(if next > now {
            next.duration_since(now)
        } else {
            Duration::ZERO
        })
    }

    fn last(&self) -> usize {
        self.trace.len().saturating_sub(1)
    }

    fn cancel_timer(&mut self) {
        self.next_tick = None;
        self.last_advance = None;
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            log::debug!("playback {:?} -> {:?} at step {}", self.state, state, self.index);
            self.state = state;
        }
    }

    fn invalid(&self, action: PlaybackAction) -> PlaybackError {
        PlaybackError::InvalidTransition {
            from: self.state,
            action,
        }
    }

    /// Loads a trace and positions on its first step. An empty trace leaves the player idle.
    pub fn load(&mut self, trace: Trace) {
        self.cancel_timer();
        self.index = 0;
        let state = if trace.is_empty() {
            PlaybackState::Idle
        } else {
            PlaybackState::Ready
        };
        self.trace = trace;
        self.set_state(state);
    }

    /// Drops the trace.
    pub fn unload(&mut self) {
        self.cancel_timer();
        self.trace = Trace::default();
        self.index = 0;
        self.set_state(PlaybackState::Idle);
    }

    pub fn play(&mut self, now: Instant) -> Result<(), PlaybackError> {
        if !matches!(self.state, PlaybackState::Ready | PlaybackState::Paused) {
            return Err(self.invalid(PlaybackAction::Play));
        }
        if self.index >= self.last() {
            self.set_state(PlaybackState::Complete);
            return Ok(());
        }
        self.last_advance = Some(now);
        self.next_tick = Some(now + self.interval);
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Playing {
            return Err(self.invalid(PlaybackAction::Pause));
        }
        self.cancel_timer();
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    /// Moves one step forward. On the last step this completes playback.
    pub fn step_forward(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Idle {
            return Err(self.invalid(PlaybackAction::StepForward));
        }
        if self.index >= self.last() {
            self.cancel_timer();
            self.set_state(PlaybackState::Complete);
            return Ok(());
        }
        self.index += 1;
        if self.state == PlaybackState::Playing {
            if self.index == self.last() {
                self.cancel_timer();
                self.set_state(PlaybackState::Complete);
            }
        } else {
            self.set_state(PlaybackState::Paused);
        }
        Ok(())
    }

    /// Moves one step back. No-op on the first step.
    pub fn step_back(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Idle {
            return Err(self.invalid(PlaybackAction::StepBack));
        }
        if self.index == 0 {
            return Ok(());
        }
        self.index -= 1;
        if self.state != PlaybackState::Playing {
            self.set_state(PlaybackState::Paused);
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Idle {
            return Err(self.invalid(PlaybackAction::Reset));
        }
        self.cancel_timer();
        self.index = 0;
        self.set_state(PlaybackState::Ready);
        Ok(())
    }

    /// Changes the time between automatic steps, clamped to the configured range. While
    /// playing, the pending step is rescheduled relative to the previous one, but never
    /// earlier than `now`.
    pub fn set_speed(&mut self, interval: Duration, now: Instant) {
        self.interval = self.settings.clamp(interval);
        if let Some(last) = self.last_advance {
            let next = (last + self.interval).max(now);
            self.next_tick = Some(next);
            self.last_advance = Some(next - self.interval);
        }
    }

    /// Performs every automatic step due at `now`. Returns how many were taken.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut advanced = 0;
        while self.state == PlaybackState::Playing {
            let Some(due) = self.next_tick.filter(|due| *due <= now) else {
                break;
            };
            self.index += 1;
            advanced += 1;
            log::trace!("playback advanced to step {}", self.index);
            if self.index >= self.last() {
                self.cancel_timer();
                self.set_state(PlaybackState::Complete);
                break;
            }
            self.last_advance = Some(due);
            self.next_tick = Some(due + self.interval);
        }
        advanced
    }
}
