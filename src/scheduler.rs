// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The playback transport.
//!
//! The scheduler owns the compiled events and the transport state. Commands are synchronous;
//! the only asynchronous part is a single timer task that fires when the count-in or the
//! current event elapses. Every command bumps an epoch and aborts the outstanding timer, and a
//! timer that wakes up with a stale epoch does nothing.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, span, warn, Level, Span};

use crate::{
    audio::{AudioEngine, AudioError},
    compiler::{CompiledTab, PLAYBACK_SPEEDS},
    config,
    location::{Location, Scope},
};

pub mod loop_range;

pub use loop_range::LoopRange;

/// The default count-in before playback starts from a stop.
pub const DEFAULT_COUNT_IN: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("there are no events to play")]
    Empty,

    #[error("index {index} is out of range for {len} events")]
    OutOfRange { index: usize, len: usize },

    #[error("location {0} is not in the tab")]
    LocationNotFound(Location),

    #[error("{0:?} has no events")]
    ScopeNotFound(Scope),

    #[error("{start}-{end} is not a valid loop range")]
    InvalidLoopRange { start: usize, end: usize },

    #[error("no loop range is set")]
    NoLoopRange,

    #[error("the loop range can't move any further")]
    LoopBoundary,

    #[error("invalid playback speed {0}")]
    InvalidSpeed(f64),

    #[error("invalid volume {0}")]
    InvalidVolume(f32),

    #[error("not available while playing the artist recording")]
    RecordingMode,

    #[error(transparent)]
    Audio(#[from] AudioError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    CountingIn,
    Playing,
    Paused,
}

/// What the transport plays: the tab's own events or a recording of the artist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Tab,
    ArtistRecording,
}

/// Scheduler owned playback metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioMetadata {
    pub mode: PlaybackMode,
    pub state: TransportState,
    pub location: Option<Location>,
    /// The scope playback is restricted to, if any.
    pub scope: Option<Scope>,
    pub editing_loop_range: bool,
    pub event_count: usize,
}

/// What observers see after every transport change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportSnapshot {
    pub metadata: AudioMetadata,
    /// Always inside the event list, or 0 when it is empty.
    pub index: usize,
    pub loop_range: Option<LoopRange>,
    pub looping: bool,
    pub playback_speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerOptions {
    pub count_in: Duration,
    pub looping: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            count_in: DEFAULT_COUNT_IN,
            looping: false,
        }
    }
}

impl From<&config::Player> for SchedulerOptions {
    fn from(config: &config::Player) -> Self {
        SchedulerOptions {
            count_in: config.count_in(),
            looping: config.looping(),
        }
    }
}

/// What happens when the timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    /// Trigger the event at the current index.
    Trigger,
    /// Move to the next index, then trigger it.
    Advance,
    /// The artist recording has played to its end.
    RecordingEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Stopped,
    CountingIn { deadline: Instant },
    Playing { cue: Cue, deadline: Instant },
    Paused { cue: Cue, remaining: Duration },
}

struct Inner {
    this: Weak<Scheduler>,
    compiled: Arc<CompiledTab>,
    engine: Arc<dyn AudioEngine>,
    phase: Phase,
    index: usize,
    scope: Option<Scope>,
    loop_range: Option<LoopRange>,
    looping: bool,
    playback_speed: f64,
    mode: PlaybackMode,
    editing_loop_range: bool,
    count_in: Duration,
    epoch: u64,
    timer: Option<JoinHandle<()>>,
    snapshots: watch::Sender<TransportSnapshot>,
}

/// Drives playback of compiled events through an audio engine.
pub struct Scheduler {
    inner: Mutex<Inner>,
    span: Span,
}

impl Scheduler {
    /// Creates a stopped scheduler. Must be used from within a Tokio runtime.
    pub fn new(
        compiled: CompiledTab,
        engine: Arc<dyn AudioEngine>,
        options: SchedulerOptions,
    ) -> Arc<Scheduler> {
        let (snapshots, _) = watch::channel(TransportSnapshot::default());
        Arc::new_cyclic(|this| {
            let inner = Inner {
                this: this.clone(),
                playback_speed: compiled.options().playback_speed,
                compiled: Arc::new(compiled),
                engine,
                phase: Phase::Stopped,
                index: 0,
                scope: None,
                loop_range: None,
                looping: options.looping,
                mode: PlaybackMode::Tab,
                editing_loop_range: false,
                count_in: options.count_in,
                epoch: 0,
                timer: None,
                snapshots,
            };
            inner.publish();
            Scheduler {
                inner: Mutex::new(inner),
                span: span!(Level::INFO, "scheduler"),
            }
        })
    }

    /// Watches transport snapshots.
    pub fn subscribe(&self) -> watch::Receiver<TransportSnapshot> {
        self.inner.lock().snapshots.subscribe()
    }

    /// The current transport snapshot.
    pub fn snapshot(&self) -> TransportSnapshot {
        self.inner.lock().snapshot()
    }

    /// The events being played.
    pub fn compiled(&self) -> Arc<CompiledTab> {
        self.inner.lock().compiled.clone()
    }

    /// Starts or resumes playback.
    ///
    /// From a stop, the count-in plays first. From a pause, playback resumes where it left
    /// off. A scope restricts playback to one section, sub-section or chord sequence; asking
    /// for a different scope than the one playing restarts from the new scope's start.
    pub fn play(&self, scope: Option<Scope>) -> Result<(), TransportError> {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();

        if inner.mode == PlaybackMode::ArtistRecording {
            let result = inner.play_recording();
            inner.publish();
            return result;
        }

        if inner.compiled.is_empty() {
            inner.stop();
            inner.publish();
            return Err(TransportError::Empty);
        }

        if let Some(scope) = scope {
            if inner.scope != Some(scope) {
                let range = inner
                    .compiled
                    .lookup()
                    .scope_range(&scope)
                    .ok_or(TransportError::ScopeNotFound(scope))?;
                if inner.phase != Phase::Stopped {
                    inner.cancel();
                    inner.engine.stop_all();
                    inner.phase = Phase::Stopped;
                }
                info!(?scope, start = range.start(), "Playing scope.");
                inner.scope = Some(scope);
                inner.index = *range.start();
            }
        }

        match inner.phase {
            Phase::Stopped => {
                let window = inner.window();
                if !window.contains(&inner.index) {
                    inner.index = *window.start();
                }
                let count_in = inner.count_in;
                if count_in.is_zero() {
                    inner.arm(Cue::Trigger, Duration::ZERO);
                } else {
                    match inner.engine.play_count_in_click() {
                        Ok(()) => {}
                        Err(AudioError::NoClick) => debug!("No count-in click loaded."),
                        Err(e) => warn!(err = %e, "Unable to play the count-in click."),
                    }
                    info!(index = inner.index, ?count_in, "Counting in.");
                    let deadline = inner.arm(Cue::Trigger, count_in);
                    inner.phase = Phase::CountingIn { deadline };
                }
            }
            Phase::Paused { cue, remaining } => {
                info!(index = inner.index, "Resuming.");
                inner.arm(cue, remaining);
            }
            Phase::CountingIn { .. } | Phase::Playing { .. } => {
                debug!("Already playing.");
            }
        }

        inner.publish();
        Ok(())
    }

    /// Pauses playback, keeping the index and the time left on the current event. Ignored
    /// during the count-in.
    pub fn pause(&self) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        inner.pause();
        inner.publish();
    }

    /// Stops playback and returns to the start of the current window.
    pub fn stop(&self) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        inner.stop();
        inner.publish();
    }

    /// Moves to an event. While playing, the event is triggered immediately. An index past
    /// the end stops playback.
    pub fn seek(&self, index: usize) -> Result<(), TransportError> {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        let result = inner.seek(index);
        inner.publish();
        result
    }

    /// Moves to the occurrence of a location at or after the current index, otherwise the
    /// first occurrence.
    pub fn seek_location(&self, location: &Location) -> Result<(), TransportError> {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        let index = inner
            .compiled
            .lookup()
            .index_of(location, inner.index)
            .ok_or(TransportError::LocationNotFound(*location))?;
        let result = inner.seek(index);
        inner.publish();
        result
    }

    /// Sets the loop range. Endpoints on ornamental events are moved to the nearest playable
    /// event, inward first.
    pub fn set_loop_range(&self, start: usize, end: usize) -> Result<LoopRange, TransportError> {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        let compiled = inner.compiled.clone();
        let range = loop_range::normalize(start, end, compiled.len(), |i| {
            compiled.is_ornamental(i)
        })
        .ok_or(TransportError::InvalidLoopRange { start, end })?;
        inner.apply_loop_range(Some(range));
        inner.publish();
        Ok(range)
    }

    pub fn clear_loop_range(&self) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        inner.apply_loop_range(None);
        inner.publish();
    }

    pub fn set_looping(&self, looping: bool) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        inner.looping = looping;
        let range = inner.loop_range;
        inner.apply_loop_range(range);
        inner.publish();
    }

    pub fn decrement_loop_start(&self) -> Result<LoopRange, TransportError> {
        self.step_loop_range(|range, compiled| {
            loop_range::decrement_start(range, |i| compiled.is_ornamental(i))
        })
    }

    pub fn increment_loop_start(&self) -> Result<LoopRange, TransportError> {
        self.step_loop_range(|range, compiled| {
            loop_range::increment_start(range, |i| compiled.is_ornamental(i))
        })
    }

    pub fn decrement_loop_end(&self) -> Result<LoopRange, TransportError> {
        self.step_loop_range(|range, compiled| {
            loop_range::decrement_end(range, |i| compiled.is_ornamental(i))
        })
    }

    pub fn increment_loop_end(&self) -> Result<LoopRange, TransportError> {
        self.step_loop_range(|range, compiled| {
            loop_range::increment_end(range, compiled.len(), |i| compiled.is_ornamental(i))
        })
    }

    fn step_loop_range(
        &self,
        step: impl FnOnce(LoopRange, &CompiledTab) -> Option<LoopRange>,
    ) -> Result<LoopRange, TransportError> {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        let range = inner.loop_range.ok_or(TransportError::NoLoopRange)?;
        let compiled = inner.compiled.clone();
        let Some(range) = step(range, &*compiled) else {
            debug!(%range, "Loop range can't move any further.");
            return Err(TransportError::LoopBoundary);
        };
        inner.apply_loop_range(Some(range));
        inner.publish();
        Ok(range)
    }

    /// Changes the playback speed. The time left on the event being played is scaled, so the
    /// beat carries on rather than restarting.
    pub fn set_playback_speed(&self, playback_speed: f64) -> Result<(), TransportError> {
        let _enter = self.span.enter();
        if !PLAYBACK_SPEEDS.contains(&playback_speed) {
            debug!(playback_speed, "Rejecting playback speed.");
            return Err(TransportError::InvalidSpeed(playback_speed));
        }

        let mut inner = self.inner.lock();
        let previous = inner.playback_speed;
        inner.playback_speed = playback_speed;
        inner.compiled = Arc::new(inner.compiled.with_playback_speed(playback_speed));
        info!(previous, playback_speed, "Playback speed changed.");

        if inner.mode == PlaybackMode::Tab {
            let ratio = previous / playback_speed;
            match inner.phase {
                Phase::Playing { cue, deadline } => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    inner.arm(cue, remaining.mul_f64(ratio));
                }
                Phase::Paused { cue, remaining } => {
                    inner.phase = Phase::Paused {
                        cue,
                        remaining: remaining.mul_f64(ratio),
                    };
                }
                Phase::Stopped | Phase::CountingIn { .. } => inner.rearm(),
            }
        }

        inner.publish();
        Ok(())
    }

    /// Swaps in a recompiled event list. The index and loop range are clamped to it, and an
    /// empty list stops playback.
    pub fn set_events(&self, compiled: CompiledTab) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        let compiled = if compiled.options().playback_speed != inner.playback_speed {
            compiled.with_playback_speed(inner.playback_speed)
        } else {
            compiled
        };
        inner.compiled = Arc::new(compiled);
        let len = inner.compiled.len();
        info!(events = len, "Events replaced.");

        if len == 0 {
            inner.stop();
            inner.index = 0;
            inner.loop_range = None;
            inner.scope = None;
            inner.publish();
            return;
        }

        inner.index = inner.index.min(len - 1);
        if let Some(scope) = inner.scope {
            if inner.compiled.lookup().scope_range(&scope).is_none() {
                inner.scope = None;
            }
        }
        let compiled = inner.compiled.clone();
        let range = inner.loop_range.and_then(|range| {
            loop_range::normalize(range.start, range.end.min(len - 1), len, |i| {
                compiled.is_ornamental(i)
            })
        });
        inner.apply_loop_range(range);
        inner.publish();
    }

    /// Entering loop range editing pauses playback. Like a pause, it leaves the count-in
    /// alone.
    pub fn set_editing_loop_range(&self, editing: bool) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        inner.editing_loop_range = editing;
        if editing {
            match inner.phase {
                Phase::Playing { .. } => inner.pause(),
                Phase::CountingIn { .. } => debug!("Count-in continues while editing."),
                Phase::Stopped | Phase::Paused { .. } => {}
            }
        }
        inner.publish();
    }

    /// Switches between the tab's events and the artist recording. Playback stops first.
    pub fn set_mode(&self, mode: PlaybackMode) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        if inner.mode == mode {
            return;
        }
        inner.stop();
        inner.mode = mode;
        info!(?mode, "Playback mode changed.");
        inner.publish();
    }

    /// Sets the master volume. Gains outside 0.0 to 1.0 are clamped.
    pub fn set_volume(&self, gain: f32) -> Result<(), TransportError> {
        let _enter = self.span.enter();
        if !gain.is_finite() {
            debug!(gain, "Rejecting volume.");
            return Err(TransportError::InvalidVolume(gain));
        }
        self.inner.lock().engine.set_volume(gain.clamp(0.0, 1.0));
        Ok(())
    }

    /// Called by the timer task.
    fn fire(&self, epoch: u64) {
        let _enter = self.span.enter();
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(epoch, current = inner.epoch, "Ignoring stale timer.");
            return;
        }
        // This is the running task, so it must not be aborted.
        inner.timer = None;

        match inner.phase {
            Phase::CountingIn { .. } => inner.run(Cue::Trigger),
            Phase::Playing { cue, .. } => inner.run(cue),
            Phase::Stopped | Phase::Paused { .. } => {}
        }
        inner.publish();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.abort();
        }
    }
}

impl Inner {
    fn snapshot(&self) -> TransportSnapshot {
        let len = self.compiled.len();
        let index = self.index.min(len.saturating_sub(1));
        TransportSnapshot {
            metadata: AudioMetadata {
                mode: self.mode,
                state: match self.phase {
                    Phase::Stopped => TransportState::Stopped,
                    Phase::CountingIn { .. } => TransportState::CountingIn,
                    Phase::Playing { .. } => TransportState::Playing,
                    Phase::Paused { .. } => TransportState::Paused,
                },
                location: self.compiled.lookup().location(index).copied(),
                scope: self.scope,
                editing_loop_range: self.editing_loop_range,
                event_count: len,
            },
            index,
            loop_range: self.loop_range,
            looping: self.looping,
            playback_speed: self.playback_speed,
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    /// The range of events playback is restricted to by the scope, or every event.
    fn segment(&self) -> RangeInclusive<usize> {
        self.scope
            .and_then(|scope| self.compiled.lookup().scope_range(&scope))
            .unwrap_or(0..=self.compiled.len().saturating_sub(1))
    }

    /// The range playback wraps around in: the loop range when looping, else the segment.
    fn window(&self) -> RangeInclusive<usize> {
        match (self.looping, self.loop_range) {
            (true, Some(range)) => range.range(),
            _ => self.segment(),
        }
    }

    /// Invalidates the outstanding timer.
    fn cancel(&mut self) {
        self.epoch += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Replaces the outstanding timer with one firing `cue` after `delay`, and enters the
    /// playing phase. Returns the deadline.
    fn arm(&mut self, cue: Cue, delay: Duration) -> Instant {
        self.cancel();
        let deadline = Instant::now() + delay;
        let epoch = self.epoch;
        let this = self.this.clone();
        self.timer = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                sleep_until(deadline).await;
            }
            if let Some(scheduler) = this.upgrade() {
                scheduler.fire(epoch);
            }
        }));
        self.phase = Phase::Playing { cue, deadline };
        deadline
    }

    /// Re-arms the outstanding timer for the same deadline under a new epoch.
    fn rearm(&mut self) {
        let now = Instant::now();
        match self.phase {
            Phase::Playing { cue, deadline } => {
                self.arm(cue, deadline.saturating_duration_since(now));
            }
            Phase::CountingIn { deadline } => {
                let deadline = self.arm(Cue::Trigger, deadline.saturating_duration_since(now));
                self.phase = Phase::CountingIn { deadline };
            }
            Phase::Stopped | Phase::Paused { .. } => self.cancel(),
        }
    }

    /// Acts on a cue. Ornamental events are passed over without being triggered.
    fn run(&mut self, cue: Cue) {
        if cue == Cue::RecordingEnd {
            self.recording_ended();
            return;
        }

        let mut cue = cue;
        for _ in 0..=self.compiled.len() {
            if cue == Cue::Advance {
                match self.next_index() {
                    Some(index) => self.index = index,
                    None => {
                        info!("Reached the end.");
                        self.finish();
                        return;
                    }
                }
            }

            let Some(event) = self.compiled.event(self.index) else {
                self.finish();
                return;
            };
            if event.is_ornamental() {
                cue = Cue::Advance;
                continue;
            }

            let duration = event.duration();
            match self
                .engine
                .trigger(&event.sound, Duration::ZERO, duration)
            {
                Ok(()) => {}
                Err(AudioError::NotLoaded) => {
                    debug!(index = self.index, "No instrument loaded, skipping trigger.")
                }
                Err(e) => warn!(index = self.index, err = %e, "Unable to trigger event."),
            }
            debug!(index = self.index, location = ?event.location, ?duration, "Triggered.");
            self.arm(Cue::Advance, duration);
            return;
        }

        warn!("No playable events in the window.");
        self.finish();
    }

    /// The index after the current one, wrapping when looping.
    fn next_index(&self) -> Option<usize> {
        let window = self.window();
        if self.index >= *window.end() {
            self.looping.then_some(*window.start())
        } else {
            Some(self.index + 1)
        }
    }

    /// Playback reached the end of the window.
    fn finish(&mut self) {
        self.cancel();
        self.phase = Phase::Stopped;
        self.index = *self.window().start();
        self.scope = None;
    }

    fn pause(&mut self) {
        match self.phase {
            Phase::Playing { cue, deadline } => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                self.cancel();
                self.phase = Phase::Paused { cue, remaining };
                self.engine.stop_all();
                if self.mode == PlaybackMode::ArtistRecording {
                    self.engine.stop_recording();
                }
                info!(index = self.index, ?remaining, "Paused.");
            }
            Phase::CountingIn { .. } => debug!("Ignoring pause during the count-in."),
            Phase::Stopped | Phase::Paused { .. } => {}
        }
    }

    fn stop(&mut self) {
        self.cancel();
        if self.phase != Phase::Stopped {
            info!(index = self.index, "Stopped.");
        }
        self.phase = Phase::Stopped;
        self.engine.stop_all();
        if self.mode == PlaybackMode::ArtistRecording {
            self.engine.stop_recording();
        }
        self.index = *self.window().start();
        self.scope = None;
    }

    fn seek(&mut self, index: usize) -> Result<(), TransportError> {
        if self.mode == PlaybackMode::ArtistRecording {
            return Err(TransportError::RecordingMode);
        }
        let len = self.compiled.len();
        if index >= len {
            debug!(index, len, "Seek out of range, stopping.");
            self.stop();
            return Err(TransportError::OutOfRange { index, len });
        }

        if !self.segment().contains(&index) {
            self.scope = None;
        }
        self.index = index;
        debug!(index, "Seek.");

        match self.phase {
            Phase::Playing { .. } => {
                self.engine.stop_all();
                self.arm(Cue::Trigger, Duration::ZERO);
            }
            Phase::Paused { .. } => {
                self.cancel();
                self.phase = Phase::Paused {
                    cue: Cue::Trigger,
                    remaining: Duration::ZERO,
                };
            }
            Phase::CountingIn { .. } => self.rearm(),
            Phase::Stopped => self.cancel(),
        }
        Ok(())
    }

    /// Sets the loop range, moving into it when looping from outside it.
    fn apply_loop_range(&mut self, range: Option<LoopRange>) {
        if range != self.loop_range {
            match range {
                Some(range) => info!(%range, "Loop range set."),
                None => info!("Loop range cleared."),
            }
        }
        self.loop_range = range;

        let outside = match (self.looping, range) {
            (true, Some(range)) => !range.contains(self.index),
            _ => false,
        };
        if !outside {
            self.rearm();
            return;
        }

        let start = *self.window().start();
        match self.phase {
            Phase::Playing { .. } => {
                self.index = start;
                self.engine.stop_all();
                self.arm(Cue::Trigger, Duration::ZERO);
            }
            Phase::Paused { .. } => {
                self.index = start;
                self.cancel();
                self.phase = Phase::Paused {
                    cue: Cue::Trigger,
                    remaining: Duration::ZERO,
                };
            }
            Phase::Stopped | Phase::CountingIn { .. } => {
                self.index = start;
                self.rearm();
            }
        }
    }

    fn play_recording(&mut self) -> Result<(), TransportError> {
        let total = self
            .engine
            .recording_duration()
            .ok_or(AudioError::NoRecording)?;
        let (offset, remaining) = match self.phase {
            Phase::Paused { remaining, .. } => (total.saturating_sub(remaining), remaining),
            Phase::Stopped => (Duration::ZERO, total),
            Phase::CountingIn { .. } | Phase::Playing { .. } => return Ok(()),
        };

        self.engine.play_recording(offset)?;
        info!(?offset, "Playing the artist recording.");
        self.arm(Cue::RecordingEnd, remaining);
        Ok(())
    }

    fn recording_ended(&mut self) {
        if !self.looping {
            info!("Recording finished.");
            self.cancel();
            self.phase = Phase::Stopped;
            return;
        }

        self.phase = Phase::Stopped;
        if let Err(e) = self.play_recording() {
            warn!(err = %e, "Unable to restart the recording.");
            self.phase = Phase::Stopped;
        }
    }
}
