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
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, error, info, span, Level};

use crate::audio::AudioEngine;
use crate::location::Scope;
use crate::scheduler::{LoopRange, Scheduler, TransportError};

pub mod keyboard;

/// Which way to move a loop boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Earlier,
    Later,
}

/// Controller events that will trigger behavior in the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Starts or resumes playback, optionally restricted to a scope.
    Play(Option<Scope>),

    /// Pauses playback. Ignored during the count-in.
    Pause,

    /// Stops playback and returns to the start.
    Stop,

    /// Moves to the given event index.
    Seek(usize),

    /// Sets the loop range to the given inclusive event indices.
    LoopRange { start: usize, end: usize },

    /// Clears the loop range.
    ClearLoopRange,

    /// Turns looping on or off.
    Looping(bool),

    /// Moves the start of the loop range to the neighbouring playable event.
    LoopStart(Step),

    /// Moves the end of the loop range to the neighbouring playable event.
    LoopEnd(Step),

    /// Sets the playback speed multiplier.
    Speed(f64),

    /// Sets the master volume.
    Volume(f32),

    /// Stops playback and shuts the controller down.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls a scheduler.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver. The first event received counts as the
    /// user gesture that opens the audio output.
    pub fn new(
        scheduler: Arc<Scheduler>,
        engine: Arc<dyn AudioEngine>,
        driver: Arc<dyn Driver>,
    ) -> Controller {
        Controller {
            handle: tokio::spawn(async move {
                Controller::trigger_events(scheduler, engine, driver).await
            }),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers scheduler commands by watching the driver and getting events from it.
    async fn trigger_events(
        scheduler: Arc<Scheduler>,
        engine: Arc<dyn AudioEngine>,
        driver: Arc<dyn Driver>,
    ) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);
        let mut gesture = false;

        info!(events = scheduler.compiled().len(), "Controller started.");

        loop {
            let Some(event) = events_rx.recv().await else {
                info!("Controller closing.");
                if let Err(e) = join_handle.await {
                    error!("Error waiting for event monitor to stop: {}", e);
                }
                return;
            };
            info!(event = format!("{:?}", event), "Received event.");

            if !gesture {
                gesture = true;
                if let Err(e) = engine.user_gesture() {
                    error!(err = %e, "Unable to open the audio output.");
                }
            }

            if event == Event::Quit {
                scheduler.stop();
                info!("Controller quitting.");
                return;
            }

            if let Err(e) = Controller::apply(&scheduler, event) {
                error!("Error talking to scheduler: {}", e);
            }
        }
    }

    fn apply(scheduler: &Scheduler, event: Event) -> Result<(), TransportError> {
        match event {
            Event::Play(scope) => scheduler.play(scope),
            Event::Pause => {
                scheduler.pause();
                Ok(())
            }
            Event::Stop => {
                scheduler.stop();
                Ok(())
            }
            Event::Seek(index) => scheduler.seek(index),
            Event::LoopRange { start, end } => {
                scheduler.set_loop_range(start, end).map(log_loop_range)
            }
            Event::ClearLoopRange => {
                scheduler.clear_loop_range();
                Ok(())
            }
            Event::Looping(looping) => {
                scheduler.set_looping(looping);
                Ok(())
            }
            Event::LoopStart(Step::Earlier) => scheduler.decrement_loop_start().map(log_loop_range),
            Event::LoopStart(Step::Later) => scheduler.increment_loop_start().map(log_loop_range),
            Event::LoopEnd(Step::Earlier) => scheduler.decrement_loop_end().map(log_loop_range),
            Event::LoopEnd(Step::Later) => scheduler.increment_loop_end().map(log_loop_range),
            Event::Speed(speed) => scheduler.set_playback_speed(speed),
            Event::Volume(volume) => scheduler.set_volume(volume),
            Event::Quit => Ok(()),
        }
    }
}

fn log_loop_range(range: LoopRange) {
    debug!(start = range.start, end = range.end, "Loop range updated.");
}

#[cfg(test)]
mod test {
    use std::{io, sync::Arc, time::Duration};

    use parking_lot::Mutex;
    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use crate::{
        audio::mock::MockEngine,
        compiler::{compile, CompileOptions},
        notation::Tab,
        scheduler::{Scheduler, SchedulerOptions, TransportState},
    };

    use super::{Controller, Driver, Event, Step};

    /// Sends a fixed list of events, then closes.
    struct TestDriver {
        events: Mutex<Vec<Event>>,
    }

    impl TestDriver {
        fn new(events: Vec<Event>) -> TestDriver {
            TestDriver {
                events: Mutex::new(events),
            }
        }
    }

    impl Driver for TestDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = std::mem::take(&mut *self.events.lock());
            tokio::spawn(async move {
                for event in events {
                    if events_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(())
            })
        }
    }

    fn scheduler(engine: Arc<MockEngine>) -> Arc<Scheduler> {
        let columns: Vec<String> = (0..6)
            .map(|fret| {
                format!(
                    r#"{{"kind": "note", "frets": ["{}", "", "", "", "", ""], "noteLength": "quarter"}}"#,
                    fret
                )
            })
            .collect();
        let tab = Tab::from_json(&format!(
            r#"{{"bpm": 60, "sections": [{{"id": "s", "data": [{{"type": "tab", "data": [{}]}}]}}]}}"#,
            columns.join(",")
        ))
        .expect("test tab should parse");
        Scheduler::new(
            compile(&tab, CompileOptions::default()),
            engine,
            SchedulerOptions {
                count_in: Duration::ZERO,
                looping: false,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_event_opens_audio() {
        let engine = Arc::new(MockEngine::get("mock"));
        let scheduler = scheduler(engine.clone());
        assert!(!engine.is_open());

        let driver = Arc::new(TestDriver::new(vec![Event::Volume(0.5)]));
        let mut controller = Controller::new(scheduler, engine.clone(), driver);
        controller.join().await.expect("controller should finish");

        assert!(engine.is_open());
        assert_eq!(engine.volume(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_events() {
        let engine = Arc::new(MockEngine::loaded("mock"));
        let scheduler = scheduler(engine.clone());

        let driver = Arc::new(TestDriver::new(vec![
            Event::LoopRange { start: 1, end: 4 },
            Event::LoopStart(Step::Later),
            Event::LoopEnd(Step::Earlier),
            Event::Looping(true),
            Event::Speed(2.0),
            Event::Seek(2),
            Event::Play(None),
            Event::Pause,
        ]));
        let mut controller = Controller::new(scheduler.clone(), engine.clone(), driver);
        controller.join().await.expect("controller should finish");

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.metadata.state, TransportState::Paused);
        assert_eq!(snapshot.index, 2);
        assert!(snapshot.looping);
        assert_eq!(snapshot.playback_speed, 2.0);
        let range = snapshot.loop_range.expect("loop range should be set");
        assert_eq!((range.start, range.end), (2, 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_stop_the_controller() {
        let engine = Arc::new(MockEngine::loaded("mock"));
        let scheduler = scheduler(engine.clone());

        let driver = Arc::new(TestDriver::new(vec![
            Event::Seek(99),
            Event::Speed(-1.0),
            Event::LoopStart(Step::Earlier),
            Event::Volume(0.25),
            Event::Volume(f32::NAN),
            Event::Speed(1e-300),
        ]));
        let mut controller = Controller::new(scheduler.clone(), engine.clone(), driver);
        controller.join().await.expect("controller should finish");

        assert_eq!(engine.volume(), 0.25);
        assert_eq!(scheduler.snapshot().playback_speed, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_stops_playback() {
        let engine = Arc::new(MockEngine::loaded("mock"));
        let scheduler = scheduler(engine.clone());

        let driver = Arc::new(TestDriver::new(vec![
            Event::Play(None),
            Event::Quit,
            Event::Play(None),
        ]));
        let mut controller = Controller::new(scheduler.clone(), engine.clone(), driver);
        controller.join().await.expect("controller should finish");

        assert_eq!(scheduler.snapshot().metadata.state, TransportState::Stopped);
    }
}
