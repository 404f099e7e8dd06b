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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::{Event, Step};
use crate::location::Scope;

const PLAY: &str = "play";
const PAUSE: &str = "pause";
const STOP: &str = "stop";
const SEEK: &str = "seek";
const LOOP: &str = "loop";
const UNLOOP: &str = "unloop";
const LOOPING: &str = "looping";
const LOOP_START: &str = "loop_start";
const LOOP_END: &str = "loop_end";
const SPEED: &str = "speed";
const VOLUME: &str = "volume";
const QUIT: &str = "quit";

/// A controller that controls the scheduler using typed commands.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads one command. Returns false once the input is exhausted or the user quits.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} [section[.sub_section[.chord_sequence]]], {}, {}, {} <index>, \
             {} <start> <end>, {}, {} on|off, {} -|+, {} -|+, {} <multiplier>, {} <gain>, \
             {}): ",
            PLAY,
            PAUSE,
            STOP,
            SEEK,
            LOOP,
            UNLOOP,
            LOOPING,
            LOOP_START,
            LOOP_END,
            SPEED,
            VOLUME,
            QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let Some(event) = parse(&input) else {
            warn!(input = input.trim(), "Unrecognized input");
            return Ok(true);
        };
        let quit = event == Event::Quit;
        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(!quit)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

/// Parses a command line into an event.
fn parse(input: &str) -> Option<Event> {
    let input = input.trim().to_lowercase();
    let mut words = input.split_whitespace();
    let command = words.next()?;
    let args: Vec<&str> = words.collect();

    let event = match (command, args.as_slice()) {
        (PLAY, []) => Event::Play(None),
        (PLAY, [scope]) => Event::Play(Some(parse_scope(scope)?)),
        (PAUSE, []) => Event::Pause,
        (STOP, []) => Event::Stop,
        (SEEK, [index]) => Event::Seek(index.parse().ok()?),
        (LOOP, [start, end]) => Event::LoopRange {
            start: start.parse().ok()?,
            end: end.parse().ok()?,
        },
        (UNLOOP, []) => Event::ClearLoopRange,
        (LOOPING, ["on"]) => Event::Looping(true),
        (LOOPING, ["off"]) => Event::Looping(false),
        (LOOP_START, [step]) => Event::LoopStart(parse_step(step)?),
        (LOOP_END, [step]) => Event::LoopEnd(parse_step(step)?),
        (SPEED, [speed]) => Event::Speed(speed.parse().ok()?),
        (VOLUME, [volume]) => Event::Volume(volume.parse().ok()?),
        (QUIT, []) => Event::Quit,
        _ => return None,
    };
    Some(event)
}

fn parse_step(step: &str) -> Option<Step> {
    match step {
        "-" => Some(Step::Earlier),
        "+" => Some(Step::Later),
        _ => None,
    }
}

/// Parses "2", "2.1" or "2.1.0" into a section, sub-section or chord sequence scope.
fn parse_scope(scope: &str) -> Option<Scope> {
    let parts = scope
        .split('.')
        .map(|part| part.parse::<usize>().ok())
        .collect::<Option<Vec<usize>>>()?;

    match parts.as_slice() {
        [section] => Some(Scope::Section(*section)),
        [section, sub_section] => Some(Scope::SubSection {
            section: *section,
            sub_section: *sub_section,
        }),
        [section, sub_section, chord_sequence] => Some(Scope::ChordSequence {
            section: *section,
            sub_section: *sub_section,
            chord_sequence: *chord_sequence,
        }),
        _ => None,
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader, BufWriter};

    use tokio::sync::mpsc;

    use crate::controller::{keyboard::*, Event, Step};
    use crate::location::Scope;

    use super::Driver;

    fn get_event(event: &str) -> Result<Option<Event>, io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader = BufReader::new(event.as_bytes());

        let writer_bytes: Vec<u8> = vec![0; 255];
        let writer = BufWriter::new(writer_bytes);
        Driver::monitor_io(&sender, reader, writer)?;

        // Force the sender to close.
        drop(sender);
        Ok(receiver.blocking_recv())
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(Some(Event::Play(None)), get_event(PLAY)?);
        assert_eq!(Some(Event::Pause), get_event(PAUSE)?);
        assert_eq!(Some(Event::Stop), get_event("  STOP \n")?);
        assert_eq!(Some(Event::Seek(12)), get_event("seek 12")?);
        assert_eq!(
            Some(Event::LoopRange { start: 4, end: 8 }),
            get_event("loop 4 8")?
        );
        assert_eq!(Some(Event::ClearLoopRange), get_event(UNLOOP)?);
        assert_eq!(Some(Event::Looping(true)), get_event("looping on")?);
        assert_eq!(Some(Event::Looping(false)), get_event("looping off")?);
        assert_eq!(
            Some(Event::LoopStart(Step::Earlier)),
            get_event("loop_start -")?
        );
        assert_eq!(Some(Event::LoopEnd(Step::Later)), get_event("loop_end +")?);
        assert_eq!(Some(Event::Speed(0.5)), get_event("speed 0.5")?);
        assert_eq!(Some(Event::Volume(0.8)), get_event("volume 0.8")?);
        assert_eq!(Some(Event::Quit), get_event(QUIT)?);
        Ok(())
    }

    #[test]
    fn test_scopes() -> Result<(), io::Error> {
        assert_eq!(
            Some(Event::Play(Some(Scope::Section(2)))),
            get_event("play 2")?
        );
        assert_eq!(
            Some(Event::Play(Some(Scope::SubSection {
                section: 2,
                sub_section: 1
            }))),
            get_event("play 2.1")?
        );
        assert_eq!(
            Some(Event::Play(Some(Scope::ChordSequence {
                section: 0,
                sub_section: 1,
                chord_sequence: 3
            }))),
            get_event("play 0.1.3")?
        );
        assert_eq!(None, get_event("play 1.2.3.4")?);
        Ok(())
    }

    #[test]
    fn test_unrecognized() -> Result<(), io::Error> {
        assert_eq!(None, get_event("unrecognized")?);
        assert_eq!(None, get_event("seek")?);
        assert_eq!(None, get_event("seek ten")?);
        assert_eq!(None, get_event("looping maybe")?);
        assert_eq!(None, get_event("loop_end ++")?);
        assert_eq!(None, get_event("")?);
        Ok(())
    }

    #[test]
    fn test_end_of_input() -> Result<(), io::Error> {
        let (sender, _receiver) = mpsc::channel::<Event>(1);
        let writer = BufWriter::new(Vec::new());
        assert!(!Driver::monitor_io(&sender, BufReader::new(&b""[..]), writer)?);

        let writer = BufWriter::new(Vec::new());
        assert!(!Driver::monitor_io(&sender, BufReader::new(&b"quit\n"[..]), writer)?);

        let writer = BufWriter::new(Vec::new());
        assert!(Driver::monitor_io(&sender, BufReader::new(&b"bogus\n"[..]), writer)?);
        Ok(())
    }
}
