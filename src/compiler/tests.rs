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
use super::*;

fn tab(json: &str) -> Tab {
    Tab::from_json(json).expect("test tab should parse")
}

fn durations(compiled: &CompiledTab) -> Vec<f64> {
    compiled
        .events()
        .iter()
        .map(PlaybackEvent::duration_seconds)
        .collect()
}

fn note(fret: &str, length: &str) -> String {
    format!(
        r#"{{"kind": "note", "frets": ["{}", "", "", "", "", ""], "noteLength": "{}"}}"#,
        fret, length
    )
}

/// Eight quarter notes at 60 bpm with a bar line after the fourth.
fn eight_quarters() -> Tab {
    let mut columns: Vec<String> = (0..8).map(|i| note(&i.to_string(), "quarter")).collect();
    columns.insert(4, r#"{"kind": "measureLine"}"#.to_string());
    tab(&format!(
        r#"{{"bpm": 60, "sections": [{{"id": "a", "data": [{{"type": "tab", "data": [{}]}}]}}]}}"#,
        columns.join(",")
    ))
}

const CHORD_TAB: &str = r#"{
    "bpm": 120,
    "chords": [
        {"name": "G", "frets": ["3", "0", "0", "0", "2", "3"]},
        {"name": "C", "frets": ["0", "1", "0", "2", "3", "x"]}
    ],
    "strummingPatterns": [
        {"name": "Basic", "noteLength": "quarter", "strums": [
            {"strum": "v"}, {"strum": ""}, {"strum": "^>"}, {"strum": "r"}, {"strum": "s", "noteLength": "half"}
        ]},
        {"name": "Silent", "noteLength": "quarter", "strums": [{"strum": ""}]}
    ],
    "sections": [
        {"id": "verse", "data": [
            {"type": "chord", "id": "c", "data": [
                {"id": "one", "strummingPattern": "Basic", "repetitions": 2, "data": ["G", "", "C", "", "Zz"]},
                {"id": "two", "strummingPattern": "Missing", "data": ["G"]},
                {"id": "three", "strummingPattern": 1, "data": ["G"]},
                {"id": "four", "strummingPattern": 0, "bpm": 60, "data": []}
            ]}
        ]}
    ]
}"#;

#[test]
fn test_eight_quarter_notes_at_60_bpm() {
    let compiled = compile(&eight_quarters(), CompileOptions::default());
    assert_eq!(compiled.len(), 8);
    assert_eq!(durations(&compiled), vec![1.0; 8]);
    assert!(compiled.events().iter().all(|e| e.bpm == 60.0));
    assert_eq!(compiled.total_duration(), Duration::from_secs(8));

    // Column 4 is the bar line, so the fifth note sits at column 5.
    assert_eq!(compiled.events()[4].location.index, 5);
}

#[test]
fn test_measure_lines_included_on_request() {
    let compiled = compile(
        &eight_quarters(),
        CompileOptions {
            include_measure_lines: true,
            ..Default::default()
        },
    );
    assert_eq!(compiled.len(), 9);
    assert!(compiled.event(4).unwrap().is_ornamental());
    assert_eq!(compiled.event(4).unwrap().duration_seconds(), 0.0);
    assert!(compiled.is_ornamental(4));
    assert!(!compiled.is_ornamental(3));
    assert!(compiled.is_ornamental(99));
    assert_eq!(compiled.total_duration(), Duration::from_secs(8));
}

#[test]
fn test_event_count_matches_repetitions() {
    let tab = tab(&format!(
        r#"{{"sections": [
            {{"repetitions": 3, "data": [
                {{"type": "tab", "data": [{}, {}, {{"kind": "measureLine"}}]}},
                {{"type": "tab", "repetitions": 2, "data": [{}]}}
            ]}},
            {{"repetitions": 0, "data": [{{"type": "tab", "data": [{}]}}]}},
            {{"data": [{{"type": "tab", "data": [{}, {{"kind": "tuningStart"}}, {{"kind": "bogus"}}]}}]}}
        ]}}"#,
        note("0", "quarter"),
        note("1", "eighth"),
        note("2", "quarter"),
        note("3", "quarter"),
        note("4", "quarter"),
    ));

    let compiled = compile(&tab, CompileOptions::default());
    // 3 × (2 + 2 × 1) + 0 + 1
    assert_eq!(compiled.len(), 13);
    assert_eq!(compiled.lookup().len(), 13);
}

#[test]
fn test_note_pitches_and_rests() {
    let tab = tab(
        r#"{"capo": 1, "sections": [{"data": [{"type": "tab", "data": [
            {"kind": "note", "frets": ["0", "", "", "", "x", "3h5"], "palmMute": "-"},
            {"kind": "note", "frets": ["", "", "", "", "", ""]},
            {"kind": "note", "frets": ["5", "", "", "", "", ""], "rest": true}
        ]}]}]}"#,
    );
    let compiled = compile(&tab, CompileOptions::default());
    assert_eq!(compiled.len(), 3);

    let Sound::Notes { notes, palm_mute } = &compiled.events()[0].sound else {
        panic!("expected notes, got {:?}", compiled.events()[0].sound);
    };
    assert!(palm_mute);
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0].row, 0);
    assert_eq!(notes[0].pitch.midi(), 65);
    assert!(notes[1].dead);
    assert_eq!(notes[1].pitch.midi(), 46);
    assert_eq!(notes[2].pitch.midi(), 44);
    assert_eq!(notes[2].effects, vec![Effect::HammerOn]);

    assert_eq!(compiled.events()[1].sound, Sound::Rest);
    assert_eq!(compiled.events()[2].sound, Sound::Rest);
}

#[test]
fn test_tempo_changes_apply_forward() {
    let tab = tab(&format!(
        r#"{{"bpm": 100, "sections": [{{"data": [
            {{"type": "tab", "bpm": 60, "repetitions": 2, "data": [
                {},
                {{"kind": "measureLine", "tempo": {{"bpm": 120}}}},
                {},
                {{"kind": "measureLine", "tempo": {{"beat": "eighth"}}}},
                {},
                {{"kind": "measureLine", "tempo": {{"bpm": 90, "beat": "quarter"}}}},
                {}
            ]}},
            {{"type": "tab", "data": [{}]}}
        ]}}]}}"#,
        note("0", "quarter"),
        note("1", "quarter"),
        note("2", "eighth"),
        note("3", "quarter dotted"),
        note("4", "quarter"),
    ));
    let compiled = compile(&tab, CompileOptions::default());
    let bpms: Vec<f64> = compiled.events().iter().map(|e| e.bpm).collect();
    // The change list resets on the second pass; the next sub-section uses the tab tempo.
    assert_eq!(bpms, vec![60.0, 120.0, 120.0, 90.0, 60.0, 120.0, 120.0, 90.0, 100.0]);

    let multipliers: Vec<f64> = compiled
        .events()
        .iter()
        .map(|e| e.note_length_multiplier)
        .collect();
    assert_eq!(multipliers, vec![1.0, 1.0, 1.0, 1.5, 1.0, 1.0, 1.0, 1.5, 1.0]);

    let seconds = durations(&compiled);
    assert_eq!(seconds[0], 1.0);
    assert_eq!(seconds[1], 0.5);
    // An eighth note with an eighth beat at 120 bpm.
    assert_eq!(seconds[2], 0.5);
    assert_eq!(seconds[3], 1.0);
    assert_eq!(seconds[8], 0.6);
}

#[test]
fn test_chord_sequences() {
    let compiled = compile(&tab(CHORD_TAB), CompileOptions::default());

    // "one" twice with four non-empty strums; "two" and "three" have no usable pattern;
    // "four" has no chords but still strums.
    assert_eq!(compiled.len(), 12);

    let first = &compiled.events()[0];
    assert_eq!(first.bpm, 120.0);
    assert_eq!(first.duration_seconds(), 0.5);
    assert_eq!(
        first.location,
        Location {
            section: 0,
            sub_section: 0,
            chord_sequence: Some(0),
            index: 0
        }
    );
    let Sound::Strum {
        chord,
        pitches,
        stroke,
        accented,
        palm_mute,
    } = &first.sound
    else {
        panic!("expected a strum, got {:?}", first.sound);
    };
    assert_eq!(chord.as_deref(), Some("G"));
    assert_eq!(pitches.len(), 6);
    assert_eq!(*stroke, Stroke::Down);
    assert!(!accented);
    assert!(!palm_mute);

    // The empty strum at position 1 is skipped.
    let second = &compiled.events()[1];
    assert_eq!(second.location.index, 2);
    let Sound::Strum {
        chord,
        pitches,
        stroke,
        accented,
        ..
    } = &second.sound
    else {
        panic!("expected a strum, got {:?}", second.sound);
    };
    assert_eq!(chord.as_deref(), Some("C"));
    assert_eq!(pitches.len(), 5);
    assert_eq!(*stroke, Stroke::Up);
    assert!(accented);

    assert_eq!(compiled.events()[2].sound, Sound::Rest);

    // Unknown chord names strum nothing; the per-strum length overrides the pattern's.
    let slap = &compiled.events()[3];
    assert_eq!(slap.duration_seconds(), 1.0);
    let Sound::Strum {
        chord,
        pitches,
        stroke,
        ..
    } = &slap.sound
    else {
        panic!("expected a strum, got {:?}", slap.sound);
    };
    assert_eq!(chord.as_deref(), Some("Zz"));
    assert!(pitches.is_empty());
    assert_eq!(*stroke, Stroke::Slap);

    // Sequence bpm overrides everything else.
    let last = compiled.events().last().unwrap();
    assert_eq!(last.bpm, 60.0);
    assert_eq!(last.location.chord_sequence, Some(3));
    let Sound::Strum { chord, .. } = &last.sound else {
        panic!("expected a strum, got {:?}", last.sound);
    };
    assert_eq!(*chord, None);

    let placeholders: Vec<Scope> = compiled
        .lookup()
        .placeholders()
        .iter()
        .map(|p| p.scope)
        .collect();
    assert_eq!(
        placeholders,
        vec![
            Scope::ChordSequence {
                section: 0,
                sub_section: 0,
                chord_sequence: 1
            },
            Scope::ChordSequence {
                section: 0,
                sub_section: 0,
                chord_sequence: 2
            },
        ]
    );
    assert_eq!(compiled.lookup().placeholders()[0].index, 8);
}

#[test]
fn test_chords_only_view() {
    let tab = tab(&format!(
        r#"{{"strummingPatterns": [{{"name": "p", "strums": [{{"strum": "v"}}]}}],
            "sections": [{{"data": [
                {{"type": "tab", "data": [{}]}},
                {{"type": "chord", "data": [{{"strummingPattern": "p", "data": ["G"]}}]}}
            ]}}]}}"#,
        note("0", "quarter"),
    ));

    let full = compile(&tab, CompileOptions::default());
    assert_eq!(full.len(), 2);

    let chords_only = full.with_options(CompileOptions {
        view_mode: ViewMode::ChordsOnly,
        ..Default::default()
    });
    assert_eq!(chords_only.len(), 1);
    assert_eq!(chords_only.events()[0].location.sub_section, 1);
    assert_eq!(
        chords_only.lookup().placeholders()[0].scope,
        Scope::SubSection {
            section: 0,
            sub_section: 0
        }
    );
}

#[test]
fn test_empty_units_become_placeholders() {
    let tab = tab(&format!(
        r#"{{"sections": [
            {{"data": [{{"type": "tab", "data": [{}]}}, {{"type": "tab", "data": "broken"}}]}},
            {{"data": []}},
            {{"data": [{{"type": "chord", "data": []}}, {{"type": "tab", "data": [{}]}}]}}
        ]}}"#,
        note("0", "quarter"),
        note("1", "quarter"),
    ));
    let compiled = compile(&tab, CompileOptions::default());
    assert_eq!(compiled.len(), 2);

    let placeholders = compiled.lookup().placeholders();
    assert_eq!(placeholders.len(), 3);
    assert_eq!(
        placeholders[0].scope,
        Scope::SubSection {
            section: 0,
            sub_section: 1
        }
    );
    assert_eq!(placeholders[0].index, 1);
    assert_eq!(placeholders[1].scope, Scope::Section(1));
    assert_eq!(placeholders[1].index, 1);
    assert_eq!(
        placeholders[2].scope,
        Scope::SubSection {
            section: 2,
            sub_section: 0
        }
    );
    assert_eq!(placeholders[2].index, 1);
}

#[test]
fn test_compile_is_idempotent() {
    let tab = tab(CHORD_TAB);
    let first = compile(&tab, CompileOptions::default());
    let second = compile(&tab, CompileOptions::default());
    assert_eq!(first, second);
    assert_eq!(first.events(), second.events());
}

#[test]
fn test_with_playback_speed() {
    let compiled = compile(&eight_quarters(), CompileOptions::default());
    let doubled = compiled.with_playback_speed(2.0);
    assert_eq!(doubled.len(), compiled.len());
    assert_eq!(durations(&doubled), vec![0.5; 8]);
    assert!(doubled.events().iter().all(|e| e.playback_speed == 2.0));

    let halved = compiled.with_playback_speed(0.5);
    assert_eq!(durations(&halved), vec![2.0; 8]);

    // Nonsense speeds fall back to normal speed.
    let invalid = compiled.with_playback_speed(0.0);
    assert_eq!(durations(&invalid), vec![1.0; 8]);

    for speed in [1e-300, 1e300, f64::NAN, 4.0] {
        let extreme = compiled.with_playback_speed(speed);
        assert_eq!(extreme.options().playback_speed, 1.0);
        assert_eq!(extreme.total_duration(), Duration::from_secs(8));
    }
}

#[test]
fn test_absurd_tempos_fall_back_to_the_default() {
    let tab = tab(&format!(
        r#"{{"bpm": 1e-300, "sections": [
            {{"data": [{{"type": "tab", "bpm": "1e300", "data": [{}]}}]}},
            {{"data": [{{"type": "tab", "data": [{}]}}]}}
        ]}}"#,
        note("0", "quarter"),
        note("1", "quarter"),
    ));
    assert_eq!(tab.bpm, None);

    let compiled = compile(&tab, CompileOptions::default());
    assert_eq!(compiled.len(), 2);
    assert!(compiled.events().iter().all(|e| e.bpm == 75.0));
    assert_eq!(compiled.total_duration(), Duration::from_secs_f64(2.0 * 60.0 / 75.0));
}

#[test]
fn test_duration_never_panics() {
    let compiled = compile(&eight_quarters(), CompileOptions::default());
    let mut event = compiled.events()[0].clone();
    event.bpm = 1e-300;
    assert_eq!(event.duration(), Duration::ZERO);
    event.bpm = f64::NAN;
    assert_eq!(event.duration(), Duration::ZERO);
}

#[test]
fn test_round_trip_location_lookup() {
    let compiled = compile(&tab(CHORD_TAB), CompileOptions::default());
    for index in 0..compiled.len() {
        let location = *compiled.lookup().location(index).unwrap();
        let found = compiled.lookup().index_of(&location, index).unwrap();
        assert!(found >= index);
        assert!(found < compiled.len());
    }
}

#[test]
fn test_empty_tab() {
    let compiled = compile(&Tab::default(), CompileOptions::default());
    assert!(compiled.is_empty());
    assert_eq!(compiled.total_duration(), Duration::ZERO);
}

#[test]
fn test_bundled_practice_riff() -> Result<(), Box<dyn std::error::Error>> {
    let tab = Tab::load(std::path::Path::new("assets/tabs/riff.json"))?;
    let compiled = compile(&tab, CompileOptions::default());

    // Two passes of eight intro columns, then two passes of a four strum pattern.
    assert_eq!(compiled.len(), 24);
    assert!((compiled.total_duration().as_secs_f64() - 8.4).abs() < 1e-6);
    assert!(matches!(
        compiled.events()[16].sound,
        Sound::Strum { accented: true, .. }
    ));
    assert_eq!(compiled.events()[7].sound, Sound::Rest);
    Ok(())
}
