//! Macro notation (MML) codec
//!
//! Text form: `t<bpm>` tempo, `o<n>` octave, `l<n>` default length, `<`/`>`
//! octave down/up, `&`/`^` tie, `r<len>` rest, and note letters `a`-`g` with
//! any number of `+`/`#`/`-` modifiers followed by an optional length. A length
//! `n` is a 1/n note; each trailing `.` adds half the previous addition.
//!
//! Parsing is lenient: characters that start no token are skipped.

use std::fmt::Write as _;

use tracing::debug;

use crate::config::EditorConfig;
use crate::note::{Note, MAX_PITCH};

/// Duration table in 960ths of a whole note, longest first. The empty suffix is
/// the `l8` default emitted in the header.
const LENGTH_TABLE: [(f64, &str); 21] = [
    (960.0, "1"),
    (840.0, "2.."),
    (720.0, "2."),
    (480.0, "2"),
    (420.0, "4.."),
    (360.0, "4."),
    (240.0, "4"),
    (210.0, "8.."),
    (180.0, "8."),
    (120.0, ""),
    (105.0, "16.."),
    (90.0, "16."),
    (60.0, "16"),
    (45.0, "32."),
    (30.0, "32"),
    (16.0, "60"),
    (15.0, "64"),
    (8.0, "120"),
    (4.0, "240"),
    (2.0, "480"),
    (1.0, "960"),
];

const NOTE_NAMES: [&str; 12] = ["c", "d-", "d", "e-", "e", "f", "g-", "g", "a-", "a", "b-", "b"];

const DEFAULT_OCTAVE: i32 = 4;
const DEFAULT_LENGTH: u32 = 8;

/// Result of parsing notation text
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Last `t` directive, if any
    pub tempo: Option<f64>,
    /// Notes in onset order
    pub notes: Vec<Note>,
}

/// Codec settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Notation {
    /// Ticks per whole note
    pub timebase: u32,
    /// Octave number offset (`o4c` is pitch `(4 - octave_adjust) * 12`)
    pub octave_adjust: i32,
    /// Velocity given to decoded notes
    pub velocity: u8,
}

impl Default for Notation {
    fn default() -> Self {
        Self {
            timebase: 16,
            octave_adjust: -1,
            velocity: 100,
        }
    }
}

impl From<&EditorConfig> for Notation {
    fn from(config: &EditorConfig) -> Self {
        Self {
            timebase: config.timebase.max(1),
            octave_adjust: config.octave_adjust,
            velocity: config.default_velocity,
        }
    }
}

/// A note under construction; lengths stay fractional until the end so ties
/// and rests accumulate without drift.
struct Pending {
    start: f64,
    pitch: i64,
    length: f64,
}

struct Cursor<'a> {
    text: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Unsigned decimal run; zero when there are no digits
    fn number(&mut self) -> u32 {
        let mut n: u32 = 0;
        while let Some(c @ b'0'..=b'9') = self.peek() {
            n = n.saturating_mul(10).saturating_add((c - b'0') as u32);
            self.pos += 1;
        }
        n
    }

    /// Length in ticks: optional 1/n divisor (default when absent or zero),
    /// then any number of dots
    fn length(&mut self, timebase: f64, default: u32) -> f64 {
        let n = match self.number() {
            0 => default,
            n => n,
        };
        let mut length = timebase / n as f64;
        let mut add = length;
        while self.peek() == Some(b'.') {
            self.pos += 1;
            add /= 2.0;
            length += add;
        }
        length
    }

    /// Semitone for a note letter plus its modifiers
    fn semitone(&mut self, letter: u8) -> i32 {
        let mut n: i32 = match letter.to_ascii_lowercase() {
            b'c' => 0,
            b'd' => 2,
            b'e' => 4,
            b'f' => 5,
            b'g' => 7,
            b'a' => 9,
            _ => 11,
        };
        loop {
            match self.peek() {
                Some(b'+' | b'#') => n = n.saturating_add(1),
                Some(b'-') => n = n.saturating_sub(1),
                _ => return n,
            }
            self.pos += 1;
        }
    }
}

impl Notation {
    pub fn new(timebase: u32, octave_adjust: i32) -> Self {
        Self {
            timebase: timebase.max(1),
            octave_adjust,
            ..Default::default()
        }
    }

    /// Parse notation text into notes starting at tick 0
    pub fn decode(&self, text: &str) -> Decoded {
        let timebase = self.timebase.max(1) as f64;
        let mut cursor = Cursor {
            text: text.as_bytes(),
            pos: 0,
        };
        let mut octave = DEFAULT_OCTAVE;
        let mut default_len = DEFAULT_LENGTH;
        let mut tempo = None;
        let mut tie = false;
        let mut t = 0.0;
        let mut pending: Vec<Pending> = Vec::new();
        let mut last: Option<usize> = None;

        while let Some(c) = cursor.bump() {
            match c {
                b'>' => octave = octave.saturating_add(1),
                b'<' => octave = octave.saturating_sub(1),
                b'&' | b'^' => tie = true,
                b't' | b'T' => {
                    let bpm = cursor.number();
                    if bpm > 0 {
                        tempo = Some(bpm as f64);
                    }
                }
                b'o' | b'O' => octave = cursor.number().min(i32::MAX as u32) as i32,
                b'l' | b'L' => {
                    let n = cursor.number();
                    if n > 0 {
                        default_len = n;
                    }
                }
                b'r' | b'R' => {
                    t += cursor.length(timebase, default_len);
                    tie = false;
                }
                b'a'..=b'g' | b'A'..=b'G' => {
                    let semitone = cursor.semitone(c);
                    let length = cursor.length(timebase, default_len);
                    let pitch = (octave as i64 - self.octave_adjust as i64) * 12 + semitone as i64;

                    let merged = match last {
                        Some(i) if tie && pending[i].pitch == pitch => {
                            pending[i].length += length;
                            true
                        }
                        _ => false,
                    };
                    if !merged && (0..=MAX_PITCH as i64).contains(&pitch) {
                        pending.push(Pending { start: t, pitch, length });
                        last = Some(pending.len() - 1);
                    }
                    tie = false;
                    t += length;
                }
                _ => {}
            }
        }

        let notes: Vec<Note> = pending
            .into_iter()
            .map(|p| {
                let duration = (p.length.round() as u64).max(1);
                Note::new(p.start.round() as u64, p.pitch as u8, duration, self.velocity)
            })
            .collect();
        debug!(count = notes.len(), ?tempo, "decoded notation");
        Decoded { tempo, notes }
    }

    /// Serialize notes. The text form is a single voice: any note still
    /// sounding at the next onset is cut short at that onset, whatever its
    /// pitch, and a note sharing its onset with the next one is dropped. Chords
    /// and overlapping notes on different pitches therefore do not survive;
    /// only sequences without such overlaps round-trip exactly.
    pub fn encode(&self, notes: &[Note], tempo: f64) -> String {
        let mut sorted = notes.to_vec();
        sorted.sort_by_key(|n| n.start_tick);

        let mut out = format!("t{}o{DEFAULT_OCTAVE}l{DEFAULT_LENGTH}", tempo.round().max(1.0) as u64);
        let mut tick = 0;
        let mut octave = DEFAULT_OCTAVE as i64 - self.octave_adjust as i64;

        for (i, note) in sorted.iter().enumerate() {
            if note.start_tick > tick {
                self.push_length(&mut out, "r", note.start_tick - tick);
            }

            let pitch = note.pitch as i64;
            if pitch < octave * 12 || pitch >= octave * 12 + 12 {
                octave = pitch / 12;
                let written = octave + self.octave_adjust as i64;
                if written < 0 {
                    out.push_str("o0");
                    (written..0).for_each(|_| out.push('<'));
                } else {
                    let _ = write!(out, "o{written}");
                }
            }

            let mut length = note.duration_ticks;
            match sorted.get(i + 1) {
                Some(next) if next.start_tick < note.end_tick() => {
                    length = next.start_tick - note.start_tick;
                    tick = next.start_tick;
                }
                _ => tick = note.end_tick(),
            }
            self.push_length(&mut out, NOTE_NAMES[(pitch % 12) as usize], length);
        }
        out
    }

    /// Greedy decomposition over the length table, joined with ties. Any
    /// remainder under one 960th is dropped.
    fn push_length(&self, out: &mut String, name: &str, ticks: u64) {
        let mut rest = ticks as f64 * 960.0 / self.timebase.max(1) as f64;
        let mut first = true;
        for &(units, suffix) in &LENGTH_TABLE {
            while rest >= units - 1e-9 {
                rest -= units;
                if !first {
                    out.push('&');
                }
                first = false;
                out.push_str(name);
                out.push_str(suffix);
            }
        }
    }
}

/// Decode with the default codec settings (timebase 16, `o4c` = 60)
pub fn decode(text: &str) -> Decoded {
    Notation::default().decode(text)
}

/// Encode with the default codec settings
pub fn encode(notes: &[Note], tempo: f64) -> String {
    Notation::default().encode(notes, tempo)
}
