use serde::{Deserialize, Serialize};

use crate::pitch::{is_rest_key, note_name, parse_key, validate_midi};
use crate::DomainError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Staff {
    Treble,
    Bass,
    Single,
}

impl Staff {
    pub const ALL: [Staff; 3] = [Staff::Treble, Staff::Bass, Staff::Single];

    pub fn label(self) -> &'static str {
        match self {
            Staff::Treble => "Treble",
            Staff::Bass => "Bass",
            Staff::Single => "Staff",
        }
    }
}

/// What sounds when an event begins.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NotePitch {
    Rest,
    Single(u8),
    /// Required pitches of a chord, deduplicated, never empty.
    Chord(Vec<u8>),
}

impl NotePitch {
    pub fn chord(values: Vec<u8>) -> Result<Self, DomainError> {
        let mut pitches = Vec::with_capacity(values.len());
        for value in values {
            let value = validate_midi(value)?;
            if !pitches.contains(&value) {
                pitches.push(value);
            }
        }
        if pitches.is_empty() {
            return Err(DomainError::validation("a chord needs at least one pitch"));
        }
        Ok(NotePitch::Chord(pitches))
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, NotePitch::Rest)
    }

    pub fn pitches(&self) -> &[u8] {
        match self {
            NotePitch::Rest => &[],
            NotePitch::Single(value) => std::slice::from_ref(value),
            NotePitch::Chord(values) => values,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            NotePitch::Rest => "Rest".to_string(),
            NotePitch::Single(value) => note_name(*value),
            NotePitch::Chord(values) => format!(
                "({})",
                values
                    .iter()
                    .map(|value| note_name(*value))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNoteEvent", into = "RawNoteEvent")]
pub struct NoteEvent {
    /// Notation keys as written in the catalog (`c/4`, `r/4`).
    pub keys: Vec<String>,
    /// Notation duration code (`q`, `8`, `hd`, `qr`).
    pub duration: String,
    pub pitch: NotePitch,
}

impl NoteEvent {
    pub fn note(midi: u8, duration: impl Into<String>) -> Self {
        Self {
            keys: vec![key_for(midi)],
            duration: duration.into(),
            pitch: NotePitch::Single(midi),
        }
    }

    pub fn chord(pitches: &[u8], duration: impl Into<String>) -> Self {
        Self {
            keys: pitches.iter().map(|midi| key_for(*midi)).collect(),
            duration: duration.into(),
            pitch: NotePitch::Chord(pitches.to_vec()),
        }
    }

    pub fn rest(duration: impl Into<String>) -> Self {
        Self {
            keys: vec!["r/4".to_string()],
            duration: duration.into(),
            pitch: NotePitch::Rest,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_rest()
    }
}

fn key_for(midi: u8) -> String {
    let name = note_name(midi).to_ascii_lowercase();
    let split = name
        .find(|c: char| c.is_ascii_digit() || c == '-')
        .unwrap_or(name.len());
    format!("{}/{}", &name[..split], &name[split..])
}

/// Wire shape of a note event in catalog files.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNoteEvent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    keys: Vec<String>,
    duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    midi_value: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    midi_values: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    rest: bool,
}

impl TryFrom<RawNoteEvent> for NoteEvent {
    type Error = DomainError;

    fn try_from(raw: RawNoteEvent) -> Result<Self, Self::Error> {
        let marked_rest = raw.rest
            || raw.keys.first().map(|key| is_rest_key(key)).unwrap_or(false)
            || raw.duration.trim().to_ascii_lowercase().ends_with('r');

        let pitch = match (marked_rest, raw.midi_value, raw.midi_values) {
            (true, None, None) => NotePitch::Rest,
            (true, _, _) => {
                return Err(DomainError::validation(
                    "a rest cannot carry midi values",
                ))
            }
            (false, Some(_), Some(_)) => {
                return Err(DomainError::validation(
                    "an event has either midiValue or midiValues, not both",
                ))
            }
            (false, Some(value), None) => NotePitch::Single(validate_midi(value)?),
            (false, None, Some(values)) => NotePitch::chord(values)?,
            (false, None, None) => match raw.keys.as_slice() {
                [] => {
                    return Err(DomainError::validation(
                        "an event needs keys, a midi value or a rest marker",
                    ))
                }
                [key] => NotePitch::Single(parse_key(key)?),
                keys => NotePitch::chord(
                    keys.iter()
                        .map(|key| parse_key(key))
                        .collect::<Result<Vec<_>, _>>()?,
                )?,
            },
        };

        if raw.duration.trim().is_empty() {
            return Err(DomainError::validation("an event needs a duration"));
        }

        Ok(Self {
            keys: raw.keys,
            duration: raw.duration,
            pitch,
        })
    }
}

impl From<NoteEvent> for RawNoteEvent {
    fn from(event: NoteEvent) -> Self {
        let (midi_value, midi_values, rest) = match event.pitch {
            NotePitch::Rest => (None, None, true),
            NotePitch::Single(value) => (Some(value), None, false),
            NotePitch::Chord(values) => (None, Some(values), false),
        };
        Self {
            keys: event.keys,
            duration: event.duration,
            midi_value,
            midi_values,
            rest,
        }
    }
}
