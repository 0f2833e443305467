use crate::DomainError;

pub const MAX_MIDI: u8 = 127;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name for a MIDI note number (60 = "C4").
pub fn note_name(midi: u8) -> String {
    let octave = i16::from(midi / 12) - 1;
    format!("{}{}", NOTE_NAMES[usize::from(midi % 12)], octave)
}

pub fn validate_midi(value: u8) -> Result<u8, DomainError> {
    if value > MAX_MIDI {
        return Err(DomainError::validation(format!(
            "midi value {value} is outside 0..=127"
        )));
    }
    Ok(value)
}

/// Parses a notation key such as `c/4`, `f#/3` or `bb/2` into a MIDI note number.
pub fn parse_key(key: &str) -> Result<u8, DomainError> {
    let mut parts = key.trim().split('/');
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let octave = parts
        .next()
        .ok_or_else(|| DomainError::validation(format!("key `{key}` has no octave")))?
        .parse::<i16>()
        .map_err(|_| DomainError::validation(format!("key `{key}` has an invalid octave")))?;
    if !(-1..=9).contains(&octave) {
        return Err(DomainError::validation(format!(
            "key `{key}` is outside the midi range"
        )));
    }

    let mut chars = name.chars();
    let base: i16 = match chars.next() {
        Some('c') => 0,
        Some('d') => 2,
        Some('e') => 4,
        Some('f') => 5,
        Some('g') => 7,
        Some('a') => 9,
        Some('b') => 11,
        _ => {
            return Err(DomainError::validation(format!(
                "key `{key}` does not name a pitch"
            )))
        }
    };
    let symbols = chars.as_str();
    if symbols.chars().count() > 2 {
        return Err(DomainError::validation(format!(
            "key `{key}` has more than two accidentals"
        )));
    }
    let mut accidental = 0i16;
    for symbol in symbols.chars() {
        accidental += match symbol {
            '#' => 1,
            'b' => -1,
            'n' => 0,
            _ => {
                return Err(DomainError::validation(format!(
                    "key `{key}` has an unknown accidental `{symbol}`"
                )))
            }
        };
    }

    let midi = (octave + 1) * 12 + base + accidental;
    u8::try_from(midi)
        .ok()
        .filter(|value| *value <= MAX_MIDI)
        .ok_or_else(|| DomainError::validation(format!("key `{key}` is outside the midi range")))
}

/// Rest keys use the `r/` prefix.
pub fn is_rest_key(key: &str) -> bool {
    key.trim().to_ascii_lowercase().starts_with("r/")
}
