use std::fmt;

use serde::{Deserialize, Serialize};

use etude_domain::{ExerciseRuntime, NoteStatus};

/// Share of individual pitches played correctly in the current repetition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum SuccessRate {
    /// Nothing measured yet.
    Unknown,
    /// The exercise has no playable pitches.
    NotApplicable,
    Percent(f32),
}

impl SuccessRate {
    /// Counts chord members individually: a triad is three pitches.
    pub fn measure(runtime: &ExerciseRuntime) -> Self {
        let mut total = 0usize;
        let mut correct = 0usize;
        for note in runtime.notes().iter().filter(|note| note.is_playable()) {
            let required = note.required_pitches().len();
            total += required;
            correct += if note.is_chord() {
                note.correct_midi_values.len().min(required)
            } else if note.status == NoteStatus::Correct {
                1
            } else {
                0
            };
        }
        if total == 0 {
            return SuccessRate::NotApplicable;
        }
        SuccessRate::Percent(correct.min(total) as f32 / total as f32 * 100.0)
    }
}

impl fmt::Display for SuccessRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessRate::Unknown => write!(f, "-- %"),
            SuccessRate::NotApplicable => write!(f, "N/A"),
            SuccessRate::Percent(value) => write!(f, "{value:.1} %"),
        }
    }
}
