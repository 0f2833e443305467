use serde::{Deserialize, Serialize};

use etude_domain::ExerciseRuntime;

use crate::error::TutorError;

/// Cursor position within the exercise and its repetitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressCursor {
    pub current_tick: u32,
    /// 1-based.
    pub current_repetition: u32,
}

impl Default for ProgressCursor {
    fn default() -> Self {
        Self {
            current_tick: 0,
            current_repetition: 1,
        }
    }
}

/// Everything the tutor knows about the running session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub category: Option<String>,
    pub runtime: Option<ExerciseRuntime>,
    pub cursor: ProgressCursor,
    pub playing: bool,
    pub midi_ready: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exercise_id(&self) -> Option<&str> {
        self.runtime.as_ref().map(|runtime| runtime.id.as_str())
    }

    pub fn target_repetitions(&self) -> u32 {
        self.runtime
            .as_ref()
            .map(|runtime| runtime.target_repetitions)
            .unwrap_or(1)
    }

    pub fn has_playable_notes(&self) -> bool {
        self.runtime
            .as_ref()
            .is_some_and(ExerciseRuntime::has_playable_notes)
    }

    /// Stops playback and rewinds to the first tick of the first repetition.
    pub fn rewind(&mut self) {
        self.playing = false;
        self.cursor = ProgressCursor::default();
    }

    pub fn clear_exercise(&mut self) {
        self.rewind();
        self.runtime = None;
    }

    pub fn check_startable(&self) -> Result<(), TutorError> {
        if !self.midi_ready {
            return Err(TutorError::MidiNotReady);
        }
        let runtime = self.runtime.as_ref().ok_or(TutorError::NoExercise)?;
        if !runtime.has_playable_notes() {
            return Err(TutorError::NoPlayableNotes(runtime.name.clone()));
        }
        if self.playing {
            return Err(TutorError::AlreadyPlaying);
        }
        Ok(())
    }
}
