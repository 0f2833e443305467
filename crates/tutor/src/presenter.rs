use serde::{Deserialize, Serialize};

use etude_domain::ExerciseRuntime;

use crate::scoring::SuccessRate;

/// Which user actions are currently allowed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlState {
    pub start: bool,
    pub stop: bool,
    pub category: bool,
    pub exercise: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseSummary {
    pub id: String,
    pub name: String,
}

/// Latest values of every text field the UI shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusBoard {
    pub info: String,
    pub played: String,
    pub played_wrong: bool,
    pub success_rate: SuccessRate,
    pub midi_status: String,
    pub midi_connected: bool,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            info: String::new(),
            played: "--".to_string(),
            played_wrong: false,
            success_rate: SuccessRate::Unknown,
            midi_status: "No MIDI device".to_string(),
            midi_connected: false,
        }
    }
}

/// Sink for everything the tutor wants shown. Implementations draw; they never call back
/// into the tutor.
pub trait Presenter {
    fn show_categories(&mut self, categories: &[(String, String)]);
    fn show_exercises(&mut self, category: Option<&str>, exercises: &[ExerciseSummary]);
    /// Draws the score with the current note statuses.
    fn render(&mut self, runtime: &ExerciseRuntime);
    /// Replaces the score area with a message.
    fn clear_score(&mut self, message: &str);
    fn scroll_to(&mut self, offset: f32);
    fn show_info(&mut self, message: &str);
    fn show_played(&mut self, text: &str, wrong: bool);
    fn show_success_rate(&mut self, rate: SuccessRate);
    fn show_midi_status(&mut self, message: &str, connected: bool);
    fn set_controls(&mut self, controls: ControlState);
    /// Prominent, blocking-style warning.
    fn alert(&mut self, message: &str);
}
