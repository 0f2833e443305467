use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::completion::Advancement;
use crate::error::TutorError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TutorSettings {
    /// Categories whose exercises follow catalog order; every other category picks at random.
    pub ordered_categories: Vec<String>,
    /// Pause between a finished repetition and the next one.
    pub repetition_delay_ms: u64,
    /// Pause before the next exercise of the category is loaded.
    pub next_exercise_delay_ms: u64,
    /// Pause between loading the next exercise and starting it.
    pub auto_start_delay_ms: u64,
    pub render_target: String,
    pub midi_port: Option<String>,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            ordered_categories: Vec::new(),
            repetition_delay_ms: 1500,
            next_exercise_delay_ms: 2500,
            auto_start_delay_ms: 200,
            render_target: "score".to_string(),
            midi_port: None,
        }
    }
}

impl TutorSettings {
    /// Reads settings from JSON, or YAML when the file ends in `.yaml`/`.yml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TutorError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|err| TutorError::Settings(format!("{}: {err}", path.display())))?;
        let yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        if yaml {
            serde_yaml::from_str(&source).map_err(|err| TutorError::Settings(err.to_string()))
        } else {
            serde_json::from_str(&source).map_err(|err| TutorError::Settings(err.to_string()))
        }
    }

    pub fn advancement_for(&self, category: &str) -> Advancement {
        if self.ordered_categories.iter().any(|key| key == category) {
            Advancement::Ordered
        } else {
            Advancement::Random
        }
    }

    pub fn repetition_delay(&self) -> Duration {
        Duration::from_millis(self.repetition_delay_ms)
    }

    pub fn next_exercise_delay(&self) -> Duration {
        Duration::from_millis(self.next_exercise_delay_ms)
    }

    pub fn auto_start_delay(&self) -> Duration {
        Duration::from_millis(self.auto_start_delay_ms)
    }
}
