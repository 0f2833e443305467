use tracing::debug;

use etude_domain::ExerciseRuntime;
use etude_notation::TextScore;
use etude_tutor::{ControlState, ExerciseSummary, Presenter, SuccessRate};

/// Writes tutor output to stdout. Repeated values are printed once.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    score: TextScore,
    last_info: String,
    last_rate: Option<SuccessRate>,
    controls: Option<ControlState>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn enabled(controls: &ControlState) -> String {
    let names: Vec<&str> = [
        (controls.start, "start"),
        (controls.stop, "stop"),
        (controls.category, "category"),
        (controls.exercise, "exercise"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

impl Presenter for ConsolePresenter {
    fn show_categories(&mut self, categories: &[(String, String)]) {
        println!("Categories:");
        for (key, label) in categories {
            println!("  {key:<24} {label}");
        }
    }

    fn show_exercises(&mut self, category: Option<&str>, exercises: &[ExerciseSummary]) {
        let Some(category) = category else {
            return;
        };
        println!("Exercises in {category}:");
        for exercise in exercises {
            println!("  {:<24} {}", exercise.id, exercise.name);
        }
    }

    fn render(&mut self, runtime: &ExerciseRuntime) {
        println!("{}", self.score.render(runtime));
    }

    fn clear_score(&mut self, message: &str) {
        println!("[score] {message}");
    }

    fn scroll_to(&mut self, offset: f32) {
        debug!(offset, "scroll");
    }

    fn show_info(&mut self, message: &str) {
        if self.last_info != message {
            println!(">> {message}");
            self.last_info = message.to_string();
        }
    }

    fn show_played(&mut self, text: &str, wrong: bool) {
        if wrong {
            println!("   played: {text} (wrong)");
        } else if text != "--" {
            println!("   played: {text}");
        }
    }

    fn show_success_rate(&mut self, rate: SuccessRate) {
        if self.last_rate != Some(rate) {
            println!("   success: {rate}");
            self.last_rate = Some(rate);
        }
    }

    fn show_midi_status(&mut self, message: &str, connected: bool) {
        let marker = if connected { "+" } else { "-" };
        println!("[midi {marker}] {message}");
    }

    fn set_controls(&mut self, controls: ControlState) {
        if self.controls != Some(controls) {
            debug!(enabled = %enabled(&controls), "controls changed");
            self.controls = Some(controls);
        }
    }

    fn alert(&mut self, message: &str) {
        eprintln!("!! {message}");
    }
}
