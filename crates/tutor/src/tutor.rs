use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use etude_domain::{category_label, Catalog, ExerciseRuntime};
use etude_notation::{ScoreLayout, TickLayout};

use crate::completion::{plan_completion, Completion, ExercisePicker, RandomPicker};
use crate::config::TutorSettings;
use crate::engine::{evaluate_step, mark_expected, register_pitch, NoteMatch, StepState};
use crate::error::TutorError;
use crate::presenter::{ControlState, ExerciseSummary, Presenter, StatusBoard};
use crate::scoring::SuccessRate;
use crate::session::{ProgressCursor, SessionState};
use crate::transition::{PendingTransition, Transition, TransitionSlot};

/// Owns the session and is its only mutator. Every entry point runs to completion; delayed
/// work is parked in a [`TransitionSlot`] for the driver to fire later.
pub struct Tutor<P: Presenter> {
    catalog: Arc<Catalog>,
    settings: TutorSettings,
    layout: Box<dyn ScoreLayout>,
    picker: Box<dyn ExercisePicker>,
    presenter: P,
    session: SessionState,
    transitions: TransitionSlot,
    status: StatusBoard,
}

impl<P: Presenter> Tutor<P> {
    pub fn new(catalog: Arc<Catalog>, settings: TutorSettings, presenter: P) -> Self {
        Self {
            catalog,
            settings,
            layout: Box::new(TickLayout::default()),
            picker: Box::new(RandomPicker::new()),
            presenter,
            session: SessionState::new(),
            transitions: TransitionSlot::default(),
            status: StatusBoard::default(),
        }
    }

    pub fn with_layout(mut self, layout: impl ScoreLayout + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    pub fn with_picker(mut self, picker: impl ExercisePicker + 'static) -> Self {
        self.picker = Box::new(picker);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn pending_transition(&self) -> Option<&PendingTransition> {
        self.transitions.pending()
    }

    /// Shows the category list and the idle screen.
    pub fn initialize(&mut self) {
        let categories: Vec<(String, String)> = self
            .catalog
            .categories()
            .map(|key| (key.to_string(), category_label(key)))
            .collect();
        info!(categories = categories.len(), "tutor ready");
        self.presenter.show_categories(&categories);
        self.presenter.show_exercises(None, &[]);
        self.reset_ui_state();
        self.presenter
            .clear_score("Welcome! Select a category and an exercise.");
        let (message, connected) = (self.status.midi_status.clone(), self.status.midi_connected);
        self.presenter.show_midi_status(&message, connected);
        self.show_info("Connect a MIDI device and select an exercise.");
        self.refresh_controls();
    }

    /// Lists the exercises of `key` and drops whatever exercise was loaded.
    #[instrument(skip(self))]
    pub fn select_category(&mut self, key: &str) {
        self.session.clear_exercise();
        self.reset_ui_state();
        self.presenter.clear_score("Select an exercise to start.");

        if key.is_empty() {
            self.session.category = None;
            self.presenter.show_exercises(None, &[]);
        } else {
            let catalog = Arc::clone(&self.catalog);
            match catalog.exercises(key) {
                Ok(exercises) => {
                    let summaries: Vec<ExerciseSummary> = exercises
                        .map(|definition| ExerciseSummary {
                            id: definition.id.clone(),
                            name: definition.display_name().to_string(),
                        })
                        .collect();
                    self.session.category = Some(key.to_string());
                    self.presenter.show_exercises(Some(key), &summaries);
                    if summaries.is_empty() {
                        warn!(category = key, "category has no valid exercises");
                        self.show_info("This category has no valid exercises.");
                    }
                }
                Err(err) => {
                    warn!(%err, "invalid category selected");
                    self.session.category = None;
                    self.presenter.show_exercises(None, &[]);
                    self.show_info(&format!("Invalid category: {key}"));
                }
            };
        }
        self.refresh_controls();
    }

    /// Builds a fresh runtime copy of the exercise and lays it out.
    #[instrument(skip(self))]
    pub fn select_exercise(&mut self, category: &str, id: &str) -> Result<(), TutorError> {
        if let Err(err) = self.load_exercise(category, id) {
            warn!(%err, "exercise selection failed");
            self.session.clear_exercise();
            self.reset_ui_state();
            self.presenter
                .clear_score("Invalid selection or failed to load the exercise.");
            self.show_info(&format!("Could not load exercise: {err}"));
            self.refresh_controls();
            return Err(err);
        }

        self.reset_ui_state();
        self.render();
        let message = match &self.session.runtime {
            Some(runtime) if !self.session.midi_ready => {
                debug!(id = %runtime.id, "exercise loaded without MIDI");
                "Connect a MIDI device and press Start."
            }
            Some(runtime) if !runtime.has_playable_notes() => "This exercise has no notes to play.",
            _ => "MIDI ready. Press Start.",
        };
        self.show_info(message);
        self.refresh_controls();
        Ok(())
    }

    fn load_exercise(&mut self, category: &str, id: &str) -> Result<(), TutorError> {
        let definition = self.catalog.find(category, id)?;
        let mut runtime = ExerciseRuntime::from_definition(definition);
        let summary = self
            .layout
            .layout(&self.settings.render_target, &mut runtime)
            .map_err(|err| TutorError::Layout(err.to_string()))?;
        info!(
            id = %runtime.id,
            total_ticks = summary.total_ticks,
            systems = summary.systems,
            repetitions = runtime.target_repetitions,
            "exercise selected"
        );
        self.session.category = Some(category.to_string());
        self.session.runtime = Some(runtime);
        Ok(())
    }

    /// Begins the first repetition from the first tick.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), TutorError> {
        if let Err(err) = self.session.check_startable() {
            warn!(%err, "cannot start exercise");
            let message = match &err {
                TutorError::MidiNotReady => "Connect a MIDI device.",
                TutorError::NoExercise => "Select an exercise.",
                TutorError::NoPlayableNotes(_) => "This exercise has no notes to play.",
                TutorError::AlreadyPlaying => "Exercise already running.",
                _ => "Cannot start the exercise.",
            };
            self.show_info(message);
            return Err(err);
        }

        self.transitions.cancel();
        self.session.cursor = ProgressCursor::default();
        if let Some(runtime) = self.session.runtime.as_mut() {
            runtime.reset_statuses();
            info!(
                id = %runtime.id,
                repetitions = runtime.target_repetitions,
                "starting exercise"
            );
        }
        self.session.playing = true;

        self.update_success_rate();
        self.show_played("--", false);
        self.announce_expected();
        self.render();
        self.presenter.scroll_to(0.0);
        self.refresh_controls();
        self.try_advance();
        Ok(())
    }

    /// Stops playback, drops any pending transition and reverts every note status.
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        if !self.session.playing && !self.transitions.is_pending() {
            return;
        }
        info!("stopping exercise");
        self.transitions.cancel();
        self.session.rewind();
        match self.session.runtime.as_mut() {
            Some(runtime) => {
                runtime.reset_statuses();
                self.render();
                self.presenter.scroll_to(0.0);
            }
            None => self.presenter.clear_score("No active exercise."),
        }
        self.show_info("Exercise stopped. Ready to start.");
        self.show_played("--", false);
        self.refresh_controls();
    }

    /// One note-on from the keyboard.
    pub fn note_on(&mut self, name: &str, number: u8, velocity: u8) {
        let played = format!("{name} (MIDI: {number})");
        self.show_played(&played, false);

        if !self.session.playing {
            debug!(number, velocity, "note ignored, exercise not running");
            return;
        }
        if self.transitions.is_pending() {
            debug!(number, "note ignored while a transition is pending");
            return;
        }
        let tick = self.session.cursor.current_tick;
        let Some(runtime) = self.session.runtime.as_mut() else {
            return;
        };

        match register_pitch(runtime, tick, number) {
            NoteMatch::Matched => {
                debug!(number, tick, "correct note");
                self.update_success_rate();
                self.render();
                self.try_advance();
            }
            NoteMatch::Repeated | NoteMatch::Wrong => {
                debug!(number, tick, "unexpected note");
                self.show_info(&format!("Wrong: {name} not expected"));
                self.show_played(&played, true);
            }
        }
    }

    /// Connection state reported by the MIDI transport.
    pub fn midi_status(&mut self, message: &str, connected: bool) {
        self.session.midi_ready = connected;
        self.status.midi_status = message.to_string();
        self.status.midi_connected = connected;
        self.presenter.show_midi_status(message, connected);

        if connected {
            if !self.session.playing {
                let message = match &self.session.runtime {
                    Some(runtime) if runtime.has_playable_notes() => {
                        format!("MIDI ready. Press Start for {}.", runtime.name)
                    }
                    Some(_) => "MIDI ready. This exercise has no notes to play.".to_string(),
                    None => "MIDI ready. Select an exercise.".to_string(),
                };
                self.show_info(&message);
            }
        } else if self.session.playing {
            warn!("MIDI device disconnected during playback");
            self.stop();
            self.presenter
                .alert("WARNING: MIDI device disconnected! Exercise stopped.");
            self.show_info("MIDI disconnected! Exercise stopped.");
        } else {
            self.show_info("Connect a MIDI device to start.");
        }
        self.refresh_controls();
    }

    /// Runs the pending transition if `ticket` still identifies it.
    pub fn transition_due(&mut self, ticket: u64) {
        match self.transitions.take(ticket) {
            Some(transition) => self.run_transition(transition),
            None => debug!(ticket, "stale transition ignored"),
        }
    }

    fn run_transition(&mut self, transition: Transition) {
        debug!(?transition, "running transition");
        match transition {
            Transition::ResumeRepetition => {
                if !self.session.playing {
                    debug!("stopped during repetition delay");
                    self.reset_ui_state();
                    self.refresh_controls();
                    return;
                }
                self.session.cursor.current_tick = 0;
                if let Some(runtime) = self.session.runtime.as_mut() {
                    runtime.reset_statuses();
                }
                info!(
                    repetition = self.session.cursor.current_repetition,
                    "starting repetition"
                );
                self.announce_expected();
                self.render();
                self.update_success_rate();
                self.scroll_to_current_system();
                self.refresh_controls();
                self.try_advance();
            }
            Transition::LoadExercise { category, id } => {
                if self.select_exercise(&category, &id).is_err() {
                    return;
                }
                let name = self
                    .session
                    .runtime
                    .as_ref()
                    .map(|runtime| runtime.name.clone())
                    .unwrap_or(id);
                if self.session.midi_ready && self.session.has_playable_notes() {
                    info!(%name, "auto-starting next exercise");
                    self.transitions
                        .schedule(self.settings.auto_start_delay(), Transition::AutoStart);
                    self.show_info(&format!("Next: {name}..."));
                } else if !self.session.midi_ready {
                    self.show_info(&format!("Next: {name}. Connect MIDI."));
                } else {
                    self.show_info(&format!("Next: {name}. No playable notes."));
                }
                self.refresh_controls();
            }
            Transition::AutoStart => {
                // Start reports its own failures.
                let _ = self.start();
            }
        }
    }

    /// Moves the cursor over every finished step. Stops at the first step still waiting for
    /// input, at the end of the exercise, or on a step that can never finish.
    fn try_advance(&mut self) {
        loop {
            if !self.session.playing {
                return;
            }
            let Some(runtime) = self.session.runtime.as_ref() else {
                return;
            };
            let tick = self.session.cursor.current_tick;
            match evaluate_step(runtime, tick) {
                StepState::Waiting => {
                    debug!(tick, "step not complete, waiting for input");
                    return;
                }
                StepState::Stalled => {
                    let err = TutorError::StalledStep { tick };
                    error!(%err, "stopping exercise");
                    self.stop();
                    self.show_info("Internal error. Stop and restart.");
                    return;
                }
                StepState::Complete { next: Some(next) } => {
                    debug!(from = tick, to = next, "advancing");
                    self.session.cursor.current_tick = next;
                    self.announce_expected();
                    self.render();
                    self.scroll_to_current_system();
                }
                StepState::Complete { next: None } => {
                    info!(tick, "reached the end of the exercise");
                    self.presenter.scroll_to(0.0);
                    self.complete_repetition();
                    return;
                }
            }
        }
    }

    fn complete_repetition(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        let category = self.session.category.clone().unwrap_or_default();
        let current_id = self.session.exercise_id().unwrap_or_default().to_string();
        let entries = catalog.entries(&category).unwrap_or(&[]);
        let completion = plan_completion(
            self.session.cursor.current_repetition,
            self.session.target_repetitions(),
            entries,
            &current_id,
            self.settings.advancement_for(&category),
            self.picker.as_mut(),
        );

        match completion {
            Completion::Repeat { repetition } => {
                info!(
                    repetition,
                    target = self.session.target_repetitions(),
                    "repetition complete"
                );
                self.session.cursor.current_repetition = repetition;
                self.show_info(&format!("Great! Get ready for repetition {repetition}"));
                self.show_played("Well done!", false);
                self.transitions
                    .schedule(self.settings.repetition_delay(), Transition::ResumeRepetition);
            }
            Completion::Advance(next) => {
                info!(next = %next.id, "exercise complete");
                self.session.playing = false;
                self.show_played("Bravo!", false);
                self.show_info(&format!("Exercise complete! Next: {}...", next.display_name()));
                self.transitions.schedule(
                    self.settings.next_exercise_delay(),
                    Transition::LoadExercise {
                        category,
                        id: next.id,
                    },
                );
            }
            Completion::CategoryComplete => {
                info!(%category, "category complete");
                self.session.clear_exercise();
                self.show_info("Category complete! Choose a new category or exercise.");
                self.show_played("Great work!", false);
            }
        }
        self.refresh_controls();
    }

    fn announce_expected(&mut self) {
        let tick = self.session.cursor.current_tick;
        if let Some(runtime) = self.session.runtime.as_mut() {
            let prompt = mark_expected(runtime, tick);
            self.show_info(&prompt.message());
        }
    }

    /// Neutral idle state: not playing, cursor rewound, nothing pending.
    fn reset_ui_state(&mut self) {
        self.session.rewind();
        self.transitions.cancel();
        self.status.success_rate = SuccessRate::Unknown;
        self.presenter.show_success_rate(SuccessRate::Unknown);
        self.show_info("-- Select or start an exercise --");
        self.show_played("--", false);
        self.presenter.scroll_to(0.0);
    }

    fn refresh_controls(&mut self) {
        let idle = !self.session.playing && !self.transitions.is_pending();
        let controls = ControlState {
            start: idle && self.session.check_startable().is_ok(),
            stop: self.session.playing && !self.transitions.is_pending(),
            category: idle,
            exercise: idle && self.session.category.is_some(),
        };
        self.presenter.set_controls(controls);
    }

    fn update_success_rate(&mut self) {
        let rate = self
            .session
            .runtime
            .as_ref()
            .map(SuccessRate::measure)
            .unwrap_or(SuccessRate::Unknown);
        self.status.success_rate = rate;
        self.presenter.show_success_rate(rate);
    }

    fn render(&mut self) {
        if let Some(runtime) = &self.session.runtime {
            self.presenter.render(runtime);
        }
    }

    fn scroll_to_current_system(&mut self) {
        if let Some(runtime) = &self.session.runtime {
            let offset = runtime.system_offset_for(self.session.cursor.current_tick);
            self.presenter.scroll_to(offset);
        }
    }

    fn show_info(&mut self, message: &str) {
        self.status.info = message.to_string();
        self.presenter.show_info(message);
    }

    fn show_played(&mut self, text: &str, wrong: bool) {
        self.status.played = text.to_string();
        self.status.played_wrong = wrong;
        self.presenter.show_played(text, wrong);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use etude_domain::{ExerciseDefinition, NoteEvent, NoteStatus, Staff, SystemPosition};
    use etude_notation::LayoutSummary;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingPresenter {
        pub renders: usize,
        pub scrolls: Vec<f32>,
        pub infos: Vec<String>,
        pub played: Vec<(String, bool)>,
        pub alerts: Vec<String>,
        pub controls: ControlState,
        pub exercises: Vec<ExerciseSummary>,
        pub score_messages: Vec<String>,
    }

    impl Presenter for RecordingPresenter {
        fn show_categories(&mut self, _categories: &[(String, String)]) {}
        fn show_exercises(&mut self, _category: Option<&str>, exercises: &[ExerciseSummary]) {
            self.exercises = exercises.to_vec();
        }
        fn render(&mut self, _runtime: &ExerciseRuntime) {
            self.renders += 1;
        }
        fn clear_score(&mut self, message: &str) {
            self.score_messages.push(message.to_string());
        }
        fn scroll_to(&mut self, offset: f32) {
            self.scrolls.push(offset);
        }
        fn show_info(&mut self, message: &str) {
            self.infos.push(message.to_string());
        }
        fn show_played(&mut self, text: &str, wrong: bool) {
            self.played.push((text.to_string(), wrong));
        }
        fn show_success_rate(&mut self, _rate: SuccessRate) {}
        fn show_midi_status(&mut self, _message: &str, _connected: bool) {}
        fn set_controls(&mut self, controls: ControlState) {
            self.controls = controls;
        }
        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
    }

    /// Places every event `step` ticks after the previous one on its staff.
    pub(crate) struct StepLayout {
        pub step: u32,
    }

    impl ScoreLayout for StepLayout {
        fn layout(&self, _target: &str, runtime: &mut ExerciseRuntime) -> Result<LayoutSummary> {
            let mut last = 0;
            let mut counters = std::collections::HashMap::new();
            for note in runtime.notes_mut() {
                let slot = counters.entry(note.staff).or_insert(0u32);
                note.start_tick = Some(*slot * self.step);
                last = last.max(*slot * self.step + self.step);
                *slot += 1;
            }
            runtime.reset_statuses();
            runtime.set_layout(last, vec![SystemPosition { tick: 0, offset: 0.0 }]);
            Ok(LayoutSummary {
                total_ticks: last,
                systems: 1,
                unplaced: 0,
            })
        }
    }

    /// Puts the only event away from tick 0, leaving the first step empty.
    struct ShiftedLayout;

    impl ScoreLayout for ShiftedLayout {
        fn layout(&self, _target: &str, runtime: &mut ExerciseRuntime) -> Result<LayoutSummary> {
            for note in runtime.notes_mut() {
                note.start_tick = Some(5);
            }
            runtime.reset_statuses();
            runtime.set_layout(10, Vec::new());
            Ok(LayoutSummary {
                total_ticks: 10,
                systems: 0,
                unplaced: 0,
            })
        }
    }

    pub(crate) struct FirstPicker;

    impl ExercisePicker for FirstPicker {
        fn pick(&mut self, _len: usize) -> usize {
            0
        }
    }

    fn single(id: &str, notes: Vec<NoteEvent>) -> ExerciseDefinition {
        ExerciseDefinition::new(id).with_notes(Staff::Single, notes)
    }

    pub(crate) fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert_category(
            "chapter_1",
            vec![
                single(
                    "three-notes",
                    vec![
                        NoteEvent::note(60, "q"),
                        NoteEvent::note(62, "q"),
                        NoteEvent::note(64, "q"),
                    ],
                ),
                single(
                    "triad",
                    vec![NoteEvent::chord(&[60, 64, 67], "q"), NoteEvent::note(72, "q")],
                ),
                single("rest-first", vec![NoteEvent::rest("h"), NoteEvent::note(65, "q")])
                    .with_repetitions(2),
            ],
        );
        catalog.insert_category(
            "sight_reading",
            vec![
                single("a", vec![NoteEvent::note(69, "q")]),
                single("b", vec![NoteEvent::note(71, "q")]),
            ],
        );
        catalog.insert_category("solo", vec![single("only", vec![NoteEvent::note(60, "q")])]);
        catalog
    }

    fn settings() -> TutorSettings {
        TutorSettings {
            ordered_categories: vec!["chapter_1".to_string()],
            ..TutorSettings::default()
        }
    }

    fn tutor() -> Tutor<RecordingPresenter> {
        let mut tutor = Tutor::new(Arc::new(catalog()), settings(), RecordingPresenter::default())
            .with_layout(StepLayout { step: 4 })
            .with_picker(FirstPicker);
        tutor.initialize();
        tutor.midi_status("Connected: Test Piano", true);
        tutor
    }

    fn started(category: &str, id: &str) -> Tutor<RecordingPresenter> {
        let mut tutor = tutor();
        tutor.select_category(category);
        tutor.select_exercise(category, id).unwrap();
        tutor.start().unwrap();
        tutor
    }

    fn statuses(tutor: &Tutor<RecordingPresenter>) -> Vec<NoteStatus> {
        tutor
            .session()
            .runtime
            .as_ref()
            .unwrap()
            .notes()
            .iter()
            .map(|note| note.status)
            .collect()
    }

    fn fire_pending(tutor: &mut Tutor<RecordingPresenter>) -> Transition {
        let pending = tutor.pending_transition().cloned().expect("a pending transition");
        tutor.transition_due(pending.ticket);
        pending.transition
    }

    #[test]
    fn plays_sequential_notes_to_the_end() {
        let mut tutor = started("chapter_1", "three-notes");
        assert_eq!(tutor.session().cursor.current_tick, 0);
        assert_eq!(tutor.status().info, "Expected: C4");

        tutor.note_on("C4", 60, 90);
        assert_eq!(tutor.session().cursor.current_tick, 4);
        tutor.note_on("D4", 62, 90);
        assert_eq!(tutor.session().cursor.current_tick, 8);
        tutor.note_on("E4", 64, 90);

        assert!(!tutor.session().playing);
        assert!(matches!(
            tutor.pending_transition().map(|pending| &pending.transition),
            Some(Transition::LoadExercise { id, .. }) if id == "triad"
        ));
        assert_eq!(tutor.status().played, "Bravo!");
        assert_eq!(tutor.status().success_rate, SuccessRate::Percent(100.0));
    }

    #[test]
    fn chord_completes_only_with_every_member() {
        let mut tutor = started("chapter_1", "triad");
        tutor.note_on("C4", 60, 90);
        tutor.note_on("E4", 64, 90);
        assert_eq!(tutor.session().cursor.current_tick, 0);
        assert_eq!(statuses(&tutor)[0], NoteStatus::Expected);

        tutor.note_on("E4", 64, 90);
        assert!(tutor.status().played_wrong);
        assert_eq!(tutor.status().info, "Wrong: E4 not expected");
        assert_eq!(tutor.session().cursor.current_tick, 0);
        assert_eq!(statuses(&tutor)[0], NoteStatus::Expected);

        tutor.note_on("G4", 67, 90);
        assert_eq!(statuses(&tutor)[0], NoteStatus::Correct);
        assert_eq!(tutor.session().cursor.current_tick, 4);
        assert_eq!(statuses(&tutor)[1], NoteStatus::Expected);
    }

    #[test]
    fn rest_at_start_advances_without_input() {
        let tutor = started("chapter_1", "rest-first");
        assert_eq!(tutor.session().cursor.current_tick, 4);
        assert_eq!(statuses(&tutor), vec![NoteStatus::Rest, NoteStatus::Expected]);
        assert_eq!(tutor.status().info, "Expected: F4");
    }

    #[test]
    fn repetition_rearms_the_exercise() {
        let mut tutor = started("chapter_1", "rest-first");
        tutor.note_on("F4", 65, 90);

        assert!(tutor.session().playing);
        assert_eq!(tutor.session().cursor.current_repetition, 2);
        assert!(!tutor.presenter().controls.stop);
        assert!(!tutor.presenter().controls.category);

        assert_eq!(fire_pending(&mut tutor), Transition::ResumeRepetition);
        assert_eq!(tutor.session().cursor.current_repetition, 2);
        // The leading rest is skipped again right away.
        assert_eq!(tutor.session().cursor.current_tick, 4);
        assert_eq!(statuses(&tutor), vec![NoteStatus::Rest, NoteStatus::Expected]);
        assert!(tutor.presenter().controls.stop);
        assert!(tutor.pending_transition().is_none());
    }

    #[test]
    fn wrong_note_reports_without_moving() {
        let mut tutor = started("chapter_1", "three-notes");
        tutor.note_on("C#4", 61, 90);
        assert_eq!(tutor.session().cursor.current_tick, 0);
        assert_eq!(statuses(&tutor)[0], NoteStatus::Expected);
        assert_eq!(tutor.status().info, "Wrong: C#4 not expected");
        assert!(tutor.status().played_wrong);

        tutor.note_on("C4", 60, 90);
        assert!(!tutor.status().played_wrong);
    }

    #[test]
    fn ordered_category_ends_at_last_exercise() {
        let mut tutor = started("chapter_1", "rest-first");
        tutor.note_on("F4", 65, 90);
        fire_pending(&mut tutor);
        tutor.note_on("F4", 65, 90);

        assert!(tutor.pending_transition().is_none());
        assert!(tutor.session().runtime.is_none());
        assert!(!tutor.session().playing);
        assert_eq!(
            tutor.status().info,
            "Category complete! Choose a new category or exercise."
        );
        assert!(tutor.presenter().controls.category);
        assert!(!tutor.presenter().controls.start);
    }

    #[test]
    fn next_exercise_loads_and_auto_starts() {
        let mut tutor = started("sight_reading", "a");
        tutor.note_on("A4", 69, 90);

        assert!(matches!(
            fire_pending(&mut tutor),
            Transition::LoadExercise { id, .. } if id == "b"
        ));
        assert_eq!(tutor.session().exercise_id(), Some("b"));
        assert!(!tutor.session().playing);

        assert_eq!(fire_pending(&mut tutor), Transition::AutoStart);
        assert!(tutor.session().playing);
        assert_eq!(tutor.status().info, "Expected: B4");
    }

    #[test]
    fn next_exercise_waits_for_start_without_midi() {
        let mut tutor = started("sight_reading", "a");
        tutor.note_on("A4", 69, 90);
        tutor.midi_status("Disconnected", false);
        // Not playing any more, so the pending load survives the disconnect.
        fire_pending(&mut tutor);
        assert_eq!(tutor.session().exercise_id(), Some("b"));
        assert!(tutor.pending_transition().is_none());
        assert_eq!(tutor.status().info, "Next: b. Connect MIDI.");
    }

    #[test]
    fn single_exercise_random_category_stops() {
        let mut tutor = started("solo", "only");
        tutor.note_on("C4", 60, 90);
        assert!(tutor.pending_transition().is_none());
        assert!(tutor.session().runtime.is_none());
    }

    #[test]
    fn stop_during_repetition_delay_cancels_resume() {
        let mut tutor = started("chapter_1", "rest-first");
        tutor.note_on("F4", 65, 90);
        let ticket = tutor.pending_transition().unwrap().ticket;

        tutor.stop();
        assert!(!tutor.session().playing);
        assert_eq!(tutor.session().cursor, ProgressCursor::default());
        assert_eq!(statuses(&tutor), vec![NoteStatus::Rest, NoteStatus::Pending]);

        tutor.transition_due(ticket);
        assert!(!tutor.session().playing);
        assert_eq!(statuses(&tutor), vec![NoteStatus::Rest, NoteStatus::Pending]);
        assert!(tutor.presenter().controls.start);
    }

    #[test]
    fn disconnect_during_playback_stops_and_alerts() {
        let mut tutor = started("chapter_1", "three-notes");
        tutor.note_on("C4", 60, 90);
        tutor.midi_status("Disconnected", false);

        assert!(!tutor.session().playing);
        assert_eq!(tutor.session().cursor.current_tick, 0);
        assert!(statuses(&tutor)
            .iter()
            .all(|status| *status == NoteStatus::Pending));
        assert_eq!(tutor.presenter().alerts.len(), 1);
        assert_eq!(tutor.status().info, "MIDI disconnected! Exercise stopped.");
        assert!(!tutor.presenter().controls.start);
    }

    #[test]
    fn notes_are_ignored_when_not_playing() {
        let mut tutor = tutor();
        tutor.select_category("chapter_1");
        tutor.select_exercise("chapter_1", "three-notes").unwrap();
        tutor.note_on("C4", 60, 90);
        assert_eq!(statuses(&tutor)[0], NoteStatus::Pending);
        assert_eq!(tutor.status().played, "C4 (MIDI: 60)");
    }

    #[test]
    fn unknown_exercise_clears_state() {
        let mut tutor = tutor();
        tutor.select_category("chapter_1");
        tutor.select_exercise("chapter_1", "three-notes").unwrap();
        assert!(tutor.select_exercise("chapter_1", "nope").is_err());
        assert!(tutor.session().runtime.is_none());
        assert!(!tutor.presenter().controls.start);
        assert!(tutor.status().info.starts_with("Could not load exercise"));
        assert!(matches!(tutor.start(), Err(TutorError::NoExercise)));
    }

    #[test]
    fn category_selection_lists_valid_exercises() {
        let mut tutor = tutor();
        tutor.select_category("chapter_1");
        let ids: Vec<_> = tutor
            .presenter()
            .exercises
            .iter()
            .map(|summary| summary.id.as_str())
            .collect();
        assert_eq!(ids, vec!["three-notes", "triad", "rest-first"]);
        assert!(tutor.presenter().controls.exercise);

        tutor.select_category("missing");
        assert!(tutor.presenter().exercises.is_empty());
        assert_eq!(tutor.status().info, "Invalid category: missing");
    }

    #[test]
    fn start_needs_midi() {
        let mut tutor = Tutor::new(Arc::new(catalog()), settings(), RecordingPresenter::default())
            .with_layout(StepLayout { step: 4 });
        tutor.select_category("chapter_1");
        tutor.select_exercise("chapter_1", "three-notes").unwrap();
        assert!(!tutor.presenter().controls.start);
        assert!(matches!(tutor.start(), Err(TutorError::MidiNotReady)));
        assert_eq!(tutor.status().info, "Connect a MIDI device.");
    }

    #[test]
    fn stalled_step_halts_playback() {
        let mut tutor = Tutor::new(Arc::new(catalog()), settings(), RecordingPresenter::default())
            .with_layout(ShiftedLayout);
        tutor.midi_status("Connected", true);
        tutor.select_category("solo");
        tutor.select_exercise("solo", "only").unwrap();
        tutor.start().unwrap();

        assert!(!tutor.session().playing);
        assert_eq!(tutor.status().info, "Internal error. Stop and restart.");
    }
}
