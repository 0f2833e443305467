//! Step matching over an [`ExerciseRuntime`].
//!
//! A step is every event sharing one start tick, whatever staff it sits on. These functions
//! only mutate note statuses; moving the cursor and talking to the presenter is left to the
//! [`Tutor`](crate::Tutor).

use tracing::{debug, trace};

use etude_domain::{ExerciseRuntime, NoteStatus, RuntimeNote};

/// What the student is asked to play at the current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPrompt {
    /// Descriptions of the expected events, in staff order.
    Notes(Vec<String>),
    RestOnly,
    /// No placed event starts here.
    Nothing,
}

impl StepPrompt {
    pub fn message(&self) -> String {
        match self {
            StepPrompt::Notes(descriptions) => format!("Expected: {}", descriptions.join(" | ")),
            StepPrompt::RestOnly => "Rest...".to_string(),
            StepPrompt::Nothing => "Waiting...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMatch {
    /// At least one expected event took the pitch.
    Matched,
    /// The pitch belongs to an expected chord but was already recorded.
    Repeated,
    Wrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Waiting,
    /// The step is done; `next` is the following tick, or `None` at the end of the exercise.
    Complete { next: Option<u32> },
    /// Events start here that can never be completed.
    Stalled,
}

/// Marks every pending event at `tick` as expected. Rests keep their status.
pub fn mark_expected(runtime: &mut ExerciseRuntime, tick: u32) -> StepPrompt {
    let mut descriptions = Vec::new();
    let mut rests = 0usize;
    let mut others = 0usize;
    for note in runtime.notes_mut().iter_mut().filter(|note| note.starts_at(tick)) {
        match note.status {
            NoteStatus::Pending => {
                note.status = NoteStatus::Expected;
                note.correct_midi_values.clear();
                descriptions.push(note.describe());
            }
            NoteStatus::Rest => rests += 1,
            NoteStatus::Expected | NoteStatus::Correct | NoteStatus::Ignored => others += 1,
        }
    }
    debug!(tick, expected = descriptions.len(), rests, "marked expected notes");

    if !descriptions.is_empty() {
        StepPrompt::Notes(descriptions)
    } else if rests > 0 && others == 0 {
        StepPrompt::RestOnly
    } else {
        StepPrompt::Nothing
    }
}

/// Applies one played pitch to the expected events at `tick`.
pub fn register_pitch(runtime: &mut ExerciseRuntime, tick: u32, pitch: u8) -> NoteMatch {
    let mut matched = false;
    let mut repeated = false;
    for note in runtime
        .notes_mut()
        .iter_mut()
        .filter(|note| note.starts_at(tick) && note.status == NoteStatus::Expected)
    {
        if note.is_chord() {
            if !note.required_pitches().contains(&pitch) {
                continue;
            }
            if note.correct_midi_values.contains(&pitch) {
                repeated = true;
                continue;
            }
            note.correct_midi_values.push(pitch);
            matched = true;
            if chord_satisfied(note) {
                note.status = NoteStatus::Correct;
                debug!(tick, "chord completed");
            }
        } else if note.required_pitches() == [pitch] {
            note.status = NoteStatus::Correct;
            matched = true;
        }
    }
    trace!(tick, pitch, matched, repeated, "registered pitch");

    if matched {
        NoteMatch::Matched
    } else if repeated {
        NoteMatch::Repeated
    } else {
        NoteMatch::Wrong
    }
}

/// Decides whether the step at `tick` is finished. Does not mutate anything, so asking
/// again without new input gives the same answer.
pub fn evaluate_step(runtime: &ExerciseRuntime, tick: u32) -> StepState {
    let events: Vec<&RuntimeNote> = runtime.at_tick(tick).collect();
    if !events.is_empty() && events.iter().all(|note| note.is_rest()) {
        return StepState::Complete {
            next: runtime.next_tick_after(tick),
        };
    }

    let playable: Vec<&RuntimeNote> = events
        .into_iter()
        .filter(|note| !note.is_rest() && note.status != NoteStatus::Ignored)
        .collect();
    if playable.is_empty() {
        return StepState::Stalled;
    }

    if playable.iter().all(|note| is_complete(note)) {
        StepState::Complete {
            next: runtime.next_tick_after(tick),
        }
    } else {
        StepState::Waiting
    }
}

fn is_complete(note: &RuntimeNote) -> bool {
    match note.status {
        NoteStatus::Correct if note.is_chord() => chord_satisfied(note),
        NoteStatus::Correct => true,
        NoteStatus::Rest
        | NoteStatus::Pending
        | NoteStatus::Expected
        | NoteStatus::Ignored => false,
    }
}

/// Superset check: every required pitch has been matched on its own.
fn chord_satisfied(note: &RuntimeNote) -> bool {
    note.required_pitches()
        .iter()
        .all(|pitch| note.correct_midi_values.contains(pitch))
}
