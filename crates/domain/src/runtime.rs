use serde::{Deserialize, Serialize};

use crate::events::{NoteEvent, NotePitch, Staff};
use crate::exercise::ExerciseDefinition;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Rest,
    Pending,
    Expected,
    Correct,
    /// The layout could not place the event; it never takes part in playback.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeNote {
    pub staff: Staff,
    /// Position within its staff in the definition.
    pub index: usize,
    pub event: NoteEvent,
    pub start_tick: Option<u32>,
    pub status: NoteStatus,
    /// Chord members matched so far in the current step.
    pub correct_midi_values: Vec<u8>,
}

impl RuntimeNote {
    fn new(staff: Staff, index: usize, event: NoteEvent) -> Self {
        let mut note = Self {
            staff,
            index,
            event,
            start_tick: None,
            status: NoteStatus::Pending,
            correct_midi_values: Vec::new(),
        };
        note.reset();
        note
    }

    pub fn is_rest(&self) -> bool {
        self.event.is_rest()
    }

    /// A pitched event the layout managed to place.
    pub fn is_playable(&self) -> bool {
        !self.is_rest() && self.start_tick.is_some()
    }

    pub fn starts_at(&self, tick: u32) -> bool {
        self.start_tick == Some(tick)
    }

    pub fn required_pitches(&self) -> &[u8] {
        self.event.pitch.pitches()
    }

    pub fn is_chord(&self) -> bool {
        matches!(self.event.pitch, NotePitch::Chord(_))
    }

    pub fn reset(&mut self) {
        self.correct_midi_values.clear();
        self.status = if self.is_rest() {
            NoteStatus::Rest
        } else if self.start_tick.is_some() {
            NoteStatus::Pending
        } else {
            NoteStatus::Ignored
        };
    }

    pub fn describe(&self) -> String {
        self.event.pitch.describe()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SystemPosition {
    pub tick: u32,
    /// Vertical offset of the rendered system, in layout units.
    pub offset: f32,
}

/// Mutable working copy of one exercise. Built fresh on every selection so the
/// catalog definition is never touched.
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseRuntime {
    pub id: String,
    pub name: String,
    pub target_repetitions: u32,
    pub time_signature: Option<String>,
    pub key_signature: Option<String>,
    notes: Vec<RuntimeNote>,
    total_ticks: u32,
    system_positions: Vec<SystemPosition>,
}

impl ExerciseRuntime {
    pub fn from_definition(definition: &ExerciseDefinition) -> Self {
        let notes = Staff::ALL
            .iter()
            .flat_map(|staff| {
                definition
                    .staff(*staff)
                    .iter()
                    .enumerate()
                    .map(move |(index, event)| RuntimeNote::new(*staff, index, event.clone()))
            })
            .collect();
        Self {
            id: definition.id.clone(),
            name: definition.display_name().to_string(),
            target_repetitions: definition.target_repetitions(),
            time_signature: definition.time_signature.clone(),
            key_signature: definition.key_signature.clone(),
            notes,
            total_ticks: 0,
            system_positions: Vec::new(),
        }
    }

    pub fn notes(&self) -> &[RuntimeNote] {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut [RuntimeNote] {
        &mut self.notes
    }

    pub fn staff_notes(&self, staff: Staff) -> impl Iterator<Item = &RuntimeNote> + '_ {
        self.notes.iter().filter(move |note| note.staff == staff)
    }

    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    pub fn system_positions(&self) -> &[SystemPosition] {
        &self.system_positions
    }

    pub fn set_layout(&mut self, total_ticks: u32, system_positions: Vec<SystemPosition>) {
        self.total_ticks = total_ticks;
        self.system_positions = system_positions;
    }

    pub fn reset_statuses(&mut self) {
        for note in &mut self.notes {
            note.reset();
        }
    }

    pub fn has_playable_notes(&self) -> bool {
        self.notes.iter().any(RuntimeNote::is_playable)
    }

    pub fn at_tick(&self, tick: u32) -> impl Iterator<Item = &RuntimeNote> + '_ {
        self.notes.iter().filter(move |note| note.starts_at(tick))
    }

    /// Smallest start tick strictly after `tick`, across every staff.
    pub fn next_tick_after(&self, tick: u32) -> Option<u32> {
        self.notes
            .iter()
            .filter_map(|note| note.start_tick)
            .filter(|start| *start > tick)
            .min()
    }

    /// Offset of the last system starting at or before `tick`, or the top of the score.
    pub fn system_offset_for(&self, tick: u32) -> f32 {
        self.system_positions
            .iter()
            .rev()
            .find(|system| system.tick <= tick)
            .map(|system| system.offset)
            .unwrap_or(0.0)
    }
}
