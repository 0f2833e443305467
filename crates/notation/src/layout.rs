use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use etude_domain::{ExerciseRuntime, Staff, SystemPosition};

use crate::duration::{duration_ticks, measure_ticks};

pub const DEFAULT_TIME_SIGNATURE: &str = "4/4";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct LayoutSummary {
    pub total_ticks: u32,
    pub systems: usize,
    /// Events the layout could not place (unknown duration).
    pub unplaced: usize,
}

/// Computes where every event of an exercise starts and how the score breaks into systems.
pub trait ScoreLayout {
    /// Assigns a start tick and initial status to every event of `runtime` and stores the
    /// system position index on it. `target` names the surface the score is drawn on.
    fn layout(&self, target: &str, runtime: &mut ExerciseRuntime) -> Result<LayoutSummary>;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TickLayout {
    pub measures_per_system: u32,
    pub system_height: f32,
    pub top_margin: f32,
}

impl Default for TickLayout {
    fn default() -> Self {
        Self {
            measures_per_system: 4,
            system_height: 180.0,
            top_margin: 0.0,
        }
    }
}

impl ScoreLayout for TickLayout {
    fn layout(&self, target: &str, runtime: &mut ExerciseRuntime) -> Result<LayoutSummary> {
        let signature = runtime
            .time_signature
            .clone()
            .unwrap_or_else(|| DEFAULT_TIME_SIGNATURE.to_string());
        let id = runtime.id.clone();
        let measure = measure_ticks(&signature)
            .ok_or_else(|| anyhow!("unsupported time signature `{signature}` in `{id}`"))?;
        let system_ticks = measure
            .checked_mul(self.measures_per_system.max(1))
            .ok_or_else(|| anyhow!("systems of `{signature}` are too long in `{id}`"))?;

        let mut cursors = [0u32; 3];
        let mut unplaced = 0usize;
        for note in runtime.notes_mut() {
            let cursor = &mut cursors[staff_slot(note.staff)];
            match duration_ticks(&note.event.duration) {
                Some(length) => {
                    note.start_tick = Some(*cursor);
                    *cursor = cursor
                        .checked_add(length)
                        .ok_or_else(|| anyhow!("exercise `{id}` is too long to lay out"))?;
                }
                None => {
                    warn!(
                        duration = %note.event.duration,
                        staff = ?note.staff,
                        index = note.index,
                        "unknown duration, event left out of playback"
                    );
                    note.start_tick = None;
                    unplaced += 1;
                }
            }
        }
        runtime.reset_statuses();

        let total_ticks = cursors.into_iter().max().unwrap_or(0);
        let systems = if total_ticks == 0 {
            1
        } else {
            total_ticks.div_ceil(system_ticks) as usize
        };
        let positions = (0..systems)
            .map(|row| SystemPosition {
                tick: row as u32 * system_ticks,
                offset: self.top_margin + row as f32 * self.system_height,
            })
            .collect();
        runtime.set_layout(total_ticks, positions);

        debug!(
            target_surface = target,
            id = %runtime.id,
            total_ticks,
            systems,
            "laid out exercise"
        );
        Ok(LayoutSummary {
            total_ticks,
            systems,
            unplaced,
        })
    }
}

fn staff_slot(staff: Staff) -> usize {
    match staff {
        Staff::Treble => 0,
        Staff::Bass => 1,
        Staff::Single => 2,
    }
}
