use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use etude_domain::{CatalogEntry, ExerciseDefinition};

/// How the next exercise of a category is chosen once one is finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Advancement {
    Ordered,
    Random,
}

/// Source of the random choice, so tests can pin it down.
pub trait ExercisePicker {
    /// Returns an index in `0..len`; `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Xorshift picker. Uniform enough for choosing among a handful of exercises.
#[derive(Debug, Clone)]
pub struct RandomPicker {
    state: u64,
}

impl RandomPicker {
    /// Seeded from the system clock.
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::seeded(nanos)
    }

    pub fn seeded(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExercisePicker for RandomPicker {
    fn pick(&mut self, len: usize) -> usize {
        (self.next_u64() % len.max(1) as u64) as usize
    }
}

/// What happens after the last step of a repetition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Another pass of the same exercise, numbered from 1.
    Repeat { repetition: u32 },
    /// Exercise finished, move on to this one.
    Advance(ExerciseDefinition),
    /// Exercise finished and the category has nothing left to offer.
    CategoryComplete,
}

pub fn next_exercise<'a>(
    entries: &'a [CatalogEntry],
    current_id: &str,
    advancement: Advancement,
    picker: &mut dyn ExercisePicker,
) -> Option<&'a ExerciseDefinition> {
    match advancement {
        Advancement::Ordered => {
            let position = entries
                .iter()
                .position(|entry| entry.exercise().is_some_and(|def| def.id == current_id));
            let Some(position) = position else {
                warn!(current_id, "finished exercise is not part of its category");
                return None;
            };
            entries[position + 1..].iter().find_map(|entry| {
                if entry.exercise().is_none() {
                    debug!("skipping malformed catalog entry");
                }
                entry.exercise()
            })
        }
        Advancement::Random => {
            let candidates: Vec<&ExerciseDefinition> = entries
                .iter()
                .filter_map(CatalogEntry::exercise)
                .filter(|definition| definition.id != current_id)
                .collect();
            if candidates.is_empty() {
                return None;
            }
            let index = picker.pick(candidates.len()).min(candidates.len() - 1);
            Some(candidates[index])
        }
    }
}

/// Chooses between another repetition, the next exercise, or the end of the category.
pub fn plan_completion(
    current_repetition: u32,
    target_repetitions: u32,
    entries: &[CatalogEntry],
    current_id: &str,
    advancement: Advancement,
    picker: &mut dyn ExercisePicker,
) -> Completion {
    if current_repetition < target_repetitions {
        return Completion::Repeat {
            repetition: current_repetition + 1,
        };
    }
    match next_exercise(entries, current_id, advancement, picker) {
        Some(definition) => Completion::Advance(definition.clone()),
        None => Completion::CategoryComplete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(usize);

    impl ExercisePicker for Fixed {
        fn pick(&mut self, _len: usize) -> usize {
            self.0
        }
    }

    fn entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::Exercise(ExerciseDefinition::new("one")),
            CatalogEntry::Malformed {
                reason: "no id".to_string(),
            },
            CatalogEntry::Exercise(ExerciseDefinition::new("two")),
            CatalogEntry::Exercise(ExerciseDefinition::new("three")),
        ]
    }

    #[test]
    fn ordered_skips_malformed_entries() {
        let entries = entries();
        let next = next_exercise(&entries, "one", Advancement::Ordered, &mut Fixed(0));
        assert_eq!(next.map(|def| def.id.as_str()), Some("two"));
    }

    #[test]
    fn ordered_stops_at_the_last_exercise() {
        let entries = entries();
        assert!(next_exercise(&entries, "three", Advancement::Ordered, &mut Fixed(0)).is_none());
        assert!(next_exercise(&entries, "ghost", Advancement::Ordered, &mut Fixed(0)).is_none());
        assert_eq!(
            plan_completion(1, 1, &entries, "three", Advancement::Ordered, &mut Fixed(0)),
            Completion::CategoryComplete
        );
    }

    #[test]
    fn random_excludes_the_finished_exercise() {
        let entries = entries();
        let mut picker = RandomPicker::seeded(7);
        for _ in 0..50 {
            let next = next_exercise(&entries, "two", Advancement::Random, &mut picker).unwrap();
            assert_ne!(next.id, "two");
        }
        let next = next_exercise(&entries, "two", Advancement::Random, &mut Fixed(1)).unwrap();
        assert_eq!(next.id, "three");
    }

    #[test]
    fn seeded_picker_is_repeatable_and_in_range() {
        let mut first = RandomPicker::seeded(42);
        let mut second = RandomPicker::seeded(42);
        for len in 1..20 {
            let index = first.pick(len);
            assert!(index < len);
            assert_eq!(index, second.pick(len));
        }
        let mut zero = RandomPicker::seeded(0);
        assert!((0..10).map(|_| zero.pick(5)).any(|index| index != 0));
    }

    #[test]
    fn random_with_single_exercise_stops() {
        let entries = vec![CatalogEntry::Exercise(ExerciseDefinition::new("solo"))];
        assert!(next_exercise(&entries, "solo", Advancement::Random, &mut Fixed(0)).is_none());
    }

    #[test]
    fn repetitions_come_before_advancing() {
        let entries = entries();
        assert_eq!(
            plan_completion(1, 2, &entries, "one", Advancement::Ordered, &mut Fixed(0)),
            Completion::Repeat { repetition: 2 }
        );
        assert!(matches!(
            plan_completion(2, 2, &entries, "one", Advancement::Ordered, &mut Fixed(0)),
            Completion::Advance(def) if def.id == "two"
        ));
    }
}
