use etude_domain::{ExerciseRuntime, NotePitch, NoteStatus, RuntimeNote, Staff};

/// Plain-text engraving of an exercise, one block per system and one line per staff.
///
/// Each event is drawn as its pitch names with a status marker in front:
/// `>` expected, `*` correct, `?` ignored, nothing for pending notes. Rests are `-`.
#[derive(Debug, Default)]
pub struct TextScore;

impl TextScore {
    pub fn render(&self, runtime: &ExerciseRuntime) -> String {
        let mut lines = vec![header(runtime)];
        let boundaries: Vec<u32> = runtime
            .system_positions()
            .iter()
            .map(|system| system.tick)
            .collect();
        let systems = boundaries.len().max(1);

        for system in 0..systems {
            let start = boundaries.get(system).copied().unwrap_or(0);
            let end = boundaries.get(system + 1).copied();
            if system > 0 {
                lines.push(String::new());
            }
            for staff in Staff::ALL {
                let tokens: Vec<String> = runtime
                    .staff_notes(staff)
                    .filter(|note| in_system(note, start, end, system == 0))
                    .map(token)
                    .collect();
                if tokens.is_empty() {
                    continue;
                }
                lines.push(format!("{:>6} | {}", staff.label(), tokens.join(" ")));
            }
        }
        lines.join("\n")
    }
}

/// Exercise name followed by whichever of key and time signature the exercise declares.
fn header(runtime: &ExerciseRuntime) -> String {
    let details: Vec<String> = [
        runtime.key_signature.as_ref().map(|key| format!("key {key}")),
        runtime.time_signature.clone(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if details.is_empty() {
        format!("== {} ==", runtime.name)
    } else {
        format!("== {} ({}) ==", runtime.name, details.join(", "))
    }
}

fn in_system(note: &RuntimeNote, start: u32, end: Option<u32>, first: bool) -> bool {
    match note.start_tick {
        Some(tick) => tick >= start && end.map_or(true, |end| tick < end),
        // Unplaced events are listed with the first system so they stay visible.
        None => first,
    }
}

fn token(note: &RuntimeNote) -> String {
    let label = match &note.event.pitch {
        NotePitch::Rest => "-".to_string(),
        NotePitch::Single(_) => note.describe(),
        NotePitch::Chord(pitches) => chord_label(note, pitches),
    };
    let marker = match note.status {
        NoteStatus::Rest | NoteStatus::Pending => "",
        NoteStatus::Expected => ">",
        NoteStatus::Correct => "*",
        NoteStatus::Ignored => "?",
    };
    format!("{marker}{label}")
}

/// Chord members already played are starred while the chord is still expected.
fn chord_label(note: &RuntimeNote, pitches: &[u8]) -> String {
    let members: Vec<String> = pitches
        .iter()
        .map(|pitch| {
            let name = etude_domain::note_name(*pitch);
            if note.status == NoteStatus::Expected && note.correct_midi_values.contains(pitch) {
                format!("*{name}")
            } else {
                name
            }
        })
        .collect();
    format!("[{}]", members.join("+"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ScoreLayout, TickLayout};
    use etude_domain::{ExerciseDefinition, NoteEvent};

    #[test]
    fn draws_statuses_per_staff() {
        let definition = ExerciseDefinition::new("ex")
            .with_name("Warm-up")
            .with_notes(
                Staff::Treble,
                vec![NoteEvent::chord(&[60, 64], "q"), NoteEvent::rest("q")],
            )
            .with_notes(Staff::Bass, vec![NoteEvent::note(48, "h")]);
        let mut runtime = ExerciseRuntime::from_definition(&definition);
        TickLayout::default().layout("score", &mut runtime).unwrap();
        {
            let notes = runtime.notes_mut();
            notes[0].status = NoteStatus::Expected;
            notes[0].correct_midi_values = vec![64];
            notes[2].status = NoteStatus::Correct;
        }

        let text = TextScore.render(&runtime);
        assert!(text.starts_with("== Warm-up =="));
        assert!(text.contains("Treble | >[C4+*E4] -"));
        assert!(text.contains("  Bass | *C3"));
    }

    #[test]
    fn splits_systems_into_blocks() {
        let notes = (0..8).map(|step| NoteEvent::note(60 + step, "h")).collect();
        let definition = ExerciseDefinition::new("long").with_notes(Staff::Single, notes);
        let mut runtime = ExerciseRuntime::from_definition(&definition);
        let layout = TickLayout {
            measures_per_system: 2,
            ..TickLayout::default()
        };
        layout.layout("score", &mut runtime).unwrap();
        let text = TextScore.render(&runtime);
        let blocks: Vec<_> = text.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].contains("Staff | E4 F4 F#4 G4"));
    }

    #[test]
    fn header_shows_key_and_time_signature() {
        let mut definition = ExerciseDefinition::new("waltz")
            .with_name("Waltz")
            .with_notes(Staff::Single, vec![NoteEvent::note(67, "h.")]);
        definition.key_signature = Some("G".to_string());
        definition.time_signature = Some("3/4".to_string());
        let mut runtime = ExerciseRuntime::from_definition(&definition);
        TickLayout::default().layout("score", &mut runtime).unwrap();

        let text = TextScore.render(&runtime);
        assert!(text.starts_with("== Waltz (key G, 3/4) =="));

        definition.time_signature = None;
        let runtime = ExerciseRuntime::from_definition(&definition);
        assert!(TextScore.render(&runtime).starts_with("== Waltz (key G) =="));
    }
}
