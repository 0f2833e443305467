use etude_domain::pitch::{parse_key, validate_midi};

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Help,
    Categories,
    Category(String),
    /// Exercise id, optionally qualified with its category.
    Exercise { category: Option<String>, id: String },
    Start,
    Stop,
    /// Simulated key press, for use without a keyboard attached.
    Play(Vec<u8>),
    Quit,
}

pub const HELP: &str = "\
commands:
  categories               list categories
  category <key>           select a category
  exercise [<key>] <id>    select an exercise
  start | stop             control playback
  play <note>...           play notes by MIDI number or name (60, c/4, f#/3)
  quit";

pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let input = match (command.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("help" | "?", []) => Input::Help,
        ("categories" | "ls", []) => Input::Categories,
        ("category" | "c", [key]) => Input::Category((*key).to_string()),
        ("exercise" | "e", [id]) => Input::Exercise {
            category: None,
            id: (*id).to_string(),
        },
        ("exercise" | "e", [category, id]) => Input::Exercise {
            category: Some((*category).to_string()),
            id: (*id).to_string(),
        },
        ("start" | "s", []) => Input::Start,
        ("stop" | "x", []) => Input::Stop,
        ("play" | "p", notes) if !notes.is_empty() => {
            Input::Play(notes.iter().map(|note| parse_note(note)).collect::<Result<_, _>>()?)
        }
        ("quit" | "exit" | "q", []) => Input::Quit,
        _ => return Err(format!("unrecognised command `{}`; type `help`", line.trim())),
    };
    Ok(Some(input))
}

fn parse_note(text: &str) -> Result<u8, String> {
    let parsed = match text.parse::<u8>() {
        Ok(number) => validate_midi(number),
        Err(_) => parse_key(text),
    };
    parsed.map_err(|err| err.to_string())
}
