use etude_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TutorError {
    #[error(transparent)]
    Catalog(#[from] DomainError),
    #[error("no exercise is loaded")]
    NoExercise,
    #[error("no MIDI device is connected")]
    MidiNotReady,
    #[error("exercise `{0}` has no notes to play")]
    NoPlayableNotes(String),
    #[error("an exercise is already running")]
    AlreadyPlaying,
    #[error("step at tick {tick} has neither rests nor playable notes")]
    StalledStep { tick: u32 },
    #[error("layout failed: {0}")]
    Layout(String),
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error("command queue is closed")]
    QueueClosed,
}
