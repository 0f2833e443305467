pub mod completion;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod midi;
pub mod presenter;
pub mod scoring;
pub mod session;
pub mod transition;
mod tutor;

pub use completion::{Advancement, Completion, ExercisePicker, RandomPicker};
pub use config::TutorSettings;
pub use driver::{Command, CommandSender, TutorDriver};
pub use engine::{NoteMatch, StepPrompt, StepState};
pub use error::TutorError;
pub use midi::{MidiDevice, MidiManager, MidiSession};
pub use presenter::{ControlState, ExerciseSummary, Presenter, StatusBoard};
pub use scoring::SuccessRate;
pub use session::{ProgressCursor, SessionState};
pub use transition::{PendingTransition, Transition};
pub use tutor::Tutor;
