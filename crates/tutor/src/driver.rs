//! Single-consumer command loop around a [`Tutor`].
//!
//! MIDI callbacks, the console and the transition timers all feed one queue, so the tutor
//! is only ever touched by one command at a time.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use etude_domain::note_name;

use crate::error::TutorError;
use crate::presenter::Presenter;
use crate::tutor::Tutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectCategory(String),
    SelectExercise { category: String, id: String },
    Start,
    Stop,
    NoteOn { name: String, number: u8, velocity: u8 },
    MidiStatus { message: String, connected: bool },
    TransitionDue(u64),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: UnboundedSender<Command>,
}

impl CommandSender {
    pub fn send(&self, command: Command) -> Result<(), TutorError> {
        self.tx.send(command).map_err(|_| TutorError::QueueClosed)
    }

    pub fn note_on(&self, number: u8, velocity: u8) -> Result<(), TutorError> {
        self.send(Command::NoteOn {
            name: note_name(number),
            number,
            velocity,
        })
    }

    pub fn midi_status(
        &self,
        message: impl Into<String>,
        connected: bool,
    ) -> Result<(), TutorError> {
        self.send(Command::MidiStatus {
            message: message.into(),
            connected,
        })
    }
}

impl<P: Presenter> Tutor<P> {
    /// Applies one command. Returns `false` once the tutor should shut down.
    pub fn handle(&mut self, command: Command) -> bool {
        debug!(?command, "handling command");
        match command {
            Command::SelectCategory(key) => self.select_category(&key),
            Command::SelectExercise { category, id } => {
                // Failures are already shown to the user.
                let _ = self.select_exercise(&category, &id);
            }
            Command::Start => {
                let _ = self.start();
            }
            Command::Stop => self.stop(),
            Command::NoteOn {
                name,
                number,
                velocity,
            } => self.note_on(&name, number, velocity),
            Command::MidiStatus { message, connected } => self.midi_status(&message, connected),
            Command::TransitionDue(ticket) => self.transition_due(ticket),
            Command::Shutdown => return false,
        }
        true
    }
}

struct ArmedTimer {
    ticket: u64,
    handle: JoinHandle<()>,
}

/// Runs a [`Tutor`] against its command queue and keeps exactly one timer armed for the
/// tutor's pending transition.
pub struct TutorDriver<P: Presenter> {
    tutor: Tutor<P>,
    commands: UnboundedReceiver<Command>,
    timer_tx: WeakUnboundedSender<Command>,
    timer: Option<ArmedTimer>,
}

impl<P: Presenter> TutorDriver<P> {
    pub fn new(tutor: Tutor<P>) -> (Self, CommandSender) {
        let (tx, commands) = mpsc::unbounded_channel();
        let driver = Self {
            tutor,
            commands,
            timer_tx: tx.downgrade(),
            timer: None,
        };
        (driver, CommandSender { tx })
    }

    /// Processes commands until `Shutdown` arrives or every sender is dropped, then hands the
    /// tutor back.
    pub async fn run(mut self) -> Tutor<P> {
        self.tutor.initialize();
        while let Some(command) = self.commands.recv().await {
            if !self.tutor.handle(command) {
                break;
            }
            self.sync_timer();
        }
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
        info!("tutor driver stopped");
        self.tutor
    }

    fn sync_timer(&mut self) {
        let wanted = self
            .tutor
            .pending_transition()
            .map(|pending| (pending.ticket, pending.delay));
        if let (Some(timer), Some((ticket, _))) = (&self.timer, wanted) {
            if timer.ticket == ticket {
                return;
            }
        }

        if let Some(timer) = self.timer.take() {
            debug!(ticket = timer.ticket, "disarming timer");
            timer.handle.abort();
        }
        let Some((ticket, delay)) = wanted else {
            return;
        };
        let weak = self.timer_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(Command::TransitionDue(ticket));
            }
        });
        debug!(ticket, ?delay, "timer armed");
        self.timer = Some(ArmedTimer { ticket, handle });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::TutorSettings;
    use crate::tutor::tests::{catalog, FirstPicker, RecordingPresenter, StepLayout};
    use etude_domain::NoteStatus;

    fn new_driver() -> (TutorDriver<RecordingPresenter>, CommandSender) {
        let settings = TutorSettings {
            ordered_categories: vec!["chapter_1".to_string()],
            ..TutorSettings::default()
        };
        let tutor = Tutor::new(Arc::new(catalog()), settings, RecordingPresenter::default())
            .with_layout(StepLayout { step: 4 })
            .with_picker(FirstPicker);
        TutorDriver::new(tutor)
    }

    fn begin(sender: &CommandSender, category: &str, id: &str) {
        sender.midi_status("Connected: Test Piano", true).unwrap();
        sender
            .send(Command::SelectCategory(category.to_string()))
            .unwrap();
        sender
            .send(Command::SelectExercise {
                category: category.to_string(),
                id: id.to_string(),
            })
            .unwrap();
        sender.send(Command::Start).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn repetition_resumes_after_delay() {
        let (driver, sender) = new_driver();
        let script = async {
            begin(&sender, "chapter_1", "rest-first");
            sender.note_on(65, 80).unwrap();
            tokio::time::sleep(Duration::from_millis(2000)).await;
            sender.send(Command::Shutdown).unwrap();
        };
        let (tutor, ()) = tokio::join!(driver.run(), script);

        assert!(tutor.session().playing);
        assert_eq!(tutor.session().cursor.current_repetition, 2);
        assert_eq!(tutor.session().cursor.current_tick, 4);
        assert_eq!(tutor.status().info, "Expected: F4");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_disarms_the_repetition_timer() {
        let (driver, sender) = new_driver();
        let script = async {
            begin(&sender, "chapter_1", "rest-first");
            sender.note_on(65, 80).unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            sender.send(Command::Stop).unwrap();
            tokio::time::sleep(Duration::from_millis(3000)).await;
            sender.send(Command::Shutdown).unwrap();
        };
        let (tutor, ()) = tokio::join!(driver.run(), script);

        assert!(!tutor.session().playing);
        assert!(tutor.pending_transition().is_none());
        assert_eq!(tutor.status().info, "Exercise stopped. Ready to start.");
        let statuses: Vec<_> = tutor
            .session()
            .runtime
            .as_ref()
            .unwrap()
            .notes()
            .iter()
            .map(|note| note.status)
            .collect();
        assert_eq!(statuses, vec![NoteStatus::Rest, NoteStatus::Pending]);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_exercise_rolls_into_the_next() {
        let (driver, sender) = new_driver();
        let script = async {
            begin(&sender, "sight_reading", "a");
            sender.note_on(69, 80).unwrap();
            tokio::time::sleep(Duration::from_millis(1000)).await;
            sender.send(Command::Shutdown).unwrap();
        };
        let (tutor, ()) = tokio::join!(driver.run(), script);
        assert_eq!(tutor.session().exercise_id(), Some("a"));
        assert!(!tutor.session().playing);

        let (driver, sender) = new_driver();
        let script = async {
            begin(&sender, "sight_reading", "a");
            sender.note_on(69, 80).unwrap();
            tokio::time::sleep(Duration::from_millis(3000)).await;
            sender.send(Command::Shutdown).unwrap();
        };
        let (tutor, ()) = tokio::join!(driver.run(), script);
        assert_eq!(tutor.session().exercise_id(), Some("b"));
        assert!(tutor.session().playing);
        assert_eq!(tutor.status().info, "Expected: B4");
    }

    #[tokio::test]
    async fn run_ends_when_senders_drop() {
        let (driver, sender) = new_driver();
        sender
            .send(Command::SelectCategory("chapter_1".to_string()))
            .unwrap();
        drop(sender);
        let tutor = driver.run().await;
        assert_eq!(tutor.session().category.as_deref(), Some("chapter_1"));
    }
}
