use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use midir::{Ignore, MidiInput, MidiInputConnection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::driver::CommandSender;

const CLIENT_NAME: &str = "etude";
const WATCH_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MidiDevice {
    pub name: String,
}

/// Returns `(note, velocity)` for a note-on. A note-on with velocity 0 is a note-off.
pub fn parse_note_on(message: &[u8]) -> Option<(u8, u8)> {
    match message {
        [status, note, velocity, ..] if status & 0xF0 == 0x90 && *velocity > 0 => {
            Some((*note, *velocity))
        }
        _ => None,
    }
}

/// Index of the port to open: an exact name match, then a case-insensitive substring
/// match, then the first port when no name was asked for.
pub fn select_port(names: &[String], wanted: Option<&str>) -> Option<usize> {
    match wanted {
        None => (!names.is_empty()).then_some(0),
        Some(wanted) => names.iter().position(|name| name == wanted).or_else(|| {
            let wanted = wanted.to_lowercase();
            names
                .iter()
                .position(|name| name.to_lowercase().contains(&wanted))
        }),
    }
}

pub struct MidiManager;

impl MidiManager {
    pub fn list_inputs() -> Result<Vec<MidiDevice>> {
        let input = MidiInput::new(CLIENT_NAME)?;
        Ok(input
            .ports()
            .iter()
            .map(|port| MidiDevice {
                name: input.port_name(port).unwrap_or_else(|_| "Unknown".into()),
            })
            .collect())
    }

    /// Opens an input port and forwards its note-ons to `sender`. The connection status is
    /// reported through the same queue, including a later disconnect of the device.
    pub fn connect(wanted: Option<&str>, sender: CommandSender) -> Result<MidiSession> {
        let mut input = MidiInput::new(CLIENT_NAME)?;
        input.ignore(Ignore::All);
        let ports = input.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|port| input.port_name(port).unwrap_or_else(|_| "Unknown".into()))
            .collect();
        let Some(index) = select_port(&names, wanted) else {
            let _ = sender.midi_status("No MIDI device", false);
            return Err(match wanted {
                Some(wanted) => anyhow!("midi port `{wanted}` not found"),
                None => anyhow!("no midi input ports available"),
            });
        };
        let port = ports[index].clone();
        let name = names[index].clone();

        let note_sender = sender.clone();
        let connection = input
            .connect(
                &port,
                "etude-input",
                move |_stamp, message, _| {
                    if let Some((note, velocity)) = parse_note_on(message) {
                        let _ = note_sender.note_on(note, velocity);
                    }
                },
                (),
            )
            .map_err(|err| anyhow!("midi connect error: {err}"))?;
        info!(port = %name, "midi input connected");
        sender.midi_status(format!("Connected: {name}"), true)?;

        let running = Arc::new(AtomicBool::new(true));
        let watcher = spawn_watcher(name.clone(), sender, Arc::clone(&running));
        Ok(MidiSession {
            device: MidiDevice { name },
            connection: Some(connection),
            running,
            watcher: Some(watcher),
        })
    }
}

/// Polls the port list and reports the device as gone once its port disappears.
fn spawn_watcher(name: String, sender: CommandSender, running: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            thread::sleep(WATCH_INTERVAL);
            if !running.load(Ordering::Relaxed) {
                break;
            }
            let present = match MidiInput::new(CLIENT_NAME) {
                Ok(probe) => probe
                    .ports()
                    .iter()
                    .any(|port| probe.port_name(port).is_ok_and(|port_name| port_name == name)),
                Err(err) => {
                    debug!(%err, "midi probe failed");
                    continue;
                }
            };
            if !present {
                warn!(port = %name, "midi input disappeared");
                let _ = sender.midi_status(format!("Disconnected: {name}"), false);
                break;
            }
        }
        debug!(port = %name, "midi watcher finished");
    })
}

/// An open input port. Dropping it closes the port and stops the watcher.
pub struct MidiSession {
    device: MidiDevice,
    connection: Option<MidiInputConnection<()>>,
    running: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

impl MidiSession {
    pub fn device(&self) -> &MidiDevice {
        &self.device
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!(port = %self.device.name, "midi input closed");
        }
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

impl Drop for MidiSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
