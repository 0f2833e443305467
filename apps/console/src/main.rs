mod input;
mod presenter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use etude_domain::{category_label, load_catalog, Catalog};
use etude_tutor::{
    Command, CommandSender, MidiManager, RandomPicker, Tutor, TutorDriver, TutorSettings,
};

use crate::input::{parse_line, Input, HELP};
use crate::presenter::ConsolePresenter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Practice piano exercises from the terminal")]
struct Args {
    /// Exercise catalog, JSON or YAML
    catalog: PathBuf,
    /// Settings file; defaults to the user config directory
    #[arg(long)]
    config: Option<PathBuf>,
    /// MIDI input port name, or part of it
    #[arg(long)]
    port: Option<String>,
    /// List MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,
    /// Seed for random exercise selection
    #[arg(long)]
    seed: Option<u64>,
}

fn settings_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("etude").join("settings.json"))
}

fn load_settings(explicit: Option<&Path>) -> Result<TutorSettings> {
    if let Some(path) = explicit {
        return TutorSettings::load(path).with_context(|| format!("loading {}", path.display()));
    }
    match settings_path() {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "using settings file");
            Ok(TutorSettings::load(&path)?)
        }
        _ => Ok(TutorSettings::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.list_ports {
        for device in MidiManager::list_inputs()? {
            println!("{}", device.name);
        }
        return Ok(());
    }

    let mut settings = load_settings(args.config.as_deref())?;
    if args.port.is_some() {
        settings.midi_port = args.port.clone();
    }
    let catalog = Arc::new(
        load_catalog(&args.catalog)
            .with_context(|| format!("loading catalog {}", args.catalog.display()))?,
    );
    info!(
        categories = catalog.categories().count(),
        exercises = catalog.exercise_count(),
        malformed = catalog.malformed_count(),
        "catalog loaded"
    );

    let picker = match args.seed {
        Some(seed) => RandomPicker::seeded(seed),
        None => RandomPicker::new(),
    };
    let port = settings.midi_port.clone();
    let tutor = Tutor::new(Arc::clone(&catalog), settings, ConsolePresenter::new())
        .with_picker(picker);
    let (driver, sender) = TutorDriver::new(tutor);

    let rt = Runtime::new()?;
    rt.block_on(async {
        // Held until the driver returns; dropping it closes the port.
        let midi = match MidiManager::connect(port.as_deref(), sender.clone()) {
            Ok(session) => {
                println!("[midi] listening on {}", session.device().name);
                Some(session)
            }
            Err(err) => {
                warn!(%err, "running without MIDI input");
                let _ = sender.midi_status("No MIDI device", false);
                None
            }
        };
        println!("{HELP}");
        let (_tutor, reader) = tokio::join!(driver.run(), read_commands(sender, catalog));
        if let Some(midi) = midi {
            midi.close();
        }
        reader
    })
}

/// Forwards stdin to the tutor and always ends with a shutdown, even on read errors.
async fn read_commands(sender: CommandSender, catalog: Arc<Catalog>) -> Result<()> {
    let result = forward_lines(&sender, &catalog).await;
    sender.send(Command::Shutdown)?;
    result
}

async fn forward_lines(sender: &CommandSender, catalog: &Catalog) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut category: Option<String> = None;

    while let Some(line) = lines.next_line().await? {
        let input = match parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match input {
            Input::Help => println!("{HELP}"),
            Input::Categories => {
                for key in catalog.categories() {
                    println!("  {key:<24} {}", category_label(key));
                }
            }
            Input::Category(key) => {
                category = Some(key.clone());
                sender.send(Command::SelectCategory(key))?;
            }
            Input::Exercise { category: explicit, id } => {
                let Some(key) = explicit.or_else(|| category.clone()) else {
                    println!("select a category first");
                    continue;
                };
                if category.as_deref() != Some(key.as_str()) {
                    category = Some(key.clone());
                    sender.send(Command::SelectCategory(key.clone()))?;
                }
                sender.send(Command::SelectExercise { category: key, id })?;
            }
            Input::Start => sender.send(Command::Start)?,
            Input::Stop => sender.send(Command::Stop)?,
            Input::Play(notes) => {
                for note in notes {
                    sender.note_on(note, 100)?;
                }
            }
            Input::Quit => break,
        }
    }
    Ok(())
}
