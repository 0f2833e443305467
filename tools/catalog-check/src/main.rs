use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use etude_domain::{
    category_label, load_catalog, Catalog, CatalogEntry, CatalogExporter, CatalogFormat,
    ExerciseRuntime, NormalizingExporter,
};
use etude_notation::{ScoreLayout, TickLayout};

#[derive(Parser, Debug)]
#[command(author, version, about = "Validate an exercise catalog and report its layout")]
struct Args {
    /// Path to a JSON or YAML catalog
    input: PathBuf,
    /// Write the valid exercises back out as normalized JSON
    #[arg(long)]
    emit_json: Option<PathBuf>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
    /// Exit with an error when any entry is malformed or any event cannot be placed
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Serialize)]
struct ExerciseReport {
    category: String,
    id: String,
    name: String,
    repetitions: u32,
    total_ticks: u32,
    systems: usize,
    unplaced: usize,
    playable: bool,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CatalogReport {
    exercises: Vec<ExerciseReport>,
    malformed: Vec<(String, String)>,
}

impl CatalogReport {
    fn problems(&self) -> usize {
        self.malformed.len()
            + self
                .exercises
                .iter()
                .filter(|exercise| exercise.error.is_some() || exercise.unplaced > 0)
                .count()
    }
}

fn check(catalog: &Catalog, layout: &dyn ScoreLayout) -> CatalogReport {
    let mut exercises = Vec::new();
    let mut malformed = Vec::new();
    for category in catalog.categories() {
        let Ok(entries) = catalog.entries(category) else {
            continue;
        };
        for entry in entries {
            let definition = match entry {
                CatalogEntry::Exercise(definition) => definition,
                CatalogEntry::Malformed { reason } => {
                    malformed.push((category.to_string(), reason.clone()));
                    continue;
                }
            };
            let mut runtime = ExerciseRuntime::from_definition(definition);
            let mut report = ExerciseReport {
                category: category.to_string(),
                id: definition.id.clone(),
                name: definition.display_name().to_string(),
                repetitions: definition.target_repetitions(),
                total_ticks: 0,
                systems: 0,
                unplaced: 0,
                playable: false,
                error: None,
            };
            match layout.layout("check", &mut runtime) {
                Ok(summary) => {
                    report.total_ticks = summary.total_ticks;
                    report.systems = summary.systems;
                    report.unplaced = summary.unplaced;
                    report.playable = runtime.has_playable_notes();
                }
                Err(err) => {
                    warn!(id = %definition.id, %err, "layout failed");
                    report.error = Some(err.to_string());
                }
            }
            exercises.push(report);
        }
    }
    CatalogReport {
        exercises,
        malformed,
    }
}

fn print_text(report: &CatalogReport) {
    let mut current = None;
    for exercise in &report.exercises {
        if current != Some(exercise.category.as_str()) {
            println!("{}", category_label(&exercise.category));
            current = Some(exercise.category.as_str());
        }
        match &exercise.error {
            Some(error) => println!("  {:<24} ERROR {error}", exercise.id),
            None => println!(
                "  {:<24} x{} {} ticks, {} systems{}{}",
                exercise.id,
                exercise.repetitions,
                exercise.total_ticks,
                exercise.systems,
                if exercise.unplaced > 0 {
                    format!(", {} unplaced", exercise.unplaced)
                } else {
                    String::new()
                },
                if exercise.playable { "" } else { ", nothing to play" },
            ),
        }
    }
    for (category, reason) in &report.malformed {
        println!("malformed entry in {category}: {reason}");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let catalog = load_catalog(&args.input)?;
    info!(
        exercises = catalog.exercise_count(),
        malformed = catalog.malformed_count(),
        "loaded catalog"
    );

    let report = check(&catalog, &TickLayout::default());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }

    if let Some(path) = &args.emit_json {
        let bytes = NormalizingExporter.export(&catalog, CatalogFormat::Json)?;
        fs::write(path, bytes)?;
        info!(path = %path.display(), "wrote normalized catalog");
    }

    let problems = report.problems();
    if args.strict && problems > 0 {
        bail!("{problems} problem(s) found");
    }
    Ok(())
}
