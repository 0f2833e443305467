pub mod error;
pub mod events;
pub mod exercise;
pub mod io;
pub mod pitch;
pub mod runtime;

pub use crate::error::DomainError;
pub use crate::events::{NoteEvent, NotePitch, Staff};
pub use crate::exercise::{category_label, Catalog, CatalogEntry, ExerciseDefinition};
pub use crate::io::{
    load_catalog, parse_catalog, CatalogExporter, CatalogFormat, NormalizingExporter,
};
pub use crate::pitch::note_name;
pub use crate::runtime::{ExerciseRuntime, NoteStatus, RuntimeNote, SystemPosition};
