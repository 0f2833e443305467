use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::{NoteEvent, Staff};
use crate::DomainError;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<u32>,
    /// Time signature as `numerator/denominator`; layout assumes `4/4` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
    /// Key name such as `G` or `Bb`, shown with the score header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes_treble: Vec<NoteEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes_bass: Vec<NoteEvent>,
    /// Events of a single-staff exercise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<NoteEvent>,
}

impl ExerciseDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            repetitions: None,
            time_signature: None,
            key_signature: None,
            notes_treble: Vec::new(),
            notes_bass: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = Some(repetitions);
        self
    }

    pub fn with_notes(mut self, staff: Staff, notes: Vec<NoteEvent>) -> Self {
        *self.staff_mut(staff) = notes;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// Missing or zero repetitions mean a single pass.
    pub fn target_repetitions(&self) -> u32 {
        self.repetitions.filter(|count| *count > 0).unwrap_or(1)
    }

    pub fn staff(&self, staff: Staff) -> &[NoteEvent] {
        match staff {
            Staff::Treble => &self.notes_treble,
            Staff::Bass => &self.notes_bass,
            Staff::Single => &self.notes,
        }
    }

    fn staff_mut(&mut self, staff: Staff) -> &mut Vec<NoteEvent> {
        match staff {
            Staff::Treble => &mut self.notes_treble,
            Staff::Bass => &mut self.notes_bass,
            Staff::Single => &mut self.notes,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("exercise id must not be empty"));
        }
        Ok(())
    }
}

/// A catalog slot. Entries that failed validation keep their position so ordered
/// advancement can skip over them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogEntry {
    Exercise(ExerciseDefinition),
    Malformed { reason: String },
}

impl CatalogEntry {
    pub fn exercise(&self) -> Option<&ExerciseDefinition> {
        match self {
            CatalogEntry::Exercise(definition) => Some(definition),
            CatalogEntry::Malformed { .. } => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Exercise(ExerciseDefinition),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Entries(Vec<RawEntry>),
    Other(IgnoredAny),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, RawCategory>",
    into = "BTreeMap<String, Vec<ExerciseDefinition>>"
)]
pub struct Catalog {
    categories: BTreeMap<String, Vec<CatalogEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a category, demoting invalid or duplicate definitions to malformed entries.
    pub fn insert_category(
        &mut self,
        key: impl Into<String>,
        definitions: Vec<ExerciseDefinition>,
    ) {
        let entries = definitions.into_iter().map(CatalogEntry::Exercise).collect();
        self.categories.insert(key.into(), normalize(entries));
    }

    /// Keys of categories holding at least one entry.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(key, _)| key.as_str())
    }

    pub fn entries(&self, category: &str) -> Result<&[CatalogEntry], DomainError> {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| DomainError::UnknownCategory(category.to_string()))
    }

    pub fn exercises<'a>(
        &'a self,
        category: &str,
    ) -> Result<impl Iterator<Item = &'a ExerciseDefinition> + 'a, DomainError> {
        Ok(self.entries(category)?.iter().filter_map(CatalogEntry::exercise))
    }

    pub fn find(&self, category: &str, id: &str) -> Result<&ExerciseDefinition, DomainError> {
        self.exercises(category)?
            .find(|definition| definition.id == id)
            .ok_or_else(|| DomainError::UnknownExercise {
                category: category.to_string(),
                id: id.to_string(),
            })
    }

    pub fn malformed_count(&self) -> usize {
        self.categories
            .values()
            .flatten()
            .filter(|entry| entry.exercise().is_none())
            .count()
    }

    pub fn exercise_count(&self) -> usize {
        self.categories
            .values()
            .flatten()
            .filter(|entry| entry.exercise().is_some())
            .count()
    }
}

/// Display label for a category key: `scale_studies` becomes `Scale Studies`.
pub fn category_label(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen: Vec<String> = Vec::new();
    entries
        .into_iter()
        .map(|entry| match entry {
            CatalogEntry::Exercise(definition) => {
                if let Err(err) = definition.validate() {
                    warn!(%err, "malformed catalog entry");
                    CatalogEntry::Malformed {
                        reason: err.to_string(),
                    }
                } else if seen.contains(&definition.id) {
                    warn!(id = %definition.id, "duplicate exercise id");
                    CatalogEntry::Malformed {
                        reason: format!("duplicate exercise id `{}`", definition.id),
                    }
                } else {
                    seen.push(definition.id.clone());
                    CatalogEntry::Exercise(definition)
                }
            }
            malformed => malformed,
        })
        .collect()
}

impl From<BTreeMap<String, RawCategory>> for Catalog {
    fn from(raw: BTreeMap<String, RawCategory>) -> Self {
        let categories = raw
            .into_iter()
            .map(|(key, category)| {
                let entries = match category {
                    RawCategory::Entries(entries) => entries
                        .into_iter()
                        .map(|entry| match entry {
                            RawEntry::Exercise(definition) => CatalogEntry::Exercise(definition),
                            RawEntry::Other(_) => {
                                warn!(category = %key, "entry is not a valid exercise definition");
                                CatalogEntry::Malformed {
                                    reason: "not a valid exercise definition".to_string(),
                                }
                            }
                        })
                        .collect(),
                    RawCategory::Other(_) => {
                        warn!(category = %key, "category is not a list, ignoring it");
                        Vec::new()
                    }
                };
                (key, normalize(entries))
            })
            .collect();
        Self { categories }
    }
}

impl From<Catalog> for BTreeMap<String, Vec<ExerciseDefinition>> {
    fn from(catalog: Catalog) -> Self {
        catalog
            .categories
            .into_iter()
            .map(|(key, entries)| {
                let definitions = entries
                    .into_iter()
                    .filter_map(|entry| match entry {
                        CatalogEntry::Exercise(definition) => Some(definition),
                        CatalogEntry::Malformed { .. } => None,
                    })
                    .collect();
                (key, definitions)
            })
            .collect()
    }
}
