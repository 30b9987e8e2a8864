// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Optional class-field layout side-file.
//!
//! ```json
//! {"classes":[{"class_id":"0x10","fields":[{"name":"next","type":"Node"}]}]}
//! ```
//!
//! The side-file only adds declared type names to field listings. A missing
//! or unreadable layout never fails a query.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::graph::HeapGraph;
use crate::ident::{ClassId, IdParseError, Slot};

/// Error returned when a layout side-file cannot be parsed.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Not valid JSON or not the expected shape.
    #[error("layout json: {0}")]
    Json(#[from] serde_json::Error),
    /// A `class_id` entry is not a valid identifier.
    #[error("layout class id {text:?}: {source}")]
    ClassId {
        /// Offending text.
        text: String,
        /// Parse failure.
        source: IdParseError,
    },
}

/// One declared field.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeclaredField {
    /// Field name.
    pub name: String,
    /// Declared type name.
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Deserialize)]
struct LayoutFile {
    classes: Vec<LayoutClass>,
}

#[derive(Deserialize)]
struct LayoutClass {
    class_id: String,
    #[serde(default)]
    fields: Vec<DeclaredField>,
}

/// Declared fields per class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassFieldLayout {
    classes: FxHashMap<ClassId, Vec<DeclaredField>>,
}

impl ClassFieldLayout {
    /// Parses the JSON side-file.
    pub fn from_json(bytes: &[u8]) -> Result<Self, LayoutError> {
        let file: LayoutFile = serde_json::from_slice(bytes)?;
        let mut layout = Self::default();
        for class in file.classes {
            let id = class
                .class_id
                .parse::<ClassId>()
                .map_err(|source| LayoutError::ClassId {
                    text: class.class_id.clone(),
                    source,
                })?;
            layout.insert(id, class.fields);
        }
        Ok(layout)
    }

    /// Replaces the declared fields of `class`.
    pub fn insert(&mut self, class: ClassId, fields: Vec<DeclaredField>) {
        self.classes.insert(class, fields);
    }

    /// Number of classes described.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class is described.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Declared fields of `class` (empty when not described).
    #[must_use]
    pub fn fields(&self, class: ClassId) -> &[DeclaredField] {
        self.classes.get(&class).map(Vec::as_slice).unwrap_or_default()
    }

    /// Declared type of `field` on `class_slot`, searching superclasses.
    #[must_use]
    pub fn field_type<'a>(&'a self, graph: &HeapGraph, class_slot: Slot, field: &str) -> Option<&'a str> {
        let mut current = Some(class_slot);
        let mut hops = 0;
        while let Some(slot) = current {
            if hops > graph.class_count() {
                break;
            }
            hops += 1;
            if let Some(found) = self
                .fields(graph.class_id(slot))
                .iter()
                .find(|f| f.name == field)
            {
                return Some(&found.type_name);
            }
            current = graph.superclass(slot);
        }
        None
    }
}
