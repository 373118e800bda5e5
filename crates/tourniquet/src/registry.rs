//! Named patch templates.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tourniquet_patch_lang::PatchTemplate;

use crate::{Error, Result};

/// Templates known to one engine, keyed by name.
///
/// Registration is one-shot: a name can be claimed once and is never
/// replaced or removed.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, PatchTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, template: PatchTemplate) -> Result<()> {
        match self.templates.entry(name.into()) {
            Entry::Occupied(e) => Err(Error::TemplateNameConflict(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(template);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<&PatchTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatchTemplate)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
