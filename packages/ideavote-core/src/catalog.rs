/// Static idea catalog: the single source of truth for valid idea IDs.
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::types::{Idea, Phase};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate idea id {0} in catalog")]
    DuplicateId(u32),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct IdeaCatalog {
    ideas: Vec<Idea>,
    /// id -> position in `ideas`
    index: HashMap<u32, usize>,
}

impl IdeaCatalog {
    pub fn new(ideas: Vec<Idea>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(ideas.len());
        for (pos, idea) in ideas.iter().enumerate() {
            if index.insert(idea.id, pos).is_some() {
                return Err(CatalogError::DuplicateId(idea.id));
            }
        }
        Ok(Self { ideas, index })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let ideas: Vec<Idea> = serde_json::from_str(json)?;
        Self::new(ideas)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        log::info!(
            target: "ideavote.catalog",
            "Loaded {} ideas from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn get(&self, id: u32) -> Option<&Idea> {
        self.index.get(&id).map(|&pos| &self.ideas[pos])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Catalog position of an idea, used for stable ordering.
    pub fn position(&self, id: u32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    /// Ideas of one phase in catalog order.
    pub fn in_phase(&self, phase: Phase) -> impl Iterator<Item = &Idea> {
        self.ideas.iter().filter(move |idea| idea.phase == phase)
    }

    pub fn phase_ids(&self, phase: Phase) -> HashSet<u32> {
        self.in_phase(phase).map(|idea| idea.id).collect()
    }

    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }
}
