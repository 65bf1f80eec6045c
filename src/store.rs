//! Knowledge store abstraction.
//!
//! The [`KnowledgeStore`] trait defines the repository interface the
//! retrieval engine and the `ops kb` administrative commands operate
//! against, enabling pluggable backends (JSON file, in-memory fixtures).
//!
//! The query path only ever calls [`KnowledgeStore::list_all`] and treats
//! the returned items as an immutable snapshot; all mutation flows through
//! the admin commands. Both built-in backends preserve insertion order,
//! which is the order the retrieval engine reports matches in.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::models::KnowledgeItem;

/// Abstract repository of curated knowledge items.
pub trait KnowledgeStore: Send + Sync {
    /// Snapshot of every item, in insertion order.
    fn list_all(&self) -> Result<Vec<KnowledgeItem>>;

    /// Fetch one item by id.
    fn get(&self, id: &str) -> Result<Option<KnowledgeItem>>;

    /// Insert a new item or replace the existing one with the same id.
    /// Replacement keeps the item's original position.
    fn upsert(&mut self, item: KnowledgeItem) -> Result<()>;

    /// Remove an item. Returns false if the id was unknown.
    fn remove(&mut self, id: &str) -> Result<bool>;
}

// ============ JSON file store ============

/// File-backed store: the whole item list lives in `knowledge.json` and is
/// rewritten on every mutation.
///
/// A missing file is an empty store. A file that exists but fails to parse
/// is a hard error — the knowledge base is curated data and silently
/// starting over would lose it.
pub struct JsonKnowledgeStore {
    path: PathBuf,
    items: Vec<KnowledgeItem>,
}

impl JsonKnowledgeStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, items })
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeStore for JsonKnowledgeStore {
    fn list_all(&self) -> Result<Vec<KnowledgeItem>> {
        Ok(self.items.clone())
    }

    fn get(&self, id: &str) -> Result<Option<KnowledgeItem>> {
        Ok(self.items.iter().find(|i| i.id == id).cloned())
    }

    fn upsert(&mut self, item: KnowledgeItem) -> Result<()> {
        match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
        self.persist()
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }
}

// ============ In-memory store ============

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryKnowledgeStore {
    items: Vec<KnowledgeItem>,
}

impl MemoryKnowledgeStore {
    pub fn new(items: Vec<KnowledgeItem>) -> Self {
        Self { items }
    }
}

impl KnowledgeStore for MemoryKnowledgeStore {
    fn list_all(&self) -> Result<Vec<KnowledgeItem>> {
        Ok(self.items.clone())
    }

    fn get(&self, id: &str) -> Result<Option<KnowledgeItem>> {
        Ok(self.items.iter().find(|i| i.id == id).cloned())
    }

    fn upsert(&mut self, item: KnowledgeItem) -> Result<()> {
        match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        Ok(self.items.len() != before)
    }
}
