use std::{fs, path::PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{CategoryTotal, NewWasteItem, WasteItem},
};

/// File name of the persisted log, namespaced like the browser storage key.
pub const WASTE_LOG_FILE: &str = "ecoDharmaWasteLog.json";

/// Categories offered by the tracker, in chart order.
pub const WASTE_CATEGORIES: [&str; 7] = ["Plastic", "Paper", "Organic", "Glass", "Metal", "E-waste", "Other"];

/// Household waste log, written back to disk after every mutation.
pub struct WasteLog {
    items: RwLock<Vec<WasteItem>>,
    path: Option<PathBuf>,
}

impl WasteLog {
    /// In-memory log with no backing file.
    #[cfg(test)]
    pub fn in_memory(items: Vec<WasteItem>) -> Self {
        Self { items: RwLock::new(items), path: None }
    }

    /// Loads the log from `path`, seeding sample entries when the file does not exist yet.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let items = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| persistence(&path, e))?;
            let items: Vec<WasteItem> = serde_json::from_str(&raw).map_err(|e| persistence(&path, e))?;
            info!("📂 Loaded {} waste log entries from {}", items.len(), path.display());
            items
        } else {
            warn!("{} not found, seeding waste log with sample entries", path.display());
            seed_items()
        };
        let log = Self { items: RwLock::new(items), path: Some(path) };
        log.persist(&log.items.read())?;
        Ok(log)
    }

    pub fn list(&self) -> Vec<WasteItem> {
        self.items.read().clone()
    }

    pub fn add(&self, item: NewWasteItem) -> Result<WasteItem, StoreError> {
        let entry = build_entry(Uuid::new_v4(), item)?;
        let mut items = self.items.write();
        let mut next = items.clone();
        next.push(entry.clone());
        self.persist(&next)?;
        *items = next;
        Ok(entry)
    }

    pub fn update(&self, id: Uuid, patch: NewWasteItem) -> Result<WasteItem, StoreError> {
        let entry = build_entry(id, patch)?;
        let mut items = self.items.write();
        let pos = items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut next = items.clone();
        next[pos] = entry.clone();
        self.persist(&next)?;
        *items = next;
        Ok(entry)
    }

    pub fn remove(&self, id: Uuid) -> Result<WasteItem, StoreError> {
        let mut items = self.items.write();
        let pos = items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut next = items.clone();
        let removed = next.remove(pos);
        self.persist(&next)?;
        *items = next;
        Ok(removed)
    }

    /// Quantity per tracker category in chart order, omitting empty totals.
    pub fn summary(&self) -> Vec<CategoryTotal> {
        let items = self.items.read();
        WASTE_CATEGORIES
            .iter()
            .map(|category| CategoryTotal {
                category: category.to_string(),
                quantity: items.iter().filter(|i| i.category == *category).map(|i| i.quantity).sum(),
            })
            .filter(|t| t.quantity > 0.0)
            .collect()
    }

    fn persist(&self, items: &[WasteItem]) -> Result<(), StoreError> {
        let Some(path) = &self.path else { return Ok(()) };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| persistence(path, e))?;
        }
        let json = serde_json::to_string_pretty(items).map_err(|e| persistence(path, e))?;
        fs::write(path, json).map_err(|e| persistence(path, e))
    }
}

fn persistence(path: &std::path::Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::Persistence { path: path.display().to_string(), reason: e.to_string() }
}

fn build_entry(id: Uuid, item: NewWasteItem) -> Result<WasteItem, StoreError> {
    let name = item.name.trim();
    let category = item.category.trim();
    if name.is_empty() || category.is_empty() {
        return Err(StoreError::InvalidInput("name and category are required".into()));
    }
    if !WASTE_CATEGORIES.contains(&category) {
        return Err(StoreError::InvalidInput(format!("unknown category '{category}'")));
    }
    if !(item.quantity.is_finite() && item.quantity > 0.0) {
        return Err(StoreError::InvalidInput("quantity must be a positive number".into()));
    }
    Ok(WasteItem {
        id,
        name: name.to_string(),
        category: category.to_string(),
        quantity: item.quantity,
        date: Utc::now(),
    })
}

fn seed_items() -> Vec<WasteItem> {
    [("Plastic Bottles", "Plastic", 5.0), ("Newspapers", "Paper", 2.0), ("Food Scraps", "Organic", 1.0)]
        .into_iter()
        .map(|(name, category, quantity)| WasteItem {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            quantity,
            date: Utc::now(),
        })
        .collect()
}
