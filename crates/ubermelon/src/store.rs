//! The melon catalogue.
//!
//! Records are kept in insertion order, which is also the order the
//! `/top-melons` page lists them in.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One melon and how loved it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MelonRecord {
    /// Short code used in forms (`cren`, `jubi`, ...).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Absolute URL of the melon picture.
    pub image_url: String,

    /// Number of loves so far.
    pub loves: u64,
}

impl MelonRecord {
    pub fn new(id: &str, name: &str, image_url: &str, loves: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            image_url: image_url.to_string(),
            loves,
        }
    }
}

/// Owned, ordered collection of melons keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MelonStore {
    melons: Vec<MelonRecord>,
}

impl MelonStore {
    /// Build a store from records, rejecting duplicate ids.
    pub fn from_records(records: impl IntoIterator<Item = MelonRecord>) -> Result<Self> {
        let mut melons: Vec<MelonRecord> = Vec::new();
        for record in records {
            if melons.iter().any(|m| m.id == record.id) {
                return Err(AppError::DuplicateMelon(record.id));
            }
            melons.push(record);
        }
        Ok(Self { melons })
    }

    /// The four most loved melons UberMelon launches with.
    pub fn most_loved() -> Self {
        Self {
            melons: vec![
                MelonRecord::new(
                    "cren",
                    "Crenshaw",
                    "http://www.rareseeds.com/assets/1/14/DimRegular/crenshaw.jpg",
                    584,
                ),
                MelonRecord::new(
                    "jubi",
                    "Jubilee Watermelon",
                    "http://www.rareseeds.com/assets/1/14/DimThumbnail/Jubilee-Watermelon-web.jpg",
                    601,
                ),
                MelonRecord::new(
                    "sugb",
                    "Sugar Baby Watermelon",
                    "http://www.rareseeds.com/assets/1/14/DimThumbnail/Sugar-Baby-Watermelon-web.jpg",
                    587,
                ),
                MelonRecord::new(
                    "texb",
                    "Texas Golden Watermelon",
                    "http://www.rareseeds.com/assets/1/14/DimThumbnail/Texas-Golden-2-Watermelon-web.jpg",
                    598,
                ),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&MelonRecord> {
        self.melons.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MelonRecord> {
        self.melons.iter()
    }

    pub fn len(&self) -> usize {
        self.melons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.melons.is_empty()
    }

    /// Add one love to a melon and return its new count.
    pub fn love(&mut self, id: &str) -> Result<u64> {
        let melon = self
            .melons
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::UnknownMelon(id.to_string()))?;
        melon.loves = melon.loves.saturating_add(1);
        Ok(melon.loves)
    }
}

impl Default for MelonStore {
    fn default() -> Self {
        Self::most_loved()
    }
}
