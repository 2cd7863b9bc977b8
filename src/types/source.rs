//! Identities of the things a comparison is asked about, and the tagged
//! selectors callers use to name them.

use serde::{Deserialize, Serialize};

use crate::error::NucdiffError;

/// A simulation output file registered in the dataset store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataFile {
    pub id: i64,
    pub name: String,
}

/// A tracked category of simulated data (e.g. isotope density).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalQuantity {
    pub id: i64,
    pub name: String,
}

/// Either the name of an entity or the already-resolved entity itself.
///
/// Selectors are resolved once at the orchestration boundary, so the
/// comparison stages only ever see concrete entities.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Selector<T> {
    ByName(String),
    ByEntity(T),
}

impl<T> Selector<T> {
    pub fn resolve<F>(self, lookup: F) -> Result<T, NucdiffError>
    where
        F: FnOnce(&str) -> Result<T, NucdiffError>,
    {
        match self {
            Selector::ByName(name) => lookup(&name),
            Selector::ByEntity(entity) => Ok(entity),
        }
    }
}

impl<T> From<&str> for Selector<T> {
    fn from(name: &str) -> Self {
        Selector::ByName(name.to_string())
    }
}

/// Selects the physical quantities to compare.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuantitySelection {
    /// Every quantity the store knows about.
    All,
    ByNames(Vec<String>),
    ByEntities(Vec<PhysicalQuantity>),
}

impl Default for QuantitySelection {
    fn default() -> Self {
        QuantitySelection::ByNames(vec!["isotope".to_string()])
    }
}
