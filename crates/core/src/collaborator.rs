//! Collaborator traits: the opaque responders an intent handler delegates to.
//!
//! Financing advice, Kavak information and farewells are all text generators
//! parameterized by a few structured extras. Vehicle search is the one
//! collaborator that returns data instead of prose.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;

/// Structured extras handed to a collaborator next to the raw user input.
///
/// Each collaborator reads only the fields it needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollaboratorExtras {
    /// Vehicle data identified by the classifier (financing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,

    /// Rendered working memory (farewell).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_memory: String,

    /// Rendered fact memory (farewell).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub facts: String,

    /// Summary memory (farewell).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
}

/// A text-producing collaborator.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// The unique name of this collaborator (e.g., "financing").
    fn name(&self) -> &str;

    /// Produce the reply for `user_input`.
    async fn respond(&self, user_input: &str, extras: &CollaboratorExtras) -> Result<String>;
}

/// A vehicle in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub stock_id: i64,
    pub km: i64,
    pub price: f64,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub version: String,
    #[serde(default)]
    pub bluetooth: bool,
    pub largo: f64,
    pub ancho: f64,
    pub altura: f64,
    #[serde(default)]
    pub car_play: bool,
}

impl Vehicle {
    /// One-line Spanish description used in prompts and search summaries.
    pub fn description(&self) -> String {
        format!(
            "{} {} {}, versión {}, {} km, ${} MXN, {}, {}.",
            self.make,
            self.model,
            self.year,
            self.version,
            self.km,
            self.price,
            if self.bluetooth { "con Bluetooth" } else { "sin Bluetooth" },
            if self.car_play {
                "compatible con CarPlay"
            } else {
                "no compatible con CarPlay"
            },
        )
    }
}

/// The vehicle search backend.
#[async_trait]
pub trait VehicleSearch: Send + Sync {
    /// The backend name (e.g., "catalog").
    fn name(&self) -> &str;

    /// Return at most `k` vehicles matching the free-text `query`.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Vehicle>>;
}
