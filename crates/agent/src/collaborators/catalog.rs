//! In-process keyword search over a vehicle catalog.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use kabot_core::collaborator::{Vehicle, VehicleSearch};
use kabot_core::error::{Error, Result};
use tracing::{debug, info};

/// Ranks vehicles by how many query words they match.
///
/// Make, model, version and year are searchable; `bluetooth` and `carplay`
/// match vehicles that have the feature.
#[derive(Debug, Clone, Default)]
pub struct CatalogSearch {
    vehicles: Vec<Vehicle>,
}

impl CatalogSearch {
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self { vehicles }
    }

    /// An empty catalog: every search returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a JSON array of vehicles.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| Error::Config {
            message: format!("Cannot read catalog {}: {e}", path.display()),
        })?;
        let vehicles: Vec<Vehicle> = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("Invalid catalog {}: {e}", path.display()),
        })?;
        info!(path = %path.display(), vehicles = vehicles.len(), "Loaded vehicle catalog");
        Ok(Self::new(vehicles))
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    fn score(vehicle: &Vehicle, query: &HashSet<String>) -> usize {
        let mut terms = tokens(&format!(
            "{} {} {} {}",
            vehicle.make, vehicle.model, vehicle.version, vehicle.year
        ));
        if vehicle.bluetooth {
            terms.insert("bluetooth".into());
        }
        if vehicle.car_play {
            terms.insert("carplay".into());
        }
        query.intersection(&terms).count()
    }
}

/// Lowercase, accent-folded words of `text`.
fn tokens(text: &str) -> HashSet<String> {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            other => other,
        })
        .collect();

    folded
        .replace("car play", "carplay")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl VehicleSearch for CatalogSearch {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Vehicle>> {
        let query = tokens(query);
        let mut ranked: Vec<(usize, &Vehicle)> = self
            .vehicles
            .iter()
            .map(|v| (Self::score(v, &query), v))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Best match first, cheaper first on ties
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.price.total_cmp(&b.1.price)));

        let hits: Vec<Vehicle> = ranked.into_iter().take(k).map(|(_, v)| v.clone()).collect();
        debug!(hits = hits.len(), k, "Catalog search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_vehicles;

    #[tokio::test]
    async fn matches_make_and_model() {
        let catalog = CatalogSearch::new(sample_vehicles());
        let hits = catalog.search("Busco un Mazda 3", 5).await.unwrap();
        assert_eq!(hits[0].make, "Mazda");
    }

    #[tokio::test]
    async fn features_and_accents_match() {
        let catalog = CatalogSearch::new(sample_vehicles());
        let hits = catalog.search("algo con Car Play", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        // Cheaper first among equal scores
        assert_eq!(hits[0].make, "Mazda");

        let hits = catalog.search("VOLKSWAGEN jetta", 5).await.unwrap();
        assert_eq!(hits[0].model, "Jetta");
    }

    #[tokio::test]
    async fn k_limits_results_and_misses_are_empty() {
        let catalog = CatalogSearch::new(sample_vehicles());
        assert_eq!(catalog.search("bluetooth", 1).await.unwrap().len(), 1);
        assert!(catalog.search("tesla", 5).await.unwrap().is_empty());
        assert!(CatalogSearch::empty().search("mazda", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&sample_vehicles()).unwrap()).unwrap();

        let catalog = CatalogSearch::from_path(&path).await.unwrap();
        assert_eq!(catalog.len(), 3);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            CatalogSearch::from_path(&path).await,
            Err(Error::Config { .. })
        ));
    }
}
