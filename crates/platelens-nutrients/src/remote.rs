use async_trait::async_trait;
use dashmap::DashMap;
use platelens_core::{NutrientRecord, NutrientSource};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::store::{is_gram_unit, normalize};

/// Remote fallback source, consulted only after a local-store miss. A miss or
/// a transport failure both surface as `None`; remote lookups are never fatal.
#[async_trait]
pub trait RemoteNutrientSource: Send + Sync {
    async fn lookup(&self, name: &str, quantity: f64, unit: &str) -> Option<NutrientRecord>;
}

#[derive(Debug, Deserialize)]
struct FdcSearchResponse {
    foods: Option<Vec<FdcFood>>,
}

#[derive(Debug, Deserialize)]
struct FdcFood {
    #[serde(rename = "foodNutrients", default)]
    food_nutrients: Vec<FdcNutrient>,
}

#[derive(Debug, Deserialize)]
struct FdcNutrient {
    #[serde(rename = "nutrientId")]
    nutrient_id: Option<u64>,
    value: Option<f64>,
}

/// FoodData-Central-style search client. Values come back per 100 g; results
/// are cached by normalized name so repeat items skip the network.
pub struct FdcClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    cache: DashMap<String, NutrientRecord>,
}

impl FdcClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.nal.usda.gov/fdc/v1")
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: DashMap::new(),
        }
    }

    async fn fetch_per_100g(&self, name: &str) -> Option<NutrientRecord> {
        let url = format!(
            "{}/foods/search?query={}&pageSize=1&api_key={}",
            self.base_url,
            urlencoding::encode(name),
            self.api_key
        );

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("FDC: request for '{}' failed: {}", name, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("FDC: search for '{}' returned {}", name, response.status());
            return None;
        }

        let data: FdcSearchResponse = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                warn!("FDC: malformed response for '{}': {}", name, e);
                return None;
            }
        };

        let food = data.foods.unwrap_or_default().into_iter().next()?;
        Some(record_from_nutrients(&food.food_nutrients))
    }
}

#[async_trait]
impl RemoteNutrientSource for FdcClient {
    async fn lookup(&self, name: &str, quantity: f64, unit: &str) -> Option<NutrientRecord> {
        if self.api_key.is_empty() {
            debug!("FDC: no API key configured, skipping remote lookup");
            return None;
        }

        let key = normalize(name);
        let per_100g = match self.cache.get(&key) {
            Some(cached) => {
                debug!("FDC: cache hit for '{}'", key);
                cached.clone()
            }
            None => {
                let fetched = self.fetch_per_100g(name).await?;
                info!("FDC: resolved '{}' remotely", name);
                self.cache.insert(key, fetched.clone());
                fetched
            }
        };

        let factor = if is_gram_unit(unit) {
            quantity / 100.0
        } else {
            // Without portion weights a generic unit is taken as one 100 g
            // serving per quantity unit.
            quantity
        };
        Some(per_100g.scaled(factor))
    }
}

// FoodData Central nutrient numbers for the fields the record carries.
const FDC_PROTEIN: u64 = 1003;
const FDC_TOTAL_FAT: u64 = 1004;
const FDC_CARBS: u64 = 1005;
const FDC_CALORIES: u64 = 1008;
const FDC_FIBER: u64 = 1079;
const FDC_SODIUM: u64 = 1093;
const FDC_CHOLESTEROL: u64 = 1253;
const FDC_SAT_FAT: u64 = 1258;
const FDC_SUGARS: u64 = 2000;

fn record_from_nutrients(nutrients: &[FdcNutrient]) -> NutrientRecord {
    let get = |id: u64| {
        nutrients
            .iter()
            .find(|n| n.nutrient_id == Some(id))
            .and_then(|n| n.value)
    };

    NutrientRecord {
        calories: get(FDC_CALORIES).unwrap_or(0.0).round() as i64,
        protein_g: get(FDC_PROTEIN),
        total_fat_g: get(FDC_TOTAL_FAT),
        saturated_fat_g: get(FDC_SAT_FAT),
        cholesterol_mg: get(FDC_CHOLESTEROL),
        sodium_mg: get(FDC_SODIUM),
        total_carbs_g: get(FDC_CARBS),
        dietary_fiber_g: get(FDC_FIBER),
        sugars_g: get(FDC_SUGARS),
        glycemic_index: None,
        glycemic_load: None,
        source: NutrientSource::Remote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_nutrient_ids_and_leaves_rest_empty() {
        let nutrients = vec![
            FdcNutrient {
                nutrient_id: Some(FDC_CALORIES),
                value: Some(52.0),
            },
            FdcNutrient {
                nutrient_id: Some(FDC_PROTEIN),
                value: Some(0.3),
            },
            FdcNutrient {
                nutrient_id: Some(9999),
                value: Some(42.0),
            },
        ];

        let record = record_from_nutrients(&nutrients);
        assert_eq!(record.calories, 52);
        assert_eq!(record.protein_g, Some(0.3));
        assert_eq!(record.total_fat_g, None);
        assert_eq!(record.source, NutrientSource::Remote);
    }

    #[tokio::test]
    async fn missing_api_key_disables_the_client() {
        let client = FdcClient::new(String::new());
        assert!(client.lookup("apple", 1.0, "item").await.is_none());
    }

    #[tokio::test]
    async fn cached_entries_skip_the_network() {
        // Unroutable base URL: any actual request would fail and yield None,
        // so a hit here proves the cache short-circuited.
        let client = FdcClient::with_base_url("key".to_string(), "http://127.0.0.1:9");

        let mut per_100g = NutrientRecord::estimate(130);
        per_100g.source = NutrientSource::Remote;
        client.cache.insert("rice".to_string(), per_100g);

        let scaled = client.lookup(" Rice ", 200.0, "g").await.unwrap();
        assert_eq!(scaled.calories, 260);
        assert_eq!(scaled.source, NutrientSource::Remote);
    }
}
