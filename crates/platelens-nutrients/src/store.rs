use async_trait::async_trait;
use platelens_core::{NutrientRecord, NutrientSource};

/// Local nutrient reference store. Returned values are already scaled to the
/// requested quantity and unit.
#[async_trait]
pub trait NutrientStore: Send + Sync {
    async fn lookup(&self, name: &str, quantity: f64, unit: &str) -> Option<NutrientRecord>;
}

// name, brand, calories, protein, fat, sat fat, cholesterol, sodium, carbs,
// fiber, sugars, glycemic index, glycemic load, per-100g basis
type FoodRow = (
    &'static str,
    Option<&'static str>,
    i64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    Option<i64>,
    Option<f64>,
    bool,
);

const STARTER_FOODS: &[FoodRow] = &[
    ("taco", None, 210, 9.0, 10.0, 4.0, 25.0, 570.0, 21.0, 3.0, 2.0, Some(52), Some(11.0), false),
    ("chicken breast", None, 165, 31.0, 3.6, 1.0, 85.0, 74.0, 0.0, 0.0, 0.0, None, None, true),
    ("rice, white", None, 130, 2.7, 0.3, 0.1, 0.0, 1.0, 28.0, 0.4, 0.1, Some(73), Some(20.0), true),
    ("apple", None, 52, 0.3, 0.2, 0.0, 0.0, 1.0, 14.0, 2.4, 10.0, Some(36), Some(5.0), false),
    ("banana", None, 89, 1.1, 0.3, 0.1, 0.0, 1.0, 23.0, 2.6, 12.0, Some(51), Some(13.0), false),
    ("pizza, cheese", None, 266, 11.0, 10.0, 4.5, 22.0, 598.0, 33.0, 2.0, 3.8, Some(60), Some(20.0), false),
    ("hamburger", None, 540, 25.0, 27.0, 10.0, 80.0, 950.0, 45.0, 2.0, 9.0, Some(61), Some(27.0), false),
    ("salad, caesar", None, 190, 4.0, 16.0, 3.0, 10.0, 360.0, 9.0, 2.0, 2.0, None, None, false),
    ("french fries", None, 365, 4.0, 17.0, 3.0, 0.0, 246.0, 48.0, 4.0, 0.3, Some(75), Some(36.0), true),
    ("chipotle bowl", Some("Chipotle"), 650, 32.0, 22.0, 7.0, 95.0, 1350.0, 71.0, 11.0, 4.0, Some(55), Some(39.0), false),
    ("big mac", Some("McDonald's"), 563, 26.0, 33.0, 11.0, 79.0, 1010.0, 45.0, 3.0, 9.0, Some(61), Some(27.0), false),
];

struct StoreEntry {
    name: String,
    record: NutrientRecord,
    per_100g: bool,
}

/// In-memory starter table of common generic and branded foods with per-serving
/// values (or per-100g where the row says so).
pub struct EmbeddedStore {
    entries: Vec<StoreEntry>,
}

impl EmbeddedStore {
    pub fn new() -> Self {
        let entries = STARTER_FOODS
            .iter()
            .map(
                |&(
                    name,
                    _brand,
                    calories,
                    protein,
                    fat,
                    sat_fat,
                    cholesterol,
                    sodium,
                    carbs,
                    fiber,
                    sugars,
                    gi,
                    gl,
                    per_100g,
                )| StoreEntry {
                    name: name.to_string(),
                    record: NutrientRecord {
                        calories,
                        protein_g: Some(protein),
                        total_fat_g: Some(fat),
                        saturated_fat_g: Some(sat_fat),
                        cholesterol_mg: Some(cholesterol),
                        sodium_mg: Some(sodium),
                        total_carbs_g: Some(carbs),
                        dietary_fiber_g: Some(fiber),
                        sugars_g: Some(sugars),
                        glycemic_index: gi,
                        glycemic_load: gl,
                        source: NutrientSource::Local,
                    },
                    per_100g,
                },
            )
            .collect();

        Self { entries }
    }

    fn find(&self, name: &str) -> Option<&StoreEntry> {
        let needle = normalize(name);
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.name == needle)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.name.contains(&needle) || needle.contains(&e.name))
            })
    }
}

impl Default for EmbeddedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NutrientStore for EmbeddedStore {
    async fn lookup(&self, name: &str, quantity: f64, unit: &str) -> Option<NutrientRecord> {
        let entry = self.find(name)?;
        let factor = if entry.per_100g && is_gram_unit(unit) {
            quantity / 100.0
        } else {
            quantity
        };
        Some(entry.record.scaled(factor))
    }
}

pub(crate) fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn is_gram_unit(unit: &str) -> bool {
    matches!(unit.trim().to_lowercase().as_str(), "g" | "gram" | "grams")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exact_match_scales_by_quantity() {
        let store = EmbeddedStore::new();
        let record = store.lookup("taco", 2.0, "item").await.unwrap();
        assert_eq!(record.calories, 420);
        assert_eq!(record.protein_g, Some(18.0));
        // glycemic index does not scale with portion
        assert_eq!(record.glycemic_index, Some(52));
    }

    #[tokio::test]
    async fn per_100g_rows_scale_by_grams() {
        let store = EmbeddedStore::new();
        let record = store.lookup("rice, white", 200.0, "g").await.unwrap();
        assert_eq!(record.calories, 260);
    }

    #[tokio::test]
    async fn substring_match_finds_branded_item() {
        let store = EmbeddedStore::new();
        let record = store.lookup("Big Mac burger", 1.0, "item").await;
        assert!(record.is_some());
    }

    #[tokio::test]
    async fn unknown_food_misses() {
        let store = EmbeddedStore::new();
        assert!(store.lookup("durian smoothie", 1.0, "item").await.is_none());
        assert!(store.lookup("   ", 1.0, "item").await.is_none());
    }
}
