use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::controller::{FieldDescriptor, FieldValue, Record, Schema};

use super::Product;

/// Most product rows one meal can hold.
pub const MAX_MEAL_PRODUCTS: usize = 8;

/// Accepted portion weight in grams, inclusive.
pub const PORTION_GRAMS: std::ops::RangeInclusive<i64> = 1..=5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealType {
    pub name: String,
}

/// One product eaten as part of a meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    pub product_name: String,
    pub quantity_grams: i64,
}

/// Nutrient totals, in kcal and grams.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MealNutrition {
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
}

impl MealNutrition {
    /// Sum the entries against per-100g values from the product catalogue.
    /// Products missing from the catalogue contribute nothing.
    pub fn of_entries(entries: &[MealEntry], catalogue: &HashMap<&str, &Product>) -> Self {
        entries.iter().fold(Self::default(), |mut acc, entry| {
            if let Some(p) = catalogue.get(entry.product_name.as_str()) {
                #[allow(clippy::cast_precision_loss)]
                let factor = entry.quantity_grams as f64 / 100.0;
                let part = |v: Option<f64>| v.unwrap_or(0.0) * factor;
                acc.calories += part(p.calories_per_100g);
                acc.proteins += part(p.proteins_per_100g);
                acc.fats += part(p.fats_per_100g);
                acc.carbs += part(p.carbs_per_100g);
            }
            acc
        })
    }

    fn add(&mut self, other: Self) {
        self.calories += other.calories;
        self.proteins += other.proteins;
        self.fats += other.fats;
        self.carbs += other.carbs;
    }

    fn subtract(&mut self, other: Self) {
        self.calories = (self.calories - other.calories).max(0.0);
        self.proteins = (self.proteins - other.proteins).max(0.0);
        self.fats = (self.fats - other.fats).max(0.0);
        self.carbs = (self.carbs - other.carbs).max(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: i64,
    pub meal_type: String,
    #[serde(default)]
    pub meal_entries: Vec<MealEntry>,
    /// Filled in from the product catalogue after loading.
    #[serde(skip)]
    pub nutrition: MealNutrition,
}

impl Record for Meal {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

impl Meal {
    pub fn schema() -> Schema<Self> {
        Schema::new([
            FieldDescriptor::numeric("id", "ID", |m: &Self| {
                #[allow(clippy::cast_precision_loss)]
                let id = m.id as f64;
                FieldValue::Number(id)
            }),
            FieldDescriptor::text("mealType", "Type", |m: &Self| FieldValue::text(&m.meal_type))
                .searchable(),
            FieldDescriptor::text("products", "Products", |m: &Self| {
                FieldValue::text(m.products_label())
            })
            .searchable(),
            FieldDescriptor::numeric("grams", "Grams", |m: &Self| {
                #[allow(clippy::cast_precision_loss)]
                let grams = m.total_grams() as f64;
                FieldValue::Number(grams)
            }),
            FieldDescriptor::numeric("calories", "Kcal", |m: &Self| {
                FieldValue::Number(m.nutrition.calories)
            }),
            FieldDescriptor::numeric("proteins", "Proteins", |m: &Self| {
                FieldValue::Number(m.nutrition.proteins)
            }),
            FieldDescriptor::numeric("fats", "Fats", |m: &Self| {
                FieldValue::Number(m.nutrition.fats)
            }),
            FieldDescriptor::numeric("carbs", "Carbs", |m: &Self| {
                FieldValue::Number(m.nutrition.carbs)
            }),
        ])
    }

    pub fn products_label(&self) -> String {
        self.meal_entries
            .iter()
            .map(|e| e.product_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn total_grams(&self) -> i64 {
        self.meal_entries.iter().map(|e| e.quantity_grams).sum()
    }
}

/// Annotate every meal with its nutrient totals.
pub fn annotate_meals(meals: &mut [Meal], products: &[Product]) {
    let catalogue: HashMap<&str, &Product> =
        products.iter().map(|p| (p.name.as_str(), p)).collect();
    for meal in meals {
        meal.nutrition = MealNutrition::of_entries(&meal.meal_entries, &catalogue);
    }
}

/// Day totals shown above the meal table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MealStats {
    pub meals: usize,
    pub totals: MealNutrition,
}

impl MealStats {
    pub fn compute<'a>(meals: impl IntoIterator<Item = &'a Meal>) -> Self {
        meals.into_iter().fold(Self::default(), |mut acc, m| {
            acc.meals += 1;
            acc.totals.add(m.nutrition);
            acc
        })
    }

    /// Adjust after one meal was deleted locally.
    pub fn record_removal(&mut self, removed: &Meal) {
        self.meals = self.meals.saturating_sub(1);
        self.totals.subtract(removed.nutrition);
    }
}

/// Body of `POST /api/meals/create` and `PUT /api/meals/update/{id}`.
///
/// `product_names` and `quantities` are parallel lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub meal_type_name: String,
    pub product_names: Vec<String>,
    pub quantities: Vec<i64>,
}

/// Why a meal draft cannot be saved. Rows are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MealFormError {
    #[error("fill in both product and weight on row {}", .0 + 1)]
    IncompleteRow(usize),
    #[error("row {}: weight must be {}-{} g", .0 + 1, PORTION_GRAMS.start(), PORTION_GRAMS.end())]
    BadWeight(usize),
    #[error("add at least one product")]
    NoProducts,
    #[error("choose a meal type")]
    NoMealType,
}

impl MealFormError {
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::IncompleteRow(row) | Self::BadWeight(row) => Some(*row),
            Self::NoProducts | Self::NoMealType => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MealRowDraft {
    pub product: String,
    pub grams: String,
}

impl MealRowDraft {
    fn is_blank(&self) -> bool {
        self.product.trim().is_empty() && self.grams.trim().is_empty()
    }
}

/// Buffers behind the meal form. `id` is `None` for a new meal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealDraft {
    pub id: Option<i64>,
    pub meal_type: String,
    pub rows: Vec<MealRowDraft>,
}

impl Default for MealDraft {
    fn default() -> Self {
        Self {
            id: None,
            meal_type: String::new(),
            rows: vec![MealRowDraft::default()],
        }
    }
}

impl MealDraft {
    pub fn from_meal(meal: &Meal) -> Self {
        let mut rows: Vec<MealRowDraft> = meal
            .meal_entries
            .iter()
            .take(MAX_MEAL_PRODUCTS)
            .map(|e| MealRowDraft {
                product: e.product_name.clone(),
                grams: e.quantity_grams.to_string(),
            })
            .collect();
        if rows.is_empty() {
            rows.push(MealRowDraft::default());
        }
        Self {
            id: Some(meal.id),
            meal_type: meal.meal_type.clone(),
            rows,
        }
    }

    /// Append an empty row. False once the row limit is reached.
    pub fn add_row(&mut self) -> bool {
        if self.rows.len() >= MAX_MEAL_PRODUCTS {
            return false;
        }
        self.rows.push(MealRowDraft::default());
        true
    }

    /// Drop a row. The last remaining row is kept.
    pub fn remove_row(&mut self, index: usize) -> bool {
        if self.rows.len() <= 1 || index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    /// Check the draft and build the request body. Repeated products are
    /// merged by summing their weights.
    pub fn validate(&self) -> Result<MealRequest, MealFormError> {
        let mut portions: IndexMap<String, i64> = IndexMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            let product = row.product.trim();
            let grams = row.grams.trim();
            if product.is_empty() || grams.is_empty() {
                return Err(MealFormError::IncompleteRow(i));
            }
            let grams = grams
                .parse::<i64>()
                .ok()
                .filter(|g| PORTION_GRAMS.contains(g))
                .ok_or(MealFormError::BadWeight(i))?;
            *portions.entry(product.to_owned()).or_default() += grams;
        }
        if portions.is_empty() {
            return Err(MealFormError::NoProducts);
        }
        let meal_type_name = self.meal_type.trim().to_owned();
        if meal_type_name.is_empty() {
            return Err(MealFormError::NoMealType);
        }
        let (product_names, quantities) = portions.into_iter().unzip();
        Ok(MealRequest {
            id: self.id,
            meal_type_name,
            product_names,
            quantities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakfast() -> Meal {
        serde_json::from_str(
            r#"{"id":3,"mealType":"Breakfast","mealEntries":[
                {"productName":"Oats","quantityGrams":60},
                {"productName":"Milk","quantityGrams":200}]}"#,
        )
        .expect("valid json")
    }

    fn product(name: &str, kcal: f64, proteins: f64) -> Product {
        Product {
            id: 1,
            name: name.to_owned(),
            calories_per_100g: Some(kcal),
            proteins_per_100g: Some(proteins),
            fats_per_100g: None,
            carbs_per_100g: Some(10.0),
            created_by: None,
            created_at: None,
        }
    }

    fn row(product: &str, grams: &str) -> MealRowDraft {
        MealRowDraft {
            product: product.to_owned(),
            grams: grams.to_owned(),
        }
    }

    #[test]
    fn nutrition_scales_per_100g_and_skips_unknown_products() {
        let mut meals = vec![breakfast()];
        meals[0].meal_entries.push(MealEntry {
            product_name: "Mystery".to_owned(),
            quantity_grams: 500,
        });
        annotate_meals(&mut meals, &[product("Oats", 400.0, 10.0), product("Milk", 50.0, 3.0)]);
        let n = meals[0].nutrition;
        assert!((n.calories - 340.0).abs() < 1e-9);
        assert!((n.proteins - 12.0).abs() < 1e-9);
        assert_eq!(n.fats, 0.0);
        assert!((n.carbs - 26.0).abs() < 1e-9);
        assert_eq!(meals[0].total_grams(), 760);
        assert_eq!(meals[0].products_label(), "Oats, Milk, Mystery");
    }

    #[test]
    fn stats_track_removals() {
        let mut a = breakfast();
        a.nutrition.calories = 300.0;
        let mut b = breakfast();
        b.id = 4;
        b.nutrition.calories = 200.0;
        let mut stats = MealStats::compute(&[a, b.clone()]);
        assert_eq!(stats.meals, 2);
        assert_eq!(stats.totals.calories, 500.0);
        stats.record_removal(&b);
        assert_eq!(stats.meals, 1);
        assert_eq!(stats.totals.calories, 300.0);
    }

    #[test]
    fn duplicate_products_are_merged() {
        let draft = MealDraft {
            id: None,
            meal_type: "Lunch".to_owned(),
            rows: vec![row("Rice", "150"), row("", ""), row("Chicken", "120"), row("Rice", "50")],
        };
        let req = draft.validate().expect("valid draft");
        assert_eq!(req.product_names, ["Rice", "Chicken"]);
        assert_eq!(req.quantities, [200, 120]);
        let body = serde_json::to_value(&req).expect("serializable");
        assert!(body.get("id").is_none());
        assert_eq!(body["mealTypeName"], "Lunch");
    }

    #[test]
    fn validation_order_matches_the_form() {
        let mut draft = MealDraft::default();
        assert_eq!(draft.validate(), Err(MealFormError::NoProducts));

        draft.rows = vec![row("Rice", "100"), row("Chicken", "")];
        assert_eq!(draft.validate(), Err(MealFormError::IncompleteRow(1)));

        draft.rows[1].grams = "5001".to_owned();
        assert_eq!(draft.validate(), Err(MealFormError::BadWeight(1)));
        draft.rows[1].grams = "0".to_owned();
        assert_eq!(draft.validate(), Err(MealFormError::BadWeight(1)));

        draft.rows[1].grams = "5000".to_owned();
        assert_eq!(draft.validate(), Err(MealFormError::NoMealType));
        assert_eq!(MealFormError::BadWeight(1).to_string(), "row 2: weight must be 1-5000 g");
    }

    #[test]
    fn rows_are_capped_and_one_always_stays() {
        let mut draft = MealDraft::from_meal(&breakfast());
        assert_eq!(draft.id, Some(3));
        assert_eq!(draft.rows[1], row("Milk", "200"));
        while draft.add_row() {}
        assert_eq!(draft.rows.len(), MAX_MEAL_PRODUCTS);
        while draft.remove_row(0) {}
        assert_eq!(draft.rows.len(), 1);
    }
}
