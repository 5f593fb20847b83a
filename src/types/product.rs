use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::controller::{FieldDescriptor, FieldValue, Record, Schema};

/// Label for products that ship with the backend.
pub const SYSTEM_OWNER: &str = "System";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub calories_per_100g: Option<f64>,
    #[serde(default)]
    pub proteins_per_100g: Option<f64>,
    #[serde(default)]
    pub fats_per_100g: Option<f64>,
    #[serde(default)]
    pub carbs_per_100g: Option<f64>,
    /// Login of the creating user; absent for built-in products.
    #[serde(default, alias = "createdByUser")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Record for Product {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

impl Product {
    pub fn schema() -> Schema<Self> {
        Schema::new([
            FieldDescriptor::numeric("id", "ID", |p: &Self| {
                #[allow(clippy::cast_precision_loss)]
                let id = p.id as f64;
                FieldValue::Number(id)
            }),
            FieldDescriptor::text("name", "Name", |p: &Self| FieldValue::text(&p.name))
                .searchable(),
            FieldDescriptor::numeric("calories", "Kcal", |p: &Self| {
                FieldValue::opt_number(p.calories_per_100g)
            }),
            FieldDescriptor::numeric("proteins", "Proteins", |p: &Self| {
                FieldValue::opt_number(p.proteins_per_100g)
            }),
            FieldDescriptor::numeric("fats", "Fats", |p: &Self| {
                FieldValue::opt_number(p.fats_per_100g)
            }),
            FieldDescriptor::numeric("carbs", "Carbs", |p: &Self| {
                FieldValue::opt_number(p.carbs_per_100g)
            }),
            FieldDescriptor::text("createdBy", "Created by", |p: &Self| {
                FieldValue::text(p.owner_label())
            })
            .searchable(),
            FieldDescriptor::datetime("createdAt", "Created", |p: &Self| {
                FieldValue::opt_text(p.created_at.as_deref())
            }),
        ])
    }

    pub fn owner_label(&self) -> &str {
        self.created_by.as_deref().unwrap_or(SYSTEM_OWNER)
    }

    pub fn is_user_created(&self) -> bool {
        self.created_by.is_some()
    }
}

/// Counters shown above the product table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductStats {
    pub total: usize,
    pub user_created: usize,
}

impl ProductStats {
    pub fn compute<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        products.into_iter().fold(Self::default(), |mut acc, p| {
            acc.total += 1;
            if p.is_user_created() {
                acc.user_created += 1;
            }
            acc
        })
    }

    /// Adjust after one product was deleted locally.
    pub fn record_removal(&mut self, removed: &Product) {
        self.total = self.total.saturating_sub(1);
        if removed.is_user_created() {
            self.user_created = self.user_created.saturating_sub(1);
        }
    }
}

/// Body of `PUT /api/products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub id: i64,
    pub name: String,
    pub calories_per_100g: f64,
    pub proteins_per_100g: f64,
    pub fats_per_100g: f64,
    pub carbs_per_100g: f64,
}

/// Editable fields of the product form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Name,
    Calories,
    Proteins,
    Fats,
    Carbs,
}

impl ProductField {
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::Calories,
        Self::Proteins,
        Self::Fats,
        Self::Carbs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Calories => "Calories / 100g",
            Self::Proteins => "Proteins / 100g",
            Self::Fats => "Fats / 100g",
            Self::Carbs => "Carbs / 100g",
        }
    }

    /// Key the backend uses for this field in validation errors.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Calories => "caloriesPer100g",
            Self::Proteins => "proteinsPer100g",
            Self::Fats => "fatsPer100g",
            Self::Carbs => "carbsPer100g",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) need attention", .0.len())]
pub struct ProductFormError(pub IndexMap<ProductField, String>);

/// Text buffers behind the product edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub id: i64,
    pub values: IndexMap<ProductField, String>,
}

impl ProductDraft {
    pub fn from_product(p: &Product) -> Self {
        let num = |v: Option<f64>| v.map(crate::util::format_number).unwrap_or_default();
        let values = IndexMap::from([
            (ProductField::Name, p.name.clone()),
            (ProductField::Calories, num(p.calories_per_100g)),
            (ProductField::Proteins, num(p.proteins_per_100g)),
            (ProductField::Fats, num(p.fats_per_100g)),
            (ProductField::Carbs, num(p.carbs_per_100g)),
        ]);
        Self { id: p.id, values }
    }

    pub fn value(&self, field: ProductField) -> &str {
        self.values.get(&field).map_or("", String::as_str)
    }

    pub fn value_mut(&mut self, field: ProductField) -> &mut String {
        self.values.entry(field).or_default()
    }

    /// Check every field and build the request body.
    pub fn validate(&self) -> Result<UpdateProductRequest, ProductFormError> {
        let mut errors = IndexMap::new();

        let name = self.value(ProductField::Name).trim().to_owned();
        if name.is_empty() {
            errors.insert(ProductField::Name, "name is required".to_owned());
        }

        let mut number = |field: ProductField| -> f64 {
            match self.value(field).trim().replace(',', ".").parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => v,
                Ok(_) => {
                    errors.insert(field, "must be zero or more".to_owned());
                    0.0
                }
                Err(_) => {
                    errors.insert(field, "must be a number".to_owned());
                    0.0
                }
            }
        };
        let calories_per_100g = number(ProductField::Calories);
        let proteins_per_100g = number(ProductField::Proteins);
        let fats_per_100g = number(ProductField::Fats);
        let carbs_per_100g = number(ProductField::Carbs);

        if !errors.is_empty() {
            return Err(ProductFormError(errors));
        }
        Ok(UpdateProductRequest {
            id: self.id,
            name,
            calories_per_100g,
            proteins_per_100g,
            fats_per_100g,
            carbs_per_100g,
        })
    }
}
