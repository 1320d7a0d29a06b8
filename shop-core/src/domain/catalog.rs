use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Audit, Translation};
use crate::common::validation;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub position: i64,
    pub translations: Vec<Translation>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    #[serde(default)]
    pub position: i64,
    #[validate(custom(function = "validation::translations"))]
    pub translations: Vec<Translation>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub position: Option<i64>,
    #[validate(custom(function = "validation::translations"))]
    pub translations: Option<Vec<Translation>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: i64,
    pub category_id: i64,
    pub position: i64,
    pub translations: Vec<Translation>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSubcategory {
    pub category_id: i64,
    #[serde(default)]
    pub position: i64,
    #[validate(custom(function = "validation::translations"))]
    pub translations: Vec<Translation>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryUpdate {
    pub category_id: Option<i64>,
    pub position: Option<i64>,
    #[validate(custom(function = "validation::translations"))]
    pub translations: Option<Vec<Translation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryFilter {
    pub category_id: Option<i64>,
}

/// Average review score of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub average: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub subcategory_id: Option<i64>,
    pub article: String,
    pub barcode: Option<String>,
    pub price: Decimal,
    /// Price after the currently active discount, if any.
    pub effective_price: Decimal,
    /// Units in stock.
    pub quantity: i64,
    /// Stock value at purchase prices.
    pub sum: Decimal,
    pub sale_quantity: i64,
    pub is_active: bool,
    pub translations: Vec<Translation>,
    pub media_ids: Vec<i64>,
    pub rating: Rating,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub subcategory_id: Option<i64>,
    #[validate(length(min = 1, max = 64))]
    pub article: String,
    #[validate(length(min = 1, max = 64))]
    pub barcode: Option<String>,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[validate(custom(function = "validation::translations"))]
    pub translations: Vec<Translation>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    /// `Some(None)` detaches the product from its subcategory.
    #[serde(default, with = "double_option")]
    pub subcategory_id: Option<Option<i64>>,
    #[validate(length(min = 1, max = 64))]
    pub article: Option<String>,
    #[serde(default, with = "double_option")]
    pub barcode: Option<Option<String>>,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
    #[validate(custom(function = "validation::translations"))]
    pub translations: Option<Vec<Translation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub search: Option<String>,
    pub lang: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

/// Distinguishes an absent field from an explicit `null` in PATCH bodies.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
