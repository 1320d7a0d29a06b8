use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::Audit;
use crate::common::validation;

/// Stock-in record. Creating one raises the product's quantity and stock value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrival {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub purchase_price: Decimal,
    pub sum: Decimal,
    pub comment: Option<String>,
    pub arrived_at: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewArrival {
    pub product_id: i64,
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i64,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub purchase_price: Decimal,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
    pub arrived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalUpdate {
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: Option<i64>,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub purchase_price: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
    pub arrived_at: Option<DateTime<Utc>>,
}

/// Stock-out (sale) record. `cost` is the stock value it removed, kept so that
/// deleting the realization restores the product exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Realization {
    pub id: i64,
    pub product_id: i64,
    pub employee_id: Option<i64>,
    pub quantity: i64,
    pub price: Decimal,
    pub sum: Decimal,
    pub cost: Decimal,
    pub realized_at: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRealization {
    pub product_id: i64,
    pub employee_id: Option<i64>,
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i64,
    /// Defaults to the product's effective price.
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub price: Option<Decimal>,
    pub realized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub id: i64,
    pub product_id: i64,
    pub percent: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Discount {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at < self.ends_at
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_discount_window"))]
pub struct NewDiscount {
    pub product_id: i64,
    #[validate(range(min = 1, max = 99))]
    pub percent: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

fn validate_discount_window(input: &NewDiscount) -> Result<(), ValidationError> {
    if input.starts_at < input.ends_at {
        Ok(())
    } else {
        let mut err = ValidationError::new("window");
        err.message = Some("startsAt must be before endsAt".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DiscountUpdate {
    #[validate(range(min = 1, max = 99))]
    pub percent: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Filter shared by arrival, realization and discount listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    pub product_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn discount_window_must_be_ordered() {
        let now = Utc::now();
        let bad = NewDiscount {
            product_id: 1,
            percent: 10,
            starts_at: now,
            ends_at: now - Duration::days(1),
        };
        assert!(bad.validate().is_err());

        let good = NewDiscount {
            ends_at: now + Duration::days(1),
            ..bad
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn discount_percent_bounds() {
        let now = Utc::now();
        let input = NewDiscount {
            product_id: 1,
            percent: 100,
            starts_at: now,
            ends_at: now + Duration::days(1),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn arrival_quantity_and_price_are_bounded() {
        let input = NewArrival {
            product_id: 1,
            quantity: i64::MAX / 2 + 1,
            purchase_price: Decimal::ONE,
            comment: None,
            arrived_at: None,
        };
        assert!(input.validate().is_err());

        let pricey = NewArrival {
            quantity: 10,
            purchase_price: Decimal::MAX,
            ..input.clone()
        };
        assert!(pricey.validate().is_err());

        let fine = NewArrival { quantity: 10, ..input };
        assert!(fine.validate().is_ok());
    }
}
