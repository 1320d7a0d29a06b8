use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::{Audit, Product};
use crate::common::error::ShopError;
use crate::common::validation;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Effective product price when the line was last touched.
    pub price: Decimal,
    pub sum: Decimal,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basket {
    pub user_id: i64,
    pub items: Vec<BasketItem>,
    pub total: Decimal,
}

impl Basket {
    pub fn new(user_id: i64, items: Vec<BasketItem>) -> Self {
        let total = items.iter().map(|i| i.sum).sum();
        Self { user_id, items, total }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBasketItem {
    pub product_id: i64,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BasketItemUpdate {
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteList {
    pub user_id: i64,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (New, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Delivered)
                | (New, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ShopError::BadRequest(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    pub id: i64,
    pub product_id: Option<i64>,
    pub quantity: i64,
    pub price: Decimal,
    pub sum: Decimal,
    #[serde(skip_serializing, default)]
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub status: OrderStatus,
    pub phone: String,
    pub address: String,
    pub comment: Option<String>,
    pub total: Decimal,
    pub products: Vec<OrderProduct>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i64,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[validate(custom(function = "validation::phone"))]
    pub phone: String,
    #[validate(length(min = 1, max = 1000))]
    pub address: String,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
    /// When empty the order is built from the user's basket.
    #[serde(default)]
    #[validate(nested)]
    pub products: Vec<OrderLine>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
}
