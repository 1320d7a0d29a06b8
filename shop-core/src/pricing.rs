//! Money and stock arithmetic applied when stock moves in or out.

use rust_decimal::Decimal;

use crate::common::error::{Result, ShopError};

/// Price after a percentage discount, rounded to cents.
pub fn discounted_price(price: Decimal, percent: i64) -> Decimal {
    let factor = Decimal::from(100 - percent) / Decimal::from(100);
    (price * factor).round_dp(2)
}

fn overflow() -> ShopError {
    ShopError::BadRequest("amount is too large".to_string())
}

fn add_units(a: i64, b: i64) -> Result<i64> {
    a.checked_add(b).ok_or_else(overflow)
}

fn add_money(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(overflow)
}

/// Line total `price * quantity`. BadRequest if it does not fit a `Decimal`.
pub fn line_sum(price: Decimal, quantity: i64) -> Result<Decimal> {
    price
        .checked_mul(Decimal::from(quantity))
        .map(|sum| sum.round_dp(2))
        .ok_or_else(overflow)
}

/// Sum of line totals.
pub fn total_of(sums: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    sums.into_iter().try_fold(Decimal::ZERO, add_money)
}

/// Product stock counters touched by arrivals, realizations and orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub quantity: i64,
    pub sum: Decimal,
    pub sale_quantity: i64,
}

impl StockLevel {
    pub fn receive(self, quantity: i64, sum: Decimal) -> Result<StockLevel> {
        Ok(StockLevel {
            quantity: add_units(self.quantity, quantity)?,
            sum: add_money(self.sum, sum)?,
            ..self
        })
    }

    /// Reverse of [`receive`](Self::receive). Fails when the received units
    /// have already left the warehouse.
    pub fn unreceive(self, quantity: i64, sum: Decimal) -> Result<StockLevel> {
        if self.quantity < quantity {
            return Err(ShopError::Conflict(format!(
                "only {} units left in stock, cannot revert an arrival of {}",
                self.quantity, quantity
            )));
        }
        Ok(StockLevel {
            quantity: self.quantity - quantity,
            sum: (self.sum - sum).max(Decimal::ZERO),
            ..self
        })
    }

    /// Stock value removed when `quantity` units leave at average cost.
    pub fn cost_of(&self, quantity: i64) -> Decimal {
        if self.quantity <= 0 {
            return Decimal::ZERO;
        }
        if quantity >= self.quantity {
            return self.sum;
        }
        (self.sum / Decimal::from(self.quantity) * Decimal::from(quantity)).round_dp(2)
    }

    /// Units leave the warehouse. Returns the new level and the cost removed.
    pub fn sell(self, quantity: i64) -> Result<(StockLevel, Decimal)> {
        if self.quantity < quantity {
            return Err(ShopError::BadRequest(format!(
                "insufficient stock: requested {}, available {}",
                quantity, self.quantity
            )));
        }
        let cost = self.cost_of(quantity);
        Ok((
            StockLevel {
                quantity: self.quantity - quantity,
                sum: self.sum - cost,
                sale_quantity: add_units(self.sale_quantity, quantity)?,
            },
            cost,
        ))
    }

    /// Reverse of [`sell`](Self::sell).
    pub fn unsell(self, quantity: i64, cost: Decimal) -> Result<StockLevel> {
        Ok(StockLevel {
            quantity: add_units(self.quantity, quantity)?,
            sum: add_money(self.sum, cost)?,
            sale_quantity: (self.sale_quantity - quantity).max(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn discount_rounds_to_cents() {
        assert_eq!(discounted_price(d("19.99"), 15), d("16.99"));
        assert_eq!(discounted_price(d("100"), 1), d("99.00"));
    }

    #[test]
    fn sell_uses_average_cost() {
        let level = StockLevel {
            quantity: 3,
            sum: d("10.00"),
            sale_quantity: 0,
        };
        let (after, cost) = level.sell(1).unwrap();
        assert_eq!(cost, d("3.33"));
        assert_eq!(after.quantity, 2);
        assert_eq!(after.sum, d("6.67"));
        assert_eq!(after.sale_quantity, 1);

        // The last units take the remaining value so nothing is stranded.
        let (empty, cost) = after.sell(2).unwrap();
        assert_eq!(cost, d("6.67"));
        assert_eq!(empty.sum, Decimal::ZERO);
    }

    #[test]
    fn sell_more_than_available_is_rejected() {
        let level = StockLevel {
            quantity: 1,
            sum: d("5"),
            sale_quantity: 0,
        };
        assert!(matches!(level.sell(2), Err(ShopError::BadRequest(_))));
    }

    #[test]
    fn unsell_restores_level() {
        let level = StockLevel {
            quantity: 5,
            sum: d("50"),
            sale_quantity: 0,
        };
        let (after, cost) = level.sell(2).unwrap();
        assert_eq!(after.unsell(2, cost).unwrap(), level);
    }

    #[test]
    fn oversized_amounts_are_bad_requests() {
        let level = StockLevel {
            quantity: i64::MAX / 2 + 1,
            sum: d("1"),
            sale_quantity: 0,
        };
        assert!(matches!(level.receive(i64::MAX / 2 + 1, d("1")), Err(ShopError::BadRequest(_))));
        assert!(matches!(line_sum(Decimal::MAX, 2), Err(ShopError::BadRequest(_))));
        assert!(matches!(total_of([Decimal::MAX, d("1")]), Err(ShopError::BadRequest(_))));
        assert_eq!(line_sum(d("2.50"), 3).unwrap(), d("7.50"));
    }

    #[test]
    fn unreceive_needs_enough_stock() {
        let level = StockLevel {
            quantity: 2,
            sum: d("20"),
            sale_quantity: 3,
        };
        assert!(matches!(level.unreceive(3, d("30")), Err(ShopError::Conflict(_))));
        let after = level.unreceive(2, d("20")).unwrap();
        assert_eq!(after.quantity, 0);
        assert_eq!(after.sum, Decimal::ZERO);
    }
}
