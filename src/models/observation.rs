use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One price reading taken from a product page. Observations are appended
/// to history and never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PriceObservation {
    pub product_name: String,
    pub old_price: i64,
    pub new_price: i64,
    pub installment_price: i64,
    pub timestamp: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(
        product_name: String,
        old_price: i64,
        new_price: i64,
        installment_price: i64,
    ) -> Self {
        Self {
            product_name,
            old_price,
            new_price,
            installment_price,
            timestamp: Utc::now(),
        }
    }
}

/// A recorded extremum: the price the notification policy compares against,
/// together with the moment it was observed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PricePoint {
    pub price: i64,
    pub timestamp: DateTime<Utc>,
}
