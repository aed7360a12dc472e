use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PriceObservation, PricePoint};

/// Which price changes are notable: max-seeking notifies on a new highest
/// price, min-seeking on a new lowest (a price-drop alert).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtremumPolicy {
    #[default]
    Max,
    Min,
}

/// Outcome of evaluating one observation against the recorded extremum.
/// Pure data: sending the message and persisting the observation are the
/// caller's steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceDecision {
    pub notable: bool,
    pub message: Option<String>,
    pub price: i64,
    pub timestamp: DateTime<Utc>,
}

impl ExtremumPolicy {
    /// Compares the observed price against the recorded extremum.
    ///
    /// The first-ever observation (no baseline) is always notable. Ties are
    /// not notable: the comparison is strict, so an unchanged price never
    /// repeats a "new extremum" message. When not notable and
    /// `report_unchanged` is set, an informational message stating the
    /// current recorded extremum and its timestamp is produced instead.
    pub fn evaluate(
        &self,
        observation: &PriceObservation,
        baseline: Option<&PricePoint>,
        report_unchanged: bool,
    ) -> PriceDecision {
        let current = observation.new_price;

        let Some(baseline) = baseline else {
            return PriceDecision {
                notable: true,
                message: Some(format!("New price detected: {}", current)),
                price: current,
                timestamp: observation.timestamp,
            };
        };

        let notable = match self {
            ExtremumPolicy::Max => current > baseline.price,
            ExtremumPolicy::Min => current < baseline.price,
        };

        if notable {
            let message = match self {
                ExtremumPolicy::Max => format!("New highest price detected: {}", current),
                ExtremumPolicy::Min => format!("New lowest price detected: {}", current),
            };
            return PriceDecision {
                notable: true,
                message: Some(message),
                price: current,
                timestamp: observation.timestamp,
            };
        }

        let message = report_unchanged.then(|| match self {
            ExtremumPolicy::Max => format!(
                "Highest recorded price is {} at {}",
                baseline.price,
                format_timestamp(baseline.timestamp)
            ),
            ExtremumPolicy::Min => format!(
                "Lowest recorded price is {} at {}",
                baseline.price,
                format_timestamp(baseline.timestamp)
            ),
        });

        PriceDecision {
            notable: false,
            message,
            price: baseline.price,
            timestamp: baseline.timestamp,
        }
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}
