use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A monitored product URL and the channel its notifications go to.
/// The URL is the unique key; registering the same URL twice is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct MonitoredLink {
    pub link: String,
    pub destination: String,
}

impl MonitoredLink {
    pub fn new(link: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            destination: destination.into(),
        }
    }
}
