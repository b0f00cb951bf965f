//! Data transfer objects exchanged over HTTP and WebSocket.

pub mod health;
pub mod lobby;
pub mod validation;
pub mod ws;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::dao::models::EpochMillis;

/// Render an epoch-milliseconds timestamp as RFC 3339 for API responses.
pub fn format_epoch_millis(millis: EpochMillis) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_millis_as_rfc3339() {
        assert_eq!(format_epoch_millis(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_epoch_millis(1_700_000_000_000), "2023-11-14T22:13:20Z");
    }
}
