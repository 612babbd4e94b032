//! Wire timestamp format.
//!
//! Every timestamp crossing the HTTP or WebSocket boundary is UTC with
//! millisecond precision and a literal `Z`, e.g. `2024-01-15T10:30:00.123Z`.
//! [`parse`] accepts exactly that shape and nothing else.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::AppError;

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a timestamp for the wire.
pub fn format(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a wire timestamp.
pub fn parse(raw: &str) -> Result<DateTime<Utc>, AppError> {
    NaiveDateTime::parse_from_str(raw, WIRE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::validation(format!("Invalid timestamp '{raw}': {e}")))
}

/// `#[serde(with = "sparkup_core::types::timestamp")]` support.
pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(ts))
}

/// `#[serde(with = "sparkup_core::types::timestamp")]` support.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|e| serde::de::Error::custom(e.message))
}

/// Same as the parent module, for `Option<DateTime<Utc>>` fields.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional wire timestamp.
    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_some(&super::format(ts)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional wire timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse(&raw).map_err(|e| serde::de::Error::custom(e.message)))
            .transpose()
    }
}
