//! Local wall-clock timestamps in the `YYYY-MM-DD HH:MM:SS` layout used
//! by every persisted document.

use chrono::{Local, NaiveDateTime, SubsecRound as _};

/// Layout of persisted timestamps.
pub(crate) const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alternative layout accepted on read (ISO 8601 with `T` separator).
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Current local time, truncated to whole seconds so that it survives a
/// persistence round-trip unchanged.
#[must_use]
pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Parses a persisted timestamp.
pub(crate) fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, FORMAT)
        .or_else(|_legacy| NaiveDateTime::parse_from_str(raw, ISO_FORMAT))
}

/// Serde adapter for a required timestamp.
pub(crate) mod local {
    use chrono::NaiveDateTime;
    use serde::{Deserialize as _, Deserializer, Serializer};

    /// Writes the timestamp as text.
    pub(crate) fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(super::FORMAT))
    }

    /// Reads a timestamp from text.
    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for an optional timestamp. Empty strings read as unset.
pub(crate) mod local_option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize as _, Deserializer, Serializer};

    /// Writes the timestamp as text, or null when unset.
    #[allow(
        clippy::ref_option,
        reason = "serde `with` adapters receive the field by reference"
    )]
    pub(crate) fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match *value {
            Some(ts) => serializer.serialize_some(&ts.format(super::FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Reads an optional timestamp.
    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => super::parse(text)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
