//! Push Payload Validation
//!
//! Strict decoding for messages arriving on the push socket. The wire format
//! is a flat JSON object mapping asset ids to decimal-string prices:
//!
//! ```json
//! {"bitcoin": "50815.21", "ethereum": "2954.80"}
//! ```
//!
//! A payload is accepted only if it is a JSON object, every key names an
//! asset the registry already knows, and every value is a string parsing to
//! a strictly positive decimal. Anything else comes back as a typed
//! [`PayloadError`]; the caller decides whether that is fatal for the
//! session. Nothing in here panics on malformed input.

use rust_decimal::Decimal;

use crate::domain::registry::AssetRegistry;

/// Reasons a push payload fails validation.
///
/// `Decimal` cannot represent NaN or infinity, so numeric well-formedness
/// reduces to "parses and is strictly positive".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The payload was not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(String),

    /// The payload decoded to something other than an object.
    #[error("payload is not a price mapping")]
    NotAMapping,

    /// A key did not correspond to any known asset id.
    #[error("unknown asset id in payload: {0}")]
    UnknownId(String),

    /// A value was missing, non-positive, or not a decimal string.
    #[error("invalid price for {id}: {value}")]
    InvalidPrice {
        /// Asset id the bad value was keyed under.
        id: String,
        /// The offending value, rendered as JSON.
        value: String,
    },
}

/// Decode and validate one push payload against the known asset set.
///
/// Returns the (id, price) pairs ready for
/// [`AssetRegistry::apply_push`](crate::domain::registry::AssetRegistry::apply_push).
///
/// # Errors
///
/// Returns a [`PayloadError`] describing the first violation found.
pub fn parse_price_map(
    text: &str,
    registry: &AssetRegistry,
) -> Result<Vec<(String, Decimal)>, PayloadError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| PayloadError::Json(e.to_string()))?;

    let map = value.as_object().ok_or(PayloadError::NotAMapping)?;

    let mut updates = Vec::with_capacity(map.len());
    for (id, raw) in map {
        if !registry.contains_id(id) {
            return Err(PayloadError::UnknownId(id.clone()));
        }

        let price = raw
            .as_str()
            .and_then(|s| s.parse::<Decimal>().ok())
            .filter(|p| p.is_sign_positive() && !p.is_zero())
            .ok_or_else(|| PayloadError::InvalidPrice {
                id: id.clone(),
                value: raw.to_string(),
            })?;

        updates.push((id.clone(), price));
    }

    Ok(updates)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use crate::domain::registry::{AssetRecord, AssetSnapshot};

    use super::*;

    fn registry_with_bitcoin() -> AssetRegistry {
        let registry = AssetRegistry::new();
        registry.merge_snapshot(&AssetSnapshot {
            assets: vec![AssetRecord {
                id: "bitcoin".to_string(),
                symbol: "BTC".to_string(),
                price_usd: Decimal::from_str("50000").unwrap(),
            }],
            server_time: Utc::now(),
        });
        registry
    }

    #[test]
    fn accepts_known_id_with_positive_decimal_string() {
        let registry = registry_with_bitcoin();

        let updates = parse_price_map(r#"{"bitcoin": "51000"}"#, &registry).unwrap();

        assert_eq!(
            updates,
            vec![("bitcoin".to_string(), Decimal::from_str("51000").unwrap())]
        );
    }

    #[test]
    fn rejects_unknown_id() {
        let registry = registry_with_bitcoin();

        let err = parse_price_map(r#"{"unknown-id": "10"}"#, &registry).unwrap_err();

        assert_eq!(err, PayloadError::UnknownId("unknown-id".to_string()));
    }

    #[test]
    fn rejects_non_json() {
        let registry = registry_with_bitcoin();
        assert!(matches!(
            parse_price_map("not json", &registry),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn rejects_non_object_shapes() {
        let registry = registry_with_bitcoin();
        assert_eq!(
            parse_price_map(r#"["bitcoin"]"#, &registry),
            Err(PayloadError::NotAMapping)
        );
        assert_eq!(
            parse_price_map("42", &registry),
            Err(PayloadError::NotAMapping)
        );
    }

    #[test]
    fn rejects_bare_number_value() {
        let registry = registry_with_bitcoin();

        let err = parse_price_map(r#"{"bitcoin": 51000}"#, &registry).unwrap_err();

        assert_eq!(
            err,
            PayloadError::InvalidPrice {
                id: "bitcoin".to_string(),
                value: "51000".to_string(),
            }
        );
    }

    #[test]
    fn rejects_zero_and_negative_prices() {
        let registry = registry_with_bitcoin();

        assert!(matches!(
            parse_price_map(r#"{"bitcoin": "0"}"#, &registry),
            Err(PayloadError::InvalidPrice { .. })
        ));
        assert!(matches!(
            parse_price_map(r#"{"bitcoin": "-1.5"}"#, &registry),
            Err(PayloadError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn rejects_unparseable_price_string() {
        let registry = registry_with_bitcoin();

        assert!(matches!(
            parse_price_map(r#"{"bitcoin": "fifty"}"#, &registry),
            Err(PayloadError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn empty_object_is_valid_and_yields_nothing() {
        let registry = registry_with_bitcoin();
        assert_eq!(parse_price_map("{}", &registry).unwrap(), vec![]);
    }
}
