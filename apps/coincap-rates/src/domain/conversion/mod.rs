//! Unit Conversion
//!
//! Scalar rescaling between differently-scaled units of possibly different
//! assets (e.g. wei to satoshi). A unit is its base asset's symbol plus a
//! base-10 exponent relative to one whole asset: 1 wei is `10^-18` ETH,
//! 1 satoshi is `10^-8` BTC.
//!
//! Same-asset conversions are pure rescales. Cross-asset conversions route
//! through the reference currency using the two assets' USD prices, which
//! the caller supplies. All arithmetic is `Decimal`.

use rust_decimal::Decimal;

/// Errors from unit resolution and conversion math.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// No built-in unit with the given name.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// The result (or an intermediate value) overflows `Decimal`, or a
    /// price of zero was supplied for the target asset.
    #[error("conversion is not representable")]
    Unrepresentable,
}

/// A named unit of some asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDef {
    /// Unit name (e.g. `wei`).
    pub name: String,
    /// Symbol of the asset the unit scales (e.g. `ETH`).
    pub asset: String,
    /// Base-10 exponent relative to one whole asset; `-18` for wei.
    pub exponent: i32,
}

impl UnitDef {
    /// Define a custom unit.
    #[must_use]
    pub fn new(name: &str, asset: &str, exponent: i32) -> Self {
        Self {
            name: name.to_string(),
            asset: asset.to_string(),
            exponent,
        }
    }

    /// Resolve a built-in unit by name, case-insensitively.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        let (canonical, asset, exponent) = match name.to_lowercase().as_str() {
            "wei" => ("wei", "ETH", -18),
            "gwei" => ("gwei", "ETH", -9),
            "eth" | "ether" => ("eth", "ETH", 0),
            "satoshi" | "sat" => ("satoshi", "BTC", -8),
            "btc" | "bitcoin" => ("btc", "BTC", 0),
            _ => return None,
        };
        Some(Self::new(canonical, asset, exponent))
    }
}

/// `10^exponent` as a `Decimal`, for exponents within `Decimal`'s range.
fn pow10(exponent: i32) -> Option<Decimal> {
    match exponent {
        0 => Some(Decimal::ONE),
        1..=28 => {
            let mut value = Decimal::ONE;
            for _ in 0..exponent {
                value = value.checked_mul(Decimal::TEN)?;
            }
            Some(value)
        }
        -28..=-1 => Some(Decimal::new(1, exponent.unsigned_abs())),
        _ => None,
    }
}

/// Convert `amount` of `from` into `to`.
///
/// `from_price_usd` and `to_price_usd` are only consulted when the two units
/// belong to different assets; pass anything (e.g. `Decimal::ONE`) for a
/// same-asset rescale.
///
/// # Errors
///
/// [`ConversionError::Unrepresentable`] when an intermediate value overflows
/// `Decimal` or `to_price_usd` is zero.
pub fn convert(
    amount: Decimal,
    from: &UnitDef,
    to: &UnitDef,
    from_price_usd: Decimal,
    to_price_usd: Decimal,
) -> Result<Decimal, ConversionError> {
    let to_whole = pow10(from.exponent).ok_or(ConversionError::Unrepresentable)?;
    let whole_from = amount
        .checked_mul(to_whole)
        .ok_or(ConversionError::Unrepresentable)?;

    let whole_to = if from.asset == to.asset {
        whole_from
    } else {
        let usd = whole_from
            .checked_mul(from_price_usd)
            .ok_or(ConversionError::Unrepresentable)?;
        usd.checked_div(to_price_usd)
            .ok_or(ConversionError::Unrepresentable)?
    };

    let from_whole = pow10(-to.exponent).ok_or(ConversionError::Unrepresentable)?;
    whole_to
        .checked_mul(from_whole)
        .ok_or(ConversionError::Unrepresentable)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn builtin_units_resolve_case_insensitively() {
        assert_eq!(UnitDef::builtin("WEI").unwrap().asset, "ETH");
        assert_eq!(UnitDef::builtin("Satoshi").unwrap().exponent, -8);
        assert_eq!(UnitDef::builtin("ether").unwrap().name, "eth");
        assert!(UnitDef::builtin("parsec").is_none());
    }

    #[test]
    fn same_asset_rescale_is_exact() {
        let wei = UnitDef::builtin("wei").unwrap();
        let eth = UnitDef::builtin("eth").unwrap();

        let one_eth_in_wei = convert(dec("1"), &eth, &wei, Decimal::ONE, Decimal::ONE).unwrap();
        assert_eq!(one_eth_in_wei, dec("1000000000000000000"));

        let back = convert(one_eth_in_wei, &wei, &eth, Decimal::ONE, Decimal::ONE).unwrap();
        assert_eq!(back, dec("1.000000000000000000"));
    }

    #[test]
    fn gwei_to_wei() {
        let gwei = UnitDef::builtin("gwei").unwrap();
        let wei = UnitDef::builtin("wei").unwrap();

        let result = convert(dec("21"), &gwei, &wei, Decimal::ONE, Decimal::ONE).unwrap();
        assert_eq!(result, dec("21000000000"));
    }

    #[test]
    fn cross_asset_conversion_routes_through_usd() {
        let wei = UnitDef::builtin("wei").unwrap();
        let satoshi = UnitDef::builtin("satoshi").unwrap();

        // 1 ETH worth of wei, ETH at $3000, BTC at $50000:
        // $3000 / $50000 = 0.06 BTC = 6,000,000 satoshi.
        let result = convert(
            dec("1000000000000000000"),
            &wei,
            &satoshi,
            dec("3000"),
            dec("50000"),
        )
        .unwrap();
        assert_eq!(result.normalize(), dec("6000000"));
    }

    #[test]
    fn zero_target_price_is_unrepresentable() {
        let eth = UnitDef::builtin("eth").unwrap();
        let btc = UnitDef::builtin("btc").unwrap();

        assert_eq!(
            convert(dec("1"), &eth, &btc, dec("3000"), Decimal::ZERO),
            Err(ConversionError::Unrepresentable)
        );
    }

    #[test]
    fn custom_unit_definitions_work() {
        let lamport = UnitDef::new("lamport", "SOL", -9);
        let sol = UnitDef::new("sol", "SOL", 0);

        let result = convert(dec("2500000000"), &lamport, &sol, Decimal::ONE, Decimal::ONE)
            .unwrap();
        assert_eq!(result, dec("2.500000000"));
    }
}
