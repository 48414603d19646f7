/*
[INPUT]:  Order parameters, prices, quantities, currency codes
[OUTPUT]: Validation results and rounded trading figures
[POS]:    Data layer - pre-trade helpers
[UPDATE]: When adding trading calculations or changing rounding rules
*/

use std::str::FromStr;

use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{OrderType, Side};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Order fields checked before submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParams {
    pub symbol: String,
    pub side: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    pub order_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

pub fn validate_order(params: &OrderParams) -> OrderValidation {
    let mut errors = Vec::new();

    if params.symbol.trim().is_empty() {
        errors.push("Symbol is required".to_string());
    }
    if Side::from_str(&params.side).is_err() {
        errors.push("Side must be \"buy\" or \"sell\"".to_string());
    }
    if params.quantity <= Decimal::ZERO {
        errors.push("Quantity must be greater than 0".to_string());
    }
    if params.order_type == OrderType::Limit.as_str()
        && params.price.is_none_or(|price| price <= Decimal::ZERO)
    {
        errors.push("Price is required for limit orders and must be greater than 0".to_string());
    }

    OrderValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Round half toward positive infinity; `None` on overflow
fn round_half_up(value: Decimal, dp: u32) -> Option<Decimal> {
    let scale = Decimal::from(10_u64.checked_pow(dp)?);
    let shifted = value.checked_mul(scale)?.checked_add(Decimal::new(5, 1))?;
    shifted.floor().checked_div(scale)
}

/// `None` when the product does not fit in a `Decimal`
pub fn calculate_order_value(quantity: Decimal, price: Decimal) -> Option<Decimal> {
    round_half_up(quantity.checked_mul(price)?, 2)
}

/// `value * rate`, clamped to `[min, max]`
pub fn calculate_commission(
    order_value: Decimal,
    rate: Decimal,
    min: Decimal,
    max: Option<Decimal>,
) -> Option<Decimal> {
    let commission = order_value.checked_mul(rate)?.max(min);
    Some(match max {
        Some(max) => commission.min(max),
        None => commission,
    })
}

fn currency_prefix(currency: &str) -> String {
    match currency {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{other}\u{a0}"),
    }
}

/// en-US currency formatting, e.g. `$1,234.56`
pub fn format_currency(amount: Decimal, currency: &str, decimals: u32) -> String {
    let rounded = amount
        .abs()
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.*}", decimals as usize, rounded);
    let (integer, fraction) = match fixed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{}{grouped}.{fraction}", currency_prefix(currency)),
        None => format!("{sign}{}{grouped}", currency_prefix(currency)),
    }
}

/// Quantity in lots, rounded to 2 decimals
pub fn scale_quantity(value: Decimal, lot_size: Decimal) -> Option<Decimal> {
    round_half_up(value.checked_mul(lot_size)?, 2)
}

/// `None` for unparsable input or a quantity too large to scale
pub fn parse_quantity(input: &str, lot_size: Decimal) -> Option<Decimal> {
    let value = Decimal::from_str(input.trim()).ok()?;
    scale_quantity(value, lot_size)
}

pub fn calculate_pnl(
    entry: Decimal,
    current: Decimal,
    quantity: Decimal,
    side: Side,
) -> Option<Decimal> {
    let move_per_unit = match side {
        Side::Buy => current.checked_sub(entry)?,
        Side::Sell => entry.checked_sub(current)?,
    };
    round_half_up(move_per_unit.checked_mul(quantity)?, 2)
}

/// Percent change rounded to 2 decimals; zero when `old` is zero
pub fn percentage_change(old: Decimal, new: Decimal) -> Option<Decimal> {
    if old.is_zero() {
        return Some(Decimal::ZERO);
    }
    let ratio = new.checked_sub(old)?.checked_div(old)?;
    round_half_up(ratio.checked_mul(Decimal::ONE_HUNDRED)?, 2)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ID_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// `PREFIX-<base36 millis>-<6 random chars>`, uppercased
pub fn generate_client_order_id(prefix: &str) -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let mut rng = rand::thread_rng();
    let random: String = (0..6)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}-{}-{random}", to_base36(millis)).to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

/// `AAA/BBB` with uppercase ASCII letters
pub fn validate_currency_pair(pair: &str) -> bool {
    let bytes = pair.as_bytes();
    bytes.len() == 7
        && bytes[3] == b'/'
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[4..].iter().all(u8::is_ascii_uppercase)
}

pub fn parse_currency_pair(pair: &str) -> Option<CurrencyPair> {
    if !validate_currency_pair(pair) {
        return None;
    }
    let (base, quote) = pair.split_once('/')?;
    Some(CurrencyPair {
        base: base.to_string(),
        quote: quote.to_string(),
    })
}

pub fn calculate_pip_value(
    lot_size: Decimal,
    pip_size: Decimal,
    conversion_rate: Decimal,
) -> Option<Decimal> {
    let value = lot_size.checked_mul(pip_size)?.checked_mul(conversion_rate)?;
    round_half_up(value, 2)
}

/// Nearest multiple of `tick`; unchanged for a non-positive tick
pub fn round_to_tick_size(price: Decimal, tick: Decimal) -> Option<Decimal> {
    if tick <= Decimal::ZERO {
        return Some(price);
    }
    round_half_up(price.checked_div(tick)?, 0)?.checked_mul(tick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn order(symbol: &str, side: &str, quantity: Decimal, price: Option<Decimal>, kind: &str) -> OrderParams {
        OrderParams {
            symbol: symbol.into(),
            side: side.into(),
            quantity,
            price,
            order_type: kind.into(),
        }
    }

    #[test]
    fn test_valid_orders_pass() {
        assert!(validate_order(&order("BTC/USD", "buy", dec!(1), Some(dec!(45000)), "limit")).valid);
        assert!(validate_order(&order("ETH/USD", "sell", dec!(10), None, "market")).valid);
    }

    #[test]
    fn test_invalid_order_collects_every_error() {
        let result = validate_order(&order(" ", "hold", dec!(0), None, "limit"));
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                "Symbol is required",
                "Side must be \"buy\" or \"sell\"",
                "Quantity must be greater than 0",
                "Price is required for limit orders and must be greater than 0",
            ]
        );
    }

    #[rstest]
    #[case(dec!(10), dec!(100), dec!(1000))]
    #[case(dec!(1.5), dec!(45000), dec!(67500))]
    #[case(dec!(0.001), dec!(50000), dec!(50))]
    #[case(dec!(1), dec!(99.999), dec!(100))]
    #[case(dec!(3), dec!(33.333), dec!(100))]
    fn test_order_value(#[case] qty: Decimal, #[case] price: Decimal, #[case] expected: Decimal) {
        assert_eq!(calculate_order_value(qty, price), Some(expected));
    }

    #[rstest]
    #[case(dec!(1000000000000000), dec!(1000000000000000))]
    #[case(Decimal::MAX, dec!(2))]
    #[case(dec!(1000000000000000000000000000), Decimal::ONE)]
    fn test_order_value_overflow_is_none(#[case] qty: Decimal, #[case] price: Decimal) {
        assert_eq!(calculate_order_value(qty, price), None);
    }

    #[test]
    fn test_commission_clamps() {
        assert_eq!(
            calculate_commission(dec!(10000), dec!(0.001), Decimal::ZERO, None),
            Some(dec!(10))
        );
        assert_eq!(calculate_commission(dec!(100), dec!(0.001), dec!(5), None), Some(dec!(5)));
        assert_eq!(
            calculate_commission(dec!(1000000), dec!(0.01), Decimal::ZERO, Some(dec!(100))),
            Some(dec!(100))
        );
        assert_eq!(calculate_commission(Decimal::MAX, dec!(10), Decimal::ZERO, None), None);
    }

    #[rstest]
    #[case(dec!(1234.56), "USD", 2, "$1,234.56")]
    #[case(dec!(1000000), "USD", 2, "$1,000,000.00")]
    #[case(dec!(1234.56), "EUR", 2, "€1,234.56")]
    #[case(dec!(1234.56), "GBP", 2, "£1,234.56")]
    #[case(dec!(1234.5678), "USD", 4, "$1,234.5678")]
    #[case(dec!(-42.5), "USD", 2, "-$42.50")]
    #[case(dec!(999.995), "USD", 2, "$1,000.00")]
    fn test_format_currency(
        #[case] amount: Decimal,
        #[case] currency: &str,
        #[case] decimals: u32,
        #[case] expected: &str,
    ) {
        assert_eq!(format_currency(amount, currency, decimals), expected);
    }

    #[test]
    fn test_parse_quantity_with_lots() {
        assert_eq!(parse_quantity("10", Decimal::ONE), Some(dec!(10)));
        assert_eq!(parse_quantity(" 1.5 ", Decimal::ONE), Some(dec!(1.5)));
        assert_eq!(parse_quantity("2.5", dec!(100)), Some(dec!(250)));
        assert_eq!(parse_quantity("abc", Decimal::ONE), None);
    }

    #[rstest]
    #[case("79228162514264337593543950335", dec!(100))]
    #[case("1000000000000000000000000000", Decimal::ONE)]
    #[case("1e30", Decimal::ONE)]
    fn test_parse_quantity_too_large_is_none(#[case] input: &str, #[case] lot_size: Decimal) {
        assert_eq!(parse_quantity(input, lot_size), None);
    }

    #[rstest]
    #[case(dec!(100), dec!(110), Side::Buy, dec!(100))]
    #[case(dec!(100), dec!(90), Side::Buy, dec!(-100))]
    #[case(dec!(100), dec!(90), Side::Sell, dec!(100))]
    #[case(dec!(100), dec!(110), Side::Sell, dec!(-100))]
    fn test_pnl(#[case] entry: Decimal, #[case] current: Decimal, #[case] side: Side, #[case] expected: Decimal) {
        assert_eq!(calculate_pnl(entry, current, dec!(10), side), Some(expected));
    }

    #[test]
    fn test_pnl_overflow_is_none() {
        assert_eq!(calculate_pnl(Decimal::MIN, Decimal::MAX, Decimal::ONE, Side::Buy), None);
        assert_eq!(calculate_pnl(Decimal::ZERO, Decimal::MAX, dec!(2), Side::Sell), None);
    }

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(dec!(100), dec!(110)), Some(dec!(10)));
        assert_eq!(percentage_change(dec!(50), dec!(75)), Some(dec!(50)));
        assert_eq!(percentage_change(dec!(100), dec!(50)), Some(dec!(-50)));
        assert_eq!(percentage_change(Decimal::ZERO, dec!(100)), Some(Decimal::ZERO));
        assert_eq!(percentage_change(dec!(0.0000001), Decimal::MAX), None);
    }

    #[test]
    fn test_client_order_id_shape() {
        let first = generate_client_order_id("test");
        let second = generate_client_order_id("test");
        assert_ne!(first, second);
        assert!(first.starts_with("TEST-"));
        assert_eq!(first, first.to_uppercase());
        assert_eq!(first.rsplit('-').next().map(str::len), Some(6));
    }

    #[test]
    fn test_currency_pairs() {
        assert!(validate_currency_pair("EUR/USD"));
        for bad in ["EURUSD", "EUR-USD", "EU/USD", "EUR/US", "eur/usd"] {
            assert!(!validate_currency_pair(bad), "{bad}");
        }
        assert_eq!(
            parse_currency_pair("GBP/JPY"),
            Some(CurrencyPair { base: "GBP".into(), quote: "JPY".into() })
        );
        assert_eq!(parse_currency_pair("invalid"), None);
    }

    #[test]
    fn test_pip_value() {
        assert_eq!(
            calculate_pip_value(dec!(100000), dec!(0.0001), Decimal::ONE),
            Some(dec!(10))
        );
        assert_eq!(
            calculate_pip_value(dec!(100000), dec!(0.0001), dec!(0.85)),
            Some(dec!(8.5))
        );
        assert_eq!(calculate_pip_value(Decimal::MAX, dec!(10), Decimal::ONE), None);
    }

    #[rstest]
    #[case(dec!(100.123), dec!(0.01), dec!(100.12))]
    #[case(dec!(100.126), dec!(0.01), dec!(100.13))]
    #[case(dec!(100.5), dec!(0.25), dec!(100.5))]
    #[case(dec!(100.6), dec!(0.25), dec!(100.5))]
    #[case(dec!(100.7), dec!(0.25), dec!(100.75))]
    fn test_round_to_tick(#[case] price: Decimal, #[case] tick: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_to_tick_size(price, tick), Some(expected));
    }

    #[test]
    fn test_round_to_tick_edges() {
        assert_eq!(round_to_tick_size(dec!(100.3), Decimal::ZERO), Some(dec!(100.3)));
        assert_eq!(round_to_tick_size(dec!(100.3), dec!(-1)), Some(dec!(100.3)));
        assert_eq!(round_to_tick_size(Decimal::MAX, dec!(0.01)), None);
    }
}
