use log::warn;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a stored TEXT decimal, falling back through f64 before giving up.
///
/// Storage writes normalized decimal strings, but rows imported by older
/// tooling may carry float formatting.
pub fn parse_decimal_tolerant(value_str: &str, field_name: &str) -> Decimal {
    match Decimal::from_str(value_str) {
        Ok(d) => d,
        Err(dec_err) => match value_str.parse::<f64>() {
            Ok(f_val) => match Decimal::from_f64(f_val) {
                Some(d) => d,
                None => {
                    warn!(
                        "Failed to convert {} '{}' (parsed as f64: {}) to Decimal. Falling back to ZERO.",
                        field_name, value_str, f_val
                    );
                    Decimal::ZERO
                }
            },
            Err(f_err) => {
                warn!(
                    "Failed to parse {} '{}': as Decimal (err: {}), and as f64 (err: {}). Falling back to ZERO.",
                    field_name, value_str, dec_err, f_err
                );
                Decimal::ZERO
            }
        },
    }
}

/// Normalized decimal string for TEXT storage.
pub fn decimal_to_storage(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_roundtrip() {
        assert_eq!(parse_decimal_tolerant("2.5000", "x"), dec!(2.5));
        assert_eq!(decimal_to_storage(dec!(2.5000)), "2.5");
    }

    #[test]
    fn test_parse_garbage_falls_back_to_zero() {
        assert_eq!(parse_decimal_tolerant("abc", "x"), Decimal::ZERO);
        assert_eq!(parse_decimal_tolerant("", "x"), Decimal::ZERO);
    }
}
