//! Decimal-comma number parsing.
//!
//! The dataset publishes every number as a string using a comma as the
//! decimal separator (`"1,479"`, `"40,416775"`).

/// Parse a decimal-comma string into a float.
///
/// Empty, non-numeric and non-finite inputs parse to `0.0`, which callers
/// treat as "not sold" for prices.
///
/// # Examples
///
/// ```
/// use fuel_finder::domain::parse_decimal_comma;
///
/// assert_eq!(parse_decimal_comma("1,479"), 1.479);
/// assert_eq!(parse_decimal_comma(""), 0.0);
/// assert_eq!(parse_decimal_comma("n/a"), 0.0);
/// ```
pub fn parse_decimal_comma(s: &str) -> f64 {
    parse_decimal_comma_opt(s).unwrap_or(0.0)
}

/// Like [`parse_decimal_comma`] but distinguishes "unparseable" from zero.
///
/// Used for coordinates, where `0,0` is a real place.
pub fn parse_decimal_comma_opt(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prices() {
        assert_eq!(parse_decimal_comma("1,479"), 1.479);
        assert_eq!(parse_decimal_comma("1,523"), 1.523);
        assert_eq!(parse_decimal_comma("0,000"), 0.0);
        assert_eq!(parse_decimal_comma(" 1,5 "), 1.5);
    }

    #[test]
    fn accepts_period_separator() {
        assert_eq!(parse_decimal_comma("1.479"), 1.479);
    }

    #[test]
    fn garbage_is_zero() {
        assert_eq!(parse_decimal_comma(""), 0.0);
        assert_eq!(parse_decimal_comma("abc"), 0.0);
        assert_eq!(parse_decimal_comma("1,2,3"), 0.0);
        assert_eq!(parse_decimal_comma("inf"), 0.0);
    }

    #[test]
    fn coordinates_keep_sign_and_distinguish_missing() {
        assert_eq!(parse_decimal_comma_opt("-3,703790"), Some(-3.70379));
        assert_eq!(parse_decimal_comma_opt("0,0"), Some(0.0));
        assert_eq!(parse_decimal_comma_opt(""), None);
    }
}
