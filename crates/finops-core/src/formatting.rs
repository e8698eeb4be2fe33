/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// Rounding follows the standard library formatter, i.e. the exact binary
/// value is rounded, so `1.005` (stored as `1.00499…`) becomes `"1.00"`.
///
/// # Examples
///
/// ```
/// use finops_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut result = String::with_capacity(formatted.len() + formatted.len() / 3 + 1);
    if value < 0.0 {
        result.push('-');
    }
    result.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        result.push('.');
        result.push_str(frac);
    }
    result
}

/// Format a monetary amount as a USD string with two decimal places and
/// thousands separators.
///
/// # Examples
///
/// ```
/// use finops_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56), "$1,234.56");
/// assert_eq!(format_currency(0.0), "$0.00");
/// assert_eq!(format_currency(-9.99), "$-9.99");
/// ```
pub fn format_currency(amount: f64) -> String {
    format!("${}", format_number(amount, 2))
}

/// Format a percentage with exactly one decimal place and a `%` suffix.
///
/// No thousands grouping is applied.
///
/// ```
/// use finops_core::formatting::format_percent;
///
/// assert_eq!(format_percent(15.000000000000002), "15.0%");
/// assert_eq!(format_percent(0.0), "0.0%");
/// ```
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Calculate `(part / whole) * 100`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// ```
/// use finops_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(10.0, 0.0), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    (part / whole) * 100.0
}

/// Relative change from `previous` to `current`, in percent.
///
/// `None` when `previous` is zero, since no finite change exists.
pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return s.to_string();
    }
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = s.len() % 3;
    for (i, c) in s.chars().enumerate() {
        if i != 0 && i % 3 == remainder {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_no_thousands() {
        assert_eq!(format_number(123.456, 2), "123.46");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
    }

    #[test]
    fn test_format_number_millions() {
        assert_eq!(format_number(1_234_567.891, 2), "1,234,567.89");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_carry_into_thousands() {
        assert_eq!(format_number(999.999, 2), "1,000.00");
    }

    #[test]
    fn test_format_number_binary_midpoint() {
        // 1.005 is stored just below the midpoint.
        assert_eq!(format_number(1.005, 2), "1.00");
    }

    // ── format_currency ──────────────────────────────────────────────────────

    #[test]
    fn test_format_currency_positive() {
        assert_eq!(format_currency(200.5), "$200.50");
    }

    #[test]
    fn test_format_currency_negative_credit() {
        assert_eq!(format_currency(-1_250.0), "$-1,250.00");
    }

    #[test]
    fn test_format_currency_large() {
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
    }

    // ── format_percent / percentage ──────────────────────────────────────────

    #[test]
    fn test_format_percent_one_decimal() {
        assert_eq!(format_percent(33.333), "33.3%");
        assert_eq!(format_percent(1900.0), "1900.0%");
    }

    #[test]
    fn test_percentage_zero_whole() {
        assert_eq!(percentage(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_percentage_share() {
        let p = percentage(120.5, 200.5);
        assert_eq!(format_percent(p), "60.1%");
    }

    // ── percent_change ───────────────────────────────────────────────────────

    #[test]
    fn test_percent_change_increase() {
        let change = percent_change(100.0, 115.0).unwrap();
        assert!((change - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_change_decrease() {
        let change = percent_change(200.0, 150.0).unwrap();
        assert!((change + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_change_from_zero_is_undefined() {
        assert_eq!(percent_change(0.0, 50.0), None);
    }
}
