//! Display formatting of cell values according to their number format.
//!
//! Renders a cached cell value the way a spreadsheet application would show
//! it, for the subset of number formats that appear in reporting workbooks:
//! millions abbreviation, percentages, fixed decimals and thousands grouping.

use crate::types::plain_number;
use crate::{Cell, CellValue};

const MILLION: f64 = 1_000_000.0;

/// Text substituted for a cell with no value, keeping visual spacing in markup.
pub const ABSENT_VALUE: &str = " ";

/// Formatter for cell values and their number format codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFormatter;

impl ValueFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format a cell, treating a missing cell as an absent value.
    pub fn format_cell(&self, cell: Option<&Cell>) -> String {
        match cell {
            Some(cell) => self.format(Some(&cell.value), &cell.number_format),
            None => self.format(None, "General"),
        }
    }

    /// Format a value with the given number format code.
    ///
    /// Rules, first match wins:
    /// - absent value renders as a single space
    /// - numbers of magnitude >= 1,000,000 render as millions with one decimal (`2.5M`)
    /// - percentage formats multiply by 100 and keep the format's decimal count
    /// - `General` renders the plain number
    /// - formats with `.0…` render with that many decimals
    /// - `#,##0…` renders a thousands-grouped integer
    /// - `0` renders the truncated integer
    ///
    /// Anything else falls through to plain string conversion.
    pub fn format(&self, value: Option<&CellValue>, number_format: &str) -> String {
        let Some(value) = value else {
            return ABSENT_VALUE.to_string();
        };

        if let Some(n) = value.as_number() {
            if n.abs() >= MILLION {
                return format!("{:.1}M", n / MILLION);
            }

            if is_percentage(number_format) {
                let decimals = decimal_places(number_format).unwrap_or(0);
                return format!("{:.*}%", decimals, n * 100.0);
            }

            if number_format == "General" {
                return plain_number(n);
            }

            if has_fixed_decimals(number_format) {
                let decimals = decimal_places(number_format).unwrap_or(0);
                return format!("{:.*}", decimals, n);
            }

            if number_format.starts_with("#,##0") {
                return group_thousands(n);
            }

            if number_format == "0" {
                return format!("{}", n.trunc() as i64);
            }
        }

        value.to_string()
    }
}

fn is_percentage(number_format: &str) -> bool {
    number_format.contains("0%") || number_format.to_lowercase().contains("percent")
}

fn has_fixed_decimals(number_format: &str) -> bool {
    number_format.contains(".0")
}

/// Count of `0` digits after the decimal point in the first format section.
fn decimal_places(number_format: &str) -> Option<usize> {
    let section = number_format.split(';').next().unwrap_or(number_format);
    let (_, fraction) = section.split_once('.')?;
    Some(fraction.chars().filter(|&c| c == '0').count())
}

/// Round to an integer and insert `,` every three digits.
fn group_thousands(n: f64) -> String {
    let rounded = format!("{:.0}", n);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 + 1);
    out.push_str(sign);
    for (i, ch) in digits.chars().enumerate() {
        out.push(ch);
        let remaining = len - i - 1;
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: f64, format: &str) -> String {
        ValueFormatter::new().format(Some(&CellValue::Number(value)), format)
    }

    #[test]
    fn test_absent_value_is_single_space() {
        let formatter = ValueFormatter::new();
        assert_eq!(formatter.format(None, "General"), " ");
        assert_eq!(formatter.format(None, "0.0%"), " ");
        assert_eq!(formatter.format_cell(None), " ");
    }

    #[test]
    fn test_millions_take_priority() {
        assert_eq!(fmt(1_500_000.0, "General"), "1.5M");
        assert_eq!(fmt(2_500_000.0, "0.0%"), "2.5M");
        assert_eq!(fmt(1_000_000.0, "#,##0"), "1.0M");
        assert_eq!(fmt(-3_400_000.0, "0"), "-3.4M");
    }

    #[test]
    fn test_percentage_formats() {
        assert_eq!(fmt(0.256, "0.0%"), "25.6%");
        assert_eq!(fmt(0.5, "0%"), "50%");
        assert_eq!(fmt(0.1234, "0.00%"), "12.34%");
        assert_eq!(fmt(0.1, "Percent"), "10%");
    }

    #[test]
    fn test_percentage_decimals_use_first_section() {
        assert_eq!(fmt(0.256, "0.0%;[Red]-0.0%"), "25.6%");
    }

    #[test]
    fn test_general_format() {
        assert_eq!(fmt(42.0, "General"), "42");
        assert_eq!(fmt(3.75, "General"), "3.75");
        assert_eq!(fmt(-7.0, "General"), "-7");
    }

    #[test]
    fn test_fixed_decimals() {
        assert_eq!(fmt(3.14159, "0.00"), "3.14");
        assert_eq!(fmt(2.0, "0.000"), "2.000");
        assert_eq!(fmt(1234.5, "#,##0.0"), "1234.5");
    }

    #[test]
    fn test_thousands_grouping() {
        assert_eq!(fmt(1234.0, "#,##0"), "1,234");
        assert_eq!(fmt(999.0, "#,##0"), "999");
        assert_eq!(fmt(123456.7, "#,##0"), "123,457");
        assert_eq!(fmt(-98765.0, "#,##0"), "-98,765");
    }

    #[test]
    fn test_integer_format_truncates() {
        assert_eq!(fmt(7.9, "0"), "7");
        assert_eq!(fmt(-7.9, "0"), "-7");
    }

    #[test]
    fn test_unknown_format_falls_back_to_plain() {
        assert_eq!(fmt(12.5, "mm/dd/yyyy"), "12.5");
        assert_eq!(fmt(12.0, "@"), "12");
    }

    #[test]
    fn test_non_numeric_values() {
        let formatter = ValueFormatter::new();
        let text = CellValue::Text("Revenue".to_string());
        assert_eq!(formatter.format(Some(&text), "0.0%"), "Revenue");
        assert_eq!(formatter.format(Some(&CellValue::Bool(false)), "General"), "FALSE");
        assert_eq!(
            formatter.format(Some(&CellValue::Error("#N/A".to_string())), "0"),
            "#N/A"
        );
    }
}
