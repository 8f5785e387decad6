//! Number formatting shared by the label, the tooltips and the demo host.

use crate::host::{FormatterOptions, PrimitiveValue, ValueFormatter, ValueFormatterFactory};

/// Formats a number the way the host's script runtime prints it: integral
/// values without a fraction, non-finite values spelled out.
pub fn js_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let spelled = if value > 0.0 { "Infinity" } else { "-Infinity" };
        spelled.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.abs() >= 1e21 || value.abs() < 1e-6 {
        // 1e21 -> "1e+21", 1.5e-7 -> "1.5e-7"
        let exp = format!("{value:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    } else {
        format!("{value}")
    }
}

/// Rounds to two decimal places from the exact decimal value of `value`,
/// with exact halves going away from zero. Magnitudes of 1e21 and above
/// and non-finite values pass through unchanged.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e21 {
        return value;
    }
    let magnitude = value.abs();
    // a hundredths tie is an odd number of eighths, which is exact below 2^50
    let eighths = magnitude * 8.0;
    let fixed = if eighths.fract() == 0.0 && eighths % 2.0 == 1.0 {
        let hundredths = (eighths as u128 * 25 + 1) / 2;
        format!("{}.{:02}", hundredths / 100, hundredths % 100)
    } else {
        format!("{magnitude:.2}")
    };
    let rounded: f64 = fixed.parse().unwrap_or(f64::NAN);
    rounded.copysign(value)
}

// ============================================================================
// DEFAULT FORMATTER
// ============================================================================

/// Formatter for .NET-style format strings such as `#,0.00`, `$#,0` or `0.0%`.
///
/// Only the first section of a multi-section pattern is used. An explicit
/// precision overrides the decimals the pattern asks for.
#[derive(Debug, Clone, Default)]
pub struct DefaultValueFormatter {
    prefix: String,
    suffix: String,
    grouping: bool,
    percent: bool,
    decimals: Option<usize>,
}

impl DefaultValueFormatter {
    pub fn new(options: &FormatterOptions) -> Self {
        let mut formatter = match options.format.as_deref() {
            Some(pattern) if !pattern.is_empty() => Self::parse(pattern),
            _ => Self::default(),
        };
        if options.precision.is_some() {
            formatter.decimals = options.precision;
        }
        formatter
    }

    fn parse(pattern: &str) -> Self {
        let section = pattern.split(';').next().unwrap_or_default();
        let mut prefix = String::new();
        let mut core = String::new();
        let mut suffix = String::new();
        let mut chars = section.chars();

        while let Some(c) = chars.next() {
            let c = if c == '\\' {
                match chars.next() {
                    Some(escaped) => {
                        if core.is_empty() {
                            prefix.push(escaped);
                        } else {
                            suffix.push(escaped);
                        }
                        continue;
                    }
                    None => break,
                }
            } else {
                c
            };
            let numeric = matches!(c, '#' | '0' | ',' | '.');
            if numeric && suffix.is_empty() {
                core.push(c);
            } else if core.is_empty() {
                prefix.push(c);
            } else {
                suffix.push(c);
            }
        }

        let (integral, fraction) = match core.split_once('.') {
            Some((integral, fraction)) => (integral, Some(fraction)),
            None => (core.as_str(), None),
        };
        let decimals = match fraction {
            Some(fraction) => Some(fraction.chars().filter(|c| *c == '0').count()),
            None if core.is_empty() => None,
            None => Some(0),
        };

        Self {
            percent: prefix.contains('%') || suffix.contains('%'),
            grouping: integral.contains(','),
            prefix,
            suffix,
            decimals,
        }
    }

    fn format_number(&self, value: f64) -> String {
        if !value.is_finite() {
            return js_number(value);
        }
        let scaled = if self.percent { value * 100.0 } else { value };
        let body = match self.decimals {
            Some(decimals) => format!("{:.*}", decimals, scaled.abs()),
            None => js_number(scaled.abs()),
        };
        let body = if self.grouping {
            group_thousands(&body)
        } else {
            body
        };
        // "-0.00" reads as noise
        let negative = scaled < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0');
        let sign = if negative { "-" } else { "" };
        format!("{sign}{}{body}{}", self.prefix, self.suffix)
    }
}

impl ValueFormatter for DefaultValueFormatter {
    fn format(&self, value: &PrimitiveValue) -> String {
        match value {
            PrimitiveValue::Number(n) => self.format_number(*n),
            PrimitiveValue::Text(s) => s.clone(),
            PrimitiveValue::Bool(true) => "True".to_string(),
            PrimitiveValue::Bool(false) => "False".to_string(),
            PrimitiveValue::Null => "(Blank)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatterFactory;

impl ValueFormatterFactory for DefaultFormatterFactory {
    fn create(&self, options: FormatterOptions) -> Box<dyn ValueFormatter> {
        Box::new(DefaultValueFormatter::new(&options))
    }
}

fn group_thousands(digits: &str) -> String {
    let (integral, rest) = match digits.find('.') {
        Some(idx) => digits.split_at(idx),
        None => (digits, ""),
    };
    let mut grouped = String::with_capacity(digits.len() + integral.len() / 3);
    for (i, c) in integral.chars().enumerate() {
        if i > 0 && (integral.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: Option<&str>, precision: Option<usize>, value: f64) -> String {
        let options = FormatterOptions {
            format: format.map(str::to_string),
            precision,
        };
        DefaultValueFormatter::new(&options).format(&PrimitiveValue::Number(value))
    }

    #[test]
    fn test_js_number() {
        assert_eq!(js_number(50.0), "50");
        assert_eq!(js_number(33.33), "33.33");
        assert_eq!(js_number(-0.0), "0");
        assert_eq!(js_number(f64::NAN), "NaN");
        assert_eq!(js_number(f64::INFINITY), "Infinity");
        assert_eq!(js_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_js_number_switches_to_exponent() {
        assert_eq!(js_number(1e20), "100000000000000000000");
        assert_eq!(js_number(1e21), "1e+21");
        assert_eq!(js_number(1e307), "1e+307");
        assert_eq!(js_number(-2.5e22), "-2.5e+22");
        assert_eq!(js_number(0.000001), "0.000001");
        assert_eq!(js_number(1e-7), "1e-7");
        assert_eq!(js_number(-1.5e-7), "-1.5e-7");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(150.0), 150.0);
        assert!(round2(f64::NAN).is_nan());
        assert_eq!(round2(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_round2_uses_exact_decimal_value() {
        // 0.925 and 0.075 are stored just below the half
        assert_eq!(round2(0.037 * 100.0 / 4.0), 0.92);
        assert_eq!(round2(0.003 * 100.0 / 4.0), 0.07);
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(-1.005), -1.0);
    }

    #[test]
    fn test_round2_exact_halves_go_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(2.625), 2.63);
        assert_eq!(round2(1024.875), 1024.88);
        assert_eq!(round2(-0.125), -0.13);
    }

    #[test]
    fn test_round2_leaves_huge_values_alone() {
        assert_eq!(round2(1e307), 1e307);
        assert_eq!(round2(1e21), 1e21);
        assert_eq!(round2(-3.5e25), -3.5e25);
        assert_eq!(round2(123456789012345.67), 123456789012345.67);
    }

    #[test]
    fn test_precision_without_format() {
        assert_eq!(fmt(None, Some(2), 50.0), "50.00");
        assert_eq!(fmt(None, None, 12.5), "12.5");
    }

    #[test]
    fn test_grouping_and_currency() {
        assert_eq!(fmt(Some("#,0"), None, 1234567.0), "1,234,567");
        assert_eq!(fmt(Some("\\$#,0.00;(\\$#,0.00)"), None, 1234.5), "$1,234.50");
        assert_eq!(fmt(Some("$#,0.00"), Some(2), -999.999), "-$1,000.00");
    }

    #[test]
    fn test_percent_scaling() {
        assert_eq!(fmt(Some("0.0%"), None, 0.256), "25.6%");
        assert_eq!(fmt(Some("0%"), Some(2), 0.5), "50.00%");
    }

    #[test]
    fn test_precision_overrides_pattern() {
        assert_eq!(fmt(Some("0"), Some(2), 80.0), "80.00");
        assert_eq!(fmt(Some("0.0000"), Some(2), 1.23456), "1.23");
    }

    #[test]
    fn test_negative_zero_has_no_sign() {
        assert_eq!(fmt(Some("0.00"), None, -0.001), "0.00");
    }

    #[test]
    fn test_non_numeric_values() {
        let formatter = DefaultFormatterFactory.create(FormatterOptions::default());
        assert_eq!(formatter.format(&PrimitiveValue::Text("abc".into())), "abc");
        assert_eq!(formatter.format(&PrimitiveValue::Null), "(Blank)");
        assert_eq!(formatter.format(&PrimitiveValue::Bool(true)), "True");
        assert_eq!(formatter.format(&PrimitiveValue::Number(f64::NAN)), "NaN");
    }
}
