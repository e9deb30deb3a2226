use serde_json::Value;

use super::{Payload, TransformError};

/// Which JSON values count as numbers when a required field is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberPolicy {
    /// Only JSON numbers.
    #[default]
    Strict,
    /// JSON numbers, plus strings such as `"19.0"` that parse to a finite float.
    AcceptNumericStrings,
}

pub fn read_number(
    data: &Payload,
    field: &'static str,
    policy: NumberPolicy,
) -> Result<f64, TransformError> {
    match data.get(field) {
        None => Err(TransformError::MissingField(field)),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| TransformError::InvalidNumber {
            field,
            value: n.to_string(),
        }),
        Some(Value::String(s)) if policy == NumberPolicy::AcceptNumericStrings => {
            match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(f),
                _ => Err(TransformError::InvalidNumber {
                    field,
                    value: s.clone(),
                }),
            }
        }
        Some(other) => Err(TransformError::NotNumeric {
            field,
            found: json_type(other),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Formats `value` with exactly one digit after the decimal point.
///
/// Values that sit exactly halfway between two tenths round away from zero,
/// negative zero prints as `0.0` and non-finite values print as `NaN`,
/// `Infinity` or `-Infinity`. Everything else is the correctly rounded decimal
/// of the exact binary value, so `0.35` (stored just below the midpoint)
/// becomes `0.3`.
pub fn to_fixed(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let s = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return s.to_string();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }

    // A midpoint between tenths is an odd multiple of 0.25.
    let quarters = value.abs() * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 == 1.0 {
        let whole = value.abs().trunc();
        let digit = if value.abs() - whole == 0.25 { 3 } else { 8 };
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}{whole:.0}.{digit}");
    }

    format!("{value:.1}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn formats_one_decimal() {
        assert_eq!(to_fixed(19.0), "19.0");
        assert_eq!(to_fixed(19.0 * 9.0 / 5.0 + 32.0), "66.2");
        assert_eq!(to_fixed(-5.0), "-5.0");
        assert_eq!(to_fixed(47.12), "47.1");
        assert_eq!(to_fixed(0.35), "0.3");
        assert_eq!(to_fixed(1234.56), "1234.6");
    }

    #[test]
    fn midpoints_round_away_from_zero() {
        assert_eq!(to_fixed(0.25), "0.3");
        assert_eq!(to_fixed(-0.25), "-0.3");
        assert_eq!(to_fixed(1.75), "1.8");
        assert_eq!(to_fixed(1125899906842624.25), "1125899906842624.3");
        assert_eq!(to_fixed(-1125899906842624.25), "-1125899906842624.3");
        assert_eq!(to_fixed(1125899906842623.75), "1125899906842623.8");
        assert_eq!(to_fixed(-12.25), "-12.3");
        assert_eq!(to_fixed(2.5), "2.5");
    }

    #[test]
    fn zero_and_non_finite() {
        assert_eq!(to_fixed(0.0), "0.0");
        assert_eq!(to_fixed(-0.0), "0.0");
        assert_eq!(to_fixed(-0.04), "-0.0");
        assert_eq!(to_fixed(f64::NAN), "NaN");
        assert_eq!(to_fixed(f64::INFINITY), "Infinity");
        assert_eq!(to_fixed(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn reads_numbers_and_integers() {
        let data = payload(json!({"temperature": 19.5, "range": 511}));
        assert_eq!(
            read_number(&data, "temperature", NumberPolicy::Strict).unwrap(),
            19.5
        );
        assert_eq!(read_number(&data, "range", NumberPolicy::Strict).unwrap(), 511.0);
    }

    #[test]
    fn missing_field_is_named() {
        let data = payload(json!({"humidity": 47.0}));
        let err = read_number(&data, "temperature", NumberPolicy::Strict).unwrap_err();
        assert!(matches!(err, TransformError::MissingField("temperature")));
    }

    #[test]
    fn strict_policy_rejects_strings_and_null() {
        let data = payload(json!({"temperature": "19.0", "humidity": null}));
        let err = read_number(&data, "temperature", NumberPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            TransformError::NotNumeric {
                field: "temperature",
                found: "a string"
            }
        ));
        let err = read_number(&data, "humidity", NumberPolicy::Strict).unwrap_err();
        assert!(matches!(err, TransformError::NotNumeric { found: "null", .. }));
    }

    #[test]
    fn lenient_policy_parses_numeric_strings() {
        let data = payload(json!({"temperature": " 19.0", "humidity": "wet", "range": "inf"}));
        let policy = NumberPolicy::AcceptNumericStrings;
        assert_eq!(read_number(&data, "temperature", policy).unwrap(), 19.0);
        assert!(matches!(
            read_number(&data, "humidity", policy),
            Err(TransformError::InvalidNumber { field: "humidity", .. })
        ));
        assert!(matches!(
            read_number(&data, "range", policy),
            Err(TransformError::InvalidNumber { .. })
        ));
    }
}
