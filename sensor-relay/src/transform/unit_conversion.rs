use super::{
    NumberPolicy, Payload, PayloadTransform, TEMPERATURE, TransformError, celsius_to_fahrenheit,
    read_number,
};

/// Keeps only the temperature, in Celsius and Fahrenheit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitConversion {
    policy: NumberPolicy,
}

impl UnitConversion {
    pub const OUTPUT: &'static [&'static str] = &["temperature_c", "temperature_f"];

    pub fn new(policy: NumberPolicy) -> Self {
        Self { policy }
    }
}

impl PayloadTransform for UnitConversion {
    fn name(&self) -> &'static str {
        "unit-conversion"
    }

    fn output_fields(&self) -> &'static [&'static str] {
        Self::OUTPUT
    }

    fn derive(&self, data: &Payload) -> Result<Vec<(&'static str, f64)>, TransformError> {
        let temperature = read_number(data, TEMPERATURE, self.policy)?;

        Ok(vec![
            ("temperature_c", temperature),
            ("temperature_f", celsius_to_fahrenheit(temperature)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SensorMessage;

    fn message(data: serde_json::Value) -> SensorMessage {
        serde_json::from_value(json!({"timestamp": 1519609945872_i64, "data": data})).unwrap()
    }

    #[test]
    fn converts_sample_payload() {
        let input = message(json!({"range": 511, "degrees": 222.0, "temperature": 19.0, "humidity": 47.0}));
        let output = UnitConversion::default().apply(&input).unwrap();

        assert_eq!(output.timestamp, 1519609945872);
        assert_eq!(
            serde_json::Value::Object(output.data),
            json!({"temperature_c": "19.0", "temperature_f": "66.2"})
        );
    }

    #[test]
    fn input_is_left_untouched() {
        let input = message(json!({"temperature": 21.5, "range": 3}));
        let before = input.clone();
        UnitConversion::default().apply(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn lenient_policy_accepts_published_strings() {
        let input = message(json!({"temperature": "19.0", "humidity": "47.0"}));

        assert!(matches!(
            UnitConversion::default().apply(&input),
            Err(TransformError::NotNumeric { field: "temperature", .. })
        ));

        let output = UnitConversion::new(NumberPolicy::AcceptNumericStrings)
            .apply(&input)
            .unwrap();
        assert_eq!(output.data["temperature_f"], json!("66.2"));
    }
}
