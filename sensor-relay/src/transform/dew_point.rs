use super::{
    HUMIDITY, NumberPolicy, Payload, PayloadTransform, TEMPERATURE, TransformError,
    celsius_to_fahrenheit, read_number,
};

/// Linear dew-point estimate: `t - (100 - rh) / 5`.
///
/// This is the rough rule of thumb, not the Magnus formula. Downstream
/// consumers rely on its exact output, so it must not be "corrected".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DewPoint {
    policy: NumberPolicy,
}

impl DewPoint {
    pub const OUTPUT: &'static [&'static str] = &["dewpoint_c", "dewpoint_f"];

    pub fn new(policy: NumberPolicy) -> Self {
        Self { policy }
    }
}

pub fn dew_point_celsius(temperature: f64, humidity: f64) -> f64 {
    temperature - (100.0 - humidity) / 5.0
}

impl PayloadTransform for DewPoint {
    fn name(&self) -> &'static str {
        "dew-point"
    }

    fn output_fields(&self) -> &'static [&'static str] {
        Self::OUTPUT
    }

    fn derive(&self, data: &Payload) -> Result<Vec<(&'static str, f64)>, TransformError> {
        let temperature = read_number(data, TEMPERATURE, self.policy)?;
        let humidity = read_number(data, HUMIDITY, self.policy)?;

        // Fahrenheit comes from the unrounded Celsius value.
        let dewpoint_c = dew_point_celsius(temperature, humidity);
        Ok(vec![
            ("dewpoint_c", dewpoint_c),
            ("dewpoint_f", celsius_to_fahrenheit(dewpoint_c)),
        ])
    }
}
