use serde::{Deserialize, Serialize};

/// A decoded sensor snapshot: soil moisture, temperature and humidity at one
/// point in time.
///
/// Constructed fresh by the codec for every successfully parsed message and
/// immutable afterwards; a newer reading supersedes it in the store, it is
/// never mutated in place. All fields default to 0 so the bridge can answer
/// queries before the first message arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    /// Soil moisture as reported by the sensor (unitless raw value)
    pub soil: f64,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl Reading {
    pub fn new(soil: f64, temperature: f64, humidity: f64) -> Self {
        Self {
            soil,
            temperature,
            humidity,
        }
    }
}
