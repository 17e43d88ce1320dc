//! BMI extraction and calculation.
//!
//! Both a weight with a kilogram unit and a height with a metre unit must be
//! present. Missing or unusable data yields a prompt asking for it; values
//! are never guessed.

use regex::Regex;

use super::ToolError;

const WEIGHT_PATTERN: &str = r"(?i)(\d+(?:\.\d+)?)\s*(?:kg|kilograms?)\b";
const HEIGHT_PATTERN: &str = r"(?i)(\d+(?:\.\d+)?)\s*(?:m|meters?|metres?)\b";

/// Reply used when weight or height is missing.
pub const MISSING_DATA_PROMPT: &str = "I'd be happy to calculate your BMI! Could you please provide your weight in kg and height in meters? For example: 'My weight is 70kg and my height is 1.75m'";

/// Compiled weight and height patterns.
#[derive(Debug, Clone)]
pub struct BmiExtractor {
    weight: Regex,
    height: Regex,
}

impl BmiExtractor {
    /// Compile the measurement patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            weight: Regex::new(WEIGHT_PATTERN)?,
            height: Regex::new(HEIGHT_PATTERN)?,
        })
    }

    /// Extract `(weight_kg, height_m)` from a message.
    ///
    /// Returns `Ok(None)` when either measurement is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMeasurement`] if a captured number does not parse.
    pub fn extract(&self, message: &str) -> Result<Option<(f64, f64)>, ToolError> {
        let (Some(weight), Some(height)) = (
            capture_number(&self.weight, message),
            capture_number(&self.height, message),
        ) else {
            return Ok(None);
        };
        Ok(Some((parse_measurement(weight)?, parse_measurement(height)?)))
    }

    /// Full tool reply for a message.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if a measurement does not parse or the result is not finite.
    pub fn answer(&self, message: &str) -> Result<String, ToolError> {
        let Some((weight, height)) = self.extract(message)? else {
            return Ok(MISSING_DATA_PROMPT.to_owned());
        };
        if height <= 0.0 {
            return Ok(MISSING_DATA_PROMPT.to_owned());
        }

        let bmi = calculate_bmi(weight, height)?;
        Ok(format!(
            "I've calculated your BMI as {bmi:.2}. 📊\n\nA BMI under 18.5 is considered underweight, 18.5-24.9 is healthy, 25-29.9 is overweight, and 30+ is obese. Remember that BMI is just one health indicator and doesn't account for factors like muscle mass. How are you feeling about this result?"
        ))
    }
}

/// `weight / height²`, rounded to two decimals.
///
/// # Errors
///
/// Returns [`ToolError::NonFinite`] when the result is NaN or infinite.
pub fn calculate_bmi(weight_kg: f64, height_m: f64) -> Result<f64, ToolError> {
    let bmi = weight_kg / (height_m * height_m);
    if !bmi.is_finite() {
        return Err(ToolError::NonFinite("calculateBMI"));
    }
    Ok((bmi * 100.0).round() / 100.0)
}

fn capture_number<'a>(pattern: &Regex, message: &'a str) -> Option<&'a str> {
    pattern
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn parse_measurement(raw: &str) -> Result<f64, ToolError> {
    raw.parse::<f64>()
        .map_err(|e| ToolError::InvalidMeasurement {
            value: raw.to_owned(),
            reason: e.to_string(),
        })
}
