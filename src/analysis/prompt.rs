use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Daily targets stated in the instruction; the model echoes them back.
pub const DAILY_CALORIE_TARGET: u32 = 2000;
pub const DAILY_PROTEIN_TARGET_G: u32 = 50;

const SYSTEM_INSTRUCTION: &str = "You are a professional nutritionist AI that analyzes food images. \
Provide detailed nutritional analysis including accurate portion sizes, caloric content, and \
macronutrients. Focus on providing practical health recommendations based on the food's \
nutritional content.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidImage {
    #[error("image is missing")]
    Missing,
    #[error("image is empty")]
    Empty,
    #[error("image data URL has no payload")]
    EmptyPayload,
}

/// Base64 payload of a captured image with the data-URL prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload<'a> {
    pub format: &'a str,
    pub base64: &'a str,
}

impl ImagePayload<'_> {
    pub fn data_url(&self) -> String {
        format!("data:image/{};base64,{}", self.format, self.base64)
    }
}

/// Strips exactly the `data:image/<fmt>;base64,` prefix. Anything without that
/// prefix is passed through whole and treated as JPEG.
pub fn strip_data_url(image: &str) -> Result<ImagePayload<'_>, InvalidImage> {
    lazy_static! {
        static ref DATA_URL_RE: Regex = Regex::new(r"^data:image/([a-z]+);base64,").unwrap();
    }
    if image.is_empty() {
        return Err(InvalidImage::Empty);
    }
    let payload = match DATA_URL_RE.captures(image) {
        Some(caps) => {
            let prefix_len = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let format = caps.get(1).map(|m| m.as_str()).unwrap_or("jpeg");
            ImagePayload {
                format,
                base64: &image[prefix_len..],
            }
        }
        None => ImagePayload {
            format: "jpeg",
            base64: image,
        },
    };
    if payload.base64.is_empty() {
        return Err(InvalidImage::EmptyPayload);
    }
    Ok(payload)
}

/// Everything the model needs for one analysis: persona, instruction and image.
#[derive(Debug, Clone)]
pub struct AnalysisPrompt {
    pub system: String,
    pub instruction: String,
    pub image_url: String,
}

impl AnalysisPrompt {
    pub fn for_image(payload: &ImagePayload<'_>) -> Self {
        Self {
            system: SYSTEM_INSTRUCTION.to_string(),
            instruction: user_instruction(),
            image_url: payload.data_url(),
        }
    }
}

fn user_instruction() -> String {
    format!(
        r#"Analyze this food image in detail and provide a structured response. Consider:
1. Identify the food items with confidence level
2. Estimate portion sizes accurately
3. Calculate nutritional values based on standard databases
4. Provide specific health recommendations

Return the analysis in this exact JSON structure:
{{
  "foodItem": {{
    "name": "detailed food name",
    "confidence": "confidence percentage (1-100)",
    "portion": {{
      "size": "numerical size",
      "unit": "measurement unit (g, ml, etc)",
      "description": "detailed portion description"
    }}
  }},
  "nutrition": {{
    "calories": "total calories",
    "protein": "protein in grams",
    "carbs": "carbs in grams",
    "fat": "fat in grams"
  }},
  "dailyGoals": {{
    "calories": {{
      "current": "calories from this meal",
      "target": {calories}
    }},
    "protein": {{
      "current": "protein from this meal",
      "target": {protein}
    }}
  }},
  "recommendations": [
    "3-4 specific health recommendations based on this meal"
  ],
  "analysis": "detailed nutritional analysis and health implications"
}}"#,
        calories = DAILY_CALORIE_TARGET,
        protein = DAILY_PROTEIN_TARGET_G,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};

    #[test]
    fn strips_exactly_the_prefix() {
        let p = strip_data_url("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(p.format, "jpeg");
        assert_eq!(p.base64, "AAAA");

        let p = strip_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(p.format, "png");
        assert_eq!(p.base64, "iVBORw0KGgo=");
    }

    #[test]
    fn stripped_payload_decodes_to_original_bytes() {
        let original: Vec<u8> = (0u8..=255).chain([0xFF, 0xD8, 0xFF, 0xE0]).collect();
        let encoded = general_purpose::STANDARD.encode(&original);
        let url = format!("data:image/webp;base64,{}", encoded);

        let p = strip_data_url(&url).unwrap();
        assert_eq!(p.base64, encoded);
        let decoded = general_purpose::STANDARD.decode(p.base64).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn bare_payload_passes_through_as_jpeg() {
        let p = strip_data_url("AAAA").unwrap();
        assert_eq!(p.format, "jpeg");
        assert_eq!(p.base64, "AAAA");
        assert_eq!(p.data_url(), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn only_a_leading_prefix_is_stripped() {
        let p = strip_data_url("xdata:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(p.base64, "xdata:image/jpeg;base64,AAAA");
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert_eq!(strip_data_url(""), Err(InvalidImage::Empty));
        assert_eq!(
            strip_data_url("data:image/png;base64,"),
            Err(InvalidImage::EmptyPayload)
        );
    }

    #[test]
    fn prompt_carries_schema_targets_and_image() {
        let payload = strip_data_url("data:image/png;base64,AAAA").unwrap();
        let prompt = AnalysisPrompt::for_image(&payload);
        assert!(prompt.system.contains("nutritionist"));
        for field in ["foodItem", "confidence", "portion", "nutrition", "dailyGoals", "recommendations", "analysis"] {
            assert!(prompt.instruction.contains(field), "missing {field}");
        }
        assert!(prompt.instruction.contains("\"target\": 2000"));
        assert!(prompt.instruction.contains("\"target\": 50"));
        assert_eq!(prompt.image_url, "data:image/png;base64,AAAA");
    }
}
