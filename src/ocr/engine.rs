use anyhow::{Context, Result, anyhow};
use image::{ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

use super::preprocess::threshold_bright_pixels;
use super::text_box::{Rect, TextBox};

/// Recognizes a single cropped text row.
///
/// Implemented by whatever OCR engine sits outside the crate; the scanner
/// only needs the text of one row at a time.
pub trait TextRecognizer: Send + Sync {
    fn recognize_line(&self, img: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<String>;
}

/// One detection as produced by a full-screen text detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DetectionRepr")]
pub struct RawDetection {
    pub raw_text: String,
    pub polygon: Vec<[f64; 2]>,
    pub score: f32,
}

/// Accepted on-disk shapes for a detection.
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionRepr {
    Object {
        raw_text: String,
        #[serde(default)]
        polygon: Vec<[f64; 2]>,
        #[serde(default)]
        score: f32,
    },
    /// PaddleOCR style `[polygon, [text, score]]`
    Paddle(Vec<[f64; 2]>, (String, f32)),
}

impl From<DetectionRepr> for RawDetection {
    fn from(repr: DetectionRepr) -> Self {
        match repr {
            DetectionRepr::Object {
                raw_text,
                polygon,
                score,
            } => Self {
                raw_text,
                polygon,
                score,
            },
            DetectionRepr::Paddle(polygon, (raw_text, score)) => Self {
                raw_text,
                polygon,
                score,
            },
        }
    }
}

impl RawDetection {
    pub fn to_text_box(&self) -> TextBox {
        TextBox::new(self.raw_text.clone(), Rect::from_polygon(&self.polygon), self.score)
    }
}

/// Parses a detection dump (a JSON array of detections).
pub fn parse_detections(json: &str) -> Result<Vec<TextBox>> {
    let detections: Vec<RawDetection> =
        serde_json::from_str(json).context("Failed to parse detection dump")?;
    Ok(detections.iter().map(RawDetection::to_text_box).collect())
}

/// Reads a detection dump from disk.
pub fn load_detections(path: &Path) -> Result<Vec<TextBox>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read detection dump: {}", path.display()))?;
    parse_detections(&contents).with_context(|| format!("In {}", path.display()))
}

/// Placeholder in recognizer arguments replaced by the input image path.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Runs an external OCR executable on one row and reads the text from stdout.
///
/// Defaults target Tesseract in single-line mode; any program taking an
/// image path and printing text works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandRecognizer {
    pub program: String,
    pub args: Vec<String>,
    /// Binarize the crop first, keeping pixels brighter than this on every channel
    pub bright_threshold: Option<u8>,
}

impl Default for CommandRecognizer {
    fn default() -> Self {
        Self {
            program: "tesseract".to_string(),
            args: [INPUT_PLACEHOLDER, "stdout", "-l", "chi_sim", "--psm", "7"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            bright_threshold: None,
        }
    }
}

impl CommandRecognizer {
    fn command_args(&self, input: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input))
            .collect()
    }
}

impl TextRecognizer for CommandRecognizer {
    fn recognize_line(&self, img: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        match self.bright_threshold {
            Some(threshold) => threshold_bright_pixels(img, threshold).save(temp_input.path())?,
            None => img.save(temp_input.path())?,
        }

        let output = Command::new(&self.program)
            .args(self.command_args(temp_input.path()))
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{} failed: {}", self.program, stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
