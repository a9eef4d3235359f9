// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Evaluates one image: encode, ask the model, parse, score

use base64::{engine::general_purpose, Engine as _};
use image::GenericImageView;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::evaluation::{EvaluationOutcome, ScoringMode};
use crate::vision::{ImageDetail, VisionModel, VisionRequest};
use crate::{EvaluationFailure, Result};

/// Image bytes ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub base64: String,
    pub mime_type: &'static str,
}

/// Runs single-image evaluations against a vision model
pub struct Evaluator<M> {
    model: M,
    prompt: String,
    max_tokens: u32,
    detail: ImageDetail,
    mode: ScoringMode,
    max_dimension: Option<u32>,
}

impl<M: VisionModel> Evaluator<M> {
    /// Create an evaluator using the prompt and limits from `config`
    pub fn new(model: M, config: &AppConfig) -> Self {
        Self {
            model,
            prompt: config.prompts.evaluation_prompt.clone(),
            max_tokens: config.openai.max_tokens,
            detail: config.openai.detail,
            mode: config.scoring.mode,
            max_dimension: config.openai.max_image_dimension,
        }
    }

    /// Override the scoring mode
    pub fn with_mode(mut self, mode: ScoringMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Evaluate the image at `path`. Never fails; problems end up in the outcome.
    pub async fn evaluate(&self, path: &Path) -> EvaluationOutcome {
        let image = match encode_image(path, self.max_dimension) {
            Ok(image) => image,
            Err(e) => {
                warn!("Could not read {:?}: {}", path, e);
                return EvaluationOutcome {
                    result: Err(EvaluationFailure::Request(e.to_string())),
                    usage: None,
                };
            }
        };

        let request = VisionRequest {
            prompt: &self.prompt,
            image_base64: &image.base64,
            mime_type: image.mime_type,
            detail: self.detail,
            max_tokens: self.max_tokens,
        };

        debug!("Evaluating {:?} with {}", path, self.model.name());

        let response = match self.model.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Evaluation request for {:?} failed: {}", path, e);
                return EvaluationOutcome {
                    result: Err(EvaluationFailure::Request(e.to_string())),
                    usage: None,
                };
            }
        };

        let result = self.mode.evaluate(&response.text);
        if let Err(ref e) = result {
            warn!("Could not score {:?}: {}", path, e);
        }

        EvaluationOutcome {
            result,
            usage: Some(response.usage),
        }
    }
}

/// Read and base64-encode an image, downscaling it first when it is larger
/// than `max_dimension` on its longest side
pub fn encode_image(path: &Path, max_dimension: Option<u32>) -> Result<EncodedImage> {
    if let Some(limit) = max_dimension {
        match prepare_image(path, limit) {
            Ok(Some(jpeg)) => {
                return Ok(EncodedImage {
                    base64: general_purpose::STANDARD.encode(&jpeg),
                    mime_type: "image/jpeg",
                })
            }
            Ok(None) => {}
            // Fallback to raw
            Err(e) => debug!("Could not resize {:?}: {}", path, e),
        }
    }

    let data = std::fs::read(path)?;
    Ok(EncodedImage {
        base64: general_purpose::STANDARD.encode(&data),
        mime_type: mime_type_for(path),
    })
}

/// JPEG bytes of the resized image, or `None` when it already fits
fn prepare_image(path: &Path, limit: u32) -> Result<Option<Vec<u8>>> {
    let img = image::open(path)?;
    let (width, height) = img.dimensions();
    if width <= limit && height <= limit {
        return Ok(None);
    }

    let img = img.resize(limit, limit, image::imageops::FilterType::Triangle);
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    img.to_rgb8().write_to(&mut cursor, image::ImageFormat::Jpeg)?;

    Ok(Some(buffer))
}

/// MIME type for the data URL, from the file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
