// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Boundary to the vision model that rates images

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::evaluation::TokenUsage;
use crate::Result;

/// Resolution hint passed along with the image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    #[default]
    High,
    Auto,
}

impl fmt::Display for ImageDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDetail::Low => f.write_str("low"),
            ImageDetail::High => f.write_str("high"),
            ImageDetail::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for ImageDetail {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ImageDetail::Low),
            "high" => Ok(ImageDetail::High),
            "auto" => Ok(ImageDetail::Auto),
            other => Err(format!("unknown image detail '{}'", other)),
        }
    }
}

/// One image plus the instructions for rating it
#[derive(Debug, Clone)]
pub struct VisionRequest<'a> {
    pub prompt: &'a str,
    /// Base64 image bytes, no data-URL prefix
    pub image_base64: &'a str,
    pub mime_type: &'a str,
    pub detail: ImageDetail,
    /// Cap on the length of the reply
    pub max_tokens: u32,
}

/// Reply text and what it cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// A model that can look at an image and answer a prompt
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Name shown in logs
    fn name(&self) -> &str;

    /// Send one request. Errors cover transport, auth and provider failures.
    async fn complete(&self, request: &VisionRequest<'_>) -> Result<VisionResponse>;
}

