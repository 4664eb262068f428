//! Video style and output format definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Available generation styles.
///
/// Each style contributes a fixed prefix to the prompt sent to the
/// provider; the target duration and resolution are deliberately kept out
/// of the prompt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Style {
    /// Modern 2D anime look (the fallback style)
    #[default]
    #[serde(rename = "default")]
    Default,
    /// 1980s hand-drawn action anime
    #[serde(rename = "80s")]
    Eighties,
    /// Bold shonen look with speed lines and energy effects
    #[serde(rename = "bleach")]
    Bleach,
    /// Painterly modern 2D with visible brushstrokes
    #[serde(rename = "modern")]
    Modern,
    /// No styling, the user prompt is passed through untouched
    #[serde(rename = "none")]
    None,
}

impl Style {
    /// All available styles, in the order used for batch generation.
    pub const ALL: &'static [Style] = &[
        Style::Default,
        Style::Eighties,
        Style::Bleach,
        Style::Modern,
        Style::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Default => "default",
            Style::Eighties => "80s",
            Style::Bleach => "bleach",
            Style::Modern => "modern",
            Style::None => "none",
        }
    }

    /// The styling text prepended to the user prompt.
    pub fn prompt_prefix(&self) -> &'static str {
        match self {
            Style::Eighties => {
                "80s action anime: Create an anime clip in the style of 1980s Japanese animation \
                 (Akira, Ghost in the Shell 1989, Macross). Hand-drawn cel shading, grainy \
                 texture, deep shadows, vivid neon tones, sharp eyes, thick outlines, slightly \
                 slower realistic hand-drawn motion. "
            }
            Style::Bleach => {
                "Bleach anime style: bold shonen, sharp contrast, speed lines, dramatic light \
                 streaks; strong outlines, flowing clothing, dynamic poses; energy effects, dust \
                 bursts; cool tones with glowing highlights. "
            }
            Style::Modern => {
                "Modern 2D anime painterly: visible brushstrokes, textured backgrounds, clear \
                 hand-drawn lineart, precise facial details, glossy expressive eyes; soft but \
                 defined shading; DO NOT produce photorealism/3D/lens FX. "
            }
            Style::None => "",
            Style::Default => {
                "Modern 2D anime (Makoto Shinkai / Kyoto Animation): clean lines, expressive \
                 characters, bright colors, detailed backgrounds, smooth motion, dynamic poses, \
                 glowing effects. "
            }
        }
    }

    /// Build the final prompt sent to the provider: style prefix followed
    /// by the user's text, trimmed.
    pub fn compose_prompt(&self, user_prompt: &str) -> String {
        format!("{}{}", self.prompt_prefix(), user_prompt)
            .trim()
            .to_string()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Style {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Style::Default),
            "80s" => Ok(Style::Eighties),
            "bleach" => Ok(Style::Bleach),
            "modern" => Ok(Style::Modern),
            "none" => Ok(Style::None),
            _ => Err(StyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown style: {0}")]
pub struct StyleParseError(String);

/// Requested output aspect ratio, mapped to a provider pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VideoFormat {
    /// 9:16 vertical
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 horizontal (the fallback format)
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 1:1 square
    #[serde(rename = "1:1")]
    Square,
}

impl VideoFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoFormat::Portrait => "9:16",
            VideoFormat::Landscape => "16:9",
            VideoFormat::Square => "1:1",
        }
    }

    /// Pixel size string the provider expects for this format.
    pub fn size(&self) -> &'static str {
        match self {
            VideoFormat::Portrait => "720x1280",
            VideoFormat::Landscape => "1280x720",
            VideoFormat::Square => "1024x1024",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "9:16" => Ok(VideoFormat::Portrait),
            "16:9" => Ok(VideoFormat::Landscape),
            "1:1" => Ok(VideoFormat::Square),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown video format: {0}, expected one of 9:16, 16:9, 1:1")]
pub struct FormatParseError(String);
