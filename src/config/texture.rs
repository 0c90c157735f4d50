use gl::types::GLenum;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use crate::utils::error::{OglError, Result};

/// Texture categories with independent quality settings, so that (say)
/// walls can stay sharp while landscapes are degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureType {
    Wall,
    Landscape,
    Inhabitant,
    WeaponsInHand,
}

impl TextureType {
    pub const COUNT: usize = 4;
    pub const ALL: [TextureType; Self::COUNT] = [
        TextureType::Wall,
        TextureType::Landscape,
        TextureType::Inhabitant,
        TextureType::WeaponsInHand,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Wall => "Walls",
            Self::Landscape => "Landscapes",
            Self::Inhabitant => "Sprites",
            Self::WeaponsInHand => "Weapons in Hand",
        }
    }
}

/// OpenGL texture filters, in menu order. Nearby textures only use the
/// first two; the mipmapped ones are for distant textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    pub const ALL: [TextureFilter; 6] = [
        TextureFilter::Nearest,
        TextureFilter::Linear,
        TextureFilter::NearestMipmapNearest,
        TextureFilter::LinearMipmapNearest,
        TextureFilter::NearestMipmapLinear,
        TextureFilter::LinearMipmapLinear,
    ];

    pub const NEAR: [TextureFilter; 2] = [TextureFilter::Nearest, TextureFilter::Linear];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn gl_enum(&self) -> GLenum {
        match self {
            Self::Nearest => gl::NEAREST,
            Self::Linear => gl::LINEAR,
            Self::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
            Self::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
            Self::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
            Self::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
        }
    }

    pub fn is_mipmapped(&self) -> bool {
        !matches!(self, Self::Nearest | Self::Linear)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Nearest => "Pixelated",
            Self::Linear => "Smoothed",
            Self::NearestMipmapNearest => "Nearest Mipmap Nearest",
            Self::LinearMipmapNearest => "Linear Mipmap Nearest",
            Self::NearestMipmapLinear => "Nearest Mipmap Linear",
            Self::LinearMipmapLinear => "Linear Mipmap Linear",
        }
    }
}

/// How much to shrink textures before use, to save VRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureResolution {
    Full,
    Half,
    Quarter,
}

impl TextureResolution {
    pub const ALL: [TextureResolution; 3] = [Self::Full, Self::Half, Self::Quarter];

    pub fn shrink_shift(&self) -> u32 {
        match self {
            Self::Full => 0,
            Self::Half => 1,
            Self::Quarter => 2,
        }
    }

    /// Shrunk dimensions; never below one pixel.
    pub fn apply(&self, width: u32, height: u32) -> (u32, u32) {
        let shift = self.shrink_shift();
        ((width >> shift).max(1), (height >> shift).max(1))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Full => "x1",
            Self::Half => "x1/2",
            Self::Quarter => "x1/4",
        }
    }
}

/// Bits per color channel of the uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    Rgba8888,
    Rgba4444,
    Rgba2222,
}

impl ColorFormat {
    pub const ALL: [ColorFormat; 3] = [Self::Rgba8888, Self::Rgba4444, Self::Rgba2222];

    pub fn bits_per_channel(&self) -> u32 {
        match self {
            Self::Rgba8888 => 8,
            Self::Rgba4444 => 4,
            Self::Rgba2222 => 2,
        }
    }

    pub fn gl_internal_format(&self) -> GLenum {
        match self {
            Self::Rgba8888 => gl::RGBA8,
            Self::Rgba4444 => gl::RGBA4,
            Self::Rgba2222 => gl::RGBA2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Rgba8888 => "32-bit",
            Self::Rgba4444 => "16-bit",
            Self::Rgba2222 => "8-bit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    pub near_filter: TextureFilter,
    pub far_filter: TextureFilter,
    pub resolution: TextureResolution,
    pub color_format: ColorFormat,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            near_filter: TextureFilter::Linear,
            far_filter: TextureFilter::LinearMipmapLinear,
            resolution: TextureResolution::Full,
            color_format: ColorFormat::Rgba8888,
        }
    }
}

impl TextureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.near_filter.is_mipmapped() {
            return Err(OglError::InvalidConfig(format!(
                "near filter cannot be mipmapped: {:?}",
                self.near_filter
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfigs {
    pub wall: TextureConfig,
    pub landscape: TextureConfig,
    pub inhabitant: TextureConfig,
    pub weapons_in_hand: TextureConfig,
}

impl Default for TextureConfigs {
    fn default() -> Self {
        Self {
            wall: TextureConfig::default(),
            // Landscapes are never mipmapped
            landscape: TextureConfig {
                far_filter: TextureFilter::Linear,
                ..TextureConfig::default()
            },
            inhabitant: TextureConfig::default(),
            weapons_in_hand: TextureConfig::default(),
        }
    }
}

impl TextureConfigs {
    pub fn iter(&self) -> impl Iterator<Item = (TextureType, &TextureConfig)> {
        TextureType::ALL.into_iter().map(move |kind| (kind, &self[kind]))
    }
}

impl Index<TextureType> for TextureConfigs {
    type Output = TextureConfig;

    fn index(&self, kind: TextureType) -> &TextureConfig {
        match kind {
            TextureType::Wall => &self.wall,
            TextureType::Landscape => &self.landscape,
            TextureType::Inhabitant => &self.inhabitant,
            TextureType::WeaponsInHand => &self.weapons_in_hand,
        }
    }
}

impl IndexMut<TextureType> for TextureConfigs {
    fn index_mut(&mut self, kind: TextureType) -> &mut TextureConfig {
        match kind {
            TextureType::Wall => &mut self.wall,
            TextureType::Landscape => &mut self.landscape,
            TextureType::Inhabitant => &mut self.inhabitant,
            TextureType::WeaponsInHand => &mut self.weapons_in_hand,
        }
    }
}
