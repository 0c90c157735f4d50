use bitflags::bitflags;
use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use super::texture::TextureConfigs;
use crate::utils::error::{OglError, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RenderFlags: u16 {
        const ZBUFFER = 0x0001;
        const VOID_COLOR = 0x0002;
        const FLAT_LAND = 0x0004;
        const FOG = 0x0008;
        const MODELS_3D = 0x0010;
        /// Pipe 2D graphics through OpenGL
        const GRAPHICS_2D = 0x0020;
        const FLAT_STATIC = 0x0040;
        const FADER = 0x0080;
        const LIQUID_SEE_THROUGH = 0x0100;
        /// Overhead map drawn with OpenGL
        const MAP = 0x0200;
        /// Texture fix for old Apple OpenGL
        const TEXTURE_FIX = 0x0400;
        const HUD = 0x0800;
    }
}

/// Dialog labels for each render flag.
pub const FLAG_LABELS: [(RenderFlags, &str); 12] = [
    (RenderFlags::ZBUFFER, "Z Buffer"),
    (RenderFlags::VOID_COLOR, "Color the Void"),
    (RenderFlags::FLAT_LAND, "Flat Color Landscapes"),
    (RenderFlags::FOG, "Fog"),
    (RenderFlags::MODELS_3D, "3D Models"),
    (RenderFlags::GRAPHICS_2D, "2D Graphics"),
    (RenderFlags::FLAT_STATIC, "Flat Static"),
    (RenderFlags::FADER, "Fader Effects"),
    (RenderFlags::LIQUID_SEE_THROUGH, "See-Through Liquids"),
    (RenderFlags::MAP, "Overhead Map"),
    (RenderFlags::TEXTURE_FIX, "Legacy Texture Fix"),
    (RenderFlags::HUD, "HUD"),
];

/// 16 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u16; 3]", into = "[u16; 3]")]
pub struct RgbColor {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0, 0, 0);

    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }

    /// From unit-range floats; out-of-range values are pinned.
    pub fn from_unit(red: f32, green: f32, blue: f32) -> Self {
        fn channel(value: f32) -> u16 {
            (65535.0 * value + 0.5).clamp(0.0, 65535.0) as u16
        }
        Self::new(channel(red), channel(green), channel(blue))
    }

    pub fn to_unit(&self) -> [f32; 3] {
        [
            self.red as f32 / 65535.0,
            self.green as f32 / 65535.0,
            self.blue as f32 / 65535.0,
        ]
    }

    pub fn from_srgb8(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0] as u16 * 257, rgb[1] as u16 * 257, rgb[2] as u16 * 257)
    }

    pub fn to_srgb8(&self) -> [u8; 3] {
        [(self.red >> 8) as u8, (self.green >> 8) as u8, (self.blue >> 8) as u8]
    }
}

impl From<[u16; 3]> for RgbColor {
    fn from(rgb: [u16; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl From<RgbColor> for [u16; 3] {
    fn from(color: RgbColor) -> Self {
        [color.red, color.green, color.blue]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandscapeEnvironment {
    Day,
    Night,
    Moon,
    OuterSpace,
}

impl LandscapeEnvironment {
    pub const ALL: [LandscapeEnvironment; 4] = [Self::Day, Self::Night, Self::Moon, Self::OuterSpace];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Night => "Night",
            Self::Moon => "Moon",
            Self::OuterSpace => "Outer Space",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandscapeLayer {
    Ground,
    Sky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandscapeColor {
    pub ground: RgbColor,
    pub sky: RgbColor,
}

impl LandscapeColor {
    const fn new(ground: RgbColor, sky: RgbColor) -> Self {
        Self { ground, sky }
    }
}

impl Index<LandscapeLayer> for LandscapeColor {
    type Output = RgbColor;

    fn index(&self, layer: LandscapeLayer) -> &RgbColor {
        match layer {
            LandscapeLayer::Ground => &self.ground,
            LandscapeLayer::Sky => &self.sky,
        }
    }
}

impl IndexMut<LandscapeLayer> for LandscapeColor {
    fn index_mut(&mut self, layer: LandscapeLayer) -> &mut RgbColor {
        match layer {
            LandscapeLayer::Ground => &mut self.ground,
            LandscapeLayer::Sky => &mut self.sky,
        }
    }
}

/// Flat landscape colors, one ground/sky pair per environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeColors {
    pub day: LandscapeColor,
    pub night: LandscapeColor,
    pub moon: LandscapeColor,
    pub outer_space: LandscapeColor,
}

impl Default for LandscapeColors {
    fn default() -> Self {
        Self {
            day: LandscapeColor::new(
                RgbColor::new(0x5000, 0x4000, 0x2000),
                RgbColor::new(0x4000, 0x8000, 0xe000),
            ),
            night: LandscapeColor::new(
                RgbColor::new(0x1e00, 0x1800, 0x0c00),
                RgbColor::new(0x1800, 0x3000, 0x5400),
            ),
            moon: LandscapeColor::new(
                RgbColor::new(0x2800, 0x2800, 0x2800),
                RgbColor::new(0x0800, 0x0800, 0x1000),
            ),
            outer_space: LandscapeColor::new(RgbColor::BLACK, RgbColor::BLACK),
        }
    }
}

impl Index<LandscapeEnvironment> for LandscapeColors {
    type Output = LandscapeColor;

    fn index(&self, env: LandscapeEnvironment) -> &LandscapeColor {
        match env {
            LandscapeEnvironment::Day => &self.day,
            LandscapeEnvironment::Night => &self.night,
            LandscapeEnvironment::Moon => &self.moon,
            LandscapeEnvironment::OuterSpace => &self.outer_space,
        }
    }
}

impl IndexMut<LandscapeEnvironment> for LandscapeColors {
    fn index_mut(&mut self, env: LandscapeEnvironment) -> &mut LandscapeColor {
        match env {
            LandscapeEnvironment::Day => &mut self.day,
            LandscapeEnvironment::Night => &mut self.night,
            LandscapeEnvironment::Moon => &mut self.moon,
            LandscapeEnvironment::OuterSpace => &mut self.outer_space,
        }
    }
}

pub const MULTISAMPLE_CHOICES: [u16; 5] = [0, 2, 4, 8, 16];
pub const MAX_ANISOTROPY: f32 = 16.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OglConfig {
    pub flags: RenderFlags,
    pub void_color: RgbColor,
    pub anisotropy_level: f32,
    pub multisamples: u16,
    pub textures: TextureConfigs,
    pub landscape_colors: LandscapeColors,
}

impl Default for OglConfig {
    fn default() -> Self {
        Self {
            flags: RenderFlags::ZBUFFER
                | RenderFlags::FADER
                | RenderFlags::MAP
                | RenderFlags::HUD
                | RenderFlags::LIQUID_SEE_THROUGH
                | RenderFlags::MODELS_3D
                | RenderFlags::FOG,
            void_color: RgbColor::BLACK,
            anisotropy_level: 1.0,
            multisamples: 0,
            textures: TextureConfigs::default(),
            landscape_colors: LandscapeColors::default(),
        }
    }
}

impl OglConfig {
    pub fn validate(&self) -> Result<()> {
        for (_, texture) in self.textures.iter() {
            texture.validate()?;
        }
        if !(1.0..=MAX_ANISOTROPY).contains(&self.anisotropy_level) {
            return Err(OglError::InvalidConfig(format!(
                "anisotropy level out of range: {}",
                self.anisotropy_level
            )));
        }
        if !MULTISAMPLE_CHOICES.contains(&self.multisamples) {
            return Err(OglError::InvalidConfig(format!(
                "unsupported multisample count: {}",
                self.multisamples
            )));
        }
        Ok(())
    }

    /// The color the void is cleared to.
    pub fn effective_void_color(&self) -> RgbColor {
        if self.flags.contains(RenderFlags::VOID_COLOR) {
            self.void_color
        } else {
            RgbColor::BLACK
        }
    }

    pub fn landscape_color(&self, env: LandscapeEnvironment, layer: LandscapeLayer) -> RgbColor {
        self.landscape_colors[env][layer]
    }
}

pub fn set_defaults(data: &mut OglConfig) {
    *data = OglConfig::default();
}

static CONFIGURE_DATA: Lazy<RwLock<OglConfig>> = Lazy::new(|| RwLock::new(OglConfig::default()));

/// The process-wide render configuration.
pub fn configure_data() -> RwLockReadGuard<'static, OglConfig> {
    CONFIGURE_DATA.read()
}

pub fn configure_data_mut() -> RwLockWriteGuard<'static, OglConfig> {
    CONFIGURE_DATA.write()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::texture::{TextureFilter, TextureType};

    #[test]
    fn test_defaults_are_deterministic() {
        let a = OglConfig::default();
        let b = OglConfig::default();
        assert_eq!(a, b);
        assert!(a.validate().is_ok());
        assert!(a.flags.contains(RenderFlags::FOG | RenderFlags::MODELS_3D | RenderFlags::ZBUFFER));
        assert!(!a.flags.contains(RenderFlags::VOID_COLOR));
    }

    #[test]
    fn test_set_defaults_resets_in_place() {
        let mut config = OglConfig::default();
        config.flags = RenderFlags::empty();
        config.multisamples = 4;
        config.textures[TextureType::Inhabitant].far_filter = TextureFilter::Nearest;
        set_defaults(&mut config);
        assert_eq!(config, OglConfig::default());
    }

    #[test]
    fn test_flag_bits_match_layout() {
        assert_eq!(RenderFlags::ZBUFFER.bits(), 0x0001);
        assert_eq!(RenderFlags::LIQUID_SEE_THROUGH.bits(), 0x0100);
        assert_eq!(RenderFlags::HUD.bits(), 0x0800);
        assert_eq!(RenderFlags::all().bits(), 0x0fff);
        assert_eq!(RenderFlags::from_name("FLAT_LAND"), Some(RenderFlags::FLAT_LAND));
        let labelled = FLAG_LABELS.iter().fold(RenderFlags::empty(), |acc, (flag, _)| acc | *flag);
        assert_eq!(labelled, RenderFlags::all());
    }

    #[test]
    fn test_void_color_needs_flag() {
        let mut config = OglConfig::default();
        config.void_color = RgbColor::new(0xffff, 0, 0);
        assert_eq!(config.effective_void_color(), RgbColor::BLACK);
        config.flags.insert(RenderFlags::VOID_COLOR);
        assert_eq!(config.effective_void_color(), RgbColor::new(0xffff, 0, 0));
    }

    #[test]
    fn test_landscape_grid_lookup() {
        let mut config = OglConfig::default();
        let color = RgbColor::new(1, 2, 3);
        config.landscape_colors[LandscapeEnvironment::Moon][LandscapeLayer::Sky] = color;
        assert_eq!(config.landscape_color(LandscapeEnvironment::Moon, LandscapeLayer::Sky), color);
        assert_eq!(
            config.landscape_color(LandscapeEnvironment::OuterSpace, LandscapeLayer::Ground),
            RgbColor::BLACK
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = OglConfig::default();
        config.multisamples = 3;
        assert!(config.validate().is_err());

        let mut config = OglConfig::default();
        config.anisotropy_level = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unit_color_conversion_pins() {
        let color = RgbColor::from_unit(1.5, 0.5, -1.0);
        assert_eq!(color, RgbColor::new(0xffff, 0x8000, 0));
        assert_eq!(RgbColor::from_srgb8([255, 128, 0]).to_srgb8(), [255, 128, 0]);
    }

    #[test]
    fn test_global_record_is_shared() {
        let first = {
            let data = configure_data();
            &*data as *const OglConfig
        };
        let second = {
            let data = configure_data_mut();
            &*data as *const OglConfig
        };
        assert_eq!(first, second);

        // Both guards are gone, so another writer gets through
        drop(configure_data_mut());
        assert!(configure_data().validate().is_ok());
    }
}
