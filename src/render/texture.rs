use gl::types::{GLenum, GLfloat, GLuint};
use image::{imageops::FilterType, RgbaImage};
use serde::{Deserialize, Serialize};

use super::capabilities;
use crate::config::texture::TextureConfig;
use crate::utils::error::{OglError, Result};

pub const ANISOTROPY_EXTENSION: &str = "GL_EXT_texture_filter_anisotropic";
const TEXTURE_MAX_ANISOTROPY_EXT: GLenum = 0x84FE;

/// Where a texture's opacity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpacityType {
    /// Alpha channel as-is, thresholded
    #[default]
    Crisp,
    /// Alpha channel as-is, blended
    Flat,
    /// Average of the color channels
    Avg,
    /// Largest color channel
    Max,
}

impl OpacityType {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Crisp),
            1 => Some(Self::Flat),
            2 => Some(Self::Avg),
            3 => Some(Self::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureOptions {
    pub opacity_type: OpacityType,
    pub opacity_scale: f32,
    /// In units of full opacity
    pub opacity_shift: f32,
    pub void_visible: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            opacity_type: OpacityType::Crisp,
            opacity_scale: 1.0,
            opacity_shift: 0.0,
            void_visible: false,
        }
    }
}

fn adjust_opacities(options: &TextureOptions, pixels: &mut [[u8; 4]]) {
    for px in pixels {
        let source = match options.opacity_type {
            OpacityType::Avg => (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0,
            OpacityType::Max => px[0].max(px[1]).max(px[2]) as f32,
            OpacityType::Crisp | OpacityType::Flat => px[3] as f32,
        };
        let opacity = options.opacity_scale * source + 255.0 * options.opacity_shift;
        px[3] = ((opacity + 0.5) as i32).clamp(0, 255) as u8;
    }
}

/// Recomputes the alpha byte of each pixel. Pixels are RGBA in memory
/// byte order; the color bytes are left alone.
pub fn set_pixel_opacities(options: &TextureOptions, pixels: &mut [u32]) {
    adjust_opacities(options, bytemuck::cast_slice_mut(pixels));
}

pub fn set_image_opacities(options: &TextureOptions, image: &mut RgbaImage) {
    let raw: &mut [u8] = image;
    adjust_opacities(options, bytemuck::cast_slice_mut(raw));
}

/// Everything `glTexImage2D` and the sampler state need for one texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadParams {
    pub width: u32,
    pub height: u32,
    pub internal_format: GLenum,
    pub min_filter: GLenum,
    pub mag_filter: GLenum,
    pub mipmaps: bool,
    pub anisotropy: Option<f32>,
}

impl UploadParams {
    pub fn new(width: u32, height: u32, config: &TextureConfig, anisotropy_level: f32) -> Self {
        let (width, height) = config.resolution.apply(width, height);
        let mipmaps = config.far_filter.is_mipmapped();
        Self {
            width,
            height,
            internal_format: config.color_format.gl_internal_format(),
            min_filter: config.far_filter.gl_enum(),
            mag_filter: config.near_filter.gl_enum(),
            mipmaps,
            anisotropy: (mipmaps && anisotropy_level > 1.0).then_some(anisotropy_level),
        }
    }
}

pub struct GlTexture {
    id: GLuint,
    width: u32,
    height: u32,
}

impl GlTexture {
    pub fn upload(image: &RgbaImage, config: &TextureConfig, anisotropy_level: f32) -> Result<Self> {
        if !gl::GenTextures::is_loaded() {
            return Err(OglError::NoContext);
        }

        let params = UploadParams::new(image.width(), image.height(), config, anisotropy_level);
        let shrunk;
        let data = if (params.width, params.height) != image.dimensions() {
            shrunk = image::imageops::resize(image, params.width, params.height, FilterType::Triangle);
            &shrunk
        } else {
            image
        };

        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
            gl::BindTexture(gl::TEXTURE_2D, id);

            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::REPEAT as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::REPEAT as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, params.min_filter as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, params.mag_filter as i32);

            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                params.internal_format as i32,
                params.width as i32,
                params.height as i32,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                data.as_ptr() as *const _,
            );

            if params.mipmaps && gl::GenerateMipmap::is_loaded() {
                gl::GenerateMipmap(gl::TEXTURE_2D);
            }
            if let Some(level) = params.anisotropy {
                if capabilities::check_extension(ANISOTROPY_EXTENSION) {
                    gl::TexParameterf(gl::TEXTURE_2D, TEXTURE_MAX_ANISOTROPY_EXT, level as GLfloat);
                }
            }

            gl::BindTexture(gl::TEXTURE_2D, 0);
        }

        Ok(Self {
            id,
            width: params.width,
            height: params.height,
        })
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bind(&self) {
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, self.id);
        }
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        if gl::DeleteTextures::is_loaded() {
            unsafe {
                gl::DeleteTextures(1, &self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::texture::{ColorFormat, TextureFilter, TextureResolution};

    fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
        u32::from_ne_bytes([r, g, b, a])
    }

    #[test]
    fn test_default_options_keep_alpha() {
        let mut pixels = [rgba(10, 20, 30, 40), rgba(255, 255, 255, 255), rgba(0, 0, 0, 0)];
        let before = pixels;
        set_pixel_opacities(&TextureOptions::default(), &mut pixels);
        assert_eq!(pixels, before);
    }

    #[test]
    fn test_average_and_max_sources() {
        let avg = TextureOptions { opacity_type: OpacityType::Avg, ..Default::default() };
        let mut pixels = [rgba(30, 60, 91, 255)];
        set_pixel_opacities(&avg, &mut pixels);
        assert_eq!(pixels[0].to_ne_bytes(), [30, 60, 91, 60]);

        let max = TextureOptions { opacity_type: OpacityType::Max, ..Default::default() };
        let mut pixels = [rgba(30, 200, 91, 0)];
        set_pixel_opacities(&max, &mut pixels);
        assert_eq!(pixels[0].to_ne_bytes(), [30, 200, 91, 200]);
    }

    #[test]
    fn test_average_keeps_fraction_before_scaling() {
        let options = TextureOptions {
            opacity_type: OpacityType::Avg,
            opacity_scale: 100.0,
            ..Default::default()
        };
        // 100 * 2/3 = 66.67 -> 67
        let mut pixels = [rgba(1, 1, 0, 255), rgba(0, 0, 1, 255)];
        set_pixel_opacities(&options, &mut pixels);
        assert_eq!(pixels[0].to_ne_bytes(), [1, 1, 0, 67]);
        assert_eq!(pixels[1].to_ne_bytes(), [0, 0, 1, 33]);
    }

    #[test]
    fn test_scale_and_shift_are_pinned() {
        let options = TextureOptions {
            opacity_scale: 2.0,
            opacity_shift: 0.1,
            ..Default::default()
        };
        let mut pixels = [rgba(0, 0, 0, 100), rgba(0, 0, 0, 200), rgba(0, 0, 0, 0)];
        set_pixel_opacities(&options, &mut pixels);
        // 2*100 + 25.5 = 225.5 -> 226
        assert_eq!(pixels[0].to_ne_bytes()[3], 226);
        assert_eq!(pixels[1].to_ne_bytes()[3], 255);
        assert_eq!(pixels[2].to_ne_bytes()[3], 26);

        let darken = TextureOptions { opacity_shift: -1.0, ..Default::default() };
        let mut pixels = [rgba(1, 2, 3, 250)];
        set_pixel_opacities(&darken, &mut pixels);
        assert_eq!(pixels[0].to_ne_bytes(), [1, 2, 3, 0]);
    }

    #[test]
    fn test_image_opacities_match_pixels() {
        let options = TextureOptions { opacity_type: OpacityType::Max, ..Default::default() };
        let mut image = RgbaImage::from_pixel(2, 2, image::Rgba([10, 40, 20, 255]));
        set_image_opacities(&options, &mut image);
        assert!(image.pixels().all(|p| p.0 == [10, 40, 20, 40]));
    }

    #[test]
    fn test_upload_params_follow_config() {
        let config = TextureConfig {
            near_filter: TextureFilter::Nearest,
            far_filter: TextureFilter::LinearMipmapNearest,
            resolution: TextureResolution::Half,
            color_format: ColorFormat::Rgba4444,
        };
        let params = UploadParams::new(256, 128, &config, 4.0);
        assert_eq!((params.width, params.height), (128, 64));
        assert_eq!(params.internal_format, gl::RGBA4);
        assert_eq!(params.min_filter, gl::LINEAR_MIPMAP_NEAREST);
        assert_eq!(params.mag_filter, gl::NEAREST);
        assert!(params.mipmaps);
        assert_eq!(params.anisotropy, Some(4.0));

        let flat = UploadParams::new(64, 64, &TextureConfig { far_filter: TextureFilter::Linear, ..config }, 4.0);
        assert!(!flat.mipmaps);
        assert_eq!(flat.anisotropy, None);
    }
}
