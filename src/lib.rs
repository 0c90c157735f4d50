pub mod config;
pub mod mml;
pub mod render;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::rendering::{
    configure_data, configure_data_mut, set_defaults, LandscapeEnvironment, LandscapeLayer,
    OglConfig, RenderFlags, RgbColor,
};
pub use config::texture::{ColorFormat, TextureConfig, TextureFilter, TextureResolution, TextureType};
pub use mml::{load_opengl, parse_opengl, OpenGlElement};
pub use render::capabilities::{check_extension, initialize, is_active, is_present, set_active, GlContextProbe};
pub use render::fog::{fog_data, fog_data_at, FogData, FogType};
pub use render::resources::{
    load_models_images, reset_model_skins, reset_textures, unload_models_images, CollectionId,
    ModelLoader,
};
pub use render::texture::{set_pixel_opacities, OpacityType, TextureOptions};
pub use ui::settings::{configure_dialog, ConfigureDialog, DialogOutcome, OglSettingsWindow};
pub use utils::error::OglError;
