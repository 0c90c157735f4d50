pub mod core;
pub mod rendering;
pub mod texture;

pub use self::core::{load_or_create_config, CONFIG_FILE_NAME};
pub use rendering::{configure_data, configure_data_mut, OglConfig, RenderFlags};
pub use texture::{TextureConfig, TextureConfigs, TextureType};
