pub mod capabilities;
pub mod fog;
pub mod resources;
pub mod texture;

pub use capabilities::GlCapabilities;
pub use fog::FogTable;
pub use resources::OglResources;
pub use texture::GlTexture;
