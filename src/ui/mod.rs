//! User interface
pub mod settings;

pub use settings::OglSettingsWindow;
