use anyhow::Context;
use directories::ProjectDirs;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::rendering::{configure_data_mut, OglConfig};
use crate::utils::error::{OglError, Result};

pub const CONFIG_FILE_NAME: &str = "opengl.toml";

pub fn load_from(path: &Path) -> Result<OglConfig> {
    let content = fs::read_to_string(path)?;
    let config: OglConfig = toml::from_str(&content)?;
    Ok(config)
}

pub fn save_to(config: &OglConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml_content = toml::to_string_pretty(config)?;
    fs::write(path, toml_content)?;
    Ok(())
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "AlephOne", "AlephOne")
        .context("Couldn't determine project directory")?;
    Ok(proj_dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Reads the configuration at `path`, writing defaults there first if
/// nothing exists yet. A file that cannot be read or parsed is an error;
/// one that parses but fails validation is replaced by defaults.
pub fn load_or_create_at(path: &Path) -> anyhow::Result<OglConfig> {
    if !path.exists() {
        let default_config = OglConfig::default();
        save_to(&default_config, path)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;
        info!("Wrote default OpenGL configuration to {}", path.display());
        return Ok(default_config);
    }

    let config = load_from(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    match config.validate() {
        Ok(()) => Ok(config),
        Err(e) => {
            warn!("Ignoring invalid OpenGL configuration: {}", e);
            Ok(OglConfig::default())
        }
    }
}

pub fn load_or_create_config() -> anyhow::Result<OglConfig> {
    load_or_create_at(&config_path()?)
}

/// Replaces the process-wide configuration.
pub fn install(config: OglConfig) -> Result<()> {
    config.validate()?;
    *configure_data_mut() = config;
    Ok(())
}

/// Returns an error if the record on disk does not validate.
pub fn check_file(path: &Path) -> Result<OglConfig> {
    let config = load_from(path)?;
    config.validate().map_err(|e| match e {
        OglError::InvalidConfig(msg) => OglError::InvalidConfig(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rendering::{LandscapeEnvironment, RenderFlags, RgbColor};
    use crate::config::texture::{ColorFormat, TextureResolution, TextureType};
    use tempfile::tempdir;

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs").join(CONFIG_FILE_NAME);

        let mut config = OglConfig::default();
        config.flags.insert(RenderFlags::FLAT_LAND | RenderFlags::VOID_COLOR);
        config.flags.remove(RenderFlags::FOG);
        config.void_color = RgbColor::new(0x1000, 0x2000, 0x3000);
        config.multisamples = 4;
        config.anisotropy_level = 8.0;
        config.textures[TextureType::Landscape].resolution = TextureResolution::Quarter;
        config.textures[TextureType::Inhabitant].color_format = ColorFormat::Rgba4444;
        config.landscape_colors[LandscapeEnvironment::Night].sky = RgbColor::new(7, 8, 9);

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "multisamples = 2\n\n[textures.wall]\nresolution = \"half\"\n").unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.multisamples, 2);
        assert_eq!(loaded.flags, OglConfig::default().flags);
        assert_eq!(loaded.textures[TextureType::Wall].resolution, TextureResolution::Half);
        assert_eq!(
            loaded.textures[TextureType::Wall].far_filter,
            OglConfig::default().textures[TextureType::Wall].far_filter
        );
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let created = load_or_create_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, OglConfig::default());
        assert_eq!(load_or_create_at(&path).unwrap(), created);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "multisamples = \"lots\"").unwrap();
        assert!(matches!(load_from(&path), Err(OglError::TomlDe(_))));
    }

    #[test]
    fn test_check_file_reports_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "multisamples = 3\n").unwrap();
        assert!(matches!(check_file(&path), Err(OglError::InvalidConfig(_))));

        fs::write(&path, "multisamples = 8\n").unwrap();
        assert_eq!(check_file(&path).unwrap().multisamples, 8);
    }
}
