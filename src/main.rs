use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use std::{fs, path::PathBuf};

use oglsetup::{
    config::core as prefs, fog_data, load_opengl, set_defaults, FogType, RenderFlags,
};

#[derive(Parser)]
#[clap(name = "oglsetup", about = "Inspect and edit the OpenGL renderer settings")]
struct Cli {
    /// Configuration file; defaults to the per-user location
    #[clap(long)]
    config: Option<PathBuf>,

    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current configuration
    Show,
    /// Validate the configuration file without changing it
    Check,
    /// Restore the default configuration
    Reset,
    /// Turn one rendering flag on or off
    Flag { name: String, state: String },
    /// Read the <opengl> element of a markup file and report what it sets
    Mml { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    SimpleLogger::new().with_level(level).init()?;

    let path = match cli.config {
        Some(path) => path,
        None => prefs::config_path()?,
    };
    if let Command::Check = cli.command {
        prefs::check_file(&path).with_context(|| format!("{} is not usable", path.display()))?;
        println!("{} is valid", path.display());
        return Ok(());
    }
    let mut config = prefs::load_or_create_at(&path)?;

    match cli.command {
        Command::Check => {}
        Command::Show => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Command::Reset => {
            set_defaults(&mut config);
            prefs::save_to(&config, &path)?;
            info!("Restored defaults in {}", path.display());
        }
        Command::Flag { name, state } => {
            let flag = RenderFlags::from_name(&name.to_uppercase())
                .with_context(|| format!("Unknown flag: {}", name))?;
            let on = match state.as_str() {
                "on" | "1" | "true" => true,
                "off" | "0" | "false" => false,
                other => bail!("Expected on or off, got {}", other),
            };
            config.flags.set(flag, on);
            prefs::save_to(&config, &path)?;
            info!("{} is now {}", name.to_uppercase(), if on { "on" } else { "off" });
        }
        Command::Mml { path: file } => {
            let xml = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let element = load_opengl(&xml)?;
            if !element.found {
                warn!("{} has no <opengl> element", file.display());
            }
            for kind in FogType::ALL {
                let fog = *fog_data(kind).read();
                println!(
                    "{:?}: present={} drawn={} depth={} landscapes={} color={:?}",
                    kind,
                    fog.is_present,
                    fog.is_drawn(config.flags),
                    fog.depth,
                    fog.affects_landscapes,
                    <[u16; 3]>::from(fog.color),
                );
            }
            println!(
                "{} substitute textures, {} models",
                element.textures.len(),
                element.models.len()
            );
        }
    }

    Ok(())
}
