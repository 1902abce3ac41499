//! User configuration options.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dirs::config_dir;
use log::{error, info, warn};
use portalcaster::editor::{EditorSettings, LinkMode};
use portalcaster::map_file::MapUnits;
use portalcaster::world::{DEFAULT_CEILING_Z, DEFAULT_FLOOR_Z};
use serde::{Deserialize, Serialize};

use crate::cli::CLIOptions;

const LOG_TAG: &str = "UserConfig";
const BASE_DIR: &str = "portalcaster";

fn get_cfg_file() -> Option<PathBuf> {
    let mut dir = config_dir()?;
    dir.push(BASE_DIR);
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(target: LOG_TAG, "Couldn't create {:?}: {}", dir, e);
            return None;
        }
    }
    dir.push("user.toml");
    Some(dir)
}

/// Coordinate encoding for saved maps. The grid step comes from the config.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitsKind {
    #[default]
    Grid,
    World,
}

impl FromStr for UnitsKind {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "world" => Ok(Self::World),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Invalid map units",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub width: u32,
    pub height: u32,
    pub grid_step: f32,
    /// Editor zoom.
    pub pixels_per_unit: f32,
    pub hit_radius: f32,
    pub snap_radius: f32,
    pub close_radius: f32,
    pub collision_radius: f32,
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub turn_speed: f32,
    /// Horizontal field of view in degrees.
    pub fov: f32,
    pub floor_z: f32,
    pub ceiling_z: f32,
    pub link_mode: LinkMode,
    pub save_units: UnitsKind,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            grid_step: 0.5,
            pixels_per_unit: 32.0,
            hit_radius: 0.2,
            snap_radius: 0.3,
            close_radius: 0.3,
            collision_radius: portalcaster::collision::COLLISION_RADIUS,
            move_speed: 3.0,
            turn_speed: std::f32::consts::PI,
            fov: 66.0,
            floor_z: DEFAULT_FLOOR_Z,
            ceiling_z: DEFAULT_CEILING_Z,
            link_mode: LinkMode::Overlap,
            save_units: UnitsKind::Grid,
        }
    }
}

impl UserConfig {
    /// Read the user config, falling back to defaults when there is no
    /// config dir at all.
    pub fn load() -> Self {
        match get_cfg_file() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!(target: LOG_TAG, "No user config dir, using defaults");
                Self::default()
            }
        }
    }

    /// A missing or unreadable file is recreated with defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(buf) if !buf.trim().is_empty() => {
                if let Ok(data) = toml::from_str(&buf) {
                    info!(target: LOG_TAG, "Loaded user config file");
                    return data;
                }
                warn!("Could not deserialise {:?} recreating config", path);
            }
            _ => {}
        }
        Self::create_default(path)
    }

    fn create_default(path: &Path) -> Self {
        let config = UserConfig::default();
        info!("Created default user config file");
        config.write_to(path);
        config
    }

    pub fn write_to(&self, path: &Path) {
        let data = match toml::to_string_pretty(self) {
            Ok(data) => data,
            Err(err) => {
                error!("Could not serialise config: {}", err);
                return;
            }
        };
        match fs::write(path, data) {
            Ok(()) => info!("Saved user config to {:?}", path),
            Err(err) => error!("Could not write config: {}", err),
        }
    }

    /// Apply CLI overrides for this run only. Nothing is written back.
    pub fn sync_cli(&mut self, cli: &CLIOptions) {
        info!("Checking CLI options");

        if let Some(units) = cli.units {
            if units != self.save_units {
                self.save_units = units;
                info!("Save units changed to: {:?}", units);
            }
        }

        if let Some(mode) = cli.link_mode {
            if mode != self.link_mode {
                self.link_mode = mode;
                info!("Link mode changed to: {:?}", mode);
            }
        }
    }

    pub fn map_units(&self) -> MapUnits {
        match self.save_units {
            UnitsKind::Grid => MapUnits::Grid(self.grid_step),
            UnitsKind::World => MapUnits::World,
        }
    }

    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            grid_step: self.grid_step,
            hit_radius: self.hit_radius,
            snap_radius: self.snap_radius,
            close_radius: self.close_radius,
            floor_z: self.floor_z,
            ceiling_z: self.ceiling_z,
            link_mode: self.link_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CLIOptions {
        use argh::FromArgs;
        CLIOptions::from_args(&["portalcaster"], args).unwrap()
    }

    #[test]
    fn defaults_are_usable() {
        let config = UserConfig::default();
        assert!(config.ceiling_z > config.floor_z);
        assert!(config.grid_step > 0.0);
        assert!(config.fov > 0.0 && config.fov < 180.0);
        assert!(config.snap_radius < config.grid_step);
        assert_eq!(config.map_units(), MapUnits::Grid(0.5));
        assert_eq!(config.editor_settings(), EditorSettings::default());
    }

    #[test]
    fn missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.toml");
        let config = UserConfig::load_from(&path);
        assert_eq!(config, UserConfig::default());
        assert!(path.exists());
        assert_eq!(UserConfig::load_from(&path), config);
    }

    #[test]
    fn garbage_is_replaced_and_partial_files_fill_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.toml");

        fs::write(&path, "width = [").unwrap();
        assert_eq!(UserConfig::load_from(&path), UserConfig::default());

        fs::write(&path, "grid_step = 1.0\nlink_mode = \"Exact\"\n").unwrap();
        let config = UserConfig::load_from(&path);
        assert_eq!(config.grid_step, 1.0);
        assert_eq!(config.link_mode, LinkMode::Exact);
        assert_eq!(config.width, 800);
    }

    #[test]
    fn cli_overrides_for_the_run() {
        let mut config = UserConfig::default();
        config.sync_cli(&cli(&["--units", "world", "--link-mode", "exact"]));
        assert_eq!(config.map_units(), MapUnits::World);
        assert_eq!(config.link_mode, LinkMode::Exact);

        let mut config = UserConfig::default();
        config.sync_cli(&cli(&["--edit", "level.txt"]));
        assert_eq!(config, UserConfig::default());
    }
}
