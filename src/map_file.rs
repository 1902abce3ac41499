//! Plain-text map format.
//!
//! ```text
//! # units grid 1
//! <sector> <wall count> <floor> <ceiling>
//! <x1> <y1> <x2> <y2> <portal 0|1> <adjoining sector or -1>
//! ```
//!
//! Sectors are separated by a blank line. The optional `# units` line picks
//! the coordinate encoding: `grid <step>` stores integers in grid steps,
//! `world` (the default when the line is missing) stores raw floats.

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glam::vec2;
use log::{info, warn};

use crate::world::{Sector, Wall, World};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapUnits {
    /// Integer coordinates, multiplied by the step on load.
    Grid(f32),
    World,
}

impl MapUnits {
    fn header(&self) -> String {
        match self {
            MapUnits::Grid(step) => format!("# units grid {step}"),
            MapUnits::World => "# units world".to_string(),
        }
    }

    fn encode(&self, v: f32) -> String {
        match self {
            MapUnits::Grid(step) => format!("{}", (v / step).round() as i32),
            MapUnits::World => format!("{v}"),
        }
    }

    fn decode(&self, token: &str) -> Option<f32> {
        match self {
            MapUnits::Grid(step) => token.parse::<i32>().ok().map(|g| g as f32 * step),
            MapUnits::World => token.parse::<f32>().ok(),
        }
    }
}

#[derive(Debug)]
pub enum MapError {
    /// The file could not be opened, read or written.
    Io { path: PathBuf, source: std::io::Error },
    Malformed { line: usize, reason: String },
    /// The file ended inside a sector's wall list.
    UnexpectedEof { line: usize },
}

impl Error for MapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MapError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            MapError::Malformed { line, reason } => write!(f, "line {line}: {reason}"),
            MapError::UnexpectedEof { line } => {
                write!(f, "line {line}: unexpected end of file reading walls")
            }
        }
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> MapError {
    MapError::Malformed {
        line,
        reason: reason.into(),
    }
}

fn field<T: FromStr>(tokens: &[&str], i: usize, line: usize, what: &str) -> Result<T, MapError> {
    tokens
        .get(i)
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| malformed(line, format!("bad {what}")))
}

fn parse_units(tokens: &[&str], line: usize) -> Result<Option<MapUnits>, MapError> {
    match tokens {
        ["units", "world"] => Ok(Some(MapUnits::World)),
        ["units", "grid", step] => match step.parse::<f32>() {
            Ok(step) if step > 0.0 => Ok(Some(MapUnits::Grid(step))),
            _ => Err(malformed(line, "bad grid step")),
        },
        ["units", ..] => Err(malformed(line, "unknown units")),
        _ => Ok(None),
    }
}

fn parse_wall(text: &str, line: usize, units: MapUnits) -> Result<Wall, MapError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(malformed(line, "wall needs 6 fields"));
    }

    let coord = |i: usize| {
        units
            .decode(tokens[i])
            .ok_or_else(|| malformed(line, format!("bad coordinate {:?}", tokens[i])))
    };
    let start = vec2(coord(0)?, coord(1)?);
    let end = vec2(coord(2)?, coord(3)?);
    let portal: i32 = field(&tokens, 4, line, "portal flag")?;
    let adjoining: i64 = field(&tokens, 5, line, "adjoining sector")?;

    let is_portal = portal != 0;
    Ok(Wall {
        start,
        end,
        is_portal,
        adjoining: if is_portal && adjoining >= 0 {
            Some(adjoining as usize)
        } else {
            None
        },
    })
}

/// Parse map text. Returns the world and the encoding the file declared.
pub fn parse_map(text: &str) -> Result<(World, MapUnits), MapError> {
    let mut units = MapUnits::World;
    let mut world = World::new();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    while let Some((line, header)) = lines.next() {
        if header.is_empty() {
            continue;
        }
        if let Some(comment) = header.strip_prefix('#') {
            let tokens: Vec<&str> = comment.split_whitespace().collect();
            if let Some(declared) = parse_units(&tokens, line)? {
                units = declared;
            }
            continue;
        }

        let tokens: Vec<&str> = header.split_whitespace().collect();
        let _index: i64 = field(&tokens, 0, line, "sector index")?;
        let wall_count: usize = field(&tokens, 1, line, "wall count")?;
        let floor_z: f32 = field(&tokens, 2, line, "floor height")?;
        let ceiling_z: f32 = field(&tokens, 3, line, "ceiling height")?;
        if ceiling_z <= floor_z {
            return Err(malformed(line, "ceiling must be above floor"));
        }

        // The count is untrusted, a short file ends in UnexpectedEof
        let mut walls = Vec::new();
        for _ in 0..wall_count {
            let Some((wall_line, text)) = lines.next() else {
                return Err(MapError::UnexpectedEof { line });
            };
            walls.push(parse_wall(text, wall_line, units)?);
        }

        world.sectors.push(Sector {
            walls,
            floor_z,
            ceiling_z,
        });
    }

    Ok((world, units))
}

/// Serialize `world` in the given encoding.
pub fn write_map(world: &World, units: MapUnits) -> String {
    let mut out = String::new();
    out.push_str(&units.header());
    out.push('\n');

    for (i, sector) in world.sectors.iter().enumerate() {
        out.push_str(&format!(
            "{i} {} {} {}\n",
            sector.walls.len(),
            sector.floor_z,
            sector.ceiling_z
        ));
        for wall in &sector.walls {
            let adjoining = match wall.adjoining {
                Some(adj) if wall.is_portal => adj as i64,
                _ => -1,
            };
            out.push_str(&format!(
                "{} {} {} {} {} {adjoining}\n",
                units.encode(wall.start.x),
                units.encode(wall.start.y),
                units.encode(wall.end.x),
                units.encode(wall.end.y),
                wall.is_portal as u8,
            ));
        }
        out.push('\n');
    }
    out
}

pub fn load_map(path: &Path) -> Result<(World, MapUnits), MapError> {
    let text = fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (world, units) = parse_map(&text)?;

    let dangling = world.dangling_portals();
    if !dangling.is_empty() {
        warn!(
            "{}: {} portal walls name missing sectors",
            path.display(),
            dangling.len()
        );
    }
    info!(
        "Loaded map from {} with {} sectors, {} walls",
        path.display(),
        world.sectors.len(),
        world.wall_count()
    );
    Ok((world, units))
}

pub fn save_map(path: &Path, world: &World, units: MapUnits) -> Result<(), MapError> {
    fs::write(path, write_map(world, units)).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Map saved to {}", path.display());
    Ok(())
}
