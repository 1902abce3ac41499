use std::path::PathBuf;

use argh::FromArgs;
use portalcaster::editor::LinkMode;

use crate::config::UnitsKind;

/// Sector and portal level editor with a raycast preview
#[derive(Debug, Clone, FromArgs)]
pub struct CLIOptions {
    /// verbose level: off, error, warn, info, debug
    #[argh(option)]
    pub verbose: Option<log::LevelFilter>,
    /// start in the editor instead of walking the level
    #[argh(switch)]
    pub edit: bool,
    /// coordinate encoding used when saving <grid, world>
    #[argh(option)]
    pub units: Option<UnitsKind>,
    /// how a closed sector finds its neighbours <overlap, exact>
    #[argh(option)]
    pub link_mode: Option<LinkMode>,
    /// map file to load, also the save target
    #[argh(positional)]
    pub map: Option<PathBuf>,
}
