// lidar_sim/src/cli.rs

use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Lidar scan simulator.
///
/// Command-line arguments shared by every binary that runs the simulation.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/lidar_room.toml")]
    pub scenario: PathBuf,

    /// Run the simulation in headless mode (without a graphical window).
    #[arg(long, default_value_t = false)]
    pub headless: bool,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            scenario: PathBuf::from("assets/scenarios/lidar_room.toml"),
            headless: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_and_headless_flags() {
        let cli = Cli::parse_from(["lidar_room", "--scenario", "foo.toml", "--headless"]);
        assert_eq!(cli.scenario, PathBuf::from("foo.toml"));
        assert!(cli.headless);
    }

    #[test]
    fn defaults_match_parser_defaults() {
        let parsed = Cli::parse_from(["lidar_room"]);
        let default = Cli::default();
        assert_eq!(parsed.scenario, default.scenario);
        assert_eq!(parsed.headless, default.headless);
    }
}
