// lidar_sim/src/simulation/core/events.rs
use bevy::prelude::Event;
// Import the pure message struct from the core library
use lidar_core::messages::LaserScan;

/// The Bevy-side wrapper of a published `LaserScan`.
#[derive(Event, Clone, Debug)]
pub struct LaserScanEvent(pub LaserScan);
