// lidar_sim/src/simulation/plugins/mod.rs

pub mod sensors;
pub mod world;
