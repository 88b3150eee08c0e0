// lidar_core/src/lib.rs

//! Simulated lidar: scan geometry, ray-to-range resampling and the sensor
//! lifecycle, independent of any particular physics or rendering engine.

pub mod callbacks;
pub mod config;
pub mod error;
pub mod grid;
pub mod messages;
pub mod noise;
pub mod perception;
pub mod prelude;
pub mod resample;
pub mod scan;
pub mod sensor;
pub mod transport;
