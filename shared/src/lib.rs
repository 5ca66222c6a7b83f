//! Shared components and utilities for the beam aiming station.
//!
//! This crate contains the device abstractions, image-processing primitives
//! and storage helpers that the measurement core and the station binary both
//! depend on, so neither has to reach into the other.

pub mod camera_interface;
pub mod config_storage;
pub mod image_proc;
pub mod latest;
