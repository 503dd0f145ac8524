//! # Camera State Management
//!
//! This module handles all camera-related functionality including:
//! - Camera position and orientation tracking
//! - View and projection matrix calculations
//! - Orbit control driven by forwarded proxy events
//!
//! ## Core Components
//! - `Camera`: Represents the camera's position and look-at target in 3D space
//! - `Projection`: Manages the camera's projection matrix
//! - `OrbitController`: Turns pointer, wheel, key and touch events into damped orbit motion

pub mod camera;
pub mod orbit;

pub use camera::{Camera, Projection};
pub use orbit::OrbitController;
