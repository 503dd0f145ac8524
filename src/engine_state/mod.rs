//! # Engine State Module
//!
//! Everything that lives on the worker side of the host/worker boundary.
//!
//! ## Key Components
//!
//! * `camera_state` - Camera, projection and the orbit controller
//! * `proxy` - Registry of virtual input surfaces fed by forwarded events
//! * `rendering` - Face-culling mesher, scene host and render backends
//! * `scripting` - The embedded interpreter behind the `ScriptEvaluator` trait
//! * `voxels` - Voxel grid, cell colors and script-driven population
//! * `worker` - Message protocol, controller state machine and thread handle
//!
//! ## Architecture
//!
//! The `WorkerController` owns one `WorkerState` (grid, evaluator, scene and
//! render loop) created by `start` and released by `terminate`. Input events
//! only ever reach the proxy registry and the orbit controller; script runs
//! only ever touch the grid and, through the mesher, the scene's single mesh.

pub mod camera_state;
pub mod proxy;
pub mod rendering;
pub mod scripting;
pub mod voxels;
pub mod worker;
