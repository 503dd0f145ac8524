//! # Orbit Controller
//!
//! Orbits the camera around a target point, driven by events drained from a
//! proxy entry. Input only accumulates pending motion; [`OrbitController::update`]
//! applies it once per frame.
//!
//! ## Gestures
//! - Primary button drag rotates; with ctrl, meta or shift it pans
//! - Middle button drag dollies
//! - Secondary button drag pans; with ctrl, meta or shift it rotates
//! - Wheel dollies one zoom step per event
//! - Arrow keys pan by `key_pan_speed` pixels
//! - One finger rotates, two fingers dolly and pan together
//!
//! Pointer events with `pointerType == "touch"` are ignored; touches arrive
//! as `touch*` events instead. Legacy `mouse*` events are ignored too.

use std::f32::consts::PI;

use cgmath::*;
use log::trace;

use super::camera::{Camera, Projection};
use crate::core::config::OrbitConfig;
use crate::engine_state::proxy::events::{KeyData, PointerData, TouchData, TouchPoint, WheelData};
use crate::engine_state::proxy::{ProxyEntry, ProxyEventData, ProxyId};

const EPS: f32 = 1e-6;

const KEY_LEFT: u32 = 37;
const KEY_UP: u32 = 38;
const KEY_RIGHT: u32 = 39;
const KEY_BOTTOM: u32 = 40;

/// Polar coordinates around +Y, as used by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y
    phi: f32,
    /// Azimuth around +Y, measured from +Z toward +X
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self { radius, phi: 0.0, theta: 0.0 };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keeps `phi` off the poles so the view basis stays defined.
    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    None,
    Rotate,
    Dolly,
    Pan,
    TouchRotate,
    TouchDollyPan,
}

/// Damped orbit camera control bound to one proxy entry.
#[derive(Debug, Clone)]
pub struct OrbitController {
    proxy_id: ProxyId,
    config: OrbitConfig,
    max_distance: f32,

    target: Point3<f32>,
    /// Pending (theta, phi) rotation
    spherical_delta: Vector2<f32>,
    scale: f32,
    pan_offset: Vector3<f32>,

    gesture: Gesture,
    active_pointer: Option<i64>,
    rotate_start: Vector2<f32>,
    pan_start: Vector2<f32>,
    dolly_start: Vector2<f32>,
}

impl OrbitController {
    /// Creates a controller orbiting the origin.
    ///
    /// # Arguments
    /// * `proxy_id` - Entry whose events drive the controller
    /// * `config` - Damping, limits and speeds
    /// * `grid_size` - Side of the displayed grid; sets the far distance limit
    pub fn new(proxy_id: ProxyId, config: &OrbitConfig, grid_size: usize) -> Self {
        Self {
            proxy_id,
            config: config.clone(),
            max_distance: config.max_distance(grid_size),
            target: Point3::origin(),
            spherical_delta: Vector2::zero(),
            scale: 1.0,
            pan_offset: Vector3::zero(),
            gesture: Gesture::None,
            active_pointer: None,
            rotate_start: Vector2::zero(),
            pan_start: Vector2::zero(),
            dolly_start: Vector2::zero(),
        }
    }

    /// The proxy entry this controller reads.
    pub fn proxy_id(&self) -> &ProxyId {
        &self.proxy_id
    }

    /// Point the camera orbits.
    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    /// Current far distance limit.
    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Adjusts the far distance limit for a new grid size.
    pub fn set_grid_size(&mut self, grid_size: usize) {
        self.max_distance = self.config.max_distance(grid_size);
    }

    /// Drops pending motion, recentres on the origin and adopts `grid_size`.
    pub fn reset(&mut self, grid_size: usize) {
        self.set_grid_size(grid_size);
        self.target = Point3::origin();
        self.spherical_delta = Vector2::zero();
        self.pan_offset = Vector3::zero();
        self.scale = 1.0;
        self.gesture = Gesture::None;
        self.active_pointer = None;
    }

    /// Drains and interprets every event queued on `entry`.
    ///
    /// # Arguments
    /// * `entry` - The proxy entry bound to this controller
    /// * `camera` - Current camera, used for pan directions
    /// * `projection` - Current projection, used for pan scale
    pub fn process_events(&mut self, entry: &mut ProxyEntry, camera: &Camera, projection: &Projection) {
        let client_height = entry.client_height();
        let events: Vec<ProxyEventData> = entry.drain().collect();
        for event in &events {
            self.handle_event(event, camera, projection, client_height);
        }
    }

    /// Interprets one event.
    ///
    /// # Arguments
    /// * `event` - Forwarded event
    /// * `camera` - Current camera
    /// * `projection` - Current projection
    /// * `client_height` - Height of the proxied element in pixels
    pub fn handle_event(
        &mut self,
        event: &ProxyEventData,
        camera: &Camera,
        projection: &Projection,
        client_height: f32,
    ) {
        trace!("Orbit event {}", event.kind());
        match event {
            ProxyEventData::PointerDown(data) => self.on_pointer_down(data),
            ProxyEventData::PointerMove(data) => {
                self.on_pointer_move(data, camera, projection, client_height)
            }
            ProxyEventData::PointerUp(data) | ProxyEventData::PointerCancel(data) => {
                self.on_pointer_up(data)
            }
            ProxyEventData::Wheel(data) => self.on_wheel(data),
            ProxyEventData::KeyDown(data) => self.on_key_down(data, camera, projection, client_height),
            ProxyEventData::TouchStart(data) => self.on_touch_start(data),
            ProxyEventData::TouchMove(data) => {
                self.on_touch_move(data, camera, projection, client_height)
            }
            ProxyEventData::TouchEnd(_) => self.gesture = Gesture::None,
            _ => {}
        }
    }

    /// Applies pending motion to `camera`.
    ///
    /// # Returns
    /// `true` if the camera moved
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let last_position = camera.position;

        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        let step = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.spherical_delta.x * step;
        spherical.phi += self.spherical_delta.y * step;
        spherical.phi = spherical.phi.clamp(0.0, self.config.max_polar_angle);
        spherical.make_safe();

        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.config.min_distance, self.max_distance.max(self.config.min_distance));

        self.target += self.pan_offset * step;

        camera.target = self.target;
        camera.position = self.target + spherical.to_offset();

        if self.config.enable_damping {
            self.spherical_delta *= 1.0 - self.config.damping_factor;
            self.pan_offset *= 1.0 - self.config.damping_factor;
        } else {
            self.spherical_delta = Vector2::zero();
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        (camera.position - last_position).magnitude2() > EPS
    }

    fn on_pointer_down(&mut self, data: &PointerData) {
        if data.pointer_type == "touch" || self.active_pointer.is_some() {
            return;
        }
        let point = Vector2::new(data.client_x, data.client_y);
        let modified = data.ctrl_key || data.meta_key || data.shift_key;
        self.gesture = match (data.button, modified) {
            (0, false) | (2, true) => {
                self.rotate_start = point;
                Gesture::Rotate
            }
            (0, true) | (2, false) => {
                self.pan_start = point;
                Gesture::Pan
            }
            (1, _) => {
                self.dolly_start = point;
                Gesture::Dolly
            }
            _ => Gesture::None,
        };
        if self.gesture != Gesture::None {
            self.active_pointer = Some(data.pointer_id);
        }
    }

    fn on_pointer_move(
        &mut self,
        data: &PointerData,
        camera: &Camera,
        projection: &Projection,
        client_height: f32,
    ) {
        if data.pointer_type == "touch" || self.active_pointer != Some(data.pointer_id) {
            return;
        }
        let point = Vector2::new(data.client_x, data.client_y);
        match self.gesture {
            Gesture::Rotate => {
                let delta = (point - self.rotate_start) * self.config.rotate_speed;
                self.rotate_by_pixels(delta, client_height);
                self.rotate_start = point;
            }
            Gesture::Dolly => {
                let delta = point - self.dolly_start;
                if delta.y > 0.0 {
                    self.dolly_out(self.zoom_scale());
                } else if delta.y < 0.0 {
                    self.dolly_in(self.zoom_scale());
                }
                self.dolly_start = point;
            }
            Gesture::Pan => {
                let delta = (point - self.pan_start) * self.config.pan_speed;
                self.pan(delta, camera, projection, client_height);
                self.pan_start = point;
            }
            _ => {}
        }
    }

    fn on_pointer_up(&mut self, data: &PointerData) {
        if self.active_pointer == Some(data.pointer_id) {
            self.active_pointer = None;
            self.gesture = Gesture::None;
        }
    }

    fn on_wheel(&mut self, data: &WheelData) {
        if self.gesture != Gesture::None {
            return;
        }
        if data.delta_y < 0.0 {
            self.dolly_in(self.zoom_scale());
        } else if data.delta_y > 0.0 {
            self.dolly_out(self.zoom_scale());
        }
    }

    fn on_key_down(&mut self, data: &KeyData, camera: &Camera, projection: &Projection, client_height: f32) {
        let speed = self.config.key_pan_speed;
        let delta = match data.key_code {
            KEY_UP => Vector2::new(0.0, speed),
            KEY_BOTTOM => Vector2::new(0.0, -speed),
            KEY_LEFT => Vector2::new(speed, 0.0),
            KEY_RIGHT => Vector2::new(-speed, 0.0),
            _ => return,
        };
        self.pan(delta, camera, projection, client_height);
    }

    fn on_touch_start(&mut self, data: &TouchData) {
        match data.touches.as_slice() {
            [only] => {
                self.rotate_start = Vector2::new(only.page_x, only.page_y);
                self.gesture = Gesture::TouchRotate;
            }
            [first, second, ..] => {
                self.dolly_start = Vector2::new(0.0, touch_distance(first, second));
                self.pan_start = touch_midpoint(first, second);
                self.gesture = Gesture::TouchDollyPan;
            }
            [] => self.gesture = Gesture::None,
        }
    }

    fn on_touch_move(&mut self, data: &TouchData, camera: &Camera, projection: &Projection, client_height: f32) {
        match (self.gesture, data.touches.as_slice()) {
            (Gesture::TouchRotate, [only, ..]) => {
                let point = Vector2::new(only.page_x, only.page_y);
                let delta = (point - self.rotate_start) * self.config.rotate_speed;
                self.rotate_by_pixels(delta, client_height);
                self.rotate_start = point;
            }
            (Gesture::TouchDollyPan, [first, second, ..]) => {
                let distance = touch_distance(first, second);
                if self.dolly_start.y > 0.0 && distance > 0.0 {
                    self.dolly_out((distance / self.dolly_start.y).powf(self.config.zoom_speed));
                }
                self.dolly_start = Vector2::new(0.0, distance);

                let midpoint = touch_midpoint(first, second);
                let delta = (midpoint - self.pan_start) * self.config.pan_speed;
                self.pan(delta, camera, projection, client_height);
                self.pan_start = midpoint;
            }
            _ => {}
        }
    }

    fn rotate_by_pixels(&mut self, delta: Vector2<f32>, client_height: f32) {
        if client_height <= 0.0 {
            return;
        }
        self.spherical_delta.x -= 2.0 * PI * delta.x / client_height;
        self.spherical_delta.y -= 2.0 * PI * delta.y / client_height;
    }

    fn zoom_scale(&self) -> f32 {
        0.95_f32.powf(self.config.zoom_speed)
    }

    fn dolly_in(&mut self, dolly_scale: f32) {
        self.scale *= dolly_scale;
    }

    fn dolly_out(&mut self, dolly_scale: f32) {
        self.scale /= dolly_scale;
    }

    /// Pans by a pixel delta; a full element height moves the target by the
    /// visible height at the target's distance.
    fn pan(&mut self, delta: Vector2<f32>, camera: &Camera, projection: &Projection, client_height: f32) {
        if client_height <= 0.0 {
            return;
        }
        let target_distance = (camera.position - self.target).magnitude() * (projection.fovy() / 2.0).tan();

        let right = camera.right();
        self.pan_offset += right * (-2.0 * delta.x * target_distance / client_height);

        let up = if self.config.screen_space_panning {
            camera.screen_up()
        } else {
            camera.up.cross(right)
        };
        self.pan_offset += up * (2.0 * delta.y * target_distance / client_height);
    }
}

fn touch_distance(a: &TouchPoint, b: &TouchPoint) -> f32 {
    Vector2::new(a.page_x - b.page_x, a.page_y - b.page_y).magnitude()
}

fn touch_midpoint(a: &TouchPoint, b: &TouchPoint) -> Vector2<f32> {
    Vector2::new((a.page_x + b.page_x) * 0.5, (a.page_y + b.page_y) * 0.5)
}
