//! Perspective camera and orbit controls.
//!
//! The camera always looks at a target point. [`OrbitControls`] moves it on a
//! sphere around that target: left-drag rotates, the wheel dollies, and the
//! motion eases out over a few frames (damping).

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle off the poles, where `look_at` degenerates.
const POLAR_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(eye: P, target: P) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// View and projection as the shaders see them.
///
/// The firefly program needs view space on its own to size points by depth,
/// so the two matrices are uploaded next to their product.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        let view = camera.calc_matrix();
        let proj = projection.calc_matrix();
        self.view = view.into();
        self.proj = proj.into();
        self.view_proj = (proj * view).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Spherical coordinates around the target: `theta` around +y starting at +z,
/// `phi` down from +y.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    theta: f32,
    phi: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                theta: 0.0,
                phi: 0.0,
            };
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
}

/// Orbit controls with optional damping.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl OrbitControls {
    pub fn new(damping_factor: f32) -> Self {
        Self {
            enable_damping: true,
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            dragging: false,
            last_cursor: None,
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Multiplies the orbit radius on the next update; below 1 moves closer.
    pub fn dolly(&mut self, factor: f32) {
        self.scale *= factor;
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Feeds mouse input. `viewport_height` is in the same pixels as the cursor
    /// positions. Returns whether the event was used.
    pub fn handle_window_event(&mut self, event: &WindowEvent, viewport_height: f32) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                let used = match (self.dragging, self.last_cursor) {
                    (true, Some((x, y))) => {
                        let height = viewport_height.max(1.0);
                        let dx = (current.0 - x) as f32 * self.rotate_speed;
                        let dy = (current.1 - y) as f32 * self.rotate_speed;
                        self.rotate_left(2.0 * PI * dx / height);
                        self.rotate_up(2.0 * PI * dy / height);
                        true
                    }
                    _ => false,
                };
                self.last_cursor = Some(current);
                used
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let direction = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as f64,
                    MouseScrollDelta::PixelDelta(position) => position.y,
                };
                if direction > 0.0 {
                    self.dolly(self.zoom_scale());
                } else if direction < 0.0 {
                    self.dolly(1.0 / self.zoom_scale());
                }
                direction != 0.0
            }
            _ => false,
        }
    }

    /// Applies pending rotation and dolly to the camera. Call once per frame.
    pub fn update(&mut self, camera: &mut Camera) {
        let mut spherical = Spherical::from_offset(camera.eye - camera.target);

        if self.enable_damping {
            spherical.theta += self.delta_theta * self.damping_factor;
            spherical.phi += self.delta_phi * self.damping_factor;
        } else {
            spherical.theta += self.delta_theta;
            spherical.phi += self.delta_phi;
        }
        spherical.phi = spherical.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.eye = camera.target + spherical.to_offset();

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use cgmath::MetricSpace;
    use winit::dpi::PhysicalPosition;

    use super::*;

    fn camera() -> Camera {
        Camera::new((4.0, 2.0, 4.0), (0.0, 0.0, 0.0))
    }

    #[test]
    fn idle_controls_leave_the_camera_in_place() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(0.05);
        for _ in 0..10 {
            controls.update(&mut camera);
        }
        assert!(camera.eye.distance(Point3::new(4.0, 2.0, 4.0)) < 1e-4);
    }

    #[test]
    fn damped_rotation_eases_towards_the_full_angle() {
        let mut camera = camera();
        let start = Spherical::from_offset(camera.eye - camera.target);
        let mut controls = OrbitControls::new(0.05);
        controls.rotate_left(-0.5);

        controls.update(&mut camera);
        let first = Spherical::from_offset(camera.eye - camera.target);
        assert!((first.theta - start.theta - 0.025).abs() < 1e-4);

        for _ in 0..500 {
            controls.update(&mut camera);
        }
        let settled = Spherical::from_offset(camera.eye - camera.target);
        assert!((settled.theta - start.theta - 0.5).abs() < 1e-3);
        assert!((settled.radius - 6.0).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_never_flips_over_the_top() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(0.05);
        controls.enable_damping = false;
        controls.rotate_up(10.0);
        controls.update(&mut camera);
        assert!(camera.eye.y <= 6.0 + 1e-4);
        assert!(camera.eye.y > 5.9);
    }

    #[test]
    fn wheel_up_moves_closer() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(0.05);
        let used = controls.handle_window_event(
            &WindowEvent::MouseWheel {
                device_id: winit::event::DeviceId::dummy(),
                delta: MouseScrollDelta::LineDelta(0.0, 1.0),
                phase: winit::event::TouchPhase::Moved,
            },
            600.0,
        );
        assert!(used);
        controls.update(&mut camera);
        assert!((camera.eye.distance(camera.target) - 6.0 * 0.95).abs() < 1e-4);
    }

    #[test]
    fn cursor_motion_without_a_drag_does_not_rotate() {
        let mut controls = OrbitControls::new(0.05);
        let moved = |x: f64| WindowEvent::CursorMoved {
            device_id: winit::event::DeviceId::dummy(),
            position: PhysicalPosition::new(x, 0.0),
        };
        assert!(!controls.handle_window_event(&moved(0.0), 600.0));
        assert!(!controls.handle_window_event(&moved(100.0), 600.0));
        assert_eq!(controls.delta_theta, 0.0);
    }

    #[test]
    fn projection_aspect_follows_resize() {
        let mut projection = Projection::new(100, 100, cgmath::Deg(45.0), 0.1, 100.0);
        projection.resize(800, 600);
        assert!((projection.aspect - 800.0 / 600.0).abs() < 1e-6);
    }
}
