//! Pinhole camera frame for primary ray generation.
//!
//! The frame is rebuilt for every render call from the render config and
//! the trackball orientation. Pixel `(x, y)` maps to the image-plane point
//! `corner + x * u + y * v`; row 0 is the top of the image.

use crate::{RenderConfig, RenderError, RenderResult};
use facetrace_math::{Mat4, Quat, Ray, Vec3};

/// Smallest eye to look-at distance accepted as a valid view.
const MIN_VIEW_DISTANCE: f32 = 1.0e-6;

/// Ray origin plus image-plane basis, all in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Ray origin (effective eye position)
    pub origin: Vec3,
    /// World position of pixel (0, 0)'s corner
    pub corner: Vec3,
    /// One pixel step along the image row
    pub u: Vec3,
    /// One pixel step down the image column
    pub v: Vec3,
}

impl CameraFrame {
    /// Build the camera frame.
    ///
    /// The orientation rotates the view about the eye. Only the eye to
    /// look-at distance is taken from `look_at`: the view starts along the
    /// canonical -Z axis and the inverse orientation turns it from there.
    /// The image plane sits at the focal length implied by the vertical
    /// field of view, measured in pixels.
    pub fn build(
        orientation: Quat,
        eye: Vec3,
        look_at: Vec3,
        up: Vec3,
        fov: f32,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(invalid(format!("image size {width}x{height}")));
        }
        if !(fov > 0.0 && fov < 180.0) {
            return Err(invalid(format!("field of view {fov} outside (0, 180)")));
        }
        if !(eye.is_finite() && look_at.is_finite() && up.is_finite() && orientation.is_finite()) {
            return Err(invalid("non-finite camera parameters".to_string()));
        }

        let dist = eye.distance(look_at);
        if dist <= MIN_VIEW_DISTANCE {
            return Err(invalid(format!("eye {eye} coincides with look-at {look_at}")));
        }

        let rotation = Mat4::from_quat(orientation.normalize()).inverse();
        let canonical_eye = Vec3::new(0.0, 0.0, dist);
        let local = Mat4::look_at_rh(canonical_eye, Vec3::ZERO, Vec3::Y).inverse();
        let translate = Mat4::from_translation(eye - canonical_eye);
        let m = translate * local * rotation;

        let eye1 = m.transform_point3(Vec3::ZERO);
        let look_at1 = m.transform_point3(Vec3::new(0.0, 0.0, -dist));
        let up1 = m.transform_vector3(up);
        let look = look_at1 - eye1;

        let u = look
            .cross(up1)
            .try_normalize()
            .ok_or_else(|| invalid(format!("up vector {up} is parallel to the view direction")))?;
        let v = look.cross(u).normalize();

        let flen = 0.5 * height as f32 / (0.5 * fov.to_radians()).tan();
        let center = eye1 + flen * look.normalize();
        let corner = center - 0.5 * (width as f32 * u + height as f32 * v);

        Ok(Self {
            origin: eye1,
            corner,
            u,
            v,
        })
    }

    /// Build the frame for a render config.
    pub fn from_config(config: &RenderConfig, orientation: Quat) -> RenderResult<Self> {
        Self::build(
            orientation,
            config.eye,
            config.look_at,
            config.up,
            config.fov,
            config.width,
            config.height,
        )
    }

    /// Ray from the origin through image-plane point `(px, py)`, in pixel units.
    #[inline]
    pub fn ray_through(&self, px: f32, py: f32) -> Ray {
        let target = self.corner + px * self.u + py * self.v;
        Ray::new(self.origin, (target - self.origin).normalize())
    }
}

fn invalid(reason: String) -> RenderError {
    RenderError::InvalidCameraGeometry(reason)
}
