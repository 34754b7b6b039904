//! Per-frame simulation state as a pure function of elapsed time.
//!
//! The demo scene animates two transparent objects oscillating across the
//! view axis while their alpha breathes between fully transparent and fully
//! opaque. Keeping this a plain function of time (no graphics state) means
//! the same values feed every draw of a frame, and the motion can be unit
//! tested without a GPU.

use glam::{Mat4, Vec3};

/// Depth at which the demo objects sit in front of the camera.
const SCENE_Z: f32 = -4.0;

/// Frequency of the horizontal oscillation, in radians per second.
const SWAY_RATE: f32 = 1.12593;

/// Transforms and alpha for one frame of the demo scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneMotion {
    /// Transform for the opaque model, offset forward and to the right so
    /// the transparent geometry passes in front of it.
    pub opaque: Mat4,
    /// Transform for the transparent model.
    pub transparent: Mat4,
    /// Transform for the second transparent object, mirrored about the view
    /// axis. Only the x translation is negated; orientation is untouched.
    pub mirrored: Mat4,
    /// Transparency of both transparent objects, in [0, 1].
    pub alpha: f32,
}

/// Computes the demo scene's per-frame state for the given elapsed time.
pub fn scene_motion(time: f32) -> SceneMotion {
    let x = (time * SWAY_RATE).cos();
    let alpha = (time.sin() + 1.0) / 2.0;

    SceneMotion {
        opaque: Mat4::from_translation(Vec3::new(0.25, 0.0, SCENE_Z + 0.5)),
        transparent: Mat4::from_translation(Vec3::new(x, 0.0, SCENE_Z)),
        mirrored: Mat4::from_translation(Vec3::new(-x, 0.0, SCENE_Z)),
        alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_stays_in_unit_interval() {
        for i in 0..1000 {
            let m = scene_motion(i as f32 * 0.037);
            assert!(
                m.alpha >= 0.0 && m.alpha <= 1.0,
                "alpha {} out of range",
                m.alpha
            );
        }
    }

    #[test]
    fn mirrored_negates_x_translation_only() {
        let m = scene_motion(1.7);
        let t = m.transparent.w_axis;
        let mir = m.mirrored.w_axis;
        assert_eq!(mir.x, -t.x);
        assert_eq!(mir.y, t.y);
        assert_eq!(mir.z, t.z);
        // Rotation/scale part stays identity on both.
        assert_eq!(m.transparent.x_axis, glam::Vec4::X);
        assert_eq!(m.mirrored.x_axis, glam::Vec4::X);
    }

    #[test]
    fn opaque_transform_is_static() {
        let a = scene_motion(0.0);
        let b = scene_motion(12.5);
        assert_eq!(a.opaque, b.opaque);
        assert_eq!(
            a.opaque.w_axis.truncate(),
            Vec3::new(0.25, 0.0, SCENE_Z + 0.5)
        );
    }

    #[test]
    fn motion_is_deterministic() {
        assert_eq!(scene_motion(3.25), scene_motion(3.25));
    }
}
