//! Local and world transforms.
//!
//! The engine stores 4x4 matrices row-major with translation in the last row
//! (row-vector convention). glam uses column vectors, so a [`Transform`] keeps
//! the engine's rows as glam columns: the engine's M41..M43 become glam's
//! `w_axis` and the matrix reads as an ordinary glam transform.

use glam::{Mat4, Quat, Vec3};

/// A 4x4 affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(Mat4);

/// Scale, rotation and translation extracted from a [`Transform`].
///
/// Shear and projective terms are lost; this view is for display only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    /// Build from sixteen floats in engine row-major order (M11..M44).
    #[inline]
    pub fn from_rows_array(m: &[f32; 16]) -> Self {
        Self(Mat4::from_cols_array(m))
    }

    /// Sixteen floats in engine row-major order (M11..M44).
    #[inline]
    pub fn to_rows_array(&self) -> [f32; 16] {
        self.0.to_cols_array()
    }

    /// A pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self(Mat4::from_translation(translation))
    }

    /// Wrap a glam matrix.
    pub const fn from_mat4(mat: Mat4) -> Self {
        Self(mat)
    }

    /// The underlying glam matrix.
    pub const fn as_mat4(&self) -> &Mat4 {
        &self.0
    }

    /// The translation (engine M41, M42, M43).
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    /// Replace the translation, leaving M44 untouched.
    #[inline]
    pub fn set_translation(&mut self, translation: Vec3) {
        self.0.w_axis = translation.extend(self.0.w_axis.w);
    }

    /// Compose a local transform with its parent's world transform.
    ///
    /// The parent applies first and the local transform second, which in the
    /// engine's row-vector form is `local * parent_world`.
    #[inline]
    pub fn compose(local: &Transform, parent_world: &Transform) -> Transform {
        Self(parent_world.0 * local.0)
    }

    /// Split into scale, rotation and translation.
    pub fn decompose(&self) -> Decomposed {
        let (scale, rotation, translation) = self.0.to_scale_rotation_translation();
        Decomposed {
            scale,
            rotation,
            translation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = self.decompose();
        write!(
            f,
            "scale: [{} {} {}] rotation: [x: {} y: {} z: {} w: {}] translation: [{} {} {}]",
            d.scale.x,
            d.scale.y,
            d.scale.z,
            d.rotation.x,
            d.rotation.y,
            d.rotation.z,
            d.rotation.w,
            d.translation.x,
            d.translation.y,
            d.translation.z
        )
    }
}
