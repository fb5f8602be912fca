use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::{GeometryError, Result};
use crate::geometry::curve::Arc;
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDomain};

/// A spherical surface around the Z axis.
///
/// `u` is longitude in `[0, 2*pi]`, `v` latitude in `[-pi/2, pi/2]`, and the
/// normal points away from the center.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive.
    pub fn new(center: Point3, radius: f64) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("sphere radius must be positive".into()).into(),
            );
        }
        Ok(Self { center, radius })
    }

    /// Returns the center of the sphere.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The seam meridian at `u = 0`, running from the south to the north pole.
    ///
    /// # Errors
    ///
    /// Returns an error if the arc cannot be constructed.
    pub fn seam(&self) -> Result<Arc> {
        Arc::new(
            self.center,
            self.radius,
            -Vector3::y(),
            Vector3::x(),
            -FRAC_PI_2,
            FRAC_PI_2,
        )
    }
}

impl Surface for Sphere {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let n = self.normal(u, v)?;
        Ok(self.center + n * self.radius)
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let (cv, sv) = (v.cos(), v.sin());
        Ok(Vector3::new(cv * u.cos(), cv * u.sin(), sv))
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, TAU, -FRAC_PI_2, FRAC_PI_2)
    }
}
