//! Reference ellipsoid and local orbit-relative bases

use crate::core::linalg::{Mat3, Vec3};
use crate::types::{SarError, SarResult, EARTH_ECC2, EARTH_SEMI_MAJOR_AXIS};
use serde::{Deserialize, Serialize};

/// Geodetic coordinates: longitude and latitude in radians, height in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Llh {
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
}

impl Llh {
    pub const fn new(lon: f64, lat: f64, height: f64) -> Self {
        Self { lon, lat, height }
    }

    /// Construct from degrees (lon, lat) and meters
    pub fn from_degrees(lon_deg: f64, lat_deg: f64, height: f64) -> Self {
        Self::new(lon_deg.to_radians(), lat_deg.to_radians(), height)
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon.to_degrees()
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat.to_degrees()
    }
}

/// Orthonormal tangent / cross-track / normal frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub tangent: Vec3,
    pub cross: Vec3,
    pub normal: Vec3,
}

impl Basis {
    /// Build the frame from a normal and a velocity:
    /// cross = unit(normal x velocity), tangent = unit(cross x normal).
    pub fn from_normal(normal: Vec3, velocity: Vec3) -> Self {
        let cross = normal.cross(velocity).unit();
        let tangent = cross.cross(normal).unit();
        Self { tangent, cross, normal }
    }

    /// Geocentric TCN frame whose normal points from the platform to the Earth center.
    pub fn geocentric(position: Vec3, velocity: Vec3) -> Self {
        Self::from_normal(-position.unit(), velocity)
    }

    /// Matrix with tangent, cross and normal as columns (TCN -> ECEF)
    pub fn to_matrix(&self) -> Mat3 {
        Mat3::from_columns(self.tangent, self.cross, self.normal)
    }

    /// Components of an ECEF vector along (tangent, cross, normal)
    pub fn project(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.cross), v.dot(self.normal))
    }
}

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    a: f64,
    e2: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Ellipsoid {
    /// Create an ellipsoid from semi-major axis (m) and squared eccentricity
    pub fn new(a: f64, e2: f64) -> SarResult<Self> {
        if !(a > 0.0) || !a.is_finite() {
            return Err(SarError::InvalidParameter(format!(
                "ellipsoid semi-major axis must be positive, got {}",
                a
            )));
        }
        if !(0.0..1.0).contains(&e2) {
            return Err(SarError::InvalidParameter(format!(
                "ellipsoid squared eccentricity must be in [0, 1), got {}",
                e2
            )));
        }
        Ok(Self { a, e2 })
    }

    pub const fn wgs84() -> Self {
        Self {
            a: EARTH_SEMI_MAJOR_AXIS,
            e2: EARTH_ECC2,
        }
    }

    /// Sphere of the given radius (used for SCH conversions)
    pub(crate) const fn sphere(radius: f64) -> Self {
        Self { a: radius, e2: 0.0 }
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn e2(&self) -> f64 {
        self.e2
    }

    /// Semi-minor axis
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.e2).sqrt()
    }

    /// Prime vertical radius of curvature
    pub fn r_east(&self, lat: f64) -> f64 {
        self.a / (1.0 - self.e2 * lat.sin().powi(2)).sqrt()
    }

    /// Meridional radius of curvature
    pub fn r_north(&self, lat: f64) -> f64 {
        self.a * (1.0 - self.e2) / (1.0 - self.e2 * lat.sin().powi(2)).powf(1.5)
    }

    /// Radius of curvature along a heading (radians from north)
    pub fn r_dir(&self, heading: f64, lat: f64) -> f64 {
        let re = self.r_east(lat);
        let rn = self.r_north(lat);
        (re * rn) / (re * heading.cos().powi(2) + rn * heading.sin().powi(2))
    }

    pub fn lon_lat_to_xyz(&self, llh: &Llh) -> Vec3 {
        let re = self.r_east(llh.lat);
        let (slat, clat) = llh.lat.sin_cos();
        let (slon, clon) = llh.lon.sin_cos();
        Vec3::new(
            (re + llh.height) * clat * clon,
            (re + llh.height) * clat * slon,
            (re * (1.0 - self.e2) + llh.height) * slat,
        )
    }

    /// Closed-form Cartesian to geodetic conversion (Vermeille, 2002)
    pub fn xyz_to_lon_lat(&self, xyz: Vec3) -> Llh {
        let a2 = self.a * self.a;
        let e4 = self.e2 * self.e2;
        let xy2 = xyz.x * xyz.x + xyz.y * xyz.y;

        let p = xy2 / a2;
        let q = (1.0 - self.e2) * xyz.z * xyz.z / a2;
        let r = (p + q - e4) / 6.0;
        let s = e4 * p * q / (4.0 * r * r * r);
        let t = (1.0 + s + (s * (2.0 + s)).sqrt()).cbrt();
        let u = r * (1.0 + t + 1.0 / t);
        let rv = (u * u + e4 * q).sqrt();
        let w = self.e2 * (u + rv - q) / (2.0 * rv);
        let k = (u + rv + w * w).sqrt() - w;
        let d = k * xy2.sqrt() / (k + self.e2);

        Llh {
            lon: xyz.y.atan2(xyz.x),
            lat: xyz.z.atan2(d),
            height: (k + self.e2 - 1.0) * (d * d + xyz.z * xyz.z).sqrt() / k,
        }
    }

    /// Geodetic normal at a location, directed toward the ellipsoid interior
    pub fn nadir_normal(&self, lon: f64, lat: f64) -> Vec3 {
        let (slat, clat) = lat.sin_cos();
        let (slon, clon) = lon.sin_cos();
        Vec3::new(-clat * clon, -clat * slon, -slat)
    }

    /// Local TCN frame at a platform position: the normal is the geodetic
    /// nadir direction at the sub-platform point.
    pub fn tcn_basis(&self, position: Vec3, velocity: Vec3) -> Basis {
        let llh = self.xyz_to_lon_lat(position);
        Basis::from_normal(self.nadir_normal(llh.lon, llh.lat), velocity)
    }

    /// Azimuth and look angles (radians) of `look` relative to the local TCN frame.
    /// Returns (azimuth, look).
    pub fn get_angs(&self, position: Vec3, velocity: Vec3, look: Vec3) -> (f64, f64) {
        let basis = self.tcn_basis(position, velocity);
        let look_angle = (basis.normal.dot(look) / look.norm()).acos();
        let azimuth = look.dot(basis.cross).atan2(look.dot(basis.tangent));
        (azimuth, look_angle)
    }

    /// Projection of `v` on the tangent/cross-track plane of the local TCN frame
    pub fn tc_vector(&self, position: Vec3, velocity: Vec3, v: Vec3) -> Vec3 {
        let basis = self.tcn_basis(position, velocity);
        Vec3::lin_comb(v.dot(basis.tangent), basis.tangent, v.dot(basis.cross), basis.cross)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_rejects_malformed_parameters() {
        assert!(Ellipsoid::new(-1.0, 0.0).is_err());
        assert!(Ellipsoid::new(6378137.0, 1.0).is_err());
        assert!(Ellipsoid::new(6378137.0, -0.1).is_err());
        assert!(Ellipsoid::new(6378137.0, 0.0066943799901).is_ok());
    }

    #[test]
    fn test_equator_prime_meridian() {
        let elp = Ellipsoid::wgs84();
        let xyz = elp.lon_lat_to_xyz(&Llh::new(0.0, 0.0, 0.0));
        assert_abs_diff_eq!(xyz.x, elp.a(), epsilon = 1e-9);
        assert_abs_diff_eq!(xyz.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(xyz.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_north_pole() {
        let elp = Ellipsoid::wgs84();
        let llh = elp.xyz_to_lon_lat(Vec3::new(0.0, 0.0, elp.b() + 100.0));
        assert_abs_diff_eq!(llh.lat, FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(llh.height, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sphere_reduces_to_spherical_coordinates() {
        let sph = Ellipsoid::sphere(1000.0);
        let llh = sph.xyz_to_lon_lat(Vec3::new(0.0, 1100.0, 0.0));
        assert_abs_diff_eq!(llh.lon, PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(llh.height, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_radii_of_curvature() {
        let elp = Ellipsoid::wgs84();
        // At the equator r_east = a and r_north = a(1 - e2)
        assert_abs_diff_eq!(elp.r_east(0.0), elp.a(), epsilon = 1e-9);
        assert_abs_diff_eq!(elp.r_north(0.0), elp.a() * (1.0 - elp.e2()), epsilon = 1e-9);
        assert_abs_diff_eq!(elp.r_dir(0.0, 0.3), elp.r_north(0.3), epsilon = 1e-6);
        assert_abs_diff_eq!(elp.r_dir(FRAC_PI_2, 0.3), elp.r_east(0.3), epsilon = 1e-6);
    }

    #[test]
    fn test_tcn_basis_is_right_handed() {
        let elp = Ellipsoid::wgs84();
        let pos = Vec3::new(7_000_000.0, 0.0, 0.0);
        let vel = Vec3::new(0.0, 7_500.0, 0.0);
        let basis = elp.tcn_basis(pos, vel);
        assert_abs_diff_eq!(basis.normal.x, -1.0, epsilon = 1e-12);
        // Moving east with nadir-pointing normal, the cross axis points south
        assert_abs_diff_eq!(basis.cross.z, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(basis.tangent.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(basis.to_matrix().determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_get_angs_nadir_and_broadside() {
        let elp = Ellipsoid::wgs84();
        let pos = Vec3::new(7_000_000.0, 0.0, 0.0);
        let vel = Vec3::new(0.0, 7_500.0, 0.0);
        let (_, look) = elp.get_angs(pos, vel, Vec3::new(-1.0, 0.0, 0.0));
        assert_abs_diff_eq!(look, 0.0, epsilon = 1e-12);

        let look_vec = Vec3::new(-1.0, 0.0, -1.0);
        let (az, look) = elp.get_angs(pos, vel, look_vec);
        assert_abs_diff_eq!(look, PI / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(az, FRAC_PI_2, epsilon = 1e-12);

        let tc = elp.tc_vector(pos, vel, look_vec);
        assert_abs_diff_eq!(tc.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tc.z, -1.0, epsilon = 1e-12);
    }
}
