//! Peg point and SCH (along-track, cross-track, height) coordinate frame

use crate::core::ellipsoid::{Ellipsoid, Llh};
use crate::core::linalg::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Peg point: latitude, longitude and heading in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peg {
    pub lat: f64,
    pub lon: f64,
    pub hdg: f64,
}

impl Peg {
    pub fn new(lat: f64, lon: f64, hdg: f64) -> Self {
        Self { lat, lon, hdg }
    }
}

/// Affine transformation between SCH coordinates about a peg and ECEF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pegtrans {
    /// SCH-sphere to ECEF rotation
    pub mat: Mat3,
    /// ECEF to SCH-sphere rotation
    pub matinv: Mat3,
    /// Translation from the Earth center to the SCH sphere center
    pub ov: Vec3,
    /// Radius of curvature of the SCH sphere
    pub radcur: f64,
}

impl Pegtrans {
    /// Set up the SCH frame for `peg` on `ellipsoid`
    pub fn new(ellipsoid: &Ellipsoid, peg: &Peg) -> Self {
        let (slat, clat) = peg.lat.sin_cos();
        let (slon, clon) = peg.lon.sin_cos();
        let (shdg, chdg) = peg.hdg.sin_cos();

        let mat = Mat3::new([
            [clat * clon, -(shdg * slon) - (slat * clon * chdg), (slon * chdg) - (slat * clon * shdg)],
            [clat * slon, (clon * shdg) - (slat * slon * chdg), -(clon * chdg) - (slat * slon * shdg)],
            [slat, clat * chdg, clat * shdg],
        ]);

        let radcur = ellipsoid.r_dir(peg.hdg, peg.lat);
        let p = ellipsoid.lon_lat_to_xyz(&Llh::new(peg.lon, peg.lat, 0.0));
        let up = Vec3::new(clat * clon, clat * slon, slat);
        let ov = Vec3::lin_comb(1.0, p, -radcur, up);

        Self {
            mat,
            matinv: mat.transpose(),
            ov,
            radcur,
        }
    }

    /// SCH position (meters) to ECEF
    pub fn sch_to_xyz(&self, sch: Vec3) -> Vec3 {
        let sphere = Ellipsoid::sphere(self.radcur);
        let llh = Llh::new(sch.x / self.radcur, sch.y / self.radcur, sch.z);
        let local = sphere.lon_lat_to_xyz(&llh);
        self.mat * local + self.ov
    }

    /// ECEF position to SCH (meters)
    pub fn xyz_to_sch(&self, xyz: Vec3) -> Vec3 {
        let sphere = Ellipsoid::sphere(self.radcur);
        let local = self.matinv * (xyz - self.ov);
        let llh = sphere.xyz_to_lon_lat(local);
        Vec3::new(self.radcur * llh.lon, self.radcur * llh.lat, llh.height)
    }

    /// Local SCH velocity basis at an SCH position.
    /// Returns (xyz -> sch, sch -> xyz) matrices.
    pub fn sch_basis(&self, sch: Vec3) -> (Mat3, Mat3) {
        let s = sch.x / self.radcur;
        let c = sch.y / self.radcur;
        let (ss, cs) = s.sin_cos();
        let (sc, cc) = c.sin_cos();
        let local = Mat3::new([
            [-ss, -(sc * cs), cs * cc],
            [cs, -(sc * ss), ss * cc],
            [0.0, cc, sc],
        ]);
        let sch_to_xyz = self.mat * local;
        (sch_to_xyz.transpose(), sch_to_xyz)
    }

    pub fn sch_velocity_to_xyz(&self, sch: Vec3, schdot: Vec3) -> Vec3 {
        let (_, sch_to_xyz) = self.sch_basis(sch);
        sch_to_xyz * schdot
    }

    pub fn xyz_velocity_to_sch(&self, sch: Vec3, xyzdot: Vec3) -> Vec3 {
        let (xyz_to_sch, _) = self.sch_basis(sch);
        xyz_to_sch * xyzdot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn test_peg() -> (Ellipsoid, Pegtrans) {
        let elp = Ellipsoid::wgs84();
        let peg = Peg::new(34.2_f64.to_radians(), -118.1_f64.to_radians(), 0.3);
        (elp, Pegtrans::new(&elp, &peg))
    }

    #[test]
    fn test_peg_point_is_sch_origin() {
        let (elp, ptm) = test_peg();
        let xyz = elp.lon_lat_to_xyz(&Llh::new(-118.1_f64.to_radians(), 34.2_f64.to_radians(), 0.0));
        let sch = ptm.xyz_to_sch(xyz);
        assert_abs_diff_eq!(sch.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sch.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sch.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sch_roundtrip() {
        let (_, ptm) = test_peg();
        let sch = Vec3::new(12_500.0, -3_400.0, 750_000.0);
        let back = ptm.xyz_to_sch(ptm.sch_to_xyz(sch));
        assert_abs_diff_eq!(back.x, sch.x, epsilon = 1e-5);
        assert_abs_diff_eq!(back.y, sch.y, epsilon = 1e-5);
        assert_abs_diff_eq!(back.z, sch.z, epsilon = 1e-5);
    }

    #[test]
    fn test_velocity_basis_is_orthonormal() {
        let (_, ptm) = test_peg();
        let sch = Vec3::new(1_000.0, 200.0, 700_000.0);
        let vel = Vec3::new(7_100.0, 5.0, -2.0);
        let xyzdot = ptm.sch_velocity_to_xyz(sch, vel);
        assert_abs_diff_eq!(xyzdot.norm(), vel.norm(), epsilon = 1e-8);
        let back = ptm.xyz_velocity_to_sch(sch, xyzdot);
        assert_abs_diff_eq!(back.x, vel.x, epsilon = 1e-8);
        assert_abs_diff_eq!(back.z, vel.z, epsilon = 1e-8);
    }
}
