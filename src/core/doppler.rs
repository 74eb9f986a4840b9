//! Doppler centroid models
//!
//! `DopplerModel` is the single representation consumed by the solvers.
//! Legacy polynomial descriptions are converted to it by sampling onto a table.

use crate::core::attitude::{Attitude, YawOrientation};
use crate::core::ellipsoid::Ellipsoid;
use crate::core::interpolator::DataInterpMethod;
use crate::core::linalg::{Mat3, Vec3};
use crate::core::lut::{Lut1d, Lut2d};
use crate::core::orbit::{Orbit, OrbitInterpMethod};
use crate::core::peg::{Peg, Pegtrans};
use crate::types::{LookSide, SarError, SarResult, EARTH_SPIN_RATE};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Doppler centroid (Hz) as a function of azimuth time and slant range
#[derive(Debug, Clone, PartialEq)]
pub enum DopplerModel {
    /// Zero-Doppler geometry
    Zero,
    /// Range-only table
    Range(Lut1d),
    /// Table over (azimuth time, slant range)
    Grid(Lut2d),
}

impl Default for DopplerModel {
    fn default() -> Self {
        DopplerModel::Zero
    }
}

impl DopplerModel {
    /// Doppler in Hz at `az_time` (seconds since the orbit epoch) and `slant_range` (m)
    pub fn eval(&self, az_time: f64, slant_range: f64) -> f64 {
        match self {
            DopplerModel::Zero => 0.0,
            DopplerModel::Range(lut) => lut.eval(slant_range),
            DopplerModel::Grid(lut) => lut.eval(az_time, slant_range),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, DopplerModel::Zero)
    }
}

impl From<Lut1d> for DopplerModel {
    fn from(lut: Lut1d) -> Self {
        DopplerModel::Range(lut)
    }
}

impl From<Lut2d> for DopplerModel {
    fn from(lut: Lut2d) -> Self {
        DopplerModel::Grid(lut)
    }
}

/// Normalized 1D polynomial: sum c[i] * ((x - mean) / norm)^i
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poly1d {
    pub mean: f64,
    pub norm: f64,
    pub coeffs: Vec<f64>,
}

impl Poly1d {
    pub fn new(coeffs: Vec<f64>, mean: f64, norm: f64) -> SarResult<Self> {
        if norm == 0.0 || !norm.is_finite() {
            return Err(SarError::InvalidParameter("Poly1d norm must be non-zero".to_string()));
        }
        Ok(Self { mean, norm, coeffs })
    }

    pub fn order(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let xn = (x - self.mean) / self.norm;
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * xn + c)
    }

    /// Polynomial of the derivative with respect to x (not the normalized variable)
    pub fn derivative(&self) -> Poly1d {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| i as f64 * c / self.norm)
            .collect();
        Poly1d {
            mean: self.mean,
            norm: self.norm,
            coeffs,
        }
    }

    /// Sample onto `n` range coordinates starting at `start`
    pub fn to_lut1d(&self, start: f64, spacing: f64, n: usize) -> SarResult<Lut1d> {
        let coords: Vec<f64> = (0..n).map(|i| start + i as f64 * spacing).collect();
        let values = coords.iter().map(|&x| self.eval(x)).collect();
        Lut1d::new(coords, values, true)
    }
}

/// Normalized 2D polynomial over (azimuth, range):
/// sum c[i][j] * ((azi - az_mean) / az_norm)^i * ((rng - rg_mean) / rg_norm)^j
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poly2d {
    pub azimuth_mean: f64,
    pub azimuth_norm: f64,
    pub range_mean: f64,
    pub range_norm: f64,
    /// Row i holds azimuth power i
    pub coeffs: Vec<Vec<f64>>,
}

impl Poly2d {
    pub fn new(coeffs: Vec<Vec<f64>>) -> Self {
        Self {
            azimuth_mean: 0.0,
            azimuth_norm: 1.0,
            range_mean: 0.0,
            range_norm: 1.0,
            coeffs,
        }
    }

    pub fn with_normalization(
        mut self,
        azimuth_mean: f64,
        azimuth_norm: f64,
        range_mean: f64,
        range_norm: f64,
    ) -> SarResult<Self> {
        if azimuth_norm == 0.0 || range_norm == 0.0 {
            return Err(SarError::InvalidParameter("Poly2d norms must be non-zero".to_string()));
        }
        self.azimuth_mean = azimuth_mean;
        self.azimuth_norm = azimuth_norm;
        self.range_mean = range_mean;
        self.range_norm = range_norm;
        Ok(self)
    }

    pub fn eval(&self, azi: f64, rng: f64) -> f64 {
        let yval = (azi - self.azimuth_mean) / self.azimuth_norm;
        let xval = (rng - self.range_mean) / self.range_norm;
        self.coeffs.iter().rev().fold(0.0, |acc, row| {
            let along_range = row.iter().rev().fold(0.0, |r, c| r * xval + c);
            acc * yval + along_range
        })
    }

    /// Sample onto a (length x width) grid of azimuth times and slant ranges
    pub fn to_lut2d(
        &self,
        range_start: f64,
        range_spacing: f64,
        width: usize,
        azimuth_start: f64,
        azimuth_spacing: f64,
        length: usize,
        method: DataInterpMethod,
    ) -> SarResult<Lut2d> {
        let data = Array2::from_shape_fn((length, width), |(i, j)| {
            self.eval(
                azimuth_start + i as f64 * azimuth_spacing,
                range_start + j as f64 * range_spacing,
            )
        });
        Lut2d::new(range_start, azimuth_start, range_spacing, azimuth_spacing, data, method)
    }
}

/// Frame the attitude angles refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttitudeFrame {
    /// Earth-fixed
    Fixed,
    /// Inertial: the Earth rotation is added to the platform velocity
    Inertial,
}

/// Doppler centroid predicted from platform attitude at one azimuth time
#[derive(Debug, Clone)]
pub struct AttitudeDoppler {
    attitude: Attitude,
    ellipsoid: Ellipsoid,
    sat_pos: Vec3,
    sat_vel: Vec3,
    sat_height: f64,
    sat_lon: f64,
    sat_lat: f64,
    ptm: Pegtrans,
}

impl AttitudeDoppler {
    /// Set up at `epoch` (seconds since the orbit epoch); the time must lie inside the orbit
    pub fn new(orbit: &Orbit, attitude: Attitude, ellipsoid: Ellipsoid, epoch: f64) -> SarResult<Self> {
        let state = orbit.interpolate(epoch, OrbitInterpMethod::Hermite)?;
        let heading = orbit.enu_heading(epoch, &ellipsoid)?;
        let heading = match (state.status.is_ok(), heading) {
            (true, Some(h)) => h,
            _ => {
                return Err(SarError::Orbit(format!(
                    "requested time {} outside orbit span [{:?}, {:?}]",
                    epoch,
                    orbit.start_time(),
                    orbit.end_time()
                )))
            }
        };
        let llh = ellipsoid.xyz_to_lon_lat(state.position);
        let ptm = Pegtrans::new(&ellipsoid, &Peg::new(llh.lat, llh.lon, heading));

        Ok(Self {
            attitude,
            ellipsoid,
            sat_pos: state.position,
            sat_vel: state.velocity,
            sat_height: llh.height,
            sat_lon: llh.lon,
            sat_lat: llh.lat,
            ptm,
        })
    }

    /// Antenna boresight direction in ECEF
    fn pointing(&self, va: Vec3) -> Vec3 {
        let x = Vec3::new(1.0, 0.0, 0.0);
        match &self.attitude {
            Attitude::Quaternion(q) => q.rotation_matrix() * x,
            Attitude::Euler(e) => {
                let up = match e.yaw_orientation {
                    YawOrientation::Normal => {
                        let (slat, clat) = self.sat_lat.sin_cos();
                        let (slon, clon) = self.sat_lon.sin_cos();
                        Vec3::new(clat * clon, clat * slon, slat)
                    }
                    YawOrientation::Center => self.sat_pos,
                };
                let c = -up.unit();
                let b = c.cross(va).unit();
                let a = b.cross(c);
                let orbit_frame = Mat3::from_columns(a, b, c);
                orbit_frame * (e.rotation_matrix() * x)
            }
        }
    }

    /// Doppler centroid (Hz) at `slant_range`
    pub fn centroid(
        &self,
        slant_range: f64,
        wavelength: f64,
        frame: AttitudeFrame,
        max_iter: usize,
        side: LookSide,
    ) -> f64 {
        let va = match frame {
            AttitudeFrame::Inertial => Vec3::new(0.0, 0.0, EARTH_SPIN_RATE).cross(self.sat_pos) + self.sat_vel,
            AttitudeFrame::Fixed => self.sat_vel,
        };

        // Pseudo velocity along the antenna boresight
        let vel = self.pointing(va) * va.norm();
        let basis = self.ellipsoid.tcn_basis(self.sat_pos, vel);
        let radcur = self.ptm.radcur;

        let mut target_llh = self.ellipsoid.xyz_to_lon_lat(self.sat_pos);
        target_llh.height = 0.0;
        let mut zsch = 0.0;
        for _ in 0..max_iter {
            let a = self.sat_height + radcur;
            let b = radcur + zsch;
            let costheta = 0.5 * (a / slant_range + slant_range / a - (b / a) * (b / slant_range));
            let sintheta = (1.0 - costheta * costheta).max(0.0).sqrt();

            let gamma = slant_range * costheta;
            let alpha = -gamma * basis.normal.dot(vel) / vel.dot(basis.tangent);
            let beta = -side.sign()
                * (slant_range * slant_range * sintheta * sintheta - alpha * alpha).max(0.0).sqrt();

            let delta = Vec3::lin_comb(alpha, basis.tangent, beta, basis.cross) + basis.normal * gamma;
            target_llh = self.ellipsoid.xyz_to_lon_lat(self.sat_pos + delta);
            target_llh.height = 0.0;
            let target = self.ellipsoid.lon_lat_to_xyz(&target_llh);
            zsch = self.ptm.xyz_to_sch(target).z;

            let rdiff = slant_range - (self.sat_pos - target).norm();
            if rdiff.abs() < 1.0e-8 {
                break;
            }
        }

        let target = self.ellipsoid.lon_lat_to_xyz(&target_llh);
        let rhat = (self.sat_pos - target).unit();
        -2.0 / wavelength * self.sat_vel.dot(rhat)
    }
}
