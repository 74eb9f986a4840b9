//! Platform orbit: time-tagged state vectors and interpolation

use crate::core::ellipsoid::Ellipsoid;
use crate::core::linalg::{enu_basis, Vec3};
use crate::types::{OrbitData, SarError, SarResult, StateVector};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Step used for finite-difference acceleration (seconds)
const ACCELERATION_STEP: f64 = 0.01;

/// Above this many samples the global SCH interpolation becomes expensive
pub const SCH_MAX_RECOMMENDED_SAMPLES: usize = 64;

/// Lagrange denominators for the 9-point uniformly spaced Legendre window
const LEGENDRE_NOEMER: [f64; 9] = [
    40320.0, -5040.0, 1440.0, -720.0, 576.0, -720.0, 1440.0, -5040.0, 40320.0,
];

/// Orbit interpolation algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrbitInterpMethod {
    /// 4-point Hermite matching positions and velocities
    Hermite,
    /// 9-point, 8th-order Legendre polynomial
    Legendre,
    /// Global Lagrange-weighted sum over all samples
    Sch,
    /// Straight line between the two bracketing samples
    Linear,
}

impl Default for OrbitInterpMethod {
    fn default() -> Self {
        OrbitInterpMethod::Hermite
    }
}

impl OrbitInterpMethod {
    /// Minimum number of state vectors the method needs
    pub fn min_samples(self) -> usize {
        match self {
            OrbitInterpMethod::Hermite => 4,
            OrbitInterpMethod::Legendre => 9,
            OrbitInterpMethod::Sch | OrbitInterpMethod::Linear => 2,
        }
    }
}

impl FromStr for OrbitInterpMethod {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hermite" => Ok(OrbitInterpMethod::Hermite),
            "legendre" => Ok(OrbitInterpMethod::Legendre),
            "sch" => Ok(OrbitInterpMethod::Sch),
            "linear" => Ok(OrbitInterpMethod::Linear),
            _ => Err(SarError::InvalidParameter(format!(
                "Unknown orbit interpolation method: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for OrbitInterpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitInterpMethod::Hermite => write!(f, "hermite"),
            OrbitInterpMethod::Legendre => write!(f, "legendre"),
            OrbitInterpMethod::Sch => write!(f, "sch"),
            OrbitInterpMethod::Linear => write!(f, "linear"),
        }
    }
}

/// Soft outcome of an orbit query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpStatus {
    Success,
    /// Query time outside [first sample, last sample]
    OutOfBounds,
}

impl InterpStatus {
    /// Legacy integer code: 0 = success, 1 = out of bounds
    pub fn code(self) -> i32 {
        match self {
            InterpStatus::Success => 0,
            InterpStatus::OutOfBounds => 1,
        }
    }

    pub fn is_ok(self) -> bool {
        self == InterpStatus::Success
    }
}

/// Interpolated platform state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub status: InterpStatus,
}

impl OrbitState {
    fn out_of_bounds() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            status: InterpStatus::OutOfBounds,
        }
    }

    fn success(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            status: InterpStatus::Success,
        }
    }
}

/// Convert a chrono duration to fractional seconds
pub(crate) fn duration_seconds(d: Duration) -> f64 {
    match d.num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        None => d.num_milliseconds() as f64 * 1e-3,
    }
}

/// Ordered sequence of platform state vectors relative to a reference epoch
#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    reference_epoch: DateTime<Utc>,
    times: Vec<f64>,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    method: OrbitInterpMethod,
}

impl Orbit {
    /// Create an empty orbit whose sample times are seconds since `reference_epoch`
    pub fn new(reference_epoch: DateTime<Utc>) -> Self {
        Self {
            reference_epoch,
            times: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            method: OrbitInterpMethod::default(),
        }
    }

    /// Build from absolute-time state vectors
    pub fn from_state_vectors(
        state_vectors: &[StateVector],
        reference_epoch: DateTime<Utc>,
    ) -> SarResult<Self> {
        let mut orbit = Self::new(reference_epoch);
        for sv in state_vectors {
            let t = duration_seconds(sv.time - reference_epoch);
            orbit.push(t, Vec3::from(sv.position), Vec3::from(sv.velocity))?;
        }
        Ok(orbit)
    }

    /// Adapter from metadata-reader orbit records
    pub fn from_orbit_data(data: &OrbitData) -> SarResult<Self> {
        log::debug!(
            "Building orbit from {} state vectors (reference {})",
            data.state_vectors.len(),
            data.reference_time
        );
        Self::from_state_vectors(&data.state_vectors, data.reference_time)
    }

    /// Convert back to absolute-time records
    pub fn to_orbit_data(&self) -> OrbitData {
        let state_vectors = (0..self.len())
            .map(|i| StateVector {
                time: self.datetime_of(self.times[i]),
                position: self.positions[i].to_array(),
                velocity: self.velocities[i].to_array(),
            })
            .collect();
        OrbitData {
            state_vectors,
            reference_time: self.reference_epoch,
        }
    }

    /// Set the default interpolation method
    pub fn with_method(mut self, method: OrbitInterpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn method(&self) -> OrbitInterpMethod {
        self.method
    }

    /// Append a sample; times must be strictly increasing
    pub fn push(&mut self, time: f64, position: Vec3, velocity: Vec3) -> SarResult<()> {
        if !time.is_finite() || !position.is_finite() || !velocity.is_finite() {
            return Err(SarError::Orbit(format!(
                "non-finite state vector at t = {}",
                time
            )));
        }
        if let Some(&last) = self.times.last() {
            if time <= last {
                return Err(SarError::Orbit(format!(
                    "state vector times must be strictly increasing: {} follows {}",
                    time, last
                )));
            }
        }
        self.times.push(time);
        self.positions.push(position);
        self.velocities.push(velocity);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn reference_epoch(&self) -> DateTime<Utc> {
        self.reference_epoch
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Sample `i` as (time, position, velocity)
    pub fn state_vector(&self, i: usize) -> Option<(f64, Vec3, Vec3)> {
        if i < self.len() {
            Some((self.times[i], self.positions[i], self.velocities[i]))
        } else {
            None
        }
    }

    pub fn start_time(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Time of the middle state vector
    pub fn mid_time(&self) -> Option<f64> {
        self.times.get(self.len() / 2).copied()
    }

    /// Seconds since the reference epoch for an absolute time
    pub fn time_of(&self, datetime: DateTime<Utc>) -> f64 {
        duration_seconds(datetime - self.reference_epoch)
    }

    /// Absolute time for seconds since the reference epoch
    pub fn datetime_of(&self, t: f64) -> DateTime<Utc> {
        self.reference_epoch + Duration::nanoseconds((t * 1e9).round() as i64)
    }

    /// Re-tag the orbit to a new reference epoch; positions and velocities are untouched.
    pub fn update_reference_epoch(&mut self, new_epoch: DateTime<Utc>) {
        let shift = duration_seconds(self.reference_epoch - new_epoch);
        for t in self.times.iter_mut() {
            *t += shift;
        }
        log::debug!(
            "Orbit reference epoch moved from {} to {} ({:+.6} s)",
            self.reference_epoch,
            new_epoch,
            shift
        );
        self.reference_epoch = new_epoch;
    }

    /// Fail if the orbit cannot support `method`
    pub fn check_method(&self, method: OrbitInterpMethod) -> SarResult<()> {
        if self.len() < method.min_samples() {
            return Err(SarError::Orbit(format!(
                "{} interpolation needs at least {} state vectors, orbit has {}",
                method,
                method.min_samples(),
                self.len()
            )));
        }
        if method == OrbitInterpMethod::Sch && self.len() > SCH_MAX_RECOMMENDED_SAMPLES {
            log::warn!(
                "SCH interpolation over {} state vectors is O(N^2) per query",
                self.len()
            );
        }
        Ok(())
    }

    /// Interpolate position and velocity at `t` (seconds since the reference epoch).
    ///
    /// Too few samples for `method` is an error; a query outside the sampled
    /// time span is reported through `InterpStatus::OutOfBounds`.
    pub fn interpolate(&self, t: f64, method: OrbitInterpMethod) -> SarResult<OrbitState> {
        if self.len() < method.min_samples() {
            return Err(SarError::Orbit(format!(
                "{} interpolation needs at least {} state vectors, orbit has {}",
                method,
                method.min_samples(),
                self.len()
            )));
        }

        let n = self.len();
        if !(t >= self.times[0] && t <= self.times[n - 1]) {
            return Ok(OrbitState::out_of_bounds());
        }

        let state = match method {
            OrbitInterpMethod::Hermite => {
                let i = self.window_start(t, 2, 4);
                let (pos, vel) = hermite(
                    &self.times[i..i + 4],
                    &self.positions[i..i + 4],
                    &self.velocities[i..i + 4],
                    t,
                );
                OrbitState::success(pos, vel)
            }
            OrbitInterpMethod::Legendre => {
                let i = self.window_start(t, 5, 9);
                let (pos, vel) = legendre(
                    &self.times[i..i + 9],
                    &self.positions[i..i + 9],
                    &self.velocities[i..i + 9],
                    t,
                );
                OrbitState::success(pos, vel)
            }
            OrbitInterpMethod::Sch => {
                let (pos, vel) = sch_weighted(&self.times, &self.positions, &self.velocities, t);
                OrbitState::success(pos, vel)
            }
            OrbitInterpMethod::Linear => {
                let first_after = self.times.partition_point(|&ti| ti < t);
                let i = first_after.saturating_sub(1).min(n - 2);
                let w = (t - self.times[i]) / (self.times[i + 1] - self.times[i]);
                OrbitState::success(
                    Vec3::lin_comb(1.0 - w, self.positions[i], w, self.positions[i + 1]),
                    Vec3::lin_comb(1.0 - w, self.velocities[i], w, self.velocities[i + 1]),
                )
            }
        };
        Ok(state)
    }

    /// Interpolate with the orbit's default method
    pub fn interpolate_default(&self, t: f64) -> SarResult<OrbitState> {
        self.interpolate(t, self.method)
    }

    /// First index of a `width`-sample window: the first sample at or after
    /// `t`, moved back by `offset`, then clamped so the window fits.
    fn window_start(&self, t: f64, offset: usize, width: usize) -> usize {
        let first = self.times.partition_point(|&ti| ti < t);
        first.saturating_sub(offset).min(self.len() - width)
    }

    /// Acceleration from central differences of Hermite velocity at t +/- 0.01 s
    pub fn compute_acceleration(&self, t: f64) -> SarResult<(Vec3, InterpStatus)> {
        let before = self.interpolate(t - ACCELERATION_STEP, OrbitInterpMethod::Hermite)?;
        let after = self.interpolate(t + ACCELERATION_STEP, OrbitInterpMethod::Hermite)?;
        if !before.status.is_ok() || !after.status.is_ok() {
            return Ok((Vec3::ZERO, InterpStatus::OutOfBounds));
        }
        let acc = (after.velocity - before.velocity) / (2.0 * ACCELERATION_STEP);
        Ok((acc, InterpStatus::Success))
    }

    /// Acceleration at `t` when the orbit supports it; None for orbits too short
    /// for Hermite differencing or queries near the span edges
    pub fn acceleration_if_available(&self, t: f64) -> SarResult<Option<Vec3>> {
        if self.len() < OrbitInterpMethod::Hermite.min_samples() {
            return Ok(None);
        }
        let (acc, status) = self.compute_acceleration(t)?;
        Ok(status.is_ok().then_some(acc))
    }

    /// Platform heading (radians clockwise from north) at `t`, or None outside the orbit span
    pub fn enu_heading(&self, t: f64, ellipsoid: &Ellipsoid) -> SarResult<Option<f64>> {
        let state = self.interpolate(t, OrbitInterpMethod::Hermite)?;
        if !state.status.is_ok() {
            return Ok(None);
        }
        let llh = ellipsoid.xyz_to_lon_lat(state.position);
        let enu_vel = enu_basis(llh.lat, llh.lon).transpose() * state.velocity;
        Ok(Some(enu_vel.x.atan2(enu_vel.y)))
    }

    /// Load a text orbit: one `t x y z vx vy vz` record per line
    pub fn load_from_hdr<P: AsRef<Path>>(path: P, reference_epoch: DateTime<Utc>) -> SarResult<Self> {
        log::info!("Reading orbit file: {}", path.as_ref().display());
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut orbit = Self::new(reference_epoch);

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let values = trimmed
                .split_whitespace()
                .map(|tok| tok.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| {
                    SarError::InvalidFormat(format!("orbit line {}: {}", line_no + 1, e))
                })?;
            if values.len() != 7 {
                return Err(SarError::InvalidFormat(format!(
                    "orbit line {}: expected 7 values, found {}",
                    line_no + 1,
                    values.len()
                )));
            }
            orbit.push(
                values[0],
                Vec3::new(values[1], values[2], values[3]),
                Vec3::new(values[4], values[5], values[6]),
            )?;
        }

        log::debug!("Read {} state vectors", orbit.len());
        Ok(orbit)
    }

    /// Write the orbit in the text format read by `load_from_hdr`
    pub fn dump_to_hdr<P: AsRef<Path>>(&self, path: P) -> SarResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        for i in 0..self.len() {
            let (p, v) = (self.positions[i], self.velocities[i]);
            writeln!(
                writer,
                "{:+.16} {:+.16} {:+.16} {:+.16} {:+.16} {:+.16} {:+.16}",
                self.times[i], p.x, p.y, p.z, v.x, v.y, v.z
            )?;
        }
        writer.flush()?;
        log::info!("Wrote {} state vectors to {}", self.len(), path.as_ref().display());
        Ok(())
    }
}

/// Cubic Hermite interpolation through 4 samples matching positions and velocities
pub fn hermite(times: &[f64], pos: &[Vec3], vel: &[Vec3], t: f64) -> (Vec3, Vec3) {
    let n = times.len();
    let mut position = Vec3::ZERO;
    let mut velocity = Vec3::ZERO;

    for i in 0..n {
        let ti = times[i];
        let mut inv_sum = 0.0;
        let mut h = 1.0;
        let mut hdot = 0.0;
        for j in 0..n {
            if j == i {
                continue;
            }
            inv_sum += 1.0 / (ti - times[j]);
            h *= (t - times[j]) / (ti - times[j]);

            let mut term = 1.0 / (ti - times[j]);
            for k in 0..n {
                if k != i && k != j {
                    term *= (t - times[k]) / (ti - times[k]);
                }
            }
            hdot += term;
        }

        let f0 = 1.0 - 2.0 * (t - ti) * inv_sum;
        let f1 = t - ti;
        let g0 = 2.0 * (f0 * hdot - h * inv_sum);
        let g1 = h + 2.0 * (t - ti) * hdot;

        position += (pos[i] * f0 + vel[i] * f1) * (h * h);
        velocity += (pos[i] * g0 + vel[i] * g1) * h;
    }

    (position, velocity)
}

/// 8th-order Legendre interpolation over 9 uniformly spaced samples.
///
/// The velocity reuses the position weights on the sampled velocities rather
/// than differentiating the position polynomial.
pub fn legendre(times: &[f64], pos: &[Vec3], vel: &[Vec3], t: f64) -> (Vec3, Vec3) {
    let trel = 8.0 * (t - times[0]) / (times[8] - times[0]);
    let teller: f64 = (0..9).map(|i| trel - i as f64).product();

    if teller == 0.0 {
        let i = trel as usize;
        return (pos[i], vel[i]);
    }

    let mut position = Vec3::ZERO;
    let mut velocity = Vec3::ZERO;
    for i in 0..9 {
        let coeff = (teller / LEGENDRE_NOEMER[i]) / (trel - i as f64);
        position += pos[i] * coeff;
        velocity += vel[i] * coeff;
    }
    (position, velocity)
}

/// Lagrange-weighted sum over every sample (O(N^2) per query)
pub fn sch_weighted(times: &[f64], pos: &[Vec3], vel: &[Vec3], t: f64) -> (Vec3, Vec3) {
    let mut position = Vec3::ZERO;
    let mut velocity = Vec3::ZERO;
    for i in 0..times.len() {
        let mut frac = 1.0;
        for j in 0..times.len() {
            if j != i {
                frac *= (times[j] - t) / (times[j] - times[i]);
            }
        }
        position += pos[i] * frac;
        velocity += vel[i] * frac;
    }
    (position, velocity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use std::f64::consts::PI;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()
    }

    fn linear_sv(dt: f64) -> (Vec3, Vec3) {
        let vel = Vec3::new(4000.0, -1000.0, 4500.0);
        (vel * dt, vel)
    }

    fn create_linear_orbit() -> Orbit {
        let mut orbit = Orbit::new(epoch());
        for i in 0..11 {
            let dt = i as f64 * 10.0;
            let (p, v) = linear_sv(dt);
            orbit.push(1000.0 + dt, p, v).unwrap();
        }
        orbit
    }

    fn circular_sv(dt: f64) -> (Vec3, Vec3) {
        let opos = Vec3::new(7000000.0, -4500000.0, 7800000.0);
        let omega1 = 2.0 * PI / 7000.0;
        let omega2 = 2.0 * PI / 4000.0;
        let theta1 = 2.0 * PI / 8.0;
        let theta2 = 2.0 * PI / 12.0;
        let radius = 8000000.0;
        let ang1 = theta1 + dt * omega1;
        let ang2 = theta2 + dt * omega2;
        let pos = opos
            + Vec3::new(
                radius * ang1.cos(),
                radius * (ang1.sin() + ang2.cos()),
                radius * ang2.sin(),
            );
        let vel = Vec3::new(
            radius * -omega1 * ang1.sin(),
            radius * (omega1 * ang1.cos() - omega2 * ang2.sin()),
            radius * omega2 * ang2.cos(),
        );
        (pos, vel)
    }

    fn create_circular_orbit() -> Orbit {
        let mut orbit = Orbit::new(epoch());
        for i in 0..11 {
            let dt = i as f64 * 5.0;
            let (p, v) = circular_sv(dt);
            orbit.push(1000.0 + dt, p, v).unwrap();
        }
        orbit
    }

    #[test]
    fn test_linear_orbit_all_methods() {
        let orbit = create_linear_orbit();
        for method in [
            OrbitInterpMethod::Hermite,
            OrbitInterpMethod::Legendre,
            OrbitInterpMethod::Sch,
            OrbitInterpMethod::Linear,
        ] {
            for dt in [23.3, 36.7, 54.5, 89.3] {
                let (ref_pos, ref_vel) = linear_sv(dt);
                let state = orbit.interpolate(1000.0 + dt, method).unwrap();
                assert_eq!(state.status, InterpStatus::Success);
                for k in 0..3 {
                    assert_abs_diff_eq!(state.position[k], ref_pos[k], epsilon = 1e-5);
                    assert_abs_diff_eq!(state.velocity[k], ref_vel[k], epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_documented_linear_example() {
        let orbit = create_linear_orbit();
        let state = orbit.interpolate(1023.3, OrbitInterpMethod::Hermite).unwrap();
        assert_abs_diff_eq!(state.position.x, 93200.0, epsilon = 1e-5);
        assert_abs_diff_eq!(state.position.y, -23300.0, epsilon = 1e-5);
        assert_abs_diff_eq!(state.position.z, 104850.0, epsilon = 1e-5);
    }

    #[test]
    fn test_circular_orbit() {
        let orbit = create_circular_orbit();
        for method in [
            OrbitInterpMethod::Hermite,
            OrbitInterpMethod::Legendre,
            OrbitInterpMethod::Sch,
        ] {
            for dt in [11.65, 18.35, 27.25, 44.65] {
                let (ref_pos, ref_vel) = circular_sv(dt);
                let state = orbit.interpolate(1000.0 + dt, method).unwrap();
                for k in 0..3 {
                    assert_abs_diff_eq!(state.position[k], ref_pos[k], epsilon = 1e-5);
                    assert_abs_diff_eq!(state.velocity[k], ref_vel[k], epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_out_of_bounds_is_soft() {
        let orbit = create_linear_orbit();
        for method in [
            OrbitInterpMethod::Hermite,
            OrbitInterpMethod::Legendre,
            OrbitInterpMethod::Sch,
            OrbitInterpMethod::Linear,
        ] {
            for dt in [-23.0, -1.0, 101.0, 112.0] {
                let state = orbit.interpolate(1000.0 + dt, method).unwrap();
                assert_eq!(state.status.code(), 1);
            }
            // Exact end points are inside
            assert!(orbit.interpolate(1000.0, method).unwrap().status.is_ok());
            assert!(orbit.interpolate(1100.0, method).unwrap().status.is_ok());
        }
    }

    #[test]
    fn test_too_few_samples_is_hard_error() {
        let mut orbit = Orbit::new(epoch());
        for i in 0..3 {
            let (p, v) = linear_sv(i as f64);
            orbit.push(i as f64, p, v).unwrap();
        }
        assert!(orbit.interpolate(1.0, OrbitInterpMethod::Hermite).is_err());
        assert!(orbit.interpolate(1.0, OrbitInterpMethod::Legendre).is_err());
        assert!(orbit.interpolate(1.0, OrbitInterpMethod::Sch).is_ok());
        assert!(orbit.check_method(OrbitInterpMethod::Hermite).is_err());
    }

    #[test]
    fn test_rejects_unordered_times() {
        let mut orbit = Orbit::new(epoch());
        orbit.push(10.0, Vec3::ZERO, Vec3::ZERO).unwrap();
        assert!(orbit.push(10.0, Vec3::ZERO, Vec3::ZERO).is_err());
        assert!(orbit.push(5.0, Vec3::ZERO, Vec3::ZERO).is_err());
    }

    #[test]
    fn test_legendre_velocity_is_weighted_sample_velocity() {
        // The Legendre velocity reuses the position weights: for samples whose
        // velocity column is inconsistent with the positions, the result is the
        // interpolated velocity samples, not the derivative of the positions.
        let mut orbit = Orbit::new(epoch());
        for i in 0..9 {
            let t = i as f64;
            orbit
                .push(t, Vec3::new(t * t, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0))
                .unwrap();
        }
        let state = orbit.interpolate(3.5, OrbitInterpMethod::Legendre).unwrap();
        assert_abs_diff_eq!(state.position.x, 12.25, epsilon = 1e-9);
        assert_abs_diff_eq!(state.velocity.x, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_acceleration_of_circular_orbit() {
        let orbit = create_circular_orbit();
        let (acc, status) = orbit.compute_acceleration(1025.0).unwrap();
        assert!(status.is_ok());
        let (_, v0) = circular_sv(24.99);
        let (_, v1) = circular_sv(25.01);
        let expected = (v1 - v0) / 0.02;
        for k in 0..3 {
            assert_abs_diff_eq!(acc[k], expected[k], epsilon = 1e-3);
        }
        let (_, status) = orbit.compute_acceleration(1000.0).unwrap();
        assert_eq!(status, InterpStatus::OutOfBounds);
    }

    #[test]
    fn test_reference_epoch_retagging() {
        let mut orbit = create_linear_orbit();
        let before = orbit.interpolate(1050.0, OrbitInterpMethod::Hermite).unwrap();
        orbit.update_reference_epoch(epoch() + Duration::seconds(1000));
        assert_abs_diff_eq!(orbit.times()[0], 0.0, epsilon = 1e-9);
        let after = orbit.interpolate(50.0, OrbitInterpMethod::Hermite).unwrap();
        assert_abs_diff_eq!(after.position.x, before.position.x, epsilon = 1e-6);
    }

    #[test]
    fn test_orbit_data_adapter() {
        let orbit = create_linear_orbit();
        let data = orbit.to_orbit_data();
        assert_eq!(data.state_vectors.len(), 11);
        let rebuilt = Orbit::from_orbit_data(&data).unwrap();
        for (a, b) in orbit.times().iter().zip(rebuilt.times()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("Hermite".parse::<OrbitInterpMethod>().unwrap(), OrbitInterpMethod::Hermite);
        assert_eq!("SCH".parse::<OrbitInterpMethod>().unwrap(), OrbitInterpMethod::Sch);
        assert!("cubic".parse::<OrbitInterpMethod>().is_err());
    }
}
