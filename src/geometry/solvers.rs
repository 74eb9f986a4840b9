//! Point solvers between radar coordinates (azimuth time, slant range)
//! and ground coordinates (lon, lat, height)

use crate::core::doppler::DopplerModel;
use crate::core::ellipsoid::{Basis, Ellipsoid, Llh};
use crate::core::linalg::Vec3;
use crate::core::orbit::{Orbit, OrbitInterpMethod};
use crate::io::dem::DemInterpolator;
use crate::types::{LookSide, SarError, SarResult};
use serde::{Deserialize, Serialize};

/// Parameters for radar-to-ground iterations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rdr2GeoParams {
    /// Height convergence threshold (meters)
    pub threshold: f64,
    /// Plain fixed-point iterations
    pub max_iterations: usize,
    /// Damped iterations after `max_iterations`
    pub extra_iterations: usize,
    pub orbit_method: OrbitInterpMethod,
}

impl Default for Rdr2GeoParams {
    fn default() -> Self {
        Self {
            threshold: 0.05,        // 5 cm
            max_iterations: 25,
            extra_iterations: 10,
            orbit_method: OrbitInterpMethod::Hermite,
        }
    }
}

impl Rdr2GeoParams {
    pub fn validate(&self) -> SarResult<()> {
        if !(self.threshold > 0.0) {
            return Err(SarError::InvalidParameter(format!(
                "rdr2geo threshold must be positive, got {}",
                self.threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(SarError::InvalidParameter(
                "rdr2geo needs at least one iteration".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for ground-to-radar Newton iterations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geo2RdrParams {
    /// Azimuth time convergence threshold (seconds)
    pub threshold: f64,
    pub max_iterations: usize,
    /// Range step for the Doppler derivative (meters)
    pub delta_range: f64,
    pub orbit_method: OrbitInterpMethod,
}

impl Default for Geo2RdrParams {
    fn default() -> Self {
        Self {
            threshold: 1.0e-8,
            max_iterations: 50,
            delta_range: 1.0e-8,
            orbit_method: OrbitInterpMethod::Hermite,
        }
    }
}

impl Geo2RdrParams {
    pub fn validate(&self) -> SarResult<()> {
        if !(self.threshold > 0.0) || !(self.delta_range > 0.0) {
            return Err(SarError::InvalidParameter(format!(
                "geo2rdr threshold and delta range must be positive, got {} and {}",
                self.threshold, self.delta_range
            )));
        }
        if self.max_iterations == 0 {
            return Err(SarError::InvalidParameter(
                "geo2rdr needs at least one iteration".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a point solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    Converged,
    /// The orbit could not be interpolated at the required time
    OutOfBounds,
    /// Iterations exhausted or no geometric solution
    NotConverged,
}

impl SolveStatus {
    pub fn is_converged(self) -> bool {
        self == SolveStatus::Converged
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rdr2GeoSolution {
    pub llh: Llh,
    pub status: SolveStatus,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geo2RdrSolution {
    /// Seconds since the orbit reference epoch
    pub azimuth_time: f64,
    pub slant_range: f64,
    pub status: SolveStatus,
    pub iterations: usize,
}

/// Locate the ground point imaged at (`az_time`, `slant_range`) with Doppler `doppler` (Hz).
///
/// `guess` seeds the height iterations (its height is used); otherwise the
/// DEM reference height is the first guess. Orbit queries outside the
/// sampled span give `SolveStatus::OutOfBounds`.
#[allow(clippy::too_many_arguments)]
pub fn rdr2geo(
    az_time: f64,
    slant_range: f64,
    doppler: f64,
    orbit: &Orbit,
    ellipsoid: &Ellipsoid,
    dem: &DemInterpolator,
    wavelength: f64,
    side: LookSide,
    params: &Rdr2GeoParams,
    guess: Option<Llh>,
) -> SarResult<Rdr2GeoSolution> {
    let state = orbit.interpolate(az_time, params.orbit_method)?;
    if !state.status.is_ok() {
        return Ok(Rdr2GeoSolution {
            llh: guess.unwrap_or_default(),
            status: SolveStatus::OutOfBounds,
            iterations: 0,
        });
    }
    let basis = Basis::geocentric(state.position, state.velocity);
    Ok(rdr2geo_with_basis(
        state.position,
        state.velocity,
        &basis,
        slant_range,
        doppler,
        ellipsoid,
        dem,
        wavelength,
        side,
        params,
        guess,
    ))
}

/// Core of `rdr2geo` for a platform state and a precomputed geocentric TCN basis
#[allow(clippy::too_many_arguments)]
pub fn rdr2geo_with_basis(
    position: Vec3,
    velocity: Vec3,
    basis: &Basis,
    slant_range: f64,
    doppler: f64,
    ellipsoid: &Ellipsoid,
    dem: &DemInterpolator,
    wavelength: f64,
    side: LookSide,
    params: &Rdr2GeoParams,
    guess: Option<Llh>,
) -> Rdr2GeoSolution {
    let vmag = velocity.norm();
    let dopfact = 0.5 * wavelength * doppler * slant_range / vmag;
    let vhat = velocity.unit();
    let ndotv = basis.normal.dot(vhat);
    let vdott = vhat.dot(basis.tangent);

    // Ellipsoid radius beneath the platform and platform height over it
    let major = ellipsoid.a();
    let minor = ellipsoid.b();
    let sat_dist = position.norm();
    let eta = 1.0
        / ((position.x / major).powi(2) + (position.y / major).powi(2) + (position.z / minor).powi(2)).sqrt();
    let radius = eta * sat_dist;
    let hgt = (1.0 - eta) * sat_dist;

    // Ground point at exact slant range for a target height of `zrdr` over `radius`
    let solve = |zrdr: f64| -> Option<Vec3> {
        if hgt - zrdr >= slant_range {
            return None;
        }
        let a = sat_dist;
        let b = radius + zrdr;
        let costheta = 0.5 * (a / slant_range + slant_range / a - (b / a) * (b / slant_range));
        let sintheta = (1.0 - costheta * costheta).sqrt();
        let gamma = slant_range * costheta;
        let alpha = (dopfact - gamma * ndotv) / vdott;
        let arg = slant_range * slant_range * sintheta * sintheta - alpha * alpha;
        if !(arg >= 0.0) {
            return None;
        }
        let beta = -side.sign() * arg.sqrt();
        let delta = Vec3::lin_comb(alpha, basis.tangent, beta, basis.cross) + basis.normal * gamma;
        Some(position + delta)
    };

    let mut zrdr = guess.map(|g| g.height).unwrap_or_else(|| dem.ref_height());
    let mut target = position;
    let mut llh = guess.unwrap_or_default();
    let mut converged = false;
    let mut iterations = 0;

    for i in 0..(params.max_iterations + params.extra_iterations) {
        iterations = i + 1;
        let candidate = match solve(zrdr) {
            Some(xyz) => xyz,
            None => {
                log::debug!(
                    "no range/Doppler solution at slant range {:.3} m (height guess {:.3} m)",
                    slant_range,
                    zrdr
                );
                return Rdr2GeoSolution {
                    llh,
                    status: SolveStatus::NotConverged,
                    iterations,
                };
            }
        };

        let mut new_llh = ellipsoid.xyz_to_lon_lat(candidate);
        new_llh.height = dem.height_at(new_llh.lon, new_llh.lat);
        let mut new_target = ellipsoid.lon_lat_to_xyz(&new_llh);

        // Damp oscillations once the plain iterations are used up
        if i >= params.max_iterations && i > 0 {
            new_target = Vec3::lin_comb(0.5, target, 0.5, new_target);
            new_llh = ellipsoid.xyz_to_lon_lat(new_target);
        }

        let new_zrdr = new_target.norm() - radius;
        let height_change = (new_zrdr - zrdr).abs();
        zrdr = new_zrdr;
        target = new_target;
        llh = new_llh;
        if height_change < params.threshold {
            converged = true;
            break;
        }
    }

    // Place the final point exactly at the requested range
    if let Some(xyz) = solve(zrdr) {
        llh = ellipsoid.xyz_to_lon_lat(xyz);
    }

    Rdr2GeoSolution {
        llh,
        status: if converged {
            SolveStatus::Converged
        } else {
            SolveStatus::NotConverged
        },
        iterations,
    }
}

/// Find the azimuth time and slant range at which `llh` is imaged.
///
/// Newton iterations on the Doppler equation start from `guess` or the orbit mid time.
#[allow(clippy::too_many_arguments)]
pub fn geo2rdr(
    llh: &Llh,
    ellipsoid: &Ellipsoid,
    orbit: &Orbit,
    doppler: &DopplerModel,
    wavelength: f64,
    params: &Geo2RdrParams,
    guess: Option<f64>,
) -> SarResult<Geo2RdrSolution> {
    orbit.check_method(params.orbit_method)?;
    let target = ellipsoid.lon_lat_to_xyz(llh);

    let mut az_time = match guess.or_else(|| orbit.mid_time()) {
        Some(t) => t,
        None => return Err(SarError::Orbit("orbit has no state vectors".to_string())),
    };
    let mut slant_range = 0.0;
    let mut dt = 0.0;

    for i in 0..params.max_iterations {
        az_time -= dt;
        let state = orbit.interpolate(az_time, params.orbit_method)?;
        if !state.status.is_ok() {
            return Ok(Geo2RdrSolution {
                azimuth_time: az_time,
                slant_range,
                status: SolveStatus::OutOfBounds,
                iterations: i + 1,
            });
        }

        let dr = target - state.position;
        slant_range = dr.norm();

        let fdop = 0.5 * wavelength * doppler.eval(az_time, slant_range);
        let fdopder = (0.5 * wavelength * doppler.eval(az_time, slant_range + params.delta_range) - fdop)
            / params.delta_range;

        let dr_dot_v = dr.dot(state.velocity);
        let fnval = dr_dot_v - fdop * slant_range;

        let acc_term = orbit
            .acceleration_if_available(az_time)?
            .map_or(0.0, |acc| dr.dot(acc));
        let fnprime =
            -state.velocity.dot(state.velocity) + acc_term + (fdop / slant_range + fdopder) * dr_dot_v;
        if fnprime == 0.0 || !fnprime.is_finite() {
            break;
        }

        dt = fnval / fnprime;
        if dt.abs() < params.threshold {
            az_time -= dt;
            let state = orbit.interpolate(az_time, params.orbit_method)?;
            if !state.status.is_ok() {
                return Ok(Geo2RdrSolution {
                    azimuth_time: az_time,
                    slant_range,
                    status: SolveStatus::OutOfBounds,
                    iterations: i + 1,
                });
            }
            return Ok(Geo2RdrSolution {
                azimuth_time: az_time,
                slant_range: (target - state.position).norm(),
                status: SolveStatus::Converged,
                iterations: i + 1,
            });
        }
    }

    Ok(Geo2RdrSolution {
        azimuth_time: az_time,
        slant_range,
        status: SolveStatus::NotConverged,
        iterations: params.max_iterations,
    })
}
