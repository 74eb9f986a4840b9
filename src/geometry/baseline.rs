//! Interferometric baselines between a reference and a secondary acquisition

use super::geo2rdr::GridExtent;
use super::radar_grid::RadarGridParameters;
use super::solvers::{geo2rdr, Geo2RdrParams};
use super::{block_ranges, check_output_raster, ConvergenceStats};
use crate::core::doppler::DopplerModel;
use crate::core::ellipsoid::{Ellipsoid, Llh};
use crate::core::linalg::Vec3;
use crate::core::orbit::{Orbit, OrbitInterpMethod};
use crate::core::projection::Projection;
use crate::io::raster::Raster;
use crate::types::{SarError, SarResult, DEFAULT_BLOCK_LINES, NULL_VALUE};
use ndarray::Array2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Output bands
pub const BAND_TOTAL: usize = 1;
pub const BAND_PARALLEL: usize = 2;
pub const BAND_PERPENDICULAR: usize = 3;
pub const BAND_KZ: usize = 4;
pub const BASELINE_BANDS: usize = 4;

/// Orbit, Doppler and imaging grid of one acquisition
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub orbit: Orbit,
    pub doppler: DopplerModel,
    pub grid: RadarGridParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    pub lines_per_block: usize,
    pub geo2rdr: Geo2RdrParams,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            lines_per_block: DEFAULT_BLOCK_LINES,
            geo2rdr: Geo2RdrParams::default(),
        }
    }
}

impl BaselineConfig {
    pub fn validate(&self) -> SarResult<()> {
        if self.lines_per_block == 0 {
            return Err(SarError::InvalidParameter(
                "baseline block size must be at least one line".to_string(),
            ));
        }
        self.geo2rdr.validate()
    }
}

/// Baseline at one ground point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBaseline {
    /// |secondary - reference| platform separation (meters)
    pub total: f64,
    /// Component along the reference line of sight
    pub parallel: f64,
    /// Component across the line of sight, in the plane of sight and local vertical
    pub perpendicular: f64,
    /// Vertical wavenumber (rad/m)
    pub kz: f64,
}

/// Decompose the platform separation at a target.
///
/// `sat_ref`/`sat_sec` are the platform positions at each acquisition's
/// zero-Doppler (or Doppler-centroid) time for `target`.
pub fn pixel_baseline(
    ellipsoid: &Ellipsoid,
    target: &Llh,
    sat_ref: Vec3,
    sat_sec: Vec3,
    wavelength: f64,
) -> PixelBaseline {
    let target_xyz = ellipsoid.lon_lat_to_xyz(target);
    let baseline = sat_sec - sat_ref;
    let los = target_xyz - sat_ref;
    let slant_range = los.norm();
    let look = los.unit();

    let sat_llh = ellipsoid.xyz_to_lon_lat(sat_ref);
    let up = -ellipsoid.nadir_normal(sat_llh.lon, sat_llh.lat);
    let perp_dir = (up - look * up.dot(look)).unit();

    let parallel = baseline.dot(look);
    let perpendicular = baseline.dot(perp_dir);

    let target_up = -ellipsoid.nadir_normal(target.lon, target.lat);
    let sin_inc = (1.0 - (-look).dot(target_up).powi(2)).max(0.0).sqrt();
    let kz = 4.0 * PI * perpendicular / (wavelength * slant_range * sin_inc);

    PixelBaseline {
        total: baseline.norm(),
        parallel,
        perpendicular,
        kz,
    }
}

/// Per-pixel baselines over a topo product
#[derive(Debug, Clone)]
pub struct BaselineProcessor {
    ellipsoid: Ellipsoid,
    reference: Acquisition,
    secondary: Acquisition,
    config: BaselineConfig,
}

impl BaselineProcessor {
    pub fn new(
        ellipsoid: Ellipsoid,
        reference: Acquisition,
        secondary: Acquisition,
        config: BaselineConfig,
    ) -> SarResult<Self> {
        reference.grid.validate()?;
        secondary.grid.validate()?;
        config.validate()?;
        reference.orbit.check_method(config.geo2rdr.orbit_method)?;
        secondary.orbit.check_method(config.geo2rdr.orbit_method)?;
        Ok(Self {
            ellipsoid,
            reference,
            secondary,
            config,
        })
    }

    /// Write total, parallel and perpendicular baselines and kz for every
    /// pixel of `topo` (x, y, height in bands 1 to 3).
    pub fn compute_baseline<T, W>(&self, topo: &T, output: &mut W) -> SarResult<ConvergenceStats>
    where
        T: Raster + ?Sized,
        W: Raster + ?Sized,
    {
        let (width, length) = (topo.width(), topo.length());
        if topo.num_bands() < 3 {
            return Err(SarError::InvalidParameter(format!(
                "topo raster needs x, y and height bands, found {}",
                topo.num_bands()
            )));
        }
        check_output_raster(output, width, length, BASELINE_BANDS)?;
        let projection = Projection::from_epsg(topo.epsg())?;

        let extent = GridExtent::new(&self.reference.grid, 0.0, 0.0);
        extent.log(&self.reference.grid, width, length);

        let mut stats = ConvergenceStats::default();
        for (line_start, nlines) in block_ranges(length, self.config.lines_per_block) {
            log::info!("Processing block: {} to {}", line_start, line_start + nlines - 1);
            let x = topo.get_block(0, line_start, width, nlines, 1)?;
            let y = topo.get_block(0, line_start, width, nlines, 2)?;
            let h = topo.get_block(0, line_start, width, nlines, 3)?;

            let (bands, converged) = self.compute_block(&x, &y, &h, &projection, &extent)?;
            for (i, band) in bands.iter().enumerate() {
                output.set_block(band, 0, line_start, i + 1)?;
            }
            stats.converged += converged;
            stats.total += nlines * width;
        }
        stats.log();
        Ok(stats)
    }

    fn compute_block(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        h: &Array2<f64>,
        projection: &Projection,
        extent: &GridExtent,
    ) -> SarResult<([Array2<f64>; BASELINE_BANDS], usize)> {
        let (nlines, width) = x.dim();
        let solve_line = |k: usize| -> SarResult<(Vec<[f64; BASELINE_BANDS]>, usize)> {
            let mut values = vec![[NULL_VALUE; BASELINE_BANDS]; width];
            let mut converged = 0;
            for pixel in 0..width {
                let (px, py, ph) = (x[[k, pixel]], y[[k, pixel]], h[[k, pixel]]);
                if px == NULL_VALUE || py == NULL_VALUE || ph == NULL_VALUE {
                    continue;
                }
                let llh = projection.inverse(Vec3::new(px, py, ph));
                if let Some(b) = self.solve_pixel(&llh, extent)? {
                    values[pixel] = [b.total, b.parallel, b.perpendicular, b.kz];
                    converged += 1;
                }
            }
            Ok((values, converged))
        };

        #[cfg(feature = "parallel")]
        let lines = (0..nlines).into_par_iter().map(solve_line).collect::<SarResult<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let lines = (0..nlines).map(solve_line).collect::<SarResult<Vec<_>>>()?;

        let mut bands: [Array2<f64>; BASELINE_BANDS] = std::array::from_fn(|_| Array2::zeros((nlines, width)));
        let mut converged = 0;
        for (k, (values, count)) in lines.into_iter().enumerate() {
            for (pixel, v) in values.iter().enumerate() {
                for (band, &value) in bands.iter_mut().zip(v.iter()) {
                    band[[k, pixel]] = value;
                }
            }
            converged += count;
        }
        Ok((bands, converged))
    }

    fn solve_pixel(&self, llh: &Llh, extent: &GridExtent) -> SarResult<Option<PixelBaseline>> {
        let params = &self.config.geo2rdr;
        let wavelength = self.reference.grid.wavelength;
        let reference = geo2rdr(
            llh,
            &self.ellipsoid,
            &self.reference.orbit,
            &self.reference.doppler,
            wavelength,
            params,
            None,
        )?;
        if !reference.status.is_converged() || !extent.contains(reference.azimuth_time, reference.slant_range) {
            return Ok(None);
        }
        let secondary = geo2rdr(
            llh,
            &self.ellipsoid,
            &self.secondary.orbit,
            &self.secondary.doppler,
            self.secondary.grid.wavelength,
            params,
            None,
        )?;
        if !secondary.status.is_converged() {
            return Ok(None);
        }

        let sat_ref = self.reference.orbit.interpolate(reference.azimuth_time, params.orbit_method)?;
        let sat_sec = self.secondary.orbit.interpolate(secondary.azimuth_time, params.orbit_method)?;
        if !sat_ref.status.is_ok() || !sat_sec.status.is_ok() {
            return Ok(None);
        }
        Ok(Some(pixel_baseline(
            &self.ellipsoid,
            llh,
            sat_ref.position,
            sat_sec.position,
            wavelength,
        )))
    }
}

/// Scene-level baseline in the reference TCN frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineComponents {
    /// Along-track component (meters)
    pub along: f64,
    /// Cross-track horizontal component (meters)
    pub horizontal: f64,
    /// Vertical component, positive up (meters)
    pub vertical: f64,
}

/// Baseline between the reference platform at `t_ref` and the closest point of the secondary orbit.
///
/// `t_ref` is relative to the reference orbit epoch.
pub fn horizontal_vertical_baseline(
    ellipsoid: &Ellipsoid,
    reference: &Orbit,
    secondary: &Orbit,
    t_ref: f64,
    method: OrbitInterpMethod,
) -> SarResult<BaselineComponents> {
    let state_ref = reference.interpolate(t_ref, method)?;
    if !state_ref.status.is_ok() {
        return Err(SarError::Orbit(format!(
            "reference orbit does not cover t = {} s",
            t_ref
        )));
    }

    // Closest approach on the secondary orbit: (p2(t) - p1) . v2(t) = 0
    let mut t = secondary.time_of(reference.datetime_of(t_ref));
    for _ in 0..20 {
        let state = secondary.interpolate(t, method)?;
        if !state.status.is_ok() {
            return Err(SarError::Orbit(format!(
                "secondary orbit does not cover the reference time (t = {} s)",
                t
            )));
        }
        let dp = state.position - state_ref.position;
        let acc_term = secondary
            .acceleration_if_available(t)?
            .map_or(0.0, |acc| dp.dot(acc));
        let fprime = state.velocity.dot(state.velocity) + acc_term;
        let dt = dp.dot(state.velocity) / fprime;
        t -= dt;
        if dt.abs() < 1.0e-9 {
            break;
        }
    }

    let state_sec = secondary.interpolate(t, method)?;
    let baseline = state_sec.position - state_ref.position;
    let basis = ellipsoid.tcn_basis(state_ref.position, state_ref.velocity);
    log::debug!("Secondary closest approach at t = {:.6} s", t);
    Ok(BaselineComponents {
        along: baseline.dot(basis.tangent),
        horizontal: baseline.dot(basis.cross),
        vertical: -baseline.dot(basis.normal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    fn circular_orbit(radius: f64, z_offset: f64) -> Orbit {
        let omega = 0.1_f64.to_radians();
        let mut orbit = Orbit::new(Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap());
        for i in 0..10 {
            let t = 10.0 * i as f64;
            let lon = omega * t;
            let pos = Vec3::new(radius * lon.cos(), radius * lon.sin(), z_offset);
            let vel = Vec3::new(-omega * pos.y, omega * pos.x, 0.0);
            orbit.push(t, pos, vel).unwrap();
        }
        orbit
    }

    #[test]
    fn test_vertical_and_horizontal_offsets() {
        let elp = Ellipsoid::wgs84();
        let r = elp.a() + 700_000.0;
        let reference = circular_orbit(r, 0.0);
        let above = circular_orbit(r + 100.0, 0.0);
        let b = horizontal_vertical_baseline(&elp, &reference, &above, 45.0, OrbitInterpMethod::Hermite).unwrap();
        assert_abs_diff_eq!(b.vertical, 100.0, epsilon = 1e-3);
        assert_abs_diff_eq!(b.horizontal, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(b.along, 0.0, epsilon = 1e-3);

        let north = circular_orbit(r, 50.0);
        let b = horizontal_vertical_baseline(&elp, &reference, &north, 45.0, OrbitInterpMethod::Hermite).unwrap();
        assert_abs_diff_eq!(b.horizontal.abs(), 50.0, epsilon = 1e-3);
        assert_abs_diff_eq!(b.vertical, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_pixel_baseline_decomposition() {
        let elp = Ellipsoid::wgs84();
        let target = Llh::from_degrees(0.0, 5.0, 0.0);
        let sat_ref = Vec3::new(elp.a() + 700_000.0, 0.0, 0.0);
        let sat_sec = sat_ref + Vec3::new(30.0, 0.0, 40.0);
        let b = pixel_baseline(&elp, &target, sat_ref, sat_sec, 0.24);
        assert_abs_diff_eq!(b.total, 50.0, epsilon = 1e-9);
        // Parallel and perpendicular span the baseline here (no along-track part)
        assert_abs_diff_eq!(b.parallel.powi(2) + b.perpendicular.powi(2), 2500.0, epsilon = 1e-6);
        assert!(b.kz.is_finite());

        let same = pixel_baseline(&elp, &target, sat_ref, sat_ref, 0.24);
        assert_eq!(same.total, 0.0);
        assert_eq!(same.kz, 0.0);
    }
}
