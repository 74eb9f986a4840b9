//! Batch geo2rdr: radar-grid offsets for every pixel of a topo product

use super::radar_grid::RadarGridParameters;
use super::solvers::{geo2rdr, Geo2RdrParams};
use super::{block_ranges, check_output_raster, ConvergenceStats};
use crate::core::doppler::DopplerModel;
use crate::core::ellipsoid::Ellipsoid;
use crate::core::linalg::Vec3;
use crate::core::orbit::Orbit;
use crate::core::projection::Projection;
use crate::io::raster::Raster;
use crate::types::{SarError, SarResult, DEFAULT_BLOCK_LINES, NULL_VALUE};
use ndarray::Array2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Output bands
pub const BAND_RANGE_OFFSET: usize = 1;
pub const BAND_AZIMUTH_OFFSET: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geo2RdrConfig {
    pub lines_per_block: usize,
    /// Constant azimuth shift of the reference grid (lines)
    pub azimuth_shift: f64,
    /// Constant range shift of the reference grid (samples)
    pub range_shift: f64,
    pub geo2rdr: Geo2RdrParams,
}

impl Default for Geo2RdrConfig {
    fn default() -> Self {
        Self {
            lines_per_block: DEFAULT_BLOCK_LINES,
            azimuth_shift: 0.0,
            range_shift: 0.0,
            geo2rdr: Geo2RdrParams::default(),
        }
    }
}

impl Geo2RdrConfig {
    pub fn validate(&self) -> SarResult<()> {
        if self.lines_per_block == 0 {
            return Err(SarError::InvalidParameter(
                "geo2rdr block size must be at least one line".to_string(),
            ));
        }
        if !self.azimuth_shift.is_finite() || !self.range_shift.is_finite() {
            return Err(SarError::InvalidParameter(
                "geo2rdr grid shifts must be finite".to_string(),
            ));
        }
        self.geo2rdr.validate()
    }
}

/// Extents of the shifted reference grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GridExtent {
    pub t0: f64,
    pub tend: f64,
    pub dtaz: f64,
    pub r0: f64,
    pub rngend: f64,
    pub dmrg: f64,
}

impl GridExtent {
    pub fn new(grid: &RadarGridParameters, azimuth_shift: f64, range_shift: f64) -> Self {
        let t0 = grid.sensing_start - (azimuth_shift - 0.5 * (grid.azimuth_looks as f64 - 1.0)) / grid.prf;
        let r0 = grid.starting_range
            - (range_shift - 0.5 * (grid.range_looks as f64 - 1.0)) * grid.range_pixel_spacing;
        let dtaz = grid.azimuth_time_interval();
        let dmrg = grid.range_spacing();
        Self {
            t0,
            tend: t0 + (grid.length - 1) as f64 * dtaz,
            dtaz,
            r0,
            rngend: r0 + (grid.width - 1) as f64 * dmrg,
            dmrg,
        }
    }

    pub fn contains(&self, az_time: f64, slant_range: f64) -> bool {
        az_time >= self.t0 && az_time <= self.tend && slant_range >= self.r0 && slant_range <= self.rngend
    }

    pub fn log(&self, grid: &RadarGridParameters, topo_width: usize, topo_length: usize) {
        log::info!("Starting acquisition time: {}", self.t0);
        log::info!("Stop acquisition time: {}", self.tend);
        log::info!("Azimuth line spacing in seconds: {}", self.dtaz);
        log::info!("Near range (m): {}", self.r0);
        log::info!("Far range (m): {}", self.rngend);
        log::info!("Radar image length: {}", grid.length);
        log::info!("Radar image width: {}", grid.width);
        log::info!("Geocoded lines: {}", topo_length);
        log::info!("Geocoded samples: {}", topo_width);
    }
}

/// Ground-to-radar block driver over a topo product (bands x, y, height)
#[derive(Debug, Clone)]
pub struct Geo2Rdr {
    ellipsoid: Ellipsoid,
    orbit: Orbit,
    doppler: DopplerModel,
    grid: RadarGridParameters,
    config: Geo2RdrConfig,
}

impl Geo2Rdr {
    pub fn new(
        ellipsoid: Ellipsoid,
        orbit: Orbit,
        doppler: DopplerModel,
        grid: RadarGridParameters,
        config: Geo2RdrConfig,
    ) -> SarResult<Self> {
        grid.validate()?;
        config.validate()?;
        orbit.check_method(config.geo2rdr.orbit_method)?;
        Ok(Self {
            ellipsoid,
            orbit,
            doppler,
            grid,
            config,
        })
    }

    pub fn config(&self) -> &Geo2RdrConfig {
        &self.config
    }

    /// Write range and azimuth offsets (grid samples and lines) for every topo pixel.
    ///
    /// `topo` holds x, y and height in bands 1 to 3, in the projection given by its EPSG
    /// code. `output` must match the topo size and have two bands.
    pub fn geo2rdr<T, W>(&self, topo: &T, output: &mut W) -> SarResult<ConvergenceStats>
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
        check_output_raster(output, width, length, 2)?;
        let projection = Projection::from_epsg(topo.epsg())?;

        let extent = GridExtent::new(&self.grid, self.config.azimuth_shift, self.config.range_shift);
        extent.log(&self.grid, width, length);
        let tmid = 0.5 * (extent.t0 + extent.tend);
        self.check_orbit_interpolation(tmid)?;

        let mut stats = ConvergenceStats::default();
        for (line_start, nlines) in block_ranges(length, self.config.lines_per_block.min(length.max(1))) {
            log::info!(
                "Processing block: {} to {} (Dopplers near mid far: {:.3} {:.3} {:.3})",
                line_start,
                line_start + nlines - 1,
                self.doppler.eval(tmid, extent.r0),
                self.doppler.eval(tmid, 0.5 * (extent.r0 + extent.rngend)),
                self.doppler.eval(tmid, extent.rngend)
            );
            let x = topo.get_block(0, line_start, width, nlines, 1)?;
            let y = topo.get_block(0, line_start, width, nlines, 2)?;
            let h = topo.get_block(0, line_start, width, nlines, 3)?;

            let (rgoff, azoff, converged) =
                self.compute_block(&x, &y, &h, &projection, &extent, line_start, tmid)?;
            output.set_block(&rgoff, 0, line_start, BAND_RANGE_OFFSET)?;
            output.set_block(&azoff, 0, line_start, BAND_AZIMUTH_OFFSET)?;
            stats.converged += converged;
            stats.total += nlines * width;
        }
        stats.log();
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn compute_block(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        h: &Array2<f64>,
        projection: &Projection,
        extent: &GridExtent,
        line_start: usize,
        tmid: f64,
    ) -> SarResult<(Array2<f64>, Array2<f64>, usize)> {
        let (nlines, width) = x.dim();
        let solve_line = |k: usize| -> SarResult<(Vec<f64>, Vec<f64>, usize)> {
            let line = (line_start + k) as f64;
            let mut rgoff = vec![NULL_VALUE; width];
            let mut azoff = vec![NULL_VALUE; width];
            let mut converged = 0;
            let mut guess = tmid;

            for pixel in 0..width {
                let (px, py, ph) = (x[[k, pixel]], y[[k, pixel]], h[[k, pixel]]);
                if px == NULL_VALUE || py == NULL_VALUE || ph == NULL_VALUE {
                    continue;
                }
                let llh = projection.inverse(Vec3::new(px, py, ph));
                let sol = geo2rdr(
                    &llh,
                    &self.ellipsoid,
                    &self.orbit,
                    &self.doppler,
                    self.grid.wavelength,
                    &self.config.geo2rdr,
                    Some(guess),
                )?;
                if !sol.status.is_converged() || !extent.contains(sol.azimuth_time, sol.slant_range) {
                    continue;
                }
                guess = sol.azimuth_time;
                rgoff[pixel] = (sol.slant_range - extent.r0) / extent.dmrg - pixel as f64;
                azoff[pixel] = (sol.azimuth_time - extent.t0) / extent.dtaz - line;
                converged += 1;
            }
            Ok((rgoff, azoff, converged))
        };

        #[cfg(feature = "parallel")]
        let lines = (0..nlines).into_par_iter().map(solve_line).collect::<SarResult<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let lines = (0..nlines).map(solve_line).collect::<SarResult<Vec<_>>>()?;

        let mut rgoff = Array2::zeros((nlines, width));
        let mut azoff = Array2::zeros((nlines, width));
        let mut converged = 0;
        for (k, (rg, az, count)) in lines.into_iter().enumerate() {
            rgoff.row_mut(k).assign(&ndarray::ArrayView1::from(&rg));
            azoff.row_mut(k).assign(&ndarray::ArrayView1::from(&az));
            converged += count;
        }
        Ok((rgoff, azoff, converged))
    }

    fn check_orbit_interpolation(&self, t: f64) -> SarResult<()> {
        let state = self.orbit.interpolate(t, self.config.geo2rdr.orbit_method)?;
        if !state.status.is_ok() {
            log::warn!(
                "Cannot interpolate orbit at scene center: requested time {} s, bounds {:?} -> {:?}",
                t,
                self.orbit.start_time(),
                self.orbit.end_time()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LookSide;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_grid_extent_with_looks_and_shifts() {
        let grid = RadarGridParameters {
            sensing_start: 100.0,
            prf: 10.0,
            starting_range: 1000.0,
            range_pixel_spacing: 5.0,
            look_side: LookSide::Right,
            length: 11,
            width: 21,
            azimuth_looks: 3,
            range_looks: 2,
            ..Default::default()
        };
        let ext = GridExtent::new(&grid, 0.0, 0.0);
        assert_abs_diff_eq!(ext.t0, grid.sensing_time(0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(ext.r0, grid.slant_range(0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(ext.tend, grid.sensing_stop(), epsilon = 1e-12);
        assert_abs_diff_eq!(ext.rngend, grid.end_range(), epsilon = 1e-9);

        let shifted = GridExtent::new(&grid, 2.0, 4.0);
        assert_abs_diff_eq!(shifted.t0, ext.t0 - 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(shifted.r0, ext.r0 - 20.0, epsilon = 1e-9);
        assert!(ext.contains(ext.t0, ext.rngend));
        assert!(!ext.contains(ext.tend + 1e-6, ext.r0));
    }

    #[test]
    fn test_scene_center_outside_orbit_is_not_an_error() {
        use chrono::{TimeZone, Utc};
        let mut orbit = Orbit::new(Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap());
        for i in 0..4 {
            let t = 10.0 * i as f64;
            orbit
                .push(t, Vec3::new(7.0e6, 7.5e3 * t, 0.0), Vec3::new(0.0, 7.5e3, 0.0))
                .unwrap();
        }
        let g2r = Geo2Rdr::new(
            Ellipsoid::wgs84(),
            orbit,
            DopplerModel::Zero,
            RadarGridParameters::default(),
            Geo2RdrConfig::default(),
        )
        .unwrap();
        assert!(g2r.check_orbit_interpolation(15.0).is_ok());
        assert!(g2r.check_orbit_interpolation(500.0).is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(Geo2RdrConfig::default().validate().is_ok());
        assert!(Geo2RdrConfig { lines_per_block: 0, ..Default::default() }.validate().is_err());
        assert!(Geo2RdrConfig { range_shift: f64::NAN, ..Default::default() }.validate().is_err());
    }
}
