//! Topo: map every radar grid pixel to the ground and derive per-pixel
//! geometry layers, processing the grid in blocks of lines.

use super::radar_grid::RadarGridParameters;
use super::solvers::{rdr2geo, rdr2geo_with_basis, Rdr2GeoParams};
use super::{block_ranges, check_output_raster, ConvergenceStats};
use crate::core::doppler::DopplerModel;
use crate::core::ellipsoid::{Basis, Ellipsoid, Llh};
use crate::core::interpolator::DataInterpMethod;
use crate::core::linalg::{enu_basis, Vec3};
use crate::core::orbit::Orbit;
use crate::core::projection::Projection;
use crate::io::dem::DemInterpolator;
use crate::io::raster::Raster;
use crate::types::{
    BoundingBox, SarError, SarResult, DEFAULT_BLOCK_LINES, DEFAULT_EPSG, LAYOVER_VALUE, NULL_VALUE,
    SHADOW_VALUE,
};
use ndarray::Array2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Output band numbers (1-based)
pub const BAND_X: usize = 1;
pub const BAND_Y: usize = 2;
pub const BAND_Z: usize = 3;
pub const BAND_INC: usize = 4;
pub const BAND_HDG: usize = 5;
pub const BAND_LOCAL_INC: usize = 6;
pub const BAND_LOCAL_PSI: usize = 7;
pub const BAND_SIM: usize = 8;
pub const BAND_CROSS_TRACK: usize = 9;
pub const BAND_MASK: usize = 10;

/// Number of bands without the layover/shadow mask
pub const TOPO_BANDS: usize = 9;

/// Height span assumed when bounding the DEM window of a block
const MIN_BLOCK_HEIGHT: f64 = -500.0;
const MAX_BLOCK_HEIGHT: f64 = 9000.0;

/// Topo processing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoConfig {
    pub lines_per_block: usize,
    /// Kernel used on the DEM window
    pub dem_method: DataInterpMethod,
    /// EPSG code of the x/y output layers
    pub epsg_out: i32,
    /// Compute the layover/shadow mask band
    pub compute_mask: bool,
    /// Padding around each block's ground footprint (degrees)
    pub dem_margin: f64,
    pub rdr2geo: Rdr2GeoParams,
}

impl Default for TopoConfig {
    fn default() -> Self {
        Self {
            lines_per_block: DEFAULT_BLOCK_LINES,
            dem_method: DataInterpMethod::Biquintic,
            epsg_out: DEFAULT_EPSG,     // lon/lat degrees
            compute_mask: false,
            dem_margin: 0.05,
            rdr2geo: Rdr2GeoParams::default(),
        }
    }
}

impl TopoConfig {
    pub fn validate(&self) -> SarResult<()> {
        if self.lines_per_block == 0 {
            return Err(SarError::InvalidParameter(
                "topo block size must be at least one line".to_string(),
            ));
        }
        if !(self.dem_margin >= 0.0) {
            return Err(SarError::InvalidParameter(format!(
                "DEM margin must be non-negative, got {}",
                self.dem_margin
            )));
        }
        Projection::from_epsg(self.epsg_out)?;
        self.rdr2geo.validate()
    }
}

/// Geometry layers for a block of radar lines
#[derive(Debug, Clone, PartialEq)]
pub struct TopoLayers {
    /// Ground coordinates in the output projection
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    /// Height above the ellipsoid (meters)
    pub z: Array2<f64>,
    /// Incidence angle on the ellipsoid (degrees)
    pub inc: Array2<f64>,
    /// Heading of the line of sight, counter-clockwise from east (degrees)
    pub hdg: Array2<f64>,
    /// Incidence angle on the local DEM slope (degrees)
    pub local_inc: Array2<f64>,
    /// Angle between the imaging plane and the local slope normal (degrees)
    pub local_psi: Array2<f64>,
    /// Simulated amplitude (log10)
    pub sim: Array2<f64>,
    /// Cross-track distance from the platform (meters)
    pub cross_track: Array2<f64>,
    pub mask: Option<Array2<u8>>,
}

impl TopoLayers {
    pub fn new(length: usize, width: usize, with_mask: bool) -> Self {
        let zeros = || Array2::zeros((length, width));
        Self {
            x: zeros(),
            y: zeros(),
            z: zeros(),
            inc: zeros(),
            hdg: zeros(),
            local_inc: zeros(),
            local_psi: zeros(),
            sim: zeros(),
            cross_track: zeros(),
            mask: with_mask.then(|| Array2::zeros((length, width))),
        }
    }

    pub fn length(&self) -> usize {
        self.x.nrows()
    }

    pub fn width(&self) -> usize {
        self.x.ncols()
    }

    /// Layer written to `band`, the mask excluded
    pub fn band(&self, band: usize) -> Option<&Array2<f64>> {
        match band {
            BAND_X => Some(&self.x),
            BAND_Y => Some(&self.y),
            BAND_Z => Some(&self.z),
            BAND_INC => Some(&self.inc),
            BAND_HDG => Some(&self.hdg),
            BAND_LOCAL_INC => Some(&self.local_inc),
            BAND_LOCAL_PSI => Some(&self.local_psi),
            BAND_SIM => Some(&self.sim),
            BAND_CROSS_TRACK => Some(&self.cross_track),
            _ => None,
        }
    }

    /// Write every layer with the first line at `row_off`
    pub fn write<R: Raster + ?Sized>(&self, raster: &mut R, row_off: usize) -> SarResult<()> {
        for band in 1..=TOPO_BANDS {
            if let Some(layer) = self.band(band) {
                raster.set_block(layer, 0, row_off, band)?;
            }
        }
        if let Some(mask) = &self.mask {
            raster.set_block(&mask.mapv(f64::from), 0, row_off, BAND_MASK)?;
        }
        Ok(())
    }

    fn set_line(&mut self, row: usize, line: &TopoLine) {
        let outputs = [
            (&mut self.x, &line.x),
            (&mut self.y, &line.y),
            (&mut self.z, &line.z),
            (&mut self.inc, &line.inc),
            (&mut self.hdg, &line.hdg),
            (&mut self.local_inc, &line.local_inc),
            (&mut self.local_psi, &line.local_psi),
            (&mut self.sim, &line.sim),
            (&mut self.cross_track, &line.cross_track),
        ];
        for (layer, values) in outputs {
            for (dst, &v) in layer.row_mut(row).iter_mut().zip(values.iter()) {
                *dst = v;
            }
        }
        if let (Some(mask), Some(values)) = (self.mask.as_mut(), line.mask.as_ref()) {
            for (dst, &v) in mask.row_mut(row).iter_mut().zip(values.iter()) {
                *dst = v;
            }
        }
    }
}

/// Results for one radar line
#[derive(Debug, Clone)]
struct TopoLine {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    inc: Vec<f64>,
    hdg: Vec<f64>,
    local_inc: Vec<f64>,
    local_psi: Vec<f64>,
    sim: Vec<f64>,
    cross_track: Vec<f64>,
    mask: Option<Vec<u8>>,
    converged: usize,
}

impl TopoLine {
    fn null(width: usize, with_mask: bool) -> Self {
        let nulls = || vec![NULL_VALUE; width];
        Self {
            x: nulls(),
            y: nulls(),
            z: nulls(),
            inc: nulls(),
            hdg: nulls(),
            local_inc: nulls(),
            local_psi: nulls(),
            sim: nulls(),
            cross_track: nulls(),
            mask: with_mask.then(|| vec![0; width]),
            converged: 0,
        }
    }
}

/// Radar-to-ground block driver
#[derive(Debug, Clone)]
pub struct Topo {
    ellipsoid: Ellipsoid,
    orbit: Orbit,
    doppler: DopplerModel,
    grid: RadarGridParameters,
    config: TopoConfig,
    projection: Projection,
}

impl Topo {
    pub fn new(
        ellipsoid: Ellipsoid,
        orbit: Orbit,
        doppler: DopplerModel,
        grid: RadarGridParameters,
        config: TopoConfig,
    ) -> SarResult<Self> {
        grid.validate()?;
        config.validate()?;
        orbit.check_method(config.rdr2geo.orbit_method)?;
        let projection = Projection::from_epsg(config.epsg_out)?;
        Ok(Self {
            ellipsoid,
            orbit,
            doppler,
            grid,
            config,
            projection,
        })
    }

    pub fn grid(&self) -> &RadarGridParameters {
        &self.grid
    }

    pub fn config(&self) -> &TopoConfig {
        &self.config
    }

    /// Number of output bands this configuration writes
    pub fn num_bands(&self) -> usize {
        if self.config.compute_mask {
            BAND_MASK
        } else {
            TOPO_BANDS
        }
    }

    /// Run over the whole grid, loading a DEM window from `dem_raster` for each block
    pub fn topo<D, W>(&self, dem_raster: &D, output: &mut W) -> SarResult<ConvergenceStats>
    where
        D: Raster + ?Sized,
        W: Raster + ?Sized,
    {
        check_output_raster(output, self.grid.width, self.grid.length, self.num_bands())?;
        self.log_extents();

        let mut stats = ConvergenceStats::default();
        for (line_start, nlines) in block_ranges(self.grid.length, self.config.lines_per_block) {
            log::info!("Processing block: {} to {}", line_start, line_start + nlines - 1);
            let mut dem = DemInterpolator::new(0.0, self.config.dem_method)?;
            match self.block_bounds(line_start, nlines)? {
                Some(bbox) => {
                    dem.load_window(dem_raster, &bbox.padded(self.config.dem_margin))?;
                    let (_, mean) = dem.compute_height_stats();
                    dem.set_ref_height(mean);
                }
                None => log::warn!(
                    "No ground footprint for lines {} to {}; using reference height",
                    line_start,
                    line_start + nlines - 1
                ),
            }
            let (layers, converged) = self.compute_block(&dem, line_start, nlines)?;
            layers.write(output, line_start)?;
            stats.converged += converged;
            stats.total += nlines * self.grid.width;
        }
        stats.log();
        Ok(stats)
    }

    /// Run over the whole grid with an already prepared DEM
    pub fn topo_with_dem<W: Raster + ?Sized>(
        &self,
        dem: &DemInterpolator,
        output: &mut W,
    ) -> SarResult<ConvergenceStats> {
        check_output_raster(output, self.grid.width, self.grid.length, self.num_bands())?;
        self.log_extents();
        dem.declare();

        let mut stats = ConvergenceStats::default();
        for (line_start, nlines) in block_ranges(self.grid.length, self.config.lines_per_block) {
            log::info!("Processing block: {} to {}", line_start, line_start + nlines - 1);
            let (layers, converged) = self.compute_block(dem, line_start, nlines)?;
            layers.write(output, line_start)?;
            stats.converged += converged;
            stats.total += nlines * self.grid.width;
        }
        stats.log();
        Ok(stats)
    }

    /// Layers for `nlines` lines starting at `line_start`, and the number of converged pixels
    pub fn compute_block(
        &self,
        dem: &DemInterpolator,
        line_start: usize,
        nlines: usize,
    ) -> SarResult<(TopoLayers, usize)> {
        #[cfg(feature = "parallel")]
        let lines = (0..nlines)
            .into_par_iter()
            .map(|k| self.process_line(dem, line_start + k))
            .collect::<SarResult<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let lines = (0..nlines)
            .map(|k| self.process_line(dem, line_start + k))
            .collect::<SarResult<Vec<_>>>()?;

        let mut layers = TopoLayers::new(nlines, self.grid.width, self.config.compute_mask);
        let mut converged = 0;
        for (row, line) in lines.iter().enumerate() {
            layers.set_line(row, line);
            converged += line.converged;
        }
        Ok((layers, converged))
    }

    /// Ground footprint (degrees) of a block for the assumed height span
    fn block_bounds(&self, line_start: usize, nlines: usize) -> SarResult<Option<BoundingBox>> {
        let lines = [line_start, line_start + nlines / 2, line_start + nlines - 1];
        let pixels = [0, self.grid.width / 2, self.grid.width - 1];
        let mut bbox: Option<BoundingBox> = None;

        for &height in &[MIN_BLOCK_HEIGHT, MAX_BLOCK_HEIGHT] {
            let dem = DemInterpolator::new(height, DataInterpMethod::Bilinear)?;
            for &line in &lines {
                let t = self.grid.sensing_time(line as f64);
                for &pixel in &pixels {
                    let rng = self.grid.slant_range(pixel as f64);
                    let sol = rdr2geo(
                        t,
                        rng,
                        self.doppler.eval(t, rng),
                        &self.orbit,
                        &self.ellipsoid,
                        &dem,
                        self.grid.wavelength,
                        self.grid.look_side,
                        &self.config.rdr2geo,
                        None,
                    )?;
                    if !sol.status.is_converged() {
                        continue;
                    }
                    let (lon, lat) = (sol.llh.lon_deg(), sol.llh.lat_deg());
                    bbox = Some(match bbox {
                        None => BoundingBox {
                            min_lon: lon,
                            max_lon: lon,
                            min_lat: lat,
                            max_lat: lat,
                        },
                        Some(b) => BoundingBox {
                            min_lon: b.min_lon.min(lon),
                            max_lon: b.max_lon.max(lon),
                            min_lat: b.min_lat.min(lat),
                            max_lat: b.max_lat.max(lat),
                        },
                    });
                }
            }
        }
        Ok(bbox)
    }

    fn process_line(&self, dem: &DemInterpolator, line: usize) -> SarResult<TopoLine> {
        let width = self.grid.width;
        let mut out = TopoLine::null(width, self.config.compute_mask);

        let t = self.grid.sensing_time(line as f64);
        let state = self.orbit.interpolate(t, self.config.rdr2geo.orbit_method)?;
        if !state.status.is_ok() {
            log::debug!("Line {} at t = {:.6} s is outside the orbit", line, t);
            return Ok(out);
        }
        let (pos, vel) = (state.position, state.velocity);
        let basis = Basis::geocentric(pos, vel);
        let side = self.grid.look_side.sign();

        // Look angles for the mask, NaN where unsolved
        let mut look = vec![f64::NAN; width];
        let mut guess: Option<Llh> = None;

        for pixel in 0..width {
            let rng = self.grid.slant_range(pixel as f64);
            let sol = rdr2geo_with_basis(
                pos,
                vel,
                &basis,
                rng,
                self.doppler.eval(t, rng),
                &self.ellipsoid,
                dem,
                self.grid.wavelength,
                self.grid.look_side,
                &self.config.rdr2geo,
                guess,
            );
            if !sol.status.is_converged() {
                guess = None;
                continue;
            }
            guess = Some(sol.llh);
            out.converged += 1;

            let llh = sol.llh;
            let xyz_out = self.projection.forward(&llh);
            out.x[pixel] = xyz_out.x;
            out.y[pixel] = xyz_out.y;
            out.z[pixel] = llh.height;

            let target = self.ellipsoid.lon_lat_to_xyz(&llh);
            let sat_to_ground = target - pos;
            out.cross_track[pixel] = -side * sat_to_ground.dot(basis.cross);
            look[pixel] = (sat_to_ground.unit().dot(basis.normal)).clamp(-1.0, 1.0).acos();

            // Line of sight in the local ENU frame
            let enu_mat = enu_basis(llh.lat, llh.lon);
            let enu_to_ecef_t = enu_mat.transpose();
            let enu = enu_to_ecef_t.mul_vec(sat_to_ground);
            let cosalpha = enu.z.abs() / enu.norm();
            out.inc[pixel] = cosalpha.clamp(-1.0, 1.0).acos().to_degrees();
            out.hdg[pixel] = ((-enu.y).atan2(-enu.x) - 0.5 * std::f64::consts::PI).to_degrees();

            // Terrain slopes (dimensionless) from the DEM
            let (alpha, beta) = self.terrain_slopes(dem, &llh);
            let enu_hat = enu.unit();
            let costheta = ((enu_hat.x * alpha + enu_hat.y * beta - enu_hat.z)
                / (1.0 + alpha * alpha + beta * beta).sqrt())
            .clamp(-1.0, 1.0);
            out.local_inc[pixel] = costheta.acos().to_degrees();

            out.sim[pixel] = simulated_amplitude(costheta);

            // Imaging plane normal against the slope normal
            let n_img = sat_to_ground.cross(vel).unit() * (-side);
            let n_img_enu = enu_to_ecef_t.mul_vec(n_img);
            let n_trg_enu = Vec3::new(-alpha, -beta, 1.0);
            let cospsi = n_trg_enu.dot(n_img_enu) / (n_trg_enu.norm() * n_img_enu.norm());
            out.local_psi[pixel] = cospsi.clamp(-1.0, 1.0).acos().to_degrees();
        }

        if let Some(mask) = out.mask.as_mut() {
            fill_layover_shadow(mask, &look, &out.cross_track);
        }
        Ok(out)
    }

    /// East and north slopes of the DEM at `llh`
    fn terrain_slopes(&self, dem: &DemInterpolator, llh: &Llh) -> (f64, f64) {
        if !dem.have_raster() {
            return (0.0, 0.0);
        }
        let native = dem.projection().forward(llh);
        let (dx, dy) = (dem.delta_x(), dem.delta_y());
        let grad_x = (dem.height_at_xy(native.x + dx, native.y) - dem.height_at_xy(native.x - dx, native.y))
            / (2.0 * dx);
        let grad_y = (dem.height_at_xy(native.x, native.y + dy) - dem.height_at_xy(native.x, native.y - dy))
            / (2.0 * dy);
        if dem.projection().is_geographic() {
            let deg = std::f64::consts::PI / 180.0;
            let scale_x = self.ellipsoid.r_east(llh.lat) * llh.lat.cos() * deg;
            let scale_y = self.ellipsoid.r_north(llh.lat) * deg;
            (grad_x / scale_x, grad_y / scale_y)
        } else {
            (grad_x, grad_y)
        }
    }

    fn log_extents(&self) {
        let grid = &self.grid;
        log::info!("Starting acquisition time: {}", grid.sensing_time(0.0));
        log::info!("Stop acquisition time: {}", grid.sensing_stop());
        log::info!("Azimuth line spacing in seconds: {}", grid.azimuth_time_interval());
        log::info!("Near range (m): {}", grid.starting_range);
        log::info!("Far range (m): {}", grid.end_range());
        log::info!("Radar image length: {}", grid.length);
        log::info!("Radar image width: {}", grid.width);
        log::info!("Look side: {}", grid.look_side);
        log::info!("Output EPSG: {}", self.projection.epsg());
    }
}

/// Mark shadow and layover along one line of increasing slant range.
///
/// Shadow: the look angle falls below the largest look angle seen at nearer
/// range. Layover: the cross-track distance is out of order with respect to
/// nearer (forward pass) or farther (backward pass) pixels.
/// Lowest simulated amplitude, reached at grazing local incidence
const SIM_FLOOR: f64 = -10.0;

/// Simulated amplitude (log10) for the cosine of the local incidence angle
fn simulated_amplitude(costheta: f64) -> f64 {
    let sintheta = (1.0 - costheta * costheta).max(0.0).sqrt();
    let bb = sintheta + 0.1 * costheta;
    let value = (0.01 * costheta / (bb * bb * bb)).abs();
    if value > 0.0 && value.is_finite() {
        value.log10().max(SIM_FLOOR)
    } else {
        SIM_FLOOR
    }
}

fn fill_layover_shadow(mask: &mut [u8], look: &[f64], cross_track: &[f64]) {
    let width = mask.len();

    let mut max_look = f64::NEG_INFINITY;
    let mut max_cross = f64::NEG_INFINITY;
    for i in 0..width {
        if look[i].is_nan() {
            continue;
        }
        if look[i] < max_look {
            mask[i] |= SHADOW_VALUE;
        }
        max_look = max_look.max(look[i]);
        if cross_track[i] < max_cross {
            mask[i] |= LAYOVER_VALUE;
        }
        max_cross = max_cross.max(cross_track[i]);
    }

    let mut min_cross = f64::INFINITY;
    for i in (0..width).rev() {
        if look[i].is_nan() {
            continue;
        }
        if cross_track[i] > min_cross {
            mask[i] |= LAYOVER_VALUE;
        }
        min_cross = min_cross.min(cross_track[i]);
    }
}
