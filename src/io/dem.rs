use crate::core::ellipsoid::Llh;
use crate::core::interpolator::{DataInterpMethod, Interpolator};
use crate::core::projection::Projection;
use crate::io::raster::Raster;
use crate::types::{BoundingBox, GeoTransform, SarError, SarResult, DEFAULT_EPSG};
use ndarray::Array2;

/// Lowest height considered when scanning a DEM window for its maximum
const MIN_DEM_HEIGHT: f64 = -10_000.0;

/// Height lookup over a window of a digital elevation model.
///
/// Without a loaded window every query returns the reference height.
#[derive(Debug, Clone)]
pub struct DemInterpolator {
    ref_height: f64,
    have_raster: bool,
    dem: Array2<f32>,
    /// Native coordinates of the first sample center
    x_start: f64,
    y_start: f64,
    delta_x: f64,
    delta_y: f64,
    projection: Projection,
    interp: Interpolator,
    max_height: f64,
    mean_height: f64,
}

impl Default for DemInterpolator {
    fn default() -> Self {
        Self {
            ref_height: 0.0,
            have_raster: false,
            dem: Array2::zeros((0, 0)),
            x_start: 0.0,
            y_start: 0.0,
            delta_x: 1.0,
            delta_y: 1.0,
            projection: Projection::LonLat,
            interp: Interpolator::Bilinear,
            max_height: 0.0,
            mean_height: 0.0,
        }
    }
}

impl DemInterpolator {
    /// Constant-height DEM; `method` applies once a window is loaded
    pub fn new(ref_height: f64, method: DataInterpMethod) -> SarResult<Self> {
        Ok(Self {
            ref_height,
            interp: Interpolator::new(method)?,
            max_height: ref_height,
            mean_height: ref_height,
            ..Default::default()
        })
    }

    /// DEM over an in-memory grid whose geotransform refers to pixel corners
    pub fn from_grid(
        grid: Array2<f32>,
        geo_transform: &GeoTransform,
        epsg: i32,
        method: DataInterpMethod,
        ref_height: f64,
    ) -> SarResult<Self> {
        if grid.nrows() == 0 || grid.ncols() == 0 {
            return Err(SarError::InvalidParameter("DEM grid is empty".to_string()));
        }
        let mut dem = Self::new(ref_height, method)?;
        dem.projection = Projection::from_epsg(normalize_epsg(epsg))?;
        dem.delta_x = geo_transform.pixel_width;
        dem.delta_y = geo_transform.pixel_height;
        dem.x_start = geo_transform.top_left_x + 0.5 * dem.delta_x;
        dem.y_start = geo_transform.top_left_y + 0.5 * dem.delta_y;
        dem.dem = grid;
        dem.have_raster = true;
        dem.compute_height_stats();
        Ok(dem)
    }

    /// Read the part of `raster` covering `bbox` (degrees).
    ///
    /// A request beyond the raster extent is clamped to it with a warning.
    pub fn load_window<R: Raster + ?Sized>(&mut self, raster: &R, bbox: &BoundingBox) -> SarResult<()> {
        let gt = raster.geo_transform();
        let (width, length) = (raster.width(), raster.length());
        if width < 2 || length < 2 {
            return Err(SarError::InvalidParameter(format!(
                "DEM raster too small: {}x{}",
                length, width
            )));
        }
        let projection = Projection::from_epsg(normalize_epsg(raster.epsg()))?;
        let (dx, dy) = (gt.pixel_width, gt.pixel_height);

        let first_x = gt.top_left_x + 0.5 * dx;
        let first_y = gt.top_left_y + 0.5 * dy;
        let last_x = first_x + (width - 2) as f64 * dx;
        let last_y = first_y + (length - 2) as f64 * dy;

        // Bounding box corners in native coordinates
        let corners = [
            (bbox.min_lon, bbox.min_lat),
            (bbox.min_lon, bbox.max_lat),
            (bbox.max_lon, bbox.min_lat),
            (bbox.max_lon, bbox.max_lat),
        ]
        .map(|(lon, lat)| projection.forward(&Llh::from_degrees(lon, lat, 0.0)));
        let mut min_x = corners.iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
        let mut max_x = corners.iter().map(|c| c.x).fold(f64::NEG_INFINITY, f64::max);
        let mut min_y = corners.iter().map(|c| c.y).fold(f64::INFINITY, f64::min);
        let mut max_y = corners.iter().map(|c| c.y).fold(f64::NEG_INFINITY, f64::max);

        let (west, east) = (first_x.min(last_x), first_x.max(last_x));
        let (south, north) = (first_y.min(last_y), first_y.max(last_y));
        if min_x < west {
            log::warn!("West limit may be insufficient for global height range");
            min_x = west;
        }
        if max_x > east {
            log::warn!("East limit may be insufficient for global height range");
            max_x = east;
        }
        if min_y < south {
            log::warn!("South limit may be insufficient for global height range");
            min_y = south;
        }
        if max_y > north {
            log::warn!("North limit may be insufficient for global height range");
            max_y = north;
        }

        // Pixel limits, with north-up rasters counting rows from max_y
        let (x_lo, x_hi) = if dx > 0.0 { (min_x, max_x) } else { (max_x, min_x) };
        let (y_lo, y_hi) = if dy < 0.0 { (max_y, min_y) } else { (min_y, max_y) };
        let xstart = ((x_lo - first_x) / dx).max(0.0) as usize;
        let xend = (((x_hi - first_x) / dx + 0.5).max(0.0) as usize).min(width - 1);
        let ystart = ((y_lo - first_y) / dy).max(0.0) as usize;
        let yend = (((y_hi - first_y) / dy + 0.5).max(0.0) as usize).min(length - 1);

        if xend < xstart || yend < ystart {
            return Err(SarError::Processing(format!(
                "bounding box {:?} does not overlap the DEM raster",
                bbox
            )));
        }
        let ncols = xend - xstart + 1;
        let nrows = yend - ystart + 1;

        log::info!(
            "Loading DEM window: {} lines x {} samples starting at ({}, {})",
            nrows,
            ncols,
            ystart,
            xstart
        );
        let block = raster.get_block(xstart, ystart, ncols, nrows, 1)?;

        self.dem = block.mapv(|h| h as f32);
        self.projection = projection;
        self.delta_x = dx;
        self.delta_y = dy;
        self.x_start = first_x + xstart as f64 * dx;
        self.y_start = first_y + ystart as f64 * dy;
        self.have_raster = true;
        self.compute_height_stats();
        Ok(())
    }

    /// Height at geodetic `lon`, `lat` (radians)
    pub fn height_at(&self, lon: f64, lat: f64) -> f64 {
        if !self.have_raster {
            return self.ref_height;
        }
        let xy = self.projection.forward(&Llh::new(lon, lat, 0.0));
        self.height_at_xy(xy.x, xy.y)
    }

    /// Height at native coordinates; within 2 pixels of the window edge
    /// the reference height is returned.
    pub fn height_at_xy(&self, x: f64, y: f64) -> f64 {
        if !self.have_raster {
            return self.ref_height;
        }
        let row = (y - self.y_start) / self.delta_y;
        let col = (x - self.x_start) / self.delta_x;
        if !row.is_finite() || !col.is_finite() {
            return self.ref_height;
        }

        let (nrows, ncols) = self.dem.dim();
        let (irow, icol) = (row.floor(), col.floor());
        if irow < 2.0 || irow >= (nrows as f64 - 1.0) || icol < 2.0 || icol >= (ncols as f64 - 1.0) {
            return self.ref_height;
        }
        self.interp.interpolate(col, row, &self.dem.view()) as f64
    }

    /// Max and mean of the loaded window; the reference height without one
    pub fn compute_height_stats(&mut self) -> (f64, f64) {
        if !self.have_raster || self.dem.is_empty() {
            self.max_height = self.ref_height;
            self.mean_height = self.ref_height;
            return (self.max_height, self.mean_height);
        }
        let mut max_height = MIN_DEM_HEIGHT;
        let mut sum = 0.0;
        for &h in self.dem.iter() {
            let h = h as f64;
            max_height = max_height.max(h);
            sum += h;
        }
        self.max_height = max_height;
        self.mean_height = sum / self.dem.len() as f64;
        log::debug!(
            "DEM window heights: max {:.2} m, mean {:.2} m",
            self.max_height,
            self.mean_height
        );
        (self.max_height, self.mean_height)
    }

    /// Geodetic (lon, lat) in radians of the window center
    pub fn mid_lon_lat(&self) -> Option<(f64, f64)> {
        if !self.have_raster {
            return None;
        }
        let (nrows, ncols) = self.dem.dim();
        let x = self.x_start + 0.5 * (ncols - 1) as f64 * self.delta_x;
        let y = self.y_start + 0.5 * (nrows - 1) as f64 * self.delta_y;
        let llh = self.projection.inverse(crate::core::linalg::Vec3::new(x, y, 0.0));
        Some((llh.lon, llh.lat))
    }

    /// Log the window extent
    pub fn declare(&self) {
        if !self.have_raster {
            log::info!("DEM: constant reference height {} m", self.ref_height);
            return;
        }
        let (nrows, ncols) = self.dem.dim();
        log::info!("DEM EPSG: {}", self.projection.epsg());
        log::info!("DEM interpolation: {}", self.interp.method());
        log::info!(
            "DEM x: start {} spacing {} end {}",
            self.x_start,
            self.delta_x,
            self.x_start + (ncols - 1) as f64 * self.delta_x
        );
        log::info!(
            "DEM y: start {} spacing {} end {}",
            self.y_start,
            self.delta_y,
            self.y_start + (nrows - 1) as f64 * self.delta_y
        );
        log::info!("DEM window: {} lines x {} samples", nrows, ncols);
    }

    pub fn have_raster(&self) -> bool {
        self.have_raster
    }

    pub fn ref_height(&self) -> f64 {
        self.ref_height
    }

    pub fn set_ref_height(&mut self, ref_height: f64) {
        self.ref_height = ref_height;
    }

    pub fn max_height(&self) -> f64 {
        self.max_height
    }

    pub fn mean_height(&self) -> f64 {
        self.mean_height
    }

    pub fn x_start(&self) -> f64 {
        self.x_start
    }

    pub fn y_start(&self) -> f64 {
        self.y_start
    }

    pub fn delta_x(&self) -> f64 {
        self.delta_x
    }

    pub fn delta_y(&self) -> f64 {
        self.delta_y
    }

    pub fn width(&self) -> usize {
        self.dem.ncols()
    }

    pub fn length(&self) -> usize {
        self.dem.nrows()
    }

    pub fn epsg(&self) -> i32 {
        self.projection.epsg()
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn method(&self) -> DataInterpMethod {
        self.interp.method()
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.dem
    }
}

/// Rasters without a spatial reference report -9999; they are read as lon/lat
fn normalize_epsg(epsg: i32) -> i32 {
    if epsg == -9999 {
        DEFAULT_EPSG
    } else {
        epsg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::raster::MemoryRaster;
    use approx::assert_abs_diff_eq;

    fn ramp_raster() -> MemoryRaster {
        // 1/100 degree posting over lon [-1, 1), lat (0, 2], height = 1000 * lon
        let data = Array2::from_shape_fn((200, 200), |(_, j)| 1000.0 * (-1.0 + 0.01 * (j as f64 + 0.5)));
        MemoryRaster::from_band(data)
            .with_geo_transform(GeoTransform::from_array([-1.0, 0.01, 0.0, 2.0, 0.0, -0.01]))
            .with_epsg(4326)
    }

    #[test]
    fn test_constant_height_without_raster() {
        let dem = DemInterpolator::new(250.0, DataInterpMethod::Biquintic).unwrap();
        assert_eq!(dem.height_at(0.0, 0.0), 250.0);
        assert_eq!(dem.height_at(3.1, -1.5), 250.0);
        assert_eq!(dem.height_at_xy(1e9, -1e9), 250.0);
        assert!(dem.mid_lon_lat().is_none());
    }

    #[test]
    fn test_load_window_and_interpolate() {
        let raster = ramp_raster();
        let mut dem = DemInterpolator::new(0.0, DataInterpMethod::Bilinear).unwrap();
        let bbox = BoundingBox {
            min_lon: -0.5,
            max_lon: 0.5,
            min_lat: 0.5,
            max_lat: 1.5,
        };
        dem.load_window(&raster, &bbox).unwrap();
        assert!(dem.have_raster());
        assert!(dem.width() >= 100 && dem.width() <= 102);

        let h = dem.height_at(0.123_f64.to_radians(), 1.0_f64.to_radians());
        assert_abs_diff_eq!(h, 123.0, epsilon = 1e-2);
    }

    #[test]
    fn test_window_clamped_to_raster() {
        let raster = ramp_raster();
        let mut dem = DemInterpolator::new(0.0, DataInterpMethod::Nearest).unwrap();
        let bbox = BoundingBox {
            min_lon: -5.0,
            max_lon: 5.0,
            min_lat: -5.0,
            max_lat: 5.0,
        };
        dem.load_window(&raster, &bbox).unwrap();
        // The last row and column are never part of a window
        assert_eq!(dem.width(), 199);
        assert_eq!(dem.length(), 199);
        assert_abs_diff_eq!(dem.max_height(), 985.0, epsilon = 1e-2);
        assert_abs_diff_eq!(dem.mean_height(), -5.0, epsilon = 1e-2);
    }

    #[test]
    fn test_edge_returns_reference_height() {
        let grid = Array2::from_elem((10, 10), 42.0_f32);
        let gt = GeoTransform::from_array([0.0, 1.0, 0.0, 10.0, 0.0, -1.0]);
        let dem = DemInterpolator::from_grid(grid, &gt, 4326, DataInterpMethod::Bicubic, -7.0).unwrap();
        // Center of the first pixel is (0.5, 9.5): row 0, col 0
        assert_eq!(dem.height_at_xy(0.5, 9.5), -7.0);
        assert_abs_diff_eq!(dem.height_at_xy(5.0, 5.0), 42.0, epsilon = 1e-5);
        let (lon, lat) = dem.mid_lon_lat().unwrap();
        assert_abs_diff_eq!(lon.to_degrees(), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lat.to_degrees(), 5.0, epsilon = 1e-9);
    }
}
