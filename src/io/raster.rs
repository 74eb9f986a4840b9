//! Raster access used by the DEM loader and the block drivers
//!
//! Band indices are 1-based, as in GDAL.

use crate::types::{GeoTransform, SarError, SarResult, DEFAULT_EPSG};
use ndarray::{s, Array2};

/// Georeferenced multi-band raster, read and written in blocks of lines
pub trait Raster {
    fn width(&self) -> usize;
    fn length(&self) -> usize;
    fn num_bands(&self) -> usize;
    fn geo_transform(&self) -> GeoTransform;
    fn epsg(&self) -> i32;

    /// Read `nrows` x `ncols` samples starting at (`row_off`, `col_off`)
    fn get_block(
        &self,
        col_off: usize,
        row_off: usize,
        ncols: usize,
        nrows: usize,
        band: usize,
    ) -> SarResult<Array2<f64>>;

    /// Write `block` with its top-left sample at (`row_off`, `col_off`)
    fn set_block(&mut self, block: &Array2<f64>, col_off: usize, row_off: usize, band: usize) -> SarResult<()>;

    fn get_line(&self, row: usize, band: usize) -> SarResult<Vec<f64>> {
        let block = self.get_block(0, row, self.width(), 1, band)?;
        Ok(block.into_raw_vec())
    }

    fn set_line(&mut self, line: &[f64], row: usize, band: usize) -> SarResult<()> {
        let block = Array2::from_shape_vec((1, line.len()), line.to_vec())
            .map_err(|e| SarError::Processing(format!("Failed to shape raster line: {}", e)))?;
        self.set_block(&block, 0, row, band)
    }
}

/// Check a request against the raster extent and band count
pub(crate) fn check_window<R: Raster + ?Sized>(
    raster: &R,
    col_off: usize,
    row_off: usize,
    ncols: usize,
    nrows: usize,
    band: usize,
) -> SarResult<()> {
    if band == 0 || band > raster.num_bands() {
        return Err(SarError::InvalidParameter(format!(
            "band {} out of range (raster has {} bands)",
            band,
            raster.num_bands()
        )));
    }
    if col_off + ncols > raster.width() || row_off + nrows > raster.length() {
        return Err(SarError::InvalidParameter(format!(
            "window {}x{} at ({}, {}) exceeds raster size {}x{}",
            nrows,
            ncols,
            row_off,
            col_off,
            raster.length(),
            raster.width()
        )));
    }
    Ok(())
}

/// In-memory raster with f64 bands
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    bands: Vec<Array2<f64>>,
    geo_transform: GeoTransform,
    epsg: i32,
}

impl MemoryRaster {
    /// `bands` zero-filled bands of `length` lines by `width` samples
    pub fn new(width: usize, length: usize, bands: usize) -> Self {
        Self {
            bands: (0..bands).map(|_| Array2::zeros((length, width))).collect(),
            geo_transform: GeoTransform::from_array([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            epsg: DEFAULT_EPSG,
        }
    }

    /// Single-band raster from an existing array
    pub fn from_band(data: Array2<f64>) -> Self {
        Self {
            bands: vec![data],
            geo_transform: GeoTransform::from_array([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            epsg: DEFAULT_EPSG,
        }
    }

    /// Multi-band raster; all bands must share one shape
    pub fn from_bands(bands: Vec<Array2<f64>>) -> SarResult<Self> {
        let dim = bands.first().map(|b| b.dim()).unwrap_or((0, 0));
        if bands.iter().any(|b| b.dim() != dim) {
            return Err(SarError::InvalidParameter(
                "all raster bands must have the same shape".to_string(),
            ));
        }
        Ok(Self {
            bands,
            geo_transform: GeoTransform::from_array([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            epsg: DEFAULT_EPSG,
        })
    }

    pub fn with_geo_transform(mut self, geo_transform: GeoTransform) -> Self {
        self.geo_transform = geo_transform;
        self
    }

    pub fn with_epsg(mut self, epsg: i32) -> Self {
        self.epsg = epsg;
        self
    }

    /// Borrow band `band` (1-based)
    pub fn band(&self, band: usize) -> SarResult<&Array2<f64>> {
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or_else(|| SarError::InvalidParameter(format!("band {} out of range", band)))
    }

    pub fn into_bands(self) -> Vec<Array2<f64>> {
        self.bands
    }
}

impl Raster for MemoryRaster {
    fn width(&self) -> usize {
        self.bands.first().map(|b| b.ncols()).unwrap_or(0)
    }

    fn length(&self) -> usize {
        self.bands.first().map(|b| b.nrows()).unwrap_or(0)
    }

    fn num_bands(&self) -> usize {
        self.bands.len()
    }

    fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    fn epsg(&self) -> i32 {
        self.epsg
    }

    fn get_block(
        &self,
        col_off: usize,
        row_off: usize,
        ncols: usize,
        nrows: usize,
        band: usize,
    ) -> SarResult<Array2<f64>> {
        check_window(self, col_off, row_off, ncols, nrows, band)?;
        Ok(self.bands[band - 1]
            .slice(s![row_off..row_off + nrows, col_off..col_off + ncols])
            .to_owned())
    }

    fn set_block(&mut self, block: &Array2<f64>, col_off: usize, row_off: usize, band: usize) -> SarResult<()> {
        let (nrows, ncols) = block.dim();
        check_window(self, col_off, row_off, ncols, nrows, band)?;
        self.bands[band - 1]
            .slice_mut(s![row_off..row_off + nrows, col_off..col_off + ncols])
            .assign(block);
        Ok(())
    }
}

#[cfg(feature = "gdal")]
pub use self::gdal_raster::GdalRaster;

#[cfg(feature = "gdal")]
mod gdal_raster {
    use super::{check_window, Raster};
    use crate::types::{GeoTransform, SarError, SarResult, DEFAULT_EPSG};
    use gdal::raster::Buffer;
    use gdal::spatial_ref::SpatialRef;
    use gdal::{Dataset, DatasetOptions, DriverManager, GdalOpenFlags};
    use ndarray::Array2;
    use std::path::Path;

    /// GDAL-backed raster
    pub struct GdalRaster {
        dataset: Dataset,
        width: usize,
        length: usize,
        bands: usize,
    }

    impl GdalRaster {
        /// Open an existing dataset read-only
        pub fn open<P: AsRef<Path>>(path: P) -> SarResult<Self> {
            log::info!("Opening raster: {}", path.as_ref().display());
            Self::from_dataset(Dataset::open(path.as_ref())?)
        }

        /// Open an existing dataset for update
        pub fn open_update<P: AsRef<Path>>(path: P) -> SarResult<Self> {
            let options = DatasetOptions {
                open_flags: GdalOpenFlags::GDAL_OF_UPDATE,
                ..Default::default()
            };
            Self::from_dataset(Dataset::open_ex(path.as_ref(), options)?)
        }

        /// Create a GeoTIFF of f64 bands
        pub fn create<P: AsRef<Path>>(
            path: P,
            width: usize,
            length: usize,
            bands: usize,
            geo_transform: &GeoTransform,
            epsg: i32,
        ) -> SarResult<Self> {
            let driver = DriverManager::get_driver_by_name("GTiff")?;
            let mut dataset = driver.create_with_band_type::<f64, _>(
                path.as_ref(),
                width as isize,
                length as isize,
                bands as isize,
            )?;
            dataset.set_geo_transform(&geo_transform.to_array())?;
            dataset.set_spatial_ref(&SpatialRef::from_epsg(epsg as u32)?)?;
            log::debug!(
                "Created {} ({}x{}, {} bands)",
                path.as_ref().display(),
                length,
                width,
                bands
            );
            Self::from_dataset(dataset)
        }

        fn from_dataset(dataset: Dataset) -> SarResult<Self> {
            let (width, length) = dataset.raster_size();
            let bands = dataset.raster_count() as usize;
            Ok(Self {
                dataset,
                width,
                length,
                bands,
            })
        }
    }

    impl Raster for GdalRaster {
        fn width(&self) -> usize {
            self.width
        }

        fn length(&self) -> usize {
            self.length
        }

        fn num_bands(&self) -> usize {
            self.bands
        }

        fn geo_transform(&self) -> GeoTransform {
            self.dataset
                .geo_transform()
                .map(GeoTransform::from_array)
                .unwrap_or_else(|_| GeoTransform::from_array([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]))
        }

        fn epsg(&self) -> i32 {
            self.dataset
                .spatial_ref()
                .and_then(|srs| srs.auth_code())
                .unwrap_or(DEFAULT_EPSG)
        }

        fn get_block(
            &self,
            col_off: usize,
            row_off: usize,
            ncols: usize,
            nrows: usize,
            band: usize,
        ) -> SarResult<Array2<f64>> {
            check_window(self, col_off, row_off, ncols, nrows, band)?;
            let rasterband = self.dataset.rasterband(band as isize)?;
            let buffer = rasterband.read_as::<f64>(
                (col_off as isize, row_off as isize),
                (ncols, nrows),
                (ncols, nrows),
                None,
            )?;
            Array2::from_shape_vec((nrows, ncols), buffer.data)
                .map_err(|e| SarError::Processing(format!("Failed to reshape raster block: {}", e)))
        }

        fn set_block(&mut self, block: &Array2<f64>, col_off: usize, row_off: usize, band: usize) -> SarResult<()> {
            let (nrows, ncols) = block.dim();
            check_window(self, col_off, row_off, ncols, nrows, band)?;
            let mut rasterband = self.dataset.rasterband(band as isize)?;
            let buffer = Buffer::new((ncols, nrows), block.iter().cloned().collect());
            rasterband.write((col_off as isize, row_off as isize), (ncols, nrows), &buffer)?;
            Ok(())
        }
    }
}
