//! DEM and raster access

pub mod dem;
pub mod raster;

pub use dem::DemInterpolator;
pub use raster::{MemoryRaster, Raster};

#[cfg(feature = "gdal")]
pub use raster::GdalRaster;
