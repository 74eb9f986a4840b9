//! sargeo: radar/ground geometry core for SAR processing
//!
//! This library provides the geometric building blocks of a SAR processor: orbit
//! interpolation, ellipsoid and map-projection conversions, DEM interpolation,
//! Doppler models, the rdr2geo/geo2rdr point solvers, and block drivers that run
//! those solvers over whole rasters.

pub mod config;
pub mod core;
pub mod geometry;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    BoundingBox, GeoTransform, LookSide, OrbitData, SarError, SarResult, StateVector, NULL_VALUE,
};

pub use crate::config::ProcessingConfig;
pub use crate::core::{
    DataInterpMethod, DopplerModel, Ellipsoid, InterpStatus, Llh, Lut1d, Lut2d, Orbit, OrbitInterpMethod,
    Projection, Vec3,
};
pub use geometry::{
    geo2rdr, rdr2geo, BaselineProcessor, ConvergenceStats, Geo2Rdr, Geo2RdrParams, RadarGridParameters,
    Rdr2GeoParams, SolveStatus, Topo, TopoConfig,
};
pub use io::{DemInterpolator, MemoryRaster, Raster};

#[cfg(feature = "gdal")]
pub use io::GdalRaster;
