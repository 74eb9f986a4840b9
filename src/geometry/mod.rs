//! Radar/ground geometry: point solvers and the block drivers built on them

pub mod baseline;
pub mod geo2rdr;
pub mod radar_grid;
pub mod solvers;
pub mod topo;

use crate::io::raster::Raster;
use crate::types::{SarError, SarResult};

// Re-export main types
pub use baseline::{
    horizontal_vertical_baseline, pixel_baseline, Acquisition, BaselineComponents, BaselineConfig,
    BaselineProcessor, PixelBaseline,
};
pub use geo2rdr::{Geo2Rdr, Geo2RdrConfig};
pub use radar_grid::RadarGridParameters;
pub use solvers::{
    geo2rdr, rdr2geo, rdr2geo_with_basis, Geo2RdrParams, Geo2RdrSolution, Rdr2GeoParams, Rdr2GeoSolution,
    SolveStatus,
};
pub use topo::{Topo, TopoConfig, TopoLayers};

/// Pixel convergence counts accumulated by a block driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvergenceStats {
    pub converged: usize,
    pub total: usize,
}

impl ConvergenceStats {
    pub fn failed(&self) -> usize {
        self.total - self.converged
    }

    /// Fraction of converged pixels, 0 for an empty run
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.converged as f64 / self.total as f64
        }
    }

    pub(crate) fn log(&self) {
        log::info!("Total convergence: {} out of {}", self.converged, self.total);
    }
}

/// Require an output raster of the given shape with at least `bands` bands
pub(crate) fn check_output_raster<R: Raster + ?Sized>(
    raster: &R,
    width: usize,
    length: usize,
    bands: usize,
) -> SarResult<()> {
    if raster.width() != width || raster.length() != length {
        return Err(SarError::InvalidParameter(format!(
            "output raster is {}x{}, expected {}x{}",
            raster.length(),
            raster.width(),
            length,
            width
        )));
    }
    if raster.num_bands() < bands {
        return Err(SarError::InvalidParameter(format!(
            "output raster has {} bands, need {}",
            raster.num_bands(),
            bands
        )));
    }
    Ok(())
}

/// Line ranges `[start, start + n)` covering `length` lines in blocks of `block_lines`
pub(crate) fn block_ranges(length: usize, block_lines: usize) -> impl Iterator<Item = (usize, usize)> {
    let step = block_lines.max(1);
    (0..length)
        .step_by(step)
        .map(move |start| (start, step.min(length - start)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ranges_cover_all_lines() {
        let blocks: Vec<_> = block_ranges(25, 10).collect();
        assert_eq!(blocks, vec![(0, 10), (10, 10), (20, 5)]);
        assert_eq!(block_ranges(0, 10).count(), 0);
        assert_eq!(block_ranges(3, 1000).collect::<Vec<_>>(), vec![(0, 3)]);
    }

    #[test]
    fn test_convergence_ratio() {
        let stats = ConvergenceStats { converged: 3, total: 4 };
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.ratio(), 0.75);
        assert_eq!(ConvergenceStats::default().ratio(), 0.0);
    }
}
