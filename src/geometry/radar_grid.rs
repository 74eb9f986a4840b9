use crate::types::{LookSide, SarError, SarResult};
use serde::{Deserialize, Serialize};

/// Radar image grid: azimuth sampling in time and range sampling in meters.
///
/// With multi-looking, line `i` of the grid is centered on the middle of its
/// `azimuth_looks` full-resolution lines (likewise in range).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarGridParameters {
    /// Time of the first full-resolution line, seconds since the orbit epoch
    pub sensing_start: f64,
    /// Radar wavelength (meters)
    pub wavelength: f64,
    /// Pulse repetition frequency (Hz)
    pub prf: f64,
    /// Slant range to the first full-resolution sample (meters)
    pub starting_range: f64,
    /// Slant range pixel spacing (meters)
    pub range_pixel_spacing: f64,
    pub look_side: LookSide,
    /// Number of lines
    pub length: usize,
    /// Number of samples per line
    pub width: usize,
    pub azimuth_looks: usize,
    pub range_looks: usize,
}

impl Default for RadarGridParameters {
    fn default() -> Self {
        Self {
            sensing_start: 0.0,
            wavelength: 0.24,          // L-band
            prf: 1000.0,
            starting_range: 800_000.0,
            range_pixel_spacing: 10.0,
            look_side: LookSide::Right,
            length: 1,
            width: 1,
            azimuth_looks: 1,
            range_looks: 1,
        }
    }
}

impl RadarGridParameters {
    pub fn validate(&self) -> SarResult<()> {
        if !(self.prf > 0.0) || !(self.wavelength > 0.0) || !(self.range_pixel_spacing > 0.0) {
            return Err(SarError::InvalidParameter(format!(
                "radar grid needs positive PRF, wavelength and pixel spacing, got {} / {} / {}",
                self.prf, self.wavelength, self.range_pixel_spacing
            )));
        }
        if self.length == 0 || self.width == 0 || self.azimuth_looks == 0 || self.range_looks == 0 {
            return Err(SarError::InvalidParameter(
                "radar grid dimensions and looks must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Azimuth spacing between grid lines (seconds)
    pub fn azimuth_time_interval(&self) -> f64 {
        self.azimuth_looks as f64 / self.prf
    }

    /// Range spacing between grid samples (meters)
    pub fn range_spacing(&self) -> f64 {
        self.range_looks as f64 * self.range_pixel_spacing
    }

    /// Time of grid line `line`
    pub fn sensing_time(&self, line: f64) -> f64 {
        self.sensing_start
            + (0.5 * (self.azimuth_looks as f64 - 1.0) + line * self.azimuth_looks as f64) / self.prf
    }

    /// Slant range of grid sample `pixel`
    pub fn slant_range(&self, pixel: f64) -> f64 {
        self.starting_range
            + (0.5 * (self.range_looks as f64 - 1.0) + pixel * self.range_looks as f64) * self.range_pixel_spacing
    }

    pub fn sensing_stop(&self) -> f64 {
        self.sensing_time((self.length - 1) as f64)
    }

    pub fn sensing_mid(&self) -> f64 {
        0.5 * (self.sensing_time(0.0) + self.sensing_stop())
    }

    pub fn end_range(&self) -> f64 {
        self.slant_range((self.width - 1) as f64)
    }

    pub fn mid_range(&self) -> f64 {
        0.5 * (self.starting_range + self.end_range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_multilooked_grid_centers() {
        let grid = RadarGridParameters {
            sensing_start: 10.0,
            prf: 100.0,
            starting_range: 1000.0,
            range_pixel_spacing: 2.0,
            length: 5,
            width: 4,
            azimuth_looks: 3,
            range_looks: 2,
            ..Default::default()
        };
        assert_abs_diff_eq!(grid.sensing_time(0.0), 10.01, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.sensing_time(2.0), 10.07, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.slant_range(0.0), 1001.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.end_range(), 1013.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grid.azimuth_time_interval(), 0.03, epsilon = 1e-15);
        assert!(grid.validate().is_ok());
        assert!(RadarGridParameters { prf: 0.0, ..grid }.validate().is_err());
    }
}
