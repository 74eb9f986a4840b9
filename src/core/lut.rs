//! One- and two-dimensional look-up tables

use crate::core::interpolator::{DataInterpMethod, Interpolator};
use crate::types::{SarError, SarResult};
use ndarray::Array2;

/// Piecewise-linear table over strictly increasing coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1d {
    coords: Vec<f64>,
    values: Vec<f64>,
    extrapolate: bool,
    ref_value: f64,
}

impl Lut1d {
    /// Table that evaluates to `ref_value` everywhere
    pub fn constant(ref_value: f64) -> Self {
        Self {
            coords: Vec::new(),
            values: Vec::new(),
            extrapolate: false,
            ref_value,
        }
    }

    pub fn new(coords: Vec<f64>, values: Vec<f64>, extrapolate: bool) -> SarResult<Self> {
        if coords.len() != values.len() {
            return Err(SarError::InvalidParameter(format!(
                "LUT has {} coordinates but {} values",
                coords.len(),
                values.len()
            )));
        }
        if coords.len() < 2 {
            return Err(SarError::InvalidParameter(
                "LUT needs at least 2 samples".to_string(),
            ));
        }
        if coords.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SarError::InvalidParameter(
                "LUT coordinates must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            coords,
            values,
            extrapolate,
            ref_value: 0.0,
        })
    }

    pub fn have_data(&self) -> bool {
        !self.coords.is_empty()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn ref_value(&self) -> f64 {
        self.ref_value
    }

    pub fn extrapolate(&self) -> bool {
        self.extrapolate
    }

    /// Evaluate at `x`; out of range queries extrapolate linearly when enabled
    /// and clamp to the end values otherwise.
    pub fn eval(&self, x: f64) -> f64 {
        if !self.have_data() {
            return self.ref_value;
        }
        let n = self.coords.len();

        if x <= self.coords[0] || x >= self.coords[n - 1] {
            let (i0, i1, edge) = if x <= self.coords[0] { (0, 1, 0) } else { (n - 2, n - 1, n - 1) };
            if !self.extrapolate || (x - self.coords[edge]).abs() < 1e-12 {
                return self.values[edge];
            }
            return self.linear(i0, i1, x);
        }

        // First coordinate strictly greater than x
        let upper = self.coords.partition_point(|&c| c <= x);
        if (self.coords[upper - 1] - x).abs() < 1e-12 {
            return self.values[upper - 1];
        }
        self.linear(upper - 1, upper, x)
    }

    fn linear(&self, i0: usize, i1: usize, x: f64) -> f64 {
        let (x0, x1) = (self.coords[i0], self.coords[i1]);
        let (y0, y1) = (self.values[i0], self.values[i1]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

/// Table over a regular (x, y) grid, x along columns and y along rows.
///
/// For Doppler tables x is slant range and y is azimuth time.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut2d {
    x_start: f64,
    y_start: f64,
    x_spacing: f64,
    y_spacing: f64,
    data: Array2<f64>,
    interp: Interpolator,
    ref_value: f64,
    have_data: bool,
}

impl Default for Lut2d {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl Lut2d {
    /// Table that evaluates to `ref_value` everywhere
    pub fn constant(ref_value: f64) -> Self {
        Self {
            x_start: 0.0,
            y_start: 0.0,
            x_spacing: 1.0,
            y_spacing: 1.0,
            data: Array2::zeros((0, 0)),
            interp: Interpolator::Bilinear,
            ref_value,
            have_data: false,
        }
    }

    pub fn new(
        x_start: f64,
        y_start: f64,
        x_spacing: f64,
        y_spacing: f64,
        data: Array2<f64>,
        method: DataInterpMethod,
    ) -> SarResult<Self> {
        if !(x_spacing != 0.0 && y_spacing != 0.0) || !x_spacing.is_finite() || !y_spacing.is_finite() {
            return Err(SarError::InvalidParameter(format!(
                "LUT spacing must be finite and non-zero, got ({}, {})",
                x_spacing, y_spacing
            )));
        }
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(SarError::InvalidParameter("LUT data grid is empty".to_string()));
        }
        Ok(Self {
            x_start,
            y_start,
            x_spacing,
            y_spacing,
            data,
            interp: Interpolator::new(method)?,
            ref_value: 0.0,
            have_data: true,
        })
    }

    /// Build from explicit, regularly spaced coordinate vectors
    pub fn from_coords(
        xcoord: &[f64],
        ycoord: &[f64],
        data: Array2<f64>,
        method: DataInterpMethod,
    ) -> SarResult<Self> {
        if xcoord.len() != data.ncols() || ycoord.len() != data.nrows() {
            return Err(SarError::InvalidParameter(format!(
                "LUT coordinates ({} x {}) do not match data shape {:?}",
                ycoord.len(),
                xcoord.len(),
                data.dim()
            )));
        }
        let spacing = |c: &[f64]| if c.len() > 1 { c[1] - c[0] } else { 1.0 };
        Self::new(
            xcoord.first().copied().unwrap_or(0.0),
            ycoord.first().copied().unwrap_or(0.0),
            spacing(xcoord),
            spacing(ycoord),
            data,
            method,
        )
    }

    pub fn have_data(&self) -> bool {
        self.have_data
    }

    pub fn ref_value(&self) -> f64 {
        self.ref_value
    }

    pub fn x_start(&self) -> f64 {
        self.x_start
    }

    pub fn y_start(&self) -> f64 {
        self.y_start
    }

    pub fn x_spacing(&self) -> f64 {
        self.x_spacing
    }

    pub fn y_spacing(&self) -> f64 {
        self.y_spacing
    }

    pub fn x_end(&self) -> f64 {
        self.x_start + (self.data.ncols().saturating_sub(1)) as f64 * self.x_spacing
    }

    pub fn y_end(&self) -> f64 {
        self.y_start + (self.data.nrows().saturating_sub(1)) as f64 * self.y_spacing
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn method(&self) -> DataInterpMethod {
        self.interp.method()
    }

    /// Evaluate at (y, x); queries beyond the grid are clamped onto its edge.
    pub fn eval(&self, y: f64, x: f64) -> f64 {
        if !self.have_data {
            return self.ref_value;
        }
        let max_col = (self.data.ncols() - 1) as f64;
        let max_row = (self.data.nrows() - 1) as f64;
        let col = ((x - self.x_start) / self.x_spacing).clamp(0.0, max_col);
        let row = ((y - self.y_start) / self.y_spacing).clamp(0.0, max_row);
        self.interp.interpolate(col, row, &self.data.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lut1d_interior_and_knots() {
        let lut = Lut1d::new(vec![0.0, 1.0, 3.0], vec![10.0, 20.0, 0.0], false).unwrap();
        assert_abs_diff_eq!(lut.eval(0.5), 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lut.eval(2.0), 10.0, epsilon = 1e-12);
        assert_eq!(lut.eval(1.0), 20.0);
    }

    #[test]
    fn test_lut1d_out_of_range() {
        let clamped = Lut1d::new(vec![0.0, 1.0], vec![0.0, 2.0], false).unwrap();
        assert_eq!(clamped.eval(-5.0), 0.0);
        assert_eq!(clamped.eval(5.0), 2.0);

        let extrap = Lut1d::new(vec![0.0, 1.0], vec![0.0, 2.0], true).unwrap();
        assert_abs_diff_eq!(extrap.eval(-1.0), -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(extrap.eval(3.0), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lut1d_validation() {
        assert!(Lut1d::new(vec![0.0, 0.0], vec![1.0, 2.0], false).is_err());
        assert!(Lut1d::new(vec![0.0, 1.0], vec![1.0], false).is_err());
        assert_eq!(Lut1d::constant(3.5).eval(1e9), 3.5);
    }

    #[test]
    fn test_lut2d_bilinear_plane() {
        let data = Array2::from_shape_fn((5, 6), |(i, j)| 2.0 * i as f64 + 0.5 * j as f64);
        let lut = Lut2d::new(800_000.0, 10.0, 100.0, 2.0, data, DataInterpMethod::Bilinear).unwrap();
        // row 1.5, col 2.25
        assert_abs_diff_eq!(lut.eval(13.0, 800_225.0), 3.0 + 1.125, epsilon = 1e-10);
        // clamped to the last row / first column
        assert_abs_diff_eq!(lut.eval(1e6, 0.0), 8.0, epsilon = 1e-10);
        assert_abs_diff_eq!(lut.x_end(), 800_500.0);
        assert_abs_diff_eq!(lut.y_end(), 18.0);
    }

    #[test]
    fn test_lut2d_without_data() {
        let lut = Lut2d::constant(-12.0);
        assert!(!lut.have_data());
        assert_eq!(lut.eval(0.0, 0.0), -12.0);
    }
}
