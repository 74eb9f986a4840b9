//! 2D interpolation kernels over regularly sampled grids
//!
//! Every kernel takes a fractional column `x` and row `y` in pixel units of
//! the grid and returns the interpolated sample. Indices that would fall
//! outside the grid are clamped to the nearest edge sample.

use crate::types::{SarError, SarResult, SINC_LEN, SINC_SUB};
use nalgebra::{DMatrix, DVector};
use ndarray::ArrayView2;
use num_complex::Complex;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul};
use std::str::FromStr;

/// Grid sample types the kernels operate on.
///
/// Arithmetic happens in `Acc` (double precision) and is narrowed back at the end.
pub trait InterpSample: Copy + Send + Sync {
    type Acc: Copy + Zero + Add<Output = Self::Acc> + Mul<f64, Output = Self::Acc>;

    fn widen(self) -> Self::Acc;
    fn narrow(acc: Self::Acc) -> Self;
}

impl InterpSample for f32 {
    type Acc = f64;
    fn widen(self) -> f64 {
        self as f64
    }
    fn narrow(acc: f64) -> f32 {
        acc as f32
    }
}

impl InterpSample for f64 {
    type Acc = f64;
    fn widen(self) -> f64 {
        self
    }
    fn narrow(acc: f64) -> f64 {
        acc
    }
}

impl InterpSample for Complex<f32> {
    type Acc = Complex<f64>;
    fn widen(self) -> Complex<f64> {
        Complex::new(self.re as f64, self.im as f64)
    }
    fn narrow(acc: Complex<f64>) -> Complex<f32> {
        Complex::new(acc.re as f32, acc.im as f32)
    }
}

impl InterpSample for Complex<f64> {
    type Acc = Complex<f64>;
    fn widen(self) -> Complex<f64> {
        self
    }
    fn narrow(acc: Complex<f64>) -> Complex<f64> {
        acc
    }
}

/// Interpolation kernel selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataInterpMethod {
    Nearest,
    Bilinear,
    Bicubic,
    Biquintic,
    Sinc,
}

impl Default for DataInterpMethod {
    fn default() -> Self {
        DataInterpMethod::Biquintic
    }
}

impl FromStr for DataInterpMethod {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(DataInterpMethod::Nearest),
            "bilinear" => Ok(DataInterpMethod::Bilinear),
            "bicubic" => Ok(DataInterpMethod::Bicubic),
            "biquintic" => Ok(DataInterpMethod::Biquintic),
            "sinc" => Ok(DataInterpMethod::Sinc),
            _ => Err(SarError::InvalidParameter(format!(
                "Unknown interpolation method: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for DataInterpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataInterpMethod::Nearest => "nearest",
            DataInterpMethod::Bilinear => "bilinear",
            DataInterpMethod::Bicubic => "bicubic",
            DataInterpMethod::Biquintic => "biquintic",
            DataInterpMethod::Sinc => "sinc",
        };
        write!(f, "{}", name)
    }
}

#[inline]
fn clamp_index(i: isize, n: usize) -> usize {
    i.clamp(0, n as isize - 1) as usize
}

/// Interpolating B-spline over a square window of samples.
///
/// Knots follow the usual interpolating layout: `degree + 1` repeated
/// end knots and interior knots on the inner data points. Because the
/// interpolant is linear in the data, it is evaluated as a set of weights
/// obtained from the inverse transpose of the collocation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline2d {
    order: usize,
    degree: usize,
    knots: Vec<f64>,
    /// (A^T)^-1 where A[i][j] = B_j(i)
    inv_collocation_t: DMatrix<f64>,
}

impl Spline2d {
    /// `order` samples per axis, spline of odd `degree` < `order`
    pub fn new(order: usize, degree: usize) -> SarResult<Self> {
        if order < 2 {
            return Err(SarError::InvalidParameter(format!(
                "spline window needs at least 2 samples, got {}",
                order
            )));
        }
        if degree == 0 || degree % 2 == 0 || degree >= order {
            return Err(SarError::InvalidParameter(format!(
                "spline degree must be odd and smaller than the window ({}), got {}",
                order, degree
            )));
        }

        let last = (order - 1) as f64;
        let half = (degree + 1) / 2;
        let mut knots = vec![0.0; degree + 1];
        knots.extend((half..order - half).map(|i| i as f64));
        knots.extend(std::iter::repeat(last).take(degree + 1));

        let mut spline = Self {
            order,
            degree,
            knots,
            inv_collocation_t: DMatrix::zeros(0, 0),
        };

        let rows: Vec<Vec<f64>> = (0..order).map(|i| spline.basis(i as f64)).collect();
        let at = DMatrix::from_fn(order, order, |j, i| rows[i][j]);
        spline.inv_collocation_t = at.try_inverse().ok_or_else(|| {
            SarError::Processing("singular spline collocation matrix".to_string())
        })?;
        Ok(spline)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Values of all `order` B-spline basis functions at `x` in [0, order - 1]
    fn basis(&self, x: f64) -> Vec<f64> {
        let k = self.degree;
        let t = &self.knots;
        let n = self.order;
        let x = x.clamp(t[0], t[t.len() - 1]);

        // knot span: t[span] <= x < t[span + 1], last non-empty span at the right end
        let mut span = k;
        while span < n - 1 && x >= t[span + 1] {
            span += 1;
        }

        let mut funs = vec![0.0; k + 1];
        let mut left = vec![0.0; k + 1];
        let mut right = vec![0.0; k + 1];
        funs[0] = 1.0;
        for j in 1..=k {
            left[j] = x - t[span + 1 - j];
            right[j] = t[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom != 0.0 { funs[r] / denom } else { 0.0 };
                funs[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            funs[j] = saved;
        }

        let mut out = vec![0.0; n];
        for (r, value) in funs.into_iter().enumerate() {
            out[span - k + r] = value;
        }
        out
    }

    /// Interpolation weights on the window samples for local coordinate `x`
    pub fn weights(&self, x: f64) -> Vec<f64> {
        let b = DVector::from_vec(self.basis(x));
        (&self.inv_collocation_t * b).iter().copied().collect()
    }

    fn interpolate<T: InterpSample>(&self, x: f64, y: f64, grid: &ArrayView2<T>) -> T {
        let (nrows, ncols) = grid.dim();
        let (c0, xl) = window_origin(x, self.order, ncols);
        let (r0, yl) = window_origin(y, self.order, nrows);
        let wx = self.weights(xl);
        let wy = self.weights(yl);

        let mut acc = T::Acc::zero();
        for (i, wyi) in wy.iter().enumerate() {
            let row = clamp_index(r0 + i as isize, nrows);
            let mut line = T::Acc::zero();
            for (j, wxj) in wx.iter().enumerate() {
                let col = clamp_index(c0 + j as isize, ncols);
                line = line + grid[[row, col]].widen() * *wxj;
            }
            acc = acc + line * *wyi;
        }
        T::narrow(acc)
    }
}

/// Start index of an `order`-wide window around `x` and `x` in window coordinates.
/// The window is shifted to stay inside the axis when it is large enough.
fn window_origin(x: f64, order: usize, n: usize) -> (isize, f64) {
    let ix = x.floor() as isize;
    let mut start = ix - (order as isize / 2 - 1);
    if n >= order {
        start = start.clamp(0, (n - order) as isize);
    }
    (start, x - start as f64)
}

/// Windowed-sinc kernel with an oversampled coefficient table
#[derive(Debug, Clone, PartialEq)]
pub struct Sinc2d {
    half: usize,
    len: usize,
    sub: usize,
    /// (sub + 1) rows of `len` normalized weights
    table: Vec<f64>,
}

impl Default for Sinc2d {
    fn default() -> Self {
        Self::build(SINC_LEN, SINC_SUB)
    }
}

impl Sinc2d {
    /// `len` taps (even) sampled at `sub` fractional positions per pixel
    pub fn new(len: usize, sub: usize) -> SarResult<Self> {
        if len < 2 || len % 2 != 0 || sub == 0 {
            return Err(SarError::InvalidParameter(format!(
                "sinc kernel needs an even length >= 2 and a positive oversampling, got {} / {}",
                len, sub
            )));
        }
        Ok(Self::build(len, sub))
    }

    fn build(len: usize, sub: usize) -> Self {
        let half = len / 2;
        let mut table = Vec::with_capacity((sub + 1) * len);
        for q in 0..=sub {
            let frac = q as f64 / sub as f64;
            let mut row: Vec<f64> = (0..len)
                .map(|tap| {
                    let u = (tap as f64 - (half as f64 - 1.0)) - frac;
                    sinc(u) * hann(u, half as f64)
                })
                .collect();
            let sum: f64 = row.iter().sum();
            if sum != 0.0 {
                row.iter_mut().for_each(|w| *w /= sum);
            }
            table.extend(row);
        }
        Self { half, len, sub, table }
    }

    pub fn half_width(&self) -> usize {
        self.half
    }

    fn weights(&self, frac: f64) -> &[f64] {
        let q = ((frac * self.sub as f64).round() as usize).min(self.sub);
        &self.table[q * self.len..(q + 1) * self.len]
    }

    fn interpolate<T: InterpSample>(&self, x: f64, y: f64, grid: &ArrayView2<T>) -> T {
        let (nrows, ncols) = grid.dim();
        let ix = x.floor();
        let iy = y.floor();
        let wx = self.weights(x - ix);
        let wy = self.weights(y - iy);
        let c0 = ix as isize - (self.half as isize - 1);
        let r0 = iy as isize - (self.half as isize - 1);

        let mut acc = T::Acc::zero();
        for (i, wyi) in wy.iter().enumerate() {
            let row = clamp_index(r0 + i as isize, nrows);
            let mut line = T::Acc::zero();
            for (j, wxj) in wx.iter().enumerate() {
                let col = clamp_index(c0 + j as isize, ncols);
                line = line + grid[[row, col]].widen() * *wxj;
            }
            acc = acc + line * *wyi;
        }
        T::narrow(acc)
    }
}

fn sinc(u: f64) -> f64 {
    if u.abs() < 1e-12 {
        1.0
    } else {
        (PI * u).sin() / (PI * u)
    }
}

fn hann(u: f64, half: f64) -> f64 {
    if u.abs() >= half {
        0.0
    } else {
        0.5 + 0.5 * (PI * u / half).cos()
    }
}

/// 2D interpolator over a grid
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolator {
    Nearest,
    Bilinear,
    Bicubic,
    Spline(Spline2d),
    Sinc(Sinc2d),
}

impl Interpolator {
    /// Default kernel configuration for a method (6x6 quintic spline, 8-tap sinc)
    pub fn new(method: DataInterpMethod) -> SarResult<Self> {
        Ok(match method {
            DataInterpMethod::Nearest => Interpolator::Nearest,
            DataInterpMethod::Bilinear => Interpolator::Bilinear,
            DataInterpMethod::Bicubic => Interpolator::Bicubic,
            DataInterpMethod::Biquintic => Interpolator::Spline(Spline2d::new(6, 5)?),
            DataInterpMethod::Sinc => Interpolator::Sinc(Sinc2d::default()),
        })
    }

    pub fn method(&self) -> DataInterpMethod {
        match self {
            Interpolator::Nearest => DataInterpMethod::Nearest,
            Interpolator::Bilinear => DataInterpMethod::Bilinear,
            Interpolator::Bicubic => DataInterpMethod::Bicubic,
            Interpolator::Spline(_) => DataInterpMethod::Biquintic,
            Interpolator::Sinc(_) => DataInterpMethod::Sinc,
        }
    }

    /// Minimum distance (pixels) from the grid edge for an unclamped stencil
    pub fn margin(&self) -> usize {
        match self {
            Interpolator::Nearest => 0,
            Interpolator::Bilinear => 1,
            Interpolator::Bicubic => 2,
            Interpolator::Spline(s) => s.order() / 2,
            Interpolator::Sinc(s) => s.half_width(),
        }
    }

    /// Interpolate `grid` at fractional column `x`, row `y`
    pub fn interpolate<T: InterpSample>(&self, x: f64, y: f64, grid: &ArrayView2<T>) -> T {
        let (nrows, ncols) = grid.dim();
        if nrows == 0 || ncols == 0 {
            return T::narrow(T::Acc::zero());
        }
        match self {
            Interpolator::Nearest => {
                let row = clamp_index(y.round() as isize, nrows);
                let col = clamp_index(x.round() as isize, ncols);
                grid[[row, col]]
            }
            Interpolator::Bilinear => bilinear(x, y, grid),
            Interpolator::Bicubic => bicubic(x, y, grid),
            Interpolator::Spline(s) => s.interpolate(x, y, grid),
            Interpolator::Sinc(s) => s.interpolate(x, y, grid),
        }
    }
}

fn bilinear<T: InterpSample>(x: f64, y: f64, grid: &ArrayView2<T>) -> T {
    let (nrows, ncols) = grid.dim();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let c0 = clamp_index(x0 as isize, ncols);
    let c1 = clamp_index(x0 as isize + 1, ncols);
    let r0 = clamp_index(y0 as isize, nrows);
    let r1 = clamp_index(y0 as isize + 1, nrows);

    let top = grid[[r0, c0]].widen() * (1.0 - fx) + grid[[r0, c1]].widen() * fx;
    let bottom = grid[[r1, c0]].widen() * (1.0 - fx) + grid[[r1, c1]].widen() * fx;
    T::narrow(top * (1.0 - fy) + bottom * fy)
}

/// Catmull-Rom weights for taps at offsets -1, 0, 1, 2
fn catmull_rom(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

fn bicubic<T: InterpSample>(x: f64, y: f64, grid: &ArrayView2<T>) -> T {
    let (nrows, ncols) = grid.dim();
    let x0 = x.floor();
    let y0 = y.floor();
    let wx = catmull_rom(x - x0);
    let wy = catmull_rom(y - y0);

    let mut acc = T::Acc::zero();
    for (i, wyi) in wy.iter().enumerate() {
        let row = clamp_index(y0 as isize - 1 + i as isize, nrows);
        let mut line = T::Acc::zero();
        for (j, wxj) in wx.iter().enumerate() {
            let col = clamp_index(x0 as isize - 1 + j as isize, ncols);
            line = line + grid[[row, col]].widen() * *wxj;
        }
        acc = acc + line * *wyi;
    }
    T::narrow(acc)
}
