use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WGS-84 semi-major axis (meters)
pub const EARTH_SEMI_MAJOR_AXIS: f64 = 6378137.0;

/// WGS-84 squared eccentricity
pub const EARTH_ECC2: f64 = 0.0066943799901;

/// Earth rotation rate (rad/s)
pub const EARTH_SPIN_RATE: f64 = 7.292_115_833e-5;

/// Sentinel written to every output band for pixels that failed to solve
pub const NULL_VALUE: f64 = -1.0e6;

/// Layover/shadow mask values
pub const SHADOW_VALUE: u8 = 1;
pub const LAYOVER_VALUE: u8 = 2;

/// Default sinc kernel geometry
pub const SINC_LEN: usize = 8;
pub const SINC_SUB: usize = 8192;

/// Default number of lines per processing block
pub const DEFAULT_BLOCK_LINES: usize = 1000;

/// EPSG code used when a raster carries no usable spatial reference
pub const DEFAULT_EPSG: i32 = 4326;

/// Orbit state vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub time: DateTime<Utc>,
    pub position: [f64; 3],  // [x, y, z] in meters
    pub velocity: [f64; 3],  // [vx, vy, vz] in m/s
}

/// Orbit information as delivered by product metadata readers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitData {
    pub state_vectors: Vec<StateVector>,
    pub reference_time: DateTime<Utc>,
}

/// Geospatial bounding box (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Grow the box by `margin` degrees on every side
    pub fn padded(&self, margin: f64) -> Self {
        Self {
            min_lon: self.min_lon - margin,
            max_lon: self.max_lon + margin,
            min_lat: self.min_lat - margin,
            max_lat: self.max_lat + margin,
        }
    }
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build from the six-element affine array used by GDAL
    pub fn from_array(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }
}

/// Side of the ground track the antenna points to.
///
/// The numeric value is the sign applied to the cross-track term of the
/// range/Doppler solution; flipping it mirrors every output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookSide {
    Left,
    Right,
}

impl LookSide {
    pub fn sign(self) -> f64 {
        match self {
            LookSide::Left => 1.0,
            LookSide::Right => -1.0,
        }
    }
}

impl TryFrom<i32> for LookSide {
    type Error = SarError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(LookSide::Left),
            -1 => Ok(LookSide::Right),
            other => Err(SarError::InvalidParameter(format!(
                "look side must be +1 (left) or -1 (right), got {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LookSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookSide::Left => write!(f, "left"),
            LookSide::Right => write!(f, "right"),
        }
    }
}

/// Error types for SAR geometry processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Orbit error: {0}")]
    Orbit(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_side_from_int() {
        assert_eq!(LookSide::try_from(1).unwrap(), LookSide::Left);
        assert_eq!(LookSide::try_from(-1).unwrap(), LookSide::Right);
        assert!(LookSide::try_from(0).is_err());
        assert_eq!(LookSide::Left.sign(), 1.0);
        assert_eq!(LookSide::Right.sign(), -1.0);
    }

    #[test]
    fn test_geotransform_array_roundtrip() {
        let gt = [-156.0, 0.0002, 0.0, 20.0, 0.0, -0.0002];
        assert_eq!(GeoTransform::from_array(gt).to_array(), gt);
    }
}
