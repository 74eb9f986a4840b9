//! Platform attitude as quaternion or yaw/pitch/roll

use crate::core::linalg::Mat3;
use crate::types::{SarError, SarResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reference direction for Euler-angle yaw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YawOrientation {
    /// Yaw measured about the local geodetic normal
    Normal,
    /// Yaw measured about the geocentric direction
    Center,
}

impl Default for YawOrientation {
    fn default() -> Self {
        YawOrientation::Normal
    }
}

impl FromStr for YawOrientation {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(YawOrientation::Normal),
            "center" | "centre" => Ok(YawOrientation::Center),
            _ => Err(SarError::InvalidParameter(format!("Unknown yaw orientation: {}", s))),
        }
    }
}

/// Unit quaternion, scalar component first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub q0: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

impl Quaternion {
    /// Normalizing constructor; a zero quaternion is rejected
    pub fn new(q0: f64, q1: f64, q2: f64, q3: f64) -> SarResult<Self> {
        let norm = (q0 * q0 + q1 * q1 + q2 * q2 + q3 * q3).sqrt();
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(SarError::InvalidParameter(
                "quaternion must have a finite, non-zero norm".to_string(),
            ));
        }
        Ok(Self {
            q0: q0 / norm,
            q1: q1 / norm,
            q2: q2 / norm,
            q3: q3 / norm,
        })
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        let (a, b, c, d) = (self.q0, self.q1, self.q2, self.q3);
        Mat3::new([
            [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
            [2.0 * (b * c + a * d), a * a - b * b + c * c - d * d, 2.0 * (c * d - a * b)],
            [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a - b * b - c * c + d * d],
        ])
    }
}

/// Yaw, pitch and roll (radians), applied in that order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    #[serde(default)]
    pub yaw_orientation: YawOrientation,
}

impl EulerAngles {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self {
            yaw,
            pitch,
            roll,
            yaw_orientation: YawOrientation::default(),
        }
    }

    /// R = Rz(yaw) * Ry(pitch) * Rx(roll)
    pub fn rotation_matrix(&self) -> Mat3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let (sr, cr) = self.roll.sin_cos();
        let rz = Mat3::new([[cy, -sy, 0.0], [sy, cy, 0.0], [0.0, 0.0, 1.0]]);
        let ry = Mat3::new([[cp, 0.0, sp], [0.0, 1.0, 0.0], [-sp, 0.0, cp]]);
        let rx = Mat3::new([[1.0, 0.0, 0.0], [0.0, cr, -sr], [0.0, sr, cr]]);
        rz * ry * rx
    }

    pub fn to_quaternion(&self) -> Quaternion {
        let (sy, cy) = (0.5 * self.yaw).sin_cos();
        let (sp, cp) = (0.5 * self.pitch).sin_cos();
        let (sr, cr) = (0.5 * self.roll).sin_cos();
        Quaternion {
            q0: cy * cp * cr + sy * sp * sr,
            q1: cy * cp * sr - sy * sp * cr,
            q2: cy * sp * cr + sy * cp * sr,
            q3: sy * cp * cr - cy * sp * sr,
        }
    }
}

/// Attitude in one of the supported representations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Attitude {
    Quaternion(Quaternion),
    Euler(EulerAngles),
}

impl Attitude {
    pub fn rotation_matrix(&self) -> Mat3 {
        match self {
            Attitude::Quaternion(q) => q.rotation_matrix(),
            Attitude::Euler(e) => e.rotation_matrix(),
        }
    }

    /// (yaw, pitch, roll) in radians
    pub fn yaw_pitch_roll(&self) -> (f64, f64, f64) {
        match self {
            Attitude::Euler(e) => (e.yaw, e.pitch, e.roll),
            Attitude::Quaternion(q) => {
                let r = q.rotation_matrix();
                let yaw = r[(1, 0)].atan2(r[(0, 0)]);
                let pitch = -r[(2, 0)].clamp(-1.0, 1.0).asin();
                let roll = r[(2, 1)].atan2(r[(2, 2)]);
                (yaw, pitch, roll)
            }
        }
    }
}
