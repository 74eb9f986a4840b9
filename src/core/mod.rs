//! Core geometry modules

pub mod attitude;
pub mod doppler;
pub mod ellipsoid;
pub mod interpolator;
pub mod linalg;
pub mod lut;
pub mod orbit;
pub mod peg;
pub mod projection;

// Re-export main types
pub use attitude::{Attitude, EulerAngles, Quaternion, YawOrientation};
pub use doppler::{AttitudeDoppler, AttitudeFrame, DopplerModel, Poly1d, Poly2d};
pub use ellipsoid::{Basis, Ellipsoid, Llh};
pub use interpolator::{DataInterpMethod, InterpSample, Interpolator};
pub use linalg::{enu_basis, Mat3, Vec3};
pub use lut::{Lut1d, Lut2d};
pub use orbit::{InterpStatus, Orbit, OrbitInterpMethod, OrbitState};
pub use peg::{Peg, Pegtrans};
pub use projection::Projection;
