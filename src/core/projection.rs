//! Map projections identified by EPSG code, all on the WGS-84 ellipsoid
//!
//! `forward` maps geodetic (lon, lat in radians, height) to native coordinates
//! and `inverse` maps back. Geographic coordinates are native in degrees.

use crate::core::ellipsoid::{Ellipsoid, Llh};
use crate::core::linalg::Vec3;
use crate::types::{SarError, SarResult};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Supported projections
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// EPSG:4326, native coordinates in degrees
    LonLat,
    /// EPSG:4978, Earth-centered Earth-fixed meters
    Geocent,
    /// EPSG:326xx (north) and 327xx (south)
    Utm { zone: u8, north: bool },
    /// EPSG:3413 (north, true scale at 70N) and EPSG:3031 (south, true scale at 71S)
    PolarStereo { north: bool },
}

impl Projection {
    pub fn from_epsg(epsg: i32) -> SarResult<Self> {
        match epsg {
            4326 => Ok(Projection::LonLat),
            4978 => Ok(Projection::Geocent),
            3413 => Ok(Projection::PolarStereo { north: true }),
            3031 => Ok(Projection::PolarStereo { north: false }),
            32601..=32660 => Ok(Projection::Utm {
                zone: (epsg - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(Projection::Utm {
                zone: (epsg - 32700) as u8,
                north: false,
            }),
            _ => Err(SarError::InvalidParameter(format!("Unsupported EPSG code: {}", epsg))),
        }
    }

    pub fn epsg(&self) -> i32 {
        match *self {
            Projection::LonLat => 4326,
            Projection::Geocent => 4978,
            Projection::Utm { zone, north: true } => 32600 + zone as i32,
            Projection::Utm { zone, north: false } => 32700 + zone as i32,
            Projection::PolarStereo { north: true } => 3413,
            Projection::PolarStereo { north: false } => 3031,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Projection::LonLat)
    }

    pub fn forward(&self, llh: &Llh) -> Vec3 {
        let elp = Ellipsoid::wgs84();
        match *self {
            Projection::LonLat => Vec3::new(llh.lon.to_degrees(), llh.lat.to_degrees(), llh.height),
            Projection::Geocent => elp.lon_lat_to_xyz(llh),
            Projection::Utm { zone, north } => {
                let (e, n) = utm_forward(&elp, zone, north, llh.lon, llh.lat);
                Vec3::new(e, n, llh.height)
            }
            Projection::PolarStereo { north } => {
                let (x, y) = PolarStereo::new(&elp, north).forward(llh.lon, llh.lat);
                Vec3::new(x, y, llh.height)
            }
        }
    }

    pub fn inverse(&self, xyz: Vec3) -> Llh {
        let elp = Ellipsoid::wgs84();
        match *self {
            Projection::LonLat => Llh::from_degrees(xyz.x, xyz.y, xyz.z),
            Projection::Geocent => elp.xyz_to_lon_lat(xyz),
            Projection::Utm { zone, north } => {
                let (lon, lat) = utm_inverse(&elp, zone, north, xyz.x, xyz.y);
                Llh::new(lon, lat, xyz.z)
            }
            Projection::PolarStereo { north } => {
                let (lon, lat) = PolarStereo::new(&elp, north).inverse(xyz.x, xyz.y);
                Llh::new(lon, lat, xyz.z)
            }
        }
    }
}

/// Third flattening and Krüger series coefficients
struct Kruger {
    rect_radius: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    ecc: f64,
}

impl Kruger {
    fn new(elp: &Ellipsoid) -> Self {
        let f = 1.0 - (1.0 - elp.e2()).sqrt();
        let n = f / (2.0 - f);
        let (n2, n3) = (n * n, n * n * n);
        Self {
            rect_radius: elp.a() / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
            ecc: elp.e2().sqrt(),
        }
    }
}

fn utm_central_meridian(zone: u8) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

fn utm_forward(elp: &Ellipsoid, zone: u8, north: bool, lon: f64, lat: f64) -> (f64, f64) {
    let k = Kruger::new(elp);
    let dlon = lon - utm_central_meridian(zone);
    let slat = lat.sin();
    let t = (slat.atanh() - k.ecc * (k.ecc * slat).atanh()).sinh();
    let xi_p = t.atan2(dlon.cos());
    let eta_p = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, a) in k.alpha.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi += a * (m * xi_p).sin() * (m * eta_p).cosh();
        eta += a * (m * xi_p).cos() * (m * eta_p).sinh();
    }

    let false_northing = if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
    (
        UTM_FALSE_EASTING + UTM_SCALE * k.rect_radius * eta,
        false_northing + UTM_SCALE * k.rect_radius * xi,
    )
}

fn utm_inverse(elp: &Ellipsoid, zone: u8, north: bool, easting: f64, northing: f64) -> (f64, f64) {
    let k = Kruger::new(elp);
    let false_northing = if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
    let xi = (northing - false_northing) / (UTM_SCALE * k.rect_radius);
    let eta = (easting - UTM_FALSE_EASTING) / (UTM_SCALE * k.rect_radius);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, b) in k.beta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi_p -= b * (m * xi).sin() * (m * eta).cosh();
        eta_p -= b * (m * xi).cos() * (m * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let lat = chi
        + k.delta
            .iter()
            .enumerate()
            .map(|(j, d)| d * (2.0 * (j + 1) as f64 * chi).sin())
            .sum::<f64>();
    let lon = utm_central_meridian(zone) + eta_p.sinh().atan2(xi_p.cos());
    (lon, lat)
}

/// Ellipsoidal polar stereographic with a standard parallel
struct PolarStereo {
    a: f64,
    ecc: f64,
    north: bool,
    lon0: f64,
    mc: f64,
    tc: f64,
}

impl PolarStereo {
    fn new(elp: &Ellipsoid, north: bool) -> Self {
        let (lat_ts, lon0) = if north {
            (70.0_f64.to_radians(), (-45.0_f64).to_radians())
        } else {
            (71.0_f64.to_radians(), 0.0)
        };
        let ecc = elp.e2().sqrt();
        let slat = lat_ts.sin();
        Self {
            a: elp.a(),
            ecc,
            north,
            lon0,
            mc: lat_ts.cos() / (1.0 - ecc * ecc * slat * slat).sqrt(),
            tc: Self::t(ecc, lat_ts),
        }
    }

    fn t(ecc: f64, lat: f64) -> f64 {
        let es = ecc * lat.sin();
        (FRAC_PI_4 - 0.5 * lat).tan() / ((1.0 - es) / (1.0 + es)).powf(0.5 * ecc)
    }

    /// Formulas are written for the north pole; the south case mirrors lat and lon.
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let s = if self.north { 1.0 } else { -1.0 };
        let (lat, dlon) = (s * lat, s * (lon - self.lon0));
        let rho = self.a * self.mc * Self::t(self.ecc, lat) / self.tc;
        (s * rho * dlon.sin(), -s * rho * dlon.cos())
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let s = if self.north { 1.0 } else { -1.0 };
        let (x, y) = (s * x, s * y);
        let rho = x.hypot(y);
        let t = rho * self.tc / (self.a * self.mc);

        let mut lat = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..30 {
            let es = self.ecc * lat.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(0.5 * self.ecc)).atan();
            let converged = (next - lat).abs() < 1e-14;
            lat = next;
            if converged {
                break;
            }
        }
        let lon = x.atan2(-y);
        (s * lon + self.lon0, s * lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn roundtrip(proj: Projection, lon_deg: f64, lat_deg: f64) {
        let llh = Llh::from_degrees(lon_deg, lat_deg, 123.0);
        let back = proj.inverse(proj.forward(&llh));
        assert_abs_diff_eq!(back.lon, llh.lon, epsilon = 1e-9);
        assert_abs_diff_eq!(back.lat, llh.lat, epsilon = 1e-9);
        assert_abs_diff_eq!(back.height, 123.0, epsilon = 1e-6);
    }

    #[test]
    fn test_epsg_codes() {
        for code in [4326, 4978, 3413, 3031, 32611, 32733] {
            assert_eq!(Projection::from_epsg(code).unwrap().epsg(), code);
        }
        assert!(Projection::from_epsg(2154).is_err());
    }

    #[test]
    fn test_lonlat_is_degrees() {
        let p = Projection::LonLat.forward(&Llh::from_degrees(-118.0, 34.0, 10.0));
        assert_abs_diff_eq!(p.x, -118.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 34.0, epsilon = 1e-12);
    }

    #[test]
    fn test_utm_central_meridian() {
        // On the central meridian of zone 31 at the equator
        let p = Projection::from_epsg(32631).unwrap().forward(&Llh::from_degrees(3.0, 0.0, 0.0));
        assert_abs_diff_eq!(p.x, 500_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
        // One degree north: 0.9996 * meridian arc of 110574.4 m
        let p = Projection::from_epsg(32631).unwrap().forward(&Llh::from_degrees(3.0, 1.0, 0.0));
        assert_abs_diff_eq!(p.y, 110_530.2, epsilon = 1.0);
    }

    #[test]
    fn test_roundtrips() {
        roundtrip(Projection::from_epsg(32611).unwrap(), -118.3, 34.1);
        roundtrip(Projection::from_epsg(32733).unwrap(), 14.2, -22.7);
        roundtrip(Projection::from_epsg(3413).unwrap(), -40.0, 72.5);
        roundtrip(Projection::from_epsg(3031).unwrap(), 120.0, -78.0);
        roundtrip(Projection::Geocent, 45.0, -30.0);
        roundtrip(Projection::LonLat, 170.0, 5.0);
    }

    #[test]
    fn test_polar_stereo_pole_at_origin() {
        let p = Projection::from_epsg(3413).unwrap().forward(&Llh::from_degrees(0.0, 90.0, 0.0));
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
    }
}
