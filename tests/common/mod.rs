//! Shared fixtures for the integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sargeo::{Ellipsoid, Orbit, Vec3};

/// Platform height above the equator for the synthetic orbits (meters)
pub const HSAT: f64 = 700_000.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 2, 12, 1, 12, 30).unwrap()
}

/// Circular equatorial orbit moving east at `omega` rad/s, sampled every 10 s
pub fn equatorial_orbit(omega: f64, nvec: usize) -> Orbit {
    let elp = Ellipsoid::wgs84();
    let mut orbit = Orbit::new(epoch());
    for i in 0..nvec {
        let t = 10.0 * i as f64;
        let lon = omega * t;
        let pos = Vec3::new((elp.a() + HSAT) * lon.cos(), (elp.a() + HSAT) * lon.sin(), 0.0);
        let vel = Vec3::new(-omega * pos.y, omega * pos.x, 0.0);
        orbit.push(t, pos, vel).unwrap();
    }
    orbit
}

/// Cosine of the parametric latitude of the ellipsoid point at slant range `range`
/// from the equatorial orbit, under zero Doppler
pub fn solve_cos_latitude(elp: &Ellipsoid, range: f64) -> f64 {
    let temp = 1.0 + HSAT / elp.a();
    let temp1 = range / elp.a();
    let a = elp.e2();
    let b = -2.0 * temp;
    let c = temp * temp + 1.0 - elp.e2() - temp1 * temp1;
    let d = (b * b - 4.0 * a * c).sqrt();
    let x1 = (d - b) / (2.0 * a);
    let x2 = -(d + b) / (2.0 * a);
    if x1.abs() > x2.abs() {
        x2
    } else {
        x1
    }
}
