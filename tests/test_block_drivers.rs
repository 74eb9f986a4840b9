mod common;

use approx::assert_abs_diff_eq;
use common::{epoch, equatorial_orbit, init_logging, HSAT};
use ndarray::Array2;
use sargeo::geometry::baseline::{Acquisition, BaselineConfig, BASELINE_BANDS};
use sargeo::geometry::geo2rdr::Geo2RdrConfig;
use sargeo::geometry::topo::TOPO_BANDS;
use sargeo::{
    BaselineProcessor, DataInterpMethod, DemInterpolator, DopplerModel, Ellipsoid, GeoTransform, Geo2Rdr, LookSide,
    MemoryRaster, Orbit, RadarGridParameters, Raster, Topo, TopoConfig, Vec3, NULL_VALUE,
};

const OMEGA_DEG: f64 = 0.1;

fn radar_grid() -> RadarGridParameters {
    RadarGridParameters {
        sensing_start: 20.0,
        wavelength: 0.24,
        prf: 1.0,
        starting_range: 800_000.0,
        range_pixel_spacing: 50.0,
        look_side: LookSide::Left,
        length: 12,
        width: 9,
        azimuth_looks: 1,
        range_looks: 1,
    }
}

/// Same grid padded by one line and one sample on every side
fn padded_grid() -> RadarGridParameters {
    let grid = radar_grid();
    RadarGridParameters {
        sensing_start: grid.sensing_start - 1.0 / grid.prf,
        starting_range: grid.starting_range - grid.range_pixel_spacing,
        length: grid.length + 2,
        width: grid.width + 2,
        ..grid
    }
}

fn run_topo(config: TopoConfig, dem: &DemInterpolator) -> MemoryRaster {
    let grid = radar_grid();
    let topo = Topo::new(
        Ellipsoid::wgs84(),
        equatorial_orbit(OMEGA_DEG.to_radians(), 10),
        DopplerModel::Zero,
        grid,
        config,
    )
    .unwrap();
    let mut out = MemoryRaster::new(grid.width, grid.length, TOPO_BANDS);
    let stats = topo.topo_with_dem(dem, &mut out).unwrap();
    assert_eq!(stats.converged, stats.total);
    out
}

fn xyz_raster(topo_out: &MemoryRaster) -> MemoryRaster {
    let bands = (1..=3).map(|b| topo_out.band(b).unwrap().clone()).collect();
    MemoryRaster::from_bands(bands).unwrap().with_epsg(4326)
}

#[test]
fn test_topo_then_geo2rdr_offsets() {
    init_logging();
    let dem = DemInterpolator::new(150.0, DataInterpMethod::Bilinear).unwrap();
    let config = TopoConfig {
        lines_per_block: 5,
        ..Default::default()
    };
    let topo_out = run_topo(config, &dem);
    for &z in topo_out.band(3).unwrap().iter() {
        assert_abs_diff_eq!(z, 150.0, epsilon = 0.05);
    }

    let geo2rdr = Geo2Rdr::new(
        Ellipsoid::wgs84(),
        equatorial_orbit(OMEGA_DEG.to_radians(), 10),
        DopplerModel::Zero,
        padded_grid(),
        Geo2RdrConfig {
            lines_per_block: 4,
            ..Default::default()
        },
    )
    .unwrap();
    let topo_xyz = xyz_raster(&topo_out);
    let mut offsets = MemoryRaster::new(topo_xyz.width(), topo_xyz.length(), 2);
    let stats = geo2rdr.geo2rdr(&topo_xyz, &mut offsets).unwrap();
    assert_eq!(stats.converged, stats.total);

    // Every topo pixel maps one line and one sample into the padded grid
    for &rg in offsets.band(1).unwrap().iter() {
        assert_abs_diff_eq!(rg, 1.0, epsilon = 1e-3);
    }
    for &az in offsets.band(2).unwrap().iter() {
        assert_abs_diff_eq!(az, 1.0, epsilon = 1e-3);
    }
}

#[test]
fn test_geo2rdr_convergence_accounting() {
    init_logging();
    let dem = DemInterpolator::new(0.0, DataInterpMethod::Bilinear).unwrap();
    let mut topo_xyz = xyz_raster(&run_topo(TopoConfig::default(), &dem));

    // Move some targets far east of the orbit's ground track coverage
    let invalid = [(0, 0), (3, 4), (7, 8), (11, 2), (11, 3)];
    let mut lon = topo_xyz.band(1).unwrap().clone();
    for &(row, col) in &invalid {
        lon[[row, col]] = 20.0;
    }
    topo_xyz.set_block(&lon, 0, 0, 1).unwrap();
    // And one pixel already flagged by an upstream step
    topo_xyz
        .set_block(&Array2::from_elem((1, 1), NULL_VALUE), 5, 6, 3)
        .unwrap();

    let geo2rdr = Geo2Rdr::new(
        Ellipsoid::wgs84(),
        equatorial_orbit(OMEGA_DEG.to_radians(), 10),
        DopplerModel::Zero,
        padded_grid(),
        Geo2RdrConfig::default(),
    )
    .unwrap();
    let mut offsets = MemoryRaster::new(topo_xyz.width(), topo_xyz.length(), 2);
    let stats = geo2rdr.geo2rdr(&topo_xyz, &mut offsets).unwrap();

    let total = topo_xyz.width() * topo_xyz.length();
    assert_eq!(stats.total, total);
    assert_eq!(stats.converged, total - invalid.len() - 1);
    for band in 1..=2 {
        let data = offsets.band(band).unwrap();
        for &(row, col) in invalid.iter().chain(std::iter::once(&(6, 5))) {
            assert_eq!(data[[row, col]], NULL_VALUE);
        }
        assert_eq!(data.iter().filter(|&&v| v == NULL_VALUE).count(), invalid.len() + 1);
    }
}

#[test]
fn test_topo_with_dem_raster() {
    init_logging();
    // Flat 100 m DEM on a 0.05 degree grid around the scene
    let data = Array2::from_elem((240, 280), 100.0);
    let dem_raster = MemoryRaster::from_band(data)
        .with_geo_transform(GeoTransform::from_array([-1.0, 0.05, 0.0, 11.0, 0.0, -0.05]))
        .with_epsg(4326);

    let grid = radar_grid();
    let topo = Topo::new(
        Ellipsoid::wgs84(),
        equatorial_orbit(OMEGA_DEG.to_radians(), 10),
        DopplerModel::Zero,
        grid,
        TopoConfig {
            lines_per_block: 6,
            dem_method: DataInterpMethod::Biquintic,
            compute_mask: true,
            ..Default::default()
        },
    )
    .unwrap();
    let mut out = MemoryRaster::new(grid.width, grid.length, topo.num_bands());
    let stats = topo.topo(&dem_raster, &mut out).unwrap();
    assert_eq!(stats.converged, stats.total);

    for &z in out.band(3).unwrap().iter() {
        assert_abs_diff_eq!(z, 100.0, epsilon = 0.05);
    }
    // Flat terrain: no layover or shadow
    assert!(out.band(10).unwrap().iter().all(|&m| m == 0.0));
    // Incidence grows with range along every line
    for row in out.band(4).unwrap().rows() {
        assert!(row.windows(2).into_iter().all(|w| w[1] > w[0]));
    }
}

fn raised_orbit(dz_radial: f64) -> Orbit {
    let elp = Ellipsoid::wgs84();
    let omega = OMEGA_DEG.to_radians();
    let radius = elp.a() + HSAT + dz_radial;
    let mut orbit = Orbit::new(epoch());
    for i in 0..10 {
        let t = 10.0 * i as f64;
        let lon = omega * t;
        let pos = Vec3::new(radius * lon.cos(), radius * lon.sin(), 0.0);
        let vel = Vec3::new(-omega * pos.y, omega * pos.x, 0.0);
        orbit.push(t, pos, vel).unwrap();
    }
    orbit
}

#[test]
fn test_baseline_against_raised_orbit() {
    init_logging();
    let dem = DemInterpolator::new(0.0, DataInterpMethod::Bilinear).unwrap();
    let topo_xyz = xyz_raster(&run_topo(TopoConfig::default(), &dem));

    let reference = Acquisition {
        orbit: equatorial_orbit(OMEGA_DEG.to_radians(), 10),
        doppler: DopplerModel::Zero,
        grid: padded_grid(),
    };
    let secondary = Acquisition {
        orbit: raised_orbit(100.0),
        doppler: DopplerModel::Zero,
        grid: padded_grid(),
    };
    let processor =
        BaselineProcessor::new(Ellipsoid::wgs84(), reference, secondary, BaselineConfig::default()).unwrap();
    let mut out = MemoryRaster::new(topo_xyz.width(), topo_xyz.length(), BASELINE_BANDS);
    let stats = processor.compute_baseline(&topo_xyz, &mut out).unwrap();
    assert_eq!(stats.converged, stats.total);

    let total = out.band(1).unwrap();
    let parallel = out.band(2).unwrap();
    let perpendicular = out.band(3).unwrap();
    let kz = out.band(4).unwrap();
    for i in 0..topo_xyz.length() {
        for j in 0..topo_xyz.width() {
            assert_abs_diff_eq!(total[[i, j]], 100.0, epsilon = 1e-3);
            let sum_sq = parallel[[i, j]].powi(2) + perpendicular[[i, j]].powi(2);
            assert_abs_diff_eq!(sum_sq, 10_000.0, epsilon = 1.0);
            // The raised platform sees the target from closer: parallel component is negative
            assert!(parallel[[i, j]] < 0.0);
            assert!(kz[[i, j]].is_finite() && kz[[i, j]] != 0.0);
        }
    }
}
