// Coordinate reference systems the boundary files come in.
//
// Crash coordinates are always WGS84 longitude/latitude. The city's borough
// file is published in the New York Long Island state plane (EPSG:2263), a
// Lambert Conformal Conic projection in US survey feet, so points are
// projected into it before the polygon test.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const GRS80_A: f64 = 6_378_137.0;
const GRS80_INV_F: f64 = 298.257_222_101;
const US_FOOT: f64 = 1200.0 / 3937.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crs {
    /// EPSG:4326 / CRS84, longitude-latitude degrees.
    Wgs84,
    /// EPSG:2263, NAD83 / New York Long Island (ftUS).
    NyLongIsland,
}

impl Crs {
    /// Recognise the names found in GeoJSON `crs` members and shapefile
    /// metadata, e.g. `urn:ogc:def:crs:EPSG::2263` or `EPSG:4326`.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Some(Self::Wgs84);
        }
        let code = upper.rsplit(':').next()?;
        match code {
            "4326" => Some(Self::Wgs84),
            "2263" => Some(Self::NyLongIsland),
            _ => None,
        }
    }

    /// Longitude/latitude degrees into this CRS.
    pub fn project(self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Self::Wgs84 => (lon, lat),
            Self::NyLongIsland => NY_LONG_ISLAND.forward(lon, lat),
        }
    }

    /// Coordinates in this CRS back into longitude/latitude degrees.
    pub fn unproject(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Wgs84 => (x, y),
            Self::NyLongIsland => NY_LONG_ISLAND.inverse(x, y),
        }
    }
}

/// Lambert Conformal Conic with two standard parallels on an ellipsoid
/// (Snyder, "Map Projections: A Working Manual", eqs. 15-1 to 15-11).
struct LambertConic {
    lat_1: f64,
    lat_2: f64,
    lat_0: f64,
    lon_0: f64,
    false_easting: f64,
    false_northing: f64,
    /// Metres per output unit.
    unit: f64,
}

const NY_LONG_ISLAND: LambertConic = LambertConic {
    lat_1: 41.0 + 2.0 / 60.0,
    lat_2: 40.0 + 40.0 / 60.0,
    lat_0: 40.0 + 10.0 / 60.0,
    lon_0: -74.0,
    false_easting: 300_000.0,
    false_northing: 0.0,
    unit: US_FOOT,
};

struct ConeConstants {
    e: f64,
    n: f64,
    af: f64,
    rho_0: f64,
}

impl LambertConic {
    fn constants(&self) -> ConeConstants {
        let f = 1.0 / GRS80_INV_F;
        let e = (2.0 * f - f * f).sqrt();
        let (p1, p2, p0) = (
            self.lat_1.to_radians(),
            self.lat_2.to_radians(),
            self.lat_0.to_radians(),
        );
        let m1 = m(e, p1);
        let m2 = m(e, p2);
        let t1 = t(e, p1);
        let t2 = t(e, p2);
        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let af = GRS80_A * m1 / (n * t1.powf(n));
        let rho_0 = af * t(e, p0).powf(n);
        ConeConstants { e, n, af, rho_0 }
    }

    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let c = self.constants();
        let rho = c.af * t(c.e, lat.to_radians()).powf(c.n);
        let theta = c.n * (lon - self.lon_0).to_radians();
        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + c.rho_0 - rho * theta.cos();
        (x / self.unit, y / self.unit)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let c = self.constants();
        let dx = x * self.unit - self.false_easting;
        let dy = c.rho_0 - (y * self.unit - self.false_northing);
        let sign = c.n.signum();
        let rho = sign * dx.hypot(dy);
        let theta = (sign * dx).atan2(sign * dy);
        let ts = (rho / c.af).powf(1.0 / c.n);

        let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
        for _ in 0..15 {
            let es = c.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (ts * ((1.0 - es) / (1.0 + es)).powf(c.e / 2.0)).atan();
            if (next - phi).abs() < 1e-12 {
                phi = next;
                break;
            }
            phi = next;
        }
        let lon = theta / c.n + self.lon_0.to_radians();
        (lon.to_degrees(), phi.to_degrees())
    }
}

fn m(e: f64, phi: f64) -> f64 {
    phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
}

fn t(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}
