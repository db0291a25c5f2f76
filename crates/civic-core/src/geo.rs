//! Great-circle distance and centroid helpers for clustering and proximity.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
  pub lat: f64,
  pub lng: f64,
}

impl Coordinate {
  pub fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }

  pub fn distance_to(&self, other: &Coordinate) -> f64 {
    distance_meters(self.lat, self.lng, other.lat, other.lng)
  }
}

/// Haversine distance between two lat/lng points in meters.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
  let d_lat = (lat2 - lat1).to_radians();
  let d_lon = (lon2 - lon1).to_radians();

  let a = (d_lat / 2.0).sin().powi(2)
    + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
  // Rounding can push `a` a hair past 1 for antipodal points.
  let a = a.clamp(0.0, 1.0);

  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
  EARTH_RADIUS_METERS * c
}

pub fn is_within_radius(center: &Coordinate, point: &Coordinate, radius_meters: f64) -> bool {
  center.distance_to(point) <= radius_meters
}

/// Arithmetic mean of latitudes and longitudes.
///
/// Adequate for clusters a few hundred meters across; it does not handle
/// clusters straddling the antimeridian.
pub fn centroid(points: &[Coordinate]) -> Result<Coordinate> {
  if points.is_empty() {
    return Err(Error::InvalidArgument(
      "cannot compute the centroid of zero points".into(),
    ));
  }
  let n = points.len() as f64;
  let (lat_sum, lng_sum) = points
    .iter()
    .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
  Ok(Coordinate { lat: lat_sum / n, lng: lng_sum / n })
}

/// Meters to kilometers, rounded to two decimals.
pub fn meters_to_kilometers(meters: f64) -> f64 {
  (meters / 1000.0 * 100.0).round() / 100.0
}

pub fn kilometers_to_meters(kilometers: f64) -> f64 { kilometers * 1000.0 }

/// Human-readable distance: `"500m"` below a kilometer, `"2.5km"` above.
pub fn format_distance(meters: f64) -> String {
  if meters < 1000.0 {
    format!("{}m", meters.round())
  } else {
    format!("{}km", meters_to_kilometers(meters))
  }
}
