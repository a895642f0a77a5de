//! Great-circle distance and the proximity gate for field updates.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Maximum distance between an updater and the complaint site.
pub const DEFAULT_PROXIMITY_THRESHOLD_KM: f64 = 1.0;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    #[display(fmt = "Actor")]
    Actor,
    #[display(fmt = "Complaint")]
    Complaint,
}

#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum GeoError {
    #[display(fmt = "{} location is not available", _0)]
    MissingLocation(#[error(not(source))] Party),
    #[display(
        fmt = "You are {:.2} km away from the complaint location. You must be within {} km to update status.",
        distance_km,
        threshold_km
    )]
    TooFar { distance_km: f64, threshold_km: f64 },
}

pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Returns the distance in kilometers when `actor` is within `threshold_km`
/// of `complaint`. A distance equal to the threshold passes.
pub fn verify_proximity(
    actor: Option<Coordinates>,
    complaint: Option<Coordinates>,
    threshold_km: f64,
) -> Result<f64, GeoError> {
    let actor = actor
        .filter(Coordinates::is_valid)
        .ok_or(GeoError::MissingLocation(Party::Actor))?;
    let complaint = complaint
        .filter(Coordinates::is_valid)
        .ok_or(GeoError::MissingLocation(Party::Complaint))?;

    let distance_km = haversine_km(actor, complaint);
    if distance_km > threshold_km {
        return Err(GeoError::TooFar {
            distance_km,
            threshold_km,
        });
    }
    Ok(distance_km)
}

/// Audit-log rendering of a distance, e.g. `0.342 km`.
pub fn format_distance(distance_km: f64) -> String {
    format!("{:.3} km", distance_km)
}
