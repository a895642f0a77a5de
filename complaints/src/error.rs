use actix_web::{error::JsonPayloadError, http::StatusCode, HttpResponse, ResponseError};
use common::{
    entities::status::{ComplaintStatus, UnknownStatus},
    error::ServiceError,
    geo::{GeoError, Party},
    retry::Conflict,
};
use derive_more::{Display, Error};
use serde_json::json;

#[derive(Debug, Display, Error)]
pub enum Error {
    #[display(fmt = "Please provide a description of the update")]
    MissingDescription,
    #[display(fmt = "Please upload an after photo - it's mandatory for status updates")]
    MissingEvidence,
    #[display(fmt = "Unable to get your location. Please allow location access and try again.")]
    LocationUnavailable,
    #[display(
        fmt = "You are {:.2} km away from the complaint location. You must be within {} km to update status.",
        distance_km,
        threshold_km
    )]
    TooFar { distance_km: f64, threshold_km: f64 },
    #[display(fmt = "Original complaint location not available")]
    MissingOriginalLocation,
    #[display(fmt = "Status cannot change from {} to {}", from, to)]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },
    #[display(fmt = "Only the original creator can edit this complaint")]
    Forbidden,
    #[display(fmt = "Please log in to continue")]
    Unauthorized,
    #[display(fmt = "Complaint not found")]
    NotFound,
    #[display(fmt = "{} is required", _0)]
    MissingField(#[error(not(source))] &'static str),
    #[display(fmt = "Coordinates are missing or out of range")]
    InvalidCoordinates,
    #[display(fmt = "Image size should be less than {} bytes", limit)]
    PhotoTooLarge { limit: usize },
    #[display(fmt = "Nothing to edit")]
    NothingToEdit,
    #[display(fmt = "{}", _0)]
    UnknownStatus(#[error(not(source))] UnknownStatus),
    #[display(fmt = "Malformed request: {}", _0)]
    InvalidBody(#[error(not(source))] String),
    #[display(fmt = "{}", _0)]
    Storage(#[error(not(source))] ServiceError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingDescription => "MissingDescription",
            Error::MissingEvidence => "MissingEvidence",
            Error::LocationUnavailable => "LocationUnavailable",
            Error::TooFar { .. } => "TooFar",
            Error::MissingOriginalLocation => "MissingOriginalLocation",
            Error::InvalidTransition { .. } => "InvalidTransition",
            Error::Forbidden => "Forbidden",
            Error::Unauthorized => "Unauthorized",
            Error::NotFound => "NotFound",
            Error::MissingField(_) => "MissingField",
            Error::InvalidCoordinates => "InvalidCoordinates",
            Error::PhotoTooLarge { .. } => "PhotoTooLarge",
            Error::NothingToEdit => "NothingToEdit",
            Error::UnknownStatus(_) => "UnknownStatus",
            Error::InvalidBody(_) => "InvalidBody",
            Error::Storage(_) => "StorageError",
        }
    }
}

impl From<ServiceError> for Error {
    fn from(value: ServiceError) -> Self {
        Error::Storage(value)
    }
}

impl From<UnknownStatus> for Error {
    fn from(value: UnknownStatus) -> Self {
        Error::UnknownStatus(value)
    }
}

impl From<JsonPayloadError> for Error {
    fn from(value: JsonPayloadError) -> Self {
        Error::InvalidBody(value.to_string())
    }
}

impl From<GeoError> for Error {
    fn from(value: GeoError) -> Self {
        match value {
            GeoError::MissingLocation(Party::Actor) => Error::LocationUnavailable,
            GeoError::MissingLocation(Party::Complaint) => Error::MissingOriginalLocation,
            GeoError::TooFar {
                distance_km,
                threshold_km,
            } => Error::TooFar {
                distance_km,
                threshold_km,
            },
        }
    }
}

impl Conflict for Error {
    fn is_conflict(&self) -> bool {
        matches!(self, Error::Storage(err) if err.is_conflict())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            Error::Storage(err) => err.status_code(),
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
            "kind": self.kind(),
        });
        if let Error::TooFar {
            distance_km,
            threshold_km,
        } = self
        {
            body["distanceKm"] = json!(distance_km);
            body["thresholdKm"] = json!(threshold_km);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
