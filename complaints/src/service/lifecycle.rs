//! Rules for opening, progressing and correcting a complaint.
//!
//! Everything here is synchronous and side-effect free: a function takes the
//! current complaint and returns the replacement to persist, or the reason the
//! request was refused. Persistence and position acquisition live in
//! [`super::complaint`].

use std::{collections::BTreeMap, time::Duration};

use common::{
    access_rules::{AccessRules, Edit},
    entities::{
        actor::Actor,
        complaint::{Complaint, Priority},
        status::{ComplaintStatus, TransitionPolicy},
        update_log::{UpdateLog, UpdateLogEntry, CREATE_ACTION, EDIT_ACTION},
    },
    geo::{format_distance, verify_proximity, Coordinates, DEFAULT_PROXIMITY_THRESHOLD_KM},
};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

pub const CREATED_DESCRIPTION: &str = "Complaint registered";
pub const EDITED_DESCRIPTION: &str = "Complaint details were updated by the original creator";

const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
const LOCATION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleSettings {
    pub threshold_km: f64,
    pub location_timeout: Duration,
    pub transitions: TransitionPolicy,
    pub max_photo_bytes: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            threshold_km: DEFAULT_PROXIMITY_THRESHOLD_KM,
            location_timeout: LOCATION_TIMEOUT,
            transitions: TransitionPolicy::default(),
            max_photo_bytes: MAX_PHOTO_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    pub category: String,
    pub description: String,
    #[serde(default)]
    #[schema(value_type = String, example = "Medium")]
    pub priority: Priority,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Base64 data URL.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: ComplaintStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub after_photo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintChange {
    pub category: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "High")]
    pub priority: Option<Priority>,
    pub address: Option<String>,
}

fn required(value: &str, field: &'static str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::MissingField(field));
    }
    Ok(value.to_string())
}

/// Decoded size of a base64 payload, with or without a `data:` header.
pub fn photo_bytes(photo: &str) -> usize {
    let payload = match photo.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
        None => photo,
    };
    payload.trim_end_matches('=').len() * 3 / 4
}

fn check_photo(photo: &str, settings: &LifecycleSettings) -> Result<()> {
    if photo_bytes(photo) > settings.max_photo_bytes {
        return Err(Error::PhotoTooLarge {
            limit: settings.max_photo_bytes,
        });
    }
    Ok(())
}

pub fn create_complaint(
    actor: &Actor,
    request: NewComplaint,
    settings: &LifecycleSettings,
) -> Result<Complaint> {
    let category = required(&request.category, "category")?;
    let description = required(&request.description, "description")?;
    let address = required(&request.address, "address")?;

    let location = match (request.latitude, request.longitude) {
        (None, None) => None,
        (Some(lat), Some(lng)) => {
            let location = Coordinates::new(lat, lng);
            if !location.is_valid() {
                return Err(Error::InvalidCoordinates);
            }
            Some(location)
        }
        _ => return Err(Error::InvalidCoordinates),
    };

    let image = request.image.filter(|image| !image.is_empty());
    if let Some(image) = &image {
        check_photo(image, settings)?;
    }

    let mut update_log = UpdateLog::default();
    update_log.append(UpdateLogEntry::new(CREATE_ACTION, actor, CREATED_DESCRIPTION));

    let now = DateTime::now();
    Ok(Complaint {
        id: ObjectId::new(),
        category,
        description,
        priority: request.priority,
        address,
        latitude: location.map(|l| l.lat),
        longitude: location.map(|l| l.lng),
        image,
        status: ComplaintStatus::Pending,
        created_by: actor.id,
        created_by_username: actor.display_name(),
        resolved_at: None,
        resolved_by: None,
        resolved_by_user_id: None,
        update_log,
        created_at: now,
        updated_at: now,
        version: 0,
    })
}

/// Checks that need nothing but the request itself. Runs before the
/// updater's position is requested.
pub fn check_update_request(update: &StatusUpdate, settings: &LifecycleSettings) -> Result<()> {
    if update.description.trim().is_empty() {
        return Err(Error::MissingDescription);
    }
    match update.after_photo.as_deref().map(str::trim) {
        None | Some("") => Err(Error::MissingEvidence),
        Some(photo) => check_photo(photo, settings),
    }
}

/// Applies a field status update. Preconditions are checked in a fixed order
/// and the first failure wins; a refused request leaves `complaint` as it was.
pub fn request_status_update(
    complaint: &Complaint,
    actor: &Actor,
    update: StatusUpdate,
    actor_position: Option<Coordinates>,
    settings: &LifecycleSettings,
) -> Result<Complaint> {
    check_update_request(&update, settings)?;

    let position = actor_position.ok_or(Error::LocationUnavailable)?;
    let distance_km = verify_proximity(Some(position), complaint.location(), settings.threshold_km)?;

    if !settings.transitions.allows(complaint.status, update.status) {
        return Err(Error::InvalidTransition {
            from: complaint.status,
            to: update.status,
        });
    }

    let evidence = update.after_photo.unwrap_or_default();
    let entry = UpdateLogEntry::new(
        UpdateLogEntry::status_action(update.status),
        actor,
        update.description.trim(),
    )
    .with_evidence(evidence)
    .with_location(position, format_distance(distance_km));

    let mut updated = complaint.clone();
    updated.status = update.status;
    updated.append_entry(entry);
    if update.status.is_terminal() {
        updated.resolved_at = Some(DateTime::now());
        updated.resolved_by = Some(actor.display_name());
        updated.resolved_by_user_id = actor.id;
    } else {
        updated.clear_resolution();
    }
    updated.updated_at = DateTime::now();
    Ok(updated)
}

/// Lets the creator correct the descriptive fields. Blank values are ignored.
pub fn edit_details(complaint: &Complaint, actor: &Actor, change: ComplaintChange) -> Result<Complaint> {
    if !Edit.get_access(complaint, actor) {
        return Err(Error::Forbidden);
    }

    let mut updated = complaint.clone();
    let mut changes = BTreeMap::new();

    let text_fields = [
        ("category", change.category, &mut updated.category),
        ("description", change.description, &mut updated.description),
        ("address", change.address, &mut updated.address),
    ];
    for (name, value, field) in text_fields {
        if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            changes.insert(name.to_string(), value.clone());
            *field = value;
        }
    }
    if let Some(priority) = change.priority {
        changes.insert("priority".to_string(), priority.to_string());
        updated.priority = priority;
    }

    if changes.is_empty() {
        return Err(Error::NothingToEdit);
    }

    updated.append_entry(UpdateLogEntry::new(EDIT_ACTION, actor, EDITED_DESCRIPTION).with_changes(changes));
    updated.updated_at = DateTime::now();
    Ok(updated)
}
