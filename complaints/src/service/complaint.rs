use std::{collections::BTreeMap, str::FromStr};

use chrono::SecondsFormat;
use common::{
    context::Context,
    entities::{
        actor::Actor,
        complaint::Complaint,
        status::{ComplaintStatus, UnknownStatus},
        update_log::UpdateLogEntry,
    },
    geo::Coordinates,
    repository::{mongo_repository::by_id, RepositoryObject},
};
use mongodb::bson::{oid::ObjectId, Bson, DateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    lifecycle::{self, ComplaintChange, LifecycleSettings, NewComplaint, StatusUpdate},
    position::{acquire_position, PositionSource},
};
use crate::error::{Error, Result};

fn timestamp(value: DateTime) -> String {
    value.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for Location {
    fn from(value: Coordinates) -> Self {
        Self {
            lat: value.lat,
            lng: value.lng,
        }
    }
}

impl From<Location> for Coordinates {
    fn from(value: Location) -> Self {
        Coordinates::new(value.lat, value.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicLogEntry {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub timestamp: String,
    pub action: String,
    pub user: String,
    pub user_id: Option<String>,
    pub description: String,
    pub after_photo: Option<String>,
    pub location: Option<Location>,
    pub distance_from_original: Option<String>,
    pub changes: Option<BTreeMap<String, String>>,
}

impl From<UpdateLogEntry> for PublicLogEntry {
    fn from(entry: UpdateLogEntry) -> Self {
        Self {
            id: entry.id.map(|id| id.to_hex()),
            timestamp: timestamp(entry.timestamp),
            action: entry.action,
            user: entry.user,
            user_id: entry.user_id.map(|id| id.to_hex()),
            description: entry.description,
            after_photo: entry.after_photo,
            location: entry.location.map(Location::from),
            distance_from_original: entry.distance_from_original,
            changes: entry.changes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicComplaint {
    #[serde(rename = "_id")]
    pub id: String,
    pub category: String,
    pub description: String,
    pub priority: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image: Option<String>,
    pub status: String,
    pub created_by: Option<String>,
    pub created_by_username: String,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_by_user_id: Option<String>,
    pub update_log: Vec<PublicLogEntry>,
    /// After-photo of the update that closed the complaint, if any.
    pub completion_photo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Complaint> for PublicComplaint {
    fn from(complaint: Complaint) -> Self {
        let completion_photo = complaint.completion_photo().map(str::to_string);
        Self {
            id: complaint.id.to_hex(),
            category: complaint.category,
            description: complaint.description,
            priority: complaint.priority.to_string(),
            address: complaint.address,
            latitude: complaint.latitude,
            longitude: complaint.longitude,
            image: complaint.image,
            status: complaint.status.to_string(),
            created_by: complaint.created_by.map(|id| id.to_hex()),
            created_by_username: complaint.created_by_username,
            resolved_at: complaint.resolved_at.map(timestamp),
            resolved_by: complaint.resolved_by,
            resolved_by_user_id: complaint.resolved_by_user_id.map(|id| id.to_hex()),
            update_log: complaint
                .update_log
                .entries()
                .iter()
                .cloned()
                .map(PublicLogEntry::from)
                .collect(),
            completion_photo,
            created_at: timestamp(complaint.created_at),
            updated_at: timestamp(complaint.updated_at),
        }
    }
}

/// Which complaints a listing returns. `Solved` means completed or resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Solved,
    Only(ComplaintStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ComplaintStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !status.is_terminal(),
            StatusFilter::Solved => status.is_terminal(),
            StatusFilter::Only(only) => *only == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "solved" => Ok(StatusFilter::Solved),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintSummary {
    pub total: usize,
    pub active: usize,
    pub solved: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl ComplaintSummary {
    fn count(complaints: &[Complaint]) -> Self {
        let mut summary = ComplaintSummary {
            by_status: ComplaintStatus::ALL
                .iter()
                .map(|status| (status.to_string(), 0))
                .collect(),
            ..Default::default()
        };
        for complaint in complaints {
            summary.total += 1;
            if complaint.status.is_terminal() {
                summary.solved += 1;
            } else {
                summary.active += 1;
            }
            *summary.by_status.entry(complaint.status.to_string()).or_default() += 1;
        }
        summary
    }
}

fn rejected(operation: &str, id: &ObjectId, actor: &Actor, err: Error) -> Error {
    log::warn!(
        "{} of complaint {} by {} rejected: {}",
        operation,
        id,
        actor.display_name(),
        err.kind()
    );
    err
}

pub struct ComplaintService {
    context: Context,
}

impl ComplaintService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    fn actor(&self) -> Result<Actor> {
        self.context.actor().cloned().ok_or(Error::Unauthorized)
    }

    fn complaints(&self) -> Result<RepositoryObject<Complaint>> {
        Ok(self.context.try_get_repository::<Complaint>()?)
    }

    fn settings(&self) -> Result<LifecycleSettings> {
        Ok(self.context.try_get_manual::<LifecycleSettings>()?)
    }

    async fn load(&self, id: &str) -> Result<Complaint> {
        let Ok(id) = id.parse::<ObjectId>() else {
            return Err(Error::NotFound);
        };
        self.complaints()?
            .find("_id", &Bson::ObjectId(id))
            .await?
            .ok_or(Error::NotFound)
    }

    async fn save(&self, complaint: &Complaint) -> Result<()> {
        match self.complaints()?.update_one(by_id(complaint.id), complaint).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_conflict() => {
                log::warn!("Complaint {} was changed concurrently", complaint.id);
                Err(err.into())
            }
            Err(err) => {
                log::error!("Failed to save complaint {}: {}", complaint.id, err);
                Err(err.into())
            }
        }
    }

    pub async fn create(&self, request: NewComplaint) -> Result<PublicComplaint> {
        let actor = self.actor()?;
        let complaint = lifecycle::create_complaint(&actor, request, &self.settings()?)?;

        if let Err(err) = self.complaints()?.insert(&complaint).await {
            log::error!("Failed to store complaint: {}", err);
            return Err(err.into());
        }

        log::info!(
            "Complaint {} registered by {}",
            complaint.id,
            complaint.created_by_username
        );
        Ok(complaint.into())
    }

    pub async fn find(&self, id: &str) -> Result<PublicComplaint> {
        Ok(self.load(id).await?.into())
    }

    pub async fn list(&self, filter: StatusFilter) -> Result<Vec<PublicComplaint>> {
        let complaints = self.complaints()?.find_all(0, u32::MAX).await?;
        Ok(complaints
            .into_iter()
            .filter(|complaint| filter.matches(complaint.status))
            .map(PublicComplaint::from)
            .collect())
    }

    pub async fn mine(&self) -> Result<Vec<PublicComplaint>> {
        let actor = self.actor()?;
        let complaints = self.complaints()?;

        let mine = match actor.id {
            Some(id) => complaints.find_many("createdBy", &Bson::ObjectId(id)).await?,
            None => {
                complaints
                    .find_many("createdByUsername", &Bson::String(actor.display_name()))
                    .await?
            }
        };
        Ok(mine.into_iter().map(PublicComplaint::from).collect())
    }

    pub async fn summary(&self) -> Result<ComplaintSummary> {
        let complaints = self.complaints()?.find_all(0, u32::MAX).await?;
        Ok(ComplaintSummary::count(&complaints))
    }

    /// Status change from the field. The updater's position is only
    /// requested once the description and photo are known to be present.
    pub async fn update_status<S>(
        &self,
        id: &str,
        update: StatusUpdate,
        position: &S,
    ) -> Result<PublicComplaint>
    where
        S: PositionSource + ?Sized,
    {
        let actor = self.actor()?;
        let settings = self.settings()?;
        let complaint = self.load(id).await?;

        lifecycle::check_update_request(&update, &settings)
            .map_err(|err| rejected("Status update", &complaint.id, &actor, err))?;

        let actor_position = acquire_position(position, settings.location_timeout).await;
        let status = update.status;
        let updated =
            lifecycle::request_status_update(&complaint, &actor, update, actor_position, &settings)
                .map_err(|err| rejected("Status update", &complaint.id, &actor, err))?;

        self.save(&updated).await?;
        log::info!(
            "Complaint {} moved from {} to {} by {}",
            updated.id,
            complaint.status,
            status,
            actor.display_name()
        );
        Ok(updated.into())
    }

    pub async fn edit(&self, id: &str, change: ComplaintChange) -> Result<PublicComplaint> {
        let actor = self.actor()?;
        let complaint = self.load(id).await?;

        let updated = lifecycle::edit_details(&complaint, &actor, change)
            .map_err(|err| rejected("Edit", &complaint.id, &actor, err))?;

        self.save(&updated).await?;
        log::info!("Complaint {} edited by {}", updated.id, actor.display_name());
        Ok(updated.into())
    }
}
