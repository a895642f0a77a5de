use std::fmt;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    entities::{
        null_as_default,
        status::ComplaintStatus,
        update_log::{UpdateLog, UpdateLogEntry},
    },
    geo::Coordinates,
    repository::{Entity, Versioned},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        };
        f.write_str(name)
    }
}

fn now() -> DateTime {
    DateTime::now()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub status: ComplaintStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
    /// Creator's name as it was when the complaint was filed. It is a
    /// snapshot: renaming the user later does not change it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by_username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by_user_id: Option<ObjectId>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub update_log: UpdateLog,

    #[serde(default = "now")]
    pub created_at: DateTime,
    #[serde(default = "now")]
    pub updated_at: DateTime,
    #[serde(rename = "__v", default)]
    pub version: i64,
}

impl Complaint {
    /// Registered position, when both coordinates are present and usable.
    pub fn location(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)).filter(Coordinates::is_valid),
            _ => None,
        }
    }

    pub fn append_entry(&mut self, entry: UpdateLogEntry) {
        self.update_log.append(entry);
    }

    pub fn append_entries(&mut self, entries: impl IntoIterator<Item = UpdateLogEntry>) {
        self.update_log.append_all(entries);
    }

    /// After-photo of the latest status update that closed the complaint.
    pub fn completion_photo(&self) -> Option<&str> {
        self.update_log
            .completion_evidence()
            .and_then(|entry| entry.after_photo.as_deref())
    }

    pub fn clear_resolution(&mut self) {
        self.resolved_at = None;
        self.resolved_by = None;
        self.resolved_by_user_id = None;
    }
}

impl Entity for Complaint {
    fn id(&self) -> ObjectId {
        self.id
    }
}

impl Versioned for Complaint {
    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{self, doc};

    use super::*;
    use crate::entities::{actor::Actor, update_log::EDIT_ACTION};

    #[test]
    fn legacy_document_deserializes_with_defaults() {
        let id = ObjectId::new();
        let complaint: Complaint = bson::from_document(doc! {
            "_id": id,
            "category": "Pothole",
            "description": "Deep pothole",
            "address": "MG Road",
            "status": "resolved",
            "createdByUsername": null,
            "updateLog": null,
        })
        .unwrap();

        assert_eq!(complaint.id, id);
        assert_eq!(complaint.priority, Priority::Medium);
        assert_eq!(complaint.status, ComplaintStatus::RESOLVED);
        assert!(complaint.created_by_username.is_empty());
        assert!(complaint.update_log.is_empty());
        assert_eq!(complaint.version, 0);
        assert_eq!(complaint.location(), None);
    }

    #[test]
    fn stored_field_names_are_preserved() {
        let complaint: Complaint = bson::from_document(doc! {
            "_id": ObjectId::new(),
            "category": "Garbage",
            "description": "Overflowing bin",
            "priority": "High",
            "address": "Station Rd",
            "latitude": 19.076,
            "longitude": 72.8777,
            "status": "in-progress",
            "createdBy": ObjectId::new(),
            "createdByUsername": "asha",
            "__v": 3i32,
        })
        .unwrap();

        let stored = bson::to_document(&complaint).unwrap();
        for field in ["_id", "priority", "createdBy", "createdByUsername", "updateLog", "createdAt", "updatedAt", "__v"] {
            assert!(stored.contains_key(field), "missing {field}");
        }
        assert_eq!(stored.get_str("status").unwrap(), "in-progress");
        assert_eq!(complaint.version, 3);
        assert_eq!(complaint.location(), Some(Coordinates::new(19.076, 72.8777)));
    }

    #[test]
    fn completion_photo_comes_from_latest_closing_entry() {
        let actor = Actor::new(ObjectId::new(), "ravi");
        let mut complaint: Complaint = bson::from_document(doc! {
            "_id": ObjectId::new(),
            "category": "Drainage",
            "description": "Blocked drain",
            "address": "Hill Rd",
        })
        .unwrap();
        assert_eq!(complaint.completion_photo(), None);

        complaint.append_entries(vec![
            UpdateLogEntry::new(UpdateLogEntry::status_action(ComplaintStatus::PartialCompleted), &actor, "half cleared")
                .with_evidence("partial.jpg".to_string()),
            UpdateLogEntry::new(UpdateLogEntry::status_action(ComplaintStatus::COMPLETED), &actor, "cleared")
                .with_evidence("done.jpg".to_string()),
            UpdateLogEntry::new(EDIT_ACTION, &actor, "address fixed"),
        ]);

        assert_eq!(complaint.update_log.len(), 3);
        assert_eq!(complaint.completion_photo(), Some("done.jpg"));
    }
}
