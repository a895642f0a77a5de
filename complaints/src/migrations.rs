use async_trait::async_trait;
use common::entities::{
    actor::Actor,
    update_log::{UpdateLogEntry, CREATE_ACTION},
};
use futures::StreamExt;
use mongodb::{
    bson::{self, doc, Document},
    Client,
};
use mongodb_migrator::{migration::Migration, migrator::Env};

pub const COMPLAINTS: &str = "complaints";
pub const LEGACY_USER: &str = "Legacy User";
pub const MIGRATED_DESCRIPTION: &str = "Initial complaint creation (migrated)";

/// Backfills complaints stored before creators and audit trails were recorded.
pub struct LegacyComplaintMigration;

/// Creation entry for a complaint whose log is empty, dated at its creation.
pub fn legacy_creation_entry(complaint: &Document) -> UpdateLogEntry {
    let creator = Actor {
        id: complaint.get_object_id("createdBy").ok(),
        username: Some(
            complaint
                .get_str("createdByUsername")
                .ok()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(LEGACY_USER)
                .to_string(),
        ),
        email: None,
    };

    let mut entry = UpdateLogEntry::new(CREATE_ACTION, &creator, MIGRATED_DESCRIPTION);
    if let Ok(created_at) = complaint.get_datetime("createdAt") {
        entry.timestamp = *created_at;
    }
    entry
}

#[async_trait]
impl Migration for LegacyComplaintMigration {
    async fn up(&self, env: Env) -> anyhow::Result<()> {
        let conn = env
            .db
            .ok_or_else(|| anyhow::anyhow!("db is unavailable"))?
            .collection::<Document>(COMPLAINTS);

        let named = conn
            .update_many(
                doc! {"$or": [
                    {"createdByUsername": {"$exists": false}},
                    {"createdByUsername": null},
                    {"createdByUsername": ""},
                ]},
                doc! {"$set": {"createdByUsername": LEGACY_USER}},
                None,
            )
            .await?;

        conn.update_many(
            doc! {"$or": [{"updateLog": {"$exists": false}}, {"updateLog": null}]},
            doc! {"$set": {"updateLog": []}},
            None,
        )
        .await?;

        use mongodb::error::Result;
        let unlogged = conn
            .find(doc! {"updateLog": {"$size": 0}}, None)
            .await?
            .collect::<Vec<Result<Document>>>()
            .await;

        let seeded = unlogged.len();
        for complaint in unlogged {
            let complaint = complaint?;
            let entry = bson::to_bson(&legacy_creation_entry(&complaint))?;
            conn.update_one(
                doc! {"_id": complaint.get_object_id("_id")?},
                doc! {"$push": {"updateLog": entry}},
                None,
            )
            .await?;
        }

        log::info!(
            "Legacy migration: {} creators named, {} audit trails seeded",
            named.modified_count,
            seeded
        );
        Ok(())
    }
}

pub async fn up_migrations(mongo_uri: &str, database: &str) -> anyhow::Result<()> {
    let client = Client::with_uri_str(mongo_uri).await?;
    let db = client.database(database);

    let migrations: Vec<Box<dyn Migration>> = vec![Box::new(LegacyComplaintMigration)];
    mongodb_migrator::migrator::default::DefaultMigrator::new()
        .with_conn(db.clone())
        .with_migrations_vec(migrations)
        .up()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{oid::ObjectId, DateTime};

    use super::*;

    #[test]
    fn seeded_entry_keeps_creator_and_date() {
        let creator = ObjectId::new();
        let created_at = DateTime::from_millis(1_600_000_000_000);
        let entry = legacy_creation_entry(&doc! {
            "_id": ObjectId::new(),
            "createdBy": creator,
            "createdByUsername": "asha",
            "createdAt": created_at,
        });

        assert_eq!(entry.action, CREATE_ACTION);
        assert_eq!(entry.user, "asha");
        assert_eq!(entry.user_id, Some(creator));
        assert_eq!(entry.timestamp, created_at);
        assert_eq!(entry.description, MIGRATED_DESCRIPTION);
    }

    #[test]
    fn anonymous_legacy_complaints_get_placeholder_creator() {
        let entry = legacy_creation_entry(&doc! {"_id": ObjectId::new(), "createdByUsername": ""});
        assert_eq!(entry.user, LEGACY_USER);
        assert_eq!(entry.user_id, None);
    }
}
