use futures_util::StreamExt;
use serde::de::DeserializeOwned;

/// Reads the collection to make sure stored documents still deserialize.
pub async fn verify<T: DeserializeOwned + Unpin + Send + Sync>(
    mongo_uri: &str,
    database: &str,
    collection: &str,
    all: bool,
) -> anyhow::Result<()> {
    let client = mongodb::Client::with_uri_str(mongo_uri).await?;
    let db = client.database(database);
    let collection = db.collection::<T>(collection);

    if all {
        let _ = collection
            .find(None, None)
            .await?
            .collect::<Vec<Result<T, mongodb::error::Error>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<T>, mongodb::error::Error>>()?;
    } else {
        let value = collection.find(None, None).await?.next().await;

        if let Some(value) = value {
            let _ = value?;
        }
    }

    Ok(())
}
