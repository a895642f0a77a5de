use std::time::Duration;

use async_trait::async_trait;
use common::geo::Coordinates;
use tokio::time::timeout;

/// Where an updater currently is.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Option<Coordinates>;
}

/// Fix captured by the client and sent along with its request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportedPosition(pub Option<Coordinates>);

#[async_trait]
impl PositionSource for ReportedPosition {
    async fn current_position(&self) -> Option<Coordinates> {
        self.0.filter(Coordinates::is_valid)
    }
}

/// Asks `source` for a fix, giving up after `limit`.
pub async fn acquire_position<S>(source: &S, limit: Duration) -> Option<Coordinates>
where
    S: PositionSource + ?Sized,
{
    match timeout(limit, source.current_position()).await {
        Ok(position) => position,
        Err(_) => {
            log::warn!("No position within {:?}", limit);
            None
        }
    }
}
