//! Assets sub-client.

use crate::client::FeedClient;
use crate::domain::asset::AssetValuation;
use crate::domain::Snapshot;
use crate::error::SdkError;
use crate::stream::SnapshotSource;
use crate::shared::UserId;
use crate::ws::Topic;

/// Sub-client for asset valuation.
pub struct Assets<'a> {
    pub(crate) client: &'a FeedClient,
}

impl<'a> Assets<'a> {
    pub async fn snapshot(&self, user: &UserId) -> Result<Snapshot<AssetValuation>, SdkError> {
        self.client
            .http
            .asset(user)
            .await
            .map_err(|source| SdkError::Snapshot {
                topic: Topic::Asset(user.clone()).to_string(),
                source,
            })
    }
}
