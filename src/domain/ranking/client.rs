//! Rankings sub-client.

use crate::client::FeedClient;
use crate::domain::ranking::RankingBoard;
use crate::domain::Snapshot;
use crate::error::SdkError;
use crate::stream::SnapshotSource;
use crate::shared::RankingMode;
use crate::ws::Topic;

/// Sub-client for ranking operations.
pub struct Rankings<'a> {
    pub(crate) client: &'a FeedClient,
}

impl<'a> Rankings<'a> {
    pub async fn snapshot(&self, mode: RankingMode) -> Result<Snapshot<RankingBoard>, SdkError> {
        self.client
            .http
            .ranking(mode)
            .await
            .map_err(|source| SdkError::Snapshot {
                topic: Topic::Ranking(mode).to_string(),
                source,
            })
    }
}
