//! User profile lookups used to enrich donor lists.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use donation_service::CollaboratorError;
use serde::Serialize;
use tokio::sync::RwLock;

/// A user as seen by the viewer of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    /// Whether the viewer follows this user.
    pub subscribed: bool,
}

/// Source of user summaries.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Returns summaries for `ids`, in the same order, as seen by `viewer`.
    async fn summaries(
        &self,
        ids: &[UserId],
        viewer: &UserId,
    ) -> Result<Vec<UserSummary>, CollaboratorError>;
}

/// Profile directory backed by an in-memory follow graph.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileDirectory {
    follows: Arc<RwLock<HashSet<(UserId, UserId)>>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `follower` follows `followee`.
    pub async fn follow(&self, follower: UserId, followee: UserId) {
        self.follows.write().await.insert((follower, followee));
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn summaries(
        &self,
        ids: &[UserId],
        viewer: &UserId,
    ) -> Result<Vec<UserSummary>, CollaboratorError> {
        let follows = self.follows.read().await;
        Ok(ids
            .iter()
            .map(|id| UserSummary {
                id: id.clone(),
                subscribed: follows.contains(&(viewer.clone(), id.clone())),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribed_reflects_viewer_follows() {
        let directory = InMemoryProfileDirectory::new();
        directory.follow("viewer".into(), "a".into()).await;
        directory.follow("someone".into(), "b".into()).await;

        let summaries = directory
            .summaries(&["a".into(), "b".into()], &"viewer".into())
            .await
            .unwrap();

        assert_eq!(
            summaries,
            vec![
                UserSummary {
                    id: "a".into(),
                    subscribed: true,
                },
                UserSummary {
                    id: "b".into(),
                    subscribed: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_anonymous_viewer_follows_nobody() {
        let directory = InMemoryProfileDirectory::new();
        directory.follow("viewer".into(), "a".into()).await;

        let summaries = directory
            .summaries(&["a".into()], &UserId::default())
            .await
            .unwrap();
        assert!(!summaries[0].subscribed);
    }
}
