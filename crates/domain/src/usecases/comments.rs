//! Comments on news articles

use std::sync::Arc;

use crate::{
    model::{Comment, CommentId, CommentThread, NewComment, NewsId, UserId},
    policy::ContentPolicy,
    ports::{Clock, CommentStore},
    usecases::news::ContentError,
};

/// Use case for comments
pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    clock: Arc<dyn Clock>,
    policy: ContentPolicy,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        clock: Arc<dyn Clock>,
        policy: ContentPolicy,
    ) -> Self {
        Self {
            comments,
            clock,
            policy,
        }
    }

    pub async fn post(&self, comment: NewComment) -> Result<Comment, ContentError> {
        self.policy.check_comment(&comment)?;

        let created = self
            .comments
            .create_comment(&comment, self.clock.now())
            .await?;

        tracing::info!(
            comment_id = created.id,
            news_id = created.news_id,
            uid = created.author_id,
            "Created comment"
        );
        Ok(created)
    }

    /// Comments of an article, newest first, with the viewer's own votes
    pub async fn thread(
        &self,
        news: NewsId,
        viewer: Option<UserId>,
    ) -> Result<CommentThread, ContentError> {
        let comments = self.comments.comments_for_news(news).await?;
        let viewer_votes = match viewer {
            Some(uid) => self.comments.viewer_votes(news, uid).await?,
            None => Vec::new(),
        };

        tracing::debug!(
            news_id = news,
            comments = comments.len(),
            viewer_votes = viewer_votes.len(),
            "Loaded comment thread"
        );

        Ok(CommentThread {
            comments,
            viewer_votes,
        })
    }

    pub async fn delete(&self, id: CommentId) -> Result<(), ContentError> {
        if !self.comments.delete_comment(id).await? {
            return Err(ContentError::NotFound(format!("comment {}", id)));
        }
        tracing::info!(comment_id = id, "Deleted comment");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stance, ViewerVote};
    use crate::policy::PolicyViolation;
    use crate::ports::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use time::macros::datetime;

    #[derive(Default)]
    struct FakeCommentStore {
        comments: Mutex<Vec<Comment>>,
        votes: Vec<(UserId, ViewerVote)>,
    }

    #[async_trait]
    impl CommentStore for FakeCommentStore {
        async fn create_comment(
            &self,
            comment: &NewComment,
            created_at: OffsetDateTime,
        ) -> Result<Comment, StoreError> {
            if comment.news_id == 404 {
                return Err(StoreError::NotFound(format!("news {}", comment.news_id)));
            }
            let mut comments = self.comments.lock().unwrap();
            let created = Comment {
                id: comments.len() as i64 + 1,
                news_id: comment.news_id,
                author_id: comment.author_id,
                author_name: "reader".to_string(),
                author_pic: None,
                body: comment.body.clone(),
                votes: 0,
                created_at,
            };
            comments.push(created.clone());
            Ok(created)
        }

        async fn comments_for_news(&self, news: NewsId) -> Result<Vec<Comment>, StoreError> {
            Ok(self
                .comments
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|c| c.news_id == news)
                .cloned()
                .collect())
        }

        async fn viewer_votes(
            &self,
            _news: NewsId,
            viewer: UserId,
        ) -> Result<Vec<ViewerVote>, StoreError> {
            Ok(self
                .votes
                .iter()
                .filter(|(uid, _)| *uid == viewer)
                .map(|(_, v)| *v)
                .collect())
        }

        async fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError> {
            let mut comments = self.comments.lock().unwrap();
            let before = comments.len();
            comments.retain(|c| c.id != id);
            Ok(comments.len() != before)
        }
    }

    struct FakeClock;

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            datetime!(2025-06-01 08:00 UTC)
        }
    }

    fn service(store: FakeCommentStore) -> CommentService {
        CommentService::new(Arc::new(store), Arc::new(FakeClock), ContentPolicy::default())
    }

    fn comment(news_id: NewsId, body: &str) -> NewComment {
        NewComment {
            author_id: 5,
            news_id,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_thread_is_newest_first_with_viewer_votes() {
        let store = FakeCommentStore {
            votes: vec![(
                5,
                ViewerVote {
                    comment_id: 1,
                    stance: Stance::Up,
                },
            )],
            ..Default::default()
        };
        let service = service(store);

        service.post(comment(1, "first")).await.unwrap();
        service.post(comment(1, "second")).await.unwrap();
        service.post(comment(2, "elsewhere")).await.unwrap();

        let thread = service.thread(1, Some(5)).await.unwrap();
        let bodies: Vec<_> = thread.comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, ["second", "first"]);
        assert_eq!(thread.viewer_votes.len(), 1);

        let anonymous = service.thread(1, None).await.unwrap();
        assert!(anonymous.viewer_votes.is_empty());
    }

    #[tokio::test]
    async fn test_post_validates_body() {
        let service = service(FakeCommentStore::default());
        let err = service.post(comment(1, "  ")).await.unwrap_err();
        assert!(matches!(
            err,
            ContentError::Invalid(PolicyViolation::Missing { field: "comment" })
        ));
    }

    #[tokio::test]
    async fn test_post_on_missing_news() {
        let service = service(FakeCommentStore::default());
        let err = service.post(comment(404, "hello")).await.unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_comment() {
        let service = service(FakeCommentStore::default());
        service.post(comment(1, "bye")).await.unwrap();
        service.delete(1).await.unwrap();
        assert!(matches!(
            service.delete(1).await,
            Err(ContentError::NotFound(_))
        ));
    }
}
