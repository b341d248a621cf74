//! Comment persistence

use async_trait::async_trait;
use newsdesk_domain::{
    Comment, CommentId, CommentStore, NewComment, NewsId, Stance, StoreError, UserId, ViewerVote,
};
use time::OffsetDateTime;

use super::{SqliteStore, db_err, from_nanos, to_nanos};

type CommentRow = (i64, i64, i64, String, Option<String>, String, i64, i64);

const COMMENT_SELECT: &str = r#"
    SELECT c.commentid, c.newsid, c.uid, u.username, u.profile_pic, c.comment, c.votes, c.created_at
    FROM comment AS c
    INNER JOIN users AS u ON c.uid = u.uid
"#;

fn comment_from_row(row: CommentRow) -> Result<Comment, StoreError> {
    let (id, news_id, author_id, author_name, author_pic, body, votes, at) = row;
    Ok(Comment {
        id,
        news_id,
        author_id,
        author_name,
        author_pic,
        body,
        votes,
        created_at: from_nanos(at)?,
    })
}

#[async_trait]
impl CommentStore for SqliteStore {
    async fn create_comment(
        &self,
        comment: &NewComment,
        created_at: OffsetDateTime,
    ) -> Result<Comment, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO comment (uid, newsid, comment, votes, created_at)
            VALUES (?, ?, ?, 0, ?)
            RETURNING commentid
            "#,
        )
        .bind(comment.author_id)
        .bind(comment.news_id)
        .bind(&comment.body)
        .bind(to_nanos(created_at)?)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match db_err(e) {
            StoreError::NotFound(_) => StoreError::NotFound(format!(
                "user {} or news {}",
                comment.author_id, comment.news_id
            )),
            other => other,
        })?;

        let sql = format!("{} WHERE c.commentid = ?", COMMENT_SELECT);
        let row: CommentRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        comment_from_row(row)
    }

    async fn comments_for_news(&self, news: NewsId) -> Result<Vec<Comment>, StoreError> {
        let sql = format!(
            "{} WHERE c.newsid = ? ORDER BY c.created_at DESC, c.commentid DESC",
            COMMENT_SELECT
        );
        let rows: Vec<CommentRow> = sqlx::query_as(&sql)
            .bind(news)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(comment_from_row).collect()
    }

    async fn viewer_votes(
        &self,
        news: NewsId,
        viewer: UserId,
    ) -> Result<Vec<ViewerVote>, StoreError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT l.commentid, l.like_status
            FROM likedcomment AS l
            INNER JOIN comment AS c ON l.commentid = c.commentid
            WHERE c.newsid = ? AND l.uid = ?
            ORDER BY l.commentid
            "#,
        )
        .bind(news)
        .bind(viewer)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(comment_id, status)| {
                let stance = status
                    .parse::<Stance>()
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(ViewerVote { comment_id, stance })
            })
            .collect()
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comment WHERE commentid = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::fixtures::{T0, article, comment, user};
    use newsdesk_domain::{VoteStore, VoteTarget};

    #[tokio::test]
    async fn test_create_joins_author() {
        let store = SqliteStore::in_memory().await.unwrap();
        let ada = user(&store, "ada").await;
        let news = article(&store, ada, "rates", "economy", T0).await;

        let created = store
            .create_comment(
                &NewComment {
                    author_id: ada,
                    news_id: news,
                    body: "first!".to_string(),
                },
                T0,
            )
            .await
            .unwrap();

        assert_eq!(created.author_name, "ada");
        assert_eq!(created.votes, 0);
        assert_eq!(created.created_at, T0);
    }

    #[tokio::test]
    async fn test_comment_on_missing_news() {
        let store = SqliteStore::in_memory().await.unwrap();
        let ada = user(&store, "ada").await;

        let err = store
            .create_comment(
                &NewComment {
                    author_id: ada,
                    news_id: 9,
                    body: "hello".to_string(),
                },
                T0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_thread_and_viewer_votes() {
        let store = SqliteStore::in_memory().await.unwrap();
        let ada = user(&store, "ada").await;
        let bob = user(&store, "bob").await;
        let news = article(&store, ada, "rates", "economy", T0).await;
        let other = article(&store, ada, "other", "economy", T0).await;
        let first = comment(&store, ada, news, "first").await;
        let second = comment(&store, bob, news, "second").await;
        let elsewhere = comment(&store, bob, other, "elsewhere").await;

        for (c, stance) in [(first, Stance::Down), (elsewhere, Stance::Up)] {
            let mut tx = store.begin(VoteTarget::Comment).await.unwrap();
            tx.insert_vote(bob, c, stance).await.unwrap();
            tx.commit().await.unwrap();
        }

        let comments = store.comments_for_news(news).await.unwrap();
        let ids: Vec<_> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, [second, first]);

        let votes = store.viewer_votes(news, bob).await.unwrap();
        assert_eq!(
            votes,
            [ViewerVote {
                comment_id: first,
                stance: Stance::Down
            }]
        );
        assert!(store.viewer_votes(news, ada).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_comment_cascades_votes() {
        let store = SqliteStore::in_memory().await.unwrap();
        let ada = user(&store, "ada").await;
        let news = article(&store, ada, "rates", "economy", T0).await;
        let c = comment(&store, ada, news, "bye").await;

        let mut tx = store.begin(VoteTarget::Comment).await.unwrap();
        tx.insert_vote(ada, c, Stance::Up).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.delete_comment(c).await.unwrap());
        assert!(!store.delete_comment(c).await.unwrap());
        assert!(store.viewer_votes(news, ada).await.unwrap().is_empty());
    }
}
