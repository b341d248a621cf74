//! News persistence and listings

use async_trait::async_trait;
use newsdesk_domain::{
    NewsArticle, NewsCard, NewsDetail, NewsId, NewsRecord, NewsStore, StoreError, UserId,
};
use time::OffsetDateTime;

use super::{SqliteStore, db_err, from_nanos, to_nanos};

type ArticleRow = (i64, i64, String, String, String, String, String, String, i64, i64);
type CardRow = (i64, String, String, String, String, String, i64, i64);

const ARTICLE_COLUMNS: &str = "newsid, createdby, title, category, banner_url, image_url, \
                               content, summary, likes, created_at";

const CARD_SELECT: &str = r#"
    SELECT n.newsid, n.title, n.category, n.banner_url, n.summary, u.username, n.likes, n.created_at
    FROM news AS n
    INNER JOIN users AS u ON n.createdby = u.uid
"#;

fn article_from_row(row: ArticleRow) -> Result<NewsArticle, StoreError> {
    let (id, created_by, title, category, banner_url, image_url, content, summary, likes, at) = row;
    Ok(NewsArticle {
        id,
        created_by,
        title,
        category,
        banner_url,
        image_url,
        content,
        summary,
        likes,
        created_at: from_nanos(at)?,
    })
}

fn cards_from_rows(rows: Vec<CardRow>) -> Result<Vec<NewsCard>, StoreError> {
    rows.into_iter()
        .map(|(id, title, category, banner_url, summary, author, likes, at)| {
            Ok(NewsCard {
                id,
                title,
                category,
                banner_url,
                summary,
                author,
                likes,
                created_at: from_nanos(at)?,
            })
        })
        .collect()
}

impl SqliteStore {
    async fn cards(&self, sql: &str, binds: &[i64]) -> Result<Vec<NewsCard>, StoreError> {
        let mut query = sqlx::query_as::<_, CardRow>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        cards_from_rows(rows)
    }
}

#[async_trait]
impl NewsStore for SqliteStore {
    async fn create_news(&self, record: &NewsRecord) -> Result<NewsArticle, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO news
            (createdby, title, category, banner_url, image_url, content, summary, likes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        );
        let draft = &record.draft;
        let row: ArticleRow = sqlx::query_as(&sql)
            .bind(draft.created_by)
            .bind(&draft.title)
            .bind(&draft.category)
            .bind(&record.banner_url)
            .bind(&record.image_url)
            .bind(&draft.content)
            .bind(&draft.summary)
            .bind(to_nanos(record.created_at)?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match db_err(e) {
                StoreError::NotFound(_) => {
                    StoreError::NotFound(format!("user {}", draft.created_by))
                }
                other => other,
            })?;

        article_from_row(row)
    }

    async fn news_detail(&self, id: NewsId) -> Result<Option<NewsDetail>, StoreError> {
        let row: Option<(i64, String, String, String, i64, i64, String, String)> =
            sqlx::query_as(
                r#"
                SELECT n.newsid, n.category, n.title, u.username, n.created_at, n.likes,
                       n.image_url, n.content
                FROM news AS n
                INNER JOIN users AS u ON n.createdby = u.uid
                WHERE n.newsid = ?
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some((id, category, title, author, at, likes, image_url, content)) => {
                Ok(Some(NewsDetail {
                    id,
                    category,
                    title,
                    author,
                    created_at: from_nanos(at)?,
                    likes,
                    image_url,
                    content,
                }))
            }
            None => Ok(None),
        }
    }

    async fn top_news(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<NewsCard>, StoreError> {
        let sql = format!(
            "{} WHERE n.created_at >= ? ORDER BY n.likes DESC, n.created_at DESC, n.newsid DESC LIMIT ?",
            CARD_SELECT
        );
        self.cards(&sql, &[to_nanos(since)?, i64::from(limit)]).await
    }

    async fn latest_news(&self, limit: Option<u32>) -> Result<Vec<NewsCard>, StoreError> {
        let sql = format!(
            "{} ORDER BY n.created_at DESC, n.newsid DESC LIMIT ?",
            CARD_SELECT
        );
        // A negative LIMIT means no limit in SQLite.
        self.cards(&sql, &[limit.map(i64::from).unwrap_or(-1)])
            .await
    }

    async fn latest_by_category(&self, per_category: u32) -> Result<Vec<NewsCard>, StoreError> {
        let rows: Vec<CardRow> = sqlx::query_as(
            r#"
            SELECT newsid, title, category, banner_url, summary, username, likes, created_at
            FROM (
                SELECT n.newsid, n.title, n.category, n.banner_url, n.summary, u.username,
                       n.likes, n.created_at,
                       ROW_NUMBER() OVER (
                           PARTITION BY n.category
                           ORDER BY n.created_at DESC, n.newsid DESC
                       ) AS rn
                FROM news AS n
                INNER JOIN users AS u ON n.createdby = u.uid
            )
            WHERE rn <= ?
            ORDER BY category, created_at DESC, newsid DESC
            "#,
        )
        .bind(i64::from(per_category))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        cards_from_rows(rows)
    }

    async fn news_by_author(&self, author: UserId) -> Result<Vec<NewsCard>, StoreError> {
        let sql = format!(
            "{} WHERE n.createdby = ? ORDER BY n.created_at DESC, n.newsid DESC",
            CARD_SELECT
        );
        self.cards(&sql, &[author]).await
    }

    async fn save_news(&self, user: UserId, news: NewsId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO savednews (uid, newsid) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(news)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            StoreError::NotFound(_) => {
                StoreError::NotFound(format!("user {} or news {}", user, news))
            }
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "news {} already saved by user {}",
                news, user
            )));
        }
        Ok(())
    }

    async fn unsave_news(&self, user: UserId, news: NewsId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM savednews WHERE uid = ? AND newsid = ?")
            .bind(user)
            .bind(news)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn saved_news(&self, user: UserId) -> Result<Vec<NewsCard>, StoreError> {
        let sql = format!(
            r#"{}
            INNER JOIN savednews AS s ON s.newsid = n.newsid
            WHERE s.uid = ?
            ORDER BY n.created_at DESC, n.newsid DESC"#,
            CARD_SELECT
        );
        self.cards(&sql, &[user]).await
    }

    async fn delete_news(&self, id: NewsId) -> Result<Option<NewsArticle>, StoreError> {
        // Comments, likes and bookmarks go with the row via ON DELETE CASCADE.
        let sql = format!("DELETE FROM news WHERE newsid = ? RETURNING {}", ARTICLE_COLUMNS);
        let row: Option<ArticleRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(article_from_row).transpose()
    }
}
