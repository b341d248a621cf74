//! News publishing, listing and bookmarks

use std::sync::Arc;
use thiserror::Error;
use time::Duration;

use crate::{
    model::{
        HomePage, ImageUpload, NewsArticle, NewsCard, NewsDetail, NewsDraft, NewsId, NewsRecord,
        StoredImage, UserId,
    },
    object_key,
    policy::{ContentPolicy, PolicyViolation},
    ports::{Clock, ImageError, ImageStore, NewsStore, StoreError},
};

/// Folder for article banners in image storage
pub const BANNER_FOLDER: &str = "news-banners";
/// Folder for article body images in image storage
pub const IMAGE_FOLDER: &str = "news-images";

/// Errors from news and comment operations
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Invalid input: {0}")]
    Invalid(#[from] PolicyViolation),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already saved: {0}")]
    AlreadySaved(String),
    #[error("Storage error: {0}")]
    Store(StoreError),
    #[error("Image storage error: {0}")]
    Image(#[from] ImageError),
}

impl From<StoreError> for ContentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ContentError::NotFound(what),
            StoreError::Conflict(what) => ContentError::AlreadySaved(what),
            other => ContentError::Store(other),
        }
    }
}

/// Configuration for the news use case
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub policy: ContentPolicy,
    /// How far back the "top" section of the home page looks
    pub top_window: Duration,
    pub top_limit: u32,
    pub latest_limit: u32,
    pub per_category_limit: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            policy: ContentPolicy::default(),
            top_window: Duration::days(30),
            top_limit: 3,
            latest_limit: 5,
            per_category_limit: 5,
        }
    }
}

/// Use case for news articles
pub struct NewsService {
    news: Arc<dyn NewsStore>,
    images: Arc<dyn ImageStore>,
    clock: Arc<dyn Clock>,
    config: NewsConfig,
}

impl NewsService {
    pub fn new(
        news: Arc<dyn NewsStore>,
        images: Arc<dyn ImageStore>,
        clock: Arc<dyn Clock>,
        config: NewsConfig,
    ) -> Self {
        Self {
            news,
            images,
            clock,
            config,
        }
    }

    /// Upload both images and store the article
    ///
    /// Uploaded objects are removed again if a later step fails.
    pub async fn publish(
        &self,
        draft: NewsDraft,
        banner: ImageUpload,
        image: ImageUpload,
    ) -> Result<NewsArticle, ContentError> {
        let policy = &self.config.policy;
        policy.check_draft(&draft)?;
        policy.check_image(&banner)?;
        policy.check_image(&image)?;

        let now = self.clock.now();
        let banner_key = object_key(
            BANNER_FOLDER,
            draft.created_by,
            now,
            Some("banner"),
            &banner.bytes,
        );
        let image_key = object_key(
            IMAGE_FOLDER,
            draft.created_by,
            now,
            Some("image"),
            &image.bytes,
        );

        let stored_banner = self
            .images
            .put(&banner_key, &banner.content_type, &banner.bytes)
            .await?;

        let stored_image = match self
            .images
            .put(&image_key, &image.content_type, &image.bytes)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.discard(&[&stored_banner]).await;
                return Err(e.into());
            }
        };

        let record = NewsRecord {
            banner_url: stored_banner.public_url.clone(),
            image_url: stored_image.public_url.clone(),
            draft,
            created_at: now,
        };

        match self.news.create_news(&record).await {
            Ok(article) => {
                tracing::info!(
                    news_id = article.id,
                    created_by = article.created_by,
                    category = %article.category,
                    "Published news"
                );
                Ok(article)
            }
            Err(e) => {
                self.discard(&[&stored_banner, &stored_image]).await;
                Err(e.into())
            }
        }
    }

    pub async fn detail(&self, id: NewsId) -> Result<NewsDetail, ContentError> {
        self.news
            .news_detail(id)
            .await?
            .ok_or_else(|| ContentError::NotFound(format!("news {}", id)))
    }

    /// Top, latest and per-category sections of the landing page
    pub async fn home_page(&self) -> Result<HomePage, ContentError> {
        let since = self.clock.now() - self.config.top_window;

        let top = self.news.top_news(since, self.config.top_limit).await?;
        let latest = self
            .news
            .latest_news(Some(self.config.latest_limit))
            .await?;
        let latest_by_category = self
            .news
            .latest_by_category(self.config.per_category_limit)
            .await?;

        tracing::debug!(
            top = top.len(),
            latest = latest.len(),
            by_category = latest_by_category.len(),
            "Built home page"
        );

        Ok(HomePage {
            top,
            latest,
            latest_by_category,
        })
    }

    pub async fn all(&self) -> Result<Vec<NewsCard>, ContentError> {
        Ok(self.news.latest_news(None).await?)
    }

    pub async fn created_by(&self, author: UserId) -> Result<Vec<NewsCard>, ContentError> {
        Ok(self.news.news_by_author(author).await?)
    }

    pub async fn saved_by(&self, user: UserId) -> Result<Vec<NewsCard>, ContentError> {
        Ok(self.news.saved_news(user).await?)
    }

    pub async fn save(&self, user: UserId, news: NewsId) -> Result<(), ContentError> {
        self.news.save_news(user, news).await?;
        tracing::info!(uid = user, news_id = news, "Saved news");
        Ok(())
    }

    pub async fn unsave(&self, user: UserId, news: NewsId) -> Result<(), ContentError> {
        if !self.news.unsave_news(user, news).await? {
            return Err(ContentError::NotFound(format!(
                "saved news {} for user {}",
                news, user
            )));
        }
        tracing::info!(uid = user, news_id = news, "Unsaved news");
        Ok(())
    }

    /// Delete an article along with its comments, votes, bookmarks and images
    pub async fn delete(&self, id: NewsId) -> Result<NewsArticle, ContentError> {
        let article = self
            .news
            .delete_news(id)
            .await?
            .ok_or_else(|| ContentError::NotFound(format!("news {}", id)))?;

        for url in [&article.banner_url, &article.image_url] {
            let Some(key) = self.images.key_for_url(url) else {
                continue;
            };
            if let Err(e) = self.images.delete(&key).await {
                tracing::warn!(key = %key, error = %e, "Failed to remove news image");
            }
        }

        tracing::info!(news_id = id, "Deleted news");
        Ok(article)
    }

    async fn discard(&self, objects: &[&StoredImage]) {
        for object in objects {
            if let Err(e) = self.images.delete(&object.key).await {
                tracing::warn!(key = %object.key, error = %e, "Failed to remove orphaned upload");
            }
        }
    }
}
