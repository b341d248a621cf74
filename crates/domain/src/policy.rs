//! Input constraints for user-submitted content

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::model::{ImageUpload, NewAccount, NewComment, NewsDraft};

/// Maximum length of an article title
pub const MAX_TITLE_CHARS: usize = 255;
/// Maximum length of an article summary
pub const MAX_SUMMARY_CHARS: usize = 255;
/// Maximum length of a comment body
pub const MAX_COMMENT_CHARS: usize = 1000;
/// Minimum password length
pub const MIN_PASSWORD_CHARS: usize = 8;
/// Default upload size limit (5 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A rejected input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} is too long: {len} > {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("not an image file: {content_type}")]
    NotAnImage { content_type: String },
    #[error("image is too large: {len} > {max} bytes")]
    ImageTooLarge { len: usize, max: usize },
    #[error("image is empty")]
    EmptyImage,
}

/// Validator for submitted content
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    max_image_bytes: usize,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ContentPolicy {
    pub fn new(max_image_bytes: usize) -> Self {
        Self { max_image_bytes }
    }

    pub fn check_account(&self, account: &NewAccount) -> Result<(), PolicyViolation> {
        require("username", &account.username)?;
        require("email", &account.email)?;
        if !email_pattern().is_match(account.email.trim()) {
            return Err(PolicyViolation::InvalidEmail(account.email.clone()));
        }
        self.check_password(&account.password)
    }

    pub fn check_password(&self, password: &str) -> Result<(), PolicyViolation> {
        require("password", password)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(PolicyViolation::PasswordTooShort {
                min: MIN_PASSWORD_CHARS,
            });
        }
        Ok(())
    }

    pub fn check_draft(&self, draft: &NewsDraft) -> Result<(), PolicyViolation> {
        require("title", &draft.title)?;
        limit("title", &draft.title, MAX_TITLE_CHARS)?;
        require("category", &draft.category)?;
        require("content", &draft.content)?;
        require("summary", &draft.summary)?;
        limit("summary", &draft.summary, MAX_SUMMARY_CHARS)
    }

    pub fn check_comment(&self, comment: &NewComment) -> Result<(), PolicyViolation> {
        require("comment", &comment.body)?;
        limit("comment", &comment.body, MAX_COMMENT_CHARS)
    }

    /// Only `image/*` uploads within the size limit are accepted
    pub fn check_image(&self, image: &ImageUpload) -> Result<(), PolicyViolation> {
        if !image.content_type.starts_with("image/") {
            return Err(PolicyViolation::NotAnImage {
                content_type: image.content_type.clone(),
            });
        }
        if image.bytes.is_empty() {
            return Err(PolicyViolation::EmptyImage);
        }
        if image.bytes.len() > self.max_image_bytes {
            return Err(PolicyViolation::ImageTooLarge {
                len: image.bytes.len(),
                max: self.max_image_bytes,
            });
        }
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), PolicyViolation> {
    if value.trim().is_empty() {
        Err(PolicyViolation::Missing { field })
    } else {
        Ok(())
    }
}

fn limit(field: &'static str, value: &str, max: usize) -> Result<(), PolicyViolation> {
    let len = value.chars().count();
    if len > max {
        Err(PolicyViolation::TooLong { field, len, max })
    } else {
        Ok(())
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewsDraft {
        NewsDraft {
            created_by: 1,
            title: "Floods in the valley".to_string(),
            category: "local".to_string(),
            content: "Body".to_string(),
            summary: "Short".to_string(),
        }
    }

    #[test]
    fn test_rejects_long_title() {
        let mut d = draft();
        d.title = "x".repeat(MAX_TITLE_CHARS + 1);
        let err = ContentPolicy::default().check_draft(&d).unwrap_err();
        assert!(matches!(err, PolicyViolation::TooLong { field: "title", .. }));
    }

    #[test]
    fn test_accepts_valid_draft() {
        assert!(ContentPolicy::default().check_draft(&draft()).is_ok());
    }

    #[test]
    fn test_rejects_blank_summary() {
        let mut d = draft();
        d.summary = "   ".to_string();
        assert_eq!(
            ContentPolicy::default().check_draft(&d),
            Err(PolicyViolation::Missing { field: "summary" })
        );
    }

    #[test]
    fn test_comment_length_limit() {
        let policy = ContentPolicy::default();
        let mut comment = NewComment {
            author_id: 1,
            news_id: 1,
            body: "x".repeat(MAX_COMMENT_CHARS),
        };
        assert!(policy.check_comment(&comment).is_ok());

        comment.body.push('x');
        assert!(policy.check_comment(&comment).is_err());
    }

    #[test]
    fn test_account_checks() {
        let policy = ContentPolicy::default();
        let mut account = NewAccount {
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(policy.check_account(&account).is_ok());

        account.password = "short".to_string();
        assert_eq!(
            policy.check_account(&account),
            Err(PolicyViolation::PasswordTooShort { min: 8 })
        );

        account.password = "long enough".to_string();
        account.email = "not-an-email".to_string();
        assert!(matches!(
            policy.check_account(&account),
            Err(PolicyViolation::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_image_checks() {
        let policy = ContentPolicy::new(4);

        let pdf = ImageUpload {
            content_type: "application/pdf".to_string(),
            bytes: vec![1],
        };
        assert!(matches!(
            policy.check_image(&pdf),
            Err(PolicyViolation::NotAnImage { .. })
        ));

        let big = ImageUpload {
            content_type: "image/png".to_string(),
            bytes: vec![0; 5],
        };
        assert_eq!(
            policy.check_image(&big),
            Err(PolicyViolation::ImageTooLarge { len: 5, max: 4 })
        );

        let ok = ImageUpload {
            content_type: "image/png".to_string(),
            bytes: vec![0; 4],
        };
        assert!(policy.check_image(&ok).is_ok());
    }
}
