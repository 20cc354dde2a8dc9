use crate::model::{
    Id,
    comment::Comment,
    user::{UserMarker, UserSummary},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

pub const POST_TITLE_MAX_LEN: usize = 300;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", alias = "id")]
    pub id: Id<PostMarker>,
    pub title: String,
    pub body: String,
    pub author: UserSummary,
    pub likes: Vec<Id<UserMarker>>,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Validate)]
#[serde(default)]
pub struct PostContent {
    #[validate(
        length(min = 2, message = "Title is required"),
        custom(function = "crate::model::validation::post_title_fits")
    )]
    pub title: String,
    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,
}

/// Partial update of a post. Absent fields keep their stored value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Validate)]
#[serde(default)]
pub struct PostPatch {
    #[validate(
        length(min = 2, message = "Title is required"),
        custom(function = "crate::model::validation::post_title_fits")
    )]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Body is required"))]
    pub body: Option<String>,
}

/// Outcome of toggling a like.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    /// Reads raw query values leniently: only a leading integer counts
    /// (`"3abc"` is 3, `"2.5"` is 2), values without one or equal to zero
    /// fall back to the defaults, everything else is clamped into range.
    #[must_use]
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        fn lenient(value: Option<&str>) -> Option<i64> {
            value
                .and_then(leading_integer)
                .filter(|value| *value != 0)
        }

        let page = lenient(page).unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let limit = lenient(limit)
            .unwrap_or(i64::from(DEFAULT_PAGE_LIMIT))
            .clamp(1, i64::from(MAX_PAGE_LIMIT));

        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: u32::try_from(limit).unwrap_or(MAX_PAGE_LIMIT),
        }
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// The optionally signed integer at the start of `value`, after leading
/// whitespace. Saturates instead of overflowing.
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let digits: String = digits.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub meta: PageMeta,
}
