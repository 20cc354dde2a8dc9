use crate::model::{Id, user::UserSummary};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

pub const COMMENT_TEXT_MAX_LEN: usize = 1000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", alias = "id")]
    pub id: Id<CommentMarker>,
    pub author: UserSummary,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Validate)]
#[serde(default)]
pub struct CommentContent {
    #[validate(
        length(min = 1, message = "Comment text is required"),
        custom(function = "crate::model::validation::comment_text_fits")
    )]
    pub text: String,
}
