use crate::model::{comment::COMMENT_TEXT_MAX_LEN, post::POST_TITLE_MAX_LEN};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

/// One human readable validation failure.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub struct FieldMessage {
    pub field: String,
    pub message: String,
}

/// Flattens validation errors into a list ordered by field name.
#[must_use]
pub fn field_messages(errors: &ValidationErrors) -> Vec<FieldMessage> {
    let mut messages: Vec<FieldMessage> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| FieldMessage {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map_or_else(|| format!("Invalid {field}"), ToString::to_string),
            })
        })
        .collect();

    messages.sort();
    messages
}

fn fits(
    value: &str,
    max_len: usize,
    code: &'static str,
    message: &'static str,
) -> Result<(), ValidationError> {
    if value.chars().count() <= max_len {
        Ok(())
    } else {
        Err(ValidationError::new(code).with_message(Cow::Borrowed(message)))
    }
}

pub fn post_title_fits(title: &str) -> Result<(), ValidationError> {
    fits(
        title,
        POST_TITLE_MAX_LEN,
        "title_too_long",
        "Title must be at most 300 characters",
    )
}

pub fn comment_text_fits(text: &str) -> Result<(), ValidationError> {
    fits(
        text,
        COMMENT_TEXT_MAX_LEN,
        "comment_too_long",
        "Comment must be at most 1000 characters",
    )
}
