use crate::server::{Result, ServerRouter, json::Json};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::sentiment::{Assessment, AssessmentRequest, analyze_and_rephrase};
use validator::Validate;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(assess)
}

#[derive(TypedPath)]
#[typed_path("/api/sentiment")]
struct SentimentPath;

/// Lets clients preview the comment gate.
async fn assess(_: SentimentPath, Json(request): Json<AssessmentRequest>) -> Result<Json<Assessment>> {
    request.validate()?;

    Ok(Json(analyze_and_rephrase(&request.text)))
}
