use crate::server::ServerError;
use axum::extract::{FromRequestParts, Query as AxumQuery};

/// Query string extractor that reports failures as [`ServerError`].
#[derive(FromRequestParts, Debug, Clone, Copy, Default)]
#[from_request(via(AxumQuery), rejection(ServerError))]
pub struct Query<T>(pub T);
