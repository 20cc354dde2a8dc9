use crate::server::ServerRouter;

mod auth;
mod comments;
mod posts;
mod sentiment;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(auth::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(sentiment::routes())
}
