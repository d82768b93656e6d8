use std::sync::Arc;

use axum::{extract::*, http::StatusCode, response::Response, routing::*, Router};
use serde_json::json;

use super::{common::*, Global};


pub fn router() -> Router<Arc<Global>> {
	Router::new()
		.route("/", get(me))
		.route("/:username", get(profile))
		.route("/:username/posts", get(posts))
		.route("/:username/follow", get(follow_status).post(follow))
}


async fn me(State(g): State<Arc<Global>>, Authenticated(actor): Authenticated) -> Response {
	match g.api.load_me(actor).await {
		Ok(user) => success_response(StatusCode::OK, json!({ "user": user })),
		Err(e) => api_error_response(e),
	}
}

async fn profile(
	State(g): State<Arc<Global>>, Authenticated(_): Authenticated, Path(username): Path<String>,
) -> Response {
	match g.api.load_profile(&username).await {
		Ok(user) => success_response(StatusCode::OK, json!({ "user": user })),
		Err(e) => api_error_response(e),
	}
}

async fn posts(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated,
	Path(username): Path<String>,
) -> Response {
	match g.api.load_user_posts(actor, &username).await {
		Ok(posts) => json_response(StatusCode::OK, &posts),
		Err(e) => api_error_response(e),
	}
}

async fn follow_status(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated,
	Path(username): Path<String>,
) -> Response {
	match g.api.follow_status(actor, &username).await {
		Ok(status) => success_response(StatusCode::OK, status),
		Err(e) => api_error_response(e),
	}
}

async fn follow(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated,
	Path(username): Path<String>,
) -> Response {
	match g.api.toggle_follow(actor, &username).await {
		Ok(status) => success_response(StatusCode::OK, status),
		Err(e) => api_error_response(e),
	}
}
