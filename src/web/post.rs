use std::sync::Arc;

use axum::{
	extract::{rejection::JsonRejection, *},
	http::StatusCode,
	response::Response,
	routing::*,
	Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{common::*, Global};
use crate::db::FeedType;


#[derive(Deserialize)]
struct FeedQuery {
	feed: Option<String>,
}

#[derive(Deserialize)]
struct PostForm {
	content: Option<String>,
	image: Option<String>,
	video: Option<String>,
}

#[derive(Deserialize)]
struct CommentForm {
	#[serde(default)]
	content: String,
}


pub fn router() -> Router<Arc<Global>> {
	Router::new()
		.route("/", get(feed).post(create))
		.route("/:id", get(show).delete(delete))
		.route("/:id/like", post(like))
		.route("/:id/userlike", get(user_like))
		.route("/:id/comments", get(comments).post(comment))
}


async fn feed(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated,
	Query(query): Query<FeedQuery>,
) -> Response {
	// Anything but the following feed is the global one
	let feed = match query.feed.as_deref() {
		Some("following") => FeedType::Following,
		_ => FeedType::Global,
	};

	match g.api.load_feed(actor, feed).await {
		Ok(posts) => json_response(StatusCode::OK, &posts),
		Err(e) => api_error_response(e),
	}
}

async fn create(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated,
	body: Result<Json<PostForm>, JsonRejection>,
) -> Response {
	let form = match json_body(body) {
		Ok(f) => f,
		Err(r) => return r,
	};

	match g
		.api
		.create_post(actor, form.content, form.image, form.video)
		.await
	{
		Ok(post) => success_response(StatusCode::OK, json!({ "post": post })),
		Err(e) => api_error_response(e),
	}
}

async fn show(State(g): State<Arc<Global>>, Path(id): Path<String>) -> Response {
	let id = match parse_id(&id, "post") {
		Ok(id) => id,
		Err(r) => return r,
	};

	match g.api.find_post(id).await {
		Ok(post) => success_response(StatusCode::OK, json!({ "post": post })),
		Err(e) => api_error_response(e),
	}
}

async fn delete(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated, Path(id): Path<String>,
) -> Response {
	let id = match parse_id(&id, "post") {
		Ok(id) => id,
		Err(r) => return r,
	};

	match g.api.delete_post(actor, id).await {
		Ok(()) => success_response(
			StatusCode::OK,
			json!({ "message": "Post deleted successfully" }),
		),
		Err(e) => api_error_response(e),
	}
}

async fn like(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated, Path(id): Path<String>,
) -> Response {
	let id = match parse_id(&id, "post") {
		Ok(id) => id,
		Err(r) => return r,
	};

	match g.api.toggle_like(actor, id).await {
		Ok(status) => success_response(StatusCode::OK, status),
		Err(e) => api_error_response(e),
	}
}

async fn user_like(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated, Path(id): Path<String>,
) -> Response {
	let id = match parse_id(&id, "post") {
		Ok(id) => id,
		Err(r) => return r,
	};

	match g.api.has_liked(actor, id).await {
		Ok(liked) => success_response(StatusCode::OK, json!({ "liked": liked })),
		Err(e) => api_error_response(e),
	}
}

async fn comments(State(g): State<Arc<Global>>, Path(id): Path<String>) -> Response {
	let id = match parse_id(&id, "post") {
		Ok(id) => id,
		Err(r) => return r,
	};

	match g.api.load_comments(id).await {
		Ok(comments) => success_response(StatusCode::OK, json!({ "comments": comments })),
		Err(e) => api_error_response(e),
	}
}

async fn comment(
	State(g): State<Arc<Global>>, Authenticated(actor): Authenticated, Path(id): Path<String>,
	body: Result<Json<CommentForm>, JsonRejection>,
) -> Response {
	let id = match parse_id(&id, "post") {
		Ok(id) => id,
		Err(r) => return r,
	};
	let form = match json_body(body) {
		Ok(f) => f,
		Err(r) => return r,
	};

	match g.api.add_comment(actor, id, &form.content).await {
		Ok(comment) => success_response(StatusCode::OK, json!({ "comment": comment })),
		Err(e) => api_error_response(e),
	}
}
