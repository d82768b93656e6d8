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


#[derive(Deserialize)]
struct SignUpForm {
	#[serde(default)]
	email: String,
	#[serde(default)]
	username: String,
	#[serde(default)]
	password: String,
	name: Option<String>,
}

#[derive(Deserialize)]
struct SignInForm {
	/// Either the email address or the username.
	#[serde(default, alias = "login", alias = "username")]
	email: String,
	#[serde(default)]
	password: String,
}


pub fn router() -> Router<Arc<Global>> {
	Router::new()
		.route("/signup", post(sign_up))
		.route("/signin", post(sign_in))
}


async fn sign_up(
	State(g): State<Arc<Global>>, body: Result<Json<SignUpForm>, JsonRejection>,
) -> Response {
	let form = match json_body(body) {
		Ok(f) => f,
		Err(r) => return r,
	};

	match g
		.api
		.sign_up(
			&form.email,
			&form.username,
			&form.password,
			form.name.as_deref(),
		)
		.await
	{
		Ok(user) => success_response(
			StatusCode::CREATED,
			json!({ "user": user, "message": "User created successfully" }),
		),
		Err(e) => api_error_response(e),
	}
}

async fn sign_in(
	State(g): State<Arc<Global>>, body: Result<Json<SignInForm>, JsonRejection>,
) -> Response {
	let form = match json_body(body) {
		Ok(f) => f,
		Err(r) => return r,
	};

	match g.api.sign_in(&form.email, &form.password).await {
		Ok((token, user)) => success_response(StatusCode::OK, json!({ "token": token, "user": user })),
		Err(e) => api_error_response(e),
	}
}
