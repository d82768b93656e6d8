use std::{fmt::Display, sync::Arc};

use axum::{
	async_trait,
	extract::{rejection::JsonRejection, FromRequestParts},
	http::{header::AUTHORIZATION, request::Parts, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use log::*;
use serde::Serialize;
use serde_json::{json, Value};

use super::Global;
use crate::{api, core::*};


/// The user that sent the request, as identified by its bearer token.
pub struct Authenticated(pub ActorId);


#[async_trait]
impl FromRequestParts<Arc<Global>> for Authenticated {
	type Rejection = Response;

	async fn from_request_parts(
		parts: &mut Parts, g: &Arc<Global>,
	) -> Result<Self, Self::Rejection> {
		let token = parts
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.map(str::trim)
			.filter(|token| !token.is_empty());
		let token = match token {
			Some(t) => t,
			None => return Err(error_response(StatusCode::UNAUTHORIZED, "Unauthorized")),
		};

		match g.verifier.verify(token) {
			Some(actor) => Ok(Self(actor)),
			None => Err(error_response(StatusCode::UNAUTHORIZED, "Invalid token")),
		}
	}
}

pub fn json_response(status: StatusCode, json: &impl Serialize) -> Response {
	(status, Json(json)).into_response()
}

/// Responds with the fields of `body`, plus `"success": true`. Bodies that
/// aren't objects are sent as is.
pub fn success_response(status: StatusCode, body: impl Serialize) -> Response {
	match serde_json::to_value(body) {
		Ok(Value::Object(mut map)) => {
			map.insert("success".to_string(), Value::Bool(true));
			json_response(status, &map)
		}
		Ok(other) => json_response(status, &other),
		Err(e) => server_error_response(e, "Unable to serialize response"),
	}
}

pub fn error_response<S>(status: StatusCode, message: S) -> Response
where
	S: Into<String>,
{
	let string: String = message.into();
	if status.is_client_error() {
		warn!("HTTP {} error: {}", status.as_u16(), &string);
	}
	json_response(status, &json!({ "success": false, "error": string }))
}

pub fn server_error_response<E>(e: E, message: &str) -> Response
where
	E: Display,
{
	error!("{}: {}", message, e);
	error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

pub fn api_error_response(e: api::Error) -> Response {
	match e {
		api::Error::Unauthorized(m) => error_response(StatusCode::UNAUTHORIZED, m),
		api::Error::InvalidInput(m) | api::Error::InvalidOperation(m) =>
			error_response(StatusCode::BAD_REQUEST, m),
		api::Error::NotFound(m) => error_response(StatusCode::NOT_FOUND, m),
		other => server_error_response(other, "Unable to handle request"),
	}
}

/// Parses the id in a path, which has to be a positive integer.
pub fn parse_id(string: &str, what: &str) -> Result<TargetId, Response> {
	string
		.parse()
		.map_err(|_| error_response(StatusCode::BAD_REQUEST, format!("Invalid {} ID", what)))
}

/// Unwraps a JSON body, or responds with 400 if it couldn't be parsed.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
	match body {
		Ok(Json(value)) => Ok(value),
		Err(e) => Err(error_response(StatusCode::BAD_REQUEST, e.body_text())),
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_id() {
		assert_eq!(parse_id("42", "post").ok(), Some(TargetId(42)));
		let response = parse_id("abc", "post").unwrap_err();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let response = parse_id("0", "post").unwrap_err();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn test_error_status() {
		let response = api_error_response(api::Error::NotFound("Post not found".into()));
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		let response = api_error_response(api::Error::InvalidOperation(
			"Cannot follow yourself".into(),
		));
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let response = api_error_response(api::Error::Database(crate::db::Error::MissingVersion));
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}
}
