//! Bearer tokens and password hashes.

use std::fmt;

use argon2::{
	password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use log::*;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::ActorId;


/// Resolves a bearer token to the user it was issued for.
pub trait AuthVerifier: Send + Sync {
	/// Returns `None` for tokens that are malformed, expired or not signed by
	/// us.
	fn verify(&self, token: &str) -> Option<ActorId>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
	#[serde(rename = "userId")]
	pub user_id: i64,
	pub email: String,
	pub iat: i64,
	pub exp: i64,
}

/// Issues and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct JwtAuth {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
	expire_secs: i64,
}

#[derive(Debug, Error)]
pub enum Error {
	Token(jsonwebtoken::errors::Error),
	PasswordHash(argon2::password_hash::Error),
}

pub type Result<T> = std::result::Result<T, self::Error>;


impl JwtAuth {
	pub fn new(secret: &str, expire_secs: i64) -> Self {
		Self {
			encoding_key: EncodingKey::from_secret(secret.as_bytes()),
			decoding_key: DecodingKey::from_secret(secret.as_bytes()),
			validation: Validation::default(),
			expire_secs,
		}
	}

	pub fn issue(&self, user_id: i64, email: &str) -> Result<String> {
		let now = Utc::now().timestamp();
		let claims = Claims {
			user_id,
			email: email.to_string(),
			iat: now,
			exp: now + self.expire_secs,
		};
		Ok(jsonwebtoken::encode(
			&Header::default(),
			&claims,
			&self.encoding_key,
		)?)
	}

	pub fn decode(&self, token: &str) -> Result<Claims> {
		let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
		Ok(data.claims)
	}
}

impl AuthVerifier for JwtAuth {
	fn verify(&self, token: &str) -> Option<ActorId> {
		match self.decode(token) {
			Ok(claims) => Some(ActorId(claims.user_id)),
			Err(e) => {
				debug!("Rejected bearer token: {}", e);
				None
			}
		}
	}
}

pub fn hash_password(password: &str) -> Result<String> {
	let salt = SaltString::generate(&mut OsRng);
	let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
	Ok(hash.to_string())
}

/// Checks a password against a stored hash. A stored hash that can't be
/// parsed never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
	match PasswordHash::new(hash) {
		Ok(parsed) => Argon2::default()
			.verify_password(password.as_bytes(), &parsed)
			.is_ok(),
		Err(e) => {
			warn!("Unable to parse stored password hash: {}", e);
			false
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Token(e) => write!(f, "token error: {}", e),
			Self::PasswordHash(e) => write!(f, "password hash error: {}", e),
		}
	}
}

impl From<jsonwebtoken::errors::Error> for Error {
	fn from(other: jsonwebtoken::errors::Error) -> Self { Self::Token(other) }
}

impl From<argon2::password_hash::Error> for Error {
	fn from(other: argon2::password_hash::Error) -> Self { Self::PasswordHash(other) }
}


#[cfg(test)]
mod tests {
	use super::*;

	const SECRET: &str = "test-secret";

	#[test]
	fn test_issue_and_verify() {
		let auth = JwtAuth::new(SECRET, 3600);
		let token = auth.issue(5, "rex@example.com").unwrap();
		let claims = auth.decode(&token).unwrap();
		assert_eq!(claims.user_id, 5);
		assert_eq!(claims.email, "rex@example.com");
		assert_eq!(auth.verify(&token), Some(ActorId(5)));
	}

	#[test]
	fn test_claims_use_user_id_key() {
		let claims = Claims {
			user_id: 7,
			email: "polly@example.com".into(),
			iat: 0,
			exp: 1,
		};
		let json = serde_json::to_value(&claims).unwrap();
		assert_eq!(json["userId"], 7);
	}

	#[test]
	fn test_invalid_token_rejected() {
		let auth = JwtAuth::new(SECRET, 3600);
		assert_eq!(auth.verify("invalid.token.here"), None);
		assert_eq!(auth.verify(""), None);
	}

	#[test]
	fn test_wrong_secret_rejected() {
		let issuer = JwtAuth::new("secret-a", 3600);
		let verifier = JwtAuth::new("secret-b", 3600);
		let token = issuer.issue(1, "rex@example.com").unwrap();
		assert_eq!(verifier.verify(&token), None);
	}

	#[test]
	fn test_expired_token_rejected() {
		// Past the default leeway of a minute
		let auth = JwtAuth::new(SECRET, -120);
		let token = auth.issue(1, "rex@example.com").unwrap();
		assert_eq!(auth.verify(&token), None);
	}

	#[test]
	fn test_password_hash() {
		let hash = hash_password("correct horse").unwrap();
		assert_ne!(hash, "correct horse");
		assert!(verify_password("correct horse", &hash));
		assert!(!verify_password("battery staple", &hash));
		assert!(!verify_password("correct horse", "not-a-hash"));
	}
}
