use serde::*;


/// The file path of the system-wide configuration file
#[cfg(target_family = "unix")]
pub const CONFIG_FILE_PATH: &str = "/etc/pawpics/config.toml";
#[cfg(target_family = "windows")]
pub const CONFIG_FILE_PATH: &str = "C:\\Program Files\\pawpics\\config.toml";
/// A configuration file in the working directory takes precedence over the
/// system-wide one.
pub const CONFIG_FILE_USER_PATH: &str = "config.toml";

pub const DEFAULT_FEED_LIMIT: u64 = 50;
pub const DEFAULT_TOKEN_EXPIRY_DAYS: u64 = 7;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub database_path: String,
	pub database_max_connections: Option<u32>,

	pub bind_address: Option<String>,
	pub web_interface_port: Option<u16>,
	/// Seconds after which a request is abandoned.
	pub request_timeout: Option<u64>,

	/// The HMAC secret used to sign bearer tokens. Overridden by the
	/// `JWT_SECRET` environment variable.
	#[serde(default)]
	pub jwt_secret: String,
	pub token_expiry_days: Option<u64>,

	/// The maximum number of posts returned in a feed.
	pub feed_limit: Option<u64>,
}


impl Config {
	pub fn feed_limit(&self) -> u64 { self.feed_limit.unwrap_or(DEFAULT_FEED_LIMIT) }

	/// Saturates instead of overflowing for absurdly long expiry periods.
	pub fn token_expiry_secs(&self) -> i64 {
		let secs = self
			.token_expiry_days
			.unwrap_or(DEFAULT_TOKEN_EXPIRY_DAYS)
			.saturating_mul(24 * 3600);
		secs.min(i64::MAX as u64) as i64
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			database_path: String::default(),
			database_max_connections: Some(10),
			bind_address: None,
			web_interface_port: None,
			request_timeout: Some(30),
			jwt_secret: String::default(),
			token_expiry_days: None,
			feed_limit: None,
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_config() {
		let config: Config = toml::from_str(
			r#"
			database_path = "/var/lib/pawpics/db.sqlite"
			web_interface_port = 8080
			jwt_secret = "hunter2"
			feed_limit = 20
		"#,
		)
		.unwrap();
		assert_eq!(config.web_interface_port, Some(8080));
		assert_eq!(config.feed_limit(), 20);
		assert_eq!(config.token_expiry_secs(), 7 * 24 * 3600);
		assert_eq!(config.database_max_connections, None);
	}

	#[test]
	fn test_token_expiry_saturates() {
		let config = Config {
			token_expiry_days: Some(u64::MAX),
			..Config::default()
		};
		assert_eq!(config.token_expiry_secs(), i64::MAX);

		let config = Config {
			token_expiry_days: Some(1),
			..Config::default()
		};
		assert_eq!(config.token_expiry_secs(), 24 * 3600);
	}
}
