mod auth;
pub mod common;
mod post;
mod user;

use std::{
	io,
	net::*,
	sync::{atomic::*, Arc},
	time::Duration,
};

use axum::{extract::DefaultBodyLimit, Router};
use log::*;
use tokio::time::sleep;
use tower_http::timeout::TimeoutLayer;

use crate::{api::Api, auth::AuthVerifier, config::Config};


pub const DEFAULT_PORT: u16 = 3000;
/// Requests carry JSON only, media is uploaded elsewhere.
const MAX_BODY_SIZE: usize = 1_000_000;

pub struct Global {
	pub config: Config,
	pub api: Api,
	pub verifier: Arc<dyn AuthVerifier>,
}


impl Global {
	/// Verifies bearer tokens with the same key that the API signs them with.
	pub fn new(config: Config, api: Api) -> Self {
		let verifier = Arc::new(api.tokens.clone());
		Self::with_verifier(config, api, verifier)
	}

	pub fn with_verifier(config: Config, api: Api, verifier: Arc<dyn AuthVerifier>) -> Self {
		Self {
			config,
			api,
			verifier,
		}
	}
}

pub fn router(g: Arc<Global>) -> Router {
	let timeout = Duration::from_secs(g.config.request_timeout.unwrap_or(30));
	let api = Router::new()
		.nest("/auth", auth::router())
		.nest("/user", user::router())
		.nest("/posts", post::router());

	Router::new()
		.nest("/api", api)
		.layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
		.layer(TimeoutLayer::new(timeout))
		.with_state(g)
}

pub async fn serve(stop_flag: Arc<AtomicBool>, g: Arc<Global>) -> io::Result<()> {
	let ip = match &g.config.bind_address {
		None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
		Some(string) => string
			.parse()
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
	};
	let addr = SocketAddr::new(ip, g.config.web_interface_port.unwrap_or(DEFAULT_PORT));

	let app = router(g);
	let listener = tokio::net::TcpListener::bind(addr).await?;
	info!("Listening for HTTP requests on {}.", addr);
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			while !stop_flag.load(Ordering::Relaxed) {
				sleep(Duration::from_secs(1)).await;
			}
		})
		.await
}
