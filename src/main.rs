use std::{
	env, fmt, fs, io,
	path::{Path, PathBuf},
	process,
	sync::{atomic::AtomicBool, Arc},
};

use log::*;
use pawpicsd::{
	api::Api,
	config::{self, Config},
	db::{self, Database},
	migration::Migrations,
	web::{self, Global},
};
use signal_hook::flag;


fn config_path() -> PathBuf {
	if let Some(path) = env::var_os("PAWPICS_CONFIG") {
		return PathBuf::from(path);
	}
	let user_path = PathBuf::from(config::CONFIG_FILE_USER_PATH);
	if user_path.exists() {
		return user_path;
	}
	PathBuf::from(config::CONFIG_FILE_PATH)
}

fn initialize_logging() {
	let result = env::var_os("PAWPICS_LOG_FILE").map(|os| PathBuf::from(os));

	if let Some(filename) = result {
		if let Err(e) = simple_logging::log_to_file(&filename, LevelFilter::Debug) {
			eprintln!("Unable to log to {}: {}", filename.display(), e);
			env_logger::init();
		}
	} else {
		env_logger::init()
	}
}

fn load_config<P>(path: P) -> Option<Config>
where
	P: AsRef<Path> + fmt::Debug,
{
	let content = match fs::read_to_string(&path) {
		Err(e) => match e.kind() {
			io::ErrorKind::NotFound => {
				error!("Config file {:?} not found!", path);
				return None;
			}
			_ => {
				error!("Unable to read config file {:?}: {}", path, e);
				return None;
			}
		},
		Ok(c) => c,
	};

	match toml::from_str(&content) {
		Err(e) => {
			error!("Unable to parse config file {:?}: {}", path, e);
			None
		}
		Ok(c) => Some(c),
	}
}

async fn load_database(config: &Config) -> io::Result<Database> {
	// If the path doesn't exist yet, create it
	let db_path = PathBuf::from(&config.database_path);
	if let Some(parent) = db_path.parent() {
		if !parent.as_os_str().is_empty() {
			tokio::fs::create_dir_all(parent).await?;
		}
	}

	let max_connections = config
		.database_max_connections
		.unwrap_or(db::DEFAULT_MAX_CONNECTIONS);
	let db = Database::load(db_path, max_connections)
		.await
		.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
	Ok(db)
}

#[tokio::main]
async fn main() {
	initialize_logging();

	// Load config
	let config_path = config_path();
	let mut config = match load_config(&config_path) {
		Some(c) => c,
		None => process::exit(1),
	};
	if let Ok(secret) = env::var("JWT_SECRET") {
		if !secret.is_empty() {
			config.jwt_secret = secret;
		}
	}
	if config.jwt_secret.is_empty() {
		error!("No JWT secret configured, set `jwt_secret` or JWT_SECRET.");
		process::exit(1);
	}

	// Catch signals
	let stop_flag = Arc::new(AtomicBool::new(false));
	for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
		if let Err(e) = flag::register(signal, stop_flag.clone()) {
			error!("Unable to register signal handler: {}", e);
			process::exit(1);
		}
	}

	// Load database
	let db = match load_database(&config).await {
		Ok(db) => db,
		Err(e) => {
			error!("Unable to load database: {}", e);
			process::exit(1);
		}
	};

	// Run migrations (does nothing if there is nothing to migrate)
	if let Err(e) = Migrations::load().run(&db).await {
		error!("Unable to migrate database: {}", e);
		process::exit(1);
	}

	let api = Api::new(db, &config);
	let global = Arc::new(Global::new(config, api.clone()));

	// Run the web server, until it exits because of a signal
	if let Err(e) = web::serve(stop_flag, global).await {
		error!("Web server failed: {}", e);
	}

	info!("Exiting pawpicsd...");
	api.close().await;
	info!("Done.");
}
