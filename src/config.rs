use chrono::Duration;
use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::common::TransitionPolicy;
use crate::seed::{ensure_admin_exists, seed_demo_data};
use crate::store::{MemoryStore, MongoStore, StoreHandle};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // secrets
    pub(crate) jwt_secret: String,
    // non-secrets
    auth_ttl: u32,
    #[serde(default)]
    strict_transitions: bool,
    #[serde(default)]
    seed_demo_data: bool,
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// How election status changes are checked.
    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }

    /// Whether to populate an empty store with sample voters and an election.
    pub fn seed_demo_data(&self) -> bool {
        self.seed_demo_data
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if config.strict_transitions {
            info!("Strict election status transitions enabled");
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    #[serde(default)]
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

fn default_db_name() -> String {
    "evote".to_string()
}

/// A fairing that opens the store, seeds it, and places a [`StoreHandle`]
/// into managed state.
///
/// With a `db_uri` the store is MongoDB; without one, everything lives in
/// memory and is lost on shutdown. Must be attached after [`ConfigFairing`].
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let seed_demo = match rocket.state::<Config>() {
            Some(app_config) => app_config.seed_demo_data(),
            None => {
                error!("Application config must be loaded before the store");
                return Err(rocket);
            }
        };

        // Open the store.
        let store = match config.db_uri {
            Some(uri) => {
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        StoreHandle::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured, using an in-memory store");
                StoreHandle::new(MemoryStore::new())
            }
        };

        // Ensure there is at least one admin, and sample data if asked for.
        if let Err(e) = ensure_admin_exists(&store).await {
            error!("Failed to seed the store: {e}");
            return Err(rocket);
        }
        if seed_demo {
            if let Err(e) = seed_demo_data(&store).await {
                error!("Failed to seed the store: {e}");
                return Err(rocket);
            }
        }

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}
