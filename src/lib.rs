#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod seed;
pub mod store;
pub mod voting;

pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// A server over the given store, with test configuration and the test login route.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: store::StoreHandle) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "test jwt secret"))
        .merge(("auth_ttl", 3600))
        .merge(("strict_transitions", false))
        .merge(("log_level", "off"));
    rocket::custom(figment)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(store)
        .mount("/", api::routes())
        .mount("/test", api::testing::routes())
        .register("/", api::catchers())
}
