#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod observer;

pub use config::Config;

use observer::VoteNotifier;

/// Assemble the server: routes under `/api`, JSON error catchers, config and
/// database fairings, request logging, and the vote notifier state.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/api", api::routes())
        .register("/", api::catchers())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(logging::LoggerFairing)
        .manage(VoteNotifier::with_default_observers())
}

/// Get a database client for the configured URI (test version).
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::build()
        .figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to database")
}

/// Get a fresh random database name (test version).
#[cfg(test)]
pub(crate) fn database() -> String {
    format!("test{}", rand::random::<u32>())
}

/// Assemble a server against an existing client and database name, skipping
/// the database fairing so tests control which database is used.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes");
    rocket::build()
        .mount("/api", api::routes())
        .register("/", api::catchers())
        .attach(config::ConfigFairing)
        .attach(logging::LoggerFairing)
        .manage(client)
        .manage(db)
        .manage(VoteNotifier::with_default_observers())
}
