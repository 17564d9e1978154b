use rocket::{
    http::Status,
    serde::json::{
        serde_json::{json, Value},
        Json,
    },
    Catcher, Request, Route,
};

mod auth;
mod candidate;
mod election;
mod feedback;
mod result;
mod vote;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(candidate::routes());
    routes.extend(election::routes());
    routes.extend(vote::routes());
    routes.extend(result::routes());
    routes.extend(feedback::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![fallback]
}

/// Give every error that bypasses the `Error` responder (guard failures,
/// unmatched routes) the same JSON body shape as handler errors.
#[catch(default)]
fn fallback(status: Status, _request: &Request) -> Json<Value> {
    Json(json!({ "error": status.reason_lossy() }))
}
