use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            election::{ElectionDetails, ElectionSpec, ToggleRequest},
        },
        db::{
            election::{Election, ElectionCore, NewElection},
            vote::Ballot,
            Candidate,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_election, toggle_election, get_elections, delete_election]
}

#[post("/election", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken,
    spec: Json<ElectionSpec>,
    new_elections: Coll<NewElection>,
    elections: Coll<Election>,
) -> Result<(Status, Json<ElectionResponse>)> {
    token.require_admin()?;

    let spec = spec.into_inner();
    if spec.title.is_empty() {
        return Err(Error::bad_request("Election title is required"));
    }

    let election = ElectionCore::new(spec.title, spec.description);
    let new_id: Id = new_elections
        .insert_one(&election, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the database.
        .into();

    // Retrieve the full election information including ID.
    let election = elections.find_one(new_id.as_doc(), None).await?.unwrap();

    Ok((
        Status::Created,
        Json(ElectionResponse {
            message: "Election created".to_string(),
            election: election.into(),
        }),
    ))
}

#[put("/election/toggle", data = "<request>", format = "json")]
async fn toggle_election(
    token: AuthToken,
    request: Json<ToggleRequest>,
    elections: Coll<Election>,
) -> Result<Json<ElectionResponse>> {
    token.require_admin()?;

    let election_id: Id = request.election_id.parse()?;
    let update = doc! {
        "$set": {
            "is_open": request.is_open,
        }
    };
    let result = elections
        .update_one(election_id.as_doc(), update, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Election {election_id}")));
    }

    let election = elections
        .find_one(election_id.as_doc(), None)
        .await?
        .unwrap(); // Presence already checked.

    Ok(Json(ElectionResponse {
        message: format!(
            "Election {}",
            if election.is_open { "opened" } else { "closed" }
        ),
        election: election.into(),
    }))
}

#[get("/election")]
async fn get_elections(
    _token: AuthToken,
    elections: Coll<Election>,
) -> Result<Json<ElectionListResponse>> {
    let newest_first = FindOptions::builder().sort(doc! {"created_at": -1}).build();
    let elections: Vec<Election> = elections
        .find(None, newest_first)
        .await?
        .try_collect()
        .await?;

    if elections.is_empty() {
        return Err(Error::not_found("Elections"));
    }

    Ok(Json(ElectionListResponse {
        message: "Elections retrieved successfully".to_string(),
        count: elections.len(),
        elections: elections.into_iter().map(Into::into).collect(),
    }))
}

#[delete("/election/<id>")]
async fn delete_election(
    token: AuthToken,
    id: String,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    db_client: &State<Client>,
) -> Result<Json<ElectionResponse>> {
    token.require_admin()?;

    let election_id: Id = id.parse()?;
    let election = elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;

    // Atomically delete the election and all associated data.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = elections
            .delete_one_with_session(election_id.as_doc(), None, &mut session)
            .await?;
        assert_eq!(result.deleted_count, 1);

        let filter = doc! {
            "election_id": election_id,
        };
        candidates
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        ballots
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    Ok(Json(ElectionResponse {
        message: "Election deleted".to_string(),
        election: election.into(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionResponse {
    pub message: String,
    pub election: ElectionDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionListResponse {
    pub message: String,
    pub count: usize,
    pub elections: Vec<ElectionDetails>,
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use crate::model::{api::auth::BearerToken, db::candidate::NewCandidate, db::vote::NewBallot};

    use super::*;

    #[backend_test(admin)]
    async fn create_and_list(client: Client, token: BearerToken, elections: Coll<Election>) {
        let response = client
            .post("/api/election")
            .header(ContentType::JSON)
            .header(token.header())
            .body(
                json!({
                    "title": "Student Union President 2026",
                    "description": "Annual election",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        let body: ElectionResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(body.election.is_open);
        assert!(body.election.candidates.is_empty());

        // Ensure it is present in the DB.
        let inserted = elections
            .find_one(doc! { "title": "Student Union President 2026" }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(inserted.is_open);

        // And listed.
        let response = client
            .get("/api/election")
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: ElectionListResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(1, body.count);
        assert_eq!(inserted.id.to_string(), body.elections[0].id);
    }

    #[backend_test(voter)]
    async fn create_requires_admin(client: Client, token: BearerToken, elections: Coll<Election>) {
        let response = client
            .post("/api/election")
            .header(ContentType::JSON)
            .header(token.header())
            .body(json!({ "title": "Sneaky Election" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let count = elections.count_documents(None, None).await.unwrap();
        assert_eq!(0, count);
    }

    #[backend_test(admin)]
    async fn list_empty_is_not_found(client: Client, token: BearerToken) {
        let response = client
            .get("/api/election")
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn toggle(
        client: Client,
        token: BearerToken,
        new_elections: Coll<NewElection>,
        elections: Coll<Election>,
    ) {
        let id = new_elections
            .insert_one(ElectionCore::example(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap();

        // Close it.
        let response = client
            .put("/api/election/toggle")
            .header(ContentType::JSON)
            .header(token.header())
            .body(
                json!({
                    "electionId": id.to_hex(),
                    "isOpen": false,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: ElectionResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!("Election closed", body.message);

        let election = elections
            .find_one(doc! { "_id": id }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(!election.is_open);

        // And open it again.
        let response = client
            .put("/api/election/toggle")
            .header(ContentType::JSON)
            .header(token.header())
            .body(
                json!({
                    "electionId": id.to_hex(),
                    "isOpen": true,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: ElectionResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!("Election opened", body.message);
    }

    #[backend_test(admin)]
    async fn toggle_unknown_election(client: Client, token: BearerToken) {
        let response = client
            .put("/api/election/toggle")
            .header(ContentType::JSON)
            .header(token.header())
            .body(
                json!({
                    "electionId": Id::new().to_string(),
                    "isOpen": false,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn delete_cascades(
        client: Client,
        db: Database,
        token: BearerToken,
        new_elections: Coll<NewElection>,
    ) {
        let election_id: Id = new_elections
            .insert_one(ElectionCore::example(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        // Give it a candidate and a ballot.
        let candidate_id: Id = Coll::<NewCandidate>::from_db(&db)
            .insert_one(NewCandidate::example(election_id), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();
        Coll::<NewBallot>::from_db(&db)
            .insert_one(NewBallot::new(Id::new(), candidate_id, election_id), None)
            .await
            .unwrap();

        let response = client
            .delete(format!("/api/election/{election_id}"))
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Election, candidates, and ballots are all gone.
        let elections = Coll::<Election>::from_db(&db);
        assert!(elections
            .find_one(election_id.as_doc(), None)
            .await
            .unwrap()
            .is_none());
        let candidates = Coll::<Candidate>::from_db(&db);
        assert_eq!(
            0,
            candidates
                .count_documents(doc! { "election_id": election_id }, None)
                .await
                .unwrap()
        );
        let ballots = Coll::<Ballot>::from_db(&db);
        assert_eq!(
            0,
            ballots
                .count_documents(doc! { "election_id": election_id }, None)
                .await
                .unwrap()
        );
    }

    #[backend_test(voter)]
    async fn delete_requires_admin(
        client: Client,
        token: BearerToken,
        new_elections: Coll<NewElection>,
    ) {
        let id = new_elections
            .insert_one(ElectionCore::example(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap();

        let response = client
            .delete(format!("/api/election/{}", id.to_hex()))
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }
}
