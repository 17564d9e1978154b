use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            candidate::{CandidateDetails, CandidateSpec, CandidateUpdate},
            pagination::{Paginated, Pagination},
        },
        common::{CandidateStatus, Role},
        db::{
            candidate::{Candidate, CandidateCore, NewCandidate},
            election::Election,
            vote::Ballot,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_candidate,
        get_candidates,
        get_candidate,
        update_candidate,
        delete_candidate,
    ]
}

#[post("/candidate", data = "<spec>", format = "json")]
async fn create_candidate(
    token: AuthToken,
    spec: Json<CandidateSpec>,
    new_candidates: Coll<NewCandidate>,
    candidates: Coll<Candidate>,
    elections: Coll<Election>,
    db_client: &State<Client>,
) -> Result<(Status, Json<CandidateResponse>)> {
    token.require_admin()?;

    let spec = spec.into_inner();
    if spec.name.is_empty() || spec.position.is_empty() {
        return Err(Error::bad_request("Candidate name and position are required"));
    }

    let election_id: Id = spec.election_id.parse()?;
    let election = elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    if !election.is_open {
        return Err(Error::conflict(
            "Cannot add candidate to a closed election",
        ));
    }

    let candidate = CandidateCore::new(
        spec.name,
        spec.position,
        spec.manifesto,
        spec.photo_url,
        election_id,
    );

    // Insert the candidate and attach it to the election's candidate list
    // in one step, so neither side can observe the other missing.
    let new_id: Id = {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let new_id: Id = new_candidates
            .insert_one_with_session(&candidate, None, &mut session)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the database.
            .into();

        let push_candidate = doc! {
            "$push": {
                "candidates": new_id,
            }
        };
        elections
            .update_one_with_session(election_id.as_doc(), push_candidate, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        new_id
    };

    let candidate = candidates.find_one(new_id.as_doc(), None).await?.unwrap();

    Ok((
        Status::Created,
        Json(CandidateResponse {
            message: "Candidate added successfully".to_string(),
            candidate: candidate.into(),
        }),
    ))
}

/// Search filters for candidate listing.
#[derive(Debug, FromForm)]
struct CandidateQuery {
    /// Case-insensitive search over name and position.
    q: Option<String>,
    /// Status filter; only admins may use it.
    status: Option<CandidateStatus>,
    #[field(name = "electionId")]
    election_id: Option<String>,
}

#[get("/candidate?<query..>")]
async fn get_candidates(
    token: AuthToken,
    query: CandidateQuery,
    pagination: Pagination,
    candidates: Coll<Candidate>,
) -> Result<Json<Paginated<CandidateDetails>>> {
    let mut filter = doc! {};

    if let Some(election_id) = &query.election_id {
        filter.insert("election_id", election_id.parse::<Id>()?);
    }

    // Voters only see active candidates; admins may filter freely.
    match token.role {
        Role::Voter => {
            filter.insert("status", CandidateStatus::Active);
        }
        Role::Admin => {
            if let Some(status) = query.status {
                filter.insert("status", status);
            }
        }
    }

    if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
        let pattern = doc! { "$regex": q, "$options": "i" };
        filter.insert(
            "$or",
            vec![
                doc! { "name": pattern.clone() },
                doc! { "position": pattern },
            ],
        );
    }

    let options = FindOptions::builder()
        .sort(doc! {"created_at": -1})
        .skip(pagination.skip())
        .limit(i64::from(pagination.limit()))
        .build();
    let page: Vec<Candidate> = candidates
        .find(filter.clone(), options)
        .await?
        .try_collect()
        .await?;
    let total = candidates.count_documents(filter, None).await?;

    let items = page.into_iter().map(Into::into).collect();
    Ok(Json(pagination.paginate(total, items)))
}

#[get("/candidate/<id>")]
async fn get_candidate(
    token: AuthToken,
    id: String,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDetails>> {
    let candidate_id: Id = id.parse()?;
    let candidate = candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;

    // Withdrawn candidates stay visible to admins only.
    if !token.role.is_admin() && candidate.status != CandidateStatus::Active {
        return Err(Error::forbidden("Not authorized to view this candidate"));
    }

    Ok(Json(candidate.into()))
}

#[put("/candidate/<id>", data = "<update>", format = "json")]
async fn update_candidate(
    token: AuthToken,
    id: String,
    update: Json<CandidateUpdate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateResponse>> {
    token.require_admin()?;

    let candidate_id: Id = id.parse()?;
    let update = update.into_inner();

    let mut fields = doc! {};
    if let Some(name) = update.name {
        fields.insert("name", name);
    }
    if let Some(position) = update.position {
        fields.insert("position", position);
    }
    if let Some(manifesto) = update.manifesto {
        fields.insert("manifesto", manifesto);
    }
    if let Some(photo_url) = update.photo_url {
        fields.insert("photo_url", photo_url);
    }
    if let Some(status) = update.status {
        fields.insert("status", status);
    }
    if fields.is_empty() {
        return Err(Error::bad_request("No fields to update"));
    }

    let result = candidates
        .update_one(candidate_id.as_doc(), doc! { "$set": fields }, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Candidate {candidate_id}")));
    }

    let candidate = candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .unwrap(); // Presence already checked.

    Ok(Json(CandidateResponse {
        message: "Candidate updated successfully".to_string(),
        candidate: candidate.into(),
    }))
}

#[delete("/candidate/<id>")]
async fn delete_candidate(
    token: AuthToken,
    id: String,
    candidates: Coll<Candidate>,
    elections: Coll<Election>,
    ballots: Coll<Ballot>,
    db_client: &State<Client>,
) -> Result<Json<CandidateResponse>> {
    token.require_admin()?;

    let candidate_id: Id = id.parse()?;
    let candidate = candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;

    // Atomically delete the candidate, detach it from its election, and
    // remove any ballots that reference it.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = candidates
            .delete_one_with_session(candidate_id.as_doc(), None, &mut session)
            .await?;
        assert_eq!(result.deleted_count, 1);

        let pull_candidate = doc! {
            "$pull": {
                "candidates": candidate_id,
            }
        };
        elections
            .update_one_with_session(
                candidate.election_id.as_doc(),
                pull_candidate,
                None,
                &mut session,
            )
            .await?;

        let with_candidate = doc! {
            "candidate_id": candidate_id,
        };
        ballots
            .delete_many_with_session(with_candidate, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    Ok(Json(CandidateResponse {
        message: "Candidate deleted".to_string(),
        candidate: candidate.into(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub message: String,
    pub candidate: CandidateDetails,
}
