use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    Client,
};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            election::ElectionSummary,
            vote::{
                BallotDetails, CastRequest, CastResponse, ChangeRequest, VoteHistory,
                VoteHistoryEntry, VoteStatus, WithdrawRequest,
            },
        },
        common::CandidateStatus,
        db::{
            candidate::Candidate,
            election::Election,
            user::User,
            vote::{Ballot, BallotCore, NewBallot},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    observer::VoteNotifier,
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, change_vote, withdraw_vote, vote_status]
}

/// Look up an election and its candidate for a mutating vote operation,
/// enforcing the shared preconditions: the election exists and is open,
/// and the candidate is an active member of it.
async fn open_election_and_candidate(
    election_id: Id,
    candidate_id: Id,
    elections: &Coll<Election>,
    candidates: &Coll<Candidate>,
) -> Result<(Election, Candidate)> {
    let election = elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    if !election.is_open {
        return Err(Error::conflict("Election is closed"));
    }

    if !election.contains(candidate_id) {
        return Err(Error::bad_request(
            "Candidate does not belong to this election",
        ));
    }
    let candidate = candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;
    if candidate.status != CandidateStatus::Active {
        return Err(Error::conflict("Candidate has withdrawn"));
    }

    Ok((election, candidate))
}

#[post("/vote", data = "<request>", format = "json")]
async fn cast_vote(
    token: AuthToken,
    request: Json<CastRequest>,
    users: Coll<User>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    new_ballots: Coll<NewBallot>,
    notifier: &State<VoteNotifier>,
    db_client: &State<Client>,
) -> Result<(Status, Json<CastResponse>)> {
    let election_id: Id = request.election_id.parse()?;
    let candidate_id: Id = request.candidate_id.parse()?;

    let (_, candidate) =
        open_election_and_candidate(election_id, candidate_id, &elections, &candidates).await?;

    // Advisory pre-check for a friendlier error message; the unique
    // (voter_id, election_id) index is the actual safety mechanism.
    let voter_election = doc! {
        "voter_id": token.id,
        "election_id": election_id,
    };
    if ballots.find_one(voter_election, None).await?.is_some() {
        return Err(Error::conflict("You already voted in this election"));
    }

    // Record the ballot and bump the tally together.
    let ballot = BallotCore::new(token.id, candidate_id, election_id);
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        match new_ballots
            .insert_one_with_session(&ballot, None, &mut session)
            .await
        {
            Ok(_) => {}
            // Two concurrent casts can both pass the pre-check; the index
            // rejects the loser here.
            Err(err) if is_duplicate_key_error(&err) => {
                return Err(Error::conflict("You already voted in this election"));
            }
            Err(err) => return Err(err.into()),
        }

        let increment = doc! {
            "$inc": {
                "vote_count": 1,
            }
        };
        candidates
            .update_one_with_session(candidate_id.as_doc(), increment, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    // Best-effort audit notification; must never fail the response.
    if let Ok(Some(voter)) = users.find_one(token.id.as_doc(), None).await {
        notifier.notify_vote_cast(&voter.name, &candidate.name);
    }

    let candidate = candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .unwrap(); // Presence already checked.

    Ok((
        Status::Created,
        Json(CastResponse {
            message: "Vote successfully cast".to_string(),
            candidate: candidate.into(),
            vote: BallotDetails::from(&ballot),
        }),
    ))
}

#[patch("/vote", data = "<request>", format = "json")]
async fn change_vote(
    token: AuthToken,
    request: Json<ChangeRequest>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    db_client: &State<Client>,
) -> Result<Json<CastResponse>> {
    let election_id: Id = request.election_id.parse()?;
    let new_candidate_id: Id = request.new_candidate_id.parse()?;

    let ballot = ballots
        .find_one(
            doc! {
                "voter_id": token.id,
                "election_id": election_id,
            },
            None,
        )
        .await?
        .ok_or_else(|| Error::not_found("Vote for this election"))?;

    open_election_and_candidate(election_id, new_candidate_id, &elections, &candidates).await?;

    let old_candidate_id = ballot.candidate_id;

    // Move the tally and repoint the ballot in one transaction; a partial
    // failure would otherwise break the count/ballot correspondence.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let decrement = doc! {
            "$inc": {
                "vote_count": -1,
            }
        };
        candidates
            .update_one_with_session(old_candidate_id.as_doc(), decrement, None, &mut session)
            .await?;

        let increment = doc! {
            "$inc": {
                "vote_count": 1,
            }
        };
        candidates
            .update_one_with_session(new_candidate_id.as_doc(), increment, None, &mut session)
            .await?;

        let repoint = doc! {
            "$set": {
                "candidate_id": new_candidate_id,
                "cast_at": BsonDateTime::now(),
            }
        };
        ballots
            .update_one_with_session(ballot.id.as_doc(), repoint, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    let candidate = candidates
        .find_one(new_candidate_id.as_doc(), None)
        .await?
        .unwrap(); // Presence already checked.
    let ballot = ballots.find_one(ballot.id.as_doc(), None).await?.unwrap();

    Ok(Json(CastResponse {
        message: "Vote updated successfully".to_string(),
        candidate: candidate.into(),
        vote: BallotDetails::from(&*ballot),
    }))
}

#[delete("/vote", data = "<request>", format = "json")]
async fn withdraw_vote(
    token: AuthToken,
    request: Json<WithdrawRequest>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    db_client: &State<Client>,
) -> Result<Json<WithdrawResponse>> {
    let election_id: Id = request.election_id.parse()?;

    let election = elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    // Withdrawal follows the same open-election rule as cast and change.
    if !election.is_open {
        return Err(Error::conflict("Election is closed"));
    }

    let ballot = ballots
        .find_one(
            doc! {
                "voter_id": token.id,
                "election_id": election_id,
            },
            None,
        )
        .await?
        .ok_or_else(|| Error::not_found("Vote for this election"))?;

    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let decrement = doc! {
            "$inc": {
                "vote_count": -1,
            }
        };
        candidates
            .update_one_with_session(ballot.candidate_id.as_doc(), decrement, None, &mut session)
            .await?;

        let result = ballots
            .delete_one_with_session(ballot.id.as_doc(), None, &mut session)
            .await?;
        assert_eq!(result.deleted_count, 1);

        session.commit_transaction().await?;
    }

    Ok(Json(WithdrawResponse {
        message: "Vote withdrawn".to_string(),
        vote: BallotDetails::from(&*ballot),
    }))
}

/// Optional election filter for the status view.
#[derive(Debug, FromForm)]
struct StatusQuery {
    #[field(name = "electionId")]
    election_id: Option<String>,
}

#[get("/vote/status?<query..>")]
async fn vote_status(
    token: AuthToken,
    query: StatusQuery,
    ballots: Coll<Ballot>,
    candidates: Coll<Candidate>,
    elections: Coll<Election>,
) -> Result<Json<VoteStatusResponse>> {
    // With an election given, report the single ballot (or its absence).
    if let Some(election_id) = &query.election_id {
        let election_id: Id = election_id.parse()?;
        let ballot = ballots
            .find_one(
                doc! {
                    "voter_id": token.id,
                    "election_id": election_id,
                },
                None,
            )
            .await?;
        return Ok(Json(VoteStatusResponse::Single(VoteStatus {
            has_voted: ballot.is_some(),
            vote: ballot.map(|ballot| BallotDetails::from(&*ballot)),
        })));
    }

    // Otherwise report every ballot, joined with candidate and election.
    let my_ballots: Vec<Ballot> = ballots
        .find(doc! { "voter_id": token.id }, None)
        .await?
        .try_collect()
        .await?;

    if my_ballots.is_empty() {
        return Err(Error::not_found("Votes for this user"));
    }

    let mut votes = Vec::with_capacity(my_ballots.len());
    for ballot in my_ballots {
        let candidate = candidates
            .find_one(ballot.candidate_id.as_doc(), None)
            .await?;
        let election = elections
            .find_one(ballot.election_id.as_doc(), None)
            .await?;
        // Skip ballots whose candidate or election has since been deleted;
        // cascading deletes make this unreachable short of a partial failure.
        if let (Some(candidate), Some(election)) = (candidate, election) {
            votes.push(VoteHistoryEntry {
                vote: BallotDetails::from(&*ballot),
                candidate: candidate.into(),
                election: ElectionSummary::from(&election),
            });
        }
    }

    Ok(Json(VoteStatusResponse::All(VoteHistory {
        message: "My votes retrieved successfully".to_string(),
        votes,
    })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub message: String,
    pub vote: BallotDetails,
}

/// The status endpoint answers in two shapes depending on whether an
/// election filter was supplied.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoteStatusResponse {
    Single(VoteStatus),
    All(VoteHistory),
}
