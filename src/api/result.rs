use std::io::{BufWriter, Cursor};

use mongodb::bson::doc;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rocket::{
    futures::TryStreamExt,
    http::{ContentType, Header, Status},
    response::Responder,
    serde::json::Json,
    Request, Response, Route,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            result::{
                ExportType, HistoryEntry, HistoryResponse, ResultsResponse, SortMethod,
                TurnoutStats, WinnerSummary,
            },
        },
        db::{candidate::Candidate, election::Election, user::User, vote::Ballot},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_results, export_results, get_stats, get_history]
}

/// Order a tally according to the requested method.
///
/// Ties on the primary key are broken by candidate ID so repeated queries
/// always return the same order.
fn sort_candidates(candidates: &mut [Candidate], method: SortMethod) {
    match method {
        SortMethod::Vote => candidates.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortMethod::Name => candidates.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortMethod::Latest => candidates.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
    }
}

/// Turnout as a percentage with two-decimal rounding.
/// Zero registered users yields zero, not an error.
fn turnout_percentage(votes_cast: u64, eligible_voters: u64) -> f64 {
    if eligible_voters == 0 {
        return 0.0;
    }
    let ratio = votes_cast as f64 / eligible_voters as f64;
    (ratio * 100.0 * 100.0).round() / 100.0
}

/// Fetch and sort the tally for an election, shared between the results
/// view and the export endpoint.
async fn sorted_results(
    election_id: &Option<String>,
    method: Option<SortMethod>,
    candidates: &Coll<Candidate>,
) -> Result<(Id, SortMethod, Vec<Candidate>)> {
    let election_id: Id = election_id
        .as_deref()
        .ok_or_else(|| Error::bad_request("Election ID is required"))?
        .parse()?;
    let method = method.unwrap_or_default();

    let with_election = doc! {
        "election_id": election_id,
    };
    let mut results: Vec<Candidate> = candidates
        .find(with_election, None)
        .await?
        .try_collect()
        .await?;
    if results.is_empty() {
        return Err(Error::not_found("Candidates for this election"));
    }

    sort_candidates(&mut results, method);
    Ok((election_id, method, results))
}

/// Query parameters shared by the results and export endpoints.
#[derive(Debug, FromForm)]
struct ResultsQuery {
    #[field(name = "electionId")]
    election_id: Option<String>,
    method: Option<SortMethod>,
    #[field(name = "type")]
    export_type: Option<ExportType>,
}

#[get("/result?<query..>")]
async fn get_results(
    _token: AuthToken,
    query: ResultsQuery,
    candidates: Coll<Candidate>,
) -> Result<Json<ResultsResponse>> {
    let (election_id, method, results) =
        sorted_results(&query.election_id, query.method, &candidates).await?;

    Ok(Json(ResultsResponse {
        election_id: election_id.to_string(),
        method,
        results: results.into_iter().map(Into::into).collect(),
    }))
}

#[post("/result/export?<query..>")]
async fn export_results(
    _token: AuthToken,
    query: ResultsQuery,
    candidates: Coll<Candidate>,
) -> Result<ExportResponse> {
    let (election_id, method, results) =
        sorted_results(&query.election_id, query.method, &candidates).await?;

    match query.export_type.unwrap_or_default() {
        ExportType::Csv => Ok(ExportResponse::File(ExportFile {
            content_type: ContentType::CSV,
            filename: format!("results_{election_id}.csv"),
            bytes: render_csv(&results)?,
        })),
        ExportType::Pdf => Ok(ExportResponse::File(ExportFile {
            content_type: ContentType::PDF,
            filename: format!("results_{election_id}.pdf"),
            bytes: render_pdf(election_id, &results)?,
        })),
        ExportType::Json => Ok(ExportResponse::Json(Json(ResultsResponse {
            election_id: election_id.to_string(),
            method,
            results: results.into_iter().map(Into::into).collect(),
        }))),
    }
}

/// Render the fixed CSV column set: name, position, voteCount, createdAt.
fn render_csv(results: &[Candidate]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["name", "position", "voteCount", "createdAt"])?;
    for candidate in results {
        let vote_count = candidate.vote_count.to_string();
        let created_at = candidate.created_at.to_rfc3339();
        writer.write_record([
            candidate.name.as_str(),
            candidate.position.as_str(),
            vote_count.as_str(),
            created_at.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| Error::Status(Status::InternalServerError, err.to_string()))
}

/// Render a plain-text PDF: a title followed by one line per candidate,
/// in the already-sorted order.
fn render_pdf(election_id: Id, results: &[Candidate]) -> Result<Vec<u8>> {
    const PAGE_WIDTH: f64 = 210.0;
    const PAGE_HEIGHT: f64 = 297.0;
    const MARGIN: f64 = 20.0;
    const LINE_HEIGHT: f64 = 8.0;

    let (doc, first_page, first_layer) = PdfDocument::new(
        format!("Election Results ({election_id})"),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "results",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|err| Error::Status(Status::InternalServerError, err.to_string()))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = PAGE_HEIGHT - MARGIN;
    layer.use_text(
        format!("Election Results ({election_id})"),
        18.0,
        Mm(MARGIN),
        Mm(y),
        &font,
    );
    y -= 2.0 * LINE_HEIGHT;

    for (index, candidate) in results.iter().enumerate() {
        if y < MARGIN {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "results");
            layer = doc.get_page(page).get_layer(page_layer);
            y = PAGE_HEIGHT - MARGIN;
        }
        let line = format!(
            "{}. {} | Position: {} | Votes: {} | Created: {}",
            index + 1,
            candidate.name,
            candidate.position,
            candidate.vote_count,
            candidate.created_at.to_rfc3339(),
        );
        layer.use_text(line, 12.0, Mm(MARGIN), Mm(y), &font);
        y -= LINE_HEIGHT;
    }

    let mut bytes = Vec::new();
    doc.save(&mut BufWriter::new(&mut bytes))
        .map_err(|err| Error::Status(Status::InternalServerError, err.to_string()))?;
    Ok(bytes)
}

/// Election filter for the stats endpoint.
#[derive(Debug, FromForm)]
struct StatsQuery {
    #[field(name = "electionId")]
    election_id: Option<String>,
}

#[get("/result/stats?<query..>")]
async fn get_stats(
    _token: AuthToken,
    query: StatsQuery,
    elections: Coll<Election>,
    ballots: Coll<Ballot>,
    users: Coll<User>,
) -> Result<Json<TurnoutStats>> {
    let election_id: Id = query
        .election_id
        .as_deref()
        .ok_or_else(|| Error::bad_request("Election ID is required"))?
        .parse()?;

    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;

    let with_election = doc! {
        "election_id": election_id,
    };
    let total_votes_cast = ballots.count_documents(with_election, None).await?;
    let eligible_voters = users.count_documents(None, None).await?;

    Ok(Json(TurnoutStats {
        election_id: election_id.to_string(),
        eligible_voters,
        total_votes_cast,
        turnout_percentage: turnout_percentage(total_votes_cast, eligible_voters),
    }))
}

#[get("/result/history")]
async fn get_history(
    _token: AuthToken,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<HistoryResponse>> {
    let all_elections: Vec<Election> = elections.find(None, None).await?.try_collect().await?;

    let mut results = Vec::with_capacity(all_elections.len());
    for election in all_elections {
        let with_election = doc! {
            "election_id": election.id,
        };
        let election_candidates: Vec<Candidate> = candidates
            .find(with_election, None)
            .await?
            .try_collect()
            .await?;

        // First-seen wins on ties, matching the strictly-greater comparison.
        let winner = election_candidates
            .iter()
            .reduce(|max, c| if c.vote_count > max.vote_count { c } else { max })
            .map(WinnerSummary::from);

        results.push(HistoryEntry {
            election_id: election.id.to_string(),
            title: election.election.title,
            description: election.election.description,
            winner,
        });
    }

    Ok(Json(HistoryResponse { results }))
}

/// A rendered export, served as a file download.
pub struct ExportFile {
    content_type: ContentType,
    filename: String,
    bytes: Vec<u8>,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ExportFile {
    fn respond_to(self, _req: &'r Request<'_>) -> rocket::response::Result<'o> {
        Response::build()
            .header(self.content_type)
            .header(Header::new(
                "Content-Disposition",
                format!("attachment; filename={}", self.filename),
            ))
            .sized_body(self.bytes.len(), Cursor::new(self.bytes))
            .ok()
    }
}

#[derive(Responder)]
pub enum ExportResponse {
    Json(Json<ResultsResponse>),
    File(ExportFile),
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use mongodb::Database;
    use rocket::{local::asynchronous::Client, serde::json::serde_json};

    use crate::model::{
        api::auth::BearerToken,
        db::{
            candidate::{CandidateCore, NewCandidate},
            election::{ElectionCore, NewElection},
        },
    };

    use super::*;

    /// Insert an open election with three attached candidates holding
    /// 3, 5, and 0 votes respectively.
    async fn insert_tally(db: &Database) -> Id {
        let election_id: Id = Coll::<NewElection>::from_db(db)
            .insert_one(ElectionCore::example(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        let new_candidates = Coll::<NewCandidate>::from_db(db);
        let mut candidate_ids = Vec::new();
        for (name, votes) in [("Carol Novak", 3), ("Alice Chen", 5), ("Bob Okafor", 0)] {
            let mut core = CandidateCore::new(
                name.to_string(),
                "President".to_string(),
                String::new(),
                None,
                election_id,
            );
            core.vote_count = votes;
            let id: Id = new_candidates
                .insert_one(&core, None)
                .await
                .unwrap()
                .inserted_id
                .as_object_id()
                .unwrap()
                .into();
            candidate_ids.push(id);
        }

        let attach = doc! {
            "$push": {
                "candidates": {
                    "$each": candidate_ids,
                }
            }
        };
        Coll::<Election>::from_db(db)
            .update_one(election_id.as_doc(), attach, None)
            .await
            .unwrap();

        election_id
    }

    fn tally() -> Vec<Candidate> {
        let election_id = Id::new();
        let base = Utc::now();
        // IDs ascend in declaration order so the tie-break assertions
        // below are predictable.
        let mut ids = [Id::new(), Id::new(), Id::new(), Id::new()];
        ids.sort();

        let mut candidates: Vec<Candidate> = [
            ("Carol Novak", 3, 0),
            ("alice Chen", 5, 1),
            ("Bob Okafor", 5, 2),
            ("Dai Nguyen", 0, 3),
        ]
        .into_iter()
        .zip(ids)
        .map(|((name, votes, age), id)| {
            let mut core = CandidateCore::new(
                name.to_string(),
                "President".to_string(),
                String::new(),
                None,
                election_id,
            );
            core.vote_count = votes;
            core.created_at = base - Duration::minutes(age);
            Candidate {
                id,
                candidate: core,
            }
        })
        .collect();
        candidates.reverse(); // Start deliberately unsorted.
        candidates
    }

    #[test]
    fn sort_by_vote_count() {
        let mut candidates = tally();
        sort_candidates(&mut candidates, SortMethod::Vote);

        let counts: Vec<i64> = candidates.iter().map(|c| c.vote_count).collect();
        assert_eq!(vec![5, 5, 3, 0], counts);
        // The two five-vote candidates tie; the lower ID comes first.
        assert!(candidates[0].id < candidates[1].id);
        assert_eq!("alice Chen", candidates[0].name);
        assert_eq!("Bob Okafor", candidates[1].name);
    }

    #[test]
    fn sort_by_name_ignores_case() {
        let mut candidates = tally();
        sort_candidates(&mut candidates, SortMethod::Name);

        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            vec!["alice Chen", "Bob Okafor", "Carol Novak", "Dai Nguyen"],
            names
        );
    }

    #[test]
    fn sort_by_recency() {
        let mut candidates = tally();
        sort_candidates(&mut candidates, SortMethod::Latest);

        assert!(candidates
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!("Carol Novak", candidates[0].name);
        assert_eq!("Dai Nguyen", candidates[3].name);
    }

    #[test]
    fn turnout_rounding() {
        assert_eq!(0.0, turnout_percentage(5, 0));
        assert_eq!(0.0, turnout_percentage(0, 10));
        assert_eq!(50.0, turnout_percentage(5, 10));
        assert_eq!(33.33, turnout_percentage(1, 3));
        assert_eq!(66.67, turnout_percentage(2, 3));
        assert_eq!(100.0, turnout_percentage(10, 10));
    }

    #[test]
    fn csv_export_contents() {
        let mut candidates = tally();
        sort_candidates(&mut candidates, SortMethod::Vote);

        let bytes = render_csv(&candidates).unwrap();
        let csv = String::from_utf8(bytes).unwrap();
        let mut lines = csv.lines();
        assert_eq!("name,position,voteCount,createdAt", lines.next().unwrap());
        assert_eq!(candidates.len(), lines.count());
        for candidate in &candidates {
            assert!(csv.contains(&candidate.name));
        }
    }

    #[test]
    fn pdf_export_is_a_pdf() {
        let mut candidates = tally();
        sort_candidates(&mut candidates, SortMethod::Vote);

        let bytes = render_pdf(Id::new(), &candidates).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[backend_test(voter)]
    async fn results_endpoint_sorts(client: Client, db: Database, token: BearerToken) {
        let election_id = insert_tally(&db).await;

        let response = client
            .get(format!("/api/result?electionId={election_id}"))
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: ResultsResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(SortMethod::Vote, body.method);
        let counts: Vec<i64> = body.results.iter().map(|c| c.vote_count).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));

        let response = client
            .get(format!("/api/result?electionId={election_id}&method=name"))
            .header(token.header())
            .dispatch()
            .await;
        let body: ResultsResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let names: Vec<String> = body
            .results
            .iter()
            .map(|c| c.name.to_lowercase())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
    }

    #[backend_test(voter)]
    async fn results_require_election_id(client: Client, token: BearerToken) {
        let response = client
            .get("/api/result")
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // An election with no candidates has no results to report.
        let response = client
            .get(format!("/api/result?electionId={}", Id::new()))
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn csv_export_via_api(client: Client, db: Database, token: BearerToken) {
        let election_id = insert_tally(&db).await;

        let response = client
            .post(format!(
                "/api/result/export?electionId={election_id}&type=csv"
            ))
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(Some(ContentType::CSV), response.content_type());
        let body = response.into_string().await.unwrap();
        assert!(body.starts_with("name,position,voteCount,createdAt"));
    }

    #[backend_test(voter)]
    async fn stats_count_ballots_and_users(client: Client, db: Database, token: BearerToken) {
        let election_id = insert_tally(&db).await;

        // One registered user (the test voter), no ballots yet.
        let response = client
            .get(format!("/api/result/stats?electionId={election_id}"))
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let stats: TurnoutStats =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(1, stats.eligible_voters);
        assert_eq!(0, stats.total_votes_cast);
        assert_eq!(0.0, stats.turnout_percentage);

        // Cast a ballot and the turnout reaches 100%.
        let candidate = Coll::<Candidate>::from_db(&db)
            .find_one(doc! { "election_id": election_id }, None)
            .await
            .unwrap()
            .unwrap();
        let response = client
            .post("/api/vote")
            .header(rocket::http::ContentType::JSON)
            .header(token.header())
            .body(
                rocket::serde::json::serde_json::json!({
                    "candidateId": candidate.id.to_string(),
                    "electionId": election_id.to_string(),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        let response = client
            .get(format!("/api/result/stats?electionId={election_id}"))
            .header(token.header())
            .dispatch()
            .await;
        let stats: TurnoutStats =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(1, stats.total_votes_cast);
        assert_eq!(100.0, stats.turnout_percentage);
    }

    #[backend_test(voter)]
    async fn history_reports_winners(client: Client, db: Database, token: BearerToken) {
        let election_id = insert_tally(&db).await;

        // An election with no candidates has no winner.
        let empty_election: Id = Coll::<NewElection>::from_db(&db)
            .insert_one(ElectionCore::example(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        let response = client
            .get("/api/result/history")
            .header(token.header())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: HistoryResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(2, body.results.len());

        for entry in &body.results {
            if entry.election_id == empty_election.to_string() {
                assert!(entry.winner.is_none());
            } else {
                assert_eq!(entry.election_id, election_id.to_string());
                let winner = entry.winner.as_ref().unwrap();
                assert_eq!(5, winner.vote_count);
            }
        }
    }

    #[test]
    fn pdf_export_paginates() {
        let election_id = Id::new();
        let many: Vec<Candidate> = (0..100)
            .map(|i| Candidate {
                id: Id::new(),
                candidate: CandidateCore::new(
                    format!("Candidate {i}"),
                    "Member".to_string(),
                    String::new(),
                    None,
                    election_id,
                ),
            })
            .collect();

        let bytes = render_pdf(election_id, &many).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
