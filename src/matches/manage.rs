use axum::extract::Path;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::User,
    matches::{
        Match, MatchKind, MatchStatus,
        events::MatchEvent,
        participations::{Participation, ParticipationWithPlayer},
        view::MatchDetail,
    },
    schema::matches,
    state::Conn,
    teams::Team,
    util_resp::{
        FailureResponse, JsonBody, QueryParams, StandardResponse, bad_request,
        created, err_not_found, message, success,
    },
    validation::{deserialize_some, non_blank, parse_datetime},
};

#[derive(Serialize, Debug)]
pub struct MatchSummary {
    #[serde(flatten)]
    pub game: Match,
    pub participations: Vec<ParticipationWithPlayer>,
    pub events: Vec<MatchEvent>,
}

#[derive(Deserialize, Debug)]
pub struct MatchListQuery {
    status: Option<String>,
    kind: Option<String>,
}

#[tracing::instrument(skip(conn))]
pub async fn list_matches(
    QueryParams(query): QueryParams<MatchListQuery>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let mut q = matches::table.into_boxed();
    if let Some(status) = non_blank(query.status.as_deref()) {
        q = q.filter(matches::status.eq(status));
    }
    if let Some(kind) = non_blank(query.kind.as_deref()) {
        q = q.filter(matches::kind.eq(kind));
    }

    let games = q
        .order_by(matches::kickoff_at.desc())
        .select(Match::as_select())
        .load::<Match>(&mut *conn)?;

    let ids = games.iter().map(|m| m.id.clone()).collect::<Vec<_>>();

    let mut participations = Participation::for_matches(&ids, &mut *conn)?
        .into_iter()
        .into_group_map_by(|p| p.participation.match_id.clone());
    let mut events = MatchEvent::for_matches(&ids, &mut *conn)?
        .into_iter()
        .into_group_map_by(|e| e.match_id.clone());

    let summaries = games
        .into_iter()
        .map(|game| MatchSummary {
            participations: participations.remove(&game.id).unwrap_or_default(),
            events: events.remove(&game.id).unwrap_or_default(),
            game,
        })
        .collect::<Vec<_>>();

    success(summaries)
}

fn parse_kind(kind: &str) -> Result<MatchKind, FailureResponse> {
    kind.parse().map_err(|kind| {
        FailureResponse::BadRequest(format!("Invalid match kind: {kind}"))
    })
}

fn parse_status(status: &str) -> Result<MatchStatus, FailureResponse> {
    status.parse().map_err(|status| {
        FailureResponse::BadRequest(format!("Invalid match status: {status}"))
    })
}

fn parse_kickoff(kickoff: &str) -> Result<NaiveDateTime, FailureResponse> {
    parse_datetime(kickoff).ok_or_else(|| {
        FailureResponse::BadRequest("Invalid kickoff date".to_string())
    })
}

fn validate_goals(goals: Option<i32>) -> Result<(), FailureResponse> {
    match goals {
        Some(g) if g < 0 => Err(FailureResponse::BadRequest(
            "Goals cannot be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchForm {
    team_id: Option<String>,
    kickoff_at: Option<String>,
    venue: Option<String>,
    opponent_name: Option<String>,
    kind: Option<String>,
    status: Option<String>,
    goals_for: Option<i32>,
    goals_against: Option<i32>,
    coach_notes: Option<String>,
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_create_match(
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<CreateMatchForm>,
) -> StandardResponse {
    let (
        Some(team_id),
        Some(kickoff_at),
        Some(venue),
        Some(opponent_name),
        Some(kind),
    ) = (
        non_blank(form.team_id.as_deref()),
        non_blank(form.kickoff_at.as_deref()),
        non_blank(form.venue.as_deref()),
        non_blank(form.opponent_name.as_deref()),
        non_blank(form.kind.as_deref()),
    )
    else {
        return bad_request(
            "teamId, kickoffAt, venue, opponentName and kind are required",
        );
    };

    let kind = parse_kind(&kind)?;
    let status = match non_blank(form.status.as_deref()) {
        Some(status) => parse_status(&status)?,
        None => MatchStatus::Scheduled,
    };
    let kickoff_at = parse_kickoff(&kickoff_at)?;
    validate_goals(form.goals_for)?;
    validate_goals(form.goals_against)?;

    Team::fetch(&team_id, &mut *conn)?;

    let id = Uuid::now_v7().to_string();
    let now = Utc::now().naive_utc();

    diesel::insert_into(matches::table)
        .values((
            matches::id.eq(&id),
            matches::team_id.eq(&team_id),
            matches::kickoff_at.eq(kickoff_at),
            matches::venue.eq(&venue),
            matches::opponent_name.eq(&opponent_name),
            matches::kind.eq(kind.as_str()),
            matches::status.eq(status.as_str()),
            matches::goals_for.eq(form.goals_for),
            matches::goals_against.eq(form.goals_against),
            matches::coach_notes.eq(non_blank(form.coach_notes.as_deref())),
            matches::created_at.eq(now),
            matches::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;

    tracing::info!(match_id = %id, %team_id, "created match");

    created(Match::fetch(&id, &mut *conn)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatchForm {
    kickoff_at: Option<String>,
    venue: Option<String>,
    opponent_name: Option<String>,
    kind: Option<String>,
    status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    goals_for: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    goals_against: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    coach_notes: Option<Option<String>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = matches)]
struct MatchChanges {
    kickoff_at: Option<NaiveDateTime>,
    venue: Option<String>,
    opponent_name: Option<String>,
    kind: Option<String>,
    status: Option<String>,
    goals_for: Option<Option<i32>>,
    goals_against: Option<Option<i32>>,
    coach_notes: Option<Option<String>>,
    updated_at: NaiveDateTime,
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_update_match(
    Path(match_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<UpdateMatchForm>,
) -> StandardResponse {
    Match::fetch(&match_id, &mut *conn)?;

    validate_goals(form.goals_for.flatten())?;
    validate_goals(form.goals_against.flatten())?;

    let changes = MatchChanges {
        kickoff_at: match non_blank(form.kickoff_at.as_deref()) {
            Some(kickoff) => Some(parse_kickoff(&kickoff)?),
            None => None,
        },
        venue: non_blank(form.venue.as_deref()),
        opponent_name: non_blank(form.opponent_name.as_deref()),
        kind: match non_blank(form.kind.as_deref()) {
            Some(kind) => Some(parse_kind(&kind)?.as_str().to_string()),
            None => None,
        },
        status: match non_blank(form.status.as_deref()) {
            Some(status) => Some(parse_status(&status)?.as_str().to_string()),
            None => None,
        },
        goals_for: form.goals_for,
        goals_against: form.goals_against,
        coach_notes: form.coach_notes.map(|n| non_blank(n.as_deref())),
        updated_at: Utc::now().naive_utc(),
    };

    diesel::update(matches::table.filter(matches::id.eq(&match_id)))
        .set(changes)
        .execute(&mut *conn)?;

    success(MatchDetail::load(&match_id, &mut *conn)?)
}

#[tracing::instrument(skip(conn))]
pub async fn do_delete_match(
    Path(match_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let n = diesel::delete(matches::table.filter(matches::id.eq(&match_id)))
        .execute(&mut *conn)?;

    if n == 0 {
        return err_not_found("Match not found");
    }

    tracing::info!(%match_id, "deleted match");

    message("Match deleted")
}
