use diesel::prelude::*;
use serde::Deserialize;

use crate::{
    auth::User,
    dashboard::overview::{Overview, OverviewInput},
    matches::{Match, MatchStatus, events::{EventKind, MatchEvent}},
    players::Player,
    schema::{match_events, match_participations, matches, players, teams},
    state::Conn,
    teams::Team,
    util_resp::{
        FailureResponse, QueryParams, StandardResponse, success,
    },
    validation::non_blank,
};

pub mod overview;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OverviewQuery {
    team_id: Option<String>,
}

/// Without an explicit team, the dashboard shows the club's first team.
fn pick_team(
    team_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Team, FailureResponse> {
    match team_id {
        Some(team_id) => Team::fetch(&team_id, conn),
        None => teams::table
            .order_by((teams::created_at.asc(), teams::id.asc()))
            .select(Team::as_select())
            .first::<Team>(conn)
            .optional()?
            .ok_or_else(|| {
                FailureResponse::NotFound("Team not found".to_string())
            }),
    }
}

#[tracing::instrument(skip(conn))]
pub async fn dashboard_overview(
    QueryParams(query): QueryParams<OverviewQuery>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let team = pick_team(non_blank(query.team_id.as_deref()), &mut *conn)?;

    let next_match = matches::table
        .filter(matches::team_id.eq(&team.id))
        .filter(matches::status.eq_any([
            MatchStatus::Scheduled.as_str(),
            MatchStatus::InProgress.as_str(),
        ]))
        .order_by(matches::kickoff_at.asc())
        .select(Match::as_select())
        .first::<Match>(&mut *conn)
        .optional()?;

    let finished = matches::table
        .filter(matches::team_id.eq(&team.id))
        .filter(matches::status.eq(MatchStatus::Finished.as_str()))
        .select(Match::as_select())
        .load::<Match>(&mut *conn)?;
    let finished_ids = finished.iter().map(|m| m.id.clone()).collect::<Vec<_>>();

    let active_players = players::table
        .filter(players::team_id.eq(&team.id))
        .filter(players::active.eq(true))
        .count()
        .get_result::<i64>(&mut *conn)?;

    let goals = match_events::table
        .filter(match_events::match_id.eq_any(&finished_ids))
        .filter(match_events::kind.eq(EventKind::Goal.as_str()))
        .select(MatchEvent::as_select())
        .load::<MatchEvent>(&mut *conn)?;

    let appearances = match_participations::table
        .filter(match_participations::match_id.eq_any(&finished_ids))
        .select(match_participations::player_id)
        .load::<String>(&mut *conn)?;

    let scorer_ids = goals.iter().map(|g| g.player_id.clone()).collect::<Vec<_>>();
    let players = Player::fetch_many(&scorer_ids, &mut *conn)?;

    success(Overview::compute(OverviewInput {
        team,
        next_match,
        active_players: active_players as usize,
        finished: &finished,
        goals: &goals,
        appearances: &appearances,
        players: &players,
    }))
}
