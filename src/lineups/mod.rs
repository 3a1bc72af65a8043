use std::collections::HashMap;

use axum::extract::Path;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    auth::User,
    players::Player,
    schema::{lineup_players, lineups, players, teams},
    state::Conn,
    teams::Team,
    util_resp::{FailureResponse, StandardResponse, success},
};

pub mod manage;

#[derive(Serialize, Deserialize, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = lineups)]
#[serde(rename_all = "camelCase")]
pub struct Lineup {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub formation: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One player's slot in a lineup.
#[derive(Serialize, Deserialize, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = lineup_players)]
#[serde(rename_all = "camelCase")]
pub struct LineupPlayer {
    pub id: String,
    pub lineup_id: String,
    pub player_id: String,
    pub starter: bool,
    pub field_position: String,
    pub shirt_number: Option<i32>,
    pub sort_order: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Clone, Debug)]
pub struct EntryWithPlayer {
    #[serde(flatten)]
    pub entry: LineupPlayer,
    pub player: Player,
}

#[derive(Serialize, Debug)]
pub struct LineupDetail {
    #[serde(flatten)]
    pub lineup: Lineup,
    pub team: Option<Team>,
    pub players: Vec<EntryWithPlayer>,
}

impl Lineup {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        lineup_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Lineup, FailureResponse> {
        lineups::table
            .filter(lineups::id.eq(lineup_id))
            .select(Lineup::as_select())
            .first::<Lineup>(conn)
            .optional()?
            .ok_or_else(|| {
                FailureResponse::NotFound("Lineup not found".to_string())
            })
    }
}

impl LineupDetail {
    /// Attaches teams and entries to the lineups, with one query for each
    /// rather than one per lineup.
    pub fn load_many(
        lineups: Vec<Lineup>,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<LineupDetail>, FailureResponse> {
        let lineup_ids = lineups.iter().map(|l| l.id.clone()).collect::<Vec<_>>();
        let team_ids = lineups
            .iter()
            .map(|l| l.team_id.clone())
            .unique()
            .collect::<Vec<_>>();

        let teams: HashMap<String, Team> = teams::table
            .filter(teams::id.eq_any(&team_ids))
            .select(Team::as_select())
            .load::<Team>(conn)?
            .into_iter()
            .map(|team| (team.id.clone(), team))
            .collect();

        let mut entries = lineup_players::table
            .inner_join(players::table)
            .filter(lineup_players::lineup_id.eq_any(&lineup_ids))
            .order_by((
                lineup_players::starter.desc(),
                lineup_players::sort_order.asc(),
            ))
            .select((LineupPlayer::as_select(), Player::as_select()))
            .load::<(LineupPlayer, Player)>(conn)?
            .into_iter()
            .map(|(entry, player)| EntryWithPlayer { entry, player })
            .into_group_map_by(|e| e.entry.lineup_id.clone());

        Ok(lineups
            .into_iter()
            .map(|lineup| LineupDetail {
                team: teams.get(&lineup.team_id).cloned(),
                players: entries.remove(&lineup.id).unwrap_or_default(),
                lineup,
            })
            .collect())
    }

    pub fn load(
        lineup_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<LineupDetail, FailureResponse> {
        let lineup = Lineup::fetch(lineup_id, conn)?;
        LineupDetail::load_many(vec![lineup], conn)?
            .pop()
            .ok_or_else(|| {
                FailureResponse::NotFound("Lineup not found".to_string())
            })
    }
}

pub async fn view_lineup(
    Path(lineup_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    success(LineupDetail::load(&lineup_id, &mut *conn)?)
}
