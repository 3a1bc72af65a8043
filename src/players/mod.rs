use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    schema::{players, teams},
    teams::Team,
    util_resp::FailureResponse,
};

pub mod manage;
pub mod stats;
pub mod view;

text_enum! {
    pub enum DominantFoot {
        Right => "right",
        Left => "left",
        Both => "both",
    }
}

#[derive(Serialize, Deserialize, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = players)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub team_id: String,
    pub full_name: String,
    pub main_position: String,
    pub dominant_foot: String,
    pub birth_date: Option<NaiveDateTime>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Clone, Debug)]
pub struct PlayerWithTeam {
    #[serde(flatten)]
    pub player: Player,
    pub team: Team,
}

impl From<(Player, Team)> for PlayerWithTeam {
    fn from((player, team): (Player, Team)) -> Self {
        PlayerWithTeam { player, team }
    }
}

impl Player {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        player_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Player, FailureResponse> {
        players::table
            .filter(players::id.eq(player_id))
            .select(Player::as_select())
            .first::<Player>(conn)
            .optional()?
            .ok_or_else(|| {
                FailureResponse::NotFound("Player not found".to_string())
            })
    }

    pub fn fetch_with_team(
        player_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<PlayerWithTeam, FailureResponse> {
        players::table
            .inner_join(teams::table)
            .filter(players::id.eq(player_id))
            .select((Player::as_select(), Team::as_select()))
            .first::<(Player, Team)>(conn)
            .optional()?
            .map(PlayerWithTeam::from)
            .ok_or_else(|| {
                FailureResponse::NotFound("Player not found".to_string())
            })
    }

    /// Loads the given players, keyed by id. Unknown ids are skipped.
    pub fn fetch_many(
        player_ids: &[String],
        conn: &mut SqliteConnection,
    ) -> Result<HashMap<String, Player>, FailureResponse> {
        if player_ids.is_empty() {
            return Ok(HashMap::new());
        }

        Ok(players::table
            .filter(players::id.eq_any(player_ids))
            .select(Player::as_select())
            .load::<Player>(conn)?
            .into_iter()
            .map(|player| (player.id.clone(), player))
            .collect())
    }

    /// Fails with a 404 naming the first id which does not belong to a
    /// player.
    pub fn check_all_exist(
        player_ids: &[String],
        conn: &mut SqliteConnection,
    ) -> Result<(), FailureResponse> {
        let found = Player::fetch_many(player_ids, conn)?;
        let missing = player_ids.iter().find(|id| !found.contains_key(*id));

        match missing {
            Some(id) => Err(FailureResponse::NotFound(format!(
                "Player not found: {id}"
            ))),
            None => Ok(()),
        }
    }
}

/// A player may only be listed once per match or lineup.
pub fn reject_duplicates(player_ids: &[String]) -> Result<(), FailureResponse> {
    match player_ids.iter().duplicates().next() {
        Some(id) => Err(FailureResponse::BadRequest(format!(
            "Player listed more than once: {id}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foot_only_accepts_known_values() {
        assert_eq!("both".parse::<DominantFoot>(), Ok(DominantFoot::Both));
        assert_eq!("Right".parse::<DominantFoot>(), Err("Right".to_string()));
        assert_eq!(
            DominantFoot::ALL
                .iter()
                .map(|foot| foot.as_str())
                .collect::<Vec<_>>(),
            vec!["right", "left", "both"]
        );
    }

    #[test]
    fn duplicate_players_are_named() {
        let ids = ["a", "b", "c", "b"].map(String::from);
        match reject_duplicates(&ids) {
            Err(FailureResponse::BadRequest(msg)) => {
                assert_eq!(msg, "Player listed more than once: b")
            }
            _ => panic!("expected a bad request"),
        }
        assert!(reject_duplicates(&ids[..3]).is_ok());
        assert!(reject_duplicates(&[]).is_ok());
    }
}
