use axum::extract::Path;
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    auth::User,
    matches::{
        Match,
        events::{EventWithPlayers, MatchEvent},
        participations::{Participation, ParticipationWithPlayer},
    },
    state::Conn,
    teams::Team,
    util_resp::{FailureResponse, StandardResponse, success},
};

/// A match together with everything recorded about it.
#[derive(Serialize, Debug)]
pub struct MatchDetail {
    #[serde(flatten)]
    pub game: Match,
    pub team: Team,
    pub participations: Vec<ParticipationWithPlayer>,
    pub events: Vec<EventWithPlayers>,
}

impl MatchDetail {
    #[tracing::instrument(skip(conn))]
    pub fn load(
        match_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<MatchDetail, FailureResponse> {
        let game = Match::fetch(match_id, conn)?;
        let team = Team::fetch(&game.team_id, conn)?;

        let ids = [game.id.clone()];
        let participations = Participation::for_matches(&ids, conn)?;
        let events =
            EventWithPlayers::attach(MatchEvent::for_matches(&ids, conn)?, conn)?;

        Ok(MatchDetail {
            game,
            team,
            participations,
            events,
        })
    }
}

pub async fn view_match(
    Path(match_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    success(MatchDetail::load(&match_id, &mut *conn)?)
}
