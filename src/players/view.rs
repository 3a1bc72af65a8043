use axum::extract::Path;
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    auth::User,
    lineups::{Lineup, LineupPlayer},
    matches::{Match, events::MatchEvent, participations::Participation},
    players::{Player, PlayerWithTeam},
    schema::{lineup_players, lineups, match_events, match_participations, matches},
    state::Conn,
    util_resp::{StandardResponse, success},
};

const RECENT_PARTICIPATIONS: i64 = 10;
const RECENT_EVENTS: i64 = 20;

#[derive(Serialize)]
pub struct ParticipationWithMatch {
    #[serde(flatten)]
    participation: Participation,
    #[serde(rename = "match")]
    game: Match,
}

#[derive(Serialize)]
pub struct EventWithMatch {
    #[serde(flatten)]
    event: MatchEvent,
    #[serde(rename = "match")]
    game: Match,
}

#[derive(Serialize)]
pub struct EntryWithLineup {
    #[serde(flatten)]
    entry: LineupPlayer,
    lineup: Lineup,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetail {
    #[serde(flatten)]
    player: PlayerWithTeam,
    participations: Vec<ParticipationWithMatch>,
    events: Vec<EventWithMatch>,
    lineup_entries: Vec<EntryWithLineup>,
}

#[tracing::instrument(skip(conn))]
pub async fn view_player(
    Path(player_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let player = Player::fetch_with_team(&player_id, &mut *conn)?;

    let participations = match_participations::table
        .inner_join(matches::table)
        .filter(match_participations::player_id.eq(&player_id))
        .order_by(matches::kickoff_at.desc())
        .limit(RECENT_PARTICIPATIONS)
        .select((Participation::as_select(), Match::as_select()))
        .load::<(Participation, Match)>(&mut *conn)?
        .into_iter()
        .map(|(participation, game)| ParticipationWithMatch {
            participation,
            game,
        })
        .collect();

    let events = match_events::table
        .inner_join(matches::table)
        .filter(match_events::player_id.eq(&player_id))
        .order_by((matches::kickoff_at.desc(), match_events::minute.desc()))
        .limit(RECENT_EVENTS)
        .select((MatchEvent::as_select(), Match::as_select()))
        .load::<(MatchEvent, Match)>(&mut *conn)?
        .into_iter()
        .map(|(event, game)| EventWithMatch { event, game })
        .collect();

    let lineup_entries = lineup_players::table
        .inner_join(lineups::table)
        .filter(lineup_players::player_id.eq(&player_id))
        .order_by(lineups::updated_at.desc())
        .select((LineupPlayer::as_select(), Lineup::as_select()))
        .load::<(LineupPlayer, Lineup)>(&mut *conn)?
        .into_iter()
        .map(|(entry, lineup)| EntryWithLineup { entry, lineup })
        .collect();

    success(PlayerDetail {
        player,
        participations,
        events,
        lineup_entries,
    })
}
