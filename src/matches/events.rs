use std::collections::HashMap;

use axum::extract::Path;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::User,
    matches::{Match, view::MatchDetail},
    players::Player,
    schema::match_events,
    state::Conn,
    util_resp::{
        FailureResponse, JsonBody, QueryParams, StandardResponse, bad_request,
        created, err_not_found, message, success,
    },
    validation::non_blank,
};

text_enum! {
    pub enum EventKind {
        Goal => "goal",
        Assist => "assist",
        YellowCard => "yellow_card",
        RedCard => "red_card",
        Substitution => "substitution",
    }
}

#[derive(Serialize, Deserialize, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = match_events)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub id: String,
    pub match_id: String,
    pub player_id: String,
    pub kind: String,
    pub minute: i32,
    /// The assisting player of a goal, or the player who was replaced in a
    /// substitution.
    pub related_player_id: Option<String>,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl MatchEvent {
    pub fn is(&self, kind: EventKind) -> bool {
        self.kind == kind.as_str()
    }

    pub fn for_matches(
        match_ids: &[String],
        conn: &mut SqliteConnection,
    ) -> Result<Vec<MatchEvent>, FailureResponse> {
        Ok(match_events::table
            .filter(match_events::match_id.eq_any(match_ids))
            .order_by((match_events::minute.asc(), match_events::id.asc()))
            .select(MatchEvent::as_select())
            .load::<MatchEvent>(conn)?)
    }
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EventWithPlayers {
    #[serde(flatten)]
    pub event: MatchEvent,
    pub player: Option<Player>,
    pub related_player: Option<Player>,
}

impl EventWithPlayers {
    /// Attaches both players to each event, using one query for all of them.
    pub fn attach(
        events: Vec<MatchEvent>,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<EventWithPlayers>, FailureResponse> {
        let ids = events
            .iter()
            .flat_map(|e| {
                std::iter::once(e.player_id.clone())
                    .chain(e.related_player_id.clone())
            })
            .collect::<Vec<_>>();
        let players: HashMap<String, Player> = Player::fetch_many(&ids, conn)?;

        Ok(events
            .into_iter()
            .map(|event| EventWithPlayers {
                player: players.get(&event.player_id).cloned(),
                related_player: event
                    .related_player_id
                    .as_ref()
                    .and_then(|id| players.get(id))
                    .cloned(),
                event,
            })
            .collect())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEntry {
    player_id: Option<String>,
    kind: Option<String>,
    minute: Option<i32>,
    related_player_id: Option<String>,
    note: Option<String>,
}

struct ValidEvent {
    player_id: String,
    kind: EventKind,
    minute: i32,
    related_player_id: Option<String>,
    note: Option<String>,
}

impl EventEntry {
    fn validate(self) -> Result<ValidEvent, FailureResponse> {
        let (Some(player_id), Some(kind), Some(minute)) = (
            non_blank(self.player_id.as_deref()),
            non_blank(self.kind.as_deref()),
            self.minute,
        ) else {
            return Err(FailureResponse::BadRequest(
                "playerId, kind and minute are required".to_string(),
            ));
        };

        let kind = kind.parse::<EventKind>().map_err(|kind| {
            FailureResponse::BadRequest(format!("Invalid event kind: {kind}"))
        })?;

        if minute < 0 {
            return Err(FailureResponse::BadRequest(
                "Minute cannot be negative".to_string(),
            ));
        }

        Ok(ValidEvent {
            player_id,
            kind,
            minute,
            related_player_id: non_blank(self.related_player_id.as_deref()),
            note: non_blank(self.note.as_deref()),
        })
    }
}

fn insert_events(
    match_id: &str,
    events: &[ValidEvent],
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, FailureResponse> {
    let now = Utc::now().naive_utc();
    let ids = events
        .iter()
        .map(|_| Uuid::now_v7().to_string())
        .collect::<Vec<_>>();

    let rows = events
        .iter()
        .zip(&ids)
        .map(|(event, id)| {
            (
                match_events::id.eq(id),
                match_events::match_id.eq(match_id),
                match_events::player_id.eq(&event.player_id),
                match_events::kind.eq(event.kind.as_str()),
                match_events::minute.eq(event.minute),
                match_events::related_player_id.eq(&event.related_player_id),
                match_events::note.eq(&event.note),
                match_events::created_at.eq(now),
                match_events::updated_at.eq(now),
            )
        })
        .collect::<Vec<_>>();

    if !rows.is_empty() {
        diesel::insert_into(match_events::table)
            .values(rows)
            .execute(conn)?;
    }

    Ok(ids)
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_add_event(
    Path(match_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<EventEntry>,
) -> StandardResponse {
    Match::fetch(&match_id, &mut *conn)?;

    let event = form.validate()?;

    Player::fetch(&event.player_id, &mut *conn)?;
    if let Some(related) = &event.related_player_id {
        Player::fetch(related, &mut *conn).map_err(related_player_error)?;
    }

    let ids = insert_events(&match_id, std::slice::from_ref(&event), &mut *conn)?;

    let stored = match_events::table
        .filter(match_events::id.eq_any(&ids))
        .select(MatchEvent::as_select())
        .load::<MatchEvent>(&mut *conn)?;

    let mut with_players = EventWithPlayers::attach(stored, &mut *conn)?;
    match with_players.pop() {
        Some(event) => created(event),
        None => Err(FailureResponse::ServerError(
            "Event was not stored".to_string(),
        )),
    }
}

#[derive(Deserialize)]
pub struct ReplaceEventsForm {
    events: Option<Vec<EventEntry>>,
}

/// Replaces every event of a match with the submitted list.
#[tracing::instrument(skip(conn, form))]
pub async fn do_replace_events(
    Path(match_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<ReplaceEventsForm>,
) -> StandardResponse {
    Match::fetch(&match_id, &mut *conn)?;

    let Some(entries) = form.events else {
        return bad_request("events must be an array");
    };

    let events = entries
        .into_iter()
        .map(EventEntry::validate)
        .collect::<Result<Vec<_>, _>>()?;

    let player_ids = events
        .iter()
        .flat_map(|e| {
            std::iter::once(e.player_id.clone())
                .chain(e.related_player_id.clone())
        })
        .collect::<Vec<_>>();
    Player::check_all_exist(&player_ids, &mut *conn)?;

    diesel::delete(
        match_events::table.filter(match_events::match_id.eq(&match_id)),
    )
    .execute(&mut *conn)?;

    insert_events(&match_id, &events, &mut *conn)?;

    tracing::debug!(n = events.len(), "replaced match events");

    success(MatchDetail::load(&match_id, &mut *conn)?)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventQuery {
    event_id: Option<String>,
}

#[tracing::instrument(skip(conn))]
pub async fn do_delete_event(
    Path(match_id): Path<String>,
    QueryParams(query): QueryParams<DeleteEventQuery>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let Some(event_id) = non_blank(query.event_id.as_deref()) else {
        return bad_request("eventId is required");
    };

    let n = diesel::delete(
        match_events::table
            .filter(match_events::id.eq(&event_id))
            .filter(match_events::match_id.eq(&match_id)),
    )
    .execute(&mut *conn)?;

    if n == 0 {
        return err_not_found("Event not found");
    }

    message("Event deleted")
}

/// Only a missing player is reported as such, other failures pass through.
fn related_player_error(e: FailureResponse) -> FailureResponse {
    match e {
        FailureResponse::NotFound(_) => {
            FailureResponse::NotFound("Related player not found".to_string())
        }
        e => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str, minute: i32) -> EventEntry {
        EventEntry {
            player_id: Some("p1".to_string()),
            kind: Some(kind.to_string()),
            minute: Some(minute),
            related_player_id: Some("  ".to_string()),
            note: None,
        }
    }

    #[test]
    fn validates_kind_and_minute() {
        let event = entry("yellow_card", 33).validate().ok().unwrap();
        assert_eq!(event.kind, EventKind::YellowCard);
        assert_eq!(event.related_player_id, None);

        match entry("own_goal", 10).validate() {
            Err(FailureResponse::BadRequest(msg)) => {
                assert_eq!(msg, "Invalid event kind: own_goal")
            }
            _ => panic!("expected a bad request"),
        }

        assert!(entry("goal", -1).validate().is_err());
    }

    #[test]
    fn database_errors_are_not_reported_as_missing_players() {
        match related_player_error(FailureResponse::NotFound(
            "Player not found".to_string(),
        )) {
            FailureResponse::NotFound(msg) => {
                assert_eq!(msg, "Related player not found")
            }
            _ => panic!("expected not found"),
        }

        let e = related_player_error(FailureResponse::ServerError(
            "Database error".to_string(),
        ));
        assert!(matches!(e, FailureResponse::ServerError(_)));
    }
}
