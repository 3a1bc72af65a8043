use axum::extract::Path;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::User,
    matches::{Match, view::MatchDetail},
    players::{Player, reject_duplicates},
    schema::{match_participations, players},
    state::Conn,
    util_resp::{
        FailureResponse, JsonBody, StandardResponse, bad_request, success,
    },
    validation::{deserialize_some, non_blank},
};

#[derive(Serialize, Deserialize, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = match_participations)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub id: String,
    pub match_id: String,
    pub player_id: String,
    pub starter: bool,
    pub minutes_played: Option<i32>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Clone, Debug)]
pub struct ParticipationWithPlayer {
    #[serde(flatten)]
    pub participation: Participation,
    pub player: Player,
}

impl From<(Participation, Player)> for ParticipationWithPlayer {
    fn from((participation, player): (Participation, Player)) -> Self {
        ParticipationWithPlayer {
            participation,
            player,
        }
    }
}

impl Participation {
    /// Participations of the given matches, starters first and then by
    /// minutes played.
    pub fn for_matches(
        match_ids: &[String],
        conn: &mut SqliteConnection,
    ) -> Result<Vec<ParticipationWithPlayer>, FailureResponse> {
        let rows = match_participations::table
            .inner_join(players::table)
            .filter(match_participations::match_id.eq_any(match_ids))
            .order_by((
                match_participations::starter.desc(),
                match_participations::minutes_played.desc(),
            ))
            .select((Participation::as_select(), Player::as_select()))
            .load::<(Participation, Player)>(conn)?;

        Ok(rows.into_iter().map(ParticipationWithPlayer::from).collect())
    }
}

fn validate_minutes(minutes: Option<i32>) -> Result<(), FailureResponse> {
    match minutes {
        Some(m) if m < 0 => Err(FailureResponse::BadRequest(
            "Minutes played cannot be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_rating(rating: Option<f64>) -> Result<(), FailureResponse> {
    match rating {
        Some(r) if !(0.0..=10.0).contains(&r) => Err(
            FailureResponse::BadRequest(
                "Rating must be between 0 and 10".to_string(),
            ),
        ),
        _ => Ok(()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationEntry {
    player_id: Option<String>,
    starter: Option<bool>,
    minutes_played: Option<i32>,
    rating: Option<f64>,
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ReplaceParticipationsForm {
    participations: Option<Vec<ParticipationEntry>>,
}

/// Replaces every participation of a match with the submitted list.
#[tracing::instrument(skip(conn, form))]
pub async fn do_replace_participations(
    Path(match_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<ReplaceParticipationsForm>,
) -> StandardResponse {
    Match::fetch(&match_id, &mut *conn)?;

    let Some(entries) = form.participations else {
        return bad_request("participations must be an array");
    };

    let mut player_ids = Vec::with_capacity(entries.len());
    for entry in &entries {
        let Some(player_id) = non_blank(entry.player_id.as_deref()) else {
            return bad_request("Every participation needs a playerId");
        };
        validate_minutes(entry.minutes_played)?;
        validate_rating(entry.rating)?;
        player_ids.push(player_id);
    }
    reject_duplicates(&player_ids)?;
    Player::check_all_exist(&player_ids, &mut *conn)?;

    diesel::delete(
        match_participations::table
            .filter(match_participations::match_id.eq(&match_id)),
    )
    .execute(&mut *conn)?;

    let now = Utc::now().naive_utc();
    let rows = entries
        .iter()
        .zip(&player_ids)
        .map(|(entry, player_id)| {
            (
                match_participations::id.eq(Uuid::now_v7().to_string()),
                match_participations::match_id.eq(&match_id),
                match_participations::player_id.eq(player_id),
                match_participations::starter.eq(entry.starter.unwrap_or(false)),
                match_participations::minutes_played
                    .eq(entry.minutes_played.unwrap_or(0)),
                match_participations::rating.eq(entry.rating),
                match_participations::notes
                    .eq(non_blank(entry.notes.as_deref())),
                match_participations::created_at.eq(now),
                match_participations::updated_at.eq(now),
            )
        })
        .collect::<Vec<_>>();

    if !rows.is_empty() {
        diesel::insert_into(match_participations::table)
            .values(rows)
            .execute(&mut *conn)?;
    }

    tracing::debug!(n = player_ids.len(), "replaced participations");

    success(MatchDetail::load(&match_id, &mut *conn)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertParticipationForm {
    player_id: Option<String>,
    starter: Option<bool>,
    minutes_played: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    rating: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    notes: Option<Option<String>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = match_participations)]
struct ParticipationChanges {
    starter: Option<bool>,
    minutes_played: Option<Option<i32>>,
    rating: Option<Option<f64>>,
    notes: Option<Option<String>>,
    updated_at: NaiveDateTime,
}

/// Records (or updates) the participation of a single player.
#[tracing::instrument(skip(conn, form))]
pub async fn do_upsert_participation(
    Path(match_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<UpsertParticipationForm>,
) -> StandardResponse {
    Match::fetch(&match_id, &mut *conn)?;

    let Some(player_id) = non_blank(form.player_id.as_deref()) else {
        return bad_request("playerId is required");
    };
    let player = Player::fetch(&player_id, &mut *conn)?;

    validate_minutes(form.minutes_played)?;
    validate_rating(form.rating.flatten())?;

    let existing = match_participations::table
        .filter(match_participations::match_id.eq(&match_id))
        .filter(match_participations::player_id.eq(&player_id))
        .select(match_participations::id)
        .first::<String>(&mut *conn)
        .optional()?;

    let now = Utc::now().naive_utc();
    let participation_id = match existing {
        Some(id) => {
            let changes = ParticipationChanges {
                starter: form.starter,
                minutes_played: form.minutes_played.map(Some),
                rating: form.rating,
                notes: form.notes.map(|n| non_blank(n.as_deref())),
                updated_at: now,
            };
            diesel::update(
                match_participations::table
                    .filter(match_participations::id.eq(&id)),
            )
            .set(changes)
            .execute(&mut *conn)?;
            id
        }
        None => {
            let id = Uuid::now_v7().to_string();
            diesel::insert_into(match_participations::table)
                .values((
                    match_participations::id.eq(&id),
                    match_participations::match_id.eq(&match_id),
                    match_participations::player_id.eq(&player_id),
                    match_participations::starter
                        .eq(form.starter.unwrap_or(false)),
                    match_participations::minutes_played
                        .eq(form.minutes_played.unwrap_or(0)),
                    match_participations::rating.eq(form.rating.flatten()),
                    match_participations::notes
                        .eq(non_blank(form.notes.flatten().as_deref())),
                    match_participations::created_at.eq(now),
                    match_participations::updated_at.eq(now),
                ))
                .execute(&mut *conn)?;
            id
        }
    };

    let participation = match_participations::table
        .filter(match_participations::id.eq(&participation_id))
        .select(Participation::as_select())
        .first::<Participation>(&mut *conn)?;

    success(ParticipationWithPlayer {
        participation,
        player,
    })
}
