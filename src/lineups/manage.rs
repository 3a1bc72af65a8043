use axum::extract::Path;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    lineups::{Lineup, LineupDetail},
    players::{Player, reject_duplicates},
    schema::{lineup_players, lineups},
    state::Conn,
    teams::Team,
    util_resp::{
        FailureResponse, JsonBody, QueryParams, StandardResponse, bad_request,
        created, err_not_found, message, success,
    },
    validation::{deserialize_some, non_blank},
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LineupListQuery {
    team_id: Option<String>,
    active: Option<String>,
}

#[tracing::instrument(skip(conn))]
pub async fn list_lineups(
    QueryParams(query): QueryParams<LineupListQuery>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let mut q = lineups::table.into_boxed();
    if let Some(team_id) = non_blank(query.team_id.as_deref()) {
        q = q.filter(lineups::team_id.eq(team_id));
    }
    if let Some(active) = non_blank(query.active.as_deref()) {
        q = q.filter(lineups::active.eq(active == "true"));
    }

    let found = q
        .order_by((lineups::active.desc(), lineups::updated_at.desc()))
        .select(Lineup::as_select())
        .load::<Lineup>(&mut *conn)?;

    success(LineupDetail::load_many(found, &mut *conn)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupEntryForm {
    player_id: Option<String>,
    starter: Option<bool>,
    field_position: Option<String>,
    shirt_number: Option<i32>,
    sort_order: Option<i32>,
}

struct ValidEntry {
    player_id: String,
    starter: bool,
    field_position: String,
    shirt_number: Option<i32>,
    sort_order: i32,
}

/// Validates the submitted entries. The sort order defaults to the (1-based)
/// position of the entry in the list.
fn validate_entries(
    entries: Vec<LineupEntryForm>,
) -> Result<Vec<ValidEntry>, FailureResponse> {
    let entries = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let (Some(player_id), Some(field_position)) = (
                non_blank(entry.player_id.as_deref()),
                non_blank(entry.field_position.as_deref()),
            ) else {
                return Err(FailureResponse::BadRequest(
                    "Every lineup entry needs a playerId and a fieldPosition"
                        .to_string(),
                ));
            };

            if entry.shirt_number.is_some_and(|n| n < 0) {
                return Err(FailureResponse::BadRequest(
                    "Shirt numbers cannot be negative".to_string(),
                ));
            }

            Ok(ValidEntry {
                player_id,
                starter: entry.starter.unwrap_or(false),
                field_position,
                shirt_number: entry.shirt_number,
                sort_order: entry.sort_order.unwrap_or(i as i32 + 1),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ids = entries
        .iter()
        .map(|e| e.player_id.clone())
        .collect::<Vec<_>>();
    reject_duplicates(&ids)?;

    Ok(entries)
}

/// Lineups may only contain players of their own team.
fn check_players_in_team(
    team_id: &str,
    entries: &[ValidEntry],
    conn: &mut SqliteConnection,
) -> Result<(), FailureResponse> {
    let ids = entries
        .iter()
        .map(|e| e.player_id.clone())
        .collect::<Vec<_>>();
    Player::check_all_exist(&ids, conn)?;

    let players = Player::fetch_many(&ids, conn)?;
    if let Some(player) = players.values().find(|p| p.team_id != team_id) {
        return Err(FailureResponse::BadRequest(format!(
            "{} does not play for this team",
            player.full_name
        )));
    }

    Ok(())
}

fn insert_entries(
    lineup_id: &str,
    entries: &[ValidEntry],
    conn: &mut SqliteConnection,
) -> Result<(), FailureResponse> {
    if entries.is_empty() {
        return Ok(());
    }

    let now = Utc::now().naive_utc();
    let rows = entries
        .iter()
        .map(|entry| {
            (
                lineup_players::id.eq(Uuid::now_v7().to_string()),
                lineup_players::lineup_id.eq(lineup_id),
                lineup_players::player_id.eq(&entry.player_id),
                lineup_players::starter.eq(entry.starter),
                lineup_players::field_position.eq(&entry.field_position),
                lineup_players::shirt_number.eq(entry.shirt_number),
                lineup_players::sort_order.eq(entry.sort_order),
                lineup_players::created_at.eq(now),
                lineup_players::updated_at.eq(now),
            )
        })
        .collect::<Vec<_>>();

    diesel::insert_into(lineup_players::table)
        .values(rows)
        .execute(conn)?;

    Ok(())
}

/// Only one lineup per team may be active at a time.
fn deactivate_other_lineups(
    team_id: &str,
    except: &str,
    conn: &mut SqliteConnection,
) -> Result<(), FailureResponse> {
    let n = diesel::update(
        lineups::table
            .filter(lineups::team_id.eq(team_id))
            .filter(lineups::id.ne(except))
            .filter(lineups::active.eq(true)),
    )
    .set((
        lineups::active.eq(false),
        lineups::updated_at.eq(Utc::now().naive_utc()),
    ))
    .execute(conn)?;

    if n > 0 {
        tracing::debug!(%team_id, n, "deactivated lineups");
    }

    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLineupForm {
    team_id: Option<String>,
    name: Option<String>,
    formation: Option<String>,
    description: Option<String>,
    active: Option<bool>,
    players: Option<Vec<LineupEntryForm>>,
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_create_lineup(
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<CreateLineupForm>,
) -> StandardResponse {
    let (Some(team_id), Some(name), Some(formation)) = (
        non_blank(form.team_id.as_deref()),
        non_blank(form.name.as_deref()),
        non_blank(form.formation.as_deref()),
    ) else {
        return bad_request("teamId, name and formation are required");
    };

    Team::fetch(&team_id, &mut *conn)?;

    let entries = validate_entries(form.players.unwrap_or_default())?;
    check_players_in_team(&team_id, &entries, &mut *conn)?;

    let id = Uuid::now_v7().to_string();
    let active = form.active.unwrap_or(false);
    if active {
        deactivate_other_lineups(&team_id, &id, &mut *conn)?;
    }

    let now = Utc::now().naive_utc();
    diesel::insert_into(lineups::table)
        .values((
            lineups::id.eq(&id),
            lineups::team_id.eq(&team_id),
            lineups::name.eq(&name),
            lineups::formation.eq(&formation),
            lineups::description.eq(non_blank(form.description.as_deref())),
            lineups::active.eq(active),
            lineups::created_at.eq(now),
            lineups::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;

    insert_entries(&id, &entries, &mut *conn)?;

    tracing::info!(lineup_id = %id, %team_id, "created lineup");

    created(LineupDetail::load(&id, &mut *conn)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineupForm {
    name: Option<String>,
    formation: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    description: Option<Option<String>>,
    active: Option<bool>,
    players: Option<Vec<LineupEntryForm>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = lineups)]
struct LineupChanges {
    name: Option<String>,
    formation: Option<String>,
    description: Option<Option<String>>,
    active: Option<bool>,
    updated_at: NaiveDateTime,
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_update_lineup(
    Path(lineup_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<UpdateLineupForm>,
) -> StandardResponse {
    let lineup = Lineup::fetch(&lineup_id, &mut *conn)?;

    if form.active == Some(true) {
        deactivate_other_lineups(&lineup.team_id, &lineup.id, &mut *conn)?;
    }

    let changes = LineupChanges {
        name: non_blank(form.name.as_deref()),
        formation: non_blank(form.formation.as_deref()),
        description: form.description.map(|d| non_blank(d.as_deref())),
        active: form.active,
        updated_at: Utc::now().naive_utc(),
    };

    diesel::update(lineups::table.filter(lineups::id.eq(&lineup_id)))
        .set(changes)
        .execute(&mut *conn)?;

    // rejected entries roll back the changes above
    if let Some(entries) = form.players {
        let entries = validate_entries(entries)?;
        check_players_in_team(&lineup.team_id, &entries, &mut *conn)?;

        diesel::delete(
            lineup_players::table
                .filter(lineup_players::lineup_id.eq(&lineup_id)),
        )
        .execute(&mut *conn)?;
        insert_entries(&lineup_id, &entries, &mut *conn)?;
    }

    success(LineupDetail::load(&lineup_id, &mut *conn)?)
}

#[tracing::instrument(skip(conn))]
pub async fn do_delete_lineup(
    Path(lineup_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let n = diesel::delete(lineups::table.filter(lineups::id.eq(&lineup_id)))
        .execute(&mut *conn)?;

    if n == 0 {
        return err_not_found("Lineup not found");
    }

    message("Lineup deleted")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(player: &str, sort_order: Option<i32>) -> LineupEntryForm {
        LineupEntryForm {
            player_id: Some(player.to_string()),
            starter: None,
            field_position: Some("GK".to_string()),
            shirt_number: Some(1),
            sort_order,
        }
    }

    #[test]
    fn sort_order_defaults_to_list_position() {
        let entries = validate_entries(vec![
            entry("a", None),
            entry("b", Some(7)),
            entry("c", None),
        ])
        .ok()
        .unwrap();

        assert_eq!(
            entries.iter().map(|e| e.sort_order).collect::<Vec<_>>(),
            vec![1, 7, 3]
        );
        assert!(entries.iter().all(|e| !e.starter));
    }

    #[test]
    fn entries_need_a_position() {
        let mut bad = entry("a", None);
        bad.field_position = Some(" ".to_string());
        assert!(validate_entries(vec![bad]).is_err());
    }

    #[test]
    fn players_appear_once_per_lineup() {
        match validate_entries(vec![entry("a", None), entry("a", Some(2))]) {
            Err(FailureResponse::BadRequest(msg)) => {
                assert_eq!(msg, "Player listed more than once: a")
            }
            _ => panic!("expected a bad request"),
        }
    }
}
