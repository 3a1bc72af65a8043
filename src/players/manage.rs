use axum::extract::Path;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    players::{DominantFoot, Player, PlayerWithTeam},
    schema::{lineup_players, lineups, players, teams},
    state::Conn,
    teams::Team,
    util_resp::{
        FailureResponse, JsonBody, QueryParams, StandardResponse, bad_request,
        created, err_not_found, message, success,
    },
    validation::{deserialize_some, non_blank, parse_datetime},
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerListQuery {
    team_id: Option<String>,
    active: Option<String>,
    position: Option<String>,
}

#[tracing::instrument(skip(conn))]
pub async fn list_players(
    QueryParams(query): QueryParams<PlayerListQuery>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let mut q = players::table.inner_join(teams::table).into_boxed();
    if let Some(team_id) = non_blank(query.team_id.as_deref()) {
        q = q.filter(players::team_id.eq(team_id));
    }
    if let Some(active) = non_blank(query.active.as_deref()) {
        q = q.filter(players::active.eq(active == "true"));
    }
    if let Some(position) = non_blank(query.position.as_deref()) {
        q = q.filter(players::main_position.eq(position));
    }

    let players = q
        .order_by((players::active.desc(), players::full_name.asc()))
        .select((Player::as_select(), Team::as_select()))
        .load::<(Player, Team)>(&mut *conn)?
        .into_iter()
        .map(PlayerWithTeam::from)
        .collect::<Vec<_>>();

    success(players)
}

fn parse_foot(foot: &str) -> Result<DominantFoot, FailureResponse> {
    foot.parse().map_err(|foot| {
        FailureResponse::BadRequest(format!("Invalid dominant foot: {foot}"))
    })
}

fn parse_birth_date(
    input: Option<&str>,
) -> Result<Option<NaiveDateTime>, FailureResponse> {
    match non_blank(input) {
        Some(s) => parse_datetime(&s).map(Some).ok_or_else(|| {
            FailureResponse::BadRequest("Invalid birth date".to_string())
        }),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayerForm {
    team_id: Option<String>,
    full_name: Option<String>,
    main_position: Option<String>,
    dominant_foot: Option<String>,
    birth_date: Option<String>,
    phone: Option<String>,
    photo_url: Option<String>,
    active: Option<bool>,
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_create_player(
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<CreatePlayerForm>,
) -> StandardResponse {
    let (Some(team_id), Some(full_name), Some(main_position), Some(foot)) = (
        non_blank(form.team_id.as_deref()),
        non_blank(form.full_name.as_deref()),
        non_blank(form.main_position.as_deref()),
        non_blank(form.dominant_foot.as_deref()),
    ) else {
        return bad_request(
            "teamId, fullName, mainPosition and dominantFoot are required",
        );
    };

    Team::fetch(&team_id, &mut *conn)?;
    let foot = parse_foot(&foot)?;
    let birth_date = parse_birth_date(form.birth_date.as_deref())?;

    let id = Uuid::now_v7().to_string();
    let now = Utc::now().naive_utc();

    diesel::insert_into(players::table)
        .values((
            players::id.eq(&id),
            players::team_id.eq(&team_id),
            players::full_name.eq(&full_name),
            players::main_position.eq(&main_position),
            players::dominant_foot.eq(foot.as_str()),
            players::birth_date.eq(birth_date),
            players::phone.eq(non_blank(form.phone.as_deref())),
            players::photo_url.eq(non_blank(form.photo_url.as_deref())),
            players::active.eq(form.active.unwrap_or(true)),
            players::created_at.eq(now),
            players::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;

    tracing::info!(player_id = %id, %team_id, "created player");

    created(Player::fetch_with_team(&id, &mut *conn)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerForm {
    team_id: Option<String>,
    full_name: Option<String>,
    main_position: Option<String>,
    dominant_foot: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    birth_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    photo_url: Option<Option<String>>,
    active: Option<bool>,
}

#[derive(AsChangeset)]
#[diesel(table_name = players)]
struct PlayerChanges {
    team_id: Option<String>,
    full_name: Option<String>,
    main_position: Option<String>,
    dominant_foot: Option<String>,
    birth_date: Option<Option<NaiveDateTime>>,
    phone: Option<Option<String>>,
    photo_url: Option<Option<String>>,
    active: Option<bool>,
    updated_at: NaiveDateTime,
}

/// Lineups only hold players of their own team, so a transferred player is
/// taken out of the lineups of every other team.
fn leave_other_teams_lineups(
    player_id: &str,
    team_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), FailureResponse> {
    let other_lineups = lineups::table
        .filter(lineups::team_id.ne(team_id))
        .select(lineups::id);

    let n = diesel::delete(
        lineup_players::table
            .filter(lineup_players::player_id.eq(player_id))
            .filter(lineup_players::lineup_id.eq_any(other_lineups)),
    )
    .execute(conn)?;

    if n > 0 {
        tracing::info!(
            %player_id,
            %team_id,
            n,
            "removed transferred player from lineups"
        );
    }

    Ok(())
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_update_player(
    Path(player_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<UpdatePlayerForm>,
) -> StandardResponse {
    let player = Player::fetch(&player_id, &mut *conn)?;

    let team_id = non_blank(form.team_id.as_deref());
    if let Some(team_id) = &team_id {
        Team::fetch(team_id, &mut *conn)?;
        if *team_id != player.team_id {
            leave_other_teams_lineups(&player_id, team_id, &mut *conn)?;
        }
    }

    let changes = PlayerChanges {
        team_id,
        full_name: non_blank(form.full_name.as_deref()),
        main_position: non_blank(form.main_position.as_deref()),
        dominant_foot: match non_blank(form.dominant_foot.as_deref()) {
            Some(foot) => Some(parse_foot(&foot)?.as_str().to_string()),
            None => None,
        },
        birth_date: match form.birth_date {
            Some(date) => Some(parse_birth_date(date.as_deref())?),
            None => None,
        },
        phone: form.phone.map(|p| non_blank(p.as_deref())),
        photo_url: form.photo_url.map(|p| non_blank(p.as_deref())),
        active: form.active,
        updated_at: Utc::now().naive_utc(),
    };

    diesel::update(players::table.filter(players::id.eq(&player_id)))
        .set(changes)
        .execute(&mut *conn)?;

    success(Player::fetch_with_team(&player_id, &mut *conn)?)
}

#[tracing::instrument(skip(conn))]
pub async fn do_delete_player(
    Path(player_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let n = diesel::delete(players::table.filter(players::id.eq(&player_id)))
        .execute(&mut *conn)?;

    if n == 0 {
        return err_not_found("Player not found");
    }

    tracing::info!(%player_id, "deleted player");

    message("Player deleted")
}
