use axum::extract::Path;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    schema::teams,
    state::Conn,
    teams::Team,
    util_resp::{
        FailureResponse, JsonBody, StandardResponse, bad_request, created,
        success,
    },
    validation::{
        deserialize_some, is_valid_state_code, non_blank, parse_datetime,
    },
};

fn validate_name(name: &str) -> Result<(), FailureResponse> {
    if !(2..=100).contains(&name.chars().count()) {
        return Err(FailureResponse::BadRequest(
            "Team name must be between 2 and 100 characters".to_string(),
        ));
    }
    Ok(())
}

fn parse_state_code(code: Option<&str>) -> Result<Option<String>, FailureResponse> {
    match non_blank(code) {
        Some(code) => {
            let code = code.to_uppercase();
            is_valid_state_code(&code).map_err(FailureResponse::BadRequest)?;
            Ok(Some(code))
        }
        None => Ok(None),
    }
}

fn parse_founded_at(
    input: Option<&str>,
) -> Result<Option<NaiveDateTime>, FailureResponse> {
    match non_blank(input) {
        Some(s) => parse_datetime(&s).map(Some).ok_or_else(|| {
            FailureResponse::BadRequest("Invalid foundation date".to_string())
        }),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamForm {
    name: Option<String>,
    shield_img: Option<String>,
    city: Option<String>,
    state_code: Option<String>,
    founded_at: Option<String>,
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_create_team(
    user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<CreateTeamForm>,
) -> StandardResponse {
    let Some(name) = non_blank(form.name.as_deref()) else {
        return bad_request("Team name is required");
    };
    validate_name(&name)?;

    let state_code = parse_state_code(form.state_code.as_deref())?;
    let founded_at = parse_founded_at(form.founded_at.as_deref())?;

    let id = Uuid::now_v7().to_string();
    let now = Utc::now().naive_utc();

    let n = diesel::insert_into(teams::table)
        .values((
            teams::id.eq(&id),
            teams::name.eq(&name),
            teams::shield_img.eq(non_blank(form.shield_img.as_deref())),
            teams::city.eq(non_blank(form.city.as_deref())),
            teams::state_code.eq(state_code),
            teams::founded_at.eq(founded_at),
            teams::created_at.eq(now),
            teams::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;
    assert_eq!(n, 1);

    tracing::info!(team_id = %id, user_id = %user.id, "created team");

    created(Team::fetch(&id, &mut *conn)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamForm {
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    shield_img: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    city: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    state_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    founded_at: Option<Option<String>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = teams)]
struct TeamChanges {
    name: Option<String>,
    shield_img: Option<Option<String>>,
    city: Option<Option<String>>,
    state_code: Option<Option<String>>,
    founded_at: Option<Option<NaiveDateTime>>,
    updated_at: NaiveDateTime,
}

#[tracing::instrument(skip(conn, form))]
pub async fn do_update_team(
    Path(team_id): Path<String>,
    _user: User,
    mut conn: Conn,
    JsonBody(form): JsonBody<UpdateTeamForm>,
) -> StandardResponse {
    Team::fetch(&team_id, &mut *conn)?;

    let name = non_blank(form.name.as_deref());
    if let Some(name) = &name {
        validate_name(name)?;
    }

    let changes = TeamChanges {
        name,
        shield_img: form.shield_img.map(|s| non_blank(s.as_deref())),
        city: form.city.map(|s| non_blank(s.as_deref())),
        state_code: match form.state_code {
            Some(code) => Some(parse_state_code(code.as_deref())?),
            None => None,
        },
        founded_at: match form.founded_at {
            Some(date) => Some(parse_founded_at(date.as_deref())?),
            None => None,
        },
        updated_at: Utc::now().naive_utc(),
    };

    diesel::update(teams::table.filter(teams::id.eq(&team_id)))
        .set(changes)
        .execute(&mut *conn)?;

    success(Team::fetch(&team_id, &mut *conn)?)
}
