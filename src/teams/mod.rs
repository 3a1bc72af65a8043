use axum::extract::Path;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::User,
    schema::teams,
    state::Conn,
    util_resp::{FailureResponse, StandardResponse, success},
};

pub mod manage;

#[derive(Serialize, Deserialize, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = teams)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub shield_img: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub founded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Team {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        team_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Team, FailureResponse> {
        teams::table
            .filter(teams::id.eq(team_id))
            .select(Team::as_select())
            .first::<Team>(conn)
            .optional()?
            .ok_or_else(|| FailureResponse::NotFound("Team not found".to_string()))
    }
}

pub async fn list_teams(_user: User, mut conn: Conn) -> StandardResponse {
    let teams = teams::table
        .order_by(teams::name.asc())
        .select(Team::as_select())
        .load::<Team>(&mut *conn)?;

    success(teams)
}

pub async fn view_team(
    Path(team_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    success(Team::fetch(&team_id, &mut *conn)?)
}
