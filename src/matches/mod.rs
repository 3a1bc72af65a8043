use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{schema::matches, util_resp::FailureResponse};

pub mod events;
pub mod manage;
pub mod participations;
pub mod view;

text_enum! {
    pub enum MatchKind {
        Friendly => "friendly",
        League => "league",
        Training => "training",
    }
}

text_enum! {
    pub enum MatchStatus {
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Finished => "finished",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// The result of a match, from the club's point of view.
    pub enum Outcome {
        Win => "W",
        Draw => "D",
        Loss => "L",
    }
}

#[derive(Serialize, Deserialize, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = matches)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub team_id: String,
    pub kickoff_at: NaiveDateTime,
    pub venue: String,
    pub opponent_name: String,
    pub kind: String,
    pub status: String,
    pub goals_for: Option<i32>,
    pub goals_against: Option<i32>,
    pub coach_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Match {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        match_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Match, FailureResponse> {
        matches::table
            .filter(matches::id.eq(match_id))
            .select(Match::as_select())
            .first::<Match>(conn)
            .optional()?
            .ok_or_else(|| {
                FailureResponse::NotFound("Match not found".to_string())
            })
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished.as_str()
    }

    /// `None` unless both scores have been recorded.
    pub fn outcome(&self) -> Option<Outcome> {
        let (goals_for, goals_against) = (self.goals_for?, self.goals_against?);
        Some(match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Loss,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_match(
    id: &str,
    status: MatchStatus,
    score: Option<(i32, i32)>,
) -> Match {
    let at = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    Match {
        id: id.to_string(),
        team_id: "team".to_string(),
        kickoff_at: at,
        venue: "Municipal Stadium".to_string(),
        opponent_name: format!("Opponent {id}"),
        kind: MatchKind::League.as_str().to_string(),
        status: status.as_str().to_string(),
        goals_for: score.map(|s| s.0),
        goals_against: score.map(|s| s.1),
        coach_notes: None,
        created_at: at,
        updated_at: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_needs_both_scores() {
        let mut m = test_match("a", MatchStatus::Finished, Some((2, 1)));
        assert_eq!(m.outcome(), Some(Outcome::Win));
        m.goals_against = Some(2);
        assert_eq!(m.outcome(), Some(Outcome::Draw));
        m.goals_for = Some(0);
        assert_eq!(m.outcome(), Some(Outcome::Loss));
        m.goals_for = None;
        assert_eq!(m.outcome(), None);
    }

    #[test]
    fn kinds_parse_from_stored_text() {
        assert_eq!("league".parse::<MatchKind>(), Ok(MatchKind::League));
        assert!("campeonato".parse::<MatchKind>().is_err());
        assert_eq!(
            "in_progress".parse::<MatchStatus>(),
            Ok(MatchStatus::InProgress)
        );
        assert_eq!(MatchStatus::ALL.len(), 4);
    }
}
