use std::collections::HashMap;

use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    matches::{Match, Outcome, events::MatchEvent},
    players::Player,
    teams::Team,
};

/// Number of active players needed to field a full eleven.
pub const FULL_SQUAD: usize = 11;
const TOP_SCORERS: usize = 3;
const RECENT_RESULTS: usize = 5;

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub total_matches: usize,
    pub points_percentage: u32,
    pub active_players: usize,
    pub squad_complete: bool,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopScorer {
    pub player_id: String,
    pub name: String,
    pub goals: usize,
    pub appearances: usize,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecentResult {
    pub id: String,
    pub opponent_name: String,
    pub kickoff_at: NaiveDateTime,
    pub goals_for: Option<i32>,
    pub goals_against: Option<i32>,
    pub outcome: Option<Outcome>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoalStats {
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
    pub total_matches: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub team: Team,
    pub next_match: Option<Match>,
    pub summary: Summary,
    pub top_scorers: Vec<TopScorer>,
    pub recent_results: Vec<RecentResult>,
    pub stats: GoalStats,
}

/// Everything the overview is computed from.
pub struct OverviewInput<'a> {
    pub team: Team,
    pub next_match: Option<Match>,
    pub active_players: usize,
    /// The team's finished matches.
    pub finished: &'a [Match],
    /// Goal events of the finished matches.
    pub goals: &'a [MatchEvent],
    /// One player id per participation in a finished match.
    pub appearances: &'a [String],
    pub players: &'a HashMap<String, Player>,
}

/// `round((3W + D) / 3N * 100)`, or zero when nothing has been played.
pub fn points_percentage(wins: usize, draws: usize, played: usize) -> u32 {
    if played == 0 {
        return 0;
    }
    ((wins * 3 + draws) as f64 / (played * 3) as f64 * 100.0).round() as u32
}

impl Overview {
    pub fn compute(input: OverviewInput<'_>) -> Overview {
        let outcomes = input
            .finished
            .iter()
            .filter_map(Match::outcome)
            .counts();
        let count = |o: Outcome| outcomes.get(&o).copied().unwrap_or(0);
        let (wins, draws, losses) =
            (count(Outcome::Win), count(Outcome::Draw), count(Outcome::Loss));
        let total_matches = input.finished.len();

        let appearances = input.appearances.iter().counts();
        let top_scorers = input
            .goals
            .iter()
            .map(|e| &e.player_id)
            .counts()
            .into_iter()
            .map(|(player_id, goals)| TopScorer {
                player_id: player_id.clone(),
                name: input
                    .players
                    .get(player_id)
                    .map(|p| p.full_name.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                goals,
                appearances: appearances.get(player_id).copied().unwrap_or(0),
            })
            .sorted_by(|a, b| {
                b.goals.cmp(&a.goals).then_with(|| a.name.cmp(&b.name))
            })
            .take(TOP_SCORERS)
            .collect();

        let recent_results = input
            .finished
            .iter()
            .sorted_by(|a, b| b.kickoff_at.cmp(&a.kickoff_at))
            .take(RECENT_RESULTS)
            .map(|m| RecentResult {
                id: m.id.clone(),
                opponent_name: m.opponent_name.clone(),
                kickoff_at: m.kickoff_at,
                goals_for: m.goals_for,
                goals_against: m.goals_against,
                outcome: m.outcome(),
            })
            .collect();

        let goals_for = input
            .finished
            .iter()
            .map(|m| i64::from(m.goals_for.unwrap_or(0)))
            .sum::<i64>();
        let goals_against = input
            .finished
            .iter()
            .map(|m| i64::from(m.goals_against.unwrap_or(0)))
            .sum::<i64>();

        Overview {
            team: input.team,
            next_match: input.next_match,
            summary: Summary {
                wins,
                draws,
                losses,
                total_matches,
                points_percentage: points_percentage(wins, draws, total_matches),
                active_players: input.active_players,
                squad_complete: input.active_players >= FULL_SQUAD,
            },
            top_scorers,
            recent_results,
            stats: GoalStats {
                goals_for,
                goals_against,
                goal_difference: goals_for - goals_against,
                total_matches,
                wins,
                draws,
                losses,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::matches::{
        MatchStatus, events::EventKind, test_match,
    };

    fn team() -> Team {
        let at = chrono::NaiveDate::from_ymd_opt(2020, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Team {
            id: "team".to_string(),
            name: "Minos FC".to_string(),
            shield_img: None,
            city: Some("Recife".to_string()),
            state_code: Some("PE".to_string()),
            founded_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn player(id: &str, name: &str) -> Player {
        let at = team().created_at;
        Player {
            id: id.to_string(),
            team_id: "team".to_string(),
            full_name: name.to_string(),
            main_position: "FW".to_string(),
            dominant_foot: "right".to_string(),
            birth_date: None,
            phone: None,
            photo_url: None,
            active: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn goal(game: &Match, scorer: &str) -> MatchEvent {
        MatchEvent {
            id: format!("{}-{scorer}", game.id),
            match_id: game.id.clone(),
            player_id: scorer.to_string(),
            kind: EventKind::Goal.as_str().to_string(),
            minute: 30,
            related_player_id: None,
            note: None,
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }

    #[test]
    fn points_percentage_rounds() {
        assert_eq!(points_percentage(0, 0, 0), 0);
        assert_eq!(points_percentage(2, 1, 4), 58);
        assert_eq!(points_percentage(3, 0, 3), 100);
        assert_eq!(points_percentage(0, 1, 3), 11);
    }

    #[test]
    fn overview_of_a_short_season() {
        let mut finished = vec![
            test_match("m1", MatchStatus::Finished, Some((2, 0))),
            test_match("m2", MatchStatus::Finished, Some((1, 1))),
            test_match("m3", MatchStatus::Finished, Some((3, 1))),
            test_match("m4", MatchStatus::Finished, Some((0, 2))),
            // no score recorded
            test_match("m5", MatchStatus::Finished, None),
        ];
        for (i, m) in finished.iter_mut().enumerate() {
            m.kickoff_at += Duration::days(i as i64);
        }

        let goals = vec![
            goal(&finished[0], "ana"),
            goal(&finished[0], "bia"),
            goal(&finished[1], "bia"),
            goal(&finished[2], "ana"),
            goal(&finished[2], "caio"),
            goal(&finished[2], "duda"),
        ];
        let appearances = ["ana", "ana", "ana", "bia", "bia", "caio", "duda"]
            .map(str::to_string);
        let players = [
            player("ana", "Ana"),
            player("bia", "Bia"),
            player("caio", "Caio"),
            player("duda", "Duda"),
        ]
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect::<HashMap<_, _>>();

        let overview = Overview::compute(OverviewInput {
            team: team(),
            next_match: None,
            active_players: 11,
            finished: &finished,
            goals: &goals,
            appearances: &appearances,
            players: &players,
        });

        assert_eq!(
            overview.summary,
            Summary {
                wins: 2,
                draws: 1,
                losses: 1,
                total_matches: 5,
                points_percentage: 47,
                active_players: 11,
                squad_complete: true,
            }
        );

        let scorers = overview
            .top_scorers
            .iter()
            .map(|s| (s.name.as_str(), s.goals, s.appearances))
            .collect::<Vec<_>>();
        assert_eq!(scorers, vec![("Ana", 2, 3), ("Bia", 2, 2), ("Caio", 1, 1)]);

        assert_eq!(overview.recent_results.len(), 5);
        assert_eq!(overview.recent_results[0].id, "m5");
        assert_eq!(overview.recent_results[0].outcome, None);
        assert_eq!(overview.recent_results[1].outcome, Some(Outcome::Loss));

        assert_eq!(overview.stats.goals_for, 6);
        assert_eq!(overview.stats.goals_against, 4);
        assert_eq!(overview.stats.goal_difference, 2);
    }

    #[test]
    fn squad_incomplete_below_eleven() {
        let players = HashMap::new();
        let overview = Overview::compute(OverviewInput {
            team: team(),
            next_match: None,
            active_players: 10,
            finished: &[],
            goals: &[],
            appearances: &[],
            players: &players,
        });
        assert!(!overview.summary.squad_complete);
        assert_eq!(overview.summary.points_percentage, 0);
        assert!(overview.top_scorers.is_empty());
    }
}
