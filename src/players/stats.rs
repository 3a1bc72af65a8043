use std::collections::BTreeMap;

use axum::extract::Path;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    auth::User,
    matches::{
        Match, MatchKind,
        events::{EventKind, MatchEvent},
        participations::Participation,
    },
    players::{Player, PlayerWithTeam},
    schema::{match_events, match_participations, matches},
    state::Conn,
    util_resp::{StandardResponse, success},
};

const RECENT_MATCHES: usize = 5;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub matches: usize,
    pub starts: usize,
    pub bench_appearances: usize,
    pub minutes_played: i64,
    pub average_minutes: i64,
    pub average_rating: Option<f64>,
    pub goals: usize,
    pub assists: usize,
    pub yellow_cards: usize,
    pub red_cards: usize,
    pub goals_per_match: f64,
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct KindStats {
    pub matches: usize,
    pub goals: usize,
    pub assists: usize,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub goals_for: Option<i32>,
    pub goals_against: Option<i32>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentMatch {
    pub id: String,
    pub opponent_name: String,
    pub kickoff_at: NaiveDateTime,
    pub kind: String,
    pub starter: bool,
    pub minutes_played: Option<i32>,
    pub rating: Option<f64>,
    /// Only present once the match is finished.
    pub result: Option<Score>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub summary: StatsSummary,
    pub by_kind: BTreeMap<&'static str, KindStats>,
    pub recent_matches: Vec<RecentMatch>,
}

impl PlayerStats {
    /// Computes the statistics of one player.
    ///
    /// `events` must contain every event in which the player is either the
    /// main or the related player.
    pub fn compute(
        player_id: &str,
        participations: &[(Participation, Match)],
        events: &[(MatchEvent, Match)],
    ) -> PlayerStats {
        let matches = participations.len();
        let starts = participations.iter().filter(|(p, _)| p.starter).count();
        let minutes_played = participations
            .iter()
            .map(|(p, _)| i64::from(p.minutes_played.unwrap_or(0)))
            .sum::<i64>();

        let ratings = participations
            .iter()
            .filter_map(|(p, _)| p.rating)
            .collect::<Vec<_>>();
        let average_rating = (!ratings.is_empty()).then(|| {
            round_to(ratings.iter().sum::<f64>() / ratings.len() as f64, 2)
        });

        let scored = |(e, _): &&(MatchEvent, Match)| {
            e.is(EventKind::Goal) && e.player_id == player_id
        };
        let assisted = |(e, _): &&(MatchEvent, Match)| {
            e.is(EventKind::Goal)
                && e.related_player_id.as_deref() == Some(player_id)
        };
        let booked = |kind: EventKind| {
            events
                .iter()
                .filter(|(e, _)| e.is(kind) && e.player_id == player_id)
                .count()
        };

        let goals = events.iter().filter(scored).count();
        let assists = events.iter().filter(assisted).count();

        let mut by_kind = MatchKind::ALL
            .iter()
            .map(|kind| (kind.as_str(), KindStats::default()))
            .collect::<BTreeMap<_, _>>();
        for (_, game) in participations {
            if let Some(stats) = by_kind.get_mut(game.kind.as_str()) {
                stats.matches += 1;
            }
        }
        for (_, game) in events.iter().filter(scored) {
            if let Some(stats) = by_kind.get_mut(game.kind.as_str()) {
                stats.goals += 1;
            }
        }
        for (_, game) in events.iter().filter(assisted) {
            if let Some(stats) = by_kind.get_mut(game.kind.as_str()) {
                stats.assists += 1;
            }
        }

        let mut recent = participations.iter().collect::<Vec<_>>();
        recent.sort_by(|(_, a), (_, b)| b.kickoff_at.cmp(&a.kickoff_at));
        let recent_matches = recent
            .into_iter()
            .take(RECENT_MATCHES)
            .map(|(p, game)| RecentMatch {
                id: game.id.clone(),
                opponent_name: game.opponent_name.clone(),
                kickoff_at: game.kickoff_at,
                kind: game.kind.clone(),
                starter: p.starter,
                minutes_played: p.minutes_played,
                rating: p.rating,
                result: game.is_finished().then(|| Score {
                    goals_for: game.goals_for,
                    goals_against: game.goals_against,
                }),
            })
            .collect();

        let (average_minutes, goals_per_match) = match matches {
            0 => (0, 0.0),
            n => (
                (minutes_played as f64 / n as f64).round() as i64,
                round_to(goals as f64 / n as f64, 2),
            ),
        };

        PlayerStats {
            summary: StatsSummary {
                matches,
                starts,
                bench_appearances: matches - starts,
                minutes_played,
                average_minutes,
                average_rating,
                goals,
                assists,
                yellow_cards: booked(EventKind::YellowCard),
                red_cards: booked(EventKind::RedCard),
                goals_per_match,
            },
            by_kind,
            recent_matches,
        }
    }
}

#[derive(Serialize)]
struct StatsResponse {
    player: PlayerWithTeam,
    #[serde(flatten)]
    stats: PlayerStats,
}

#[tracing::instrument(skip(conn))]
pub async fn player_stats(
    Path(player_id): Path<String>,
    _user: User,
    mut conn: Conn,
) -> StandardResponse {
    let player = Player::fetch_with_team(&player_id, &mut *conn)?;

    let participations = match_participations::table
        .inner_join(matches::table)
        .filter(match_participations::player_id.eq(&player_id))
        .select((Participation::as_select(), Match::as_select()))
        .load::<(Participation, Match)>(&mut *conn)?;

    let events = match_events::table
        .inner_join(matches::table)
        .filter(
            match_events::player_id
                .eq(&player_id)
                .or(match_events::related_player_id.eq(&player_id)),
        )
        .select((MatchEvent::as_select(), Match::as_select()))
        .load::<(MatchEvent, Match)>(&mut *conn)?;

    let stats = PlayerStats::compute(&player_id, &participations, &events);

    success(StatsResponse { player, stats })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::matches::{MatchStatus, test_match};

    fn participation(
        game: &Match,
        starter: bool,
        minutes: i32,
        rating: Option<f64>,
    ) -> (Participation, Match) {
        (
            Participation {
                id: format!("part-{}", game.id),
                match_id: game.id.clone(),
                player_id: "p1".to_string(),
                starter,
                minutes_played: Some(minutes),
                rating,
                notes: None,
                created_at: game.created_at,
                updated_at: game.updated_at,
            },
            game.clone(),
        )
    }

    fn event(
        game: &Match,
        kind: EventKind,
        player: &str,
        related: Option<&str>,
    ) -> (MatchEvent, Match) {
        (
            MatchEvent {
                id: format!("{}-{}-{player}", game.id, kind),
                match_id: game.id.clone(),
                player_id: player.to_string(),
                kind: kind.as_str().to_string(),
                minute: 10,
                related_player_id: related.map(str::to_string),
                note: None,
                created_at: game.created_at,
                updated_at: game.updated_at,
            },
            game.clone(),
        )
    }

    #[test]
    fn no_participations_gives_zeroes() {
        let stats = PlayerStats::compute("p1", &[], &[]);
        assert_eq!(stats.summary.matches, 0);
        assert_eq!(stats.summary.average_minutes, 0);
        assert_eq!(stats.summary.average_rating, None);
        assert_eq!(stats.summary.goals_per_match, 0.0);
        assert_eq!(stats.by_kind.len(), 3);
        assert!(stats.recent_matches.is_empty());
    }

    #[test]
    fn summarises_goals_assists_and_cards() {
        let a = test_match("a", MatchStatus::Finished, Some((3, 1)));
        let mut b = test_match("b", MatchStatus::Scheduled, None);
        b.kind = MatchKind::Friendly.as_str().to_string();
        b.kickoff_at += Duration::days(7);
        let c = test_match("c", MatchStatus::Finished, Some((0, 0)));

        let participations = vec![
            participation(&a, true, 90, Some(7.5)),
            participation(&b, false, 25, None),
            participation(&c, true, 60, Some(6.0)),
        ];
        let events = vec![
            event(&a, EventKind::Goal, "p1", Some("p2")),
            event(&a, EventKind::Goal, "p2", Some("p1")),
            event(&b, EventKind::Goal, "p1", None),
            event(&c, EventKind::YellowCard, "p1", None),
            event(&c, EventKind::Substitution, "p3", Some("p1")),
        ];

        let stats = PlayerStats::compute("p1", &participations, &events);

        assert_eq!(stats.summary.matches, 3);
        assert_eq!(stats.summary.starts, 2);
        assert_eq!(stats.summary.bench_appearances, 1);
        assert_eq!(stats.summary.minutes_played, 175);
        assert_eq!(stats.summary.average_minutes, 58);
        assert_eq!(stats.summary.average_rating, Some(6.75));
        assert_eq!(stats.summary.goals, 2);
        assert_eq!(stats.summary.assists, 1);
        assert_eq!(stats.summary.yellow_cards, 1);
        assert_eq!(stats.summary.red_cards, 0);
        assert_eq!(stats.summary.goals_per_match, 0.67);

        assert_eq!(
            stats.by_kind["league"],
            KindStats {
                matches: 2,
                goals: 1,
                assists: 1
            }
        );
        assert_eq!(
            stats.by_kind["friendly"],
            KindStats {
                matches: 1,
                goals: 1,
                assists: 0
            }
        );
        assert_eq!(stats.by_kind["training"], KindStats::default());

        // the friendly is a week later than the other two
        assert_eq!(stats.recent_matches[0].id, "b");
        assert_eq!(stats.recent_matches[0].result, None);
        assert!(stats.recent_matches.iter().any(|m| m.result
            == Some(Score {
                goals_for: Some(3),
                goals_against: Some(1)
            })));
    }
}
