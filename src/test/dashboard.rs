use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::test::TestClub;

#[tokio::test]
async fn overview_needs_a_team() {
    let club = TestClub::new().await;

    let res = club.get("/api/dashboard/overview").await;
    res.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>()["error"], "Team not found");
}

#[tokio::test]
async fn overview_of_the_season() {
    let club = TestClub::new().await;
    let team_id = club.create_team("Minos FC").await;
    let other_team = club.create_team("Academia").await;

    let ana = club.create_player(&team_id, "Ana").await;
    let bia = club.create_player(&team_id, "Bia").await;

    let won = club
        .create_match(&team_id, "Sport", "2025-03-01T16:00", "finished", Some((3, 1)))
        .await;
    club.create_match(&team_id, "Santa Cruz", "2025-03-08T16:00", "finished", Some((0, 2)))
        .await;
    club.create_match(&team_id, "Central", "2025-03-15T16:00", "finished", Some((1, 1)))
        .await;
    // finished, but nobody wrote the score down
    club.create_match(&team_id, "Retrô", "2025-03-22T16:00", "finished", None)
        .await;
    club.create_match(&team_id, "Salgueiro", "2025-05-01T16:00", "scheduled", None)
        .await;
    let next = club
        .create_match(&team_id, "Afogados", "2025-04-01T16:00", "scheduled", None)
        .await;
    club.create_match(&other_team, "Petrolina", "2025-03-30T16:00", "scheduled", None)
        .await;

    club.put(
        &format!("/api/matches/{won}/participations"),
        json!({ "participations": [
            { "playerId": ana, "starter": true, "minutesPlayed": 90 },
            { "playerId": bia, "starter": true, "minutesPlayed": 90 },
        ]}),
    )
    .await
    .assert_status_ok();
    club.put(
        &format!("/api/matches/{won}/events"),
        json!({ "events": [
            { "playerId": bia, "kind": "goal", "minute": 5 },
            { "playerId": bia, "kind": "goal", "minute": 15, "relatedPlayerId": ana },
            { "playerId": ana, "kind": "goal", "minute": 80 },
            { "playerId": ana, "kind": "red_card", "minute": 85 },
        ]}),
    )
    .await
    .assert_status_ok();

    let res = club
        .server
        .get("/api/dashboard/overview")
        .add_cookie(club.session.clone())
        .add_query_param("teamId", &team_id)
        .await;
    res.assert_status_ok();
    let overview = res.json::<Value>();

    assert_eq!(overview["team"]["name"], "Minos FC");
    assert_eq!(overview["nextMatch"]["id"], next.as_str());

    let summary = &overview["summary"];
    assert_eq!(summary["wins"], 1);
    assert_eq!(summary["draws"], 1);
    assert_eq!(summary["losses"], 1);
    assert_eq!(summary["totalMatches"], 4);
    // (3 + 1) / 12
    assert_eq!(summary["pointsPercentage"], 33);
    assert_eq!(summary["activePlayers"], 2);
    assert_eq!(summary["squadComplete"], false);

    let scorers = overview["topScorers"].as_array().unwrap();
    assert_eq!(scorers.len(), 2);
    assert_eq!(scorers[0]["name"], "Bia");
    assert_eq!(scorers[0]["goals"], 2);
    assert_eq!(scorers[0]["appearances"], 1);
    assert_eq!(scorers[1]["name"], "Ana");

    let recent = overview["recentResults"].as_array().unwrap();
    assert_eq!(
        recent
            .iter()
            .map(|r| r["outcome"].clone())
            .collect::<Vec<_>>(),
        vec![Value::Null, json!("D"), json!("L"), json!("W")]
    );

    assert_eq!(overview["stats"]["goalsFor"], 4);
    assert_eq!(overview["stats"]["goalsAgainst"], 4);
    assert_eq!(overview["stats"]["goalDifference"], 0);

    // the oldest team is used when none is given
    let default = club.get("/api/dashboard/overview").await.json::<Value>();
    assert_eq!(default["team"]["id"], team_id.as_str());
}
