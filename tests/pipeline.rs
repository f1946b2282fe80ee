use chrono::NaiveDate;
use league_plusminus::event_log::{EventKind, LineupEntry, Match, MatchEvent};
use league_plusminus::{RatingConfig, compute_ratings};

fn played(id: &str, day: u32, home: &str, away: &str, hs: u32, as_: u32) -> Match {
    Match {
        id: id.into(),
        home_team: home.into(),
        away_team: away.into(),
        date: NaiveDate::from_ymd_opt(2025, 9, day),
        home_score: Some(hs),
        away_score: Some(as_),
    }
}

fn event(match_id: &str, minute: &str, kind: EventKind, team: &str, player: &str) -> MatchEvent {
    MatchEvent {
        match_id: match_id.into(),
        minute: minute.into(),
        kind,
        team: team.into(),
        player: player.into(),
    }
}

fn starters(match_id: &str, team: &str, players: &[&str]) -> Vec<LineupEntry> {
    players
        .iter()
        .map(|p| LineupEntry {
            match_id: match_id.into(),
            team: team.into(),
            player: (*p).to_string(),
            starting: true,
            minutes_played: 90,
        })
        .collect()
}

/// Four teams, one round-robin half, goals, a substitution, a red card and
/// an own goal. Small but exercises every event path.
fn season() -> (Vec<Match>, Vec<MatchEvent>, Vec<LineupEntry>) {
    let matches = vec![
        played("m1", 6, "Ajax", "Brugge", 2, 1),
        played("m2", 7, "Cercle", "Dender", 0, 0),
        played("m3", 13, "Ajax", "Cercle", 1, 1),
        played("m4", 14, "Dender", "Brugge", 0, 2),
    ];

    let mut lineups = Vec::new();
    for (mid, home, away) in [
        ("m1", "Ajax", "Brugge"),
        ("m2", "Cercle", "Dender"),
        ("m3", "Ajax", "Cercle"),
        ("m4", "Dender", "Brugge"),
    ] {
        for (team, prefix) in [(home, home), (away, away)] {
            let names: Vec<String> = (1..=4).map(|i| format!("{prefix} P{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            lineups.extend(starters(mid, team, &refs));
        }
    }
    // A bench player who comes on in m1.
    lineups.push(LineupEntry {
        match_id: "m1".into(),
        team: "Ajax".into(),
        player: "Ajax P5".into(),
        starting: false,
        minutes_played: 30,
    });

    let events = vec![
        event("m1", "12", EventKind::Goal, "Ajax", "Ajax P1"),
        event("m1", "40", EventKind::YellowCard, "Brugge", "Brugge P2"),
        event("m1", "45+1", EventKind::Penalty, "Brugge", "Brugge P1"),
        event("m1", "60", EventKind::SubstituteOut, "Ajax", "Ajax P4"),
        event("m1", "60", EventKind::SubstituteIn, "Ajax", "Ajax P5"),
        event("m1", "78", EventKind::Goal, "Ajax", "Ajax P5"),
        event("m3", "25", EventKind::OwnGoal, "Cercle", "Cercle P3"),
        event("m3", "52", EventKind::RedCard, "Ajax", "Ajax P2"),
        event("m3", "80", EventKind::Goal, "Cercle", "Cercle P1"),
        event("m4", "10", EventKind::Goal, "Brugge", "Brugge P1"),
        event("m4", "90+3", EventKind::Goal, "Brugge", "Brugge P3"),
    ];

    (matches, events, lineups)
}

#[test]
fn season_produces_full_rating_table() {
    let (matches, events, lineups) = season();
    let report = compute_ratings(&matches, &events, &lineups, &RatingConfig::default()).unwrap();

    // 4 starters per team, plus the Ajax substitute.
    assert_eq!(report.players.len(), 17);
    let mut names: Vec<&str> = report.players.iter().map(|p| p.player.as_str()).collect();
    let sorted = {
        let mut s = names.clone();
        s.sort();
        s
    };
    assert_eq!(names, sorted, "players must come out in name order");
    names.dedup();
    assert_eq!(names.len(), 17);

    for row in &report.players {
        assert!(row.rapm_total_per90.is_finite());
        assert!(row.rapm_off_per90.is_some());
        assert!(row.rapm_def_per90.is_some());
        assert!(row.rapm_se.is_some());
        assert!(row.xppm_per90.is_some());
        assert!(row.xppm_z.is_some());
        let (lo, hi) = (row.rapm_ci_low.unwrap(), row.rapm_ci_high.unwrap());
        assert!(lo <= row.rapm_total_per90 && row.rapm_total_per90 <= hi);
    }

    // Every team played 2 matches.
    assert_eq!(report.teams.len(), 4);
    for series in report.teams.values() {
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].round, 1);
        assert_eq!(series[1].round, 2);
    }
    // Brugge won m4 2-0 away.
    assert_eq!(report.teams["Brugge"][1].result, 'W');
    assert_eq!(report.teams["Brugge"][1].goal_diff, 2);
}

#[test]
fn identical_inputs_yield_byte_identical_output() {
    let (matches, events, lineups) = season();
    let cfg = RatingConfig::default();
    let one = compute_ratings(&matches, &events, &lineups, &cfg).unwrap();
    let two = compute_ratings(&matches, &events, &lineups, &cfg).unwrap();
    assert_eq!(
        serde_json::to_string(&one).unwrap(),
        serde_json::to_string(&two).unwrap()
    );

    // Shuffled input order must not change the output either: the pipeline
    // re-sorts chronologically.
    let mut reversed = matches.clone();
    reversed.reverse();
    let three = compute_ratings(&reversed, &events, &lineups, &cfg).unwrap();
    assert_eq!(
        serde_json::to_string(&one).unwrap(),
        serde_json::to_string(&three).unwrap()
    );
}

#[test]
fn heavier_shrinkage_pulls_ratings_toward_zero() {
    let (matches, events, lineups) = season();
    let loose = compute_ratings(&matches, &events, &lineups, &RatingConfig::default()).unwrap();
    let tight = compute_ratings(
        &matches,
        &events,
        &lineups,
        &RatingConfig {
            rapm_alpha: 1e9,
            ..Default::default()
        },
    )
    .unwrap();

    let max_loose = loose
        .players
        .iter()
        .map(|p| p.rapm_total_per90.abs())
        .fold(0.0_f64, f64::max);
    let max_tight = tight
        .players
        .iter()
        .map(|p| p.rapm_total_per90.abs())
        .fold(0.0_f64, f64::max);
    assert!(max_loose > 0.0);
    assert!(max_tight < 1e-6);
}

#[test]
fn future_matches_rank_without_affecting_ratings() {
    let (mut matches, events, lineups) = season();
    matches.push(Match {
        id: "m5".into(),
        home_team: "Ajax".into(),
        away_team: "Dender".into(),
        date: NaiveDate::from_ymd_opt(2025, 9, 21),
        home_score: None,
        away_score: None,
    });

    let with_future =
        compute_ratings(&matches, &events, &lineups, &RatingConfig::default()).unwrap();
    let (base_matches, ..) = season();
    let without =
        compute_ratings(&base_matches, &events, &lineups, &RatingConfig::default()).unwrap();

    // The unplayed fixture adds no team series point and no player change.
    assert_eq!(
        serde_json::to_string(&with_future.teams).unwrap(),
        serde_json::to_string(&without.teams).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&with_future.players).unwrap(),
        serde_json::to_string(&without.players).unwrap()
    );
}
