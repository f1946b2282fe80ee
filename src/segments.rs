use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::Serialize;

use crate::event_log::{EventKind, LineupEntry, Match, MatchEvent};

/// A stretch of one match during which both on-field rosters and the score
/// are constant. Segments of a match partition `[0, end)`: sorted by
/// `t_start` they are contiguous and non-overlapping.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub t_start: u32,
    pub t_end: u32,
    /// Minutes, never below 1 even when two boundaries share a minute.
    pub duration: f64,
    /// Home goals scored at the closing boundary minute.
    pub gf: u32,
    /// Away goals scored at the closing boundary minute.
    pub ga: u32,
    pub gd_start: i32,
    pub gd_end: i32,
    pub man_start: i32,
    pub man_end: i32,
    /// On-field players during the segment, sorted.
    pub home_on: Vec<String>,
    pub away_on: Vec<String>,
}

/// Build segments for every match, in match order. Events and lineups are
/// matched to their match by id; matches without usable lineups are skipped.
pub fn build_segments(
    matches: &[Match],
    events: &[MatchEvent],
    lineups: &[LineupEntry],
) -> Vec<Segment> {
    let mut events_by_match: BTreeMap<&str, Vec<&MatchEvent>> = BTreeMap::new();
    for ev in events {
        events_by_match.entry(&ev.match_id).or_default().push(ev);
    }
    let mut lineups_by_match: BTreeMap<&str, Vec<&LineupEntry>> = BTreeMap::new();
    for entry in lineups {
        lineups_by_match.entry(&entry.match_id).or_default().push(entry);
    }

    let mut out = Vec::new();
    for m in matches {
        let match_events = events_by_match
            .get(m.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let match_lineups = lineups_by_match
            .get(m.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        out.extend(build_match_segments(m, match_events, match_lineups));
    }
    out
}

/// Reconstruct the continuous lineup/score timeline of one match from its
/// discrete event log.
///
/// Every minute containing a goal, a substitution or a dismissal is a
/// boundary; the open segment closes there and all of that minute's events
/// apply atomically before the next one opens. Minutes with only plain
/// yellows do not split segments.
pub fn build_match_segments(
    m: &Match,
    events: &[&MatchEvent],
    lineups: &[&LineupEntry],
) -> Vec<Segment> {
    let mut home_on = starting_side(lineups, &m.home_team);
    let mut away_on = starting_side(lineups, &m.away_team);

    if home_on.is_empty() && away_on.is_empty() {
        warn!("match {}: no usable lineups, skipping segments", m.id);
        return Vec::new();
    }

    let mut by_minute: BTreeMap<u32, Vec<&MatchEvent>> = BTreeMap::new();
    for &ev in events {
        by_minute.entry(ev.normalized_minute()).or_default().push(ev);
    }

    let boundaries: Vec<u32> = by_minute
        .iter()
        .filter(|(_, evs)| evs.iter().any(|ev| ev.kind.is_boundary()))
        .map(|(&minute, _)| minute)
        .collect();

    let mut segments = Vec::new();

    if boundaries.is_empty() {
        segments.push(make_segment(
            m, 0, 90, 0, 0, 0, 0, &home_on, &away_on, &home_on, &away_on,
        ));
        return segments;
    }

    let mut score_home: u32 = 0;
    let mut score_away: u32 = 0;
    let mut last: u32 = 0;

    for &minute in &boundaries {
        let evs = &by_minute[&minute];
        let (gf, ga) = goal_delta(evs, &m.home_team, &m.away_team);

        let mut home_next = home_on.clone();
        let mut away_next = away_on.clone();
        apply_roster_events(evs, &m.home_team, &m.away_team, &mut home_next, &mut away_next);

        segments.push(make_segment(
            m, last, minute, score_home, score_away, gf, ga, &home_on, &away_on, &home_next,
            &away_next,
        ));

        score_home += gf;
        score_away += ga;
        home_on = home_next;
        away_on = away_next;
        last = minute;
    }

    // Garbage time: play out to at least the 90th minute with no further
    // score change, provided anyone is still recorded on the field.
    let end = (last + 1).max(90);
    if !home_on.is_empty() || !away_on.is_empty() {
        segments.push(make_segment(
            m, last, end, score_home, score_away, 0, 0, &home_on, &away_on, &home_on, &away_on,
        ));
    }

    segments
}

fn starting_side(lineups: &[&LineupEntry], team: &str) -> BTreeSet<String> {
    let mut side: BTreeSet<String> = lineups
        .iter()
        .filter(|l| l.team == team && l.starting)
        .map(|l| l.player.clone())
        .collect();
    // Starting flags are unreliable in some sources; anyone with minutes
    // played stands in for the eleven.
    if side.is_empty() {
        side = lineups
            .iter()
            .filter(|l| l.team == team && l.minutes_played > 0)
            .map(|l| l.player.clone())
            .collect();
    }
    side
}

fn goal_delta(events: &[&MatchEvent], home: &str, away: &str) -> (u32, u32) {
    let mut gf = 0;
    let mut ga = 0;
    for ev in events {
        match ev.kind {
            EventKind::Goal | EventKind::Penalty => {
                if ev.team == home {
                    gf += 1;
                } else if ev.team == away {
                    ga += 1;
                }
            }
            EventKind::OwnGoal => {
                // Credited to the opponent.
                if ev.team == home {
                    ga += 1;
                } else if ev.team == away {
                    gf += 1;
                }
            }
            _ => {}
        }
    }
    (gf, ga)
}

fn apply_roster_events(
    events: &[&MatchEvent],
    home: &str,
    away: &str,
    home_on: &mut BTreeSet<String>,
    away_on: &mut BTreeSet<String>,
) {
    for ev in events {
        let side = if ev.team == home {
            &mut *home_on
        } else if ev.team == away {
            &mut *away_on
        } else {
            continue;
        };
        match ev.kind {
            EventKind::SubstituteIn => {
                side.insert(ev.player.clone());
            }
            EventKind::SubstituteOut => {
                side.remove(&ev.player);
            }
            kind if kind.is_dismissal() => {
                side.remove(&ev.player);
            }
            _ => {}
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn make_segment(
    m: &Match,
    t_start: u32,
    t_end: u32,
    score_home: u32,
    score_away: u32,
    gf: u32,
    ga: u32,
    home_on: &BTreeSet<String>,
    away_on: &BTreeSet<String>,
    home_after: &BTreeSet<String>,
    away_after: &BTreeSet<String>,
) -> Segment {
    let gd_start = score_home as i32 - score_away as i32;
    Segment {
        match_id: m.id.clone(),
        home_team: m.home_team.clone(),
        away_team: m.away_team.clone(),
        t_start,
        t_end,
        duration: (t_end.saturating_sub(t_start)).max(1) as f64,
        gf,
        ga,
        gd_start,
        gd_end: gd_start + gf as i32 - ga as i32,
        man_start: home_on.len() as i32 - away_on.len() as i32,
        man_end: home_after.len() as i32 - away_after.len() as i32,
        home_on: home_on.iter().cloned().collect(),
        away_on: away_on.iter().cloned().collect(),
    }
}
