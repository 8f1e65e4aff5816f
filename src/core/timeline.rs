//! Formation segments, slot positions and the running score.

use crate::core::qualifiers;
use crate::domain::model::{
    lenient, FormationSegment, Leader, MatchCentre, PlayerPositionRow, PlayerRow, ScoreEvent,
    ScoredFormation, ShotRow, Side,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Formation blocks outside these periods (pre-match, penalties...) are ignored.
const FORMATION_PERIODS: [i64; 3] = [1, 2, 16];

fn int_of(v: Option<&Value>) -> Option<i64> {
    v.and_then(lenient::value_to_i64)
}

/// Slot → player id for one formation block.
///
/// Parallel `formationSlots`/`slots` and `playerIds` lists come first. Explicit
/// slot maps in either direction override them. A list of `{slot, playerId}`
/// objects is only used when nothing else produced a mapping.
pub fn slot_player_map(f: &Value) -> BTreeMap<i64, i64> {
    let mut mapping = BTreeMap::new();
    let mut put = |slot: Option<i64>, pid: Option<i64>| {
        if let (Some(s), Some(p)) = (slot, pid) {
            if s > 0 {
                mapping.insert(s, p);
            }
        }
    };

    let slots = f
        .get("formationSlots")
        .filter(|v| is_truthy(v))
        .or_else(|| f.get("slots"))
        .and_then(Value::as_array);
    let pids = f.get("playerIds").and_then(Value::as_array);
    if let (Some(slots), Some(pids)) = (slots, pids) {
        if !slots.is_empty() && slots.len() == pids.len() {
            for (s, pid) in slots.iter().zip(pids) {
                put(lenient::value_to_i64(s), lenient::value_to_i64(pid));
            }
        }
    }

    for key in ["formationSlotToPlayerIdMap", "slotToPlayerIdMap"] {
        if let Some(map) = f.get(key).and_then(Value::as_object) {
            for (slot, pid) in map {
                put(slot.trim().parse().ok(), lenient::value_to_i64(pid));
            }
        }
    }

    for key in ["playerIdToFormationSlotMap", "playerToSlotMap"] {
        if let Some(map) = f.get(key).and_then(Value::as_object) {
            for (pid, slot) in map {
                put(lenient::value_to_i64(slot), pid.trim().parse().ok());
            }
        }
    }

    if mapping.is_empty() {
        if let Some(items) = f.get("slots").and_then(Value::as_array) {
            for item in items.iter().filter(|i| i.is_object()) {
                let slot = int_of(item.get("slot"));
                let pid = int_of(item.get("playerId"));
                if let (Some(s), Some(p)) = (slot, pid) {
                    if s > 0 {
                        mapping.insert(s, p);
                    }
                }
            }
        }
    }

    mapping
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        Value::Number(_) => true,
    }
}

/// Pitch coordinates per slot (index 0 is slot 1).
pub fn positions_list(f: &Value) -> Vec<(Option<f64>, Option<f64>)> {
    let list = ["formationPositions", "positions", "formationCoordinates"]
        .iter()
        .filter_map(|k| f.get(*k))
        .find(|v| is_truthy(v))
        .and_then(Value::as_array);

    let Some(list) = list else {
        return Vec::new();
    };

    let first_key = |p: &Value, keys: [&str; 3]| -> Option<f64> {
        keys.iter()
            .find_map(|k| p.get(*k))
            .and_then(lenient::value_to_f64)
    };

    list.iter()
        .map(|p| {
            if p.is_object() {
                (
                    first_key(p, ["horizontal", "x", "centerX"]),
                    first_key(p, ["vertical", "y", "centerY"]),
                )
            } else {
                (None, None)
            }
        })
        .collect()
}

/// One past the latest expanded minute seen in the event stream.
pub fn match_end_minute(centre: &MatchCentre) -> i64 {
    centre
        .events
        .iter()
        .filter_map(|e| e.expanded_minute)
        .fold(0, i64::max)
        + 1
}

pub fn formations_timelines(
    match_id: Option<i64>,
    centre: &MatchCentre,
    players: &[PlayerRow],
) -> (Vec<FormationSegment>, Vec<PlayerPositionRow>) {
    let end_of_match = match_end_minute(centre);

    let jersey_by_pid: HashMap<i64, Option<i64>> = players
        .iter()
        .filter_map(|p| p.player_id.map(|id| (id, p.shirt_no)))
        .collect();

    let mut segments = Vec::new();
    let mut positions = Vec::new();

    for side in Side::BOTH {
        let team = centre.side(side);

        let mut forms: Vec<&Value> = team.formations.iter().collect();
        forms.sort_by_key(|f| {
            (
                int_of(f.get("period")).unwrap_or(0),
                int_of(f.get("startMinuteExpanded")).unwrap_or(-1),
            )
        });

        for f in forms {
            let Some(period) = int_of(f.get("period")).filter(|p| FORMATION_PERIODS.contains(p))
            else {
                continue;
            };
            let start = int_of(f.get("startMinuteExpanded")).unwrap_or(0);
            let end = int_of(f.get("endMinuteExpanded"))
                .filter(|e| *e != 0)
                .unwrap_or(end_of_match);
            let name = f
                .get("formationName")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);

            segments.push(FormationSegment {
                match_id,
                team_side: side,
                team_id: team.team_id,
                team_name: team.name.clone(),
                formation_name: name.clone(),
                period,
                start_expanded: start,
                end_expanded: end,
                duration_expanded: end - start,
            });

            let coords = positions_list(f);
            for (slot, pid) in slot_player_map(f) {
                let (x, y) = usize::try_from(slot - 1)
                    .ok()
                    .and_then(|i| coords.get(i).copied())
                    .unwrap_or((None, None));
                positions.push(PlayerPositionRow {
                    match_id,
                    team_side: side,
                    team_id: team.team_id,
                    period,
                    start_minute: start,
                    end_minute: end,
                    formation_name: name.clone(),
                    slot,
                    player_id: pid,
                    jersey_number: jersey_by_pid.get(&pid).copied().flatten(),
                    x,
                    y,
                });
            }
        }
    }

    segments.sort_by_key(|s| (s.team_side, s.start_expanded));
    positions.sort_by_key(|p| (p.team_side, p.start_minute, p.slot));
    (segments, positions)
}

/// Running score built from the goals in the shots table. Own goals count for
/// the other side; a goal whose team matches neither id is listed but not counted.
pub fn score_timeline(
    match_id: Option<i64>,
    shots: &[ShotRow],
    home_team_id: i64,
    away_team_id: i64,
) -> Vec<ScoreEvent> {
    let mut goals: Vec<&ShotRow> = shots.iter().filter(|s| s.shot_outcome == "Goal").collect();
    // Goals without a minute sort last.
    goals.sort_by_key(|g| (g.expanded_minute.is_none(), g.expanded_minute));

    let (mut home, mut away) = (0u32, 0u32);
    goals
        .into_iter()
        .map(|g| {
            let own_goal = qualifiers::has(&g.qualifiers, "OwnGoal");
            match g.team_id {
                Some(t) if t == home_team_id => {
                    if own_goal {
                        away += 1
                    } else {
                        home += 1
                    }
                }
                Some(t) if t == away_team_id => {
                    if own_goal {
                        home += 1
                    } else {
                        away += 1
                    }
                }
                _ => tracing::debug!("Goal {:?} has unknown team {:?}", g.event_id, g.team_id),
            }
            ScoreEvent {
                expanded_minute: g.expanded_minute,
                scorer_team_id: g.team_id,
                own_goal,
                score_home: home,
                score_away: away,
                match_id,
            }
        })
        .collect()
}

/// Score in force when each formation segment began (latest goal at or before
/// the segment start), plus who was ahead. Output is ordered by segment start.
pub fn attach_score(segments: &[FormationSegment], score: &[ScoreEvent]) -> Vec<ScoredFormation> {
    let mut ordered: Vec<&FormationSegment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.start_expanded);

    let mut goals: Vec<(i64, u32, u32)> = score
        .iter()
        .filter_map(|e| e.expanded_minute.map(|m| (m, e.score_home, e.score_away)))
        .collect();
    goals.sort_by_key(|g| g.0);

    ordered
        .into_iter()
        .map(|seg| {
            let (score_home, score_away) = goals
                .iter()
                .take_while(|(m, _, _)| *m <= seg.start_expanded)
                .last()
                .map(|&(_, h, a)| (h, a))
                .unwrap_or((0, 0));
            ScoredFormation {
                segment: seg.clone(),
                score_home,
                score_away,
                leader_at_start: Leader::from_score(score_home, score_away),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Labelled, Qualifier};
    use serde_json::json;

    #[test]
    fn test_slot_map_layouts() {
        let parallel = json!({"formationSlots": [1, 2, 0], "playerIds": [100, 200, 300]});
        assert_eq!(
            slot_player_map(&parallel).into_iter().collect::<Vec<_>>(),
            vec![(1, 100), (2, 200)]
        );

        let with_override = json!({
            "formationSlots": [1, 2], "playerIds": [100, 200],
            "slotToPlayerIdMap": {"2": 999},
            "playerIdToFormationSlotMap": {"555": 3}
        });
        let m = slot_player_map(&with_override);
        assert_eq!(m.get(&2), Some(&999));
        assert_eq!(m.get(&3), Some(&555));

        let objects = json!({"slots": [{"slot": 1, "playerId": 7}, {"slot": "2", "playerId": 8}, 5]});
        assert_eq!(slot_player_map(&objects).len(), 2);

        let mismatched = json!({"formationSlots": [1, 2], "playerIds": [100]});
        assert!(slot_player_map(&mismatched).is_empty());
    }

    #[test]
    fn test_positions_fallback_keys() {
        let f = json!({"formationPositions": [], "positions": [
            {"horizontal": 5.0, "vertical": 50},
            {"x": "20", "centerY": 30},
            null
        ]});
        assert_eq!(
            positions_list(&f),
            vec![(Some(5.0), Some(50.0)), (Some(20.0), Some(30.0)), (None, None)]
        );
    }

    fn centre() -> MatchCentre {
        serde_json::from_value(json!({
            "home": {"teamId": 52, "name": "Real Madrid", "formations": [
                {"formationName": "4231", "period": 2, "startMinuteExpanded": 48, "endMinuteExpanded": 0,
                 "formationSlots": [1, 2], "playerIds": [11, 12],
                 "formationPositions": [{"horizontal": 0.5, "vertical": 5}, {"horizontal": 2, "vertical": 8}]},
                {"formationName": " 442 ", "period": 1, "startMinuteExpanded": 0, "endMinuteExpanded": 48,
                 "formationSlots": [1], "playerIds": [11]},
                {"formationName": "PenaltyShootout", "period": 5}
            ]},
            "away": {"teamId": 65, "name": "Barcelona", "formations": [
                {"formationName": "433", "period": 1, "formationSlots": [1], "playerIds": [21]}
            ]},
            "events": [{"expandedMinute": 95}, {"expandedMinute": 12}]
        }))
        .unwrap()
    }

    #[test]
    fn test_formations_timelines() {
        let players = vec![PlayerRow {
            match_id: Some(1),
            team_side: Side::Home,
            team_id: Some(52),
            team_name: None,
            player_id: Some(12),
            player_name: None,
            is_first_eleven: None,
            position: None,
            shirt_no: Some(8),
            height: None,
            weight: None,
            age: None,
            rating: None,
            is_man_of_the_match: None,
        }];
        let (segs, pos) = formations_timelines(Some(1), &centre(), &players);

        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].team_side, Side::Away);
        assert_eq!(segs[0].end_expanded, 96);
        assert_eq!(segs[1].formation_name.as_deref(), Some("442"));
        assert_eq!(segs[2].start_expanded, 48);
        assert_eq!(segs[2].end_expanded, 96);
        assert_eq!(segs[2].duration_expanded, 48);

        let second_half: Vec<_> = pos.iter().filter(|p| p.start_minute == 48).collect();
        assert_eq!(second_half.len(), 2);
        assert_eq!(second_half[1].jersey_number, Some(8));
        assert_eq!(second_half[1].x, Some(2.0));
    }

    fn goal(minute: i64, team: i64, own: bool) -> ShotRow {
        let qualifiers = if own {
            vec![Qualifier {
                kind: Labelled {
                    value: Some(28),
                    display_name: Some("OwnGoal".to_string()),
                },
                value: None,
            }]
        } else {
            Vec::new()
        };
        ShotRow {
            match_id: Some(1),
            event_id: Some(minute),
            minute: Some(minute),
            second: None,
            expanded_minute: Some(minute),
            period: Some(1),
            team_id: Some(team),
            player_id: None,
            x: None,
            y: None,
            end_x: None,
            end_y: None,
            type_name: Some("Goal".to_string()),
            shot_outcome: "Goal".to_string(),
            related_pass_event_id: None,
            goal_mouth_y: None,
            goal_mouth_z: None,
            q_length: None,
            q_angle: None,
            qualifiers,
        }
    }

    #[test]
    fn test_score_timeline_credits_own_goals_to_opponent() {
        let shots = vec![goal(70, 52, true), goal(10, 52, false), goal(80, 999, false)];
        let timeline = score_timeline(Some(1), &shots, 52, 65);
        assert_eq!(timeline.len(), 3);
        assert_eq!((timeline[0].score_home, timeline[0].score_away), (1, 0));
        assert_eq!((timeline[1].score_home, timeline[1].score_away), (1, 1));
        assert!(timeline[1].own_goal);
        assert_eq!((timeline[2].score_home, timeline[2].score_away), (1, 1));
    }

    #[test]
    fn test_attach_score_is_backward_asof() {
        let (segs, _) = formations_timelines(Some(1), &centre(), &[]);
        let score = score_timeline(Some(1), &[goal(48, 65, false), goal(5, 52, false)], 52, 65);
        let scored = attach_score(&segs, &score);

        assert_eq!(scored.len(), 3);
        assert_eq!(scored[0].segment.start_expanded, 0);
        assert_eq!(scored[0].leader_at_start, Leader::Draw);
        let at_48 = scored.last().unwrap();
        assert_eq!((at_48.score_home, at_48.score_away), (1, 1));
        assert_eq!(at_48.leader_at_start, Leader::Draw);

        let no_goals = attach_score(&segs, &[]);
        assert!(no_goals.iter().all(|s| s.score_home == 0 && s.leader_at_start == Leader::Draw));
    }
}
