//! Event-derived tables: shots, enriched passes, defensive and goalkeeper actions.

use crate::core::qualifiers;
use crate::domain::model::{
    DefensiveRow, EventRow, GkActionRow, PassRow, RelatedShot, ShotRow,
};
use std::collections::HashMap;

const SHOT_TYPES: [&str; 7] = [
    "Shot",
    "Goal",
    "MissedShots",
    "SavedShot",
    "ShotOnPost",
    "BlockedShot",
    "OwnGoal",
];

const ASSIST_LINKS: [&str; 6] = [
    "KeyPass",
    "Assist",
    "GoalAssist",
    "IntentionalGoalAssist",
    "IntentionalAssist",
    "AssistPassId",
];

const WS_ASSIST_FLAGS: [&str; 3] = ["Assist", "GoalAssist", "IntentionalGoalAssist"];

const DEFENSIVE_TYPES: [&str; 7] = [
    "Tackle",
    "Interception",
    "Clearance",
    "BlockedShot",
    "Aerial",
    "BallRecovery",
    "Challenge",
];

const GK_TYPES: [&str; 6] = [
    "Save",
    "Claim",
    "KeeperPickup",
    "Punch",
    "Smother",
    "KeeperSweeper",
];

fn type_in(ev: &EventRow, set: &[&str]) -> bool {
    ev.type_name.as_deref().is_some_and(|t| set.contains(&t))
}

pub fn is_shot(ev: &EventRow) -> bool {
    type_in(ev, &SHOT_TYPES)
        || qualifiers::get(&ev.qualifiers, "GoalMouthY").is_some()
        || qualifiers::get(&ev.qualifiers, "GoalMouthZ").is_some()
        || qualifiers::has(&ev.qualifiers, "ShotType")
}

/// Classify a shot. Rules are checked in order; the first that applies wins.
pub fn shot_outcome(ev: &EventRow) -> String {
    let t = ev.type_name.as_deref().unwrap_or("");
    let out = ev.outcome_name.as_deref().unwrap_or("");
    let qs = &ev.qualifiers;

    if t == "Goal" || qualifiers::has(qs, "Goal") {
        return "Goal".to_string();
    }
    if t == "BlockedShot" || qualifiers::has(qs, "BlockedPass") {
        return "Blocked".to_string();
    }
    if t == "SavedShot" || out.contains("Saved") {
        return "Saved".to_string();
    }
    if t == "ShotOnPost" || qualifiers::has(qs, "HitWoodWork") {
        return "Post".to_string();
    }
    if t == "MissedShots" || out.contains("Off Target") || out.contains("Missed") {
        return "Missed".to_string();
    }
    [out, t]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

pub fn shots(events: &[EventRow]) -> Vec<ShotRow> {
    events
        .iter()
        .filter(|ev| is_shot(ev))
        .map(|ev| ShotRow {
            match_id: ev.match_id,
            event_id: ev.event_id,
            minute: ev.minute,
            second: ev.second,
            expanded_minute: ev.expanded_minute,
            period: ev.period,
            team_id: ev.team_id,
            player_id: ev.player_id,
            x: ev.x,
            y: ev.y,
            end_x: ev.end_x,
            end_y: ev.end_y,
            type_name: ev.type_name.clone(),
            shot_outcome: shot_outcome(ev),
            related_pass_event_id: qualifiers::get_any_i64(&ev.qualifiers, &ASSIST_LINKS),
            goal_mouth_y: qualifiers::get_f64(&ev.qualifiers, "GoalMouthY"),
            goal_mouth_z: qualifiers::get_f64(&ev.qualifiers, "GoalMouthZ"),
            q_length: qualifiers::get(&ev.qualifiers, "Length").cloned(),
            q_angle: qualifiers::get(&ev.qualifiers, "Angle").cloned(),
            qualifiers: ev.qualifiers.clone(),
        })
        .collect()
}

/// Passes with the shots they led to. A shot points back at its pass through
/// an assist-style qualifier; pass and shot must belong to the same team.
pub fn passes_enriched(events: &[EventRow], shots: &[ShotRow]) -> Vec<PassRow> {
    let mut shots_by_pass: HashMap<(i64, i64), Vec<RelatedShot>> = HashMap::new();
    for shot in shots {
        if let (Some(team), Some(pass)) = (shot.team_id, shot.related_pass_event_id) {
            shots_by_pass.entry((team, pass)).or_default().push(RelatedShot {
                shot_event_id: shot.event_id,
                shot_outcome: shot.shot_outcome.clone(),
                type_name: shot.type_name.clone(),
                minute: shot.minute,
                second: shot.second,
            });
        }
    }

    events
        .iter()
        .filter(|ev| ev.type_name.as_deref() == Some("Pass"))
        .map(|ev| {
            let qs = &ev.qualifiers;
            let related_shots = match (ev.team_id, ev.event_id) {
                (Some(team), Some(id)) => shots_by_pass.get(&(team, id)).cloned().unwrap_or_default(),
                _ => Vec::new(),
            };
            PassRow {
                match_id: ev.match_id,
                event_id: ev.event_id,
                minute: ev.minute,
                second: ev.second,
                expanded_minute: ev.expanded_minute,
                period: ev.period,
                team_id: ev.team_id,
                player_id: ev.player_id,
                x: ev.x,
                y: ev.y,
                end_x: ev.end_x,
                end_y: ev.end_y,
                type_name: ev.type_name.clone(),
                outcome_name: ev.outcome_name.clone(),
                pass_outcome: ev
                    .outcome_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                is_key_pass: !related_shots.is_empty(),
                is_assist: related_shots.iter().any(|s| s.shot_outcome == "Goal"),
                is_cross: qualifiers::has(qs, "Cross"),
                is_throughball: qualifiers::has_any(qs, &["ThroughBall", "ChippedThroughBall"]),
                q_length: qualifiers::get(qs, "Length").cloned(),
                q_angle: qualifiers::get(qs, "Angle").cloned(),
                related_shots,
                has_ws_assist_flag: qualifiers::has_any(qs, &WS_ASSIST_FLAGS),
                qualifiers: qs.clone(),
            }
        })
        .collect()
}

pub fn defensive_actions(events: &[EventRow]) -> Vec<DefensiveRow> {
    events
        .iter()
        .filter(|ev| type_in(ev, &DEFENSIVE_TYPES))
        .map(|ev| DefensiveRow {
            match_id: ev.match_id,
            event_id: ev.event_id,
            minute: ev.minute,
            second: ev.second,
            expanded_minute: ev.expanded_minute,
            period: ev.period,
            team_id: ev.team_id,
            player_id: ev.player_id,
            x: ev.x,
            y: ev.y,
            type_name: ev.type_name.clone(),
            outcome_name: ev.outcome_name.clone(),
            qualifiers: ev.qualifiers.clone(),
        })
        .collect()
}

/// Explicit keeper actions only; saves recorded on the shot itself stay in the shots table.
pub fn gk_actions(events: &[EventRow]) -> Vec<GkActionRow> {
    events
        .iter()
        .filter(|ev| type_in(ev, &GK_TYPES))
        .map(|ev| GkActionRow {
            match_id: ev.match_id,
            event_id: ev.event_id,
            minute: ev.minute,
            second: ev.second,
            expanded_minute: ev.expanded_minute,
            period: ev.period,
            team_id: ev.team_id,
            player_id: ev.player_id,
            x: ev.x,
            y: ev.y,
            type_name: ev.type_name.clone(),
            outcome_name: ev.outcome_name.clone(),
            gk_goal_mouth_y: qualifiers::get_f64(&ev.qualifiers, "GoalMouthY"),
            gk_goal_mouth_z: qualifiers::get_f64(&ev.qualifiers, "GoalMouthZ"),
            qualifiers: ev.qualifiers.clone(),
        })
        .collect()
}
