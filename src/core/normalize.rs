//! Base tables: one match row, one row per player, one row per event.

use crate::domain::model::{
    lenient, EventRow, MatchCentre, MatchMetaRow, MatchPayload, PlayerData, PlayerRow, Side,
};
use serde_json::Value;

/// Match id from the page args, falling back to the one inside `matchCentreData`.
pub fn resolve_match_id(payload: &MatchPayload, centre: &MatchCentre) -> Option<i64> {
    payload.match_id.or(centre.match_id)
}

fn status_field<'a>(centre: &'a MatchCentre, key: &str) -> Option<&'a Value> {
    centre
        .status
        .as_ref()
        .and_then(|s| s.get(key))
        .filter(|v| !v.is_null())
}

pub fn match_meta(match_id: Option<i64>, centre: &MatchCentre) -> MatchMetaRow {
    let referee = match &centre.referee {
        Some(Value::Object(obj)) => obj.get("name").and_then(lenient::value_to_string),
        Some(other) => lenient::value_to_string(other),
        None => None,
    };

    let elapsed = status_field(centre, "displayStatus")
        .or(centre.elapsed.as_ref())
        .and_then(lenient::value_to_string);

    let status_code = status_field(centre, "value")
        .or(centre.status_code.as_ref())
        .and_then(lenient::value_to_i64);

    MatchMetaRow {
        match_id,
        home_team_id: centre.home.team_id,
        home_name: centre.home.name.clone(),
        away_team_id: centre.away.team_id,
        away_name: centre.away.name.clone(),
        venue: centre
            .venue_name
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        attendance: centre.attendance,
        referee,
        start_time: centre.start_time.clone(),
        elapsed,
        score: centre.score.clone(),
        ht_score: centre.ht_score.clone(),
        ft_score: centre.ft_score.clone(),
        status_code,
    }
}

/// Rating recorded at the latest minute key of `stats.ratings`, to 2 decimals.
pub fn final_rating(player: &PlayerData) -> Option<f64> {
    let ratings = player.stats.get("ratings")?.as_object()?;
    let (_, value) = ratings
        .iter()
        .filter_map(|(minute, v)| minute.trim().parse::<i64>().ok().map(|m| (m, v)))
        .max_by_key(|(m, _)| *m)?;
    let rating = lenient::value_to_f64(value)?;
    Some((rating * 100.0).round() / 100.0)
}

pub fn players(match_id: Option<i64>, centre: &MatchCentre) -> Vec<PlayerRow> {
    Side::BOTH
        .iter()
        .flat_map(|&side| {
            let team = centre.side(side);
            team.players.iter().map(move |p| PlayerRow {
                match_id,
                team_side: side,
                team_id: team.team_id,
                team_name: team.name.clone(),
                player_id: p.player_id,
                player_name: p.name.clone(),
                is_first_eleven: p.is_first_eleven,
                position: p.position.clone(),
                shirt_no: p.shirt_no,
                height: p.height,
                weight: p.weight,
                age: p.age,
                rating: final_rating(p),
                is_man_of_the_match: p.is_man_of_the_match,
            })
        })
        .collect()
}

pub fn events(match_id: Option<i64>, centre: &MatchCentre) -> Vec<EventRow> {
    centre
        .events
        .iter()
        .map(|ev| EventRow {
            match_id,
            event_id: ev.event_id.filter(|v| *v != 0).or(ev.id),
            minute: ev.minute,
            second: ev.second,
            expanded_minute: ev.expanded_minute,
            period: ev.period.value,
            team_id: ev.team_id,
            player_id: ev.player_id,
            x: ev.x,
            y: ev.y,
            end_x: ev.end_x,
            end_y: ev.end_y,
            type_value: ev.kind.value,
            type_name: ev.kind.display_name.clone(),
            outcome_value: ev.outcome_type.value,
            outcome_name: ev.outcome_type.display_name.clone(),
            related_event_id: ev.related_event_id,
            qualifiers: ev.qualifiers.clone(),
        })
        .collect()
}
