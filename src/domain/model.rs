use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::utils::error::{EtlError, Result};

/// Loose number/string conversions for match-centre JSON, where the same field
/// can arrive as an int, a float or a numeric string depending on the page.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn value_to_i64(v: &Value) -> Option<i64> {
        match v {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f as i64)
                })
            }
            _ => None,
        }
    }

    pub fn value_to_f64(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn value_to_string(v: &Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?
            .as_ref()
            .and_then(value_to_i64))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?
            .as_ref()
            .and_then(value_to_f64))
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?
            .as_ref()
            .and_then(value_to_string))
    }

    pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_i64().map(|i| i != 0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// `null` (or a value of the wrong shape) becomes `T::default()`.
    pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned + Default,
    {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Page payload
// ---------------------------------------------------------------------------

/// Contents of `require.config.params["args"]` on a match centre page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_centre_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_centre_event_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formation_id_name_dictionary: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_timeline_json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formations_timeline_json: Option<Value>,
}

impl MatchPayload {
    /// Typed view of `matchCentreData`.
    pub fn centre(&self) -> Result<MatchCentre> {
        let raw = self
            .match_centre_data
            .as_ref()
            .ok_or(EtlError::PayloadNotFound)?;
        Ok(serde_json::from_value(raw.clone())?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchCentre {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub match_id: Option<i64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub home: TeamData,
    #[serde(deserialize_with = "lenient::or_default")]
    pub away: TeamData,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub venue_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub attendance: Option<i64>,
    pub referee: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub start_time: Option<String>,
    pub elapsed: Option<Value>,
    pub status: Option<Value>,
    pub status_code: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub score: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub ht_score: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub ft_score: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub competition_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub tournament_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub season_name: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub events: Vec<EventData>,
}

impl MatchCentre {
    pub fn side(&self, side: Side) -> &TeamData {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamData {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub team_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub players: Vec<PlayerData>,
    /// Formation blocks vary in layout between seasons; kept as raw JSON.
    #[serde(deserialize_with = "lenient::or_default")]
    pub formations: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerData {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub player_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub is_first_eleven: Option<bool>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub position: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub shirt_no: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub height: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub weight: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub age: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub is_man_of_the_match: Option<bool>,
    pub stats: Value,
}

/// `{ "value": 1, "displayName": "Pass" }` pairs used for types, outcomes and periods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Labelled {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub value: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Qualifier {
    #[serde(rename = "type", deserialize_with = "lenient::or_default")]
    pub kind: Labelled,
    pub value: Option<Value>,
}

impl Qualifier {
    pub fn name(&self) -> Option<&str> {
        self.kind.display_name.as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventData {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub event_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub minute: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub second: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub expanded_minute: Option<i64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub period: Labelled,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub team_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub player_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub x: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub y: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub end_x: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub end_y: Option<f64>,
    #[serde(rename = "type", deserialize_with = "lenient::or_default")]
    pub kind: Labelled,
    #[serde(deserialize_with = "lenient::or_default")]
    pub outcome_type: Labelled,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub related_event_id: Option<i64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub qualifiers: Vec<Qualifier>,
}

/// Team side. Declared away-first so the derived order matches sorting by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Away,
    Home,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Away];
}

// ---------------------------------------------------------------------------
// Normalized tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMetaRow {
    pub match_id: Option<i64>,
    pub home_team_id: Option<i64>,
    pub home_name: Option<String>,
    pub away_team_id: Option<i64>,
    pub away_name: Option<String>,
    pub venue: Option<String>,
    pub attendance: Option<i64>,
    pub referee: Option<String>,
    pub start_time: Option<String>,
    pub elapsed: Option<String>,
    pub score: Option<String>,
    pub ht_score: Option<String>,
    pub ft_score: Option<String>,
    pub status_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRow {
    pub match_id: Option<i64>,
    pub team_side: Side,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    #[serde(rename = "isFirstEleven")]
    pub is_first_eleven: Option<bool>,
    pub position: Option<String>,
    #[serde(rename = "shirtNo")]
    pub shirt_no: Option<i64>,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    pub age: Option<i64>,
    pub rating: Option<f64>,
    #[serde(rename = "isManOfTheMatch")]
    pub is_man_of_the_match: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    #[serde(rename = "match_id")]
    pub match_id: Option<i64>,
    pub event_id: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<f64>,
    pub expanded_minute: Option<i64>,
    pub period: Option<i64>,
    pub team_id: Option<i64>,
    pub player_id: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub end_x: Option<f64>,
    pub end_y: Option<f64>,
    pub type_value: Option<i64>,
    pub type_name: Option<String>,
    pub outcome_value: Option<i64>,
    pub outcome_name: Option<String>,
    pub related_event_id: Option<i64>,
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRow {
    pub match_id: Option<i64>,
    #[serde(rename = "eventId")]
    pub event_id: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<f64>,
    #[serde(rename = "expandedMinute")]
    pub expanded_minute: Option<i64>,
    pub period: Option<i64>,
    #[serde(rename = "teamId")]
    pub team_id: Option<i64>,
    #[serde(rename = "playerId")]
    pub player_id: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(rename = "endX")]
    pub end_x: Option<f64>,
    #[serde(rename = "endY")]
    pub end_y: Option<f64>,
    #[serde(rename = "typeName")]
    pub type_name: Option<String>,
    pub shot_outcome: String,
    #[serde(rename = "related_pass_eventId")]
    pub related_pass_event_id: Option<i64>,
    pub goal_mouth_y: Option<f64>,
    pub goal_mouth_z: Option<f64>,
    pub q_length: Option<Value>,
    pub q_angle: Option<Value>,
    #[serde(default)]
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedShot {
    #[serde(rename = "shot_eventId")]
    pub shot_event_id: Option<i64>,
    pub shot_outcome: String,
    #[serde(rename = "typeName")]
    pub type_name: Option<String>,
    pub minute: Option<i64>,
    pub second: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassRow {
    pub match_id: Option<i64>,
    #[serde(rename = "eventId")]
    pub event_id: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<f64>,
    #[serde(rename = "expandedMinute")]
    pub expanded_minute: Option<i64>,
    pub period: Option<i64>,
    #[serde(rename = "teamId")]
    pub team_id: Option<i64>,
    #[serde(rename = "playerId")]
    pub player_id: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(rename = "endX")]
    pub end_x: Option<f64>,
    #[serde(rename = "endY")]
    pub end_y: Option<f64>,
    #[serde(rename = "typeName")]
    pub type_name: Option<String>,
    #[serde(rename = "outcomeName")]
    pub outcome_name: Option<String>,
    pub pass_outcome: String,
    pub is_key_pass: bool,
    pub is_assist: bool,
    pub is_cross: bool,
    pub is_throughball: bool,
    pub q_length: Option<Value>,
    pub q_angle: Option<Value>,
    pub related_shots: Vec<RelatedShot>,
    pub has_ws_assist_flag: bool,
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefensiveRow {
    pub match_id: Option<i64>,
    #[serde(rename = "eventId")]
    pub event_id: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<f64>,
    #[serde(rename = "expandedMinute")]
    pub expanded_minute: Option<i64>,
    pub period: Option<i64>,
    #[serde(rename = "teamId")]
    pub team_id: Option<i64>,
    #[serde(rename = "playerId")]
    pub player_id: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(rename = "typeName")]
    pub type_name: Option<String>,
    #[serde(rename = "outcomeName")]
    pub outcome_name: Option<String>,
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GkActionRow {
    pub match_id: Option<i64>,
    #[serde(rename = "eventId")]
    pub event_id: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<f64>,
    #[serde(rename = "expandedMinute")]
    pub expanded_minute: Option<i64>,
    pub period: Option<i64>,
    #[serde(rename = "teamId")]
    pub team_id: Option<i64>,
    #[serde(rename = "playerId")]
    pub player_id: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(rename = "typeName")]
    pub type_name: Option<String>,
    #[serde(rename = "outcomeName")]
    pub outcome_name: Option<String>,
    pub gk_goal_mouth_y: Option<f64>,
    pub gk_goal_mouth_z: Option<f64>,
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationSegment {
    pub match_id: Option<i64>,
    pub team_side: Side,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub formation_name: Option<String>,
    pub period: i64,
    pub start_expanded: i64,
    pub end_expanded: i64,
    pub duration_expanded: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPositionRow {
    pub match_id: Option<i64>,
    pub team_side: Side,
    pub team_id: Option<i64>,
    pub period: i64,
    pub start_minute: i64,
    pub end_minute: i64,
    pub formation_name: Option<String>,
    pub slot: i64,
    pub player_id: i64,
    pub jersey_number: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    #[serde(rename = "expandedMinute")]
    pub expanded_minute: Option<i64>,
    #[serde(rename = "scorer_teamId")]
    pub scorer_team_id: Option<i64>,
    pub own_goal: bool,
    pub score_home: u32,
    pub score_away: u32,
    pub match_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leader {
    Home,
    Away,
    Draw,
}

impl Leader {
    pub fn from_score(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Leader::Home,
            std::cmp::Ordering::Less => Leader::Away,
            std::cmp::Ordering::Equal => Leader::Draw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFormation {
    #[serde(flatten)]
    pub segment: FormationSegment,
    pub score_home: u32,
    pub score_away: u32,
    pub leader_at_start: Leader,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub rows: usize,
    pub json: String,
    pub csv: String,
    pub json_sha256: Option<String>,
    pub csv_sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub match_id: Option<i64>,
    pub created_at: String,
    pub normalized_dir: String,
    pub csv_dir: String,
    pub tables: BTreeMap<String, TableEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<FileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<FileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

// ---------------------------------------------------------------------------
// Dictionaries and fixtures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamIdentity {
    pub team_id: i64,
    pub team_name: String,
    pub slug: String,
    #[serde(default)]
    pub logo_path: String,
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub secondary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMaster {
    pub player_id: i64,
    pub player_name: String,
    pub team_id: Option<i64>,
    #[serde(default)]
    pub team_name: String,
    #[serde(rename = "shirtNo")]
    pub shirt_no: Option<i64>,
}

/// A finished fixture read from a fixtures page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub home_name: Option<String>,
    pub away_name: Option<String>,
    pub home_name_clean: Option<String>,
    pub away_name_clean: Option<String>,
    pub match_id: String,
    pub match_url: Option<String>,
    pub match_centre_url: String,
    pub score_home: u32,
    pub score_away: u32,
    pub is_finished: bool,
    pub day_label: Option<String>,
    pub match_date: Option<String>,
    pub start_time: Option<String>,
    pub match_round: Option<String>,
}

pub const FIXTURE_CSV_COLUMNS: [&str; 10] = [
    "match_date",
    "start_time",
    "home_name",
    "away_name",
    "match_id",
    "match_centre_url",
    "score_home",
    "score_away",
    "is_finished",
    "match_round",
];

impl FixtureRecord {
    /// Cells in `FIXTURE_CSV_COLUMNS` order.
    pub fn csv_cells(&self) -> Vec<String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            opt(&self.match_date),
            opt(&self.start_time),
            opt(&self.home_name),
            opt(&self.away_name),
            self.match_id.clone(),
            self.match_centre_url.clone(),
            self.score_home.to_string(),
            self.score_away.to_string(),
            if self.is_finished { "True" } else { "False" }.to_string(),
            opt(&self.match_round),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(lenient::value_to_i64(&json!(12)), Some(12));
        assert_eq!(lenient::value_to_i64(&json!(2.5e9)), Some(2_500_000_000));
        assert_eq!(lenient::value_to_i64(&json!(" 7 ")), Some(7));
        assert_eq!(lenient::value_to_i64(&json!("7.9")), Some(7));
        assert_eq!(lenient::value_to_i64(&json!("abc")), None);
        assert_eq!(lenient::value_to_f64(&json!("12.5")), Some(12.5));
        assert_eq!(lenient::value_to_f64(&json!(null)), None);
    }

    #[test]
    fn test_centre_tolerates_nulls_and_strings() {
        let payload = MatchPayload {
            match_id: Some(1),
            match_centre_data: Some(json!({
                "home": {"teamId": "52", "name": "Real Madrid", "players": null},
                "away": null,
                "attendance": "71000",
                "events": [
                    {"id": 2.7e9, "minute": 3, "type": {"value": 1, "displayName": "Pass"},
                     "period": null, "qualifiers": null, "x": "50.1"}
                ]
            })),
            ..Default::default()
        };
        let centre = payload.centre().unwrap();
        assert_eq!(centre.home.team_id, Some(52));
        assert!(centre.home.players.is_empty());
        assert_eq!(centre.away.team_id, None);
        assert_eq!(centre.attendance, Some(71000));
        assert_eq!(centre.events.len(), 1);
        assert_eq!(centre.events[0].id, Some(2_700_000_000));
        assert_eq!(centre.events[0].x, Some(50.1));
        assert_eq!(centre.events[0].kind.display_name.as_deref(), Some("Pass"));
        assert!(centre.events[0].qualifiers.is_empty());
    }

    #[test]
    fn test_centre_requires_data() {
        assert!(matches!(
            MatchPayload::default().centre(),
            Err(EtlError::PayloadNotFound)
        ));
    }

    #[test]
    fn test_side_order_matches_labels() {
        assert!(Side::Away < Side::Home);
        assert_eq!(serde_json::to_value(Side::Home).unwrap(), json!("home"));
    }

    #[test]
    fn test_scored_formation_flattens() {
        let row = ScoredFormation {
            segment: FormationSegment {
                match_id: Some(9),
                team_side: Side::Home,
                team_id: Some(52),
                team_name: Some("Real Madrid".to_string()),
                formation_name: Some("4231".to_string()),
                period: 1,
                start_expanded: 0,
                end_expanded: 46,
                duration_expanded: 46,
            },
            score_home: 1,
            score_away: 0,
            leader_at_start: Leader::Home,
        };
        let value = serde_json::to_value(&row).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "match_id");
        assert_eq!(keys.last().unwrap().as_str(), "leader_at_start");
        assert_eq!(value["leader_at_start"], json!("home"));
    }
}
