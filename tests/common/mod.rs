#![allow(dead_code)]

/// A saved match centre page with two shots per side, formations and an own goal.
pub fn match_centre_html(match_id: i64) -> String {
    let centre = serde_json::json!({
        "startTime": "2025-08-19T21:00:00",
        "competitionName": "LaLiga",
        "seasonName": "2025/2026",
        "venueName": "Santiago Bernabéu",
        "score": "1 : 1",
        "home": {
            "teamId": 52,
            "name": "Real Madrid",
            "players": [
                {"playerId": 101, "name": "Courtois", "shirtNo": 1, "position": "GK", "isFirstEleven": true},
                {"playerId": 107, "name": "Vinicius Junior", "shirtNo": 7, "position": "FW", "isFirstEleven": true}
            ],
            "formations": [
                {"formationName": "4231", "period": 1, "startMinuteExpanded": 0, "endMinuteExpanded": 46,
                 "playerIds": [101, 107], "formationSlots": [1, 2],
                 "formationPositions": [{"horizontal": 5, "vertical": 50}, {"horizontal": 80, "vertical": 30}]},
                {"formationName": " 433 ", "period": 2, "startMinuteExpanded": 46, "endMinuteExpanded": 0,
                 "playerIds": [101, 107], "formationSlots": [1, 2]}
            ]
        },
        "away": {
            "teamId": 62,
            "name": "Osasuna",
            "players": [
                {"playerId": 201, "name": "Sergio Herrera", "shirtNo": 1, "position": "GK", "isFirstEleven": true}
            ],
            "formations": [
                {"formationName": "442", "period": 1, "startMinuteExpanded": 0, "endMinuteExpanded": 95,
                 "playerIds": [201], "formationSlots": [1]}
            ]
        },
        "events": [
            {"eventId": 1, "minute": 10, "second": 5, "expandedMinute": 10, "period": {"value": 1, "displayName": "FirstHalf"},
             "teamId": 52, "playerId": 107, "x": 70.1, "y": 40.0, "endX": 88.0, "endY": 45.0,
             "type": {"value": 1, "displayName": "Pass"}, "outcomeType": {"value": 1, "displayName": "Successful"}},
            {"eventId": 2, "minute": 11, "expandedMinute": 11, "period": {"value": 1, "displayName": "FirstHalf"},
             "teamId": 52, "playerId": 107, "x": 88.5, "y": 45.2,
             "type": {"value": 16, "displayName": "Goal"}, "outcomeType": {"value": 1, "displayName": "Successful"},
             "qualifiers": [{"type": {"value": 55, "displayName": "IntentionalGoalAssist"}, "value": "1"},
                            {"type": {"value": 102, "displayName": "GoalMouthY"}, "value": "48.1"}]},
            {"eventId": 3, "minute": 30, "expandedMinute": 30, "period": {"value": 1, "displayName": "FirstHalf"},
             "teamId": 62, "playerId": 201, "x": 80.0, "y": 60.0,
             "type": {"value": 13, "displayName": "MissedShots"}, "outcomeType": {"value": 0, "displayName": "Unsuccessful"}},
            {"eventId": 4, "minute": 70, "expandedMinute": 72, "period": {"value": 2, "displayName": "SecondHalf"},
             "teamId": 52, "playerId": 101, "x": 3.0, "y": 50.0,
             "type": {"value": 16, "displayName": "Goal"}, "outcomeType": {"value": 1, "displayName": "Successful"},
             "qualifiers": [{"type": {"value": 28, "displayName": "OwnGoal"}}]},
            {"eventId": 5, "minute": 80, "expandedMinute": 83, "period": {"value": 2, "displayName": "SecondHalf"},
             "teamId": 62, "playerId": 201, "x": 10.0, "y": 50.0,
             "type": {"value": 10, "displayName": "Save"}, "outcomeType": {"value": 1, "displayName": "Successful"}},
            {"eventId": 6, "minute": 90, "expandedMinute": 94, "period": {"value": 2, "displayName": "SecondHalf"},
             "teamId": 52, "playerId": 107, "x": 40.0, "y": 20.0,
             "type": {"value": 7, "displayName": "Tackle"}, "outcomeType": {"value": 1, "displayName": "Successful"}}
        ]
    });

    format!(
        r#"<!DOCTYPE html><html><head><title>Real Madrid 1-1 Osasuna</title></head><body>
<div id="match-header"><span>Real Madrid</span> <dd>21:00</dd></div>
<script>
    require.config.params["args"] = {{
        matchId: {match_id},
        matchCentreData: {centre},
        matchCentreEventTypeJson: {{"shotSixYardBox": 0, "goalOwn": 28}},
        formationIdNameDictionary: {{"2": "442", "8": "4231"}}
    }};
</script></body></html>"#,
        match_id = match_id,
        centre = centre
    )
}

pub fn match_dir_name(match_id: i64) -> String {
    format!("MatchCenter/LaLiga/2025-2026/20250819_Real_Madrid_vs_Osasuna_{}", match_id)
}
