//! Pulls the match-centre payload out of a saved or fetched HTML page.
//!
//! The page embeds it as a JS object literal:
//! `require.config.params["args"] = { matchId: 1913916, matchCentreData: {...}, ... }`.
//! Keys are unquoted but every value we care about is valid JSON, so each one is
//! cut out with a quote-aware bracket matcher and handed to serde_json.

use crate::domain::model::MatchPayload;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\.config\.params\["args"\]\s*=\s*\{"#).expect("static regex")
});
static MATCH_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"matchId\s*:\s*(\d+)").expect("static regex"));
static CENTRE_DATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"matchCentreData\s*:\s*\{").expect("static regex"));
static EVENT_TYPES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"matchCentreEventType(?:Json)?\s*:\s*\{").expect("static regex"));
static FORMATION_NAMES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"formationIdNameDictionary\s*:\s*\{").expect("static regex")
});
static SCORE_TIMELINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"scoreTimelineJson\s*:\s*\[").expect("static regex"));
static FORMATIONS_TIMELINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"formationsTimelineJson\s*:\s*\[").expect("static regex"));
static LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)var\s+matchCentreData\s*=\s*(\{.*?\});\s*var\s").expect("static regex")
});

/// Return the slice from `start` (which must hold `open`) through its matching
/// `close`, skipping brackets inside single- or double-quoted strings.
pub fn extract_balanced(text: &str, start: usize, open: u8, close: u8) -> Result<&str> {
    let bytes = text.as_bytes();
    let what = if open == b'{' { "object" } else { "array" };
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &ch) in bytes.iter().enumerate().skip(start) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == b'\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            b'"' | b'\'' => quote = Some(ch),
            c if c == open => depth += 1,
            c if c == close => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    Err(EtlError::UnbalancedPayload {
        what,
        offset: start,
    })
}

/// Parse the JSON object whose `{` ends the match of `re` inside `scope`.
fn object_after(re: &Regex, scope: &str) -> Result<Option<Value>> {
    match re.find(scope) {
        Some(m) => {
            let raw = extract_balanced(scope, m.end() - 1, b'{', b'}')?;
            Ok(Some(serde_json::from_str(raw)?))
        }
        None => Ok(None),
    }
}

/// Same for a `[...]` array; a malformed array is dropped rather than failing the page.
fn array_after(re: &Regex, scope: &str, key: &str) -> Option<Value> {
    let m = re.find(scope)?;
    let raw = extract_balanced(scope, m.end() - 1, b'[', b']').ok()?;
    match serde_json::from_str(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!("Ignoring unparsable {}: {}", key, e);
            None
        }
    }
}

/// Extract whatever payload parts the page carries. The result may lack
/// `matchCentreData`; see [`load_payload_from_html`] for the strict version.
pub fn scan_payload(html: &str) -> Result<MatchPayload> {
    let mut payload = MatchPayload::default();

    if let Some(m) = ARGS_RE.find(html) {
        let args = extract_balanced(html, m.end() - 1, b'{', b'}')?;

        payload.match_id = MATCH_ID_RE
            .captures(args)
            .and_then(|c| c[1].parse::<i64>().ok());
        payload.match_centre_data = object_after(&CENTRE_DATA_RE, args)?;
        payload.match_centre_event_type = object_after(&EVENT_TYPES_RE, args)?;
        payload.formation_id_name_dictionary = object_after(&FORMATION_NAMES_RE, args)?;
        payload.score_timeline_json = array_after(&SCORE_TIMELINE_RE, args, "scoreTimelineJson");
        payload.formations_timeline_json =
            array_after(&FORMATIONS_TIMELINE_RE, args, "formationsTimelineJson");
    }

    if payload.match_centre_data.is_none() {
        if let Some(c) = LEGACY_RE.captures(html) {
            tracing::debug!("Using legacy `var matchCentreData` block");
            payload.match_centre_data = Some(serde_json::from_str(&c[1])?);
        }
    }

    Ok(payload)
}

/// Extract the payload and insist on `matchCentreData` being present.
pub fn load_payload_from_html(html: &str) -> Result<MatchPayload> {
    let payload = scan_payload(html)?;
    if payload.match_centre_data.is_none() {
        return Err(EtlError::PayloadNotFound);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><script>
        require.config.params["args"] = {
            matchId: 1913916,
            matchCentreData: {"home": {"teamId": 52, "name": "Real Madrid {B}"}, "away": {"teamId": 65}, "events": []},
            matchCentreEventTypeJson: {"shotSixYardBox": 0, "goalOwn": 1},
            formationIdNameDictionary: {"2": "442", "8": "4231"},
            scoreTimelineJson: [[1, "1 : 0"], [2, "it's \"2 : 0\""]],
            formationsTimelineJson: [1, 2
        };
    </script></html>"#;

    #[test]
    fn test_extract_balanced_skips_quoted_brackets() {
        let text = r#"x = {"a": "}{", 'b': [1, {"c": "\"}"}]} tail"#;
        let start = text.find('{').unwrap();
        let got = extract_balanced(text, start, b'{', b'}').unwrap();
        assert!(got.ends_with("}]}"));
        assert!(extract_balanced("{ \"open\": 1", 0, b'{', b'}').is_err());
    }

    #[test]
    fn test_scan_payload_reads_all_parts() {
        let payload = load_payload_from_html(PAGE).unwrap();
        assert_eq!(payload.match_id, Some(1913916));
        let centre = payload.centre().unwrap();
        assert_eq!(centre.home.name.as_deref(), Some("Real Madrid {B}"));
        assert_eq!(payload.match_centre_event_type.unwrap()["goalOwn"], 1);
        assert_eq!(payload.formation_id_name_dictionary.unwrap()["8"], "4231");
        assert_eq!(payload.score_timeline_json.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unbalanced_timeline_is_dropped() {
        // `formationsTimelineJson` above never closes its bracket.
        let payload = scan_payload(PAGE).unwrap();
        assert!(payload.formations_timeline_json.is_none());
    }

    #[test]
    fn test_legacy_fallback() {
        let html = r#"<script>var matchCentreData = {"home": {"teamId": 1}, "events": []}; var matchId = 5;</script>"#;
        let payload = load_payload_from_html(html).unwrap();
        assert_eq!(payload.match_id, None);
        assert_eq!(payload.centre().unwrap().home.team_id, Some(1));
    }

    #[test]
    fn test_missing_payload_is_an_error() {
        assert!(matches!(
            load_payload_from_html("<html>consent wall</html>"),
            Err(EtlError::PayloadNotFound)
        ));
    }
}
