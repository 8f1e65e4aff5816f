//! SVG charts drawn from the normalized tables.

use crate::core::identity::{TeamIdentityBook, TeamStyle};
use crate::domain::model::{MatchMetaRow, ShotRow};
use crate::utils::error::{EtlError, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const PITCH_W: f64 = 1050.0;
const PITCH_H: f64 = 680.0;
const MARGIN: f64 = 40.0;
const HEADER: f64 = 60.0;
const PITCH_FILL: &str = "#22312b";
const LINE: &str = "#c7d5cc";

/// A shot in SVG pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotMarker {
    pub cx: f64,
    pub cy: f64,
    pub goal: bool,
    pub home: bool,
}

/// Map a WhoScored (0-100, 0-100) location to pixels. Home attacks right,
/// away shots are rotated so they attack left.
pub fn to_pixels(x: f64, y: f64, home: bool) -> (f64, f64) {
    let (x, y) = if home { (x, y) } else { (100.0 - x, 100.0 - y) };
    (
        MARGIN + x / 100.0 * PITCH_W,
        HEADER + MARGIN + (100.0 - y) / 100.0 * PITCH_H,
    )
}

pub fn shot_markers(shots: &[ShotRow], home_team_id: Option<i64>) -> Vec<ShotMarker> {
    shots
        .iter()
        .filter_map(|s| {
            let (x, y) = (s.x?, s.y?);
            let home = s.team_id.is_some() && s.team_id == home_team_id;
            let (cx, cy) = to_pixels(x, y, home);
            Some(ShotMarker {
                cx,
                cy,
                goal: s.shot_outcome == "Goal",
                home,
            })
        })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn pitch_lines(svg: &mut String) {
    let px = |x: f64| MARGIN + x / 100.0 * PITCH_W;
    let py = |y: f64| HEADER + MARGIN + y / 100.0 * PITCH_H;
    let rect = |svg: &mut String, x0: f64, y0: f64, x1: f64, y1: f64| {
        let _ = writeln!(
            svg,
            r#"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="{}" stroke-width="2"/>"#,
            px(x0),
            py(y0),
            px(x1) - px(x0),
            py(y1) - py(y0),
            LINE
        );
    };

    rect(svg, 0.0, 0.0, 100.0, 100.0);
    // Penalty and six-yard boxes in WhoScored proportions.
    rect(svg, 0.0, 21.1, 17.0, 78.9);
    rect(svg, 83.0, 21.1, 100.0, 78.9);
    rect(svg, 0.0, 36.8, 5.8, 63.2);
    rect(svg, 94.2, 36.8, 100.0, 63.2);

    let _ = writeln!(
        svg,
        r#"  <line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/>"#,
        px(50.0),
        py(0.0),
        px(50.0),
        py(100.0),
        LINE
    );
    let _ = writeln!(
        svg,
        r#"  <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="none" stroke="{}" stroke-width="2"/>"#,
        px(50.0),
        py(50.0),
        PITCH_W * 0.0875,
        LINE
    );
}

/// Shot map with both teams on one pitch. Goals are large filled markers,
/// other shots hollow rings, coloured by team.
pub fn shot_map_svg(
    shots: &[ShotRow],
    home_team_id: Option<i64>,
    home: &TeamStyle,
    away: &TeamStyle,
    title: &str,
) -> String {
    let width = PITCH_W + 2.0 * MARGIN;
    let height = PITCH_H + 2.0 * MARGIN + HEADER;
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    let _ = writeln!(svg, r#"  <rect width="100%" height="100%" fill="{}"/>"#, PITCH_FILL);
    let _ = writeln!(
        svg,
        r#"  <text x="{:.1}" y="36" fill="{}" font-family="sans-serif" font-size="24" text-anchor="middle">{}</text>"#,
        width / 2.0,
        LINE,
        escape(title)
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{:.1}" fill="{}" font-family="sans-serif" font-size="16">{}</text>"#,
        MARGIN,
        HEADER + 20.0,
        away.primary,
        escape(&away.name)
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{:.1}" y="{:.1}" fill="{}" font-family="sans-serif" font-size="16" text-anchor="end">{}</text>"#,
        width - MARGIN,
        HEADER + 20.0,
        home.primary,
        escape(&home.name)
    );

    pitch_lines(&mut svg);

    let markers = shot_markers(shots, home_team_id);
    // Goals last so they sit on top.
    for m in markers.iter().filter(|m| !m.goal).chain(markers.iter().filter(|m| m.goal)) {
        let style = if m.home { home } else { away };
        if m.goal {
            let _ = writeln!(
                svg,
                r#"  <circle class="goal" cx="{:.1}" cy="{:.1}" r="14" fill="{}" stroke="{}" stroke-width="2"/>"#,
                m.cx, m.cy, style.primary, style.secondary
            );
        } else {
            let _ = writeln!(
                svg,
                r#"  <circle class="shot" cx="{:.1}" cy="{:.1}" r="8" fill="none" stroke="{}" stroke-width="2"/>"#,
                m.cx, m.cy, style.primary
            );
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Draw `charts/shot_map.svg` for a match directory produced by the table writer.
pub fn render_shot_map(match_dir: &Path, book: &TeamIdentityBook) -> Result<PathBuf> {
    let normalized = match_dir.join("normalized");
    let meta: Vec<MatchMetaRow> = read_json(&normalized.join("match_meta.json"))?;
    let meta = meta
        .into_iter()
        .next()
        .ok_or_else(|| EtlError::processing("match_meta.json has no rows"))?;

    let shots_path = normalized.join("events_shots.json");
    let shots: Vec<ShotRow> = if shots_path.exists() {
        read_json(&shots_path)?
    } else {
        tracing::warn!("No shots table in {}", normalized.display());
        Vec::new()
    };

    let home_name = meta.home_name.clone().unwrap_or_else(|| "Home".to_string());
    let away_name = meta.away_name.clone().unwrap_or_else(|| "Away".to_string());
    let home = book.style_or_default(meta.home_team_id, &home_name);
    let away = book.style_or_default(meta.away_team_id, &away_name);

    let mut title = format!("{} vs {}", home_name, away_name);
    if let Some(score) = meta.score.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = write!(title, " ({})", score.trim());
    }

    let svg = shot_map_svg(&shots, meta.home_team_id, &home, &away, &title);
    let charts = match_dir.join("charts");
    std::fs::create_dir_all(&charts)?;
    let out = charts.join("shot_map.svg");
    std::fs::write(&out, svg)?;
    tracing::info!("Shot map ({} shots) written to {}", shots.len(), out.display());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(team: i64, x: f64, y: f64, outcome: &str) -> ShotRow {
        ShotRow {
            match_id: Some(1),
            event_id: None,
            minute: None,
            second: None,
            expanded_minute: None,
            period: None,
            team_id: Some(team),
            player_id: None,
            x: Some(x),
            y: Some(y),
            end_x: None,
            end_y: None,
            type_name: None,
            shot_outcome: outcome.to_string(),
            related_pass_event_id: None,
            goal_mouth_y: None,
            goal_mouth_z: None,
            q_length: None,
            q_angle: None,
            qualifiers: Vec::new(),
        }
    }

    #[test]
    fn test_away_shots_are_mirrored() {
        let (hx, hy) = to_pixels(90.0, 50.0, true);
        let (ax, ay) = to_pixels(90.0, 50.0, false);
        assert!(hx > MARGIN + PITCH_W / 2.0);
        assert!(ax < MARGIN + PITCH_W / 2.0);
        assert!((hy - ay).abs() < 1e-9);
    }

    #[test]
    fn test_shot_map_markers() {
        let shots = vec![
            shot(52, 88.0, 45.0, "Goal"),
            shot(52, 80.0, 30.0, "Missed"),
            shot(65, 85.0, 50.0, "Saved"),
            ShotRow { x: None, ..shot(65, 0.0, 0.0, "Saved") },
        ];
        let home = TeamStyle::fallback("Real <Madrid>");
        let away = TeamStyle {
            primary: "#004D98".to_string(),
            ..TeamStyle::fallback("Barcelona")
        };
        let svg = shot_map_svg(&shots, Some(52), &home, &away, "RM & FCB");
        assert_eq!(svg.matches(r#"class="goal""#).count(), 1);
        assert_eq!(svg.matches(r#"class="shot""#).count(), 2);
        assert!(svg.contains("#004D98"));
        assert!(svg.contains("RM &amp; FCB"));
        assert!(svg.contains("Real &lt;Madrid&gt;"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
