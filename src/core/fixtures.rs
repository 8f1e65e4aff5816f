//! Finished fixtures read from WhoScored fixtures pages.
//!
//! The pages are React-rendered; class names carry a build hash suffix
//! (`Accordion-module_accordion__3xYz`), so every lookup matches on the prefix.

use crate::adapters::http::live_url;
use crate::core::dictionaries::{read_csv_safe, CsvTable};
use crate::domain::model::{FixtureRecord, FIXTURE_CSV_COLUMNS};
use crate::utils::error::{EtlError, Result};
use crate::utils::text::{ascii_slug, fold_accents, strip_tags};
use chrono::{Datelike, NaiveDate};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const SPANISH_ABBR: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

const COUNTRIES: [&str; 10] = [
    "espana", "england", "italia", "francia", "alemania", "portugal", "france", "italy",
    "spain", "germany",
];

pub const FINISHED_CSV: &str = "finished_matches.csv";
pub const FINISHED_JSON: &str = "finished_matches.json";
pub const ROUND_OVERRIDES_CSV: &str = "round_overrides.csv";

static DAY_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(ene|feb|mar|abr|may|jun|jul|ago|sep|oct|nov|dic)\s+(\d{1,2})\s+(\d{4})")
        .expect("static regex")
});
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s)([01]?\d|2[0-3]):([0-5]\d)(\s|$)").expect("static regex")
});
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("static regex"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(.*?)-\s*(.+?)\s+(\d{4}[/\-]\d{4})").expect("static regex")
});
static FIXTURES_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/fixtures/([^/?#]+)").expect("static regex"));
static SEASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(19|20)\d{2}[-/](19|20)\d{2}").expect("static regex"));
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(19|20)\d{2}$").expect("static regex"));
static ACCORDION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div[^>]*class="Accordion-module_accordion"#).expect("static regex")
});
static DAY_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="Accordion-module_header[^"]*"[^>]*>.*?<span[^>]*>(.*?)</span>"#)
        .expect("static regex")
});
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div[^>]*class="Match-module_row"#).expect("static regex")
});
static MATCH_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*(?:id="scoresBtn-|href="[^"]*/matches/\d+/)[^>]*>"#)
        .expect("static regex")
});
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)(?:data-)?href="([^"]*)""#).expect("static regex"));
static MATCH_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/matches/(\d+)/").expect("static regex"));
static SCORE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<span[^>]*>\s*(\d+)\s*</span>").expect("static regex"));
static SCORE_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[-–]\s*(\d+)").expect("static regex"));
static TEAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="Match-module_teamName[^"]*"[^>]*>.*?<a[^>]*>(.*?)</a>"#)
        .expect("static regex")
});

fn month_number(abbr: &str) -> Option<u32> {
    SPANISH_ABBR
        .iter()
        .position(|m| *m == abbr)
        .map(|i| i as u32 + 1)
}

/// `"ago 2025"` → `"2025-08"`. Anything else keeps its text with spaces as `-`.
pub fn month_key(label: &str) -> String {
    let lbl = label.trim().to_lowercase();
    let parts: Vec<&str> = lbl.split_whitespace().collect();
    if let [month, year] = parts.as_slice() {
        let abbr: String = month.chars().take(3).collect();
        if let (Some(m), Ok(y)) = (month_number(&abbr), year.parse::<i32>()) {
            return format!("{:04}-{:02}", y, m);
        }
    }
    lbl.replace(' ', "-")
}

/// `"viernes, sep 12 2025"` → 2025-09-12.
pub fn parse_day_label(day_label: &str) -> Option<NaiveDate> {
    let lower = day_label.to_lowercase();
    let caps = DAY_LABEL_RE.captures(&lower)?;
    let month = month_number(&caps[1])?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[2].parse().ok()?)
}

/// Every (year, month) from `d1` through `d2`, both included.
pub fn months_between(d1: NaiveDate, d2: NaiveDate) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    let (mut y, mut m) = (d1.year(), d1.month());
    while (y, m) <= (d2.year(), d2.month()) {
        out.push((y, m));
        m += 1;
        if m == 13 {
            m = 1;
            y += 1;
        }
    }
    out
}

/// `(2025, 8)` → `"ago 2025"`.
pub fn month_label(year: i32, month: u32) -> String {
    let abbr = SPANISH_ABBR
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("???");
    format!("{} {}", abbr, year)
}

/// First `H:MM`/`HH:MM` standing on its own in `text`.
pub fn extract_time(text: &str) -> Option<String> {
    TIME_RE
        .captures(text)
        .map(|c| format!("{}:{}", &c[2], &c[3]))
}

/// The percent-decoded path segment after `/fixtures/`.
fn fixtures_segment(fixtures_url: &str) -> Option<String> {
    let raw = match url::Url::parse(fixtures_url) {
        Ok(url) => {
            let mut segments = url.path_segments()?;
            segments.find(|s| *s == "fixtures")?;
            segments.next().filter(|s| !s.is_empty())?.to_string()
        }
        Err(_) => FIXTURES_SEGMENT_RE.captures(fixtures_url)?[1].to_string(),
    };
    Some(percent_decode_str(&raw).decode_utf8_lossy().into_owned())
}

/// Competition and season folder names for a fixtures page, from the page
/// title when available, otherwise from the URL slug.
pub fn infer_comp_season(fixtures_url: Option<&str>, page_html: Option<&str>) -> (String, String) {
    let mut comp: Option<String> = None;
    let mut season: Option<String> = None;

    if let Some(title) = page_html
        .and_then(|html| H1_RE.captures(html))
        .map(|c| strip_tags(&c[1]))
    {
        if let Some(c) = TITLE_RE.captures(&title) {
            comp = Some(c[2].trim().to_string());
            season = Some(c[3].to_string());
        }
    }

    if comp.is_none() || season.is_none() {
        if let Some(tail) = fixtures_url.and_then(fixtures_segment) {
            if season.is_none() {
                season = SEASON_RE.find(&tail).map(|m| m.as_str().replace('/', "-"));
            }
            if comp.is_none() {
                let tokens: Vec<&str> = tail
                    .split('-')
                    .filter(|t| !t.is_empty())
                    .filter(|t| !COUNTRIES.contains(&fold_accents(&t.to_lowercase()).as_str()))
                    .filter(|t| !YEAR_RE.is_match(t))
                    .collect();
                if !tokens.is_empty() {
                    comp = Some(tokens.join("-"));
                }
            }
        }
    }

    let comp = ascii_slug(comp.as_deref().unwrap_or("Competition"));
    let season = ascii_slug(season.as_deref().unwrap_or("Season"));
    (
        if comp.is_empty() { "Competition".to_string() } else { comp },
        if season.is_empty() { "Season".to_string() } else { season },
    )
}

/// Split `html` into chunks starting at each match of `re`.
fn chunks<'a>(html: &'a str, re: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = re.find_iter(html).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &s)| &html[s..starts.get(i + 1).copied().unwrap_or(html.len())])
        .collect()
}

/// Text of the element carrying `id="<id>"`, up to its matching close tag.
pub fn element_text_by_id(html: &str, id: &str) -> Option<String> {
    let marker = format!("id=\"{}\"", id);
    let at = html.find(&marker)?;
    let open = html[..at].rfind('<')?;
    let tag: String = html[open + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if tag.is_empty() {
        return None;
    }

    let open_pat = format!("<{}", tag);
    let close_pat = format!("</{}>", tag);
    let mut depth = 0usize;
    let mut pos = open;
    loop {
        let next_open = html[pos..].find(&open_pat).map(|i| i + pos);
        let next_close = html[pos..].find(&close_pat).map(|i| i + pos);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                pos = o + open_pat.len();
            }
            (_, Some(c)) => {
                depth = depth.saturating_sub(1);
                pos = c + close_pat.len();
                if depth == 0 {
                    return Some(strip_tags(&html[open..pos]));
                }
            }
            _ => return Some(strip_tags(&html[open..])),
        }
    }
}

fn scores_from_row(row: &str, match_id: &str, anchor_text: &str) -> Option<(u32, u32)> {
    let marker = format!("id=\"scoresBtn-{}\"", match_id);
    if let Some(at) = row.find(&marker) {
        let rest = &row[at..];
        let end = [rest.find("</div>"), rest.find("</a>")]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(rest.len());
        let nums: Vec<u32> = SCORE_SPAN_RE
            .captures_iter(&rest[..end])
            .filter_map(|c| c[1].parse().ok())
            .collect();
        if nums.len() >= 2 {
            return Some((nums[0], nums[1]));
        }
    }
    let c = SCORE_TEXT_RE.captures(anchor_text)?;
    Some((c[1].parse().ok()?, c[2].parse().ok()?))
}

/// One fixture row; `None` unless the row links a match and shows a final score.
fn parse_row(row: &str, base_url: &str) -> Option<FixtureRecord> {
    let anchor = MATCH_ANCHOR_RE.find(row)?;
    let href = HREF_RE.captures(anchor.as_str())?[1].to_string();
    let href = if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        href
    };
    let match_id = MATCH_ID_RE.captures(&href)?[1].to_string();

    let anchor_body = &row[anchor.end()..];
    let anchor_text = strip_tags(&anchor_body[..anchor_body.find("</a>").unwrap_or(anchor_body.len())]);
    let (score_home, score_away) = scores_from_row(row, &match_id, &anchor_text)?;

    let teams: Vec<String> = TEAM_RE
        .captures_iter(row)
        .map(|c| strip_tags(&c[1]))
        .take(2)
        .collect();
    let (home, away) = match teams.as_slice() {
        [h, a] => (Some(h.clone()), Some(a.clone())),
        _ => (None, None),
    };

    Some(FixtureRecord {
        home_name_clean: home.as_deref().map(fold_accents),
        away_name_clean: away.as_deref().map(fold_accents),
        home_name: home,
        away_name: away,
        match_centre_url: live_url(base_url, &match_id),
        match_id,
        match_url: Some(href),
        score_home,
        score_away,
        is_finished: true,
        ..Default::default()
    })
}

/// Finished matches on a fixtures page, first occurrence per match id.
pub fn parse_fixtures_page(html: &str, base_url: &str) -> Vec<FixtureRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for acc in chunks(html, &ACCORDION_RE) {
        let day_label = DAY_HEADER_RE
            .captures(acc)
            .map(|c| strip_tags(&c[1]))
            .filter(|l| !l.is_empty());
        let match_date = day_label.as_deref().and_then(parse_day_label);

        for row in chunks(acc, &ROW_RE) {
            let Some(mut rec) = parse_row(row, base_url) else {
                continue;
            };
            if !seen.insert(rec.match_id.clone()) {
                continue;
            }
            rec.day_label = day_label.clone();
            rec.match_date = match_date.map(|d| d.format("%Y-%m-%d").to_string());
            records.push(rec);
        }
    }

    tracing::debug!("Parsed {} finished fixtures", records.len());
    records
}

/// Keep records dated within `[from, to]`; undated records are dropped.
pub fn filter_date_range(records: Vec<FixtureRecord>, from: NaiveDate, to: NaiveDate) -> Vec<FixtureRecord> {
    records
        .into_iter()
        .filter(|r| {
            r.match_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .is_some_and(|d| d >= from && d <= to)
        })
        .collect()
}

/// Start time from a match centre page header.
pub fn start_time_from_match_page(html: &str) -> Option<String> {
    element_text_by_id(html, "match-header").and_then(|t| extract_time(&t))
}

fn write_with_bom(path: &Path, table: &CsvTable) -> Result<()> {
    let mut data = b"\xEF\xBB\xBF".to_vec();
    data.extend(table_to_csv(table)?);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

fn table_to_csv(table: &CsvTable) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// Override `match_round` from `round_overrides.csv` keyed by match id. A
/// missing file is created as an empty template for manual editing.
pub fn apply_round_overrides(records: &mut [FixtureRecord], path: &Path) -> Result<()> {
    let Some(table) = read_csv_safe(path)? else {
        let template = CsvTable {
            headers: vec!["match_id".to_string(), "match_round".to_string()],
            rows: Vec::new(),
        };
        write_with_bom(path, &template)?;
        tracing::info!("Created round overrides template {}", path.display());
        return Ok(());
    };

    let (Some(id_col), Some(round_col)) = (table.column(&["match_id"]), table.column(&["match_round"]))
    else {
        return Ok(());
    };
    let overrides: std::collections::HashMap<&str, &str> = (0..table.rows.len())
        .filter_map(|i| Some((table.cell(i, Some(id_col))?, table.cell(i, Some(round_col))?)))
        .collect();

    let mut applied = 0;
    for rec in records.iter_mut() {
        if let Some(round) = overrides.get(rec.match_id.as_str()) {
            rec.match_round = Some(round.to_string());
            applied += 1;
        }
    }
    tracing::debug!("Applied {} round overrides", applied);
    Ok(())
}

/// Fixtures as a CSV table in the published column order.
pub fn fixtures_table(records: &[FixtureRecord]) -> CsvTable {
    CsvTable {
        headers: FIXTURE_CSV_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: records.iter().map(FixtureRecord::csv_cells).collect(),
    }
}

/// Rows of `src` re-ordered to `headers`; missing columns become empty cells.
fn align(src: &CsvTable, headers: &[String]) -> Vec<Vec<String>> {
    let idx: Vec<Option<usize>> = headers
        .iter()
        .map(|h| src.headers.iter().position(|s| s == h))
        .collect();
    src.rows
        .iter()
        .map(|row| {
            idx.iter()
                .map(|i| i.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Existing rows followed by new ones, columns unioned in first-seen order.
fn concat(old: Option<CsvTable>, new: &CsvTable) -> CsvTable {
    let Some(old) = old else {
        return new.clone();
    };
    let mut headers = old.headers.clone();
    for h in &new.headers {
        if !headers.contains(h) {
            headers.push(h.clone());
        }
    }
    let mut rows = align(&old, &headers);
    rows.extend(align(new, &headers));
    CsvTable { headers, rows }
}

/// All tables stacked in order, columns unioned.
pub fn concat_tables(tables: impl IntoIterator<Item = CsvTable>) -> CsvTable {
    tables
        .into_iter()
        .fold(None, |acc, t| Some(concat(acc, &t)))
        .unwrap_or_default()
}

fn dedup(table: CsvTable, key: &str, keep_last: bool) -> CsvTable {
    let Some(k) = table.headers.iter().position(|h| h == key) else {
        return table;
    };
    let key_of = |row: &Vec<String>| row.get(k).cloned().unwrap_or_default();
    let mut seen = HashSet::new();
    let rows: Vec<Vec<String>> = if keep_last {
        let mut kept: Vec<Vec<String>> = table
            .rows
            .into_iter()
            .rev()
            .filter(|r| seen.insert(key_of(r)))
            .collect();
        kept.reverse();
        kept
    } else {
        table
            .rows
            .into_iter()
            .filter(|r| seen.insert(key_of(r)))
            .collect()
    };
    CsvTable {
        headers: table.headers,
        rows,
    }
}

/// Append `new` to the CSV at `path`, keeping the first row per `key`.
pub fn append_dedup_csv(new: &CsvTable, path: &Path, key: &str) -> Result<CsvTable> {
    let merged = dedup(concat(read_csv_safe(path)?, new), key, false);
    write_with_bom(path, &merged)?;
    Ok(merged)
}

/// Merge `new` into `<base>/DataFixtures/<comp>/<season>/finished_matches.csv`,
/// keeping the last row per match id, sorted by date and time.
pub fn save_consolidated(new: &CsvTable, base: &Path, comp: &str, season: &str) -> Result<PathBuf> {
    let target_dir = season_dir(base, comp, season);
    std::fs::create_dir_all(&target_dir)?;
    let target = target_dir.join(FINISHED_CSV);

    let mut merged = dedup(concat(read_csv_safe(&target)?, new), "match_id", true);
    let date = merged.headers.iter().position(|h| h == "match_date");
    let time = merged.headers.iter().position(|h| h == "start_time");
    if let (Some(d), Some(t)) = (date, time) {
        merged
            .rows
            .sort_by(|a, b| (a.get(d), a.get(t)).cmp(&(b.get(d), b.get(t))));
    }

    let tmp = target_dir.join("finished_matches.tmp.csv");
    std::fs::write(&tmp, table_to_csv(&merged)?)?;
    std::fs::rename(&tmp, &target)?;
    tracing::info!("Consolidated {} fixtures into {}", merged.rows.len(), target.display());
    Ok(target)
}

pub fn season_dir(base: &Path, comp: &str, season: &str) -> PathBuf {
    base.join("DataFixtures").join(comp).join(season)
}

pub fn to_json_records(records: &[FixtureRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(records)?)?;
    Ok(())
}

/// Monthly `finished_matches.csv` files below a season folder, sorted.
pub fn monthly_files(season_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(season_dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path().join(FINISHED_CSV))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}
