//! Versioned reference tables built from ingested matches:
//! `team_identity.csv` and `players_master.csv`.

use crate::domain::model::{PlayerMaster, TeamIdentity};
use crate::utils::error::Result;
use crate::utils::text::{decode_text, normalize_ws};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const TEAM_CSV: &str = "team_identity.csv";
pub const PLAYERS_CSV: &str = "players_master.csv";

const LOGO_EXTENSIONS: [&str; 4] = ["png", "svg", "jpg", "jpeg"];

/// Crest file stems for the clubs whose WhoScored name differs from the file name.
const SLUG_ALIASES: [(&str, &str); 20] = [
    ("mallorca", "mallorca"),
    ("real madrid", "realmadrid"),
    ("athletic club", "athletic"),
    ("real betis", "betis"),
    ("valencia", "valencia"),
    ("deportivo alaves", "alaves"),
    ("real oviedo", "realoviedo"),
    ("celta vigo", "celta"),
    ("atletico", "atlmadrid"),
    ("rayo vallecano", "rayovallecano"),
    ("barcelona", "barcelona"),
    ("sevilla", "sevilla"),
    ("real sociedad", "realsociedad"),
    ("espanyol", "espanyol"),
    ("osasuna", "osasuna"),
    ("getafe", "getafe"),
    ("levante", "levante"),
    ("elche", "elche"),
    ("villarreal", "villarreal"),
    ("girona", "girona"),
];

/// Club colours (primary, secondary) keyed by WhoScored team id.
pub fn team_colors(team_id: i64) -> Option<(&'static str, &'static str)> {
    let colors = match team_id {
        51 => ("#D00000", "#1A1A1A"),
        52 => ("#FFFFFF", "#1D1D1B"),
        53 => ("#D00027", "#1A1A1A"),
        54 => ("#009E49", "#FFFFFF"),
        55 => ("#FF7900", "#000000"),
        60 => ("#003DA5", "#FFFFFF"),
        61 => ("#0057B8", "#FFD100"),
        62 => ("#8EC6E8", "#E30613"),
        63 => ("#D20A11", "#1B3D8E"),
        64 => ("#E30613", "#FFFFFF"),
        65 => ("#004D98", "#A50044"),
        67 => ("#D00023", "#FFFFFF"),
        68 => ("#005DA8", "#FFFFFF"),
        70 => ("#00529F", "#FFFFFF"),
        131 => ("#D0021B", "#003A70"),
        819 => ("#005CB9", "#FFD200"),
        832 => ("#132257", "#E41E20"),
        833 => ("#1B5E20", "#FFFFFF"),
        839 => ("#FDE100", "#1A1A1A"),
        2783 => ("#D50032", "#FFFFFF"),
        _ => return None,
    };
    Some(colors)
}

pub fn slug_from_teamname(team_name: &str) -> String {
    let key = normalize_ws(team_name).to_lowercase();
    SLUG_ALIASES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, slug)| slug.to_string())
        .unwrap_or_else(|| key.replace(' ', ""))
}

pub fn resolve_logo_path(assets_dir: &Path, slug: &str) -> Option<PathBuf> {
    LOGO_EXTENSIONS
        .iter()
        .map(|ext| assets_dir.join(format!("{}.{}", slug, ext)))
        .find(|p| p.exists())
}

/// Every directory below `base` holding a `csv/` folder, with that folder, sorted by path.
pub fn iter_match_folders(base: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut folders: Vec<(PathBuf, PathBuf)> = WalkDir::new(base)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && e.file_name() != "csv")
        .filter_map(|e| {
            let csv_dir = e.path().join("csv");
            csv_dir
                .is_dir()
                .then(|| (e.path().to_path_buf(), csv_dir))
        })
        .collect();
    folders.sort();
    folders
}

/// A CSV file read as plain strings.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self> {
        let delimiter = match text.lines().next() {
            Some(first) if !first.contains(',') && first.contains(';') => b';',
            _ => b',',
        };
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first header matching any of `names`, ignoring case.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| {
            self.headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(n))
        })
    }

    pub fn cell(&self, row: usize, col: Option<usize>) -> Option<&str> {
        let value = self.rows.get(row)?.get(col?)?.trim();
        (!value.is_empty()).then_some(value)
    }
}

/// Read a CSV written by any of our tools or by hand: BOM tolerated, UTF-8
/// with a Latin-1 fallback, comma or semicolon separated. `None` when absent.
pub fn read_csv_safe(path: &Path) -> Result<Option<CsvTable>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    match CsvTable::parse(&decode_text(&bytes)) {
        Ok(table) => Ok(Some(table)),
        Err(e) => {
            tracing::warn!("Unreadable CSV {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Integer from a CSV cell, accepting pandas-style `52.0`.
pub fn parse_int(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    cell.parse::<i64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Write a dictionary CSV (plain UTF-8, header row from the field names).
pub fn write_dictionary<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn load_team_identity(path: &Path) -> Result<Vec<TeamIdentity>> {
    let Some(table) = read_csv_safe(path)? else {
        return Ok(Vec::new());
    };
    let id = table.column(&["team_id"]);
    let name = table.column(&["team_name"]);
    let slug = table.column(&["slug"]);
    let logo = table.column(&["logo_path"]);
    let primary = table.column(&["primary"]);
    let secondary = table.column(&["secondary"]);

    let text = |row: usize, col: Option<usize>| table.cell(row, col).unwrap_or("").to_string();
    Ok((0..table.rows.len())
        .filter_map(|i| {
            Some(TeamIdentity {
                team_id: table.cell(i, id).and_then(parse_int)?,
                team_name: text(i, name),
                slug: text(i, slug),
                logo_path: text(i, logo),
                primary: text(i, primary),
                secondary: text(i, secondary),
            })
        })
        .collect())
}

pub fn load_players_master(path: &Path) -> Result<Vec<PlayerMaster>> {
    let Some(table) = read_csv_safe(path)? else {
        return Ok(Vec::new());
    };
    Ok(players_from_table(&table, &["player_id"], &["player_name"], &["team_id"], &["team_name"], &["shirtno"]))
}

fn players_from_table(
    table: &CsvTable,
    pid: &[&str],
    pname: &[&str],
    tid: &[&str],
    tname: &[&str],
    shirt: &[&str],
) -> Vec<PlayerMaster> {
    let (pid, pname, tid, tname, shirt) = (
        table.column(pid),
        table.column(pname),
        table.column(tid),
        table.column(tname),
        table.column(shirt),
    );
    if pid.is_none() || pname.is_none() {
        return Vec::new();
    }
    (0..table.rows.len())
        .filter_map(|i| {
            Some(PlayerMaster {
                player_id: table.cell(i, pid).and_then(parse_int)?,
                player_name: table.cell(i, pname).unwrap_or("").to_string(),
                team_id: table.cell(i, tid).and_then(parse_int),
                team_name: table.cell(i, tname).unwrap_or("").to_string(),
                shirt_no: table.cell(i, shirt).and_then(parse_int),
            })
        })
        .collect()
}

/// Teams seen in the first `max_matches` match folders under `matchcenter_dir`.
pub fn collect_teams(
    matchcenter_dir: &Path,
    assets_dir: &Path,
    max_matches: usize,
) -> Result<Vec<TeamIdentity>> {
    let mut by_id: BTreeMap<i64, TeamIdentity> = BTreeMap::new();

    for (folder, csv_dir) in iter_match_folders(matchcenter_dir)
        .into_iter()
        .take(max_matches)
    {
        let Some(meta) = read_csv_safe(&csv_dir.join("match_meta.csv"))? else {
            continue;
        };
        if meta.is_empty() {
            continue;
        }
        let hid = meta.column(&["home_team_id", "home_id", "hometeamid"]);
        let hnm = meta.column(&["home_team_name", "home_name", "hometeamname", "home"]);
        let aid = meta.column(&["away_team_id", "away_id", "awayteamid"]);
        let anm = meta.column(&["away_team_name", "away_name", "awayteamname", "away"]);
        if hid.is_none() || hnm.is_none() || aid.is_none() || anm.is_none() {
            tracing::warn!("Skipping {}: match_meta lacks team columns", folder.display());
            continue;
        }

        for (id_col, name_col) in [(hid, hnm), (aid, anm)] {
            let Some(team_id) = meta.cell(0, id_col).and_then(parse_int) else {
                continue;
            };
            let team_name = meta.cell(0, name_col).unwrap_or("").to_string();
            let slug = slug_from_teamname(&team_name);
            let (primary, secondary) = team_colors(team_id).unwrap_or(("", ""));
            let logo_path = resolve_logo_path(assets_dir, &slug)
                .map(|p| p.display().to_string())
                .unwrap_or_default();

            by_id.entry(team_id).or_insert(TeamIdentity {
                team_id,
                team_name,
                slug,
                logo_path,
                primary: primary.to_string(),
                secondary: secondary.to_string(),
            });
        }
    }

    Ok(by_id.into_values().collect())
}

/// Every player in every `players.csv`, keeping the longest name seen per id.
pub fn collect_players(matchcenter_dir: &Path) -> Result<Vec<PlayerMaster>> {
    let mut by_id: BTreeMap<i64, PlayerMaster> = BTreeMap::new();

    for (_, csv_dir) in iter_match_folders(matchcenter_dir) {
        let Some(table) = read_csv_safe(&csv_dir.join("players.csv"))? else {
            continue;
        };
        let players = players_from_table(
            &table,
            &["player_id", "playerid", "id"],
            &["player_name", "name", "player"],
            &["team_id", "teamid"],
            &["team_name", "team"],
            &["shirtnumber", "shirtno", "number", "no"],
        );
        for p in players {
            match by_id.get(&p.player_id) {
                Some(seen) if seen.player_name.chars().count() >= p.player_name.chars().count() => {}
                _ => {
                    by_id.insert(p.player_id, p);
                }
            }
        }
    }

    Ok(by_id.into_values().collect())
}

/// Old rows first, new rows replace them by key; result sorted by key.
pub fn merge_by_key<T, F>(old: Vec<T>, new: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> i64,
{
    let mut merged: BTreeMap<i64, T> = BTreeMap::new();
    for row in old.into_iter().chain(new) {
        merged.insert(key(&row), row);
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_match(root: &Path, rel: &str, meta: &str, players: &str) {
        let csv_dir = root.join(rel).join("csv");
        fs::create_dir_all(&csv_dir).unwrap();
        fs::write(csv_dir.join("match_meta.csv"), meta).unwrap();
        fs::write(csv_dir.join("players.csv"), players).unwrap();
    }

    #[test]
    fn test_slug_aliases() {
        assert_eq!(slug_from_teamname("  Real   Madrid "), "realmadrid");
        assert_eq!(slug_from_teamname("Atletico"), "atlmadrid");
        assert_eq!(slug_from_teamname("Las Palmas"), "laspalmas");
    }

    #[test]
    fn test_csv_table_semicolons_and_latin1() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.csv");
        fs::write(&path, b"Team_ID;Name\n52;Alav\xe9s\n").unwrap();
        let table = read_csv_safe(&path).unwrap().unwrap();
        let col = table.column(&["team_id"]);
        assert_eq!(table.cell(0, col), Some("52"));
        assert_eq!(table.cell(0, table.column(&["name"])), Some("Alavés"));
        assert!(read_csv_safe(&dir.path().join("missing.csv")).unwrap().is_none());
    }

    #[test]
    fn test_iter_match_folders_walks_nested_layout() {
        let dir = TempDir::new().unwrap();
        write_match(dir.path(), "MatchCenter/LaLiga/2025-2026/b", "", "");
        write_match(dir.path(), "MatchCenter/LaLiga/2025-2026/a", "", "");
        fs::create_dir_all(dir.path().join("MatchCenter/LaLiga/empty")).unwrap();
        let found = iter_match_folders(dir.path());
        assert_eq!(found.len(), 2);
        assert!(found[0].0.ends_with("a"));
        assert!(found[1].1.ends_with("b/csv"));
    }

    #[test]
    fn test_merge_by_key_new_rows_win() {
        let merged = merge_by_key(vec![(3, "old"), (1, "old")], vec![(3, "new"), (2, "new")], |r| r.0);
        assert_eq!(merged, vec![(1, "old"), (2, "new"), (3, "new")]);
    }
}
