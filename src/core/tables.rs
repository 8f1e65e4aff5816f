//! Builds every table for one match and writes them as JSON + CSV with a manifest.

use crate::core::{events, normalize, timeline};
use crate::domain::model::{
    DefensiveRow, EventRow, FileEntry, FormationSegment, GkActionRow, Manifest, MatchCentre,
    MatchMetaRow, MatchPayload, PassRow, PlayerPositionRow, PlayerRow, ScoreEvent,
    ScoredFormation, ShotRow, TableEntry,
};
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use crate::utils::text::path_slug;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use zip::write::{FileOptions, ZipWriter};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// All normalized and derived tables of a single match.
#[derive(Debug, Clone, Default)]
pub struct MatchTables {
    pub match_id: Option<i64>,
    pub match_meta: Vec<MatchMetaRow>,
    pub players: Vec<PlayerRow>,
    pub events: Vec<EventRow>,
    pub shots: Vec<ShotRow>,
    pub passes: Vec<PassRow>,
    pub defensive: Vec<DefensiveRow>,
    pub gk_actions: Vec<GkActionRow>,
    pub formations: Vec<FormationSegment>,
    pub positions: Vec<PlayerPositionRow>,
    pub score: Vec<ScoreEvent>,
    pub formations_scored: Vec<ScoredFormation>,
}

impl MatchTables {
    pub fn build(payload: &MatchPayload) -> Result<Self> {
        let centre = payload.centre()?;
        Ok(Self::from_centre(payload, &centre))
    }

    pub fn from_centre(payload: &MatchPayload, centre: &MatchCentre) -> Self {
        let match_id = normalize::resolve_match_id(payload, centre);

        let meta = normalize::match_meta(match_id, centre);
        let players = normalize::players(match_id, centre);
        let events = normalize::events(match_id, centre);

        let shots = events::shots(&events);
        let passes = events::passes_enriched(&events, &shots);
        let defensive = events::defensive_actions(&events);
        let gk_actions = events::gk_actions(&events);
        let (formations, positions) = timeline::formations_timelines(match_id, centre, &players);

        let score = match (meta.home_team_id, meta.away_team_id) {
            (Some(home), Some(away)) => timeline::score_timeline(match_id, &shots, home, away),
            _ => {
                tracing::warn!("Match {:?} lacks team ids; skipping score timeline", match_id);
                Vec::new()
            }
        };
        let formations_scored = timeline::attach_score(&formations, &score);

        tracing::debug!(
            "Match {:?}: {} players, {} events, {} shots, {} passes",
            match_id,
            players.len(),
            events.len(),
            shots.len(),
            passes.len()
        );

        Self {
            match_id,
            match_meta: vec![meta],
            players,
            events,
            shots,
            passes,
            defensive,
            gk_actions,
            formations,
            positions,
            score,
            formations_scored,
        }
    }

    /// Tables as JSON records, in output order.
    pub fn named_records(&self) -> Result<Vec<(&'static str, Vec<Value>)>> {
        Ok(vec![
            ("match_meta", records(&self.match_meta)?),
            ("players", records(&self.players)?),
            ("events", records(&self.events)?),
            ("events_shots", records(&self.shots)?),
            ("events_passes", records(&self.passes)?),
            ("events_defensive", records(&self.defensive)?),
            ("events_gk_actions", records(&self.gk_actions)?),
            ("formations_timeline", records(&self.formations)?),
            ("player_positions_timeline", records(&self.positions)?),
            ("score_timeline", records(&self.score)?),
            ("formations_timeline_scored", records(&self.formations_scored)?),
        ])
    }
}

fn records<T: Serialize>(rows: &[T]) -> Result<Vec<Value>> {
    rows.iter()
        .map(|r| serde_json::to_value(r).map_err(EtlError::from))
        .collect()
}

/// Folder names for a match: `<comp>/<season>/<YYYYMMDD>_<home>_vs_<away>_<id>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchLayout {
    pub comp_slug: String,
    pub season_slug: String,
    pub match_slug: String,
}

impl MatchLayout {
    pub fn new(match_id: Option<i64>, centre: &MatchCentre) -> Self {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let home = non_empty(&centre.home.name).unwrap_or_else(|| "Home".to_string());
        let away = non_empty(&centre.away.name).unwrap_or_else(|| "Away".to_string());
        let comp = non_empty(&centre.competition_name)
            .or_else(|| non_empty(&centre.tournament_name))
            .unwrap_or_else(|| "Competition".to_string());
        let season = non_empty(&centre.season_name).unwrap_or_else(|| "Season".to_string());
        let date: String = centre
            .start_time
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(10)
            .filter(|c| *c != '-')
            .collect();
        let id = match_id.map_or_else(|| "unknown".to_string(), |id| id.to_string());

        Self {
            comp_slug: path_slug(&comp),
            season_slug: path_slug(&season),
            match_slug: format!("{}_{}_vs_{}_{}", date, path_slug(&home), path_slug(&away), id),
        }
    }

    /// Match directory relative to the output root.
    pub fn match_dir(&self) -> String {
        format!(
            "MatchCenter/{}/{}/{}",
            self.comp_slug, self.season_slug, self.match_slug
        )
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// CSV cell text: nulls are empty, nested values are compact JSON.
pub fn csv_cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        nested => nested.to_string(),
    }
}

/// BOM-prefixed CSV with the columns of the first record.
pub fn records_to_csv(rows: &[Value]) -> Result<Vec<u8>> {
    let header: Vec<String> = rows
        .first()
        .and_then(Value::as_object)
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();

    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    wtr.write_record(&header)?;
    for row in rows {
        let cells = header
            .iter()
            .map(|col| row.get(col).map(csv_cell).unwrap_or_default());
        wtr.write_record(cells)?;
    }
    wtr.into_inner().map_err(|e| EtlError::IoError(e.into_error()))
}

/// Result of writing one match.
#[derive(Debug, Clone)]
pub struct SavedMatch {
    pub out_dir: PathBuf,
    pub manifest: Manifest,
}

struct MatchWriter<'a, S: Storage> {
    storage: &'a S,
    match_dir: String,
    written: Vec<(String, Vec<u8>)>,
}

impl<'a, S: Storage> MatchWriter<'a, S> {
    async fn put(&mut self, rel: String, data: Vec<u8>) -> Result<String> {
        self.storage
            .write_file(&format!("{}/{}", self.match_dir, rel), &data)
            .await?;
        let digest = sha256_hex(&data);
        self.written.push((rel, data));
        Ok(digest)
    }

    async fn put_json<T: Serialize + ?Sized>(&mut self, rel: String, value: &T) -> Result<String> {
        let data = serde_json::to_vec_pretty(value)?;
        self.put(rel, data).await
    }

    fn archive(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (rel, data) in &self.written {
            zip.start_file::<_, ()>(rel.as_str(), FileOptions::default())?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

/// Write every table, `payload.json`, `event_types.json` (when present) and
/// `manifest.json` under the match directory of `storage`.
pub async fn save_all_tables<S: Storage>(
    storage: &S,
    payload: &MatchPayload,
    archive: bool,
) -> Result<SavedMatch> {
    let centre = payload.centre()?;
    let tables = MatchTables::from_centre(payload, &centre);
    let layout = MatchLayout::new(tables.match_id, &centre);
    let match_dir = layout.match_dir();

    let mut writer = MatchWriter {
        storage,
        match_dir: match_dir.clone(),
        written: Vec::new(),
    };

    let mut manifest = Manifest {
        match_id: tables.match_id,
        created_at: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        normalized_dir: storage
            .locate(&format!("{}/normalized", match_dir))
            .display()
            .to_string(),
        csv_dir: storage
            .locate(&format!("{}/csv", match_dir))
            .display()
            .to_string(),
        tables: BTreeMap::new(),
        payload: None,
        event_types: None,
        archive: None,
    };

    for (name, rows) in tables.named_records()? {
        let json = format!("{}.json", name);
        let csv = format!("{}.csv", name);
        let mut entry = TableEntry {
            rows: rows.len(),
            json: json.clone(),
            csv: csv.clone(),
            json_sha256: None,
            csv_sha256: None,
        };
        if !rows.is_empty() {
            entry.json_sha256 = Some(writer.put_json(format!("normalized/{}", json), &rows).await?);
            entry.csv_sha256 = Some(writer.put(format!("csv/{}", csv), records_to_csv(&rows)?).await?);
        } else {
            tracing::debug!("Table {} is empty; not written", name);
        }
        manifest.tables.insert(name.to_string(), entry);
    }

    let digest = writer
        .put_json("normalized/payload.json".to_string(), payload)
        .await?;
    manifest.payload = Some(FileEntry {
        file: "payload.json".to_string(),
        sha256: digest,
    });

    if let Some(types) = payload
        .match_centre_event_type
        .as_ref()
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
    {
        let digest = writer
            .put_json("normalized/event_types.json".to_string(), types)
            .await?;
        manifest.event_types = Some(FileEntry {
            file: "event_types.json".to_string(),
            sha256: digest,
        });
    }

    let archive_name = format!("{}.zip", layout.match_slug);
    if archive {
        manifest.archive = Some(archive_name.clone());
    }
    writer
        .put_json("normalized/manifest.json".to_string(), &manifest)
        .await?;

    if archive {
        let zip_data = writer.archive()?;
        tracing::debug!("Writing archive {} ({} bytes)", archive_name, zip_data.len());
        let parent = format!("MatchCenter/{}/{}", layout.comp_slug, layout.season_slug);
        storage
            .write_file(&format!("{}/{}", parent, archive_name), &zip_data)
            .await?;
    }

    let out_dir = storage.locate(&match_dir);
    tracing::info!("Match {:?} written to {}", tables.match_id, out_dir.display());
    Ok(SavedMatch { out_dir, manifest })
}
