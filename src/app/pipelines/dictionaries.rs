use crate::core::dictionaries::{
    collect_players, collect_teams, iter_match_folders, load_players_master, load_team_identity,
    merge_by_key, write_dictionary, PLAYERS_CSV, TEAM_CSV,
};
use crate::core::Pipeline;
use crate::domain::model::{PlayerMaster, TeamIdentity};
use crate::utils::error::Result;
use std::path::PathBuf;

/// Rows for each dictionary being rebuilt; `None` when it is skipped.
#[derive(Debug, Default)]
pub struct DictionaryRows {
    pub teams: Option<Vec<TeamIdentity>>,
    pub players: Option<Vec<PlayerMaster>>,
}

/// Rebuilds `team_identity.csv` and `players_master.csv` from ingested matches,
/// merging into whatever is already on disk.
pub struct DictionaryPipeline {
    pub(crate) matchcenter_dir: PathBuf,
    pub(crate) assets_dir: PathBuf,
    pub(crate) dictionaries_dir: PathBuf,
    pub(crate) max_matches: usize,
    pub(crate) teams: bool,
    pub(crate) players: bool,
}

impl DictionaryPipeline {
    pub fn new(matchcenter_dir: PathBuf, assets_dir: PathBuf, dictionaries_dir: PathBuf) -> Self {
        Self {
            matchcenter_dir,
            assets_dir,
            dictionaries_dir,
            max_matches: 10,
            teams: true,
            players: true,
        }
    }

    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }

    /// `--teams-only` / `--players-only`; both or neither means both.
    pub fn only(mut self, teams_only: bool, players_only: bool) -> Self {
        if teams_only != players_only {
            self.teams = teams_only;
            self.players = players_only;
        }
        self
    }

    fn team_csv(&self) -> PathBuf {
        self.dictionaries_dir.join(TEAM_CSV)
    }

    fn players_csv(&self) -> PathBuf {
        self.dictionaries_dir.join(PLAYERS_CSV)
    }
}

#[async_trait::async_trait]
impl Pipeline for DictionaryPipeline {
    type Raw = DictionaryRows;
    type Output = DictionaryRows;

    fn name(&self) -> &str {
        "dictionaries"
    }

    async fn extract(&self) -> Result<DictionaryRows> {
        let folders = iter_match_folders(&self.matchcenter_dir).len();
        if folders == 0 {
            tracing::warn!(
                "⚠️ No match folders with csv/ under {}",
                self.matchcenter_dir.display()
            );
        } else {
            tracing::info!("📂 {} match folders under {}", folders, self.matchcenter_dir.display());
        }

        let mut rows = DictionaryRows::default();
        if self.teams {
            rows.teams = Some(collect_teams(
                &self.matchcenter_dir,
                &self.assets_dir,
                self.max_matches,
            )?);
        }
        if self.players {
            rows.players = Some(collect_players(&self.matchcenter_dir)?);
        }
        Ok(rows)
    }

    async fn transform(&self, fresh: DictionaryRows) -> Result<DictionaryRows> {
        let mut merged = DictionaryRows::default();
        if let Some(teams) = fresh.teams {
            let old = load_team_identity(&self.team_csv())?;
            tracing::debug!("Merging {} teams into {} known", teams.len(), old.len());
            merged.teams = Some(merge_by_key(old, teams, |t| t.team_id));
        }
        if let Some(players) = fresh.players {
            let old = load_players_master(&self.players_csv())?;
            tracing::debug!("Merging {} players into {} known", players.len(), old.len());
            merged.players = Some(merge_by_key(old, players, |p| p.player_id));
        }
        Ok(merged)
    }

    async fn load(&self, rows: DictionaryRows) -> Result<String> {
        if let Some(teams) = rows.teams {
            write_dictionary(&self.team_csv(), &teams)?;
            tracing::info!("✅ Unique teams: {} -> {}", teams.len(), self.team_csv().display());
        }
        if let Some(players) = rows.players {
            write_dictionary(&self.players_csv(), &players)?;
            tracing::info!(
                "✅ Unique players: {} -> {}",
                players.len(),
                self.players_csv().display()
            );
        }
        Ok(self.dictionaries_dir.display().to_string())
    }
}
