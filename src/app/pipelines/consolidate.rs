use crate::core::dictionaries::{read_csv_safe, CsvTable};
use crate::core::fixtures::{concat_tables, monthly_files, save_consolidated, season_dir};
use crate::core::Pipeline;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Folds every monthly `finished_matches.csv` of a season into the
/// season-level file.
pub struct ConsolidatePipeline {
    pub(crate) out_dir: PathBuf,
    pub(crate) comp: String,
    pub(crate) season: String,
}

impl ConsolidatePipeline {
    pub fn new(out_dir: PathBuf, comp: String, season: String) -> Self {
        Self {
            out_dir,
            comp,
            season,
        }
    }
}

#[async_trait::async_trait]
impl Pipeline for ConsolidatePipeline {
    type Raw = Vec<CsvTable>;
    type Output = CsvTable;

    fn name(&self) -> &str {
        "consolidate"
    }

    async fn extract(&self) -> Result<Vec<CsvTable>> {
        let dir = season_dir(&self.out_dir, &self.comp, &self.season);
        let files = monthly_files(&dir);
        tracing::info!("📂 {} monthly files under {}", files.len(), dir.display());

        let mut tables = Vec::new();
        for file in files {
            if let Some(table) = read_csv_safe(&file)? {
                tracing::debug!("{} rows in {}", table.rows.len(), file.display());
                tables.push(table);
            }
        }
        Ok(tables)
    }

    async fn transform(&self, tables: Vec<CsvTable>) -> Result<CsvTable> {
        Ok(concat_tables(tables))
    }

    async fn load(&self, table: CsvTable) -> Result<String> {
        let target = save_consolidated(&table, &self.out_dir, &self.comp, &self.season)?;
        Ok(target.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::etl::EtlEngine;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_months_fold_into_season_file() {
        let dir = TempDir::new().unwrap();
        let season = dir.path().join("DataFixtures/LaLiga/2025-2026");
        for (month, body) in [
            ("2025-09", "match_date,start_time,match_id\n2025-09-01,21:00,2\n"),
            ("2025-08", "\u{feff}match_date,start_time,match_id\n2025-08-15,21:00,1\n2025-08-16,,2\n"),
        ] {
            std::fs::create_dir_all(season.join(month)).unwrap();
            std::fs::write(season.join(month).join("finished_matches.csv"), body).unwrap();
        }

        let pipeline = ConsolidatePipeline::new(
            dir.path().to_path_buf(),
            "LaLiga".to_string(),
            "2025-2026".to_string(),
        );
        let target = tokio_test::assert_ok!(EtlEngine::new(pipeline).run().await);

        let table = read_csv_safe(std::path::Path::new(&target)).unwrap().unwrap();
        let id = table.column(&["match_id"]);
        let date = table.column(&["match_date"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(0, id), Some("1"));
        // September's row for match 2 comes last and wins.
        assert_eq!(table.cell(1, date), Some("2025-09-01"));
    }
}
