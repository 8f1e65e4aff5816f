use crate::adapters::http::{live_url, FilePageSource};
use crate::core::fixtures::{
    append_dedup_csv, apply_round_overrides, filter_date_range, fixtures_table, infer_comp_season, month_key,
    month_label, months_between, parse_fixtures_page, season_dir, start_time_from_match_page,
    to_json_records, FINISHED_CSV, FINISHED_JSON, ROUND_OVERRIDES_CSV,
};
use crate::core::Pipeline;
use crate::domain::model::FixtureRecord;
use crate::domain::ports::PageSource;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

const ENRICH_PAUSE: Duration = Duration::from_millis(250);

/// Fixtures pages to read: saved HTML files, or one live URL.
#[derive(Debug, Clone, PartialEq)]
pub enum FixturesInput {
    Files(Vec<PathBuf>),
    Url(String),
}

/// Which folder a run writes to below `<comp>/<season>`.
#[derive(Debug, Clone, PartialEq)]
pub enum FixturesScope {
    /// `--month "ago 2025"`: the `YYYY-MM` subfolder.
    Month(String),
    /// `--from/--to`: the season folder, keeping only dates in range.
    Range { from: NaiveDate, to: NaiveDate },
    /// The season folder, every finished match on the pages.
    Season,
}

pub struct FetchedPage {
    pub location: String,
    pub html: String,
}

/// Finished fixtures plus the folders they belong in.
#[derive(Debug, Clone)]
pub struct FixturesBatch {
    pub comp: String,
    pub season: String,
    pub records: Vec<FixtureRecord>,
}

pub struct FixturesPipeline {
    pub(crate) input: FixturesInput,
    pub(crate) scope: FixturesScope,
    pub(crate) out_dir: PathBuf,
    pub(crate) base_url: String,
    /// Used for `Url` input and for start-time enrichment.
    pub(crate) web: Box<dyn PageSource>,
    pub(crate) comp: Option<String>,
    pub(crate) season: Option<String>,
    pub(crate) enrich_times: bool,
}

impl FixturesPipeline {
    pub fn new(
        input: FixturesInput,
        scope: FixturesScope,
        out_dir: PathBuf,
        base_url: String,
        web: Box<dyn PageSource>,
    ) -> Self {
        Self {
            input,
            scope,
            out_dir,
            base_url,
            web,
            comp: None,
            season: None,
            enrich_times: false,
        }
    }

    /// Folder names to use instead of inferring them from the page.
    pub fn with_comp_season(mut self, comp: Option<String>, season: Option<String>) -> Self {
        self.comp = comp;
        self.season = season;
        self
    }

    pub fn with_enrich_times(mut self, enrich: bool) -> Self {
        self.enrich_times = enrich;
        self
    }

    /// Start times are missing from fixtures pages in some layouts; read them
    /// from each match's live page.
    async fn enrich_start_times(&self, records: &mut [FixtureRecord]) {
        let pending = records.iter().filter(|r| r.start_time.is_none()).count();
        if pending == 0 {
            return;
        }
        tracing::info!("🕒 Looking up start times for {} matches", pending);

        for rec in records.iter_mut().filter(|r| r.start_time.is_none()) {
            let url = live_url(&self.base_url, &rec.match_id);
            match self.web.fetch(&url).await {
                Ok(html) => rec.start_time = start_time_from_match_page(&html),
                Err(e) => tracing::warn!("No start time for {}: {}", rec.match_id, e),
            }
            tokio::time::sleep(ENRICH_PAUSE).await;
        }
    }
}

#[async_trait::async_trait]
impl Pipeline for FixturesPipeline {
    type Raw = Vec<FetchedPage>;
    type Output = FixturesBatch;

    fn name(&self) -> &str {
        "fixtures"
    }

    async fn extract(&self) -> Result<Vec<FetchedPage>> {
        let mut pages = Vec::new();
        match &self.input {
            FixturesInput::Files(paths) => {
                if paths.is_empty() {
                    return Err(EtlError::MissingSource);
                }
                let files = FilePageSource::new();
                for path in paths {
                    let location = path.display().to_string();
                    let html = files.fetch(&location).await?;
                    pages.push(FetchedPage { location, html });
                }
            }
            FixturesInput::Url(url) => {
                tracing::info!("🌐 Fetching fixtures page {}", url);
                let html = self.web.fetch(url).await?;
                pages.push(FetchedPage {
                    location: url.clone(),
                    html,
                });
            }
        }

        if let FixturesScope::Range { from, to } = &self.scope {
            let months: Vec<String> = months_between(*from, *to)
                .into_iter()
                .map(|(y, m)| month_label(y, m))
                .collect();
            tracing::info!(
                "Range {}..{} spans {}; pages cover what they show",
                from,
                to,
                months.join(", ")
            );
        }
        Ok(pages)
    }

    async fn transform(&self, pages: Vec<FetchedPage>) -> Result<FixturesBatch> {
        let first = pages.first().ok_or(EtlError::MissingSource)?;
        let url = match &self.input {
            FixturesInput::Url(url) => Some(url.as_str()),
            FixturesInput::Files(_) => None,
        };
        let (inferred_comp, inferred_season) = infer_comp_season(url, Some(&first.html));
        let comp = self.comp.clone().unwrap_or(inferred_comp);
        let season = self.season.clone().unwrap_or(inferred_season);

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for page in &pages {
            let parsed = parse_fixtures_page(&page.html, &self.base_url);
            tracing::info!("{} finished matches in {}", parsed.len(), page.location);
            records.extend(parsed.into_iter().filter(|r| seen.insert(r.match_id.clone())));
        }

        if let FixturesScope::Range { from, to } = &self.scope {
            let before = records.len();
            records = filter_date_range(records, *from, *to);
            tracing::debug!("Kept {}/{} matches within range", records.len(), before);
        }

        if self.enrich_times {
            self.enrich_start_times(&mut records).await;
        }

        Ok(FixturesBatch {
            comp,
            season,
            records,
        })
    }

    async fn load(&self, mut batch: FixturesBatch) -> Result<String> {
        let season_root = season_dir(&self.out_dir, &batch.comp, &batch.season);
        let run_dir = match &self.scope {
            FixturesScope::Month(label) => season_root.join(month_key(label)),
            FixturesScope::Range { .. } | FixturesScope::Season => season_root.clone(),
        };

        if batch.records.is_empty() {
            tracing::warn!("⚠️ No finished matches found; nothing written");
            return Ok(run_dir.display().to_string());
        }

        std::fs::create_dir_all(&run_dir)?;
        apply_round_overrides(&mut batch.records, &season_root.join(ROUND_OVERRIDES_CSV))?;

        let csv_path = run_dir.join(FINISHED_CSV);
        let merged = append_dedup_csv(&fixtures_table(&batch.records), &csv_path, "match_id")?;
        to_json_records(&batch.records, &run_dir.join(FINISHED_JSON))?;
        tracing::info!(
            "✅ {} new, {} total finished matches -> {}",
            batch.records.len(),
            merged.rows.len(),
            csv_path.display()
        );
        Ok(run_dir.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const PAGE: &str = r#"<html><body>
<h1>España - LaLiga 2025/2026</h1>
<div class="Accordion-module_accordion__x1">
  <div class="Accordion-module_header__x2"><span>viernes, ago 15 2025</span></div>
  <div class="Match-module_row__r1">
    <div class="Match-module_teamName__t1"><a href="/Teams/1">Girona</a></div>
    <a id="scoresBtn-1900001" href="/Matches/1900001/Live/Espana-LaLiga"><span>1</span><span>3</span></a>
    <div class="Match-module_teamName__t2"><a href="/Teams/2">Rayo Vallecano</a></div>
  </div>
</div>
<div class="Accordion-module_accordion__x1">
  <div class="Accordion-module_header__x2"><span>sábado, sep 13 2025</span></div>
  <div class="Match-module_row__r1">
    <div class="Match-module_teamName__t1"><a href="/Teams/3">Sevilla</a></div>
    <a id="scoresBtn-1900002" href="/Matches/1900002/Live/Espana-LaLiga"><span>2</span><span>2</span></a>
    <div class="Match-module_teamName__t2"><a href="/Teams/4">Elche</a></div>
  </div>
</div>
</body></html>"#;

    /// Serves canned pages and records what was asked for.
    #[derive(Default)]
    struct CannedPages {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageSource for CannedPages {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or(EtlError::HttpStatusError {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn saved_page(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("fixtures.html");
        std::fs::write(&path, PAGE).unwrap();
        path
    }

    #[tokio::test]
    async fn test_month_run_writes_month_folder() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let pipeline = FixturesPipeline::new(
            FixturesInput::Files(vec![saved_page(&dir)]),
            FixturesScope::Month("ago 2025".to_string()),
            out.clone(),
            "https://es.whoscored.com".to_string(),
            Box::new(CannedPages::default()),
        );

        let pages = pipeline.extract().await.unwrap();
        let batch = pipeline.transform(pages).await.unwrap();
        assert_eq!(batch.comp, "LaLiga");
        assert_eq!(batch.season, "2025-2026");
        assert_eq!(batch.records.len(), 2);

        let written = pipeline.load(batch).await.unwrap();
        let month_dir = out.join("DataFixtures/LaLiga/2025-2026/2025-08");
        assert_eq!(PathBuf::from(written), month_dir);
        assert!(month_dir.join(FINISHED_CSV).exists());
        assert!(month_dir.join(FINISHED_JSON).exists());
        assert!(out
            .join("DataFixtures/LaLiga/2025-2026")
            .join(ROUND_OVERRIDES_CSV)
            .exists());
    }

    #[tokio::test]
    async fn test_range_run_filters_and_enriches() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let live = "https://es.whoscored.com/Matches/1900002/Live";
        let web = CannedPages {
            pages: HashMap::from([(
                live.to_string(),
                r#"<div id="match-header"><span>Sevilla</span> <dd>21:00</dd></div>"#.to_string(),
            )]),
            ..Default::default()
        };
        let pipeline = FixturesPipeline::new(
            FixturesInput::Files(vec![saved_page(&dir)]),
            FixturesScope::Range {
                from: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                to: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
            },
            out.clone(),
            "https://es.whoscored.com".to_string(),
            Box::new(web),
        )
        .with_comp_season(Some("laliga".to_string()), None)
        .with_enrich_times(true);

        let pages = pipeline.extract().await.unwrap();
        let batch = pipeline.transform(pages).await.unwrap();
        assert_eq!(batch.comp, "laliga");
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].match_id, "1900002");
        assert_eq!(batch.records[0].start_time.as_deref(), Some("21:00"));

        pipeline.load(batch).await.unwrap();
        let csv = std::fs::read_to_string(out.join("DataFixtures/laliga/2025-2026").join(FINISHED_CSV))
            .unwrap();
        assert!(csv.contains("1900002"));
        assert!(!csv.contains("1900001"));
    }

    #[tokio::test]
    async fn test_no_pages_is_missing_source() {
        let pipeline = FixturesPipeline::new(
            FixturesInput::Files(Vec::new()),
            FixturesScope::Season,
            PathBuf::from("unused"),
            String::new(),
            Box::new(CannedPages::default()),
        );
        assert!(matches!(pipeline.extract().await, Err(EtlError::MissingSource)));
    }
}
