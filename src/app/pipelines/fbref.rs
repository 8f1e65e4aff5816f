use crate::adapters::http::FilePageSource;
use crate::core::batch::Pacing;
use crate::core::fbref::{build_masters, log_quality, output_file, stat_pages, FbrefMasters, StatPages};
use crate::core::Pipeline;
use crate::domain::ports::PageSource;
use crate::utils::error::Result;
use std::path::PathBuf;

pub const OUTFIELD_PREFIX: &str = "jugadores_campo";
pub const KEEPERS_PREFIX: &str = "porteros";

/// Where the nine stats pages come from.
#[derive(Debug, Clone, PartialEq)]
pub enum FbrefInput {
    Web { base_url: String },
    /// A folder of saved pages named `<category>.html`.
    Files(PathBuf),
}

/// Big-5 season stats into one outfield and one goalkeeper CSV.
pub struct FbrefPipeline {
    pub(crate) input: FbrefInput,
    pub(crate) season: String,
    pub(crate) out_dir: PathBuf,
    pub(crate) web: Box<dyn PageSource>,
    pub(crate) pacing: Pacing,
}

impl FbrefPipeline {
    pub fn new(input: FbrefInput, season: String, out_dir: PathBuf, web: Box<dyn PageSource>) -> Self {
        Self {
            input,
            season,
            out_dir,
            web,
            pacing: Pacing::none(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn outfield_csv(&self) -> PathBuf {
        self.out_dir.join(output_file(OUTFIELD_PREFIX, &self.season))
    }

    pub fn keepers_csv(&self) -> PathBuf {
        self.out_dir.join(output_file(KEEPERS_PREFIX, &self.season))
    }
}

#[async_trait::async_trait]
impl Pipeline for FbrefPipeline {
    type Raw = StatPages;
    type Output = FbrefMasters;

    fn name(&self) -> &str {
        "fbref"
    }

    async fn extract(&self) -> Result<StatPages> {
        let pages = stat_pages();
        let mut html = StatPages::new();
        for (done, page) in pages.iter().enumerate() {
            let body = match &self.input {
                FbrefInput::Web { base_url } => {
                    if done > 0 {
                        self.pacing.pause(done).await;
                    }
                    let url = page.url(base_url);
                    tracing::info!("🌐 Fetching {} ({}/{})", url, done + 1, pages.len());
                    self.web.fetch(&url).await?
                }
                FbrefInput::Files(dir) => {
                    FilePageSource::rooted(dir).fetch(&page.file_name()).await?
                }
            };
            html.insert(page.category, body);
        }
        Ok(html)
    }

    async fn transform(&self, pages: StatPages) -> Result<FbrefMasters> {
        let masters = build_masters(&pages, &self.season)?;
        log_quality("outfield", &masters.outfield);
        log_quality("goalkeepers", &masters.goalkeepers);
        Ok(masters)
    }

    async fn load(&self, masters: FbrefMasters) -> Result<String> {
        let outfield = self.outfield_csv();
        let keepers = self.keepers_csv();
        masters.outfield.write_csv(&outfield)?;
        masters.goalkeepers.write_csv(&keepers)?;
        tracing::info!("✅ {} outfield rows -> {}", masters.outfield.len(), outfield.display());
        tracing::info!("✅ {} goalkeeper rows -> {}", masters.goalkeepers.len(), keepers.display());
        Ok(format!(
            "{} outfield players and {} goalkeepers under {}",
            masters.outfield.len(),
            masters.goalkeepers.len(),
            self.out_dir.display()
        ))
    }
}
