use crate::adapters::http::{match_centre_url, FilePageSource, HttpPageSource};
use crate::core::payload::load_payload_from_html;
use crate::core::tables::save_all_tables;
use crate::core::{Pipeline, Storage};
use crate::domain::model::MatchPayload;
use crate::domain::ports::PageSource;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_match_id;
use std::path::PathBuf;

/// Where a single match centre page comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchSource {
    Html(PathBuf),
    Url(String),
    MatchId(i64),
}

impl MatchSource {
    /// First of `--html`, `--url`, `--match-id` that was given.
    pub fn from_args(
        html: Option<PathBuf>,
        url: Option<String>,
        match_id: Option<i64>,
    ) -> Result<Self> {
        match (html, url, match_id) {
            (Some(path), _, _) => Ok(Self::Html(path)),
            (None, Some(url), _) => Ok(Self::Url(url)),
            (None, None, Some(id)) => {
                validate_match_id(id)?;
                Ok(Self::MatchId(id))
            }
            (None, None, None) => Err(EtlError::MissingSource),
        }
    }

    /// Location handed to the page source.
    pub fn location(&self, base_url: &str) -> String {
        match self {
            Self::Html(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::MatchId(id) => match_centre_url(base_url, *id),
        }
    }
}

/// One match centre page in, normalized tables out.
pub struct MatchCenterPipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) source: Box<dyn PageSource>,
    pub(crate) location: String,
    pub(crate) archive: bool,
}

impl<S: Storage> MatchCenterPipeline<S> {
    pub fn new(storage: S, source: Box<dyn PageSource>, location: String, archive: bool) -> Self {
        Self {
            storage,
            source,
            location,
            archive,
        }
    }

    /// Saved HTML is read from disk; URLs and ids go through `http`.
    pub fn for_source(
        storage: S,
        source: &MatchSource,
        http: HttpPageSource,
        base_url: &str,
        archive: bool,
    ) -> Self {
        let page_source: Box<dyn PageSource> = match source {
            MatchSource::Html(_) => Box::new(FilePageSource::new()),
            MatchSource::Url(_) | MatchSource::MatchId(_) => Box::new(http),
        };
        Self::new(storage, page_source, source.location(base_url), archive)
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for MatchCenterPipeline<S> {
    type Raw = String;
    type Output = MatchPayload;

    fn name(&self) -> &str {
        "matchcenter"
    }

    async fn extract(&self) -> Result<String> {
        tracing::info!("🌐 Reading match centre page {}", self.location);
        let html = self.source.fetch(&self.location).await?;
        tracing::debug!("Page has {} characters", html.len());
        Ok(html)
    }

    async fn transform(&self, html: String) -> Result<MatchPayload> {
        let payload = load_payload_from_html(&html)?;
        tracing::info!(
            "Found payload for match {:?} (events {})",
            payload.match_id,
            payload
                .match_centre_data
                .as_ref()
                .and_then(|d| d.get("events"))
                .and_then(|e| e.as_array())
                .map_or(0, |e| e.len())
        );
        Ok(payload)
    }

    async fn load(&self, payload: MatchPayload) -> Result<String> {
        let saved = save_all_tables(&self.storage, &payload, self.archive).await?;
        Ok(saved.out_dir.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_precedence() {
        let src = MatchSource::from_args(Some("a.html".into()), Some("u".into()), Some(1)).unwrap();
        assert_eq!(src, MatchSource::Html("a.html".into()));
        let src = MatchSource::from_args(None, None, Some(1913916)).unwrap();
        assert_eq!(
            src.location("https://es.whoscored.com"),
            "https://es.whoscored.com/Matches/1913916/Show/Match-Centre"
        );
        assert!(matches!(
            MatchSource::from_args(None, None, None),
            Err(EtlError::MissingSource)
        ));
        assert!(matches!(
            MatchSource::from_args(None, None, Some(0)),
            Err(EtlError::ValidationError { .. })
        ));
    }
}
