//! Ingest many matches listed in a fixtures CSV, one after another.

use crate::adapters::http::match_centre_url;
use crate::core::dictionaries::{parse_int, read_csv_safe};
use crate::core::payload::load_payload_from_html;
use crate::core::tables::{save_all_tables, SavedMatch};
use crate::domain::ports::{PageSource, Storage};
use crate::utils::error::{EtlError, Result};
use rand::Rng;
use std::path::Path;
use std::time::Duration;

const URL_COLUMNS: [&str; 3] = ["match_centre_url", "match_center_url", "match__centre_url"];

#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub row: usize,
    pub url: String,
    pub match_id: Option<i64>,
}

/// Jobs from a CSV with a match-centre URL column and/or a `match_id` column.
/// `limit` caps the CSV rows read; rows with neither value are skipped.
pub fn read_jobs(csv_path: &Path, base_url: &str, limit: Option<usize>) -> Result<Vec<BatchJob>> {
    let table = read_csv_safe(csv_path)?.ok_or_else(|| EtlError::ValidationError {
        message: format!("batch CSV {} does not exist", csv_path.display()),
    })?;
    let url_col = table.column(&URL_COLUMNS);
    let id_col = table.column(&["match_id"]);
    if url_col.is_none() && id_col.is_none() {
        return Err(EtlError::ValidationError {
            message: format!(
                "{} needs a match_id or match_centre_url column",
                csv_path.display()
            ),
        });
    }

    let rows = limit.map_or(table.rows.len(), |n| n.min(table.rows.len()));
    let mut jobs = Vec::new();
    for i in 0..rows {
        let match_id = table.cell(i, id_col).and_then(parse_int);
        let url = match (table.cell(i, url_col), match_id) {
            (Some(url), _) => url.to_string(),
            (None, Some(id)) => match_centre_url(base_url, id),
            (None, None) => {
                tracing::warn!("Row {} has no URL or match id; skipped", i + 1);
                continue;
            }
        };
        jobs.push(BatchJob {
            row: i + 1,
            url,
            match_id,
        });
    }
    Ok(jobs)
}

/// Pauses between page fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    pub pause_min_secs: f64,
    pub pause_max_secs: f64,
    pub cooldown_every: usize,
    pub cooldown_secs: f64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            pause_min_secs: 1.2,
            pause_max_secs: 2.8,
            cooldown_every: 8,
            cooldown_secs: 20.0,
        }
    }
}

impl Pacing {
    /// No waiting at all; for tests and local files.
    pub fn none() -> Self {
        Self {
            pause_min_secs: 0.0,
            pause_max_secs: 0.0,
            cooldown_every: 0,
            cooldown_secs: 0.0,
        }
    }

    /// Wait after `done` matches: a random pause in
    /// `[pause_min_secs, pause_max_secs]`, plus the cooldown every
    /// `cooldown_every` matches.
    pub fn delay_after(&self, done: usize) -> Duration {
        let (lo, hi) = (self.pause_min_secs.max(0.0), self.pause_max_secs.max(0.0));
        let mut secs = if hi <= lo {
            lo
        } else {
            rand::thread_rng().gen_range(lo..=hi)
        };
        if self.cooldown_every > 0 && done > 0 && done % self.cooldown_every == 0 {
            secs += self.cooldown_secs.max(0.0);
        }
        Duration::from_secs_f64(secs)
    }

    pub async fn pause(&self, done: usize) {
        let wait = self.delay_after(done);
        if wait.is_zero() {
            return;
        }
        tracing::debug!("Sleeping {:.1}s after {} matches", wait.as_secs_f64(), done);
        tokio::time::sleep(wait).await;
    }
}

/// Fetch one match centre page and write all of its tables.
pub async fn ingest_match<P, S>(source: &P, storage: &S, url: &str, archive: bool) -> Result<SavedMatch>
where
    P: PageSource + ?Sized,
    S: Storage,
{
    let html = source.fetch(url).await?;
    let payload = load_payload_from_html(&html)?;
    save_all_tables(storage, &payload, archive).await
}

/// Run every job in order. Failures are logged and skipped; the successful
/// matches are returned.
pub async fn process_jobs<P, S>(
    source: &P,
    storage: &S,
    jobs: &[BatchJob],
    pacing: &Pacing,
    archive: bool,
) -> Vec<SavedMatch>
where
    P: PageSource + ?Sized,
    S: Storage,
{
    let total = jobs.len();
    let mut saved = Vec::new();

    for (i, job) in jobs.iter().enumerate() {
        match ingest_match(source, storage, &job.url, archive).await {
            Ok(result) => {
                tracing::info!("✅ OK [{}/{}] -> {}", i + 1, total, result.out_dir.display());
                saved.push(result);
            }
            Err(e) => {
                tracing::error!(
                    "❌ ERROR [{}/{}] {} (match {:?}): {}",
                    i + 1,
                    total,
                    job.url,
                    job.match_id,
                    e
                );
            }
        }
        if i + 1 < total {
            pacing.pause(i + 1).await;
        }
    }

    tracing::info!("Batch finished: {}/{} matches saved", saved.len(), total);
    saved
}

pub async fn process_from_csv<P, S>(
    source: &P,
    storage: &S,
    csv_path: &Path,
    base_url: &str,
    limit: Option<usize>,
    pacing: &Pacing,
    archive: bool,
) -> Result<Vec<SavedMatch>>
where
    P: PageSource + ?Sized,
    S: Storage,
{
    let jobs = read_jobs(csv_path, base_url, limit)?;
    tracing::info!("📋 {} matches queued from {}", jobs.len(), csv_path.display());
    Ok(process_jobs(source, storage, &jobs, pacing, archive).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_jobs_prefers_url_column() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("finished.csv");
        std::fs::write(
            &csv,
            "\u{feff}match_id,match_centre_url\n\
             10,https://x.test/Matches/10/Live\n\
             11,\n\
             ,\n\
             12,\n",
        )
        .unwrap();

        let jobs = read_jobs(&csv, "https://es.whoscored.com", None).unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].url, "https://x.test/Matches/10/Live");
        assert_eq!(
            jobs[1].url,
            "https://es.whoscored.com/Matches/11/Show/Match-Centre"
        );
        assert_eq!(jobs[2].row, 4);

        let limited = read_jobs(&csv, "https://es.whoscored.com", Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
        // The limit counts CSV rows, so the empty third row still uses a slot.
        let limited = read_jobs(&csv, "https://es.whoscored.com", Some(3)).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].row, 2);
    }

    #[test]
    fn test_read_jobs_alternate_column_and_errors() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("a.csv");
        std::fs::write(&csv, "match__centre_url\nhttps://x.test/1\n").unwrap();
        let jobs = read_jobs(&csv, "", None).unwrap();
        assert_eq!(jobs[0].url, "https://x.test/1");
        assert_eq!(jobs[0].match_id, None);

        let bad = dir.path().join("b.csv");
        std::fs::write(&bad, "home,away\nA,B\n").unwrap();
        assert!(read_jobs(&bad, "", None).is_err());
        assert!(read_jobs(&dir.path().join("missing.csv"), "", None).is_err());
    }

    #[test]
    fn test_pacing_delays() {
        let pacing = Pacing::default();
        for done in [8, 16] {
            let d = pacing.delay_after(done).as_secs_f64();
            assert!(d > 20.0 && d <= 20.0 + 2.8 + 1e-9, "{}", d);
        }
        for done in 1..8 {
            let d = pacing.delay_after(done).as_secs_f64();
            assert!((1.2..=2.8).contains(&d), "{}", d);
        }
        assert!(Pacing::none().delay_after(3).is_zero());

        let fixed = Pacing {
            pause_min_secs: 2.0,
            pause_max_secs: 2.0,
            cooldown_every: 2,
            cooldown_secs: 5.0,
        };
        assert_eq!(fixed.delay_after(1), Duration::from_secs(2));
        assert_eq!(fixed.delay_after(2), Duration::from_secs(7));
    }
}
