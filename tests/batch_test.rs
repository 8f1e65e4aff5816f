mod common;

use common::{match_centre_html, match_dir_name};
use httpmock::prelude::*;
use matchcenter_etl::core::batch::{process_from_csv, Pacing};
use matchcenter_etl::{HttpPageSource, LocalStorage};
use tempfile::TempDir;

#[tokio::test]
async fn test_batch_continues_past_failures() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let ok_by_url = server.mock(|when, then| {
        when.method(GET).path("/Matches/1913930/Live");
        then.status(200).body(match_centre_html(1913930));
    });
    let blocked = server.mock(|when, then| {
        when.method(GET).path("/Matches/1913931/Show/Match-Centre");
        then.status(403);
    });
    let ok_by_id = server.mock(|when, then| {
        when.method(GET).path("/Matches/1913932/Show/Match-Centre");
        then.status(200).body(match_centre_html(1913932));
    });

    let csv = temp_dir.path().join("finished_matches.csv");
    std::fs::write(
        &csv,
        format!(
            "\u{feff}match_date,match_id,match_centre_url\n\
             2025-08-19,1913930,{}\n\
             2025-08-20,1913931,\n\
             2025-08-21,1913932,\n\
             2025-08-22,1913933,\n",
            server.url("/Matches/1913930/Live")
        ),
    )
    .unwrap();

    let out = temp_dir.path().join("out");
    let saved = process_from_csv(
        &HttpPageSource::default(),
        &LocalStorage::new(&out),
        &csv,
        &server.base_url(),
        Some(3),
        &Pacing::none(),
        false,
    )
    .await
    .unwrap();

    ok_by_url.assert();
    blocked.assert();
    ok_by_id.assert();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].manifest.match_id, Some(1913930));
    assert_eq!(saved[1].out_dir, out.join(match_dir_name(1913932)));
    assert!(!out.join(match_dir_name(1913931)).exists());
}

#[tokio::test]
async fn test_batch_rejects_csv_without_match_columns() {
    let temp_dir = TempDir::new().unwrap();
    let csv = temp_dir.path().join("teams.csv");
    std::fs::write(&csv, "home,away\nGirona,Rayo\n").unwrap();

    let result = process_from_csv(
        &HttpPageSource::default(),
        &LocalStorage::new(temp_dir.path()),
        &csv,
        "https://es.whoscored.com",
        None,
        &Pacing::none(),
        false,
    )
    .await;
    tokio_test::assert_err!(result);
}
