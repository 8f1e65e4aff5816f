use httpmock::prelude::*;
use matchcenter_etl::app::pipelines::{
    ConsolidatePipeline, FixturesInput, FixturesPipeline, FixturesScope,
};
use matchcenter_etl::core::dictionaries::read_csv_safe;
use matchcenter_etl::core::fixtures::FINISHED_CSV;
use matchcenter_etl::{EtlEngine, HttpPageSource};
use tempfile::TempDir;

fn fixtures_page(rows: &[(&str, &str, &str, u32, u32)], day: &str) -> String {
    let mut html = String::from(
        r#"<html><body><div id="tournament-fixture-header"><h1>España - LaLiga 2025/2026</h1></div>"#,
    );
    html.push_str(&format!(
        r#"<div class="Accordion-module_accordion__aa"><div class="Accordion-module_header__bb"><span>{}</span></div>"#,
        day
    ));
    for (id, home, away, sh, sa) in rows {
        html.push_str(&format!(
            r#"<div class="Match-module_row__cc">
<div class="Match-module_teamName__dd"><a href="/Teams/1">{home}</a></div>
<a id="scoresBtn-{id}" href="/Matches/{id}/Live/Espana-LaLiga-2025-2026"><span>{sh}</span><span>{sa}</span></a>
<div class="Match-module_teamName__dd"><a href="/Teams/2">{away}</a></div>
</div>"#,
            id = id,
            home = home,
            away = away,
            sh = sh,
            sa = sa
        ));
    }
    html.push_str("</div></body></html>");
    html
}

#[tokio::test]
async fn test_fixtures_from_url_then_consolidate() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().to_path_buf();
    let server = MockServer::start();

    let august = server.mock(|when, then| {
        when.method(GET).path("/fixtures/espana-laliga-2025-2026");
        then.status(200).body(fixtures_page(
            &[("1900010", "Girona", "Rayo Vallecano", 1, 3), ("1900011", "Alavés", "Levante", 2, 1)],
            "viernes, ago 15 2025",
        ));
    });
    let live = server.mock(|when, then| {
        when.method(GET).path_contains("/Live");
        then.status(200)
            .body(r#"<div id="match-header"><span>x</span> <dd>19:30</dd></div>"#);
    });

    let pipeline = FixturesPipeline::new(
        FixturesInput::Url(server.url("/fixtures/espana-laliga-2025-2026")),
        FixturesScope::Month("ago 2025".to_string()),
        out.clone(),
        server.base_url(),
        Box::new(HttpPageSource::default()),
    )
    .with_enrich_times(true);
    let month_dir = tokio_test::assert_ok!(EtlEngine::new(pipeline).run().await);

    august.assert();
    live.assert_hits(2);
    assert!(month_dir.ends_with("DataFixtures/LaLiga/2025-2026/2025-08"));

    let month_csv = read_csv_safe(&std::path::Path::new(&month_dir).join(FINISHED_CSV))
        .unwrap()
        .unwrap();
    assert_eq!(month_csv.rows.len(), 2);
    let start = month_csv.column(&["start_time"]);
    assert_eq!(month_csv.cell(0, start), Some("19:30"));
    let home = month_csv.column(&["home_name"]);
    assert_eq!(month_csv.cell(1, home), Some("Alavés"));

    let consolidate =
        ConsolidatePipeline::new(out.clone(), "LaLiga".to_string(), "2025-2026".to_string());
    let season_file = EtlEngine::new(consolidate).run().await.unwrap();
    let season = read_csv_safe(std::path::Path::new(&season_file)).unwrap().unwrap();
    assert_eq!(season.rows.len(), 2);
    assert!(season_file.ends_with("DataFixtures/LaLiga/2025-2026/finished_matches.csv"));
}

#[tokio::test]
async fn test_repeated_month_runs_keep_first_row() {
    let temp_dir = TempDir::new().unwrap();
    let page = temp_dir.path().join("aug.html");

    for (score_home, expected_rows) in [(1, 1), (4, 2)] {
        let mut rows = vec![("1900020", "Sevilla", "Elche", score_home, 2)];
        if score_home == 4 {
            rows.push(("1900021", "Getafe", "Celta Vigo", 0, 0));
        }
        std::fs::write(&page, fixtures_page(&rows, "sábado, ago 23 2025")).unwrap();

        let pipeline = FixturesPipeline::new(
            FixturesInput::Files(vec![page.clone()]),
            FixturesScope::Month("ago 2025".to_string()),
            temp_dir.path().join("fixtures"),
            "https://es.whoscored.com".to_string(),
            Box::new(HttpPageSource::default()),
        )
        .with_comp_season(Some("laliga".to_string()), Some("2025-2026".to_string()));
        let dir = EtlEngine::new(pipeline).run().await.unwrap();

        let table = read_csv_safe(&std::path::Path::new(&dir).join(FINISHED_CSV))
            .unwrap()
            .unwrap();
        assert_eq!(table.rows.len(), expected_rows);
        let score = table.column(&["score_home"]);
        assert_eq!(table.cell(0, score), Some("1"));
    }
}
