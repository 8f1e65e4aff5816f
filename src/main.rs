use clap::Parser;
use matchcenter_etl::app::pipelines::{
    ConsolidatePipeline, DictionaryPipeline, FbrefInput, FbrefPipeline, FixturesPipeline,
    MatchCenterPipeline, MatchSource,
};
use matchcenter_etl::config::cli::{Cli, Command};
use matchcenter_etl::core::batch::process_from_csv;
use matchcenter_etl::core::dictionaries::TEAM_CSV;
use matchcenter_etl::core::identity::TeamIdentityBook;
use matchcenter_etl::core::render::render_shot_map;
use matchcenter_etl::core::ConfigProvider;
use matchcenter_etl::utils::error::ErrorSeverity;
use matchcenter_etl::utils::{logger, validation::Validate};
use matchcenter_etl::adapters::RetryPageSource;
use matchcenter_etl::{AppConfig, EtlEngine, EtlError, HttpPageSource, LocalStorage, Result};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::info!("Starting matchcenter-etl");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(cli.command, &config, monitor_enabled).await {
        Ok(output) => {
            tracing::info!("✅ Done");
            println!("✅ {}", output);
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            if e.severity() != ErrorSeverity::Low {
                std::process::exit(e.exit_code());
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path.display());
            AppConfig::from_file(path)?
        }
        None => AppConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}

fn http_source(config: &AppConfig) -> Result<HttpPageSource> {
    HttpPageSource::new(
        &config.fetch.user_agent,
        &config.fetch.accept_language,
        config.timeout(),
    )
}

async fn run(command: Command, config: &AppConfig, monitor: bool) -> Result<String> {
    match command {
        Command::Match(args) => {
            let source = MatchSource::from_args(args.html, args.url, args.match_id)?;
            let out = args.out.unwrap_or_else(|| config.matchcenter_dir());
            let pipeline = MatchCenterPipeline::for_source(
                LocalStorage::new(out),
                &source,
                http_source(config)?,
                config.base_url(),
                args.archive || config.output.archive,
            );
            EtlEngine::new_with_monitoring(pipeline, monitor).run().await
        }
        Command::Batch(args) => {
            let out = args.out.unwrap_or_else(|| config.matchcenter_dir());
            let storage = LocalStorage::new(&out);
            let saved = process_from_csv(
                &http_source(config)?,
                &storage,
                &args.from_csv,
                config.base_url(),
                args.limit.or(config.batch.limit),
                &config.pacing(),
                args.archive || config.output.archive,
            )
            .await?;
            if saved.is_empty() {
                return Err(EtlError::processing("no match in the batch could be ingested"));
            }
            Ok(format!("{} matches saved under {}", saved.len(), out.display()))
        }
        Command::Dictionaries(args) => {
            let pipeline = DictionaryPipeline::new(
                config.matchcenter_dir(),
                config.assets_dir(),
                config.dictionaries_dir(),
            )
            .with_max_matches(args.max_matches)
            .only(args.teams_only, args.players_only);
            EtlEngine::new_with_monitoring(pipeline, monitor).run().await
        }
        Command::Fixtures(args) => {
            let pipeline = FixturesPipeline::new(
                args.input(),
                args.scope()?,
                args.out.clone().unwrap_or_else(|| config.fixtures_dir()),
                config.base_url().to_string(),
                Box::new(http_source(config)?),
            )
            .with_comp_season(args.comp.clone(), args.season.clone())
            .with_enrich_times(args.enrich_times);
            EtlEngine::new_with_monitoring(pipeline, monitor).run().await
        }
        Command::Consolidate(args) => {
            let pipeline = ConsolidatePipeline::new(
                args.out.unwrap_or_else(|| config.fixtures_dir()),
                args.comp,
                args.season,
            );
            EtlEngine::new_with_monitoring(pipeline, monitor).run().await
        }
        Command::Render(args) => {
            let identity = args
                .identity
                .unwrap_or_else(|| config.dictionaries_dir().join(TEAM_CSV));
            let book = TeamIdentityBook::load(&identity)?;
            if book.is_empty() {
                tracing::warn!("No team identities in {}; using default colours", identity.display());
            }
            let chart = render_shot_map(&args.match_dir, &book)?;
            Ok(chart.display().to_string())
        }
        Command::Fbref(args) => {
            let input = match args.html_dir {
                Some(dir) => FbrefInput::Files(dir),
                None => FbrefInput::Web {
                    base_url: config.fbref_url().to_string(),
                },
            };
            let web = RetryPageSource::new(
                http_source(config)?,
                config.fbref.retry_attempts,
                config.fbref.retry_backoff_secs,
            );
            let pipeline = FbrefPipeline::new(
                input,
                args.season.unwrap_or_else(|| config.fbref.season.clone()),
                args.out.unwrap_or_else(|| config.fbref_dir()),
                Box::new(web),
            )
            .with_pacing(config.fbref_pacing());
            EtlEngine::new_with_monitoring(pipeline, monitor).run().await
        }
    }
}
