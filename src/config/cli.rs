use crate::app::pipelines::{FixturesInput, FixturesScope};
use crate::utils::error::Result;
use crate::utils::validation::validate_date_range;
use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "matchcenter-etl")]
#[command(about = "Normalize WhoScored match centre pages and fixtures into CSV/JSON tables")]
#[command(version)]
pub struct Cli {
    /// TOML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory use per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Write logs as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest one match centre page
    Match(MatchArgs),
    /// Ingest every match listed in a fixtures CSV
    Batch(BatchArgs),
    /// Rebuild team and player dictionaries from ingested matches
    Dictionaries(DictionaryArgs),
    /// Extract finished fixtures from fixtures pages
    Fixtures(FixturesArgs),
    /// Merge monthly fixtures files into the season file
    Consolidate(ConsolidateArgs),
    /// Draw charts for an ingested match
    Render(RenderArgs),
    /// Big-5 league player season stats from FBRef
    Fbref(FbrefArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").args(["html", "url", "match_id"])))]
pub struct MatchArgs {
    /// Saved match centre HTML
    #[arg(long)]
    pub html: Option<PathBuf>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub match_id: Option<i64>,

    /// Output root; defaults to `<base_data_dir>/raw/matchcenter`
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Also zip the match folder
    #[arg(long)]
    pub archive: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    #[arg(long)]
    pub from_csv: PathBuf,

    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Read only the first N rows of the CSV
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub archive: bool,
}

#[derive(Debug, Args)]
pub struct DictionaryArgs {
    /// Match folders read for the team dictionary
    #[arg(long, default_value = "10")]
    pub max_matches: usize,

    #[arg(long, conflicts_with = "players_only")]
    pub teams_only: bool,

    #[arg(long)]
    pub players_only: bool,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("pages").args(["html", "url"]).required(true)))]
pub struct FixturesArgs {
    /// Saved fixtures pages
    #[arg(long, num_args = 1..)]
    pub html: Vec<PathBuf>,

    #[arg(long)]
    pub url: Option<String>,

    /// Month label such as "ago 2025"
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub month: Option<String>,

    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub comp: Option<String>,

    #[arg(long)]
    pub season: Option<String>,

    /// Read missing start times from each match's live page
    #[arg(long)]
    pub enrich_times: bool,

    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl FixturesArgs {
    pub fn input(&self) -> FixturesInput {
        match &self.url {
            Some(url) if self.html.is_empty() => FixturesInput::Url(url.clone()),
            _ => FixturesInput::Files(self.html.clone()),
        }
    }

    pub fn scope(&self) -> Result<FixturesScope> {
        match (&self.month, self.from, self.to) {
            (Some(label), _, _) => Ok(FixturesScope::Month(label.clone())),
            (None, Some(from), Some(to)) => {
                validate_date_range(from, to)?;
                Ok(FixturesScope::Range { from, to })
            }
            _ => Ok(FixturesScope::Season),
        }
    }
}

#[derive(Debug, Args)]
pub struct ConsolidateArgs {
    #[arg(long)]
    pub comp: String,

    #[arg(long)]
    pub season: String,

    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Match folder written by `match` or `batch`
    #[arg(long)]
    pub match_dir: PathBuf,

    /// Team identity CSV; defaults to the dictionaries folder
    #[arg(long)]
    pub identity: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FbrefArgs {
    /// Season label such as "2025-2026"; defaults to the config value
    #[arg(long)]
    pub season: Option<String>,

    /// Folder of saved `<category>.html` pages instead of fetching
    #[arg(long)]
    pub html_dir: Option<PathBuf>,

    /// Output folder; defaults to `<base_data_dir>/raw/fbref`
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_match_with_global_flags() {
        let cli = Cli::try_parse_from([
            "matchcenter-etl",
            "match",
            "--match-id",
            "1913916",
            "--archive",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Match(args) => {
                assert_eq!(args.match_id, Some(1913916));
                assert!(args.archive);
                assert!(args.html.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(Cli::try_parse_from([
            "matchcenter-etl",
            "match",
            "--html",
            "a.html",
            "--url",
            "https://x.test"
        ])
        .is_err());
    }

    #[test]
    fn test_fixtures_scope() {
        let cli = Cli::try_parse_from([
            "matchcenter-etl",
            "fixtures",
            "--html",
            "aug.html",
            "sep.html",
            "--from",
            "2025-08-01",
            "--to",
            "2025-09-30",
        ])
        .unwrap();
        let Command::Fixtures(args) = cli.command else {
            panic!("expected fixtures");
        };
        assert_eq!(args.input(), FixturesInput::Files(vec!["aug.html".into(), "sep.html".into()]));
        assert!(matches!(args.scope().unwrap(), FixturesScope::Range { .. }));

        let reversed = Cli::try_parse_from([
            "matchcenter-etl",
            "fixtures",
            "--html",
            "aug.html",
            "--from",
            "2025-09-30",
            "--to",
            "2025-08-01",
        ])
        .unwrap();
        let Command::Fixtures(args) = reversed.command else {
            panic!("expected fixtures");
        };
        assert!(args.scope().is_err());

        assert!(Cli::try_parse_from(["matchcenter-etl", "fixtures", "--month", "ago 2025"]).is_err());
        assert!(Cli::try_parse_from([
            "matchcenter-etl",
            "fixtures",
            "--url",
            "https://x.test",
            "--from",
            "2025-08-01"
        ])
        .is_err());
    }

    #[test]
    fn test_dictionary_defaults() {
        let cli = Cli::try_parse_from(["matchcenter-etl", "dictionaries"]).unwrap();
        let Command::Dictionaries(args) = cli.command else {
            panic!("expected dictionaries");
        };
        assert_eq!(args.max_matches, 10);
        assert!(!args.teams_only && !args.players_only);
    }

    #[test]
    fn test_parse_fbref() {
        let cli = Cli::try_parse_from([
            "matchcenter-etl",
            "fbref",
            "--season",
            "2024-2025",
            "--html-dir",
            "saved",
        ])
        .unwrap();
        let Command::Fbref(args) = cli.command else {
            panic!("expected fbref");
        };
        assert_eq!(args.season.as_deref(), Some("2024-2025"));
        assert_eq!(args.html_dir, Some(PathBuf::from("saved")));
        assert!(args.out.is_none());
    }
}
