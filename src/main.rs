//! Figure Skating Results CLI
//!
//! Ingests final standings from results pages, scores them against the points table
//! and serves team summaries over HTTP.

use clap::{Parser, Subcommand};
use skating::{CompetitionId, Config, Result};

#[derive(Parser)]
#[command(name = "skating")]
#[command(about = "Figure skating standings ingestion and team scoring", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Run the HTTP API
    ///
    /// POST /scrape-results takes {url, event_name, competition_id}; all three are required.
    Serve {
        /// Address to bind, overrides the config
        #[arg(long)]
        bind: Option<String>,
    },
    /// Fetch a results page and store its final standings
    Ingest {
        /// Results page URL
        url: String,
        /// Event name as stored in the schedule
        #[arg(long)]
        event: String,
        /// Competition ID the results are recorded against (required)
        #[arg(long)]
        competition: i64,
        /// Fetch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Parse a saved results page and print its standings
    Parse {
        /// HTML file
        file: String,
    },
    /// Load competitions, teams, skaters, events and points from a TOML file
    Seed {
        /// Seed file
        file: String,
    },
    /// Show the ranked team summary for a competition
    Summary {
        /// Competition ID
        competition: i64,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Export the competition spreadsheet report
    Export {
        /// Competition ID
        competition: i64,
        /// Output directory, overrides the config
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config, &config),
        Commands::Serve { bind } => commands::serve(&config, bind),
        Commands::Ingest {
            url,
            event,
            competition,
            timeout,
        } => commands::ingest(&config, &url, &event, CompetitionId(competition), timeout),
        Commands::Parse { file } => commands::parse(&config, &file),
        Commands::Seed { file } => commands::seed(&config, &file),
        Commands::Summary {
            competition,
            format,
        } => commands::summary(&config, CompetitionId(competition), format),
        Commands::Export {
            competition,
            output,
        } => commands::export(&config, CompetitionId(competition), output),
        Commands::Status => commands::status(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use skating::data::scrapers::StandingsScraper;
    use skating::data::{Database, SeedFile};
    use skating::report::{xlsx, ReportExporter};
    use skating::scoring::{Ingestor, ScoreAggregator};
    use skating::server::{self, AppState};
    use std::time::Duration;

    pub fn init(config_path: &str, config: &Config) -> Result<()> {
        Config::default().save(config_path)?;
        println!("Created default config at {}", config_path);

        Database::open(&config.data.database_path)?;
        std::fs::create_dir_all(&config.report.output_dir)?;
        println!(
            "Created database at {} and {}/ directory",
            config.data.database_path, config.report.output_dir
        );

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'skating seed teams.toml' to load teams, events and points");
        println!("  3. Run 'skating ingest <url> --event <name> --competition <id>'");
        println!("  4. Run 'skating summary <id>' to see the team standings");

        Ok(())
    }

    pub fn serve(config: &Config, bind: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let scraper = StandingsScraper::from_config(&config.scraper)?;
        let bind = bind.unwrap_or_else(|| config.server.bind.clone());

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(server::serve(AppState::new(db, scraper), &bind))
    }

    pub fn ingest(
        config: &Config,
        url: &str,
        event: &str,
        competition: CompetitionId,
        timeout: Option<u64>,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let ingestor = Ingestor::new(&db);
        let (target, _) = ingestor.targets(competition, event)?;

        let scraper = StandingsScraper::from_config(&config.scraper)?;
        println!("Fetching {}...", url);
        let runtime = tokio::runtime::Runtime::new()?;
        let standings =
            runtime.block_on(scraper.fetch_standings(url, timeout.map(Duration::from_secs)))?;
        println!(
            "Found {} entries (group size {})",
            standings.entries.len(),
            standings.field_size
        );

        let report = ingestor.ingest(competition, event, &standings)?;
        println!("Event:        {} ({})", event, target.title);
        println!("  Stored:     {}", report.stored.len());
        println!("  Skipped:    {}", report.skipped);
        println!("  Failed:     {}", report.failed);
        if report.missing_points > 0 {
            println!("  No points:  {} (scored 0)", report.missing_points);
        }

        Ok(())
    }

    pub fn parse(config: &Config, file: &str) -> Result<()> {
        let scraper = StandingsScraper::from_config(&config.scraper)?;
        let standings = scraper.parse_file(file)?;

        if standings.is_empty() {
            println!("Standings block found but no ranked entries");
            return Ok(());
        }

        println!("Final Standings ({} competitors)", standings.field_size);
        println!("───────────────────────────────────────────────────────");
        for entry in &standings.entries {
            println!(
                "  {:>3}. {:<28} {}",
                entry.placement,
                entry.competitor_name,
                entry.affiliation.as_deref().unwrap_or("-")
            );
        }

        Ok(())
    }

    pub fn seed(config: &Config, file: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let counts = SeedFile::load(file)?.apply(&db)?;

        println!("Seeded from {}", file);
        println!("  Competitions:  {}", counts.competitions);
        println!("  Teams:         {}", counts.teams);
        println!("  Skaters:       {}", counts.skaters);
        println!("  Events:        {}", counts.events);
        println!("  Points:        {}", counts.points);

        Ok(())
    }

    pub fn summary(config: &Config, competition: CompetitionId, format: OutputFormat) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let target = db.get_competition(competition)?;
        let summaries = ScoreAggregator::new(&db).summarize(competition)?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }
            OutputFormat::Table => {
                println!("{} ({})", target.title, target.year);
                println!("───────────────────────────────────────────────────────");
                println!(
                    "  {:>3}  {:<28} {:>8} {:>6} {:>8}",
                    "#", "Team", "Points", "Starts", "Per"
                );
                for (rank, summary) in summaries.iter().enumerate() {
                    println!(
                        "  {:>3}  {:<28} {:>8.1} {:>6} {:>8.3}",
                        rank + 1,
                        summary.name,
                        summary.total_points,
                        summary.starts,
                        summary.points_per_start
                    );
                }
            }
        }

        Ok(())
    }

    pub fn export(config: &Config, competition: CompetitionId, output: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let report = ReportExporter::new(&db).build(competition)?;
        let dir = output.unwrap_or_else(|| config.report.output_dir.clone());

        let path = xlsx::write_xlsx(&report, &dir)?;
        println!(
            "Wrote {} team sheets to {}",
            report.sheets.len(),
            path.display()
        );

        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:          {}", config.data.database_path);
        println!("  Competitions:  {}", stats.competition_count);
        println!("  Teams:         {}", stats.team_count);
        println!("  Skaters:       {}", stats.skater_count);
        println!("  Events:        {}", stats.event_count);
        println!("  Points rows:   {}", stats.points_entry_count);
        println!("  Results:       {}", stats.result_count);

        let events = db.get_all_events()?;
        if !events.is_empty() {
            println!("\nEvents");
            println!("───────────────────────────────");
            for event in &events {
                println!("  {:>4}  {}", event.event_order, event.name);
            }
        }

        Ok(())
    }
}
