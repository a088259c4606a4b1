use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use club_widgets::views::{RESULTS_EMPTY, RESULTS_LOAD_ERROR};
use club_widgets::{
    calculate, events_html, generate_ics, import_events_from_path, load_events, load_results, next_meeting_html,
    results_html, text_content, write_entries_csv, write_leaderboards_csv, write_output, year_from_query, IdMode,
    AnalyticsSink, ImportOptions, Metric, OutputOptions, RecipeInput, Renderer, ResultsBrowser, ResultsSource,
    SiteConfig, TracingSink,
};

const DEFAULT_EVENTS_SOURCE: &str = "assets/events.json";
const DEFAULT_RESULTS_SOURCE: &str = "assets/data/results.json";

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(name = "club_widgets", version, about = "Renders club website widgets from JSON data")]
struct Cli {
    /// Site config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Banner for the next upcoming meeting
    NextMeeting(RenderArgs),
    /// Upcoming and past events list
    Events(RenderArgs),
    /// Show results browser
    Results(ResultsArgs),
    /// iCalendar feed from events.json
    Ics {
        #[arg(long, default_value = DEFAULT_EVENTS_SOURCE)]
        source: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// events.json from a cleaned activities CSV
    Import {
        input: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = IdMode::Uuid)]
        id_mode: IdMode,
        /// Also write an iCalendar feed for the imported events
        #[arg(long)]
        ics: Option<PathBuf>,
    },
    /// Mead recipe calculator
    Recipe {
        /// Batch volume in litres
        #[arg(long)]
        volume: Option<f64>,
        /// Target ABV (%)
        #[arg(long)]
        abv: Option<f64>,
        /// Target final gravity
        #[arg(long)]
        fg: Option<f64>,
        /// Honey gravity points per kg per litre
        #[arg(long)]
        honey_contribution: Option<f64>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// File path or http(s) URL
    #[arg(long, default_value = DEFAULT_EVENTS_SOURCE)]
    source: String,
    /// Reference time (RFC 3339), defaults to the current time
    #[arg(long)]
    now: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
    /// Emit visible text instead of markup
    #[arg(long)]
    text: bool,
}

#[derive(Args)]
struct ResultsArgs {
    /// Year-keyed results document
    #[arg(long, conflicts_with = "index")]
    source: Option<String>,
    /// Index document of the split layout
    #[arg(long, requires = "entries")]
    index: Option<String>,
    /// Flat entries array of the split layout
    #[arg(long, requires = "index")]
    entries: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    /// Page query string, e.g. "?year=2024"
    #[arg(long)]
    query: Option<String>,
    /// Class code filter
    #[arg(long = "class")]
    class_no: Option<String>,
    #[arg(long)]
    search: Option<String>,
    /// Active leaderboard: averageScore, medianScore or sumTop5
    #[arg(long)]
    tab: Option<String>,
    /// Export a table as CSV instead of rendering
    #[arg(long, value_enum)]
    csv: Option<CsvExport>,
    /// Rows per exported table
    #[arg(long)]
    top_n: Option<usize>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    text: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CsvExport {
    Entries,
    Leaderboards,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level, e.g. RUST_LOG=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = SiteConfig::load(cli.config.as_deref()).context("loading site config")?;

    match cli.command {
        Command::NextMeeting(args) => run_next_meeting(&config, args).await,
        Command::Events(args) => run_events(&config, args).await,
        Command::Results(args) => run_results(&config, args).await,
        Command::Ics { source, out } => run_ics(&config, &source, out).await,
        Command::Import { input, out, id_mode, ics } => run_import(&config, input, out, id_mode, ics),
        Command::Recipe { volume, abv, fg, honey_contribution, json } => {
            let input = RecipeInput {
                batch_volume_litres: volume,
                target_abv: abv,
                target_fg: fg,
                honey_contribution,
            };
            run_recipe(&input, json)
        }
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn reference_time(now: Option<&str>, config: &SiteConfig) -> Result<DateTime<FixedOffset>> {
    match now {
        Some(value) => DateTime::parse_from_rfc3339(value).with_context(|| format!("invalid --now: {}", value)),
        None => Ok(Utc::now().with_timezone(&config.offset()?)),
    }
}

fn emit(html: String, out: Option<PathBuf>, text: bool) -> Result<()> {
    let body = if text { text_content(&html) + "\n" } else { html };
    write_output(out.as_deref(), body.as_bytes())?;
    Ok(())
}

async fn run_next_meeting(config: &SiteConfig, args: RenderArgs) -> Result<()> {
    let now = reference_time(args.now.as_deref(), config)?;
    let renderer = Renderer::new()?;
    let html = match load_events(&args.source).await {
        Ok(events) => next_meeting_html(&renderer, &events, now, config)?,
        Err(e) => {
            tracing::error!(source = %args.source, error = %e, "failed to load events");
            renderer.render_next_meeting(None)?
        }
    };
    emit(html, args.out, args.text)
}

async fn run_events(config: &SiteConfig, args: RenderArgs) -> Result<()> {
    let now = reference_time(args.now.as_deref(), config)?;
    let renderer = Renderer::new()?;
    let html = match load_events(&args.source).await {
        Ok(events) => events_html(&renderer, &events, now, config)?,
        Err(e) => {
            tracing::error!(source = %args.source, error = %e, "failed to load events");
            renderer.render_events_error()?
        }
    };
    emit(html, args.out, args.text)
}

async fn run_results(config: &SiteConfig, args: ResultsArgs) -> Result<()> {
    let source = match (args.index.clone(), args.entries.clone()) {
        (Some(index), Some(entries)) => ResultsSource::Split { index, entries },
        _ => ResultsSource::YearKeyed(args.source.clone().unwrap_or_else(|| DEFAULT_RESULTS_SOURCE.to_string())),
    };
    let renderer = Renderer::new()?;

    let cache = match load_results(&source).await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::error!(source = ?source, error = %e, "failed to load results");
            let html = renderer.render_results_message(RESULTS_LOAD_ERROR)?;
            return emit(html, args.out, args.text);
        }
    };

    let requested = args.year.or_else(|| args.query.as_deref().and_then(year_from_query));
    let sink: &dyn AnalyticsSink = &TracingSink;
    let Some(mut browser) = ResultsBrowser::open(cache, requested, Some(sink)) else {
        tracing::warn!("results dataset holds no years");
        let html = renderer.render_results_message(RESULTS_EMPTY)?;
        return emit(html, args.out, args.text);
    };

    if let Some(class_no) = args.class_no.as_deref() {
        browser.select_class(class_no.trim());
    }
    if let Some(search) = args.search.as_deref() {
        browser.search(search);
    }
    if let Some(tab) = args.tab.as_deref() {
        let metric = Metric::parse(tab).with_context(|| format!("unknown leaderboard tab: {}", tab))?;
        browser.select_tab(metric);
    }

    let options = OutputOptions { top_n: args.top_n };
    match args.csv {
        Some(CsvExport::Entries) => {
            let mut buffer = Vec::new();
            write_entries_csv(&mut buffer, &browser.filtered_entries(), &options)?;
            write_output(args.out.as_deref(), &buffer)?;
            Ok(())
        }
        Some(CsvExport::Leaderboards) => {
            let mut buffer = Vec::new();
            if let Some(data) = browser.year_data() {
                write_leaderboards_csv(&mut buffer, &data.leaderboards, &options)?;
            }
            write_output(args.out.as_deref(), &buffer)?;
            Ok(())
        }
        None => {
            let html = results_html(&renderer, Some(&browser), config)?;
            emit(html, args.out, args.text)
        }
    }
}

async fn run_ics(config: &SiteConfig, source: &str, out: Option<PathBuf>) -> Result<()> {
    let events = load_events(source).await.with_context(|| format!("loading events from {}", source))?;
    let ics = generate_ics(&events, &config.calendar, config.offset()?, Utc::now())?;
    write_output(out.as_deref(), ics.as_bytes())?;
    Ok(())
}

fn run_import(
    config: &SiteConfig,
    input: PathBuf,
    out: Option<PathBuf>,
    id_mode: IdMode,
    ics: Option<PathBuf>,
) -> Result<()> {
    let options = ImportOptions {
        id_mode,
        offset: config.offset()?,
    };
    let events = import_events_from_path(&input, &options)
        .with_context(|| format!("importing {}", input.display()))?;
    let json = serde_json::to_string_pretty(&events)? + "\n";
    write_output(out.as_deref(), json.as_bytes())?;

    if let Some(ics_path) = ics {
        let feed = generate_ics(&events, &config.calendar, options.offset, Utc::now())?;
        write_output(Some(&ics_path), feed.as_bytes())?;
    }
    tracing::info!(count = events.len(), "import complete");
    Ok(())
}

fn run_recipe(input: &RecipeInput, json: bool) -> Result<()> {
    let display = calculate(input).display();
    let body = if json {
        serde_json::to_string_pretty(&display)? + "\n"
    } else {
        format!("Target OG: {}\nHoney: {} kg\n", display.target_og, display.honey_mass)
    };
    write_output(None, body.as_bytes())?;
    Ok(())
}
