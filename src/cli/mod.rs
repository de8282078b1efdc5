//! # CLI Module
//!
//! Command-line interface for the media sorter.
//!
//! ## Usage
//! ```bash
//! # Preview a sort
//! media-sort sort ~/Camera ~/Pictures/Sorted --dry-run
//!
//! # Copy images and videos into day folders
//! media-sort sort ~/Camera ~/Pictures/Sorted --copy --by-day --video
//!
//! # JSON output
//! media-sort sort ~/Camera ~/Pictures/Sorted --output json
//!
//! # Look after the hash index
//! media-sort index ~/Pictures/Sorted/media_hashes.db stats
//! media-sort index ~/Pictures/Sorted/media_hashes.db search-date 2023-01-01 2023-12-31
//! ```

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_sorter::core::duplicates::DuplicatePolicy;
use media_sorter::core::hasher::ContentHash;
use media_sorter::core::index::{write_csv, IndexBackend, IndexEntry, IndexStats, SqliteIndex};
use media_sorter::core::organize::{Layout, OperationMode};
use media_sorter::core::pipeline::{Pipeline, RunOutcome, SorterConfig};
use media_sorter::core::reporter::format_bytes;
use media_sorter::error::{Result, SorterError};
use media_sorter::events::{Event, EventChannel, HashEvent, PipelineEvent, SortEvent};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;

/// Media Sorter - file photos, videos and music by date
#[derive(Parser, Debug)]
#[command(name = "media-sort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, default_value = "pretty", global = true)]
    output: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sort media from SOURCE into a dated tree under TARGET
    Sort(SortArgs),

    /// Inspect or maintain a hash index database
    Index {
        /// Path to media_hashes.db
        db: PathBuf,

        #[command(subcommand)]
        action: IndexAction,
    },
}

#[derive(Args, Debug)]
struct SortArgs {
    /// Directory to sort from
    source: PathBuf,

    /// Root of the dated tree
    target: PathBuf,

    /// Copy instead of move
    #[arg(long)]
    copy: bool,

    /// One folder per day instead of per month
    #[arg(long)]
    by_day: bool,

    /// Log what would happen without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Do not use the hash index
    #[arg(long)]
    no_index: bool,

    /// Index location (default: TARGET/media_hashes.db)
    #[arg(long)]
    index: Option<PathBuf>,

    /// Accept every date, however implausible
    #[arg(long)]
    no_validate: bool,

    /// Earliest plausible year
    #[arg(long)]
    earliest_year: Option<i32>,

    /// What to do with extra copies found in the source
    #[arg(long)]
    duplicates: Option<DuplicateMode>,

    /// Sample large files instead of hashing them whole
    #[arg(long)]
    turbo: bool,

    /// Hash every file, even those with a unique size
    #[arg(long)]
    no_size_filter: bool,

    /// Process files in batches
    #[arg(long)]
    batch: bool,

    /// Files per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Include camera RAW files
    #[arg(long)]
    raw: bool,

    /// Include video files
    #[arg(long)]
    video: bool,

    /// Include audio files
    #[arg(long)]
    audio: bool,

    /// Leave regular image files out
    #[arg(long)]
    no_images: bool,

    /// Only these extensions, e.g. ".crw, .thm" (replaces the kind flags)
    #[arg(long)]
    extensions: Option<String>,

    /// Include hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// JSON config file; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum IndexAction {
    /// Entry counts and date range
    Stats,
    /// Remove entries whose file no longer exists
    Cleanup,
    /// Export all entries as CSV (stdout when FILE is omitted)
    Export { file: Option<PathBuf> },
    /// Entries whose file name contains TEXT
    SearchName { text: String },
    /// Entries taken between START and END (YYYY-MM-DD, inclusive)
    SearchDate { start: NaiveDate, end: NaiveDate },
    /// Delete the entry for HASH
    Remove { hash: ContentHash },
    /// Point the entry for HASH at PATH
    SetPath { hash: ContentHash, path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DuplicateMode {
    /// Move extra copies to _duplicates/
    Move,
    /// Leave extra copies in the source
    Ignore,
    /// Skip duplicate detection
    Off,
}

impl From<DuplicateMode> for DuplicatePolicy {
    fn from(mode: DuplicateMode) -> Self {
        match mode {
            DuplicateMode::Move => DuplicatePolicy::Move,
            DuplicateMode::Ignore => DuplicatePolicy::Ignore,
            DuplicateMode::Off => DuplicatePolicy::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    media_sorter::init_tracing(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Sort(args) => run_sort(args, cli.output, cli.verbose),
        Commands::Index { db, action } => run_index(&db, action, cli.output),
    }
}

/// Config file used when `--config` is not given, if it exists
fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("media-sorter").join("config.json");
    path.is_file().then_some(path)
}

fn build_config(args: SortArgs) -> Result<SorterConfig> {
    let mut config = match args.config.or_else(default_config_path) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading config file");
            SorterConfig::from_json_file(&path)?
        }
        None => SorterConfig::default(),
    };

    config.source = args.source;
    config.target = args.target;
    if args.copy {
        config.operation = OperationMode::Copy;
    }
    if args.by_day {
        config.layout = Layout::Day;
    }
    config.dry_run |= args.dry_run;
    if args.no_index {
        config.use_index = false;
    }
    if let Some(index) = args.index {
        config.index_path = Some(index);
    }
    if args.no_validate {
        config.validate_dates = false;
    }
    if let Some(year) = args.earliest_year {
        config.earliest_year = year;
    }
    if let Some(mode) = args.duplicates {
        config.duplicates = mode.into();
    }
    config.turbo |= args.turbo;
    if args.no_size_filter {
        config.size_prefilter = Some(false);
    }
    if let Some(size) = args.batch_size {
        config.batch = true;
        config.batch_size = size;
    }
    config.batch |= args.batch;
    config.media.raw |= args.raw;
    config.media.video |= args.video;
    config.media.audio |= args.audio;
    if args.no_images {
        config.media.images = false;
    }
    if let Some(list) = args.extensions {
        config.extensions = Some(list);
    }
    config.include_hidden |= args.include_hidden;

    Ok(config)
}

fn run_sort(args: SortArgs, output: OutputFormat, verbose: bool) -> Result<()> {
    let term = Term::stderr();
    let config = build_config(args)?;

    // Print header
    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Media Sorter").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        if config.dry_run {
            term.write_line(&format!("{}", style("Dry run: nothing will be changed").yellow()))
                .ok();
        }
        term.write_line("").ok();
    }

    let pipeline = Pipeline::builder().config(config).build();

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            // Drain so the channel does not grow without bound
            for _ in receiver.iter() {}
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Hash(HashEvent::Started { candidates, .. }) => {
                    pb.set_length(candidates as u64);
                    pb.set_position(0);
                }
                Event::Hash(HashEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Sort(SortEvent::Started { total_files }) => {
                    pb.set_length(total_files as u64);
                    pb.set_position(0);
                }
                Event::Sort(SortEvent::BatchStarted {
                    batch,
                    total_batches,
                    ..
                }) => {
                    pb.set_message(format!("Sorting (batch {}/{})", batch, total_batches));
                }
                Event::Sort(SortEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(
                            p.current_path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Cancelled) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let outcome = result?;

    // Output results
    match output {
        OutputFormat::Pretty => print_pretty_outcome(&term, &outcome, verbose),
        OutputFormat::Json => print_json(&outcome)?,
    }

    Ok(())
}

fn print_pretty_outcome(term: &Term, outcome: &RunOutcome, verbose: bool) {
    let config = &outcome.config;
    let (title, mark) = if outcome.cancelled {
        ("Sort Cancelled", style("!").yellow().bold())
    } else {
        ("Sort Complete", style("✓").green().bold())
    };
    term.write_line(&format!("{} {}", mark, title)).ok();
    term.write_line("").ok();

    // Summary
    let verb = match (config.dry_run, config.operation) {
        (true, OperationMode::Copy) => "would be copied",
        (true, OperationMode::Move) => "would be moved",
        (false, OperationMode::Copy) => "copied",
        (false, OperationMode::Move) => "moved",
    };
    term.write_line(&format!(
        "  {} of {} files {} in {:.1}s",
        style(outcome.filed.len()).cyan(),
        outcome.total_files,
        verb,
        outcome.duration_ms as f64 / 1000.0
    ))
    .ok();

    let counts = [
        (outcome.duplicate_groups.len(), "duplicate groups"),
        (outcome.set_aside.len(), "extra copies set aside"),
        (outcome.skipped.len(), "already indexed, skipped"),
        (outcome.conflicts.len(), "date conflicts corrected"),
        (outcome.unknown_date.len(), "without a date"),
        (outcome.invalid_date.len(), "with implausible dates"),
    ];
    for (count, label) in counts {
        if count > 0 {
            term.write_line(&format!("  {} {}", style(count).cyan(), label))
                .ok();
        }
    }
    if !outcome.duplicate_groups.is_empty() {
        term.write_line(&format!(
            "  {} held by extra copies",
            style(format_bytes(outcome.duplicate_bytes())).yellow()
        ))
        .ok();
    }
    if !outcome.failed.is_empty() {
        term.write_line(&format!(
            "  {} failed",
            style(outcome.failed.len()).red().bold()
        ))
        .ok();
    }
    term.write_line("").ok();

    if !outcome.failed.is_empty() {
        term.write_line(&format!("{}", style("Failures:").bold().underlined()))
            .ok();
        for failure in &outcome.failed {
            term.write_line(&format!(
                "  {} {}: {}",
                style("✗").red(),
                display_path(&failure.path),
                failure.message
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    if verbose {
        for filed in &outcome.filed {
            term.write_line(&format!(
                "  {} {} {}",
                display_path(&filed.source),
                style("->").dim(),
                display_path(&filed.destination)
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    // Footer
    if let Some(report) = &outcome.report_path {
        term.write_line(&format!(
            "{} {}",
            style("Report:").dim(),
            display_path(report)
        ))
        .ok();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| SorterError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn run_index(db: &Path, action: IndexAction, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();

    match action {
        IndexAction::Stats => {
            let index = SqliteIndex::open_read_only(db)?;
            let stats = index.stats()?;
            match output {
                OutputFormat::Pretty => print_stats(&term, db, &stats),
                OutputFormat::Json => print_json(&stats)?,
            }
        }
        IndexAction::Cleanup => {
            let index = SqliteIndex::open(db)?;
            let removed = index.cleanup()?;
            term.write_line(&format!(
                "{} Removed {} entries for missing files",
                style("✓").green().bold(),
                style(removed).cyan()
            ))
            .ok();
        }
        IndexAction::Export { file } => {
            let index = SqliteIndex::open_read_only(db)?;
            let entries = index.entries()?;
            let written = match &file {
                Some(path) => {
                    let out = File::create(path).map_err(|e| {
                        SorterError::Output(format!("cannot create {}: {}", path.display(), e))
                    })?;
                    write_csv(&entries, BufWriter::new(out))?
                }
                None => write_csv(&entries, std::io::stdout().lock())?,
            };
            if let Some(path) = file {
                term.write_line(&format!(
                    "{} Exported {} entries to {}",
                    style("✓").green().bold(),
                    style(written).cyan(),
                    display_path(&path)
                ))
                .ok();
            }
        }
        IndexAction::SearchName { text } => {
            let index = SqliteIndex::open_read_only(db)?;
            let entries = index.search_by_name(&text)?;
            print_entries(&term, &entries, output)?;
        }
        IndexAction::SearchDate { start, end } => {
            let index = SqliteIndex::open_read_only(db)?;
            let entries = index.search_by_date(start, end)?;
            print_entries(&term, &entries, output)?;
        }
        IndexAction::Remove { hash } => {
            let index = SqliteIndex::open(db)?;
            if index.remove(&hash)? {
                term.write_line(&format!("{} Removed {}", style("✓").green().bold(), hash))
                    .ok();
            } else {
                term.write_line(&format!("{} No entry for {}", style("!").yellow(), hash))
                    .ok();
            }
        }
        IndexAction::SetPath { hash, path } => {
            let index = SqliteIndex::open(db)?;
            if index.update_path(&hash, &path)? {
                term.write_line(&format!(
                    "{} {} now points to {}",
                    style("✓").green().bold(),
                    hash,
                    display_path(&path)
                ))
                .ok();
            } else {
                term.write_line(&format!("{} No entry for {}", style("!").yellow(), hash))
                    .ok();
            }
        }
    }

    Ok(())
}

fn print_stats(term: &Term, db: &Path, stats: &IndexStats) {
    term.write_line(&format!(
        "{} {}",
        style("Hash index").bold().cyan(),
        style(display_path(db)).dim()
    ))
    .ok();
    term.write_line(&format!("  {} entries", style(stats.total_entries).cyan()))
        .ok();
    term.write_line(&format!(
        "  {} distinct hashes",
        style(stats.distinct_hashes).cyan()
    ))
    .ok();
    if stats.duplicate_entries > 0 {
        term.write_line(&format!(
            "  {} duplicate entries",
            style(stats.duplicate_entries).yellow()
        ))
        .ok();
    }
    if let (Some(earliest), Some(latest)) = (stats.earliest_taken, stats.latest_taken) {
        term.write_line(&format!(
            "  taken between {} and {}",
            earliest.format("%Y-%m-%d"),
            latest.format("%Y-%m-%d")
        ))
        .ok();
    }
}

fn print_entries(term: &Term, entries: &[IndexEntry], output: OutputFormat) -> Result<()> {
    if matches!(output, OutputFormat::Json) {
        return print_json(&entries);
    }

    if entries.is_empty() {
        term.write_line("  No matching entries").ok();
        return Ok(());
    }
    for entry in entries {
        let taken = entry
            .date_taken
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        let source = entry.date_source.map(|s| s.tag()).unwrap_or("");
        term.write_line(&format!(
            "  {} {} {:<8} {}  {}",
            style(&entry.hash.to_hex()[..12]).dim(),
            taken,
            source,
            entry.file_name,
            style(display_path(&entry.file_path)).dim()
        ))
        .ok();
    }
    term.write_line(&format!("  {} entries", style(entries.len()).cyan()))
        .ok();
    Ok(())
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}
