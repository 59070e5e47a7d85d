use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mfst_trends::admin::{AdminService, Status, StatusKind};
use mfst_trends::charts::{
    build_label_map, derive_trends, format_display_date, format_number, sort_unique_dates,
    ChartSeries, TrendsConfig, TrendsView,
};
use mfst_trends::config::{AppConfig, CliConfig};
use mfst_trends::persistence::{AutoSaver, FileLinkSupport, StateStore, EXPORT_FILE_NAME};
use mfst_trends::state::Round;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

fn parse_round(s: &str) -> Result<Round, String> {
    Round::from_str(s)
}

#[derive(Parser, Debug)]
#[command(name = "mfst-trends")]
#[command(about = "Melodifestivalen streaming trends dashboard")]
struct CliArgs {
    /// Directory holding the local state blob and the linked-file handle.
    #[clap(long, value_parser = parse_path)]
    data_dir: Option<PathBuf>,

    /// Repository data file used by `load-remote`.
    #[clap(long, value_parser = parse_path)]
    remote_data_path: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the streams and rank trends for the configured songs.
    Trends {
        /// Round to include; repeatable. No rounds means all rounds.
        #[clap(long = "round", value_parser = parse_round)]
        rounds: Vec<Round>,

        /// First display date (YYYY-MM-DD), inclusive.
        #[clap(long)]
        from: Option<String>,

        /// Last display date (YYYY-MM-DD), inclusive.
        #[clap(long)]
        to: Option<String>,

        /// Emit the chart payload as JSON instead of a table.
        #[clap(long)]
        json: bool,
    },

    /// Summary of configured songs and collected data days.
    Stats,

    /// List the configured songs.
    Songs,

    /// Add a song to track.
    AddSong {
        /// The song uri, exactly as it appears in the CSV files.
        uri: String,

        /// Round the song takes part in; repeatable.
        #[clap(long = "round", value_parser = parse_round)]
        rounds: Vec<Round>,
    },

    /// Remove a song and all of its data points.
    RemoveSong { uri: String },

    /// Toggle a round on a configured song.
    ToggleRound {
        uri: String,
        #[clap(value_parser = parse_round)]
        round: Round,
    },

    /// Import daily chart CSV files. Filenames must include YYYY-MM-DD;
    /// existing dates are replaced.
    ImportCsv {
        #[clap(required = true, value_parser = parse_path)]
        files: Vec<PathBuf>,
    },

    /// Export the full dataset and configuration as JSON.
    Export {
        /// Target file. Defaults to melodifestivalen-data.json.
        #[clap(long, value_parser = parse_path)]
        out: Option<PathBuf>,
    },

    /// Import a JSON snapshot, replacing the current dataset.
    Import {
        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },

    /// Clear all songs and data.
    Clear {
        /// Confirm the destructive operation.
        #[clap(long)]
        yes: bool,
    },

    /// Link a repository file; auto-save mirrors every change to it.
    Link {
        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },

    /// Unlink the repository file and disable auto-save.
    Unlink,

    /// Write the current state to the linked file now.
    SaveNow,

    /// Replace local data with the repository data file.
    LoadRemote {
        /// Confirm the destructive operation.
        #[clap(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let config = AppConfig::resolve(&CliConfig {
        data_dir: cli_args.data_dir.clone(),
        remote_data_path: cli_args.remote_data_path.clone(),
    })?;

    let store = StateStore::new(&config.data_dir);
    let link = FileLinkSupport::detect(&config.data_dir);
    let mut admin = AdminService::new(store, link, Some(AutoSaver::spawn()));

    let status = match cli_args.command {
        Command::Trends {
            rounds,
            from,
            to,
            json,
        } => {
            run_trends(&admin, rounds, from, to, json);
            None
        }
        Command::Stats => {
            run_stats(&admin);
            None
        }
        Command::Songs => {
            run_songs(&admin);
            None
        }
        Command::AddSong { uri, rounds } => Some(admin.add_song(&uri, &rounds)),
        Command::RemoveSong { uri } => Some(admin.remove_song(&uri)),
        Command::ToggleRound { uri, round } => Some(admin.toggle_round(&uri, round)),
        Command::ImportCsv { files } => Some(admin.import_csv_files(&files)),
        Command::Export { out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            Some(admin.export_to(&out))
        }
        Command::Import { file } => Some(run_import(&mut admin, &file)),
        Command::Clear { yes } => {
            if yes {
                Some(admin.clear_all())
            } else {
                Some(Status::info(
                    "Clear all songs and data? Re-run with --yes to confirm.",
                ))
            }
        }
        Command::Link { file } => Some(admin.link_file(&file)),
        Command::Unlink => Some(admin.unlink_file()),
        Command::SaveNow => Some(admin.save_now()),
        Command::LoadRemote { yes } => {
            if yes {
                Some(admin.load_remote(&config.remote_data_path))
            } else {
                Some(Status::info(
                    "Replace local data with the repository data file? Re-run with --yes to confirm.",
                ))
            }
        }
    };

    let failed = status.as_ref().map(Status::is_error).unwrap_or(false);
    if let Some(status) = &status {
        report(status);
    }

    admin.shutdown().await;

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn report(status: &Status) {
    match status.kind {
        StatusKind::Success | StatusKind::Info => info!("{}", status.message),
        StatusKind::Error => error!("{}", status.message),
    }
}

fn run_import(admin: &mut AdminService, file: &PathBuf) -> Status {
    match std::fs::read_to_string(file) {
        Ok(text) => admin.import_json(&text),
        Err(err) => Status::error(format!("Failed to read {}: {}", file.display(), err)),
    }
}

fn run_trends(
    admin: &AdminService,
    rounds: Vec<Round>,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) {
    let state = admin.state();
    let view = derive_trends(
        &state.songs,
        &state.points,
        &TrendsConfig {
            selected_rounds: rounds,
            date_from: from,
            date_to: to,
        },
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view.chart_payload())
                .expect("chart payload is always serializable")
        );
        return;
    }

    if state.songs.is_empty() {
        println!("No songs configured yet. Add the songs you want to track.");
        return;
    }
    if state.points.is_empty() {
        println!("No data yet. Import daily CSVs to start building trends.");
        return;
    }
    print_trends(&view);
}

fn print_trends(view: &TrendsView) {
    if view.songs.is_empty() {
        println!("No songs match the selected rounds.");
        return;
    }
    if view.dates.is_empty() {
        println!("No data in the selected date range.");
        return;
    }
    print_metric(
        "Streams (total streams per day, higher is better)",
        &view.dates,
        &view.streams,
        format_number,
    );
    println!();
    print_metric(
        "Rank (chart rank per day, lower is better)",
        &view.dates,
        &view.rank,
        |value| format!("#{}", value),
    );
}

fn print_metric(
    title: &str,
    dates: &[String],
    series: &[ChartSeries],
    format_value: impl Fn(i64) -> String,
) {
    println!("{}", title);

    let labels: Vec<String> = dates.iter().map(|d| format_display_date(d)).collect();
    let rows: Vec<(&str, Vec<String>)> = series
        .iter()
        .map(|s| {
            let cells = s
                .data
                .iter()
                .map(|value| match value {
                    Some(value) => format_value(*value),
                    None => "-".to_string(),
                })
                .collect();
            (s.label.as_str(), cells)
        })
        .collect();

    let label_width = rows
        .iter()
        .map(|(label, _)| label.len())
        .chain(std::iter::once("Song".len()))
        .max()
        .unwrap_or(0);
    let mut widths: Vec<usize> = labels.iter().map(|label| label.len()).collect();
    for (_, cells) in &rows {
        for (index, cell) in cells.iter().enumerate() {
            widths[index] = widths[index].max(cell.len());
        }
    }

    print!("{:<width$}", "Song", width = label_width);
    for (label, width) in labels.iter().zip(&widths) {
        print!("  {:>width$}", label, width = width);
    }
    println!();
    for (label, cells) in &rows {
        print!("{:<width$}", label, width = label_width);
        for (cell, width) in cells.iter().zip(&widths) {
            print!("  {:>width$}", cell, width = width);
        }
        println!();
    }
}

fn run_stats(admin: &AdminService) {
    let state = admin.state();
    let dates = sort_unique_dates(state.points.iter().map(|p| p.date.as_str()));
    println!("Active songs: {}", state.songs.len());
    println!("Data days: {}", dates.len());
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        println!("Date range: {} to {}", first, last);
    }
    match admin.linked_target() {
        Some(target) => println!("Linked file: {}", target.display()),
        None => println!("Linked file: none"),
    }
}

fn run_songs(admin: &AdminService) {
    let state = admin.state();
    if state.songs.is_empty() {
        println!("No songs yet.");
        return;
    }
    let labels = build_label_map(&state.points);
    for song in &state.songs {
        match labels.get(&song.uri) {
            Some(label) => println!("{} ({})", label, song.uri),
            None => println!("{}", song.uri),
        }
        let rounds = song
            .rounds
            .iter()
            .map(|round| round.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if rounds.is_empty() {
            println!("  rounds: none");
        } else {
            println!("  rounds: {}", rounds);
        }
    }
}
