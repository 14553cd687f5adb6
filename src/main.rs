use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use subsync::{
    from_sjson, render_subrip, rescale, to_sjson, Config, CourseScope, FsRecordStore, FsStore,
    HttpCaptionFetcher, Speed, Transcripts,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config, cli.verbose);

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                error!("    {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[derive(ClapParser)]
#[command(about = "Rescale and convert video transcripts between speeds and formats")]
struct Cli {
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "Configuration file. Defaults to ./subsync.toml when present."
    )]
    config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Enable debug logging.")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a SubRip file (speed 1.0) and store it at every given speed.
    Import {
        #[arg(short, long, value_name = "ID", help = "The video record the transcript belongs to.")]
        record: String,
        #[arg(
            short,
            long,
            value_name = "FILE",
            help = "The file to read from. If not supplied, the transcript will be read from standard input.",
            default_value = "-"
        )]
        input: String,
        #[arg(short, long, default_value = "srt", help = "Format of the uploaded transcript.")]
        format: String,
        #[arg(required = true, value_name = "SPEED=ID", value_parser = parse_speed_id)]
        targets: Vec<(Speed, String)>,
    },
    /// Fetch transcripts from the captioning service and derive missing speeds.
    Fetch {
        #[arg(short, long, value_name = "ID", help = "The video record the transcript belongs to.")]
        record: String,
        #[arg(required = true, value_name = "SPEED=ID", value_parser = parse_speed_id)]
        sources: Vec<(Speed, String)>,
    },
    /// Write a stored transcript out as SubRip at speed 1.0.
    Export {
        #[arg(long, value_name = "ORG/COURSE")]
        course: CourseScope,
        #[arg(long, value_name = "ID")]
        subs_id: String,
        #[arg(short, long, default_value = "1.0", help = "Speed the stored transcript was made for.")]
        speed: Speed,
        #[arg(
            short,
            long,
            value_name = "FILE",
            help = "The file to write to. If not supplied, the subtitles will be written to standard output.",
            default_value = "-"
        )]
        output: String,
    },
    /// Rescale an sjson file from one speed to another.
    Rescale {
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        input: String,
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        output: String,
        #[arg(long)]
        from: Speed,
        #[arg(long)]
        to: Speed,
    },
    /// Delete a stored transcript.
    Remove {
        #[arg(short, long, value_name = "ID")]
        record: String,
        subs_id: String,
    },
    /// Copy a stored transcript to a new id and point the record at it.
    Rename {
        #[arg(short, long, value_name = "ID")]
        record: String,
        #[arg(long, help = "The id to copy from. Defaults to the record's current transcript.")]
        old: Option<String>,
        new: String,
        #[arg(long, help = "Remove the transcript under the old id afterwards.")]
        delete_old: bool,
    },
    /// Make the record's transcript available under each of its video source ids.
    Reconcile {
        #[arg(short, long, value_name = "ID")]
        record: String,
    },
}

fn parse_speed_id(value: &str) -> std::result::Result<(Speed, String), String> {
    let (speed, id) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SPEED=ID, got '{}'", value))?;
    let speed: Speed = speed.parse().map_err(|err| format!("{}", err))?;
    Ok((speed, id.trim().to_string()))
}

fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read(input).context(format!("Failed to open input file: '{}'", input))
    }
}

fn write_output(output: &str, data: &[u8]) -> Result<()> {
    if output == "-" {
        io::stdout()
            .write_all(data)
            .context("Failed to write to stdout")
    } else {
        std::fs::write(output, data).context(format!("Failed to write output file: '{}'", output))
    }
}

fn run(command: Command, config: &Config) -> Result<()> {
    let assets = FsStore::new(&config.storage.root);
    let records = FsRecordStore::new(&config.records.root);
    let transcripts = Transcripts::new(&assets, &records);

    match command {
        Command::Import {
            record,
            input,
            format,
            targets,
        } => {
            let record = records.load(&record)?;
            let data = read_input(&input)?;
            let targets: BTreeMap<Speed, String> = targets.into_iter().collect();
            let timing = transcripts
                .generate_from_upload(&format, &data, &targets, &record)
                .context(format!("Failed to import transcript: '{}'", input))?;
            info!("Imported {} subtitles at {} speeds", timing.len(), targets.len());
        }
        Command::Fetch { record, sources } => {
            let record = records.load(&record)?;
            let fetcher = HttpCaptionFetcher::new(&config.caption_api)?;
            let sources: BTreeMap<Speed, String> = sources.into_iter().collect();
            let report = transcripts
                .generate_from_remote(&fetcher, &sources, &record)
                .context("Failed to fetch transcripts")?;
            info!(
                "Saved {} transcripts from speed {}",
                report.persisted.len(),
                report.canonical_speed
            );
            for speed in report.synthesized() {
                info!("Speed {} was generated rather than fetched", speed);
            }
        }
        Command::Export {
            course,
            subs_id,
            speed,
            output,
        } => {
            let timing = transcripts
                .load_subs(&subs_id, &course)
                .context(format!("Failed to load transcript '{}'", subs_id))?;
            write_output(&output, render_subrip(&timing, speed).as_bytes())?;
        }
        Command::Rescale {
            input,
            output,
            from,
            to,
        } => {
            let timing = from_sjson(&read_input(&input)?)
                .context(format!("Failed to parse sjson file: '{}'", input))?;
            write_output(&output, &to_sjson(&rescale(&timing, from, to)))?;
        }
        Command::Remove { record, subs_id } => {
            let record = records.load(&record)?;
            transcripts.remove(&subs_id, &record)?;
        }
        Command::Rename {
            record,
            old,
            new,
            delete_old,
        } => {
            let mut record = records.load(&record)?;
            let old = match old {
                Some(old) => old,
                None if !record.sub.is_empty() => record.sub.clone(),
                None => return Err(anyhow!("Record '{}' has no transcript to rename", record.id)),
            };
            transcripts
                .copy_or_rename(&new, &old, &mut record, delete_old)
                .context(format!("Failed to copy transcript '{}' to '{}'", old, new))?;
        }
        Command::Reconcile { record } => {
            let mut record = records.load(&record)?;
            let report = transcripts.reconcile_video_sources(&mut record);
            info!(
                "Transcript '{}' copied to {} ids, {} failed",
                record.sub,
                report.copied.len(),
                report.failed.len()
            );
        }
    }

    Ok(())
}
