//! logrecover: pull a time window of events back out of gzip'd daily JSON archives.
//!
//! ```bash
//! nohup logrecover --eps 10000 --min 2024-01-01T00:00:00 --max 2024-01-02T00:00:00 \
//!     -o /tmp/recovery.json --log ./recovery.log --max-size 400 \
//!     -p s3 --endpoint https://s3.wasabisys.com -b my-bucket \
//!     -f data.win.eventInfo.resource=alice@mail.com &
//! ```

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use logrecover::{
    gb_to_bytes, init_logging, parse_timestamp, secs_to_pause, ArchiveLayout, BlobSource, FieldPredicate, LocalArchive, Recovery,
    RotationMode, DEFAULT_STEM, DEFAULT_TIMESTAMP_FIELD,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "logrecover", version, about, long_about = None)]
#[command(group(ArgGroup::new("archive").required(true).args(["local_root", "bucket"])))]
struct Cli {
    /// Events written between two throttle pauses
    #[arg(short = 'e', long, default_value_t = 400)]
    eps: u64,

    /// Inclusive lower bound, YYYY-MM-DDTHH:MM:SS
    #[arg(long = "min")]
    min_timestamp: String,

    /// Exclusive upper bound, YYYY-MM-DDTHH:MM:SS
    #[arg(long = "max")]
    max_timestamp: String,

    /// Output NDJSON file
    #[arg(short, long)]
    output: PathBuf,

    /// Append operational logs here instead of stderr
    #[arg(long = "log")]
    log_file: Option<PathBuf>,

    /// Rotate the output once it reaches this many GB
    #[arg(long, default_value_t = 1.0)]
    max_size: f64,

    /// What to do with a full output file: rename (keep as <output>.N) or truncate
    #[arg(long, default_value_t = RotationMode::Rename)]
    rotation: RotationMode,

    /// Seconds to pause each time the EPS ceiling is reached
    #[arg(long, default_value_t = 2.0)]
    pause_secs: f64,

    /// Keep only records where PATH (dot-separated) equals VALUE; repeatable
    #[arg(short = 'f', long = "field", value_name = "PATH=VALUE")]
    fields: Vec<FieldPredicate>,

    /// Record key holding the event timestamp
    #[arg(long, default_value = DEFAULT_TIMESTAMP_FIELD)]
    timestamp_field: String,

    /// Write timestamps exactly as read (no fractional-second padding)
    #[arg(long)]
    keep_raw_timestamps: bool,

    /// Show a progress bar on stderr
    #[arg(long)]
    progress: bool,

    /// Read archives from this local root (<root>/<YYYY>/<Mon>/<stem>-<DD>.json.gz)
    #[arg(long)]
    local_root: Option<PathBuf>,

    /// Read archives from this S3 bucket
    #[arg(short, long)]
    bucket: Option<String>,

    /// S3 endpoint URL for S3-compatible stores
    #[arg(long)]
    endpoint: Option<String>,

    /// Credential profile name
    #[arg(short, long)]
    profile: Option<String>,

    /// S3 region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Archive file name stem
    #[arg(long, default_value = DEFAULT_STEM)]
    archive_stem: String,

    /// Read buffer size in bytes
    #[arg(long, default_value_t = 256 * 1024)]
    read_buffer: usize,

    /// Write buffer size in bytes
    #[arg(long, default_value_t = 256 * 1024)]
    write_buffer: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("logrecover: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("error: {}", err);
            for cause in err.chain().skip(1) {
                tracing::error!("  cause: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let min = parse_timestamp(&cli.min_timestamp).context("--min")?;
    let max = parse_timestamp(&cli.max_timestamp).context("--max")?;
    let max_bytes = gb_to_bytes(cli.max_size).context("--max-size")?;
    if cli.eps == 0 {
        bail!("--eps must be > 0");
    }
    let pause = secs_to_pause(cli.pause_secs).context("--pause-secs")?;

    let recovery = Recovery::new()
        .time_range(min, max)
        .fields(cli.fields.iter().cloned())
        .timestamp_field(cli.timestamp_field.as_str())
        .output(&cli.output)
        .eps(cli.eps)
        .pause(pause)
        .max_bytes(max_bytes)
        .rotation(cli.rotation)
        .normalize_timestamps(!cli.keep_raw_timestamps)
        .progress(cli.progress)
        .progress_label("Recovering")
        .io_buffers(cli.read_buffer, cli.write_buffer);
    // Validate the window before touching the network.
    recovery.filter_spec()?;

    let layout = ArchiveLayout::new(cli.archive_stem.as_str())?;
    let source = open_source(&cli, layout)?;
    recovery.run(source.as_ref())?;
    Ok(())
}

fn open_source(cli: &Cli, layout: ArchiveLayout) -> Result<Box<dyn BlobSource>> {
    if let Some(root) = &cli.local_root {
        return Ok(Box::new(LocalArchive::new(root, layout)?));
    }
    let Some(bucket) = cli.bucket.clone() else {
        bail!("either --local-root or --bucket is required");
    };
    open_s3(cli, bucket, layout)
}

#[cfg(feature = "s3")]
fn open_s3(cli: &Cli, bucket: String, layout: ArchiveLayout) -> Result<Box<dyn BlobSource>> {
    let settings = logrecover::S3Settings {
        bucket,
        endpoint: cli.endpoint.clone(),
        profile: cli.profile.clone(),
        region: cli.region.clone(),
        layout,
    };
    Ok(Box::new(logrecover::S3Archive::connect(settings)?))
}

#[cfg(not(feature = "s3"))]
fn open_s3(_cli: &Cli, bucket: String, _layout: ArchiveLayout) -> Result<Box<dyn BlobSource>> {
    bail!("bucket {:?} requested but this build has no S3 support (enable the `s3` feature)", bucket)
}
