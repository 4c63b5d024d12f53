//! Seq2Anim - image sequences to animated GIF/WebP/APNG

mod config;
mod convert;
mod present;
mod state;

use crate::config::{Config, ConvertOptions, Overrides};
use crate::state::StateMachine;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use export::ExportFormat;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "seq2anim=info,export=info,frames=info";
const VERBOSE_LOG_FILTER: &str = "seq2anim=debug,export=debug,frames=debug";
const PREVIEW_SIZE: u32 = 160;

#[derive(Parser, Debug)]
#[command(name = "seq2anim", version, about = "Convert image sequences to animated GIF, WebP or APNG")]
struct Cli {
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode an image sequence into one animation.
    Convert(ConvertArgs),
    /// Show the sequence in playback order.
    List(ListArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Image files, or a single directory of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format: gif, webp or apng.
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Output path [default: output.<ext>].
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Output width, at most the first frame's width.
    #[arg(long)]
    width: Option<u32>,

    /// Output height, at most the first frame's height.
    #[arg(long)]
    height: Option<u32>,

    /// Encoder quality; 100 is lossless for WebP and APNG.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Frame rate of the input sequence (1-60).
    #[arg(long)]
    source_fps: Option<u32>,

    /// Frame rate of the animation (1-50).
    #[arg(long)]
    output_fps: Option<u32>,

    /// File name to leave out of the sequence; may be repeated.
    #[arg(long)]
    exclude: Vec<String>,

    /// TOML file with a [convert] table of defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Image files, or a single directory of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write a PNG thumbnail of every frame into this directory.
    #[arg(long)]
    previews: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Command::Convert(args) => cmd_convert(args),
        Command::List(args) => cmd_list(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let overrides = Overrides {
        format: args.format,
        width: args.width,
        height: args.height,
        quality: args.quality,
        source_fps: args.source_fps,
        output_fps: args.output_fps,
    };
    let options = ConvertOptions::resolve(&config.convert, &overrides)?;

    let sequence = convert::load_sequence(&args.inputs, &args.exclude)?;
    let mut state_machine = StateMachine::new();
    if !state_machine.load(sequence) {
        anyhow::bail!("no images found in the given inputs");
    }
    let sequence = begin_conversion(&mut state_machine)?;

    match convert::convert(&sequence, &options) {
        Ok(conversion) => {
            state_machine.finish_converting(conversion.bytes.len());
            let out = args
                .out
                .unwrap_or_else(|| PathBuf::from(options.format.default_file_name()));
            present::present(&conversion, &out)
                .with_context(|| format!("write output '{}'", out.display()))?;
            if let Some(len) = state_machine.session().and_then(|s| s.encoded_len) {
                info!(
                    "{}: {}",
                    state_machine.state().display_text(),
                    present::format_size_mb(len)
                );
            }
            Ok(())
        }
        Err(e) => {
            state_machine.fail_converting(format!("{e:#}"));
            if let Some(message) = state_machine.session().and_then(|s| s.last_error.as_deref()) {
                error!("Conversion failed: {}", message);
            }
            Err(e)
        }
    }
}

/// Enter the converting state and hand out the sequence to encode
fn begin_conversion(state_machine: &mut StateMachine) -> anyhow::Result<frames::Sequence> {
    if !state_machine.start_converting() {
        anyhow::bail!("cannot convert in state '{}'", state_machine.state().display_text());
    }
    info!("{}", state_machine.state().display_text());

    match state_machine.session() {
        Some(session) => Ok(session.sequence.clone()),
        None => anyhow::bail!("no sequence loaded"),
    }
}

fn cmd_list(args: ListArgs) -> anyhow::Result<()> {
    let sequence = convert::load_sequence(&args.inputs, &[])?;
    if sequence.is_empty() {
        println!("No images found");
        return Ok(());
    }

    if let Some(dir) = &args.previews {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create preview directory '{}'", dir.display()))?;
    }

    for (i, entry) in sequence.entries().iter().enumerate() {
        println!("{:>5}  {}", i, entry.name);

        if let Some(dir) = &args.previews {
            let thumb = frames::preview(&entry.path, PREVIEW_SIZE)?;
            let target = dir.join(format!("{:05}.png", i));
            thumb
                .save(&target)
                .with_context(|| format!("write preview '{}'", target.display()))?;
        }
    }

    let original = sequence.original_dimensions()?;
    println!("{} frames, {}", sequence.len(), original);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use frames::Sequence;

    #[test]
    fn conversion_starts_from_loaded_sequence() {
        let mut sm = StateMachine::new();
        assert!(sm.load(Sequence::from_paths(["a/1.png", "a/2.png"])));

        let sequence = begin_conversion(&mut sm).unwrap();
        assert_eq!(sequence.len(), 2);
        assert_eq!(sm.state(), &AppState::Converting);
    }

    #[test]
    fn conversion_is_refused_without_sequence() {
        let mut sm = StateMachine::new();
        let err = begin_conversion(&mut sm).unwrap_err();
        assert!(err.to_string().contains("Ready"), "{err}");
        assert_eq!(sm.state(), &AppState::Idle);
    }

    #[test]
    fn conversion_is_refused_while_in_flight() {
        let mut sm = StateMachine::new();
        assert!(sm.load(Sequence::from_paths(["a/1.png"])));
        begin_conversion(&mut sm).unwrap();

        assert!(begin_conversion(&mut sm).is_err());
        assert_eq!(sm.state(), &AppState::Converting);
    }
}
