use std::{
    ffi::OsString,
    fs,
    io::Write,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use refpose::{
    document::{self, Focus, ReferenceDoc},
    pose::detector::{Backend, ModelStore},
    sampler::SampleWindow,
    sequence,
    video::VideoFrames,
};
use refpose_common::{
    bin_common::init::{init_eyre, init_logger},
    utils::fsutils::{read_optional_file, video_files},
};

#[derive(Parser, Debug)]
#[command()]
/// Extracts reference pose sequences from exercise videos.
///
/// A single video in gives one sequence, a directory in gives one sequence
/// per video in it. The result is a JSON file for other tools to compare
/// live poses against.
struct Cli {
    /// A video file, or a directory of video files
    input: PathBuf,

    /// Where to write the resulting JSON
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Where in the video to start, in seconds from the beginning
    #[arg(long)]
    start: Option<f64>,

    /// Where in the video to stop, in seconds from the beginning
    #[arg(long)]
    end: Option<f64>,

    /// Only keep every N:th frame
    #[arg(long, default_value = "1")]
    every: NonZeroU32,

    /// What the footage shows, carried through to the output
    #[arg(long, value_enum, default_value_t = Focus::Full)]
    focus: Focus,

    /// Directory to look for pose models in, instead of the user cache
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Pose model to use, instead of probing for the best available one
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,
}

fn cli_arguments() -> eyre::Result<Cli> {
    const ARGS_FILE: &str = ".refposerc";
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if args.len() == 1 {
        let flags = read_optional_file(ARGS_FILE)
            .wrap_err_with(|| format!("could not read the flags file at: {ARGS_FILE}"))?;
        if let Some(flags) = flags {
            args.extend(flags.split_whitespace().map(OsString::from));
        }
    }

    Ok(Cli::parse_from(args))
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = cli_arguments()?;
    init_logger(cli.logfile.as_deref())?;

    log::debug!("CLI arguments: {cli:#?}");

    let store = match &cli.model_dir {
        Some(dir) => ModelStore::new(dir),
        None => ModelStore::new(ModelStore::default_dir()),
    };
    let backend = match cli.backend {
        Some(backend) => backend,
        None => Backend::probe(&store)?,
    };
    log::info!(
        "Using the {} backend with models from {}",
        backend,
        store.dir().display()
    );

    let window = SampleWindow {
        start_sec: cli.start,
        end_sec: cli.end,
    };

    let doc = if cli.input.is_dir() {
        dataset_document(&cli, &store, backend, window)?
    } else {
        single_document(&cli, &store, backend, window)?
    };

    write_document(&cli.output, &doc)?;
    log::info!("Wrote the document to '{}'", cli.output.display());
    Ok(())
}

fn single_document(
    cli: &Cli,
    store: &ModelStore,
    backend: Backend,
    window: SampleWindow,
) -> eyre::Result<ReferenceDoc> {
    let mut source = VideoFrames::new(&cli.input)
        .wrap_err_with(|| format!("Failed to open '{}'", cli.input.display()))?;
    let mut detector = backend.open(store)?;

    let sequence =
        sequence::extract_sequence(&mut source, detector.as_mut(), window, cli.every)?;
    eyre::ensure!(
        !sequence.is_empty(),
        "No poses found in '{}'",
        cli.input.display()
    );

    log::info!("Extracted {} frames with a pose", sequence.len());
    Ok(ReferenceDoc::single(sequence, cli.focus))
}

fn dataset_document(
    cli: &Cli,
    store: &ModelStore,
    backend: Backend,
    window: SampleWindow,
) -> eyre::Result<ReferenceDoc> {
    let videos = video_files(&cli.input)
        .wrap_err_with(|| format!("Failed to list videos in '{}'", cli.input.display()))?;
    eyre::ensure!(
        !videos.is_empty(),
        "No video files in '{}'",
        cli.input.display()
    );

    log::info!("Extracting from {} videos", videos.len());
    let (sequences, skipped) = sequence::collect_sequences(&videos, |video| {
        let mut source = VideoFrames::new(video)?;
        // a fresh detector per video, their timestamps restart at zero
        let mut detector = backend.open(store)?;
        sequence::extract_sequence(&mut source, detector.as_mut(), window, cli.every)
    });

    if skipped > 0 {
        log::warn!("Skipped {} of {} videos", skipped, videos.len());
    }
    eyre::ensure!(
        !sequences.is_empty(),
        "No poses found in any video in '{}'",
        cli.input.display()
    );

    Ok(ReferenceDoc::dataset(sequences, cli.focus))
}

fn write_document(path: &Path, doc: &ReferenceDoc) -> eyre::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create '{}'", parent.display()))?;
    }

    let file = fs::File::create(path)
        .wrap_err_with(|| format!("Failed to create '{}'", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    document::save_to(&mut writer, doc).wrap_err("Failed to serialize the document")?;
    writer.flush().wrap_err("Failed to write the document")?;
    Ok(())
}
