use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre;
use refpose::{
    sampler::{timestamp_ms, SamplePlan, SampleWindow, Verdict},
    video::VideoFrames,
};
use refpose_common::bin_common::init::{init_eyre, init_logger};

#[derive(Parser)]
#[command()]
/// Dump the frames the pose extractor would look at, as images
struct Cli {
    /// Where in the video to start, in seconds from the beginning
    #[arg(long)]
    start: Option<f64>,

    /// Where in the video to stop, in seconds from the beginning
    #[arg(long)]
    end: Option<f64>,

    /// Only keep every N:th frame
    #[arg(long, default_value = "1")]
    every: NonZeroU32,

    /// Directory to write the images to
    #[arg(long)]
    outdir: PathBuf,

    /// The video to read
    videofile: PathBuf,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    init_logger(None)?;
    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.outdir)?;

    let mut video = VideoFrames::new(&cli.videofile)?;
    let fps = video.frame_rate();
    let window = SampleWindow {
        start_sec: cli.start,
        end_sec: cli.end,
    };
    let plan = SamplePlan::new(video.total_frames(), fps, window, cli.every);
    println!("Sampling {} at {} fps", plan, fps);

    let mut index: u64 = 0;
    loop {
        match plan.verdict(index) {
            Verdict::Done => break,
            verdict => {
                let Some(img) = video.read_frame()? else {
                    break;
                };
                if verdict == Verdict::Keep {
                    let frame_filename =
                        format!("frame_{}_{}.jpg", index, timestamp_ms(index, fps));
                    println!("Writing {:?}", frame_filename);
                    img.save(cli.outdir.join(frame_filename))?;
                }
            }
        }
        index += 1;
    }

    Ok(())
}
