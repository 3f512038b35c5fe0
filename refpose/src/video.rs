extern crate ffmpeg_next as ffmpeg;

use std::path::Path;
use std::sync::OnceLock;

use color_eyre::eyre;
use ffmpeg::codec::Context as CodecContext;
use ffmpeg::decoder::Video as Decoder;
use ffmpeg::format::context::Input as Demuxer;
use ffmpeg::format::{input, Pixel};
use ffmpeg::frame::Video as RawFrame;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::context::Context as Scaler;
use ffmpeg::util::log as ffmpeglog;
use ffmpeg::Packet;
use ffmpeg_sys_next::{AV_NOPTS_VALUE, AV_TIME_BASE};
use image::RgbImage;

use crate::sequence::FrameSource;

/// Assumed frame rate for videos that do not state one.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("ffmpeg: {0}")]
    Ffmpeg(#[from] ffmpeg::Error),
    #[error("no video stream")]
    NoVideoStream,
    #[error("no pixel format")]
    NoPixelFormat,
    #[error("the video does not say how long it is")]
    NoDuration,
}

pub type Result<T> = std::result::Result<T, VideoError>;

static FFMPEG_INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> =
    OnceLock::new();

/// A video file decoded front to back, one RGB frame at a time. No seeking,
/// reading every frame in order is what keeps the frame indices exact.
pub struct VideoFrames {
    container: Demuxer,
    decoder: Decoder,
    scaler: Scaler,
    stream_index: usize,
    rotation: Rotation,
    frame_rate: f64,
    total_frames: u64,
}

impl VideoFrames {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Err(e) = FFMPEG_INIT.get_or_init(|| {
            ffmpeg::init()?;
            ffmpeglog::set_level(ffmpeglog::Level::Fatal);
            Ok(())
        }) {
            return Err(e.clone().into());
        }

        let mut container = input(&path)?;
        let video = container
            .streams()
            .best(Type::Video)
            .ok_or(VideoError::NoVideoStream)?;
        let stream_index = video.index();

        let frame_rate = {
            let rate = f64::from(video.avg_frame_rate());
            if rate.is_finite() && rate > 0.0 {
                rate
            } else {
                log::warn!(
                    "The video does not state a frame rate, assuming {}",
                    DEFAULT_FRAME_RATE
                );
                DEFAULT_FRAME_RATE
            }
        };

        let total_frames = if video.frames() > 0 {
            video.frames() as u64
        } else {
            let seconds = if video.duration() != AV_NOPTS_VALUE {
                video.duration() as f64 * f64::from(video.time_base())
            } else if container.duration() != AV_NOPTS_VALUE {
                container.duration() as f64 / f64::from(AV_TIME_BASE)
            } else {
                return Err(VideoError::NoDuration);
            };
            (seconds * frame_rate).round().max(0.0) as u64
        };

        let rotation = match stored_rotation(&video) {
            Some(rot) => rot,
            None => {
                log::warn!("Unrecognized rotation angle, assuming upright");
                Rotation::Upright
            }
        };

        let decoder = CodecContext::from_parameters(video.parameters())?
            .decoder()
            .video()?;

        let scaler = rgb_scaler(&decoder)?;

        container
            .streams_mut()
            .filter(|stream| stream.index() != stream_index)
            .for_each(|mut stream| discard_packets(&mut stream));

        Ok(Self {
            container,
            decoder,
            scaler,
            stream_index,
            rotation,
            frame_rate,
            total_frames,
        })
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// The frame count claimed by the metadata, or estimated from the
    /// duration when it is not. [`read_frame`] is what decides how many
    /// frames there really are.
    ///
    /// [`read_frame`]: Self::read_frame
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// The next frame in decode order, or `None` at the end of the video.
    pub fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        loop {
            loop {
                let mut decoded = RawFrame::empty();
                match self.decoder.receive_frame(&mut decoded) {
                    Ok(()) => (),
                    Err(ffmpeg::Error::Other {
                        errno: libc::EAGAIN,
                    }) => break,
                    Err(ffmpeg::Error::Eof) => return Ok(None),
                    Err(e) => return Err(e.into()),
                }

                let mut rgb = RawFrame::empty();
                self.scaler.run(&decoded, &mut rgb)?;
                return Ok(Some(turn_upright(frame_to_image(rgb), self.rotation)));
            }

            loop {
                let mut packet = Packet::empty();
                match packet.read(&mut self.container) {
                    Ok(()) if packet.stream() == self.stream_index => {
                        match self.decoder.send_packet(&packet) {
                            Ok(()) => break,
                            Err(e) => {
                                log::warn!("Skipping a broken packet: {}", e);
                                continue;
                            }
                        }
                    }
                    Ok(()) => continue,
                    Err(ffmpeg::Error::Eof) => {
                        self.decoder.send_eof()?;
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

impl FrameSource for VideoFrames {
    fn frame_rate(&self) -> f64 {
        self.frame_rate()
    }

    fn total_frames(&self) -> u64 {
        self.total_frames()
    }

    fn next_frame(&mut self) -> eyre::Result<Option<RgbImage>> {
        Ok(self.read_frame()?)
    }
}

/// How a decoded frame has to be turned to end up upright.
#[derive(Clone, Copy)]
enum Rotation {
    Upright,
    Cw90,
    Ccw90,
    Half,
}

/// Phone footage is often stored rotated with a display matrix saying how to
/// turn it upright. `None` means the matrix holds some angle other than a
/// quarter turn.
fn stored_rotation(video: &ffmpeg::Stream) -> Option<Rotation> {
    for data in video.side_data() {
        if data.kind() != ffmpeg::packet::side_data::Type::DisplayMatrix {
            continue;
        }

        let degrees = unsafe {
            ffmpeg_sys_next::av_display_rotation_get(data.data().as_ptr() as *const i32)
        };
        if !degrees.is_finite() {
            continue;
        }

        return match degrees.round() as i32 {
            0 => Some(Rotation::Upright),
            -90 => Some(Rotation::Cw90),
            90 => Some(Rotation::Ccw90),
            180 | -180 => Some(Rotation::Half),
            _ => None,
        };
    }

    Some(Rotation::Upright)
}

fn turn_upright(img: RgbImage, rotation: Rotation) -> RgbImage {
    match rotation {
        Rotation::Upright => img,
        Rotation::Cw90 => image::imageops::rotate90(&img),
        Rotation::Ccw90 => image::imageops::rotate270(&img),
        Rotation::Half => image::imageops::rotate180(&img),
    }
}

fn rgb_scaler(decoder: &Decoder) -> Result<Scaler> {
    if decoder.format() == Pixel::None {
        return Err(VideoError::NoPixelFormat);
    }
    Ok(Scaler::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::Flags::FAST_BILINEAR,
    )?)
}

fn frame_to_image(frame: RawFrame) -> RgbImage {
    assert_eq!(Pixel::RGB24, frame.format());
    assert_eq!(1, frame.planes());

    let stride = frame.stride(0);
    let width: usize = frame.width().try_into().expect("u32 fits in usize");
    let height: usize = frame.height().try_into().expect("u32 fits in usize");
    let data = frame.data(0);
    let row_bytes = 3 * width;

    // ffmpeg pads its rows to the right, the image crate wants them packed
    let data = if stride == row_bytes {
        data.to_vec()
    } else {
        assert!(stride >= row_bytes);
        let mut packed = vec![0; row_bytes * height];
        for row in 0..height {
            packed[(row * row_bytes)..((row + 1) * row_bytes)]
                .copy_from_slice(&data[(row * stride)..(row * stride + row_bytes)]);
        }
        packed
    };

    RgbImage::from_vec(
        width.try_into().expect("came from an u32"),
        height.try_into().expect("came from an u32"),
        data,
    )
    .expect("the buffer was sized for exactly this")
}

fn discard_packets(stream: &mut ffmpeg::StreamMut<'_>) {
    unsafe {
        let ptr = stream.as_mut_ptr();
        if !ptr.is_null() {
            (*ptr).discard = ffmpeg_sys_next::AVDiscard::AVDISCARD_ALL;
        }
    }
}
