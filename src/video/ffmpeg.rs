#![cfg(feature = "backend-ffmpeg")]

use super::{Fourcc, Frame, SinkSettings, VideoBackend, VideoInfo, VideoSink, VideoSource, check_frame_size};
use crate::error::{VisionError, VisionResult};
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{self, flag::Flags};
use ffmpeg::util::error::{EAGAIN, EWOULDBLOCK};
use ffmpeg::util::frame::Video;
use ffmpeg_next as ffmpeg;
use std::path::{Path, PathBuf};

const BACKEND_NAME: &str = "ffmpeg";

fn failure(err: impl ToString) -> VisionError {
    VisionError::backend_failure(BACKEND_NAME, err.to_string())
}

/// Video backend on top of the system FFmpeg libraries
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> VisionResult<Self> {
        ffmpeg::init().map_err(failure)?;
        Ok(Self)
    }
}

impl VideoBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn open_source(&self, path: &Path) -> VisionResult<Box<dyn VideoSource>> {
        Ok(Box::new(FfmpegSource::open(path)?))
    }

    fn create_sink(&self, path: &Path, settings: SinkSettings) -> VisionResult<Box<dyn VideoSink>> {
        Ok(Box::new(FfmpegSink::create(path, settings)?))
    }
}

struct Decoding {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: scaling::Context,
    eof_sent: bool,
}

impl Decoding {
    fn open(path: &Path) -> VisionResult<(Self, VideoInfo)> {
        let open_error = |reason: String| VisionError::VideoOpen {
            path: path.to_path_buf(),
            reason,
        };
        if !path.is_file() {
            return Err(open_error("file does not exist".to_string()));
        }

        let input = ffmpeg::format::input(&path).map_err(|err| open_error(err.to_string()))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| open_error("no video stream found".to_string()))?;
        let stream_index = stream.index();
        let rate = match stream.avg_frame_rate() {
            r if r.denominator() != 0 && r.numerator() != 0 => r,
            _ => stream.rate(),
        };
        let fps = if rate.denominator() == 0 {
            0.0
        } else {
            f64::from(rate)
        };

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|err| open_error(err.to_string()))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|err| open_error(err.to_string()))?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(failure)?;

        let info = VideoInfo { width, height, fps };
        Ok((
            Self {
                input,
                stream_index,
                decoder,
                scaler,
                eof_sent: false,
            },
            info,
        ))
    }

    fn next_frame(&mut self) -> VisionResult<Option<Frame>> {
        let mut decoded = Video::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return self.convert(&decoded).map(Some),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(err) if is_retryable_error(&err) => {
                    if self.eof_sent {
                        return Ok(None);
                    }
                }
                Err(err) => return Err(failure(err)),
            }

            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    if let Err(err) = self.decoder.send_packet(&packet)
                        && !is_retryable_error(&err)
                    {
                        return Err(failure(err));
                    }
                }
                Err(ffmpeg::Error::Eof) => {
                    self.decoder.send_eof().map_err(failure)?;
                    self.eof_sent = true;
                }
                Err(err) => return Err(failure(err)),
            }
        }
    }

    fn convert(&mut self, decoded: &Video) -> VisionResult<Frame> {
        let mut rgb = Video::empty();
        self.scaler.run(decoded, &mut rgb).map_err(failure)?;
        let (width, height) = (rgb.width(), rgb.height());
        let stride = rgb.stride(0);
        let row_bytes = width as usize * 3;
        let plane = rgb.data(0);
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let offset = row * stride;
            buffer.extend_from_slice(&plane[offset..offset + row_bytes]);
        }
        Frame::from_raw(width, height, buffer)
            .ok_or_else(|| failure("decoded frame buffer has the wrong length"))
    }
}

pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    decoding: Decoding,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> VisionResult<Self> {
        let (decoding, info) = Decoding::open(path)?;
        log::debug!(
            "Opened {:?}: {}x{} @ {:.3} fps",
            path,
            info.width,
            info.height,
            info.fps
        );
        Ok(Self {
            path: path.to_path_buf(),
            info,
            decoding,
        })
    }
}

impl VideoSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn read_frame(&mut self) -> VisionResult<Option<Frame>> {
        self.decoding.next_frame()
    }

    fn rewind(&mut self) -> VisionResult<()> {
        // Seeking is unreliable across containers; reopening always lands on frame 0
        let (decoding, _) = Decoding::open(&self.path)?;
        self.decoding = decoding;
        Ok(())
    }
}

pub struct FfmpegSink {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: scaling::Context,
    settings: SinkSettings,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    next_pts: i64,
    finished: bool,
}

impl FfmpegSink {
    pub fn create(path: &Path, settings: SinkSettings) -> VisionResult<Self> {
        let codec_id = codec_for(settings.fourcc)?;
        let codec = ffmpeg::encoder::find(codec_id)
            .ok_or_else(|| failure(format!("no encoder available for {}", settings.fourcc)))?;

        let mut output = ffmpeg::format::output(&path).map_err(failure)?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let rate = frame_rate(settings.fps);
        let time_base = rate.invert();

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(failure)?;
        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(rate));
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder.open_as(codec).map_err(failure)?;

        {
            let mut stream = output.add_stream(codec).map_err(failure)?;
            stream.set_parameters(&encoder);
            stream.set_time_base(time_base);
        }
        output.write_header().map_err(failure)?;
        let stream_time_base = output
            .stream(0)
            .map(|stream| stream.time_base())
            .ok_or_else(|| failure("output stream disappeared after writing the header"))?;

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            settings.width,
            settings.height,
            Pixel::YUV420P,
            settings.width,
            settings.height,
            Flags::BILINEAR,
        )
        .map_err(failure)?;

        log::debug!(
            "Writing {:?}: {}x{} @ {:.3} fps ({})",
            path,
            settings.width,
            settings.height,
            settings.fps,
            settings.fourcc
        );

        Ok(Self {
            output,
            encoder,
            scaler,
            settings,
            encoder_time_base: time_base,
            stream_time_base,
            next_pts: 0,
            finished: false,
        })
    }

    fn drain_packets(&mut self) -> VisionResult<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.output).map_err(failure)?;
        }
        Ok(())
    }
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Frame) -> VisionResult<()> {
        if self.finished {
            return Err(failure("write after finish"));
        }
        check_frame_size(frame, &self.settings)?;

        let mut rgb = Video::new(Pixel::RGB24, self.settings.width, self.settings.height);
        let stride = rgb.stride(0);
        let row_bytes = self.settings.width as usize * 3;
        let plane = rgb.data_mut(0);
        for (row, chunk) in frame.as_raw().chunks_exact(row_bytes).enumerate() {
            let offset = row * stride;
            plane[offset..offset + row_bytes].copy_from_slice(chunk);
        }

        let mut yuv = Video::empty();
        self.scaler.run(&rgb, &mut yuv).map_err(failure)?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&yuv).map_err(failure)?;
        self.drain_packets()
    }

    fn finish(&mut self) -> VisionResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.encoder.send_eof().map_err(failure)?;
        self.drain_packets()?;
        self.output.write_trailer().map_err(failure)
    }
}

fn codec_for(fourcc: Fourcc) -> VisionResult<ffmpeg::codec::Id> {
    match fourcc.as_str().to_ascii_lowercase().as_str() {
        "mp4v" | "xvid" | "divx" | "fmp4" => Ok(ffmpeg::codec::Id::MPEG4),
        "avc1" | "h264" | "x264" => Ok(ffmpeg::codec::Id::H264),
        "mjpg" => Ok(ffmpeg::codec::Id::MJPEG),
        _ => Err(failure(format!("unsupported fourcc {fourcc}"))),
    }
}

fn frame_rate(fps: f64) -> ffmpeg::Rational {
    if !fps.is_finite() || fps <= 0.0 {
        // Containers without a rate still need a time base
        return ffmpeg::Rational::new(25, 1);
    }
    ffmpeg::Rational::new((fps * 1000.0).round() as i32, 1000).reduce()
}

fn is_retryable_error(error: &ffmpeg::Error) -> bool {
    matches!(
        error,
        ffmpeg::Error::Other { errno }
            if *errno == EAGAIN || *errno == EWOULDBLOCK
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimap::{CropConfig, MinimapCropper};
    use image::Rgb;

    fn gradient(width: u32, height: u32, shift: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            Rgb([((x + shift) * 3) as u8, ((y + shift) * 2) as u8, 128])
        })
    }

    fn write_clip(path: &Path, width: u32, height: u32, count: u32) {
        let settings = SinkSettings {
            width,
            height,
            fps: 25.0,
            fourcc: Fourcc::MP4V,
        };
        let mut sink = FfmpegSink::create(path, settings).unwrap();
        for shift in 0..count {
            sink.write_frame(&gradient(width, height, shift)).unwrap();
        }
        sink.finish().unwrap();
    }

    fn read_all(source: &mut dyn VideoSource) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = source.read_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn written_clip_reads_back_with_rewind() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_clip(&path, 64, 48, 5);

        let mut source = FfmpegSource::open(&path).unwrap();
        let info = source.info();
        assert_eq!((info.width, info.height), (64, 48));
        assert!((info.fps - 25.0).abs() < 0.5, "fps was {}", info.fps);

        let frames = read_all(&mut source);
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| f.dimensions() == (64, 48)));
        assert!(source.read_frame().unwrap().is_none());

        source.rewind().unwrap();
        assert_eq!(read_all(&mut source).len(), 5);
    }

    #[test]
    fn cropper_writes_square_minimap_clip() {
        let backend = FfmpegBackend::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("game.mp4");
        // 108px tall: minimap side is 108 - floor(108 * 800 / 1080) = 28
        write_clip(&input, 192, 108, 4);

        let outcome = MinimapCropper::new(CropConfig::default())
            .crop(&backend, &input, dir.path())
            .unwrap();
        assert_eq!(outcome.frames_written, 4);
        assert_eq!(outcome.region.size, 28);
        assert_eq!(outcome.output_path, dir.path().join("minimap.mp4"));

        let mut output = backend.open_source(&outcome.output_path).unwrap();
        let info = output.info();
        assert_eq!((info.width, info.height), (28, 28));
        assert!((info.fps - 25.0).abs() < 0.5, "fps was {}", info.fps);
        assert_eq!(read_all(output.as_mut()).len(), 4);
    }

    #[test]
    fn missing_file_returns_open_error() {
        let result = FfmpegSource::open(Path::new("/tmp/nonexistent-minimap-clip.mp4"));
        assert!(matches!(result, Err(VisionError::VideoOpen { .. })));
    }

    #[test]
    fn mp4v_maps_to_mpeg4() {
        assert_eq!(codec_for(Fourcc::MP4V).unwrap(), ffmpeg::codec::Id::MPEG4);
        assert!(codec_for(Fourcc::parse("zzzz").unwrap()).is_err());
    }

    #[test]
    fn fractional_rates_survive() {
        let rate = frame_rate(29.97);
        assert!((f64::from(rate) - 29.97).abs() < 1e-6);
        assert_eq!(frame_rate(0.0), ffmpeg::Rational::new(25, 1));
    }
}
