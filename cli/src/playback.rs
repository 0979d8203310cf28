use crate::analyser::{AnalysisTap, FFT_SIZE};
use crate::media;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sample, Sink, Source};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("media for {0} has not been downloaded yet")]
    NotCached(String),
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("audio output unavailable: {0}")]
    Output(String),
}

/// A live audio instance.
pub trait PlaybackHandle {
    /// Pauses, rewinds and releases the underlying output.
    fn stop(&mut self);

    fn is_finished(&self) -> bool;

    /// Samples flowing to the output, when the backend can expose them.
    fn analysis_tap(&self) -> Option<AnalysisTap>;
}

pub trait PlaybackBackend {
    fn start(&mut self, source_url: &str) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    Stopped,
}

struct ActivePlayback {
    track_id: String,
    handle: Box<dyn PlaybackHandle>,
}

/// The single playback slot. The playing id and its handle live in one
/// optional value, so they are always replaced together.
pub struct Player {
    backend: Box<dyn PlaybackBackend>,
    active: Option<ActivePlayback>,
}

impl Player {
    pub fn new(backend: Box<dyn PlaybackBackend>) -> Self {
        Self { backend, active: None }
    }

    pub fn current(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.track_id.as_str())
    }

    pub fn is_playing(&self, track_id: &str) -> bool {
        self.current() == Some(track_id)
    }

    pub fn analysis_tap(&self) -> Option<AnalysisTap> {
        self.active.as_ref().and_then(|active| active.handle.analysis_tap())
    }

    /// Starts `track_id`, or stops it when it is already the one playing.
    pub fn play(&mut self, track_id: &str, source_url: &str) -> Result<PlayOutcome, PlaybackError> {
        if let Some(finished) = self.poll_finished() {
            debug!("track {finished} had already ended");
        }
        let toggled_off = self.is_playing(track_id);
        self.stop();
        if toggled_off {
            return Ok(PlayOutcome::Stopped);
        }

        let handle = self.backend.start(source_url)?;
        info!("playing track {track_id}");
        self.active = Some(ActivePlayback { track_id: track_id.to_string(), handle });
        Ok(PlayOutcome::Started)
    }

    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!("stopping track {}", active.track_id);
            active.handle.stop();
        }
    }

    /// Clears the slot once the active instance has played to the end,
    /// returning the finished track id.
    pub fn poll_finished(&mut self) -> Option<String> {
        let finished = self.active.as_ref().is_some_and(|active| active.handle.is_finished());
        if !finished {
            return None;
        }
        self.active.take().map(|active| active.track_id)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Plays local files (or cached downloads) through the default output device.
pub struct RodioBackend {
    media_dir: PathBuf,
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl RodioBackend {
    pub fn new(media_dir: PathBuf) -> Self {
        Self { media_dir, output: None }
    }

    fn output_handle(&mut self) -> Result<&OutputStreamHandle, PlaybackError> {
        if self.output.is_none() {
            let opened = OutputStream::try_default()
                .map_err(|err| PlaybackError::Output(err.to_string()))?;
            self.output = Some(opened);
        }
        match self.output.as_ref() {
            Some((_, handle)) => Ok(handle),
            None => Err(PlaybackError::Output("output stream missing".to_string())),
        }
    }
}

impl PlaybackBackend for RodioBackend {
    fn start(&mut self, source_url: &str) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        let path = media::local_media_path(&self.media_dir, source_url)
            .ok_or_else(|| PlaybackError::NotCached(source_url.to_string()))?;
        let decoder = open_decoder(&path)?;
        let tap = AnalysisTap::new(FFT_SIZE * 4);
        let sink = Sink::try_new(self.output_handle()?)
            .map_err(|err| PlaybackError::Output(err.to_string()))?;
        sink.append(TappedSource::new(decoder, tap.clone()));
        sink.play();
        Ok(Box::new(RodioHandle { sink, tap }))
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path)
        .map_err(|source| PlaybackError::Open { path: path.to_path_buf(), source })?;
    Decoder::new(BufReader::new(file)).map_err(|err| PlaybackError::Decode(err.to_string()))
}

struct RodioHandle {
    sink: Sink,
    tap: AnalysisTap,
}

impl PlaybackHandle for RodioHandle {
    fn stop(&mut self) {
        self.sink.pause();
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    fn analysis_tap(&self) -> Option<AnalysisTap> {
        Some(self.tap.clone())
    }
}

/// Passes samples through untouched while feeding a mono mix to the tap.
pub struct TappedSource<S> {
    inner: S,
    tap: AnalysisTap,
    channels: u16,
    frame_sum: f32,
    frame_pos: u16,
}

impl<S> TappedSource<S>
where
    S: Source,
    S::Item: Sample,
    f32: rodio::cpal::FromSample<S::Item>,
{
    pub fn new(inner: S, tap: AnalysisTap) -> Self {
        let channels = inner.channels().max(1);
        Self { inner, tap, channels, frame_sum: 0.0, frame_pos: 0 }
    }
}

impl<S> Iterator for TappedSource<S>
where
    S: Source,
    S::Item: Sample,
    f32: rodio::cpal::FromSample<S::Item>,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame_pos == 0 {
            self.channels = self.inner.channels().max(1);
        }
        let sample = self.inner.next()?;
        self.frame_sum += rodio::cpal::Sample::to_sample::<f32>(sample);
        self.frame_pos += 1;
        if self.frame_pos >= self.channels {
            self.tap.push(self.frame_sum / self.channels as f32);
            self.frame_sum = 0.0;
            self.frame_pos = 0;
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for TappedSource<S>
where
    S: Source,
    S::Item: Sample,
    f32: rodio::cpal::FromSample<S::Item>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
