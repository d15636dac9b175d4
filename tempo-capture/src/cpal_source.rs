//! Audio capture via cpal
//!
//! The input callback converts device samples to `f32` and pushes them into
//! a lock-free ring buffer. Stream errors travel on a channel so a blocked
//! [`read_window`] call can report them instead of waiting out its timeout.
//!
//! [`read_window`]: SampleSource::read_window

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, SupportedBufferSize};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, info, warn};

use crate::config::{CaptureConfig, DEFAULT_DEVICE};
use crate::error::CaptureError;
use crate::lifecycle::{Lifecycle, Operation, StreamState};
use crate::source::{SampleSource, StreamParams, StreamRequest};

/// Seconds of audio the ring buffer can hold before samples are dropped
const BUFFER_SECONDS: usize = 4;

/// Sample formats the callback knows how to convert
const SUPPORTED_FORMATS: [SampleFormat; 4] = [
    SampleFormat::F32,
    SampleFormat::I16,
    SampleFormat::U16,
    SampleFormat::I32,
];

/// [`SampleSource`] backed by a cpal input device
pub struct CpalSource {
    lifecycle: Lifecycle,
    read_timeout: Duration,
    device: Option<cpal::Device>,
    config: Option<(cpal::StreamConfig, SampleFormat)>,
    params: Option<StreamParams>,
    stream: Option<cpal::Stream>,
    consumer: Option<HeapCons<f32>>,
    errors: Option<Receiver<String>>,
    dropped: Arc<AtomicUsize>,
}

impl Default for CpalSource {
    fn default() -> Self {
        Self::new(CaptureConfig::default().read_timeout)
    }
}

impl CpalSource {
    /// Create a closed source whose reads give up after `read_timeout`
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            read_timeout,
            device: None,
            config: None,
            params: None,
            stream: None,
            consumer: None,
            errors: None,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open, negotiate and prepare a source described by `config`
    pub fn start(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let mut source = Self::new(config.read_timeout);
        source.open(&config.device)?;
        source.negotiate(&config.request())?;
        source.prepare()?;
        Ok(source)
    }

    /// Parameters granted by the last successful negotiation
    pub fn params(&self) -> Option<StreamParams> {
        self.params
    }

    /// Samples lost because the reader fell behind
    pub fn dropped_samples(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn find_device(name: &str) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        let open_error = |reason: String| CaptureError::Open {
            device: name.to_string(),
            reason,
        };

        if name == DEFAULT_DEVICE {
            return host
                .default_input_device()
                .ok_or_else(|| open_error("no default input device".to_string()));
        }

        let mut devices = host
            .input_devices()
            .map_err(|e| open_error(e.to_string()))?;
        devices
            .find(|device| device.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| open_error("no such input device".to_string()))
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut producer: HeapProd<f32>,
        errors: Sender<String>,
        dropped: Arc<AtomicUsize>,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    if producer.try_push(sample.to_sample::<f32>()).is_err() {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            },
            move |err| {
                warn!("Audio stream error: {}", err);
                let _ = errors.try_send(err.to_string());
            },
            None,
        )
    }
}

/// Rank a supported configuration against the request, lower is better
fn distance(range: &cpal::SupportedStreamConfigRange, request: &StreamRequest) -> (u16, u32, usize) {
    let channels = range.channels().abs_diff(request.channels);
    let rate = clamp_rate(range, request.rate_hint).abs_diff(request.rate_hint);
    let bits = (range.sample_format().sample_size() * 8).abs_diff(request.bits as usize);
    (channels, rate, bits)
}

/// Supported configuration closest to `request`
fn closest_config(
    ranges: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
    request: &StreamRequest,
) -> Option<cpal::SupportedStreamConfigRange> {
    ranges
        .filter(|range| SUPPORTED_FORMATS.contains(&range.sample_format()))
        .min_by_key(|range| distance(range, request))
}

/// A window larger than the ring buffer could never be filled
fn check_window_fits(needed: usize, capacity: usize) -> Result<(), CaptureError> {
    if needed > capacity {
        return Err(CaptureError::Read(format!(
            "window of {needed} samples exceeds capture buffer of {capacity}"
        )));
    }
    Ok(())
}

fn clamp_rate(range: &cpal::SupportedStreamConfigRange, hint: u32) -> u32 {
    hint.clamp(range.min_sample_rate().0, range.max_sample_rate().0)
}

impl SampleSource for CpalSource {
    fn state(&self) -> StreamState {
        self.lifecycle.state()
    }

    fn open(&mut self, device: &str) -> Result<(), CaptureError> {
        let next = self.lifecycle.check(Operation::Open)?;
        let found = Self::find_device(device)?;
        info!(
            device = %found.name().unwrap_or_else(|_| device.to_string()),
            "Opened input device"
        );

        self.device = Some(found);
        self.lifecycle.enter(next);
        Ok(())
    }

    fn negotiate(&mut self, request: &StreamRequest) -> Result<StreamParams, CaptureError> {
        let next = self.lifecycle.check(Operation::Negotiate)?;
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| CaptureError::Negotiation("no device".to_string()))?;

        let ranges = device
            .supported_input_configs()
            .map_err(|e| CaptureError::Negotiation(e.to_string()))?;
        let range = closest_config(ranges, request).ok_or_else(|| {
            CaptureError::Negotiation("no supported input configuration".to_string())
        })?;

        let rate = clamp_rate(&range, request.rate_hint);
        let frames = match *range.buffer_size() {
            SupportedBufferSize::Range { min, max } => Some(request.frames_per_period.clamp(min, max)),
            SupportedBufferSize::Unknown => None,
        };

        let supported = range.with_sample_rate(cpal::SampleRate(rate));
        let format = supported.sample_format();
        let mut config = supported.config();
        if let Some(frames) = frames {
            config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        let params = StreamParams {
            bits: (format.sample_size() * 8) as u16,
            channels: config.channels,
            rate,
            frames_per_period: frames.unwrap_or(request.frames_per_period),
        };
        info!(?request, ?params, ?format, "Negotiated stream parameters");

        self.config = Some((config, format));
        self.params = Some(params);
        self.lifecycle.enter(next);
        Ok(params)
    }

    fn prepare(&mut self) -> Result<(), CaptureError> {
        let next = self.lifecycle.check(Operation::Prepare)?;
        let (device, (config, format)) = match (&self.device, &self.config) {
            (Some(device), Some(config)) => (device, config),
            _ => return Err(CaptureError::Prepare("stream not configured".to_string())),
        };

        let capacity = config.sample_rate.0 as usize * config.channels as usize * BUFFER_SECONDS;
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let (error_tx, error_rx) = bounded(16);
        let dropped = self.dropped.clone();

        let stream = match *format {
            SampleFormat::F32 => Self::build_stream::<f32>(device, config, producer, error_tx, dropped),
            SampleFormat::I16 => Self::build_stream::<i16>(device, config, producer, error_tx, dropped),
            SampleFormat::U16 => Self::build_stream::<u16>(device, config, producer, error_tx, dropped),
            SampleFormat::I32 => Self::build_stream::<i32>(device, config, producer, error_tx, dropped),
            other => {
                return Err(CaptureError::Prepare(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| CaptureError::Prepare(e.to_string()))?;

        // Some hosts start streams on creation; hold samples back until the first read
        if let Err(e) = stream.pause() {
            debug!("Capture stream cannot pause before first read: {}", e);
        }

        self.stream = Some(stream);
        self.consumer = Some(consumer);
        self.errors = Some(error_rx);
        self.lifecycle.enter(next);
        debug!(capacity, "Capture stream prepared");
        Ok(())
    }

    fn read_window(&mut self, frames: usize) -> Result<Vec<f32>, CaptureError> {
        let next = self.lifecycle.check(Operation::Read)?;
        let (Some(stream), Some(consumer), Some(errors), Some(params)) = (
            self.stream.as_ref(),
            self.consumer.as_mut(),
            self.errors.as_ref(),
            self.params,
        ) else {
            return Err(CaptureError::Read("stream not prepared".to_string()));
        };

        let needed = frames * params.channels as usize;
        check_window_fits(needed, consumer.capacity().get())?;

        if self.lifecycle.state() == StreamState::Prepared {
            stream
                .play()
                .map_err(|e| CaptureError::Read(e.to_string()))?;
            self.lifecycle.enter(next);
        }

        let poll = Duration::from_secs_f64(
            f64::from(params.frames_per_period.max(1)) / f64::from(params.rate.max(1)),
        );
        let deadline = Instant::now() + self.read_timeout;

        while consumer.occupied_len() < needed {
            if Instant::now() >= deadline {
                return Err(CaptureError::Timeout(self.read_timeout));
            }
            match errors.recv_timeout(poll) {
                Ok(reason) => return Err(CaptureError::Read(reason)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::Read("stream callback dropped".to_string()))
                }
            }
        }

        let mut window = vec![0.0f32; needed];
        let read = consumer.pop_slice(&mut window);
        window.truncate(read);

        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped, "Capture buffer overrun, samples lost");
        }

        Ok(window)
    }

    fn close(&mut self) {
        if let Ok(next) = self.lifecycle.check(Operation::Close) {
            if self.stream.take().is_some() {
                debug!("Capture stream closed");
            }
            self.consumer = None;
            self.errors = None;
            self.config = None;
            self.params = None;
            self.device = None;
            self.lifecycle.enter(next);
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.close();
    }
}
