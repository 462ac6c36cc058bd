// Audio output using cpal
// Binds the fixed PCM format to the default output device and keeps one stream open

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig, SupportedStreamConfig, SupportedStreamConfigRange};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

use super::device::{DeviceCore, OutputDevice};
use super::format::AudioFormat;
use crate::error::{Error, Result};

pub struct CpalOutput {
    core: Arc<DeviceCore>,
    name: String,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the default output device for `format`.
    ///
    /// The cpal stream is not `Send`, so it is built and held by a dedicated
    /// thread until this handle is dropped. The stream plays silence while no
    /// track is active.
    pub fn open(format: AudioFormat) -> Result<Self> {
        let core = Arc::new(DeviceCore::new(format)?);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_core = core.clone();
        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match Self::open_stream(thread_core) {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Returns once the sender is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("[Output] Stream closed");
            })?;

        let name = match ready_rx.recv() {
            Ok(result) => result?,
            Err(_) => return Err(Error::Device("output thread exited during setup".to_string())),
        };

        info!("[Output] Using {} with {}", name, core.format());

        Ok(Self {
            core,
            name,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn open_stream(core: Arc<DeviceCore>) -> Result<(Stream, String)> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported: Vec<SupportedStreamConfigRange> = device
            .supported_output_configs()
            .map_err(|e| Error::Device(format!("Failed to get device configs: {}", e)))?
            .collect();

        let config = find_config(&supported, core.format())?;
        let sample_format = config.sample_format();
        debug!(
            "[Output] Device config: {} Hz, {} ch, {:?}",
            config.sample_rate().0,
            config.channels(),
            sample_format
        );

        let config: StreamConfig = config.into();
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, core)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, core)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, core)?,
            SampleFormat::I8 => Self::build_stream::<i8>(&device, &config, core)?,
            SampleFormat::U8 => Self::build_stream::<u8>(&device, &config, core)?,
            SampleFormat::I32 => Self::build_stream::<i32>(&device, &config, core)?,
            format => {
                return Err(Error::UnsupportedFormat(format!(
                    "device sample format {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::Device(format!("Failed to start stream: {}", e)))?;

        Ok((stream, name))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        core: Arc<DeviceCore>,
    ) -> Result<Stream> {
        let error_core = core.clone();
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    core.fill(data);
                },
                move |err| {
                    error!("[Output] Stream error: {}", err);
                    // Unblocks anyone waiting on the playback
                    error_core.stop();
                },
                None,
            )
            .map_err(|e| Error::Device(format!("Failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    /// Bytes consumed from the most recent playback stream
    pub fn bytes_played(&self) -> u64 {
        self.core.bytes_played()
    }
}

impl OutputDevice for CpalOutput {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.core.reset();
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Sample types `open_stream` can build a callback for
fn is_buildable(sample_format: SampleFormat) -> bool {
    matches!(
        sample_format,
        SampleFormat::F32
            | SampleFormat::I16
            | SampleFormat::U16
            | SampleFormat::I8
            | SampleFormat::U8
            | SampleFormat::I32
    )
}

/// Pick a device configuration carrying `format`'s channel count and rate.
/// An exact sample type match wins; otherwise samples are converted.
pub fn find_config(
    supported: &[SupportedStreamConfigRange],
    format: &AudioFormat,
) -> Result<SupportedStreamConfig> {
    let rate = cpal::SampleRate(format.sample_rate);
    let candidates: Vec<&SupportedStreamConfigRange> = supported
        .iter()
        .filter(|range| {
            is_buildable(range.sample_format())
                && range.channels() == format.channel_count
                && range.min_sample_rate() <= rate
                && range.max_sample_rate() >= rate
        })
        .collect();

    let preferred = format.cpal_sample_format();
    let chosen = candidates
        .iter()
        .find(|range| range.sample_format() == preferred)
        .or_else(|| {
            candidates
                .iter()
                .find(|range| range.sample_format() == SampleFormat::F32)
        })
        .or_else(|| candidates.first());

    match chosen {
        Some(range) => Ok((*range).clone().with_sample_rate(rate)),
        None => Err(Error::UnsupportedFormat(format!(
            "raw audio format not supported by the output device: {}",
            format
        ))),
    }
}
