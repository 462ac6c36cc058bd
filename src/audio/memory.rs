// Headless output device
// Drains playback streams at a paced rate without touching any hardware

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

use super::device::{DeviceCore, OutputDevice};
use super::format::AudioFormat;
use super::state::DeviceState;
use super::stream::SharedStream;
use crate::error::Result;

const DEFAULT_PERIOD: Duration = Duration::from_millis(10);

pub struct MemoryOutput {
    core: Arc<DeviceCore>,
    period: Duration,
    samples_per_tick: usize,
}

impl MemoryOutput {
    /// Headless output consuming samples in real time
    pub fn open(format: AudioFormat) -> Result<Self> {
        let per_second = format.sample_rate as usize * format.channel_count as usize;
        let samples_per_tick = (per_second * DEFAULT_PERIOD.as_millis() as usize / 1000).max(1);
        Self::with_pacing(format, DEFAULT_PERIOD, samples_per_tick)
    }

    /// Headless output pulling `samples_per_tick` samples every `period`
    pub fn with_pacing(format: AudioFormat, period: Duration, samples_per_tick: usize) -> Result<Self> {
        Ok(Self {
            core: Arc::new(DeviceCore::new(format)?),
            period,
            samples_per_tick: samples_per_tick.max(1),
        })
    }

    pub fn bytes_played(&self) -> u64 {
        self.core.bytes_played()
    }
}

impl OutputDevice for MemoryOutput {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn start(&self, stream: SharedStream) {
        let session = self.core.start(stream);

        let core = self.core.clone();
        let period = self.period;
        let mut scratch = vec![0.0f32; self.samples_per_tick];
        thread::spawn(move || {
            // A newer start or a stop ends this pump
            while core.signal().state() == DeviceState::Active {
                thread::sleep(period);
                if core.fill_session(session, &mut scratch).is_none() {
                    break;
                }
            }
            debug!("[Output] Headless pump {} finished", session);
        });
    }

    fn name(&self) -> &str {
        "headless"
    }
}
