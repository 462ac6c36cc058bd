// Output device abstraction
// Shared core used by the cpal output and the headless output

use cpal::{FromSample, Sample};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::format::AudioFormat;
use super::state::{DeviceState, StateSignal};
use super::stream::SharedStream;
use crate::error::Result;

/// An initialized output bound to one AudioFormat.
///
/// Implementors only provide `core()`; start/stop/reset and the state queries
/// all go through the shared `DeviceCore`.
pub trait OutputDevice: Send + Sync {
    fn core(&self) -> &DeviceCore;

    /// Begin pulling samples from `stream`. The device is `Active` when this returns.
    fn start(&self, stream: SharedStream) {
        self.core().start(stream);
    }

    fn stop(&self) {
        self.core().stop();
    }

    /// Drop whatever stream the device still holds
    fn reset(&self) {
        self.core().reset();
    }

    fn state(&self) -> DeviceState {
        self.core().signal().state()
    }

    fn signal(&self) -> &StateSignal {
        self.core().signal()
    }

    fn format(&self) -> &AudioFormat {
        self.core().format()
    }

    /// Human readable device name
    fn name(&self) -> &str;
}

pub struct DeviceCore {
    format: AudioFormat,
    signal: StateSignal,
    current: Mutex<Option<SharedStream>>,
    bytes_played: AtomicU64,
    session: AtomicU64,
}

impl DeviceCore {
    /// Core for `format`. Fails with `UnsupportedFormat` if samples of that
    /// format cannot be decoded.
    pub fn new(format: AudioFormat) -> Result<Self> {
        format.validate()?;
        Ok(Self {
            format,
            signal: StateSignal::new(),
            current: Mutex::new(None),
            bytes_played: AtomicU64::new(0),
            session: AtomicU64::new(0),
        })
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn signal(&self) -> &StateSignal {
        &self.signal
    }

    /// Bytes consumed from the stream of the current (or last) playback
    pub fn bytes_played(&self) -> u64 {
        self.bytes_played.load(Ordering::SeqCst)
    }

    /// Incremented on every start; lets pump threads notice they are stale
    pub fn session(&self) -> u64 {
        self.session.load(Ordering::SeqCst)
    }

    pub fn start(&self, stream: SharedStream) -> u64 {
        let mut current = self.current.lock();
        *current = Some(stream);
        self.bytes_played.store(0, Ordering::SeqCst);
        let session = self.session.fetch_add(1, Ordering::SeqCst) + 1;
        // Still holding `current`, so a callback cannot see the new stream before Active
        self.signal.set(DeviceState::Active);
        session
    }

    pub fn stop(&self) {
        let _current = self.current.lock();
        self.signal.set(DeviceState::Stopped);
    }

    pub fn reset(&self) {
        let mut current = self.current.lock();
        *current = None;
        self.signal.set(DeviceState::Stopped);
    }

    /// Fill `data` from the active stream, padding with silence.
    /// When the stream runs dry the device goes `Active -> Idle`.
    /// Returns the number of samples taken from the stream.
    pub fn fill<T>(&self, data: &mut [T]) -> usize
    where
        T: Sample + FromSample<f32>,
    {
        let current = self.current.lock();
        self.fill_from(current.as_ref(), data)
    }

    /// Like `fill`, but only while `session` is the latest start.
    /// Returns `None` without touching `data` once a newer start took over.
    pub fn fill_session<T>(&self, session: u64, data: &mut [T]) -> Option<usize>
    where
        T: Sample + FromSample<f32>,
    {
        // `start` bumps the session under this lock
        let current = self.current.lock();
        if self.session() != session {
            return None;
        }
        Some(self.fill_from(current.as_ref(), data))
    }

    fn fill_from<T>(&self, current: Option<&SharedStream>, data: &mut [T]) -> usize
    where
        T: Sample + FromSample<f32>,
    {
        let mut written = 0;
        let mut exhausted = false;

        if self.signal.state() == DeviceState::Active {
            if let Some(stream) = current {
                let mut stream = stream.lock();
                for slot in data.iter_mut() {
                    match stream.next_sample(&self.format) {
                        Some(value) => {
                            *slot = T::from_sample(value);
                            written += 1;
                        }
                        None => {
                            exhausted = true;
                            break;
                        }
                    }
                }
                let bytes = (written * self.format.bytes_per_sample()) as u64;
                self.bytes_played.fetch_add(bytes, Ordering::SeqCst);
            }
        }

        for slot in data[written..].iter_mut() {
            *slot = T::EQUILIBRIUM;
        }

        if exhausted {
            self.signal.transition(DeviceState::Active, DeviceState::Idle);
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::SampleBuffer;
    use crate::audio::stream::PlaybackStream;
    use crate::error::Error;

    fn stream_of(bytes: Vec<u8>) -> SharedStream {
        PlaybackStream::open(SampleBuffer::new(bytes)).into_shared()
    }

    #[test]
    fn test_fill_outputs_silence_when_stopped() {
        let core = DeviceCore::new(AudioFormat::default()).unwrap();
        let mut out = [1.0f32; 8];
        assert_eq!(core.fill(&mut out), 0);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(core.signal().state(), DeviceState::Stopped);
    }

    #[test]
    fn test_fill_drains_stream_then_goes_idle() {
        let core = DeviceCore::new(AudioFormat::default()).unwrap();
        // 3 samples of 16-bit unsigned silence
        core.start(stream_of(vec![0x00, 0x80, 0x00, 0x80, 0x00, 0x80]));
        assert_eq!(core.signal().state(), DeviceState::Active);

        let mut out = [0i16; 2];
        assert_eq!(core.fill(&mut out), 2);
        assert_eq!(core.signal().state(), DeviceState::Active);

        assert_eq!(core.fill(&mut out), 1);
        assert_eq!(core.signal().state(), DeviceState::Idle);
        assert_eq!(core.bytes_played(), 6);
    }

    #[test]
    fn test_exact_boundary_goes_idle_on_next_fill() {
        let core = DeviceCore::new(AudioFormat::default()).unwrap();
        core.start(stream_of(vec![0x00, 0x80, 0x00, 0x80]));

        let mut out = [0.0f32; 2];
        assert_eq!(core.fill(&mut out), 2);
        assert_eq!(core.signal().state(), DeviceState::Active);
        assert_eq!(core.fill(&mut out), 0);
        assert_eq!(core.signal().state(), DeviceState::Idle);
    }

    #[test]
    fn test_empty_stream_goes_idle() {
        let core = DeviceCore::new(AudioFormat::default()).unwrap();
        core.start(stream_of(Vec::new()));
        let mut out = [0u16; 4];
        core.fill(&mut out);
        assert_eq!(core.signal().state(), DeviceState::Idle);
        assert!(out.iter().all(|s| *s == u16::EQUILIBRIUM));
    }

    #[test]
    fn test_stop_keeps_stopped_state() {
        let core = DeviceCore::new(AudioFormat::default()).unwrap();
        core.start(stream_of(vec![0u8; 16]));
        core.stop();
        let mut out = [0.0f32; 16];
        assert_eq!(core.fill(&mut out), 0);
        assert_eq!(core.signal().state(), DeviceState::Stopped);
    }

    #[test]
    fn test_start_bumps_session_and_resets_counter() {
        let core = DeviceCore::new(AudioFormat::default()).unwrap();
        let first = core.start(stream_of(vec![0u8; 4]));
        let mut out = [0.0f32; 2];
        core.fill(&mut out);
        assert_eq!(core.bytes_played(), 4);

        let second = core.start(stream_of(vec![0u8; 4]));
        assert!(second > first);
        assert_eq!(core.bytes_played(), 0);
        assert_eq!(core.session(), second);
    }

    #[test]
    fn test_stale_session_does_not_fill() {
        let core = DeviceCore::new(AudioFormat::default()).unwrap();
        let first = core.start(stream_of(vec![0u8; 8]));
        core.stop();
        let second = core.start(stream_of(vec![0u8; 8]));

        let mut out = [0.5f32; 2];
        assert_eq!(core.fill_session(first, &mut out), None);
        assert_eq!(out, [0.5, 0.5]);
        assert_eq!(core.bytes_played(), 0);

        assert_eq!(core.fill_session(second, &mut out), Some(2));
        assert_eq!(core.bytes_played(), 4);
    }

    #[test]
    fn test_new_rejects_undecodable_format() {
        let format = AudioFormat {
            sample_size: 24,
            ..AudioFormat::default()
        };
        assert!(matches!(DeviceCore::new(format), Err(Error::UnsupportedFormat(_))));
    }
}
