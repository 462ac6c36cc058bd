// Audio player implementation
// Loads a WAV payload and plays it to the output device, blocking until it ends

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::buffer::SampleBuffer;
use super::device::OutputDevice;
use super::format::AudioFormat;
use super::loader::{self, HeaderMode};
use super::output::CpalOutput;
use super::state::DeviceState;
use super::stream::{PlaybackStream, SharedStream};
use super::track::TrackState;
use crate::error::{Error, Result};

pub struct Player {
    device: Arc<dyn OutputDevice>,
    header: HeaderMode,
    tracks: Mutex<TrackState>,
    buffer: Mutex<SampleBuffer>,
    stream: Mutex<Option<SharedStream>>,
}

impl Player {
    /// Bind `format` to the default output device.
    /// Fails with `UnsupportedFormat` if the device cannot carry it.
    pub fn init_output(format: AudioFormat, header: HeaderMode) -> Result<Self> {
        let output = CpalOutput::open(format)?;
        Ok(Self::with_device(Arc::new(output), header))
    }

    /// Player on an already initialized device
    pub fn with_device(device: Arc<dyn OutputDevice>, header: HeaderMode) -> Self {
        Self {
            device,
            header,
            tracks: Mutex::new(TrackState::new()),
            buffer: Mutex::new(SampleBuffer::default()),
            stream: Mutex::new(None),
        }
    }

    /// Load `path` (if needed) and play it. Blocks until playback ends.
    ///
    /// A track that cannot be opened is reported and nothing is played.
    pub fn play(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("[Player] Playing {}", path.display());
        self.load_track(path)?;
        self.play_buffered();
        Ok(())
    }

    /// Run `play` on the blocking pool so async callers are never blocked
    pub async fn play_async(self: Arc<Self>, path: PathBuf) -> Result<()> {
        tokio::task::spawn_blocking(move || self.play(path))
            .await
            .map_err(|e| Error::Worker(e.to_string()))?
    }

    /// Make `path` the current track and buffer its PCM payload.
    ///
    /// Returns whether the file was actually read. An unchanged track keeps
    /// its buffer, except when the device has gone idle after playing it to
    /// the end. On error the buffer is left as it was.
    pub fn load_track(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        self.tracks.lock().select(path);

        let file = loader::open_track(path)?;

        let idle = self.device.state() == DeviceState::Idle;
        if !self.tracks.lock().needs_reload(path, idle) {
            debug!("[Player] {} already buffered", path.display());
            return Ok(false);
        }

        // `tracks` is not held while reading
        let data = loader::read_payload(file, self.header, self.device.format())?;
        self.tracks.lock().commit();
        *self.buffer.lock() = data;
        Ok(true)
    }

    /// Play the buffered payload from the start and wait until the device
    /// leaves the active state (finished, stopped or failed)
    pub fn play_buffered(&self) {
        let buffer = self.buffer.lock().clone();
        let stream = PlaybackStream::open(buffer).into_shared();
        *self.stream.lock() = Some(stream.clone());

        let signal = self.device.signal();
        self.device.start(stream);

        let (mut state, mut seen) = signal.snapshot();
        while state == DeviceState::Active {
            (state, seen) = signal.wait_change(seen);
        }
        debug!("[Player] Playback ended in {:?}", state);
    }

    /// Stop an active playback and close its stream. No-op otherwise.
    pub fn stop_audio(&self) {
        if self.device.state() != DeviceState::Active {
            return;
        }
        info!("[Player] Stopping playback");
        self.device.stop();
        self.device.reset();
        if let Some(stream) = self.stream.lock().take() {
            stream.lock().close();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.device.state() == DeviceState::Active
    }

    /// Forget the previous track so the next load always reads the file
    pub fn reset_previous_track(&self) {
        self.tracks.lock().reset_previous();
    }

    pub fn current_track(&self) -> PathBuf {
        self.tracks.lock().current.clone()
    }

    pub fn previous_track(&self) -> PathBuf {
        self.tracks.lock().previous.clone()
    }

    pub fn loaded_bytes(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn format(&self) -> &AudioFormat {
        self.device.format()
    }

    pub fn device(&self) -> &dyn OutputDevice {
        self.device.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::loader::tests::{write_pcm_wav, write_tagged_wav};
    use crate::audio::memory::MemoryOutput;
    use std::thread;
    use std::time::Duration;

    fn mono_8k() -> AudioFormat {
        AudioFormat {
            sample_rate: 8000,
            channel_count: 1,
            ..AudioFormat::default()
        }
    }

    fn fast_player() -> (Arc<MemoryOutput>, Player) {
        let output = Arc::new(MemoryOutput::with_pacing(
            mono_8k(),
            Duration::from_millis(1),
            400,
        )
        .unwrap());
        let player = Player::with_device(output.clone(), HeaderMode::Canonical);
        (output, player)
    }

    /// Paced so a short payload plays for a noticeable time
    fn slow_player() -> (Arc<MemoryOutput>, Player) {
        let output = Arc::new(MemoryOutput::with_pacing(
            mono_8k(),
            Duration::from_millis(5),
            16,
        )
        .unwrap());
        let player = Player::with_device(output.clone(), HeaderMode::Canonical);
        (output, player)
    }

    fn wait_for_playing(player: &Player) {
        for _ in 0..200 {
            if player.is_playing() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("playback never started");
    }

    #[test]
    fn test_plays_whole_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "one.wav", 1, 8000, &vec![0x1111; 4000]);
        let (output, player) = fast_player();

        assert!(player.load_track(&path).unwrap());
        assert_eq!(player.loaded_bytes(), 8000);
        player.play_buffered();

        let file_len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(output.bytes_played(), file_len - 44);
        assert_eq!(output.bytes_played(), 8000);
        assert_eq!(player.device().state(), DeviceState::Idle);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_same_track_after_completion_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 400]);
        let (_output, player) = fast_player();

        player.play(&path).unwrap();
        assert_eq!(player.device().state(), DeviceState::Idle);
        assert_eq!(player.previous_track(), path);

        // Finished naturally: the idle branch forces a reload
        assert!(player.load_track(&path).unwrap());
    }

    #[test]
    fn test_same_track_after_stop_skips_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 4000]);
        let (_output, player) = slow_player();
        let player = Arc::new(player);

        let worker = player.clone();
        let worker_path = path.clone();
        let handle = thread::spawn(move || worker.play(worker_path));

        wait_for_playing(&player);
        player.stop_audio();
        handle.join().unwrap().unwrap();
        assert_eq!(player.device().state(), DeviceState::Stopped);

        // Stopped rather than idle: the buffered data is reused
        assert!(!player.load_track(&path).unwrap());
    }

    #[test]
    fn test_different_track_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 50]);
        let b = write_pcm_wav(dir.path(), "b.wav", 1, 8000, &vec![0i16; 100]);
        let (_output, player) = fast_player();

        assert!(player.load_track(&a).unwrap());
        assert_eq!(player.loaded_bytes(), 100);
        assert!(player.load_track(&b).unwrap());
        assert_eq!(player.loaded_bytes(), 200);
        assert_eq!(player.previous_track(), b);
    }

    #[test]
    fn test_reset_previous_track_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 50]);
        let (_output, player) = fast_player();

        assert!(player.load_track(&path).unwrap());
        assert!(!player.load_track(&path).unwrap());

        player.reset_previous_track();
        assert_eq!(player.previous_track(), PathBuf::new());
        assert!(player.load_track(&path).unwrap());
    }

    #[test]
    fn test_is_playing_only_during_playback() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 800]);
        let (_output, player) = slow_player();
        let player = Arc::new(player);
        assert!(!player.is_playing());

        let worker = player.clone();
        let handle = thread::spawn(move || worker.play(path));

        wait_for_playing(&player);
        assert!(player.is_playing());
        handle.join().unwrap().unwrap();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_stop_when_not_playing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 50]);
        let (_output, player) = fast_player();

        player.stop_audio();
        assert_eq!(player.device().state(), DeviceState::Stopped);

        player.play(&path).unwrap();
        let tracks = (player.current_track(), player.previous_track());
        player.stop_audio();
        assert_eq!(player.device().state(), DeviceState::Idle);
        assert_eq!((player.current_track(), player.previous_track()), tracks);
        assert_eq!(player.loaded_bytes(), 100);
    }

    #[test]
    fn test_stop_unblocks_playback_and_closes_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "long.wav", 1, 8000, &vec![0i16; 40_000]);
        let (output, player) = slow_player();
        let player = Arc::new(player);

        let worker = player.clone();
        let handle = thread::spawn(move || worker.play(path));

        wait_for_playing(&player);
        player.stop_audio();
        handle.join().unwrap().unwrap();

        assert!(output.bytes_played() < 80_000);
        assert!(player.stream.lock().is_none());
        // Buffer survives a stop
        assert_eq!(player.loaded_bytes(), 80_000);
    }

    #[test]
    fn test_missing_file_keeps_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 150]);
        let (_output, player) = fast_player();
        player.load_track(&path).unwrap();

        let missing = dir.path().join("missing.wav");
        let result = player.load_track(&missing);
        assert!(matches!(result, Err(Error::FileOpen { .. })));
        assert_eq!(player.loaded_bytes(), 300);
        assert_eq!(player.previous_track(), path);
    }

    #[test]
    fn test_play_missing_file_does_not_start() {
        let dir = tempfile::tempdir().unwrap();
        let (output, player) = fast_player();

        let result = player.play(dir.path().join("missing.wav"));
        assert!(matches!(result, Err(Error::FileOpen { .. })));
        assert_eq!(player.device().state(), DeviceState::Stopped);
        assert_eq!(output.bytes_played(), 0);
    }

    #[test]
    fn test_chunks_header_mode() {
        let dir = tempfile::tempdir().unwrap();
        let payload = vec![0x22; 640];
        let path = write_tagged_wav(dir.path(), "tagged.wav", 1, 8000, &payload, b"INFOISFT");
        let output = Arc::new(MemoryOutput::with_pacing(mono_8k(), Duration::from_millis(1), 400).unwrap());
        let player = Player::with_device(output.clone(), HeaderMode::Chunks);

        player.play(&path).unwrap();
        assert_eq!(player.loaded_bytes(), 640);
        assert_eq!(output.bytes_played(), 640);
    }

    #[cfg(unix)]
    #[test]
    fn test_track_queries_answer_during_slow_read() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let source = write_pcm_wav(dir.path(), "source.wav", 1, 8000, &vec![0i16; 100]);
        let bytes = std::fs::read(&source).unwrap();

        let pipe = dir.path().join("pipe.wav");
        let status = std::process::Command::new("mkfifo").arg(&pipe).status().unwrap();
        assert!(status.success());

        let output = Arc::new(MemoryOutput::with_pacing(mono_8k(), Duration::from_millis(1), 400).unwrap());
        // A pipe cannot seek, so locate the payload by chunks
        let player = Arc::new(Player::with_device(output, HeaderMode::Chunks));

        let worker = player.clone();
        let worker_path = pipe.clone();
        let handle = thread::spawn(move || worker.load_track(worker_path));

        // Returns once the loader has opened the read end; it then blocks on the header
        let mut writer = std::fs::OpenOptions::new().write(true).open(&pipe).unwrap();
        assert_eq!(player.current_track(), pipe);
        player.reset_previous_track();
        assert_eq!(player.previous_track(), PathBuf::new());

        writer.write_all(&bytes).unwrap();
        drop(writer);

        assert!(handle.join().unwrap().unwrap());
        assert_eq!(player.loaded_bytes(), 200);
        assert_eq!(player.previous_track(), pipe);
    }

    #[test]
    fn test_empty_buffer_returns_immediately() {
        let (output, player) = fast_player();
        player.play_buffered();
        assert_eq!(output.bytes_played(), 0);
        assert_eq!(player.device().state(), DeviceState::Idle);
    }

    #[tokio::test]
    async fn test_play_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pcm_wav(dir.path(), "a.wav", 1, 8000, &vec![0i16; 400]);
        let (output, player) = fast_player();
        let player = Arc::new(player);

        player.clone().play_async(path.clone()).await.unwrap();
        assert_eq!(output.bytes_played(), 800);
        assert_eq!(player.current_track(), path);
    }
}
