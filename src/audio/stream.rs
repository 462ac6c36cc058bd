// Seekable read stream over a SampleBuffer, handed to the output device

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use parking_lot::Mutex;

use super::buffer::SampleBuffer;
use super::format::AudioFormat;

/// Stream shared between the player (which may close it) and the device (which reads it)
pub type SharedStream = Arc<Mutex<PlaybackStream>>;

pub struct PlaybackStream {
    cursor: Cursor<SampleBuffer>,
    closed: bool,
}

impl PlaybackStream {
    /// Open a stream positioned at the start of the buffer
    pub fn open(buffer: SampleBuffer) -> Self {
        Self {
            cursor: Cursor::new(buffer),
            closed: false,
        }
    }

    pub fn into_shared(self) -> SharedStream {
        Arc::new(Mutex::new(self))
    }

    /// Closed streams read as empty
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Pull the next sample and decode it. A trailing partial sample is dropped.
    pub fn next_sample(&mut self, format: &AudioFormat) -> Option<f32> {
        let mut raw = [0u8; 2];
        let width = format.bytes_per_sample();
        match self.read_exact(&mut raw[..width]) {
            Ok(()) => Some(format.decode_sample(&raw[..width])),
            Err(_) => None,
        }
    }
}

impl Read for PlaybackStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }
        self.cursor.read(buf)
    }
}

impl Seek for PlaybackStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "stream is closed"));
        }
        self.cursor.seek(pos)
    }
}
