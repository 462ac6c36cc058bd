// In-memory PCM payload of the loaded track

use std::sync::Arc;

/// Raw PCM bytes, immutable once loaded.
/// Clones share the same allocation, so handing one to a playback stream is cheap.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SampleBuffer {
    data: Arc<[u8]>,
}

impl SampleBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::from(data.into_boxed_slice()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

// Needed by `Cursor<SampleBuffer>` in the playback stream
impl AsRef<[u8]> for SampleBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer").field("len", &self.len()).finish()
    }
}
