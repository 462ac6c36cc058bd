// WAV payload loader
// Reads the raw PCM bytes of a WAV file into a SampleBuffer

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

use super::buffer::SampleBuffer;
use super::format::{AudioFormat, SampleEncoding};
use crate::error::{Error, Result};

/// Size of a canonical RIFF/WAVE header (RIFF + fmt(16) + data chunk header)
pub const CANONICAL_HEADER_LEN: u64 = 44;

/// How the start of the PCM payload is located
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    /// Skip a fixed 44-byte header. Header fields are not read.
    #[default]
    Canonical,
    /// Walk the RIFF chunks to find the `data` chunk
    Chunks,
}

/// Open a track read-only
pub fn open_track(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the PCM payload of an opened WAV file
pub fn read_payload(file: File, mode: HeaderMode, format: &AudioFormat) -> Result<SampleBuffer> {
    let data = match mode {
        HeaderMode::Canonical => read_after_canonical_header(file)?,
        HeaderMode::Chunks => read_data_chunk(file, format)?,
    };
    debug!("[Loader] Buffered {} bytes of PCM ({:?} header)", data.len(), mode);
    Ok(SampleBuffer::new(data))
}

fn read_after_canonical_header(file: File) -> Result<Vec<u8>> {
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(CANONICAL_HEADER_LEN))?;

    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data)
}

fn read_data_chunk(file: File, format: &AudioFormat) -> Result<Vec<u8>> {
    let file_len = file.metadata()?.len();
    let reader = hound::WavReader::new(BufReader::new(file))
        .map_err(|e| Error::Header(e.to_string()))?;

    let spec = reader.spec();
    if !spec_matches(&spec, format) {
        warn!(
            "[Loader] WAV header is {} ch, {} Hz, {}-bit but output is {}; playback will be distorted",
            spec.channels, spec.sample_rate, spec.bits_per_sample, format
        );
    }

    let bytes_per_sample = (spec.bits_per_sample as u64 + 7) / 8;
    let payload_len = reader.len() as u64 * bytes_per_sample;

    // Streamed WAVs often declare a 0xFFFFFFFF data length
    let mut data = Vec::with_capacity(payload_len.min(file_len) as usize);
    // hound stops right at the start of the data chunk
    reader.into_inner().take(payload_len).read_to_end(&mut data)?;
    Ok(data)
}

fn spec_matches(spec: &hound::WavSpec, format: &AudioFormat) -> bool {
    // 8-bit WAV is unsigned, wider WAV is signed
    let encoding = if spec.bits_per_sample == 8 {
        SampleEncoding::UnsignedInt
    } else {
        SampleEncoding::SignedInt
    };
    spec.channels == format.channel_count
        && spec.sample_rate == format.sample_rate
        && spec.bits_per_sample == format.sample_size
        && spec.sample_format == hound::SampleFormat::Int
        && encoding == format.sample_encoding
}
