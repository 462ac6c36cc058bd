// PCM output format
// Fixed for the lifetime of an output device, never renegotiated

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const PCM_CODEC: &str = "audio/pcm";

pub const DEFAULT_SAMPLE_SIZE: u16 = 16;
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNEL_COUNT: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    UnsignedInt,
    SignedInt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_size: u16,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub byte_order: ByteOrder,
    pub sample_encoding: SampleEncoding,
    pub codec: String,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: DEFAULT_CHANNEL_COUNT,
            byte_order: ByteOrder::LittleEndian,
            sample_encoding: SampleEncoding::UnsignedInt,
            codec: PCM_CODEC.to_string(),
        }
    }
}

impl AudioFormat {
    /// Check the format is something the sample decoder can carry
    pub fn validate(&self) -> Result<()> {
        if self.codec != PCM_CODEC {
            return Err(Error::UnsupportedFormat(format!("codec {}", self.codec)));
        }
        if self.sample_size != 8 && self.sample_size != 16 {
            return Err(Error::UnsupportedFormat(format!(
                "{}-bit samples",
                self.sample_size
            )));
        }
        if self.sample_rate == 0 || self.channel_count == 0 {
            return Err(Error::UnsupportedFormat(format!(
                "{} Hz, {} channels",
                self.sample_rate, self.channel_count
            )));
        }
        Ok(())
    }

    /// Width of one sample of one channel in bytes
    pub fn bytes_per_sample(&self) -> usize {
        (self.sample_size / 8) as usize
    }

    /// Decode one raw sample into the -1.0..1.0 range.
    /// `bytes` must hold exactly `bytes_per_sample()` bytes.
    pub fn decode_sample(&self, bytes: &[u8]) -> f32 {
        match self.sample_size {
            8 => match self.sample_encoding {
                SampleEncoding::UnsignedInt => (bytes[0] as f32 - 128.0) / 128.0,
                SampleEncoding::SignedInt => (bytes[0] as i8) as f32 / 128.0,
            },
            _ => {
                let raw = match self.byte_order {
                    ByteOrder::LittleEndian => u16::from_le_bytes([bytes[0], bytes[1]]),
                    ByteOrder::BigEndian => u16::from_be_bytes([bytes[0], bytes[1]]),
                };
                match self.sample_encoding {
                    SampleEncoding::UnsignedInt => (raw as f32 - 32768.0) / 32768.0,
                    SampleEncoding::SignedInt => (raw as i16) as f32 / 32768.0,
                }
            }
        }
    }

    /// Preferred cpal sample type for an exact match
    pub fn cpal_sample_format(&self) -> cpal::SampleFormat {
        match (self.sample_size, self.sample_encoding) {
            (8, SampleEncoding::UnsignedInt) => cpal::SampleFormat::U8,
            (8, SampleEncoding::SignedInt) => cpal::SampleFormat::I8,
            (_, SampleEncoding::UnsignedInt) => cpal::SampleFormat::U16,
            (_, SampleEncoding::SignedInt) => cpal::SampleFormat::I16,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-bit {:?} {:?}, {} Hz, {} ch",
            self.codec,
            self.sample_size,
            self.sample_encoding,
            self.byte_order,
            self.sample_rate,
            self.channel_count
        )
    }
}
