// Audio playback module
// Raw PCM loading and cpal output

pub mod buffer;
pub mod device;
pub mod format;
pub mod loader;
pub mod memory;
pub mod output;
pub mod player;
pub mod state;
pub mod stream;
pub mod track;

pub use buffer::SampleBuffer;
pub use device::{DeviceCore, OutputDevice};
pub use format::{AudioFormat, ByteOrder, SampleEncoding};
pub use loader::HeaderMode;
pub use memory::MemoryOutput;
pub use output::CpalOutput;
pub use player::Player;
pub use state::{DeviceState, StateSignal};
pub use stream::{PlaybackStream, SharedStream};
pub use track::TrackState;
