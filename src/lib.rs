// wavplayer - blocking WAV/PCM player
// Module declarations
pub mod audio;
pub mod error;
pub mod settings;

pub use audio::player::Player;
pub use audio::{AudioFormat, DeviceState, HeaderMode, OutputDevice};
pub use error::{Error, Result};
pub use settings::PlayerSettings;
