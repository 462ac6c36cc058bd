// Settings module
// JSON settings file with the output format and loader options

mod settings;

pub use settings::{LoaderSettings, OutputSettings, PlayerSettings};
