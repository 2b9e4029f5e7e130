//! Configuration: the TOML settings file and its path handling.

mod path;
mod settings;

pub use path::{APP_DIR, SETTINGS_FILE, default_settings_path, home_dir, resolve_path};
pub use settings::{
    DeviceSettings, LoadedSettings, Overrides, RenderSettings, Settings, SourceKind,
    SourceSettings, load_settings, load_settings_from_str, locate_settings, save_settings,
};
