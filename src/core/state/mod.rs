pub mod launcher;
pub mod settings;

pub use launcher::{Launcher, PreparedVersion};
pub use settings::{default_data_dir, LauncherSettings, DATA_DIR_ENV, SETTINGS_FILE};
