mod atomic_write;
mod save_error;
mod save_file;
mod save_plugin;

pub use atomic_write::atomic_write;
pub use save_error::SaveError;
pub use save_file::{load_city, save_city, RoadSave, SaveFile, ZoneStripSave, SAVE_VERSION};
pub use save_plugin::{LoadGameEvent, SaveGameEvent, SavePlugin};
