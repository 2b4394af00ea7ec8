pub mod toml_loader;

pub use toml_loader::{load_all_entry_files, load_entry_file, load_profile, EntryFile};
