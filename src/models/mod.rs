pub mod entry;
pub mod field_spec;
pub mod loaders;
pub mod login_step;
pub mod profile;
pub mod quarter;

pub use entry::{EntryStatus, TimesheetEntry};
pub use field_spec::{FieldRule, FieldSpec, FieldType};
pub use loaders::{load_all_entry_files, load_entry_file, load_profile};
pub use login_step::{LoginAction, LoginStep};
pub use profile::{AutomationProfile, DropdownSettings, SubmissionSettings, TimingSettings};
pub use quarter::QuarterWindow;
