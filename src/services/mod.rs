pub mod backoff;
pub mod field_filler;
pub mod login;
pub mod quarter_router;
pub mod submission_monitor;

pub use backoff::{BackoffPolicy, BackoffWaiter};
pub use field_filler::{classify, AriaSnapshot, FieldFiller, FillOutcome, WidgetKind};
pub use login::{Credentials, LoginFlow};
pub use quarter_router::QuarterRouter;
pub use submission_monitor::{SubmissionMonitor, SubmissionOutcome, VerificationMethod};
