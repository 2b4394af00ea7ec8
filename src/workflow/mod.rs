pub mod entry_ctx;
pub mod entry_flow;
pub mod retry_ladder;

pub use entry_ctx::EntryCtx;
pub use entry_flow::{form_values, validate_values, EntryFlow, ProcessResult};
pub use retry_ladder::{LadderAction, LadderEvent, LadderState, TRANSITIONS};
