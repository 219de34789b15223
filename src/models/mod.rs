mod record;

pub use record::{EndReason, SessionRecord};
