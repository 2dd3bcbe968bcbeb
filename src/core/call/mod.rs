//! Per-call state: the caller's context, the lifecycle record, and the
//! session that coordinates analysis loops with the media stream.

mod context;
mod error;
mod record;
mod session;
mod status;
mod tasks;

pub use context::{CallContext, CallPurpose, IdentifierKind};
pub use error::CallError;
pub use record::{CallRecord, CallSnapshot};
pub use session::{CallServices, CallSession, DetectionSource};
pub use status::CallStatus;
