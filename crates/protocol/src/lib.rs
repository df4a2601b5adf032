//! # ctx protocol
//!
//! Wire types and the client state machine for staged context
//! synchronization.
//!
//! ## Architecture
//!
//! ```text
//! CodebaseContext
//!     │
//!     ├──> LOAD    context only            → LoadAck
//!     │
//!     ├──> SELECT  context + task          → FileChangePlan
//!     │            └─> read listed files into fileContents
//!     │
//!     └──> WORK    context + task + file   → PatchData   (once per planned file)
//! ```
//!
//! Every reply is checked against the response schema of its stage
//! ([`schema_for`]) before anything in it is trusted.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ctx_protocol::{
//!     channel_pair, CodebaseContext, DirectoryFiles, Session, SessionConfig, SnapshotNode,
//! };
//!
//! # async fn demo() -> Result<(), ctx_protocol::SessionError> {
//! let (transport, _server_end) = channel_pair();
//! let context = CodebaseContext::new("/repo", SnapshotNode::directory());
//! let mut session = Session::new(
//!     SessionConfig::new("laptop-1"),
//!     transport,
//!     context,
//!     DirectoryFiles::new("/repo"),
//! );
//! let report = session.run("add request logging").await?;
//! for patch in report.patches() {
//!     println!("{}\n{}", patch.path, patch.patch);
//! }
//! # Ok(())
//! # }
//! ```

mod close;
mod envelope;
mod error;
mod files;
mod instructions;
mod payloads;
mod schema;
mod session;
mod snapshot;
mod stage;
mod transport;
mod validate;
mod work_prompt;

pub use close::CloseReason;
pub use envelope::{status, SessionRequest, SessionResponse};
pub use error::{ProtocolError, Result, SchemaViolation, SessionError, TransportError};
pub use files::{DirectoryFiles, FileSource};
pub use instructions::{instructions_for, prompt_parts};
pub use payloads::{FileChange, FileChangePlan, FileOperation, LoadAck, PatchData};
pub use schema::{schema_for, schema_text};
pub use session::{
    Session, SessionConfig, SessionReport, StageFailure, StageOutcome, WorkFailurePolicy,
    WorkResult,
};
pub use snapshot::{CodebaseContext, SnapshotNode};
pub use stage::{SessionState, Stage};
pub use transport::{channel_pair, ChannelTransport, Inbound, Transport};
pub use validate::{validate_load, validate_select, validate_work, StagePayload};
pub use work_prompt::{file_work_prompt, number_lines, work_prompt_path};
