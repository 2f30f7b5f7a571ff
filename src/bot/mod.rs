//! Recording bot lifecycle
//!
//! An external recording agent joins the meeting and reports status through
//! signed webhooks. The state machine here is deliberately thin: statuses
//! are stored verbatim and last-write-wins; the terminal `done` status
//! triggers video retrieval and hands the recording to the pipeline.

mod manager;
mod provider;
mod record;
mod signature;

pub use manager::{bot_meeting_meta, BotManager, RequestBot, StatusChange, StatusOutcome};
pub use provider::{BotDetails, BotProvider, CreateBotRequest, CreatedBot, RecallClient};
pub use record::{BotRecord, BotStore, STATUS_DONE, STATUS_PENDING};
pub use signature::{sign_payload, verify_signature, SignatureError};
