//! Schema-shaped meeting summarization
//!
//! The summarizer sends the assembled transcript plus the resolved prompt
//! schema to a chat model and parses the response into a `MeetingSummary`
//! whose field set is exactly the resolved category list.

mod model;
mod summarizer;
mod summary;

pub use model::{ChatModel, ChatOutcome, ChatRequest, OpenAiChatModel};
pub use summarizer::{SummarizeError, Summarizer};
pub use summary::{MeetingSummary, SummaryValue};
