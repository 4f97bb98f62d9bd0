//! Request-independent service logic behind the HTTP handlers.

mod assign;
mod conversation;
mod relay;
mod report;
mod voice;

pub use assign::{AssignOutcome, AssignService};
pub use conversation::{
    ClientUsage, ConversationMetadata, ConversationOutcome, ConversationRequest,
    ConversationService,
};
pub use relay::{RelayOutcome, RelayService, UsageEstimate, estimate_usage};
pub use report::ReportService;
pub use voice::{SignedUrl, VoiceService};
