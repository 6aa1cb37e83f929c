pub mod scheduler;
pub mod sink;

use std::sync::Arc;

use tracing::info;

use crate::extract::{self, Rejection};
use crate::platform::IncomingMessage;

pub use scheduler::{Admission, Scheduler};
pub use sink::{Outbound, RelaySink};

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped(Rejection),
    Admitted(Admission),
}

/// Extract, format and admit a single inbound message.
pub async fn process(scheduler: &Arc<Scheduler>, incoming: &IncomingMessage) -> Outcome {
    let text = match extract::format_message(&incoming.text) {
        Ok(text) => text,
        Err(Rejection::ContainsLink) => {
            info!("Skipped message from {}: contains hyperlink", incoming.source);
            return Outcome::Skipped(Rejection::ContainsLink);
        }
        Err(rejection) => {
            info!(
                "Skipped message from {}: format does not match ({})",
                incoming.source, rejection
            );
            return Outcome::Skipped(rejection);
        }
    };

    Outcome::Admitted(scheduler.admit(text).await)
}
