/// Recovery path after a failed submission: hand the payload to the user
/// instead of retrying the network call.
use crate::persistence::SubmitVote;

/// System clipboard, provided by the UI layer.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// Payload is on the clipboard.
    Copied { payload: String },
    /// Clipboard unavailable; the user has to save the payload by hand.
    ManualSave { payload: String, instructions: String },
}

impl FallbackOutcome {
    pub fn payload(&self) -> &str {
        match self {
            FallbackOutcome::Copied { payload } | FallbackOutcome::ManualSave { payload, .. } => {
                payload
            }
        }
    }
}

pub fn fallback_after_failed_submit(
    vote: &SubmitVote,
    clipboard: &mut dyn Clipboard,
) -> FallbackOutcome {
    let payload = serde_json::to_string_pretty(vote).unwrap_or_else(|e| {
        log::error!(target: "ideavote.fallback", "Failed to serialize payload: {}", e);
        format!("{:?}", vote)
    });

    match clipboard.write_text(&payload) {
        Ok(()) => {
            log::info!(target: "ideavote.fallback", "Copied failed submission to clipboard");
            FallbackOutcome::Copied { payload }
        }
        Err(e) => {
            log::warn!(target: "ideavote.fallback", "Clipboard copy failed: {}", e);
            FallbackOutcome::ManualSave {
                payload,
                instructions: "Saving failed and the clipboard is unavailable. \
                               Copy the text below and send it to the organizer."
                    .to_string(),
            }
        }
    }
}
