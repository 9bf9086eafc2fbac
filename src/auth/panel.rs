//! Interactive password-change flow.
//!
//! Modeled as an explicit state machine with pure transitions so that
//! "abort at any step leaves no partial change" holds structurally: the only
//! state that performs a network call is `Submitting`, and nothing reaches it
//! without a confirmed, matching password. Prompting and submission are
//! behind traits so the machine is testable without a terminal or a server.

use futures_util::future::BoxFuture;

use crate::auth::srp::{derive_verifier, SrpParameters, VerifierRecord};
use crate::auth::AuthError;

/// Reply to a single password prompt. An empty input counts as cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptReply {
    Input(String),
    Cancelled,
}

/// Why the flow ended without submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    Mismatch,
}

/// States of the password-change flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    AwaitingNewPassword,
    AwaitingConfirmation { pending: String },
    Submitting { password: String },
    Done,
    Aborted(AbortReason),
}

impl PanelState {
    pub fn start() -> Self {
        PanelState::AwaitingNewPassword
    }

    /// Pure transition on a prompt reply. Terminal states absorb all input.
    pub fn advance(self, reply: PromptReply) -> PanelState {
        match (self, reply) {
            (PanelState::AwaitingNewPassword, PromptReply::Input(p)) if !p.is_empty() => {
                PanelState::AwaitingConfirmation { pending: p }
            }
            (PanelState::AwaitingNewPassword, _) => PanelState::Aborted(AbortReason::Cancelled),

            (PanelState::AwaitingConfirmation { pending }, PromptReply::Input(c)) if !c.is_empty() => {
                if c == pending {
                    PanelState::Submitting { password: pending }
                } else {
                    PanelState::Aborted(AbortReason::Mismatch)
                }
            }
            (PanelState::AwaitingConfirmation { .. }, _) => {
                PanelState::Aborted(AbortReason::Cancelled)
            }

            (terminal, _) => terminal,
        }
    }
}

/// Source of password input (a terminal, a dialog, a test stub).
pub trait PasswordPrompt {
    fn prompt(&mut self, message: &str) -> PromptReply;
}

/// Destination of the derived record (the HTTP API, a test stub).
pub trait VerifierSubmitter {
    fn submit<'a>(
        &'a mut self,
        username: &'a str,
        record: &'a VerifierRecord,
    ) -> BoxFuture<'a, Result<(), AuthError>>;
}

/// Run the whole flow: prompt, confirm, derive, submit.
///
/// Returns `Ok(())` only after the server accepted the record. Cancellation
/// and mismatch surface as [`AuthError::Cancelled`] / [`AuthError::Mismatch`]
/// and are guaranteed to have made no network call.
pub async fn change_password(
    params: &SrpParameters,
    username: &str,
    prompt: &mut dyn PasswordPrompt,
    submitter: &mut dyn VerifierSubmitter,
) -> Result<(), AuthError> {
    let mut state = PanelState::start();

    loop {
        state = match state {
            PanelState::AwaitingNewPassword => {
                let reply = prompt.prompt("Enter new password");
                PanelState::AwaitingNewPassword.advance(reply)
            }
            PanelState::AwaitingConfirmation { pending } => {
                let reply = prompt.prompt("Re-enter same new password");
                PanelState::AwaitingConfirmation { pending }.advance(reply)
            }
            PanelState::Submitting { password } => {
                let record = derive_verifier(params, username, &password);
                submitter.submit(username, &record).await?;
                PanelState::Done
            }
            PanelState::Done => return Ok(()),
            PanelState::Aborted(AbortReason::Cancelled) => return Err(AuthError::Cancelled),
            PanelState::Aborted(AbortReason::Mismatch) => return Err(AuthError::Mismatch),
        };
    }
}
