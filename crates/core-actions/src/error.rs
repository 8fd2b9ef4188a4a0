use thiserror::Error;

/// Errors surfaced by `Action::setup` and `Action::handle`. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A command table entry names a command the session does not provide.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
}
