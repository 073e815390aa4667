use thiserror::Error;

use crate::codec::InvalidCommand;
use crate::model::Kind;

/// Errors surfaced by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A display name did not resolve against the discovery tree.
    #[error("no {kind} named '{name}' in the controller's discovery tree")]
    ItemNotFound { kind: Kind, name: String },

    /// Registration attempted before discovery completed.
    #[error("gateway is not ready; discovery has not completed")]
    NotReady,

    #[error(transparent)]
    InvalidCommand(#[from] InvalidCommand),

    #[error(transparent)]
    Api(#[from] gekkoly_api::ApiError),
}
