// gekkoly-core: Gateway/consumer coordination layer between gekkoly-api
// and kind-specific consumers.

pub mod codec;
pub mod config;
pub mod consumer;
pub mod error;
pub mod gateway;
pub mod model;
pub mod registry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use codec::{CommandValue, DecodeError, InvalidCommand, ItemValue};
pub use config::GatewayConfig;
pub use consumer::{
    ChangeEvent, ChangePayload, ConsumerIdentity, ConsumerSink, ConsumerState, StatusLevel,
    UpdateOutcome,
};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayState};
pub use model::{DiscoveryTree, Kind};
pub use registry::Handle;
