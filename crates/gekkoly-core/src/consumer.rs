// ── Consumer side of the gateway protocol ──
//
// A consumer registers an identity (kind + item id or display name) and
// a sink. The gateway keeps one `ConsumerState` per registration and
// feeds it each poll snapshot; the state decides whether anything worth
// delivering happened.

use serde_json::Value;
use tracing::debug;

use crate::codec::{self, DecodeError, ItemValue};
use crate::model::Kind;

/// What a consumer asked to observe.
#[derive(Debug, Clone)]
pub struct ConsumerIdentity {
    pub kind: Kind,
    /// Resolved controller item id. Empty until resolution for
    /// name-addressed consumers; fixed for the global kinds.
    pub item_id: String,
    /// Display name used for tree resolution when `item_id` is empty.
    pub display_name: String,
}

impl ConsumerIdentity {
    /// Build an identity, forcing the fixed pseudo item id for global
    /// kinds regardless of what the caller passed.
    pub fn new(kind: Kind, item_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let item_id = match kind.fixed_item_id() {
            Some(fixed) => fixed.to_owned(),
            None => item_id.into(),
        };
        Self {
            kind,
            item_id,
            display_name: display_name.into(),
        }
    }
}

/// Result of feeding one snapshot to a consumer's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// First successful decode. Stored, but not delivered as a change.
    FirstSnapshot,
    /// Value differs from the stored one; a change event is due.
    Changed,
    /// Identical value, or a decode failure that left state untouched.
    Unchanged,
}

/// Severity of a status line pushed to a consumer sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Error,
    Info,
    Ok,
}

/// A delivered value change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub item_id: String,
    pub display_name: String,
    pub value: ChangePayload,
}

/// Payload of a change event: a decoded item value, or the raw snapshot
/// for universal consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangePayload {
    Item(ItemValue),
    Universal(Value),
}

/// Where the gateway pushes events for one registration.
///
/// Implementations must be cheap and non-blocking; delivery happens on
/// the poll task.
pub trait ConsumerSink: Send + Sync {
    fn deliver_change(&self, event: ChangeEvent);
    fn deliver_status(&self, level: StatusLevel, message: &str);
}

/// Last-known value for one registration.
#[derive(Debug)]
enum CurrentValue {
    Item(ItemValue),
    Universal(Value),
}

/// Per-registration diffing state.
///
/// Starts from the kind's neutral default so status lines can render
/// before the first snapshot; `initialized` flips on the first
/// successful decode, which is stored but never delivered as a change.
#[derive(Debug)]
pub struct ConsumerState {
    identity: ConsumerIdentity,
    initialized: bool,
    current: CurrentValue,
}

impl ConsumerState {
    pub fn new(identity: ConsumerIdentity) -> Self {
        let current = match ItemValue::initial(identity.kind) {
            Some(value) => CurrentValue::Item(value),
            None => CurrentValue::Universal(Value::Object(serde_json::Map::new())),
        };
        Self {
            identity,
            initialized: false,
            current,
        }
    }

    pub fn identity(&self) -> &ConsumerIdentity {
        &self.identity
    }

    /// Feed one snapshot section (or, for universal consumers, the full
    /// payload) into this state.
    ///
    /// Decode failures are traced and swallowed: the previous value and
    /// the `initialized` flag are retained so a later well-formed
    /// snapshot still counts as the first one if none succeeded yet.
    pub fn apply_update(&mut self, section: &Value) -> UpdateOutcome {
        if self.identity.kind == Kind::Universal {
            return self.store(CurrentValue::Universal(section.clone()), |current| {
                matches!(current, CurrentValue::Universal(v) if v == section)
            });
        }

        let decoded = codec::sumstate(section, &self.identity.item_id)
            .and_then(|raw| codec::decode(self.identity.kind, raw));
        match decoded {
            Ok(value) => self.store(CurrentValue::Item(value.clone()), |current| {
                matches!(current, CurrentValue::Item(v) if *v == value)
            }),
            Err(error) => {
                self.trace_decode_failure(&error);
                UpdateOutcome::Unchanged
            }
        }
    }

    fn store(
        &mut self,
        next: CurrentValue,
        is_same: impl Fn(&CurrentValue) -> bool,
    ) -> UpdateOutcome {
        if !self.initialized {
            self.current = next;
            self.initialized = true;
            return UpdateOutcome::FirstSnapshot;
        }
        if is_same(&self.current) {
            return UpdateOutcome::Unchanged;
        }
        self.current = next;
        UpdateOutcome::Changed
    }

    fn trace_decode_failure(&self, error: &DecodeError) {
        debug!(
            kind = %self.identity.kind,
            item_id = %self.identity.item_id,
            %error,
            "snapshot decode failed, keeping previous value"
        );
    }

    /// The change event for the currently stored value.
    pub fn change_event(&self) -> ChangeEvent {
        let value = match &self.current {
            CurrentValue::Item(value) => ChangePayload::Item(value.clone()),
            CurrentValue::Universal(value) => ChangePayload::Universal(value.clone()),
        };
        ChangeEvent {
            item_id: self.identity.item_id.clone(),
            display_name: self.identity.display_name.clone(),
            value,
        }
    }

    /// Render the per-poll "connected" status line for this consumer.
    pub fn connected_status(&self) -> String {
        match &self.current {
            CurrentValue::Universal(_) => "connected".to_owned(),
            CurrentValue::Item(value) => match *value {
                ItemValue::Action { on, locked } => {
                    format!("connected; state: {on}; locked: {locked}")
                }
                ItemValue::Light { on, dim, rgb } => {
                    format!("connected; state: {}; dim: {dim}; rgb: {rgb}", i32::from(on))
                }
                ItemValue::Blind {
                    state_id,
                    position,
                    angle,
                    ..
                } => {
                    format!("connected; position: {position}; stateid: {state_id}; angle: {angle}")
                }
                ItemValue::Load { state } => format!("connected; state: {state}"),
                ItemValue::Alarm { alarm_id, alarm } => {
                    format!("connected; alarmid: {alarm_id}; alarm: {alarm}")
                }
                ItemValue::Profile {
                    profile_id,
                    profile,
                } => {
                    format!("connected; profileid: {profile_id}; profile: {profile}")
                }
            },
        }
    }
}
