// ── Sumstate codec ──
//
// Pure decode/encode for the controller's packed status strings and
// scmd command values. One enum-dispatched module instead of a copy per
// kind; no state, no I/O.
//
// A sumstate is a semicolon-delimited field string, e.g. "1;0" for an
// action (on=1, lock bit inverted) or "1;50;0" for a light (on, dim,
// rgb). Missing trailing fields default to 0 where the controller is
// known to omit them.

use serde_json::Value;
use thiserror::Error;

use crate::model::Kind;

// ── Errors ──────────────────────────────────────────────────────────

/// A per-item decode failure. Callers treat this as "no update": the
/// previous value is retained and no event is emitted.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("item '{item_id}' not present in snapshot section")]
    ItemMissing { item_id: String },

    #[error("item '{item_id}' has no sumstate value")]
    SumstateMissing { item_id: String },

    #[error("missing field {index} in sumstate '{raw}'")]
    MissingField { index: usize, raw: String },

    #[error("invalid number in field {index} of sumstate '{raw}'")]
    InvalidNumber { index: usize, raw: String },

    #[error("kind '{0}' carries no sumstate")]
    UnsupportedKind(Kind),
}

/// A command value rejected before any request is issued.
#[derive(Debug, Error)]
#[error("invalid command value: {reason}")]
pub struct InvalidCommand {
    reason: String,
}

impl InvalidCommand {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// ── Decoded values ──────────────────────────────────────────────────

/// One item's decoded status, by kind.
///
/// Label fields (`state`, `alarm`, `profile`) are derived from the raw
/// ids and carried alongside them, matching what consumers receive in
/// change events.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    Action {
        on: bool,
        locked: bool,
    },
    Blind {
        state_id: i64,
        state: &'static str,
        position: f64,
        angle: f64,
    },
    Light {
        on: bool,
        dim: i64,
        rgb: i64,
    },
    Load {
        state: i64,
    },
    Alarm {
        alarm_id: i64,
        alarm: &'static str,
    },
    Profile {
        profile_id: i64,
        profile: &'static str,
    },
}

impl ItemValue {
    /// The value a consumer starts from before its first snapshot.
    ///
    /// `None` for the universal kind, which stores raw JSON instead.
    pub fn initial(kind: Kind) -> Option<Self> {
        match kind {
            Kind::Action => Some(Self::Action {
                on: false,
                locked: false,
            }),
            Kind::Blind => Some(Self::Blind {
                state_id: 0,
                state: blind_state_label(0),
                position: 0.0,
                angle: 0.0,
            }),
            Kind::Light => Some(Self::Light {
                on: false,
                dim: 0,
                rgb: 0,
            }),
            Kind::Load => Some(Self::Load { state: 0 }),
            Kind::Alarm => Some(Self::Alarm {
                alarm_id: 0,
                alarm: alarm_label(0),
            }),
            Kind::Profile => Some(Self::Profile {
                profile_id: 0,
                profile: profile_label(0),
            }),
            Kind::Universal => None,
        }
    }
}

// ── Label tables ────────────────────────────────────────────────────

/// Human-readable blind motion state.
pub fn blind_state_label(state_id: i64) -> &'static str {
    match state_id {
        -2 => "hold_down",
        -1 => "down",
        0 => "stop",
        1 => "up",
        2 => "hold_up",
        _ => "UNKNOWN",
    }
}

/// Human-readable global alarm state.
pub fn alarm_label(alarm_id: i64) -> &'static str {
    match alarm_id {
        0 => "OK",
        2 => "ACKNOWLEDGED",
        3 => "ALARM",
        _ => "UNKNOWN",
    }
}

/// Human-readable house profile.
pub fn profile_label(profile_id: i64) -> &'static str {
    match profile_id {
        0 => "Away",
        1 => "At Home",
        _ => "UNKNOWN",
    }
}

// ── Snapshot access ─────────────────────────────────────────────────

/// Extract `section[item_id].sumstate.value` as a string slice.
pub fn sumstate<'a>(section: &'a Value, item_id: &str) -> Result<&'a str, DecodeError> {
    let item = section.get(item_id).ok_or_else(|| DecodeError::ItemMissing {
        item_id: item_id.to_owned(),
    })?;
    item.get("sumstate")
        .and_then(|s| s.get("value"))
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::SumstateMissing {
            item_id: item_id.to_owned(),
        })
}

// ── Decoding ────────────────────────────────────────────────────────

/// Decode one item's sumstate string for the given kind.
pub fn decode(kind: Kind, raw: &str) -> Result<ItemValue, DecodeError> {
    let fields: Vec<&str> = raw.split(';').collect();
    match kind {
        Kind::Action => Ok(ItemValue::Action {
            on: req_int(&fields, 0, raw)? == 1,
            // The controller reports the lock bit inverted: 1 = unlocked.
            locked: req_int(&fields, 1, raw)? != 1,
        }),
        Kind::Blind => {
            let state_id = req_int(&fields, 0, raw)?;
            Ok(ItemValue::Blind {
                state_id,
                state: blind_state_label(state_id),
                position: req_float(&fields, 1, raw)?,
                angle: opt_float(&fields, 2, raw)?,
            })
        }
        Kind::Light => Ok(ItemValue::Light {
            on: req_int(&fields, 0, raw)? == 1,
            dim: opt_int(&fields, 1, raw)?,
            rgb: opt_int(&fields, 2, raw)?,
        }),
        Kind::Load => Ok(ItemValue::Load {
            state: req_int(&fields, 0, raw)?,
        }),
        // Global values are a single integer; any trailing
        // semicolon-delimited garbage is ignored.
        Kind::Alarm => {
            let alarm_id = req_int(&fields, 0, raw)?;
            Ok(ItemValue::Alarm {
                alarm_id,
                alarm: alarm_label(alarm_id),
            })
        }
        Kind::Profile => {
            let profile_id = req_int(&fields, 0, raw)?;
            Ok(ItemValue::Profile {
                profile_id,
                profile: profile_label(profile_id),
            })
        }
        Kind::Universal => Err(DecodeError::UnsupportedKind(kind)),
    }
}

/// Required integer field: must be present, non-empty, and parse.
fn req_int(fields: &[&str], index: usize, raw: &str) -> Result<i64, DecodeError> {
    let field = fields.get(index).map(|f| f.trim()).filter(|f| !f.is_empty());
    let Some(field) = field else {
        return Err(DecodeError::MissingField {
            index,
            raw: raw.to_owned(),
        });
    };
    field.parse().map_err(|_| DecodeError::InvalidNumber {
        index,
        raw: raw.to_owned(),
    })
}

/// Optional integer field: missing or empty defaults to 0.
fn opt_int(fields: &[&str], index: usize, raw: &str) -> Result<i64, DecodeError> {
    match fields.get(index).map(|f| f.trim()) {
        None | Some("") => Ok(0),
        Some(field) => field.parse().map_err(|_| DecodeError::InvalidNumber {
            index,
            raw: raw.to_owned(),
        }),
    }
}

/// Required float field.
fn req_float(fields: &[&str], index: usize, raw: &str) -> Result<f64, DecodeError> {
    let field = fields.get(index).map(|f| f.trim()).filter(|f| !f.is_empty());
    let Some(field) = field else {
        return Err(DecodeError::MissingField {
            index,
            raw: raw.to_owned(),
        });
    };
    field.parse().map_err(|_| DecodeError::InvalidNumber {
        index,
        raw: raw.to_owned(),
    })
}

/// Optional float field: missing or empty defaults to 0.
fn opt_float(fields: &[&str], index: usize, raw: &str) -> Result<f64, DecodeError> {
    match fields.get(index).map(|f| f.trim()) {
        None | Some("") => Ok(0.0),
        Some(field) => field.parse().map_err(|_| DecodeError::InvalidNumber {
            index,
            raw: raw.to_owned(),
        }),
    }
}

// ── Command encoding ────────────────────────────────────────────────

/// A write command for one item, validated and encoded into the scmd
/// `value=` query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandValue {
    /// Action on/off: `"1"` / `"-1"`.
    ActionSwitch(bool),
    /// Light on/off: `"1"` / `"0"`.
    LightSwitch(bool),
    /// Light dim level, 0..=100: `"D<v>"`.
    LightDim(i64),
    /// Light color, 0..=16_777_216: `"C<v>"`.
    LightRgb(i64),
    /// Blind target position, 0..=100: `"P<v>"`.
    BlindPosition(f64),
    /// Blind slat angle, 0..=100: `"S<v>"`.
    BlindAngle(f64),
    /// Raw blind motion state, -2..=2: `"<v>"`.
    BlindState(i64),
    /// Load switch state, 0..=2: `"<v>"`.
    LoadState(i64),
    /// House profile, 0 or 1: `"P<v>"`.
    ProfileSet(i64),
}

impl CommandValue {
    /// The kind whose scmd endpoint this command targets.
    pub fn kind(&self) -> Kind {
        match self {
            Self::ActionSwitch(_) => Kind::Action,
            Self::LightSwitch(_) | Self::LightDim(_) | Self::LightRgb(_) => Kind::Light,
            Self::BlindPosition(_) | Self::BlindAngle(_) | Self::BlindState(_) => Kind::Blind,
            Self::LoadState(_) => Kind::Load,
            Self::ProfileSet(_) => Kind::Profile,
        }
    }

    /// Path segment of the scmd endpoint this command targets.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::ActionSwitch(_) => "actions",
            Self::LightSwitch(_) | Self::LightDim(_) | Self::LightRgb(_) => "lights",
            Self::BlindPosition(_) | Self::BlindAngle(_) | Self::BlindState(_) => "blinds",
            Self::LoadState(_) => "loads",
            Self::ProfileSet(_) => "globals",
        }
    }

    /// Validate the value range and render the scmd query value.
    pub fn encode(&self) -> Result<String, InvalidCommand> {
        match *self {
            Self::ActionSwitch(on) => Ok(if on { "1" } else { "-1" }.to_owned()),
            Self::LightSwitch(on) => Ok(if on { "1" } else { "0" }.to_owned()),
            Self::LightDim(v) => {
                check_range(v, 0, 100, "dim")?;
                Ok(format!("D{v}"))
            }
            Self::LightRgb(v) => {
                check_range(v, 0, 16_777_216, "rgb")?;
                Ok(format!("C{v}"))
            }
            Self::BlindPosition(v) => {
                check_range_f(v, 0.0, 100.0, "position")?;
                Ok(format!("P{v}"))
            }
            Self::BlindAngle(v) => {
                check_range_f(v, 0.0, 100.0, "angle")?;
                Ok(format!("S{v}"))
            }
            Self::BlindState(v) => {
                check_range(v, -2, 2, "state id")?;
                Ok(v.to_string())
            }
            Self::LoadState(v) => {
                check_range(v, 0, 2, "load state")?;
                Ok(v.to_string())
            }
            Self::ProfileSet(v) => {
                check_range(v, 0, 1, "profile id")?;
                Ok(format!("P{v}"))
            }
        }
    }
}

fn check_range(v: i64, min: i64, max: i64, what: &str) -> Result<(), InvalidCommand> {
    if v < min || v > max {
        return Err(InvalidCommand {
            reason: format!("{what} {v} outside {min}..={max}"),
        });
    }
    Ok(())
}

fn check_range_f(v: f64, min: f64, max: f64, what: &str) -> Result<(), InvalidCommand> {
    if !v.is_finite() || v < min || v > max {
        return Err(InvalidCommand {
            reason: format!("{what} {v} outside {min}..={max}"),
        });
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
