//! Identifier types carried by inspection events.
//!
//! Both [`TransitionId`] and [`DataStructureId`] arrive on the wire as
//! single-key tagged objects. Decoding is explicit (`from_wire`) so the
//! tie-break order between keys is fixed in one place rather than left to
//! whatever a generic deserializer happens to do.

use core::fmt;
use core::str::FromStr;

use serde::de::Error as _;
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use ts_rs::TS;

/// Index of an orthogonal region within one FSM.
pub type RegionId = u32;

/// Wire keys of a [`TransitionId`], in the order they are checked.
pub const TRANSITION_ID_KEYS: [&str; 3] = ["Table", "Start", "Stop"];

/// Prefix of the string form of [`DataStructureId::State`].
const STATE_KEY_PREFIX: &str = "state_";

/// String form of [`DataStructureId::Context`].
const CONTEXT_KEY: &str = "context";

/// Errors raised while decoding identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// None of `Table`, `Start`, `Stop` was present.
    #[error("transition id has none of Table, Start, Stop: {0}")]
    UnknownTransition(String),

    /// The `Table` key was present but its value is not a valid index.
    #[error("transition table index is not an unsigned 32-bit integer: {0}")]
    InvalidTableIndex(String),

    /// The value is neither `"Context"` nor `{"State": name}`.
    #[error("data structure id is neither \"Context\" nor {{\"State\": name}}: {0}")]
    UnknownStructure(String),

    /// The string form does not match `context` or `state_<name>`.
    #[error("unrecognized data structure key: {0}")]
    UnknownStructureKey(String),
}

/// Identifies the transition that caused an event.
///
/// `TableEntry` points into the FSM's static transition table; `Start` and
/// `Stop` are the implicit pseudo-transitions that bring an FSM into and
/// out of existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransitionId {
    /// A numbered row of the transition table.
    TableEntry(u32),
    /// The implicit start transition.
    Start,
    /// The implicit stop transition.
    Stop,
}

impl TransitionId {
    /// Decode a transition id from its wire value.
    ///
    /// Accepts `{"Table": n}`, `{"Start": null}` and `{"Stop": null}`,
    /// checking the keys in [`TRANSITION_ID_KEYS`] order so the first
    /// present key wins. The bare strings `"Start"` and `"Stop"` are also
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::UnknownTransition`] if no key matches, or
    /// [`IdError::InvalidTableIndex`] if the table index is not a `u32`.
    pub fn from_wire(value: &Value) -> Result<Self, IdError> {
        match value {
            Value::Object(map) => {
                if let Some(index) = map.get("Table") {
                    let index = index
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| IdError::InvalidTableIndex(index.to_string()))?;
                    return Ok(Self::TableEntry(index));
                }
                if map.contains_key("Start") {
                    return Ok(Self::Start);
                }
                if map.contains_key("Stop") {
                    return Ok(Self::Stop);
                }
                Err(IdError::UnknownTransition(value.to_string()))
            }
            Value::String(tag) if tag == "Start" => Ok(Self::Start),
            Value::String(tag) if tag == "Stop" => Ok(Self::Stop),
            _ => Err(IdError::UnknownTransition(value.to_string())),
        }
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableEntry(index) => write!(f, "Table({index})"),
            Self::Start => f.write_str("Start"),
            Self::Stop => f.write_str("Stop"),
        }
    }
}

impl Serialize for TransitionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::TableEntry(index) => map.serialize_entry("Table", index)?,
            Self::Start => map.serialize_entry("Start", &())?,
            Self::Stop => map.serialize_entry("Stop", &())?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TransitionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_wire(&value).map_err(D::Error::custom)
    }
}

/// Identifies a tracked data structure of one FSM instance.
///
/// Serializes to the wire shape directly: `"Context"` or
/// `{"State": name}`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum DataStructureId {
    /// The single per-instance context.
    Context,
    /// Data owned by the named state.
    State(String),
}

impl DataStructureId {
    /// Decode a data structure id from its wire value.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::UnknownStructure`] for anything other than
    /// `"Context"` or an object carrying a string `State` key.
    pub fn from_wire(value: &Value) -> Result<Self, IdError> {
        match value {
            Value::String(tag) if tag == "Context" => Ok(Self::Context),
            Value::Object(map) => match map.get("State") {
                Some(Value::String(name)) => Ok(Self::State(name.clone())),
                _ => Err(IdError::UnknownStructure(value.to_string())),
            },
            _ => Err(IdError::UnknownStructure(value.to_string())),
        }
    }
}

/// Canonical key form: `context` or `state_<name>`.
///
/// No two distinct ids share a key; [`FromStr`] inverts it.
impl fmt::Display for DataStructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context => f.write_str(CONTEXT_KEY),
            Self::State(name) => write!(f, "{STATE_KEY_PREFIX}{name}"),
        }
    }
}

impl FromStr for DataStructureId {
    type Err = IdError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        if key == CONTEXT_KEY {
            return Ok(Self::Context);
        }
        key.strip_prefix(STATE_KEY_PREFIX)
            .map(|name| Self::State(name.to_owned()))
            .ok_or_else(|| IdError::UnknownStructureKey(key.to_owned()))
    }
}
