//! Wire decoder: untyped message → typed [`Event`] plus structure snapshots.
//!
//! Decoding is pure. It never touches the log or the indices; the caller
//! decides what to do with a [`DecodedMessage`] or a [`DecodeError`].
//!
//! The event section is a single-key tagged union. The tag is selected by
//! which [`WireEventTag`] key is present, and the body is then decoded into
//! that variant's wire struct. `modified_structures` is decoded the same
//! way for every variant; a bad entry is dropped on its own and reported
//! in [`DecodedMessage::malformed_structures`] without failing the message.

use fsm_inspect_types::{
    DataStructureId, Event, EventKind, ModifiedStructure, WireAction, WireEvent, WireEventTag,
    WireProcessingEvent, WireStateEvent, WireTransition,
};
use serde::Deserialize;
use serde_json::Value;

/// Errors that cause a whole message to be discarded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("message is not valid JSON: {source}")]
    InvalidJson {
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// A top-level section is missing.
    #[error("message has no `{section}` section")]
    MissingSection {
        /// Name of the missing section.
        section: &'static str,
    },

    /// The `common` section does not carry a valid `id` and `fsm`.
    #[error("malformed common section: {source}")]
    MalformedCommon {
        /// The underlying decode error.
        source: serde_json::Error,
    },

    /// `common.modified_structures` is present but not a list.
    #[error("modified_structures is not a list")]
    MalformedStructureList,

    /// None of the known event tags is present.
    #[error("unknown event tag, keys present: {keys:?}")]
    UnknownEventTag {
        /// The keys the event section did carry.
        keys: Vec<String>,
    },

    /// More than one known event tag is present.
    #[error("ambiguous event, tags present: {tags:?}")]
    AmbiguousEventTag {
        /// The known tags that were found.
        tags: Vec<WireEventTag>,
    },

    /// The body of the selected variant does not decode, including an
    /// unrecognized `transition_id`.
    #[error("malformed {tag} event: {source}")]
    MalformedEvent {
        /// The selected variant.
        tag: WireEventTag,
        /// The underlying decode error.
        source: serde_json::Error,
    },
}

/// A `modified_structures` entry that was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("modified structure #{index} dropped: {reason}")]
pub struct MalformedStructure {
    /// Position of the entry in the list.
    pub index: usize,
    /// Why it was dropped.
    pub reason: String,
}

/// The result of decoding one wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// The typed event.
    pub event: Event,
    /// Structure snapshots carried by the message, in wire order.
    pub modified_structures: Vec<ModifiedStructure>,
    /// Entries of `modified_structures` that could not be decoded.
    pub malformed_structures: Vec<MalformedStructure>,
}

#[derive(Deserialize)]
struct CommonHeader {
    id: u64,
    fsm: String,
}

/// Decode a text frame.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidJson`] if the frame does not parse, or any
/// error of [`decode`].
pub fn decode_text(text: &str) -> Result<DecodedMessage, DecodeError> {
    let message: Value =
        serde_json::from_str(text).map_err(|source| DecodeError::InvalidJson { source })?;
    decode(&message)
}

/// Decode a message already parsed into a JSON value.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the `common` header is unusable or the
/// event section does not select exactly one well-formed variant.
pub fn decode(message: &Value) -> Result<DecodedMessage, DecodeError> {
    let common = message
        .get("common")
        .ok_or(DecodeError::MissingSection { section: "common" })?;
    let header = CommonHeader::deserialize(common)
        .map_err(|source| DecodeError::MalformedCommon { source })?;

    let (modified_structures, malformed_structures) =
        decode_structures(common.get("modified_structures"))?;

    let section = message
        .get("event")
        .ok_or(DecodeError::MissingSection { section: "event" })?;
    let wire = decode_event(section)?;

    Ok(DecodedMessage {
        event: Event {
            sequence_id: header.id,
            fsm_name: header.fsm,
            kind: EventKind::from(wire),
        },
        modified_structures,
        malformed_structures,
    })
}

/// Select the single present tag and decode its body.
///
/// A tag whose body is `null` counts as absent.
fn decode_event(section: &Value) -> Result<WireEvent, DecodeError> {
    let Value::Object(map) = section else {
        return Err(DecodeError::UnknownEventTag { keys: Vec::new() });
    };

    let present: Vec<(WireEventTag, &Value)> = WireEventTag::ALL
        .into_iter()
        .filter_map(|tag| {
            map.get(tag.key())
                .filter(|body| !body.is_null())
                .map(|body| (tag, body))
        })
        .collect();

    match present.as_slice() {
        [(tag, body)] => decode_body(*tag, body),
        [] => Err(DecodeError::UnknownEventTag {
            keys: map.keys().cloned().collect(),
        }),
        _ => Err(DecodeError::AmbiguousEventTag {
            tags: present.iter().map(|(tag, _)| *tag).collect(),
        }),
    }
}

fn decode_body(tag: WireEventTag, body: &Value) -> Result<WireEvent, DecodeError> {
    let decoded = match tag {
        WireEventTag::StateTransitionStart => {
            WireTransition::deserialize(body).map(WireEvent::StateTransitionStart)
        }
        WireEventTag::StateTransitioned => {
            WireTransition::deserialize(body).map(WireEvent::StateTransitioned)
        }
        WireEventTag::ProcessingEvent => {
            WireProcessingEvent::deserialize(body).map(WireEvent::ProcessingEvent)
        }
        WireEventTag::StateEvent => WireStateEvent::deserialize(body).map(WireEvent::StateEvent),
        WireEventTag::Action => WireAction::deserialize(body).map(WireEvent::Action),
    };
    decoded.map_err(|source| DecodeError::MalformedEvent { tag, source })
}

/// Decode `modified_structures`, splitting good entries from bad ones.
///
/// A missing or `null` list is treated as empty.
fn decode_structures(
    list: Option<&Value>,
) -> Result<(Vec<ModifiedStructure>, Vec<MalformedStructure>), DecodeError> {
    let entries = match list {
        None | Some(Value::Null) => return Ok((Vec::new(), Vec::new())),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(DecodeError::MalformedStructureList),
    };

    let mut modified = Vec::with_capacity(entries.len());
    let mut malformed = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match decode_structure(entry) {
            Ok(structure) => modified.push(structure),
            Err(reason) => malformed.push(MalformedStructure { index, reason }),
        }
    }
    Ok((modified, malformed))
}

fn decode_structure(entry: &Value) -> Result<ModifiedStructure, String> {
    let id = entry
        .get("id")
        .ok_or_else(|| String::from("entry has no id"))?;
    let id = DataStructureId::from_wire(id).map_err(|e| e.to_string())?;
    let value = entry.get("value").cloned().unwrap_or(Value::Null);
    Ok(ModifiedStructure { id, value })
}
