//! Decoding of the `System::Events` storage value.
//!
//! ```text
//! Compact(n)
//! n × [ phase | module_index: u8 | event_index: u8 | fields... | Vec<[u8; 32]> topics ]
//! phase = 0x00 u32 (ApplyExtrinsic) | 0x01 (Finalization) | 0x02 (Initialization)
//! ```

use chainstate_core::error::{DecodeError, EventDecodeError};
use chainstate_scale::{decode_value, Cursor, Value};
use serde::Serialize;

use crate::index::MetadataIndex;

/// When during block execution an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// During the extrinsic at this index.
    ApplyExtrinsic(u32),
    Finalization,
    Initialization,
}

/// One decoded entry of `System::Events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub phase: Phase,
    pub module_index: u8,
    pub module: String,
    pub event_index: u8,
    pub name: String,
    /// Event arguments in declaration order.
    pub fields: Vec<(Option<String>, Value)>,
    pub topics: Vec<[u8; 32]>,
}

impl EventRecord {
    /// Returns `true` if this is `module::name`.
    pub fn is(&self, module: &str, name: &str) -> bool {
        self.module == module && self.name == name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v)
    }
}

/// Decodes event record sequences against a metadata index.
pub struct EventDecoder;

impl EventDecoder {
    /// Decode the full `System::Events` value.
    ///
    /// An event index the metadata does not know fails with
    /// [`EventDecodeError::UnknownEvent`]; the rest of the blob cannot be
    /// decoded past it since the event's length is unknown.
    pub fn decode(raw: &[u8], meta: &MetadataIndex) -> Result<Vec<EventRecord>, EventDecodeError> {
        let mut c = Cursor::new(raw);
        let count = c.read_len()?;
        let mut records = Vec::with_capacity(count.min(c.remaining()));
        for record in 0..count {
            records.push(decode_record(&mut c, meta, record)?);
        }
        if !c.is_empty() {
            return Err(c
                .invalid(
                    c.offset(),
                    format!("{} trailing bytes after {count} event records", c.remaining()),
                )
                .into());
        }
        Ok(records)
    }
}

fn decode_record(
    c: &mut Cursor<'_>,
    meta: &MetadataIndex,
    record: usize,
) -> Result<EventRecord, EventDecodeError> {
    let in_record = |source: DecodeError| EventDecodeError::Record { record, source };

    let phase = read_phase(c).map_err(in_record)?;
    let module_index = c.read_u8().map_err(in_record)?;
    let event_index = c.read_u8().map_err(in_record)?;

    let event = meta.resolve_event(module_index, event_index).map_err(|e| {
        if e.is_not_found() {
            EventDecodeError::UnknownEvent {
                module_index,
                event_index,
            }
        } else {
            EventDecodeError::Metadata(e)
        }
    })?;

    let mut fields = Vec::with_capacity(event.fields().len());
    for field in event.fields() {
        let value = decode_value(c, field.ty, meta.registry()).map_err(in_record)?;
        fields.push((field.name.clone(), value));
    }
    let topics = c.read_vec(|c| c.read_array::<32>()).map_err(in_record)?;

    Ok(EventRecord {
        phase,
        module_index,
        module: event.module_name().to_string(),
        event_index,
        name: event.name().to_string(),
        fields,
        topics,
    })
}

fn read_phase(c: &mut Cursor<'_>) -> Result<Phase, DecodeError> {
    let at = c.offset();
    match c.read_u8()? {
        0 => Ok(Phase::ApplyExtrinsic(c.read_u32()?)),
        1 => Ok(Phase::Finalization),
        2 => Ok(Phase::Initialization),
        d => Err(c.invalid(at, format!("unknown phase {d}"))),
    }
}
