//! Binary persistence of condition results in saved plan files.
//!
//! A plan records the outcome of every condition so that apply and later
//! tooling can report them without re-evaluating. The format is a 32-byte
//! fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"CNDS"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! The format version must match exactly. The engine version is
//! informational only.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{
    AbsOutputValue, AbsResourceInstance, Checkable, ConditionResult, ConditionType, Conditions,
    InstanceKey, ModuleInstance, ModuleInstanceStep, OutputValue, Resource, ResourceInstance,
    ResourceMode,
};

const MAGIC: &[u8; 4] = b"CNDS";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

/// Errors that can occur when writing [`Conditions`] to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode condition results: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("condition results too large: {0} payload bytes")]
    TooLarge(usize),
}

/// Errors that can occur when reading [`Conditions`] from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a condition results blob: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedConditions {
    result_count: usize,
    results: Vec<SerializedResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedResult {
    rule_addr: String,
    owner: SerializedOwner,
    condition_type: SerializedConditionType,
    result: bool,
    unknown: bool,
    error_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedOwner {
    Resource {
        module: Vec<(String, SerializedKey)>,
        data: bool,
        type_name: String,
        name: String,
        key: SerializedKey,
    },
    Output {
        module: Vec<(String, SerializedKey)>,
        name: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedKey {
    None,
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedConditionType {
    Invalid,
    ResourcePrecondition,
    ResourcePostcondition,
    OutputPrecondition,
}

fn serialize_type(t: ConditionType) -> SerializedConditionType {
    match t {
        ConditionType::InvalidCondition => SerializedConditionType::Invalid,
        ConditionType::ResourcePrecondition => SerializedConditionType::ResourcePrecondition,
        ConditionType::ResourcePostcondition => SerializedConditionType::ResourcePostcondition,
        ConditionType::OutputPrecondition => SerializedConditionType::OutputPrecondition,
    }
}

fn deserialize_type(t: SerializedConditionType) -> ConditionType {
    match t {
        SerializedConditionType::Invalid => ConditionType::InvalidCondition,
        SerializedConditionType::ResourcePrecondition => ConditionType::ResourcePrecondition,
        SerializedConditionType::ResourcePostcondition => ConditionType::ResourcePostcondition,
        SerializedConditionType::OutputPrecondition => ConditionType::OutputPrecondition,
    }
}

fn serialize_key(key: &InstanceKey) -> SerializedKey {
    match key {
        InstanceKey::NoKey => SerializedKey::None,
        InstanceKey::Int(i) => SerializedKey::Int(*i),
        InstanceKey::String(s) => SerializedKey::Str(s.clone()),
    }
}

fn deserialize_key(key: SerializedKey) -> InstanceKey {
    match key {
        SerializedKey::None => InstanceKey::NoKey,
        SerializedKey::Int(i) => InstanceKey::Int(i),
        SerializedKey::Str(s) => InstanceKey::String(s),
    }
}

fn serialize_module(module: &ModuleInstance) -> Vec<(String, SerializedKey)> {
    module
        .0
        .iter()
        .map(|step| (step.name.clone(), serialize_key(&step.key)))
        .collect()
}

fn deserialize_module(steps: Vec<(String, SerializedKey)>) -> ModuleInstance {
    ModuleInstance(
        steps
            .into_iter()
            .map(|(name, key)| ModuleInstanceStep {
                name,
                key: deserialize_key(key),
            })
            .collect(),
    )
}

fn serialize_owner(owner: &Checkable) -> SerializedOwner {
    match owner {
        Checkable::ResourceInstance(addr) => {
            let resource = &addr.resource.resource;
            SerializedOwner::Resource {
                module: serialize_module(&addr.module),
                data: resource.mode == ResourceMode::Data,
                type_name: resource.type_name.clone(),
                name: resource.name.clone(),
                key: serialize_key(&addr.resource.key),
            }
        }
        Checkable::OutputValue(addr) => SerializedOwner::Output {
            module: serialize_module(&addr.module),
            name: addr.output.name.clone(),
        },
    }
}

fn deserialize_owner(owner: SerializedOwner) -> Checkable {
    match owner {
        SerializedOwner::Resource {
            module,
            data,
            type_name,
            name,
            key,
        } => {
            let resource = if data {
                Resource::data(&type_name, &name)
            } else {
                Resource::managed(&type_name, &name)
            };
            Checkable::ResourceInstance(AbsResourceInstance {
                module: deserialize_module(module),
                resource: ResourceInstance {
                    resource,
                    key: deserialize_key(key),
                },
            })
        }
        SerializedOwner::Output { module, name } => Checkable::OutputValue(AbsOutputValue {
            module: deserialize_module(module),
            output: OutputValue::new(&name),
        }),
    }
}

fn conditions_to_serialized(conditions: &Conditions) -> SerializedConditions {
    let mut results: Vec<SerializedResult> = conditions
        .iter()
        .map(|(rule_addr, r)| SerializedResult {
            rule_addr: rule_addr.to_owned(),
            owner: serialize_owner(&r.address),
            condition_type: serialize_type(r.condition_type),
            result: r.result,
            unknown: r.unknown,
            error_message: r.error_message.clone(),
        })
        .collect();
    // Sort by address for deterministic output
    results.sort_by(|a, b| a.rule_addr.cmp(&b.rule_addr));

    SerializedConditions {
        result_count: results.len(),
        results,
    }
}

fn serialized_to_conditions(ser: SerializedConditions) -> Result<Conditions, DeserializeError> {
    validate(&ser)?;

    let mut conditions = Conditions::new();
    for sr in ser.results {
        conditions.insert(
            sr.rule_addr,
            ConditionResult {
                address: deserialize_owner(sr.owner),
                result: sr.result,
                unknown: sr.unknown,
                condition_type: deserialize_type(sr.condition_type),
                error_message: sr.error_message,
            },
        );
    }
    Ok(conditions)
}

fn validate(ser: &SerializedConditions) -> Result<(), DeserializeError> {
    if ser.result_count != ser.results.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} results but payload has {}",
            ser.result_count,
            ser.results.len()
        )));
    }

    let mut seen = HashSet::new();
    for r in &ser.results {
        if !seen.insert(r.rule_addr.as_str()) {
            return Err(DeserializeError::Validation(format!(
                "duplicate rule address '{}'",
                r.rule_addr
            )));
        }

        let owner_matches = match (r.condition_type, &r.owner) {
            (SerializedConditionType::Invalid, _) => true,
            (
                SerializedConditionType::ResourcePrecondition
                | SerializedConditionType::ResourcePostcondition,
                SerializedOwner::Resource { .. },
            ) => true,
            (SerializedConditionType::OutputPrecondition, SerializedOwner::Output { .. }) => true,
            _ => false,
        };
        if !owner_matches {
            return Err(DeserializeError::Validation(format!(
                "rule '{}' has condition type {:?} but its owner is {}",
                r.rule_addr,
                r.condition_type,
                match r.owner {
                    SerializedOwner::Resource { .. } => "a resource instance",
                    SerializedOwner::Output { .. } => "an output value",
                }
            )));
        }
    }
    Ok(())
}

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) -> Result<(), SerializeError> {
    let payload_len =
        u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge(payload.len()))?;
    let hash = blake3::hash(payload);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash.as_bytes()[..16]);
    Ok(())
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version, bytes[8..12] is flags
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

impl Conditions {
    /// Encode every stored result for a saved plan.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`] if the payload cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        let serialized = conditions_to_serialized(self);
        let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        write_header(&mut buf, &payload)?;
        buf.extend_from_slice(&payload);
        debug!(results = self.len(), bytes = buf.len(), "encoded condition results");
        Ok(buf)
    }

    /// Decode results written by [`Conditions::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`] if the header is malformed, the payload
    /// is corrupt, or a decoded result is inconsistent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let (format_version, payload_len, stored_hash) = read_header(bytes)?;

        if format_version != FORMAT_VERSION {
            return Err(DeserializeError::IncompatibleVersion {
                blob: format_version,
                supported: FORMAT_VERSION,
            });
        }

        let payload_end = HEADER_SIZE + payload_len as usize;
        if bytes.len() < payload_end {
            return Err(DeserializeError::LengthMismatch {
                expected: payload_len,
                actual: bytes.len() - HEADER_SIZE,
            });
        }
        let payload = &bytes[HEADER_SIZE..payload_end];

        if blake3::hash(payload).as_bytes()[..16] != stored_hash {
            return Err(DeserializeError::ChecksumMismatch);
        }

        let (serialized, _): (SerializedConditions, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

        serialized_to_conditions(serialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(owner: SerializedOwner, condition_type: SerializedConditionType) -> SerializedResult {
        SerializedResult {
            rule_addr: "a.b.preconditions[0]".into(),
            owner,
            condition_type,
            result: true,
            unknown: false,
            error_message: String::new(),
        }
    }

    fn resource_owner() -> SerializedOwner {
        SerializedOwner::Resource {
            module: vec![("net".into(), SerializedKey::Int(1))],
            data: true,
            type_name: "aws_ami".into(),
            name: "base".into(),
            key: SerializedKey::Str("blue".into()),
        }
    }

    #[test]
    fn owner_conversion_keeps_address() {
        let owner = deserialize_owner(resource_owner());
        assert_eq!(
            owner.to_string(),
            "module.net[1].data.aws_ami.base[\"blue\"]"
        );
        let again = deserialize_owner(serialize_owner(&owner));
        assert_eq!(again, owner);
    }

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        let (format_version, payload_len, hash) = read_header(&buf).unwrap();
        assert_eq!(format_version, FORMAT_VERSION);
        assert_eq!(payload_len as usize, payload.len());
        assert_eq!(&hash, &blake3::hash(payload).as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"OORO");
        assert!(matches!(read_header(&buf), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        assert!(matches!(
            read_header(&[0u8; 10]),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_mismatched_owner() {
        let ser = SerializedConditions {
            result_count: 1,
            results: vec![result(resource_owner(), SerializedConditionType::OutputPrecondition)],
        };
        assert!(matches!(validate(&ser), Err(DeserializeError::Validation(_))));
    }

    #[test]
    fn validate_accepts_invalid_type_with_any_owner() {
        let ser = SerializedConditions {
            result_count: 1,
            results: vec![result(resource_owner(), SerializedConditionType::Invalid)],
        };
        assert!(validate(&ser).is_ok());
    }

    #[test]
    fn validate_rejects_count_mismatch() {
        let ser = SerializedConditions {
            result_count: 2,
            results: vec![result(resource_owner(), SerializedConditionType::ResourcePrecondition)],
        };
        assert!(matches!(validate(&ser), Err(DeserializeError::Validation(_))));
    }

    #[test]
    fn validate_rejects_duplicate_addresses() {
        let ser = SerializedConditions {
            result_count: 2,
            results: vec![
                result(resource_owner(), SerializedConditionType::ResourcePrecondition),
                result(resource_owner(), SerializedConditionType::ResourcePostcondition),
            ],
        };
        assert!(matches!(validate(&ser), Err(DeserializeError::Validation(_))));
    }
}
