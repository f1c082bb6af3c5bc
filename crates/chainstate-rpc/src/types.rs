//! Typed results of `state_getRuntimeVersion`, `chain_getHeader` and
//! `chain_getBlock`.

use chainstate_core::types::{BlockHash, StorageData};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Runtime version reported by the node. A change of `spec_version` means
/// the metadata must be fetched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub impl_name: String,
    #[serde(default)]
    pub authoring_version: u32,
    pub spec_version: u32,
    #[serde(default)]
    pub impl_version: u32,
    #[serde(default)]
    pub transaction_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_version: Option<u8>,
    /// `(api id, version)` pairs; ids are 8-byte hex strings.
    #[serde(default)]
    pub apis: Vec<(String, u32)>,
}

/// Block header digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    /// SCALE-encoded digest items.
    pub logs: Vec<StorageData>,
}

/// A block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: BlockHash,
    /// Block number; hex-encoded on the wire.
    #[serde(with = "hex_number")]
    pub number: u64,
    pub state_root: BlockHash,
    pub extrinsics_root: BlockHash,
    #[serde(default)]
    pub digest: Digest,
}

/// Consensus engine id and the engine's encoded justification.
pub type Justification = ([u8; 4], Vec<u8>);

/// Block body; extrinsics are opaque SCALE-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub extrinsics: Vec<StorageData>,
}

/// Result of `chain_getBlock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub block: Block,
    #[serde(default)]
    pub justifications: Option<Vec<Justification>>,
}

impl SignedBlock {
    pub fn number(&self) -> u64 {
        self.block.header.number
    }

    pub fn extrinsics(&self) -> &[StorageData] {
        &self.block.extrinsics
    }
}

mod hex_number {
    use super::*;

    pub fn serialize<S: Serializer>(n: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{n:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Num(u64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(n),
            Repr::Hex(s) => {
                let digits = s.strip_prefix("0x").unwrap_or(&s);
                u64::from_str_radix(digits, 16).map_err(de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runtime_version_from_node_json() {
        let v: RuntimeVersion = serde_json::from_value(json!({
            "specName": "polkadot",
            "implName": "parity-polkadot",
            "authoringVersion": 0,
            "specVersion": 1_002_000,
            "implVersion": 0,
            "apis": [["0xdf6acb689907609b", 5]],
            "transactionVersion": 26,
            "stateVersion": 1
        }))
        .unwrap();
        assert_eq!(v.spec_name, "polkadot");
        assert_eq!(v.spec_version, 1_002_000);
        assert_eq!(v.apis, vec![("0xdf6acb689907609b".to_string(), 5)]);
        assert_eq!(v.state_version, Some(1));
    }

    #[test]
    fn header_number_is_hex() {
        let zero = format!("0x{}", "00".repeat(32));
        let h: Header = serde_json::from_value(json!({
            "parentHash": zero,
            "number": "0x1b4",
            "stateRoot": zero,
            "extrinsicsRoot": zero,
            "digest": { "logs": ["0x0642414245"] }
        }))
        .unwrap();
        assert_eq!(h.number, 436);
        assert_eq!(h.digest.logs.len(), 1);
        assert_eq!(serde_json::to_value(&h).unwrap()["number"], "0x1b4");
    }

    #[test]
    fn signed_block_with_justifications() {
        let zero = format!("0x{}", "00".repeat(32));
        let b: SignedBlock = serde_json::from_value(json!({
            "block": {
                "header": {
                    "parentHash": zero,
                    "number": "0x10",
                    "stateRoot": zero,
                    "extrinsicsRoot": zero,
                    "digest": { "logs": [] }
                },
                "extrinsics": ["0x280403000b", "0x1c0409"]
            },
            "justifications": [[[70, 82, 78, 75], [1, 2, 3]]]
        }))
        .unwrap();
        assert_eq!(b.number(), 16);
        assert_eq!(b.extrinsics().len(), 2);
        assert_eq!(b.extrinsics()[1].as_bytes(), &[0x1cu8, 0x04, 0x09][..]);
        let justifications = b.justifications.unwrap();
        assert_eq!(&justifications[0].0, b"FRNK");
        assert_eq!(justifications[0].1, vec![1, 2, 3]);
    }

    #[test]
    fn signed_block_without_justifications() {
        let zero = format!("0x{}", "00".repeat(32));
        let b: SignedBlock = serde_json::from_value(json!({
            "block": {
                "header": {
                    "parentHash": zero,
                    "number": "0x0",
                    "stateRoot": zero,
                    "extrinsicsRoot": zero,
                    "digest": { "logs": [] }
                },
                "extrinsics": []
            },
            "justifications": null
        }))
        .unwrap();
        assert!(b.extrinsics().is_empty());
        assert_eq!(b.justifications, None);
    }
}
