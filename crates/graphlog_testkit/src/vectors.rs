//! Byte-level test vectors for the command log format.
//!
//! Each vector pins the exact encoding of one entry, so that any other
//! reader or writer of the log can be checked against the same bytes.

use graphlog_core::{CommandReader, CommandWriter, CoreError};
use graphlog_storage::InMemoryLogChannel;
use serde::{Deserialize, Serialize};

/// A test vector that can be shared with other implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Input data (hex-encoded).
    pub input_hex: String,
    /// Re-encoding of every command decoded from the input (hex-encoded).
    pub expected_hex: String,
    /// Expected error kind (if decoding should fail).
    pub expected_error: Option<String>,
}

const NODE_12_BEFORE: &str = "000000000000000c00ffffffffffffffffffffffffffffffff000000000000000000000000";
const NODE_12_AFTER: &str = "000000000000000c01000000000000000d000000000000000d000000000000000000000000";

fn node_12_hex() -> String {
    format!("01{NODE_12_BEFORE}{NODE_12_AFTER}")
}

fn valid(id: &str, description: &str, hex: String) -> TestVector {
    TestVector {
        id: id.into(),
        description: description.into(),
        input_hex: hex.clone(),
        expected_hex: hex,
        expected_error: None,
    }
}

fn rejected(id: &str, description: &str, input_hex: &str, error: &str) -> TestVector {
    TestVector {
        id: id.into(),
        description: description.into(),
        input_hex: input_hex.into(),
        expected_hex: String::new(),
        expected_error: Some(error.into()),
    }
}

/// Encodings of well-formed command entries.
pub fn command_encoding_vectors() -> Vec<TestVector> {
    vec![
        valid(
            "node_12_created",
            "Node 12 created with relationship and property chains at 13",
            node_12_hex(),
        ),
        valid(
            "node_12_twice",
            "Two consecutive node commands decode in order",
            format!("{}{}", node_12_hex(), node_12_hex()),
        ),
        valid(
            "neostore_next_prop",
            "NeoStore next property moved from none to 31",
            "06ffffffffffffffff000000000000001f".into(),
        ),
        valid(
            "label_token_created",
            "Label token 0 created with name record 2 and no name records",
            "080000000000ffffffff0000000000000000010000000200000000".into(),
        ),
        valid(
            "schema_index_rule",
            "Index rule 1 on label 3 property 4 with provider (\"1\", \"2\")",
            concat!(
                "07", "00000000", "00000000", "01", "0000000000000001", "00000003", "00000004",
                "00000001", "0031", "00000001", "0032"
            )
            .into(),
        ),
        valid(
            "schema_uniqueness_constraint",
            "Uniqueness constraint 6 on label 3 property 5 owning index 2",
            concat!(
                "07", "00000000", "00000000", "03", "0000000000000006", "00000003", "00000005",
                "0000000000000002"
            )
            .into(),
        ),
    ]
}

/// Inputs that end part way through an entry: nothing decodes, nothing fails.
pub fn truncation_vectors() -> Vec<TestVector> {
    let node = node_12_hex();
    vec![
        valid("empty_log", "An empty log holds no commands", String::new()),
        TestVector {
            id: "tag_only".into(),
            description: "A lone node tag is an incomplete entry".into(),
            input_hex: "01".into(),
            expected_hex: String::new(),
            expected_error: None,
        },
        TestVector {
            id: "node_12_cut_in_after_image".into(),
            description: "Node command cut inside the after image".into(),
            input_hex: node[..2 * 50].into(),
            expected_hex: String::new(),
            expected_error: None,
        },
        TestVector {
            id: "node_12_then_torn".into(),
            description: "A complete node command followed by a torn one".into(),
            input_hex: format!("{node}{}", &node[..2 * 20]),
            expected_hex: node.clone(),
            expected_error: None,
        },
    ]
}

/// Inputs that must be rejected.
pub fn rejection_vectors() -> Vec<TestVector> {
    vec![
        rejected("tag_zero", "Tag 0 is not a command kind", "00", "unknown_tag"),
        rejected("tag_ten", "Tag 10 is not a command kind", "0a", "unknown_tag"),
        rejected(
            "negative_dynamic_count",
            "Schema rule with a negative record count",
            "07ffffffff",
            "corruption",
        ),
        rejected(
            "node_unknown_flag",
            "Node record with an undefined flag bit",
            "01000000000000000c04",
            "corruption",
        ),
        rejected(
            "unknown_schema_kind",
            "Schema rule with rule kind 9",
            "07000000000000000009",
            "corruption",
        ),
    ]
}

/// Decodes every command in `input`, re-encodes them and compares against
/// the vector.
///
/// # Errors
///
/// Returns a description of the first mismatch.
pub fn check_vector(vector: &TestVector) -> Result<(), String> {
    let input = hex_decode(&vector.input_hex)?;
    let mut channel = InMemoryLogChannel::with_data(&input);
    let mut out = InMemoryLogChannel::new();

    let error = loop {
        match CommandReader::read(&mut channel) {
            Ok(Some(command)) => {
                CommandWriter::write_command_entry(&mut out, &command)
                    .map_err(|e| format!("{}: re-encode failed: {e}", vector.id))?;
            }
            Ok(None) => break None,
            Err(CoreError::UnknownCommandTag { .. }) => break Some("unknown_tag".to_string()),
            Err(CoreError::Corruption { .. }) => break Some("corruption".to_string()),
            Err(e) => return Err(format!("{}: unexpected error: {e}", vector.id)),
        }
    };

    if error != vector.expected_error {
        return Err(format!(
            "{}: expected error {:?}, got {:?}",
            vector.id, vector.expected_error, error
        ));
    }
    let actual = hex_encode(&out.to_bytes());
    if actual != vector.expected_hex {
        return Err(format!(
            "{}: expected {}, got {actual}",
            vector.id, vector.expected_hex
        ));
    }
    Ok(())
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes a hex string.
///
/// # Errors
///
/// Returns an error for odd-length input or non-hex digits.
pub fn hex_decode(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd-length hex string ({} digits)", hex.len()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("invalid hex at {i}: {e}"))
        })
        .collect()
}

/// Generate all test vectors as JSON.
pub fn all_vectors_json() -> String {
    let vectors = AllTestVectors {
        commands: command_encoding_vectors(),
        truncation: truncation_vectors(),
        rejection: rejection_vectors(),
    };

    serde_json::to_string_pretty(&vectors).expect("Failed to serialize vectors")
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    commands: Vec<TestVector>,
    truncation: Vec<TestVector>,
    rejection: Vec<TestVector>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{encode_command, node_12_command};

    #[test]
    fn test_command_vectors() {
        for vector in command_encoding_vectors() {
            check_vector(&vector).unwrap();
        }
    }

    #[test]
    fn test_truncation_vectors() {
        for vector in truncation_vectors() {
            check_vector(&vector).unwrap();
        }
    }

    #[test]
    fn test_rejection_vectors() {
        for vector in rejection_vectors() {
            check_vector(&vector).unwrap();
        }
    }

    #[test]
    fn test_node_12_vector_matches_fixture() {
        assert_eq!(hex_encode(&encode_command(&node_12_command())), node_12_hex());
        assert_eq!(node_12_hex().len(), 2 * 75);
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(hex_encode(&[0x00, 0xab, 0xff]), "00abff");
        assert_eq!(hex_decode("00abff").unwrap(), vec![0x00, 0xab, 0xff]);
        assert!(hex_decode("abc").is_err());
        assert!(hex_decode("zz").is_err());
    }

    #[test]
    fn test_all_vectors_json() {
        let json = all_vectors_json();
        assert!(json.contains("node_12_created"));

        let parsed: AllTestVectors = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.commands.len(), command_encoding_vectors().len());
        assert_eq!(parsed.rejection.len(), rejection_vectors().len());
    }
}
