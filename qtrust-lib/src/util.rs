//! Shared encoding utilities.

use crate::oid;

/// Format bytes as colon-separated uppercase hex (e.g., "AB:CD:EF").
pub fn hex_colon_upper(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Whether the input looks like PEM (ignoring leading whitespace).
pub fn is_pem(input: &[u8]) -> bool {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    input
        .get(start..)
        .is_some_and(|rest| rest.starts_with(b"-----BEGIN"))
}

/// Short attribute name for a DN attribute OID, or the dotted OID itself.
pub fn oid_short_name(oid_str: &str) -> String {
    match oid_str {
        oid::COMMON_NAME => "CN".into(),
        oid::SURNAME => "SN".into(),
        oid::SERIAL_NUMBER => "serialNumber".into(),
        oid::COUNTRY => "C".into(),
        oid::LOCALITY => "L".into(),
        oid::STATE_OR_PROVINCE => "ST".into(),
        oid::ORGANIZATION => "O".into(),
        oid::ORGANIZATIONAL_UNIT => "OU".into(),
        oid::GIVEN_NAME => "GN".into(),
        oid::ORGANIZATION_IDENTIFIER => "organizationIdentifier".into(),
        oid::EMAIL_ADDRESS => "emailAddress".into(),
        other => other.to_string(),
    }
}

/// Join a list of strings with commas, sorted so the output is canonical.
pub fn canonical_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut sorted = items.to_vec();
    sorted.sort();
    sorted.dedup();
    Some(sorted.join(","))
}

/// Serde adapter storing DER blobs as standard base64 strings.
pub mod base64_der {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        let compact: String = text.split_whitespace().collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter storing binary identifiers as hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        let compact: String = text.chars().filter(|c| *c != ':' && !c.is_whitespace()).collect();
        hex::decode(compact).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pem_detection_skips_whitespace() {
        assert!(is_pem(b"  \n-----BEGIN CERTIFICATE-----"));
        assert!(!is_pem(&[0x30, 0x82, 0x01]));
        assert!(!is_pem(b""));
    }

    #[test]
    fn canonical_list_sorts_and_dedups() {
        let items = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(canonical_list(&items).as_deref(), Some("a,b"));
        assert_eq!(canonical_list(&[]), None);
    }

    #[test]
    fn hex_colon() {
        assert_eq!(hex_colon_upper(&[0xab, 0x01]), "AB:01");
    }
}
