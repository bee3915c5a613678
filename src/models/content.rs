//! Storage representation of the `content` column.
//!
//! A row's content column carries one of three self-describing forms: a
//! sentinel redirecting to the external object store, a tagged base64
//! rendition of binary bytes, or plain UTF-8 text stored verbatim. The form
//! is chosen once at write time and decoded by matching the reserved literals
//! here; call sites never sniff prefixes themselves.

use base64::{Engine as _, engine::general_purpose};

/// Reserved literal marking external-tier indirection.
///
/// Never produced by `encode`. A pre-existing row whose user text equals this
/// literal exactly would be misread as a redirect; the margin is
/// probabilistic, not cryptographic.
pub const EXTERNAL_SENTINEL: &str = "$STORAGE_EXTERNAL";

/// Reserved literal prefix of the tagged base64 binary form.
pub const BINARY_PREFIX: &str = "$BINARY_BASE64$";

const CLASSIFIER_SAMPLE_LEN: usize = 1024;

/// Heuristic binary/text classification over at most the first 1024 bytes.
///
/// A NUL byte anywhere in the sample classifies the input as binary
/// immediately. Otherwise bytes outside common whitespace (9..=13) and
/// printable ASCII (32..=126) are counted; strictly more than 30% of the
/// sample classifies as binary. Cost is bounded by the sample length
/// regardless of total content size.
pub fn is_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(CLASSIFIER_SAMPLE_LEN)];
    let mut non_printable = 0usize;
    for &byte in sample {
        if byte == 0 {
            return true;
        }
        if byte < 9 || (byte > 13 && byte < 32) || byte > 126 {
            non_printable += 1;
        }
    }
    non_printable * 10 > sample.len() * 3
}

/// Which storage form produced a set of decoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Inline plain text.
    Text,

    /// Inline tagged binary; rendering must not re-attempt text decoding.
    Binary,

    /// Raw bytes fetched from the external tier.
    External,
}

/// Discriminated form of the `content` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredContent {
    /// Bytes live in the external object store under the record key.
    External,

    /// Base64 payload, prefix already stripped.
    TaggedBinary(String),

    /// Verbatim UTF-8 text.
    Text(String),
}

impl StoredContent {
    /// Choose the inline form for `bytes`.
    ///
    /// Binary-classified input, non-UTF-8 input, and text colliding with a
    /// reserved literal all take the tagged form, so `decode(encode(b))`
    /// recovers `b` for every byte sequence.
    pub fn encode(bytes: &[u8]) -> Self {
        if !is_binary(bytes) {
            if let Ok(text) = std::str::from_utf8(bytes) {
                if text != EXTERNAL_SENTINEL && !text.starts_with(BINARY_PREFIX) {
                    return Self::Text(text.to_string());
                }
            }
        }
        Self::TaggedBinary(general_purpose::STANDARD.encode(bytes))
    }

    /// Reconstruct the form from a stored column value.
    pub fn from_column(column: &str) -> Self {
        if column == EXTERNAL_SENTINEL {
            Self::External
        } else if let Some(payload) = column.strip_prefix(BINARY_PREFIX) {
            Self::TaggedBinary(payload.to_string())
        } else {
            Self::Text(column.to_string())
        }
    }

    /// Serialize the form into the column value.
    pub fn into_column(self) -> String {
        match self {
            Self::External => EXTERNAL_SENTINEL.to_string(),
            Self::TaggedBinary(payload) => format!("{}{}", BINARY_PREFIX, payload),
            Self::Text(text) => text,
        }
    }

    /// Recover raw bytes from an inline form.
    ///
    /// Malformed base64 under the tagged prefix does not abort retrieval; the
    /// stored payload bytes come back as-is on the binary path. `External`
    /// carries no inline bytes and returns `None`.
    pub fn decode(self) -> Option<(Vec<u8>, ContentKind)> {
        match self {
            Self::External => None,
            Self::TaggedBinary(payload) => {
                let bytes = general_purpose::STANDARD
                    .decode(payload.as_bytes())
                    .unwrap_or_else(|_| payload.into_bytes());
                Some((bytes, ContentKind::Binary))
            }
            Self::Text(text) => Some((text.into_bytes(), ContentKind::Text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(bytes: &[u8]) -> (Vec<u8>, ContentKind) {
        let column = StoredContent::encode(bytes).into_column();
        StoredContent::from_column(&column)
            .decode()
            .expect("inline forms always decode")
    }

    #[test]
    fn printable_ascii_is_text() {
        let buf: Vec<u8> = std::iter::repeat(b'a'..=b'z')
            .flatten()
            .take(2000)
            .collect();
        assert!(!is_binary(&buf));
    }

    #[test]
    fn leading_nul_is_binary() {
        let mut buf = vec![0x00];
        buf.extend_from_slice(&[b'a'; 2000]);
        assert!(is_binary(&buf));
    }

    #[test]
    fn classifier_threshold_is_strict() {
        // 30.08% non-printable of a 1024-byte sample tips to binary,
        // 29.98% stays text.
        let mut over = vec![0x07u8; 308];
        over.extend_from_slice(&vec![b'a'; 716]);
        assert_eq!(over.len(), 1024);
        assert!(is_binary(&over));

        let mut under = vec![0x07u8; 307];
        under.extend_from_slice(&vec![b'a'; 717]);
        assert_eq!(under.len(), 1024);
        assert!(!is_binary(&under));
    }

    #[test]
    fn text_round_trips_verbatim() {
        let (bytes, kind) = round_trip(b"fn main() {}\n");
        assert_eq!(bytes, b"fn main() {}\n");
        assert_eq!(kind, ContentKind::Text);
    }

    #[test]
    fn binary_round_trips_through_tagged_form() {
        let payload: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        let (bytes, kind) = round_trip(&payload);
        assert_eq!(bytes, payload);
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn all_zero_round_trips() {
        let payload = vec![0u8; 64];
        let (bytes, kind) = round_trip(&payload);
        assert_eq!(bytes, payload);
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn empty_round_trips() {
        let (bytes, kind) = round_trip(b"");
        assert_eq!(bytes, b"");
        assert_eq!(kind, ContentKind::Text);
    }

    #[test]
    fn invalid_utf8_text_falls_back_to_tagged_form() {
        // Mostly printable, so the classifier calls it text, but the bytes
        // are not a valid UTF-8 sequence.
        let mut payload = vec![b'x'; 900];
        payload.extend_from_slice(&[0xc3, 0x28]);
        let (bytes, kind) = round_trip(&payload);
        assert_eq!(bytes, payload);
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn reserved_literals_never_escape_as_plain_text() {
        for input in [
            EXTERNAL_SENTINEL.as_bytes().to_vec(),
            format!("{}whatever", BINARY_PREFIX).into_bytes(),
        ] {
            let encoded = StoredContent::encode(&input);
            assert!(matches!(encoded, StoredContent::TaggedBinary(_)));
            let (bytes, _) = encoded.decode().unwrap();
            assert_eq!(bytes, input);
        }
        // Text that merely contains (not starts with) a literal stays plain.
        let friendly = format!("see {} for details", BINARY_PREFIX).into_bytes();
        assert!(matches!(
            StoredContent::encode(&friendly),
            StoredContent::Text(_)
        ));
    }

    #[test]
    fn column_discrimination() {
        assert_eq!(
            StoredContent::from_column(EXTERNAL_SENTINEL),
            StoredContent::External
        );
        assert_eq!(
            StoredContent::from_column("$BINARY_BASE64$aGk="),
            StoredContent::TaggedBinary("aGk=".to_string())
        );
        assert_eq!(
            StoredContent::from_column("plain words"),
            StoredContent::Text("plain words".to_string())
        );
    }

    #[test]
    fn malformed_base64_degrades_to_raw_payload() {
        let stored = StoredContent::from_column("$BINARY_BASE64$not!!valid@@base64");
        let (bytes, kind) = stored.decode().unwrap();
        assert_eq!(bytes, b"not!!valid@@base64");
        assert_eq!(kind, ContentKind::Binary);
    }
}
