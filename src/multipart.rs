//! Boundary-based `multipart/form-data` parser.
//!
//! Operates purely on byte offsets. Part payloads may be arbitrary binary, so
//! nothing here round-trips content through a text decoding; the bytes handed
//! back for a part are exactly the bytes the client sent between its header
//! block and the next boundary delimiter.

use std::collections::HashMap;

/// A single named part extracted from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Raw payload bytes, bit-identical to the wire form.
    pub content: Vec<u8>,

    /// Original filename from `Content-Disposition`, when present.
    pub filename: Option<String>,

    /// Part-level `Content-Type` header, when present.
    pub content_type: Option<String>,
}

/// Return true if the request `Content-Type` declares a multipart form body.
pub fn is_form_data(content_type: &str) -> bool {
    content_type.contains("multipart/form-data")
}

/// Extract the boundary parameter from a `Content-Type` header value.
///
/// Returns `None` when the header carries no boundary. Surrounding quotes are
/// stripped; the token ends at the next `;` parameter separator.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let (_, rest) = content_type.split_once("boundary=")?;
    let token = rest.split(';').next().unwrap_or(rest).trim().trim_matches('"');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Split `body` into named parts on the exact delimiter `--{boundary}`.
///
/// An empty boundary yields an empty map (the caller treats that as "content
/// not found"). Payload bytes that merely resemble a delimiter (`--` followed
/// by other text) do not fragment a part; only exact delimiter byte matches
/// tokenize the body. Later parts win on duplicate field names.
pub fn parse_form_data(body: &[u8], boundary: &str) -> HashMap<String, Part> {
    let mut parts = HashMap::new();
    if boundary.is_empty() {
        return parts;
    }

    let delimiter = format!("--{}", boundary).into_bytes();
    let mut offsets = Vec::new();
    let mut from = 0;
    while let Some(pos) = find_bytes(&body[from..], &delimiter) {
        offsets.push(from + pos);
        from += pos + delimiter.len();
    }

    for pair in offsets.windows(2) {
        let segment = &body[pair[0] + delimiter.len()..pair[1]];
        // `--` immediately after a delimiter closes the body.
        if segment.starts_with(b"--") {
            break;
        }
        if let Some((name, part)) = parse_segment(segment) {
            parts.insert(name, part);
        }
    }

    parts
}

/// Parse one delimiter-to-delimiter segment into a named part.
///
/// Segment layout: leading CRLF, a header block closed by a blank line, then
/// payload bytes up to (but not including) the CRLF that precedes the next
/// delimiter. Segments without a `Content-Disposition` name are dropped.
fn parse_segment(segment: &[u8]) -> Option<(String, Part)> {
    let segment = segment.strip_prefix(b"\r\n").unwrap_or(segment);
    let header_end = find_bytes(segment, b"\r\n\r\n")?;

    let mut content = &segment[header_end + 4..];
    if content.ends_with(b"\r\n") {
        content = &content[..content.len() - 2];
    }

    // Only the header block is text; the payload never passes through here.
    let headers = String::from_utf8_lossy(&segment[..header_end]);
    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in headers.split("\r\n") {
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("content-disposition:") {
            name = quoted_attribute(line, "name");
            filename = quoted_attribute(line, "filename");
        } else if lower.starts_with("content-type:") {
            content_type = Some(line["content-type:".len()..].trim().to_string());
        }
    }

    Some((
        name?,
        Part {
            content: content.to_vec(),
            filename,
            content_type,
        },
    ))
}

/// Pull `attr="value"` out of a header line.
///
/// Matches on attribute-name boundaries so `name=` is not found inside
/// `filename=`.
fn quoted_attribute(line: &str, attr: &str) -> Option<String> {
    let marker = format!("{}=\"", attr);
    let mut search = 0;
    while let Some(rel) = line[search..].find(&marker) {
        let at = search + rel;
        if at == 0 || !line.as_bytes()[at - 1].is_ascii_alphanumeric() {
            let start = at + marker.len();
            let end = line[start..].find('"')? + start;
            return Some(line[start..end].to_string());
        }
        search = at + marker.len();
    }
    None
}

/// First offset of `needle` within `haystack`, byte-exact.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----test7MA4YWxkTrZu0gW";

    fn body_with(fields: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, content) in fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    #[test]
    fn parses_two_fields() {
        let body = body_with(&[("c", b"hello world"), ("note", b"second")]);
        let parts = parse_form_data(&body, BOUNDARY);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts["c"].content, b"hello world");
        assert_eq!(parts["note"].content, b"second");
    }

    #[test]
    fn preserves_binary_payload_bytes() {
        let payload: Vec<u8> = vec![0x00, 0xff, 0x89, b'\r', b'\n', 0x00, 0x7f, 0xfe];
        let body = body_with(&[("c", &payload)]);
        let parts = parse_form_data(&body, BOUNDARY);
        assert_eq!(parts["c"].content, payload);
    }

    #[test]
    fn dashes_inside_content_do_not_fragment() {
        let payload = b"line one\r\n--not-the-boundary\r\nline two";
        let body = body_with(&[("c", payload), ("d", b"tail")]);
        let parts = parse_form_data(&body, BOUNDARY);
        assert_eq!(parts["c"].content, payload);
        assert_eq!(parts["d"].content, b"tail");
    }

    #[test]
    fn empty_boundary_yields_empty_map() {
        let body = body_with(&[("c", b"data")]);
        assert!(parse_form_data(&body, "").is_empty());
    }

    #[test]
    fn empty_content_is_kept() {
        let body = body_with(&[("c", b"")]);
        let parts = parse_form_data(&body, BOUNDARY);
        assert_eq!(parts["c"].content, b"");
    }

    #[test]
    fn parses_filename_and_content_type() {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"c\"; filename=\"shot.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(&[0x89, b'P', b'N', b'G']);
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let parts = parse_form_data(&body, BOUNDARY);
        let part = &parts["c"];
        assert_eq!(part.content, [0x89, b'P', b'N', b'G']);
        assert_eq!(part.filename.as_deref(), Some("shot.png"));
        assert_eq!(part.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn boundary_extraction() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=\"quoted\"; charset=utf-8"),
            Some("quoted".to_string())
        );
        assert_eq!(boundary_from_content_type("multipart/form-data"), None);
        assert!(is_form_data("multipart/form-data; boundary=x"));
        assert!(!is_form_data("application/json"));
    }
}
