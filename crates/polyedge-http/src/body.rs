//! Content-type driven body decoding.

use std::collections::BTreeMap;

use polyedge_core::{PlatformError, Result};

/// A decoded request or response body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyContent {
    /// `application/json` (and `+json` suffixes).
    Json(serde_json::Value),
    /// `text/*`.
    Text(String),
    /// `multipart/form-data` or `application/x-www-form-urlencoded`,
    /// flattened to one value per field (last one wins).
    Form(BTreeMap<String, String>),
    /// A content type with no decoder.
    UnknownContentType(String),
}

/// Media type without parameters, lowercased.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether `content_type` declares JSON.
pub fn is_json(content_type: &str) -> bool {
    let media = media_type(content_type);
    media == "application/json" || media.ends_with("+json")
}

/// Decode `body` according to `content_type`.
///
/// Returns `Ok(None)` when no content type is declared.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<Option<BodyContent>> {
    let Some(content_type) = content_type else {
        return Ok(None);
    };
    let media = media_type(content_type);

    let content = if is_json(content_type) {
        let value = serde_json::from_slice(body)
            .map_err(|e| PlatformError::InvalidBody(format!("json: {}", e)))?;
        BodyContent::Json(value)
    } else if media.starts_with("text/") {
        let text = String::from_utf8(body.to_vec())
            .map_err(|e| PlatformError::InvalidBody(format!("utf-8: {}", e)))?;
        BodyContent::Text(text)
    } else if media == "application/x-www-form-urlencoded" {
        BodyContent::Form(url::form_urlencoded::parse(body).into_owned().collect())
    } else if media == "multipart/form-data" {
        let boundary = parameter(content_type, "boundary").ok_or_else(|| {
            PlatformError::InvalidBody("multipart body without boundary".to_string())
        })?;
        BodyContent::Form(parse_multipart(body, &boundary))
    } else {
        BodyContent::UnknownContentType(media)
    };

    Ok(Some(content))
}

fn parameter(content_type: &str, name: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// Flatten a `multipart/form-data` body into field name and value.
///
/// File parts contribute their content as (lossy) text.
fn parse_multipart(body: &[u8], boundary: &str) -> BTreeMap<String, String> {
    let text = String::from_utf8_lossy(body);
    let delimiter = format!("--{}", boundary);
    let mut fields = BTreeMap::new();

    for part in text.split(delimiter.as_str()).skip(1) {
        if part.starts_with("--") {
            break;
        }
        let part = part.strip_prefix("\r\n").or_else(|| part.strip_prefix('\n')).unwrap_or(part);
        let (head, content) = match part.split_once("\r\n\r\n") {
            Some(split) => split,
            None => match part.split_once("\n\n") {
                Some(split) => split,
                None => continue,
            },
        };

        let name = head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if !key.trim().eq_ignore_ascii_case("content-disposition") {
                return None;
            }
            parameter(value, "name")
        });

        if let Some(name) = name {
            let value = content
                .strip_suffix("\r\n")
                .or_else(|| content.strip_suffix('\n'))
                .unwrap_or(content);
            fields.insert(name, value.to_string());
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_content_type() {
        assert_eq!(decode_body(None, b"{}").unwrap(), None);
    }

    #[test]
    fn test_json() {
        let content = decode_body(Some("application/json; charset=utf-8"), br#"{"a":1}"#)
            .unwrap()
            .unwrap();
        assert_eq!(content, BodyContent::Json(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_json_suffix() {
        let content = decode_body(Some("application/problem+json"), b"[1]")
            .unwrap()
            .unwrap();
        assert_eq!(content, BodyContent::Json(serde_json::json!([1])));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = decode_body(Some("application/json"), b"{").unwrap_err();
        assert!(matches!(err, PlatformError::InvalidBody(_)));
    }

    #[test]
    fn test_text() {
        let content = decode_body(Some("text/plain"), b"hello").unwrap().unwrap();
        assert_eq!(content, BodyContent::Text("hello".to_string()));

        let content = decode_body(Some("TEXT/HTML"), b"<p>").unwrap().unwrap();
        assert_eq!(content, BodyContent::Text("<p>".to_string()));
    }

    #[test]
    fn test_text_invalid_utf8() {
        assert!(decode_body(Some("text/plain"), &[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_urlencoded() {
        let content = decode_body(
            Some("application/x-www-form-urlencoded"),
            b"user=ada&flag=new+checkout&user=grace",
        )
        .unwrap()
        .unwrap();

        let mut expected = BTreeMap::new();
        expected.insert("flag".to_string(), "new checkout".to_string());
        expected.insert("user".to_string(), "grace".to_string());
        assert_eq!(content, BodyContent::Form(expected));
    }

    #[test]
    fn test_multipart() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"user\"\r\n\
            \r\n\
            ada\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            line one\r\n\
            --XyZ--\r\n";

        let content = decode_body(Some("multipart/form-data; boundary=XyZ"), body.as_bytes())
            .unwrap()
            .unwrap();

        let BodyContent::Form(fields) = content else {
            panic!("expected form");
        };
        assert_eq!(fields.get("user").map(String::as_str), Some("ada"));
        assert_eq!(fields.get("file").map(String::as_str), Some("line one"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_multipart_quoted_boundary() {
        let body = "--b1\nContent-Disposition: form-data; name=\"k\"\n\nv\n--b1--";
        let content = decode_body(Some("multipart/form-data; boundary=\"b1\""), body.as_bytes())
            .unwrap()
            .unwrap();
        let BodyContent::Form(fields) = content else {
            panic!("expected form");
        };
        assert_eq!(fields.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_multipart_without_boundary() {
        assert!(decode_body(Some("multipart/form-data"), b"").is_err());
    }

    #[test]
    fn test_unknown_content_type() {
        let content = decode_body(Some("application/octet-stream"), &[1, 2, 3])
            .unwrap()
            .unwrap();
        assert_eq!(
            content,
            BodyContent::UnknownContentType("application/octet-stream".to_string())
        );
    }
}
