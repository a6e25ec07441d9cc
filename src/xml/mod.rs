//! XML support for multipart requests and responses.
//!
//! Success bodies are consumed incrementally through [`stream::XmlStream`].
//! Error bodies are small and read whole, so they are parsed in one pass.

pub mod stream;

use crate::error::{ResponseError, S3Error, S3ErrorResponse};
use crate::types::CompletedPart;
use quick_xml::events::Event;
use quick_xml::Reader;

pub use stream::{LeafTextHandler, StreamEnd, XmlStream};

/// Parse an S3 `<Error>` document.
pub fn parse_error_response(xml: &str) -> Result<S3ErrorResponse, S3Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut response = S3ErrorResponse::default();
    let mut current_element = String::new();
    let mut saw_error = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if current_element == "Error" {
                    saw_error = true;
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Code" => response.code = text,
                    "Message" => response.message = text,
                    "BucketName" | "Bucket" => response.bucket = Some(text),
                    "Key" => response.key = Some(text),
                    "UploadId" => response.upload_id = Some(text),
                    "RequestId" => response.request_id = Some(text),
                    "HostId" => response.host_id = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(S3Error::Response(ResponseError::XmlParseError {
                    message: e.to_string(),
                }));
            }
            _ => {}
        }
    }

    if !saw_error || response.code.is_empty() {
        return Err(S3Error::Response(ResponseError::MissingField {
            field: "Error/Code".to_string(),
        }));
    }

    Ok(response)
}

/// Build the `CompleteMultipartUpload` manifest for a commit request.
///
/// Parts are written in the order given.
pub fn build_complete_multipart_xml(parts: &[CompletedPart]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<CompleteMultipartUpload>");

    for part in parts {
        xml.push_str("<Part>");
        xml.push_str(&format!("<PartNumber>{}</PartNumber>", part.part_number));
        xml.push_str(&format!("<ETag>{}</ETag>", escape_xml(&part.etag)));
        xml.push_str("</Part>");
    }

    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Escape text for inclusion in element content.
pub fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <Error>
            <Code>NoSuchUpload</Code>
            <Message>The specified upload does not exist.</Message>
            <UploadId>U1</UploadId>
            <RequestId>ABC123</RequestId>
            <HostId>XYZ789</HostId>
        </Error>"#;

        let result = parse_error_response(xml).unwrap();
        assert_eq!(result.code, "NoSuchUpload");
        assert_eq!(result.upload_id.as_deref(), Some("U1"));
        assert_eq!(result.request_id.as_deref(), Some("ABC123"));
        assert_eq!(result.host_id.as_deref(), Some("XYZ789"));
    }

    #[test]
    fn test_parse_error_response_requires_a_code() {
        assert!(parse_error_response("<Other><Code>X</Code></Other>").is_err());
        assert!(parse_error_response("").is_err());
        assert!(parse_error_response("<Error></Error>").is_err());
    }

    #[test]
    fn test_build_complete_multipart_xml() {
        let parts = vec![
            CompletedPart::new(1, "\"abc\""),
            CompletedPart::new(2, "\"def\""),
        ];

        let xml = build_complete_multipart_xml(&parts);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(
            "<Part><PartNumber>1</PartNumber><ETag>&quot;abc&quot;</ETag></Part>\
             <Part><PartNumber>2</PartNumber><ETag>&quot;def&quot;</ETag></Part>"
        ));
        assert!(xml.ends_with("</CompleteMultipartUpload>"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a&b"), "a&amp;b");
        assert_eq!(escape_xml("a<b"), "a&lt;b");
        assert_eq!(escape_xml("a>b"), "a&gt;b");
        assert_eq!(escape_xml("a\"b"), "a&quot;b");
        assert_eq!(escape_xml("plain"), "plain");
    }
}
