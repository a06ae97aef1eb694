use chrono::{DateTime, Utc};

use crate::error::{QuakeLinkError, Result};
use crate::time::parse_content_timestamp;

/// Upper bound on `Content-Length` (10 MiB).
pub const MAX_CONTENT_LENGTH: u64 = 10_485_760;

/// Payload kind announced in the `Content-Type` header.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    /// `quakelink/xml`
    Xml,
    /// `quakelink/evsum`
    Summary,
    /// `quakelink/evlog`
    Log,
    /// `text/plain`
    Text,
    #[default]
    Undefined,
}

impl ContentType {
    /// Classify a `Content-Type` value by prefix.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("quakelink/xml") {
            Self::Xml
        } else if value.starts_with("quakelink/evsum") {
            Self::Summary
        } else if value.starts_with("quakelink/evlog") {
            Self::Log
        } else if value.starts_with("text/plain") {
            Self::Text
        } else {
            Self::Undefined
        }
    }
}

/// One decoded data unit: header fields plus the raw payload bytes.
///
/// The payload stays opaque here; when `gzip` is set it is still
/// compressed and decompression is up to the consumer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    pub content_type: ContentType,
    /// Payload byte count from `Content-Length`.
    pub length: usize,
    /// `Content-Timestamp`, or the local receive time for live updates.
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-text `Content-Format` descriptor.
    pub format: String,
    /// Payload is gzip-compressed (`Content-Encoding: gzip`).
    pub gzip: bool,
    /// `Content-Revision` of the event record.
    pub revision: Option<i32>,
    /// Event has been soft-deleted on the server.
    pub disposed: Option<bool>,
    pub data: Vec<u8>,
}

/// Accumulates the `Key: value` lines of one header block.
///
/// Unrecognized keys are skipped for forward compatibility; recognized keys
/// with malformed values are protocol errors. `finish` enforces the
/// mandatory fields and the content-length bound.
#[derive(Debug, Default)]
pub struct HeaderBlock {
    response: Response,
    length: Option<u64>,
}

impl HeaderBlock {
    /// Apply one header line. Returns `false` if the line was not recognized.
    pub fn apply_line(&mut self, line: &str) -> Result<bool> {
        let Some((key, value)) = line.split_once(':') else {
            return Ok(false);
        };
        let value = value.trim();
        match key {
            "Content-Type" => {
                self.response.content_type = ContentType::parse(value);
                if self.response.content_type == ContentType::Undefined {
                    return Err(QuakeLinkError::InvalidHeader {
                        field: "Content-Type",
                        value: value.to_owned(),
                    });
                }
            }
            "Content-Length" => {
                let length: u64 = value.parse().map_err(|_| QuakeLinkError::InvalidHeader {
                    field: "Content-Length",
                    value: value.to_owned(),
                })?;
                if length > MAX_CONTENT_LENGTH {
                    return Err(QuakeLinkError::ContentTooLarge {
                        length,
                        maximum: MAX_CONTENT_LENGTH,
                    });
                }
                self.length = Some(length);
            }
            "Content-Format" => {
                self.response.format = value.to_owned();
            }
            "Content-Encoding" => {
                if !value.starts_with("gzip") {
                    return Err(QuakeLinkError::InvalidHeader {
                        field: "Content-Encoding",
                        value: value.to_owned(),
                    });
                }
                self.response.gzip = true;
            }
            "Content-Timestamp" => {
                self.response.timestamp = Some(parse_content_timestamp(value)?);
            }
            "Content-Revision" => {
                let revision: i32 = value.parse().map_err(|_| QuakeLinkError::InvalidHeader {
                    field: "Content-Revision",
                    value: value.to_owned(),
                })?;
                self.response.revision = Some(revision);
            }
            "Disposed" => {
                let disposed = if value.eq_ignore_ascii_case("true") {
                    true
                } else if value.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return Err(QuakeLinkError::InvalidHeader {
                        field: "Disposed",
                        value: value.to_owned(),
                    });
                };
                self.response.disposed = Some(disposed);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Validate mandatory fields and produce the response, payload not yet read.
    pub fn finish(self) -> Result<Response> {
        let mut response = self.response;
        if response.content_type == ContentType::Undefined {
            return Err(QuakeLinkError::MissingHeader("Content-Type"));
        }
        match self.length {
            Some(length) if length > 0 => response.length = length as usize,
            _ => return Err(QuakeLinkError::MissingHeader("Content-Length")),
        }
        Ok(response)
    }
}
