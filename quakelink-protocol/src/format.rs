use crate::error::{QuakeLinkError, Result};

/// Payload encoding requested from the server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestFormat {
    /// One-line event summaries.
    Summary,
    /// SeisComP XML.
    Xml,
    /// Gzip-compressed SeisComP XML.
    GzXml,
    /// Server-native serialization.
    Native,
    /// Gzip-compressed native serialization.
    GzNative,
}

impl RequestFormat {
    /// Wire token (uppercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "SUMMARY",
            Self::Xml => "XML",
            Self::GzXml => "GZXML",
            Self::Native => "NATIVE",
            Self::GzNative => "GZNATIVE",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "SUMMARY" => Ok(Self::Summary),
            "XML" => Ok(Self::Xml),
            "GZXML" => Ok(Self::GzXml),
            "NATIVE" => Ok(Self::Native),
            "GZNATIVE" => Ok(Self::GzNative),
            _ => Err(QuakeLinkError::InvalidFormat(s.to_owned())),
        }
    }
}

/// A request format together with its version.
///
/// Versions below 1 clamp to 1. Version 1 renders without a suffix,
/// higher versions as `SUMMARY/2` etc.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormatSpec {
    format: RequestFormat,
    version: u32,
}

impl FormatSpec {
    pub fn new(format: RequestFormat, version: u32) -> Self {
        Self {
            format,
            version: version.max(1),
        }
    }

    pub fn format(&self) -> RequestFormat {
        self.format
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The ` AS <FMT>[/<version>]` request clause, leading space included.
    pub fn request_clause(&self) -> String {
        format!(" AS {self}")
    }

    /// Parse a `<FMT>[/<version>]` token.
    pub fn parse(s: &str) -> Result<Self> {
        let (format, version) = match s.split_once('/') {
            Some((format, version)) => {
                let version: u32 = version
                    .parse()
                    .map_err(|_| QuakeLinkError::InvalidFormat(s.to_owned()))?;
                (format, version)
            }
            None => (s, 1),
        };
        Ok(Self::new(RequestFormat::parse(format)?, version))
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self::new(RequestFormat::Summary, 1)
    }
}

impl From<RequestFormat> for FormatSpec {
    fn from(format: RequestFormat) -> Self {
        Self::new(format, 1)
    }
}

impl std::fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.version > 1 {
            write!(f, "{}/{}", self.format.as_str(), self.version)
        } else {
            write!(f, "{}", self.format.as_str())
        }
    }
}
