/// Result sub-stream a `DATA/SELECT/<KIND>` status line belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectKind {
    Archived,
    Updated,
    /// Forward compatible: an unrecognized sub-stream, kept verbatim.
    Other(String),
}

/// Classification of one non-header line read where a status is expected.
///
/// Matching mirrors the wire contract: `EOD/SELECT/ARCHIVED` by prefix,
/// `EOD/SELECT` only on exact match, `ALIVE` only on exact match. Status
/// codes that are absent or malformed parse as 0 so the caller treats the
/// line as an unexpected mode rather than a parse failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusLine {
    Alive,
    DataGet { code: u16 },
    DataSelect { kind: SelectKind, code: u16 },
    EodSelectArchived,
    EodSelect,
    Unknown(String),
}

impl StatusLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');

        if line == "ALIVE" {
            return Self::Alive;
        }
        if let Some(rest) = line.strip_prefix("DATA/GET") {
            return Self::DataGet {
                code: parse_code(rest),
            };
        }
        if let Some(rest) = line.strip_prefix("DATA/SELECT/") {
            let (kind, rest) = match rest.split_once(' ') {
                Some((kind, rest)) => (kind, rest),
                None => (rest, ""),
            };
            let kind = match kind {
                "ARCHIVED" => SelectKind::Archived,
                "UPDATED" => SelectKind::Updated,
                other => SelectKind::Other(other.to_owned()),
            };
            return Self::DataSelect {
                kind,
                code: parse_code(rest),
            };
        }
        if line.starts_with("EOD/SELECT/ARCHIVED") {
            return Self::EodSelectArchived;
        }
        if line == "EOD/SELECT" {
            return Self::EodSelect;
        }
        Self::Unknown(line.to_owned())
    }
}

fn parse_code(s: &str) -> u16 {
    s.split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(0)
}
