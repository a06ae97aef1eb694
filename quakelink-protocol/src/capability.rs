//! Which format versions a server supports, derived from its API level.
//!
//! Version 1 of every format is implicitly supported by all servers. For
//! versions >= 2 a format carries an ordered list of minimum API levels,
//! index 0 corresponding to version 2.

use crate::format::RequestFormat;

const SUMMARY_MIN_API: &[u32] = &[2];

fn min_api_levels(format: RequestFormat) -> &'static [u32] {
    match format {
        RequestFormat::Summary => SUMMARY_MIN_API,
        RequestFormat::Xml
        | RequestFormat::GzXml
        | RequestFormat::Native
        | RequestFormat::GzNative => &[],
    }
}

/// True if a server at `server_api` supports `version` of `format`.
pub fn is_supported(format: RequestFormat, version: u32, server_api: u32) -> bool {
    if version <= 1 {
        return true;
    }
    match min_api_levels(format).get(version as usize - 2) {
        Some(&min_api) => server_api >= min_api,
        None => false,
    }
}

/// Highest supported version of `format` at `server_api`, counting up from 1
/// while consecutive thresholds are met.
pub fn max_supported_version(format: RequestFormat, server_api: u32) -> u32 {
    let mut version = 1;
    for &min_api in min_api_levels(format) {
        if server_api < min_api {
            break;
        }
        version += 1;
    }
    version
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_one_always_supported() {
        for format in [
            RequestFormat::Summary,
            RequestFormat::Xml,
            RequestFormat::GzXml,
            RequestFormat::Native,
            RequestFormat::GzNative,
        ] {
            assert!(is_supported(format, 1, 0));
            assert!(is_supported(format, 1, 99));
        }
    }

    #[test]
    fn summary_v2_needs_api_2() {
        assert!(!is_supported(RequestFormat::Summary, 2, 0));
        assert!(!is_supported(RequestFormat::Summary, 2, 1));
        assert!(is_supported(RequestFormat::Summary, 2, 2));
        assert!(is_supported(RequestFormat::Summary, 2, 7));
    }

    #[test]
    fn unknown_version_unsupported() {
        assert!(!is_supported(RequestFormat::Summary, 3, 99));
        assert!(!is_supported(RequestFormat::Xml, 2, 99));
    }

    #[test]
    fn max_supported_version_walk() {
        assert_eq!(max_supported_version(RequestFormat::Summary, 0), 1);
        assert_eq!(max_supported_version(RequestFormat::Summary, 1), 1);
        assert_eq!(max_supported_version(RequestFormat::Summary, 2), 2);
        assert_eq!(max_supported_version(RequestFormat::Summary, 5), 2);
        assert_eq!(max_supported_version(RequestFormat::Xml, 5), 1);
    }
}
