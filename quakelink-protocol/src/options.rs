use bitflags::bitflags;

bitflags! {
    /// Session toggles negotiated with `SET` commands.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Options: u32 {
        /// Reset all options server-side before applying the rest.
        const DEFAULTS = 1 << 0;
        const XML_INDENT = 1 << 1;
        const DATA_PICKS = 1 << 2;
        const DATA_AMPLITUDES = 1 << 3;
        const DATA_STAMAGS = 1 << 4;
        const DATA_ARRIVALS = 1 << 5;
        const DATA_STAMTS = 1 << 6;
        const DATA_PREFERRED = 1 << 7;
        const KEEPALIVE = 1 << 8;
    }
}

/// One toggleable session option with its `SET` wire token.
///
/// `DEFAULTS` is not listed here: it is emitted as a bare `SET DEFAULTS`,
/// always before any other `SET` command.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionOption {
    XmlIndent,
    DataPicks,
    DataAmplitudes,
    DataStaMags,
    DataArrivals,
    DataStaMts,
    DataPreferred,
    KeepAlive,
}

impl SessionOption {
    /// All options in wire emission order.
    pub const ALL: [SessionOption; 8] = [
        Self::XmlIndent,
        Self::DataPicks,
        Self::DataAmplitudes,
        Self::DataStaMags,
        Self::DataArrivals,
        Self::DataStaMts,
        Self::DataPreferred,
        Self::KeepAlive,
    ];

    /// The `SET` command token.
    pub fn token(self) -> &'static str {
        match self {
            Self::XmlIndent => "XML.INDENT",
            Self::DataPicks => "DATA.PICKS",
            Self::DataAmplitudes => "DATA.AMPLITUDES",
            Self::DataStaMags => "DATA.STAMAGS",
            Self::DataArrivals => "DATA.ARRIVALS",
            Self::DataStaMts => "DATA.STAMTS",
            Self::DataPreferred => "DATA.PREFERRED",
            Self::KeepAlive => "KEEPALIVE",
        }
    }

    /// The corresponding bit in the [`Options`] mask.
    pub fn bit(self) -> Options {
        match self {
            Self::XmlIndent => Options::XML_INDENT,
            Self::DataPicks => Options::DATA_PICKS,
            Self::DataAmplitudes => Options::DATA_AMPLITUDES,
            Self::DataStaMags => Options::DATA_STAMAGS,
            Self::DataArrivals => Options::DATA_ARRIVALS,
            Self::DataStaMts => Options::DATA_STAMTS,
            Self::DataPreferred => Options::DATA_PREFERRED,
            Self::KeepAlive => Options::KEEPALIVE,
        }
    }

    /// Reverse lookup from a `SET` token.
    pub fn parse_token(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.token().eq_ignore_ascii_case(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_roundtrip() {
        for option in SessionOption::ALL {
            assert_eq!(SessionOption::parse_token(option.token()), Some(option));
        }
    }

    #[test]
    fn parse_token_case_insensitive() {
        assert_eq!(
            SessionOption::parse_token("xml.indent"),
            Some(SessionOption::XmlIndent)
        );
    }

    #[test]
    fn parse_token_unknown() {
        assert_eq!(SessionOption::parse_token("DEFAULTS"), None);
        assert_eq!(SessionOption::parse_token("DATA.FOO"), None);
    }

    #[test]
    fn bits_are_distinct() {
        let mut seen = Options::empty();
        for option in SessionOption::ALL {
            assert!(!seen.intersects(option.bit()));
            seen |= option.bit();
        }
        assert!(!seen.contains(Options::DEFAULTS));
    }
}
