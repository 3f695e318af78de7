use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 12;

/// Normalized instrument ticker, e.g. `ES`, `MNQ` or `ES=F`.
///
/// The engine never interprets it beyond tagging output records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentSymbol(String);

impl InstrumentSymbol {
    /// Parse and normalize a ticker to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let mut chars = normalized.chars();

        let Some(first) = chars.next() else {
            return Err(ValidationError::EmptySymbol);
        };
        if !first.is_ascii_alphabetic() {
            return Err(ValidationError::SymbolInvalidStart { ch: first });
        }

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some((index, ch)) = normalized
            .chars()
            .enumerate()
            .find(|(_, ch)| !is_ticker_char(*ch))
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(normalized))
    }

    /// Parse a comma separated list such as `ES,NQ, gc`.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, ValidationError> {
        input
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_ticker_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '=' | '/')
}

impl Display for InstrumentSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentSymbol {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for InstrumentSymbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InstrumentSymbol> for String {
    fn from(value: InstrumentSymbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_futures_tickers() {
        assert_eq!(InstrumentSymbol::parse(" mes ").expect("parse").as_str(), "MES");
        assert_eq!(InstrumentSymbol::parse("es=f").expect("parse").as_str(), "ES=F");
    }

    #[test]
    fn rejects_digit_start() {
        let err = InstrumentSymbol::parse("6E").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidStart { ch: '6' }));
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = InstrumentSymbol::parse("NQ$").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { index: 2, .. }));
    }

    #[test]
    fn parses_comma_list_skipping_blanks() {
        let symbols = InstrumentSymbol::parse_list("ES, nq,,GC").expect("list");
        let names: Vec<&str> = symbols.iter().map(InstrumentSymbol::as_str).collect();
        assert_eq!(names, vec!["ES", "NQ", "GC"]);
    }
}
