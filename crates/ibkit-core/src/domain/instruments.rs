use serde::Serialize;

use crate::InstrumentSymbol;

/// Contract size class of a futures instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractSize {
    Mini,
    Micro,
}

/// Static metadata for a supported futures instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstrumentInfo {
    pub symbol: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Continuous-contract ticker used by market-data vendors.
    pub data_ticker: &'static str,
    pub contract: ContractSize,
    /// Typical price level, used to seed synthetic data.
    pub reference_price: f64,
}

const CATALOG: [InstrumentInfo; 8] = [
    InstrumentInfo {
        symbol: "ES",
        name: "E-mini S&P 500",
        description: "S&P 500 Mini Contract",
        data_ticker: "ES=F",
        contract: ContractSize::Mini,
        reference_price: 4500.0,
    },
    InstrumentInfo {
        symbol: "MES",
        name: "Micro E-mini S&P 500",
        description: "S&P 500 Micro Contract",
        data_ticker: "MES=F",
        contract: ContractSize::Micro,
        reference_price: 4500.0,
    },
    InstrumentInfo {
        symbol: "NQ",
        name: "E-mini Nasdaq-100",
        description: "Nasdaq Mini Contract",
        data_ticker: "NQ=F",
        contract: ContractSize::Mini,
        reference_price: 15000.0,
    },
    InstrumentInfo {
        symbol: "MNQ",
        name: "Micro E-mini Nasdaq-100",
        description: "Nasdaq Micro Contract",
        data_ticker: "MNQ=F",
        contract: ContractSize::Micro,
        reference_price: 15000.0,
    },
    InstrumentInfo {
        symbol: "GC",
        name: "Gold Futures",
        description: "Gold Mini Contract",
        data_ticker: "GC=F",
        contract: ContractSize::Mini,
        reference_price: 2000.0,
    },
    InstrumentInfo {
        symbol: "MGC",
        name: "Micro Gold Futures",
        description: "Gold Micro Contract",
        data_ticker: "MGC=F",
        contract: ContractSize::Micro,
        reference_price: 2000.0,
    },
    InstrumentInfo {
        symbol: "CL",
        name: "Crude Oil Futures",
        description: "Crude Oil Mini Contract",
        data_ticker: "CL=F",
        contract: ContractSize::Mini,
        reference_price: 75.0,
    },
    InstrumentInfo {
        symbol: "MCL",
        name: "Micro Crude Oil Futures",
        description: "Crude Oil Micro Contract",
        data_ticker: "MCL=F",
        contract: ContractSize::Micro,
        reference_price: 75.0,
    },
];

pub fn all() -> &'static [InstrumentInfo] {
    &CATALOG
}

pub fn lookup(symbol: &InstrumentSymbol) -> Option<&'static InstrumentInfo> {
    CATALOG.iter().find(|info| info.symbol == symbol.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_pairs_every_mini_with_a_micro() {
        let minis = all().iter().filter(|i| i.contract == ContractSize::Mini).count();
        let micros = all().iter().filter(|i| i.contract == ContractSize::Micro).count();
        assert_eq!(minis, 4);
        assert_eq!(micros, 4);
    }

    #[test]
    fn lookup_by_symbol() {
        let symbol = InstrumentSymbol::parse("mnq").expect("symbol");
        let info = lookup(&symbol).expect("MNQ is catalogued");
        assert_eq!(info.data_ticker, "MNQ=F");

        let unknown = InstrumentSymbol::parse("ZB").expect("symbol");
        assert!(lookup(&unknown).is_none());
    }
}
