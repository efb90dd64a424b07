use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sector {
    pub name: String,
    pub symbols: Vec<String>,
}

impl Sector {
    pub fn new(name: &str, symbols: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Sector-grouped ticker list. A ticker may sit in more than one sector.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Portfolio {
    pub sectors: Vec<Sector>,
}

impl Portfolio {
    pub fn new(sectors: Vec<Sector>) -> Self {
        Self { sectors }
    }

    /// (sector, symbol) pairs in portfolio order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.sectors
            .iter()
            .flat_map(|sector| {
                sector
                    .symbols
                    .iter()
                    .map(move |symbol| (sector.name.clone(), symbol.clone()))
            })
            .collect()
    }

    pub fn sector_names(&self) -> Vec<&str> {
        self.sectors.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sector(&self, name: &str) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.sectors.iter().map(|s| s.symbols.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The dashboard's built-in watch list: Brazilian blue chips plus US tech.
pub fn default_portfolio() -> Portfolio {
    Portfolio::new(vec![
        Sector::new("Banks", &["ITUB4.SA", "BBDC4.SA", "SANB11.SA", "BBAS3.SA", "BPAC11.SA"]),
        Sector::new("Oil", &["PETR4.SA", "PETR3.SA", "PRIO3.SA", "RRRP3.SA"]),
        Sector::new("Mining", &["VALE3.SA", "CSNA3.SA", "USIM5.SA", "GGBR4.SA"]),
        Sector::new("Technology", &["AAPL", "GOOGL", "MSFT", "TSLA", "NVDA", "META"]),
        Sector::new("Retail", &["MGLU3.SA", "LREN3.SA", "AMER3.SA", "VVAR3.SA"]),
        Sector::new("Telecom", &["VIVT3.SA", "TIMS3.SA"]),
        Sector::new("Electric Power", &["ELET3.SA", "ELET6.SA", "CPFE3.SA", "ENBR3.SA"]),
        Sector::new("Food", &["JBSS3.SA", "BRFS3.SA", "MRFG3.SA"]),
        Sector::new("Pulp & Paper", &["SUZB3.SA", "KLBN11.SA"]),
        Sector::new("Steel", &["GOAU4.SA", "CSNA3.SA"]),
        Sector::new("Construction", &["MRVE3.SA", "CYRE3.SA", "EZTC3.SA"]),
    ])
}

/// Symbols offered in the comparison pickers.
pub const COMPARISON_SYMBOLS: [&str; 8] = [
    "AAPL", "GOOGL", "MSFT", "TSLA", "PETR4.SA", "VALE3.SA", "ITUB4.SA", "BBDC4.SA",
];
