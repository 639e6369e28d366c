/// The five sections of the "Markets at a glance" page, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketType {
    Equities,
    Rates,
    Credit,
    Commodities,
    ExchangeRates,
}

impl MarketType {
    pub const ALL: [MarketType; 5] = [
        MarketType::Equities,
        MarketType::Rates,
        MarketType::Credit,
        MarketType::Commodities,
        MarketType::ExchangeRates,
    ];

    /// Section title as printed in the first cell of its title row.
    pub fn title(self) -> &'static str {
        match self {
            MarketType::Equities => "Equities",
            MarketType::Rates => "Rates (government bonds)",
            MarketType::Credit => "Credit",
            MarketType::Commodities => "Commodities",
            MarketType::ExchangeRates => "Exchange rates",
        }
    }

    pub fn from_title(title: &str) -> Option<MarketType> {
        let title = title.trim();
        MarketType::ALL.into_iter().find(|m| m.title() == title)
    }

    /// Title lowercased, spaces to underscores, parentheses removed.
    /// Used for table names and CSV file names.
    pub fn slug(self) -> String {
        self.title()
            .to_lowercase()
            .replace(' ', "_")
            .replace(['(', ')'], "")
    }

    pub fn db_table(self) -> &'static str {
        match self {
            MarketType::Equities => "equities",
            MarketType::Rates => "rates",
            MarketType::Credit => "credit",
            MarketType::Commodities => "commodities",
            MarketType::ExchangeRates => "exchange_rates",
        }
    }

    /// Header of the quoted value column on the page.
    pub fn value_header(self) -> &'static str {
        match self {
            MarketType::Rates => "Yield (%)",
            MarketType::Credit => "QAS (bp)",
            _ => "Price",
        }
    }

    /// Name of the quoted value column in the database.
    pub fn value_column(self) -> &'static str {
        match self {
            MarketType::Rates => "yield",
            MarketType::Credit => "spread",
            _ => "price",
        }
    }
}
