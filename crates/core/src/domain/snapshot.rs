use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// date (YYYY-MM-DD) -> country name -> events in snapshot order.
pub type Calendar = BTreeMap<String, BTreeMap<String, Vec<CalendarEvent>>>;

/// One day's raw market document as stored upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub market_data: MarketData,
    #[serde(default)]
    pub usa: Option<UsaSection>,
    #[serde(default)]
    pub crypto: Option<CryptoSection>,
    #[serde(default)]
    pub stocks: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub indices: Option<Vec<Quote>>,
    #[serde(default)]
    pub commodities: Option<Vec<Quote>>,
    #[serde(default)]
    pub exchange_rates: Option<Vec<Quote>>,
    #[serde(default)]
    pub cryptocurrency: Option<Vec<Quote>>,
    #[serde(default)]
    pub treasury_yields: Option<Vec<Quote>>,
    #[serde(default)]
    pub economic_calendar: Option<Calendar>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsaSection {
    #[serde(default)]
    pub exchange_rates: Option<Vec<Quote>>,
    #[serde(default)]
    pub news: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CryptoSection {
    #[serde(default)]
    pub prices: Option<Vec<Quote>>,
    #[serde(default)]
    pub btc: Option<CoinSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinSection {
    #[serde(default)]
    pub market_cap: Option<MarketCap>,
    #[serde(default)]
    pub news: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketCap {
    pub value: Option<f64>,
}

/// A priced instrument. Kind-specific fields (market cap, volume, ...) ride
/// along in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub change_amount: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Quote {
    pub fn new(name: impl Into<String>, current_price: f64) -> Self {
        Self {
            name: name.into(),
            current_price: Some(current_price),
            change_amount: None,
            change_percent: None,
            extra: Map::new(),
        }
    }

    pub fn with_change(mut self, amount: f64, percent: f64) -> Self {
        self.change_amount = Some(amount);
        self.change_percent = Some(percent);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub date: String,
    pub importance: u8,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Where in the snapshot a list of quotes lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    Indices,
    Commodities,
    ExchangeRates,
    Cryptocurrency,
    TreasuryYields,
    UsaExchangeRates,
    CryptoPrices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsSource {
    Usa,
    Btc,
}

impl Snapshot {
    /// Missing or null lists read as empty.
    pub fn quotes(&self, source: QuoteSource) -> &[Quote] {
        let list = match source {
            QuoteSource::Indices => self.market_data.indices.as_ref(),
            QuoteSource::Commodities => self.market_data.commodities.as_ref(),
            QuoteSource::ExchangeRates => self.market_data.exchange_rates.as_ref(),
            QuoteSource::Cryptocurrency => self.market_data.cryptocurrency.as_ref(),
            QuoteSource::TreasuryYields => self.market_data.treasury_yields.as_ref(),
            QuoteSource::UsaExchangeRates => {
                self.usa.as_ref().and_then(|u| u.exchange_rates.as_ref())
            }
            QuoteSource::CryptoPrices => self.crypto.as_ref().and_then(|c| c.prices.as_ref()),
        };
        list.map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn news(&self, source: NewsSource) -> &[Value] {
        let list = match source {
            NewsSource::Usa => self.usa.as_ref().and_then(|u| u.news.as_ref()),
            NewsSource::Btc => self
                .crypto
                .as_ref()
                .and_then(|c| c.btc.as_ref())
                .and_then(|b| b.news.as_ref()),
        };
        list.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Per-coin detail section. Only BTC is published upstream.
    pub fn coin(&self, symbol: &str) -> Option<&CoinSection> {
        let crypto = self.crypto.as_ref()?;
        if symbol.eq_ignore_ascii_case("BTC") {
            crypto.btc.as_ref()
        } else {
            None
        }
    }

    pub fn coin_market_cap(&self, symbol: &str) -> Option<f64> {
        self.coin(symbol)
            .and_then(|c| c.market_cap.as_ref())
            .and_then(|m| m.value)
    }

    pub fn calendar(&self) -> Option<&Calendar> {
        self.market_data.economic_calendar.as_ref()
    }
}
