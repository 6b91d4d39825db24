use crate::domain::report::ReportKind;
use crate::domain::snapshot::{NewsSource, QuoteSource};
use crate::error::ConfigError;
use crate::report::config::{
    name_map, names, CalendarConfig, CountryMeta, FxConfig, Grouping, Highlight,
    InstrumentSection, Layout, ReportConfig,
};
use std::collections::BTreeMap;

const DEFAULT_MIN_IMPORTANCE: u8 = 2;

// (calendar name, ISO 3166-1 alpha-2, alpha-3)
const COUNTRIES: [(&str, &str, &str); 10] = [
    ("Euro Area", "EU", "EUR"),
    ("United Kingdom", "GB", "GBR"),
    ("Germany", "DE", "DEU"),
    ("France", "FR", "FRA"),
    ("United States", "US", "USA"),
    ("China", "CN", "CHN"),
    ("Japan", "JP", "JPN"),
    ("South Korea", "KR", "KOR"),
    ("Taiwan", "TW", "TWN"),
    ("Hong Kong", "HK", "HKG"),
];

const COMMODITIES: [&str; 4] = ["Gold", "WTI", "Brent", "NG"];
const MAJOR_CRYPTO: [&str; 2] = ["BTC", "ETH"];

impl ReportConfig {
    pub fn preset(kind: ReportKind) -> Result<Self, ConfigError> {
        let cfg = match kind {
            ReportKind::Asia => asia(),
            ReportKind::Usa => usa(),
            ReportKind::Global => global(),
            ReportKind::Futures => futures(),
            ReportKind::Btc => btc(),
            ReportKind::Tsla => tsla(),
        };
        cfg.validate()
    }
}

fn asia() -> ReportConfig {
    ReportConfig {
        kind: ReportKind::Asia,
        title: "아시아 증시 브리핑".to_string(),
        layout: Layout::Market,
        sections: vec![
            section("indices", QuoteSource::Indices, &["SSEC", "HSI", "N225", "KOSPI", "TWII"]),
            section("commodities", QuoteSource::Commodities, &COMMODITIES),
            section("cryptocurrency", QuoteSource::Cryptocurrency, &MAJOR_CRYPTO),
        ],
        fx: Some(fx(QuoteSource::ExchangeRates, &["CNY/KRW", "JPY/KRW", "USD/KRW"])),
        calendar: Some(calendar(&["China", "Japan", "South Korea", "Taiwan"], Grouping::Flat)),
        highlights: vec![],
        name_maps: BTreeMap::from([
            (
                "indexNameMap".to_string(),
                name_map(&[
                    ("SSEC", "상해종합지수"),
                    ("HSI", "항셍지수"),
                    ("N225", "닛케이 225"),
                    ("KOSPI", "코스피"),
                    ("TWII", "대만 가권"),
                ]),
            ),
            commodity_names(),
            (
                "exchangeRateMap".to_string(),
                name_map(&[("CNY/KRW", "위안/원"), ("JPY/KRW", "엔/원"), ("USD/KRW", "달러/원")]),
            ),
            crypto_names(),
        ]),
    }
}

fn usa() -> ReportConfig {
    ReportConfig {
        kind: ReportKind::Usa,
        title: "미국 증시 브리핑".to_string(),
        layout: Layout::Market,
        sections: vec![
            section(
                "indices",
                QuoteSource::Indices,
                &["S&P 500", "DJI", "NDX", "RUT", "SOX", "DXY"],
            ),
            section("commodities", QuoteSource::Commodities, &COMMODITIES),
            section("cryptocurrency", QuoteSource::Cryptocurrency, &MAJOR_CRYPTO),
            section(
                "treasury_yields",
                QuoteSource::TreasuryYields,
                &[
                    "2-Year Treasury Yield",
                    "10-Year Treasury Yield",
                    "30-Year Treasury Yield",
                ],
            ),
        ],
        fx: Some(fx(QuoteSource::ExchangeRates, &["USD/KRW"])),
        calendar: Some(calendar(&["United States"], Grouping::Flat)),
        highlights: vec![],
        name_maps: BTreeMap::from([
            (
                "indexNameMap".to_string(),
                name_map(&[
                    ("S&P 500", "S&P 500"),
                    ("DJI", "다우존스 산업평균지수"),
                    ("NDX", "나스닥 100"),
                    ("RUT", "러셀 2000"),
                    ("SOX", "필라델피아 반도체 지수"),
                    ("DXY", "달러 인덱스"),
                ]),
            ),
            commodity_names(),
            usd_krw_names(),
            crypto_names(),
            (
                "treasuryNameMap".to_string(),
                name_map(&[
                    ("2-Year Treasury Yield", "2년물"),
                    ("10-Year Treasury Yield", "10년물"),
                    ("30-Year Treasury Yield", "30년물"),
                ]),
            ),
        ]),
    }
}

fn global() -> ReportConfig {
    let all_countries: Vec<&str> = COUNTRIES.iter().map(|(name, _, _)| *name).collect();

    ReportConfig {
        kind: ReportKind::Global,
        title: "글로벌 마켓 브리핑".to_string(),
        layout: Layout::Market,
        sections: vec![
            section("us_indices", QuoteSource::Indices, &["S&P 500", "NDX", "DJI", "DXY"]),
            section("asia_indices", QuoteSource::Indices, &["SSEC", "N225", "KOSPI"]),
            section("europe_indices", QuoteSource::Indices, &["EU50", "UK100", "DAX"]),
            section("commodities", QuoteSource::Commodities, &COMMODITIES),
            section("cryptocurrency", QuoteSource::Cryptocurrency, &MAJOR_CRYPTO),
        ],
        fx: Some(fx(QuoteSource::ExchangeRates, &["USD/KRW", "EUR/KRW", "JPY/KRW"])),
        calendar: Some(calendar(&all_countries, Grouping::Flat)),
        highlights: vec![],
        name_maps: BTreeMap::from([
            (
                "indexNameMap".to_string(),
                name_map(&[
                    ("S&P 500", "S&P 500"),
                    ("NDX", "나스닥 100"),
                    ("DJI", "다우존스 산업평균지수"),
                    ("DXY", "달러 인덱스"),
                    ("SSEC", "상해종합지수"),
                    ("N225", "닛케이 225"),
                    ("KOSPI", "코스피"),
                    ("EU50", "유로스톡스 50"),
                    ("UK100", "FTSE 100"),
                    ("DAX", "DAX 40"),
                ]),
            ),
            commodity_names(),
            (
                "exchangeRateMap".to_string(),
                name_map(&[("USD/KRW", "달러/원"), ("EUR/KRW", "유로/원"), ("JPY/KRW", "엔/원")]),
            ),
            crypto_names(),
        ]),
    }
}

fn futures() -> ReportConfig {
    ReportConfig {
        kind: ReportKind::Futures,
        title: "선물 시장 브리핑".to_string(),
        layout: Layout::Market,
        sections: vec![
            section("indices", QuoteSource::Indices, &["NQ100", "HK40", "KOR200"]),
            section("commodities", QuoteSource::Commodities, &COMMODITIES),
            section("cryptocurrency", QuoteSource::Cryptocurrency, &MAJOR_CRYPTO),
        ],
        fx: Some(fx(QuoteSource::ExchangeRates, &["USD/KRW"])),
        calendar: Some(calendar(&["United States", "China", "South Korea"], Grouping::Flat)),
        highlights: vec![],
        name_maps: BTreeMap::from([
            (
                "indexNameMap".to_string(),
                name_map(&[("NQ100", "나스닥 100"), ("HK40", "항셍지수"), ("KOR200", "코스피 200")]),
            ),
            commodity_names(),
            usd_krw_names(),
            crypto_names(),
        ]),
    }
}

fn btc() -> ReportConfig {
    ReportConfig {
        kind: ReportKind::Btc,
        title: "비트코인 브리핑".to_string(),
        layout: Layout::Crypto,
        sections: vec![],
        fx: Some(fx(QuoteSource::UsaExchangeRates, &["USD/KRW"])),
        calendar: None,
        highlights: vec![
            Highlight::CryptoPrice {
                key: "bitcoin".to_string(),
                symbol: "BTC".to_string(),
                source: QuoteSource::CryptoPrices,
            },
            Highlight::News {
                key: "news".to_string(),
                source: NewsSource::Btc,
            },
        ],
        name_maps: BTreeMap::from([
            usd_krw_names(),
            ("cryptoNameMap".to_string(), name_map(&[("BTC", "비트코인")])),
            ("stockNameMap".to_string(), BTreeMap::new()),
        ]),
    }
}

fn tsla() -> ReportConfig {
    ReportConfig {
        kind: ReportKind::Tsla,
        title: "테슬라 브리핑".to_string(),
        layout: Layout::Stock,
        sections: vec![section(
            "cryptocurrency",
            QuoteSource::CryptoPrices,
            &MAJOR_CRYPTO,
        )],
        fx: Some(fx(QuoteSource::UsaExchangeRates, &["USD/KRW"])),
        calendar: None,
        highlights: vec![
            Highlight::Stock {
                key: "tesla".to_string(),
                stock: "tesla".to_string(),
            },
            Highlight::News {
                key: "news".to_string(),
                source: NewsSource::Usa,
            },
        ],
        name_maps: BTreeMap::from([
            usd_krw_names(),
            crypto_names(),
            ("stockNameMap".to_string(), name_map(&[("TSLA", "테슬라")])),
        ]),
    }
}

fn section(key: &str, source: QuoteSource, wanted: &[&str]) -> InstrumentSection {
    InstrumentSection {
        key: key.to_string(),
        source,
        names: names(wanted),
    }
}

fn fx(source: QuoteSource, wanted: &[&str]) -> FxConfig {
    FxConfig {
        source,
        wanted: names(wanted),
    }
}

fn calendar(countries: &[&str], grouping: Grouping) -> CalendarConfig {
    CalendarConfig {
        countries: countries.iter().filter_map(|name| country_meta(name)).collect(),
        min_importance: DEFAULT_MIN_IMPORTANCE,
        grouping,
    }
}

pub fn country_meta(name: &str) -> Option<CountryMeta> {
    COUNTRIES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(n, code, iso3)| CountryMeta {
            name: n.to_string(),
            code: code.to_string(),
            iso3: iso3.to_string(),
        })
}

fn commodity_names() -> (String, BTreeMap<String, String>) {
    (
        "commodityNameMap".to_string(),
        name_map(&[("Gold", "금"), ("WTI", "WTI 원유"), ("Brent", "브렌트유"), ("NG", "천연가스")]),
    )
}

fn crypto_names() -> (String, BTreeMap<String, String>) {
    (
        "cryptoNameMap".to_string(),
        name_map(&[("BTC", "비트코인"), ("ETH", "이더리움")]),
    )
}

fn usd_krw_names() -> (String, BTreeMap<String, String>) {
    ("exchangeRateMap".to_string(), name_map(&[("USD/KRW", "달러/원")]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_validates() {
        for kind in ReportKind::ALL {
            let cfg = ReportConfig::preset(kind).unwrap();
            assert_eq!(cfg.kind, kind);
        }
    }

    #[test]
    fn calendar_countries_all_have_metadata() {
        let asia = ReportConfig::preset(ReportKind::Asia).unwrap();
        let cal = asia.calendar.unwrap();
        assert_eq!(cal.countries.len(), 4);
        assert_eq!(cal.country("Japan").unwrap().iso3, "JPN");

        let global = ReportConfig::preset(ReportKind::Global).unwrap();
        assert_eq!(global.calendar.unwrap().countries.len(), COUNTRIES.len());
    }

    #[test]
    fn every_calendar_preset_is_flat_at_importance_two() {
        for kind in ReportKind::ALL {
            let Some(cal) = ReportConfig::preset(kind).unwrap().calendar else {
                continue;
            };
            assert_eq!(cal.grouping, Grouping::Flat, "{kind}");
            assert_eq!(cal.min_importance, 2, "{kind}");
        }
    }

    #[test]
    fn threshold_can_be_lowered_to_one() {
        let usa = ReportConfig::preset(ReportKind::Usa)
            .unwrap()
            .with_min_importance(1)
            .unwrap();
        assert_eq!(usa.calendar.unwrap().min_importance, 1);
    }

    #[test]
    fn single_asset_reports_read_usa_rates() {
        let btc = ReportConfig::preset(ReportKind::Btc).unwrap();
        assert_eq!(btc.fx.unwrap().source, QuoteSource::UsaExchangeRates);
        assert!(btc.calendar.is_none());
        assert_eq!(btc.layout, Layout::Crypto);
    }
}
