use crate::domain::snapshot::Quote;
use crate::error::DerivationError;
use crate::report::config::krw_base;

pub const USD_KRW: &str = "USD/KRW";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedRates {
    /// In wanted-pair order, failed pairs omitted.
    pub rates: Vec<Quote>,
    /// Crosses were derived against 1 because USD/KRW was unusable.
    pub usd_krw_fallback: bool,
    pub failures: Vec<DerivationError>,
}

/// Builds `XXX/KRW` quotes from the USD-quoted legs in `quotes`.
///
/// `USD/KRW` passes through as-is. Every other pair is `usdKrw / USD/XXX`, and
/// carries the change fields of the `USD/XXX` leg unchanged. That change is
/// an approximation of the cross's own move, not a recomputation.
pub fn derive_krw_rates(quotes: &[Quote], wanted: &[String]) -> DerivedRates {
    let usd_krw = quotes.iter().find(|q| q.name == USD_KRW);
    let usd_krw_rate = usd_krw.and_then(|q| q.current_price).filter(|p| usable(*p));

    let mut out = DerivedRates::default();
    for pair in wanted {
        let res = if pair == USD_KRW {
            usd_krw.map(passthrough).ok_or_else(|| DerivationError::MissingLeg {
                pair: pair.clone(),
                leg: USD_KRW.to_string(),
            })
        } else {
            if usd_krw_rate.is_none() {
                out.usd_krw_fallback = true;
            }
            derive_cross(quotes, pair, usd_krw_rate.unwrap_or(1.0))
        };

        match res {
            Ok(quote) => out.rates.push(quote),
            Err(err) => out.failures.push(err),
        }
    }
    out
}

fn derive_cross(quotes: &[Quote], pair: &str, usd_krw: f64) -> Result<Quote, DerivationError> {
    let base = krw_base(pair).ok_or_else(|| DerivationError::MissingLeg {
        pair: pair.to_string(),
        leg: pair.to_string(),
    })?;
    let leg = format!("USD/{base}");

    let quote = quotes
        .iter()
        .find(|q| q.name == leg)
        .ok_or_else(|| DerivationError::MissingLeg {
            pair: pair.to_string(),
            leg: leg.clone(),
        })?;

    let price = quote
        .current_price
        .filter(|p| usable(*p))
        .ok_or_else(|| DerivationError::BadDenominator {
            pair: pair.to_string(),
            leg: leg.clone(),
            price: quote.current_price,
        })?;

    Ok(Quote {
        name: pair.to_string(),
        current_price: Some(usd_krw / price),
        change_amount: quote.change_amount,
        change_percent: quote.change_percent,
        extra: Default::default(),
    })
}

fn passthrough(q: &Quote) -> Quote {
    Quote {
        name: q.name.clone(),
        current_price: q.current_price,
        change_amount: q.change_amount,
        change_percent: q.change_percent,
        extra: Default::default(),
    }
}

fn usable(price: f64) -> bool {
    price.is_finite() && price != 0.0
}
