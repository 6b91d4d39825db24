use crate::domain::snapshot::Quote;
use std::collections::HashSet;

/// Quotes whose name is in `wanted`, in snapshot order.
pub fn filter_quotes(quotes: &[Quote], wanted: &[String]) -> Vec<Quote> {
    let allow: HashSet<&str> = wanted.iter().map(String::as_str).collect();
    quotes
        .iter()
        .filter(|q| allow.contains(q.name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wanted(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_snapshot_order_not_wanted_order() {
        let quotes = vec![
            Quote::new("N225", 38000.0),
            Quote::new("DAX", 18500.0),
            Quote::new("KOSPI", 2700.0),
            Quote::new("SSEC", 3050.0),
        ];
        let out = filter_quotes(&quotes, &wanted(&["SSEC", "KOSPI", "N225"]));
        let names: Vec<_> = out.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, ["N225", "KOSPI", "SSEC"]);
    }

    #[test]
    fn missing_kind_is_empty() {
        assert!(filter_quotes(&[], &wanted(&["KOSPI"])).is_empty());
        assert!(filter_quotes(&[Quote::new("KOSPI", 1.0)], &[]).is_empty());
    }

    #[test]
    fn duplicates_in_snapshot_are_kept() {
        let quotes = vec![Quote::new("Gold", 2300.0), Quote::new("Gold", 2301.0)];
        assert_eq!(filter_quotes(&quotes, &wanted(&["Gold"])).len(), 2);
    }
}
