// Ranking of contributing crash factors across every factor slot.

use crate::types::{Dataset, FactorCount};
use once_cell::sync::Lazy;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Factor value that carries no information and is never counted.
pub const UNSPECIFIED: &str = "Unspecified";

pub const TOP_FACTORS: usize = 10;

/// Known spelling variants in the city export, mapped to the spelling used
/// in the chart.
pub static FACTOR_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Illnes", "Illness"),
        ("Drugs (Illegal)", "Drugs (illegal)"),
        ("Cell Phone (hand-held)", "Cell Phone (hand-Held)"),
        (
            "Reaction to Other Uninvolved Vehicle",
            "Reaction to Uninvolved Vehicle",
        ),
    ])
});

/// Resolve `value` through `aliases`; unknown values pass through.
pub fn canonical_factor<'a>(value: &'a str, aliases: &HashMap<&str, &'a str>) -> &'a str {
    aliases.get(value).copied().unwrap_or(value)
}

/// Count every factor mention over all slots and keep the `limit` most
/// frequent.
///
/// Ranking is by count descending, then factor name ascending, so equal
/// counts always pick the same factors. The result is returned smallest
/// first, which is the order a horizontal bar chart draws bottom to top.
pub fn top_factors(
    data: &Dataset,
    aliases: &HashMap<&str, &str>,
    limit: usize,
) -> Vec<FactorCount> {
    let counts = count_factors(data, aliases);
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|&(factor, count)| (Reverse(count), factor));
    ranked.truncate(limit);
    ranked.reverse();
    log::debug!("top factors: {ranked:?}");
    ranked
        .into_iter()
        .map(|(factor, crashes)| FactorCount {
            factor: factor.to_string(),
            crashes,
        })
        .collect()
}

/// Occurrences per canonical factor, `Unspecified` excluded.
pub fn count_factors<'a>(
    data: &'a Dataset,
    aliases: &HashMap<&str, &'a str>,
) -> HashMap<&'a str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for slot in 0..data.factor_slots {
        for (_, record) in data.identified() {
            let Some(value) = record.factors.get(slot).and_then(Option::as_deref) else {
                continue;
            };
            let factor = canonical_factor(value, aliases);
            if factor == UNSPECIFIED {
                continue;
            }
            *counts.entry(factor).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CrashRecord;

    fn record(id: &str, factors: &[Option<&str>]) -> CrashRecord {
        CrashRecord {
            collision_id: Some(id.to_string()),
            factors: factors.iter().map(|f| f.map(str::to_string)).collect(),
            ..Default::default()
        }
    }

    fn dataset(records: Vec<CrashRecord>) -> Dataset {
        let factor_slots = records.iter().map(|r| r.factors.len()).max().unwrap_or(0);
        Dataset {
            records,
            factor_slots,
        }
    }

    #[test]
    fn test_aliases_share_one_bucket_across_slots() {
        let data = dataset(vec![
            record("1", &[Some("Illness"), None]),
            record("2", &[None, Some("Illnes")]),
        ]);
        let top = top_factors(&data, &FACTOR_ALIASES, TOP_FACTORS);
        assert_eq!(
            top,
            vec![FactorCount {
                factor: "Illness".into(),
                crashes: 2
            }]
        );
        assert!(top.iter().all(|f| f.factor != "Illnes"));
    }

    #[test]
    fn test_unspecified_is_never_counted() {
        let data = dataset(vec![
            record("1", &[Some("Unspecified"), Some("Unspecified")]),
            record("2", &[Some("Fatigued/Drowsy"), Some("Unspecified")]),
        ]);
        let top = top_factors(&data, &FACTOR_ALIASES, TOP_FACTORS);
        assert_eq!(top.len(), 1);
        assert!(top.iter().all(|f| f.factor != UNSPECIFIED));
    }

    #[test]
    fn test_keeps_ten_highest_ascending_with_name_tie_break() {
        let mut records = Vec::new();
        let mut id = 0;
        // "F{nn}" appears nn times; "A" and "B" tie with F05.
        for n in 1..=12 {
            for _ in 0..n {
                id += 1;
                records.push(record(&id.to_string(), &[Some(format!("F{n:02}").as_str())]));
            }
        }
        for name in ["A", "B"] {
            for _ in 0..5 {
                id += 1;
                records.push(record(&id.to_string(), &[Some(name)]));
            }
        }
        let top = top_factors(&dataset(records), &FACTOR_ALIASES, TOP_FACTORS);
        let names: Vec<&str> = top.iter().map(|f| f.factor.as_str()).collect();
        assert_eq!(
            names,
            vec!["F05", "B", "A", "F06", "F07", "F08", "F09", "F10", "F11", "F12"]
        );
        assert!(top.windows(2).all(|w| w[0].crashes <= w[1].crashes));
    }

    #[test]
    fn test_fewer_than_limit_returns_all() {
        let data = dataset(vec![
            record("1", &[Some("Passing Too Closely")]),
            record("2", &[Some("Unsafe Speed")]),
            record("3", &[Some("Unsafe Speed")]),
        ]);
        let top = top_factors(&data, &FACTOR_ALIASES, TOP_FACTORS);
        assert_eq!(top.len(), 2);
        assert_eq!(top.last().map(|f| f.factor.as_str()), Some("Unsafe Speed"));
    }

    #[test]
    fn test_records_without_id_are_skipped() {
        let mut anonymous = record("x", &[Some("Unsafe Speed")]);
        anonymous.collision_id = None;
        let data = dataset(vec![anonymous, record("1", &[Some("Unsafe Speed")])]);
        let counts = count_factors(&data, &FACTOR_ALIASES);
        assert_eq!(counts.get("Unsafe Speed"), Some(&1));
    }
}
