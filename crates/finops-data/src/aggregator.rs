//! Cost aggregation by arbitrary keys and by calendar month.

use std::collections::BTreeMap;

use finops_core::formatting::percent_change;
use finops_core::models::YearMonth;

// ── CostGroup ─────────────────────────────────────────────────────────────────

/// Summed cost of all rows sharing one key.
#[derive(Debug, Clone, PartialEq)]
pub struct CostGroup<K> {
    pub key: K,
    pub cost: f64,
}

// ── MonthChange ───────────────────────────────────────────────────────────────

/// Spend movement between a month and the month before it in the series.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthChange {
    pub month: YearMonth,
    /// Relative change in percent; negative for a decrease.
    pub change_pct: f64,
}

impl MonthChange {
    pub fn is_increase(&self) -> bool {
        self.change_pct > 0.0
    }
}

// ── CostAggregator ────────────────────────────────────────────────────────────

/// Stateless helper that groups row costs.
pub struct CostAggregator;

impl CostAggregator {
    /// Sum of all costs.
    pub fn total(costs: &[f64]) -> f64 {
        costs.iter().sum()
    }

    /// Sum costs per key.
    ///
    /// Returns groups sorted by key (ascending), which is also the tie-break
    /// order used by [`CostAggregator::top_n`].
    pub fn group<K: Ord>(rows: impl IntoIterator<Item = (K, f64)>) -> Vec<CostGroup<K>> {
        let mut map: BTreeMap<K, f64> = BTreeMap::new();
        for (key, cost) in rows {
            *map.entry(key).or_insert(0.0) += cost;
        }
        map.into_iter()
            .map(|(key, cost)| CostGroup { key, cost })
            .collect()
    }

    /// The `n` most expensive groups, descending by cost.
    ///
    /// The sort is stable, so equal costs keep their incoming order.
    pub fn top_n<K>(mut groups: Vec<CostGroup<K>>, n: usize) -> Vec<CostGroup<K>> {
        groups.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        groups.truncate(n);
        groups
    }

    /// The `n` cheapest groups with a strictly positive cost, ascending.
    pub fn lowest_positive<K>(groups: Vec<CostGroup<K>>, n: usize) -> Vec<CostGroup<K>> {
        let mut positive: Vec<CostGroup<K>> = groups.into_iter().filter(|g| g.cost > 0.0).collect();
        positive.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        positive.truncate(n);
        positive
    }

    /// Sum costs per calendar month, chronologically.
    ///
    /// Rows without a month are left out.
    pub fn monthly(months: &[Option<YearMonth>], costs: &[f64]) -> Vec<CostGroup<YearMonth>> {
        Self::group(
            months
                .iter()
                .zip(costs)
                .filter_map(|(month, cost)| month.map(|m| (m, *cost))),
        )
    }

    /// Percent change of every month against the previous month in the
    /// series.
    ///
    /// The first month has no predecessor and is skipped, as is any month
    /// whose predecessor spent exactly zero.
    pub fn month_over_month(monthly: &[CostGroup<YearMonth>]) -> Vec<MonthChange> {
        monthly
            .windows(2)
            .filter_map(|pair| {
                let (prev, curr) = (&pair[0], &pair[1]);
                percent_change(prev.cost, curr.cost).map(|change_pct| MonthChange {
                    month: curr.key,
                    change_pct,
                })
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
