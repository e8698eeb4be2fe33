//! Chunk generation: turns a [`BillingTable`] into ordered, self-contained
//! text findings for a downstream language model.
//!
//! Sections, in order: total spend, top services, monthly trend and alerts,
//! top regions, top resources, waste analysis. Every chunk restates its own
//! context, so chunks can be retrieved and read in isolation.

use finops_core::formatting::{format_currency, format_percent, percentage};
use finops_core::models::{Chunk, ChunkKind, Outcome, YearMonth};
use finops_core::settings::ReportConfig;
use tracing::{debug, warn};

use crate::aggregator::{CostAggregator, CostGroup};
use crate::normalizer::{BillingTable, CanonicalField};

// ── ChunkGenerator ────────────────────────────────────────────────────────────

/// Builds report chunks according to a [`ReportConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChunkGenerator {
    config: ReportConfig,
}

impl ChunkGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Generate all chunks for `table`. Always yields at least one chunk.
    ///
    /// Without both `cost` and `service` the table is returned as a single
    /// raw text dump and the outcome is degraded.
    pub fn generate(&self, table: &BillingTable) -> Outcome<Vec<Chunk>> {
        let (Some(costs), Some(services)) =
            (table.costs(), table.texts(CanonicalField::Service))
        else {
            let missing: Vec<&str> = [CanonicalField::Cost, CanonicalField::Service]
                .into_iter()
                .filter(|f| !table.has(*f))
                .map(CanonicalField::name)
                .collect();
            let dump = Chunk::new(ChunkKind::RawDump, table.as_table().to_text());
            return Outcome::Degraded(
                vec![dump],
                vec![format!(
                    "missing required column(s): {}; emitted raw table dump",
                    missing.join(", ")
                )],
            );
        };

        let resource_ids = table.texts(CanonicalField::ResourceId);
        let total = CostAggregator::total(&costs);

        let mut chunks = vec![Chunk::new(
            ChunkKind::TotalSpend,
            format!("Total Cloud Spend: {}", format_currency(total)),
        )];

        self.push_services(&mut chunks, &services, &costs, total);

        if let Some(months) = table.months() {
            let monthly = CostAggregator::monthly(&months, &costs);
            self.push_monthly_trend(&mut chunks, &monthly);
        }

        if let Some(regions) = table.texts(CanonicalField::Region) {
            self.push_regions(&mut chunks, &regions, &costs);
        }

        if let Some(ids) = &resource_ids {
            self.push_resources(&mut chunks, ids, &services, &costs);
        }

        self.push_waste(&mut chunks, &services, resource_ids.as_deref(), &costs);

        debug!(
            "generated {} chunks from {} rows",
            chunks.len(),
            table.row_count()
        );
        Outcome::Ok(chunks)
    }

    // ── Sections ──────────────────────────────────────────────────────────────

    fn push_services(&self, chunks: &mut Vec<Chunk>, services: &[String], costs: &[f64], total: f64) {
        let groups = CostAggregator::group(services.iter().map(String::as_str).zip(costs.iter().copied()));
        for group in CostAggregator::top_n(groups, self.config.top_services) {
            chunks.push(Chunk::new(
                ChunkKind::Service,
                format!(
                    "Service: {}\nTotal Cost: {}\nShare of Bill: {}",
                    group.key,
                    format_currency(group.cost),
                    format_percent(percentage(group.cost, total))
                ),
            ));
        }
    }

    fn push_monthly_trend(&self, chunks: &mut Vec<Chunk>, monthly: &[CostGroup<YearMonth>]) {
        if monthly.is_empty() {
            return;
        }

        let lines: Vec<String> = monthly
            .iter()
            .map(|m| format!("{}: {}", m.key, format_currency(m.cost)))
            .collect();
        chunks.push(Chunk::new(
            ChunkKind::MonthlyTrend,
            format!("Monthly Spend Trend:\n{}", lines.join("\n")),
        ));

        for change in CostAggregator::month_over_month(monthly) {
            if change.change_pct.abs() <= self.config.alert_threshold_pct {
                continue;
            }
            let direction = if change.is_increase() {
                "increased"
            } else {
                "decreased"
            };
            chunks.push(Chunk::new(
                ChunkKind::SpendAlert,
                format!(
                    "ALERT: Spend {} by {} in {} compared to previous month.",
                    direction,
                    format_percent(change.change_pct.abs()),
                    change.month
                ),
            ));
        }
    }

    fn push_regions(&self, chunks: &mut Vec<Chunk>, regions: &[String], costs: &[f64]) {
        let groups = CostAggregator::group(regions.iter().map(String::as_str).zip(costs.iter().copied()));
        let lines: Vec<String> = CostAggregator::top_n(groups, self.config.top_regions)
            .into_iter()
            .map(|g| format!("{}: {}", g.key, format_currency(g.cost)))
            .collect();
        chunks.push(Chunk::new(
            ChunkKind::Regions,
            format!("Top Spending Regions:\n{}", lines.join("\n")),
        ));
    }

    fn push_resources(&self, chunks: &mut Vec<Chunk>, ids: &[String], services: &[String], costs: &[f64]) {
        let groups = CostAggregator::group(
            ids.iter()
                .map(String::as_str)
                .zip(services.iter().map(String::as_str))
                .zip(costs.iter().copied()),
        );

        chunks.push(Chunk::new(
            ChunkKind::ResourceHeader,
            format!(
                "Top {} Most Expensive Resources:",
                self.config.top_resources
            ),
        ));
        for group in CostAggregator::top_n(groups, self.config.top_resources) {
            let (id, service) = group.key;
            chunks.push(Chunk::new(
                ChunkKind::Resource,
                format!(
                    "Resource ID: {} ({})\nCost: {}",
                    id,
                    service,
                    format_currency(group.cost)
                ),
            ));
        }
    }

    fn push_waste(
        &self,
        chunks: &mut Vec<Chunk>,
        services: &[String],
        resource_ids: Option<&[String]>,
        costs: &[f64],
    ) {
        let candidates: Vec<usize> = (0..costs.len())
            .filter(|&i| {
                let resource_id = resource_ids.map(|ids| ids[i].as_str());
                is_waste_candidate(&services[i], resource_id, costs[i], &self.config)
            })
            .collect();

        if candidates.is_empty() {
            self.push_lowest_cost(chunks, services, resource_ids, costs);
            return;
        }

        debug!("{} rows flagged as waste candidates", candidates.len());
        chunks.push(Chunk::new(
            ChunkKind::WasteHeader,
            "POTENTIAL IDLE / WASTED RESOURCES (Snapshots, Unused IPs, Low Cost Debris):",
        ));

        match resource_ids {
            Some(ids) => {
                let groups = CostAggregator::group(
                    candidates
                        .iter()
                        .map(|&i| ((services[i].as_str(), ids[i].as_str()), costs[i])),
                );
                for group in CostAggregator::top_n(groups, self.config.top_waste_resources) {
                    let (service, id) = group.key;
                    chunks.push(Chunk::new(
                        ChunkKind::Waste,
                        format!(
                            "Resource: {} ({}) - Cost: {} (Potential Idle/Waste)",
                            id,
                            service,
                            format_currency(group.cost)
                        ),
                    ));
                }
            }
            None => {
                let groups = CostAggregator::group(
                    candidates
                        .iter()
                        .map(|&i| (services[i].as_str(), costs[i])),
                );
                for group in CostAggregator::top_n(groups, self.config.top_waste_services) {
                    chunks.push(Chunk::new(
                        ChunkKind::Waste,
                        format!(
                            "Service: {} - Total Waste/Idle Cost: {} (Check low-value resources)",
                            group.key,
                            format_currency(group.cost)
                        ),
                    ));
                }
            }
        }
    }

    fn push_lowest_cost(
        &self,
        chunks: &mut Vec<Chunk>,
        services: &[String],
        resource_ids: Option<&[String]>,
        costs: &[f64],
    ) {
        chunks.push(Chunk::new(
            ChunkKind::LowestCostHeader,
            "LOWEST COST RESOURCES (Candidates for Idle/Decommission Review):",
        ));

        let n = self.config.lowest_cost_items;
        match resource_ids {
            Some(ids) => {
                let groups = CostAggregator::group(
                    ids.iter()
                        .map(String::as_str)
                        .zip(services.iter().map(String::as_str))
                        .zip(costs.iter().copied()),
                );
                for group in CostAggregator::lowest_positive(groups, n) {
                    let (id, service) = group.key;
                    chunks.push(Chunk::new(
                        ChunkKind::LowestCost,
                        format!(
                            "Resource: {} ({}) - Cost: {}",
                            id,
                            service,
                            format_currency(group.cost)
                        ),
                    ));
                }
            }
            None => {
                let groups = CostAggregator::group(
                    services.iter().map(String::as_str).zip(costs.iter().copied()),
                );
                for group in CostAggregator::lowest_positive(groups, n) {
                    chunks.push(Chunk::new(
                        ChunkKind::LowestCost,
                        format!(
                            "Service: {} - Cost: {}",
                            group.key,
                            format_currency(group.cost)
                        ),
                    ));
                }
            }
        }
    }
}

// ── Free functions ────────────────────────────────────────────────────────────

/// Generate chunks with the default [`ReportConfig`], logging any fallback.
pub fn generate_chunks(table: &BillingTable) -> Vec<Chunk> {
    let (chunks, reasons) = ChunkGenerator::default().generate(table).into_parts();
    for reason in &reasons {
        warn!("chunk generation: {}", reason);
    }
    chunks
}

/// Whether a row looks like idle or forgotten spend.
///
/// True when the lower-cased service or resource id contains any configured
/// keyword (plain substring match, so `ip` also hits "Pipeline"), or when the
/// cost lies strictly between zero and the low-cost threshold.
pub fn is_waste_candidate(
    service: &str,
    resource_id: Option<&str>,
    cost: f64,
    config: &ReportConfig,
) -> bool {
    let service = service.to_lowercase();
    let resource_id = resource_id.map(str::to_lowercase);
    let keyword_hit = config.waste_keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        service.contains(&keyword)
            || resource_id
                .as_deref()
                .is_some_and(|id| id.contains(&keyword))
    });
    keyword_hit || (cost > 0.0 && cost < config.low_cost_threshold)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
