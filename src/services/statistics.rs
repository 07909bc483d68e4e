//! Monthly fulfillment and AOI defect statistics.
//!
//! The aggregation itself lives in pure functions (`reconcile_order_month`,
//! `aggregate_aoi_period`, `merge_reference_tags`) so it can be exercised
//! without a database; `StatisticsService` only fetches rows for them.

use crate::{
    db::DbPool,
    entities::{aoi_record, production_schedule, DefectKind, TbType},
    errors::ServiceError,
    models::{LotKey, OrderMonth},
    services::aoi::cumulative_inspected_qty,
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Outcome of comparing produced quantity with the ordered quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    Normal,
    Shortage,
    /// Top and bottom sides diverge although the order looks fulfilled.
    Imbalance,
}

/// Per-model fulfillment for one order month.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderMonthSummary {
    pub model: String,
    pub order_month: i32,
    pub order_year: i32,
    pub total_quantity: i64,
    pub actual_production: i64,
    pub fulfillment_rate: f64,
    pub status: FulfillmentStatus,
}

#[derive(Default)]
struct ModelTally {
    top: i64,
    bot: i64,
    top_overflow: i64,
    bottom_overflow: i64,
    total_qty: i64,
    counted_orders: HashSet<(i32, Option<i32>)>,
}

/// Reconciles Top/Bot production against order quantities, one entry per
/// model in first-seen order.
///
/// An order's `total_quantity` is counted once per (model, total, order year)
/// no matter how many schedule rows it was split into. When any overflow line
/// produced the model, every side is summed; otherwise the board count is the
/// lesser of the two sides.
pub fn reconcile_order_month(
    rows: &[production_schedule::Model],
    order_year: i32,
    order_month: OrderMonth,
) -> Vec<OrderMonthSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut tallies: HashMap<&str, ModelTally> = HashMap::new();

    for row in rows {
        let tally = tallies.entry(row.model.as_str()).or_insert_with(|| {
            order.push(row.model.as_str());
            ModelTally::default()
        });

        let produced = i64::from(row.actual_prod);
        match row.tb {
            Some(TbType::Top) => tally.top += produced,
            Some(TbType::Bot) => tally.bot += produced,
            Some(TbType::TopOverflow) => tally.top_overflow += produced,
            Some(TbType::BottomOverflow) => tally.bottom_overflow += produced,
            None => {}
        }

        if tally
            .counted_orders
            .insert((row.total_quantity, row.order_year))
        {
            tally.total_qty += i64::from(row.total_quantity);
        }
    }

    order
        .into_iter()
        .filter_map(|model| tallies.remove(model).map(|tally| (model, tally)))
        .map(|(model, tally)| {
            let paired = !(tally.top_overflow > 0 || tally.bottom_overflow > 0);
            let achieved = if paired {
                tally.top.min(tally.bot)
            } else {
                tally.top_overflow + tally.bottom_overflow + tally.top + tally.bot
            };

            let status = if paired && tally.top != tally.bot && achieved == tally.total_qty {
                FulfillmentStatus::Imbalance
            } else if achieved != tally.total_qty {
                FulfillmentStatus::Shortage
            } else {
                FulfillmentStatus::Normal
            };

            let fulfillment_rate = if tally.total_qty > 0 {
                achieved as f64 / tally.total_qty as f64 * 100.0
            } else {
                0.0
            };

            OrderMonthSummary {
                model: model.to_string(),
                order_month: order_month.as_i32(),
                order_year,
                total_quantity: tally.total_qty,
                actual_production: achieved,
                fulfillment_rate,
                status,
            }
        })
        .collect()
}

/// Merges comma-separated reference tags: trims, drops blanks, removes exact
/// duplicates and sorts, joining with `", "`.
pub fn merge_reference_tags<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let tags: BTreeSet<&str> = values
        .into_iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.into_iter().collect::<Vec<_>>().join(", ")
}

/// Defect counts keyed by kind, serialized as a map in display order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefectCounts(pub Vec<(DefectKind, i64)>);

impl DefectCounts {
    pub fn get(&self, kind: DefectKind) -> i64 {
        self.0
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

impl Serialize for DefectCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (kind, count) in &self.0 {
            map.serialize_entry(kind.name(), count)?;
        }
        map.end()
    }
}

/// Reference tags keyed by `<kind>_ref`, serialized in display order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceTags(pub Vec<(DefectKind, String)>);

impl ReferenceTags {
    pub fn get(&self, kind: DefectKind) -> &str {
        self.0
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, tags)| tags.as_str())
            .unwrap_or("")
    }
}

impl Serialize for ReferenceTags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (kind, tags) in &self.0 {
            map.serialize_entry(&kind.ref_name(), tags)?;
        }
        map.end()
    }
}

/// Defect totals of one lot over an inspection window.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AoiPeriodSummary {
    pub model: String,
    pub order_year: i32,
    pub order_month: i32,
    pub lot: String,
    /// `"YYYY-MM-DD"` or `"first ~ last"` when the lot spans several days
    pub period: String,
    pub record_count: usize,
    pub inspection_qty: i64,
    pub good_qty: i64,
    pub total_defect: i64,
    #[schema(value_type = Object)]
    pub defects: DefectCounts,
    #[schema(value_type = Object)]
    pub references: ReferenceTags,
    /// All-time inspected quantity for the lot, independent of the window
    pub cumulative_qty: i64,
    pub defect_rate: f64,
}

/// Folds AOI records into one summary per lot, sorted by
/// (model, order year, order month, lot).
///
/// `cumulative` supplies the all-time inspected quantity per lot; lots
/// missing from it report 0.
pub fn aggregate_aoi_period(
    records: &[aoi_record::Model],
    cumulative: &HashMap<LotKey, i64>,
) -> Vec<AoiPeriodSummary> {
    let mut groups: BTreeMap<LotKey, Vec<&aoi_record::Model>> = BTreeMap::new();
    for record in records {
        groups.entry(LotKey::from(record)).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let defects = DefectCounts(
                DefectKind::ALL
                    .iter()
                    .map(|kind| {
                        let total = members
                            .iter()
                            .map(|r| i64::from(r.defect_count(*kind)))
                            .sum();
                        (*kind, total)
                    })
                    .collect(),
            );
            let references = ReferenceTags(
                DefectKind::ALL
                    .iter()
                    .map(|kind| {
                        let merged =
                            merge_reference_tags(members.iter().map(|r| r.defect_ref(*kind)));
                        (*kind, merged)
                    })
                    .collect(),
            );

            let inspection_qty: i64 = members.iter().map(|r| i64::from(r.inspection_qty)).sum();
            let good_qty: i64 = members.iter().map(|r| i64::from(r.good_qty)).sum();
            let total_defect: i64 = members.iter().map(|r| i64::from(r.total_defect)).sum();

            let dates: BTreeSet<&str> = members.iter().map(|r| r.date.as_str()).collect();
            let period = match (dates.iter().next(), dates.iter().next_back()) {
                (Some(first), Some(last)) if first != last => format!("{} ~ {}", first, last),
                (Some(only), _) => (*only).to_string(),
                _ => String::new(),
            };

            let defect_rate = if inspection_qty > 0 {
                total_defect as f64 / inspection_qty as f64 * 100.0
            } else {
                0.0
            };

            AoiPeriodSummary {
                cumulative_qty: cumulative.get(&key).copied().unwrap_or(0),
                model: key.model,
                order_year: key.year,
                order_month: key.month,
                lot: key.lot,
                period,
                record_count: members.len(),
                inspection_qty,
                good_qty,
                total_defect,
                defects,
                references,
                defect_rate,
            }
        })
        .collect()
}

/// Read-only statistics over schedules and AOI records.
#[derive(Clone)]
pub struct StatisticsService {
    db_pool: Arc<DbPool>,
}

impl StatisticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Fulfillment summary for every model ordered in the given month.
    #[instrument(skip(self))]
    pub async fn order_month_summary(
        &self,
        order_year: i32,
        order_month: OrderMonth,
    ) -> Result<Vec<OrderMonthSummary>, ServiceError> {
        let rows = production_schedule::Entity::find()
            .filter(production_schedule::Column::OrderYear.eq(order_year))
            .filter(production_schedule::Column::OrderMonth.eq(order_month.as_i32()))
            .order_by_asc(production_schedule::Column::Id)
            .all(&*self.db_pool)
            .await?;

        debug!(rows = rows.len(), "reconciling order month");
        Ok(reconcile_order_month(&rows, order_year, order_month))
    }

    /// Raw schedule rows behind one model's summary line.
    #[instrument(skip(self))]
    pub async fn model_details(
        &self,
        model: &str,
        order_year: i32,
        order_month: OrderMonth,
    ) -> Result<Vec<production_schedule::Model>, ServiceError> {
        let rows = production_schedule::Entity::find()
            .filter(production_schedule::Column::Model.eq(model))
            .filter(production_schedule::Column::OrderYear.eq(order_year))
            .filter(production_schedule::Column::OrderMonth.eq(order_month.as_i32()))
            .order_by_asc(production_schedule::Column::ProdYear)
            .order_by_asc(production_schedule::Column::ProdMonth)
            .order_by_asc(production_schedule::Column::ProdWeek)
            .order_by_asc(production_schedule::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(rows)
    }

    /// Per-lot defect statistics for AOI records dated within `[start, end]`.
    #[instrument(skip(self))]
    pub async fn aoi_performance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AoiPeriodSummary>, ServiceError> {
        if start > end {
            return Err(ServiceError::InvalidInput(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }

        let start_label = start.format("%Y-%m-%d").to_string();
        let end_label = end.format("%Y-%m-%d").to_string();
        let records = aoi_record::Entity::find()
            .filter(aoi_record::Column::Date.gte(start_label))
            .filter(aoi_record::Column::Date.lte(end_label))
            .order_by_asc(aoi_record::Column::Id)
            .all(&*self.db_pool)
            .await?;

        if records.is_empty() {
            return Ok(Vec::new());
        }

        let keys: BTreeSet<LotKey> = records.iter().map(LotKey::from).collect();
        let mut cumulative = HashMap::with_capacity(keys.len());
        for key in keys {
            let total = cumulative_inspected_qty(&*self.db_pool, &key).await?;
            cumulative.insert(key, total);
        }

        Ok(aggregate_aoi_period(&records, &cumulative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(id: i32, model: &str, tb: Option<TbType>, actual: i32, total: i32) -> production_schedule::Model {
        production_schedule::Model {
            id,
            prod_year: 2025,
            prod_month: 11,
            prod_week: 1,
            line: "L1".into(),
            company: Some("Hanil".into()),
            model: model.into(),
            order_year: Some(2025),
            order_month: Some(11),
            tb,
            start_date: None,
            end_date: None,
            manager: None,
            actual_prod: actual,
            actual_start_date: None,
            actual_end_date: None,
            notes: None,
            batch_quantity: total,
            total_quantity: total,
        }
    }

    fn november() -> OrderMonth {
        OrderMonth::new(11).unwrap()
    }

    #[rstest]
    #[case(80, 100, 80, FulfillmentStatus::Shortage, 80.0)]
    #[case(100, 100, 100, FulfillmentStatus::Normal, 100.0)]
    #[case(90, 110, 90, FulfillmentStatus::Shortage, 90.0)]
    fn pairs_top_and_bottom(
        #[case] top: i32,
        #[case] bot: i32,
        #[case] achieved: i64,
        #[case] status: FulfillmentStatus,
        #[case] rate: f64,
    ) {
        let rows = vec![
            row(1, "AX-100", Some(TbType::Top), top, 100),
            row(2, "AX-100", Some(TbType::Bot), bot, 100),
        ];
        let summary = reconcile_order_month(&rows, 2025, november());
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_quantity, 100);
        assert_eq!(summary[0].actual_production, achieved);
        assert_eq!(summary[0].status, status);
        assert!((summary[0].fulfillment_rate - rate).abs() < 1e-9);
    }

    #[test]
    fn unequal_sides_meeting_the_order_are_an_imbalance() {
        let rows = vec![
            row(1, "AX-100", Some(TbType::Top), 100, 100),
            row(2, "AX-100", Some(TbType::Bot), 120, 100),
        ];
        let summary = reconcile_order_month(&rows, 2025, november());
        assert_eq!(summary[0].actual_production, 100);
        assert_eq!(summary[0].status, FulfillmentStatus::Imbalance);
    }

    #[test]
    fn overflow_lines_sum_every_side() {
        let rows = vec![
            row(1, "AX-100", Some(TbType::TopOverflow), 20, 200),
            row(2, "AX-100", Some(TbType::Top), 80, 200),
            row(3, "AX-100", Some(TbType::Bot), 80, 200),
        ];
        let summary = reconcile_order_month(&rows, 2025, november());
        assert_eq!(summary[0].actual_production, 180);
        assert_eq!(summary[0].total_quantity, 200);
        assert_eq!(summary[0].status, FulfillmentStatus::Shortage);
    }

    #[test]
    fn split_rows_of_one_order_count_the_total_once() {
        let rows = vec![
            row(1, "AX-100", Some(TbType::Top), 50, 100),
            row(2, "AX-100", Some(TbType::Top), 50, 100),
            row(3, "AX-100", Some(TbType::Bot), 100, 100),
        ];
        let summary = reconcile_order_month(&rows, 2025, november());
        assert_eq!(summary[0].total_quantity, 100);
        assert_eq!(summary[0].actual_production, 100);
        assert_eq!(summary[0].status, FulfillmentStatus::Normal);
    }

    #[test]
    fn distinct_orders_of_one_model_are_added() {
        let rows = vec![
            row(1, "AX-100", Some(TbType::Top), 0, 100),
            row(2, "AX-100", Some(TbType::Top), 0, 300),
        ];
        let summary = reconcile_order_month(&rows, 2025, november());
        assert_eq!(summary[0].total_quantity, 400);
    }

    #[test]
    fn zero_total_yields_zero_rate() {
        let rows = vec![row(1, "AX-100", None, 10, 0)];
        let summary = reconcile_order_month(&rows, 2025, november());
        assert_eq!(summary[0].total_quantity, 0);
        assert_eq!(summary[0].actual_production, 0);
        assert_eq!(summary[0].fulfillment_rate, 0.0);
        assert_eq!(summary[0].status, FulfillmentStatus::Normal);
    }

    #[test]
    fn models_keep_first_seen_order() {
        let rows = vec![
            row(1, "ZB-9", Some(TbType::Top), 1, 1),
            row(2, "AX-100", Some(TbType::Top), 1, 1),
            row(3, "ZB-9", Some(TbType::Bot), 1, 1),
        ];
        let models: Vec<String> = reconcile_order_month(&rows, 2025, november())
            .into_iter()
            .map(|s| s.model)
            .collect();
        assert_eq!(models, vec!["ZB-9", "AX-100"]);
    }

    #[rstest]
    #[case(&["A, B", "B, C"], "A, B, C")]
    #[case(&["C3,C1", " C1 ,, C2 "], "C1, C2, C3")]
    #[case(&["", "  "], "")]
    #[case(&["r1", "R1"], "R1, r1")]
    fn merges_reference_tags(#[case] values: &[&str], #[case] expected: &str) {
        assert_eq!(merge_reference_tags(values.iter().copied()), expected);
    }

    fn record(id: i32, lot: &str, date: &str, qty: i32, missing: i32, missing_ref: &str) -> aoi_record::Model {
        let mut r = aoi_record::Model::blank("AX-100".into(), 2025, 11, lot.into(), date.into());
        r.id = id;
        r.inspection_qty = qty;
        r.missing = missing;
        r.missing_ref = missing_ref.into();
        r.recompute_totals();
        r
    }

    #[test]
    fn folds_records_per_lot() {
        let records = vec![
            record(1, "500", "2025-11-03", 100, 2, "A, B"),
            record(2, "500", "2025-11-05", 50, 1, "B, C"),
            record(3, "200", "2025-11-04", 40, 0, ""),
        ];
        let mut cumulative = HashMap::new();
        cumulative.insert(LotKey::new("AX-100", 2025, 11, "500"), 400);

        let summaries = aggregate_aoi_period(&records, &cumulative);
        assert_eq!(summaries.len(), 2);

        let lot_200 = &summaries[0];
        assert_eq!(lot_200.lot, "200");
        assert_eq!(lot_200.period, "2025-11-04");
        assert_eq!(lot_200.cumulative_qty, 0);
        assert_eq!(lot_200.defect_rate, 0.0);

        let lot_500 = &summaries[1];
        assert_eq!(lot_500.record_count, 2);
        assert_eq!(lot_500.period, "2025-11-03 ~ 2025-11-05");
        assert_eq!(lot_500.inspection_qty, 150);
        assert_eq!(lot_500.total_defect, 3);
        assert_eq!(lot_500.good_qty, 147);
        assert_eq!(lot_500.defects.get(DefectKind::Missing), 3);
        assert_eq!(lot_500.references.get(DefectKind::Missing), "A, B, C");
        assert_eq!(lot_500.cumulative_qty, 400);
        assert!((lot_500.defect_rate - 2.0).abs() < 1e-9);
    }

    #[test]
    fn summary_serializes_defects_in_display_order() {
        let records = vec![record(1, "500", "2025-11-03", 10, 1, "C1")];
        let summaries = aggregate_aoi_period(&records, &HashMap::new());
        let json = serde_json::to_value(&summaries[0]).unwrap();

        assert_eq!(json["defects"]["missing"], 1);
        assert_eq!(json["references"]["missing_ref"], "C1");
        assert_eq!(json["orderMonth"], 11);
        assert_eq!(json["cumulativeQty"], 0);
        let keys: Vec<&String> = json["defects"].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 14);
    }
}
