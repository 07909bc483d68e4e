use crate::{
    db::DbPool,
    entities::{aoi_record, dip_group, production_schedule, DefectKind, DipStatus, HistoryType},
    errors::ServiceError,
    models::{parse_committed_lot, LotKey, OrderMonth, YearMonth},
    services::{
        dip::{revert_aoi_completion_if_short, RevertOutcome},
        statistics::{DefectCounts, ReferenceTags},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

/// Company label for lots with no matching schedule row.
pub const UNASSIGNED_COMPANY: &str = "Unassigned";

/// All-time inspected quantity for one lot.
pub async fn cumulative_inspected_qty<C>(conn: &C, key: &LotKey) -> Result<i64, DbErr>
where
    C: ConnectionTrait,
{
    let total = aoi_record::Entity::find()
        .select_only()
        .column_as(aoi_record::Column::InspectionQty.sum(), "total")
        .filter(aoi_record::Column::Model.eq(key.model.as_str()))
        .filter(aoi_record::Column::OrderYear.eq(key.year))
        .filter(aoi_record::Column::OrderMonth.eq(key.month))
        .filter(aoi_record::Column::Lot.eq(key.lot.as_str()))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

/// An AOI record as returned to operators.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AoiRecordView {
    pub id: i32,
    pub model: String,
    pub order_year: i32,
    pub order_month: i32,
    pub lot: String,
    pub date: String,
    pub inspection_point: i32,
    pub inspection_qty: i32,
    #[schema(value_type = Object)]
    pub defects: DefectCounts,
    #[schema(value_type = Object)]
    pub references: ReferenceTags,
    pub total_defect: i32,
    pub good_qty: i32,
    pub cumulative_qty: i64,
    pub created_at: DateTime<Utc>,
}

impl AoiRecordView {
    pub fn new(record: aoi_record::Model, cumulative_qty: i64) -> Self {
        let defects = DefectCounts(
            DefectKind::ALL
                .iter()
                .map(|kind| (*kind, i64::from(record.defect_count(*kind))))
                .collect(),
        );
        let references = ReferenceTags(
            DefectKind::ALL
                .iter()
                .map(|kind| (*kind, record.defect_ref(*kind).to_string()))
                .collect(),
        );
        Self {
            id: record.id,
            model: record.model,
            order_year: record.order_year,
            order_month: record.order_month,
            lot: record.lot,
            date: record.date,
            inspection_point: record.inspection_point,
            inspection_qty: record.inspection_qty,
            defects,
            references,
            total_defect: record.total_defect,
            good_qty: record.good_qty,
            cumulative_qty,
            created_at: record.created_at,
        }
    }
}

/// A DIP group still awaiting AOI completion.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModel {
    pub id: i32,
    pub model: String,
    pub year: i32,
    pub month: i32,
    pub lot: String,
    pub ship_qty: i64,
    pub receive_qty: i64,
    pub aoi_qty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CompanyModels {
    pub company: String,
    pub models: Vec<AvailableModel>,
}

/// Which records `list_records` returns.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    Lot(LotKey),
    Range { start: NaiveDate, end: NaiveDate },
    Date(NaiveDate),
}

#[derive(Debug, Clone)]
pub struct NewAoiRecord {
    pub model: String,
    pub year: i32,
    pub month: OrderMonth,
    pub lot: String,
    pub date: NaiveDate,
}

/// Field-level changes to an AOI record. Absent entries are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AoiRecordUpdate {
    pub inspection_point: Option<i32>,
    pub inspection_qty: Option<i32>,
    pub defects: BTreeMap<DefectKind, i32>,
    pub references: BTreeMap<DefectKind, String>,
}

impl AoiRecordUpdate {
    fn check(&self) -> Result<(), ServiceError> {
        let negative_scalar = [
            ("inspection_point", self.inspection_point),
            ("inspection_qty", self.inspection_qty),
        ]
        .into_iter()
        .find(|(_, value)| value.map_or(false, |v| v < 0));
        if let Some((field, value)) = negative_scalar {
            return Err(ServiceError::ValidationError(format!(
                "{} must be zero or more, got {}",
                field,
                value.unwrap_or_default()
            )));
        }

        if let Some((kind, count)) = self.defects.iter().find(|(_, count)| **count < 0) {
            return Err(ServiceError::ValidationError(format!(
                "{} must be zero or more, got {}",
                kind.name(),
                count
            )));
        }
        Ok(())
    }

    fn apply(self, record: &mut aoi_record::Model) -> Result<(), ServiceError> {
        if let Some(point) = self.inspection_point {
            record.inspection_point = point;
        }
        if let Some(qty) = self.inspection_qty {
            record.inspection_qty = qty;
        }
        for (kind, count) in self.defects {
            *record.defect_count_mut(kind) = count;
        }
        for (kind, tags) in self.references {
            *record.defect_ref_mut(kind) = tags;
        }
        if record.checked_total_defect().is_none() {
            return Err(ServiceError::ValidationError(format!(
                "defect counts of record {} total more than {}",
                record.id,
                i32::MAX
            )));
        }
        record.recompute_totals();
        Ok(())
    }
}

/// AOI inspection records and lot completion.
#[derive(Clone)]
pub struct AoiService {
    db_pool: Arc<DbPool>,
}

impl AoiService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// DIP groups in the order-month window that are not AOI-complete,
    /// grouped by the company found on their schedule rows.
    #[instrument(skip(self))]
    pub async fn available_models(
        &self,
        window: (YearMonth, YearMonth),
    ) -> Result<Vec<CompanyModels>, ServiceError> {
        let months = YearMonth::range_inclusive(window.0, window.1);
        if months.is_empty() {
            return Ok(Vec::new());
        }
        let period = months.iter().fold(Condition::any(), |cond, ym| {
            cond.add(
                Condition::all()
                    .add(dip_group::Column::Year.eq(ym.year))
                    .add(dip_group::Column::Month.eq(ym.month.as_i32())),
            )
        });

        let groups = dip_group::Entity::find()
            .filter(period)
            .filter(dip_group::Column::Status.ne(DipStatus::AoiCompleted))
            .order_by_asc(dip_group::Column::Id)
            .find_with_related(crate::entities::dip_history::Entity)
            .all(&*self.db_pool)
            .await?;
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let schedules = production_schedule::Entity::find()
            .order_by_asc(production_schedule::Column::Id)
            .all(&*self.db_pool)
            .await?;
        let mut companies: HashMap<LotKey, String> = HashMap::new();
        for row in schedules {
            let (Some(year), Some(month)) = (row.order_year, row.order_month) else {
                continue;
            };
            let Some(company) = row.company.filter(|c| !c.trim().is_empty()) else {
                continue;
            };
            companies.insert(
                LotKey::new(row.model, year, month, row.total_quantity.to_string()),
                company,
            );
        }

        let mut grouped: Vec<CompanyModels> = Vec::new();
        for (group, histories) in groups {
            let key = LotKey::from(&group);
            let (ship_qty, receive_qty) =
                histories
                    .iter()
                    .fold((0i64, 0i64), |(ship, receive), h| match h.kind {
                        HistoryType::Ship => (ship + i64::from(h.quantity), receive),
                        HistoryType::Receive => (ship, receive + i64::from(h.quantity)),
                    });
            let aoi_qty = cumulative_inspected_qty(&*self.db_pool, &key).await?;
            let company = companies
                .get(&key)
                .cloned()
                .unwrap_or_else(|| UNASSIGNED_COMPANY.to_string());

            let entry = AvailableModel {
                id: group.id,
                model: group.model,
                year: group.year,
                month: group.month,
                lot: group.lot,
                ship_qty,
                receive_qty,
                aoi_qty,
            };
            match grouped.iter_mut().find(|g| g.company == company) {
                Some(bucket) => bucket.models.push(entry),
                None => grouped.push(CompanyModels {
                    company,
                    models: vec![entry],
                }),
            }
        }
        Ok(grouped)
    }

    /// Records matching `filter`, newest first, each with its lot's
    /// all-time inspected quantity.
    #[instrument(skip(self))]
    pub async fn list_records(
        &self,
        filter: RecordFilter,
    ) -> Result<Vec<AoiRecordView>, ServiceError> {
        let query = aoi_record::Entity::find();
        let query = match &filter {
            RecordFilter::Lot(key) => query
                .filter(aoi_record::Column::Model.eq(key.model.as_str()))
                .filter(aoi_record::Column::OrderYear.eq(key.year))
                .filter(aoi_record::Column::OrderMonth.eq(key.month))
                .filter(aoi_record::Column::Lot.eq(key.lot.as_str())),
            RecordFilter::Range { start, end } => query
                .filter(aoi_record::Column::Date.gte(iso_date(*start)))
                .filter(aoi_record::Column::Date.lte(iso_date(*end))),
            RecordFilter::Date(date) => query.filter(aoi_record::Column::Date.eq(iso_date(*date))),
        };
        let records = query
            .order_by_desc(aoi_record::Column::Id)
            .all(&*self.db_pool)
            .await?;

        let mut cache: HashMap<LotKey, i64> = HashMap::new();
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let key = LotKey::from(&record);
            let cumulative = match cache.get(&key) {
                Some(total) => *total,
                None => {
                    let total = cumulative_inspected_qty(&*self.db_pool, &key).await?;
                    cache.insert(key, total);
                    total
                }
            };
            views.push(AoiRecordView::new(record, cumulative));
        }
        Ok(views)
    }

    /// Starts a zeroed record for one lot on one inspection date.
    #[instrument(skip(self))]
    pub async fn create_record(&self, input: NewAoiRecord) -> Result<AoiRecordView, ServiceError> {
        let model = input.model.trim().to_string();
        let lot = input.lot.trim().to_string();
        if model.is_empty() || lot.is_empty() {
            return Err(ServiceError::ValidationError(
                "model and lot are required".to_string(),
            ));
        }

        let blank = aoi_record::Model::blank(
            model,
            input.year,
            input.month.as_i32(),
            lot,
            iso_date(input.date),
        );
        let mut active = aoi_record::ActiveModel::from(blank).reset_all();
        active.id = sea_orm::ActiveValue::NotSet;
        let record = active.insert(&*self.db_pool).await?;

        let cumulative = cumulative_inspected_qty(&*self.db_pool, &LotKey::from(&record)).await?;
        info!(record_id = record.id, "AOI record created");
        Ok(AoiRecordView::new(record, cumulative))
    }

    /// Applies `changes`, re-derives the totals and re-checks the lot's DIP
    /// completion once the change is committed.
    #[instrument(skip(self, changes))]
    pub async fn update_record(
        &self,
        id: i32,
        changes: AoiRecordUpdate,
    ) -> Result<AoiRecordView, ServiceError> {
        changes.check()?;

        let txn = self.db_pool.begin().await?;
        let mut record = aoi_record::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("AOI record {} not found", id)))?;
        changes.apply(&mut record)?;
        let record = aoi_record::ActiveModel::from(record)
            .reset_all()
            .update(&txn)
            .await?;
        txn.commit().await?;
        metrics::counter!("ppms_aoi_record_edits_total", 1);

        let key = LotKey::from(&record);
        self.revert_if_short(&key).await;

        let cumulative = cumulative_inspected_qty(&*self.db_pool, &key).await?;
        Ok(AoiRecordView::new(record, cumulative))
    }

    #[instrument(skip(self))]
    pub async fn delete_record(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let record = aoi_record::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("AOI record {} not found", id)))?;
        let key = LotKey::from(&record);
        aoi_record::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        metrics::counter!("ppms_aoi_record_edits_total", 1);

        self.revert_if_short(&key).await;
        Ok(())
    }

    /// Marks a DIP group AOI-complete. Refused while fewer units have been
    /// inspected than the committed lot.
    #[instrument(skip(self))]
    pub async fn complete_group(&self, group_id: i32) -> Result<dip_group::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let group = dip_group::Entity::find_by_id(group_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("DIP group {} not found", group_id)))?;

        let key = LotKey::from(&group);
        let inspected = cumulative_inspected_qty(&txn, &key).await?;
        let committed = parse_committed_lot(&group.lot);
        if inspected < committed {
            return Err(ServiceError::InvalidOperation(format!(
                "{} has {} of {} units inspected",
                key, inspected, committed
            )));
        }

        let mut active: dip_group::ActiveModel = group.into();
        active.status = sea_orm::Set(DipStatus::AoiCompleted);
        let group = active.update(&txn).await?;
        txn.commit().await?;

        info!(group_id, inspected, committed, "AOI inspection completed");
        Ok(group)
    }

    async fn revert_if_short(&self, key: &LotKey) {
        match revert_aoi_completion_if_short(&*self.db_pool, key).await {
            Ok(RevertOutcome::Reverted) => {}
            Ok(outcome) => debug!(lot = %key, ?outcome, "AOI completion left as is"),
            Err(err) => warn!(lot = %key, error = %err, "could not re-check AOI completion"),
        }
    }
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
