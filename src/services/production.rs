use crate::{
    db::DbPool,
    entities::{production_schedule, TbType},
    errors::ServiceError,
    models::{LotQuantity, OrderMonth},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{info, instrument};
use utoipa::ToSchema;

/// The planning week a schedule row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekKey {
    pub year: i32,
    pub month: i32,
    pub week: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekFilter {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub week: Option<i32>,
}

/// A schedule row as shown on the weekly planning board.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub id: i32,
    pub line: String,
    pub company: Option<String>,
    pub model: String,
    pub order_year: Option<i32>,
    pub order_month: Option<i32>,
    pub tb: Option<TbType>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub manager: Option<String>,
    pub actual_prod: i32,
    pub actual_start_date: Option<String>,
    pub actual_end_date: Option<String>,
    pub notes: Option<String>,
    /// `"batch/total"` or `"batch"`
    pub lot: String,
    pub prod_year: i32,
    pub prod_month: i32,
    pub prod_week: i32,
}

impl From<production_schedule::Model> for ScheduleView {
    fn from(row: production_schedule::Model) -> Self {
        let lot = row.lot().format();
        Self {
            id: row.id,
            line: row.line,
            company: row.company,
            model: row.model,
            order_year: row.order_year,
            order_month: row.order_month,
            tb: row.tb,
            start_date: row.start_date,
            end_date: row.end_date,
            manager: row.manager,
            actual_prod: row.actual_prod,
            actual_start_date: row.actual_start_date,
            actual_end_date: row.actual_end_date,
            notes: row.notes,
            lot,
            prod_year: row.prod_year,
            prod_month: row.prod_month,
            prod_week: row.prod_week,
        }
    }
}

/// One row of a weekly save; rows without an id are new.
#[derive(Debug, Clone)]
pub struct ScheduleInput {
    pub id: Option<i32>,
    pub line: String,
    pub company: Option<String>,
    pub model: String,
    pub order_year: Option<i32>,
    pub order_month: Option<OrderMonth>,
    pub tb: Option<TbType>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub lot: LotQuantity,
}

impl ScheduleInput {
    fn write_plan(&self, active: &mut production_schedule::ActiveModel) {
        active.line = Set(self.line.clone());
        active.company = Set(self.company.clone());
        active.model = Set(self.model.clone());
        active.order_year = Set(self.order_year);
        active.order_month = Set(self.order_month.map(OrderMonth::as_i32));
        active.tb = Set(self.tb);
        active.start_date = Set(self.start_date.clone());
        active.end_date = Set(self.end_date.clone());
        active.batch_quantity = Set(self.lot.batch);
        active.total_quantity = Set(self.lot.total);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SaveWeekSummary {
    pub updated: usize,
    pub inserted: usize,
    pub deleted: u64,
}

/// Changes to one schedule row; `None` leaves a field as it is.
///
/// `tb` distinguishes "not sent" (`None`) from "cleared" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct ScheduleUpdate {
    pub company: Option<String>,
    pub model: Option<String>,
    pub order_year: Option<i32>,
    pub order_month: Option<OrderMonth>,
    pub lot: Option<LotQuantity>,
    pub manager: Option<String>,
    pub tb: Option<Option<TbType>>,
    pub actual_prod: Option<i32>,
    pub actual_start_date: Option<String>,
    pub actual_end_date: Option<String>,
}

/// Weekly production schedules.
#[derive(Clone)]
pub struct ScheduleService {
    db_pool: Arc<DbPool>,
}

impl ScheduleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: WeekFilter) -> Result<Vec<ScheduleView>, ServiceError> {
        let mut query = production_schedule::Entity::find();
        if let Some(year) = filter.year {
            query = query.filter(production_schedule::Column::ProdYear.eq(year));
        }
        if let Some(month) = filter.month {
            query = query.filter(production_schedule::Column::ProdMonth.eq(month));
        }
        if let Some(week) = filter.week {
            query = query.filter(production_schedule::Column::ProdWeek.eq(week));
        }

        let rows = query
            .order_by_asc(production_schedule::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(rows.into_iter().map(ScheduleView::from).collect())
    }

    /// Replaces the week's rows with `rows`: rows carrying an id are updated,
    /// rows without one are inserted and the week's remaining rows are deleted.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn save_week(
        &self,
        week: WeekKey,
        rows: Vec<ScheduleInput>,
    ) -> Result<SaveWeekSummary, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let existing: HashMap<i32, production_schedule::Model> =
            production_schedule::Entity::find()
                .filter(production_schedule::Column::ProdYear.eq(week.year))
                .filter(production_schedule::Column::ProdMonth.eq(week.month))
                .filter(production_schedule::Column::ProdWeek.eq(week.week))
                .all(&txn)
                .await?
                .into_iter()
                .map(|row| (row.id, row))
                .collect();

        let mut summary = SaveWeekSummary::default();
        let mut kept = HashSet::new();
        for input in &rows {
            match input.id {
                Some(id) => {
                    let row = existing.get(&id).cloned().ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "schedule {} is not part of week {}-{} #{}",
                            id, week.year, week.month, week.week
                        ))
                    })?;
                    kept.insert(id);
                    let mut active: production_schedule::ActiveModel = row.into();
                    input.write_plan(&mut active);
                    active.update(&txn).await?;
                    summary.updated += 1;
                }
                None => {
                    let mut active = production_schedule::ActiveModel {
                        prod_year: Set(week.year),
                        prod_month: Set(week.month),
                        prod_week: Set(week.week),
                        manager: Set(None),
                        actual_prod: Set(0),
                        actual_start_date: Set(None),
                        actual_end_date: Set(None),
                        notes: Set(None),
                        ..Default::default()
                    };
                    input.write_plan(&mut active);
                    active.insert(&txn).await?;
                    summary.inserted += 1;
                }
            }
        }

        let stale: Vec<i32> = existing
            .keys()
            .copied()
            .filter(|id| !kept.contains(id))
            .collect();
        if !stale.is_empty() {
            summary.deleted = production_schedule::Entity::delete_many()
                .filter(production_schedule::Column::Id.is_in(stale))
                .exec(&txn)
                .await?
                .rows_affected;
        }

        txn.commit().await?;
        metrics::counter!("ppms_schedule_week_saves_total", 1);
        info!(
            updated = summary.updated,
            inserted = summary.inserted,
            deleted = summary.deleted,
            "schedule week saved"
        );
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: i32, changes: ScheduleUpdate) -> Result<ScheduleView, ServiceError> {
        if let Some(actual) = changes.actual_prod {
            if actual < 0 {
                return Err(ServiceError::ValidationError(format!(
                    "actualProd must be zero or more, got {}",
                    actual
                )));
            }
        }

        let txn = self.db_pool.begin().await?;
        let row = self.find_row(&txn, id).await?;
        let mut active: production_schedule::ActiveModel = row.into();

        if let Some(company) = changes.company {
            active.company = Set(Some(company));
        }
        if let Some(model) = changes.model {
            active.model = Set(model);
        }
        if let Some(order_year) = changes.order_year {
            active.order_year = Set(Some(order_year));
        }
        if let Some(order_month) = changes.order_month {
            active.order_month = Set(Some(order_month.as_i32()));
        }
        if let Some(lot) = changes.lot {
            active.batch_quantity = Set(lot.batch);
            active.total_quantity = Set(lot.total);
        }
        if let Some(manager) = changes.manager {
            active.manager = Set(Some(manager));
        }
        if let Some(tb) = changes.tb {
            active.tb = Set(tb);
        }
        if let Some(actual) = changes.actual_prod {
            active.actual_prod = Set(actual);
        }
        if let Some(start) = changes.actual_start_date {
            active.actual_start_date = Set(Some(start));
        }
        if let Some(end) = changes.actual_end_date {
            active.actual_end_date = Set(Some(end));
        }

        let row = active.update(&txn).await?;
        txn.commit().await?;
        Ok(row.into())
    }

    #[instrument(skip(self, notes))]
    pub async fn update_notes(&self, id: i32, notes: String) -> Result<ScheduleView, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let row = self.find_row(&txn, id).await?;
        let mut active: production_schedule::ActiveModel = row.into();
        active.notes = Set(Some(notes));
        let row = active.update(&txn).await?;
        txn.commit().await?;
        Ok(row.into())
    }

    /// Deletes every row of the week and returns how many were removed.
    #[instrument(skip(self))]
    pub async fn delete_week(&self, week: WeekKey) -> Result<u64, ServiceError> {
        let result = production_schedule::Entity::delete_many()
            .filter(production_schedule::Column::ProdYear.eq(week.year))
            .filter(production_schedule::Column::ProdMonth.eq(week.month))
            .filter(production_schedule::Column::ProdWeek.eq(week.week))
            .exec(&*self.db_pool)
            .await?;
        info!(deleted = result.rows_affected, "schedule week deleted");
        Ok(result.rows_affected)
    }

    async fn find_row<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
    ) -> Result<production_schedule::Model, ServiceError> {
        production_schedule::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("schedule {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_renders_lot_string() {
        let row = production_schedule::Model {
            id: 3,
            prod_year: 2025,
            prod_month: 11,
            prod_week: 2,
            line: "L2".into(),
            company: None,
            model: "AX-100".into(),
            order_year: Some(2025),
            order_month: Some(11),
            tb: Some(TbType::BottomOverflow),
            start_date: Some("2025-11-10".into()),
            end_date: None,
            manager: None,
            actual_prod: 0,
            actual_start_date: None,
            actual_end_date: None,
            notes: None,
            batch_quantity: 50,
            total_quantity: 100,
        };

        let json = serde_json::to_value(ScheduleView::from(row)).unwrap();
        assert_eq!(json["lot"], "50/100");
        assert_eq!(json["tb"], "B/O");
        assert_eq!(json["prodWeek"], 2);
        assert_eq!(json["orderMonth"], 11);
    }
}
