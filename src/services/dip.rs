use crate::{
    db::DbPool,
    entities::{dip_group, dip_history, production_schedule, DipStatus, HistoryType},
    errors::ServiceError,
    models::{parse_committed_lot, LotKey, OrderMonth, YearMonth},
    services::aoi::cumulative_inspected_qty,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use tracing::{info, instrument};
use utoipa::ToSchema;

/// One shipping or receiving entry with the running total of its list.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i32,
    pub group_id: i32,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: HistoryType,
    pub quantity: i32,
    pub cumulative: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DipGroupView {
    pub id: i32,
    pub model: String,
    pub lot: String,
    pub year: i32,
    pub month: i32,
    pub status: DipStatus,
    pub shipping: Vec<HistoryEntry>,
    pub receiving: Vec<HistoryEntry>,
    pub ship_total: i64,
    pub receive_total: i64,
}

impl DipGroupView {
    fn build(group: dip_group::Model, mut histories: Vec<dip_history::Model>) -> Self {
        histories.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        let mut shipping = Vec::new();
        let mut receiving = Vec::new();
        let mut ship_total = 0i64;
        let mut receive_total = 0i64;
        for history in histories {
            let (list, running) = match history.kind {
                HistoryType::Ship => (&mut shipping, &mut ship_total),
                HistoryType::Receive => (&mut receiving, &mut receive_total),
            };
            *running += i64::from(history.quantity);
            list.push(HistoryEntry {
                id: history.id,
                group_id: history.group_id,
                date: history.date,
                kind: history.kind,
                quantity: history.quantity,
                cumulative: *running,
                created_at: history.created_at,
            });
        }

        Self {
            id: group.id,
            model: group.model,
            lot: group.lot,
            year: group.year,
            month: group.month,
            status: group.status,
            shipping,
            receiving,
            ship_total,
            receive_total,
        }
    }
}

/// A lot whose production has started, offered for DIP grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProductionModel {
    pub model: String,
    pub lot: String,
    pub year: i32,
    pub month: i32,
}

#[derive(Debug, Clone)]
pub struct NewDipGroup {
    pub model: String,
    pub lot: String,
    pub year: i32,
    pub month: OrderMonth,
}

#[derive(Debug, Clone)]
pub struct NewDipHistory {
    pub group_id: i32,
    pub date: NaiveDate,
    pub kind: HistoryType,
    pub quantity: i32,
}

/// Result of checking an `aoi_completed` group against its inspected quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    Reverted,
    Unchanged,
    NoGroup,
}

/// Puts an `aoi_completed` group back to `ongoing` once the lot's all-time
/// inspected quantity has dropped below its committed lot size.
pub async fn revert_aoi_completion_if_short<C>(
    conn: &C,
    key: &LotKey,
) -> Result<RevertOutcome, ServiceError>
where
    C: ConnectionTrait,
{
    let group = dip_group::Entity::find()
        .filter(dip_group::Column::Model.eq(key.model.as_str()))
        .filter(dip_group::Column::Year.eq(key.year))
        .filter(dip_group::Column::Month.eq(key.month))
        .filter(dip_group::Column::Lot.eq(key.lot.as_str()))
        .one(conn)
        .await?;

    let Some(group) = group else {
        return Ok(RevertOutcome::NoGroup);
    };
    if group.status != DipStatus::AoiCompleted {
        return Ok(RevertOutcome::Unchanged);
    }

    let cumulative = cumulative_inspected_qty(conn, key).await?;
    let committed = parse_committed_lot(&group.lot);
    if cumulative >= committed {
        return Ok(RevertOutcome::Unchanged);
    }

    let group_id = group.id;
    let mut active: dip_group::ActiveModel = group.into();
    active.status = Set(DipStatus::Ongoing);
    active.update(conn).await?;

    info!(group_id, cumulative, committed, lot = %key, "AOI completion reverted");
    metrics::counter!("ppms_dip_status_reverts_total", 1);
    Ok(RevertOutcome::Reverted)
}

/// DIP shipping/receiving groups and their history entries.
#[derive(Clone)]
pub struct DipService {
    db_pool: Arc<DbPool>,
}

impl DipService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_groups(&self) -> Result<Vec<DipGroupView>, ServiceError> {
        let groups = dip_group::Entity::find()
            .order_by_asc(dip_group::Column::Id)
            .find_with_related(dip_history::Entity)
            .all(&*self.db_pool)
            .await?;

        Ok(groups
            .into_iter()
            .map(|(group, histories)| DipGroupView::build(group, histories))
            .collect())
    }

    /// Lots with recorded production whose order month falls within one month
    /// of `today`, one entry per (model, year, month, total quantity).
    #[instrument(skip(self))]
    pub async fn production_models(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ProductionModel>, ServiceError> {
        let window = YearMonth::rolling_window(today, 1, 1);
        let months = window.iter().fold(Condition::any(), |cond, ym| {
            cond.add(
                Condition::all()
                    .add(production_schedule::Column::OrderYear.eq(ym.year))
                    .add(production_schedule::Column::OrderMonth.eq(ym.month.as_i32())),
            )
        });

        let rows = production_schedule::Entity::find()
            .filter(months)
            .filter(production_schedule::Column::ActualProd.gt(0))
            .order_by_asc(production_schedule::Column::Id)
            .all(&*self.db_pool)
            .await?;

        let mut seen = HashSet::new();
        let mut models = Vec::new();
        for row in rows {
            let (Some(year), Some(month)) = (row.order_year, row.order_month) else {
                continue;
            };
            if seen.insert((row.model.clone(), year, month, row.total_quantity)) {
                models.push(ProductionModel {
                    model: row.model,
                    lot: row.total_quantity.to_string(),
                    year,
                    month,
                });
            }
        }
        Ok(models)
    }

    #[instrument(skip(self))]
    pub async fn create_group(&self, input: NewDipGroup) -> Result<dip_group::Model, ServiceError> {
        let key = LotKey::new(input.model.trim(), input.year, input.month.as_i32(), input.lot.trim());
        if key.model.is_empty() || key.lot.is_empty() {
            return Err(ServiceError::ValidationError(
                "model and lot are required".to_string(),
            ));
        }
        let conflict = format!("DIP group already exists for {}", key);

        let txn = self.db_pool.begin().await?;
        let existing = dip_group::Entity::find()
            .filter(dip_group::Column::Model.eq(key.model.as_str()))
            .filter(dip_group::Column::Year.eq(key.year))
            .filter(dip_group::Column::Month.eq(key.month))
            .filter(dip_group::Column::Lot.eq(key.lot.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(conflict));
        }

        let group = dip_group::ActiveModel {
            model: Set(key.model.clone()),
            lot: Set(key.lot.clone()),
            year: Set(key.year),
            month: Set(key.month),
            status: Set(DipStatus::Ongoing),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_db_conflict(e, conflict))?;
        txn.commit().await?;

        info!(group_id = group.id, lot = %key, "DIP group created");
        Ok(group)
    }

    #[instrument(skip(self))]
    pub async fn delete_group(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let group = dip_group::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("DIP group {} not found", id)))?;

        dip_history::Entity::delete_many()
            .filter(dip_history::Column::GroupId.eq(group.id))
            .exec(&txn)
            .await?;
        dip_group::Entity::delete_by_id(group.id).exec(&txn).await?;
        txn.commit().await?;

        info!(group_id = id, "DIP group deleted");
        Ok(())
    }

    /// Marks shipping/receiving as finished for the group.
    #[instrument(skip(self))]
    pub async fn complete_group(&self, id: i32) -> Result<dip_group::Model, ServiceError> {
        let group = self.find_group(id).await?;
        let mut active: dip_group::ActiveModel = group.into();
        active.status = Set(DipStatus::Completed);
        let group = active.update(&*self.db_pool).await?;
        Ok(group)
    }

    #[instrument(skip(self))]
    pub async fn add_history(
        &self,
        input: NewDipHistory,
    ) -> Result<dip_history::Model, ServiceError> {
        check_quantity(input.quantity)?;

        let txn = self.db_pool.begin().await?;
        dip_group::Entity::find_by_id(input.group_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("DIP group {} not found", input.group_id))
            })?;

        let history = dip_history::ActiveModel {
            group_id: Set(input.group_id),
            date: Set(input.date.format("%Y-%m-%d").to_string()),
            kind: Set(input.kind),
            quantity: Set(input.quantity),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(history)
    }

    #[instrument(skip(self))]
    pub async fn update_history(
        &self,
        id: i32,
        date: NaiveDate,
        quantity: i32,
    ) -> Result<dip_history::Model, ServiceError> {
        check_quantity(quantity)?;

        let history = dip_history::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("DIP record {} not found", id)))?;

        let mut active: dip_history::ActiveModel = history.into();
        active.date = Set(date.format("%Y-%m-%d").to_string());
        active.quantity = Set(quantity);
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_history(&self, id: i32) -> Result<(), ServiceError> {
        let result = dip_history::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("DIP record {} not found", id)));
        }
        Ok(())
    }

    async fn find_group(&self, id: i32) -> Result<dip_group::Model, ServiceError> {
        dip_group::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("DIP group {} not found", id)))
    }
}

fn check_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 0 {
        return Err(ServiceError::ValidationError(format!(
            "quantity must be zero or more, got {}",
            quantity
        )));
    }
    Ok(())
}
