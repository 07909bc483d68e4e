//! Reference data: companies, managers, model folders and product models.

use crate::{
    db::DbPool,
    entities::{company, manager, model_file, model_folder, product_model},
    errors::ServiceError,
    services::model_files::remove_model_dir,
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, instrument, warn};

const MAX_NAME_LEN: usize = 100;

/// Trims a display name and checks it is 1-100 characters long.
pub fn normalize_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(ServiceError::ValidationError(format!(
            "name must be 1-{} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct ModelUpdate {
    pub name: Option<String>,
    /// `Some(None)` moves the model out of its folder.
    pub folder_id: Option<Option<i32>>,
}

#[derive(Clone)]
pub struct ReferenceService {
    db_pool: Arc<DbPool>,
    upload_dir: PathBuf,
}

impl ReferenceService {
    pub fn new(db_pool: Arc<DbPool>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_pool,
            upload_dir: upload_dir.into(),
        }
    }

    // Companies

    #[instrument(skip(self))]
    pub async fn list_companies(&self) -> Result<Vec<company::Model>, ServiceError> {
        Ok(company::Entity::find()
            .order_by_asc(company::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_company(&self, name: &str) -> Result<company::Model, ServiceError> {
        let name = normalize_name(name)?;
        let conflict = format!("company '{}' already exists", name);
        let txn = self.db_pool.begin().await?;
        if company::Entity::find()
            .filter(company::Column::Name.eq(name.as_str()))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(conflict));
        }
        let company = company::ActiveModel {
            name: Set(name),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_db_conflict(e, conflict))?;
        txn.commit().await?;
        Ok(company)
    }

    #[instrument(skip(self))]
    pub async fn rename_company(&self, id: i32, name: &str) -> Result<company::Model, ServiceError> {
        let name = normalize_name(name)?;
        let conflict = format!("company '{}' already exists", name);
        let txn = self.db_pool.begin().await?;
        let current = company::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("company {} not found", id)))?;
        if company::Entity::find()
            .filter(company::Column::Name.eq(name.as_str()))
            .filter(company::Column::Id.ne(id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(conflict));
        }
        let mut active: company::ActiveModel = current.into();
        active.name = Set(name);
        let company = active
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, conflict))?;
        txn.commit().await?;
        Ok(company)
    }

    /// Deletes a company that owns no folders or models.
    #[instrument(skip(self))]
    pub async fn delete_company(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        company::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("company {} not found", id)))?;

        let folders = model_folder::Entity::find()
            .filter(model_folder::Column::CompanyId.eq(id))
            .count(&txn)
            .await?;
        let models = product_model::Entity::find()
            .filter(product_model::Column::CompanyId.eq(id))
            .count(&txn)
            .await?;
        if folders > 0 || models > 0 {
            return Err(ServiceError::Conflict(format!(
                "company {} still has {} folders and {} models",
                id, folders, models
            )));
        }

        company::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    // Managers

    #[instrument(skip(self))]
    pub async fn list_managers(&self) -> Result<Vec<manager::Model>, ServiceError> {
        Ok(manager::Entity::find()
            .order_by_asc(manager::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_manager(&self, name: &str) -> Result<manager::Model, ServiceError> {
        let name = normalize_name(name)?;
        let conflict = format!("manager '{}' already exists", name);
        let txn = self.db_pool.begin().await?;
        if manager::Entity::find()
            .filter(manager::Column::Name.eq(name.as_str()))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(conflict));
        }
        let manager = manager::ActiveModel {
            name: Set(name),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_db_conflict(e, conflict))?;
        txn.commit().await?;
        Ok(manager)
    }

    #[instrument(skip(self))]
    pub async fn rename_manager(&self, id: i32, name: &str) -> Result<manager::Model, ServiceError> {
        let name = normalize_name(name)?;
        let conflict = format!("manager '{}' already exists", name);
        let txn = self.db_pool.begin().await?;
        let current = manager::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("manager {} not found", id)))?;
        if manager::Entity::find()
            .filter(manager::Column::Name.eq(name.as_str()))
            .filter(manager::Column::Id.ne(id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(conflict));
        }
        let mut active: manager::ActiveModel = current.into();
        active.name = Set(name);
        let manager = active
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, conflict))?;
        txn.commit().await?;
        Ok(manager)
    }

    #[instrument(skip(self))]
    pub async fn delete_manager(&self, id: i32) -> Result<(), ServiceError> {
        let result = manager::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("manager {} not found", id)));
        }
        Ok(())
    }

    // Folders

    #[instrument(skip(self))]
    pub async fn list_folders(
        &self,
        company_id: Option<i32>,
    ) -> Result<Vec<model_folder::Model>, ServiceError> {
        let mut query = model_folder::Entity::find();
        if let Some(company_id) = company_id {
            query = query.filter(model_folder::Column::CompanyId.eq(company_id));
        }
        Ok(query
            .order_by_asc(model_folder::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_folder(
        &self,
        company_id: i32,
        name: &str,
    ) -> Result<model_folder::Model, ServiceError> {
        let name = normalize_name(name)?;
        let conflict = format!("folder '{}' already exists for company {}", name, company_id);
        let txn = self.db_pool.begin().await?;
        ensure_company(&txn, company_id).await?;
        if model_folder::Entity::find()
            .filter(model_folder::Column::CompanyId.eq(company_id))
            .filter(model_folder::Column::Name.eq(name.as_str()))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(conflict));
        }
        let folder = model_folder::ActiveModel {
            company_id: Set(company_id),
            name: Set(name),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_db_conflict(e, conflict))?;
        txn.commit().await?;
        Ok(folder)
    }

    #[instrument(skip(self))]
    pub async fn rename_folder(&self, id: i32, name: &str) -> Result<model_folder::Model, ServiceError> {
        let name = normalize_name(name)?;
        let txn = self.db_pool.begin().await?;
        let folder = find_folder(&txn, id).await?;
        let conflict = format!(
            "folder '{}' already exists for company {}",
            name, folder.company_id
        );
        if model_folder::Entity::find()
            .filter(model_folder::Column::CompanyId.eq(folder.company_id))
            .filter(model_folder::Column::Name.eq(name.as_str()))
            .filter(model_folder::Column::Id.ne(id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(conflict));
        }
        let mut active: model_folder::ActiveModel = folder.into();
        active.name = Set(name);
        let folder = active
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, conflict))?;
        txn.commit().await?;
        Ok(folder)
    }

    /// Deletes a folder; its models stay with the company, unfiled.
    #[instrument(skip(self))]
    pub async fn delete_folder(&self, id: i32) -> Result<u64, ServiceError> {
        let txn = self.db_pool.begin().await?;
        find_folder(&txn, id).await?;
        let detached = product_model::Entity::update_many()
            .col_expr(product_model::Column::FolderId, Expr::value(Option::<i32>::None))
            .filter(product_model::Column::FolderId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        model_folder::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(folder_id = id, detached, "folder deleted");
        Ok(detached)
    }

    // Product models

    #[instrument(skip(self))]
    pub async fn list_models(
        &self,
        company_id: Option<i32>,
        folder_id: Option<i32>,
    ) -> Result<Vec<product_model::Model>, ServiceError> {
        let mut query = product_model::Entity::find();
        if let Some(company_id) = company_id {
            query = query.filter(product_model::Column::CompanyId.eq(company_id));
        }
        if let Some(folder_id) = folder_id {
            query = query.filter(product_model::Column::FolderId.eq(folder_id));
        }
        Ok(query
            .order_by_asc(product_model::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_model(
        &self,
        company_id: i32,
        name: &str,
        folder_id: Option<i32>,
    ) -> Result<product_model::Model, ServiceError> {
        let name = normalize_name(name)?;
        let txn = self.db_pool.begin().await?;
        ensure_company(&txn, company_id).await?;
        if let Some(folder_id) = folder_id {
            check_folder_owner(&txn, folder_id, company_id).await?;
        }
        let model = product_model::ActiveModel {
            name: Set(name),
            company_id: Set(company_id),
            folder_id: Set(folder_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn update_model(
        &self,
        id: i32,
        changes: ModelUpdate,
    ) -> Result<product_model::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let model = find_model(&txn, id).await?;
        let company_id = model.company_id;
        let mut active: product_model::ActiveModel = model.into();
        if let Some(name) = changes.name {
            active.name = Set(normalize_name(&name)?);
        }
        if let Some(folder_id) = changes.folder_id {
            if let Some(folder_id) = folder_id {
                check_folder_owner(&txn, folder_id, company_id).await?;
            }
            active.folder_id = Set(folder_id);
        }
        let model = active.update(&txn).await?;
        txn.commit().await?;
        Ok(model)
    }

    /// Deletes a model with its file rows, then its files on disk.
    #[instrument(skip(self))]
    pub async fn delete_model(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        find_model(&txn, id).await?;
        model_file::Entity::delete_many()
            .filter(model_file::Column::ModelId.eq(id))
            .exec(&txn)
            .await?;
        product_model::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if let Err(err) = remove_model_dir(&self.upload_dir, id).await {
            warn!(model_id = id, error = %err, "could not remove model files from disk");
        }
        Ok(())
    }
}

async fn ensure_company<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), ServiceError> {
    company::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("company {} not found", id)))
}

async fn find_folder<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<model_folder::Model, ServiceError> {
    model_folder::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("folder {} not found", id)))
}

async fn find_model<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<product_model::Model, ServiceError> {
    product_model::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("model {} not found", id)))
}

async fn check_folder_owner<C: ConnectionTrait>(
    conn: &C,
    folder_id: i32,
    company_id: i32,
) -> Result<(), ServiceError> {
    let folder = find_folder(conn, folder_id).await?;
    if folder.company_id != company_id {
        return Err(ServiceError::InvalidInput(format!(
            "folder {} belongs to another company",
            folder_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("  Hanil Electronics ", Some("Hanil Electronics"))]
    #[case("", None)]
    #[case("   ", None)]
    fn names_are_trimmed_and_required(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_name(raw).ok().as_deref(), expected);
    }

    #[test]
    fn names_longer_than_the_limit_are_rejected() {
        assert!(normalize_name(&"가".repeat(100)).is_ok());
        assert!(normalize_name(&"a".repeat(101)).is_err());
    }
}
