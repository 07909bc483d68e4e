//! Files attached to product models, stored on local disk under
//! `<upload_dir>/<model_id>/`.

use crate::{
    db::DbPool,
    entities::{model_file, product_model},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// An upload as received from the client.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub data_type: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A stored file together with its contents, ready to be sent back.
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub file: model_file::Model,
    pub bytes: Vec<u8>,
}

/// Directory holding every file of one model.
pub fn model_dir(root: &Path, model_id: i32) -> PathBuf {
    root.join(model_id.to_string())
}

/// Removes a model's upload directory; a missing directory is not an error.
pub async fn remove_model_dir(root: &Path, model_id: i32) -> Result<(), ServiceError> {
    match tokio::fs::remove_dir_all(model_dir(root, model_id)).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Last path component of a client-supplied name, so uploads cannot escape
/// the model directory.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

fn stored_name(original: &str) -> String {
    match Path::new(original).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", Uuid::new_v4(), ext),
        _ => Uuid::new_v4().to_string(),
    }
}

#[derive(Clone)]
pub struct ModelFileService {
    db_pool: Arc<DbPool>,
    upload_dir: PathBuf,
}

impl ModelFileService {
    pub fn new(db_pool: Arc<DbPool>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_pool,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    #[instrument(skip(self))]
    pub async fn list(&self, model_id: i32) -> Result<Vec<model_file::Model>, ServiceError> {
        self.ensure_model(model_id).await?;
        let files = model_file::Entity::find()
            .filter(model_file::Column::ModelId.eq(model_id))
            .order_by_asc(model_file::Column::DataType)
            .order_by_asc(model_file::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(files)
    }

    /// Stores an upload for the model. An existing file of the same data type
    /// is replaced.
    #[instrument(skip(self, upload), fields(data_type = %upload.data_type, size = upload.bytes.len()))]
    pub async fn store(
        &self,
        model_id: i32,
        upload: FileUpload,
    ) -> Result<model_file::Model, ServiceError> {
        let data_type = upload.data_type.trim().to_uppercase();
        if data_type.is_empty() {
            return Err(ServiceError::ValidationError(
                "data_type is required".to_string(),
            ));
        }
        let file_name = sanitize_file_name(&upload.file_name).ok_or_else(|| {
            ServiceError::ValidationError("file name is required".to_string())
        })?;
        self.ensure_model(model_id).await?;

        let dir = model_dir(&self.upload_dir, model_id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(stored_name(&file_name));
        tokio::fs::write(&path, &upload.bytes).await?;
        let stored_path = path.to_string_lossy().into_owned();

        let saved = self
            .save_row(model_id, &data_type, file_name, upload.content_type, &stored_path, upload.bytes.len())
            .await;
        match saved {
            Ok((file, replaced)) => {
                if let Some(old_path) = replaced {
                    if let Err(err) = tokio::fs::remove_file(&old_path).await {
                        warn!(path = %old_path, error = %err, "could not remove replaced file");
                    }
                }
                info!(file_id = file.id, model_id, "model file stored");
                Ok(file)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(err)
            }
        }
    }

    async fn save_row(
        &self,
        model_id: i32,
        data_type: &str,
        file_name: String,
        content_type: Option<String>,
        stored_path: &str,
        size: usize,
    ) -> Result<(model_file::Model, Option<String>), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = model_file::Entity::find()
            .filter(model_file::Column::ModelId.eq(model_id))
            .filter(model_file::Column::DataType.eq(data_type))
            .one(&txn)
            .await?;

        let size_bytes = i64::try_from(size)
            .map_err(|_| ServiceError::PayloadTooLarge("file is too large".to_string()))?;
        let (file, replaced) = match existing {
            Some(previous) => {
                let old_path = previous.stored_path.clone();
                let mut active: model_file::ActiveModel = previous.into();
                active.file_name = Set(file_name);
                active.stored_path = Set(stored_path.to_string());
                active.content_type = Set(content_type);
                active.size_bytes = Set(size_bytes);
                (active.update(&txn).await?, Some(old_path))
            }
            None => {
                let file = model_file::ActiveModel {
                    model_id: Set(model_id),
                    data_type: Set(data_type.to_string()),
                    file_name: Set(file_name),
                    stored_path: Set(stored_path.to_string()),
                    content_type: Set(content_type),
                    size_bytes: Set(size_bytes),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                (file, None)
            }
        };
        txn.commit().await?;
        Ok((file, replaced))
    }

    #[instrument(skip(self))]
    pub async fn download(&self, model_id: i32, file_id: i32) -> Result<FileDownload, ServiceError> {
        let file = self.find_file(model_id, file_id).await?;
        let bytes = match tokio::fs::read(&file.stored_path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(format!(
                    "contents of file {} are missing",
                    file_id
                )))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(FileDownload { file, bytes })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, model_id: i32, file_id: i32) -> Result<(), ServiceError> {
        let file = self.find_file(model_id, file_id).await?;
        model_file::Entity::delete_by_id(file.id)
            .exec(&*self.db_pool)
            .await?;
        if let Err(err) = tokio::fs::remove_file(&file.stored_path).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %file.stored_path, error = %err, "could not remove stored file");
            }
        }
        Ok(())
    }

    async fn find_file(&self, model_id: i32, file_id: i32) -> Result<model_file::Model, ServiceError> {
        model_file::Entity::find_by_id(file_id)
            .filter(model_file::Column::ModelId.eq(model_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("file {} of model {} not found", file_id, model_id))
            })
    }

    async fn ensure_model(&self, model_id: i32) -> Result<(), ServiceError> {
        product_model::Entity::find_by_id(model_id)
            .one(&*self.db_pool)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("model {} not found", model_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("bom.xlsx", Some("bom.xlsx"))]
    #[case("../../etc/passwd", Some("passwd"))]
    #[case("C:\\boards\\coord.csv", Some("coord.csv"))]
    #[case("dir/", None)]
    #[case("..", None)]
    fn strips_directories_from_upload_names(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(sanitize_file_name(raw).as_deref(), expected);
    }

    #[test]
    fn stored_names_keep_the_extension() {
        assert!(stored_name("bom.xlsx").ends_with(".xlsx"));
        assert!(!stored_name("README").contains('.'));
    }

    #[tokio::test]
    async fn removing_a_missing_model_dir_is_ok() {
        let root = tempfile::tempdir().unwrap();
        remove_model_dir(root.path(), 42).await.unwrap();

        let dir = model_dir(root.path(), 7);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("a.bin"), b"x").await.unwrap();
        remove_model_dir(root.path(), 7).await.unwrap();
        assert!(!dir.exists());
    }
}
