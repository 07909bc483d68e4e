#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use ppms_api::{
    config::AppConfig,
    db,
    entities::production_schedule,
    models::{LotQuantity, OrderMonth},
    services::production::{ScheduleInput, ScheduleUpdate, WeekFilter, WeekKey},
    AppState,
};
use sea_orm::EntityTrait;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Application state and router backed by a migrated SQLite file in a
/// temporary directory. Uploads land in the same directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("ppms_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.upload_dir = dir.path().join("uploads").display().to_string();
        cfg.max_upload_bytes = 64 * 1024;
        cfg.db_max_connections = 4;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = ppms_api::app_router(state.clone());

        Self { router, state, dir }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("build request")).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Replaces `week` with `rows` and records each row's `actual_prod`.
    /// Returns the stored rows in input order.
    pub async fn seed_week(
        &self,
        week: WeekKey,
        rows: &[ScheduleRow<'_>],
    ) -> Vec<production_schedule::Model> {
        let services = &self.state.services;
        services
            .schedules
            .save_week(week, rows.iter().map(ScheduleRow::input).collect())
            .await
            .expect("save schedule rows");
        let stored = services
            .schedules
            .list(WeekFilter {
                year: Some(week.year),
                month: Some(week.month),
                week: Some(week.week),
            })
            .await
            .expect("list week");
        assert_eq!(stored.len(), rows.len());

        let mut models = Vec::with_capacity(rows.len());
        for (view, row) in stored.iter().zip(rows) {
            services
                .schedules
                .update(
                    view.id,
                    ScheduleUpdate {
                        actual_prod: Some(row.actual_prod),
                        ..Default::default()
                    },
                )
                .await
                .expect("record production");
            let model = production_schedule::Entity::find_by_id(view.id)
                .one(self.state.db.as_ref())
                .await
                .expect("reload row")
                .expect("row exists");
            models.push(model);
        }
        models
    }
}

/// Compact description of a planning row for seeding.
#[derive(Clone, Copy)]
pub struct ScheduleRow<'a> {
    pub model: &'a str,
    pub company: Option<&'a str>,
    pub order_year: i32,
    pub order_month: i64,
    pub tb: Option<ppms_api::entities::TbType>,
    pub lot: (i32, i32),
    pub actual_prod: i32,
}

impl<'a> ScheduleRow<'a> {
    pub fn new(model: &'a str, order_year: i32, order_month: i64, lot: (i32, i32)) -> Self {
        Self {
            model,
            company: None,
            order_year,
            order_month,
            tb: None,
            lot,
            actual_prod: 0,
        }
    }

    fn input(&self) -> ScheduleInput {
        ScheduleInput {
            id: None,
            line: "L1".to_string(),
            company: self.company.map(str::to_string),
            model: self.model.to_string(),
            order_year: Some(self.order_year),
            order_month: Some(OrderMonth::new(self.order_month).expect("valid month")),
            tb: self.tb,
            start_date: None,
            end_date: None,
            lot: LotQuantity::new(self.lot.0, self.lot.1),
        }
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body bytes")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json response")
}
