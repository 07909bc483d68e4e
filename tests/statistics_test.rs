mod common;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{ScheduleRow, TestApp};
use ppms_api::{
    entities::{DefectKind, TbType},
    models::OrderMonth,
    services::{
        aoi::{AoiRecordUpdate, NewAoiRecord},
        production::WeekKey,
        statistics::FulfillmentStatus,
    },
};

fn week(year: i32, month: i32, week: i32) -> WeekKey {
    WeekKey { year, month, week }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn order_month_summary_reconciles_top_and_bottom() {
    let app = TestApp::new().await;

    // AX-100 is split over two weeks: 60+40 Top, 100 Bot against one order of 100.
    app.seed_week(
        week(2025, 11, 1),
        &[
            ScheduleRow {
                tb: Some(TbType::Top),
                actual_prod: 60,
                ..ScheduleRow::new("AX-100", 2025, 11, (50, 100))
            },
            ScheduleRow {
                tb: Some(TbType::Bot),
                actual_prod: 100,
                ..ScheduleRow::new("AX-100", 2025, 11, (100, 100))
            },
            ScheduleRow {
                tb: Some(TbType::Top),
                actual_prod: 30,
                ..ScheduleRow::new("BX-7", 2025, 11, (200, 200))
            },
        ],
    )
    .await;
    app.seed_week(
        week(2025, 11, 2),
        &[
            ScheduleRow {
                tb: Some(TbType::Top),
                actual_prod: 40,
                ..ScheduleRow::new("AX-100", 2025, 11, (50, 100))
            },
            // Different order month: must not leak into November.
            ScheduleRow {
                tb: Some(TbType::Top),
                actual_prod: 500,
                ..ScheduleRow::new("AX-100", 2025, 12, (500, 500))
            },
        ],
    )
    .await;

    let summary = app
        .state
        .services
        .statistics
        .order_month_summary(2025, OrderMonth::new(11).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.len(), 2);
    let ax = &summary[0];
    assert_eq!(ax.model, "AX-100");
    assert_eq!(ax.total_quantity, 100);
    assert_eq!(ax.actual_production, 100);
    assert_eq!(ax.status, FulfillmentStatus::Normal);
    assert!((ax.fulfillment_rate - 100.0).abs() < f64::EPSILON);

    let bx = &summary[1];
    assert_eq!(bx.model, "BX-7");
    assert_eq!(bx.total_quantity, 200);
    // No Bot side produced yet, so no complete boards.
    assert_eq!(bx.actual_production, 0);
    assert_eq!(bx.status, FulfillmentStatus::Shortage);
}

#[tokio::test]
async fn overflow_lines_sum_every_side() {
    let app = TestApp::new().await;
    app.seed_week(
        week(2025, 10, 3),
        &[
            ScheduleRow {
                tb: Some(TbType::TopOverflow),
                actual_prod: 70,
                ..ScheduleRow::new("CX-1", 2025, 10, (100, 100))
            },
            ScheduleRow {
                tb: Some(TbType::Bot),
                actual_prod: 30,
                ..ScheduleRow::new("CX-1", 2025, 10, (100, 100))
            },
        ],
    )
    .await;

    let summary = app
        .state
        .services
        .statistics
        .order_month_summary(2025, OrderMonth::new(10).unwrap())
        .await
        .unwrap();
    assert_eq!(summary[0].actual_production, 100);
    assert_eq!(summary[0].status, FulfillmentStatus::Normal);

    let details = app
        .state
        .services
        .statistics
        .model_details("CX-1", 2025, OrderMonth::new(10).unwrap())
        .await
        .unwrap();
    assert_eq!(details.len(), 2);
}

#[tokio::test]
async fn aoi_performance_reports_all_time_cumulative() {
    let app = TestApp::new().await;
    let aoi = &app.state.services.aoi;

    for (date, qty, missing, tags) in [
        (day(2025, 10, 28), 40, 0, ""),
        (day(2025, 11, 3), 30, 2, "C1, R4"),
        (day(2025, 11, 5), 20, 1, "R4, C9"),
    ] {
        let record = aoi
            .create_record(NewAoiRecord {
                model: "AX-100".into(),
                year: 2025,
                month: OrderMonth::new(11).unwrap(),
                lot: "100".into(),
                date,
            })
            .await
            .unwrap();
        let mut defects = BTreeMap::new();
        defects.insert(DefectKind::Missing, missing);
        let mut references = BTreeMap::new();
        references.insert(DefectKind::Missing, tags.to_string());
        aoi.update_record(
            record.id,
            AoiRecordUpdate {
                inspection_qty: Some(qty),
                defects,
                references,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let report = app
        .state
        .services
        .statistics
        .aoi_performance(day(2025, 11, 1), day(2025, 11, 30))
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    let lot = &report[0];
    assert_eq!(lot.record_count, 2);
    assert_eq!(lot.inspection_qty, 50);
    assert_eq!(lot.total_defect, 3);
    assert_eq!(lot.good_qty, 47);
    // The October record lies outside the window but still counts toward the lot.
    assert_eq!(lot.cumulative_qty, 90);
    assert_eq!(lot.period, "2025-11-03 ~ 2025-11-05");
    assert_eq!(lot.defects.get(DefectKind::Missing), 3);
    assert_eq!(lot.references.get(DefectKind::Missing), "C1, C9, R4");
    assert!((lot.defect_rate - 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn aoi_performance_rejects_inverted_range() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .statistics
        .aoi_performance(day(2025, 11, 30), day(2025, 11, 1))
        .await;
    assert!(matches!(
        result,
        Err(ppms_api::errors::ServiceError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn aoi_performance_is_empty_without_records_in_window() {
    let app = TestApp::new().await;
    app.state
        .services
        .aoi
        .create_record(NewAoiRecord {
            model: "AX-100".into(),
            year: 2025,
            month: OrderMonth::new(10).unwrap(),
            lot: "100".into(),
            date: day(2025, 10, 28),
        })
        .await
        .unwrap();

    let report = app
        .state
        .services
        .statistics
        .aoi_performance(day(2025, 11, 1), day(2025, 11, 30))
        .await
        .unwrap();
    assert!(report.is_empty());
}
