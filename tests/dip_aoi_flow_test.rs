mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use common::{response_json, TestApp};
use ppms_api::{
    entities::{dip_group, DefectKind, DipStatus, HistoryType},
    errors::ServiceError,
    models::{LotKey, OrderMonth},
    services::{
        aoi::{AoiRecordUpdate, NewAoiRecord},
        dip::{revert_aoi_completion_if_short, NewDipGroup, NewDipHistory, RevertOutcome},
    },
};
use sea_orm::EntityTrait;
use serde_json::json;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

async fn group_status(app: &TestApp, id: i32) -> DipStatus {
    dip_group::Entity::find_by_id(id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .expect("group exists")
        .status
}

/// Creates a DIP group for lot "100" and one AOI record per quantity.
async fn lot_with_inspections(app: &TestApp, quantities: &[i32]) -> (i32, Vec<i32>) {
    let services = &app.state.services;
    let group = services
        .dip
        .create_group(NewDipGroup {
            model: "AX-100".into(),
            lot: "100".into(),
            year: 2025,
            month: OrderMonth::new(11).unwrap(),
        })
        .await
        .unwrap();

    let mut records = Vec::new();
    for (offset, qty) in quantities.iter().enumerate() {
        let record = services
            .aoi
            .create_record(NewAoiRecord {
                model: "AX-100".into(),
                year: 2025,
                month: OrderMonth::new(11).unwrap(),
                lot: "100".into(),
                date: day(3 + offset as u32),
            })
            .await
            .unwrap();
        services
            .aoi
            .update_record(
                record.id,
                AoiRecordUpdate {
                    inspection_qty: Some(*qty),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        records.push(record.id);
    }
    (group.id, records)
}

#[tokio::test]
async fn completion_reverts_when_inspected_quantity_drops() {
    let app = TestApp::new().await;
    let aoi = &app.state.services.aoi;
    let (group_id, records) = lot_with_inspections(&app, &[60, 40]).await;

    let completed = aoi.complete_group(group_id).await.unwrap();
    assert_eq!(completed.status, DipStatus::AoiCompleted);

    let view = aoi
        .update_record(
            records[1],
            AoiRecordUpdate {
                inspection_qty: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.cumulative_qty, 60);
    assert_eq!(group_status(&app, group_id).await, DipStatus::Ongoing);
}

#[tokio::test]
async fn completion_stays_while_lot_is_covered() {
    let app = TestApp::new().await;
    let aoi = &app.state.services.aoi;
    let (group_id, records) = lot_with_inspections(&app, &[70, 50]).await;
    aoi.complete_group(group_id).await.unwrap();

    // 120 -> 100 still covers the lot.
    aoi.update_record(
        records[1],
        AoiRecordUpdate {
            inspection_qty: Some(30),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(group_status(&app, group_id).await, DipStatus::AoiCompleted);

    aoi.delete_record(records[1]).await.unwrap();
    assert_eq!(group_status(&app, group_id).await, DipStatus::Ongoing);
}

#[tokio::test]
async fn completion_is_refused_while_short() {
    let app = TestApp::new().await;
    let (group_id, _) = lot_with_inspections(&app, &[30]).await;

    let result = app.state.services.aoi.complete_group(group_id).await;
    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/aoi/groups/{}/complete", group_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(group_status(&app, group_id).await, DipStatus::Ongoing);
}

#[tokio::test]
async fn duplicate_dip_group_is_a_conflict() {
    let app = TestApp::new().await;
    let body = json!({ "model": "AX-100", "lot": "100", "year": 2025, "month": 11 });

    let first = app
        .request(Method::POST, "/api/v1/dip/groups", Some(body.clone()))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let created = response_json(first).await;
    assert_eq!(created["data"]["status"], "ongoing");

    let second = app
        .request(Method::POST, "/api/v1/dip/groups", Some(body))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let error = response_json(second).await;
    assert_eq!(error["error"], "Conflict");
}

#[tokio::test]
async fn group_listing_carries_running_totals() {
    let app = TestApp::new().await;
    let dip = &app.state.services.dip;
    let (group_id, _) = lot_with_inspections(&app, &[]).await;

    for (d, kind, quantity) in [
        (5, HistoryType::Ship, 40),
        (3, HistoryType::Ship, 60),
        (4, HistoryType::Receive, 90),
    ] {
        dip.add_history(NewDipHistory {
            group_id,
            date: day(d),
            kind,
            quantity,
        })
        .await
        .unwrap();
    }

    let response = app.request(Method::GET, "/api/v1/dip/groups", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let group = &body["data"][0];
    assert_eq!(group["shipTotal"], 100);
    assert_eq!(group["receiveTotal"], 90);
    assert_eq!(group["shipping"][0]["date"], "2025-11-03");
    assert_eq!(group["shipping"][0]["cumulative"], 60);
    assert_eq!(group["shipping"][1]["cumulative"], 100);
    assert_eq!(group["receiving"][0]["type"], "receive");

    let missing = dip
        .add_history(NewDipHistory {
            group_id: group_id + 100,
            date: day(6),
            kind: HistoryType::Ship,
            quantity: 1,
        })
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn revert_without_a_group_is_a_no_op() {
    let app = TestApp::new().await;
    let key = LotKey::new("ZX-9", 2025, 11, "50");

    let outcome = revert_aoi_completion_if_short(app.state.db.as_ref(), &key)
        .await
        .unwrap();
    assert_eq!(outcome, RevertOutcome::NoGroup);
}

#[tokio::test]
async fn revert_leaves_shipped_groups_alone() {
    let app = TestApp::new().await;
    let (group_id, _) = lot_with_inspections(&app, &[30]).await;
    app.state.services.dip.complete_group(group_id).await.unwrap();

    let key = LotKey::new("AX-100", 2025, 11, "100");
    let outcome = revert_aoi_completion_if_short(app.state.db.as_ref(), &key)
        .await
        .unwrap();
    assert_eq!(outcome, RevertOutcome::Unchanged);
    assert_eq!(group_status(&app, group_id).await, DipStatus::Completed);
}

#[tokio::test]
async fn defect_totals_beyond_i32_are_rejected() {
    let app = TestApp::new().await;
    let aoi = &app.state.services.aoi;
    let (_, records) = lot_with_inspections(&app, &[10]).await;

    let mut changes = AoiRecordUpdate {
        inspection_qty: Some(10),
        ..Default::default()
    };
    changes.defects.insert(DefectKind::Missing, 2_000_000_000);
    changes.defects.insert(DefectKind::Wrong, 2_000_000_000);
    let result = aoi.update_record(records[0], changes).await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/aoi/records/{}", records[0]),
            Some(json!({ "defects": { "missing": 2_000_000_000, "wrong": 2_000_000_000 } })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The stored record is untouched.
    let view = aoi
        .update_record(records[0], AoiRecordUpdate::default())
        .await
        .unwrap();
    assert_eq!(view.total_defect, 0);
    assert_eq!(view.good_qty, 10);
}

#[tokio::test]
async fn references_accept_their_serialized_names() {
    let app = TestApp::new().await;
    let (_, records) = lot_with_inspections(&app, &[10]).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/aoi/records/{}", records[0]),
            Some(json!({
                "defects": { "missing": 1, "short": 1 },
                "references": { "missing_ref": "C12", "short": "U1" }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["references"]["missing_ref"], "C12");
    assert_eq!(body["data"]["references"]["short_ref"], "U1");
    assert_eq!(body["data"]["totalDefect"], 2);
}
