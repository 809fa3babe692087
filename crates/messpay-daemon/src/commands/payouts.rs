//! Payout ledger endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use messpay_db::queries::{merchants, payouts};
use messpay_settlement::cycle::to_timestamp;
use messpay_settlement::resolver::resolve;
use messpay_settlement::{MerchantDirectory, MerchantIndex, Resolution};
use messpay_types::api::{PayoutLine, StatusUpdateRequest, StatusUpdateResponse};
use messpay_types::merchant::normalize_name;
use messpay_types::{MerchantKey, MerchantRef, PayoutStatus, SettlementCycle};

use crate::commands::cycle_or_current;
use crate::events::EventType;
use crate::http::ApiError;
use crate::DaemonState;

/// Response header carrying merge warnings as a JSON array of strings.
pub const WARNINGS_HEADER: &str = "x-report-warnings";

#[derive(Debug, Default, Deserialize)]
pub struct PayoutsQuery {
    pub cycle: Option<String>,
}

/// `GET /payouts?cycle=`: regenerate the cycle and return its ledger rows.
pub async fn list_payouts(
    State(state): State<Arc<DaemonState>>,
    Query(query): Query<PayoutsQuery>,
) -> Result<Response, ApiError> {
    let now = (state.clock)();
    let cycle = cycle_or_current(query.cycle.as_deref(), now, state.settlement.offset)?;

    let run = {
        let mut db = state.db.lock().await;
        messpay_ledger::run_report(&mut db, &state.settlement, cycle, to_timestamp(now))?
    };

    state.event_bus.emit(
        EventType::ReportGenerated,
        to_timestamp(now),
        serde_json::json!({
            "cycle": cycle.to_string(),
            "rows": run.rows.len(),
            "warnings": run.report.warnings.len(),
        }),
    );

    let mut response = Json(run.lines()).into_response();
    if !run.report.warnings.is_empty() {
        let warnings: Vec<String> = run.report.warnings.iter().map(ToString::to_string).collect();
        let encoded = serde_json::to_string(&warnings).map_err(anyhow::Error::from)?;
        match HeaderValue::from_str(&encoded) {
            Ok(value) => {
                response.headers_mut().insert(WARNINGS_HEADER, value);
            }
            Err(_) => warn!(%cycle, "report warnings not representable as a header"),
        }
    }
    Ok(response)
}

/// Ledger keys an admin-supplied merchant reference may address, most
/// specific first.
///
/// Accepts a canonical id, a legacy numeric id, a display name, or the
/// `name:<normalized>` key of an unresolved row. A name that fails the
/// exact lookup but matches exactly one merchant after normalization
/// yields that merchant first, as in the report's merge step. A name
/// always yields its unresolved key too, since the report keeps a
/// name-keyed row when no resolved group absorbs it.
pub(crate) fn ledger_keys(directory: &MerchantIndex, raw: &str) -> Vec<MerchantKey> {
    let raw = raw.trim();
    if let Ok(key @ MerchantKey::Unresolved(_)) = raw.parse::<MerchantKey>() {
        return vec![key];
    }
    let reference = MerchantRef::parse(raw);
    let mut keys = Vec::with_capacity(2);
    match resolve(directory, reference.as_ref(), Some(raw)) {
        Resolution::Resolved(merchant) => keys.push(MerchantKey::Resolved(merchant.id)),
        Resolution::Unresolved { name } => {
            let normalized = normalize_name(&name);
            let mut candidates = directory
                .iter()
                .filter(|m| normalize_name(&m.name) == normalized);
            if let (Some(only), None) = (candidates.next(), candidates.next()) {
                keys.push(MerchantKey::Resolved(only.id.clone()));
            }
        }
    }
    if !matches!(reference, Some(MerchantRef::CanonicalId(_))) {
        let unresolved = MerchantKey::unresolved(raw);
        if !keys.contains(&unresolved) {
            keys.push(unresolved);
        }
    }
    keys
}

/// The first of `keys` with a ledger row in `cycle`, else the first key.
fn row_key(
    conn: &rusqlite::Connection,
    keys: Vec<MerchantKey>,
    cycle: &SettlementCycle,
) -> Result<MerchantKey, ApiError> {
    for key in &keys {
        if payouts::get(conn, key, cycle)?.is_some() {
            return Ok(key.clone());
        }
    }
    keys.into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("merchantId missing".to_string()))
}

/// `PUT /payouts/status`: admin status transition for one ledger row.
pub async fn update_status(
    State(state): State<Arc<DaemonState>>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    let merchant = request
        .merchant_id
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("merchantId missing".to_string()))?;
    let status: PayoutStatus = request
        .payout_status
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("payoutStatus missing".to_string()))?
        .parse()?;
    let now = (state.clock)();
    let cycle = cycle_or_current(request.cycle.as_deref(), now, state.settlement.offset)?;

    let (key, change) = {
        let mut db = state.db.lock().await;
        let directory = MerchantIndex::new(merchants::all(&db)?);
        let key = row_key(&db, ledger_keys(&directory, merchant), &cycle)?;
        let change = payouts::set_status(&mut db, &key, &cycle, status, to_timestamp(now))?;
        (key, change)
    };

    if change.changed {
        let payload = serde_json::json!({
            "merchantId": key.to_string(),
            "settlementCycle": cycle.to_string(),
            "payoutStatus": status.as_str(),
        });
        match status {
            PayoutStatus::Paid => {
                info!(merchant = %key, %cycle, "payout marked paid");
                state.event_bus.emit(EventType::PayoutPaid, to_timestamp(now), payload);
            }
            PayoutStatus::Pending => {
                warn!(merchant = %key, %cycle, "paid payout reverted to pending by admin");
                state.event_bus.emit(EventType::PayoutReverted, to_timestamp(now), payload);
            }
        }
    }

    Ok(Json(StatusUpdateResponse {
        success: true,
        message: format!("Payout status updated to {status}"),
        payout_status: Some(status.to_string()),
    }))
}

/// `GET /payouts/history/:merchant_id`: every ledger row for one merchant.
pub async fn history(
    State(state): State<Arc<DaemonState>>,
    Path(merchant): Path<String>,
) -> Result<Json<Vec<PayoutLine>>, ApiError> {
    let db = state.db.lock().await;
    let directory = MerchantIndex::new(merchants::all(&db)?);
    let mut found = None;
    for key in ledger_keys(&directory, &merchant) {
        let rows = payouts::history_for_merchant(&db, &key)?;
        if !rows.is_empty() {
            found = Some((key, rows));
            break;
        }
    }
    drop(db);

    let Some((key, rows)) = found else {
        return Err(ApiError::NotFound(format!("No payout history for {merchant}")));
    };
    let owner = key.merchant_id().and_then(|id| directory.by_id(id));
    Ok(Json(
        rows.iter()
            .map(|row| {
                PayoutLine::from_record(
                    row,
                    owner.and_then(|m| m.owner_name.as_deref()),
                    owner.and_then(|m| m.owner_email.as_deref()),
                )
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::http::router;
    use crate::http::tests::send;
    use crate::tests::{seeded_state, ANNAPURNA};

    #[tokio::test]
    async fn test_list_payouts_collapses_reference_forms() {
        let state = seeded_state();
        let (status, headers, body) =
            send(router(state), "GET", "/payouts?cycle=2025-03-C1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(WARNINGS_HEADER).is_none());

        let rows = body.as_array().expect("array");
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["merchantId"], ANNAPURNA);
        assert_eq!(row["merchantName"], "Annapurna Mess");
        assert_eq!(row["ownerName"], "Asha Kulkarni");
        assert_eq!(row["ownerEmail"], "N/A");
        assert_eq!(row["totalOrders"], 3);
        assert_eq!(row["totalRevenue"], 500);
        assert_eq!(row["commissionRate"], 10.0);
        assert_eq!(row["commission"], 50);
        assert_eq!(row["payable"], 450);
        assert_eq!(row["payoutStatus"], "Pending");
        assert_eq!(row["settlementCycle"], "2025-03-C1");
    }

    #[tokio::test]
    async fn test_malformed_cycle_is_400() {
        let state = seeded_state();
        let (status, _, body) =
            send(router(state), "GET", "/payouts?cycle=2025-03-C4", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_status_update_flow() {
        let state = seeded_state();
        let mut events = state.event_bus.subscribe();
        let app = router(state.clone());

        send(app.clone(), "GET", "/payouts?cycle=2025-03-C1", None).await;
        let body = json!({"merchantId": "7", "payoutStatus": "paid", "cycle": "2025-03-C1"});

        let (status, _, reply) = send(app.clone(), "PUT", "/payouts/status", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["success"], true);
        assert_eq!(reply["payoutStatus"], "Paid");

        // Idempotent: second identical request succeeds without a new event.
        let (status, _, _) = send(app.clone(), "PUT", "/payouts/status", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let mut paid = 0;
        while let Ok(event) = events.try_recv() {
            if event.event_type == EventType::PayoutPaid {
                paid += 1;
            }
        }
        assert_eq!(paid, 1);

        // Regenerating the report keeps the row Paid.
        let (_, _, rows) = send(app, "GET", "/payouts?cycle=2025-03-C1", None).await;
        assert_eq!(rows[0]["payoutStatus"], "Paid");
    }

    #[tokio::test]
    async fn test_status_update_errors() {
        let state = seeded_state();
        let app = router(state);

        let (status, _, body) = send(
            app.clone(),
            "PUT",
            "/payouts/status",
            Some(json!({"payoutStatus": "Paid"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "merchantId missing");

        let (status, _, _) = send(
            app.clone(),
            "PUT",
            "/payouts/status",
            Some(json!({"merchantId": ANNAPURNA, "payoutStatus": "settled", "cycle": "2025-03-C1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // No report run yet for this cycle, so no ledger row.
        let (status, _, body) = send(
            app,
            "PUT",
            "/payouts/status",
            Some(json!({"merchantId": ANNAPURNA, "payoutStatus": "Paid", "cycle": "2025-03-C2"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_history() {
        let state = seeded_state();
        let app = router(state);
        send(app.clone(), "GET", "/payouts?cycle=2025-03-C1", None).await;

        let uri = format!("/payouts/history/{ANNAPURNA}");
        let (status, _, body) = send(app.clone(), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("array").len(), 1);

        let (status, _, _) = send(app, "GET", "/payouts/history/Nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_ledger_key_forms() {
        let directory = crate::tests::directory();
        let canonical = MerchantKey::Resolved(ANNAPURNA.parse().expect("id"));
        assert_eq!(ledger_keys(&directory, ANNAPURNA), vec![canonical.clone()]);
        assert_eq!(
            ledger_keys(&directory, "7"),
            vec![canonical.clone(), MerchantKey::unresolved("7")]
        );
        assert_eq!(
            ledger_keys(&directory, "Annapurna Mess"),
            vec![canonical.clone(), MerchantKey::unresolved("annapurna mess")]
        );
        assert_eq!(
            ledger_keys(&directory, "annapurna  mess"),
            vec![canonical, MerchantKey::unresolved("annapurna mess")]
        );
        assert_eq!(
            ledger_keys(&directory, "name:roadside dhaba"),
            vec![MerchantKey::unresolved("roadside dhaba")]
        );
        assert_eq!(
            ledger_keys(&directory, "Roadside Dhaba"),
            vec![MerchantKey::unresolved("roadside dhaba")]
        );
    }

    #[tokio::test]
    async fn test_name_keyed_row_is_addressable_by_name() {
        let state = crate::tests::test_state();
        {
            let conn = state.db.lock().await;
            for m in crate::tests::directory().iter() {
                merchants::insert(&conn, m).expect("merchant");
            }
            messpay_db::queries::orders::insert(
                &conn,
                &messpay_types::Order {
                    id: "o1".to_string(),
                    merchant_ref: None,
                    merchant_name: Some("annapurna mess".to_string()),
                    items: vec![],
                    total_amount: Some(50),
                    status: messpay_types::OrderStatus::Confirmed,
                    created_at: 1_740_983_400,
                },
            )
            .expect("order");
        }
        let app = router(state);

        let (_, _, rows) = send(app.clone(), "GET", "/payouts?cycle=2025-03-C1", None).await;
        assert_eq!(rows[0]["merchantId"], "name:annapurna mess");

        let body = json!({"merchantId": "annapurna mess", "payoutStatus": "Paid", "cycle": "2025-03-C1"});
        let (status, _, reply) = send(app.clone(), "PUT", "/payouts/status", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["payoutStatus"], "Paid");

        let (_, _, rows) = send(app.clone(), "GET", "/payouts?cycle=2025-03-C1", None).await;
        assert_eq!(rows[0]["payoutStatus"], "Paid");

        let (status, _, history) = send(app, "GET", "/payouts/history/Annapurna%20Mess", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history[0]["merchantId"], "name:annapurna mess");
    }
}
