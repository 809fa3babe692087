//! Read-only dashboard endpoints. None of them write the ledger.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Days;
use serde::Deserialize;

use messpay_settlement::analytics::{daily_summary as summarize_day, rank_top_merchants, revenue_trend};
use messpay_settlement::cycle::{local_date, to_timestamp};
use messpay_settlement::TimeRange;
use messpay_types::api::{DailySummary, TopMerchant, TrendPoint};

use crate::commands::clamped_param;
use crate::http::ApiError;
use crate::DaemonState;

const SECS_PER_DAY: u64 = 24 * 60 * 60;
const MAX_SINCE_DAYS: u32 = 365;
const DEFAULT_TREND_DAYS: u32 = 7;
const MAX_TREND_DAYS: u32 = 31;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopQuery {
    pub limit: Option<String>,
    pub since_days: Option<String>,
}

/// `GET /payouts/top?limit=&sinceDays=`: merchants ranked by revenue, then
/// order count, over a trailing window ending now.
pub async fn top_merchants(
    State(state): State<Arc<DaemonState>>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<TopMerchant>>, ApiError> {
    let analytics = &state.config.analytics;
    let limit = clamped_param(
        query.limit.as_deref(),
        analytics.top_default_limit,
        1,
        analytics.top_max_limit.max(1),
    );
    let since_days = clamped_param(
        query.since_days.as_deref(),
        analytics.top_default_since_days,
        1,
        MAX_SINCE_DAYS,
    );

    let now = to_timestamp((state.clock)());
    let range = TimeRange::new(
        now.saturating_sub(u64::from(since_days) * SECS_PER_DAY),
        now.saturating_add(1),
    );
    let snapshot = {
        let mut db = state.db.lock().await;
        messpay_ledger::snapshot(&mut db, &state.settlement, range)?
    };

    Ok(Json(rank_top_merchants(
        &snapshot.orders,
        &snapshot.directory,
        &state.settlement.eligible,
        range,
        limit,
    )))
}

/// `GET /payouts/summary/daily`: today's totals in the reporting timezone.
pub async fn daily_summary(
    State(state): State<Arc<DaemonState>>,
) -> Result<Json<DailySummary>, ApiError> {
    let rate = state.settlement.rate;
    let offset = state.settlement.offset;
    let today = local_date(to_timestamp((state.clock)()), offset);
    let range = TimeRange::for_days(today, 1, offset);
    let snapshot = {
        let mut db = state.db.lock().await;
        messpay_ledger::snapshot(&mut db, &state.settlement, range)?
    };

    Ok(Json(summarize_day(
        &snapshot.orders,
        &state.settlement.eligible,
        today,
        offset,
        rate,
    )?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub days: Option<String>,
}

/// `GET /payouts/trends?days=7`: per-day revenue for the trailing days,
/// zero-filled, oldest first.
pub async fn revenue_trends(
    State(state): State<Arc<DaemonState>>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    let days = clamped_param(query.days.as_deref(), DEFAULT_TREND_DAYS, 1, MAX_TREND_DAYS);
    let offset = state.settlement.offset;
    let today = local_date(to_timestamp((state.clock)()), offset);
    let first = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(today);
    let range = TimeRange::for_days(first, days, offset);
    let snapshot = {
        let mut db = state.db.lock().await;
        messpay_ledger::snapshot(&mut db, &state.settlement, range)?
    };

    Ok(Json(revenue_trend(
        &snapshot.orders,
        &state.settlement.eligible,
        today,
        days,
        offset,
    )))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::http::router;
    use crate::http::tests::send;
    use crate::tests::{seeded_state, ANNAPURNA, SHIVAM};

    #[tokio::test]
    async fn test_top_merchants() {
        let state = seeded_state();
        let (status, _, body) = send(router(state), "GET", "/payouts/top?limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().expect("array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["merchantId"], ANNAPURNA);
        assert_eq!(rows[0]["orderCount"], 4);
        assert_eq!(rows[0]["location"], "Kothrud, Pune");
    }

    #[tokio::test]
    async fn test_top_merchants_defaults_and_bad_params() {
        let state = seeded_state();
        let (status, _, body) =
            send(router(state), "GET", "/payouts/top?limit=abc&sinceDays=-3", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().expect("array");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["merchantId"], SHIVAM);
    }

    #[tokio::test]
    async fn test_daily_summary() {
        let state = seeded_state();
        let (status, _, body) = send(router(state), "GET", "/payouts/summary/daily", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2025-03-14");
        assert_eq!(body["totalOrders"], 2);
        assert_eq!(body["totalGrossRevenue"], 300);
        assert_eq!(body["totalCommission"], 30);
        assert_eq!(body["totalRevenue"], 270);
    }

    #[tokio::test]
    async fn test_revenue_trends() {
        let state = seeded_state();
        let (status, _, body) = send(router(state), "GET", "/payouts/trends?days=99", None).await;
        assert_eq!(status, StatusCode::OK);
        let points = body.as_array().expect("array");
        assert_eq!(points.len(), 31);
        assert_eq!(points[30]["date"], "2025-03-14");
        assert_eq!(points[30]["totalRevenue"], 300);
    }
}
