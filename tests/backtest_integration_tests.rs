mod common;

use std::collections::HashMap;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;

use stockrec_backend::{
    AppState,
    error::BacktestError,
    handlers::{backtest, recommendations},
    models::backtest::Category,
    services::{
        auto_close::run_auto_close_sweep,
        market_data::MarketDataService,
        performance,
        price_updater::{apply_price_updates, run_price_update_cycle},
        records::{
            self, CloseOutcome, NewRecommendation, close_record, create_recommendation,
            find_record, get_active_symbols, update_price,
        },
    },
};

use crate::common::setup_test_db;

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

async fn seed(
    db: &DatabaseConnection,
    symbol: &str,
    category: Category,
    entered_at: NaiveDateTime,
) -> stockrec_backend::entities::recommendation_records::Model {
    create_recommendation(
        db,
        NewRecommendation {
            symbol: symbol.to_string(),
            name: format!("{} Corp", symbol),
            category,
            recommendation: "buy".to_string(),
            entry_price: dec!(100),
            ai_score: 75,
            signal: "breakout".to_string(),
            reason: "momentum".to_string(),
        },
        entered_at,
    )
    .await
    .expect("seed record")
}

async fn test_state() -> AppState {
    let db = setup_test_db().await.expect("test db");
    // Unroutable provider: anything touching it sees a fast failure
    AppState::new(db, MarketDataService::new("http://127.0.0.1:9".to_string()))
}

fn test_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(backtest::health_check))
        .route(
            "/api/recommendations",
            post(recommendations::ingest_recommendations),
        )
        .route("/api/backtest/records", get(backtest::get_records))
        .route("/api/backtest/summary", get(backtest::get_summary))
        .route("/api/backtest/performance", get(backtest::get_performance))
        .route("/api/backtest/close/{id}", post(backtest::close_position))
        .route(
            "/api/backtest/stop-config",
            get(backtest::get_stop_config).post(backtest::set_stop_config),
        )
        .route(
            "/api/backtest/check-auto-close",
            post(backtest::check_auto_close),
        )
        .with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

// ------- RECORD STORE -------

#[tokio::test]
async fn same_day_duplicate_returns_existing_record() {
    let db = setup_test_db().await.unwrap();
    let t = now();

    let first = seed(&db, "600519", Category::Trend, t).await;
    let second = seed(&db, "600519", Category::Trend, t).await;

    assert_eq!(first.id, second.id);

    let (all, total) = records::get_records(&db, "all", None, None, 1, 50, t)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn different_category_or_day_creates_new_record() {
    let db = setup_test_db().await.unwrap();

    let monday = at(2026, 8, 24, 10);
    let tuesday = at(2026, 8, 25, 10);

    let a = seed(&db, "600519", Category::Trend, monday).await;
    let b = seed(&db, "600519", Category::Value, monday).await;
    let c = seed(&db, "600519", Category::Trend, tuesday).await;

    assert_ne!(a.id, b.id);
    assert_ne!(a.id, c.id);
}

#[tokio::test]
async fn concurrent_same_day_creates_resolve_to_one_record() {
    let db = setup_test_db().await.unwrap();
    let t = now();

    let (a, b) = tokio::join!(
        seed(&db, "600519", Category::Trend, t),
        seed(&db, "600519", Category::Trend, t),
    );

    assert_eq!(a.id, b.id);

    let (_, total) = records::get_records(&db, "all", None, None, 1, 10, t)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn rejects_non_positive_entry_price() {
    let db = setup_test_db().await.unwrap();

    let result = create_recommendation(
        &db,
        NewRecommendation {
            symbol: "600519".to_string(),
            name: "Kweichow Moutai".to_string(),
            category: Category::Shortterm,
            recommendation: "buy".to_string(),
            entry_price: Decimal::ZERO,
            ai_score: 50,
            signal: String::new(),
            reason: String::new(),
        },
        now(),
    )
    .await;

    assert!(matches!(result, Err(BacktestError::InvalidInput(_))));
}

#[tokio::test]
async fn price_update_recomputes_derived_fields() {
    let db = setup_test_db().await.unwrap();
    let t = now();

    let record = seed(&db, "600519", Category::Trend, t).await;
    assert_eq!(record.current_price, None);
    assert_eq!(record.profit_percent, Decimal::ZERO);

    let updated = update_price(&db, &record, dec!(115), t).await.unwrap();
    assert!(updated);

    let record = find_record(&db, record.id).await.unwrap();
    assert_eq!(record.current_price, Some(dec!(115)));
    assert_eq!(record.profit_percent, dec!(15.00));
    assert_eq!(record.holding_days, 0);
    assert!(record.price_updated_at.is_some());
}

#[tokio::test]
async fn close_is_terminal() {
    let db = setup_test_db().await.unwrap();
    let t = now();

    let record = seed(&db, "600519", Category::Trend, t).await;

    let outcome = close_record(&db, record.id, Some(dec!(92)), records::REASON_MANUAL, t)
        .await
        .unwrap();
    let closed = match outcome {
        CloseOutcome::Closed(model) => model,
        CloseOutcome::AlreadyClosed => panic!("first close must win"),
    };
    assert_eq!(closed.status, records::STATUS_CLOSED);
    assert_eq!(closed.close_price, Some(dec!(92)));
    assert_eq!(closed.close_reason.as_deref(), Some("manual"));
    assert_eq!(closed.profit_percent, dec!(-8.00));

    // A later price update must be a silent no-op
    let updated = update_price(&db, &closed, dec!(150), t).await.unwrap();
    assert!(!updated);

    // A second close must report AlreadyClosed and change nothing
    let second = close_record(&db, record.id, Some(dec!(50)), records::REASON_MANUAL, t)
        .await
        .unwrap();
    assert!(matches!(second, CloseOutcome::AlreadyClosed));

    let after = find_record(&db, record.id).await.unwrap();
    assert_eq!(after.close_price, Some(dec!(92)));
    assert_eq!(after.close_reason.as_deref(), Some("manual"));
    assert_eq!(after.profit_percent, dec!(-8.00));
    assert_eq!(after.status, records::STATUS_CLOSED);
}

#[tokio::test]
async fn close_unknown_record_is_not_found() {
    let db = setup_test_db().await.unwrap();

    let result = close_record(&db, 9999, None, records::REASON_MANUAL, now()).await;
    assert!(matches!(result, Err(BacktestError::NotFound(9999))));
}

#[tokio::test]
async fn manual_close_defaults_to_last_known_price() {
    let db = setup_test_db().await.unwrap();
    let t = now();

    let with_quote = seed(&db, "600519", Category::Trend, t).await;
    update_price(&db, &with_quote, dec!(110), t).await.unwrap();
    let outcome = close_record(&db, with_quote.id, None, records::REASON_MANUAL, t)
        .await
        .unwrap();
    let CloseOutcome::Closed(model) = outcome else {
        panic!("expected close to succeed");
    };
    assert_eq!(model.close_price, Some(dec!(110)));

    // No quote ever landed: falls back to the entry price
    let without_quote = seed(&db, "600036", Category::Trend, t).await;
    let outcome = close_record(&db, without_quote.id, None, records::REASON_MANUAL, t)
        .await
        .unwrap();
    let CloseOutcome::Closed(model) = outcome else {
        panic!("expected close to succeed");
    };
    assert_eq!(model.close_price, Some(dec!(100)));
    assert_eq!(model.profit_percent, Decimal::ZERO);
}

#[tokio::test]
async fn concurrent_close_has_exactly_one_winner() {
    let db = setup_test_db().await.unwrap();
    let t = now();

    let record = seed(&db, "600519", Category::Trend, t).await;
    update_price(&db, &record, dec!(105), t).await.unwrap();

    let (a, b) = tokio::join!(
        close_record(&db, record.id, Some(dec!(110)), records::REASON_MANUAL, t),
        close_record(&db, record.id, Some(dec!(120)), records::REASON_MANUAL, t),
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let winners: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            CloseOutcome::Closed(model) => Some(model),
            CloseOutcome::AlreadyClosed => None,
        })
        .collect();

    assert_eq!(winners.len(), 1, "exactly one close may succeed");

    let final_record = find_record(&db, record.id).await.unwrap();
    assert_eq!(final_record.status, records::STATUS_CLOSED);
    assert_eq!(final_record.close_price, winners[0].close_price);
    assert_eq!(final_record.close_reason, winners[0].close_reason);
}

#[tokio::test]
async fn records_query_filters_and_paginates() {
    let db = setup_test_db().await.unwrap();

    let day1 = at(2026, 8, 24, 10);
    let day2 = at(2026, 8, 25, 10);

    seed(&db, "600519", Category::Trend, day1).await;
    seed(&db, "600036", Category::Value, day1).await;
    let latest = seed(&db, "600000", Category::Trend, day2).await;
    close_record(&db, latest.id, Some(dec!(101)), records::REASON_MANUAL, day2)
        .await
        .unwrap();

    let t = at(2026, 8, 25, 18);

    // Newest first, offset pagination
    let (page1, total) = records::get_records(&db, "all", None, None, 1, 2, t)
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].symbol, "600000");

    let (page2, _) = records::get_records(&db, "all", None, None, 2, 2, t)
        .await
        .unwrap();
    assert_eq!(page2.len(), 1);

    // Status and category filters
    let (active, total) = records::get_records(&db, "all", Some("active"), None, 1, 10, t)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(active.iter().all(|r| r.status == records::STATUS_ACTIVE));

    let (trend, total) = records::get_records(&db, "all", None, Some("trend"), 1, 10, t)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(trend.iter().all(|r| r.category == "trend"));
}

#[tokio::test]
async fn period_window_excludes_old_entries() {
    let db = setup_test_db().await.unwrap();

    seed(&db, "OLD1", Category::Trend, at(2026, 7, 1, 10)).await;
    seed(&db, "NEW1", Category::Trend, at(2026, 8, 24, 10)).await;

    let t = at(2026, 8, 25, 10);

    let (_, total_7d) = records::get_records(&db, "7d", None, None, 1, 10, t)
        .await
        .unwrap();
    assert_eq!(total_7d, 1);

    let (_, total_all) = records::get_records(&db, "all", None, None, 1, 10, t)
        .await
        .unwrap();
    assert_eq!(total_all, 2);

    // Unknown period strings behave like 30d
    let (_, total_unknown) = records::get_records(&db, "bogus", None, None, 1, 10, t)
        .await
        .unwrap();
    assert_eq!(total_unknown, 1);
}

#[tokio::test]
async fn active_symbols_are_distinct_and_exclude_closed() {
    let db = setup_test_db().await.unwrap();
    let t = now();

    seed(&db, "600519", Category::Trend, t).await;
    seed(&db, "600519", Category::Value, t).await; // same symbol, other category
    let closing = seed(&db, "600036", Category::Trend, t).await;
    close_record(&db, closing.id, Some(dec!(100)), records::REASON_MANUAL, t)
        .await
        .unwrap();

    let mut symbols = get_active_symbols(&db).await.unwrap();
    symbols.sort();
    assert_eq!(symbols, vec!["600519".to_string()]);
}

// ------- PRICE UPDATES + AUTO-CLOSE SWEEP -------

#[tokio::test]
async fn sweep_closes_profit_and_loss_with_priority_reasons() {
    let state = test_state().await;
    let db = &state.db;
    let t = now();

    let gain = seed(db, "GAIN", Category::Trend, t).await;
    let fall = seed(db, "FALL", Category::Trend, t).await;
    let hold = seed(db, "HOLD", Category::Trend, t).await;

    update_price(db, &gain, dec!(116), t).await.unwrap();
    update_price(db, &fall, dec!(91), t).await.unwrap();
    update_price(db, &hold, dec!(105), t).await.unwrap();

    let closed = run_auto_close_sweep(db, &state.auto_close).await.unwrap();

    let mut reasons: Vec<(String, String)> = closed
        .iter()
        .map(|c| (c.symbol.clone(), c.reason.clone()))
        .collect();
    reasons.sort();
    assert_eq!(
        reasons,
        vec![
            ("FALL".to_string(), "loss".to_string()),
            ("GAIN".to_string(), "profit".to_string()),
        ]
    );

    // Closed at the last known valuation, not a fresh quote
    let gain = find_record(db, gain.id).await.unwrap();
    assert_eq!(gain.close_price, Some(dec!(116)));
    assert_eq!(gain.profit_percent, dec!(16.00));

    let hold = find_record(db, hold.id).await.unwrap();
    assert_eq!(hold.status, records::STATUS_ACTIVE);

    // A second sweep finds nothing left to close
    let again = run_auto_close_sweep(db, &state.auto_close).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn one_failed_quote_does_not_block_the_cycle() {
    let state = test_state().await;
    let db = &state.db;
    let t = now();

    for symbol in ["AAA", "BBB", "CCC", "DDD", "EEE"] {
        seed(db, symbol, Category::Shortterm, t).await;
    }

    // EEE's quote "failed" this cycle: it is simply absent from the map
    let mut quotes: HashMap<String, Decimal> = HashMap::new();
    quotes.insert("AAA".to_string(), dec!(116));
    quotes.insert("BBB".to_string(), dec!(91));
    quotes.insert("CCC".to_string(), dec!(105));
    quotes.insert("DDD".to_string(), dec!(103));

    let updated = apply_price_updates(db, &quotes).await.unwrap();
    assert_eq!(updated, 4);

    let closed = run_auto_close_sweep(db, &state.auto_close).await.unwrap();
    assert_eq!(closed.len(), 2); // AAA by profit, BBB by loss

    let (remaining, total) = records::get_records(db, "all", Some("active"), None, 1, 10, t)
        .await
        .unwrap();
    assert_eq!(total, 3);
    let untouched = remaining.iter().find(|r| r.symbol == "EEE").unwrap();
    assert_eq!(untouched.current_price, None);
    assert_eq!(untouched.profit_percent, Decimal::ZERO);
}

#[tokio::test]
async fn cycle_is_skipped_while_another_is_running() {
    let state = test_state().await;
    let _running = state.cycle_gate.lock().await;

    let report = run_price_update_cycle(
        &state.db,
        &state.market_data,
        &state.auto_close,
        &state.cycle_gate,
    )
    .await
    .unwrap();

    assert!(report.skipped);
    assert_eq!(report.symbols_requested, 0);
    assert_eq!(report.records_updated, 0);
    assert_eq!(report.records_closed, 0);
}

#[tokio::test]
async fn cycle_with_unreachable_provider_leaves_records_untouched() {
    let state = test_state().await;
    let t = now();

    seed(&state.db, "600519", Category::Trend, t).await;
    seed(&state.db, "600036", Category::Value, t).await;

    let report = run_price_update_cycle(
        &state.db,
        &state.market_data,
        &state.auto_close,
        &state.cycle_gate,
    )
    .await
    .unwrap();

    assert!(!report.skipped);
    assert_eq!(report.symbols_requested, 2);
    assert_eq!(report.symbols_updated, 0);
    assert_eq!(report.records_updated, 0);
    assert_eq!(report.records_closed, 0);

    let (rows, _) = records::get_records(&state.db, "all", None, None, 1, 10, t)
        .await
        .unwrap();
    assert!(rows.iter().all(|r| {
        r.status == records::STATUS_ACTIVE
            && r.current_price.is_none()
            && r.profit_percent == Decimal::ZERO
    }));
}

// ------- PERFORMANCE AGGREGATION -------

#[tokio::test]
async fn performance_curve_buckets_by_entry_date() {
    let db = setup_test_db().await.unwrap();

    let day1 = at(2026, 8, 20, 10);
    let day2 = at(2026, 8, 21, 10);

    let x = seed(&db, "XXX", Category::Trend, day1).await;
    let y = seed(&db, "YYY", Category::Trend, day1).await;
    let z = seed(&db, "ZZZ", Category::Trend, day2).await;

    update_price(&db, &x, dec!(110), day1).await.unwrap(); // +10
    update_price(&db, &y, dec!(98), day1).await.unwrap(); // -2
    update_price(&db, &z, dec!(105), day2).await.unwrap(); // +5

    let curve = performance::performance_curve(&db, "30d", at(2026, 8, 21, 18))
        .await
        .unwrap();

    assert_eq!(curve.dates, vec!["2026-08-20", "2026-08-21"]);
    assert_eq!(curve.daily_returns, vec![4.0, 5.0]);
    assert_eq!(curve.cumulative_returns, vec![4.0, 9.0]);
    assert_eq!(curve.daily_count, vec![2, 1]);
}

#[tokio::test]
async fn summary_statistics_over_period() {
    let db = setup_test_db().await.unwrap();

    let day1 = at(2026, 8, 20, 10);
    let day2 = at(2026, 8, 21, 10);

    let x = seed(&db, "XXX", Category::Trend, day1).await;
    let y = seed(&db, "YYY", Category::Trend, day1).await;
    let z = seed(&db, "ZZZ", Category::Value, day2).await;

    update_price(&db, &x, dec!(110), day1).await.unwrap();
    update_price(&db, &y, dec!(98), day1).await.unwrap();
    update_price(&db, &z, dec!(105), day2).await.unwrap();

    let summary = performance::summary(&db, "30d", at(2026, 8, 21, 18))
        .await
        .unwrap();

    assert_eq!(summary.total_recommendations, 3);
    assert_eq!(summary.active_count, 3);
    assert_eq!(summary.closed_count, 0);
    assert_eq!(summary.win_rate, 66.7);
    assert_eq!(summary.avg_return, 4.33);
    assert_eq!(summary.total_return, 13.0);
    assert_eq!(summary.best_profit, 10.0);
    assert_eq!(summary.worst_loss, -2.0);
    assert_eq!(summary.avg_holding_days, 0.0);
}

#[tokio::test]
async fn summary_is_zeroed_when_nothing_matches() {
    let db = setup_test_db().await.unwrap();

    let summary = performance::summary(&db, "7d", now()).await.unwrap();

    assert_eq!(summary.total_recommendations, 0);
    assert_eq!(summary.win_rate, 0.0);
    assert_eq!(summary.total_return, 0.0);
    assert_eq!(summary.period, "7d");
}

// ------- HTTP SURFACE -------

#[tokio::test]
async fn records_endpoint_returns_page() {
    let state = test_state().await;
    let t = now();
    for symbol in ["600519", "600036", "600000"] {
        seed(&state.db, symbol, Category::Trend, t).await;
    }
    let app = test_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/backtest/records?period=all&page=1&page_size=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["page"], 1);
    assert_eq!(json["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn stop_config_partial_update_via_api() {
    let app = test_router(test_state().await);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/backtest/stop-config",
            &json!({"stop_loss_percent": -5.0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["config"]["stop_loss_percent"], -5.0);
    // Untouched fields keep their defaults
    assert_eq!(json["config"]["stop_profit_percent"], 15.0);
    assert_eq!(json["config"]["max_holding_days"], 30);
    assert_eq!(json["config"]["enabled"], true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/backtest/stop-config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["stop_loss_percent"], -5.0);
}

#[tokio::test]
async fn close_endpoint_reports_non_fatal_already_closed() {
    let state = test_state().await;
    let t = now();
    let record = seed(&state.db, "600519", Category::Trend, t).await;
    update_price(&state.db, &record, dec!(108), t).await.unwrap();
    let app = test_router(state);

    let uri = format!("/api/backtest/close/{}", record.id);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);

    // Unknown ids do surface as errors
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/backtest/close/9999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn close_endpoint_rejects_non_positive_price() {
    let state = test_state().await;
    let record = seed(&state.db, "600519", Category::Trend, now()).await;
    let app = test_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/backtest/close/{}?close_price=0", record.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("positive"));
}

#[tokio::test]
async fn ingest_endpoint_persists_batch_idempotently() {
    let app = test_router(test_state().await);

    let payload = json!({
        "category": "shortterm",
        "stocks": [
            {
                "symbol": "600000",
                "name": "SPD Bank",
                "price": 7.85,
                "recommendation": "buy",
                "ai_score": 72,
                "signal": "oversold bounce",
                "reason": "trading below book value"
            },
            {"symbol": "600036", "name": "China Merchants Bank", "price": 34.2}
        ]
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/recommendations", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["saved_count"], 2);

    // Same batch on the same day resolves to the existing records
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/recommendations", &payload))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["saved_count"], 2);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/backtest/records?period=all")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn ingest_endpoint_rejects_unknown_category() {
    let app = test_router(test_state().await);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/recommendations",
            &json!({"category": "meme", "stocks": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("category"));
}

#[tokio::test]
async fn check_auto_close_endpoint_runs_one_sweep() {
    let state = test_state().await;
    let t = now();
    let record = seed(&state.db, "600519", Category::Trend, t).await;
    update_price(&state.db, &record, dec!(120), t).await.unwrap();
    let app = test_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/backtest/check-auto-close")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["closed_count"], 1);
    assert_eq!(json["closed_records"][0]["reason"], "profit");

    // Nothing left to close
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/backtest/check-auto-close")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["closed_count"], 0);
}

#[tokio::test]
async fn health_endpoint_reports_provider_availability() {
    let app = test_router(test_state().await);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data_available"], false);
}
