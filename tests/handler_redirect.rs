mod common;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

use smartlink::domain::click_event::ClickEvent;
use smartlink::domain::click_worker::persist_click;
use smartlink::domain::entities::{AbTestConfig, AbVariant, NewLink, SmartRedirects};
use smartlink::infrastructure::persistence::{PgLinkRepository, PgStatsRepository};
use smartlink::utils::password::hash_password;

fn make_server(pool: PgPool) -> (TestServer, Receiver<ClickEvent>) {
    let (state, rx) = common::create_test_state(pool);
    (TestServer::new(common::test_app(state)).unwrap(), rx)
}

#[sqlx::test]
async fn test_redirect_success(pool: PgPool) {
    common::create_test_link(&pool, "redir01", "https://example.com/target").await;
    let (server, mut rx) = make_server(pool);

    let response = server
        .get("/r/redir01")
        .add_query_param("utm_source", "newsletter")
        .add_header("User-Agent", common::DESKTOP_UA)
        .add_header("Referer", "https://news.example.org/post")
        .await;

    assert_eq!(response.status_code(), 307);
    assert_eq!(response.header("location"), "https://example.com/target");

    let event = rx.try_recv().expect("click event queued");
    assert_eq!(event.device, "pc");
    assert_eq!(event.country_code.as_deref(), Some("US"));
    assert_eq!(event.utm.source.as_deref(), Some("newsletter"));
    assert_eq!(
        event.referrer.as_deref(),
        Some("https://news.example.org/post")
    );
    let ip_hash = event.ip_hash.expect("ip hashed");
    assert_ne!(ip_hash, "203.0.113.7");
    assert_eq!(ip_hash.len(), 64);
}

#[sqlx::test]
async fn test_redirect_repeated_utm_key(pool: PgPool) {
    common::create_test_link(&pool, "utm01", "https://example.com/target").await;
    let (server, mut rx) = make_server(pool);

    let response = server
        .get("/r/utm01?utm_source=a&utm_source=b&utm_medium=cpc&utm_medium=email")
        .await;

    assert_eq!(response.status_code(), 307);
    assert_eq!(response.header("location"), "https://example.com/target");

    let event = rx.try_recv().expect("click event queued");
    assert_eq!(event.utm.source.as_deref(), Some("a"));
    assert_eq!(event.utm.medium.as_deref(), Some("cpc"));
}

#[sqlx::test]
async fn test_redirect_not_found(pool: PgPool) {
    let (server, mut rx) = make_server(pool);

    let response = server.get("/r/missing").await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
    assert!(rx.try_recv().is_err());
}

#[sqlx::test]
async fn test_redirect_deleted_link_is_not_found(pool: PgPool) {
    common::create_deleted_link(&pool, "gone01", "https://example.com").await;
    let (server, _rx) = make_server(pool);

    server.get("/r/gone01").await.assert_status_not_found();
}

#[sqlx::test]
async fn test_redirect_outside_window_is_gone(pool: PgPool) {
    let now = Utc::now();
    common::insert_link(
        &pool,
        NewLink {
            code: "late01".into(),
            original_url: "https://example.com".into(),
            expiration_date: Some(now - Duration::hours(1)),
            ..Default::default()
        },
    )
    .await;
    common::insert_link(
        &pool,
        NewLink {
            code: "early01".into(),
            original_url: "https://example.com".into(),
            start_date: Some(now + Duration::hours(1)),
            ..Default::default()
        },
    )
    .await;
    let (server, mut rx) = make_server(pool);

    for code in ["late01", "early01"] {
        let response = server.get(&format!("/r/{code}")).await;
        assert_eq!(response.status_code(), 410);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "link_expired");
    }
    assert!(rx.try_recv().is_err());
}

#[sqlx::test]
async fn test_redirect_expired_guest_is_gone(pool: PgPool) {
    common::insert_link(
        &pool,
        NewLink {
            code: "guest01".into(),
            original_url: "https://example.com".into(),
            is_guest: true,
            expires_at: Some(Utc::now() - Duration::minutes(1)),
            ..Default::default()
        },
    )
    .await;
    let (server, _rx) = make_server(pool);

    let response = server.get("/r/guest01").await;

    assert_eq!(response.status_code(), 410);
}

#[sqlx::test]
async fn test_redirect_click_limit_reached(pool: PgPool) {
    let link = common::insert_link(
        &pool,
        NewLink {
            code: "cap01".into(),
            original_url: "https://example.com".into(),
            max_clicks: Some(3),
            ..Default::default()
        },
    )
    .await;
    common::set_clicks(&pool, link.id, 3).await;
    let (server, mut rx) = make_server(pool);

    let response = server.get("/r/cap01").await;

    assert_eq!(response.status_code(), 410);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "click_limit_reached");
    assert!(rx.try_recv().is_err());
}

#[sqlx::test]
async fn test_redirect_password_flow(pool: PgPool) {
    common::insert_link(
        &pool,
        NewLink {
            code: "secret1".into(),
            original_url: "https://example.com/private".into(),
            password_hash: Some(hash_password("hunter2").unwrap()),
            ..Default::default()
        },
    )
    .await;
    let (server, mut rx) = make_server(pool);

    let response = server.get("/r/secret1").await;
    assert_eq!(response.status_code(), 401);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "password_required");

    let response = server
        .get("/r/secret1")
        .add_header("X-Link-Password", "wrong")
        .await;
    assert_eq!(response.status_code(), 401);
    assert!(rx.try_recv().is_err());

    let response = server
        .get("/r/secret1")
        .add_header("X-Link-Password", "hunter2")
        .await;
    assert_eq!(response.status_code(), 307);

    let response = server
        .post("/r/secret1")
        .json(&json!({ "password": "hunter2" }))
        .await;
    assert_eq!(response.status_code(), 307);
    assert_eq!(response.header("location"), "https://example.com/private");
}

#[sqlx::test]
async fn test_redirect_smart_by_platform(pool: PgPool) {
    common::insert_link(
        &pool,
        NewLink {
            code: "app01".into(),
            original_url: "https://example.com".into(),
            smart_redirects: Some(SmartRedirects {
                ios: Some("https://apps.apple.com/app/id1".into()),
                android: Some("https://play.google.com/store/apps/details?id=x".into()),
                desktop: None,
            }),
            ..Default::default()
        },
    )
    .await;
    let (server, _rx) = make_server(pool);

    let cases = [
        (common::IPHONE_UA, "https://apps.apple.com/app/id1"),
        (
            common::ANDROID_UA,
            "https://play.google.com/store/apps/details?id=x",
        ),
        (common::DESKTOP_UA, "https://example.com"),
    ];

    for (ua, expected) in cases {
        let response = server.get("/r/app01").add_header("User-Agent", ua).await;
        assert_eq!(response.status_code(), 307);
        assert_eq!(response.header("location"), expected);
    }
}

#[sqlx::test]
async fn test_redirect_geo_by_country(pool: PgPool) {
    let geo = BTreeMap::from([("DE".to_string(), "https://example.de".to_string())]);
    common::insert_link(
        &pool,
        NewLink {
            code: "geo01".into(),
            original_url: "https://example.com".into(),
            geo_redirects: Some(geo),
            ..Default::default()
        },
    )
    .await;

    let (state, _rx) =
        common::create_test_state_with_geo(pool, Arc::new(common::FixedGeoLocator("DE")));
    let server = TestServer::new(common::test_app(state)).unwrap();

    let response = server.get("/r/geo01").await;

    assert_eq!(response.header("location"), "https://example.de");
}

#[sqlx::test]
async fn test_redirect_ab_test_wins_over_smart(pool: PgPool) {
    common::insert_link(
        &pool,
        NewLink {
            code: "split01".into(),
            original_url: "https://example.com".into(),
            smart_redirects: Some(SmartRedirects {
                ios: Some("https://apps.apple.com/app/id1".into()),
                ..Default::default()
            }),
            ab_test: Some(AbTestConfig {
                enabled: true,
                variants: vec![
                    AbVariant {
                        id: "a".into(),
                        url: "https://example.com/a".into(),
                        weight: 0,
                    },
                    AbVariant {
                        id: "b".into(),
                        url: "https://example.com/b".into(),
                        weight: 100,
                    },
                ],
            }),
            ..Default::default()
        },
    )
    .await;
    let (server, mut rx) = make_server(pool);

    let response = server
        .get("/r/split01")
        .add_header("User-Agent", common::IPHONE_UA)
        .await;

    assert_eq!(response.header("location"), "https://example.com/b");
    let event = rx.try_recv().unwrap();
    assert_eq!(event.variant_id.as_deref(), Some("b"));
}

#[sqlx::test]
async fn test_redirect_click_is_persisted(pool: PgPool) {
    let link = common::create_test_link(&pool, "count01", "https://example.com").await;
    let (server, mut rx) = make_server(pool.clone());

    let response = server.get("/r/count01").await;
    assert_eq!(response.status_code(), 307);

    let event = rx.try_recv().unwrap();
    let shared = Arc::new(pool.clone());
    let stored = persist_click(
        &PgStatsRepository::new(shared.clone()),
        &PgLinkRepository::new(shared),
        event,
    )
    .await;

    assert!(stored);
    assert_eq!(common::link_clicks(&pool, link.id).await, 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM link_clicks WHERE link_id = $1")
        .bind(link.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
