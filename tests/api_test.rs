use mula_api::app::{router, AppState};
use mula_api::config::AppConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const ADMIN_KEY: &str = "test-admin-key-0123456789";
const RELEASES: &str = "https://github.com/saintgo7/web-music-heartlib/releases";

async fn spawn_with(config: AppConfig) -> SocketAddr {
    let state = AppState::from_config(&config).await.unwrap();
    let app = router(Arc::new(state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    addr
}

async fn spawn_server() -> SocketAddr {
    // Create temp db
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let db_path = tmp.path().to_path_buf();
    // Keep tmp alive by leaking it (test only)
    std::mem::forget(tmp);

    let mut config = AppConfig::default();
    config.server.environment = "test".to_string();
    config.storage.path = db_path;
    config.gallery.admin_api_key = ADMIN_KEY.to_string();
    spawn_with(config).await
}

async fn spawn_server_without_storage() -> SocketAddr {
    let mut config = AppConfig::default();
    config.storage.enabled = false;
    config.gallery.admin_api_key = ADMIN_KEY.to_string();
    spawn_with(config).await
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

async fn get_json(addr: SocketAddr, path: &str) -> (StatusCode, Value) {
    let resp = client()
        .get(format!("http://{addr}{path}"))
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn post_json(addr: SocketAddr, path: &str, body: Value) -> reqwest::Response {
    client()
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

// ── Downloads ──

#[tokio::test]
async fn test_download_json_then_stats() {
    let addr = spawn_server().await;

    let resp = post_json(addr, "/api/download", json!({"os": "macos", "redirect": "false"})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["os"], "macos");
    assert_eq!(
        body["download_url"],
        format!("{RELEASES}/latest/download/MuLa_Installer.dmg")
    );
    assert_eq!(body["message"], "Download recorded");

    let (status, stats) = get_json(addr, "/api/stats?os=macos&period=all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["period"], "all");
    assert_eq!(stats["downloads"], json!({"macos": 1}));
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["breakdown"], json!({"windows": 0, "macos": 1, "linux": 0}));
    assert!(stats["generated_at"].is_string());
}

#[tokio::test]
async fn test_every_platform_is_counted() {
    let addr = spawn_server().await;

    for os in ["windows-x64", "windows-x86", "macos", "linux"] {
        let resp = post_json(addr, "/api/download", json!({"os": os, "redirect": false})).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let (_, stats) = get_json(addr, &format!("/api/stats?os={os}&period=all")).await;
        assert!(stats["downloads"][os].as_u64().unwrap() >= 1, "{os} not counted");
    }

    // Default period is lifetime, default os is every platform.
    let (_, stats) = get_json(addr, "/api/stats").await;
    assert_eq!(stats["total"], 4);
    assert_eq!(stats["breakdown"]["windows"], 2);

    let (_, today) = get_json(addr, "/api/download-stats?period=today").await;
    assert_eq!(today["period"], "today");
    assert_eq!(today["total"], 4);
}

#[tokio::test]
async fn test_download_post_redirects_by_default() {
    let addr = spawn_server().await;

    let resp = post_json(addr, "/api/download", json!({"os": "windows-x64"})).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()["location"],
        format!("{RELEASES}/latest/download/MuLa_Setup_x64.exe").as_str()
    );

    // `os` may come from the query string when the body has none.
    let resp = client()
        .post(format!("http://{addr}/api/download?os=linux&redirect=false"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["os"], "linux");
}

#[tokio::test]
async fn test_download_get_redirect_and_validation() {
    let addr = spawn_server().await;

    let resp = client()
        .get(format!("http://{addr}/api/download?os=linux"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()["location"],
        format!("{RELEASES}/latest/download/mula_install.sh").as_str()
    );

    let (status, body) = get_json(addr, "/api/download").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing \"os\" parameter");
    assert_eq!(body["valid_options"].as_array().unwrap().len(), 4);

    let (status, body) = get_json(addr, "/api/download?os=beos").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["valid_options"].is_array());

    let (_, stats) = get_json(addr, "/api/stats?os=linux").await;
    assert_eq!(stats["total"], 1);
}

#[tokio::test]
async fn test_download_mistyped_redirect_keeps_os() {
    let addr = spawn_server().await;

    let resp = post_json(addr, "/api/download", json!({"os": "macos", "redirect": 0})).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()["location"],
        format!("{RELEASES}/latest/download/MuLa_Installer.dmg").as_str()
    );

    let (_, stats) = get_json(addr, "/api/stats?os=macos").await;
    assert_eq!(stats["total"], 1);
}

#[tokio::test]
async fn test_download_post_rejects_unknown_os() {
    let addr = spawn_server().await;

    let resp = post_json(addr, "/api/download", json!({"os": "amiga"})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["valid_options"],
        json!(["windows-x64", "windows-x86", "macos", "linux"])
    );
}

// ── Analytics ──

#[tokio::test]
async fn test_analytics_record_and_query() {
    let addr = spawn_server().await;

    for page in ["/download", "/download", "/blog/launch-post"] {
        let resp = client()
            .post(format!("http://{addr}/api/analytics"))
            .header("referer", "https://www.google.com/search?q=mula")
            .header("cf-ipcountry", "KR")
            .json(&json!({"event": "page_view", "page": page}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Analytics event recorded");
    }

    let (status, report) = get_json(addr, "/api/analytics?period=week").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["period"], "week");
    assert_eq!(report["events"]["page_view"], 3);
    assert_eq!(report["pages"]["_download"], 2);
    // Pages outside any fixed vocabulary are reported too.
    assert_eq!(report["pages"]["_blog_launch-post"], 1);
    assert_eq!(report["referrers"]["google"], 3);
    assert_eq!(report["countries"]["KR"], 3);
    assert_eq!(report["totals"]["events"], 3);
    assert_eq!(report["totals"]["page_views"], 3);
    assert_eq!(report["hourly"].as_object().unwrap().len(), 24);
    assert!(report["date_range"]["start"].is_string());
}

#[tokio::test]
async fn test_analytics_defaults_and_filters() {
    let addr = spawn_server().await;

    // Empty body counts as a page view with a direct referrer.
    let resp = client()
        .post(format!("http://{addr}/api/analytics"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post_json(addr, "/api/analytics", json!({"event": "faq_view"})).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, report) = get_json(addr, "/api/analytics?period=decade").await;
    assert_eq!(report["period"], "today");
    assert_eq!(report["events"]["page_view"], 1);
    assert_eq!(report["referrers"]["direct"], 2);

    let (_, faq) = get_json(addr, "/api/analytics?type=faq_view").await;
    assert_eq!(faq["events"], json!({"faq_view": 1}));

    let (status, body) = get_json(addr, "/api/analytics?type=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid event type");
}

#[tokio::test]
async fn test_analytics_rejects_unknown_event() {
    let addr = spawn_server().await;

    let resp = post_json(addr, "/api/analytics", json!({"event": "purchase"})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid event type");
    assert_eq!(body["success"], false);
    assert_eq!(body["valid_types"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_every_event_type_is_recorded() {
    let addr = spawn_server().await;

    for event in mula_api::types::EventType::valid_names() {
        let resp = post_json(addr, "/api/analytics", json!({"event": event})).await;
        assert_eq!(resp.status(), StatusCode::OK, "{event} rejected");

        let (status, report) =
            get_json(addr, &format!("/api/analytics?type={event}&period=today")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            report["events"][event].as_u64().unwrap_or(0) >= 1,
            "{event} not counted"
        );
    }
}

#[tokio::test]
async fn test_analytics_paths_sharing_a_slug_count_once() {
    let addr = spawn_server().await;

    for page in ["/a/b", "/a_b"] {
        let resp = post_json(addr, "/api/analytics", json!({"page": page})).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let (_, report) = get_json(addr, "/api/analytics?period=today").await;
    assert_eq!(report["pages"], json!({"_a_b": 2}));
    assert_eq!(report["totals"]["page_views"], 2);
    assert_eq!(report["totals"]["events"], 2);
}

#[tokio::test]
async fn test_analytics_mistyped_fields_do_not_mask_the_event() {
    let addr = spawn_server().await;

    let resp = post_json(addr, "/api/analytics", json!({"event": "purchase", "page": 5})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid event type");
    assert!(body["valid_types"].is_array());

    let resp = post_json(addr, "/api/analytics", json!({"event": 3})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post_json(addr, "/api/analytics", json!({"event": "share", "page": ["x"]})).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, report) = get_json(addr, "/api/analytics?period=today").await;
    assert_eq!(report["events"], json!({"share": 1}));
    assert_eq!(report["totals"]["page_views"], 0);
}

#[tokio::test]
async fn test_analytics_empty_page_is_not_a_pageview() {
    let addr = spawn_server().await;

    let resp = post_json(addr, "/api/analytics", json!({"page": ""})).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, report) = get_json(addr, "/api/analytics?period=today").await;
    assert_eq!(report["events"]["page_view"], 1);
    assert_eq!(report["pages"], json!({}));
    assert_eq!(report["totals"]["page_views"], 0);
}

// ── Gallery ──

async fn add_item(addr: SocketAddr, auth: Option<&str>, body: Value) -> reqwest::Response {
    let mut req = client().post(format!("http://{addr}/api/gallery")).json(&body);
    if let Some(auth) = auth {
        req = req.header("authorization", auth);
    }
    req.send().await.unwrap()
}

#[tokio::test]
async fn test_gallery_read_is_idempotent_and_seeded() {
    let addr = spawn_server().await;

    let (status, first) = get_json(addr, "/api/gallery").await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = get_json(addr, "/api/gallery").await;
    assert_eq!(first["items"], second["items"]);
    assert_eq!(first["pagination"], second["pagination"]);

    assert_eq!(first["success"], true);
    assert_eq!(first["items"].as_array().unwrap().len(), 5);
    assert_eq!(first["items"][0]["id"], "sample-005");
    assert_eq!(first["pagination"]["total"], 5);
    assert_eq!(first["pagination"]["has_more"], false);
    assert_eq!(first["available_tags"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_gallery_limit_boundaries() {
    let addr = spawn_server().await;

    let (_, big) = get_json(addr, "/api/gallery?limit=1000").await;
    assert_eq!(big["pagination"]["limit"], 100);

    let (_, zero) = get_json(addr, "/api/gallery?limit=0").await;
    assert_eq!(zero["items"], json!([]));
    assert_eq!(zero["pagination"]["limit"], 0);

    let (_, page) = get_json(addr, "/api/gallery?limit=2").await;
    assert_eq!(page["pagination"]["has_more"], true);

    let (_, last) = get_json(addr, "/api/gallery?limit=1&offset=4").await;
    assert_eq!(last["pagination"]["has_more"], false);
    assert_eq!(last["items"][0]["id"], "sample-001");
}

#[tokio::test]
async fn test_gallery_filters() {
    let addr = spawn_server().await;

    let (_, jazz) = get_json(addr, "/api/gallery?tag=Jazz").await;
    assert_eq!(jazz["pagination"]["total"], 1);
    assert_eq!(jazz["items"][0]["title"], "Jazz Cafe");

    let (_, featured) = get_json(addr, "/api/gallery?featured=true&sort=oldest").await;
    let ids: Vec<&str> = featured["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["sample-001", "sample-002", "sample-005"]);
}

#[tokio::test]
async fn test_gallery_write_auth() {
    let addr = spawn_server().await;
    let item = json!({"title": "Rain", "audio_url": "https://example.com/rain.mp3"});

    let resp = add_item(addr, None, item.clone()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Authorization required");

    let resp = add_item(addr, Some("Bearer wrong"), item.clone()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid API key");

    let resp = add_item(addr, Some(&format!("Bearer {ADMIN_KEY}")), item).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_gallery_round_trip() {
    let addr = spawn_server().await;
    let auth = format!("Bearer {ADMIN_KEY}");

    let resp = add_item(
        addr,
        Some(&auth),
        json!({
            "title": "Spring Rain",
            "audio_url": "https://example.com/spring.mp3",
            "description": "Soft piano",
            "tags": ["piano", "Lo-Fi"],
            "duration_seconds": 95,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["success"], true);
    assert_eq!(created["message"], "Gallery item added successfully");
    let id = created["item"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("item-"));

    let (_, listing) = get_json(addr, "/api/gallery?sort=newest").await;
    let first = &listing["items"][0];
    assert_eq!(first["id"], id.as_str());
    assert_eq!(first["title"], "Spring Rain");
    assert_eq!(first["description"], "Soft piano");
    assert_eq!(first["tags"], json!(["piano", "Lo-Fi"]));
    assert_eq!(first["duration_seconds"], 95);
    assert_eq!(first["plays"], 0);
    assert_eq!(first["featured"], false);
    assert_eq!(first["created_by"], "Anonymous");
    assert_eq!(first["lyrics"], "");
    assert_eq!(listing["pagination"]["total"], 6);
    assert!(listing["available_tags"]
        .as_array()
        .unwrap()
        .contains(&json!("Lo-Fi")));

    // Tag filter ignores case.
    let (_, lofi) = get_json(addr, "/api/gallery?tag=lo-fi").await;
    assert_eq!(lofi["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_gallery_write_validation() {
    let addr = spawn_server().await;
    let auth = format!("Bearer {ADMIN_KEY}");

    let resp = add_item(addr, Some(&auth), json!({"title": "No audio"})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing required field: audio_url");

    let resp = client()
        .post(format!("http://{addr}/api/gallery"))
        .header("authorization", &auth)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Degraded mode ──

#[tokio::test]
async fn test_without_storage_writes_succeed_and_reads_fail() {
    let addr = spawn_server_without_storage().await;

    let resp = post_json(addr, "/api/analytics", json!({"event": "share"})).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post_json(addr, "/api/download", json!({"os": "macos", "redirect": false})).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client()
        .get(format!("http://{addr}/api/download?os=macos"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);

    for path in ["/api/stats", "/api/analytics", "/api/gallery"] {
        let (status, body) = get_json(addr, path).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{path}");
        assert_eq!(body["error"], "Statistics storage not configured");
    }

    let resp = add_item(
        addr,
        Some(&format!("Bearer {ADMIN_KEY}")),
        json!({"title": "t", "audio_url": "u"}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ── Cross-cutting ──

#[tokio::test]
async fn test_cors_and_preflight() {
    let addr = spawn_server().await;

    let resp = client()
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/api/gallery"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(resp.headers()["access-control-max-age"], "86400");

    let resp = client()
        .get(format!("http://{addr}/api/health"))
        .header("origin", "https://music.abada.kr")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn test_unknown_route_and_index() {
    let addr = spawn_server().await;

    let (status, body) = get_json(addr, "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found", "success": false}));

    let (status, index) = get_json(addr, "/api/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(index["name"], "MuLa Music Studio API");
}
