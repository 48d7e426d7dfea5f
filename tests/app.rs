use axum::Router;
use devlog::app::{AppState, config::Config};
use devlog::http;
use serde_json::json;
use tokio::task::JoinHandle;

async fn start_server(config: Config) -> (String, JoinHandle<()>) {
    let config = Config {
        database_url: "sqlite://:memory:".to_string(),
        default_host: Some("test-host".to_string()),
        ..config
    };
    let state = AppState::connect(config).await.expect("connect memory sqlite");
    let app: Router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn post_entry_and_list() {
    let (base, _srv) = start_server(Config::default()).await;

    let payload = json!({
        "severity": "WARN",
        "facility": "shop",
        "message": "stock low",
        "extra_data": { "sku": "A-1", "__trace": "t-9" },
    });
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/entries", base))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let v: serde_json::Value = res.json().await.unwrap();
    let id = v["id"].as_i64().unwrap();

    let res = client
        .get(format!("{}/entries", base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let arr: serde_json::Value = res.json().await.unwrap();
    let entry = arr
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"].as_i64() == Some(id))
        .expect("posted entry is listed");
    assert_eq!(entry["level"], "WARN");
    assert_eq!(entry["severity"], 2);
    assert_eq!(entry["facility"], "shop");
    assert_eq!(entry["host"], "test-host");
    assert_eq!(entry["extra_data"], json!({ "sku": "A-1" }));
}

#[tokio::test]
async fn list_filters_by_severity_and_facility() {
    let (base, _srv) = start_server(Config::default()).await;
    let client = reqwest::Client::new();

    for (severity, facility) in [(0, "shop"), (3, "shop"), (3, "cart")] {
        let payload = json!({ "severity": severity, "ext_key": facility, "message": "m" });
        let res = client
            .post(format!("{}/entries", base))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());
    }

    let res = client
        .get(format!("{}/entries?severity=FATAL&facility=shop", base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let arr: serde_json::Value = res.json().await.unwrap();
    let arr = arr.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["facility"], "shop");
    assert_eq!(arr[0]["level"], "FATAL");

    let res = client
        .get(format!("{}/entries?severity=loud", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn filtered_entries_are_not_stored() {
    let config = Config {
        min_log_level: devlog::models::severity::level::Severity::Notice,
        exclude_facilities: vec!["noisy".to_string()],
        ..Config::default()
    };
    let (base, _srv) = start_server(config).await;
    let client = reqwest::Client::new();

    for payload in [
        json!({ "severity": "INFO", "facility": "shop", "message": "too low" }),
        json!({ "severity": "FATAL", "facility": "noisy", "message": "excluded" }),
    ] {
        let res = client
            .post(format!("{}/entries", base))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NO_CONTENT);
    }

    let res = client
        .get(format!("{}/entries", base))
        .send()
        .await
        .unwrap();
    let arr: serde_json::Value = res.json().await.unwrap();
    assert_eq!(arr.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn runs_and_facilities_feeds() {
    let (base, _srv) = start_server(Config::default()).await;
    let client = reqwest::Client::new();

    for facility in ["shop", "cart", "shop"] {
        let payload = json!({ "severity": "NOTICE", "facility": facility, "message": "hello" });
        let res = client
            .post(format!("{}/entries", base))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());
    }

    let res = client
        .get(format!("{}/facilities", base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let facilities: Vec<String> = res.json().await.unwrap();
    assert_eq!(facilities, vec!["shop".to_string(), "cart".to_string()]);

    let res = client
        .get(format!("{}/runs?limit=2", base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let runs: Vec<String> = res.json().await.unwrap();
    assert!(!runs.is_empty() && runs.len() <= 2);
    assert!(runs.windows(2).all(|w| w[0] > w[1]));
    assert!(runs.iter().all(|r| r.len() == 20));
}

#[tokio::test]
async fn empty_facility_is_rejected() {
    let (base, _srv) = start_server(Config::default()).await;
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/entries", base))
        .json(&json!({ "severity": "WARN", "facility": " ", "message": "m" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}
