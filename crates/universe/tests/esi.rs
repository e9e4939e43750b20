use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use killwatch_core::config::EsiConfig;
use killwatch_core::UniverseService;
use killwatch_universe::{CachedUniverse, EsiClient, UniverseError};

async fn system(Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    if id != 30000142 {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "system_id": 30000142,
        "name": "Jita",
        "security_status": 0.9459,
        "constellation_id": 20000020
    })))
}

async fn item(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({"type_id": id, "group_id": 29, "name": "Capsule", "published": true}))
}

async fn broken(Path(_id): Path<u64>) -> &'static str {
    "not json"
}

async fn serve() -> String {
    let app = Router::new()
        .route("/universe/systems/{id}/", get(system))
        .route("/universe/types/{id}/", get(item))
        .route("/universe/constellations/{id}/", get(broken));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base_url: String) -> EsiConfig {
    EsiConfig {
        base_url,
        user_agent: "killwatch-tests".to_string(),
        cache_size: 16,
        http_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn fetches_and_decodes_records() {
    let client = EsiClient::new(&config(serve().await)).unwrap();

    let system = client.fetch_solar_system(30000142).await.unwrap();
    assert_eq!(system.name, "Jita");
    assert_eq!(system.constellation_id, 20000020);

    let item = client.fetch_item(670).await.unwrap();
    assert_eq!(item.id, 670);
    assert_eq!(item.group_id, 29);
}

#[tokio::test]
async fn not_found_and_decode_errors() {
    let client = EsiClient::new(&config(serve().await)).unwrap();

    assert!(matches!(
        client.fetch_solar_system(1).await,
        Err(UniverseError::NotFound { id: 1, .. })
    ));
    assert!(matches!(
        client.fetch_constellation(20000020).await,
        Err(UniverseError::Decode(_))
    ));
}

#[tokio::test]
async fn cached_client_through_service_trait() {
    let base = serve().await;
    let universe = CachedUniverse::new(EsiClient::new(&config(base)).unwrap(), 16);

    let system = universe.solar_system(30000142).await.unwrap();
    assert_eq!(system.id, 30000142);
    assert_eq!(universe.len(), 1);
    assert!(universe.solar_system(2).await.unwrap_err().is_not_found());
}
