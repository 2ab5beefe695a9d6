use poultry_hub_client::config::ClientOptions;
use poultry_hub_client::error::Error;
use poultry_hub_client::weather::{heat_stress_alerts, AlertSeverity};
use poultry_hub_client::PoultryHub;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hub(server: &MockServer) -> PoultryHub {
    hub_with(ClientOptions::default(), server)
}

fn hub_with(options: ClientOptions, server: &MockServer) -> PoultryHub {
    let options = options.with_weather_base_url(&server.uri());
    PoultryHub::new_with_options("http://localhost:54321", "test_key", options).unwrap()
}

fn forecast(temperature: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "current": {
            "time": "2024-05-01T13:00",
            "temperature_2m": temperature,
            "relative_humidity_2m": 55,
            "precipitation": 0.0,
            "wind_speed_10m": 4.0,
            "weather_code": 0
        }
    }))
}

#[tokio::test]
async fn current_conditions_and_heat_alert() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "6.5"))
        .and(query_param("longitude", "3.4"))
        .and(query_param("wind_speed_unit", "kmh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 6.5,
            "longitude": 3.4,
            "current": {
                "time": "2024-05-01T13:00",
                "interval": 900,
                "temperature_2m": 38.2,
                "relative_humidity_2m": 61,
                "precipitation": 0.0,
                "wind_speed_10m": 7.9,
                "weather_code": 2
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let hub = hub(&mock_server);
    let conditions = hub.weather().current(6.5, 3.4).await.unwrap();

    assert_eq!(conditions.temperature_c, 38.2);
    assert_eq!(conditions.condition, "Partly cloudy");
    assert_eq!(conditions.humidity_percent, 61.0);
    assert_eq!(
        conditions.observed_at.unwrap().to_rfc3339(),
        "2024-05-01T13:00:00+00:00"
    );

    let alerts = heat_stress_alerts(&conditions, hub.options.heat_stress_threshold_c);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Medium);
    assert_eq!(alerts[0].title, "Heat Wave Warning");
}

#[tokio::test]
async fn invalid_coordinates_are_rejected_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = hub(&mock_server).weather().current(95.0, 3.4).await.unwrap_err();
    match err {
        Error::Validation(errors) => assert!(errors.get("latitude").is_some()),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn upstream_error_is_a_provider_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": true,
            "reason": "Parameter 'current' is invalid"
        })))
        .mount(&mock_server)
        .await;

    let err = hub(&mock_server).weather().current(6.5, 3.4).await.unwrap_err();
    assert!(matches!(err, Error::Provider(p) if p.status == 400));
}

#[tokio::test]
async fn alerts_use_configured_threshold() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(forecast(41.5))
        .mount(&mock_server)
        .await;

    let alerts = hub(&mock_server).weather_alerts(6.5, 3.4).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::High);

    let relaxed = hub_with(
        ClientOptions::default().with_heat_stress_threshold(42.0),
        &mock_server,
    );
    assert!(relaxed.weather_alerts(6.5, 3.4).await.unwrap().is_empty());
}
