use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_live(server: &MockServer, source: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path("/live"))
            .and(query_param("source", source))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_convert(server: &MockServer, to: &str, result: f64) {
        Mock::given(method("GET"))
            .and(path("/convert"))
            .and(query_param("to", to))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"{{"success": true, "result": {result}}}"#)),
            )
            .mount(server)
            .await;
    }

    pub async fn mount_change(server: &MockServer, code: &str, source: &str, change_pct: f64) {
        Mock::given(method("GET"))
            .and(path("/change"))
            .and(query_param("currencies", code))
            .and(query_param("source", source))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"success": true, "quotes": {{"{source}{code}": {{"change_pct": {change_pct}}}}}}}"#
            )))
            .mount(server)
            .await;
    }

    pub async fn mount_change_failure(server: &MockServer, code: &str, source: &str) {
        Mock::given(method("GET"))
            .and(path("/change"))
            .and(query_param("currencies", code))
            .and(query_param("source", source))
            .respond_with(ResponseTemplate::new(503))
            .mount(server)
            .await;
    }

    pub fn config_yaml(base_url: &str) -> String {
        format!(
            r#"
        base_currency: "EUR"
        secondary_currency: "USD"
        providers:
          exchangerate_host:
            base_url: {base_url}
            access_key: "test-key"
            timeout_secs: 5
    "#
        )
    }
}

async fn eur_scenario_server() -> wiremock::MockServer {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_live(
        &server,
        "EUR",
        r#"{"success": true, "source": "EUR", "quotes": {"EURUSD": 1.10, "EURJPY": 160.0}}"#,
    )
    .await;
    test_utils::mount_convert(&server, "USD", 0.91).await;
    test_utils::mount_convert(&server, "JPY", 151.4).await;
    test_utils::mount_change(&server, "USD", "EUR", 0.3).await;
    test_utils::mount_change(&server, "USD", "USD", 0.05).await;
    test_utils::mount_change(&server, "JPY", "USD", -0.2).await;
    server
}

#[test_log::test(tokio::test)]
async fn test_aggregate_against_mock_api() {
    let server = eur_scenario_server().await;
    test_utils::mount_change(&server, "JPY", "EUR", -0.1).await;

    let config: fxrates::core::config::AppConfig =
        serde_yaml::from_str(&test_utils::config_yaml(&server.uri())).unwrap();
    let aggregator = fxrates::build_aggregator(&config);

    let records = aggregator.aggregate("EUR").await;
    info!(?records, "Aggregated records");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].code, "USD");
    assert_eq!(records[0].rate_to_base, 1.10);
    assert_eq!(records[0].rate_to_secondary, 0.91);
    assert_eq!(records[0].change_vs_base, 0.3);
    assert_eq!(records[0].change_vs_secondary, 0.05);

    assert_eq!(records[1].code, "JPY");
    assert_eq!(records[1].rate_to_base, 160.0);
    assert_eq!(records[1].rate_to_secondary, 151.4);
    assert_eq!(records[1].change_vs_base, -0.1);
    assert_eq!(records[1].change_vs_secondary, -0.2);
    assert!(records.iter().all(|r| r.failed.is_empty()));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1 + 3 * 2);
}

#[test_log::test(tokio::test)]
async fn test_aggregate_isolates_failed_change_fetch() {
    let server = eur_scenario_server().await;
    test_utils::mount_change_failure(&server, "JPY", "EUR").await;

    let config: fxrates::core::config::AppConfig =
        serde_yaml::from_str(&test_utils::config_yaml(&server.uri())).unwrap();
    let records = fxrates::build_aggregator(&config).aggregate("EUR").await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].code, "JPY");
    assert_eq!(records[1].change_vs_base, 0.0);
    assert_eq!(
        records[1].failed,
        vec![fxrates::core::Metric::ChangeVsBase]
    );
    assert_eq!(records[1].rate_to_secondary, 151.4);
    assert_eq!(records[1].change_vs_secondary, -0.2);
    assert_eq!(records[0].change_vs_base, 0.3);
    assert!(records[0].failed.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_upstream_error_on_primary_fetch_yields_no_data() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_live(
        &server,
        "EUR",
        r#"{"success": false, "error": {"code": 104, "info": "Monthly usage limit reached"}}"#,
    )
    .await;

    let config: fxrates::core::config::AppConfig =
        serde_yaml::from_str(&test_utils::config_yaml(&server.uri())).unwrap();
    let records = fxrates::build_aggregator(&config).aggregate("EUR").await;

    assert!(records.is_empty());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        fxrates::cli::rates::render(&records, "EUR", "USD"),
        console::style(fxrates::cli::rates::NO_DATA).red().to_string()
    );
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let server = eur_scenario_server().await;
    test_utils::mount_change(&server, "JPY", "EUR", -0.1).await;

    // Setup config file
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    fs::write(config_path, test_utils::config_yaml(&server.uri()))
        .expect("Failed to write config file");

    // Run app and verify success
    let result = fxrates::run_command(
        fxrates::AppCommand::Rates {
            base_currency: Some("eur".to_string()),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let result = fxrates::run_command(
        fxrates::AppCommand::Rates {
            base_currency: None,
        },
        Some("/nonexistent/fxrates/config.yaml"),
    )
    .await;
    assert!(result.is_err());
}
