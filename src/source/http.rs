//! HTTP data source for the status backend.
//!
//! Issues one `GET {base_url}/api/services` per fetch and turns the JSON body
//! into [`ServiceGroup`]s.  Failures are split the way the dashboard reports
//! them: transport problems become [`FetchError::Network`], everything the
//! server said that we could not use becomes a [`ProtocolError`].

use serde::Deserialize;
use tracing::{debug, warn};

use super::{DataSource, FetchError, ProtocolError, ServiceGroup};

const SERVICES_PATH: &str = "/api/services";
const HEALTH_PATH: &str = "/actuator/health";

/// The status backend, reached over HTTP with [`reqwest`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    /// Base URL of the backend, e.g. `http://localhost:8080`.
    pub base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a new source.
    ///
    /// # Arguments
    ///
    /// * `base_url` — scheme, host and port of the backend.  A trailing `/`
    ///   is tolerated.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Ask the backend's actuator for its own health (e.g. `"UP"`).
    ///
    /// Only used for a startup log line; the refresh cycle never calls it.
    pub async fn check_health(&self) -> Result<String, FetchError> {
        #[derive(Deserialize)]
        struct Health {
            status: String,
        }

        let url = self.endpoint(HEALTH_PATH);
        let response = self.client.get(&url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status).into());
        }
        let body = response.bytes().await.map_err(network)?;
        let health: Health = serde_json::from_slice(&body).map_err(ProtocolError::from)?;
        Ok(health.status)
    }
}

impl DataSource for HttpSource {
    async fn fetch_service_groups(&self) -> Result<Vec<ServiceGroup>, FetchError> {
        let url = self.endpoint(SERVICES_PATH);
        debug!(%url, "fetching service groups");

        let response = self.client.get(&url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "backend returned an error status");
            return Err(status_error(status).into());
        }

        let body = response.bytes().await.map_err(network)?;
        let groups = parse_groups(&body)?;
        debug!(groups = groups.len(), "fetched service groups");
        Ok(groups)
    }
}

/// Parse a `/api/services` response body.
///
/// This is a pure function (no I/O) so that tests can exercise the schema
/// rules without a server.  A body that is missing any required field is
/// rejected as a whole; there is no partially-populated result.
pub fn parse_groups(body: &[u8]) -> Result<Vec<ServiceGroup>, ProtocolError> {
    Ok(serde_json::from_slice(body)?)
}

fn status_error(status: reqwest::StatusCode) -> ProtocolError {
    ProtocolError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

/// Flatten a transport error and its causes into one line.
fn network(err: reqwest::Error) -> FetchError {
    let mut detail = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    warn!(error = %detail, "request to backend failed");
    FetchError::Network(detail)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ServiceStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BACKEND_BODY: &str = r#"[
  {
    "title": "All Services",
    "status": "Degraded",
    "checks": [
      {
        "id": 1,
        "name": "GitHub",
        "url": "https://github.com",
        "checkType": "HTTP",
        "currentStatus": "Operational",
        "lastCheckedAt": "2025-10-27T22:00:00Z"
      },
      {
        "id": 2,
        "name": "Render Server",
        "url": "https://example.com",
        "checkType": "HTTP",
        "currentStatus": "Degraded",
        "lastCheckedAt": null
      }
    ]
  },
  {
    "title": "External Services",
    "checks": []
  }
]"#;

    // -- parse_groups --------------------------------------------------------

    #[test]
    fn parse_groups_extracts_groups_in_order() {
        let groups = parse_groups(BACKEND_BODY.as_bytes()).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].title, "All Services");
        assert_eq!(groups[1].title, "External Services");

        let checks = &groups[0].checks;
        assert_eq!(checks[0].id, Some(1));
        assert_eq!(checks[0].name, "GitHub");
        assert_eq!(checks[0].url.as_deref(), Some("https://github.com"));
        assert_eq!(checks[0].check_type.as_deref(), Some("HTTP"));
        assert_eq!(checks[0].current_status, ServiceStatus::Operational);
        assert!(checks[0].last_checked_at.is_some());

        assert_eq!(checks[1].name, "Render Server");
        assert!(checks[1].last_checked_at.is_none());

        assert_eq!(groups[0].status(), ServiceStatus::Degraded);
        assert_eq!(groups[1].status(), ServiceStatus::Operational);
    }

    #[test]
    fn parse_groups_accepts_minimal_checks() {
        let body = br#"[{"title":"Core","checks":[{"name":"API","status":"Operational"}]}]"#;
        let groups = parse_groups(body).unwrap();

        assert_eq!(groups[0].checks[0].name, "API");
        assert_eq!(groups[0].checks[0].current_status, ServiceStatus::Operational);
        assert!(groups[0].checks[0].id.is_none());
    }

    #[test]
    fn parse_groups_tolerates_unknown_status_and_extra_fields() {
        let body = br#"[{"title":"Core","owner":"ops","checks":[
            {"name":"API","currentStatus":"Exploded","region":"eu"}
        ]}]"#;
        let groups = parse_groups(body).unwrap();

        assert_eq!(groups[0].checks[0].current_status, ServiceStatus::Unknown);
    }

    #[test]
    fn parse_groups_tolerates_non_string_statuses() {
        let body = br#"[{"title":"Core","status":{"code":2},"checks":[
            {"name":"API","currentStatus":3},
            {"name":"DB","currentStatus":true},
            {"name":"Cache","currentStatus":"Operational"}
        ]}]"#;
        let groups = parse_groups(body).unwrap();

        let checks = &groups[0].checks;
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0].current_status, ServiceStatus::Unknown);
        assert_eq!(checks[1].current_status, ServiceStatus::Unknown);
        assert_eq!(checks[2].current_status, ServiceStatus::Operational);
        assert_eq!(groups[0].status(), ServiceStatus::Unknown);
    }

    #[test]
    fn parse_groups_accepts_both_status_keys_on_one_check() {
        let body = br#"[{"title":"Core","checks":[
            {"name":"API","status":"Down","currentStatus":"Degraded"}
        ]}]"#;
        let groups = parse_groups(body).unwrap();

        assert_eq!(groups[0].checks[0].current_status, ServiceStatus::Degraded);
    }

    #[test]
    fn parse_groups_rejects_group_without_title() {
        let body = br#"[{"checks":[]}]"#;
        assert!(matches!(parse_groups(body), Err(ProtocolError::Body(_))));
    }

    #[test]
    fn parse_groups_rejects_group_without_checks() {
        let body = br#"[{"title":"Core"}]"#;
        assert!(matches!(parse_groups(body), Err(ProtocolError::Body(_))));
    }

    #[test]
    fn parse_groups_rejects_check_without_name() {
        let body = br#"[{"title":"Core","checks":[{"name":"API"},{"status":"Down"}]}]"#;
        assert!(matches!(parse_groups(body), Err(ProtocolError::Body(_))));
    }

    #[test]
    fn parse_groups_rejects_non_array_body() {
        assert!(parse_groups(br#"{"title":"Core","checks":[]}"#).is_err());
        assert!(parse_groups(b"<html>").is_err());
    }

    #[test]
    fn parse_groups_accepts_empty_array() {
        assert!(parse_groups(b"[]").unwrap().is_empty());
    }

    // -- fetch_service_groups ------------------------------------------------

    #[tokio::test]
    async fn fetch_issues_one_get_and_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BACKEND_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSource::new(server.uri());
        let groups = source.fetch_service_groups().await.unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].checks[1].name, "Render Server");
    }

    #[tokio::test]
    async fn fetch_tolerates_trailing_slash_in_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let source = HttpSource::new(format!("{}/", server.uri()));
        assert!(source.fetch_service_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_maps_error_status_to_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = HttpSource::new(server.uri())
            .fetch_service_groups()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Protocol(ProtocolError::Status { status: 503, .. })
        ));
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }

    #[tokio::test]
    async fn fetch_maps_malformed_body_to_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"title":"x"}]"#))
            .mount(&server)
            .await;

        let err = HttpSource::new(server.uri())
            .fetch_service_groups()
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Protocol(ProtocolError::Body(_))));
    }

    #[tokio::test]
    async fn fetch_maps_refused_connection_to_network_error() {
        // Grab a free port, then close it so nothing is listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = HttpSource::new(format!("http://127.0.0.1:{port}"))
            .fetch_service_groups()
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
        assert!(err.to_string().starts_with("Failed to connect to backend"));
    }

    #[tokio::test]
    async fn check_health_returns_reported_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/actuator/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"UP"}"#))
            .mount(&server)
            .await;

        let status = HttpSource::new(server.uri()).check_health().await.unwrap();
        assert_eq!(status, "UP");
    }
}
