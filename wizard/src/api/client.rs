// Analytics backend client
//
// Issues the three backend calls and classifies every outcome into the wizard error taxonomy.
// Classification is identical for all endpoints:
// - non-2xx                      -> Http (message from JSON `message`, raw text, or status)
// - 2xx, not `application/json`  -> Protocol
// - 2xx JSON, undecodable        -> Protocol
// - 2xx JSON, status != success  -> Application

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{WizardError, WizardResult};
use crate::models::requests::{AnalyticsRequest, ConnectionParams};
use crate::models::responses::{AnalyticsPayload, AnalyticsRow, StatusEnvelope, TablesPayload};
use crate::utils::logging::describe_connection_target;

pub const CONNECT_PATH: &str = "api/connect";
pub const TABLES_PATH: &str = "api/tables";
pub const ANALYTICS_PATH: &str = "api/analytics";

/// Raw (non-JSON) error bodies are cut to this many characters.
pub const MAX_ERROR_TEXT_CHARS: usize = 200;

pub const INVALID_FORMAT_MESSAGE: &str = "Server returned invalid response format";

pub struct BackendClient<T> {
    transport: T,
}

impl<T: HttpTransport> BackendClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST /api/connect. Returns the backend's success message (may be empty).
    pub async fn connect(&self, params: &ConnectionParams) -> WizardResult<String> {
        let correlation_id = Uuid::new_v4().simple().to_string();
        info!(
            "[PHASE: connect] [STEP: request] correlation_id={} target={}",
            correlation_id,
            describe_connection_target(&params.details())
        );

        let body = encode(params)?;
        let request = HttpRequest {
            method: Method::Post,
            path: CONNECT_PATH,
            body: Some(body),
        };

        let value = self
            .round_trip(&correlation_id, request, "Connection failed")
            .await?;
        let envelope: StatusEnvelope = decode(&value)?;
        Ok(envelope.message().unwrap_or_default().to_string())
    }

    /// GET /api/tables.
    pub async fn list_tables(&self) -> WizardResult<Vec<String>> {
        let correlation_id = Uuid::new_v4().simple().to_string();
        info!(
            "[PHASE: collections] [STEP: request] correlation_id={}",
            correlation_id
        );

        let request = HttpRequest {
            method: Method::Get,
            path: TABLES_PATH,
            body: None,
        };
        let value = self
            .round_trip(&correlation_id, request, "Unable to load tables")
            .await?;
        let payload: TablesPayload = decode(&value)?;
        Ok(payload.tables.unwrap_or_default())
    }

    /// POST /api/analytics for one table.
    pub async fn analytics(&self, table: &str) -> WizardResult<Vec<AnalyticsRow>> {
        let correlation_id = Uuid::new_v4().simple().to_string();
        info!(
            "[PHASE: analytics] [STEP: request] correlation_id={} table={}",
            correlation_id, table
        );

        let body = encode(&AnalyticsRequest { table })?;
        let request = HttpRequest {
            method: Method::Post,
            path: ANALYTICS_PATH,
            body: Some(body),
        };
        let value = self
            .round_trip(&correlation_id, request, "Analytics failed")
            .await?;
        let payload: AnalyticsPayload = decode(&value)?;
        Ok(payload.data.unwrap_or_default())
    }

    async fn round_trip(
        &self,
        correlation_id: &str,
        request: HttpRequest,
        default_failure: &str,
    ) -> WizardResult<Value> {
        let started = Instant::now();
        let path = request.path;
        let outcome = match self.transport.send(request).await {
            Ok(response) => interpret_response(&response, default_failure),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => info!(
                "[PHASE: http] [STEP: response] correlation_id={} path={} ok duration_ms={}",
                correlation_id,
                path,
                started.elapsed().as_millis()
            ),
            Err(e) => warn!(
                "[PHASE: http] [STEP: response] correlation_id={} path={} kind={:?} error={} duration_ms={}",
                correlation_id,
                path,
                e.kind(),
                e,
                started.elapsed().as_millis()
            ),
        }
        outcome
    }
}

/// Classify a response. On success returns the decoded JSON document.
pub fn interpret_response(response: &HttpResponse, default_failure: &str) -> WizardResult<Value> {
    if !response.is_success() {
        return Err(WizardError::Http {
            status: response.status,
            message: http_error_message(response),
        });
    }

    if !response.is_json() {
        return Err(WizardError::Protocol(INVALID_FORMAT_MESSAGE.to_string()));
    }

    let body = response
        .body
        .as_deref()
        .ok_or_else(|| WizardError::Protocol(INVALID_FORMAT_MESSAGE.to_string()))?;
    let value: Value = serde_json::from_str(body)
        .map_err(|e| WizardError::Protocol(format!("{}: {}", INVALID_FORMAT_MESSAGE, e)))?;

    let envelope: StatusEnvelope = decode(&value)?;
    if !envelope.is_success() {
        return Err(WizardError::Application(
            envelope.message().unwrap_or(default_failure).to_string(),
        ));
    }

    Ok(value)
}

/// Human-readable message for a non-2xx response.
///
/// JSON bodies contribute their `message` field; other bodies contribute their raw text (cut to
/// `MAX_ERROR_TEXT_CHARS`). Anything unreadable falls back to `HTTP Error <status>`.
pub fn http_error_message(response: &HttpResponse) -> String {
    let fallback = format!("HTTP Error {}", response.status);
    let Some(body) = response.body.as_deref() else {
        return fallback;
    };

    if response.is_json() {
        return serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback);
    }

    if body.is_empty() {
        fallback
    } else {
        truncate_chars(body, MAX_ERROR_TEXT_CHARS)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn encode<B: Serialize>(body: &B) -> WizardResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| WizardError::Protocol(format!("Unable to encode request: {}", e)))
}

fn decode<P: DeserializeOwned>(value: &Value) -> WizardResult<P> {
    P::deserialize(value)
        .map_err(|e| WizardError::Protocol(format!("{}: {}", INVALID_FORMAT_MESSAGE, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stubs::{json_response, text_response, ScriptedTransport};
    use crate::error::ErrorKind;
    use serde_json::json;

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: "localhost".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: "pw".to_string(),
            schema: "shop".to_string(),
        }
    }

    #[test]
    fn unencodable_body_is_protocol_error() {
        // JSON object keys must be strings.
        let body: std::collections::BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into_iter().collect();
        let err = encode(&body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().starts_with("Unable to encode request"));
    }

    #[test]
    fn non_json_500_uses_raw_text() {
        let r = text_response(500, "Internal Server Error");
        let err = interpret_response(&r, "x").unwrap_err();
        assert_eq!(
            err,
            WizardError::Http {
                status: 500,
                message: "Internal Server Error".to_string()
            }
        );
    }

    #[test]
    fn long_error_text_is_cut_to_200_chars() {
        let long = "é".repeat(450);
        let r = text_response(502, &long);
        let msg = http_error_message(&r);
        assert_eq!(msg.chars().count(), MAX_ERROR_TEXT_CHARS);
    }

    #[test]
    fn json_error_uses_message_field() {
        let r = json_response(400, json!({"status": "error", "message": "Missing required fields"}));
        assert_eq!(http_error_message(&r), "Missing required fields");
    }

    #[test]
    fn unusable_error_bodies_fall_back_to_status() {
        let mut r = json_response(503, json!({"status": "error"}));
        assert_eq!(http_error_message(&r), "HTTP Error 503");

        r.body = Some("{not json".to_string());
        assert_eq!(http_error_message(&r), "HTTP Error 503");

        let mut r = text_response(404, "");
        assert_eq!(http_error_message(&r), "HTTP Error 404");

        r.body = None;
        assert_eq!(http_error_message(&r), "HTTP Error 404");
    }

    #[test]
    fn success_without_json_content_type_is_protocol_error() {
        let r = text_response(200, "<html>proxy login</html>");
        let err = interpret_response(&r, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.to_string(), INVALID_FORMAT_MESSAGE);
    }

    #[test]
    fn malformed_json_is_protocol_error() {
        let mut r = json_response(200, json!({}));
        r.body = Some("{\"status\": ".to_string());
        let err = interpret_response(&r, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn non_success_status_is_application_error() {
        let r = json_response(200, json!({"status": "error", "message": "Bad credentials"}));
        assert_eq!(
            interpret_response(&r, "Connection failed").unwrap_err(),
            WizardError::Application("Bad credentials".to_string())
        );

        let r = json_response(200, json!({"status": "pending"}));
        assert_eq!(
            interpret_response(&r, "Connection failed").unwrap_err(),
            WizardError::Application("Connection failed".to_string())
        );
    }

    #[tokio::test]
    async fn connect_posts_params_and_returns_message() {
        let transport = ScriptedTransport::new().respond(
            CONNECT_PATH,
            json_response(200, json!({"status": "success", "message": "Connected to shop"})),
        );
        let client = BackendClient::new(transport);

        let msg = client.connect(&params()).await.unwrap();
        assert_eq!(msg, "Connected to shop");

        let sent = client.transport().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Post);
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["port"], json!(3306));
        assert_eq!(body["host"], "localhost");
    }

    #[tokio::test]
    async fn list_tables_handles_missing_list() {
        let transport =
            ScriptedTransport::new().respond(TABLES_PATH, json_response(200, json!({"status": "success"})));
        let client = BackendClient::new(transport);
        assert!(client.list_tables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn analytics_decodes_rows_and_sends_table() {
        let transport = ScriptedTransport::new().respond(
            ANALYTICS_PATH,
            json_response(
                200,
                json!({"status": "success", "data": [{
                    "customer_id": "C1", "total_orders": 3, "avg_order_gap": 12.5,
                    "last_order_date": "2024-01-01", "predicted_next_order_date": "2024-01-13",
                    "customer_classification": "ACTIVE"
                }]}),
            ),
        );
        let client = BackendClient::new(transport);
        let rows = client.analytics("orders").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg_order_gap, Some(12.5));

        let sent = client.transport().requests();
        assert_eq!(sent[0].body, Some(json!({"table": "orders"})));
    }

    #[tokio::test]
    async fn analytics_with_wrong_row_shape_is_protocol_error() {
        let transport = ScriptedTransport::new().respond(
            ANALYTICS_PATH,
            json_response(200, json!({"status": "success", "data": [{"customer_id": "C1"}]})),
        );
        let client = BackendClient::new(transport);
        let err = client.analytics("orders").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let transport = ScriptedTransport::new().fail(
            TABLES_PATH,
            WizardError::Transport("Request timed out".to_string()),
        );
        let client = BackendClient::new(transport);
        let err = client.list_tables().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
