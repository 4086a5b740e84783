use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{SdkError, render_controller_error};
use crate::list::ListResponse;
use crate::retry::{RetrySettings, run_with_retry};
use crate::session::Session;
use crate::telemetry;

enum Payload {
    Empty,
    Json(Value),
    Manifest { field: String, bytes: Vec<u8> },
}

struct RequestSpec<'a> {
    method: Method,
    path: &'a str,
    query: &'a [(&'a str, &'a str)],
    payload: Payload,
}

impl<'a> RequestSpec<'a> {
    fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            query: &[],
            payload: Payload::Empty,
        }
    }

    fn query(mut self, query: &'a [(&'a str, &'a str)]) -> Self {
        self.query = query;
        self
    }

    fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, SdkError> {
        let value = serde_json::to_value(body)
            .map_err(|err| SdkError::Input(format!("failed to encode request body: {err}")))?;
        self.payload = Payload::Json(value);
        Ok(self)
    }

    fn manifest(mut self, field: &str, bytes: Vec<u8>) -> Self {
        self.payload = Payload::Manifest {
            field: field.to_string(),
            bytes,
        };
        self
    }
}

struct RawResponse {
    status: StatusCode,
    body: String,
}

/// Authenticated CRUD against controller sub-resources.
///
/// Every verb signs the request with the session's bearer token and runs
/// through the current retry policy snapshot before surfacing an error.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    session: Session,
    retry: RetrySettings,
}

impl ResourceClient {
    pub fn new(session: Session, retry: RetrySettings) -> Self {
        Self { session, retry }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn retry_settings(&self) -> &RetrySettings {
        &self.retry
    }

    /// `POST` a JSON body, ignoring whatever the controller answers.
    pub async fn create<B>(&self, path: &str, body: &B) -> Result<(), SdkError>
    where
        B: Serialize + ?Sized,
    {
        self.execute(RequestSpec::new(Method::POST, path).json(body)?)
            .await?;
        Ok(())
    }

    /// `POST` a JSON body and decode the answer.
    pub async fn post_for<B, T>(&self, path: &str, body: &B) -> Result<T, SdkError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self
            .execute(RequestSpec::new(Method::POST, path).json(body)?)
            .await?;
        decode(&res.body)
    }

    pub async fn post_empty(&self, path: &str) -> Result<(), SdkError> {
        self.execute(RequestSpec::new(Method::POST, path)).await?;
        Ok(())
    }

    /// Multipart `POST` with one file part named `field` (`<field>.yaml`).
    pub async fn create_from_manifest(
        &self,
        path: &str,
        field: &str,
        manifest: impl Into<Vec<u8>>,
    ) -> Result<(), SdkError> {
        let spec = RequestSpec::new(Method::POST, path).manifest(field, manifest.into());
        self.execute(spec).await?;
        Ok(())
    }

    /// Multipart `PATCH`, same part layout as [`ResourceClient::create_from_manifest`].
    pub async fn update_from_manifest(
        &self,
        path: &str,
        field: &str,
        manifest: impl Into<Vec<u8>>,
    ) -> Result<(), SdkError> {
        let spec = RequestSpec::new(Method::PATCH, path).manifest(field, manifest.into());
        self.execute(spec).await?;
        Ok(())
    }

    /// `PATCH` a partial update body.
    pub async fn update<B>(&self, path: &str, body: &B) -> Result<(), SdkError>
    where
        B: Serialize + ?Sized,
    {
        self.execute(RequestSpec::new(Method::PATCH, path).json(body)?)
            .await?;
        Ok(())
    }

    /// `GET` a single resource; 404 becomes [`SdkError::NotFound`].
    pub async fn get<T>(&self, path: &str) -> Result<T, SdkError>
    where
        T: DeserializeOwned,
    {
        self.get_with_query(path, &[]).await
    }

    pub async fn get_with_query<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SdkError>
    where
        T: DeserializeOwned,
    {
        let res = self
            .execute(RequestSpec::new(Method::GET, path).query(query))
            .await
            .map_err(|err| match err {
                SdkError::Api {
                    status: StatusCode::NOT_FOUND,
                    message,
                } => SdkError::NotFound(message),
                other => other,
            })?;
        decode(&res.body)
    }

    /// `GET` a collection, accepting `{"<field>": [...]}` or `[...]`.
    pub async fn list<T>(&self, path: &str, field: &str) -> Result<ListResponse<T>, SdkError>
    where
        T: DeserializeOwned,
    {
        self.list_with_query(path, &[], field).await
    }

    pub async fn list_with_query<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        field: &str,
    ) -> Result<ListResponse<T>, SdkError>
    where
        T: DeserializeOwned,
    {
        let res = self
            .execute(RequestSpec::new(Method::GET, path).query(query))
            .await?;
        ListResponse::from_body(&res.body, field)
    }

    /// `DELETE`; the success status is returned as the controller sent it.
    pub async fn delete(&self, path: &str) -> Result<StatusCode, SdkError> {
        let res = self.execute(RequestSpec::new(Method::DELETE, path)).await?;
        Ok(res.status)
    }

    /// `DELETE` with a JSON body (unlink, exec detach).
    pub async fn delete_with_body<B>(&self, path: &str, body: &B) -> Result<StatusCode, SdkError>
    where
        B: Serialize + ?Sized,
    {
        let res = self
            .execute(RequestSpec::new(Method::DELETE, path).json(body)?)
            .await?;
        Ok(res.status)
    }

    async fn execute(&self, spec: RequestSpec<'_>) -> Result<RawResponse, SdkError> {
        let policy = self.retry.snapshot();
        let operation = format!("{} {}", spec.method, spec.path);
        run_with_retry(&policy, &operation, || self.send_once(&spec)).await
    }

    async fn send_once(&self, spec: &RequestSpec<'_>) -> Result<RawResponse, SdkError> {
        let method = spec.method.as_str();
        let outcome = self.send_unrecorded(spec).await;
        telemetry::record_request(method, if outcome.is_ok() { "success" } else { "error" });
        outcome
    }

    async fn send_unrecorded(&self, spec: &RequestSpec<'_>) -> Result<RawResponse, SdkError> {
        let token = self.session.authenticate().await?;
        let url = self.session.url(spec.path)?;
        debug!(method = %spec.method, %url, "controller request");

        let mut req = self
            .session
            .http()
            .request(spec.method.clone(), url)
            .bearer_auth(token);
        if !spec.query.is_empty() {
            req = req.query(spec.query);
        }
        req = match &spec.payload {
            Payload::Empty => req,
            Payload::Json(body) => req.json(body),
            Payload::Manifest { field, bytes } => {
                let part = Part::bytes(bytes.clone()).file_name(format!("{field}.yaml"));
                req.multipart(Form::new().part(field.clone(), part))
            }
        };

        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await?;
        if status.is_success() {
            return Ok(RawResponse { status, body });
        }

        let message = render_controller_error(status, &body);
        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate().await;
            return Err(SdkError::Auth(format!(
                "controller rejected the bearer token (status {status}): {message}"
            )));
        }
        Err(SdkError::Api { status, message })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, SdkError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|err| SdkError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{ErrorRetry, RetryPolicy};
    use common::api::SecretInfo;
    use httpmock::Method::{DELETE, GET, PATCH, POST};
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> ResourceClient {
        ResourceClient::new(
            Session::with_token(server.url(""), "t"),
            RetrySettings::default(),
        )
    }

    #[tokio::test]
    async fn create_posts_json_with_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/secrets")
                .header("authorization", "Bearer t")
                .json_body(json!({"name": "s1", "type": "Opaque", "data": {}}));
            then.status(201);
        });

        let client = client_for(&server);
        client
            .create(
                "/secrets",
                &json!({"name": "s1", "type": "Opaque", "data": {}}),
            )
            .await
            .expect("create");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn manifest_upload_uses_named_file_part() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/secrets/yaml/s1")
                .body_matches(r#"name="secret""#)
                .body_matches(r#"filename="secret\.yaml""#)
                .body_matches("kind: Secret");
            then.status(204);
        });

        let client = client_for(&server);
        client
            .update_from_manifest("/secrets/yaml/s1", "secret", "kind: Secret\n")
            .await
            .expect("manifest update");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn get_maps_404_to_not_found() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/secrets/missing");
            then.status(404).json_body(json!({"message": "Secret not found"}));
        });

        let err = client_for(&server)
            .get::<SecretInfo>("/secrets/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::NotFound(ref m) if m == "Secret not found"));
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/secrets");
            then.status(400).json_body(json!({"message": "name is required"}));
        });

        let err = client_for(&server)
            .create("/secrets", &json!({}))
            .await
            .unwrap_err();
        match err {
            SdkError::Api { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "name is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_surfaces_status() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(DELETE).path("/secrets/s1");
            then.status(202);
        });

        let status = client_for(&server)
            .delete("/secrets/s1")
            .await
            .expect("delete");
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn retries_follow_the_current_policy_snapshot() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/secrets");
            then.status(503).json_body(json!({"message": "connection reset upstream"}));
        });

        let client = client_for(&server);
        let err = client
            .list::<SecretInfo>("/secrets", "secrets")
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Api { .. }));
        assert_eq!(mock.calls(), 1, "no policy, no retry");

        client.retry_settings().set(
            RetryPolicy::new(
                Duration::from_secs(5),
                vec![ErrorRetry::new("connection reset", 2)],
            )
            .with_backoff(Duration::from_millis(5), Duration::from_millis(10)),
        );
        let _ = client.list::<SecretInfo>("/secrets", "secrets").await;
        assert_eq!(mock.calls(), 4, "one more call plus two retries");
    }

    #[tokio::test]
    async fn unauthorized_drops_token_and_next_call_refreshes() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200)
                .json_body(json!({"accessToken": "tok-1", "refreshToken": "ref-1"}));
        });
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/user/refresh")
                .json_body(json!({"refreshToken": "ref-1"}));
            then.status(200)
                .json_body(json!({"accessToken": "tok-2", "refreshToken": "ref-2"}));
        });
        let expired = server.mock(|when, then| {
            when.method(GET)
                .path("/secrets")
                .header("authorization", "Bearer tok-1");
            then.status(401).json_body(json!({"message": "token expired"}));
        });
        let fresh = server.mock(|when, then| {
            when.method(GET)
                .path("/secrets")
                .header("authorization", "Bearer tok-2");
            then.status(200).json_body(json!({"secrets": []}));
        });

        let client = ResourceClient::new(
            Session::with_credentials(server.url(""), "ops@acme.io", "pw", None),
            RetrySettings::default(),
        );

        let err = client
            .list::<SecretInfo>("/secrets", "secrets")
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Auth(ref msg) if msg.contains("token expired")));

        let secrets = client
            .list::<SecretInfo>("/secrets", "secrets")
            .await
            .expect("list after refresh");
        assert!(secrets.is_empty());
        assert_eq!(login.calls(), 1);
        assert_eq!(refresh.calls(), 1);
        assert_eq!(expired.calls(), 1);
        assert_eq!(fresh.calls(), 1);
    }

    #[test]
    fn decode_treats_empty_body_as_null() {
        let value: Option<SecretInfo> = decode("").expect("empty body");
        assert!(value.is_none());
        let err = decode::<SecretInfo>("{").unwrap_err();
        assert!(matches!(err, SdkError::Decode(_)));
    }
}
