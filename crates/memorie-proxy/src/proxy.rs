//! Request forwarding with permissive CORS.

use crate::config::Config;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    AUTHORIZATION, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;

fn json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

pub struct ProxyState {
    client: reqwest::Client,
    upstream: String,
    strip_prefix: Option<String>,
}

impl ProxyState {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream: config.upstream.clone(),
            strip_prefix: config.strip_prefix.clone(),
        }
    }

    /// Upstream URL for an incoming path and query.
    ///
    /// The prefix is only removed on a segment boundary, so `/api` strips
    /// `/api/contacts` and `/api` but leaves `/apiary` alone.
    fn target(&self, uri: &Uri) -> String {
        let path = uri.path();
        let path = self
            .strip_prefix
            .as_deref()
            .map(|prefix| prefix.trim_end_matches('/'))
            .filter(|prefix| !prefix.is_empty())
            .and_then(|prefix| path.strip_prefix(prefix))
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .map(|rest| if rest.is_empty() { "/" } else { rest })
            .unwrap_or(path);
        match uri.query() {
            Some(query) => format!("{}{}?{}", self.upstream, path, query),
            None => format!("{}{}", self.upstream, path),
        }
    }
}

/// Every method and path goes to [`forward`].
pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new().fallback(forward).with_state(state)
}

fn cors_headers(content_type: HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(CONTENT_TYPE, content_type);
    headers
}

async fn forward(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return (StatusCode::OK, cors_headers(json())).into_response();
    }

    let target = state.target(&uri);
    match relay(&state, method.clone(), &target, &headers, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%method, url = %target, error = %e, "proxy error");
            let body = serde_json::json!({
                "error": "Internal server error",
                "message": "Failed to proxy request to API",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, cors_headers(json()), body.to_string()).into_response()
        }
    }
}

async fn relay(
    state: &ProxyState,
    method: Method,
    target: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, reqwest::Error> {
    let content_type = headers.get(CONTENT_TYPE).cloned().unwrap_or_else(json);
    let mut request = state
        .client
        .request(method.clone(), target)
        .header(CONTENT_TYPE, content_type);
    if let Some(auth) = headers.get(AUTHORIZATION) {
        request = request.header(AUTHORIZATION, auth.clone());
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = request.send().await?;
    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned().unwrap_or_else(json);
    let text = upstream.text().await?;

    let body = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => value.to_string(),
        Err(_) => text,
    };

    tracing::debug!(%method, url = target, status = status.as_u16(), "proxied");
    Ok((status, cors_headers(content_type), body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use std::net::SocketAddr;

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn spawn_proxy(upstream: String, strip_prefix: Option<&str>) -> String {
        let config = Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            upstream,
            strip_prefix: strip_prefix.map(str::to_string),
        };
        let addr = spawn(router(Arc::new(ProxyState::new(&config)))).await;
        format!("http://{addr}")
    }

    fn assert_cors(response: &reqwest::Response) {
        let h = response.headers();
        assert_eq!(h["access-control-allow-origin"], "*");
        assert_eq!(h["access-control-allow-headers"], "Content-Type, Authorization");
        assert_eq!(h["access-control-allow-methods"], "GET, POST, PUT, DELETE, OPTIONS");
    }

    #[tokio::test]
    async fn test_preflight_answers_locally() {
        let proxy = spawn_proxy("http://127.0.0.1:1".into(), None).await;
        let response = reqwest::Client::new()
            .request(Method::OPTIONS, format!("{proxy}/contacts"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert_eq!(response.text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_forwards_path_query_and_normalizes_json() {
        let upstream = Router::new().route(
            "/trusted-contacts/user/{id}",
            get(|uri: Uri| async move {
                (
                    [(CONTENT_TYPE, "application/json; charset=utf-8")],
                    format!("{{ \"query\" : \"{}\" }}", uri.query().unwrap_or_default()),
                )
            }),
        );
        let upstream = spawn(upstream).await;
        let proxy = spawn_proxy(format!("http://{upstream}"), Some("/api")).await;

        let response = reqwest::get(format!("{proxy}/api/trusted-contacts/user/u1?x=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert_eq!(response.headers()["content-type"], "application/json; charset=utf-8");
        assert_eq!(response.text().await.unwrap(), r#"{"query":"x=1"}"#);
    }

    #[tokio::test]
    async fn test_forwards_body_and_auth() {
        let upstream = Router::new().route(
            "/login",
            post(|headers: HeaderMap, body: String| async move {
                let auth = headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                let content_type = headers[CONTENT_TYPE].to_str().unwrap().to_string();
                (
                    StatusCode::UNAUTHORIZED,
                    serde_json::json!({ "auth": auth, "type": content_type, "body": body })
                        .to_string(),
                )
            }),
        );
        let upstream = spawn(upstream).await;
        let proxy = spawn_proxy(format!("http://{upstream}"), None).await;

        let response = reqwest::Client::new()
            .post(format!("{proxy}/login"))
            .header(AUTHORIZATION, "Bearer t0k")
            .body(r#"{"email":"a@b.c"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let echoed: serde_json::Value = response.json().await.unwrap();
        assert_eq!(echoed["auth"], "Bearer t0k");
        assert_eq!(echoed["type"], "application/json");
        assert_eq!(echoed["body"], r#"{"email":"a@b.c"}"#);
    }

    #[tokio::test]
    async fn test_non_json_body_passes_through() {
        let upstream = Router::new().route(
            "/profile",
            get(|| async { (StatusCode::NOT_FOUND, "Cannot GET /profile") }),
        );
        let upstream = spawn(upstream).await;
        let proxy = spawn_proxy(format!("http://{upstream}"), None).await;

        let response = reqwest::get(format!("{proxy}/profile")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/plain"));
        assert_eq!(response.text().await.unwrap(), "Cannot GET /profile");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_500() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);
        let proxy = spawn_proxy(format!("http://{addr}"), None).await;

        let response = reqwest::get(format!("{proxy}/contacts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&response);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["message"], "Failed to proxy request to API");
    }

    #[test]
    fn test_target_strips_prefix_only_at_start() {
        let state = ProxyState::new(&Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            upstream: "http://up".into(),
            strip_prefix: Some("/.netlify/functions/api-proxy".into()),
        });
        let uri: Uri = "/.netlify/functions/api-proxy/contact/7?a=b".parse().unwrap();
        assert_eq!(state.target(&uri), "http://up/contact/7?a=b");
        let uri: Uri = "/other/.netlify/functions/api-proxy".parse().unwrap();
        assert_eq!(state.target(&uri), "http://up/other/.netlify/functions/api-proxy");
    }

    #[test]
    fn test_target_strips_prefix_on_segment_boundary() {
        let state = ProxyState::new(&Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            upstream: "http://backend:3000".into(),
            strip_prefix: Some("/api/".into()),
        });
        let uri: Uri = "/apiary/contacts".parse().unwrap();
        assert_eq!(state.target(&uri), "http://backend:3000/apiary/contacts");
        let uri: Uri = "/api/contacts?x=1".parse().unwrap();
        assert_eq!(state.target(&uri), "http://backend:3000/contacts?x=1");
        let uri: Uri = "/api".parse().unwrap();
        assert_eq!(state.target(&uri), "http://backend:3000/");
    }
}
