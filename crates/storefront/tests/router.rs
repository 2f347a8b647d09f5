//! Router-level tests.
//!
//! Builds the real router with an in-memory session layer. Most tests point
//! the backends at an unreachable address: cart mutations must reject
//! anonymous requests before ever contacting the backend, so they succeed
//! (with 401 or a login redirect) even though no backend exists. The
//! checkout success path runs against a canned-JSON stub backend instead.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

use civil_materials_storefront::config::{
    AuthProviderConfig, CatalogApiConfig, StorefrontConfig,
};
use civil_materials_storefront::middleware::{create_session_layer, csp_nonce_middleware};
use civil_materials_storefront::routes;
use civil_materials_storefront::state::AppState;

/// Config pointing both backends at `base_url`.
fn test_config(base_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        catalog: CatalogApiConfig {
            base_url: base_url.to_string(),
        },
        auth: AuthProviderConfig {
            base_url: base_url.to_string(),
            publishable_key: SecretString::from("kJ8x2mP9qL4vN7wR3tY6uB1cD5fG0hAz"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

fn test_app_with(base_url: &str) -> Router {
    let config = test_config(base_url);
    let state = AppState::new(config.clone());
    let session_layer = create_session_layer(&config);

    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .layer(axum::middleware::from_fn(csp_nonce_middleware))
        .with_state(state)
}

/// App whose backends are the discard port; any backend call fails fast.
fn test_app() -> Router {
    test_app_with("http://127.0.0.1:9")
}

type RequestLog = Arc<Mutex<Vec<String>>>;

/// Minimal canned-JSON backend standing in for both external services.
///
/// Serves a provider session on sign-in, a CSRF token, an always-empty
/// cart, and a placed order that issues a fresh `cart_session_id` cookie.
/// Every raw request is recorded so tests can assert what the storefront
/// actually sent.
async fn spawn_stub_backend() -> (String, RequestLog) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));

    let accept_log = log.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let log = accept_log.clone();
            tokio::spawn(async move {
                let request = read_http_request(&mut socket).await;
                log.lock().unwrap().push(request.clone());

                let (status, extra, body) = stub_response(&request);
                let response = format!(
                    "HTTP/1.1 {status} OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\n{extra}connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    (format!("http://{addr}"), log)
}

/// Read one HTTP/1.1 request (headers plus content-length body).
async fn read_http_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Canned responses keyed on the request line: (status, extra headers, body).
fn stub_response(request: &str) -> (u16, &'static str, &'static str) {
    let line = request.lines().next().unwrap_or_default();
    if line.starts_with("POST /token") {
        (
            200,
            "",
            r#"{"access_token":"tok-1","refresh_token":"r-1","expires_in":3600,
               "user":{"id":"u-1","email":"foreman@example.com"}}"#,
        )
    } else if line.starts_with("GET /api/csrf/") {
        (200, "", r#"{"csrfToken":"csrf-1"}"#)
    } else if line.starts_with("GET /api/cart/") {
        (
            200,
            "",
            r#"{"id":1,"session_id":"s-1","user_id":null,"user_email":null,
               "items":[],"total":"0.00"}"#,
        )
    } else if line.starts_with("POST /api/cart/place_order/") {
        (
            201,
            "set-cookie: cart_session_id=post-order; Path=/\r\n",
            r#"{"id":3,"order_number":"ORD-20260825-4F2A1C","user_id":"u-1",
               "user_email":"foreman@example.com","full_name":"Dana Reyes",
               "phone":"555-0142","address":"12 Quarry Rd","total_amount":"137.50",
               "status":"pending","items":[],
               "created_at":"2026-08-25T12:00:00Z","updated_at":"2026-08-25T12:00:00Z"}"#,
        )
    } else {
        (404, "", "{}")
    }
}

fn form_post(uri: &str, body: &str, htmx: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", "203.0.113.7");
    if htmx {
        builder = builder.header("HX-Request", "true");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn anonymous_htmx_cart_add_gets_401_with_login_redirect() {
    let app = test_app();

    let response = app
        .oneshot(form_post("/cart/add", "product_id=1&quantity=2", true))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("HX-Redirect").unwrap(),
        "/auth/login"
    );
}

#[tokio::test]
async fn anonymous_cart_mutations_all_reject() {
    for (uri, body) in [
        ("/cart/add", "product_id=1&quantity=1"),
        ("/cart/update", "product_id=1&quantity=3"),
        ("/cart/remove", "product_id=1"),
        ("/cart/clear", ""),
    ] {
        let app = test_app();
        let response = app.oneshot(form_post(uri, body, true)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "expected 401 from {uri}"
        );
    }
}

#[tokio::test]
async fn anonymous_full_page_cart_add_redirects_to_login() {
    let app = test_app();

    let response = app
        .oneshot(form_post("/cart/add", "product_id=1&quantity=1", false))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/auth/login"
    );
}

#[tokio::test]
async fn anonymous_checkout_redirects_to_login() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/checkout")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/auth/login"
    );
}

#[tokio::test]
async fn anonymous_account_redirects_to_login() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/account/orders")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn login_page_renders() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/login")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn placed_order_redirects_and_next_cart_fetch_renders_empty() {
    let (base_url, log) = spawn_stub_backend().await;
    let app = test_app_with(&base_url);

    // Sign in to obtain a session cookie.
    let login = app
        .clone()
        .oneshot(form_post(
            "/auth/login",
            "email=foreman%40example.com&password=builder-pass",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
    let session_cookie = login
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    // Place the order.
    let mut request = form_post(
        "/checkout",
        "full_name=Dana+Reyes&phone=555-0142&address=12+Quarry+Rd",
        false,
    );
    request
        .headers_mut()
        .insert(header::COOKIE, session_cookie.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/account/orders"
    );

    // The next cart fetch renders whatever the server reports: empty.
    let request = Request::builder()
        .uri("/cart")
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::COOKIE, session_cookie.as_str())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Your cart is empty"));

    // The cart session id issued with the order was persisted and replayed
    // on that fetch.
    let requests = log.lock().unwrap();
    assert!(
        requests
            .iter()
            .any(|r| r.starts_with("GET /api/cart/")
                && r.to_lowercase().contains("cart_session_id=post-order")),
        "expected a cart fetch carrying the newly issued cart session id"
    );
}

#[tokio::test]
async fn cart_page_renders_empty_state_when_backend_unreachable() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cart")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Your cart is empty"));
    assert!(html.contains("$0.00") || !html.contains("Total:"));
}
