//! KisClient HTTP 동작 테스트 (mockito).

use krx_kis::{collectors, KisApi, KisClient, KisConfig, KisError, Method};
use krx_core::InstrumentCode;
use mockito::{Matcher, Server, ServerGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn mock_token(server: &mut ServerGuard, expires_in: i64, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/oauth2/tokenP")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "grant_type": "client_credentials",
            "appkey": "test-app-key",
            "appsecret": "test-app-secret"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"access_token":"tok-1","token_type":"Bearer","expires_in":{}}}"#,
            expires_in
        ))
        .expect(hits)
        .create_async()
        .await
}

fn client(server: &ServerGuard, interval: Duration) -> KisClient {
    let config = KisConfig::new("test-app-key", "test-app-secret")
        .with_base_url(server.url())
        .with_request_interval(interval);
    KisClient::new(config).unwrap()
}

#[tokio::test]
async fn test_token_is_reused_across_requests() {
    let mut server = Server::new_async().await;
    let token = mock_token(&mut server, 86_400, 1).await;
    let price = server
        .mock("GET", "/uapi/domestic-stock/v1/quotations/inquire-price")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("FID_COND_MRKT_DIV_CODE".into(), "J".into()),
            Matcher::UrlEncoded("FID_INPUT_ISCD".into(), "005930".into()),
        ]))
        .match_header("authorization", "Bearer tok-1")
        .match_header("appkey", "test-app-key")
        .match_header("appsecret", "test-app-secret")
        .match_header("tr_id", "FHKST01010100")
        .match_header("custtype", "P")
        .with_status(200)
        .with_body(r#"{"rt_cd":"0","msg_cd":"MCA00000","msg1":"ok","output":{"stck_prpr":"71000"}}"#)
        .expect(2)
        .create_async()
        .await;

    let client = client(&server, Duration::ZERO);
    let code = InstrumentCode::new("005930").unwrap();

    for _ in 0..2 {
        let row = collectors::fetch_inquire_price(&client, &code).await.unwrap();
        assert_eq!(row.text("stck_prpr").as_deref(), Some("71000"));
    }

    token.assert_async().await;
    price.assert_async().await;
    assert!(client.token_expires_at().await.is_some());
}

#[tokio::test]
async fn test_token_inside_renewal_margin_is_refreshed() {
    let mut server = Server::new_async().await;
    // 만료까지 200초 → 5분 여유보다 짧으므로 매 요청마다 재발급
    let token = mock_token(&mut server, 200, 2).await;
    let data = server
        .mock("GET", "/ping")
        .with_status(200)
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let client = client(&server, Duration::ZERO);
    client.request(Method::GET, "/ping", &[], &[]).await.unwrap();
    client.request(Method::GET, "/ping", &[], &[]).await.unwrap();

    token.assert_async().await;
    data.assert_async().await;
}

#[tokio::test]
async fn test_override_headers_win_over_defaults() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 86_400, 1).await;
    let data = server
        .mock("GET", "/headers")
        .match_header("accept", "application/json")
        .match_header("content-type", "application/json")
        .match_header("authorization", "Bearer override")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = client(&server, Duration::ZERO);
    client
        .request(
            Method::GET,
            "/headers",
            &[],
            &[("Accept", "application/json"), ("authorization", "Bearer override")],
        )
        .await
        .unwrap();

    data.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_is_hard_failure() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 86_400, 1).await;
    let _data = server
        .mock("GET", "/broken")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let client = client(&server, Duration::ZERO);
    let err = client
        .request(Method::GET, "/broken", &[], &[])
        .await
        .unwrap_err();

    match err {
        KisError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal error");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_response_still_counts_for_throttle() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 86_400, 1).await;
    let _broken = server
        .mock("GET", "/broken")
        .with_status(503)
        .create_async()
        .await;
    let _ok = server
        .mock("GET", "/ok")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let interval = Duration::from_millis(300);
    let client = client(&server, interval);

    assert!(client.request(Method::GET, "/broken", &[], &[]).await.is_err());
    let started = Instant::now();
    client.request(Method::GET, "/ok", &[], &[]).await.unwrap();

    assert!(started.elapsed() >= interval - Duration::from_millis(20));
}

#[tokio::test]
async fn test_consecutive_requests_are_spaced() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 86_400, 1).await;
    let _ok = server
        .mock("GET", "/ok")
        .with_status(200)
        .with_body("{}")
        .expect(3)
        .create_async()
        .await;

    let interval = Duration::from_millis(200);
    let client = client(&server, interval);

    let started = Instant::now();
    for _ in 0..3 {
        client.request(Method::GET, "/ok", &[], &[]).await.unwrap();
    }

    assert!(started.elapsed() >= interval * 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_throttle() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 86_400, 1).await;
    let _ok = server
        .mock("GET", "/ok")
        .with_status(200)
        .with_body("{}")
        .expect(4)
        .create_async()
        .await;

    let interval = Duration::from_millis(200);
    let client = Arc::new(client(&server, interval));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client.request(Method::GET, "/ok", &[], &[]).await.unwrap();
                Instant::now()
            })
        })
        .collect();

    let mut finished = Vec::new();
    for handle in handles {
        finished.push(handle.await.unwrap());
    }
    finished.sort();

    for pair in finished.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= interval - Duration::from_millis(20),
            "gap {:?} shorter than interval",
            gap
        );
    }
}

#[tokio::test]
async fn test_token_rejection_is_unauthorized() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(403)
        .with_body(r#"{"error_code":"EGW00103","error_description":"유효하지 않은 AppKey입니다."}"#)
        .create_async()
        .await;

    let client = client(&server, Duration::ZERO);
    let err = client
        .request(Method::GET, "/any", &[], &[])
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_invalid_json_body_is_parse_error() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 86_400, 1).await;
    let _data = server
        .mock("GET", "/text")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = client(&server, Duration::ZERO);
    let err = client.request(Method::GET, "/text", &[], &[]).await.unwrap_err();
    assert!(matches!(err, KisError::ParseError(_)));
}

#[test]
fn test_client_requires_credentials() {
    assert!(KisClient::new(KisConfig::new("", "secret")).is_err());
}
