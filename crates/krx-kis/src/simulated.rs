//! 테스트 및 오프라인 실행을 위한 시뮬레이션 KIS API.
//!
//! 경로와 종목코드(`FID_INPUT_ISCD`)별로 미리 정한 응답을 돌려주고,
//! 모든 호출을 기록합니다.
//!
//! ```ignore
//! let api = SimulatedKisApi::new()
//!     .with_response(paths::INQUIRE_PRICE, Some("005930"), json!({"rt_cd": "0", "output": {}}))
//!     .with_failure(paths::INQUIRE_PRICE, Some("000660"), 500);
//! ```

use crate::traits::{KisApi, KisResult};
use crate::KisError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Mutex;

/// 기록된 호출.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Json(Value),
    Status(u16),
}

#[derive(Debug)]
struct Route {
    path: String,
    /// `None`이면 모든 종목코드에 응답
    code: Option<String>,
    outcomes: Vec<Outcome>,
    served: usize,
}

impl Route {
    /// 순서대로 응답하고 마지막 응답은 반복합니다.
    fn next(&mut self) -> Outcome {
        let idx = self.served.min(self.outcomes.len().saturating_sub(1));
        self.served += 1;
        self.outcomes[idx].clone()
    }
}

/// 시뮬레이션 KIS API.
#[derive(Debug, Default)]
pub struct SimulatedKisApi {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl SimulatedKisApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 고정 응답 등록.
    pub fn with_response(self, path: &str, code: Option<&str>, response: Value) -> Self {
        self.route(path, code, vec![Outcome::Json(response)])
    }

    /// 순차 응답 등록 (분할 조회용).
    pub fn with_responses(self, path: &str, code: Option<&str>, responses: Vec<Value>) -> Self {
        self.route(path, code, responses.into_iter().map(Outcome::Json).collect())
    }

    /// HTTP 실패 응답 등록.
    pub fn with_failure(self, path: &str, code: Option<&str>, status: u16) -> Self {
        self.route(path, code, vec![Outcome::Status(status)])
    }

    fn route(self, path: &str, code: Option<&str>, outcomes: Vec<Outcome>) -> Self {
        if !outcomes.is_empty() {
            if let Ok(mut routes) = self.routes.lock() {
                routes.push(Route {
                    path: path.to_string(),
                    code: code.map(str::to_string),
                    outcomes,
                    served: 0,
                });
            }
        }
        self
    }

    /// 지금까지의 호출 목록.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// 특정 경로 호출 횟수.
    pub fn call_count(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }
}

#[async_trait]
impl KisApi for SimulatedKisApi {
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> KisResult<Value> {
        let code = params
            .iter()
            .find(|(k, _)| *k == "FID_INPUT_ISCD")
            .map(|(_, v)| v.as_str());

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                method,
                path: path.to_string(),
                params: params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        }

        let outcome = {
            let mut routes = self
                .routes
                .lock()
                .map_err(|_| KisError::NetworkError("simulated api poisoned".to_string()))?;

            // 종목코드가 일치하는 경로를 우선 사용
            let exact = routes
                .iter()
                .position(|r| r.path == path && r.code.is_some() && r.code.as_deref() == code);
            let wildcard = || routes.iter().position(|r| r.path == path && r.code.is_none());

            match exact.or_else(wildcard) {
                Some(idx) => routes[idx].next(),
                None => Outcome::Status(404),
            }
        };

        match outcome {
            Outcome::Json(value) => Ok(value),
            Outcome::Status(status) => Err(KisError::Http {
                status,
                body: format!("simulated failure for {}", path),
            }),
        }
    }
}
