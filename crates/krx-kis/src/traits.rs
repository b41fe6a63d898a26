//! KIS API 호출 trait.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::KisError;

/// KIS 호출 결과 타입.
pub type KisResult<T> = Result<T, KisError>;

/// 인증과 throttle이 적용된 KIS 요청 인터페이스.
///
/// 수집기는 이 trait에만 의존하므로 실제 클라이언트(`KisClient`)와
/// 테스트용 `SimulatedKisApi`를 교체해서 사용할 수 있습니다.
#[async_trait]
pub trait KisApi: Send + Sync {
    /// 요청을 보내고 JSON 응답 본문을 반환합니다.
    ///
    /// `params`는 쿼리 문자열로, `headers`는 기본/인증 헤더 위에 덮어씁니다.
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> KisResult<Value>;
}
