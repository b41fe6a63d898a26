//! 한국투자증권 (KIS) 국내 주식 시세 클라이언트.
//!
//! # 기능
//!
//! - OAuth 접근 토큰 발급 및 만료 5분 전 자동 갱신
//! - 요청 간 최소 간격 보장 (단일 공유 throttle)
//! - 엔드포인트별 수집기: 현재가, 시간대별 체결, 투자자 매매동향,
//!   기간별 시세, 거래량 순위, 업종 지수
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use krx_kis::{collectors, KisClient, KisConfig};
//!
//! let client = KisClient::new(KisConfig::from_env()?)?;
//! let code = "005930".parse()?;
//! let row = collectors::fetch_inquire_price(&client, &code).await?;
//! ```

pub mod auth;
pub mod client;
pub mod collectors;
pub mod config;
pub mod error;
pub mod simulated;
pub mod throttle;
pub mod traits;

pub use auth::TokenState;
pub use client::KisClient;
pub use config::{KisConfig, KisEnvironment};
pub use error::KisError;
pub use reqwest::Method;
pub use simulated::SimulatedKisApi;
pub use throttle::Throttle;
pub use traits::{KisApi, KisResult};

/// KIS 거래 ID (tr_id) 상수 모음.
pub mod tr_id {
    /// 주식현재가 시세
    pub const INQUIRE_PRICE: &str = "FHKST01010100";
    /// 주식현재가 시간대별 체결
    pub const INQUIRE_TIME_ITEMCONCLUSION: &str = "FHPST01060000";
    /// 종목별 투자자매매동향 (일별)
    pub const INVESTOR_TRADE_BY_STOCK_DAILY: &str = "FHPTJ04160001";
    /// 국내주식 기간별 시세 (일/주/월/년)
    pub const INQUIRE_DAILY_ITEMCHARTPRICE: &str = "FHKST03010100";
    /// 거래량 순위
    pub const VOLUME_RANK: &str = "FHPST01710000";
    /// 국내업종 현재지수
    pub const INQUIRE_INDEX_PRICE: &str = "FHPUP02100000";
    /// 국내업종 시간별 지수 (틱)
    pub const INQUIRE_INDEX_TICKPRICE: &str = "FHPUP02110100";
}

/// 시세 조회 엔드포인트 경로.
pub mod paths {
    pub const INQUIRE_PRICE: &str = "/uapi/domestic-stock/v1/quotations/inquire-price";
    pub const INQUIRE_TIME_ITEMCONCLUSION: &str =
        "/uapi/domestic-stock/v1/quotations/inquire-time-itemconclusion";
    pub const INVESTOR_TRADE_BY_STOCK_DAILY: &str =
        "/uapi/domestic-stock/v1/quotations/investor-trade-by-stock-daily";
    pub const INQUIRE_DAILY_ITEMCHARTPRICE: &str =
        "/uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice";
    pub const VOLUME_RANK: &str = "/uapi/domestic-stock/v1/quotations/volume-rank";
    pub const INQUIRE_INDEX_PRICE: &str = "/uapi/domestic-stock/v1/quotations/inquire-index-price";
    pub const INQUIRE_INDEX_TICKPRICE: &str =
        "/uapi/domestic-stock/v1/quotations/inquire-index-tickprice";
    pub const TOKEN: &str = "/oauth2/tokenP";
}
