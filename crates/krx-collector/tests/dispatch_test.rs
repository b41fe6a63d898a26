//! 디스패처 종단 간 테스트 (시뮬레이션 API + 메모리 저장소).

use krx_collector::{CollectorError, Dispatcher, Pipeline};
use krx_data::{
    CacheWriter, DownstreamEmitter, DurableStoreWriter, MemoryCache, MemoryChartStore,
    MemoryPublisher, TableName, TriggerMessage,
};
use krx_kis::{paths, SimulatedKisApi};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    api: Arc<SimulatedKisApi>,
    cache: Arc<MemoryCache>,
    store: Arc<MemoryChartStore>,
    bus: Arc<MemoryPublisher>,
    dispatcher: Dispatcher,
}

fn fixture_with(api: SimulatedKisApi, store: MemoryChartStore, bus: MemoryPublisher) -> Fixture {
    let api = Arc::new(api);
    let cache = Arc::new(MemoryCache::new());
    let store = Arc::new(store);
    let bus = Arc::new(bus);

    let dispatcher = Dispatcher::new(api.clone(), CacheWriter::new(cache.clone()))
        .with_chart_sinks(
            DownstreamEmitter::new(bus.clone(), "stock-historical-data"),
            DurableStoreWriter::new(store.clone(), TableName::default()),
        )
        .with_chart_chunk_delay(Duration::ZERO);

    Fixture {
        api,
        cache,
        store,
        bus,
        dispatcher,
    }
}

fn fixture(api: SimulatedKisApi) -> Fixture {
    fixture_with(api, MemoryChartStore::new(), MemoryPublisher::new())
}

fn message(body: Value) -> TriggerMessage {
    TriggerMessage::new("volume-rank", body.to_string())
}

fn codes_message(codes: &[&str]) -> TriggerMessage {
    message(json!({
        "output": codes.iter().map(|c| json!({"mksc_shrn_iscd": c})).collect::<Vec<_>>()
    }))
}

fn price_response(code: &str, price: &str) -> Value {
    json!({
        "rt_cd": "0", "msg_cd": "MCA00000", "msg1": "정상처리 되었습니다.",
        "output": {"stck_shrn_iscd": code, "stck_prpr": price, "prdy_vrss": "500", "acml_vol": "1000"}
    })
}

fn chart_responses() -> Vec<Value> {
    vec![
        json!({
            "rt_cd": "0", "msg_cd": "MCA00000", "msg1": "ok",
            "output1": {"hts_kor_isnm": "삼성전자"},
            "output2": [
                {"stck_bsop_date": "20240102", "stck_clpr": "79600", "stck_oprc": "78200", "acml_vol": "17142847"},
                {"stck_bsop_date": "20240103", "stck_clpr": "77000", "stck_oprc": "", "acml_vol": "21753644"}
            ]
        }),
        json!({"rt_cd": "0", "msg_cd": "MCA00000", "msg1": "ok", "output2": []}),
    ]
}

#[tokio::test]
async fn test_output_array_message_caches_current_price() {
    let f = fixture(SimulatedKisApi::new().with_response(
        paths::INQUIRE_PRICE,
        Some("005930"),
        price_response("005930", "71000"),
    ));

    let stats = f
        .dispatcher
        .handle_batch(
            Pipeline::CurrentPrice,
            &[message(json!({"output": [{"mksc_shrn_iscd": "005930"}]}))],
        )
        .await
        .unwrap();

    assert_eq!(f.api.call_count(paths::INQUIRE_PRICE), 1);
    assert_eq!(f.api.calls()[0].param("FID_INPUT_ISCD"), Some("005930"));
    assert_eq!(stats.success, 1);

    let snapshot: Value =
        serde_json::from_str(&f.cache.string("stock:005930:current_price").unwrap()).unwrap();
    assert_eq!(snapshot["stck_prpr"], "71000");
    assert_eq!(snapshot["requested_fid_input_iscd"], "005930");
    assert!(snapshot["collected_at"].is_string());

    let summary = f.cache.hash("stock:005930:current_price_fields");
    assert_eq!(summary["stck_prpr"], "71000");
    assert_eq!(summary["prdy_vrss"], "500");
}

#[tokio::test]
async fn test_failed_code_does_not_abort_batch() {
    let f = fixture(
        SimulatedKisApi::new()
            .with_failure(paths::INQUIRE_PRICE, Some("000660"), 500)
            .with_response(paths::INQUIRE_PRICE, Some("005930"), price_response("005930", "71000")),
    );

    let stats = f
        .dispatcher
        .handle_batch(Pipeline::CurrentPrice, &[codes_message(&["000660", "005930"])])
        .await
        .unwrap();

    assert_eq!(stats.codes, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.success, 1);
    assert!(f.cache.string("stock:005930:current_price").is_some());
    assert!(f.cache.string("stock:000660:current_price").is_none());
}

#[tokio::test]
async fn test_bad_messages_are_skipped() {
    let f = fixture(SimulatedKisApi::new().with_response(
        paths::INQUIRE_PRICE,
        None,
        price_response("005930", "71000"),
    ));

    let messages = [
        TriggerMessage::new("volume-rank", vec![0xc3u8, 0x28]),
        TriggerMessage::new("volume-rank", "{not json"),
        message(json!({"output": []})),
        codes_message(&["005930"]),
    ];
    let stats = f
        .dispatcher
        .handle_batch(Pipeline::CurrentPrice, &messages)
        .await
        .unwrap();

    assert_eq!(stats.messages, 4);
    assert_eq!(stats.undecodable, 1);
    assert_eq!(stats.without_codes, 2);
    assert_eq!(f.api.call_count(paths::INQUIRE_PRICE), 1);
}

#[tokio::test]
async fn test_message_fan_out_is_capped() {
    let f = fixture(SimulatedKisApi::new().with_response(
        paths::INQUIRE_PRICE,
        None,
        price_response("005930", "71000"),
    ));

    let codes: Vec<String> = (0..45).map(|i| format!("{:06}", i)).collect();
    let refs: Vec<&str> = codes.iter().map(String::as_str).collect();

    f.dispatcher
        .handle_batch(Pipeline::CurrentPrice, &[codes_message(&refs)])
        .await
        .unwrap();

    let calls = f.api.calls();
    assert_eq!(calls.len(), 30);
    assert_eq!(calls[29].param("FID_INPUT_ISCD"), Some("000029"));
}

#[tokio::test]
async fn test_time_conclusion_uses_one_hour_per_batch() {
    let f = fixture(SimulatedKisApi::new().with_response(
        paths::INQUIRE_TIME_ITEMCONCLUSION,
        None,
        json!({
            "rt_cd": "0", "msg_cd": "MCA00000", "msg1": "ok",
            "output2": [{"stck_cntg_hour": "093000", "stck_prpr": "71000"}]
        }),
    ));

    f.dispatcher
        .handle_batch(
            Pipeline::TimeConclusion,
            &[codes_message(&["005930", "000660"]), codes_message(&["035420"])],
        )
        .await
        .unwrap();

    let hours: Vec<String> = f
        .api
        .calls()
        .iter()
        .filter_map(|c| c.param("FID_INPUT_HOUR_1").map(str::to_string))
        .collect();
    assert_eq!(hours.len(), 3);
    assert!(hours.iter().all(|h| h == &hours[0]));

    let ticks: Vec<Value> =
        serde_json::from_str(&f.cache.string("stock:035420:intraday_ticks").unwrap()).unwrap();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0]["requested_fid_input_iscd"], "035420");
}

#[tokio::test]
async fn test_investor_trade_empty_output_is_not_cached() {
    let f = fixture(
        SimulatedKisApi::new()
            .with_response(
                paths::INVESTOR_TRADE_BY_STOCK_DAILY,
                Some("005930"),
                json!({
                    "rt_cd": "0", "msg_cd": "MCA00000", "msg1": "ok",
                    "output2": [
                        {"stck_bsop_date": "20240102", "frgn_ntby_qty": "-1200"},
                        {"stck_bsop_date": "20231229", "frgn_ntby_qty": "300"}
                    ]
                }),
            )
            .with_response(
                paths::INVESTOR_TRADE_BY_STOCK_DAILY,
                Some("000660"),
                json!({"rt_cd": "0", "msg_cd": "MCA00000", "msg1": "ok", "output2": []}),
            ),
    );

    f.dispatcher
        .handle_batch(Pipeline::InvestorTrade, &[codes_message(&["005930"])])
        .await
        .unwrap();
    f.dispatcher
        .handle_batch(Pipeline::InvestorTrade, &[codes_message(&["000660"])])
        .await
        .unwrap();

    let rows: Vec<Value> =
        serde_json::from_str(&f.cache.string("stock:005930:investor_trade_daily").unwrap())
            .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["frgn_ntby_qty"], "-1200");
    assert!(f.cache.string("stock:000660:investor_trade_daily").is_none());
}

#[tokio::test]
async fn test_chart_price_emits_then_persists_valid_rows() {
    let f = fixture(SimulatedKisApi::new().with_responses(
        paths::INQUIRE_DAILY_ITEMCHARTPRICE,
        Some("005930"),
        chart_responses(),
    ));

    let stats = f
        .dispatcher
        .handle_batch(Pipeline::ChartPrice, &[codes_message(&["005930"])])
        .await
        .unwrap();

    assert_eq!(stats.rows, 2);
    assert_eq!(stats.emitted, 1);
    assert_eq!(stats.persisted, 1);
    assert_eq!(stats.persist_skipped, 1);

    let published = f.bus.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "stock-historical-data");
    let emitted: Vec<Value> = serde_json::from_str(&published[0].1).unwrap();
    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[0]["requested_fid_period_div_code"], "D");

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].close, Decimal::from(79600));
    assert_eq!(records[0].period_code, "D");
}

#[tokio::test]
async fn test_chart_price_emit_failure_still_persists() {
    let f = fixture_with(
        SimulatedKisApi::new().with_responses(
            paths::INQUIRE_DAILY_ITEMCHARTPRICE,
            None,
            chart_responses(),
        ),
        MemoryChartStore::new(),
        MemoryPublisher::failing(),
    );

    let stats = f
        .dispatcher
        .handle_batch(Pipeline::ChartPrice, &[codes_message(&["005930"])])
        .await
        .unwrap();

    assert_eq!(stats.emitted, 0);
    assert_eq!(f.store.len(), 1);
}

#[tokio::test]
async fn test_chart_price_database_failure_aborts_batch() {
    let f = fixture_with(
        SimulatedKisApi::new().with_responses(
            paths::INQUIRE_DAILY_ITEMCHARTPRICE,
            None,
            chart_responses(),
        ),
        MemoryChartStore::failing(),
        MemoryPublisher::new(),
    );

    let result = f
        .dispatcher
        .handle_batch(Pipeline::ChartPrice, &[codes_message(&["005930"])])
        .await;

    assert!(matches!(result, Err(CollectorError::Data(_))));
}

#[tokio::test]
async fn test_chart_price_requires_durable_store() {
    let api = Arc::new(SimulatedKisApi::new());
    let dispatcher = Dispatcher::new(api.clone(), CacheWriter::new(Arc::new(MemoryCache::new())));

    let result = dispatcher
        .handle_batch(Pipeline::ChartPrice, &[codes_message(&["005930"])])
        .await;

    assert!(matches!(result, Err(CollectorError::Config(_))));
    assert!(api.calls().is_empty());
}
