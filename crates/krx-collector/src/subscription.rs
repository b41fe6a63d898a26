//! 구독 채널에서 배치 단위로 메시지를 꺼냅니다.

use krx_data::TriggerMessage;
use tokio::sync::mpsc;

/// 한 배치의 최대 메시지 수.
pub const MAX_BATCH_SIZE: usize = 32;

/// 메시지 하나를 기다린 뒤, 이미 도착해 있는 메시지를 최대 32개까지 묶습니다.
///
/// 채널이 닫히면 `None`.
pub async fn receive_batch(rx: &mut mpsc::Receiver<TriggerMessage>) -> Option<Vec<TriggerMessage>> {
    let first = rx.recv().await?;
    let mut batch = vec![first];

    while batch.len() < MAX_BATCH_SIZE {
        match rx.try_recv() {
            Ok(message) => batch.push(message),
            Err(_) => break,
        }
    }

    Some(batch)
}
