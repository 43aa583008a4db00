//! UseCase: 保持期間を過ぎたメッセージの削除
//!
//! 一定周期のバックグラウンド実行に加え、セッション開始時と履歴取得時にも
//! その場で実行される。周期実行の失敗はログに残すだけで、
//! 呼び出し元がいる実行では失敗をそのまま返す。

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::domain::{ChatMessageRepository, Clock, RepositoryError};

/// Default age after which messages are deleted.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 60);

/// Default period of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// 保持期間スイーパー
pub struct RetentionSweeper {
    repository: Arc<dyn ChatMessageRepository>,
    clock: Arc<dyn Clock>,
    horizon: chrono::Duration,
}

impl RetentionSweeper {
    /// 新しい RetentionSweeper を作成
    ///
    /// # Arguments
    ///
    /// * `repository` - 削除対象のストア
    /// * `clock` - 削除基準時刻の算出に使う時計
    /// * `horizon` - これより古いメッセージを削除する
    pub fn new(
        repository: Arc<dyn ChatMessageRepository>,
        clock: Arc<dyn Clock>,
        horizon: Duration,
    ) -> Self {
        Self {
            repository,
            clock,
            horizon: crate::common::time::to_chrono(horizon),
        }
    }

    /// 保持期間を過ぎたメッセージを今すぐ削除する
    ///
    /// # Returns
    ///
    /// 削除したメッセージ数
    pub async fn sweep(&self) -> Result<u64, RepositoryError> {
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(self.horizon)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        let deleted = self.repository.delete_older_than(cutoff).await?;
        if deleted > 0 {
            tracing::debug!(deleted, %cutoff, "expired chat messages deleted");
        }
        Ok(deleted)
    }

    /// 周期スイープを開始する
    ///
    /// 最初の実行は `period` 経過後。失敗はログに残して次の周期を待つ。
    pub fn spawn_periodic(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::warn!("periodic retention sweep failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockChatMessageRepository;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[tokio::test]
    async fn test_sweep_uses_now_minus_horizon_as_cutoff() {
        // テスト項目: 現在時刻から保持期間を引いた時刻を基準に削除する
        // given (前提条件):
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let expected_cutoff = Utc.with_ymd_and_hms(2025, 6, 1, 11, 30, 0).unwrap();
        let mut repository = MockChatMessageRepository::new();
        repository
            .expect_delete_older_than()
            .with(eq(expected_cutoff))
            .times(1)
            .returning(|_| Ok(3));
        let sweeper = RetentionSweeper::new(
            Arc::new(repository),
            Arc::new(FixedClock(now)),
            DEFAULT_RETENTION,
        );

        // when (操作):
        let result = sweeper.sweep().await;

        // then (期待する結果):
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_sweep_propagates_repository_error() {
        // テスト項目: 即時スイープの失敗は呼び出し元に返される
        // given (前提条件):
        let mut repository = MockChatMessageRepository::new();
        repository
            .expect_delete_older_than()
            .returning(|_| Err(RepositoryError::Database("timeout".into())));
        let sweeper = RetentionSweeper::new(
            Arc::new(repository),
            Arc::new(FixedClock(Utc::now())),
            DEFAULT_RETENTION,
        );

        // when (操作):
        let result = sweeper.sweep().await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::Database("timeout".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_survives_failures() {
        // テスト項目: 周期スイープは失敗しても止まらず、周期ごとに実行される
        // given (前提条件): 毎回失敗するリポジトリ
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut repository = MockChatMessageRepository::new();
        repository.expect_delete_older_than().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::Database("down".into()))
        });
        let sweeper = Arc::new(RetentionSweeper::new(
            Arc::new(repository),
            Arc::new(FixedClock(Utc::now())),
            DEFAULT_RETENTION,
        ));

        // when (操作):
        let handle = sweeper.spawn_periodic(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(30)).await;
        let before_first_tick = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(160)).await;

        // then (期待する結果):
        assert_eq!(before_first_tick, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        handle.abort();
    }
}
