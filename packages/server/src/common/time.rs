use chrono::{DateTime, Utc};

/// Current time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a std duration into a chrono duration, saturating on overflow.
pub fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_to_chrono_minutes() {
        // テスト項目: 分単位の Duration を変換できる
        // when (操作):
        let converted = to_chrono(Duration::from_secs(30 * 60));

        // then (期待する結果):
        assert_eq!(converted, chrono::Duration::minutes(30));
    }

    #[test]
    fn test_to_chrono_saturates() {
        // テスト項目: 範囲外の Duration は最大値に丸められる
        // when (操作):
        let converted = to_chrono(Duration::MAX);

        // then (期待する結果):
        assert_eq!(converted, chrono::Duration::MAX);
    }
}
