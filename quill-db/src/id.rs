use chrono::Utc;
use uuid::Uuid;

/// Length of every id produced by [`next_id`].
pub const ID_LEN: usize = 50;

/// Time-ordered primary key: 15-digit millisecond timestamp, 32 hex chars of
/// a random UUID, then `000`.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}
