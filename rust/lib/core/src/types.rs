/// Generate a new record ID (UUIDv7, no dashes).
///
/// v7 ids sort by creation time and are monotonic within a process, so a
/// key-ordered scan returns records in insertion order.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
