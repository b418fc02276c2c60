/// Job identifiers are opaque strings: caller-supplied or generated UUIDs.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
