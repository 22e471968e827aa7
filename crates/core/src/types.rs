/// Server-assigned job identifiers are opaque strings.
pub type JobId = String;

/// Durable anonymous client identifier (`user_<millis>_<suffix>`).
pub type ClientIdentity = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
