pub mod network {
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_CONNECTION_MS: u64 = 5_000;
    pub const USER_AGENT: &str = concat!("kintone-bridge/", env!("CARGO_PKG_VERSION"));
    pub const ALLOWED_SCHEMES: &[&str] = &["http://", "https://"];
}

pub mod limits {
    pub const MAX_RECORD_ID: u64 = i64::MAX as u64;
    pub const MAX_QUERY_LENGTH: usize = 10_000;
    pub const MAX_COMMENT_LENGTH: usize = 65_535;
    pub const MAX_APPS_LIMIT: u64 = 100;
    pub const MAX_MENTIONS: usize = 10;
    pub const LOG_SUBSTRING_LENGTH: usize = 100;
}

pub mod kintone {
    pub const RECORD_PATH: &str = "/k/v1/record.json";
    pub const RECORDS_PATH: &str = "/k/v1/records.json";
    pub const RECORD_COMMENT_PATH: &str = "/k/v1/record/comment.json";
    pub const APPS_PATH: &str = "/k/v1/apps.json";
    pub const FORM_FIELDS_PATH: &str = "/k/v1/app/form/fields.json";

    pub const HEADER_API_TOKEN: &str = "X-Cybozu-API-Token";
    pub const HEADER_AUTHORIZATION: &str = "X-Cybozu-Authorization";

    /// Error code kintone returns when an update carries a stale revision.
    pub const REVISION_CONFLICT_CODE: &str = "GAIA_CO02";
    pub const SYSTEM_FIELD_PREFIX: char = '$';
    pub const SKIP_REVISION_CHECK: i64 = -1;
}

pub mod retry {
    pub const STATUS_CODES: &[u16] = &[408, 429, 500, 502, 503, 504];
}

pub mod protocol {
    pub const JSONRPC_VERSION: &str = "2.0";
    pub const PROTOCOL_VERSION: &str = "2024-11-05";
    pub const SERVER_NAME: &str = "kintone-bridge";
}
