//! Common types for the client SDK

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One result row, keyed by column name in server order
pub type Row = serde_json::Map<String, Value>;

const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

/// Read an explicit `null` the same way as a missing key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Result of a query
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Rows returned
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Row>,
    /// Number of rows in `data`
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    /// Total matching rows, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Error message embedded in a successful response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of an insert
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    /// Id of the new row
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub affected_rows: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
}

/// Result of an update
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub affected_rows: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
}

/// Result of a delete
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub affected_rows: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
}

/// Table schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Columns in definition order
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// Column description
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// SQL type, e.g. `varchar(255)`
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Storage quota
///
/// Gigabyte figures are what the server sends. The byte figures are
/// derived from them once, when the quota is deserialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "QuotaWire")]
pub struct StorageQuota {
    pub storage_quota_gb: f64,
    pub storage_used_gb: f64,
    pub storage_expansion_gb: f64,
    pub storage_available_gb: f64,
    pub usage_percentage: f64,
    pub can_expand_storage: bool,
    pub is_enterprise: bool,
    pub plan_name: String,
    #[serde(skip_serializing)]
    pub storage_quota_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_used_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_available_bytes: i64,
}

#[derive(Deserialize)]
struct QuotaWire {
    #[serde(default, deserialize_with = "null_as_default")]
    storage_quota_gb: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    storage_used_gb: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    storage_expansion_gb: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    storage_available_gb: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    usage_percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    can_expand_storage: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    is_enterprise: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    plan_name: String,
}

impl From<QuotaWire> for StorageQuota {
    fn from(wire: QuotaWire) -> Self {
        Self {
            storage_quota_bytes: gb_to_bytes(wire.storage_quota_gb),
            storage_used_bytes: gb_to_bytes(wire.storage_used_gb),
            storage_available_bytes: gb_to_bytes(wire.storage_available_gb),
            storage_quota_gb: wire.storage_quota_gb,
            storage_used_gb: wire.storage_used_gb,
            storage_expansion_gb: wire.storage_expansion_gb,
            storage_available_gb: wire.storage_available_gb,
            usage_percentage: wire.usage_percentage,
            can_expand_storage: wire.can_expand_storage,
            is_enterprise: wire.is_enterprise,
            plan_name: wire.plan_name,
        }
    }
}

fn gb_to_bytes(gb: f64) -> i64 {
    (gb * BYTES_PER_GB) as i64
}

/// A stored file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageFile {
    /// Object key
    pub key: String,
    /// Size in bytes
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: i64,
    /// Last modified timestamp as sent by the server
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl StorageFile {
    /// Parse `last_modified` as an RFC 3339 timestamp
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_modified)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

/// Upload result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileUploadResult {
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: i64,
    /// URL of the stored object
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
}

/// An authenticated end user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email_verified: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_metadata: serde_json::Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_metadata: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Session tokens
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Empty when the backend withholds tokens, e.g. until the email is verified
    #[serde(default, deserialize_with = "null_as_default")]
    pub access_token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub refresh_token: String,
    #[serde(default = "default_token_type", deserialize_with = "token_type_or_bearer")]
    pub token_type: String,
    /// Lifetime of the access token in seconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

fn token_type_or_bearer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|t| t.unwrap_or_else(default_token_type))
}

/// User (when the endpoint returns one) plus session tokens
#[derive(Clone, Debug)]
pub struct AuthResult {
    pub user: Option<AuthUser>,
    pub session: AuthSession,
}

/// OAuth authorization URL payload
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthAuthorizeResponse {
    pub authorization_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_redirect_uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quota_bytes_derived_on_construction() {
        let quota: StorageQuota = serde_json::from_value(json!({
            "storage_quota_gb": 10,
            "storage_used_gb": 2.5,
            "storage_available_gb": 7.5,
            "plan_name": "pro"
        }))
        .unwrap();

        assert_eq!(quota.storage_quota_bytes, 10 * 1024 * 1024 * 1024);
        assert_eq!(quota.storage_used_bytes, 2_684_354_560);
        assert_eq!(quota.storage_available_bytes, ((10.0 - 2.5) * BYTES_PER_GB) as i64);
        assert_eq!(quota.plan_name, "pro");
    }

    #[test]
    fn test_quota_bytes_truncate() {
        let quota: StorageQuota =
            serde_json::from_value(json!({ "storage_available_gb": 0.000000001 })).unwrap();
        // 1e-9 GB is just over one byte
        assert_eq!(quota.storage_available_bytes, 1);
    }

    #[test]
    fn test_query_response_preserves_column_order() {
        let resp: QueryResponse = serde_json::from_str(
            r#"{"data":[{"zeta":1,"alpha":2,"mid":3}],"count":1,"total":40}"#,
        )
        .unwrap();
        let columns: Vec<&str> = resp.data[0].keys().map(String::as_str).collect();
        assert_eq!(columns, ["zeta", "alpha", "mid"]);
        assert_eq!(resp.total, Some(40));
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let resp: QueryResponse =
            serde_json::from_str(r#"{"data":null,"count":null,"total":null}"#).unwrap();
        assert!(resp.data.is_empty());
        assert_eq!(resp.count, 0);
        assert!(resp.total.is_none());

        let deleted: DeleteResponse =
            serde_json::from_str(r#"{"affected_rows":null,"success":null}"#).unwrap();
        assert_eq!(deleted.affected_rows, 0);
        assert!(!deleted.success);

        let session: AuthSession =
            serde_json::from_str(r#"{"access_token":null,"token_type":null,"expires_in":null}"#)
                .unwrap();
        assert!(session.access_token.is_empty());
        assert_eq!(session.token_type, "bearer");
    }

    #[test]
    fn test_column_info_type_field() {
        let col: ColumnInfo = serde_json::from_value(json!({
            "name": "email",
            "type": "varchar(255)",
            "nullable": false
        }))
        .unwrap();
        assert_eq!(col.data_type, "varchar(255)");
        assert!(col.default.is_none());
    }

    #[test]
    fn test_storage_file_timestamp() {
        let file: StorageFile = serde_json::from_value(json!({
            "key": "a.txt",
            "size": 3,
            "last_modified": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(file.last_modified_at().unwrap().timestamp(), 1_704_067_200);

        let file = StorageFile { last_modified: "yesterday".to_string(), ..file };
        assert!(file.last_modified_at().is_none());
    }
}
