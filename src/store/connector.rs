//! Transport seam and the PostgreSQL implementation.
//!
//! # Responsibilities
//! - Resolve the configured connection parameters, failing fast on gaps
//! - Open one fresh transport per call (no pooling)
//! - Run one statement with positional JSON parameters, returning JSON rows
//! - Close the transport
//!
//! # Design Decisions
//! - `Connector` and `Transport` are object-safe so the acquirer can be
//!   driven by in-memory fakes in tests
//! - TLS is verify-full when a trust anchor is configured, disabled otherwise
//! - A column type without a JSON mapping fails the query instead of
//!   decoding to `null`
//! - JSON `null` parameters are sent untyped and take the target's type

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgConnectOptions, PgConnection, PgRow, PgSslMode, PgTypeInfo,
};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column, Connection, Postgres, Row as _, Type, TypeInfo, ValueRef};

use crate::config::schema::{CaSource, ConnectionConfig, TlsConfig};
use crate::store::error::{ConfigurationError, ConnectError, QueryError, ReleaseError};

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Connection parameters with every required field present.
#[derive(Clone)]
pub struct ConnectParams {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub connect_timeout: Duration,
    pub tls: Option<TlsConfig>,
}

impl ConnectParams {
    /// Check that every required field is present and usable.
    pub fn resolve(config: &ConnectionConfig) -> Result<Self, ConfigurationError> {
        if config.port == 0 {
            return Err(ConfigurationError::Invalid {
                field: "database.port",
                reason: "port must be non-zero".into(),
            });
        }
        if config.connect_timeout_ms == 0 {
            return Err(ConfigurationError::Invalid {
                field: "database.connect_timeout_ms",
                reason: "timeout must be greater than zero".into(),
            });
        }

        Ok(Self {
            user: required(&config.user, "database.user")?,
            password: required(&config.password, "database.password")?,
            host: required(&config.host, "database.host")?,
            port: config.port,
            database: required(&config.database, "database.database")?,
            connect_timeout: config.connect_timeout(),
            tls: config.tls.clone(),
        })
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ConfigurationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigurationError::Missing(field)),
    }
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

/// An open session to the backing store.
#[async_trait]
pub trait Transport: Send {
    /// Run one statement with positional parameters.
    async fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, QueryError>;

    /// Close the session. Called at most once.
    async fn close(&mut self) -> Result<(), ReleaseError>;
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Make one connect attempt. The caller bounds it with the connect timeout.
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Transport>, ConnectError>;
}

/// Connector for PostgreSQL via sqlx.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

impl PgConnector {
    pub fn options(params: &ConnectParams) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.user)
            .password(&params.password)
            .database(&params.database);

        match params.tls.as_ref().map(TlsConfig::source) {
            None => options.ssl_mode(PgSslMode::Disable),
            Some(CaSource::Pem(pem)) => options
                .ssl_mode(PgSslMode::VerifyFull)
                .ssl_root_cert_from_pem(pem.as_bytes().to_vec()),
            Some(CaSource::Path(path)) => options.ssl_mode(PgSslMode::VerifyFull).ssl_root_cert(path),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Transport>, ConnectError> {
        let conn = PgConnection::connect_with(&Self::options(params))
            .await
            .map_err(|e| ConnectError::Transport(e.to_string()))?;
        Ok(Box::new(PgTransport { conn: Some(conn) }))
    }
}

struct PgTransport {
    conn: Option<PgConnection>,
}

#[async_trait]
impl Transport for PgTransport {
    async fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, QueryError> {
        let conn = self.conn.as_mut().ok_or(QueryError::Closed)?;
        let query = bind_params(sqlx::query(statement), params)?;
        let rows = query
            .fetch_all(conn)
            .await
            .map_err(|e| QueryError::Database(e.to_string()))?;
        rows.iter().map(row_to_json).collect()
    }

    async fn close(&mut self) -> Result<(), ReleaseError> {
        match self.conn.take() {
            Some(conn) => conn.close().await.map_err(|e| ReleaseError::Transport(e.to_string())),
            None => Ok(()),
        }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Result<Query<'q, Postgres, PgArguments>, QueryError> {
    for (position, param) in params.iter().enumerate() {
        query = match param {
            Value::Null => query.bind(UntypedNull),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    query.bind(f)
                } else {
                    return Err(QueryError::Parameter {
                        position: position + 1,
                        reason: format!("number {} does not fit a column type", n),
                    });
                }
            }
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(sqlx::types::Json(other.clone())),
        };
    }
    Ok(query)
}

/// A NULL parameter sent with an unspecified type, so the server infers it
/// from the target column.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// How a column is turned into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Json,
    Uuid,
    Timestamptz,
    Timestamp,
    Date,
    Time,
    Bytea,
    BoolArray,
    Int4Array,
    Int8Array,
    Float8Array,
    TextArray,
}

impl ColumnKind {
    fn for_type(type_name: &str) -> Option<Self> {
        let kind = match type_name {
            "BOOL" => Self::Bool,
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "NUMERIC" => Self::Numeric,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" | "citext" => Self::Text,
            "JSON" | "JSONB" => Self::Json,
            "UUID" => Self::Uuid,
            "TIMESTAMPTZ" => Self::Timestamptz,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "BYTEA" => Self::Bytea,
            "BOOL[]" => Self::BoolArray,
            "INT4[]" => Self::Int4Array,
            "INT8[]" => Self::Int8Array,
            "FLOAT8[]" => Self::Float8Array,
            "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => Self::TextArray,
            _ => return None,
        };
        Some(kind)
    }
}

fn row_to_json(row: &PgRow) -> Result<Row, QueryError> {
    let mut out = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.name(), column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, name: &str, type_name: &str) -> Result<Value, QueryError> {
    let kind = ColumnKind::for_type(type_name).ok_or_else(|| QueryError::UnsupportedColumn {
        column: name.to_string(),
        type_name: type_name.to_string(),
    })?;

    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Ok(Value::Null),
        Ok(_) => {}
        Err(e) => return Err(QueryError::Database(e.to_string())),
    }

    let decoded = match kind {
        ColumnKind::Bool => row.try_get::<bool, _>(idx).map(Value::from),
        ColumnKind::Int2 => row.try_get::<i16, _>(idx).map(Value::from),
        ColumnKind::Int4 => row.try_get::<i32, _>(idx).map(Value::from),
        ColumnKind::Int8 => row.try_get::<i64, _>(idx).map(Value::from),
        ColumnKind::Float4 => row.try_get::<f32, _>(idx).map(Value::from),
        ColumnKind::Float8 => row.try_get::<f64, _>(idx).map(Value::from),
        ColumnKind::Numeric => row.try_get::<Decimal, _>(idx).map(|d| Value::from(d.to_string())),
        ColumnKind::Text => row.try_get::<String, _>(idx).map(Value::from),
        ColumnKind::Json => row.try_get::<Value, _>(idx),
        ColumnKind::Uuid => row.try_get::<Uuid, _>(idx).map(|u| Value::from(u.to_string())),
        ColumnKind::Timestamptz => row
            .try_get::<DateTime<Utc>, _>(idx)
            .map(|t| Value::from(t.to_rfc3339())),
        ColumnKind::Timestamp => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|t| Value::from(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        ColumnKind::Date => row.try_get::<NaiveDate, _>(idx).map(|d| Value::from(d.to_string())),
        ColumnKind::Time => row.try_get::<NaiveTime, _>(idx).map(|t| Value::from(t.to_string())),
        ColumnKind::Bytea => row.try_get::<Vec<u8>, _>(idx).map(|bytes| Value::from(hex_literal(&bytes))),
        ColumnKind::BoolArray => row.try_get::<Vec<Option<bool>>, _>(idx).map(array),
        ColumnKind::Int4Array => row.try_get::<Vec<Option<i32>>, _>(idx).map(array),
        ColumnKind::Int8Array => row.try_get::<Vec<Option<i64>>, _>(idx).map(array),
        ColumnKind::Float8Array => row.try_get::<Vec<Option<f64>>, _>(idx).map(array),
        ColumnKind::TextArray => row.try_get::<Vec<Option<String>>, _>(idx).map(array),
    };

    decoded.map_err(|e| QueryError::Database(format!("decoding column `{}`: {}", name, e)))
}

fn array<T: Into<Value>>(items: Vec<Option<T>>) -> Value {
    Value::Array(items.into_iter().map(|item| item.map_or(Value::Null, Into::into)).collect())
}

/// Postgres hex output format for bytea.
fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
