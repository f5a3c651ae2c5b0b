//! PostgreSQL store backed by a deadpool connection pool.
//!
//! Statements are prepared first so each [`SqlParam`] can be bound as the type
//! PostgreSQL inferred for its placeholder (`owner_id = $1` wants `int4`,
//! `LIMIT $n` wants `int8`, a comparison against `avg(...)` wants `numeric`).

use std::fmt::Debug;

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::ExecutionError;
use crate::search::SqlParam;
use crate::store::traits::{Row, Store};

const BACKEND_NAME: &str = "postgres";

type BoxedParam = Box<dyn ToSql + Sync + Send>;

pub struct PgStore {
    pool: Pool,
    config: StoreConfig,
}

impl Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("dbname", &self.config.dbname)
            .field("pool_size", &self.pool.status().size)
            .finish_non_exhaustive()
    }
}

impl PgStore {
    /// Builds the pool and checks that one connection can be opened.
    pub async fn connect(config: StoreConfig) -> Result<Self, ExecutionError> {
        let pool = Self::create_pool(&config)?;

        let client = pool.get().await.map_err(|e| connection_error(e.to_string()))?;
        drop(client);

        info!(
            "Connected to {}:{}/{} as {}",
            config.host, config.port, config.dbname, config.user
        );

        Ok(Self { pool, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn create_pool(config: &StoreConfig) -> Result<Pool, ExecutionError> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.dbname.clone());
        cfg.user = Some(config.user.clone());
        cfg.password = config.password.clone();
        if config.statement_timeout_ms > 0 {
            cfg.options = Some(format!(
                "-c statement_timeout={}",
                config.statement_timeout_ms
            ));
        }

        cfg.builder(NoTls)
            .map_err(|e| connection_error(format!("Failed to create pool builder: {e}")))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| connection_error(e.to_string()))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, ExecutionError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let statement = client.prepare(sql).await.map_err(query_error)?;
        check_param_count(statement.params().len(), params.len())?;

        let bound = statement
            .params()
            .iter()
            .zip(params)
            .enumerate()
            .map(|(i, (ty, param))| bind_param(i + 1, param, ty))
            .collect::<Result<Vec<_>, _>>()?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = client
            .query(&statement, &param_refs)
            .await
            .map_err(query_error)?;
        debug!("{} returned {} rows", BACKEND_NAME, rows.len());

        rows.iter().map(row_to_json).collect()
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}

fn connection_error(message: String) -> ExecutionError {
    ExecutionError::Connection {
        backend: BACKEND_NAME,
        message,
    }
}

fn query_error(e: tokio_postgres::Error) -> ExecutionError {
    ExecutionError::Query {
        message: e
            .as_db_error()
            .map(|db| db.message().to_string())
            .unwrap_or_else(|| e.to_string()),
        code: e.code().map(|state| state.code().to_string()),
    }
}

fn check_param_count(expected: usize, actual: usize) -> Result<(), ExecutionError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ExecutionError::ParameterCount { expected, actual })
    }
}

fn boxed<T: ToSql + Sync + Send + 'static>(value: T) -> BoxedParam {
    Box::new(value)
}

/// Converts a parameter to the Rust type matching the placeholder's inferred
/// PostgreSQL type. `index` is the 1-based placeholder number.
fn bind_param(index: usize, param: &SqlParam, ty: &Type) -> Result<BoxedParam, ExecutionError> {
    let bound = match param {
        SqlParam::Integer(i) => match *ty {
            Type::INT2 => i16::try_from(*i).ok().map(boxed),
            Type::INT4 => i32::try_from(*i).ok().map(boxed),
            Type::INT8 => Some(boxed(*i)),
            Type::NUMERIC => Some(boxed(Decimal::from(*i))),
            Type::FLOAT4 => Some(boxed(*i as f32)),
            Type::FLOAT8 => Some(boxed(*i as f64)),
            Type::TEXT | Type::VARCHAR => Some(boxed(i.to_string())),
            _ => None,
        },
        SqlParam::Decimal(d) => match *ty {
            Type::NUMERIC => Some(boxed(*d)),
            Type::FLOAT4 => d.to_f32().map(boxed),
            Type::FLOAT8 => d.to_f64().map(boxed),
            Type::INT2 if d.fract().is_zero() => d.to_i16().map(boxed),
            Type::INT4 if d.fract().is_zero() => d.to_i32().map(boxed),
            Type::INT8 if d.fract().is_zero() => d.to_i64().map(boxed),
            Type::TEXT | Type::VARCHAR => Some(boxed(d.to_string())),
            _ => None,
        },
        SqlParam::Text(s) => match *ty {
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Some(boxed(s.clone()))
            }
            _ => None,
        },
    };

    bound.ok_or_else(|| ExecutionError::Bind {
        index,
        expected: ty.name().to_string(),
    })
}

fn row_to_json(row: &tokio_postgres::Row) -> Result<Row, ExecutionError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_()).map_err(|e| match e {
            ColumnError::Unsupported => ExecutionError::UnsupportedColumn {
                column: column.name().to_string(),
                type_name: column.type_().name().to_string(),
            },
            ColumnError::Decode(e) => query_error(e),
        })?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

enum ColumnError {
    Unsupported,
    Decode(tokio_postgres::Error),
}

impl From<tokio_postgres::Error> for ColumnError {
    fn from(e: tokio_postgres::Error) -> Self {
        ColumnError::Decode(e)
    }
}

fn column_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<Value, ColumnError> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::from),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::from),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .and_then(|f| float_value(f.into())),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)?
            .and_then(float_value),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)?
            .and_then(|d| d.to_f64())
            .and_then(float_value),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::from)
        }
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?,
        Type::DATE => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)?
            .map(|d| Value::from(d.to_string())),
        Type::TIMESTAMP => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)?
            .map(|t| Value::from(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
            .map(|t| Value::from(t.to_rfc3339())),
        _ => return Err(ColumnError::Unsupported),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn float_value(f: f64) -> Option<Value> {
    serde_json::Number::from_f64(f).map(Value::Number)
}
