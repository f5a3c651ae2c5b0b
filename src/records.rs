//! Fixed single-statement lookups and inserts for users, reservations and
//! listings.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewProperty, NewUser, Property, Reservation, User};
use crate::search::builder::minor_units;
use crate::search::{ResultLimit, SqlParam};
use crate::store::{Row, Store};

const USER_BY_EMAIL: &str = "SELECT id, name, email, password
FROM users
WHERE email = $1";

const USER_BY_ID: &str = "SELECT id, name, email, password
FROM users
WHERE id = $1";

const INSERT_USER: &str = "INSERT INTO users (name, email, password)
VALUES ($1, $2, $3)
RETURNING id";

const RESERVATIONS_BY_GUEST: &str = "SELECT *
FROM reservations
WHERE guest_id = $1
ORDER BY start_date
LIMIT $2";

const INSERT_PROPERTY: &str = "INSERT INTO properties (
  owner_id, title, description, thumbnail_photo_url, cover_photo_url,
  cost_per_night, parking_spaces, number_of_bathrooms, number_of_bedrooms,
  country, street, city, province, post_code)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
RETURNING *";

pub(crate) fn decode_row<T: DeserializeOwned>(row: Row, entity: &'static str) -> StoreResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|source| StoreError::Decode { entity, source })
}

pub(crate) fn decode_rows<T: DeserializeOwned>(
    rows: Vec<Row>,
    entity: &'static str,
) -> StoreResult<Vec<T>> {
    rows.into_iter().map(|row| decode_row(row, entity)).collect()
}

async fn first_user<S>(store: &S, sql: &str, key: SqlParam) -> StoreResult<Option<User>>
where
    S: Store + ?Sized,
{
    let rows = store.execute(sql, &[key]).await?;
    rows.into_iter()
        .next()
        .map(|row| decode_row(row, "user"))
        .transpose()
}

pub async fn get_user_with_email<S>(store: &S, email: &str) -> StoreResult<Option<User>>
where
    S: Store + ?Sized,
{
    first_user(store, USER_BY_EMAIL, email.into()).await
}

pub async fn get_user_with_id<S>(store: &S, id: i32) -> StoreResult<Option<User>>
where
    S: Store + ?Sized,
{
    first_user(store, USER_BY_ID, id.into()).await
}

/// Inserts a user and returns the generated id
pub async fn add_user<S>(store: &S, user: &NewUser) -> StoreResult<i32>
where
    S: Store + ?Sized,
{
    let params = [
        SqlParam::from(user.name.as_str()),
        SqlParam::from(user.email.as_str()),
        SqlParam::from(user.password.as_str()),
    ];
    let row = store
        .execute(INSERT_USER, &params)
        .await?
        .into_iter()
        .next()
        .ok_or(StoreError::NoRowReturned { table: "users" })?;

    #[derive(serde::Deserialize)]
    struct Inserted {
        id: i32,
    }
    let Inserted { id } = decode_row(row, "user")?;
    info!("Created user {}", id);
    Ok(id)
}

pub async fn get_all_reservations<S>(
    store: &S,
    guest_id: i32,
    limit: ResultLimit,
) -> StoreResult<Vec<Reservation>>
where
    S: Store + ?Sized,
{
    let params = [SqlParam::from(guest_id), SqlParam::Integer(limit.get().into())];
    let rows = store.execute(RESERVATIONS_BY_GUEST, &params).await?;
    debug!("Guest {} has {} reservations", guest_id, rows.len());
    decode_rows(rows, "reservation")
}

/// Inserts a listing; the nightly price is converted to minor units here
pub async fn add_property<S>(store: &S, property: &NewProperty) -> StoreResult<Property>
where
    S: Store + ?Sized,
{
    let params = [
        SqlParam::from(property.owner_id),
        SqlParam::from(property.title.as_str()),
        SqlParam::from(property.description.as_str()),
        SqlParam::from(property.thumbnail_photo_url.as_str()),
        SqlParam::from(property.cover_photo_url.as_str()),
        minor_units(property.cost_per_night),
        SqlParam::from(property.parking_spaces),
        SqlParam::from(property.number_of_bathrooms),
        SqlParam::from(property.number_of_bedrooms),
        SqlParam::from(property.country.as_str()),
        SqlParam::from(property.street.as_str()),
        SqlParam::from(property.city.as_str()),
        SqlParam::from(property.province.as_str()),
        SqlParam::from(property.post_code.as_str()),
    ];
    let row = store
        .execute(INSERT_PROPERTY, &params)
        .await?
        .into_iter()
        .next()
        .ok_or(StoreError::NoRowReturned {
            table: "properties",
        })?;

    let created: Property = decode_row(row, "property")?;
    info!("Created property {} for owner {}", created.id, property.owner_id);
    Ok(created)
}
