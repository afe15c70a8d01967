use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(pub birthday_format, Date, "[year]-[month]-[day]");

/// Contact record in the database. Always owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: Uuid,
    // Filled by FromRow; ownership is enforced in the queries.
    #[allow(dead_code)]
    #[serde(skip_serializing)]
    pub owner_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(with = "birthday_format::option")]
    pub birthday: Option<Date>,
    pub additional_data: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
