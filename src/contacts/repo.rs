use anyhow::Context;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::{
    birthdays,
    dto::{ContactUpdate, NewContact},
    repo_types::Contact,
};

const CONTACT_COLUMNS: &str = "id, owner_id, first_name, last_name, email, phone_number, \
                               birthday, additional_data, created_at";

/// Escapes LIKE wildcards and wraps the query for a substring match.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

// Every query below is scoped by owner_id; a foreign contact looks exactly like a missing one.
impl Contact {
    pub async fn create(db: &PgPool, owner_id: Uuid, new: &NewContact) -> anyhow::Result<Contact> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            "INSERT INTO contacts \
                (owner_id, first_name, last_name, email, phone_number, birthday, additional_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .bind(new.email.trim())
        .bind(new.phone_number.trim())
        .bind(new.birthday)
        .bind(new.additional_data.as_deref())
        .fetch_one(db)
        .await
        .context("insert contact")?;
        Ok(contact)
    }

    pub async fn list_by_owner(
        db: &PgPool,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts \
             WHERE owner_id = $1 \
             ORDER BY created_at, id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list contacts")?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>> {
        let row = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
        .context("get contact")?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        owner_id: Uuid,
        id: Uuid,
        patch: &ContactUpdate,
    ) -> anyhow::Result<Option<Contact>> {
        let row = sqlx::query_as::<_, Contact>(&format!(
            "UPDATE contacts SET \
                first_name = COALESCE($3, first_name), \
                last_name = COALESCE($4, last_name), \
                email = COALESCE($5, email), \
                phone_number = COALESCE($6, phone_number), \
                birthday = COALESCE($7, birthday), \
                additional_data = COALESCE($8, additional_data) \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(patch.first_name.as_deref().map(str::trim))
        .bind(patch.last_name.as_deref().map(str::trim))
        .bind(patch.email.as_deref().map(str::trim))
        .bind(patch.phone_number.as_deref().map(str::trim))
        .bind(patch.birthday)
        .bind(patch.additional_data.as_deref())
        .fetch_optional(db)
        .await
        .context("update contact")?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>> {
        let row = sqlx::query_as::<_, Contact>(&format!(
            "DELETE FROM contacts WHERE id = $1 AND owner_id = $2 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
        .context("delete contact")?;
        Ok(row)
    }

    pub async fn search(db: &PgPool, owner_id: Uuid, query: &str) -> anyhow::Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(&format!(
            r"SELECT {CONTACT_COLUMNS} FROM contacts
              WHERE owner_id = $1
                AND (first_name ILIKE $2 ESCAPE '\'
                     OR last_name ILIKE $2 ESCAPE '\'
                     OR email ILIKE $2 ESCAPE '\')
              ORDER BY first_name, last_name, id"
        ))
        .bind(owner_id)
        .bind(like_pattern(query))
        .fetch_all(db)
        .await
        .context("search contacts")?;
        Ok(rows)
    }

    pub async fn upcoming_birthdays(
        db: &PgPool,
        owner_id: Uuid,
        today: Date,
        window_days: i64,
    ) -> anyhow::Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts \
             WHERE owner_id = $1 AND birthday IS NOT NULL"
        ))
        .bind(owner_id)
        .fetch_all(db)
        .await
        .context("list contacts with birthdays")?;
        Ok(birthdays::upcoming(rows, today, window_days))
    }
}
