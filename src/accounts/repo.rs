use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Base identity and credential record.
///
/// Auxiliary attributes live on [`AccountProfile`], joined by `account_id`;
/// the two records together make up one account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Fields required to create a new account row.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

impl Account {
    /// First and last name joined by a single space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// The short display name is just the first name.
    pub fn short_name(&self) -> &str {
        &self.first_name
    }

    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewAccount<'_>,
    ) -> anyhow::Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, first_name, last_name, password_hash, created_at
            "#,
        )
        .bind(new.username)
        .bind(new.email)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.password_hash)
        .fetch_one(&mut **tx)
        .await?;
        Ok(account)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, first_name, last_name, password_hash, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, first_name, last_name, password_hash, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }
}

/// Auxiliary profile attributes for an account.
///
/// `created_at` is set once on insert; `updated_at` is refreshed on every
/// write, so it is strictly later than `created_at` after any edit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountProfile {
    pub account_id: Uuid,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<Date>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Partial profile update; `None` fields keep their current value.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub phone_number: Option<String>,
    pub date_of_birth: Option<Date>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
}

impl AccountProfile {
    /// Insert the empty profile row that accompanies a fresh account.
    pub async fn create_empty(
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
    ) -> anyhow::Result<AccountProfile> {
        let profile = sqlx::query_as::<_, AccountProfile>(
            r#"
            INSERT INTO account_profiles (account_id)
            VALUES ($1)
            RETURNING account_id, phone_number, date_of_birth, profile_picture, bio,
                      is_verified, created_at, updated_at
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(profile)
    }

    pub async fn find_by_account(
        db: &PgPool,
        account_id: Uuid,
    ) -> anyhow::Result<Option<AccountProfile>> {
        let profile = sqlx::query_as::<_, AccountProfile>(
            r#"
            SELECT account_id, phone_number, date_of_birth, profile_picture, bio,
                   is_verified, created_at, updated_at
            FROM account_profiles
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Apply a partial edit. `updated_at` is refreshed on every write so the
    /// timestamp stays monotonically non-decreasing.
    pub async fn update(
        db: &PgPool,
        account_id: Uuid,
        changes: &ProfileChanges,
    ) -> anyhow::Result<Option<AccountProfile>> {
        let profile = sqlx::query_as::<_, AccountProfile>(
            r#"
            UPDATE account_profiles
            SET phone_number    = COALESCE($2, phone_number),
                date_of_birth   = COALESCE($3, date_of_birth),
                profile_picture = COALESCE($4, profile_picture),
                bio             = COALESCE($5, bio),
                updated_at      = now()
            WHERE account_id = $1
            RETURNING account_id, phone_number, date_of_birth, profile_picture, bio,
                      is_verified, created_at, updated_at
            "#,
        )
        .bind(account_id)
        .bind(changes.phone_number.as_deref())
        .bind(changes.date_of_birth)
        .bind(changes.profile_picture.as_deref())
        .bind(changes.bio.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod name_tests {
    use super::*;

    fn account(first: &str, last: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            first_name: first.into(),
            last_name: last.into(),
            password_hash: "hash".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn full_name_joins_first_and_last_with_one_space() {
        let a = account("Ada", "Lovelace");
        assert_eq!(a.full_name(), "Ada Lovelace");
    }

    #[test]
    fn full_name_trims_when_last_name_is_empty() {
        let a = account("Ada", "");
        assert_eq!(a.full_name(), "Ada");
    }

    #[test]
    fn full_name_trims_when_first_name_is_empty() {
        let a = account("", "Lovelace");
        assert_eq!(a.full_name(), "Lovelace");
    }

    #[test]
    fn short_name_is_the_first_name_unchanged() {
        let a = account("Ada", "Lovelace");
        assert_eq!(a.short_name(), "Ada");
    }
}
