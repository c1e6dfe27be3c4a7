use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::PrincipalId;
use crate::entities::{auth_sessions, prelude::*, principals};
use crate::models::{Credential, Principal};

impl From<principals::Model> for Principal {
    fn from(model: principals::Model) -> Self {
        Self {
            id: PrincipalId::from(model.id),
            email: model.email,
        }
    }
}

pub struct PrincipalRepository {
    conn: DatabaseConnection,
}

impl PrincipalRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a principal with an already hashed password. Fails with a
    /// unique violation if the email is taken.
    pub async fn create(&self, email: &str, password_hash: String) -> Result<Principal> {
        let id = PrincipalId::generate();
        let now = Utc::now().to_rfc3339();

        Principals::insert(principals::ActiveModel {
            id: Set(id.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert principal")?;

        Ok(Principal {
            id,
            email: email.to_string(),
        })
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Principal>> {
        let row = Principals::find()
            .filter(principals::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query principal by email")?;

        Ok(row.map(Principal::from))
    }

    /// Returns the principal if the password matches.
    /// Argon2 runs on the blocking pool.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<Option<Principal>> {
        let row = Principals::find()
            .filter(principals::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query principal for password verification")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let password_hash = row.password_hash.clone();
        let password = password.to_string();
        let is_valid = task::spawn_blocking(move || verify_hash(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        Ok(is_valid.then(|| Principal::from(row)))
    }

    pub async fn update_password(
        &self,
        id: &PrincipalId,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let result = Principals::update_many()
            .col_expr(
                principals::Column::PasswordHash,
                sea_orm::sea_query::Expr::value(new_hash),
            )
            .col_expr(
                principals::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now().to_rfc3339()),
            )
            .filter(principals::Column::Id.eq(id.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update password")?;

        if result.rows_affected == 0 {
            anyhow::bail!("Principal not found: {id}");
        }
        Ok(())
    }

    pub async fn create_session(
        &self,
        principal: &Principal,
        ttl: chrono::Duration,
    ) -> Result<Credential> {
        let issued_at = Utc::now();
        let expires_at = issued_at + ttl;
        let token = generate_token();

        AuthSessions::insert(auth_sessions::ActiveModel {
            token: Set(token.clone()),
            principal_id: Set(principal.id.to_string()),
            issued_at: Set(issued_at.to_rfc3339()),
            expires_at: Set(expires_at.to_rfc3339()),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert auth session")?;

        Ok(Credential {
            principal: principal.clone(),
            token,
            issued_at,
            expires_at,
        })
    }

    /// Looks up a session token. Expired rows are returned as well; the
    /// caller decides what to do with them.
    pub async fn find_session(&self, token: &str) -> Result<Option<Credential>> {
        let row = AuthSessions::find_by_id(token)
            .find_also_related(Principals)
            .one(&self.conn)
            .await
            .context("Failed to query auth session")?;

        let Some((session, Some(principal))) = row else {
            return Ok(None);
        };

        Ok(Some(Credential {
            principal: Principal::from(principal),
            token: session.token,
            issued_at: parse_timestamp(&session.issued_at)?,
            expires_at: parse_timestamp(&session.expires_at)?,
        }))
    }

    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let result = AuthSessions::delete_by_id(token)
            .exec(&self.conn)
            .await
            .context("Failed to delete auth session")?;

        Ok(result.rows_affected > 0)
    }

    /// Invalidates every credential of a principal. Takes any connection so
    /// account removal can run it inside its own transaction.
    pub async fn delete_sessions_for<C: ConnectionTrait>(
        conn: &C,
        id: &PrincipalId,
    ) -> Result<u64> {
        let result = AuthSessions::delete_many()
            .filter(auth_sessions::Column::PrincipalId.eq(id.as_str()))
            .exec(conn)
            .await
            .context("Failed to delete auth sessions")?;

        Ok(result.rows_affected)
    }

    pub async fn delete_principal<C: ConnectionTrait>(conn: &C, id: &PrincipalId) -> Result<bool> {
        let result = Principals::delete_by_id(id.as_str())
            .exec(conn)
            .await
            .context("Failed to delete principal")?;

        Ok(result.rows_affected > 0)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp: {value}"))
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Params are read back from the PHC string, so hashes made with older
/// settings still verify.
pub fn verify_hash(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a random bearer token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Reading123", Some(&fast_params())).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_hash("Reading123", &hash).unwrap());
        assert!(!verify_hash("reading123", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_hash("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
