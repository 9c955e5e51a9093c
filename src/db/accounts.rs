//! Account repository.
//!
//! Accounts own nicknames and roles; roles own permissions. A nick's
//! effective permission set is everything reachable through its account's
//! roles.

use super::DbError;
use crate::auth::Permission;
use crate::proto::irc_to_lower;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

/// An application account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub created_at: i64,
}

/// A named group of permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// Repository for account, role, and permission operations.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

/// Map a UNIQUE violation to a domain error, anything else to `DbError::Sqlx`.
fn unique_or(e: sqlx::Error, on_unique: impl FnOnce() -> DbError) -> DbError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return on_unique();
    }
    DbError::from(e)
}

impl<'a> AccountRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Account linked to `nick`, if any. Nicks compare under RFC 1459 case mapping.
    pub async fn find_linked_account(&self, nick: &str) -> Result<Option<Account>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            r#"
            SELECT a.id, a.username, a.created_at
            FROM nicknames n
            JOIN accounts a ON a.id = n.account_id
            WHERE n.nickname_key = ?
            "#,
        )
        .bind(irc_to_lower(nick))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, username, created_at)| Account {
            id,
            username,
            created_at,
        }))
    }

    /// Every permission reachable from `account` through its roles, deduplicated.
    pub async fn effective_permissions(
        &self,
        account: &Account,
    ) -> Result<BTreeSet<Permission>, DbError> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.name
            FROM account_roles ar
            JOIN role_permissions rp ON rp.role_id = ar.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE ar.account_id = ?
            "#,
        )
        .bind(account.id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Permission::new).collect())
    }

    /// Find account by username.
    pub async fn find_account(&self, username: &str) -> Result<Option<Account>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            r#"
            SELECT id, username, created_at
            FROM accounts
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, username, created_at)| Account {
            id,
            username,
            created_at,
        }))
    }

    pub async fn create_account(&self, username: &str) -> Result<Account, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("INSERT INTO accounts (username, created_at) VALUES (?, ?)")
            .bind(username)
            .bind(now)
            .execute(self.pool)
            .await
            .map_err(|e| unique_or(e, || DbError::AccountExists(username.to_string())))?;

        Ok(Account {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            created_at: now,
        })
    }

    /// Link `nick` to an account. A nick links to at most one account.
    pub async fn link_nickname(&self, account_id: i64, nick: &str) -> Result<(), DbError> {
        sqlx::query("INSERT INTO nicknames (nickname, nickname_key, account_id) VALUES (?, ?, ?)")
            .bind(nick)
            .bind(irc_to_lower(nick))
            .bind(account_id)
            .execute(self.pool)
            .await
            .map_err(|e| unique_or(e, || DbError::NicknameLinked(nick.to_string())))?;
        Ok(())
    }

    /// Remove a nick link. Returns whether one existed.
    pub async fn unlink_nickname(&self, nick: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM nicknames WHERE nickname_key = ?")
            .bind(irc_to_lower(nick))
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Nicknames linked to an account, in the case they were linked with.
    pub async fn nicknames(&self, account_id: i64) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT nickname FROM nicknames WHERE account_id = ? ORDER BY nickname",
        )
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_role(&self, name: &str) -> Result<Role, DbError> {
        let result = sqlx::query("INSERT INTO roles (name) VALUES (?)")
            .bind(name)
            .execute(self.pool)
            .await
            .map_err(|e| unique_or(e, || DbError::RoleExists(name.to_string())))?;

        Ok(Role {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub async fn find_role(&self, name: &str) -> Result<Option<Role>, DbError> {
        let row = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(id, name)| Role { id, name }))
    }

    /// Grant `permission` to a role, creating the permission on first use.
    ///
    /// Granting twice is a no-op.
    pub async fn grant_permission(&self, role_id: i64, permission: &str) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO permissions (name) VALUES (?)")
            .bind(permission)
            .execute(&mut *tx)
            .await?;

        let permission_id =
            sqlx::query_scalar::<_, i64>("SELECT id FROM permissions WHERE name = ?")
                .bind(permission)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Give an account a role. Assigning twice is a no-op.
    pub async fn assign_role(&self, account_id: i64, role_id: i64) -> Result<(), DbError> {
        sqlx::query("INSERT OR IGNORE INTO account_roles (account_id, role_id) VALUES (?, ?)")
            .bind(account_id)
            .bind(role_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Take a role away from an account. Returns whether it was held.
    pub async fn revoke_role(&self, account_id: i64, role_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM account_roles WHERE account_id = ? AND role_id = ?")
            .bind(account_id)
            .bind(role_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::Permission;
    use crate::db::{Database, DbError};
    use std::collections::BTreeSet;

    fn perms(names: &[&str]) -> BTreeSet<Permission> {
        names.iter().map(|n| Permission::new(*n)).collect()
    }

    #[tokio::test]
    async fn linked_account_lookup_uses_case_mapping() {
        let db = Database::new(":memory:").await.unwrap();
        let accounts = db.accounts();
        let account = accounts.create_account("alice").await.unwrap();
        accounts.link_nickname(account.id, "Alice[away]").await.unwrap();

        let found = accounts.find_linked_account("alice{AWAY}").await.unwrap();
        assert_eq!(found, Some(account));
        assert_eq!(accounts.find_linked_account("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn nick_links_to_one_account() {
        let db = Database::new(":memory:").await.unwrap();
        let accounts = db.accounts();
        let a = accounts.create_account("a").await.unwrap();
        let b = accounts.create_account("b").await.unwrap();
        accounts.link_nickname(a.id, "shared").await.unwrap();

        let err = accounts.link_nickname(b.id, "SHARED").await.unwrap_err();
        assert!(matches!(err, DbError::NicknameLinked(_)));
    }

    #[tokio::test]
    async fn duplicate_account_is_reported() {
        let db = Database::new(":memory:").await.unwrap();
        db.accounts().create_account("alice").await.unwrap();
        let err = db.accounts().create_account("ALICE").await.unwrap_err();
        assert!(matches!(err, DbError::AccountExists(_)));
    }

    #[tokio::test]
    async fn unlink_removes_binding() {
        let db = Database::new(":memory:").await.unwrap();
        let accounts = db.accounts();
        let account = accounts.create_account("alice").await.unwrap();
        accounts.link_nickname(account.id, "alice").await.unwrap();
        accounts.link_nickname(account.id, "alice_").await.unwrap();

        assert_eq!(accounts.nicknames(account.id).await.unwrap(), vec!["alice", "alice_"]);
        assert!(accounts.unlink_nickname("ALICE").await.unwrap());
        assert!(!accounts.unlink_nickname("alice").await.unwrap());
        assert_eq!(accounts.find_linked_account("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn permissions_are_union_of_roles_without_duplicates() {
        let db = Database::new(":memory:").await.unwrap();
        let accounts = db.accounts();
        let account = accounts.create_account("alice").await.unwrap();

        let ops = accounts.create_role("ops").await.unwrap();
        let voice = accounts.create_role("voice").await.unwrap();
        accounts.grant_permission(ops.id, "say").await.unwrap();
        accounts.grant_permission(ops.id, "kick").await.unwrap();
        accounts.grant_permission(voice.id, "say").await.unwrap();
        accounts.grant_permission(voice.id, "say").await.unwrap();
        accounts.assign_role(account.id, ops.id).await.unwrap();
        accounts.assign_role(account.id, voice.id).await.unwrap();
        accounts.assign_role(account.id, voice.id).await.unwrap();

        let effective = accounts.effective_permissions(&account).await.unwrap();
        assert_eq!(effective, perms(&["kick", "say"]));
    }

    #[tokio::test]
    async fn account_without_roles_has_no_permissions() {
        let db = Database::new(":memory:").await.unwrap();
        let account = db.accounts().create_account("nobody").await.unwrap();
        assert!(
            db.accounts()
                .effective_permissions(&account)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn revoking_a_role_drops_its_permissions() {
        let db = Database::new(":memory:").await.unwrap();
        let accounts = db.accounts();
        let account = accounts.create_account("alice").await.unwrap();
        let ops = accounts.create_role("ops").await.unwrap();
        accounts.grant_permission(ops.id, "say").await.unwrap();
        accounts.assign_role(account.id, ops.id).await.unwrap();

        assert!(accounts.revoke_role(account.id, ops.id).await.unwrap());
        assert!(accounts.effective_permissions(&account).await.unwrap().is_empty());
        assert_eq!(accounts.find_role("ops").await.unwrap(), Some(ops));
    }
}
