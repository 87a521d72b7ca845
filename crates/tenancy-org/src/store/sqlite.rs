//! SQLite store backend
//!
//! IDs are stored as hyphenated UUID text and timestamps as fixed-width
//! RFC 3339 UTC strings (microseconds, `Z` suffix), so string comparison
//! orders them chronologically.
//!
//! Multi-row writes run in a transaction that rolls back when dropped. The
//! owner floor is enforced by conditional statements whose `WHERE` clause
//! counts owners, so the check and the write are one statement.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tenancy_auth::{AuthError, AuthResult, IdentityProvider, User};
use tenancy_rbac::Role;
use tracing::info;
use uuid::Uuid;

use super::{InvitationStore, MembershipStore};
use crate::error::{StoreError, StoreResult};
use crate::invitation::{Invitation, InvitationStatus, InvitationWithDetails, NewInvitation};
use crate::membership::{Member, MemberWithUser};
use crate::organization::{Organization, OrganizationWithRole};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        name TEXT NOT NULL,
        picture TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS organizations (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS organization_members (
        id TEXT PRIMARY KEY NOT NULL,
        organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('owner', 'admin', 'member')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (organization_id, user_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_organization_members_user ON organization_members(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS organization_invitations (
        id TEXT PRIMARY KEY NOT NULL,
        organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        email TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('admin', 'member')),
        token TEXT NOT NULL UNIQUE,
        invited_by TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'declined', 'expired')),
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_organization_invitations_pending
        ON organization_invitations(organization_id, email)
        WHERE status = 'pending'
    "#,
    "CREATE INDEX IF NOT EXISTS idx_organization_invitations_email ON organization_invitations(email, status)",
];

const INVITATION_DETAILS_SELECT: &str = r#"
    SELECT i.id, i.organization_id, i.email, i.role, i.token, i.invited_by, i.status,
           i.expires_at, i.created_at, i.updated_at,
           o.name AS organization_name,
           COALESCE(u.name, '') AS invited_by_name
    FROM organization_invitations i
    JOIN organizations o ON o.id = i.organization_id
    LEFT JOIN users u ON u.id = i.invited_by
"#;

/// SQLite implementation of the membership, invitation and identity stores.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl SqliteStore {
    /// Wrap an existing pool. Call [`SqliteStore::migrate`] before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url` (e.g. `sqlite://tenancy.db`), creating the
    /// file if needed, and apply the schema.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        info!(url, "Connecting to database");

        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(backend)?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }
}

// =========================================================================
// Column codecs
// =========================================================================

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn uuid_col(row: &SqliteRow, col: &str) -> StoreResult<Uuid> {
    let raw: String = row.try_get(col).map_err(backend)?;
    Uuid::parse_str(&raw).map_err(|e| StoreError::Backend(format!("{col}: {e}")))
}

fn time_col(row: &SqliteRow, col: &str) -> StoreResult<DateTime<Utc>> {
    let raw: String = row.try_get(col).map_err(backend)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("{col}: {e}")))
}

fn role_col(row: &SqliteRow, col: &str) -> StoreResult<Role> {
    let raw: String = row.try_get(col).map_err(backend)?;
    Role::parse(&raw).ok_or_else(|| StoreError::Backend(format!("{col}: invalid role {raw}")))
}

fn string_col(row: &SqliteRow, col: &str) -> StoreResult<String> {
    row.try_get(col).map_err(backend)
}

fn user_from_row(row: &SqliteRow) -> StoreResult<User> {
    Ok(User {
        id: uuid_col(row, "id")?,
        email: string_col(row, "email")?,
        name: string_col(row, "name")?,
        picture: row.try_get("picture").map_err(backend)?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

fn organization_from_row(row: &SqliteRow) -> StoreResult<Organization> {
    Ok(Organization {
        id: uuid_col(row, "id")?,
        name: string_col(row, "name")?,
        slug: string_col(row, "slug")?,
        created_by: uuid_col(row, "created_by")?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

fn member_from_row(row: &SqliteRow) -> StoreResult<Member> {
    Ok(Member {
        id: uuid_col(row, "id")?,
        organization_id: uuid_col(row, "organization_id")?,
        user_id: uuid_col(row, "user_id")?,
        role: role_col(row, "role")?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

fn invitation_from_row(row: &SqliteRow) -> StoreResult<Invitation> {
    let status: String = string_col(row, "status")?;
    Ok(Invitation {
        id: uuid_col(row, "id")?,
        organization_id: uuid_col(row, "organization_id")?,
        email: string_col(row, "email")?,
        role: role_col(row, "role")?,
        token: string_col(row, "token")?,
        invited_by: uuid_col(row, "invited_by")?,
        status: InvitationStatus::parse(&status)
            .ok_or_else(|| StoreError::Backend(format!("status: invalid value {status}")))?,
        expires_at: time_col(row, "expires_at")?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

fn details_from_row(row: &SqliteRow) -> StoreResult<InvitationWithDetails> {
    Ok(InvitationWithDetails {
        invitation: invitation_from_row(row)?,
        organization_name: string_col(row, "organization_name")?,
        invited_by_name: string_col(row, "invited_by_name")?,
    })
}

async fn fetch_member(conn: &mut SqliteConnection, org_id: Uuid, user_id: Uuid) -> StoreResult<Member> {
    let row = sqlx::query(
        r#"
        SELECT id, organization_id, user_id, role, created_at, updated_at
        FROM organization_members WHERE organization_id = ? AND user_id = ?
        "#,
    )
    .bind(org_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(conn)
    .await
    .map_err(backend)?;

    row.as_ref()
        .map(member_from_row)
        .transpose()?
        .ok_or(StoreError::MemberNotFound)
}

async fn fetch_invitation(conn: &mut SqliteConnection, invitation_id: Uuid) -> StoreResult<Invitation> {
    let row = sqlx::query(
        r#"
        SELECT id, organization_id, email, role, token, invited_by, status,
               expires_at, created_at, updated_at
        FROM organization_invitations WHERE id = ?
        "#,
    )
    .bind(invitation_id.to_string())
    .fetch_optional(conn)
    .await
    .map_err(backend)?;

    row.as_ref()
        .map(invitation_from_row)
        .transpose()?
        .ok_or(StoreError::InvitationNotFound)
}

// =========================================================================
// Identity
// =========================================================================

#[async_trait]
impl IdentityProvider for SqliteStore {
    async fn get_user(&self, id: Uuid) -> AuthResult<User> {
        let row = sqlx::query(
            "SELECT id, email, name, picture, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

        user_from_row(&row).map_err(|e| AuthError::Backend(e.to_string()))
    }

    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        let row = sqlx::query(
            "SELECT id, email, name, picture, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

        user_from_row(&row).map_err(|e| AuthError::Backend(e.to_string()))
    }

    async fn upsert_user(&self, user: User) -> AuthResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, picture, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                name = excluded.name,
                picture = excluded.picture,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.picture)
        .bind(ts(user.created_at))
        .bind(ts(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?;

        self.get_user_by_email(&user.email).await
    }
}

// =========================================================================
// Organizations and members
// =========================================================================

#[async_trait]
impl MembershipStore for SqliteStore {
    async fn create_organization(&self, org: &Organization) -> StoreResult<Member> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, slug, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(org.id.to_string())
        .bind(&org.name)
        .bind(&org.slug)
        .bind(org.created_by.to_string())
        .bind(ts(org.created_at))
        .bind(ts(org.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::SlugExists
            } else {
                backend(e)
            }
        })?;

        let owner = Member::new(org.id, org.created_by, Role::Owner);
        sqlx::query(
            r#"
            INSERT INTO organization_members (id, organization_id, user_id, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner.id.to_string())
        .bind(owner.organization_id.to_string())
        .bind(owner.user_id.to_string())
        .bind(owner.role.as_str())
        .bind(ts(owner.created_at))
        .bind(ts(owner.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(owner)
    }

    async fn get_organization(&self, org_id: Uuid) -> StoreResult<Organization> {
        let row = sqlx::query(
            "SELECT id, name, slug, created_by, created_at, updated_at FROM organizations WHERE id = ?",
        )
        .bind(org_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::OrganizationNotFound)?;

        organization_from_row(&row)
    }

    async fn get_organization_by_slug(&self, slug: &str) -> StoreResult<Organization> {
        let row = sqlx::query(
            "SELECT id, name, slug, created_by, created_at, updated_at FROM organizations WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::OrganizationNotFound)?;

        organization_from_row(&row)
    }

    async fn update_organization_name(
        &self,
        org_id: Uuid,
        name: &str,
    ) -> StoreResult<Organization> {
        let result = sqlx::query("UPDATE organizations SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(ts(Utc::now()))
            .bind(org_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrganizationNotFound);
        }
        self.get_organization(org_id).await
    }

    async fn delete_organization(&self, org_id: Uuid) -> StoreResult<()> {
        let id = org_id.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM organization_invitations WHERE organization_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM organization_members WHERE organization_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrganizationNotFound);
        }
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn list_user_organizations(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationWithRole>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.name, o.slug, o.created_by, o.created_at, o.updated_at, m.role
            FROM organizations o
            JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = ?
            ORDER BY o.name
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| -> StoreResult<OrganizationWithRole> {
                Ok(organization_from_row(row)?.with_role(role_col(row, "role")?))
            })
            .collect()
    }

    async fn add_member(&self, member: &Member) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organization_members (id, organization_id, user_id, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(member.id.to_string())
        .bind(member.organization_id.to_string())
        .bind(member.user_id.to_string())
        .bind(member.role.as_str())
        .bind(ts(member.created_at))
        .bind(ts(member.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyMember
            } else if is_foreign_key_violation(&e) {
                StoreError::OrganizationNotFound
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn get_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Member> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        fetch_member(&mut conn, org_id, user_id).await
    }

    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<MemberWithUser>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.organization_id, m.user_id, m.role, m.created_at, m.updated_at,
                   u.email, u.name, u.picture
            FROM organization_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = ?
            ORDER BY
                CASE m.role WHEN 'owner' THEN 1 WHEN 'admin' THEN 2 ELSE 3 END,
                u.name
            "#,
        )
        .bind(org_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| -> StoreResult<MemberWithUser> {
                Ok(MemberWithUser {
                    id: uuid_col(row, "id")?,
                    organization_id: uuid_col(row, "organization_id")?,
                    user_id: uuid_col(row, "user_id")?,
                    role: role_col(row, "role")?,
                    email: string_col(row, "email")?,
                    name: string_col(row, "name")?,
                    picture: row.try_get("picture").map_err(backend)?,
                    created_at: time_col(row, "created_at")?,
                    updated_at: time_col(row, "updated_at")?,
                })
            })
            .collect()
    }

    async fn update_member_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> StoreResult<Member> {
        let org = org_id.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let result = sqlx::query(
            r#"
            UPDATE organization_members
            SET role = ?, updated_at = ?
            WHERE organization_id = ? AND user_id = ?
              AND (
                role != 'owner'
                OR ? = 'owner'
                OR (SELECT COUNT(*) FROM organization_members
                    WHERE organization_id = ? AND role = 'owner') > 1
              )
            "#,
        )
        .bind(role.as_str())
        .bind(ts(Utc::now()))
        .bind(&org)
        .bind(user_id.to_string())
        .bind(role.as_str())
        .bind(&org)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            // Either the row is gone or the guard refused the demotion.
            fetch_member(&mut *tx, org_id, user_id).await?;
            return Err(StoreError::LastOwner);
        }

        let member = fetch_member(&mut *tx, org_id, user_id).await?;
        tx.commit().await.map_err(backend)?;
        Ok(member)
    }

    async fn remove_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let org = org_id.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let result = sqlx::query(
            r#"
            DELETE FROM organization_members
            WHERE organization_id = ? AND user_id = ?
              AND (
                role != 'owner'
                OR (SELECT COUNT(*) FROM organization_members
                    WHERE organization_id = ? AND role = 'owner') > 1
              )
            "#,
        )
        .bind(&org)
        .bind(user_id.to_string())
        .bind(&org)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            fetch_member(&mut *tx, org_id, user_id).await?;
            return Err(StoreError::LastOwner);
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn count_owners(&self, org_id: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE organization_id = ? AND role = 'owner'",
        )
        .bind(org_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(count.max(0) as u64)
    }

    async fn transfer_ownership(&self, org_id: Uuid, from: Uuid, to: Uuid) -> StoreResult<()> {
        let org = org_id.to_string();
        let now = ts(Utc::now());
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let demoted = sqlx::query(
            "UPDATE organization_members SET role = 'admin', updated_at = ? WHERE organization_id = ? AND user_id = ?",
        )
        .bind(&now)
        .bind(&org)
        .bind(from.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if demoted.rows_affected() == 0 {
            return Err(StoreError::MemberNotFound);
        }

        let promoted = sqlx::query(
            "UPDATE organization_members SET role = 'owner', updated_at = ? WHERE organization_id = ? AND user_id = ?",
        )
        .bind(&now)
        .bind(&org)
        .bind(to.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if promoted.rows_affected() == 0 {
            // Dropping `tx` rolls back the demotion.
            return Err(StoreError::MemberNotFound);
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn is_member_by_email(&self, org_id: Uuid, email: &str) -> StoreResult<bool> {
        let exists: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM organization_members m
                JOIN users u ON u.id = m.user_id
                WHERE m.organization_id = ? AND u.email = ?
            )
            "#,
        )
        .bind(org_id.to_string())
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(exists != 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

// =========================================================================
// Invitations
// =========================================================================

#[async_trait]
impl InvitationStore for SqliteStore {
    async fn create_invitation(&self, new: NewInvitation) -> StoreResult<Invitation> {
        let invitation = Invitation::from_new(new, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO organization_invitations
                (id, organization_id, email, role, token, invited_by, status,
                 expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invitation.id.to_string())
        .bind(invitation.organization_id.to_string())
        .bind(&invitation.email)
        .bind(invitation.role.as_str())
        .bind(&invitation.token)
        .bind(invitation.invited_by.to_string())
        .bind(invitation.status.as_str())
        .bind(ts(invitation.expires_at))
        .bind(ts(invitation.created_at))
        .bind(ts(invitation.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                if e.to_string().contains("token") {
                    // Token collisions are surfaced, never retried.
                    backend(e)
                } else {
                    StoreError::InviteExists
                }
            } else if is_foreign_key_violation(&e) {
                StoreError::OrganizationNotFound
            } else {
                backend(e)
            }
        })?;

        Ok(invitation)
    }

    async fn get_invitation(&self, invitation_id: Uuid) -> StoreResult<Invitation> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        fetch_invitation(&mut conn, invitation_id).await
    }

    async fn get_invitation_by_token(&self, token: &str) -> StoreResult<InvitationWithDetails> {
        let row = sqlx::query(&format!("{INVITATION_DETAILS_SELECT} WHERE i.token = ?"))
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::InvitationNotFound)?;

        details_from_row(&row)
    }

    async fn list_invitations(
        &self,
        org_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> StoreResult<Vec<Invitation>> {
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, email, role, token, invited_by, status,
                   expires_at, created_at, updated_at
            FROM organization_invitations
            WHERE organization_id = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(org_id.to_string())
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(invitation_from_row).collect()
    }

    async fn list_pending_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InvitationWithDetails>> {
        let rows = sqlx::query(&format!(
            "{INVITATION_DETAILS_SELECT} \
             WHERE i.email = ? AND i.status = 'pending' AND i.expires_at > ? \
             ORDER BY i.created_at DESC, i.id DESC"
        ))
        .bind(email)
        .bind(ts(now))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(details_from_row).collect()
    }

    async fn transition_invitation(
        &self,
        invitation_id: Uuid,
        status: InvitationStatus,
    ) -> StoreResult<Invitation> {
        if !status.is_terminal() {
            return Err(StoreError::InvitationNotPending);
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let result = sqlx::query(
            "UPDATE organization_invitations SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(ts(Utc::now()))
        .bind(invitation_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            fetch_invitation(&mut *tx, invitation_id).await?;
            return Err(StoreError::InvitationNotPending);
        }

        let invitation = fetch_invitation(&mut *tx, invitation_id).await?;
        tx.commit().await.map_err(backend)?;
        Ok(invitation)
    }

    async fn delete_invitation(&self, invitation_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM organization_invitations WHERE id = ?")
            .bind(invitation_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InvitationNotFound);
        }
        Ok(())
    }
}
