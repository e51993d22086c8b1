//! PostgreSQL identity repositories
//!
//! Memberships live in `members` with a denormalized copy of the team row;
//! renaming or deleting a team rewrites those copies in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::team::team_limit_error;
use crate::domain::{
    DomainError, Member, MemberRole, Otp, OtpRepository, Session, SessionId,
    SessionRepository, Team, TeamId, TeamRepository, User, UserId, UserRepository,
};
use crate::infrastructure::storage::map_write_error;

fn read_error(action: &str) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::storage(format!("Failed to {}: {}", action, e))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("Failed to read column '{}': {}", name, e)))
}

const USER_COLUMNS: &str = "id, email, username, avatar, blocked, created_at, updated_at";

/// PostgreSQL implementation of UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_members(&self, user_id: Uuid) -> Result<Vec<Member>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT team_id, team_name, team_created_at, team_updated_at, role, joined_at
            FROM members
            WHERE user_id = $1
            ORDER BY position
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("load memberships"))?;

        rows.iter().map(row_to_member).collect()
    }

    async fn hydrate(&self, row: Option<PgRow>) -> Result<Option<User>, DomainError> {
        match row {
            Some(row) => {
                let id: Uuid = column(&row, "id")?;
                let members = self.load_members(id).await?;
                Ok(Some(row_to_user(&row, members)?))
            }
            None => Ok(None),
        }
    }

    async fn replace_members(
        tx: &mut Transaction<'_, Postgres>,
        user: &User,
    ) -> Result<(), DomainError> {
        let user_id = *user.id().as_uuid();

        sqlx::query("DELETE FROM members WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(read_error("clear memberships"))?;

        for (position, member) in user.teams().iter().enumerate() {
            let team = member.team();
            sqlx::query(
                r#"
                INSERT INTO members (user_id, team_id, team_name, team_created_at,
                                     team_updated_at, role, position, joined_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(user_id)
            .bind(*team.id().as_uuid())
            .bind(team.name())
            .bind(team.created_at())
            .bind(team.updated_at())
            .bind(member.role().as_str())
            .bind(position as i32)
            .bind(member.joined_at())
            .execute(&mut **tx)
            .await
            .map_err(read_error("save membership"))?;
        }

        Ok(())
    }
}

fn user_conflict(user: &User) -> impl FnOnce(&str) -> String + '_ {
    move |constraint| {
        if constraint.contains("username") {
            format!("Username '{}' already exists", user.username())
        } else if constraint.contains("email") {
            format!("Email '{}' already exists", user.email())
        } else {
            format!("User with ID '{}' already exists", user.id())
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("get user"))?;

        self.hydrate(row).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("get user by email"))?;

        self.hydrate(row).await
    }

    async fn get_by_valid_otp(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.username, u.avatar, u.blocked, u.created_at, u.updated_at
            FROM otps o
            JOIN users u ON u.id = o.user_id
            WHERE o.code = $1 AND o.expires_at > $2
            LIMIT 1
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error("get user by otp"))?;

        self.hydrate(row).await
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut tx = self.pool.begin().await.map_err(read_error("begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, avatar, blocked, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*user.id().as_uuid())
        .bind(user.email())
        .bind(user.username())
        .bind(user.avatar())
        .bind(user.is_blocked())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, user_conflict(&user), "create user"))?;

        Self::replace_members(&mut tx, &user).await?;
        tx.commit().await.map_err(read_error("commit user"))?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut tx = self.pool.begin().await.map_err(read_error("begin transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, username = $3, avatar = $4, blocked = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*user.id().as_uuid())
        .bind(user.email())
        .bind(user.username())
        .bind(user.avatar())
        .bind(user.is_blocked())
        .bind(user.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, user_conflict(user), "update user"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("User '{}' not found", user.id())));
        }

        Self::replace_members(&mut tx, user).await?;
        tx.commit().await.map_err(read_error("commit user"))?;

        Ok(user.clone())
    }

    async fn add_membership(
        &self,
        user_id: &UserId,
        member: Member,
        max: usize,
    ) -> Result<User, DomainError> {
        let uid = *user_id.as_uuid();
        let mut tx = self.pool.begin().await.map_err(read_error("begin transaction"))?;

        // Row lock serializes concurrent additions for the same user
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(uid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(read_error("lock user"))?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user_id)))?;

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS held, COALESCE(MAX(position) + 1, 0) AS next
            FROM members
            WHERE user_id = $1
            "#,
        )
        .bind(uid)
        .fetch_one(&mut *tx)
        .await
        .map_err(read_error("count memberships"))?;

        let held: i64 = column(&row, "held")?;
        if held >= max as i64 {
            return Err(team_limit_error(max));
        }
        let next: i32 = column(&row, "next")?;

        let team = member.team();
        sqlx::query(
            r#"
            INSERT INTO members (user_id, team_id, team_name, team_created_at,
                                 team_updated_at, role, position, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(uid)
        .bind(*team.id().as_uuid())
        .bind(team.name())
        .bind(team.created_at())
        .bind(team.updated_at())
        .bind(member.role().as_str())
        .bind(next)
        .bind(member.joined_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                |_| format!("User '{}' is already a member of team '{}'", user_id, team.id()),
                "add membership",
            )
        })?;

        sqlx::query("UPDATE users SET updated_at = NOW() WHERE id = $1")
            .bind(uid)
            .execute(&mut *tx)
            .await
            .map_err(read_error("touch user"))?;

        tx.commit().await.map_err(read_error("commit membership"))?;

        self.get(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user_id)))
    }
}

fn row_to_user(row: &PgRow, teams: Vec<Member>) -> Result<User, DomainError> {
    Ok(User::restore(
        UserId::from_uuid(column(row, "id")?),
        column(row, "email")?,
        column(row, "username")?,
        column(row, "avatar")?,
        column(row, "blocked")?,
        teams,
        column(row, "created_at")?,
        column(row, "updated_at")?,
    ))
}

fn row_to_member(row: &PgRow) -> Result<Member, DomainError> {
    let role = column::<String>(row, "role")?
        .parse::<MemberRole>()
        .map_err(|e| DomainError::storage(e.to_string()))?;

    let team = Team::restore(
        TeamId::from_uuid(column(row, "team_id")?),
        column::<String>(row, "team_name")?,
        column(row, "team_created_at")?,
        column(row, "team_updated_at")?,
    );

    Ok(Member::restore(team, role, column(row, "joined_at")?))
}

/// PostgreSQL implementation of TeamRepository
#[derive(Debug, Clone)]
pub struct PostgresTeamRepository {
    pool: PgPool,
}

impl PostgresTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamRepository for PostgresTeamRepository {
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query("SELECT id, name, created_at, updated_at FROM teams WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("get team"))?;

        row.as_ref().map(row_to_team).transpose()
    }

    async fn create(&self, team: Team) -> Result<Team, DomainError> {
        sqlx::query(
            "INSERT INTO teams (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(*team.id().as_uuid())
        .bind(team.name())
        .bind(team.created_at())
        .bind(team.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                |_| format!("Team '{}' already exists", team.name()),
                "create team",
            )
        })?;

        Ok(team)
    }

    async fn rename(&self, id: &TeamId, name: &str) -> Result<Team, DomainError> {
        let mut tx = self.pool.begin().await.map_err(read_error("begin transaction"))?;

        let row = sqlx::query(
            r#"
            UPDATE teams SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(*id.as_uuid())
        .bind(name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, |_| format!("Team '{}' already exists", name), "rename team")
        })?
        .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", id)))?;

        let team = row_to_team(&row)?;

        sqlx::query(
            "UPDATE members SET team_name = $2, team_updated_at = $3 WHERE team_id = $1",
        )
        .bind(*id.as_uuid())
        .bind(team.name())
        .bind(team.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(read_error("propagate team name"))?;

        tx.commit().await.map_err(read_error("commit team rename"))?;
        Ok(team)
    }

    async fn delete(&self, id: &TeamId) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(read_error("begin transaction"))?;

        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(read_error("delete team"))?;

        sqlx::query("DELETE FROM members WHERE team_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(read_error("pull memberships"))?;

        tx.commit().await.map_err(read_error("commit team delete"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_team(row: &PgRow) -> Result<Team, DomainError> {
    Ok(Team::restore(
        TeamId::from_uuid(column(row, "id")?),
        column::<String>(row, "name")?,
        column(row, "created_at")?,
        column(row, "updated_at")?,
    ))
}

const SESSION_COLUMNS: &str = "id, user_id, hash, ip, user_agent, expires_at, created_at, updated_at";

/// PostgreSQL implementation of SessionRepository
#[derive(Debug, Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn create(&self, session: Session) -> Result<Session, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, hash, ip, user_agent, expires_at,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*session.id().as_uuid())
        .bind(*session.user_id().as_uuid())
        .bind(session.hash())
        .bind(session.ip())
        .bind(session.user_agent())
        .bind(session.expires_at())
        .bind(session.created_at())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, |_| "Session hash already exists".to_string(), "create session")
        })?;

        Ok(session)
    }

    async fn get_by_hash(&self, hash: &str) -> Result<Option<Session>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM sessions WHERE hash = $1", SESSION_COLUMNS))
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("get session"))?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE user_id = $1 ORDER BY created_at",
            SESSION_COLUMNS
        ))
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("list sessions"))?;

        rows.iter().map(row_to_session).collect()
    }

    async fn update(&self, session: &Session) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE sessions SET hash = $2, expires_at = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(*session.id().as_uuid())
        .bind(session.hash())
        .bind(session.expires_at())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, |_| "Session hash already exists".to_string(), "update session")
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Session '{}' not found",
                session.id()
            )));
        }

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(read_error("delete session"))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_session(row: &PgRow) -> Result<Session, DomainError> {
    Ok(Session::restore(
        SessionId::from_uuid(column(row, "id")?),
        UserId::from_uuid(column(row, "user_id")?),
        column(row, "hash")?,
        column(row, "ip")?,
        column(row, "user_agent")?,
        column(row, "expires_at")?,
        column(row, "created_at")?,
        column(row, "updated_at")?,
    ))
}

/// PostgreSQL implementation of OtpRepository
#[derive(Debug, Clone)]
pub struct PostgresOtpRepository {
    pool: PgPool,
}

impl PostgresOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for PostgresOtpRepository {
    async fn create(&self, otp: Otp) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO otps (id, user_id, code, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*otp.id().as_uuid())
        .bind(*otp.user_id().as_uuid())
        .bind(otp.code())
        .bind(otp.expires_at())
        .bind(otp.created_at())
        .bind(otp.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, |_| "One-time code already in use".to_string(), "create otp")
        })?;

        Ok(())
    }

    async fn delete_by_code(&self, code: &str) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM otps WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(read_error("delete otp"))?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM otps WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(read_error("delete expired otps"))?;

        Ok(result.rows_affected())
    }

    async fn delete_by_user(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM otps WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(read_error("delete user otps"))?;

        Ok(result.rows_affected())
    }
}
