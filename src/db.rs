use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};
use std::str::FromStr;

use crate::{
    errors::AppError,
    structs::{
        Account, AccountRow, ApprovedSlip, NewAccount, NewSlip, Notification, Role, Slip,
        SlipDetail, SlipStatus,
    },
    AppState,
};

/// Opens the pool and applies `migrations/`.
///
/// In-memory databases are per-connection in SQLite, so they get a pool of one.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let in_memory = database_url.contains(":memory:");
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        })
        .read_only(false)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(5));

    let mut pool_opts = SqlitePoolOptions::new();
    if in_memory {
        pool_opts = pool_opts
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<std::time::Duration>)
            .max_lifetime(None::<std::time::Duration>);
    }
    let db_pool = pool_opts.connect_with(opts).await?;

    sqlx::migrate!().run(&db_pool).await?;
    log::info!("Database migrated successfully");
    Ok(db_pool)
}

// ---- credential store ----

fn select_account_by_external_id(role: Role) -> &'static str {
    match role {
        Role::Student => "SELECT * FROM students WHERE external_id = ?",
        Role::Teacher => "SELECT * FROM teachers WHERE external_id = ?",
    }
}

fn select_account_conflict(role: Role) -> &'static str {
    match role {
        Role::Student => "SELECT COUNT(*) FROM students WHERE email = ? OR external_id = ?",
        Role::Teacher => "SELECT COUNT(*) FROM teachers WHERE email = ? OR external_id = ?",
    }
}

fn insert_account_query(role: Role) -> &'static str {
    match role {
        Role::Student => "INSERT INTO students (external_id, full_name, email, pwd_hash, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
        Role::Teacher => "INSERT INTO teachers (external_id, full_name, email, pwd_hash, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    }
}

pub async fn find_account(
    state: &AppState,
    role: Role,
    external_id: &str,
) -> Result<Option<Account>, sqlx::Error> {
    let row = sqlx::query_as::<_, AccountRow>(select_account_by_external_id(role))
        .bind(external_id)
        .fetch_optional(&state.db_pool)
        .await?;
    Ok(row.map(|r| Account::from_row(role, r)))
}

/// True when the email or external id is already taken within the role's table.
pub async fn account_exists(
    state: &AppState,
    role: Role,
    email: &str,
    external_id: &str,
) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(select_account_conflict(role))
        .bind(email)
        .bind(external_id)
        .fetch_one(&state.db_pool)
        .await?;
    Ok(count > 0)
}

pub async fn create_account(
    state: &AppState,
    account: &NewAccount,
    pwd_hash: String,
    created_at: &str,
) -> Result<Account, sqlx::Error> {
    let row = sqlx::query_as::<_, AccountRow>(insert_account_query(account.role))
        .bind(&account.external_id)
        .bind(&account.full_name)
        .bind(&account.email)
        .bind(pwd_hash)
        .bind(created_at)
        .fetch_one(&state.db_pool)
        .await?;
    Ok(Account::from_row(account.role, row))
}

// ---- slip repository ----

pub async fn insert_slip(
    conn: &mut SqliteConnection,
    student_id: i64,
    slip: &NewSlip,
    now: &str,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO permission_slips
            (student_id, level, name, semester, section, course_name, due_amount, reason, slip_date, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(&slip.level)
    .bind(&slip.name)
    .bind(&slip.semester)
    .bind(&slip.section)
    .bind(&slip.course_name)
    .bind(slip.due_amount)
    .bind(&slip.reason)
    .bind(&slip.slip_date)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn get_slip(conn: &mut SqliteConnection, id: i64) -> Result<Option<Slip>, sqlx::Error> {
    sqlx::query_as::<_, Slip>("SELECT * FROM permission_slips WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Moves a pending slip to `status`. Returns false if the slip was not pending
/// (or does not exist); the row is then left untouched.
pub async fn decide_slip(
    conn: &mut SqliteConnection,
    id: i64,
    status: SlipStatus,
    approver_id: i64,
    now: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE permission_slips SET status = ?, approver_id = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(status)
    .bind(approver_id)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_pending_slips(state: &AppState) -> Result<Vec<SlipDetail>, sqlx::Error> {
    sqlx::query_as::<_, SlipDetail>(
        r#"
        SELECT ps.*, s.full_name AS student_name, s.external_id AS student_external_id
        FROM permission_slips ps
        JOIN students s ON ps.student_id = s.id
        WHERE ps.status = 'pending'
        ORDER BY ps.created_at DESC, ps.id DESC
        "#,
    )
    .fetch_all(&state.db_pool)
    .await
}

pub async fn list_approved_slips(state: &AppState) -> Result<Vec<ApprovedSlip>, sqlx::Error> {
    sqlx::query_as::<_, ApprovedSlip>(
        r#"
        SELECT ps.*,
               s.full_name AS student_name,
               s.external_id AS student_external_id,
               COALESCE(t.full_name, 'Unknown') AS approved_by_teacher
        FROM permission_slips ps
        JOIN students s ON ps.student_id = s.id
        LEFT JOIN teachers t ON ps.approver_id = t.id
        WHERE ps.status = 'approved'
        ORDER BY ps.updated_at DESC, ps.id DESC
        "#,
    )
    .fetch_all(&state.db_pool)
    .await
}

pub async fn list_student_slips(state: &AppState, student_id: i64) -> Result<Vec<Slip>, sqlx::Error> {
    sqlx::query_as::<_, Slip>(
        "SELECT * FROM permission_slips WHERE student_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(student_id)
    .fetch_all(&state.db_pool)
    .await
}

/// Only matches when the slip belongs to `student_id`.
pub async fn get_student_slip_detail(
    state: &AppState,
    id: i64,
    student_id: i64,
) -> Result<Option<SlipDetail>, sqlx::Error> {
    sqlx::query_as::<_, SlipDetail>(
        r#"
        SELECT ps.*, s.full_name AS student_name, s.external_id AS student_external_id
        FROM permission_slips ps
        JOIN students s ON ps.student_id = s.id
        WHERE ps.id = ? AND ps.student_id = ?
        "#,
    )
    .bind(id)
    .bind(student_id)
    .fetch_optional(&state.db_pool)
    .await
}

// ---- notification sink ----

pub async fn insert_notification(
    conn: &mut SqliteConnection,
    recipient_id: i64,
    recipient_role: Role,
    message: &str,
    now: &str,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO notifications (recipient_id, recipient_role, message, created_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(recipient_id)
    .bind(recipient_role)
    .bind(message)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn list_notifications(
    state: &AppState,
    recipient_id: i64,
    recipient_role: Role,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE recipient_id = ? AND recipient_role = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(recipient_id)
    .bind(recipient_role)
    .fetch_all(&state.db_pool)
    .await
}
