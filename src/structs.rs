use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One of the two fixed account kinds. Assigned at signup, never changed.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SlipStatus {
    Pending,
    Approved,
    Rejected,
}

impl SlipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlipStatus::Pending => "pending",
            SlipStatus::Approved => "approved",
            SlipStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SlipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row shape shared by the `students` and `teachers` tables.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    pub pwd_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub role: Role,
    pub id: i64,
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    pub pwd_hash: String,
    pub created_at: String,
}

impl Account {
    pub fn from_row(role: Role, row: AccountRow) -> Self {
        Account {
            role,
            id: row.id,
            external_id: row.external_id,
            full_name: row.full_name,
            email: row.email,
            pwd_hash: row.pwd_hash,
            created_at: row.created_at,
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            role: self.role,
            external_id: self.external_id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public view of an account, returned on login. Never carries the hash.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: i64,
    pub role: Role,
    pub external_id: String,
    pub full_name: String,
    pub email: String,
}

/// Validated signup data, already resolved to a role.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub role: Role,
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Slip {
    pub id: i64,
    pub student_id: i64,
    pub level: String,
    pub name: String,
    pub semester: String,
    pub section: String,
    pub course_name: String,
    pub due_amount: f64,
    pub reason: String,
    pub slip_date: String,
    pub status: SlipStatus,
    pub approver_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// A slip joined with its owning student.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct SlipDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub slip: Slip,
    pub student_name: String,
    pub student_external_id: String,
}

/// An approved slip annotated with the deciding teacher's name.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct ApprovedSlip {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub slip: Slip,
    pub student_name: String,
    pub student_external_id: String,
    pub approved_by_teacher: String,
}

/// Descriptive fields of a slip once validated. Immutable after insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSlip {
    pub level: String,
    pub name: String,
    pub semester: String,
    pub section: String,
    pub course_name: String,
    pub due_amount: f64,
    pub reason: String,
    pub slip_date: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub recipient_role: Role,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

/// Body of a successful login, for either role.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub profile: Profile,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}
