//! The permission-slip state machine.
//!
//! A slip is created `pending` and is decided exactly once, to `approved` or
//! `rejected`. Every state change and its notification commit together.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    db,
    errors::AppError,
    session::Identity,
    structs::{ApprovedSlip, NewSlip, Notification, Role, Slip, SlipDetail, SlipStatus},
    utils, AppState,
};

pub const SUBMITTED_MESSAGE: &str = "Your permission slip has been submitted and is waiting for approval.";
pub const APPROVED_MESSAGE: &str = "Your permission slip has been approved. You can now download it.";
pub const REJECTED_MESSAGE: &str =
    "Your permission slip has been rejected. Please contact administration for more details.";

/// Form values arrive as strings from the browser, numbers from other clients.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn value(&self) -> Option<f64> {
        let v = match self {
            Amount::Number(n) => *n,
            Amount::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        (v.is_finite() && v > 0.0).then_some(v)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SlipRequest {
    pub level: Option<String>,
    pub name: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
    pub course_name: Option<String>,
    pub due_amount: Option<Amount>,
    pub reason: Option<String>,
    pub slip_date: Option<String>,
}

impl SlipRequest {
    /// Checks every field and reports all the bad ones at once.
    pub fn validate(self) -> Result<NewSlip, AppError> {
        let mut bad = Vec::new();
        let mut text = |value: Option<String>, field: &'static str| {
            let value = value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
            if value.is_none() {
                bad.push(field);
            }
            value.unwrap_or_default()
        };

        let level = text(self.level, "level");
        let name = text(self.name, "name");
        let semester = text(self.semester, "semester");
        let section = text(self.section, "section");
        let course_name = text(self.course_name, "courseName");
        let reason = text(self.reason, "reason");
        let slip_date = text(self.slip_date, "slipDate");

        let due_amount = self.due_amount.as_ref().and_then(Amount::value);
        if due_amount.is_none() {
            bad.push("dueAmount");
        }
        // accept a bare date or a full timestamp; keep only the date part
        let date_part = slip_date.split('T').next().unwrap_or_default();
        let slip_date = match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            Ok(date) => date.format("%Y-%m-%d").to_string(),
            Err(_) => {
                if !date_part.is_empty() {
                    bad.push("slipDate");
                }
                String::new()
            }
        };

        match due_amount {
            Some(due_amount) if bad.is_empty() => Ok(NewSlip {
                level,
                name,
                semester,
                section,
                course_name,
                due_amount,
                reason,
                slip_date,
            }),
            _ => Err(AppError::missing_fields(&bad)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(&self) -> SlipStatus {
        match self {
            Decision::Approve => SlipStatus::Approved,
            Decision::Reject => SlipStatus::Rejected,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Decision::Approve => APPROVED_MESSAGE,
            Decision::Reject => REJECTED_MESSAGE,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            Decision::Approve => "approve permission slips",
            Decision::Reject => "reject permission slips",
        }
    }
}

pub async fn submit(state: &AppState, identity: &Identity, request: SlipRequest) -> Result<i64, AppError> {
    identity.require(Role::Student, "submit permission slips")?;
    let slip = request.validate()?;
    let now = utils::now_timestamp();

    let mut tx = state.db_pool.begin().await?;
    let id = db::insert_slip(&mut tx, identity.id, &slip, &now).await?;
    db::insert_notification(&mut tx, identity.id, Role::Student, SUBMITTED_MESSAGE, &now).await?;
    tx.commit().await?;

    log::info!("Student {} submitted permission slip #{}", identity.external_id, id);
    Ok(id)
}

pub async fn approve(state: &AppState, identity: &Identity, slip_id: i64) -> Result<(), AppError> {
    decide(state, identity, slip_id, Decision::Approve).await
}

pub async fn reject(state: &AppState, identity: &Identity, slip_id: i64) -> Result<(), AppError> {
    decide(state, identity, slip_id, Decision::Reject).await
}

/// Only a pending slip can be decided; a decided one answers `Conflict` and
/// nothing is written.
pub async fn decide(
    state: &AppState,
    identity: &Identity,
    slip_id: i64,
    decision: Decision,
) -> Result<(), AppError> {
    identity.require(Role::Teacher, decision.action())?;
    let now = utils::now_timestamp();

    // write first, so the transaction holds the write lock from the start
    let mut tx = state.db_pool.begin().await?;
    if !db::decide_slip(&mut tx, slip_id, decision.status(), identity.id, &now).await? {
        let Some(current) = db::get_slip(&mut tx, slip_id).await? else {
            return Err(AppError::NotFound("Application"));
        };
        log::warn!(
            "Teacher {} tried to {} slip #{} which is already {}",
            identity.external_id,
            decision.status(),
            slip_id,
            current.status
        );
        return Err(AppError::Conflict(format!("Application already {}", current.status)));
    }
    let slip = db::get_slip(&mut tx, slip_id)
        .await?
        .ok_or(AppError::NotFound("Application"))?;
    db::insert_notification(&mut tx, slip.student_id, Role::Student, decision.message(), &now).await?;
    tx.commit().await?;

    log::info!(
        "Teacher {} {} permission slip #{}",
        identity.external_id,
        decision.status(),
        slip_id
    );
    Ok(())
}

pub async fn list_pending(state: &AppState, identity: &Identity) -> Result<Vec<SlipDetail>, AppError> {
    identity.require(Role::Teacher, "view pending applications")?;
    Ok(db::list_pending_slips(state).await?)
}

pub async fn list_approved(state: &AppState, identity: &Identity) -> Result<Vec<ApprovedSlip>, AppError> {
    identity.require(Role::Teacher, "view approved applications")?;
    Ok(db::list_approved_slips(state).await?)
}

/// Newest first; the head of the list is the student's current application.
pub async fn list_own(state: &AppState, identity: &Identity) -> Result<Vec<Slip>, AppError> {
    identity.require(Role::Student, "view their permission slips")?;
    Ok(db::list_student_slips(state, identity.id).await?)
}

/// Someone else's slip is reported exactly like a missing one.
pub async fn fetch_for_download(
    state: &AppState,
    identity: &Identity,
    slip_id: i64,
) -> Result<SlipDetail, AppError> {
    identity.require(Role::Student, "download permission slips")?;
    db::get_student_slip_detail(state, slip_id, identity.id)
        .await?
        .ok_or(AppError::NotFound("Permission slip"))
}

pub async fn list_notifications(state: &AppState, identity: &Identity) -> Result<Vec<Notification>, AppError> {
    identity.require(Role::Student, "view notifications")?;
    Ok(db::list_notifications(state, identity.id, Role::Student).await?)
}
