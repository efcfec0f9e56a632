/*!
Client-side view/controller, modelled without any UI toolkit.

The shell owns navigation only. The logged-in [`Session`] is a separate value
created from a login response and handed to whatever needs it; it is dropped
on logout or once it expires. [`SessionStore`] is the client-local storage that
keeps it across reloads.
*/
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    structs::{LoginResponse, Profile, Role, Slip, SlipStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home,
    RoleSelect(Role),
    /// Shared-code prompt shown before teacher signup/login. A UX nudge only;
    /// the server checks its own invite code.
    TeacherGate,
    Signup(Role),
    Login(Role),
    StudentDashboard,
    TeacherDashboard,
    ApplicationForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    ProfileDrawer(Vec<(&'static str, String)>),
    Modal { title: String, message: String },
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_login(response: LoginResponse) -> Self {
        Session {
            token: response.token,
            profile: response.profile,
            expires_at: response.expires_at,
        }
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// JSON file standing in for browser local storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        SessionStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| AppError::IoError(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Returns the stored session unless it is missing, unreadable or expired.
    /// Stale or corrupt files are removed.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<Session>, AppError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) if !session.is_expired_at(now) => Ok(Some(session)),
            Ok(_) => {
                log::info!("Stored session expired; clearing it");
                self.clear()?;
                Ok(None)
            }
            Err(e) => {
                log::warn!("Discarding unreadable session file {:?}: {}", self.path, e);
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// What the student dashboard shows for the current application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDisplay {
    pub label: &'static str,
    /// Set only when the download button is enabled.
    pub download_slip: Option<i64>,
}

/// The newest slip is the "current application"; older ones are not shown.
pub fn current_application(slips: &[Slip]) -> Option<&Slip> {
    slips.first()
}

pub fn status_display(slips: &[Slip]) -> StatusDisplay {
    match current_application(slips) {
        None => StatusDisplay {
            label: "No application submitted",
            download_slip: None,
        },
        Some(slip) => match slip.status {
            SlipStatus::Approved => StatusDisplay {
                label: "Approved",
                download_slip: Some(slip.id),
            },
            SlipStatus::Pending => StatusDisplay {
                label: "Pending Approval",
                download_slip: None,
            },
            SlipStatus::Rejected => StatusDisplay {
                label: "Rejected",
                download_slip: None,
            },
        },
    }
}

/// Pulls the message out of an API error body, as shown in the error modal.
pub fn error_message(body: &serde_json::Value) -> String {
    body.get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("Request failed")
        .to_owned()
}

#[derive(Debug, Clone)]
pub struct Shell {
    screen: Screen,
    overlay: Option<Overlay>,
    gate_code: String,
}

impl Shell {
    /// Starts on the dashboard matching a live session, or the home page.
    pub fn start(gate_code: &str, session: Option<&Session>, now: DateTime<Utc>) -> Self {
        let mut shell = Shell {
            screen: Screen::Home,
            overlay: None,
            gate_code: gate_code.to_owned(),
        };
        if let Some(session) = session.filter(|s| !s.is_expired_at(now)) {
            shell.screen = dashboard_for(session.role());
        }
        shell
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Home;
    }

    pub fn select_role(&mut self, role: Role) {
        self.screen = match role {
            Role::Student => Screen::RoleSelect(Role::Student),
            Role::Teacher => Screen::TeacherGate,
        };
    }

    /// Returns true when the code matches and teacher signup is shown.
    pub fn submit_gate_code(&mut self, code: &str) -> bool {
        if self.screen != Screen::TeacherGate {
            return false;
        }
        if code == self.gate_code {
            self.show_modal("Success", "Correct! You are verified as faculty.");
            self.screen = Screen::Signup(Role::Teacher);
            true
        } else {
            self.show_modal(
                "Error",
                "You are not faculty. Please contact administration if you believe this is an error.",
            );
            false
        }
    }

    pub fn show_signup(&mut self, role: Role) {
        self.screen = Screen::Signup(role);
    }

    pub fn show_login(&mut self, role: Role) {
        self.screen = Screen::Login(role);
    }

    /// Client-side check before a signup request is sent.
    pub fn check_signup_passwords(&mut self, password: &str, confirm: &str) -> bool {
        if password != confirm {
            self.show_modal("Error", "Passwords do not match");
            return false;
        }
        true
    }

    pub fn signed_up(&mut self, role: Role) {
        self.show_modal("Success", "Your account has been created successfully. Please login.");
        self.screen = Screen::Login(role);
    }

    /// Turns a login response into the session and moves to the dashboard.
    pub fn logged_in(
        &mut self,
        response: LoginResponse,
        store: &SessionStore,
    ) -> Result<Session, AppError> {
        let session = Session::from_login(response);
        store.save(&session)?;
        self.screen = dashboard_for(session.role());
        Ok(session)
    }

    /// Consumes the session; it is gone from memory and storage afterwards.
    pub fn logout(&mut self, session: Session, store: &SessionStore) -> Result<(), AppError> {
        log::info!("{} {} logged out", session.role(), session.profile.external_id);
        store.clear()?;
        self.overlay = None;
        self.screen = Screen::Home;
        Ok(())
    }

    /// Drops an expired session and sends the user back home.
    pub fn check_expiry(
        &mut self,
        session: Option<Session>,
        store: &SessionStore,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AppError> {
        match session {
            Some(s) if s.is_expired_at(now) => {
                store.clear()?;
                self.overlay = None;
                self.screen = Screen::Home;
                self.show_modal("Session expired", "Please log in again.");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub fn show_application_form(&mut self, session: &Session) {
        if session.role() == Role::Student {
            self.screen = Screen::ApplicationForm;
        }
    }

    pub fn application_submitted(&mut self) {
        self.show_modal(
            "Application Submitted",
            "Your permission slip application has been submitted. Please wait for approval.",
        );
        self.screen = Screen::StudentDashboard;
    }

    pub fn open_profile(&mut self, session: &Session) {
        let p = &session.profile;
        self.overlay = Some(Overlay::ProfileDrawer(vec![
            ("Name", p.full_name.clone()),
            ("Email", p.email.clone()),
            ("ID", p.external_id.clone()),
            ("Role", p.role.to_string()),
        ]));
    }

    pub fn show_modal(&mut self, title: &str, message: &str) {
        self.overlay = Some(Overlay::Modal {
            title: title.to_owned(),
            message: message.to_owned(),
        });
    }

    /// The only recovery: tell the user. Nothing is retried.
    pub fn show_error(&mut self, message: &str) {
        self.show_modal("Error", message);
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }
}

fn dashboard_for(role: Role) -> Screen {
    match role {
        Role::Student => Screen::StudentDashboard,
        Role::Teacher => Screen::TeacherDashboard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn login(role: Role) -> LoginResponse {
        LoginResponse {
            success: true,
            message: "Login successful".into(),
            token: "abc.def".into(),
            profile: Profile {
                id: 1,
                role,
                external_id: "S100".into(),
                full_name: "Ada Student".into(),
                email: "ada@example.edu".into(),
            },
            expires_at: now() + Duration::hours(24),
        }
    }

    fn slip(id: i64, status: SlipStatus) -> Slip {
        Slip {
            id,
            student_id: 1,
            level: "UG".into(),
            name: "Ada".into(),
            semester: "Spring".into(),
            section: "A".into(),
            course_name: "Compilers".into(),
            due_amount: 10.0,
            reason: "r".into(),
            slip_date: "2025-03-01".into(),
            status,
            approver_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn teacher_path_goes_through_the_gate() {
        let mut shell = Shell::start("nub123456", None, now());
        assert_eq!(shell.screen(), &Screen::Home);

        shell.select_role(Role::Teacher);
        assert_eq!(shell.screen(), &Screen::TeacherGate);

        assert!(!shell.submit_gate_code("guess"));
        assert_eq!(shell.screen(), &Screen::TeacherGate);
        assert!(matches!(shell.overlay(), Some(Overlay::Modal { title, .. }) if title == "Error"));

        assert!(shell.submit_gate_code("nub123456"));
        assert_eq!(shell.screen(), &Screen::Signup(Role::Teacher));
    }

    #[test]
    fn students_skip_the_gate() {
        let mut shell = Shell::start("code", None, now());
        shell.select_role(Role::Student);
        assert_eq!(shell.screen(), &Screen::RoleSelect(Role::Student));
        assert!(!shell.submit_gate_code("code"));
    }

    #[test]
    fn mismatched_passwords_stop_signup() {
        let mut shell = Shell::start("code", None, now());
        shell.show_signup(Role::Student);
        assert!(!shell.check_signup_passwords("a", "b"));
        assert!(shell.check_signup_passwords("same", "same"));
        shell.signed_up(Role::Student);
        assert_eq!(shell.screen(), &Screen::Login(Role::Student));
    }

    #[test]
    fn session_survives_reload_and_dies_on_logout() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut shell = Shell::start("code", None, now());

        let session = shell.logged_in(login(Role::Teacher), &store).unwrap();
        assert_eq!(shell.screen(), &Screen::TeacherDashboard);
        assert_eq!(session.authorization(), "Bearer abc.def");

        let restored = store.load(now()).unwrap().unwrap();
        assert_eq!(restored, session);
        let reloaded = Shell::start("code", Some(&restored), now());
        assert_eq!(reloaded.screen(), &Screen::TeacherDashboard);

        shell.logout(session, &store).unwrap();
        assert_eq!(shell.screen(), &Screen::Home);
        assert!(store.load(now()).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut shell = Shell::start("code", None, now());
        let session = shell.logged_in(login(Role::Student), &store).unwrap();

        let later = now() + Duration::hours(25);
        assert!(Shell::start("code", Some(&session), later).screen() == &Screen::Home);

        let kept = shell.check_expiry(Some(session), &store, later).unwrap();
        assert!(kept.is_none());
        assert_eq!(shell.screen(), &Screen::Home);
        assert!(store.load(now()).unwrap().is_none());
    }

    #[test]
    fn corrupt_storage_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"{not json").unwrap();
        let store = SessionStore::new(&path);
        assert!(store.load(now()).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn only_the_newest_slip_drives_the_status() {
        assert_eq!(status_display(&[]).label, "No application submitted");

        let approved_then_pending = [slip(2, SlipStatus::Pending), slip(1, SlipStatus::Approved)];
        let shown = status_display(&approved_then_pending);
        assert_eq!(shown.label, "Pending Approval");
        assert_eq!(shown.download_slip, None);

        let shown = status_display(&[slip(3, SlipStatus::Approved), slip(2, SlipStatus::Rejected)]);
        assert_eq!(shown, StatusDisplay { label: "Approved", download_slip: Some(3) });

        assert_eq!(status_display(&[slip(4, SlipStatus::Rejected)]).label, "Rejected");
    }

    #[test]
    fn profile_and_errors_are_overlays() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("s.json"));
        let mut shell = Shell::start("code", None, now());
        let session = shell.logged_in(login(Role::Student), &store).unwrap();

        shell.show_application_form(&session);
        assert_eq!(shell.screen(), &Screen::ApplicationForm);
        shell.application_submitted();
        assert_eq!(shell.screen(), &Screen::StudentDashboard);

        shell.open_profile(&session);
        match shell.overlay() {
            Some(Overlay::ProfileDrawer(rows)) => {
                assert!(rows.contains(&("ID", "S100".to_owned())));
                assert!(rows.contains(&("Role", "student".to_owned())));
            }
            other => panic!("unexpected {:?}", other),
        }

        let message = error_message(&json!({"success": false, "error": "Access denied"}));
        shell.show_error(&message);
        assert_eq!(
            shell.overlay(),
            Some(&Overlay::Modal { title: "Error".into(), message: "Access denied".into() })
        );
        assert_eq!(error_message(&json!({})), "Request failed");
        shell.close_overlay();
        assert!(shell.overlay().is_none());
    }
}
