/*!
Signup and login for both roles.

Request bodies differ per role (`studentId` vs `teacherId`); they are turned
into a role-tagged [`Signup`] / [`Login`] at the route boundary and handled
uniformly from there on.
*/
use serde::Deserialize;

use crate::{
    db,
    errors::AppError,
    session::IssuedToken,
    structs::{Account, NewAccount, Role},
    utils, AppState,
};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudentSignup {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub student_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSignup {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub teacher_id: Option<String>,
    pub password: Option<String>,
    pub invite_code: Option<String>,
}

#[derive(Debug)]
pub enum Signup {
    Student(StudentSignup),
    Teacher(TeacherSignup),
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudentLogin {
    pub student_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLogin {
    pub teacher_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub enum Login {
    Student(StudentLogin),
    Teacher(TeacherLogin),
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl Signup {
    pub fn role(&self) -> Role {
        match self {
            Signup::Student(_) => Role::Student,
            Signup::Teacher(_) => Role::Teacher,
        }
    }

    /// Splits into validated account data and the invite code, if any was sent.
    fn into_parts(self) -> Result<(NewAccount, Option<String>), AppError> {
        let role = self.role();
        let (full_name, email, external_id, password, invite_code) = match self {
            Signup::Student(s) => (s.full_name, s.email, s.student_id, s.password, None),
            Signup::Teacher(t) => (t.full_name, t.email, t.teacher_id, t.password, t.invite_code),
        };
        let id_field = match role {
            Role::Student => "studentId",
            Role::Teacher => "teacherId",
        };

        let full_name = present(full_name);
        let email = present(email).map(|e| e.to_lowercase());
        let external_id = present(external_id);
        // passwords are taken verbatim; only emptiness is checked
        let password = password.filter(|p| !p.is_empty());

        let mut missing = Vec::new();
        if full_name.is_none() {
            missing.push("fullName");
        }
        if email.is_none() {
            missing.push("email");
        }
        if external_id.is_none() {
            missing.push(id_field);
        }
        if password.is_none() {
            missing.push("password");
        }

        match (full_name, email, external_id, password) {
            (Some(full_name), Some(email), Some(external_id), Some(password)) => Ok((
                NewAccount {
                    role,
                    external_id,
                    full_name,
                    email,
                    password,
                },
                invite_code,
            )),
            _ => Err(AppError::missing_fields(&missing)),
        }
    }
}

impl Login {
    pub fn role(&self) -> Role {
        match self {
            Login::Student(_) => Role::Student,
            Login::Teacher(_) => Role::Teacher,
        }
    }

    fn into_parts(self) -> Result<(Role, String, String), AppError> {
        let role = self.role();
        let (external_id, password) = match self {
            Login::Student(s) => (s.student_id, s.password),
            Login::Teacher(t) => (t.teacher_id, t.password),
        };
        match (present(external_id), password.filter(|p| !p.is_empty())) {
            (Some(external_id), Some(password)) => Ok((role, external_id, password)),
            _ => Err(AppError::Validation(format!(
                "{} ID and password are required",
                role.title()
            ))),
        }
    }
}

/// Creates an account. Teacher signup is gated by the configured invite code.
pub async fn signup(state: &AppState, request: Signup) -> Result<Account, AppError> {
    let (account, invite_code) = request.into_parts()?;

    if account.role == Role::Teacher {
        if let Some(expected) = &state.config.teacher_invite_code {
            if invite_code.as_deref() != Some(expected.as_str()) {
                log::warn!("Teacher signup for {} refused: bad invite code", account.external_id);
                return Err(AppError::Forbidden("Invalid teacher invite code".to_owned()));
            }
        }
    }

    if db::account_exists(state, account.role, &account.email, &account.external_id).await? {
        return Err(AppError::Validation(format!(
            "{} already exists",
            account.role.title()
        )));
    }

    let pwd_hash = utils::hash_password(&account.password)?;
    let created = db::create_account(state, &account, pwd_hash, &utils::now_timestamp())
        .await
        .map_err(|e| match e {
            // lost a race with a concurrent signup for the same email or id
            sqlx::Error::Database(ref dbe) if dbe.is_unique_violation() => {
                AppError::Validation(format!("{} already exists", account.role.title()))
            }
            other => AppError::SqlxError(other),
        })?;

    log::info!("{} {} signed up as #{}", created.role, created.external_id, created.id);
    Ok(created)
}

/// Verifies credentials and issues a bearer token.
pub async fn authenticate(state: &AppState, request: Login) -> Result<(IssuedToken, Account), AppError> {
    let (role, external_id, password) = request.into_parts()?;

    let Some(account) = db::find_account(state, role, &external_id).await? else {
        log::info!("Login failed: no {} {}", role, external_id);
        return Err(AppError::InvalidCredentials);
    };
    if !utils::verify_password(&password, &account.pwd_hash)? {
        log::info!("Login failed: wrong password for {} {}", role, external_id);
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(&account)?;
    log::info!("{} {} logged in", role, external_id);
    Ok((token, account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{state, state_with_invite};

    fn student(id: &str, email: &str) -> Signup {
        Signup::Student(StudentSignup {
            full_name: Some("Ada Student".into()),
            email: Some(email.into()),
            student_id: Some(id.into()),
            password: Some("hunter2hunter2".into()),
        })
    }

    fn teacher(id: &str, invite: Option<&str>) -> Signup {
        Signup::Teacher(TeacherSignup {
            full_name: Some("Tom Teacher".into()),
            email: Some(format!("{}@example.edu", id)),
            teacher_id: Some(id.into()),
            password: Some("chalkboard".into()),
            invite_code: invite.map(Into::into),
        })
    }

    #[actix_web::test]
    async fn signup_then_login() {
        let state = state().await;
        let created = signup(&state, student("S100", "Ada@Example.edu")).await.unwrap();
        assert_eq!(created.email, "ada@example.edu");
        assert_ne!(created.pwd_hash, "hunter2hunter2");

        let (token, account) = authenticate(
            &state,
            Login::Student(StudentLogin {
                student_id: Some("S100".into()),
                password: Some("hunter2hunter2".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(account.id, created.id);

        let identity = state.tokens.verify(&token.token).unwrap();
        assert_eq!(identity.id, created.id);
        assert_eq!(identity.external_id, "S100");
        assert_eq!(identity.role, Role::Student);
    }

    #[actix_web::test]
    async fn missing_fields_are_named() {
        let state = state().await;
        let err = signup(
            &state,
            Signup::Student(StudentSignup {
                full_name: Some("  ".into()),
                email: Some("a@b.c".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("fullName"));
                assert!(msg.contains("studentId"));
                assert!(msg.contains("password"));
                assert!(!msg.contains("email"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[actix_web::test]
    async fn duplicate_email_or_id_is_rejected() {
        let state = state().await;
        signup(&state, student("S100", "ada@example.edu")).await.unwrap();

        for dup in [student("S100", "other@example.edu"), student("S101", "ada@example.edu")] {
            match signup(&state, dup).await {
                Err(AppError::Validation(msg)) => assert_eq!(msg, "Student already exists"),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[actix_web::test]
    async fn roles_have_separate_namespaces() {
        let state = state().await;
        signup(&state, student("X1", "x1@example.edu")).await.unwrap();
        signup(&state, teacher("X1", None)).await.unwrap();

        // a student's credentials do not open the teacher account of the same id
        let result = authenticate(
            &state,
            Login::Teacher(TeacherLogin {
                teacher_id: Some("X1".into()),
                password: Some("hunter2hunter2".into()),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[actix_web::test]
    async fn bad_credentials() {
        let state = state().await;
        signup(&state, student("S100", "ada@example.edu")).await.unwrap();

        for (id, pwd) in [("S100", "wrong"), ("S999", "hunter2hunter2")] {
            let result = authenticate(
                &state,
                Login::Student(StudentLogin {
                    student_id: Some(id.into()),
                    password: Some(pwd.into()),
                }),
            )
            .await;
            assert!(matches!(result, Err(AppError::InvalidCredentials)));
        }

        let result = authenticate(&state, Login::Student(StudentLogin::default())).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[actix_web::test]
    async fn teacher_invite_code_is_enforced_when_configured() {
        let state = state_with_invite("staff-2025").await;
        assert!(matches!(
            signup(&state, teacher("T1", None)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            signup(&state, teacher("T1", Some("guess"))).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(signup(&state, teacher("T1", Some("staff-2025"))).await.is_ok());
    }
}
