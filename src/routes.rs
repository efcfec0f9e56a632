use actix_web::{
    get,
    http::{
        header::{ContentDisposition, DispositionParam, DispositionType},
        Method,
    },
    post, put,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde_json::json;

use crate::{
    accounts::{self, Login, Signup, StudentLogin, StudentSignup, TeacherLogin, TeacherSignup},
    errors::AppError,
    render,
    session::Identity,
    structs::LoginResponse,
    workflow::{self, SlipRequest},
    AppState,
};

/// Mounts the JSON API under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(format!("Invalid request body: {}", err)).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                AppError::Validation(format!("Invalid path: {}", err)).into()
            }))
            .service(health_handler)
            .service(student_signup_handler)
            .service(student_login_handler)
            .service(apply_handler)
            .service(student_slips_handler)
            .service(student_slip_document_handler)
            .service(student_slip_handler)
            .service(student_notifications_handler)
            .service(teacher_signup_handler)
            .service(teacher_login_handler)
            .service(pending_applications_handler)
            .service(approved_applications_handler)
            .service(approve_handler)
            .service(reject_handler),
    );
}

#[get("/health")]
pub async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "success": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn signup(state: &AppState, request: Signup) -> Result<HttpResponse, AppError> {
    let role = request.role();
    let account = accounts::signup(state, request).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!("{} created successfully", role.title()),
        "id": account.id,
    })))
}

async fn login(state: &AppState, request: Login) -> Result<HttpResponse, AppError> {
    let (issued, account) = accounts::authenticate(state, request).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        message: "Login successful".to_owned(),
        token: issued.token,
        profile: account.profile(),
        expires_at: issued.expires_at,
    }))
}

#[post("/students/signup")]
pub async fn student_signup_handler(
    state: Data<AppState>,
    web::Json(form): web::Json<StudentSignup>,
) -> Result<impl Responder, AppError> {
    signup(&state, Signup::Student(form)).await
}

#[post("/students/login")]
pub async fn student_login_handler(
    state: Data<AppState>,
    web::Json(form): web::Json<StudentLogin>,
) -> Result<impl Responder, AppError> {
    login(&state, Login::Student(form)).await
}

#[post("/teachers/signup")]
pub async fn teacher_signup_handler(
    state: Data<AppState>,
    web::Json(form): web::Json<TeacherSignup>,
) -> Result<impl Responder, AppError> {
    signup(&state, Signup::Teacher(form)).await
}

#[post("/teachers/login")]
pub async fn teacher_login_handler(
    state: Data<AppState>,
    web::Json(form): web::Json<TeacherLogin>,
) -> Result<impl Responder, AppError> {
    login(&state, Login::Teacher(form)).await
}

#[post("/students/apply")]
pub async fn apply_handler(
    identity: Identity,
    state: Data<AppState>,
    web::Json(form): web::Json<SlipRequest>,
) -> Result<impl Responder, AppError> {
    let id = workflow::submit(&state, &identity, form).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Permission slip submitted successfully",
        "id": id,
    })))
}

#[get("/students/slips")]
pub async fn student_slips_handler(
    identity: Identity,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let slips = workflow::list_own(&state, &identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "slips": slips })))
}

#[get("/students/slip/{id}")]
pub async fn student_slip_handler(
    identity: Identity,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let slip = workflow::fetch_for_download(&state, &identity, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "slip": slip })))
}

/// Printable document for an approved slip owned by the caller.
#[get("/students/slip/{id}/document")]
pub async fn student_slip_document_handler(
    identity: Identity,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let detail = workflow::fetch_for_download(&state, &identity, path.into_inner()).await?;
    let document = render::render(&detail)?;
    Ok(HttpResponse::Ok()
        .content_type(document.content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(document.file_name)],
        })
        .body(document.body))
}

#[get("/students/notifications")]
pub async fn student_notifications_handler(
    identity: Identity,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let notifications = workflow::list_notifications(&state, &identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "notifications": notifications })))
}

#[get("/teachers/applications/pending")]
pub async fn pending_applications_handler(
    identity: Identity,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let applications = workflow::list_pending(&state, &identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "applications": applications })))
}

#[get("/teachers/applications/approved")]
pub async fn approved_applications_handler(
    identity: Identity,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let applications = workflow::list_approved(&state, &identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "applications": applications })))
}

#[put("/teachers/applications/{id}/approve")]
pub async fn approve_handler(
    identity: Identity,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    workflow::approve(&state, &identity, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Application approved successfully",
    })))
}

#[put("/teachers/applications/{id}/reject")]
pub async fn reject_handler(
    identity: Identity,
    state: Data<AppState>,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    workflow::reject(&state, &identity, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Application rejected successfully",
    })))
}

pub async fn default_handler(req_method: Method) -> HttpResponse {
    match req_method {
        Method::GET => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "Route not found",
        })),
        _ => HttpResponse::MethodNotAllowed().json(json!({
            "success": false,
            "error": "Method not allowed",
        })),
    }
}
