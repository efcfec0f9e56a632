use tera::{Context, Tera};

use crate::{
    errors::AppError,
    structs::{SlipDetail, SlipStatus},
};

pub const INSTITUTION: &str = "Northern University of Bangladesh";
const SLIP_TEMPLATE: &str = "permission_slip.html";

lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_template(
            SLIP_TEMPLATE,
            include_str!("../templates/permission_slip.html"),
        ) {
            log::error!("Parsing error(s): {}", e);
            ::std::process::exit(1);
        }
        tera.autoescape_on(vec![".html"]);
        tera
    };
}

/// A rendered, printable slip.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Renders an approved slip. Anything not approved is refused here, whatever
/// the caller has already checked.
pub fn render(detail: &SlipDetail) -> Result<Document, AppError> {
    if detail.slip.status != SlipStatus::Approved {
        log::warn!(
            "Refusing to render slip #{} in state {}",
            detail.slip.id,
            detail.slip.status
        );
        return Err(AppError::Forbidden(
            "Permission slip has not been approved".to_owned(),
        ));
    }

    let mut context = Context::new();
    context.insert("institution", INSTITUTION);
    context.insert("slip", &detail.slip);
    context.insert("student_external_id", &detail.student_external_id);
    context.insert("due_amount", &format!("{:.2}", detail.slip.due_amount));
    context.insert("approved_on", date_part(&detail.slip.updated_at));

    let body = TEMPLATES.render(SLIP_TEMPLATE, &context).map_err(|e| {
        log::error!("Failed to render template: {}", e);
        AppError::TemplateError(e)
    })?;

    Ok(Document {
        file_name: format!("permission-slip-{}.html", detail.slip.id),
        content_type: "text/html; charset=utf-8",
        body,
    })
}

fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}
