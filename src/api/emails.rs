//! Transactional email endpoints: delivery notifications and the
//! contact form relay.

use crate::api::AppState;
use crate::config::DEFAULT_FROM_ADDRESS;
use crate::email::{templates, EmailMessage};
use crate::error::AppError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub template_type: Option<String>,
    #[serde(default)]
    pub data: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// POST /send-email
///
/// Called by the fulfillment pipeline once portraits are generated.
/// template_type selects a server-side template; anything else falls
/// back to raw HTML provided in data.
pub async fn send_email(
    State(state): State<AppState>,
    Json(body): Json<SendEmailRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let to = body.to.ok_or_else(|| AppError::missing_field("to"))?;
    let subject = body
        .subject
        .ok_or_else(|| AppError::missing_field("subject"))?;
    let template_type = body
        .template_type
        .ok_or_else(|| AppError::missing_field("template_type"))?;

    let html = if template_type == "download_ready" {
        let order_id = body.data["orderId"].as_str().unwrap_or_default();
        let package_name = body.data["packageName"].as_str().unwrap_or_default();
        let download_links: Vec<String> = body.data["downloadLinks"]
            .as_array()
            .map(|links| {
                links
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        templates::download_ready(order_id, package_name, &download_links)
    } else {
        body.data["html"]
            .as_str()
            .unwrap_or("<p>No content provided</p>")
            .to_string()
    };

    let id = state
        .mailer
        .send(EmailMessage {
            from: state.admin_email.clone(),
            to: to.clone(),
            reply_to: None,
            subject,
            html,
        })
        .await
        .map_err(AppError::from)?;

    info!(to = %to, template_type = %template_type, "email sent");

    Ok(Json(json!({ "success": true, "id": id })))
}

/// POST /contact
///
/// Relays a visitor message to the admin inbox. Refuses to run against
/// the placeholder sender address so form submissions are never silently
/// dropped into an unread mailbox.
pub async fn contact(
    State(state): State<AppState>,
    Json(body): Json<ContactRequest>,
) -> Response {
    let (name, email, subject, message) =
        match (body.name, body.email, body.subject, body.message) {
            (Some(n), Some(e), Some(s), Some(m)) => (n, e, s, m),
            _ => {
                return AppError::missing_field("name, email, subject, message").into_response();
            }
        };

    if state.admin_email.is_empty() || state.admin_email == DEFAULT_FROM_ADDRESS {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Contact form is not configured" })),
        )
            .into_response();
    }

    let html = templates::contact_form(&name, &email, &subject, &message);

    let result = state
        .mailer
        .send(EmailMessage {
            from: state.admin_email.clone(),
            to: state.admin_email.clone(),
            reply_to: Some(email),
            subject: format!("[VignetteLab Contact] {}", subject),
            html,
        })
        .await;

    match result {
        Ok(_) => Json(json!({ "success": true })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
