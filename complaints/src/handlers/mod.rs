use actix_web::{get, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

pub mod complaint;

/// Envelope every successful response is wrapped in.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data,
        }
    }
}

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "http",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        complaint::get_complaints,
        complaint::get_summary,
        complaint::get_my_complaints,
        complaint::get_complaint,
        complaint::post_complaint,
        complaint::put_complaint_status,
        complaint::patch_complaint,
    ),
    components(schemas(
        crate::service::lifecycle::NewComplaint,
        crate::service::lifecycle::ComplaintChange,
        crate::service::complaint::PublicComplaint,
        crate::service::complaint::PublicLogEntry,
        crate::service::complaint::ComplaintSummary,
        crate::service::complaint::Location,
        complaint::StatusUpdateRequest,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

#[get("/api-doc/openapi.json")]
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
