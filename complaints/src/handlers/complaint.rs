use actix_web::{
    get, patch, post, put,
    web::{self, Json},
    HttpResponse,
};
use common::{
    context::Context, geo::Coordinates, retry::retry_operation,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ApiResponse;
use crate::{
    error::Result,
    service::{
        complaint::{ComplaintService, ComplaintSummary, Location, PublicComplaint, StatusFilter},
        lifecycle::{ComplaintChange, NewComplaint, StatusUpdate},
        position::ReportedPosition,
    },
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    #[schema(example = "completed")]
    pub status: String,
    #[serde(default)]
    pub description: String,
    /// Base64 data URL of the work done.
    pub after_photo: Option<String>,
    /// Where the updater is standing.
    pub location: Option<Location>,
}

/// Newest first. Timestamps share one RFC 3339 layout, so they order as text.
fn newest_first(mut complaints: Vec<PublicComplaint>) -> Vec<PublicComplaint> {
    complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    complaints
}

impl StatusUpdateRequest {
    fn into_parts(self) -> Result<(StatusUpdate, ReportedPosition)> {
        let update = StatusUpdate {
            status: self.status.parse()?,
            description: self.description,
            after_photo: self.after_photo,
        };
        Ok((update, ReportedPosition(self.location.map(Coordinates::from))))
    }
}

#[utoipa::path(
    params(
        ("status" = Option<String>, Query, description = "all, active, solved or a single status"),
    ),
    responses(
        (status = 200, body = [PublicComplaint])
    )
)]
#[get("/api/complaints")]
pub async fn get_complaints(
    context: Context,
    query: web::Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<PublicComplaint>>>> {
    let filter: StatusFilter = query.status.as_deref().unwrap_or_default().parse()?;
    let complaints = ComplaintService::new(context).list(filter).await?;
    Ok(Json(ApiResponse::new(newest_first(complaints))))
}

#[utoipa::path(
    responses(
        (status = 200, body = ComplaintSummary)
    )
)]
#[get("/api/complaints/summary")]
pub async fn get_summary(context: Context) -> Result<Json<ApiResponse<ComplaintSummary>>> {
    Ok(Json(ApiResponse::new(
        ComplaintService::new(context).summary().await?,
    )))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header,  description = "Bearer token"),
    ),
    responses(
        (status = 200, body = [PublicComplaint])
    )
)]
#[get("/api/complaints/mine")]
pub async fn get_my_complaints(
    context: Context,
) -> Result<Json<ApiResponse<Vec<PublicComplaint>>>> {
    let complaints = ComplaintService::new(context).mine().await?;
    Ok(Json(ApiResponse::new(newest_first(complaints))))
}

#[utoipa::path(
    params(
        ("id" = String, Path, description = "Complaint id"),
    ),
    responses(
        (status = 200, body = PublicComplaint),
        (status = 404, description = "Complaint not found")
    )
)]
#[get("/api/complaints/{id}")]
pub async fn get_complaint(
    context: Context,
    id: web::Path<String>,
) -> Result<Json<ApiResponse<PublicComplaint>>> {
    Ok(Json(ApiResponse::new(
        ComplaintService::new(context).find(&id).await?,
    )))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header,  description = "Bearer token"),
    ),
    request_body(
        content = NewComplaint
    ),
    responses(
        (status = 201, body = PublicComplaint)
    )
)]
#[post("/api/complaints")]
pub async fn post_complaint(
    context: Context,
    Json(data): Json<NewComplaint>,
) -> Result<HttpResponse> {
    let complaint = ComplaintService::new(context).create(data).await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        complaint,
        "Complaint created successfully",
    )))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header,  description = "Bearer token"),
        ("id" = String, Path, description = "Complaint id"),
    ),
    request_body(
        content = StatusUpdateRequest
    ),
    responses(
        (status = 200, body = PublicComplaint),
        (status = 400, description = "Missing description, photo or position, or too far from the site")
    )
)]
#[put("/api/complaints/{id}/status")]
pub async fn put_complaint_status(
    context: Context,
    id: web::Path<String>,
    Json(data): Json<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<PublicComplaint>>> {
    let id = id.into_inner();
    let (update, position) = data.into_parts()?;
    let service = ComplaintService::new(context);

    let complaint =
        retry_operation(|| service.update_status(&id, update.clone(), &position)).await?;
    Ok(Json(ApiResponse::with_message(
        complaint,
        "Status updated successfully",
    )))
}

#[utoipa::path(
    params(
        ("Authorization" = String, Header,  description = "Bearer token"),
        ("id" = String, Path, description = "Complaint id"),
    ),
    request_body(
        content = ComplaintChange
    ),
    responses(
        (status = 200, body = PublicComplaint),
        (status = 403, description = "Caller did not file the complaint")
    )
)]
#[patch("/api/complaints/{id}")]
pub async fn patch_complaint(
    context: Context,
    id: web::Path<String>,
    Json(data): Json<ComplaintChange>,
) -> Result<Json<ApiResponse<PublicComplaint>>> {
    let id = id.into_inner();
    let service = ComplaintService::new(context);

    let complaint = retry_operation(|| service.edit(&id, data.clone())).await?;
    Ok(Json(ApiResponse::with_message(
        complaint,
        "Complaint updated successfully",
    )))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        body::MessageBody,
        dev::{Service, ServiceResponse},
        http::StatusCode,
        test::{self, init_service, TestRequest},
    };
    use common::{
        auth_session::TestSessionManager,
        entities::{actor::Actor, complaint::Priority},
    };
    use mongodb::bson::oid::ObjectId;
    use serde::de::DeserializeOwned;
    use serde_json::Value;

    use super::*;
    use crate::{create_test_app, service::lifecycle::LifecycleSettings};

    const CREATOR: &str = "asha-token";
    const OFFICER: &str = "ravi-token";
    const PHOTO: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

    fn sessions() -> TestSessionManager {
        TestSessionManager::new()
            .with_user(CREATOR, Actor::new(ObjectId::new(), "asha"))
            .with_user(OFFICER, Actor::new(ObjectId::new(), "ravi"))
    }

    fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    async fn send<S, R, B, T>(app: &S, req: R) -> (StatusCode, T)
    where
        S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
        T: DeserializeOwned,
    {
        let res = test::call_service(app, req).await;
        let status = res.status();
        (status, test::read_body_json(res).await)
    }

    fn new_complaint() -> NewComplaint {
        NewComplaint {
            category: "Pothole".to_string(),
            description: "Deep pothole near the bus stop".to_string(),
            priority: Priority::High,
            address: "MG Road".to_string(),
            latitude: Some(19.0760),
            longitude: Some(72.8777),
            image: None,
        }
    }

    fn status_update(location: Option<Location>, after_photo: Option<&str>) -> StatusUpdateRequest {
        StatusUpdateRequest {
            status: "completed".to_string(),
            description: "fixed".to_string(),
            after_photo: after_photo.map(str::to_string),
            location,
        }
    }

    fn nearby() -> Option<Location> {
        Some(Location {
            lat: 19.0760,
            lng: 72.8780,
        })
    }

    fn far_away() -> Option<Location> {
        Some(Location {
            lat: 19.10,
            lng: 72.90,
        })
    }

    async fn created<S, R, B>(app: &S, req: R) -> PublicComplaint
    where
        S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let (status, body): (_, ApiResponse<PublicComplaint>) = send(app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        body.data
    }

    fn post(token: &str) -> TestRequest {
        TestRequest::post()
            .uri("/api/complaints")
            .insert_header(bearer(token))
            .set_json(&new_complaint())
    }

    #[actix_web::test]
    async fn nearby_update_closes_the_complaint() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let complaint = created(&app, post(CREATOR).to_request()).await;
        assert_eq!(complaint.update_log.len(), 1);

        let req = TestRequest::put()
            .uri(&format!("/api/complaints/{}/status", complaint.id))
            .insert_header(bearer(OFFICER))
            .set_json(&status_update(nearby(), Some(PHOTO)))
            .to_request();
        let (status, body): (_, ApiResponse<PublicComplaint>) = send(&app, req).await;

        assert_eq!(status, StatusCode::OK);
        let updated = body.data;
        assert_eq!(updated.status, "completed");
        assert_eq!(updated.update_log.len(), 2);
        let entry = &updated.update_log[1];
        assert_eq!(entry.action, "Status Updated to Completed");
        assert_eq!(entry.description, "fixed");
        assert_eq!(entry.distance_from_original.as_deref(), Some("0.032 km"));
        assert_eq!(updated.resolved_by.as_deref(), Some("ravi"));
        assert!(updated.resolved_at.is_some());
        assert_eq!(updated.completion_photo.as_deref(), Some(PHOTO));
    }

    #[actix_web::test]
    async fn far_update_is_refused_and_changes_nothing() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let complaint = created(&app, post(CREATOR).to_request()).await;

        let req = TestRequest::put()
            .uri(&format!("/api/complaints/{}/status", complaint.id))
            .insert_header(bearer(OFFICER))
            .set_json(&status_update(far_away(), Some(PHOTO)))
            .to_request();
        let (status, body): (_, Value) = send(&app, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "TooFar");
        let distance = body["distanceKm"].as_f64().unwrap();
        assert!((3.5..=3.6).contains(&distance), "{distance}");

        let req = TestRequest::get()
            .uri(&format!("/api/complaints/{}", complaint.id))
            .to_request();
        let (_, body): (_, ApiResponse<PublicComplaint>) = send(&app, req).await;
        assert_eq!(body.data.status, "pending");
        assert_eq!(body.data.update_log.len(), 1);
        assert!(body.data.resolved_at.is_none());
    }

    #[actix_web::test]
    async fn photo_is_checked_before_position() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let complaint = created(&app, post(CREATOR).to_request()).await;

        let req = TestRequest::put()
            .uri(&format!("/api/complaints/{}/status", complaint.id))
            .insert_header(bearer(OFFICER))
            .set_json(&status_update(None, None))
            .to_request();
        let (status, body): (_, Value) = send(&app, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "MissingEvidence");
    }

    #[actix_web::test]
    async fn unknown_status_is_a_typed_error() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let complaint = created(&app, post(CREATOR).to_request()).await;

        let req = TestRequest::put()
            .uri(&format!("/api/complaints/{}/status", complaint.id))
            .insert_header(bearer(OFFICER))
            .set_json(&serde_json::json!({
                "status": "closed",
                "description": "fixed",
                "afterPhoto": PHOTO,
                "location": {"lat": 19.0760, "lng": 72.8780},
            }))
            .to_request();
        let (status, body): (_, Value) = send(&app, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "UnknownStatus");
    }

    #[actix_web::test]
    async fn malformed_body_is_a_typed_error() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let req = TestRequest::post()
            .uri("/api/complaints")
            .insert_header(bearer(CREATOR))
            .set_json(&serde_json::json!({
                "category": "Pothole",
                "description": "Deep pothole",
                "priority": "Urgent",
                "address": "MG Road",
            }))
            .to_request();
        let (status, body): (_, Value) = send(&app, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "InvalidBody");
    }

    #[actix_web::test]
    async fn only_the_creator_may_edit() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let complaint = created(&app, post(CREATOR).to_request()).await;
        let change = ComplaintChange {
            description: Some("Pothole is getting bigger".to_string()),
            ..ComplaintChange::default()
        };

        let req = TestRequest::patch()
            .uri(&format!("/api/complaints/{}", complaint.id))
            .insert_header(bearer(OFFICER))
            .set_json(&change)
            .to_request();
        let (status, body): (_, Value) = send(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "Forbidden");

        let req = TestRequest::get()
            .uri(&format!("/api/complaints/{}", complaint.id))
            .to_request();
        let (_, body): (_, ApiResponse<PublicComplaint>) = send(&app, req).await;
        assert_eq!(body.data.description, complaint.description);
        assert_eq!(body.data.update_log.len(), 1);

        let req = TestRequest::patch()
            .uri(&format!("/api/complaints/{}", complaint.id))
            .insert_header(bearer(CREATOR))
            .set_json(&change)
            .to_request();
        let (status, body): (_, ApiResponse<PublicComplaint>) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.description, "Pothole is getting bigger");
        assert_eq!(body.data.update_log.len(), 2);
        assert_eq!(body.data.update_log[1].action, "Complaint Edited");
    }

    #[actix_web::test]
    async fn anonymous_requests_are_unauthorized() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let req = TestRequest::post()
            .uri("/api/complaints")
            .set_json(&new_complaint())
            .to_request();
        let (status, body): (_, Value) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "Unauthorized");
    }

    #[actix_web::test]
    async fn listing_routes() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let first = created(&app, post(CREATOR).to_request()).await;
        let second = created(&app, post(OFFICER).to_request()).await;

        let req = TestRequest::get().uri("/api/complaints").to_request();
        let (_, body): (_, ApiResponse<Vec<PublicComplaint>>) = send(&app, req).await;
        assert_eq!(body.data.len(), 2);
        assert!(body.data[0].created_at >= body.data[1].created_at);

        let req = TestRequest::get()
            .uri("/api/complaints/mine")
            .insert_header(bearer(OFFICER))
            .to_request();
        let (_, body): (_, ApiResponse<Vec<PublicComplaint>>) = send(&app, req).await;
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0].id, second.id);
        assert_ne!(body.data[0].id, first.id);

        let req = TestRequest::get().uri("/api/complaints/summary").to_request();
        let (status, body): (_, ApiResponse<ComplaintSummary>) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!((body.data.total, body.data.active, body.data.solved), (2, 2, 0));

        let req = TestRequest::get()
            .uri("/api/complaints?status=closed")
            .to_request();
        let (status, body): (_, Value) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "UnknownStatus");
    }

    #[actix_web::test]
    async fn openapi_document_is_served() {
        let app = init_service(create_test_app(sessions(), LifecycleSettings::default())).await;
        let req = TestRequest::get().uri("/api-doc/openapi.json").to_request();
        let (status, body): (_, Value) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/complaints/{id}/status"]["put"].is_object());
    }
}
