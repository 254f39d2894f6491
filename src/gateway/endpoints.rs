//! Typed wrappers for every backend operation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, TransportError};
use crate::gateway::client::{ApiResult, Gateway};
use crate::gateway::transport::ApiRequest;
use crate::models::admin::AdminStatus;
use crate::models::design::DesignStyle;
use crate::models::generation::{GenerateBody, GenerationRequest, SubmitResponse};
use crate::models::job::JobStatus;
use crate::models::plan::{Plan, PlanId};
use crate::models::user::User;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /user/{id}` and `POST /user/{id}/plan`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub user: User,
    /// The resolved definition of the user's plan, when the backend sends it.
    #[serde(default)]
    pub plan: Option<Plan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlansResponse {
    pub plans: HashMap<String, Plan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DesignsResponse {
    pub designs: Vec<DesignStyle>,
}

/// `POST /admin/activate` and `GET /admin/status/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminStatusResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub admin_status: Option<AdminStatus>,
}

#[derive(Serialize)]
struct PlanUpdate {
    plan: PlanId,
}

#[derive(Serialize)]
struct AdminActivation<'a> {
    user_id: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AdminDeactivation<'a> {
    user_id: &'a str,
}

fn encode<T: Serialize>(body: &T) -> ApiResult<Vec<u8>> {
    sonic_rs::to_vec(body).map_err(|e| GatewayError {
        attempts: 0,
        last_error: TransportError::Decode(e.to_string()),
    })
}

impl Gateway {
    pub async fn health(&self) -> ApiResult<HealthResponse> {
        self.call_json(ApiRequest::get("/health")).await
    }

    pub async fn get_user(&self, user_id: &str) -> ApiResult<UserPayload> {
        self.call_json(ApiRequest::get(format!("/user/{}", user_id)))
            .await
    }

    pub async fn update_plan(&self, user_id: &str, plan: PlanId) -> ApiResult<UserPayload> {
        let body = encode(&PlanUpdate { plan })?;
        self.call_json(ApiRequest::post(format!("/user/{}/plan", user_id), body))
            .await
    }

    pub async fn list_plans(&self) -> ApiResult<PlansResponse> {
        self.call_json(ApiRequest::get("/plans")).await
    }

    pub async fn list_designs(&self) -> ApiResult<DesignsResponse> {
        self.call_json(ApiRequest::get("/designs")).await
    }

    pub async fn submit_generation(
        &self,
        user_id: &str,
        request: &GenerationRequest,
    ) -> ApiResult<SubmitResponse> {
        let body = encode(&GenerateBody::new(user_id, request))?;
        self.call_json(ApiRequest::post("/generate", body)).await
    }

    pub async fn job_status(&self, job_id: &str) -> ApiResult<JobStatus> {
        self.call_json(ApiRequest::get(format!("/job/{}", job_id)))
            .await
    }

    pub async fn activate_admin(
        &self,
        user_id: &str,
        password: &str,
    ) -> ApiResult<AdminStatusResponse> {
        let body = encode(&AdminActivation { user_id, password })?;
        self.call_json(ApiRequest::post("/admin/activate", body))
            .await
    }

    pub async fn admin_status(&self, user_id: &str) -> ApiResult<AdminStatusResponse> {
        self.call_json(ApiRequest::get(format!("/admin/status/{}", user_id)))
            .await
    }

    pub async fn deactivate_admin(&self, user_id: &str) -> ApiResult<sonic_rs::Value> {
        let body = encode(&AdminDeactivation { user_id })?;
        self.call(ApiRequest::post("/admin/deactivate", body)).await
    }
}

/// Turns the backend's download path into an absolute URL.
///
/// Paths are resolved against the origin of `api_base_url`, so
/// `http://host:5000/api` + `/api/download/j1` gives
/// `http://host:5000/api/download/j1`. Absolute URLs pass through.
pub fn resolve_download_url(api_base_url: &str, download_url: &str) -> String {
    if download_url.starts_with("http://") || download_url.starts_with("https://") {
        return download_url.to_string();
    }

    let origin = match api_base_url.find("://") {
        Some(scheme_end) => {
            let host_start = scheme_end + 3;
            match api_base_url[host_start..].find('/') {
                Some(path_start) => &api_base_url[..host_start + path_start],
                None => api_base_url,
            }
        }
        None => api_base_url.trim_end_matches('/'),
    };

    if download_url.starts_with('/') {
        format!("{}{}", origin, download_url)
    } else {
        format!("{}/{}", origin, download_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_resolves_against_origin() {
        assert_eq!(
            resolve_download_url("http://127.0.0.1:5000/api", "/api/download/j1"),
            "http://127.0.0.1:5000/api/download/j1"
        );
        assert_eq!(
            resolve_download_url("https://decks.example.com", "/api/download/j1"),
            "https://decks.example.com/api/download/j1"
        );
        assert_eq!(
            resolve_download_url("http://127.0.0.1:5000/api", "https://cdn.example.com/d.pptx"),
            "https://cdn.example.com/d.pptx"
        );
    }

    #[test]
    fn activation_without_admin_status_parses() {
        let body = r#"{"success": true, "message": "Admin mode activated", "user_id": "u"}"#;
        let response: AdminStatusResponse = sonic_rs::from_str(body).unwrap();
        assert_eq!(response.success, Some(true));
        assert!(response.admin_status.is_none());
    }
}
