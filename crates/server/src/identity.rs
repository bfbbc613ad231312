use axum::http::HeaderMap;

use fieldgate_core::domain::organization::OrganizationId;
use fieldgate_core::domain::request::UserId;
use fieldgate_core::errors::ApprovalError;

/// Authenticated caller, as established by the host platform's auth
/// middleware and forwarded in request headers. The core never
/// authenticates; it only refuses to act without an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerIdentity {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub display_name: String,
    pub role: Option<String>,
}

pub fn caller_identity(headers: &HeaderMap) -> Result<CallerIdentity, ApprovalError> {
    let organization_id = header_value(headers, "x-organization-id")?;
    let user_id = header_value(headers, "x-user-id")?;
    let display_name = optional_header_value(headers, "x-user-name")
        .unwrap_or_else(|| user_id.clone());
    let role = optional_header_value(headers, "x-user-role");

    Ok(CallerIdentity {
        organization_id: OrganizationId(organization_id),
        user_id: UserId(user_id),
        display_name,
        role,
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<String, ApprovalError> {
    optional_header_value(headers, name).ok_or(ApprovalError::Unauthorized)
}

fn optional_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
