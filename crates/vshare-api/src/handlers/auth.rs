//! Registration, login, and session handlers for both account kinds.

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use vshare_models::{AccountKind, OrgId, Organization, User};

use crate::auth::{self, current_user, AuthIdentity, TOKEN_COOKIE};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterOrganizationRequest {
    #[validate(length(min = 1, message = "Organization name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Organization code is required"))]
    pub org_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub address: Option<String>,
    #[validate(length(min = 1, message = "Mobile number is required"))]
    pub mobile: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginOrganizationRequest {
    pub org_code: String,
    pub password: String,
}

/// Client-visible user record, credential hash stripped.
#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub groups: Vec<String>,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            mobile_number: user.mobile_number.clone(),
            organization: user.organization.as_ref().map(|o| o.to_string()),
            groups: user.groups.iter().map(|g| g.to_string()).collect(),
        }
    }
}

/// Client-visible organization record.
#[derive(Debug, Serialize)]
pub struct OrgPublic {
    pub id: String,
    pub name: String,
    pub description: String,
    pub org_code: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub mobile: String,
}

impl From<&Organization> for OrgPublic {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id.to_string(),
            name: org.name.clone(),
            description: org.description.clone(),
            org_code: org.org_code.clone(),
            email: org.email.clone(),
            address: org.address.clone(),
            mobile: org.mobile.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct AuthUserResponse {
    pub message: String,
    pub user: UserPublic,
    pub token: String,
}

#[derive(Serialize)]
pub struct AuthOrgResponse {
    pub message: String,
    pub organization: OrgPublic,
    pub token: String,
}

// ============================================================================
// Cookies
// ============================================================================

fn session_cookie(token: &str, max_age_secs: u64) -> HeaderValue {
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        TOKEN_COOKIE, token, max_age_secs
    );
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new user account.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> ApiResult<Response> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    if request.password != request.confirm_password {
        return Err(ApiError::validation("Passwords do not match"));
    }

    if state.users.get_by_email(&request.email).await?.is_some()
        || state.users.get_by_username(&request.username).await?.is_some()
    {
        return Err(ApiError::conflict(
            "User with this email or username already exists",
        ));
    }

    let password_hash = auth::hash_password(&request.password)?;
    let mut user = User::new(request.name, request.username, request.email, password_hash);
    if let Some(org) = request.organization.filter(|o| !o.is_empty()) {
        user.organization = Some(OrgId::from(org));
    }
    user.mobile_number = request.mobile_number.filter(|m| !m.is_empty());

    state.users.create(&user).await?;

    let token = state.auth.issue(user.id.as_str(), AccountKind::User)?;
    let body = AuthUserResponse {
        message: "User registered successfully".to_string(),
        user: UserPublic::from(&user),
        token: token.clone(),
    };

    Ok((
        StatusCode::CREATED,
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.config.token_ttl.as_secs()),
        )],
        Json(body),
    )
        .into_response())
}

/// Register a new organization account.
pub async fn register_organization(
    State(state): State<AppState>,
    Json(request): Json<RegisterOrganizationRequest>,
) -> ApiResult<Response> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    if request.password != request.confirm_password {
        return Err(ApiError::validation("Passwords do not match"));
    }

    if state.orgs.get_by_email(&request.email).await?.is_some()
        || state.orgs.get_by_code(&request.org_code).await?.is_some()
    {
        return Err(ApiError::conflict(
            "Organization with this email or code already exists",
        ));
    }

    let password_hash = auth::hash_password(&request.password)?;
    let mut org = Organization::new(
        request.name,
        request.org_code,
        request.email,
        password_hash,
        request.mobile,
    );
    if let Some(description) = request.description {
        org.description = description;
    }
    org.address = request.address.filter(|a| !a.is_empty());

    state.orgs.create(&org).await?;

    let token = state.auth.issue(org.id.as_str(), AccountKind::Organization)?;
    let body = AuthOrgResponse {
        message: "Organization registered successfully".to_string(),
        organization: OrgPublic::from(&org),
        token: token.clone(),
    };

    Ok((
        StatusCode::CREATED,
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.config.token_ttl.as_secs()),
        )],
        Json(body),
    )
        .into_response())
}

/// Log a user in with email + password.
pub async fn login_user(
    State(state): State<AppState>,
    Json(request): Json<LoginUserRequest>,
) -> ApiResult<Response> {
    // One generic failure for unknown account and wrong password alike.
    let user = state
        .users
        .get_by_email(&request.email)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;

    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let token = state.auth.issue(user.id.as_str(), AccountKind::User)?;
    let body = AuthUserResponse {
        message: "Login successful".to_string(),
        user: UserPublic::from(&user),
        token: token.clone(),
    };

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.config.token_ttl.as_secs()),
        )],
        Json(body),
    )
        .into_response())
}

/// Log an organization in with org code + password.
pub async fn login_organization(
    State(state): State<AppState>,
    Json(request): Json<LoginOrganizationRequest>,
) -> ApiResult<Response> {
    let org = state
        .orgs
        .get_by_code(&request.org_code)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;

    if !auth::verify_password(&request.password, &org.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let token = state.auth.issue(org.id.as_str(), AccountKind::Organization)?;
    let body = AuthOrgResponse {
        message: "Login successful".to_string(),
        organization: OrgPublic::from(&org),
        token: token.clone(),
    };

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.config.token_ttl.as_secs()),
        )],
        Json(body),
    )
        .into_response())
}

#[derive(Serialize)]
#[serde(tag = "account_type", rename_all = "snake_case")]
pub enum MeResponse {
    User { data: UserPublic },
    Organization { data: OrgPublic },
}

/// Current account, user or organization.
pub async fn me(State(state): State<AppState>, identity: AuthIdentity) -> ApiResult<Json<MeResponse>> {
    match identity.kind {
        AccountKind::User => {
            let user = current_user(&state, &identity).await?;
            Ok(Json(MeResponse::User {
                data: UserPublic::from(&user),
            }))
        }
        AccountKind::Organization => {
            let org = state
                .orgs
                .get(&OrgId::from(identity.id.as_str()))
                .await?
                .ok_or_else(ApiError::invalid_token)?;
            Ok(Json(MeResponse::Organization {
                data: OrgPublic::from(&org),
            }))
        }
    }
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Clear the session cookie.
pub async fn logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_cookie())],
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
        .into_response()
}
