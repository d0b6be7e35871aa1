use crate::api::error::AppError;
use crate::utils::auth::validate_jwt;
use crate::{AppState, entities::prelude::Users};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the bearer token to an existing user and exposes its `Claims`
/// to the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::Unauthenticated("Missing bearer token".to_string()))?;

    let claims = validate_jwt(token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthenticated("Invalid or expired token".to_string())
    })?;

    // Tokens outlive deleted accounts
    let user_exists = Users::find_by_id(claims.sub.clone())
        .one(&state.db)
        .await?
        .is_some();

    if !user_exists {
        return Err(AppError::Unauthenticated("Unknown user".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
