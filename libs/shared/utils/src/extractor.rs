use axum::{body::Body, http::Request, middleware::Next, response::Response};

use shared_models::auth::User;
use shared_models::error::AppError;

// Middleware consuming the identity already resolved by the boundary layer.
// Credential and session handling live outside this core; the gateway is
// trusted to strip and re-set these headers on every request.
pub async fn identity_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();

    let id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| AppError::Auth("Missing resolved identity".to_string()))?;

    let email = headers
        .get("x-actor-email")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    request.extensions_mut().insert(User { id, email, role });

    Ok(next.run(request).await)
}

/// Role gate applied at every boundary operation of the back office.
pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrator role required".to_string(),
        ))
    }
}
