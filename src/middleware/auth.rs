//! Middleware de autenticación por token
//!
//! Extrae el bearer token, lo verifica con el `TokenVerifier` del estado e
//! inyecta el `AuthUser` en las extensions. Sin verificador configurado,
//! deja pasar todas las requests.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;
use crate::utils::errors::AppError;

/// Token del header `Authorization: Bearer ...`
pub fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(verifier) = state.verifier.clone() else {
        return Ok(next.run(request).await);
    };

    let token = bearer_token(&request)
        .ok_or_else(|| {
            AppError::Unauthorized(
                "Authentication required: send Authorization: Bearer {token}".to_string(),
            )
        })?
        .to_string();

    let user = verifier
        .verify(&token)
        .await
        .ok_or_else(|| AppError::Unauthorized("Token is invalid or expired".to_string()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
