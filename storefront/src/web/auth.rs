// storefront/src/web/auth.rs

//! Principal extraction. The auth provider terminates sessions in front of
//! this service and forwards the caller as headers.

use crate::errors::AppError;
use crate::models::{Principal, Role};
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";
pub const USER_NAME_HEADER: &str = "X-User-Name";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

fn header(req: &HttpRequest, name: &str) -> Option<String> {
  req
    .headers()
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_string)
}

pub fn principal_from_request(req: &HttpRequest) -> Result<Principal, AppError> {
  let (Some(id), Some(email)) = (header(req, USER_ID_HEADER), header(req, USER_EMAIL_HEADER)) else {
    warn!("request without an authenticated principal");
    return Err(AppError::Unauthorized("Sign in to continue".to_string()));
  };
  let role = match header(req, USER_ROLE_HEADER).as_deref().map(str::to_ascii_uppercase).as_deref() {
    None | Some("CUSTOMER") => Role::Customer,
    Some("ADMIN") => Role::Admin,
    Some(other) => {
      warn!(role = other, "unknown role header");
      return Err(AppError::Unauthorized("Unrecognised role".to_string()));
    }
  };
  Ok(Principal {
    id,
    email,
    name: header(req, USER_NAME_HEADER),
    role,
  })
}

impl FromRequest for Principal {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(principal_from_request(req))
  }
}

/// A principal with the ADMIN role.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

impl FromRequest for AdminPrincipal {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(principal_from_request(req).and_then(|p| {
      if p.is_admin() {
        Ok(AdminPrincipal(p))
      } else {
        warn!(user_id = %p.id, path = %req.path(), "non-admin hit an admin route");
        Err(AppError::Forbidden("Administrator access required".to_string()))
      }
    }))
  }
}
