use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }
}

/// Caller identity forwarded by the authenticating gateway. Verification of
/// the credential itself happens upstream; this service only consumes the
/// resolved identity headers.
pub struct AuthUser {
    pub user_id: u64,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user_id = match req
            .headers()
            .get("X-User-Id")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.parse::<u64>().ok())
        {
            Some(id) => id,
            None => return ready(Err(ErrorUnauthorized("Missing user identity"))),
        };

        let role = match req
            .headers()
            .get("X-User-Role")
            .and_then(|h| h.to_str().ok())
            .and_then(Role::from_header)
        {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser { user_id, role }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }
}
