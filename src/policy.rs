use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{auth::AuthUser, config::AppConfig, error::ApiError, models::Role, repository::RepositoryState};

/// Requirement
///
/// A single capability check evaluated against the requester before a handler mutates
/// anything. Handlers state what they need; the checks themselves live here only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The requester has this role.
    Role(Role),
    /// The requester is the owner of the resource. The string names the attempted
    /// action for the error message ("update", "delete").
    OwnerOf(Uuid, &'static str),
}

impl Requirement {
    fn denial(&self) -> ApiError {
        match self {
            Requirement::Role(Role::Owner) => {
                ApiError::Forbidden("Only owners can perform this action".into())
            }
            Requirement::Role(Role::Renter) => {
                ApiError::Forbidden("Only renters can perform this action".into())
            }
            Requirement::OwnerOf(_, action) => {
                ApiError::Forbidden(format!("You can only {action} your own items"))
            }
        }
    }
}

impl AuthUser {
    pub fn satisfies(&self, requirement: Requirement) -> bool {
        match requirement {
            Requirement::Role(role) => self.role == role,
            Requirement::OwnerOf(owner_id, _) => self.id == owner_id,
        }
    }

    /// Checks every requirement in order and fails on the first unmet one.
    pub fn require(&self, requirements: &[Requirement]) -> Result<(), ApiError> {
        match requirements.iter().find(|r| !self.satisfies(**r)) {
            Some(unmet) => {
                tracing::debug!(user_id = %self.id, requirement = ?unmet, "authorization denied");
                Err(unmet.denial())
            }
            None => Ok(()),
        }
    }
}

/// OwnerUser
///
/// An authenticated requester with role `owner`. Extracting it runs the role check
/// before the handler body.
#[derive(Debug, Clone)]
pub struct OwnerUser(pub AuthUser);

/// RenterUser
///
/// An authenticated requester with role `renter`.
#[derive(Debug, Clone)]
pub struct RenterUser(pub AuthUser);

async fn authorize<S>(parts: &mut Parts, state: &S, role: Role) -> Result<AuthUser, ApiError>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let user = AuthUser::from_request_parts(parts, state).await?;
    user.require(&[Requirement::Role(role)])?;
    Ok(user)
}

impl<S> FromRequestParts<S> for OwnerUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Role::Owner).await.map(OwnerUser)
    }
}

impl<S> FromRequestParts<S> for RenterUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Role::Renter).await.map(RenterUser)
    }
}
