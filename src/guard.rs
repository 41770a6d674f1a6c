//! Route-level enforcement.
//!
//! [`RequirePermission`] is a tower layer applied per route
//! (`Router::route_layer`). It runs strictly before the handler: a request
//! missing an authenticated [`Principal`] is rejected with 401, a request
//! whose role fails the declared permission check is rejected with 403, and
//! neither rejection reaches business logic. On success the role's resolved
//! permission set is attached to the request as [`GrantedPermissions`] for
//! handler-level contextual checks and UI-hint payloads.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use axum::async_trait;
use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::errors::AuthzError;
use crate::evaluator::PermissionEvaluator;
use crate::permission::Permission;
use crate::principal::Principal;

/// Enforcement mode for the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzMode {
    /// No permission checks (development mode).
    Off,
    /// Log denials but let requests through (rollout mode).
    Advisory,
    /// Reject denied requests. The default.
    Strict,
}

impl AuthzMode {
    /// Resolve the mode from `AUTHZ_MODE`, read once per process.
    /// Anything other than `off`/`advisory` means strict.
    pub fn from_env() -> Self {
        static MODE: OnceLock<AuthzMode> = OnceLock::new();
        *MODE.get_or_init(|| {
            match std::env::var("AUTHZ_MODE").unwrap_or_default().to_lowercase().as_str() {
                "off" => AuthzMode::Off,
                "advisory" => AuthzMode::Advisory,
                _ => AuthzMode::Strict,
            }
        })
    }
}

/// The role-level permission set resolved by the guard, attached to the
/// request for downstream code. Advisory toward clients; handlers still run
/// contextual checks before ownership-scoped mutations.
#[derive(Debug, Clone)]
pub struct GrantedPermissions(pub HashSet<Permission>);

impl GrantedPermissions {
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for GrantedPermissions
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<GrantedPermissions>().cloned().ok_or_else(|| {
            AuthzError::misconfiguration("permission guard not applied to this route")
        })
    }
}

/// Declared requirement for a route, mirroring the evaluator's query forms.
#[derive(Debug, Clone)]
enum PermissionCheck {
    Single(Permission),
    Any(Vec<Permission>),
    All(Vec<Permission>),
}

impl PermissionCheck {
    fn evaluate(&self, evaluator: &PermissionEvaluator, principal: &Principal) -> bool {
        match self {
            PermissionCheck::Single(permission) => {
                evaluator.has_permission(principal.role, *permission)
            }
            PermissionCheck::Any(permissions) => evaluator.has_any(principal.role, permissions),
            PermissionCheck::All(permissions) => evaluator.has_all(principal.role, permissions),
        }
    }
}

impl std::fmt::Display for PermissionCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |permissions: &[Permission]| {
            permissions
                .iter()
                .map(Permission::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            PermissionCheck::Single(permission) => f.write_str(permission.as_str()),
            PermissionCheck::Any(permissions) => write!(f, "any of [{}]", join(permissions)),
            PermissionCheck::All(permissions) => write!(f, "all of [{}]", join(permissions)),
        }
    }
}

/// Route layer rejecting requests that lack a declared permission.
///
/// ```ignore
/// let authz = Arc::new(PermissionEvaluator::default());
///
/// Router::new()
///     .route("/bookings/:id", delete(cancel_booking))
///     .route_layer(RequirePermission::new(authz.clone(), Permission::CancelBooking));
/// ```
#[derive(Clone)]
pub struct RequirePermission {
    evaluator: Arc<PermissionEvaluator>,
    check: Arc<PermissionCheck>,
    mode: AuthzMode,
}

impl RequirePermission {
    /// Require a single permission.
    pub fn new(evaluator: Arc<PermissionEvaluator>, permission: Permission) -> Self {
        Self::with_check(evaluator, PermissionCheck::Single(permission))
    }

    /// Require at least one of `permissions`.
    pub fn any(
        evaluator: Arc<PermissionEvaluator>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self::with_check(evaluator, PermissionCheck::Any(permissions.into_iter().collect()))
    }

    /// Require every one of `permissions`.
    pub fn all(
        evaluator: Arc<PermissionEvaluator>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self::with_check(evaluator, PermissionCheck::All(permissions.into_iter().collect()))
    }

    pub fn with_mode(mut self, mode: AuthzMode) -> Self {
        self.mode = mode;
        self
    }

    fn with_check(evaluator: Arc<PermissionEvaluator>, check: PermissionCheck) -> Self {
        Self {
            evaluator,
            check: Arc::new(check),
            mode: AuthzMode::Strict,
        }
    }
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionService {
            inner,
            evaluator: self.evaluator.clone(),
            check: self.check.clone(),
            mode: self.mode,
        }
    }
}

#[derive(Clone)]
pub struct RequirePermissionService<S> {
    inner: S,
    evaluator: Arc<PermissionEvaluator>,
    check: Arc<PermissionCheck>,
    mode: AuthzMode,
}

impl<S> RequirePermissionService<S> {
    fn attach_grants(&self, req: &mut Request<Body>, principal: &Principal) {
        let granted = GrantedPermissions(self.evaluator.permissions_for_role(principal.role).clone());
        req.extensions_mut().insert(granted);
    }
}

impl<S> Service<Request<Body>> for RequirePermissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = RequirePermissionFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        if self.mode == AuthzMode::Off {
            if let Some(principal) = req.extensions().get::<Principal>().cloned() {
                self.attach_grants(&mut req, &principal);
            }
            return RequirePermissionFuture::Inner {
                fut: self.inner.call(req),
            };
        }

        let Some(principal) = req.extensions().get::<Principal>().cloned() else {
            tracing::debug!(check = %self.check, "permission check skipped: not authenticated");
            if self.mode == AuthzMode::Advisory {
                return RequirePermissionFuture::Inner {
                    fut: self.inner.call(req),
                };
            }
            return RequirePermissionFuture::Rejected {
                resp: Some(AuthzError::unauthorized("authentication required").into_response()),
            };
        };

        if !self.check.evaluate(&self.evaluator, &principal) {
            tracing::info!(
                user_id = %principal.id,
                role = %principal.role,
                check = %self.check,
                advisory = (self.mode == AuthzMode::Advisory),
                "permission denied"
            );
            if self.mode == AuthzMode::Strict {
                return RequirePermissionFuture::Rejected {
                    resp: Some(AuthzError::forbidden("insufficient permissions").into_response()),
                };
            }
        } else {
            tracing::debug!(
                user_id = %principal.id,
                role = %principal.role,
                check = %self.check,
                "permission granted"
            );
        }

        self.attach_grants(&mut req, &principal);
        RequirePermissionFuture::Inner {
            fut: self.inner.call(req),
        }
    }
}

pin_project! {
    /// Future for [`RequirePermissionService`].
    #[project = RequirePermissionFutureProj]
    pub enum RequirePermissionFuture<F> {
        Inner { #[pin] fut: F },
        Rejected { resp: Option<Response> },
    }
}

impl<F, E> Future for RequirePermissionFuture<F>
where
    F: Future<Output = Result<Response, E>>,
{
    type Output = Result<Response, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            RequirePermissionFutureProj::Inner { fut } => fut.poll(cx),
            RequirePermissionFutureProj::Rejected { resp } => {
                Poll::Ready(Ok(resp.take().expect("polled after completion")))
            }
        }
    }
}
