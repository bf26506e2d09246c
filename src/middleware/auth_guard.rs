/// Authorization Guard Middleware
///
/// Validates the access token from the configured header and attaches the
/// caller's [`Identity`] to request extensions. Handlers read it back with
/// `web::ReqData<Identity>`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{authenticate, Identity};
use crate::configuration::AuthConfig;
use crate::error::AppError;

/// Guard for routes that require a valid access token
pub struct AuthGuard {
    config: web::Data<AuthConfig>,
}

impl AuthGuard {
    pub fn new(config: web::Data<AuthConfig>) -> Self {
        Self { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGuardService {
            service: Rc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct AuthGuardService<S> {
    service: Rc<S>,
    config: web::Data<AuthConfig>,
}

impl<S, B> Service<ServiceRequest> for AuthGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let now = chrono::Utc::now().timestamp();

        match authenticate(req.headers(), &self.config, now) {
            Ok(identity) => {
                tracing::debug!(
                    user_id = %identity.user_id,
                    user_type = %identity.user_type,
                    path = %req.path(),
                    "Token validated"
                );
                req.extensions_mut().insert::<Identity>(identity);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                // Logged once, when the error is rendered.
                let err: Error = AppError::Auth(e).into();
                Box::pin(async move { Err(err) })
            }
        }
    }
}
