//! Access control list middleware.
//! This middleware can be placed on any route or service that sits behind the identity middleware.
//!
//! It reads the [`Identity`] that the identity middleware stored in the request extensions and checks it against the
//! required roles for the route. If the caller holds every required role, the request continues. Otherwise, a
//! 403 Forbidden response is returned.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use checkout_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{auth::Identity, errors::{AuthError, ServerError}};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let identity = req.extensions().get::<Identity>().cloned().ok_or_else(|| {
                warn!("💻️ No identity found in request extensions");
                ServerError::AuthenticationError(AuthError::MissingToken)
            })?;
            if required_roles.iter().all(|role| identity.has_role(*role)) {
                service.call(req).await
            } else {
                debug!("💻️ User {} lacks one of {required_roles:?} for {}", identity.user_id, req.path());
                Err(ServerError::InsufficientPermissions(format!("{:?} required", required_roles)).into())
            }
        })
    }
}
