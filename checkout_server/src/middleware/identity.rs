//! Identity middleware.
//!
//! Verifies the bearer token on every request that passes through it and stores the caller's [`Identity`] in the
//! request extensions. Requests without a valid token are turned away with a 401 before they reach a handler.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{bearer_token, TokenVerifier},
    errors::ServerError,
};

pub struct IdentityMiddlewareFactory {
    verifier: TokenVerifier,
}

impl IdentityMiddlewareFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IdentityMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(IdentityMiddlewareService { verifier: Rc::new(self.verifier.clone()), service: Rc::new(service) })
    }
}

pub struct IdentityMiddlewareService<S> {
    verifier: Rc<TokenVerifier>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
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
        let verifier = Rc::clone(&self.verifier);
        Box::pin(async move {
            let identity = bearer_token(req.request()).and_then(|token| verifier.verify(token)).map_err(|e| {
                debug!("💻️ Rejecting request to {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}
