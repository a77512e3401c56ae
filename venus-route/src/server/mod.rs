use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::Path;
use axum::extract::rejection::PathRejection;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter, on};
use http::{StatusCode, Uri};
use tracing::{debug, error, info, warn};

use crate::bind::RequestParts;
use crate::meta::{RouteDescriptor, Service, ServiceDescription, resolve};
use crate::method::{Handler, Reply};
use crate::{BindingError, Channel, Context, ErrorResp, WiringError};

/// Largest request body a bound method will read.
pub const MAX_BODY: usize = 16 * 1024 * 1024;

/// One router entry derived from a route descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedRoute {
    pub name: &'static str,
    pub verb: http::Method,
    /// Path template in `/:Name` form.
    pub path: String,
    /// Set for the static-prefix entry of a dynamic route.
    pub alias: bool,
}

/// Orders routes the way they are registered: longest static prefix first,
/// canonical paths before the aliases of dynamic ones. An alias that would
/// shadow an earlier entry is dropped.
pub fn plan(desc: &ServiceDescription) -> Result<Vec<PlannedRoute>, WiringError> {
    plan_routes(desc.routes())
}

fn plan_routes(
    routes: &[Arc<RouteDescriptor>],
) -> Result<Vec<PlannedRoute>, WiringError> {
    let mut sorted: Vec<&RouteDescriptor> = routes.iter().map(Arc::as_ref).collect();
    sorted.sort_by(|a, b| b.static_path().len().cmp(&a.static_path().len()));

    let mut seen = HashSet::new();
    let mut params: HashMap<&str, &str> = HashMap::new();
    let mut planned = Vec::with_capacity(sorted.len() * 2);
    for route in &sorted {
        let template = template(&route.path);
        if let Some(param) = route.dynamic_param() {
            match params.get(template) {
                Some(first) if *first != param => {
                    return Err(WiringError::ConflictingParam {
                        path: route.static_path().to_string(),
                        first: first.to_string(),
                        second: param.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    params.insert(template, param);
                }
            }
        }
        if !seen.insert((route.method.clone(), template.to_string())) {
            return Err(WiringError::DuplicateRoute {
                verb: route.method.clone(),
                path: route.path.clone(),
            });
        }
        planned.push(PlannedRoute {
            name: route.name,
            verb: route.method.clone(),
            path: route.path.clone(),
            alias: false,
        });
    }

    for route in sorted.iter().filter(|r| r.is_dynamic()) {
        let path = route.static_path().to_string();
        if !seen.insert((route.method.clone(), path.clone())) {
            info!(
                "skip alias {} {path} of `{}`: already routed",
                route.method, route.name
            );
            continue;
        }
        planned.push(PlannedRoute {
            name: route.name,
            verb: route.method.clone(),
            path,
            alias: true,
        });
    }
    Ok(planned)
}

/// Adds every bound method of `backing` to `router`. Unbound methods are
/// skipped with a warning; a malformed description fails the whole set.
pub fn register<S: Service>(
    mut router: Router,
    mut backing: S,
) -> Result<Router, WiringError> {
    let mut fields = Default::default();
    backing.describe(&mut fields);

    let mut routes = Vec::new();
    let mut handlers: HashMap<&'static str, Handler> = HashMap::new();
    for entry in resolve(fields, false)? {
        match entry.slot.handler() {
            Some(handler) => {
                handlers.insert(entry.route.name, handler);
                routes.push(entry.route);
            }
            None => warn!("method `{}` is not implemented, skip route", entry.route.name),
        }
    }

    for planned in plan_routes(&routes)? {
        let Some(handler) = handlers.get(planned.name) else {
            continue;
        };
        let path = axum_path(&planned.path);
        info!(
            "register {} {} -> {}{}",
            planned.verb,
            path,
            planned.name,
            if planned.alias { " (alias)" } else { "" }
        );
        let method_router = wrap(planned.name, &planned.verb, handler.clone())?;
        router = router.route(&path, method_router);
    }
    Ok(router)
}

/// Builds the request handler of one method: decode, invoke, encode.
pub fn wrap(
    name: &'static str,
    verb: &http::Method,
    handler: Handler,
) -> Result<MethodRouter, WiringError> {
    let filter = MethodFilter::try_from(verb.clone()).map_err(|_| {
        WiringError::UnsupportedVerb {
            method: name,
            verb: verb.clone(),
        }
    })?;

    Ok(on(
        filter,
        move |path: Result<Path<Vec<(String, String)>>, PathRejection>,
              uri: Uri,
              body: Body| {
            let handler = handler.clone();
            async move {
                let params = match path {
                    Ok(Path(params)) => params,
                    Err(PathRejection::MissingPathParams(_)) => vec![],
                    Err(e) => {
                        let err = BindingError::new(Channel::Uri, e.body_text());
                        warn!("method `{name}`: {err}");
                        return bad_request(err);
                    }
                };
                let body = match axum::body::to_bytes(body, MAX_BODY).await {
                    Ok(body) => body,
                    Err(e) => {
                        let err = BindingError::new(Channel::Body, e);
                        warn!("method `{name}`: {err}");
                        return bad_request(err);
                    }
                };
                let req = RequestParts {
                    body,
                    query: uri.query().map(str::to_string),
                    params,
                };

                let ctx = Context::background();
                let _guard = ctx.drop_guard();
                match handler(ctx.clone(), req).await {
                    Err(err) => bad_request(err),
                    Ok(Reply::Error(err)) => {
                        error!("method `{name}` failed: {err}");
                        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResp::new(&err)))
                            .into_response()
                    }
                    Ok(Reply::Value(value)) => Json(value).into_response(),
                    Ok(Reply::Empty) => {
                        debug!("method `{name}` returned no result");
                        StatusCode::OK.into_response()
                    }
                }
            }
        },
    ))
}

fn bad_request(err: BindingError) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResp::new(&err))).into_response()
}

/// The router sees `/msg/:ID` and `/msg/:Addr` as one path.
fn template(path: &str) -> &str {
    match path.rfind("/:") {
        Some(i) => &path[..i + 2],
        None => path,
    }
}

/// `/msg/:ID` becomes `/msg/{ID}`.
pub fn axum_path(path: &str) -> String {
    match path.rfind("/:") {
        Some(i) => format!("{}/{{{}}}", &path[..i], &path[i + 2..]),
        None => path.to_string(),
    }
}
