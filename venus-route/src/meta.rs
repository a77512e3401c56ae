use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::WiringError;
use crate::method::MethodSlot;
use crate::shape::{Signature, SignatureShape};
use crate::tag::Tag;

/// Verbs a routing tag may carry, in lookup priority.
pub const VERBS: [http::Method; 4] = [
    http::Method::GET,
    http::Method::POST,
    http::Method::PUT,
    http::Method::DELETE,
];

/// A record whose fields are methods, each optionally tagged with a route.
///
/// ```ignore
/// #[derive(Default)]
/// struct ChainApi {
///     head: Method<(Context,), Result<u64, RpcError>>,
/// }
///
/// impl Service for ChainApi {
///     fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
///         fields.method("Head", r#"GET:"/chain/head""#, &mut self.head);
///     }
/// }
/// ```
pub trait Service: Default + Send + 'static {
    /// Lists every field in declaration order.
    fn describe<'a>(&'a mut self, fields: &mut Fields<'a>);
}

pub enum FieldKind<'a> {
    Method(&'a mut dyn MethodSlot),
    /// A field that cannot be called, by type name.
    Value(&'static str),
}

pub struct Field<'a> {
    pub name: &'static str,
    pub tag: Tag,
    pub kind: FieldKind<'a>,
}

#[derive(Default)]
pub struct Fields<'a> {
    entries: Vec<Field<'a>>,
}

impl<'a> Fields<'a> {
    pub fn method(
        &mut self,
        name: &'static str,
        tag: &str,
        slot: &'a mut dyn MethodSlot,
    ) -> &mut Self {
        self.entries.push(Field {
            name,
            tag: Tag::parse(tag),
            kind: FieldKind::Method(slot),
        });
        self
    }

    pub fn value<T: ?Sized>(&mut self, name: &'static str, tag: &str) -> &mut Self {
        self.entries.push(Field {
            name,
            tag: Tag::parse(tag),
            kind: FieldKind::Value(std::any::type_name::<T>()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub name: &'static str,
    pub method: http::Method,
    pub path: String,
    pub shape: SignatureShape,
    pub signature: Signature,
}

impl RouteDescriptor {
    /// The path up to its dynamic segment, `/` when nothing is left.
    pub fn static_path(&self) -> &str {
        match self.path.find("/:") {
            Some(0) => "/",
            Some(i) => &self.path[..i],
            None => &self.path,
        }
    }

    pub fn dynamic_param(&self) -> Option<&str> {
        self.path.find("/:").map(|i| &self.path[i + 2..])
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic_param().is_some()
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ({})", self.name, self.method, self.path, self.signature)
    }
}

/// Routes of one service type, in field declaration order.
#[derive(Clone, Debug, Default)]
pub struct ServiceDescription {
    routes: Vec<Arc<RouteDescriptor>>,
}

impl ServiceDescription {
    pub fn routes(&self) -> &[Arc<RouteDescriptor>] {
        &self.routes
    }

    pub fn get(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.name == name).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Extracts the routes of `S`. Untagged and non-callable fields are skipped;
/// a method with an unsupported signature or a malformed path is an error.
pub fn parse<S: Service>() -> Result<ServiceDescription, WiringError> {
    let mut service = S::default();
    let mut fields = Fields::default();
    service.describe(&mut fields);
    let routes = resolve(fields, false)?
        .into_iter()
        .map(|entry| entry.route)
        .collect();
    Ok(ServiceDescription { routes })
}

pub(crate) struct Entry<'a> {
    pub route: Arc<RouteDescriptor>,
    pub slot: &'a mut dyn MethodSlot,
}

/// Pairs every routed field with its descriptor. With `strict`, a tagged
/// field that cannot be called is an error instead of a skip.
pub(crate) fn resolve(
    fields: Fields<'_>,
    strict: bool,
) -> Result<Vec<Entry<'_>>, WiringError> {
    let mut entries = Vec::with_capacity(fields.len());
    for field in fields.entries {
        let Some((method, path)) = route_of(&field.tag) else {
            info!("skip field `{}`: no route tag", field.name);
            continue;
        };
        let slot = match field.kind {
            FieldKind::Method(slot) => slot,
            FieldKind::Value(type_name) => {
                if strict {
                    return Err(WiringError::NotCallable(field.name));
                }
                info!("skip field `{}`: `{type_name}` is not callable", field.name);
                continue;
            }
        };

        let signature = slot.signature();
        let shape = signature.classify().map_err(|source| WiringError::Shape {
            method: field.name,
            source,
        })?;
        if !valid_path(path) {
            return Err(WiringError::InvalidPath {
                method: field.name,
                path: path.to_string(),
            });
        }

        let route = RouteDescriptor {
            name: field.name,
            method,
            path: path.to_string(),
            shape,
            signature,
        };
        entries.push(Entry {
            route: Arc::new(route),
            slot,
        });
    }
    Ok(entries)
}

fn route_of(tag: &Tag) -> Option<(http::Method, &str)> {
    VERBS.iter().find_map(|verb| {
        tag.get(verb.as_str())
            .filter(|path| !path.is_empty())
            .map(|path| (verb.clone(), path))
    })
}

/// Absolute, with at most one dynamic segment and only as the last component.
fn valid_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    let segments: Vec<&str> = rest.split('/').collect();
    let last = segments.len() - 1;
    segments.iter().enumerate().all(|(i, seg)| {
        if seg.contains(['{', '}', '*']) {
            return false;
        }
        match seg.strip_prefix(':') {
            Some(name) => i == last && !name.is_empty() && !name.contains(':'),
            None => !seg.contains(':'),
        }
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::{Fields, Service, parse, valid_path};
    use crate::method::Method;
    use crate::shape::SignatureShape;
    use crate::{Context, RpcError, ShapeError, WiringError};

    #[derive(Default)]
    struct Api {
        head: Method<(Context,), Result<u64, RpcError>>,
        send: Method<(Context, String), Result<String, RpcError>>,
        get: Method<(Context, String), Result<String, RpcError>>,
        ping: Method<(), Result<(), RpcError>>,
        hidden: Method<(), ()>,
    }

    impl Service for Api {
        fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
            fields
                .method("Head", r#"GET:"/chain/head""#, &mut self.head)
                .method("Send", r#"POST:"/msg/send""#, &mut self.send)
                .method("Get", r#"GET:"/msg/:ID""#, &mut self.get)
                .method("Ping", r#"DELETE:"/ping" GET:"/ping/get""#, &mut self.ping)
                .method("Hidden", "", &mut self.hidden)
                .value::<String>("Version", r#"GET:"/version""#);
        }
    }

    #[test]
    #[traced_test]
    fn parse_in_declaration_order() {
        let desc = parse::<Api>().unwrap();
        let names: Vec<_> = desc.routes().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Head", "Send", "Get", "Ping"]);
        assert!(logs_contain("skip field `Hidden`"));
        assert!(logs_contain("skip field `Version`"));

        let head = desc.get("Head").unwrap();
        assert_eq!(head.method, http::Method::GET);
        assert_eq!(
            head.shape,
            SignatureShape {
                has_context: true,
                has_result: true,
                has_error: true,
                ..Default::default()
            }
        );

        // GET outranks DELETE regardless of tag order
        let ping = desc.get("Ping").unwrap();
        assert_eq!(ping.method, http::Method::GET);
        assert_eq!(ping.path, "/ping/get");
    }

    #[test]
    fn static_prefix_and_param() {
        let desc = parse::<Api>().unwrap();
        let get = desc.get("Get").unwrap();
        assert_eq!(get.static_path(), "/msg");
        assert_eq!(get.dynamic_param(), Some("ID"));
        let head = desc.get("Head").unwrap();
        assert_eq!(head.static_path(), "/chain/head");
        assert_eq!(head.dynamic_param(), None);
    }

    #[derive(Default)]
    struct ThreeArgs {
        call: Method<(Context, u64, u64), Result<u64, RpcError>>,
    }

    impl Service for ThreeArgs {
        fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
            fields.method("Call", r#"POST:"/call""#, &mut self.call);
        }
    }

    #[test]
    fn three_params_do_not_parse() {
        let err = parse::<ThreeArgs>().unwrap_err();
        assert_eq!(
            err,
            WiringError::Shape {
                method: "Call",
                source: ShapeError::TooManyParams(3),
            }
        );
    }

    #[derive(Default)]
    struct BadPath {
        call: Method<(), ()>,
    }

    impl Service for BadPath {
        fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
            fields.method("Call", r#"GET:"/a/:id/b""#, &mut self.call);
        }
    }

    #[test]
    fn dynamic_segment_must_trail() {
        assert!(matches!(
            parse::<BadPath>(),
            Err(WiringError::InvalidPath { method: "Call", .. })
        ));
        assert!(valid_path("/"));
        assert!(valid_path("/:id"));
        assert!(valid_path("/a/b/:id"));
        assert!(!valid_path("a/b"));
        assert!(!valid_path("/a/:"));
        assert!(!valid_path("/:a/:b"));
        assert!(!valid_path("/a/{b}"));
    }
}
