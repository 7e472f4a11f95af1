//! Route templates and path matching.
//!
//! Templates are split into `/`-separated segments. A segment wrapped in
//! braces (`{id}`) captures the corresponding request segment; every other
//! segment is a literal compared without regard to ASCII case, the way
//! controller routes are usually resolved.
//!
//! # Example
//!
//! ```rust
//! use webprobe_host::router::{RouteOutcome, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add_route(Method::POST, "/api/values/{id}", "values");
//!
//! match router.resolve(&Method::POST, "/API/Values/5") {
//!     RouteOutcome::Matched(m) => {
//!         assert_eq!(*m.target(), "values");
//!         assert_eq!(m.param("id"), Some("5"));
//!     }
//!     _ => panic!("expected a match"),
//! }
//! ```

use std::collections::HashMap;

use http::Method;

/// A matched route with its target and extracted path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<T> {
    target: T,
    template: String,
    params: HashMap<String, String>,
}

impl<T> RouteMatch<T> {
    /// Returns the target registered for the route.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Returns the template the request matched.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns all extracted parameters.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns a single parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Splits the match into its target and parameters.
    pub fn into_parts(self) -> (T, HashMap<String, String>) {
        (self.target, self.params)
    }
}

/// Result of resolving a request against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome<T> {
    /// A route matched both path and method.
    Matched(RouteMatch<T>),
    /// At least one template matched the path, none accepted the method.
    MethodNotAllowed(Vec<Method>),
    /// No template matched the path.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route<T> {
    method: Method,
    segments: Vec<PathSegment>,
    template: String,
    target: T,
}

impl<T: Clone> Route<T> {
    fn new(method: Method, template: &str, target: T) -> Self {
        Self {
            method,
            segments: parse_segments(template),
            template: template.to_string(),
            target,
        }
    }

    fn match_path(&self, path_segments: &[&str]) -> Option<HashMap<String, String>> {
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(path_segments) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if !expected.eq_ignore_ascii_case(actual) {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(params)
    }
}

fn parse_segments(template: &str) -> Vec<PathSegment> {
    split_path(template)
        .into_iter()
        .map(|s| {
            if s.len() > 2 && s.starts_with('{') && s.ends_with('}') {
                PathSegment::Param(s[1..s.len() - 1].to_string())
            } else {
                PathSegment::Literal(s.to_string())
            }
        })
        .collect()
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Route table mapping `(method, template)` pairs to targets.
///
/// Routes are tried in registration order; the first path-and-method match
/// wins.
#[derive(Debug, Clone)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T: Clone> Router<T> {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    pub fn add_route(&mut self, method: Method, template: impl AsRef<str>, target: T) {
        self.routes.push(Route::new(method, template.as_ref(), target));
    }

    /// Returns the number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` when no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves a request path and method.
    pub fn resolve(&self, method: &Method, path: &str) -> RouteOutcome<T> {
        let path_segments = split_path(path);
        let mut allowed = Vec::new();

        for route in &self.routes {
            if let Some(params) = route.match_path(&path_segments) {
                if route.method == *method {
                    return RouteOutcome::Matched(RouteMatch {
                        target: route.target.clone(),
                        template: route.template.clone(),
                        params,
                    });
                }
                if !allowed.contains(&route.method) {
                    allowed.push(route.method.clone());
                }
            }
        }

        if allowed.is_empty() {
            RouteOutcome::NotFound
        } else {
            RouteOutcome::MethodNotAllowed(allowed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router<&'static str> {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", "listUsers");
        router.add_route(Method::GET, "/users/{userId}", "getUser");
        router.add_route(Method::POST, "/users", "createUser");
        router.add_route(
            Method::POST,
            "api/NoAttributes/WithParameter/{id}",
            "withParameter",
        );
        router
    }

    fn matched(outcome: RouteOutcome<&'static str>) -> RouteMatch<&'static str> {
        match outcome {
            RouteOutcome::Matched(m) => m,
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_static_route() {
        let m = matched(router().resolve(&Method::GET, "/users"));
        assert_eq!(*m.target(), "listUsers");
        assert!(m.params().is_empty());
    }

    #[test]
    fn test_param_route() {
        let m = matched(router().resolve(&Method::GET, "/users/42"));
        assert_eq!(*m.target(), "getUser");
        assert_eq!(m.param("userId"), Some("42"));
        assert_eq!(m.template(), "/users/{userId}");
    }

    #[test]
    fn test_method_selects_route() {
        let m = matched(router().resolve(&Method::POST, "/users"));
        assert_eq!(*m.target(), "createUser");
    }

    #[test]
    fn test_literals_ignore_case() {
        let m = matched(router().resolve(&Method::POST, "/api/noattributes/withparameter/5"));
        assert_eq!(*m.target(), "withParameter");
        assert_eq!(m.param("id"), Some("5"));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let m = matched(router().resolve(&Method::GET, "/users/"));
        assert_eq!(*m.target(), "listUsers");
    }

    #[test]
    fn test_not_found() {
        assert_eq!(
            router().resolve(&Method::GET, "/invalid"),
            RouteOutcome::NotFound
        );
        assert_eq!(router().resolve(&Method::GET, "/"), RouteOutcome::NotFound);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let outcome = router().resolve(&Method::DELETE, "/users");
        assert_eq!(
            outcome,
            RouteOutcome::MethodNotAllowed(vec![Method::GET, Method::POST])
        );
    }

    #[test]
    fn test_first_registration_wins() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/items/{id}", "byId");
        router.add_route(Method::GET, "/items/latest", "latest");

        let m = matched(router.resolve(&Method::GET, "/items/latest"));
        assert_eq!(*m.target(), "byId");
    }

    #[test]
    fn test_route_count() {
        let router = router();
        assert_eq!(router.route_count(), 4);
        assert!(!router.is_empty());
        assert!(Router::<()>::new().is_empty());
    }
}
