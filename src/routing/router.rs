//! Route table: method + path → (collection, action, path variables).

use std::collections::BTreeMap;

use axum::http::Method;

use crate::collection::actions;
use crate::routing::matcher::{PathPattern, PatternError};

/// Route variables with a fixed meaning.
pub const COLLECTION_VAR: &str = "collection";
pub const ACTION_VAR: &str = "action";

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: PathPattern,
    method: Option<Method>,
    defaults: BTreeMap<String, String>,
}

impl Route {
    /// A route matching `pattern` for `method`, or for any method when
    /// `method` is `None`.
    pub fn new(pattern: &str, method: Option<Method>) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            method,
            defaults: BTreeMap::new(),
        })
    }

    /// Fixed value for a variable the pattern does not capture.
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn with_action(self, action: impl Into<String>) -> Self {
        self.with_default(ACTION_VAR, action)
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    fn accepts(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method)
    }

    fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let mut vars = self.defaults.clone();
        vars.extend(self.pattern.matches(path)?);
        let collection = vars.remove(COLLECTION_VAR)?;
        let action = vars.remove(ACTION_VAR)?;
        Some(RouteMatch {
            collection,
            action,
            path_vars: vars,
        })
    }
}

/// Result of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub collection: String,
    pub action: String,
    /// Captured variables other than collection and action.
    pub path_vars: BTreeMap<String, String>,
}

/// Ordered route table. The first matching route wins.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    routes: Vec<Route>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapper holding the standard CRUD routes.
    pub fn with_default_routes() -> Result<Self, PatternError> {
        let mut mapper = Self::new();
        install_default_routes(&mut mapper)?;
        Ok(mapper)
    }

    pub fn connect(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn match_path(&self, path: &str, method: &Method) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|route| route.accepts(method))
            .find_map(|route| route.resolve(path))
    }

    /// Methods of the method-specific routes matching `path`, paired with
    /// the action each one leads to.
    pub fn methods_for(&self, path: &str) -> Vec<(Method, String)> {
        let mut out: Vec<(Method, String)> = Vec::new();
        for route in &self.routes {
            let Some(method) = route.method() else {
                continue;
            };
            if out.iter().any(|(m, _)| m == method) {
                continue;
            }
            if let Some(matched) = route.resolve(path) {
                out.push((method.clone(), matched.action));
            }
        }
        out
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Connect the standard routes:
///
/// ```text
/// GET    /api/:collection      → list
/// POST   /api/:collection      → create
/// GET    /api/:collection/:id  → show
/// PUT    /api/:collection/:id  → update
/// DELETE /api/:collection/:id  → delete
/// *      either pattern        → _method_not_allowed
/// ```
pub fn install_default_routes(mapper: &mut Mapper) -> Result<(), PatternError> {
    const COLLECTION: &str = "/api/:collection";
    const ITEM: &str = "/api/:collection/:id";

    let table = [
        (COLLECTION, Some(Method::GET), actions::LIST),
        (COLLECTION, Some(Method::POST), actions::CREATE),
        (ITEM, Some(Method::GET), actions::SHOW),
        (ITEM, Some(Method::PUT), actions::UPDATE),
        (ITEM, Some(Method::DELETE), actions::DELETE),
        (COLLECTION, None, actions::METHOD_NOT_ALLOWED),
        (ITEM, None, actions::METHOD_NOT_ALLOWED),
    ];
    for (pattern, method, action) in table {
        mapper.connect(Route::new(pattern, method)?.with_action(action));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> Mapper {
        Mapper::with_default_routes().unwrap()
    }

    #[test]
    fn test_default_routes() {
        let mapper = mapper();
        let m = mapper.match_path("/api/books", &Method::GET).unwrap();
        assert_eq!((m.collection.as_str(), m.action.as_str()), ("books", "list"));
        assert!(m.path_vars.is_empty());

        let m = mapper.match_path("/api/books/12", &Method::PUT).unwrap();
        assert_eq!(m.action, "update");
        assert_eq!(m.path_vars["id"], "12");

        let m = mapper.match_path("/api/books", &Method::DELETE).unwrap();
        assert_eq!(m.action, actions::METHOD_NOT_ALLOWED);

        assert!(mapper.match_path("/other", &Method::GET).is_none());
        assert!(mapper.match_path("/api/books/1/extra", &Method::GET).is_none());
    }

    #[test]
    fn test_methods_for() {
        let methods: Vec<Method> = mapper()
            .methods_for("/api/books/1")
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        assert_eq!(methods, vec![Method::GET, Method::PUT, Method::DELETE]);
    }

    #[test]
    fn test_first_match_wins_and_defaults() {
        let mut mapper = Mapper::new();
        mapper.connect(
            Route::new("/shelf/:id", Some(Method::GET))
                .unwrap()
                .with_default(COLLECTION_VAR, "books")
                .with_action("show"),
        );
        mapper.connect(Route::new("/shelf/:id", None).unwrap().with_default(COLLECTION_VAR, "other"));
        let m = mapper.match_path("/shelf/3", &Method::GET).unwrap();
        assert_eq!(m.collection, "books");
        // The second route has no action, so it never matches.
        assert!(mapper.match_path("/shelf/3", &Method::POST).is_none());
    }
}
