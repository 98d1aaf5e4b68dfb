use crate::http::{Request, Response};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for route handlers
pub type BoxedHandler =
    Box<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// HTTP router with one `matchit` tree per method
///
/// # Example
///
/// ```rust,ignore
/// let router = Router::new()
///     .get("/orders/{id}", controllers::orders::show)
///     .post("/orders", controllers::orders::store);
/// ```
pub struct Router {
    get_routes: MatchitRouter<Arc<BoxedHandler>>,
    post_routes: MatchitRouter<Arc<BoxedHandler>>,
    put_routes: MatchitRouter<Arc<BoxedHandler>>,
    delete_routes: MatchitRouter<Arc<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            get_routes: MatchitRouter::new(),
            post_routes: MatchitRouter::new(),
            put_routes: MatchitRouter::new(),
            delete_routes: MatchitRouter::new(),
        }
    }

    /// Register a GET route
    pub fn get<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        insert(&mut self.get_routes, "GET", path, boxed(handler));
        self
    }

    /// Register a POST route
    pub fn post<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        insert(&mut self.post_routes, "POST", path, boxed(handler));
        self
    }

    /// Register a PUT route
    pub fn put<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        insert(&mut self.put_routes, "PUT", path, boxed(handler));
        self
    }

    /// Register a DELETE route
    pub fn delete<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        insert(&mut self.delete_routes, "DELETE", path, boxed(handler));
        self
    }

    /// Match a request and return the handler with extracted params
    pub fn match_route(
        &self,
        method: &hyper::Method,
        path: &str,
    ) -> Option<(Arc<BoxedHandler>, HashMap<String, String>)> {
        let router = match *method {
            hyper::Method::GET => &self.get_routes,
            hyper::Method::POST => &self.post_routes,
            hyper::Method::PUT => &self.put_routes,
            hyper::Method::DELETE => &self.delete_routes,
            _ => return None,
        };

        router.at(path).ok().map(|matched| {
            let params: HashMap<String, String> = matched
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            (matched.value.clone(), params)
        })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn boxed<H, Fut>(handler: H) -> Arc<BoxedHandler>
where
    H: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let handler: BoxedHandler = Box::new(move |req| Box::pin(handler(req)));
    Arc::new(handler)
}

fn insert(routes: &mut MatchitRouter<Arc<BoxedHandler>>, method: &str, path: &str, handler: Arc<BoxedHandler>) {
    if let Err(err) = routes.insert(path, handler) {
        tracing::error!(method, path, error = %err, "route not registered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::text;

    async fn show(req: Request) -> Response {
        text(req.param("id")?.to_string())
    }

    #[test]
    fn test_match_route_with_params() {
        let router = Router::new().get("/orders/{id}", show);

        let (_, params) = router.match_route(&hyper::Method::GET, "/orders/7").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("7"));

        assert!(router.match_route(&hyper::Method::POST, "/orders/7").is_none());
        assert!(router.match_route(&hyper::Method::GET, "/users").is_none());
    }

    #[tokio::test]
    async fn test_matched_handler_runs() {
        let router = Router::new().get("/orders/{id}", show);
        let (handler, params) = router.match_route(&hyper::Method::GET, "/orders/7").unwrap();

        let req = Request::from_bytes(http::Request::get("/orders/7").body("").unwrap()).with_params(params);
        let response = (*handler)(req).await.unwrap();
        assert_eq!(response.body(), "7");
    }
}
