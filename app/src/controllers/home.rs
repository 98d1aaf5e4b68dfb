use jsonprop::{handler, json, Config, Request, Response};
use serde_json::json;

#[handler]
pub async fn index(req: Request) -> Response {
    json(json!({
        "app": Config::get::<jsonprop::AppConfig>().map(|c| c.name),
        "path": req.path(),
    }))
}
