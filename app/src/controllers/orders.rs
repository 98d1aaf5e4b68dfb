//! Order endpoints
//!
//! Each handler reads several values out of one JSON body, e.g.
//! `{"user": {"name": "Ann"}, "count": 3}`.

use jsonprop::{handler, json, Json, Request, Response};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Line {
    pub sku: String,
    pub quantity: u32,
}

#[handler]
pub async fn store(
    #[from_json_property] count: i32,
    #[from_json_property("user")] owner: User,
) -> Response {
    tracing::info!(owner = %owner.name, count, "order placed");
    json(json!({
        "owner": owner.name,
        "email": owner.email,
        "count": count,
    }))
}

#[handler]
pub async fn update(
    #[from_json_property("user.name")] name: String,
    #[from_json_property] lines: Vec<Line>,
    #[from_json_property(name = "note")] note: Option<String>,
    req: Request,
) -> Response {
    let id = req.param("id")?;
    let quantity: u32 = lines.iter().map(|line| line.quantity).sum();
    let skus: Vec<&str> = lines.iter().map(|line| line.sku.as_str()).collect();

    json(json!({
        "id": id,
        "name": name,
        "skus": skus,
        "quantity": quantity,
        "note": note,
    }))
}

/// The whole body is still readable after the properties were bound
#[handler]
pub async fn preview(
    #[from_json_property] count: i32,
    body: Json<serde_json::Value>,
) -> Response {
    let Json(document) = body;
    json(json!({ "count": count, "document": document }))
}
