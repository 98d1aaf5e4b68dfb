use jsonprop::Router;

use crate::controllers;

pub fn router() -> Router {
    Router::new()
        .get("/", controllers::home::index)
        .post("/orders", controllers::orders::store)
        .put("/orders/{id}", controllers::orders::update)
        .post("/orders/preview", controllers::orders::preview)
}
