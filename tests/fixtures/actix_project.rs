// Actix-Web fixture: a product catalogue mounted under a scope through
// `configure`, plus a manually routed health check.
use actix_web::{delete, get, post, web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};

pub struct AppState;

#[derive(Serialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
}

#[derive(Deserialize)]
pub struct SearchParams {
    /// Search text
    pub q: String,
    pub limit: Option<u32>,
}

/// Search products.
#[get("/")]
async fn list_products(query: web::Query<SearchParams>) -> web::Json<Vec<Product>> {
    web::Json(vec![])
}

/// Fetch one product.
///
/// # Arguments
///
/// * `id` - Product identifier.
#[get("/{id}")]
async fn get_product(path: web::Path<u64>) -> web::Json<Product> {
    todo!()
}

#[post("/")]
async fn create_product(data: web::Data<AppState>, body: web::Json<NewProduct>) -> HttpResponse {
    HttpResponse::Created().finish()
}

#[delete("/{id}")]
async fn delete_product(path: web::Path<u64>) -> HttpResponse {
    HttpResponse::NoContent().finish()
}

async fn health() -> impl Responder {
    "OK"
}

fn product_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_products)
        .service(get_product)
        .service(create_product)
        .service(delete_product);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(health))
            .service(web::scope("/api/products").configure(product_routes))
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
