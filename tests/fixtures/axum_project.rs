// Axum fixture: a small user service with nested routes, a legacy duplicate
// registration and a few routes the catalog should not keep.
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub struct AppState;

/// A registered user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u32,
    /// Name shown in the UI
    pub display_name: String,
    pub email: String,
    pub manager: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page to return
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// List users.
///
/// # Arguments
///
/// * `query` - Paging options.
async fn list_users(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Json<Vec<User>> {
    Json(vec![])
}

async fn list_users_legacy() -> Json<Vec<User>> {
    Json(vec![])
}

/// Get a user by id.
async fn get_user(Path(id): Path<u32>) -> Json<User> {
    todo!()
}

/// Create a user.
async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Json<User> {
    todo!()
}

async fn update_user(Path(id): Path<u32>, Json(payload): Json<UpdateUserRequest>) -> Json<User> {
    todo!()
}

async fn delete_user(Path(id): Path<u32>) {}

async fn user_posts(Path(id): Path<u32>) -> Json<Vec<Post>> {
    Json(vec![])
}

async fn health_check() -> &'static str {
    "OK"
}

async fn openapi() -> Json<String> {
    todo!()
}

fn user_routes() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/posts", get(user_posts))
}

pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/Users", get(list_users_legacy))
        .route("/openapi.json", get(openapi))
        .route("/ping", get(|| async { "pong" }))
        .nest("/users", user_routes())
}
