use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::naming::{NamingService, StorageNodeInfo};
use crate::server::ApiError;
use crate::wire::{
    BooleanReturn, FilesReturn, LockRequest, PathRequest, RegisterRequest, RegisterResponse,
    ServerInfo,
};

type AppState = State<Arc<NamingService>>;
type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

pub fn service_router(service: Arc<NamingService>) -> Router {
    Router::new()
        .route("/is_valid_path", post(is_valid_path))
        .route("/is_directory", post(is_directory))
        .route("/list", post(list))
        .route("/create_file", post(create_file))
        .route("/create_directory", post(create_directory))
        .route("/delete", post(delete))
        .route("/get_storage", post(get_storage))
        .route("/lock", post(lock))
        .route("/unlock", post(unlock))
        .with_state(service)
}

pub fn registration_router(service: Arc<NamingService>) -> Router {
    Router::new()
        .route("/register", post(register))
        .with_state(service)
}

async fn register(
    State(service): AppState,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let info = StorageNodeInfo::new(request.storage_ip, request.client_port, request.command_port);
    let files = service.register_storage_node(info, &request.files).await?;
    Ok(Json(RegisterResponse { files }))
}

async fn is_valid_path(
    State(service): AppState,
    Json(request): Json<PathRequest>,
) -> Json<BooleanReturn> {
    Json(BooleanReturn {
        success: service.is_valid_path(&request.path),
    })
}

async fn is_directory(
    State(service): AppState,
    Json(request): Json<PathRequest>,
) -> ApiResult<BooleanReturn> {
    let success = service.is_directory(&request.path)?;
    Ok(Json(BooleanReturn { success }))
}

async fn list(
    State(service): AppState,
    Json(request): Json<PathRequest>,
) -> ApiResult<FilesReturn> {
    let files = service.list_children(&request.path)?;
    Ok(Json(FilesReturn { files }))
}

async fn create_file(
    State(service): AppState,
    Json(request): Json<PathRequest>,
) -> ApiResult<BooleanReturn> {
    let success = service.create_file(&request.path).await?;
    Ok(Json(BooleanReturn { success }))
}

async fn create_directory(
    State(service): AppState,
    Json(request): Json<PathRequest>,
) -> ApiResult<BooleanReturn> {
    let success = service.create_directory(&request.path).await?;
    Ok(Json(BooleanReturn { success }))
}

async fn delete(
    State(service): AppState,
    Json(request): Json<PathRequest>,
) -> ApiResult<BooleanReturn> {
    service.delete(&request.path).await?;
    Ok(Json(BooleanReturn { success: true }))
}

async fn get_storage(
    State(service): AppState,
    Json(request): Json<PathRequest>,
) -> ApiResult<ServerInfo> {
    let info = service.get_storage(&request.path)?;
    Ok(Json(ServerInfo {
        server_ip: info.host,
        server_port: info.client_port,
    }))
}

/// Blocks until granted. A client that disconnects first takes nothing with it.
async fn lock(
    State(service): AppState,
    Json(request): Json<LockRequest>,
) -> std::result::Result<(), ApiError> {
    service.lock(&request.path, request.exclusive).await?;
    Ok(())
}

async fn unlock(
    State(service): AppState,
    Json(request): Json<LockRequest>,
) -> std::result::Result<(), ApiError> {
    service.unlock(&request.path, request.exclusive)?;
    Ok(())
}
