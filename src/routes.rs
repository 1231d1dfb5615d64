use axum::{Json, extract::{Multipart, Path, State}, http::StatusCode, response::{IntoResponse, Response}};
use base64::Engine;
use std::{collections::HashMap, sync::Arc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    gemini::ShootRenderer,
    models::{CreateRequest, ExportParams, NavigateRequest, PhotoshootView, SelectionRequest},
    wizard::{Outcome, Photoshoot, Seed, UploadedAsset},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, Photoshoot>>>,
    pub renderer: Arc<dyn ShootRenderer>,
}

pub async fn create_photoshoot(State(state): State<AppState>, Json(body): Json<CreateRequest>) -> Result<Json<PhotoshootView>, StatusCode> {
    let mut assets = Vec::new();
    for snapshot_asset in body.uploaded_assets {
        let data = base64::engine::general_purpose::STANDARD
            .decode(&snapshot_asset.data)
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        assets.push(UploadedAsset {
            file_name: snapshot_asset.file_name,
            data: data.into(),
        });
    }

    let shoot = Photoshoot::from_seed(Seed {
        title: body.title,
        uploaded_assets: assets,
        selected_model_ids: body.selected_model_ids,
        selected_background_ids: body.selected_background_ids,
        generated_images: body.generated_images,
    });

    tracing::info!("🚀 Created photoshoot '{}' at step {}", shoot.title, shoot.step());

    let view = PhotoshootView::from(&shoot);
    state.store.write().insert(shoot.id, shoot);
    Ok(Json(view))
}

pub async fn get_photoshoot(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    if let Some(shoot) = state.store.read().get(&id) { Json(PhotoshootView::from(shoot)).into_response() } else { StatusCode::NOT_FOUND.into_response() }
}

/// Upload panel completion: the field set replaces the previous uploads
/// wholesale, which also revokes the previous batch's display URLs.
pub async fn replace_uploads(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PhotoshootView>, StatusCode> {
    let mut assets = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        assets.push(UploadedAsset { file_name, data });
    }

    tracing::info!("📦 Replacing uploads for {} with {} file(s)", id, assets.len());

    let mut guard = state.store.write();
    let shoot = guard.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    shoot.complete_upload(assets);
    Ok(Json(PhotoshootView::from(&*shoot)))
}

/// Serves the display URL allocated for an uploaded asset. A batch id from
/// before the last upload replacement is a revoked URL and answers 410.
pub async fn asset_image(
    Path((id, batch, index)): Path<(Uuid, Uuid, usize)>,
    State(state): State<AppState>,
) -> Response {
    let store = state.store.read();
    let Some(shoot) = store.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if batch != shoot.upload_batch() {
        return StatusCode::GONE.into_response();
    }
    let Some(asset) = shoot.asset(batch, index) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mime = image::guess_format(&asset.data)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(axum::http::header::CONTENT_TYPE, mime.parse().unwrap());
    (StatusCode::OK, headers, asset.data.clone()).into_response()
}

pub async fn select_casting(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SelectionRequest>,
) -> Result<Json<PhotoshootView>, StatusCode> {
    let mut guard = state.store.write();
    let shoot = guard.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    shoot.complete_model_selection(body.model_ids, body.background_ids);
    tracing::info!(
        "🎯 Selection for {}: {} model(s), {} background(s)",
        id,
        shoot.selected_models().len(),
        shoot.selected_backgrounds().len()
    );
    Ok(Json(PhotoshootView::from(&*shoot)))
}

#[axum::debug_handler]
pub async fn generate_shoot(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PhotoshootView>, StatusCode> {
    // Snapshot the inputs, then render outside the lock.
    let (products, casting, backdrop) = {
        let guard = state.store.read();
        let shoot = guard.get(&id).ok_or(StatusCode::NOT_FOUND)?;
        (shoot.products().to_vec(), shoot.casting(), shoot.backdrop())
    };

    tracing::info!(
        "🚀 Rendering photoshoot {}: {} product(s) x {} model(s)",
        id,
        products.len(),
        casting.len()
    );

    let images = state
        .renderer
        .render_shoot(&products, &casting, backdrop.as_ref())
        .await;

    tracing::info!("✅ Photoshoot {} rendered {} image(s)", id, images.len());

    // Last write wins if the user kicked off generation more than once.
    let mut guard = state.store.write();
    let shoot = guard.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    shoot.complete_generation(images);
    Ok(Json(PhotoshootView::from(&*shoot)))
}

/// Guard-blocked navigation is not an error: the step simply stays put and
/// the returned view carries the unchanged state.
pub async fn advance_step(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<PhotoshootView>, StatusCode> {
    let mut guard = state.store.write();
    let shoot = guard.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    shoot.advance();
    Ok(Json(PhotoshootView::from(&*shoot)))
}

pub async fn back_step(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<PhotoshootView>, StatusCode> {
    let mut guard = state.store.write();
    let shoot = guard.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    shoot.retreat();
    Ok(Json(PhotoshootView::from(&*shoot)))
}

pub async fn goto_step(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<NavigateRequest>,
) -> Result<Json<PhotoshootView>, StatusCode> {
    let mut guard = state.store.write();
    let shoot = guard.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    shoot.jump_to(body.step);
    Ok(Json(PhotoshootView::from(&*shoot)))
}

pub async fn export_shoot(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ExportParams>,
) -> Result<Json<Outcome>, StatusCode> {
    let store = state.store.read();
    let shoot = store.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    tracing::info!("📤 Export '{}' requested for {}", body.export_type, id);
    Ok(Json(shoot.request_export(body.export_type)))
}

pub async fn finish_shoot(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<Outcome>, StatusCode> {
    let store = state.store.read();
    let shoot = store.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    tracing::info!("✅ Photoshoot {} completed with {} image(s)", id, shoot.generated_images().len());
    Ok(Json(shoot.finish()))
}
