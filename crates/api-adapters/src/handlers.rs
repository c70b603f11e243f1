//! Request handlers. Thin by design: decode, delegate to a service,
//! encode. Ownership scoping, policy checks and cache bookkeeping all
//! happen in the services.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use domains::{ImageUpload, NewProduct, Page, ProductPatch, TokenPair};

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentUser;
use crate::schemas::{
    ImageResponse, LoginRequest, ProductListResponse, ProductResponse, RefreshRequest,
};
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let pair = state.auth.login(&body.username, &body.password).await?;
    Ok(Json(pair))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let pair = state.auth.refresh(&body.refresh_token)?;
    Ok(Json(pair))
}

pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Page>,
) -> ApiResult<Json<ProductListResponse>> {
    let page = state.products.list(&user, page).await?;
    Ok(Json(ProductListResponse {
        count: page.count,
        items: page
            .items
            .into_iter()
            .map(|entry| ProductResponse::from_listing(entry, &state.media_url_prefix))
            .collect(),
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProductResponse>> {
    let entry = state.products.get(&user, id).await?;
    Ok(Json(ProductResponse::from_listing(
        entry,
        &state.media_url_prefix,
    )))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    let entry = state.products.create(&user, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::from_listing(entry, &state.media_url_prefix)),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductPatch>,
) -> ApiResult<Json<ProductResponse>> {
    let entry = state.products.update(&user, id, body).await?;
    Ok(Json(ProductResponse::from_listing(
        entry,
        &state.media_url_prefix,
    )))
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.products.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_images(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Vec<ImageResponse>>)> {
    let files = collect_files(multipart).await?;
    let images = state.products.upload_images(&user, id, files).await?;
    Ok((
        StatusCode::CREATED,
        Json(
            images
                .iter()
                .map(|image| ImageResponse::from_image(image, &state.media_url_prefix))
                .collect(),
        ),
    ))
}

pub async fn delete_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state.products.delete_image(&user, id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drains the multipart stream into uploads. Fields without a filename
/// are ignored; a filename that doesn't look like an image is rejected
/// before any policy check runs.
async fn collect_files(mut multipart: Multipart) -> Result<Vec<ImageUpload>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("malformed multipart body"))?
    {
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };

        let guessed = mime_guess::from_path(&filename).first_or_octet_stream();
        if guessed.type_() != mime_guess::mime::IMAGE {
            return Err(ApiError::validation("file is not an image"));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::validation("malformed multipart body"))?;
        files.push(ImageUpload { filename, bytes });
    }
    Ok(files)
}
