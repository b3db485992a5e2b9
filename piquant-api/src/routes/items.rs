/// Item endpoints
///
/// CRUD plus voting for the rated item records. Every route here sits behind
/// the bearer guard; the handlers receive the authenticated caller via the
/// `AuthUser` extension and pass it explicitly into the persistence layer.
///
/// # Endpoints
///
/// - `GET    /v1/items` - list all items
/// - `GET    /v1/items/:id` - fetch one item
/// - `POST   /v1/items` - create an item (multipart: `item` JSON + `image` file)
/// - `PUT    /v1/items/:id` - update an item (owner only; multipart or JSON)
/// - `DELETE /v1/items/:id` - delete an item (owner only)
/// - `POST   /v1/items/:id/vote` - cast, switch or clear a vote
///
/// # Request ordering
///
/// Mutating handlers validate the body first, then check ownership, and only
/// then touch the image directory and the database, so a rejected request
/// leaves both untouched. Image files are always stored before the record
/// that references them is written; deletions of old files happen after, and
/// are best-effort.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    Extension, Json,
};
use piquant_shared::{
    auth::{middleware::AuthUser, ownership::require_owner},
    models::item::{CreateItem, Item, UpdateItem},
    storage::images::public_url,
    vote::VoteAction,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Multipart field carrying the JSON item payload
const FIELD_ITEM: &str = "item";

/// Multipart field carrying the uploaded image
const FIELD_IMAGE: &str = "image";

/// Fields for creating an item
///
/// Server-assigned fields (`id`, `owner_id`, `image_url`, vote state) are
/// not accepted here; a body that tries to smuggle them in is rejected
/// outright instead of silently stripped.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateItemRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Producing manufacturer
    #[validate(length(min = 1, max = 255, message = "Manufacturer must be 1-255 characters"))]
    pub manufacturer: String,

    /// Free-form description
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    /// Primary category label
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub main_category: String,

    /// Perceived heat, 0-10
    #[validate(range(min = 0, max = 10, message = "Heat level must be between 0 and 10"))]
    pub heat_level: i32,
}

/// Fields for updating an item; all optional
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateItemRequest {
    /// New display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New manufacturer
    #[validate(length(min = 1, max = 255, message = "Manufacturer must be 1-255 characters"))]
    pub manufacturer: Option<String>,

    /// New description
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// New category
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub main_category: Option<String>,

    /// New heat level
    #[validate(range(min = 0, max = 10, message = "Heat level must be between 0 and 10"))]
    pub heat_level: Option<i32>,
}

impl UpdateItemRequest {
    fn into_update(self) -> UpdateItem {
        UpdateItem {
            name: self.name,
            manufacturer: self.manufacturer,
            description: self.description,
            main_category: self.main_category,
            heat_level: self.heat_level,
            image_url: None,
        }
    }
}

/// Vote request
///
/// `action` is `1` (like), `-1` (dislike) or `0` (clear). The optional
/// `user_id` exists for clients that echo their identity; when present it
/// must match the authenticated caller — the token, not the body, decides
/// whose vote is cast.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    /// Requested vote action
    pub action: VoteAction,

    /// Optional echoed caller id; must match the token subject if present
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

/// Confirmation response for vote and delete
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Confirmation message
    pub message: String,
}

/// Vote confirmation including the item's new vote state
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    /// Confirmation message
    pub message: String,

    /// The item after the vote was applied
    pub item: Item,
}

/// An uploaded image: the client's filename (extension hint only) and bytes
type UploadedImage = (Option<String>, Vec<u8>);

/// Parsed multipart body: optional JSON payload text, optional image
#[derive(Debug, Default)]
struct ItemUpload {
    payload: Option<String>,
    image: Option<UploadedImage>,
}

/// Reads the `item` and `image` fields out of a multipart body
///
/// Unknown field names are rejected rather than skipped, matching the
/// deny-unknown-fields posture of the JSON payloads.
async fn read_item_multipart(mut multipart: Multipart) -> ApiResult<ItemUpload> {
    let mut upload = ItemUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some(FIELD_ITEM) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable item field: {}", e)))?;
                upload.payload = Some(text);
            }
            Some(FIELD_IMAGE) => {
                let filename = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable image field: {}", e)))?;
                upload.image = Some((filename, data.to_vec()));
            }
            other => {
                let field_name = other.unwrap_or("<unnamed>").to_string();
                return Err(ApiError::validation(
                    &field_name,
                    "unexpected multipart field",
                ));
            }
        }
    }

    Ok(upload)
}

/// List all items, newest first
///
/// # Endpoint
///
/// `GET /v1/items`
pub async fn list_items(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Item>>> {
    let items = Item::list(&state.db).await?;
    Ok(Json(items))
}

/// Fetch a single item
///
/// # Endpoint
///
/// `GET /v1/items/:id`
///
/// # Errors
///
/// - `404 Not Found`: unknown id
pub async fn get_item(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Item>> {
    let item = Item::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    Ok(Json(item))
}

/// Create an item from a multipart upload
///
/// # Endpoint
///
/// ```text
/// POST /v1/items
/// Content-Type: multipart/form-data
///
/// item:  {"name": "...", "manufacturer": "...", "description": "...",
///         "main_category": "...", "heat_level": 6}
/// image: <file>
/// ```
///
/// The image is stored before the record is inserted, so a surviving record
/// always references an existing file; if the insert fails the just-stored
/// file is retired again.
///
/// # Errors
///
/// - `400 Bad Request`: malformed multipart body
/// - `422 Unprocessable Entity`: missing image, missing or invalid payload
pub async fn create_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let upload = read_item_multipart(multipart).await?;

    let payload = upload
        .payload
        .ok_or_else(|| ApiError::validation(FIELD_ITEM, "missing item payload"))?;
    let req: CreateItemRequest = serde_json::from_str(&payload)
        .map_err(|e| ApiError::validation(FIELD_ITEM, format!("invalid item payload: {}", e)))?;
    req.validate()?;

    let (filename, data) = upload
        .image
        .ok_or_else(|| ApiError::validation(FIELD_IMAGE, "an image file is required"))?;

    let stored = state.images.store(filename.as_deref(), &data).await?;
    let image_url = public_url(&state.config.api.public_base_url, &stored);

    let item = match Item::create(
        &state.db,
        CreateItem {
            owner_id: auth.user_id,
            name: req.name,
            manufacturer: req.manufacturer,
            description: req.description,
            main_category: req.main_category,
            heat_level: req.heat_level,
            image_url: image_url.clone(),
        },
    )
    .await
    {
        Ok(item) => item,
        Err(e) => {
            // The record never existed, so the file must not either.
            state.images.remove(&image_url).await;
            return Err(e.into());
        }
    };

    tracing::info!(item_id = %item.id, owner_id = %auth.user_id, "item created");

    Ok((StatusCode::CREATED, Json(item)))
}

/// Update an item's fields and optionally its image (owner only)
///
/// # Endpoint
///
/// `PUT /v1/items/:id`
///
/// Accepts either a multipart body (`item` JSON plus an optional `image`
/// file) or a plain JSON body when the image is untouched.
///
/// # Errors
///
/// - `403 Forbidden`: caller is not the owner; nothing is modified
/// - `404 Not Found`: unknown id
/// - `422 Unprocessable Entity`: invalid payload
pub async fn update_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    req: Request,
) -> ApiResult<Json<Item>> {
    // Parse and validate either body shape before touching anything.
    let (update_req, image) = parse_update_body(&state, req).await?;
    update_req.validate()?;

    let item = Item::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    require_owner(&item, auth.user_id)?;

    let mut update = update_req.into_update();
    if let Some((filename, data)) = image {
        let stored = state
            .images
            .replace(&item.image_url, filename.as_deref(), &data)
            .await?;
        update.image_url = Some(public_url(&state.config.api.public_base_url, &stored));
    }

    // The write re-asserts ownership; owners are immutable, so a vanished
    // row can only mean the item was deleted concurrently.
    let updated = Item::update_owned(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    tracing::info!(item_id = %updated.id, owner_id = %auth.user_id, "item updated");

    Ok(Json(updated))
}

/// Splits a PUT body into update fields and an optional uploaded image
async fn parse_update_body(
    state: &AppState,
    req: Request,
) -> ApiResult<(UpdateItemRequest, Option<UploadedImage>)> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?;
        let upload = read_item_multipart(multipart).await?;

        let update_req = match upload.payload {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                ApiError::validation(FIELD_ITEM, format!("invalid item payload: {}", e))
            })?,
            None => UpdateItemRequest::default(),
        };

        Ok((update_req, upload.image))
    } else {
        let Json(update_req) = Json::<UpdateItemRequest>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;

        Ok((update_req, None))
    }
}

/// Delete an item and retire its image (owner only)
///
/// # Endpoint
///
/// `DELETE /v1/items/:id`
///
/// The record delete is the reported operation; the image file is removed
/// afterwards, best-effort.
///
/// # Errors
///
/// - `403 Forbidden`: caller is not the owner; nothing is deleted
/// - `404 Not Found`: unknown id
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let item = Item::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    require_owner(&item, auth.user_id)?;

    let deleted = Item::delete_owned(&state.db, id, auth.user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }

    state.images.remove(&item.image_url).await;

    tracing::info!(item_id = %id, owner_id = %auth.user_id, "item deleted");

    Ok(Json(MessageResponse {
        message: "Item deleted".to_string(),
    }))
}

/// Cast, switch or clear a vote on an item
///
/// # Endpoint
///
/// ```text
/// POST /v1/items/:id/vote
/// Content-Type: application/json
///
/// {"action": 1}
/// ```
///
/// The transition runs as an atomic read-modify-write on the item row, so
/// concurrent votes by different users are all reflected.
///
/// # Errors
///
/// - `404 Not Found`: unknown id
/// - `422 Unprocessable Entity`: unknown action value, or an echoed
///   `user_id` that is not the authenticated caller
pub async fn vote_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<(StatusCode, Json<VoteResponse>)> {
    if let Some(user_id) = req.user_id {
        if user_id != auth.user_id {
            return Err(ApiError::validation(
                "user_id",
                "vote user does not match the authenticated caller",
            ));
        }
    }

    let item = Item::apply_vote(&state.db, id, auth.user_id, req.action)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    tracing::debug!(
        item_id = %item.id,
        voter_id = %auth.user_id,
        action = req.action.as_i64(),
        likes = item.likes,
        dislikes = item.dislikes,
        "vote applied"
    );

    Ok((
        StatusCode::CREATED,
        Json(VoteResponse {
            message: "Vote recorded".to_string(),
            item,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_rejects_server_assigned_fields() {
        let body = r#"{
            "name": "Sriracha",
            "manufacturer": "Huy Fong",
            "description": "Rooster sauce",
            "main_category": "hot sauce",
            "heat_level": 6,
            "owner_id": "d9b2d63d-a233-4123-847a-7d00b1d46713"
        }"#;

        let result: Result<CreateItemRequest, _> = serde_json::from_str(body);
        assert!(result.is_err(), "owner_id must be rejected, not stripped");

        let body = r#"{
            "name": "Sriracha",
            "manufacturer": "Huy Fong",
            "description": "Rooster sauce",
            "main_category": "hot sauce",
            "heat_level": 6,
            "image_url": "http://evil/images/x.png"
        }"#;
        let result: Result<CreateItemRequest, _> = serde_json::from_str(body);
        assert!(result.is_err(), "image_url must be rejected, not stripped");
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateItemRequest {
            name: "Sriracha".to_string(),
            manufacturer: "Huy Fong".to_string(),
            description: "Rooster sauce".to_string(),
            main_category: "hot sauce".to_string(),
            heat_level: 6,
        };
        assert!(req.validate().is_ok());

        let req = CreateItemRequest {
            name: "x".to_string(),
            manufacturer: "x".to_string(),
            description: String::new(),
            main_category: "x".to_string(),
            heat_level: 11,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_request_partial_body() {
        let req: UpdateItemRequest = serde_json::from_str(r#"{"heat_level": 3}"#).unwrap();
        assert_eq!(req.heat_level, Some(3));
        assert!(req.name.is_none());

        let update = req.into_update();
        assert_eq!(update.heat_level, Some(3));
        assert!(update.image_url.is_none());
    }

    #[test]
    fn test_vote_request_wire_format() {
        let req: VoteRequest = serde_json::from_str(r#"{"action": 1}"#).unwrap();
        assert_eq!(req.action, VoteAction::Like);
        assert!(req.user_id.is_none());

        let req: VoteRequest = serde_json::from_str(
            r#"{"action": -1, "user_id": "d9b2d63d-a233-4123-847a-7d00b1d46713"}"#,
        )
        .unwrap();
        assert_eq!(req.action, VoteAction::Dislike);
        assert!(req.user_id.is_some());

        assert!(serde_json::from_str::<VoteRequest>(r#"{"action": 2}"#).is_err());
        assert!(serde_json::from_str::<VoteRequest>(r#"{"action": 0, "admin": true}"#).is_err());
    }
}
