use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use docuvault_core::{DomainError, FolderId};
use docuvault_documents::folder::{full_path, would_create_cycle};
use docuvault_documents::{Folder, FolderUserState};

use crate::app::dto;
use crate::app::errors::{domain_error_response, parse_id};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route("/:id", get(get_folder).patch(update_folder).delete(delete_folder))
        .route("/:id/state", put(set_folder_state))
}

/// `(parent, name)` uniqueness within the tenant. `exclude` skips the
/// folder being renamed.
fn sibling_name_taken(
    folders: &[Folder],
    parent_id: Option<FolderId>,
    name: &str,
    exclude: Option<FolderId>,
) -> bool {
    folders.iter().any(|folder| {
        folder.parent_id == parent_id
            && folder.name.eq_ignore_ascii_case(name)
            && Some(folder.id) != exclude
    })
}

fn folder_json(services: &AppServices, user: &CurrentUser, folder: &Folder, all: &[Folder]) -> serde_json::Value {
    let path = full_path(folder, all);
    let document_count = services
        .documents
        .list()
        .iter()
        .filter(|d| d.folder_id == Some(folder.id) && !d.is_archived)
        .count();
    let is_expanded = services
        .folder_states
        .get(&(user.user_id(), folder.id))
        .map(|state| state.is_expanded)
        .unwrap_or(false);
    dto::folder_to_json(folder, &path, document_count, is_expanded)
}

pub async fn create_folder(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<dto::CreateFolderRequest>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "folders", "create") {
        return domain_error_response(err);
    }

    let now = Utc::now();
    let folder = match Folder::new(&body.name, body.parent_id, Some(user.user_id()), now) {
        Ok(folder) => folder,
        Err(err) => return domain_error_response(err),
    };

    let all = services.folders.list();
    if let Some(parent_id) = folder.parent_id {
        if !all.iter().any(|f| f.id == parent_id) {
            return domain_error_response(DomainError::NotFound);
        }
    }
    if sibling_name_taken(&all, folder.parent_id, &folder.name, None) {
        return domain_error_response(DomainError::conflict(
            "a folder with this name already exists here",
        ));
    }

    match services.folders.insert(folder.id, folder) {
        Ok(folder) => {
            let all = services.folders.list();
            (
                StatusCode::CREATED,
                Json(folder_json(&services, &user, &folder, &all)),
            )
                .into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

pub async fn list_folders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<dto::FolderQuery>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "folders", "list") {
        return domain_error_response(err);
    }

    let mut all = services.folders.list();
    all.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let items = all
        .iter()
        .filter(|folder| match query.parent_id {
            Some(parent_id) => folder.parent_id == Some(parent_id),
            None => true,
        })
        .map(|folder| folder_json(&services, &user, folder, &all))
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_folder(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "folders", "retrieve") {
        return domain_error_response(err);
    }
    let folder_id: FolderId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.folders.require(&folder_id) {
        Ok(folder) => {
            let all = services.folders.list();
            (StatusCode::OK, Json(folder_json(&services, &user, &folder, &all))).into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

pub async fn update_folder(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateFolderRequest>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "folders", "partial_update") {
        return domain_error_response(err);
    }
    let folder_id: FolderId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let now = Utc::now();
    let mut folder = match services.folders.require(&folder_id) {
        Ok(folder) => folder,
        Err(err) => return domain_error_response(err),
    };
    let all = services.folders.list();

    if let Some(new_parent) = body.parent_id {
        if let Some(parent_id) = new_parent {
            if !all.iter().any(|f| f.id == parent_id) {
                return domain_error_response(DomainError::NotFound);
            }
            if would_create_cycle(&all, folder.id, parent_id) {
                return domain_error_response(DomainError::validation(
                    "cannot move a folder into its own subtree",
                ));
            }
        }
        folder.set_parent(new_parent, now);
    }

    if let Some(name) = &body.name {
        if let Err(err) = folder.rename(name, now) {
            return domain_error_response(err);
        }
    }

    if sibling_name_taken(&all, folder.parent_id, &folder.name, Some(folder.id)) {
        return domain_error_response(DomainError::conflict(
            "a folder with this name already exists here",
        ));
    }

    match services.folders.upsert(folder.id, folder) {
        Ok(folder) => {
            let all = services.folders.list();
            (StatusCode::OK, Json(folder_json(&services, &user, &folder, &all))).into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

pub async fn delete_folder(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "folders", "destroy") {
        return domain_error_response(err);
    }
    let folder_id: FolderId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let has_children = services
        .folders
        .list()
        .iter()
        .any(|folder| folder.parent_id == Some(folder_id));
    let has_documents = services
        .documents
        .list()
        .iter()
        .any(|document| document.folder_id == Some(folder_id));
    if has_children || has_documents {
        return domain_error_response(DomainError::conflict("folder is not empty"));
    }

    match services.folders.remove(&folder_id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => domain_error_response(err),
    }
}

pub async fn set_folder_state(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::FolderStateRequest>,
) -> axum::response::Response {
    if let Err(err) = authz::require(&user, "folders", "state") {
        return domain_error_response(err);
    }
    let folder_id: FolderId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if services.folders.get(&folder_id).is_none() {
        return domain_error_response(DomainError::NotFound);
    }

    // Per-user UI state rides on its own rows, so one user expanding a
    // folder never touches what anyone else sees.
    let now = Utc::now();
    let key = (user.user_id(), folder_id);
    let state = match services.folder_states.get(&key) {
        Some(mut state) => {
            state.set_expanded(body.is_expanded, now);
            state
        }
        None => FolderUserState::new(user.user_id(), folder_id, body.is_expanded, now),
    };

    match services.folder_states.upsert(key, state) {
        Ok(state) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "folder_id": state.folder_id,
                "is_expanded": state.is_expanded,
                "updated_at": state.updated_at,
            })),
        )
            .into_response(),
        Err(err) => domain_error_response(err),
    }
}
