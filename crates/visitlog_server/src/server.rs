use crate::controller::PageError;
use crate::pages::{PageId, PageRegistry};
use crate::render::{Banner, render_closed_page, render_error_page, render_settings_page};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use visitlog_domain::SettingsStoreFactory;

pub fn router(factory: Arc<dyn SettingsStoreFactory>) -> Router {
    router_with_registry(PageRegistry::new(factory))
}

pub fn router_with_registry(registry: PageRegistry) -> Router {
    let api = Router::new().route("/health", get(health));

    Router::new()
        .route("/", get(index))
        .route("/settings", get(open_settings))
        .route("/settings/{page_id}", get(view_settings))
        .route("/settings/{page_id}/save", post(save_settings))
        .route("/settings/{page_id}/close", post(close_settings))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn health() -> &'static str {
    "ok"
}

async fn index() -> Redirect {
    Redirect::to("/settings")
}

fn page_not_found(id: u64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render_error_page(&format!("settings page {id} not found"))),
    )
        .into_response()
}

async fn open_settings(State(registry): State<PageRegistry>) -> Response {
    let (id, page) = registry.open_page().await;
    let mut page = page.lock().await;

    let activated = page.activate().await.map(|_| ());
    match activated {
        Ok(()) => Html(render_settings_page(id, page.page(), None)).into_response(),
        Err(err) => {
            tracing::error!(page_id = %id, error = %err, "settings page activation failed");
            page.teardown().await;
            drop(page);
            registry.remove(id).await;
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(render_error_page(&err.to_string())),
            )
                .into_response()
        }
    }
}

async fn view_settings(
    State(registry): State<PageRegistry>,
    Path(page_id): Path<u64>,
) -> Response {
    let id = PageId(page_id);
    let Some(page) = registry.get(id).await else {
        return page_not_found(page_id);
    };
    let page = page.lock().await;
    Html(render_settings_page(id, page.page(), None)).into_response()
}

async fn save_settings(
    State(registry): State<PageRegistry>,
    Path(page_id): Path<u64>,
) -> Response {
    let id = PageId(page_id);
    let Some(page) = registry.get(id).await else {
        return page_not_found(page_id);
    };
    let mut page = page.lock().await;

    let (status, banner) = match page.save_settings().await {
        Ok(()) => (StatusCode::OK, Banner::Saved),
        Err(err @ PageError::Store(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, Banner::Error(err.to_string()))
        }
        Err(err @ (PageError::NotReady | PageError::Disposed)) => {
            (StatusCode::CONFLICT, Banner::Error(err.to_string()))
        }
    };

    (
        status,
        Html(render_settings_page(id, page.page(), Some(&banner))),
    )
        .into_response()
}

async fn close_settings(
    State(registry): State<PageRegistry>,
    Path(page_id): Path<u64>,
) -> Response {
    let id = PageId(page_id);
    if !registry.close(id).await {
        return page_not_found(page_id);
    }
    Html(render_closed_page(id)).into_response()
}
