//! Router assembly.

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::handlers;
use crate::state::AppState;

/// Full application router: public routes plus the session-guarded API.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/organizations",
            post(handlers::create_organization).get(handlers::list_organizations),
        )
        .route("/organizations/active", put(handlers::set_active_organization))
        .route(
            "/organizations/by-slug/{slug}",
            get(handlers::get_organization_by_slug),
        )
        .route(
            "/organizations/{org_id}",
            get(handlers::get_organization)
                .put(handlers::update_organization)
                .delete(handlers::delete_organization),
        )
        .route(
            "/organizations/{org_id}/leave",
            post(handlers::leave_organization),
        )
        .route(
            "/organizations/{org_id}/transfer",
            post(handlers::transfer_ownership),
        )
        .route(
            "/organizations/{org_id}/members",
            get(handlers::list_members),
        )
        .route(
            "/organizations/{org_id}/members/{user_id}",
            put(handlers::update_member_role).delete(handlers::remove_member),
        )
        .route(
            "/organizations/{org_id}/invitations",
            post(handlers::create_invitation).get(handlers::list_invitations),
        )
        .route(
            "/organizations/{org_id}/invitations/{invite_id}",
            delete(handlers::cancel_invitation),
        )
        .route("/invitations", get(handlers::my_invitations))
        .route(
            "/invitations/{token}/accept",
            post(handlers::accept_invitation),
        )
        .route(
            "/invitations/{token}/decline",
            post(handlers::decline_invitation),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/auth/me", get(handlers::me))
        .route("/auth/logout", post(handlers::logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
