use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{self, admin, analytics, auth, events, feedback, tickets};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/user/signup/", post(auth::signup))
        .route("/user/login/", post(auth::login))
        .route("/token/refresh/", post(auth::refresh_token))
        .route(
            "/events/",
            get(events::list_events).post(events::create_event),
        )
        .route("/events/organizer/", get(events::organizer_events))
        .route(
            "/events/organizer/:id/",
            patch(events::update_event).delete(events::delete_event),
        )
        .route("/events/manage/:id/", patch(admin::manage_event))
        .route("/events/:id/", get(events::get_event))
        .route(
            "/events/:id/feedback/",
            post(feedback::submit_feedback).get(feedback::event_feedback),
        )
        .route(
            "/events/:id/attendees/export/",
            get(events::export_attendees),
        )
        .route("/tickets/claim/", post(tickets::claim_ticket))
        .route("/tickets/checkin/", post(tickets::check_in))
        .route("/tickets/:id/cancel/", post(tickets::cancel_ticket))
        .route("/student/tickets/", get(tickets::my_tickets))
        .route("/student/feedback/", get(feedback::my_feedback))
        .route("/users/", get(admin::list_users))
        .route("/users/manage/", patch(admin::manage_user))
        .route("/users/approve/:id/", patch(admin::approve_user))
        .route("/audit/", get(admin::list_audit))
        .route("/analytics/global", get(analytics::global_analytics))
        .route("/analytics/organizer", get(analytics::organizer_analytics));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
