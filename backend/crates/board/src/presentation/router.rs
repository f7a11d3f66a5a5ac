//! Board Router

use axum::{
    Router,
    routing::{get, patch, post},
};
use kernel::clock::{Clock, SystemClock};
use std::sync::Arc;

use crate::application::config::BoardConfig;
use crate::domain::gateway::{EmailSender, PaymentGateway};
use crate::domain::repository::BoardStore;
use crate::infra::postgres::PgBoardRepository;
use crate::presentation::handlers::{self, BoardAppState};

/// Create the board router with the PostgreSQL repository and system time
pub fn board_router<E, G>(
    repo: PgBoardRepository,
    mailer: E,
    gateway: G,
    config: BoardConfig,
) -> Router
where
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    board_router_generic(repo, mailer, gateway, config, Arc::new(SystemClock))
}

/// Create a board router for any store and clock
pub fn board_router_generic<S, E, G>(
    store: S,
    mailer: E,
    gateway: G,
    config: BoardConfig,
    clock: Arc<dyn Clock>,
) -> Router
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let state = BoardAppState::new(store, mailer, gateway, config, clock);

    Router::new()
        // Auth
        .route("/auth/register", post(handlers::register::<S, E, G>))
        .route("/auth/login", post(handlers::login::<S, E, G>))
        .route("/auth/me", get(handlers::me::<S, E, G>))
        .route("/auth/verify-email", post(handlers::verify_email::<S, E, G>))
        .route("/auth/resend-code", post(handlers::resend_code::<S, E, G>))
        .route("/auth/forgot-password", post(handlers::forgot_password::<S, E, G>))
        .route("/auth/reset-password", post(handlers::reset_password::<S, E, G>))
        // Applications
        .route("/applications", get(handlers::list_applications::<S, E, G>))
        .route("/applications/{job_id}", post(handlers::apply::<S, E, G>))
        // Notifications
        .route("/notifications", get(handlers::list_notifications::<S, E, G>))
        .route(
            "/notifications/read-all",
            patch(handlers::mark_all_notifications_read::<S, E, G>),
        )
        .route(
            "/notifications/{id}/read",
            patch(handlers::mark_notification_read::<S, E, G>),
        )
        // Payments
        .route("/payments", get(handlers::list_payments::<S, E, G>))
        .route("/payments/stk-push", post(handlers::stk_push::<S, E, G>))
        .route("/payments/callback", post(handlers::payment_callback::<S, E, G>))
        // Wallet
        .route("/wallet/balance", get(handlers::wallet_balance::<S, E, G>))
        .route("/wallet/withdrawals", post(handlers::request_withdrawal::<S, E, G>))
        // Admin
        .route("/admin/accounts/{id}/verify", post(handlers::admin_verify::<S, E, G>))
        .route("/admin/accounts/{id}/unverify", post(handlers::admin_unverify::<S, E, G>))
        .route(
            "/admin/accounts/{id}/connects",
            post(handlers::admin_adjust_connects::<S, E, G>),
        )
        .route("/admin/withdrawals", get(handlers::admin_list_withdrawals::<S, E, G>))
        .route(
            "/admin/withdrawals/{id}/approve",
            post(handlers::admin_approve_withdrawal::<S, E, G>),
        )
        .route(
            "/admin/withdrawals/{id}/reject",
            post(handlers::admin_reject_withdrawal::<S, E, G>),
        )
        .with_state(state)
}
