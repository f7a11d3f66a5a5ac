//! HTTP Handlers

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::clock::Clock;
use kernel::error::app_error::AppError;
use kernel::id::{AccountId, NotificationId, WithdrawalId};
use std::sync::Arc;

use crate::application::config::BoardConfig;
use crate::application::{
    AdminUseCase, ApplyInput, ApplyJobUseCase, CallbackPayload, GetAccountUseCase, LoginInput,
    LoginUseCase, NotificationsUseCase, PaymentUseCase, RegisterInput, RegisterUseCase,
    VerificationUseCase, WalletUseCase, WithdrawalInput,
};
use crate::domain::entity::account::{Account, ApplyOutcome, CodePurpose};
use crate::domain::entity::notification::Notification;
use crate::domain::entity::withdrawal::Withdrawal;
use crate::domain::gateway::{EmailSender, PaymentGateway};
use crate::domain::repository::BoardStore;
use crate::error::{BoardError, BoardResult};
use crate::presentation::dto::{
    AccountResponse, AdjustConnectsRequest, ApplicationsResponse, ApplyRequest, ApplyResponse,
    BalanceResponse, ConnectsResponse, EmailRequest, LoginRequest, LoginResponse,
    MarkAllReadResponse, MessageResponse, PaymentCallbackRequest, PaymentResponse,
    QuotaExceededResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    StkPushRequest, StkPushResponse, VerifyEmailRequest, WithdrawalRequest,
};
use crate::presentation::extract::{AdminAccount, AuthAccount};

/// Shared state for board handlers
pub struct BoardAppState<S, E, G> {
    pub store: Arc<S>,
    pub mailer: Arc<E>,
    pub gateway: Arc<G>,
    pub config: Arc<BoardConfig>,
    pub clock: Arc<dyn Clock>,
}

// Manual impl: derive would require `S: Clone` etc.
impl<S, E, G> Clone for BoardAppState<S, E, G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mailer: self.mailer.clone(),
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S, E, G> BoardAppState<S, E, G>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    pub fn new(store: S, mailer: E, gateway: G, config: BoardConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            mailer: Arc::new(mailer),
            gateway: Arc::new(gateway),
            config: Arc::new(config),
            clock,
        }
    }

    fn verification(&self) -> VerificationUseCase<S, E> {
        VerificationUseCase::new(
            self.store.clone(),
            self.mailer.clone(),
            self.config.clone(),
            self.clock.clone(),
        )
    }

    fn payments(&self) -> PaymentUseCase<S, S, S, G> {
        PaymentUseCase::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.gateway.clone(),
            self.config.clone(),
            self.clock.clone(),
        )
    }

    fn wallet(&self) -> WalletUseCase<S, S, S> {
        WalletUseCase::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.config.clone(),
            self.clock.clone(),
        )
    }

    fn admin(&self) -> AdminUseCase<S, S> {
        AdminUseCase::new(self.store.clone(), self.store.clone(), self.clock.clone())
    }

    fn account_response(&self, account: &Account) -> AccountResponse {
        let now = self.clock.now();
        let unlimited = account.is_unlimited(self.config.unlimited_policy, now);
        AccountResponse::from_account(account, unlimited, now)
    }
}

fn parse_id<T>(raw: &str) -> BoardResult<kernel::id::Id<T>> {
    raw.parse().map_err(|e| BoardError::from(AppError::from(e)))
}

// ============================================================================
// Registration / Login
// ============================================================================

/// POST /auth/register
pub async fn register<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    Json(req): Json<RegisterRequest>,
) -> BoardResult<impl IntoResponse>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let use_case = RegisterUseCase::new(state.store.clone(), state.config.clone(), state.clock.clone());

    let output = use_case
        .execute(RegisterInput {
            name: req.name,
            email: req.email,
            password: req.password,
            phone: req.phone,
        })
        .await?;

    // Best effort: the account exists either way and the code can be resent
    let verification_sent = match state
        .verification()
        .issue_code(&output.account_id, CodePurpose::EmailVerify)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(
                account_id = %output.account_id,
                error = %e,
                "Verification email not sent at registration"
            );
            false
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account_id: output.account_id.to_string(),
            email: output.email.as_str().to_string(),
            connects: output.connects,
            verification_sent,
        }),
    ))
}

/// POST /auth/login
pub async fn login<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    Json(req): Json<LoginRequest>,
) -> BoardResult<Json<LoginResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let use_case = LoginUseCase::new(state.store.clone(), state.config.clone(), state.clock.clone());

    let output = use_case
        .execute(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(LoginResponse {
        account_id: output.account_id.to_string(),
        token: output.token,
        expires_at_ms: output.expires_at_ms,
        email_verified: output.email_verified,
    }))
}

/// GET /auth/me
pub async fn me<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
) -> BoardResult<Json<AccountResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let account = GetAccountUseCase::new(state.store.clone())
        .execute(&account_id)
        .await?;

    Ok(Json(state.account_response(&account)))
}

// ============================================================================
// Verification Codes
// ============================================================================

/// POST /auth/verify-email
pub async fn verify_email<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
    Json(req): Json<VerifyEmailRequest>,
) -> BoardResult<Json<MessageResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    state.verification().verify_email(&account_id, &req.code).await?;

    Ok(Json(MessageResponse::new("Email verified")))
}

/// POST /auth/resend-code
pub async fn resend_code<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    Json(req): Json<EmailRequest>,
) -> BoardResult<Json<MessageResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    state
        .verification()
        .issue_code_for_email(&req.email, CodePurpose::EmailVerify)
        .await?;

    Ok(Json(MessageResponse::new("Verification code sent")))
}

/// POST /auth/forgot-password
pub async fn forgot_password<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    Json(req): Json<EmailRequest>,
) -> BoardResult<Json<MessageResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    state
        .verification()
        .issue_code_for_email(&req.email, CodePurpose::PasswordReset)
        .await?;

    Ok(Json(MessageResponse::new("Password reset code sent")))
}

/// POST /auth/reset-password
pub async fn reset_password<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    Json(req): Json<ResetPasswordRequest>,
) -> BoardResult<Json<MessageResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    state
        .verification()
        .reset_password_for_email(&req.email, &req.code, req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password updated")))
}

// ============================================================================
// Applications
// ============================================================================

/// POST /applications/{job_id}
///
/// Out of connects is a 402 carrying `requiresPurchase` so the client can
/// route straight to checkout.
pub async fn apply<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
    Path(job_id): Path<String>,
    Json(req): Json<ApplyRequest>,
) -> BoardResult<Response>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let use_case = ApplyJobUseCase::new(
        state.store.clone(),
        state.store.clone(),
        state.config.clone(),
        state.clock.clone(),
    );

    let input = ApplyInput {
        job_id,
        title: req.title,
        company: req.company,
        description: req.description,
    };

    match use_case.execute(&account_id, input).await {
        Ok(outcome) => Ok(Json(ApplyResponse {
            applied: matches!(outcome, ApplyOutcome::Applied { .. }),
            already_applied: matches!(outcome, ApplyOutcome::AlreadyApplied { .. }),
            connects: outcome.connects(),
        })
        .into_response()),
        Err(e) if e.requires_purchase() => Ok((
            StatusCode::PAYMENT_REQUIRED,
            Json(QuotaExceededResponse {
                message: "You don't have enough connects to apply for this job.".to_string(),
                requires_purchase: true,
            }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// GET /applications
pub async fn list_applications<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
) -> BoardResult<Json<ApplicationsResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let applications = GetAccountUseCase::new(state.store.clone())
        .applications(&account_id)
        .await?;

    Ok(Json(ApplicationsResponse { applications }))
}

// ============================================================================
// Notifications
// ============================================================================

/// GET /notifications
pub async fn list_notifications<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
) -> BoardResult<Json<Vec<Notification>>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let notifications = NotificationsUseCase::new(state.store.clone())
        .list(&account_id)
        .await?;

    Ok(Json(notifications))
}

/// PATCH /notifications/{id}/read
pub async fn mark_notification_read<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
    Path(id): Path<String>,
) -> BoardResult<StatusCode>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let id: NotificationId = parse_id(&id)?;

    NotificationsUseCase::new(state.store.clone())
        .mark_read(&account_id, &id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /notifications/read-all
pub async fn mark_all_notifications_read<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
) -> BoardResult<Json<MarkAllReadResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let updated = NotificationsUseCase::new(state.store.clone())
        .mark_all_read(&account_id)
        .await?;

    Ok(Json(MarkAllReadResponse { updated }))
}

// ============================================================================
// Payments
// ============================================================================

/// POST /payments/stk-push
pub async fn stk_push<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
    Json(req): Json<StkPushRequest>,
) -> BoardResult<Json<StkPushResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let record = state
        .payments()
        .initiate(&account_id, &req.phone, req.amount)
        .await?;

    Ok(Json(StkPushResponse {
        payment_id: record.id.to_string(),
        status: record.status,
        message: "Payment prompt sent to your phone".to_string(),
    }))
}

/// POST /payments/callback?sig=...
///
/// Always 200, even for bodies that do not parse or carry a bad signature:
/// the gateway retries on anything else.
pub async fn payment_callback<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> StatusCode
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let req = match serde_json::from_slice::<PaymentCallbackRequest>(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable payment callback acknowledged");
            return StatusCode::OK;
        }
    };

    let outcome = state
        .payments()
        .on_callback(CallbackPayload {
            external_reference: req.external_reference,
            status: req.status,
            signature: query.as_deref().and_then(callback_signature),
        })
        .await;

    tracing::debug!(?outcome, "Payment callback handled");

    StatusCode::OK
}

/// base64url never needs percent-decoding
fn callback_signature(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("sig="))
        .map(str::to_string)
}

/// GET /payments
pub async fn list_payments<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
) -> BoardResult<Json<Vec<PaymentResponse>>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let payments = state.payments().list(&account_id).await?;

    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

// ============================================================================
// Wallet
// ============================================================================

/// GET /wallet/balance
pub async fn wallet_balance<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
) -> BoardResult<Json<BalanceResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let balance = state.wallet().balance(&account_id).await?;

    Ok(Json(BalanceResponse { balance }))
}

/// POST /wallet/withdrawals
pub async fn request_withdrawal<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AuthAccount(account_id): AuthAccount,
    Json(req): Json<WithdrawalRequest>,
) -> BoardResult<impl IntoResponse>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let withdrawal = state
        .wallet()
        .request_withdrawal(
            &account_id,
            WithdrawalInput {
                amount: req.amount,
                method: req.method,
                address: req.address,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

// ============================================================================
// Admin
// ============================================================================

/// POST /admin/accounts/{id}/verify
pub async fn admin_verify<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AdminAccount(admin_id): AdminAccount,
    Path(id): Path<String>,
) -> BoardResult<Json<AccountResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let account_id: AccountId = parse_id(&id)?;
    let account = state.admin().grant_verification(&account_id).await?;

    tracing::info!(admin_id = %admin_id, account_id = %account_id, "Admin verification granted");

    Ok(Json(state.account_response(&account)))
}

/// POST /admin/accounts/{id}/unverify
pub async fn admin_unverify<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AdminAccount(admin_id): AdminAccount,
    Path(id): Path<String>,
) -> BoardResult<Json<AccountResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let account_id: AccountId = parse_id(&id)?;
    let account = state.admin().revoke_verification(&account_id).await?;

    tracing::info!(admin_id = %admin_id, account_id = %account_id, "Admin verification revoked");

    Ok(Json(state.account_response(&account)))
}

/// POST /admin/accounts/{id}/connects
pub async fn admin_adjust_connects<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AdminAccount(admin_id): AdminAccount,
    Path(id): Path<String>,
    Json(req): Json<AdjustConnectsRequest>,
) -> BoardResult<Json<ConnectsResponse>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let account_id: AccountId = parse_id(&id)?;
    let connects = state.admin().adjust_connects(&account_id, req.delta).await?;

    tracing::info!(
        admin_id = %admin_id,
        account_id = %account_id,
        delta = req.delta,
        connects,
        "Connects adjusted"
    );

    Ok(Json(ConnectsResponse { connects }))
}

/// GET /admin/withdrawals
pub async fn admin_list_withdrawals<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AdminAccount(_): AdminAccount,
) -> BoardResult<Json<Vec<Withdrawal>>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    Ok(Json(state.wallet().list_pending().await?))
}

/// POST /admin/withdrawals/{id}/approve
pub async fn admin_approve_withdrawal<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AdminAccount(_): AdminAccount,
    Path(id): Path<String>,
) -> BoardResult<Json<Withdrawal>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let id: WithdrawalId = parse_id(&id)?;

    Ok(Json(state.wallet().approve(&id).await?))
}

/// POST /admin/withdrawals/{id}/reject
pub async fn admin_reject_withdrawal<S, E, G>(
    State(state): State<BoardAppState<S, E, G>>,
    AdminAccount(_): AdminAccount,
    Path(id): Path<String>,
) -> BoardResult<Json<Withdrawal>>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let id: WithdrawalId = parse_id(&id)?;

    Ok(Json(state.wallet().reject(&id).await?))
}
