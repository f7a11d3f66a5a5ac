//! Authentication Extractors
//!
//! `AuthAccount` accepts a valid bearer token whose session version still
//! matches the account's. `AdminAccount` additionally requires the admin role.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use kernel::id::AccountId;

use crate::application::session::verify_token;
use crate::domain::entity::account::Account;
use crate::domain::gateway::{EmailSender, PaymentGateway};
use crate::domain::repository::BoardStore;
use crate::error::BoardError;
use crate::presentation::handlers::BoardAppState;

/// Caller identified by a valid session token
#[derive(Debug, Clone, Copy)]
pub struct AuthAccount(pub AccountId);

/// Caller holding the admin role
#[derive(Debug, Clone, Copy)]
pub struct AdminAccount(pub AccountId);

/// Token checks shared by both extractors; yields the current account
async fn authenticate<S, E, G>(
    parts: &mut Parts,
    state: &BoardAppState<S, E, G>,
) -> Result<Account, BoardError>
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| BoardError::Unauthenticated)?;

    let claims = verify_token(&state.config, bearer.token(), state.clock.now())?;

    let account = state
        .store
        .find_account(&claims.account_id)
        .await?
        .ok_or(BoardError::Unauthenticated)?;

    // Password reset and admin revocation bump the version
    if account.session_version != claims.session_version {
        return Err(BoardError::Unauthenticated);
    }

    Ok(account)
}

impl<S, E, G> FromRequestParts<BoardAppState<S, E, G>> for AuthAccount
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    type Rejection = BoardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BoardAppState<S, E, G>,
    ) -> Result<Self, Self::Rejection> {
        let account = authenticate(parts, state).await?;
        Ok(Self(account.id))
    }
}

impl<S, E, G> FromRequestParts<BoardAppState<S, E, G>> for AdminAccount
where
    S: BoardStore,
    E: EmailSender + Sync + 'static,
    G: PaymentGateway + Sync + 'static,
{
    type Rejection = BoardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BoardAppState<S, E, G>,
    ) -> Result<Self, Self::Rejection> {
        // Role is read fresh so a demotion takes effect without re-login
        let account = authenticate(parts, state).await?;

        if !account.is_admin() {
            return Err(BoardError::Forbidden("Admin access required".into()));
        }

        Ok(Self(account.id))
    }
}
