//! Auth session lifecycle and access gating
//!
//! Tracks whether the client is unauthenticated, a guest, or holds a
//! decoded (non-authoritative) identity token, and answers route-guard
//! queries for the UI layer. Only the gateway backend is authoritative
//! for identity and expiry; everything here is an optimistic local view.

use std::sync::Arc;

use crate::auth::token::{decode_token, TokenClaims};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::session::SessionStore;

/// Access-gating state of the client
#[derive(Debug, Clone)]
pub enum AuthState {
    /// No usable token and no guest flag
    Unauthenticated,
    /// Access granted via the local guest flag, without an identity
    Guest,
    /// A stored token decoded successfully and has not expired
    Authenticated(TokenClaims),
    /// A stored token decoded but its expiry lies in the past
    ///
    /// Transient: loading immediately clears local session data and
    /// settles on [`AuthState::Unauthenticated`].
    Expired,
}

impl AuthState {
    /// Whether this state grants access to non-auth views
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Guest | Self::Authenticated(_))
    }
}

/// A navigable view, for route-guard evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The auth entry view (login/register)
    Login,
    /// The main chat view
    Chat,
    /// The conversation history view
    History,
}

/// Owns the access-token lifecycle and access-gating state
///
/// The token and guest flag persist in the [`SessionStore`]; the decoded
/// state lives here in memory and is recomputed by [`AuthSession::load`].
pub struct AuthSession {
    store: Arc<SessionStore>,
    state: AuthState,
}

impl AuthSession {
    /// Create a session in the `Unauthenticated` state
    ///
    /// Call [`AuthSession::load`] to recompute the state from storage.
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            state: AuthState::Unauthenticated,
        }
    }

    /// Current access-gating state
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Decoded claims when authenticated
    pub fn claims(&self) -> Option<&TokenClaims> {
        match &self.state {
            AuthState::Authenticated(claims) => Some(claims),
            _ => None,
        }
    }

    /// Recompute the state from the stored token and guest flag
    ///
    /// Decoding the stored token never verifies its signature; the
    /// result is a UI hint only. An expired token moves the session
    /// through `Expired`, clears the token and local session data, and
    /// settles on `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `MitraError::TokenDecode` when a stored token cannot be
    /// decoded; local session data is cleared and the state is
    /// `Unauthenticated` before the error is returned.
    pub fn load(&mut self) -> Result<&AuthState> {
        let token = self.store.load_token()?;

        if let Some(token) = token {
            let claims = match decode_token(&token) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::warn!("Stored token failed to decode, clearing session");
                    self.clear_session_data()?;
                    self.state = AuthState::Unauthenticated;
                    return Err(e);
                }
            };

            if claims.is_expired() {
                tracing::info!("Stored token expired at {}", claims.expires_at());
                self.state = AuthState::Expired;
                self.clear_session_data()?;
                self.state = AuthState::Unauthenticated;
                return Ok(&self.state);
            }

            self.state = AuthState::Authenticated(claims);
            return Ok(&self.state);
        }

        if self.store.guest_mode()? {
            self.state = AuthState::Guest;
        } else {
            self.state = AuthState::Unauthenticated;
        }

        Ok(&self.state)
    }

    /// Log in through the gateway and persist the granted token
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Network` or `MitraError::Authentication`
    /// from the gateway, or `MitraError::TokenDecode` when the granted
    /// token cannot be decoded
    pub async fn login(&mut self, gateway: &dyn Gateway, email: &str, password: &str) -> Result<()> {
        let grant = gateway.login(email, password).await?;
        self.adopt_token(&grant.access_token)
    }

    /// Register through the gateway and persist the granted token
    pub async fn register(
        &mut self,
        gateway: &dyn Gateway,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let grant = gateway.register(email, username, password).await?;
        self.adopt_token(&grant.access_token)
    }

    /// Clear the token, the guest flag, and the in-memory state
    pub fn logout(&mut self) -> Result<()> {
        self.clear_session_data()?;
        self.state = AuthState::Unauthenticated;
        Ok(())
    }

    /// Grant access without an identity, via the local guest flag
    pub fn enter_guest_mode(&mut self) -> Result<()> {
        self.store.set_guest_mode(true)?;
        self.state = AuthState::Guest;
        Ok(())
    }

    /// Evaluate the route guard for the given view
    ///
    /// Returns the view to redirect to, or None when the current view
    /// is permitted: an unauthenticated session is sent to the auth
    /// entry view from anywhere else, and a guest or authenticated
    /// session is sent away from the auth entry view.
    pub fn redirect(&self, current: Route) -> Option<Route> {
        match (&self.state, current) {
            (AuthState::Unauthenticated | AuthState::Expired, route) if route != Route::Login => {
                Some(Route::Login)
            }
            (AuthState::Guest | AuthState::Authenticated(_), Route::Login) => Some(Route::Chat),
            _ => None,
        }
    }

    fn adopt_token(&mut self, token: &str) -> Result<()> {
        let claims = match decode_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                self.clear_session_data()?;
                self.state = AuthState::Unauthenticated;
                return Err(e);
            }
        };

        self.store.save_token(token)?;
        self.store.set_guest_mode(false)?;
        tracing::info!("Authenticated as {}", claims.email);
        self.state = AuthState::Authenticated(claims);
        Ok(())
    }

    fn clear_session_data(&self) -> Result<()> {
        self.store.clear_token()?;
        self.store.set_guest_mode(false)?;
        Ok(())
    }
}
