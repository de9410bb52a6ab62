//! Admin session gate.
//!
//! The expected credentials are fixed literals and the logged-in flag lives in
//! a cookie held by the browser. This gates the admin surface of a single-user
//! app and is not a security boundary; a real deployment would need
//! server-side accounts and sessions.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    PrivateCookieJar,
};

use crate::{error::AppError, state::AppState};

pub const SESSION_COOKIE: &str = "is_admin_logged_in";
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, Clone)]
pub struct SessionGate {
    username: String,
    password: String,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new(ADMIN_USERNAME, ADMIN_PASSWORD)
    }
}

impl SessionGate {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn check(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }

    /// On failure the session is left as it was.
    pub fn login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<(), AppError> {
        if !self.check(username, password) {
            return Err(AppError::InvalidCredentials);
        }
        session.is_admin_logged_in = true;
        Ok(())
    }

    pub fn logout(&self, session: &mut Session) {
        session.is_admin_logged_in = false;
    }
}

/// The persisted admin flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    is_admin_logged_in: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.is_admin_logged_in
    }

    pub fn from_jar(jar: &PrivateCookieJar) -> Self {
        let is_admin_logged_in = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value() == "true")
            .unwrap_or(false);
        Self { is_admin_logged_in }
    }

    pub fn persist(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        if self.is_admin_logged_in {
            let cookie = Cookie::build((SESSION_COOKIE, "true"))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            jar.add(cookie)
        } else {
            jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
        }
    }
}

/// Extracts the session from the request cookies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        Ok(Self(Session::from_jar(&jar)))
    }
}

impl AdminSession {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.0.is_authenticated() {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_both_values() {
        let gate = SessionGate::default();
        let mut session = Session::default();
        assert!(!session.is_authenticated());

        assert!(matches!(
            gate.login(&mut session, "admin", "wrong"),
            Err(AppError::InvalidCredentials)
        ));
        assert!(!session.is_authenticated());

        gate.login(&mut session, "admin", "admin").unwrap();
        assert!(session.is_authenticated());

        gate.logout(&mut session);
        assert!(!session.is_authenticated());
    }
}
