use cookie::{Cookie, SameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderValue, Request, Response};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng as _};
use tracing::warn;

pub const COOKIE_NAME_CSRF_TOKEN: &str = "__Host-csrf_token";
pub const COOKIE_NAME_ADMIN_SESSION: &str = "__Host-admin_session";

pub(crate) fn random_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Cookie state of one request. Each value carries whether the response
/// has to set it again.
#[derive(Clone, Debug)]
#[must_use]
pub struct Session {
    csrf_token: (String, bool),
    admin_session: (Option<String>, bool),
}

impl Session {
    /// Reads the cookies of `request`. A client without a csrf token gets
    /// a fresh one, which it can only echo back on its next request.
    pub fn new<T>(request: &Request<T>) -> Self {
        let mut csrf_token = None;
        let mut admin_session = None;
        request
            .headers()
            .get_all(COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .for_each(|cookie| match cookie.name() {
                COOKIE_NAME_CSRF_TOKEN if !cookie.value().is_empty() => {
                    csrf_token = Some(cookie.value().to_owned());
                }
                COOKIE_NAME_ADMIN_SESSION if !cookie.value().is_empty() => {
                    admin_session = Some(cookie.value().to_owned());
                }
                _ => {
                    // ignore the cookies that are not interesting for us
                }
            });
        Self {
            csrf_token: csrf_token.map_or_else(|| (random_token(30), true), |token| (token, false)),
            admin_session: (admin_session, false),
        }
    }

    #[must_use]
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token.0
    }

    /// Whether the csrf token came from the request rather than being
    /// generated for it.
    #[must_use]
    pub const fn has_client_csrf_token(&self) -> bool {
        !self.csrf_token.1
    }

    #[must_use]
    pub fn admin_session(&self) -> Option<&str> {
        self.admin_session.0.as_deref()
    }

    pub fn set_admin_session(&mut self, token: String) {
        self.admin_session = (Some(token), true);
        // a new privilege level gets a new csrf token
        self.csrf_token = (random_token(30), true);
    }

    pub fn clear_admin_session(&mut self) {
        self.admin_session = (None, true);
    }
}

fn cookie(name: &'static str, value: String, http_only: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .secure(true)
        .http_only(http_only)
        .same_site(SameSite::Strict)
        .build()
}

pub trait ResponseSessionExt {
    #[must_use]
    fn with_session(self, session: &Session) -> Self;
}

impl<B> ResponseSessionExt for Response<B> {
    fn with_session(mut self, session: &Session) -> Self {
        let mut cookies = Vec::new();
        if let (value, true) = &session.csrf_token {
            // readable by scripts, they echo it in the x-csrf-token header
            cookies.push(cookie(COOKIE_NAME_CSRF_TOKEN, value.clone(), false));
        }
        if let (value, true) = &session.admin_session {
            let mut admin = cookie(
                COOKIE_NAME_ADMIN_SESSION,
                value.clone().unwrap_or_default(),
                true,
            );
            if value.is_none() {
                admin.make_removal();
            }
            cookies.push(admin);
        }
        for cookie in cookies {
            match HeaderValue::try_from(cookie.to_string()) {
                Ok(value) => {
                    self.headers_mut().append(SET_COOKIE, value);
                }
                Err(err) => warn!("failed to encode cookie {}: {err}", cookie.name()),
            }
        }
        self
    }
}
