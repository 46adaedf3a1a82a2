// HTTP Basic authentication (RFC 7617) against per-realm password files.
//
// a password file is parsed once, then kept in a `Cache` (keyed by its path)
// for `REALM_CACHE_TTL`; every request for the same realm shares that one
// parse. passwords are compared in plaintext -- no hashing, no salting.

mod middleware;

use std::fmt::Debug;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;
use base64::engine::general_purpose;
use base64::Engine;
pub use middleware::require_basic_auth;
pub use middleware::AuthenticatedUser;
pub use middleware::ProtectedRealms;
use secrecy::ExposeSecret;
use secrecy::Secret;

use crate::cache::Cache;
use crate::cache::Checkout;
use crate::realm::load_password_file;
use crate::realm::RealmCredentialStore;
use crate::realm::RealmName;
use crate::realm::LINE_BUFFER_CAPACITY;
use crate::routes::error_chain_fmt;

/// How long a parsed password file is served before it is re-read
pub const REALM_CACHE_TTL: Duration = Duration::from_secs(60);

const BASIC_PREFIX: &[u8] = b"Basic ";

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

/// Why a request was not authorized. This is for logs only; clients always
/// get the same challenge (see `Unauthorized`), whatever the variant.
#[derive(thiserror::Error)]
pub enum AuthError {
    #[error("No Authorization header")]
    MissingHeader,
    /// Wrong scheme, undecodable payload, oversized payload, no separator
    #[error("Malformed Authorization header")]
    Protocol(#[source] anyhow::Error),
    #[error("Password file is unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
    /// Unknown username or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error("Authorizer has been shut down")]
    ShutDown,
}

impl Debug for AuthError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)?;
        Ok(())
    }
}

/// A failed authorization, bound to the realm whose challenge must be sent
/// back. Every `AuthError` ends up as the same 401 with an empty body and a
/// single `WWW-Authenticate: Basic realm="<realm>"` header.
#[derive(thiserror::Error)]
#[error("Unauthorized for realm {realm}")]
pub struct Unauthorized {
    realm: RealmName,
    #[source]
    cause: AuthError,
}

impl Unauthorized {
    pub fn cause(&self) -> &AuthError { &self.cause }
}

impl Debug for Unauthorized {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)?;
        Ok(())
    }
}

impl ResponseError for Unauthorized {
    fn status_code(&self) -> StatusCode { StatusCode::UNAUTHORIZED }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        let mut resp = HttpResponse::new(StatusCode::UNAUTHORIZED);
        resp.headers_mut()
            .insert(header::WWW_AUTHENTICATE, self.realm.challenge().clone());
        resp
    }
}

/// A successful authorization. Holds a reference to the password file it was
/// checked against; keep it alive for as long as the request is in flight.
pub struct Authorized {
    user: AuthenticatedUser,
    _store: Checkout<RealmCredentialStore>,
}

impl Authorized {
    pub fn user(&self) -> &AuthenticatedUser { &self.user }
}

/// Process-wide owner of the password file cache. Create one with `init` at
/// startup, share it (e.g. via `web::Data`), and call `shutdown` once the
/// server has stopped.
pub struct HttpAuthorizer {
    cache: Cache<RealmCredentialStore>,
    shut_down: AtomicBool,
}

impl HttpAuthorizer {
    /// Password files are read from disk, and cached for `ttl`
    pub fn init(ttl: Duration) -> Self {
        Self::with_loader(
            |path: &str| {
                load_password_file(Path::new(path))
                    .with_context(|| format!("Failed to load password file {path:?}"))
            },
            ttl,
        )
    }

    /// Like `init`, with a custom way of turning a realm key into a store
    pub fn with_loader<F>(
        loader: F,
        ttl: Duration,
    ) -> Self
    where
        F: Fn(&str) -> Result<RealmCredentialStore, anyhow::Error> + Send + Sync + 'static,
    {
        let cache = Cache::new(loader, ttl);
        tracing::info!(ttl_secs = cache.ttl().as_secs(), "Created password file cache");
        Self {
            cache,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Drop every cached password file. Only the first call has an effect;
    /// afterwards, every request is refused, including those that were already
    /// loading a password file when this was called.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::warn!("Password file cache was already shut down");
            return;
        }
        match self.cache.clear() {
            Ok(()) => tracing::info!("Password file cache shut down"),
            Err(e) => tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "Failed to clear password file cache"
            ),
        }
    }

    pub fn is_shut_down(&self) -> bool { self.shut_down.load(Ordering::SeqCst) }

    /// Check a raw `Authorization` header value against `password_file`.
    ///
    /// On failure, the returned error renders as a 401 carrying `realm`'s
    /// challenge; nothing about the cause is revealed to the client.
    #[tracing::instrument(
        name = "Authorizing request",
        skip(self, authorization),
        fields(
            username=tracing::field::Empty,
        )
    )]
    pub fn authorize(
        &self,
        authorization: Option<&[u8]>,
        realm: &RealmName,
        password_file: &str,
    ) -> Result<Authorized, Unauthorized> {
        self.check(authorization, password_file).map_err(|cause| {
            tracing::info!(error.cause_chain = ?cause, "Request was not authorized");
            Unauthorized {
                realm: realm.clone(),
                cause,
            }
        })
    }

    fn check(
        &self,
        authorization: Option<&[u8]>,
        password_file: &str,
    ) -> Result<Authorized, AuthError> {
        if self.is_shut_down() {
            return Err(AuthError::ShutDown);
        }

        let encoded = authorization
            .ok_or(AuthError::MissingHeader)?
            .strip_prefix(BASIC_PREFIX)
            .context("Authorization scheme was not 'Basic'")
            .map_err(AuthError::Protocol)?;

        let store = self
            .cache
            .checkout(password_file)
            .map_err(AuthError::StoreUnavailable)?;

        // shut down while the password file was loading: its slot may have
        // been put back after the cache was cleared
        if self.is_shut_down() {
            drop(store);
            if let Err(e) = self.cache.invalidate(password_file) {
                tracing::error!(error.cause_chain = ?e, "Failed to evict password file");
            }
            return Err(AuthError::ShutDown);
        }

        let creds = basic_authentication(encoded).map_err(AuthError::Protocol)?;

        tracing::Span::current().record("username", tracing::field::display(&creds.username));

        verify_password(&store, &creds).map_err(AuthError::InvalidCredentials)?;

        Ok(Authorized {
            user: AuthenticatedUser::new(creds.username),
            _store: store,
        })
    }
}

/// Decode the part of the header following `Basic `. This does not validate
/// the credentials; for that, see `verify_password`.
fn basic_authentication(encoded: &[u8]) -> Result<Credentials, anyhow::Error> {
    // zeroized when dropped, on every path out of this function
    let decoded = Secret::new(
        general_purpose::STANDARD
            .decode(encoded)
            .context("Failed to decode base64")?,
    );
    let decoded = decoded.expose_secret();

    // nothing longer than a password file line can possibly match
    if decoded.len() >= LINE_BUFFER_CAPACITY {
        anyhow::bail!(
            "Decoded credentials are {} bytes, the limit is {}",
            decoded.len(),
            LINE_BUFFER_CAPACITY - 1
        );
    }

    let colon = decoded
        .iter()
        .position(|&b| b == b':')
        .context("No ':' separator in credentials")?;

    let username = std::str::from_utf8(&decoded[..colon])
        .context("Username is not valid UTF-8")?
        .to_string();
    let password = std::str::from_utf8(&decoded[colon + 1..])
        .context("Password is not valid UTF-8")?
        .to_string();

    Ok(Credentials {
        username,
        password: Secret::new(password),
    })
}

fn verify_password(
    store: &RealmCredentialStore,
    creds: &Credentials,
) -> Result<(), anyhow::Error> {
    let stored = store
        .lookup(&creds.username)
        .context("No user with the supplied username was found in password file")?;
    if stored.as_bytes() != creds.password.expose_secret().as_bytes() {
        anyhow::bail!("Invalid password");
    }
    Ok(())
}
