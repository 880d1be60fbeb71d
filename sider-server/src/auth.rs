//! Login/password authentication interceptor
//!
//! Every call, whichever front door it came through, must carry the
//! configured credential pair in its `login` and `password` metadata. The
//! check runs before the handler, so a rejected call never touches the store.

use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tonic::metadata::MetadataMap;
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// The metadata key carrying the client identifier
pub const LOGIN_METADATA: &str = "login";

/// The metadata key carrying the client secret
pub const PASSWORD_METADATA: &str = "password";

/// Performs a constant-time comparison of two strings to prevent timing attacks.
/// Returns true if the strings are equal.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Length check is not constant-time, but that's acceptable since
    // the expected length is not secret (attacker can see their own requests)
    if a_bytes.len() != b_bytes.len() {
        return false;
    }

    a_bytes.ct_eq(b_bytes).into()
}

/// The single credential pair accepted by the server
#[derive(Clone)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity of an authenticated caller, attached to the request extensions
///
/// Only used for audit logging; it grants nothing beyond "authenticated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the authenticated caller of a request, or `"-"` if there is none
pub fn caller<T>(request: &Request<T>) -> &str {
    request
        .extensions()
        .get::<ClientId>()
        .map(ClientId::as_str)
        .unwrap_or("-")
}

/// Interceptor that checks the credential metadata of every request
#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<Credentials>,
}

impl Authenticator {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }

    /// Validates the credential metadata, returning the caller's identity
    pub fn authenticate(&self, metadata: &MetadataMap) -> Result<ClientId, Status> {
        let login = metadata_str(metadata, LOGIN_METADATA)?;
        let password = metadata_str(metadata, PASSWORD_METADATA)?;

        if !constant_time_compare(login, &self.credentials.login) {
            tracing::warn!(login = %login, "Unknown login");
            return Err(Status::unauthenticated("Invalid credentials"));
        }
        if !constant_time_compare(password, &self.credentials.password) {
            tracing::warn!(login = %login, "Bad password");
            return Err(Status::unauthenticated("Invalid credentials"));
        }

        tracing::debug!(client = %login, "Authenticated client");
        Ok(ClientId(login.to_string()))
    }
}

impl Interceptor for Authenticator {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let client = self.authenticate(req.metadata())?;
        req.extensions_mut().insert(client);
        Ok(req)
    }
}

fn metadata_str<'a>(metadata: &'a MetadataMap, key: &'static str) -> Result<&'a str, Status> {
    match metadata.get(key) {
        Some(value) => value.to_str().map_err(|_| {
            tracing::warn!(key, "Credential metadata is not valid ASCII");
            Status::unauthenticated("Invalid credentials format")
        }),
        None => {
            tracing::warn!(key, "Missing credentials in request");
            Err(Status::unauthenticated("Missing credentials"))
        }
    }
}
