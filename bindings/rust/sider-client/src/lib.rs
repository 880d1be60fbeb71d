//! # Sider Client
//!
//! A high-level Rust client for the Sider key-value store.
//!
//! This crate provides a simple, ergonomic API for interacting with a Sider server,
//! hiding the underlying gRPC details and attaching the login/password
//! metadata the server requires on every call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sider_client::{SiderClient, SiderClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sider_client::Error> {
//!     let options = SiderClientOptions::new("http://localhost:7777")
//!         .with_credentials("john", "doe");
//!     let client = SiderClient::with_options(options).await?;
//!
//!     // Store a value that never expires
//!     client.set("my-key", "my-value", None).await?;
//!
//!     // Retrieve the value and its expiry
//!     if let Some((value, expires)) = client.get("my-key").await? {
//!         println!("Got: {:?} (expires: {})", value, expires);
//!     }
//!
//!     client.remove("my-key").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## JSON Serialization (requires `json` feature)
//!
//! Values are opaque bytes to the server. The `json` feature encodes typed
//! values on the client side; the server never sees the type.
//!
//! ```rust,ignore
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! let user = User { name: "Alice".into(), age: 30 };
//! client.set_json("user:1", &user, None).await?;
//! let retrieved: Option<User> = client.get_json("user:1").await?;
//! ```

mod error;
mod options;

pub use error::Error;
pub use options::SiderClientOptions;

use bytes::Bytes;
use tonic::metadata::MetadataValue;
use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;
use tonic::transport::Channel;
use tonic::{Request, Status};

pub use sider_proto as proto;

use proto::sider_client::SiderClient as GrpcClient;
use proto::{
    DeleteExpiredRequest, FlushRequest, GetRequest, KeysRequest, RemoveRequest, SetRequest,
    SnapshotRequest, TtlRequest, UpdateRequest,
};

/// Expiry value meaning "never expires"
pub const NEVER_EXPIRES: i64 = -1;

/// Value returned by [`SiderClient::ttl`] for a key that does not exist
pub const KEY_MISSING_TTL: i64 = -2;

/// Interceptor that adds the credential metadata to all requests
#[derive(Clone)]
struct CredentialsInterceptor {
    login: MetadataValue<tonic::metadata::Ascii>,
    password: MetadataValue<tonic::metadata::Ascii>,
}

impl CredentialsInterceptor {
    fn new(login: &str, password: &str) -> Result<Self, Error> {
        let invalid = |_| Error::Connection("credentials must be printable ASCII".to_string());
        Ok(Self {
            login: MetadataValue::try_from(login).map_err(invalid)?,
            password: MetadataValue::try_from(password).map_err(invalid)?,
        })
    }
}

impl Interceptor for CredentialsInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        req.metadata_mut().insert("login", self.login.clone());
        req.metadata_mut().insert("password", self.password.clone());
        Ok(req)
    }
}

type InterceptedClient = GrpcClient<InterceptedService<Channel, CredentialsInterceptor>>;

/// A high-level client for the Sider key-value store.
///
/// The client is thread-safe and can be cloned cheaply; clones share the
/// underlying HTTP/2 connection.
#[derive(Clone)]
pub struct SiderClient {
    inner: InterceptedClient,
}

impl SiderClient {
    /// Connect to a Sider server with the given options.
    pub async fn with_options(options: SiderClientOptions) -> Result<Self, Error> {
        let interceptor = CredentialsInterceptor::new(&options.login, &options.password)?;

        let channel = Channel::from_shared(options.url)
            .map_err(|e| Error::Connection(e.to_string()))?
            .connect()
            .await?;

        Ok(Self {
            inner: GrpcClient::with_interceptor(channel, interceptor),
        })
    }

    /// Connect using `SIDER_SERVER_URL`, `SIDER_LOGIN` and `SIDER_PASSWORD`.
    pub async fn from_env() -> Result<Self, Error> {
        Self::with_options(SiderClientOptions::from_env()).await
    }

    /// Set the key to hold the value, replacing any existing entry.
    ///
    /// `expires` is an absolute Unix timestamp in nanoseconds. `None` means
    /// the entry never expires.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Bytes>,
        expires: Option<i64>,
    ) -> Result<(), Error> {
        let mut client = self.inner.clone();
        client
            .set(SetRequest {
                key: key.into(),
                value: value.into(),
                expires: expires.unwrap_or(NEVER_EXPIRES),
            })
            .await?;
        Ok(())
    }

    /// Retrieve a value and its stored expiry.
    ///
    /// Returns `None` if the key doesn't exist. Entries past their expiry are
    /// still returned until the server sweeps them.
    pub async fn get(&self, key: impl Into<String>) -> Result<Option<(Bytes, i64)>, Error> {
        let mut client = self.inner.clone();
        match client.get(GetRequest { key: key.into() }).await {
            Ok(response) => {
                let inner = response.into_inner();
                Ok(Some((inner.value, inner.expires)))
            }
            Err(status) if status.code() == tonic::Code::NotFound => Ok(None),
            Err(status) => Err(status.into()),
        }
    }

    /// Replace the value of an existing key, keeping its expiry.
    ///
    /// Fails with [`Error::NotFound`] if the key doesn't exist.
    pub async fn update(&self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<(), Error> {
        let mut client = self.inner.clone();
        client
            .update(UpdateRequest {
                key: key.into(),
                value: value.into(),
            })
            .await?;
        Ok(())
    }

    /// Remove a key. Succeeds whether or not the key exists.
    pub async fn remove(&self, key: impl Into<String>) -> Result<(), Error> {
        let mut client = self.inner.clone();
        client.remove(RemoveRequest { key: key.into() }).await?;
        Ok(())
    }

    /// List all keys containing a match for the regular expression `pattern`.
    ///
    /// A pattern that is not a valid regular expression matches nothing.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use sider_client::SiderClient;
    /// # async fn example(client: SiderClient) -> Result<(), sider_client::Error> {
    /// // Keys starting with "user:"
    /// let user_keys = client.keys("^user:").await?;
    ///
    /// // All keys
    /// let all_keys = client.keys("").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn keys(&self, pattern: impl Into<String>) -> Result<Vec<String>, Error> {
        let mut client = self.inner.clone();
        let response = client
            .keys(KeysRequest {
                pattern: pattern.into(),
            })
            .await?;
        Ok(response.into_inner().keys)
    }

    /// Stored expiry of a key: the absolute timestamp, [`NEVER_EXPIRES`],
    /// or [`KEY_MISSING_TTL`] if the key doesn't exist.
    pub async fn ttl(&self, key: impl Into<String>) -> Result<i64, Error> {
        let mut client = self.inner.clone();
        let response = client.ttl(TtlRequest { key: key.into() }).await?;
        Ok(response.into_inner().time)
    }

    /// Remove every key. Returns the number of entries removed.
    pub async fn flush(&self) -> Result<u64, Error> {
        let mut client = self.inner.clone();
        let response = client.flush(FlushRequest {}).await?;
        Ok(response.into_inner().removed)
    }

    /// Ask the server to sweep expired entries now. Returns the number removed.
    pub async fn delete_expired(&self) -> Result<u64, Error> {
        let mut client = self.inner.clone();
        let response = client.delete_expired(DeleteExpiredRequest {}).await?;
        Ok(response.into_inner().removed)
    }

    /// Ask the server to write a snapshot to its configured path.
    ///
    /// Returns the path written and the number of entries saved.
    pub async fn snapshot(&self) -> Result<(String, u64), Error> {
        let mut client = self.inner.clone();
        let response = client.snapshot(SnapshotRequest {}).await?.into_inner();
        Ok((response.path, response.entries))
    }
}

// JSON extension methods (only available with "json" feature)
#[cfg(feature = "json")]
impl SiderClient {
    /// Store a JSON-serializable value.
    pub async fn set_json<T: serde::Serialize>(
        &self,
        key: impl Into<String>,
        value: &T,
        expires: Option<i64>,
    ) -> Result<(), Error> {
        let json = serde_json::to_vec(value).map_err(Error::Serialization)?;
        self.set(key, json, expires).await
    }

    /// Retrieve and deserialize a JSON value.
    ///
    /// Returns `None` if the key doesn't exist.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: impl Into<String>,
    ) -> Result<Option<T>, Error> {
        match self.get(key).await? {
            Some((bytes, _)) => {
                let value = serde_json::from_slice(&bytes).map_err(Error::Deserialization)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interceptor_adds_credentials() {
        let mut interceptor = CredentialsInterceptor::new("john", "doe").unwrap();
        let req = interceptor.call(Request::new(())).unwrap();

        assert_eq!(req.metadata().get("login").unwrap().to_str().unwrap(), "john");
        assert_eq!(req.metadata().get("password").unwrap().to_str().unwrap(), "doe");
    }

    #[test]
    fn test_interceptor_rejects_non_ascii_credentials() {
        assert!(CredentialsInterceptor::new("john", "pa\nss").is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = SiderClientOptions::new("http://example:7777").with_credentials("a", "b");
        assert_eq!(options.url, "http://example:7777");
        assert_eq!(options.login, "a");
        assert_eq!(options.password, "b");
        assert!(!format!("{:?}", options).contains("\"b\""));
    }

    #[tokio::test]
    async fn test_invalid_url_is_connection_error() {
        let options = SiderClientOptions::new("not a url").with_credentials("john", "doe");
        let result = SiderClient::with_options(options).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
