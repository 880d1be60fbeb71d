//! Sider Integration Tests
//!
//! Runs against a live Sider server using the sider-client library.
//! Configure the target with `SIDER_SERVER_URL`, `SIDER_LOGIN` and `SIDER_PASSWORD`.

use anyhow::Result;
use futures::future::join_all;
use sider_client::{SiderClient, SiderClientOptions, KEY_MISSING_TTL, NEVER_EXPIRES};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sider_integration_tests=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = SiderClientOptions::from_env();

    tracing::info!("🧪 Sider Integration Tests (Rust)");
    tracing::info!("   Server: {}", options.url);
    tracing::info!("   Login: {}", options.login);
    println!();

    test_basic_operations().await?;
    test_keys_and_ttl().await?;
    test_parallel_set_get().await?;
    test_data_isolation().await?;
    test_expiration().await?;
    test_rejects_bad_credentials().await?;

    println!();
    tracing::info!("✅ All tests passed!");

    Ok(())
}

/// Create a client from environment configuration
async fn create_client() -> Result<SiderClient> {
    let client = SiderClient::with_options(SiderClientOptions::from_env()).await?;
    Ok(client)
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

/// SET/GET/UPDATE/REMOVE round trip
async fn test_basic_operations() -> Result<()> {
    tracing::info!("Test: Basic Operations");

    let client = create_client().await?;

    let key = format!("basic-test-{}", uuid::Uuid::new_v4());
    client.set(&key, "hello world", None).await?;
    tracing::info!("   SET {}", key);

    let (value, expires) = client
        .get(&key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("key {} should be found", key))?;
    assert_eq!(&value[..], b"hello world", "Value should match");
    assert_eq!(expires, NEVER_EXPIRES, "Entry should never expire");

    client.update(&key, "goodbye").await?;
    let (value, _) = client
        .get(&key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("key {} should survive update", key))?;
    assert_eq!(&value[..], b"goodbye", "Update should replace the value");
    tracing::info!("   UPDATE {} → goodbye", key);

    client.remove(&key).await?;
    assert!(client.get(&key).await?.is_none(), "Key should be gone after remove");

    // Removing again is not an error
    client.remove(&key).await?;

    // Updating a missing key is
    let err = client
        .update(&key, "nothing")
        .await
        .expect_err("update of a missing key should fail");
    assert!(err.is_not_found(), "Expected NotFound, got {}", err);

    tracing::info!("   ✓ Basic operations work correctly");
    Ok(())
}

/// KEYS pattern filtering and TTL reporting
async fn test_keys_and_ttl() -> Result<()> {
    tracing::info!("Test: Keys and TTL");

    let client = create_client().await?;

    let prefix = format!("keys-test-{}", uuid::Uuid::new_v4());
    let keys = vec![
        format!("{}:a", prefix),
        format!("{}:b", prefix),
        format!("{}:c", prefix),
    ];

    for key in &keys {
        client.set(key, "value", None).await?;
    }
    tracing::info!("   Created {} test keys with prefix {}", keys.len(), prefix);

    let pattern = format!("^{}:", prefix);
    let mut found = client.keys(&pattern).await?;
    found.sort();
    assert_eq!(found, keys, "Should find exactly the 3 prefixed keys");
    tracing::info!("   KEYS({}) → {} keys", pattern, found.len());

    let expires = now_nanos() + Duration::from_secs(3600).as_nanos() as i64;
    client.set(&keys[0], "value", Some(expires)).await?;
    assert_eq!(client.ttl(&keys[0]).await?, expires);
    assert_eq!(client.ttl(&keys[1]).await?, NEVER_EXPIRES);
    assert_eq!(client.ttl("nonexistent-key-12345").await?, KEY_MISSING_TTL);
    tracing::info!("   ✓ TTL reports stored expiry");

    let none = client.keys("(").await?;
    assert!(none.is_empty(), "An invalid pattern should match nothing");
    tracing::info!("   KEYS(\"(\") → no keys");

    for key in &keys {
        client.remove(key).await?;
    }

    tracing::info!("   ✓ Keys and TTL work correctly");
    Ok(())
}

/// Parallel SET and GET operations - verify no data mixing
async fn test_parallel_set_get() -> Result<()> {
    tracing::info!("Test: Parallel SET/GET (500 concurrent operations)");

    let num_operations = 500;
    let start = Instant::now();
    let client = create_client().await?;

    let test_data: Vec<(String, String)> = (0..num_operations)
        .map(|i| {
            let key = format!("parallel-test-{}-{}", i, uuid::Uuid::new_v4());
            let value = format!("value-{}-{}", i, uuid::Uuid::new_v4());
            (key, value)
        })
        .collect();

    let set_futures: Vec<_> = test_data
        .iter()
        .map(|(key, value)| {
            let client = client.clone();
            let key = key.clone();
            let value = value.clone();
            async move {
                client.set(key, value, None).await?;
                Ok::<_, anyhow::Error>(())
            }
        })
        .collect();

    join_all(set_futures)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let set_elapsed = start.elapsed();
    tracing::info!("   SET {} keys in {:?}", num_operations, set_elapsed);

    let get_start = Instant::now();
    let errors = Arc::new(AtomicUsize::new(0));

    let get_futures: Vec<_> = test_data
        .iter()
        .map(|(key, expected_value)| {
            let client = client.clone();
            let key = key.clone();
            let expected_value = expected_value.clone();
            let errors = Arc::clone(&errors);
            async move {
                match client.get(&key).await? {
                    None => {
                        tracing::error!("Key not found: {}", key);
                        errors.fetch_add(1, Ordering::SeqCst);
                    }
                    Some((value, _)) if value != expected_value.as_bytes() => {
                        tracing::error!(
                            "Value mismatch for key {}: expected '{}', got '{:?}'",
                            key,
                            expected_value,
                            value
                        );
                        errors.fetch_add(1, Ordering::SeqCst);
                    }
                    Some(_) => {}
                }
                Ok::<_, anyhow::Error>(())
            }
        })
        .collect();

    join_all(get_futures)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let get_elapsed = get_start.elapsed();
    let error_count = errors.load(Ordering::SeqCst);

    tracing::info!("   GET {} keys in {:?}", num_operations, get_elapsed);
    tracing::info!(
        "   Throughput: {:.0} ops/sec (SET), {:.0} ops/sec (GET)",
        num_operations as f64 / set_elapsed.as_secs_f64(),
        num_operations as f64 / get_elapsed.as_secs_f64()
    );

    for (key, _) in &test_data {
        client.remove(key).await?;
    }

    assert_eq!(error_count, 0, "No errors should occur");
    tracing::info!("   ✓ All {} values verified correctly", num_operations);

    Ok(())
}

/// Concurrent clients writing different keys don't interfere
async fn test_data_isolation() -> Result<()> {
    tracing::info!("Test: Data Isolation (concurrent writes to different keys)");

    let num_clients = 50;
    let ops_per_client = 20;
    let semaphore = Arc::new(Semaphore::new(16)); // Limit concurrent connections

    let results = Arc::new(tokio::sync::Mutex::new(HashMap::new()));

    let client_futures: Vec<_> = (0..num_clients)
        .map(|client_id| {
            let results = Arc::clone(&results);
            let semaphore = Arc::clone(&semaphore);

            async move {
                let _permit = semaphore.acquire().await?;
                let client = create_client().await?;

                for op in 0..ops_per_client {
                    let key = format!("isolation-client{}-op{}", client_id, op);
                    let value = format!("client{}-value{}-{}", client_id, op, uuid::Uuid::new_v4());

                    results.lock().await.insert(key.clone(), value.clone());
                    client.set(key, value, None).await?;
                }

                Ok::<_, anyhow::Error>(())
            }
        })
        .collect();

    join_all(client_futures)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let expected = results.lock().await;
    let client = create_client().await?;
    let mut errors = 0;

    for (key, expected_value) in expected.iter() {
        let result = client.get(key).await?;
        let matches = matches!(&result, Some((value, _)) if value == expected_value.as_bytes());

        if !matches {
            tracing::error!(
                "Isolation failure: key={}, expected={}, got={:?}",
                key,
                expected_value,
                result
            );
            errors += 1;
        }
        client.remove(key).await?;
    }

    assert_eq!(errors, 0, "No isolation failures should occur");
    tracing::info!("   ✓ {} keys verified, no cross-contamination", expected.len());

    Ok(())
}

/// Expired entries linger until swept, then disappear
async fn test_expiration() -> Result<()> {
    tracing::info!("Test: Expiration and Sweep");

    let client = create_client().await?;

    let key = format!("expire-test-{}", uuid::Uuid::new_v4());
    let keeper = format!("expire-keeper-{}", uuid::Uuid::new_v4());
    let expires = now_nanos() + Duration::from_secs(1).as_nanos() as i64;

    client.set(&key, "temporary", Some(expires)).await?;
    client.set(&keeper, "permanent", None).await?;
    assert!(client.get(&key).await?.is_some(), "Key should exist immediately");
    tracing::info!("   SET {} expiring in 1s", key);

    tracing::info!("   Waiting 2 seconds for expiration...");
    tokio::time::sleep(Duration::from_secs(2)).await;

    let removed = client.delete_expired().await?;
    assert!(removed >= 1, "Sweep should remove at least our key");
    tracing::info!("   DeleteExpired → {} removed", removed);

    assert!(client.get(&key).await?.is_none(), "Key should be swept");
    assert!(client.get(&keeper).await?.is_some(), "Persistent key should survive");

    client.remove(&keeper).await?;

    tracing::info!("   ✓ Expiration works correctly");
    Ok(())
}

/// A wrong password is rejected before any store access
async fn test_rejects_bad_credentials() -> Result<()> {
    tracing::info!("Test: Authentication");

    let good = SiderClientOptions::from_env();
    let options = SiderClientOptions::new(good.url).with_credentials(good.login, "not-the-password");
    let client = SiderClient::with_options(options).await?;

    let key = format!("auth-test-{}", uuid::Uuid::new_v4());
    let err = client
        .set(&key, "value", None)
        .await
        .expect_err("bad credentials should be rejected");
    assert!(err.is_unauthenticated(), "Expected Unauthenticated, got {}", err);

    let authorized = create_client().await?;
    assert!(authorized.get(&key).await?.is_none(), "Rejected write must not reach the store");

    tracing::info!("   ✓ Bad credentials rejected");
    Ok(())
}
