//! Key-value settings stores and the reconciled price record
//!
//! Prices are kept as base-10 cent strings under well-known keys, one
//! setting per metal, overwritten on every successful cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use homeboard_core::{
    parse_cents, Metal, ReconciledPrice, StoreError, StoreResult, PRICES_UPDATED_AT_KEY,
};

/// Generic settings store
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Write several keys as one unit: either all of them land or the
    /// previous values are put back.
    ///
    /// The default writes one key at a time and restores on failure;
    /// stores that can commit atomically should override it.
    async fn set_many(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let previous = self.get(key).await?;
            if let Err(e) = self.set(key, value).await {
                for (key, previous) in written.into_iter().rev() {
                    let restored = match previous {
                        Some(old) => self.set(key, &old).await,
                        None => self.remove(key).await,
                    };
                    if let Err(restore_err) = restored {
                        warn!("Failed to restore setting {}: {}", key, restore_err);
                    }
                }
                return Err(e);
            }
            written.push((*key, previous));
        }
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: DashMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so readers never observe a half-written file.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileSettingsStore {
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, values: &BTreeMap<String, String>) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_many(&[(key, value.to_string())]).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut values = self.values.lock().await;
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&values).await {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    /// One flush for the whole batch; memory is rolled back if it fails
    async fn set_many(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        let mut values = self.values.lock().await;
        let previous: Vec<(&str, Option<String>)> = entries
            .iter()
            .map(|(key, value)| (*key, values.insert(key.to_string(), value.clone())))
            .collect();

        if let Err(e) = self.flush(&values).await {
            // keep memory consistent with disk
            for (key, old) in previous.into_iter().rev() {
                match old {
                    Some(old) => values.insert(key.to_string(), old),
                    None => values.remove(key),
                };
            }
            return Err(e);
        }
        Ok(())
    }
}

async fn read_cents(store: &dyn SettingsStore, metal: Metal) -> StoreResult<i64> {
    let Some(raw) = store.get(metal.settings_key()).await? else {
        return Ok(0);
    };

    match parse_cents(&raw) {
        Ok(cents) => Ok(cents),
        Err(e) => {
            warn!("Ignoring unreadable {} setting: {}", metal.settings_key(), e);
            Ok(0)
        }
    }
}

/// Last persisted price pair. Keys that were never written read as zero.
pub async fn get_reconciled_price(store: &dyn SettingsStore) -> StoreResult<ReconciledPrice> {
    let gold_cents = read_cents(store, Metal::Gold).await?;
    let silver_cents = read_cents(store, Metal::Silver).await?;

    let updated_at = store
        .get(PRICES_UPDATED_AT_KEY)
        .await?
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(ReconciledPrice {
        gold_cents,
        silver_cents,
        updated_at,
    })
}

/// Upsert both metal settings and the update timestamp as one write
pub async fn put_reconciled_price(
    store: &dyn SettingsStore,
    price: &ReconciledPrice,
) -> StoreResult<()> {
    let mut entries = vec![
        (Metal::Gold.settings_key(), price.gold_cents.to_string()),
        (Metal::Silver.settings_key(), price.silver_cents.to_string()),
    ];
    if let Some(updated_at) = price.updated_at {
        entries.push((PRICES_UPDATED_AT_KEY, updated_at.to_rfc3339()));
    }

    store.set_many(&entries).await
}
