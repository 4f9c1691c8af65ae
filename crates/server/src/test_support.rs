//! Environment isolation for tests that boot a full deployment.

use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::DeploymentImpl;

const ASSET_DIR_ENV: &str = "TASKBOARD_ASSET_DIR";
const DATABASE_URL_ENV: &str = "DATABASE_URL";

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Points config and database at a fresh temp directory until dropped, then
/// restores whatever the variables held before. Holders run one at a time.
pub struct IsolatedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl IsolatedEnv {
    pub fn new() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let root = std::env::temp_dir().join(format!("taskboard-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();

        let overrides = [
            (ASSET_DIR_ENV, root.to_string_lossy().into_owned()),
            (
                DATABASE_URL_ENV,
                format!("sqlite://{}?mode=rwc", root.join("db.sqlite").to_string_lossy()),
            ),
        ];
        let saved = overrides
            .iter()
            .map(|(key, _)| (*key, std::env::var(key).ok()))
            .collect();
        for (key, value) in &overrides {
            // SAFETY: every writer holds ENV_LOCK.
            unsafe { std::env::set_var(key, value) };
        }

        Self { saved, _lock: lock }
    }

    pub async fn deployment(&self) -> DeploymentImpl {
        DeploymentImpl::new().await.unwrap()
    }
}

impl Drop for IsolatedEnv {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            // SAFETY: every writer holds ENV_LOCK.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
