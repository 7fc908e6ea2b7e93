use std::path::{Path, PathBuf};
use std::sync::Once;

use tempfile::TempDir;
use todo_orchestrator::Orchestrator;

pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        init_logging();
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join(".todo_store")
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::open(self.store_path()).expect("failed to open store")
    }
}

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};
        let _ = fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    });
}
