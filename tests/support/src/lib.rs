//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust,ignore
//! use test_support::{cmd_bin, conduit_env, write_config};
//!
//! #[test]
//! fn example() {
//!     let td = test_support::tempdir();
//!     let config = write_config(td.path(), "");
//!     let mut cmd = cmd_bin("ticket-lifecycle");
//!     cmd.envs(conduit_env("basic")).arg("--config").arg(&config);
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::{env, path::{Path, PathBuf}};

/// Name of the binary under test.
pub const BIN: &str = "ticket-lifecycle";

/// Env vars read by the fixture-backed Conduit client, keyed by fixture file stem.
pub const CONDUIT_FIXTURE_VARS: [(&str, &str); 3] = [
    ("search", "LIFECYCLE_TEST_SEARCH_JSON"),
    ("transactions", "LIFECYCLE_TEST_TRANSACTIONS_JSON"),
    ("projects", "LIFECYCLE_TEST_PROJECTS_JSON"),
];

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,test=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Return the path to the repository's `tests/fixtures` directory.
///
/// This crate lives in `<repo>/tests/support`, so the fixtures sit next to it.
pub fn fixtures_dir() -> PathBuf {
    let support_manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    support_manifest_dir
        .parent()
        .map(|tests| tests.join("fixtures"))
        .unwrap_or_else(|| support_manifest_dir.join("fixtures"))
}

/// Return the path to the repository's `tests/schemas` directory.
pub fn schemas_dir() -> PathBuf {
    fixtures_dir().with_file_name("schemas")
}

/// Read a UTF-8 text fixture into a string.
pub fn read_fixture_text<P: AsRef<Path>>(rel_path: P) -> String {
    let path = fixtures_dir().join(rel_path);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

/// Deserialize a JSON fixture into `T` (enable `serde` feature).
#[cfg(feature = "serde")]
pub fn read_fixture_json<T, P>(rel_path: P) -> T
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = fixtures_dir().join(rel_path);
    let file = std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("failed to open fixture {}: {e}", path.display()));
    serde_json::from_reader::<_, T>(file)
        .unwrap_or_else(|e| panic!("failed to parse JSON fixture {}: {e}", path.display()))
}

/// Env pairs that point the binary at the Conduit fixtures in `tests/fixtures/conduit/<set>/`.
///
/// Missing files are skipped, so a set may provide only the methods it needs.
pub fn conduit_env(set: &str) -> Vec<(String, String)> {
    let dir = fixtures_dir().join("conduit").join(set);
    CONDUIT_FIXTURE_VARS
        .iter()
        .filter_map(|(stem, var)| {
            let path = dir.join(format!("{stem}.json"));
            std::fs::read_to_string(&path).ok().map(|body| (var.to_string(), body))
        })
        .collect()
}

/// Minimal valid config TOML; `extra` is appended verbatim (e.g. `[custom_fields]` tables).
pub fn config_toml(extra: &str) -> String {
    format!(
        r#"[conduit]
host = "https://phabricator.invalid"
api_token = "api-test-token"
fetch_batch_size = 2

[projects]
qa_verified_phid = "PHID-PROJ-qaverified"

{extra}
"#
    )
}

/// Write `lifecycle.toml` into `dir` and return its path.
pub fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("lifecycle.toml");
    std::fs::write(&path, config_toml(extra))
        .unwrap_or_else(|e| panic!("failed to write config {}: {e}", path.display()));
    path
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Any `RUST_LOG` inherited from the runner is cleared so stderr stays predictable.
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    let mut cmd = assert_cmd::Command::cargo_bin(bin).expect("binary target not found");
    cmd.env_remove("RUST_LOG").env_remove("LIFECYCLE_API_TOKEN");
    for (_, var) in CONDUIT_FIXTURE_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("LIFECYCLE_TEST_CONDUIT_ERROR");
    cmd
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            let k_owned = k.to_string();
            prev.push((k_owned.clone(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}
