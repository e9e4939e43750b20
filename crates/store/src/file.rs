use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use killwatch_core::paths::is_known_path;
use killwatch_core::{Action, ActionService, CoreError, Policy, PolicyFilter, PolicyService};
use killwatch_rules::validate_rules;

use crate::error::{Result, StoreError};

const POLICIES_DIR: &str = "policies";
const ACTIONS_DIR: &str = "actions";

/// Default age after which lookups rescan the data directory.
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(60);

// ── Load result types ───────────────────────────────────────────────

/// Outcome of loading a single policy or action file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadStatus {
    Loaded { id: String },
    /// Dotfile or unsupported extension.
    Skipped { reason: String },
    /// Parse or validation error; the file is not served.
    Failed { error: String },
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub policies: Vec<LoadResult>,
    pub actions: Vec<LoadResult>,
}

impl LoadReport {
    pub fn loaded(&self) -> usize {
        self.policies
            .iter()
            .chain(&self.actions)
            .filter(|r| matches!(r.status, LoadStatus::Loaded { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.policies
            .iter()
            .chain(&self.actions)
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
            .count()
    }
}

// ── File store ──────────────────────────────────────────────────────

#[derive(Default)]
struct Loaded {
    policies: HashMap<String, Policy>,
    actions: HashMap<String, Action>,
}

/// Policies and actions read from `<data_dir>/policies` and
/// `<data_dir>/actions`.
///
/// Files are `*.yml`, `*.yaml` or `*.json`, one document each. A document
/// without `_id` takes its file stem as id. Invalid files are reported and
/// never served.
///
/// Clones share the same in-memory view. The async service methods run
/// their file reads on the blocking pool.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Shared>,
    refresh: Duration,
}

struct Shared {
    root: PathBuf,
    state: RwLock<(Loaded, Instant)>,
}

impl FileStore {
    /// Open the store, creating its directories, and load everything.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(POLICIES_DIR))?;
        fs::create_dir_all(root.join(ACTIONS_DIR))?;

        let store = Self {
            inner: Arc::new(Shared {
                root,
                state: RwLock::new((Loaded::default(), Instant::now())),
            }),
            refresh: DEFAULT_REFRESH,
        };
        let report = store.reload()?;
        info!(
            path = %store.inner.root.display(),
            loaded = report.loaded(),
            failed = report.failed(),
            "file store opened"
        );
        Ok(store)
    }

    /// Set how old the in-memory view may get before a lookup rescans.
    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Rescan both directories and replace the in-memory view.
    pub fn reload(&self) -> Result<LoadReport> {
        let mut loaded = Loaded::default();
        let mut report = LoadReport::default();

        for (path, outcome) in scan(&self.inner.root.join(ACTIONS_DIR))? {
            let status = match outcome.and_then(|doc| parse_action(&path, doc)) {
                Ok(action) if loaded.actions.contains_key(&action.id) => LoadStatus::Failed {
                    error: format!("duplicate action id '{}'", action.id),
                },
                Ok(action) => {
                    let id = action.id.clone();
                    loaded.actions.insert(id.clone(), action);
                    LoadStatus::Loaded { id }
                }
                Err(e) => LoadStatus::Failed {
                    error: e.to_string(),
                },
            };
            report.actions.push(log_result(path, status, "action"));
        }

        for (path, outcome) in scan(&self.inner.root.join(POLICIES_DIR))? {
            let status = match outcome.and_then(|doc| parse_policy(&path, doc)) {
                Ok(policy) if loaded.policies.contains_key(&policy.id) => LoadStatus::Failed {
                    error: format!("duplicate policy id '{}'", policy.id),
                },
                Ok(policy) => {
                    for action_id in &policy.actions {
                        if !loaded.actions.contains_key(action_id) {
                            warn!(policy_id = %policy.id, action_id = %action_id, "policy references unknown action");
                        }
                    }
                    let id = policy.id.clone();
                    loaded.policies.insert(id.clone(), policy);
                    LoadStatus::Loaded { id }
                }
                Err(e) => LoadStatus::Failed {
                    error: e.to_string(),
                },
            };
            report.policies.push(log_result(path, status, "policy"));
        }

        let mut state = self.inner.state.write().unwrap_or_else(|e| e.into_inner());
        *state = (loaded, Instant::now());
        Ok(report)
    }

    fn refresh_if_stale(&self) -> Result<()> {
        let stale = {
            let state = self.inner.state.read().unwrap_or_else(|e| e.into_inner());
            state.1.elapsed() >= self.refresh
        };
        if stale {
            debug!(path = %self.inner.root.display(), "refreshing file store");
            self.reload()?;
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Loaded) -> T) -> T {
        let state = self.inner.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state.0)
    }

    /// Look up a policy, rescanning once on a miss.
    pub fn get_policy(&self, id: &str) -> Result<Policy> {
        self.refresh_if_stale()?;
        if let Some(policy) = self.read(|s| s.policies.get(id).cloned()) {
            return Ok(policy);
        }
        self.reload()?;
        self.read(|s| s.policies.get(id).cloned())
            .ok_or_else(|| StoreError::NotFound {
                kind: "policy",
                id: id.to_string(),
            })
    }

    /// Look up an action, rescanning once on a miss.
    pub fn get_action(&self, id: &str) -> Result<Action> {
        self.refresh_if_stale()?;
        if let Some(action) = self.read(|s| s.actions.get(id).cloned()) {
            return Ok(action);
        }
        self.reload()?;
        self.read(|s| s.actions.get(id).cloned())
            .ok_or_else(|| StoreError::NotFound {
                kind: "action",
                id: id.to_string(),
            })
    }
}

/// Run a synchronous store operation on the blocking pool.
async fn blocking<T, F>(store: &FileStore, f: F) -> std::result::Result<T, CoreError>
where
    T: Send + 'static,
    F: FnOnce(&FileStore) -> Result<T> + Send + 'static,
{
    let store = store.clone();
    let outcome = tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| CoreError::Upstream(format!("file store task failed: {e}")))?;
    Ok(outcome?)
}

#[async_trait]
impl PolicyService for FileStore {
    /// Always rescans; callers use this as their reload point.
    async fn policies(&self, filter: &PolicyFilter) -> std::result::Result<Vec<Policy>, CoreError> {
        let filter = filter.clone();
        blocking(self, move |store| {
            store.reload()?;
            let mut policies: Vec<Policy> = store.read(|s| {
                s.policies
                    .values()
                    .filter(|p| filter.matches(p))
                    .cloned()
                    .collect()
            });
            policies.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(policies)
        })
        .await
    }

    async fn policy(&self, id: &str) -> std::result::Result<Policy, CoreError> {
        let id = id.to_string();
        blocking(self, move |store| store.get_policy(&id)).await
    }
}

#[async_trait]
impl ActionService for FileStore {
    async fn action(&self, id: &str) -> std::result::Result<Action, CoreError> {
        let id = id.to_string();
        blocking(self, move |store| store.get_action(&id)).await
    }
}

// ── Scanning and parsing ────────────────────────────────────────────

enum Scanned {
    Skip(String),
    Doc(Result<Value>),
}

/// Read every candidate file in `dir`, sorted by name.
fn scan(dir: &Path) -> Result<Vec<(PathBuf, Result<Value>)>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| !p.is_dir())
        .collect();
    paths.sort();

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        match classify(&path) {
            Scanned::Skip(reason) => {
                debug!(path = %path.display(), reason = %reason, "skipping file");
            }
            Scanned::Doc(doc) => out.push((path, doc)),
        }
    }
    Ok(out)
}

fn classify(path: &Path) -> Scanned {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.starts_with('.') {
        return Scanned::Skip("dotfile".to_string());
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => Scanned::Doc(read_yaml(path)),
        Some("json") => Scanned::Doc(read_json(path)),
        _ => Scanned::Skip("unsupported extension".to_string()),
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    Ok(serde_yaml::to_value(json)?)
}

/// Default `_id` to the file stem.
fn with_default_id(path: &Path, mut doc: Value) -> Result<Value> {
    let Value::Mapping(map) = &mut doc else {
        return Err(StoreError::Validation("document is not a mapping".to_string()));
    };
    let id_key = Value::String("_id".to_string());
    if !map.contains_key(&id_key) {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        map.insert(id_key, Value::String(stem));
    }
    Ok(doc)
}

fn parse_policy(path: &Path, doc: Value) -> Result<Policy> {
    let policy: Policy = serde_yaml::from_value(with_default_id(path, doc)?)?;

    if policy.id.is_empty() {
        return Err(StoreError::Validation("policy _id must not be empty".to_string()));
    }
    if policy.name.trim().is_empty() {
        return Err(StoreError::Validation("policy name must not be empty".to_string()));
    }
    if policy.actions.is_empty() {
        return Err(StoreError::Validation(
            "policy must reference at least one action".to_string(),
        ));
    }
    validate_rules(&policy.rules).map_err(|e| StoreError::Validation(e.to_string()))?;

    for rule in policy.rules.rules() {
        if !is_known_path(&rule.path) {
            warn!(policy_id = %policy.id, path = %rule.path, "rule uses unknown path and will never match");
        }
    }
    Ok(policy)
}

fn parse_action(path: &Path, doc: Value) -> Result<Action> {
    let mut action: Action = serde_yaml::from_value(with_default_id(path, doc)?)?;
    if action.id.is_empty() {
        return Err(StoreError::Validation("action _id must not be empty".to_string()));
    }
    action
        .validate()
        .map_err(|e| StoreError::Validation(e.to_string()))?;
    Ok(action)
}

fn log_result(path: PathBuf, status: LoadStatus, kind: &str) -> LoadResult {
    match &status {
        LoadStatus::Loaded { id } => debug!(kind, id = %id, path = %path.display(), "loaded"),
        LoadStatus::Failed { error } => {
            warn!(kind, path = %path.display(), error = %error, "failed to load file")
        }
        LoadStatus::Skipped { .. } => {}
    }
    LoadResult { path, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SLACK_ACTION: &str = r#"
label: ops channel
endpoint: https://hooks.slack.com/services/T000/B000/XXXX
"#;

    const TITAN_POLICY: &str = r#"
_id: titans
name: Titan losses
actions: [ops]
rules:
  - - comparator: in
      path: Victim.ShipGroupID
      values: [30]
"#;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().expect("create tempdir");
        let store = FileStore::open(dir.path()).expect("open store");
        (dir, store)
    }

    fn write(dir: &TempDir, sub: &str, name: &str, body: &str) {
        fs::write(dir.path().join(sub).join(name), body).unwrap();
    }

    #[test]
    fn open_creates_directories() {
        let (dir, _store) = temp_store();
        assert!(dir.path().join("policies").is_dir());
        assert!(dir.path().join("actions").is_dir());
    }

    #[test]
    fn loads_policy_and_action() {
        let (dir, store) = temp_store();
        write(&dir, ACTIONS_DIR, "ops.yml", SLACK_ACTION);
        write(&dir, POLICIES_DIR, "titans.yaml", TITAN_POLICY);

        let report = store.reload().unwrap();
        assert_eq!(report.loaded(), 2);
        assert_eq!(report.failed(), 0);

        let action = store.get_action("ops").unwrap();
        assert_eq!(action.platform, killwatch_core::Platform::Slack);
        let policy = store.get_policy("titans").unwrap();
        assert_eq!(policy.actions, vec!["ops"]);
    }

    #[test]
    fn skips_dotfiles_and_other_extensions() {
        let (dir, store) = temp_store();
        write(&dir, ACTIONS_DIR, ".ops.yml", SLACK_ACTION);
        write(&dir, ACTIONS_DIR, "notes.txt", "not an action");

        let report = store.reload().unwrap();
        assert!(report.actions.is_empty());
    }

    #[test]
    fn invalid_rules_are_reported_not_served() {
        let (dir, store) = temp_store();
        write(
            &dir,
            POLICIES_DIR,
            "bad.yml",
            r#"
name: bad
actions: [ops]
rules:
  - - comparator: gt
      path: Meta.TotalValue
      values: [1, 2]
"#,
        );
        let report = store.reload().unwrap();
        assert_eq!(report.failed(), 1);
        assert!(store.get_policy("bad").unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn policy_without_actions_rejected() {
        let (dir, store) = temp_store();
        write(&dir, POLICIES_DIR, "lonely.yml", "name: lonely\nrules: []\n");
        let report = store.reload().unwrap();
        let LoadStatus::Failed { error } = &report.policies[0].status else {
            panic!("expected failure, got {:?}", report.policies[0].status);
        };
        assert!(error.contains("at least one action"));
    }

    #[test]
    fn action_with_bad_endpoint_rejected() {
        let (dir, store) = temp_store();
        write(&dir, ACTIONS_DIR, "ftp.yml", "endpoint: ftp://example.com/drop\n");
        assert_eq!(store.reload().unwrap().failed(), 1);
        assert!(matches!(
            store.get_action("ftp"),
            Err(StoreError::NotFound { kind: "action", .. })
        ));
    }

    #[test]
    fn json_documents_supported() {
        let (dir, store) = temp_store();
        write(
            &dir,
            ACTIONS_DIR,
            "hook.json",
            r#"{"_id":"hook","endpoint":"https://example.com/kills","is_disabled":true}"#,
        );
        store.reload().unwrap();
        let action = store.get_action("hook").unwrap();
        assert!(action.is_disabled);
        assert_eq!(action.platform, killwatch_core::Platform::Rest);
    }

    #[test]
    fn miss_triggers_rescan() {
        let (dir, store) = temp_store();
        assert!(store.get_action("late").is_err());
        write(&dir, ACTIONS_DIR, "late.yml", SLACK_ACTION);
        assert!(store.get_action("late").is_ok());
    }
}
