//! In-memory VCS driver for orchestrator tests
//!
//! Branches are modelled as sets of change ids: merging or rebasing unions
//! the sets, so re-integrating already-present changes is a no-op just like
//! in git. Conflicts are injected per (checked-out branch, incoming branch)
//! pair and fire once.

#![allow(dead_code)]

use gitflow_core::git::{IntegrationOutcome, VcsDriver};
use gitflow_core::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

/// A tag created through the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTag {
    pub target: String,
    pub changes: BTreeSet<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Merge,
    Rebase,
}

/// A merge/rebase stopped on conflicts
#[derive(Debug, Clone)]
struct Pending {
    kind: PendingKind,
    branch: String,
    incoming: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    branches: BTreeMap<String, BTreeSet<String>>,
    head: Option<String>,
    tags: BTreeMap<String, FakeTag>,
    remote_branches: BTreeSet<String>,
    pending: Option<Pending>,
    unresolved: bool,
    conflicts: HashMap<(String, String), Vec<String>>,
    unmergeable: HashSet<String>,
    fail_fetch: Option<String>,
    fail_remote_delete: Option<String>,
    fail_checkout: HashMap<String, String>,
    calls: Vec<String>,
}

/// Fake repository implementing `VcsDriver`
pub struct FakeVcs {
    state: Mutex<State>,
}

impl FakeVcs {
    /// Repository with the given branches, each holding one change named
    /// after itself, and `head` checked out
    pub fn with_branches(branches: &[&str], head: &str) -> Self {
        let mut state = State::default();
        for branch in branches {
            state
                .branches
                .insert(branch.to_string(), BTreeSet::from([format!("{branch}-init")]));
        }
        state.head = Some(head.to_string());
        Self {
            state: Mutex::new(state),
        }
    }

    // === Setup ===

    /// Add a change to a branch
    pub fn commit(&self, branch: &str, change: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .branches
            .entry(branch.to_string())
            .or_default()
            .insert(change.to_string());
    }

    /// Create a branch as a copy of another
    pub fn branch_from(&self, name: &str, from: &str) {
        let mut state = self.state.lock().unwrap();
        let changes = state.branches.get(from).cloned().unwrap_or_default();
        state.branches.insert(name.to_string(), changes);
    }

    /// Make the next integration of `incoming` into `branch` conflict
    pub fn conflict_on(&self, branch: &str, incoming: &str, paths: &[&str]) {
        self.state.lock().unwrap().conflicts.insert(
            (branch.to_string(), incoming.to_string()),
            paths.iter().map(ToString::to_string).collect(),
        );
    }

    /// Make non-forced deletion of a branch fail as unmerged
    pub fn refuse_delete(&self, branch: &str) {
        self.state.lock().unwrap().unmergeable.insert(branch.to_string());
    }

    /// Make `fetch` fail
    pub fn fail_fetch(&self, msg: &str) {
        self.state.lock().unwrap().fail_fetch = Some(msg.to_string());
    }

    /// Make the next checkout of `branch` fail, as git does on a dirty tree
    pub fn fail_checkout(&self, branch: &str, msg: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_checkout
            .insert(branch.to_string(), msg.to_string());
    }

    /// Make `delete_remote_branch` fail
    pub fn fail_remote_delete(&self, msg: &str) {
        self.state.lock().unwrap().fail_remote_delete = Some(msg.to_string());
    }

    /// Add a remote tracking branch
    pub fn add_remote_branch(&self, remote: &str, branch: &str) {
        self.state
            .lock()
            .unwrap()
            .remote_branches
            .insert(format!("{remote}/{branch}"));
    }

    /// Simulate the user resolving and staging every conflict
    pub fn resolve_conflicts(&self) {
        self.state.lock().unwrap().unresolved = false;
    }

    /// Simulate the user resolving and committing the merge themselves
    pub fn resolve_and_commit(&self) {
        let mut state = self.state.lock().unwrap();
        state.unresolved = false;
        if let Some(pending) = state.pending.take() {
            apply(&mut state, &pending);
        }
    }

    // === Inspection ===

    /// Whether a branch holds a change
    pub fn contains(&self, branch: &str, change: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .branches
            .get(branch)
            .is_some_and(|c| c.contains(change))
    }

    /// Tag by name
    pub fn tag_named(&self, name: &str) -> Option<FakeTag> {
        self.state.lock().unwrap().tags.get(name).cloned()
    }

    /// Number of tags
    pub fn tag_count(&self) -> usize {
        self.state.lock().unwrap().tags.len()
    }

    /// Whether a remote branch exists
    pub fn has_remote_branch(&self, remote: &str, branch: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .remote_branches
            .contains(&format!("{remote}/{branch}"))
    }

    /// Whether a merge or rebase is stopped
    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().pending.is_some()
    }

    /// Every driver call in order, e.g. `"merge main into develop"`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls equal to `call`
    pub fn count_calls(&self, call: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    /// Whether any mutating call was made
    pub fn mutated(&self) -> bool {
        self.state.lock().unwrap().calls.iter().any(|c| {
            !c.starts_with("fetch")
        })
    }

    fn integrate(&self, incoming: &str, kind: PendingKind) -> Result<IntegrationOutcome> {
        let mut state = self.state.lock().unwrap();
        let head = head_of(&state)?;
        let verb = match kind {
            PendingKind::Merge => "merge",
            PendingKind::Rebase => "rebase",
        };
        state.calls.push(format!("{verb} {incoming} into {head}"));

        let changes = state
            .branches
            .get(incoming)
            .cloned()
            .ok_or_else(|| Error::Git(format!("unknown revision {incoming}")))?;

        let pending = Pending {
            kind,
            branch: head.clone(),
            incoming: changes,
        };

        if let Some(paths) = state.conflicts.remove(&(head, incoming.to_string())) {
            state.pending = Some(pending);
            state.unresolved = true;
            return Ok(IntegrationOutcome::Conflict(paths));
        }

        apply(&mut state, &pending);
        Ok(IntegrationOutcome::Clean)
    }
}

fn head_of(state: &State) -> Result<String> {
    state
        .head
        .clone()
        .ok_or_else(|| Error::Git("HEAD is detached".to_string()))
}

fn apply(state: &mut State, pending: &Pending) {
    state
        .branches
        .entry(pending.branch.clone())
        .or_default()
        .extend(pending.incoming.iter().cloned());
}

impl VcsDriver for FakeVcs {
    fn checkout(&self, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("checkout {branch}"));
        if state.unresolved || state.pending.is_some() {
            return Err(Error::Git("you need to resolve your current index first".into()));
        }
        if let Some(msg) = state.fail_checkout.remove(branch) {
            return Err(Error::Git(msg));
        }
        if !state.branches.contains_key(branch) {
            return Err(Error::Git(format!("pathspec '{branch}' did not match")));
        }
        state.head = Some(branch.to_string());
        Ok(())
    }

    fn create_branch(&self, name: &str, start_point: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create {name} from {start_point}"));
        if state.branches.contains_key(name) {
            return Err(Error::BranchExists(name.to_string()));
        }
        let changes = state
            .branches
            .get(start_point)
            .cloned()
            .ok_or_else(|| Error::Git(format!("not a valid object name: {start_point}")))?;
        state.branches.insert(name.to_string(), changes);
        Ok(())
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete {name}"));
        if !state.branches.contains_key(name) {
            return Err(Error::BranchNotFound(name.to_string()));
        }
        if state.head.as_deref() == Some(name) {
            return Err(Error::Git(format!("cannot delete checked out branch {name}")));
        }
        if !force && state.unmergeable.contains(name) {
            return Err(Error::UnmergedChanges(name.to_string()));
        }
        state.branches.remove(name);
        Ok(())
    }

    fn merge(&self, branch: &str) -> Result<IntegrationOutcome> {
        self.integrate(branch, PendingKind::Merge)
    }

    fn fast_forward(&self, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let head = head_of(&state)?;
        state.calls.push(format!("fast-forward {head} to {branch}"));

        let target = state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::Git(format!("unknown revision {branch}")))?;
        let current = state.branches.get(&head).cloned().unwrap_or_default();
        if !current.is_subset(&target) {
            return Err(Error::Git("Not possible to fast-forward".into()));
        }
        state.branches.insert(head, target);
        Ok(())
    }

    fn rebase(&self, onto: &str) -> Result<IntegrationOutcome> {
        self.integrate(onto, PendingKind::Rebase)
    }

    fn continue_pending(&self) -> Result<IntegrationOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("continue".to_string());
        if state.unresolved {
            return Err(Error::Git("conflicts not resolved".into()));
        }
        if let Some(pending) = state.pending.take() {
            apply(&mut state, &pending);
            if pending.kind == PendingKind::Rebase {
                state.head = Some(pending.branch);
            }
        }
        Ok(IntegrationOutcome::Clean)
    }

    fn abort_pending(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("abort".to_string());
        state.pending = None;
        state.unresolved = false;
        Ok(())
    }

    fn tag(&self, name: &str, target: &str, message: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("tag {name} on {target}"));
        if state.tags.contains_key(name) {
            return Err(Error::Git(format!("tag '{name}' already exists")));
        }
        let changes = state
            .branches
            .get(target)
            .cloned()
            .ok_or_else(|| Error::Git(format!("unknown revision {target}")))?;
        state.tags.insert(
            name.to_string(),
            FakeTag {
                target: target.to_string(),
                changes,
                message: message.to_string(),
            },
        );
        Ok(())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().tags.contains_key(name))
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("fetch {remote}"));
        match &state.fail_fetch {
            Some(msg) => Err(Error::Remote(msg.clone())),
            None => Ok(()),
        }
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("push {branch} to {remote}"));
        state.remote_branches.insert(format!("{remote}/{branch}"));
        Ok(())
    }

    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete {branch} on {remote}"));
        if let Some(msg) = &state.fail_remote_delete {
            return Err(Error::Remote(msg.clone()));
        }
        state.remote_branches.remove(&format!("{remote}/{branch}"));
        Ok(())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().head.clone())
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().branches.contains_key(name))
    }

    fn remote_branch_exists(&self, remote: &str, name: &str) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .remote_branches
            .contains(&format!("{remote}/{name}")))
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().branches.keys().cloned().collect())
    }

    fn has_unresolved_conflicts(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().unresolved)
    }
}
