//! The run collection and every rule for mutating it.
//!
//! [`RunRepository`] is the only owner of the runs. Each mutation builds a
//! candidate collection, persists it, and only then replaces the in-memory
//! state, so a failed write leaves the repository exactly as it was.
use std::collections::HashSet;

use crate::capacity::{CapacitySnapshot, compute_capacity};
use crate::catalog::Catalog;
use crate::config::TrackerConfig;
use crate::constants::{IMPORT_ID_PREFIX, UNTITLED_RUN_NAME};
use crate::error::TrackerError;
use crate::ids::RunIdGenerator;
use crate::run::{Role, Run, Target};
use crate::stats::{RunStats, aggregate_run_stats};
use crate::storage::{KeyValueStore, RunStore};
use crate::transfer::{PortableRun, export_file_name, from_portable, parse_portable, to_portable};

/// A level change that was applied, with the character's refreshed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChange {
    pub run_id: String,
    pub target: Target,
    pub previous_level: u8,
    pub role: Role,
    pub capacity: CapacitySnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelOutcome {
    /// The clamped level equals the current one; nothing was written.
    Unchanged(Target),
    Changed(LevelChange),
}

impl LevelOutcome {
    #[must_use]
    pub const fn target(&self) -> &Target {
        match self {
            Self::Unchanged(target) => target,
            Self::Changed(change) => &change.target,
        }
    }

    #[must_use]
    pub const fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Notification emitted after a mutation has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    RunCreated(Run),
    RunImported(Run),
    RunDeleted { run_id: String },
    TargetAdded { run_id: String, target: Target },
    LevelChanged(LevelChange),
    TargetRemoved { run_id: String, potential_id: String },
}

/// An export ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRun {
    pub file_name: String,
    pub record: PortableRun,
}

type Listener = Box<dyn FnMut(&RunEvent)>;

pub struct RunRepository<K: KeyValueStore> {
    runs: Vec<Run>,
    store: RunStore<K>,
    catalog: Catalog,
    config: TrackerConfig,
    ids: RunIdGenerator,
    listeners: Vec<Listener>,
}

impl<K: KeyValueStore> RunRepository<K> {
    /// Open the repository, loading whatever the store holds.
    pub fn open(store: RunStore<K>, catalog: Catalog, config: TrackerConfig) -> Self {
        let runs = normalize_loaded(store.load_all(), &config);
        log::debug!("opened repository with {} run(s)", runs.len());
        Self {
            runs,
            store,
            catalog,
            config,
            ids: RunIdGenerator::new(),
            listeners: Vec::new(),
        }
    }

    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    #[must_use]
    pub fn run(&self, run_id: &str) -> Option<&Run> {
        self.runs.iter().find(|r| r.id == run_id)
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Default name offered for the next run.
    #[must_use]
    pub fn suggested_run_name(&self) -> String {
        format!("Run #{}", self.runs.len() + 1)
    }

    /// Register a listener called after every persisted change.
    pub fn subscribe(&mut self, listener: impl FnMut(&RunEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Capacity figures of one character slot.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::RunNotFound`] if the run does not exist.
    pub fn capacity(
        &self,
        run_id: &str,
        char_id: &str,
        role: Role,
    ) -> Result<CapacitySnapshot, TrackerError> {
        let run = self.require_run(run_id)?;
        Ok(compute_capacity(run, char_id, role, &self.config))
    }

    /// Aggregate stat bonuses of a run.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::RunNotFound`] if the run does not exist.
    pub fn stats(&self, run_id: &str) -> Result<RunStats, TrackerError> {
        let run = self.require_run(run_id)?;
        Ok(aggregate_run_stats(run, &self.catalog))
    }

    /// Create an empty run for three catalog characters.
    ///
    /// # Errors
    ///
    /// Returns an error if a character is unknown or the collection cannot be saved.
    pub fn create_run(
        &mut self,
        name: &str,
        main_char_id: &str,
        support_char_id_1: &str,
        support_char_id_2: &str,
    ) -> Result<Run, TrackerError> {
        for char_id in [main_char_id, support_char_id_1, support_char_id_2] {
            if self.catalog.character(char_id).is_none() {
                return Err(TrackerError::CharacterNotFound(char_id.to_string()));
            }
        }
        let name = match name.trim() {
            "" => UNTITLED_RUN_NAME,
            trimmed => trimmed,
        };
        let id = self.fresh_id("");
        let run = Run::new(id, name, main_char_id, support_char_id_1, support_char_id_2);

        let mut candidate = self.runs.clone();
        candidate.push(run.clone());
        self.commit(candidate)?;
        log::debug!("created run {} ({})", run.id, run.name);
        self.emit(&RunEvent::RunCreated(run.clone()));
        Ok(run)
    }

    /// Remove a run. Returns whether anything was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be saved.
    pub fn delete_run(&mut self, run_id: &str) -> Result<bool, TrackerError> {
        if self.run(run_id).is_none() {
            return Ok(false);
        }
        let candidate: Vec<Run> = self
            .runs
            .iter()
            .filter(|r| r.id != run_id)
            .cloned()
            .collect();
        self.commit(candidate)?;
        log::debug!("deleted run {run_id}");
        self.emit(&RunEvent::RunDeleted {
            run_id: run_id.to_string(),
        });
        Ok(true)
    }

    /// Assign a potential to a run at level 1.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown run, potential or slot,
    /// [`TrackerError::CapacityExceeded`] when the character is full,
    /// [`TrackerError::AlreadyAssigned`] for a duplicate potential, or a
    /// persistence error.
    pub fn add_target(
        &mut self,
        run_id: &str,
        potential_id: &str,
        char_id: &str,
    ) -> Result<Run, TrackerError> {
        let index = self.run_index(run_id)?;
        let role = self
            .catalog
            .potential(potential_id)
            .ok_or_else(|| TrackerError::PotentialNotFound(potential_id.to_string()))
            .and_then(|potential| {
                let run = &self.runs[index];
                if potential.char_id == char_id && run.holds(char_id, potential.role) {
                    Ok(potential.role)
                } else {
                    Err(TrackerError::SlotNotFound {
                        run_id: run_id.to_string(),
                        char_id: char_id.to_string(),
                        role: potential.role,
                        potential_id: potential_id.to_string(),
                    })
                }
            })?;

        let run = &self.runs[index];
        let snapshot = compute_capacity(run, char_id, role, &self.config);
        if snapshot.is_full {
            return Err(TrackerError::CapacityExceeded {
                char_id: char_id.to_string(),
                role,
                used: snapshot.used_slots,
                capacity: snapshot.capacity,
            });
        }
        if run.find_target(potential_id).is_some() {
            return Err(TrackerError::AlreadyAssigned {
                run_id: run_id.to_string(),
                potential_id: potential_id.to_string(),
            });
        }

        let target = Target::new(potential_id, char_id, 1);
        let mut candidate = self.runs.clone();
        candidate[index].targets.push(target.clone());
        self.commit(candidate)?;
        log::debug!("run {run_id}: added {potential_id} for {char_id}");
        self.emit(&RunEvent::TargetAdded {
            run_id: run_id.to_string(),
            target,
        });
        Ok(self.runs[index].clone())
    }

    /// Move a target's level by `delta`, clamped to `1..=max_level`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown run or target, or a persistence error.
    pub fn set_level(
        &mut self,
        run_id: &str,
        potential_id: &str,
        delta: i32,
    ) -> Result<LevelOutcome, TrackerError> {
        let index = self.run_index(run_id)?;
        let run = &self.runs[index];
        let position = run
            .targets
            .iter()
            .position(|t| t.potential_id == potential_id)
            .ok_or_else(|| TrackerError::TargetNotFound {
                run_id: run_id.to_string(),
                potential_id: potential_id.to_string(),
            })?;
        let current = &run.targets[position];
        let new_level = self
            .config
            .clamp_level(i64::from(current.level) + i64::from(delta));
        if new_level == current.level {
            return Ok(LevelOutcome::Unchanged(current.clone()));
        }
        let previous_level = current.level;
        let role = self.role_for(run, current);

        let mut candidate = self.runs.clone();
        candidate[index].targets[position].level = new_level;
        self.commit(candidate)?;

        let run = &self.runs[index];
        let target = run.targets[position].clone();
        let change = LevelChange {
            run_id: run_id.to_string(),
            capacity: compute_capacity(run, &target.char_id, role, &self.config),
            target,
            previous_level,
            role,
        };
        log::debug!("run {run_id}: {potential_id} level {previous_level} -> {new_level}");
        self.emit(&RunEvent::LevelChanged(change.clone()));
        Ok(LevelOutcome::Changed(change))
    }

    /// Remove a target; removing an absent target succeeds without a write.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::RunNotFound`] for an unknown run, or a persistence error.
    pub fn remove_target(&mut self, run_id: &str, potential_id: &str) -> Result<Run, TrackerError> {
        let index = self.run_index(run_id)?;
        if self.runs[index].find_target(potential_id).is_none() {
            return Ok(self.runs[index].clone());
        }
        let mut candidate = self.runs.clone();
        candidate[index]
            .targets
            .retain(|t| t.potential_id != potential_id);
        self.commit(candidate)?;
        log::debug!("run {run_id}: removed {potential_id}");
        self.emit(&RunEvent::TargetRemoved {
            run_id: run_id.to_string(),
            potential_id: potential_id.to_string(),
        });
        Ok(self.runs[index].clone())
    }

    /// Portable record and file name for a run.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::RunNotFound`] if the run does not exist.
    pub fn export_run(&self, run_id: &str) -> Result<ExportedRun, TrackerError> {
        let run = self.require_run(run_id)?;
        Ok(ExportedRun {
            file_name: export_file_name(run),
            record: to_portable(run),
        })
    }

    /// Admit a run from untrusted file contents under a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::MalformedImport`] if the payload is not a valid
    /// portable record, or a persistence error.
    pub fn import_run(&mut self, json: &str) -> Result<Run, TrackerError> {
        let portable = parse_portable(json).inspect_err(|e| {
            log::warn!("rejected import: {e}");
        })?;
        let id = self.fresh_id(IMPORT_ID_PREFIX);
        let cfg = &self.config;
        let mut run = from_portable(portable, id, |lvl| cfg.clamp_level(lvl));
        dedupe_targets(&mut run);

        let mut candidate = self.runs.clone();
        candidate.push(run.clone());
        self.commit(candidate)?;
        log::debug!("imported run {} ({} targets)", run.id, run.targets.len());
        self.emit(&RunEvent::RunImported(run.clone()));
        Ok(run)
    }

    fn require_run(&self, run_id: &str) -> Result<&Run, TrackerError> {
        self.run(run_id)
            .ok_or_else(|| TrackerError::RunNotFound(run_id.to_string()))
    }

    fn run_index(&self, run_id: &str) -> Result<usize, TrackerError> {
        self.runs
            .iter()
            .position(|r| r.id == run_id)
            .ok_or_else(|| TrackerError::RunNotFound(run_id.to_string()))
    }

    fn role_for(&self, run: &Run, target: &Target) -> Role {
        self.catalog
            .potential(&target.potential_id)
            .map(|p| p.role)
            .or_else(|| run.role_of(&target.char_id))
            .unwrap_or(Role::Support)
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        let runs = &self.runs;
        self.ids
            .next_id(prefix, |candidate| runs.iter().any(|r| r.id == candidate))
    }

    fn commit(&mut self, candidate: Vec<Run>) -> Result<(), TrackerError> {
        self.store.save_all(&candidate).inspect_err(|e| {
            log::warn!("keeping previous state, save failed: {e}");
        })?;
        self.runs = candidate;
        Ok(())
    }

    fn emit(&mut self, event: &RunEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

fn dedupe_targets(run: &mut Run) {
    let mut seen = HashSet::new();
    let before = run.targets.len();
    run.targets.retain(|t| seen.insert(t.potential_id.clone()));
    if run.targets.len() != before {
        log::warn!(
            "run {}: dropped {} duplicate target(s)",
            run.id,
            before - run.targets.len()
        );
    }
}

/// Repair stored data: levels into range, one target per potential, one run per id.
fn normalize_loaded(runs: Vec<Run>, cfg: &TrackerConfig) -> Vec<Run> {
    let mut seen_ids = HashSet::new();
    let mut normalized = Vec::with_capacity(runs.len());
    for mut run in runs {
        if !seen_ids.insert(run.id.clone()) {
            log::warn!("dropping stored run with duplicate id {}", run.id);
            continue;
        }
        for target in &mut run.targets {
            let clamped = cfg.clamp_level(i64::from(target.level));
            if clamped != target.level {
                log::warn!(
                    "run {}: level {} of {} out of range, clamped to {clamped}",
                    run.id,
                    target.level,
                    target.potential_id
                );
                target.level = clamped;
            }
        }
        dedupe_targets(&mut run);
        normalized.push(run);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STORAGE_KEY;
    use crate::error::ErrorKind;
    use crate::storage::MemoryStore;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: Rc<Cell<bool>>,
        unreadable: Rc<Cell<bool>>,
        writes: Rc<Cell<usize>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("backend unavailable")]
    struct BackendDown;

    impl KeyValueStore for FlakyStore {
        type Error = BackendDown;

        fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
            if self.unreadable.get() {
                return Err(BackendDown);
            }
            Ok(self.inner.raw(key))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
            if self.failing.get() {
                return Err(BackendDown);
            }
            self.writes.set(self.writes.get() + 1);
            self.inner.insert_raw(key, value);
            Ok(())
        }
    }

    fn repo_with(store: FlakyStore) -> RunRepository<FlakyStore> {
        let cfg = TrackerConfig::default();
        RunRepository::open(RunStore::new(store), Catalog::generate(&cfg), cfg)
    }

    fn repo() -> (RunRepository<FlakyStore>, FlakyStore) {
        let store = FlakyStore::default();
        (repo_with(store.clone()), store)
    }

    #[test]
    fn create_run_persists_an_empty_run() {
        let (mut repo, store) = repo();
        assert_eq!(repo.suggested_run_name(), "Run #1");
        let run = repo.create_run("  ", "c1", "c2", "c3").unwrap();
        assert_eq!(run.name, UNTITLED_RUN_NAME);
        assert!(run.targets.is_empty());
        assert_eq!(store.writes.get(), 1);

        let reopened = repo_with(store);
        assert_eq!(reopened.runs(), std::slice::from_ref(&run));
        assert_eq!(reopened.suggested_run_name(), "Run #2");
    }

    #[test]
    fn create_run_ids_are_unique() {
        let (mut repo, _) = repo();
        let a = repo.create_run("A", "c1", "c2", "c3").unwrap();
        let b = repo.create_run("B", "c1", "c2", "c3").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn create_run_rejects_unknown_characters() {
        let (mut repo, store) = repo();
        let err = repo.create_run("x", "c1", "c9", "c3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repo.runs().is_empty());
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn add_target_starts_at_level_one() {
        let (mut repo, _) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        let updated = repo.add_target(&run.id, "c1_main_1", "c1").unwrap();
        assert_eq!(updated.targets, vec![Target::new("c1_main_1", "c1", 1)]);
    }

    #[test]
    fn add_target_rejects_unknown_references() {
        let (mut repo, _) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        let cases = [
            ("missing", "c1_main_1", "c1"),
            (run.id.as_str(), "c1_main_99", "c1"),
            (run.id.as_str(), "c1_main_1", "c2"),
            (run.id.as_str(), "c2_main_1", "c2"),
            (run.id.as_str(), "c4_support_1", "c4"),
        ];
        for (run_id, potential_id, char_id) in cases {
            let err = repo.add_target(run_id, potential_id, char_id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound, "{potential_id}/{char_id}");
        }
        assert!(repo.run(&run.id).unwrap().targets.is_empty());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let (mut repo, store) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        repo.add_target(&run.id, "c2_support_1", "c2").unwrap();
        let writes = store.writes.get();
        let err = repo.add_target(&run.id, "c2_support_1", "c2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAssigned);
        assert_eq!(repo.run(&run.id).unwrap().targets.len(), 1);
        assert_eq!(store.writes.get(), writes);
    }

    #[test]
    fn maxing_a_target_unlocks_another_slot() {
        let (mut repo, _) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        for n in 1..=5 {
            repo.add_target(&run.id, &format!("c2_support_{n}"), "c2")
                .unwrap();
        }
        let full = repo.capacity(&run.id, "c2", Role::Support).unwrap();
        assert_eq!((full.capacity, full.is_full), (5, true));

        let err = repo.add_target(&run.id, "c2_support_6", "c2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);

        let outcome = repo.set_level(&run.id, "c2_support_1", 5).unwrap();
        let LevelOutcome::Changed(change) = outcome else {
            panic!("expected a level change");
        };
        assert_eq!(change.target.level, 6);
        assert_eq!(change.previous_level, 1);
        assert_eq!(change.role, Role::Support);
        assert_eq!(change.capacity.capacity, 6);
        assert!(!change.capacity.is_full);

        let updated = repo.add_target(&run.id, "c2_support_6", "c2").unwrap();
        assert_eq!(updated.targets.len(), 6);
    }

    #[test]
    fn set_level_is_clamped_and_idle_at_the_bounds() {
        let (mut repo, store) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        repo.add_target(&run.id, "c1_main_2", "c1").unwrap();
        let writes = store.writes.get();
        for _ in 0..3 {
            let outcome = repo.set_level(&run.id, "c1_main_2", -1).unwrap();
            assert_eq!(outcome, LevelOutcome::Unchanged(Target::new("c1_main_2", "c1", 1)));
        }
        assert_eq!(store.writes.get(), writes);

        let outcome = repo.set_level(&run.id, "c1_main_2", 40).unwrap();
        assert_eq!(outcome.target().level, 6);
        assert!(outcome.is_changed());
        for _ in 0..3 {
            assert!(!repo.set_level(&run.id, "c1_main_2", 1).unwrap().is_changed());
        }
        assert_eq!(store.writes.get(), writes + 1);
    }

    #[test]
    fn set_level_reports_missing_run_or_target() {
        let (mut repo, _) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        assert!(matches!(
            repo.set_level("nope", "c1_main_1", 1),
            Err(TrackerError::RunNotFound(_))
        ));
        assert!(matches!(
            repo.set_level(&run.id, "c1_main_1", 1),
            Err(TrackerError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn add_then_remove_restores_usage_and_stats() {
        let (mut repo, _) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        repo.add_target(&run.id, "c1_main_3", "c1").unwrap();
        repo.set_level(&run.id, "c1_main_3", 2).unwrap();
        let usage = repo.capacity(&run.id, "c1", Role::Main).unwrap();
        let stats = repo.stats(&run.id).unwrap();

        repo.add_target(&run.id, "c1_main_4", "c1").unwrap();
        assert_ne!(repo.stats(&run.id).unwrap(), stats);
        repo.remove_target(&run.id, "c1_main_4").unwrap();

        assert_eq!(repo.capacity(&run.id, "c1", Role::Main).unwrap(), usage);
        assert_eq!(repo.stats(&run.id).unwrap(), stats);
    }

    #[test]
    fn removing_an_absent_target_is_a_quiet_success() {
        let (mut repo, store) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        let writes = store.writes.get();
        let same = repo.remove_target(&run.id, "c1_main_1").unwrap();
        assert_eq!(same, run);
        assert_eq!(store.writes.get(), writes);
        assert!(matches!(
            repo.remove_target("nope", "c1_main_1"),
            Err(TrackerError::RunNotFound(_))
        ));
    }

    #[test]
    fn delete_run_is_tolerant() {
        let (mut repo, store) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        assert!(!repo.delete_run("nope").unwrap());
        assert!(repo.delete_run(&run.id).unwrap());
        assert!(repo.runs().is_empty());
        assert!(repo_with(store).runs().is_empty());
    }

    #[test]
    fn failed_save_rolls_back() {
        let (mut repo, store) = repo();
        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        repo.add_target(&run.id, "c1_main_1", "c1").unwrap();
        let before = repo.runs().to_vec();

        store.failing.set(true);
        let err = repo.add_target(&run.id, "c1_main_2", "c1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(repo.set_level(&run.id, "c1_main_1", 1).is_err());
        assert!(repo.remove_target(&run.id, "c1_main_1").is_err());
        assert!(repo.delete_run(&run.id).is_err());
        assert!(repo.create_run("S", "c1", "c2", "c3").is_err());
        assert_eq!(repo.runs(), before.as_slice());

        store.failing.set(false);
        assert_eq!(repo_with(store).runs(), before.as_slice());
    }

    #[test]
    fn export_then_import_creates_a_distinct_copy() {
        let (mut repo, _) = repo();
        let run = repo.create_run("Abyss", "c1", "c2", "c3").unwrap();
        repo.add_target(&run.id, "c1_main_1", "c1").unwrap();
        repo.set_level(&run.id, "c1_main_1", 3).unwrap();
        repo.add_target(&run.id, "c3_support_2", "c3").unwrap();

        let export = repo.export_run(&run.id).unwrap();
        assert_eq!(export.file_name, "stella_run_Abyss.json");
        let imported = repo.import_run(&export.record.to_json().unwrap()).unwrap();

        let original = repo.run(&run.id).unwrap();
        assert!(imported.id.starts_with(IMPORT_ID_PREFIX));
        assert_ne!(imported.id, original.id);
        assert_eq!(imported.name, "Abyss (Imp)");
        assert_eq!(imported.targets, original.targets);
        assert_eq!(repo.runs().len(), 2);
    }

    #[test]
    fn malformed_import_leaves_collection_unchanged() {
        let (mut repo, store) = repo();
        repo.create_run("R", "c1", "c2", "c3").unwrap();
        let before = repo.runs().to_vec();
        let writes = store.writes.get();
        let err = repo
            .import_run(r#"{ "name": "x", "main": "c1", "sup1": "c2", "sup2": "c3", "targets": {} }"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedImport);
        assert_eq!(repo.runs(), before.as_slice());
        assert_eq!(store.writes.get(), writes);
    }

    #[test]
    fn import_tolerates_unknown_potentials_and_drops_duplicates() {
        let (mut repo, _) = repo();
        let run = repo
            .import_run(
                r#"{ "name": "Foreign", "main": "c1", "sup1": "c2", "sup2": "c3",
                     "targets": [{ "pid": "x_main_1", "cid": "x", "lvl": 2 },
                                 { "pid": "x_main_1", "cid": "x", "lvl": 5 }] }"#,
            )
            .unwrap();
        assert_eq!(run.targets, vec![Target::new("x_main_1", "x", 2)]);
        assert!(repo.stats(&run.id).unwrap().is_empty());
        let outcome = repo.set_level(&run.id, "x_main_1", 1).unwrap();
        assert!(outcome.is_changed());
    }

    #[test]
    fn stored_data_is_normalized_on_open() {
        let store = FlakyStore::default();
        store.inner.insert_raw(
            STORAGE_KEY,
            r#"[
                { "id": "1", "name": "A", "main": "c1", "sup1": "c2", "sup2": "c3",
                  "targets": [{ "potentialId": "c1_main_1", "charId": "c1", "level": 9 },
                              { "potentialId": "c1_main_1", "charId": "c1", "level": 2 },
                              { "potentialId": "c1_main_2", "charId": "c1", "level": 0 }] },
                { "id": "1", "name": "dup", "main": "c1", "sup1": "c2", "sup2": "c3", "targets": [] }
            ]"#,
        );
        let repo = repo_with(store);
        assert_eq!(repo.runs().len(), 1);
        assert_eq!(
            repo.runs()[0].targets,
            vec![
                Target::new("c1_main_1", "c1", 6),
                Target::new("c1_main_2", "c1", 1),
            ]
        );
    }

    #[test]
    fn unreadable_store_refuses_to_overwrite() {
        let store = FlakyStore::default();
        store.inner.insert_raw(STORAGE_KEY, "[]");
        store.unreadable.set(true);
        let mut repo = repo_with(store.clone());
        assert!(repo.runs().is_empty());

        let err = repo.create_run("R", "c1", "c2", "c3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(repo.runs().is_empty());
        assert_eq!(store.writes.get(), 0);
        assert_eq!(store.inner.raw(STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn out_of_range_stored_levels_keep_the_collection() {
        let store = FlakyStore::default();
        store.inner.insert_raw(
            STORAGE_KEY,
            r#"[
                { "id": "1", "name": "A", "main": "c1", "sup1": "c2", "sup2": "c3",
                  "targets": [{ "potentialId": "c1_main_1", "charId": "c1", "level": 999 },
                              { "potentialId": "c1_main_2", "charId": "c1", "level": -4 }] },
                { "id": "2", "name": "B", "main": "c2", "sup1": "c3", "sup2": "c4", "targets": [] }
            ]"#,
        );
        let repo = repo_with(store);
        assert_eq!(repo.runs().len(), 2);
        assert_eq!(
            repo.runs()[0].targets,
            vec![
                Target::new("c1_main_1", "c1", 6),
                Target::new("c1_main_2", "c1", 1),
            ]
        );
    }

    #[test]
    fn malformed_store_starts_empty() {
        let store = FlakyStore::default();
        store.inner.insert_raw(STORAGE_KEY, "{ definitely not runs");
        assert!(repo_with(store).runs().is_empty());
    }

    #[test]
    fn listeners_see_only_real_changes() {
        let (mut repo, _) = repo();
        let events: Rc<RefCell<Vec<RunEvent>>> = Rc::default();
        let sink = Rc::clone(&events);
        repo.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let run = repo.create_run("R", "c1", "c2", "c3").unwrap();
        repo.add_target(&run.id, "c1_main_1", "c1").unwrap();
        repo.set_level(&run.id, "c1_main_1", -1).unwrap();
        repo.set_level(&run.id, "c1_main_1", 1).unwrap();
        repo.remove_target(&run.id, "c1_main_9").unwrap();
        repo.remove_target(&run.id, "c1_main_1").unwrap();
        repo.delete_run(&run.id).unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], RunEvent::RunCreated(_)));
        assert!(matches!(events[1], RunEvent::TargetAdded { .. }));
        assert!(matches!(&events[2], RunEvent::LevelChanged(c) if c.target.level == 2));
        assert!(matches!(events[3], RunEvent::TargetRemoved { .. }));
        assert!(matches!(events[4], RunEvent::RunDeleted { .. }));
    }
}
