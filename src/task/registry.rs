//! Concurrency-safe task store, the single source of truth for task state.
//!
//! All operations go through one registry-wide mutex. Critical sections are
//! O(1) map operations, so lock hold time (microseconds) is negligible next
//! to stage execution (seconds). Updates to unknown IDs are a documented
//! fail-soft no-op: a late write from a superseded run must not surface as
//! a caller-visible failure.

use crate::task::{
    AudioPayload, Stage, StageEntry, TaskId, TaskPatch, TaskResult, TaskSnapshot, TaskStatus,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Stored per-task record. Snapshots are cloned out under the lock.
#[derive(Debug, Clone)]
struct TaskRecord {
    status: TaskStatus,
    progress: f64,
    message: Option<String>,
    error: Option<String>,
    result: Option<TaskResult>,
    stages: BTreeMap<Stage, StageEntry>,
    payload: Option<AudioPayload>,
}

impl TaskRecord {
    fn new(payload: Option<AudioPayload>) -> Self {
        Self {
            status: TaskStatus::Pending,
            progress: 0.0,
            message: None,
            error: None,
            result: None,
            stages: BTreeMap::new(),
            payload,
        }
    }
}

/// Registry of task state keyed by task ID.
///
/// An explicit handle: callers hold an `Arc<TaskRegistry>` and inject it
/// wherever task state is read or written. There is no global instance.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, TaskRecord>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new task with status `Pending`, progress 0, empty stages.
    ///
    /// Returns false without touching anything if the ID already exists;
    /// callers are responsible for generating unique IDs.
    pub fn create(&self, id: TaskId, payload: Option<AudioPayload>) -> bool {
        let mut tasks = self.lock();
        if tasks.contains_key(&id) {
            return false;
        }
        tasks.insert(id, TaskRecord::new(payload));
        true
    }

    /// Applies a sparse patch atomically with respect to other operations.
    ///
    /// Unset patch fields leave the record untouched. A stage write merges
    /// into the stage map and never clears other stages' entries. Progress
    /// is clamped to `[0, 1]`; a NaN keeps the previous value. Returns
    /// false (and changes nothing) if the ID is unknown.
    pub fn update(&self, id: TaskId, patch: TaskPatch) -> bool {
        let mut tasks = self.lock();
        let Some(record) = tasks.get_mut(&id) else {
            return false;
        };
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(progress) = patch.progress {
            if !progress.is_nan() {
                record.progress = progress.clamp(0.0, 1.0);
            }
        }
        if let Some(message) = patch.message {
            record.message = Some(message);
        }
        if let Some(error) = patch.error {
            record.error = Some(error);
        }
        if let Some(result) = patch.result {
            record.result = Some(result);
        }
        if let Some((stage, entry)) = patch.stage {
            record.stages.insert(stage, entry);
        }
        true
    }

    /// Returns a consistent point-in-time copy of the record, or `None`
    /// for unknown IDs.
    pub fn read(&self, id: TaskId) -> Option<TaskSnapshot> {
        let tasks = self.lock();
        tasks.get(&id).map(|record| TaskSnapshot {
            status: record.status,
            progress: record.progress,
            message: record.message.clone(),
            error: record.error.clone(),
            result: record.result.clone(),
            stages: record.stages.clone(),
        })
    }

    /// Narrow accessor for the working-data blob.
    pub fn payload(&self, id: TaskId) -> Option<AudioPayload> {
        let tasks = self.lock();
        tasks.get(&id).and_then(|record| record.payload.clone())
    }

    /// Stores the working-data blob. Returns false for unknown IDs.
    pub fn set_payload(&self, id: TaskId, payload: AudioPayload) -> bool {
        let mut tasks = self.lock();
        let Some(record) = tasks.get_mut(&id) else {
            return false;
        };
        record.payload = Some(payload);
        true
    }

    /// Number of tasks ever registered (tasks are never evicted).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, TaskRecord>> {
        // A poisoned lock means a panic mid-update; the map itself is
        // still structurally sound, so keep serving.
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{MediaType, StageOutcome, StageStatus};
    use std::sync::Arc;

    #[test]
    fn create_then_read_returns_pending_defaults() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        assert!(registry.create(id, None));

        let snapshot = registry.read(id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Pending);
        assert_eq!(snapshot.progress, 0.0);
        assert!(snapshot.stages.is_empty());
        assert!(snapshot.message.is_none());
        assert!(snapshot.error.is_none());
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn create_with_duplicate_id_is_a_noop() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        assert!(registry.create(id, None));
        assert!(registry
            .update(id, TaskPatch::new().status(TaskStatus::Running)));

        // Second create must not reset the existing record.
        assert!(!registry.create(id, None));
        assert_eq!(registry.read(id).unwrap().status, TaskStatus::Running);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn progress_is_clamped_low() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, None);

        registry.update(id, TaskPatch::new().progress(-0.3));
        assert_eq!(registry.read(id).unwrap().progress, 0.0);
    }

    #[test]
    fn progress_is_clamped_high() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, None);

        registry.update(id, TaskPatch::new().progress(1.7));
        assert_eq!(registry.read(id).unwrap().progress, 1.0);
    }

    #[test]
    fn nan_progress_keeps_previous_value() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, None);

        registry.update(id, TaskPatch::new().progress(0.4));
        registry.update(id, TaskPatch::new().progress(f64::NAN));
        assert_eq!(registry.read(id).unwrap().progress, 0.4);
    }

    #[test]
    fn update_unknown_id_is_a_noop() {
        let registry = TaskRegistry::new();
        let known = TaskId::new();
        registry.create(known, None);
        registry.update(known, TaskPatch::new().progress(0.5));

        let unknown = TaskId::new();
        assert!(!registry.update(unknown, TaskPatch::new().status(TaskStatus::Error)));

        // Registry size and other tasks are unchanged.
        assert_eq!(registry.len(), 1);
        let snapshot = registry.read(known).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Pending);
        assert_eq!(snapshot.progress, 0.5);
        assert!(registry.read(unknown).is_none());
    }

    #[test]
    fn unset_patch_fields_leave_record_untouched() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, None);

        registry.update(
            id,
            TaskPatch::new()
                .status(TaskStatus::Running)
                .progress(0.3)
                .message("decoding"),
        );
        // A later progress-only update must not reset message or status.
        registry.update(id, TaskPatch::new().progress(0.6));

        let snapshot = registry.read(id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Running);
        assert_eq!(snapshot.progress, 0.6);
        assert_eq!(snapshot.message.as_deref(), Some("decoding"));
    }

    #[test]
    fn message_is_last_write_wins() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, None);

        registry.update(id, TaskPatch::new().message("first"));
        registry.update(id, TaskPatch::new().message("second"));
        assert_eq!(
            registry.read(id).unwrap().message.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn stage_map_merge_is_additive() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, None);

        registry.update(
            id,
            TaskPatch::new().stage(
                Stage::Enhanced,
                StageEntry::done(StageOutcome::Enhanced {
                    samples: 16000,
                    duration: 1.0,
                }),
            ),
        );
        registry.update(
            id,
            TaskPatch::new().stage(
                Stage::Diarization,
                StageEntry::done(StageOutcome::Segments {
                    spans: vec![crate::task::SpeechSpan::new(0.0, 1.0)],
                }),
            ),
        );

        let snapshot = registry.read(id).unwrap();
        assert_eq!(snapshot.stages.len(), 2);
        assert_eq!(
            snapshot.stages[&Stage::Enhanced].status,
            StageStatus::Done
        );
        assert_eq!(
            snapshot.stages[&Stage::Diarization].status,
            StageStatus::Done
        );
    }

    #[test]
    fn stage_rewrite_replaces_only_that_stage() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, None);

        registry.update(
            id,
            TaskPatch::new().stage(Stage::Enhanced, StageEntry::running()),
        );
        registry.update(
            id,
            TaskPatch::new().stage(Stage::Transformer, StageEntry::running()),
        );
        registry.update(
            id,
            TaskPatch::new().stage(Stage::Enhanced, StageEntry::error("denoiser crashed")),
        );

        let snapshot = registry.read(id).unwrap();
        assert_eq!(snapshot.stages[&Stage::Enhanced].status, StageStatus::Error);
        assert_eq!(
            snapshot.stages[&Stage::Transformer].status,
            StageStatus::Running
        );
    }

    #[test]
    fn payload_roundtrip() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        registry.create(id, Some(AudioPayload::new(vec![1, 2, 3], MediaType::Wav)));

        let payload = registry.payload(id).unwrap();
        assert_eq!(&payload.raw[..], &[1, 2, 3]);
        assert!(payload.decoded.is_none());

        let mut updated = payload.clone();
        updated.decoded = Some(crate::task::DecodedAudio::new(vec![0i16; 160], 16000));
        assert!(registry.set_payload(id, updated));
        assert!(registry.payload(id).unwrap().decoded.is_some());
    }

    #[test]
    fn set_payload_unknown_id_returns_false() {
        let registry = TaskRegistry::new();
        assert!(!registry.set_payload(
            TaskId::new(),
            AudioPayload::new(vec![], MediaType::Wav)
        ));
        assert!(registry.payload(TaskId::new()).is_none());
    }

    #[test]
    fn concurrent_updates_do_not_corrupt_state() {
        let registry = Arc::new(TaskRegistry::new());
        let id = TaskId::new();
        registry.create(id, None);

        let mut handles = Vec::new();
        for worker in 0..8u32 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for step in 0..100 {
                    let progress = f64::from(step) / 100.0;
                    registry.update(
                        id,
                        TaskPatch::new()
                            .progress(progress)
                            .message(format!("worker {worker} step {step}")),
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.read(id).unwrap();
        assert!((0.0..=1.0).contains(&snapshot.progress));
        assert!(snapshot.message.is_some());
        assert_eq!(registry.len(), 1);
    }
}
