//! Pipeline orchestration.
//!
//! The orchestrator runs entirely on a blocking worker. Every state
//! transition goes through the task registry as a sparse patch, so a
//! concurrent status query always sees a consistent snapshot. A full
//! run walks decode, optional enhancement, segmentation, per-segment
//! recognition, optional punctuation, and combination. Single-stage
//! runs execute one engine against the stored payload and record the
//! outcome under the stage map without producing a final result.

use std::sync::Arc;
use std::time::Instant;

use crate::audio::decode_audio;
use crate::defaults::{CHUNK_SECS, CHUNK_THRESHOLD_SECS, PROGRESS_DECODED};
use crate::engine::{Diarizer, Enhancer, Punctuator, RecognizeOptions, Recognizer, Segmenter};
use crate::error::{Result, ScribedError};
use crate::pipeline::combine::combine_segments;
use crate::pipeline::plan::{chunk_spans, full_span, segment_progress, slice_bounds};
use crate::task::registry::TaskRegistry;
use crate::task::{
    DecodedAudio, SpeechSpan, Stage, StageEntry, StageOutcome, TaskId, TaskPatch, TaskResult,
    TaskStatus, TranscriptSegment,
};

/// The engine set available to the orchestrator. Recognition is the
/// only mandatory engine; everything else is skipped when absent.
pub struct Engines {
    pub recognizer: Arc<dyn Recognizer>,
    pub punctuator: Option<Arc<dyn Punctuator>>,
    pub diarizer: Option<Arc<dyn Diarizer>>,
    pub segmenter: Option<Arc<dyn Segmenter>>,
    pub enhancer: Option<Arc<dyn Enhancer>>,
}

impl Engines {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            punctuator: None,
            diarizer: None,
            segmenter: None,
            enhancer: None,
        }
    }

    pub fn with_punctuator(mut self, punctuator: Arc<dyn Punctuator>) -> Self {
        self.punctuator = Some(punctuator);
        self
    }

    pub fn with_diarizer(mut self, diarizer: Arc<dyn Diarizer>) -> Self {
        self.diarizer = Some(diarizer);
        self
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Recordings longer than this fall back to fixed chunks when no
    /// segmentation engine produced spans.
    pub chunk_threshold_secs: f64,
    pub chunk_secs: f64,
    pub quiet: bool,
    pub verbosity: u8,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_secs: CHUNK_THRESHOLD_SECS,
            chunk_secs: CHUNK_SECS,
            quiet: false,
            verbosity: 0,
        }
    }
}

pub struct Orchestrator {
    engines: Engines,
    registry: Arc<TaskRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(engines: Engines, registry: Arc<TaskRegistry>, config: OrchestratorConfig) -> Self {
        Self {
            engines,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Whether the recognition engine has a loaded model.
    pub fn model_ready(&self) -> bool {
        self.engines.recognizer.is_ready()
    }

    pub fn model_name(&self) -> String {
        self.engines.recognizer.model_name().to_string()
    }

    /// Run the full pipeline for a submitted task. Failures of the
    /// mandatory steps land in the task record rather than propagating,
    /// so a worker thread never carries an error past the run.
    pub fn run_full(&self, task_id: TaskId) {
        let started = Instant::now();
        match self.execute_full(task_id) {
            Ok(duration) => {
                if !self.config.quiet && self.config.verbosity >= 1 {
                    let elapsed = started.elapsed().as_secs_f64();
                    let rtf = if duration > 0.0 { elapsed / duration } else { 0.0 };
                    eprintln!(
                        "scribed: task {} done in {:.2}s (audio {:.2}s, rtf {:.3})",
                        task_id, elapsed, duration, rtf
                    );
                }
            }
            Err(e) => {
                self.registry.update(
                    task_id,
                    TaskPatch::new()
                        .status(TaskStatus::Error)
                        .message("pipeline run failed")
                        .error(e.to_string()),
                );
                if !self.config.quiet {
                    eprintln!("scribed: task {} failed: {}", task_id, e);
                }
            }
        }
    }

    /// Run a single stage against the task's stored payload. Stage
    /// failures stay inside the stage map; the run itself always
    /// terminates the task.
    pub fn run_stage(&self, task_id: TaskId, stage: Stage) {
        self.registry.update(
            task_id,
            TaskPatch::new()
                .status(TaskStatus::Running)
                .message(format!("running stage {stage}"))
                .stage(stage, StageEntry::running()),
        );
        let entry = match self.execute_stage(task_id, stage) {
            Ok(outcome) => StageEntry::done(outcome),
            Err(e) => {
                if !self.config.quiet {
                    eprintln!("scribed: task {} stage {} failed: {}", task_id, stage, e);
                }
                StageEntry::error(e.to_string())
            }
        };
        self.registry.update(
            task_id,
            TaskPatch::new()
                .status(TaskStatus::Done)
                .message(format!("stage {stage} finished"))
                .stage(stage, entry),
        );
    }

    fn execute_full(&self, task_id: TaskId) -> Result<f64> {
        self.registry.update(
            task_id,
            TaskPatch::new()
                .status(TaskStatus::Running)
                .message("decoding audio"),
        );
        let audio = self.load_audio(task_id)?;
        self.registry.update(
            task_id,
            TaskPatch::new()
                .progress(PROGRESS_DECODED)
                .message("audio decoded"),
        );

        let audio = self.enhancement_step(task_id, audio);
        let duration = audio.duration;
        let spans = self.segmentation_step(task_id, &audio);

        let total = spans.len();
        let mut segments = Vec::with_capacity(total);
        for (index, span) in spans.iter().enumerate() {
            let (start, end) = slice_bounds(span, audio.sample_rate, audio.samples.len());
            let text = self.recognize_with_retry(&audio.samples[start..end], audio.sample_rate)?;
            segments.push(TranscriptSegment {
                start: span.start,
                end: span.end,
                text,
                speaker: span.speaker,
            });
            self.registry.update(
                task_id,
                TaskPatch::new()
                    .progress(segment_progress(index, total))
                    .message(format!("recognized segment {}/{}", index + 1, total)),
            );
        }

        self.punctuation_step(task_id, &mut segments);

        let text = combine_segments(&segments);
        self.registry.update(
            task_id,
            TaskPatch::new()
                .status(TaskStatus::Done)
                .progress(1.0)
                .message("done")
                .result(TaskResult {
                    text,
                    segments,
                    duration,
                }),
        );
        Ok(duration)
    }

    fn execute_stage(&self, task_id: TaskId, stage: Stage) -> Result<StageOutcome> {
        let audio = self.load_audio(task_id)?;
        match stage {
            Stage::Enhanced => {
                let enhancer = self
                    .engines
                    .enhancer
                    .as_deref()
                    .ok_or(ScribedError::EngineMissing {
                        engine: "enhancement",
                    })?;
                match enhancer.enhance(&audio.samples, audio.sample_rate)? {
                    Some(samples) => {
                        let replaced = DecodedAudio::new(samples, audio.sample_rate);
                        let outcome = StageOutcome::Enhanced {
                            samples: replaced.samples.len(),
                            duration: replaced.duration,
                        };
                        self.store_decoded(task_id, replaced);
                        Ok(outcome)
                    }
                    None => Ok(StageOutcome::Enhanced {
                        samples: audio.samples.len(),
                        duration: audio.duration,
                    }),
                }
            }
            Stage::Diarization => {
                // A standalone diarization run prefers the speaker
                // engine but degrades to plain voice activity.
                let spans = if let Some(diarizer) = &self.engines.diarizer {
                    diarizer.diarize(&audio.samples, audio.sample_rate)?
                } else if let Some(segmenter) = &self.engines.segmenter {
                    segmenter.segment(&audio.samples, audio.sample_rate)?
                } else {
                    return Err(ScribedError::EngineMissing {
                        engine: "diarization",
                    });
                };
                Ok(StageOutcome::Segments { spans })
            }
            Stage::Transformer => {
                let text = self.recognize_with_retry(&audio.samples, audio.sample_rate)?;
                Ok(StageOutcome::Transcript { text })
            }
        }
    }

    /// Fetch the task's decoded audio, decoding the raw payload on
    /// first use and caching the result back on the payload.
    fn load_audio(&self, task_id: TaskId) -> Result<DecodedAudio> {
        let payload = self
            .registry
            .payload(task_id)
            .ok_or_else(|| ScribedError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;
        if let Some(decoded) = payload.decoded {
            return Ok(decoded);
        }
        let decoded = decode_audio(&payload.raw, payload.media_type)?;
        self.store_decoded(task_id, decoded.clone());
        Ok(decoded)
    }

    fn store_decoded(&self, task_id: TaskId, decoded: DecodedAudio) {
        if let Some(mut payload) = self.registry.payload(task_id) {
            payload.decoded = Some(decoded);
            self.registry.set_payload(task_id, payload);
        }
    }

    /// Optional enhancement. A failing or pass-through enhancer keeps
    /// the decoded audio unchanged; the outcome lands in the stage map
    /// either way and never aborts the run.
    fn enhancement_step(&self, task_id: TaskId, audio: DecodedAudio) -> DecodedAudio {
        let Some(enhancer) = &self.engines.enhancer else {
            return audio;
        };
        self.registry.update(
            task_id,
            TaskPatch::new()
                .message("enhancing audio")
                .stage(Stage::Enhanced, StageEntry::running()),
        );
        match enhancer.enhance(&audio.samples, audio.sample_rate) {
            Ok(Some(samples)) => {
                let replaced = DecodedAudio::new(samples, audio.sample_rate);
                self.registry.update(
                    task_id,
                    TaskPatch::new().stage(
                        Stage::Enhanced,
                        StageEntry::done(StageOutcome::Enhanced {
                            samples: replaced.samples.len(),
                            duration: replaced.duration,
                        }),
                    ),
                );
                self.store_decoded(task_id, replaced.clone());
                replaced
            }
            Ok(None) => {
                self.registry.update(
                    task_id,
                    TaskPatch::new().stage(
                        Stage::Enhanced,
                        StageEntry::done(StageOutcome::Enhanced {
                            samples: audio.samples.len(),
                            duration: audio.duration,
                        }),
                    ),
                );
                audio
            }
            Err(e) => {
                self.registry.update(
                    task_id,
                    TaskPatch::new().stage(Stage::Enhanced, StageEntry::error(e.to_string())),
                );
                audio
            }
        }
    }

    /// Pick recognition spans. Speaker segments override voice activity
    /// spans when both engines produce output; with neither, the run
    /// falls back to a single full span, or to fixed chunks for long
    /// recordings.
    fn segmentation_step(&self, task_id: TaskId, audio: &DecodedAudio) -> Vec<SpeechSpan> {
        let has_engine = self.engines.segmenter.is_some() || self.engines.diarizer.is_some();
        let mut spans: Option<Vec<SpeechSpan>> = None;
        let mut failure: Option<String> = None;

        if let Some(segmenter) = &self.engines.segmenter {
            match segmenter.segment(&audio.samples, audio.sample_rate) {
                Ok(found) if !found.is_empty() => spans = Some(found),
                Ok(_) => {}
                Err(e) => failure = Some(e.to_string()),
            }
        }
        if let Some(diarizer) = &self.engines.diarizer {
            match diarizer.diarize(&audio.samples, audio.sample_rate) {
                Ok(found) if !found.is_empty() => spans = Some(found),
                Ok(_) => {}
                Err(e) => failure = Some(e.to_string()),
            }
        }

        if let Some(found) = spans {
            self.registry.update(
                task_id,
                TaskPatch::new().stage(
                    Stage::Diarization,
                    StageEntry::done(StageOutcome::Segments {
                        spans: found.clone(),
                    }),
                ),
            );
            return found;
        }
        if has_engine {
            let entry = match failure {
                Some(message) => StageEntry::error(message),
                None => StageEntry::done(StageOutcome::Segments { spans: Vec::new() }),
            };
            self.registry
                .update(task_id, TaskPatch::new().stage(Stage::Diarization, entry));
        }

        if audio.duration > self.config.chunk_threshold_secs {
            chunk_spans(audio.duration, self.config.chunk_secs)
        } else {
            vec![full_span(audio.duration)]
        }
    }

    /// Punctuation restoration per segment. Engine failure keeps the
    /// raw recognition text for that segment.
    fn punctuation_step(&self, task_id: TaskId, segments: &mut [TranscriptSegment]) {
        let Some(punctuator) = &self.engines.punctuator else {
            return;
        };
        self.registry
            .update(task_id, TaskPatch::new().message("restoring punctuation"));
        for segment in segments.iter_mut() {
            if segment.text.is_empty() {
                continue;
            }
            match punctuator.punctuate(&segment.text) {
                Ok(text) => segment.text = text,
                Err(e) => {
                    if !self.config.quiet && self.config.verbosity >= 1 {
                        eprintln!("scribed: punctuation failed, keeping raw text: {}", e);
                    }
                }
            }
        }
    }

    /// Recognize one slice, retrying once without batching before the
    /// failure becomes fatal.
    fn recognize_with_retry(&self, samples: &[i16], sample_rate: u32) -> Result<String> {
        let options = RecognizeOptions::default();
        match self.engines.recognizer.recognize(samples, sample_rate, &options) {
            Ok(text) => Ok(text),
            Err(first) => {
                if !self.config.quiet && self.config.verbosity >= 1 {
                    eprintln!("scribed: recognition failed, retrying without batching: {}", first);
                }
                let retry = RecognizeOptions { batched: false };
                self.engines.recognizer.recognize(samples, sample_rate, &retry)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        MockDiarizer, MockEnhancer, MockPunctuator, MockRecognizer, MockSegmenter,
    };
    use crate::task::{AudioPayload, MediaType, StageStatus};

    fn pcm_payload(duration_secs: f64) -> AudioPayload {
        let samples = vec![0i16; (duration_secs * 16000.0) as usize];
        let mut payload = AudioPayload::new(Vec::new(), MediaType::Wav);
        payload.decoded = Some(DecodedAudio::new(samples, 16000));
        payload
    }

    fn orchestrator(engines: Engines) -> (Orchestrator, Arc<TaskRegistry>) {
        let registry = Arc::new(TaskRegistry::new());
        let config = OrchestratorConfig {
            quiet: true,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::new(engines, Arc::clone(&registry), config);
        (orchestrator, registry)
    }

    fn submit(registry: &TaskRegistry, payload: AudioPayload) -> TaskId {
        let task_id = TaskId::new();
        assert!(registry.create(task_id, Some(payload)));
        task_id
    }

    #[test]
    fn test_full_run_minimal_engines() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("hello world "));
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));
        let task_id = submit(&registry, pcm_payload(10.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        assert_eq!(snapshot.progress, 1.0);
        let result = snapshot.result.unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].start, 0.0);
        assert_eq!(result.segments[0].end, 10.0);
        assert!((result.duration - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_full_run_decode_failure_marks_error() {
        let recognizer = Arc::new(MockRecognizer::new("base"));
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));
        let task_id = submit(
            &registry,
            AudioPayload::new(vec![0u8, 1, 2, 3], MediaType::Wav),
        );

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Error);
        assert!(snapshot.error.is_some());
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn test_full_run_recognizer_retry_without_batching() {
        let recognizer =
            Arc::new(MockRecognizer::new("base").with_response("ok").with_batched_failure());
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));
        let task_id = submit(&registry, pcm_payload(5.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        assert_eq!(snapshot.result.unwrap().text, "ok");
    }

    #[test]
    fn test_full_run_recognizer_failure_is_fatal() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_failure());
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));
        let task_id = submit(&registry, pcm_payload(5.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Error);
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn test_full_run_enhancement_failure_is_not_fatal() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("text"));
        let enhancer = Arc::new(MockEnhancer::new().with_failure());
        let engines = Engines::new(recognizer).with_enhancer(enhancer);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(5.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        let entry = snapshot.stages.get(&Stage::Enhanced).unwrap();
        assert_eq!(entry.status, StageStatus::Error);
        assert!(entry.error.is_some());
    }

    #[test]
    fn test_full_run_enhancement_replaces_audio() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("text"));
        let enhancer = Arc::new(MockEnhancer::new().with_output(vec![100i16; 16000]));
        let engines = Engines::new(recognizer).with_enhancer(enhancer);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(5.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        // result duration reflects the enhanced audio
        assert!((snapshot.result.unwrap().duration - 1.0).abs() < 1e-6);
        let entry = snapshot.stages.get(&Stage::Enhanced).unwrap();
        assert_eq!(entry.status, StageStatus::Done);
        let decoded = registry.payload(task_id).unwrap().decoded.unwrap();
        assert_eq!(decoded.samples.len(), 16000);
    }

    #[test]
    fn test_full_run_uses_vad_spans() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("x"));
        let segmenter = Arc::new(MockSegmenter::new().with_spans(vec![
            SpeechSpan::new(0.0, 2.0),
            SpeechSpan::new(3.0, 5.0),
        ]));
        let engines = Engines::new(recognizer).with_segmenter(segmenter);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(6.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        let result = snapshot.result.unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].start, 3.0);
        let entry = snapshot.stages.get(&Stage::Diarization).unwrap();
        assert_eq!(entry.status, StageStatus::Done);
    }

    #[test]
    fn test_full_run_diarization_overrides_vad() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("x"));
        let segmenter = Arc::new(
            MockSegmenter::new().with_spans(vec![SpeechSpan::new(0.0, 6.0)]),
        );
        let diarizer = Arc::new(MockDiarizer::new().with_spans(vec![
            SpeechSpan::new(0.0, 3.0).with_speaker(0),
            SpeechSpan::new(3.0, 6.0).with_speaker(1),
        ]));
        let engines = Engines::new(recognizer)
            .with_segmenter(segmenter)
            .with_diarizer(diarizer);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(6.0));

        orchestrator.run_full(task_id);

        let result = registry.read(task_id).unwrap().result.unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].speaker, Some(0));
        assert_eq!(result.segments[1].speaker, Some(1));
    }

    #[test]
    fn test_full_run_vad_failure_falls_back_to_full_span() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("t"));
        let segmenter = Arc::new(MockSegmenter::new().with_failure());
        let engines = Engines::new(recognizer).with_segmenter(segmenter);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(5.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        assert_eq!(snapshot.result.unwrap().segments.len(), 1);
        let entry = snapshot.stages.get(&Stage::Diarization).unwrap();
        assert_eq!(entry.status, StageStatus::Error);
    }

    #[test]
    fn test_full_run_long_audio_chunks() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("c "));
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));
        let task_id = submit(&registry, pcm_payload(150.0));

        orchestrator.run_full(task_id);

        let result = registry.read(task_id).unwrap().result.unwrap();
        assert_eq!(result.segments.len(), 3);
        assert_eq!(result.segments[0].end, 60.0);
        assert_eq!(result.segments[2].start, 120.0);
        assert_eq!(result.segments[2].end, 150.0);
        assert_eq!(result.text, "c c c");
    }

    #[test]
    fn test_full_run_punctuation_applied() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("hello"));
        let punctuator = Arc::new(MockPunctuator::new().with_suffix("."));
        let engines = Engines::new(recognizer).with_punctuator(punctuator);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(3.0));

        orchestrator.run_full(task_id);

        assert_eq!(registry.read(task_id).unwrap().result.unwrap().text, "hello.");
    }

    #[test]
    fn test_full_run_punctuation_failure_keeps_raw_text() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("hello"));
        let punctuator = Arc::new(MockPunctuator::new().with_failure());
        let engines = Engines::new(recognizer).with_punctuator(punctuator);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(3.0));

        orchestrator.run_full(task_id);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        assert_eq!(snapshot.result.unwrap().text, "hello");
    }

    #[test]
    fn test_full_run_unknown_task() {
        let recognizer = Arc::new(MockRecognizer::new("base"));
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));

        // no panic, nothing recorded
        orchestrator.run_full(TaskId::new());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stage_transformer() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("transcribed"));
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));
        let task_id = submit(&registry, pcm_payload(4.0));

        orchestrator.run_stage(task_id, Stage::Transformer);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        assert!(snapshot.result.is_none());
        let entry = snapshot.stages.get(&Stage::Transformer).unwrap();
        assert_eq!(entry.status, StageStatus::Done);
        match entry.result.as_ref().unwrap() {
            StageOutcome::Transcript { text } => assert_eq!(text, "transcribed"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_stage_diarization_falls_back_to_segmenter() {
        let recognizer = Arc::new(MockRecognizer::new("base"));
        let segmenter = Arc::new(
            MockSegmenter::new().with_spans(vec![SpeechSpan::new(1.0, 2.0)]),
        );
        let engines = Engines::new(recognizer).with_segmenter(segmenter);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(4.0));

        orchestrator.run_stage(task_id, Stage::Diarization);

        let snapshot = registry.read(task_id).unwrap();
        let entry = snapshot.stages.get(&Stage::Diarization).unwrap();
        assert_eq!(entry.status, StageStatus::Done);
        match entry.result.as_ref().unwrap() {
            StageOutcome::Segments { spans } => assert_eq!(spans.len(), 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_stage_missing_engine_records_error() {
        let recognizer = Arc::new(MockRecognizer::new("base"));
        let (orchestrator, registry) = orchestrator(Engines::new(recognizer));
        let task_id = submit(&registry, pcm_payload(4.0));

        orchestrator.run_stage(task_id, Stage::Enhanced);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Done);
        let entry = snapshot.stages.get(&Stage::Enhanced).unwrap();
        assert_eq!(entry.status, StageStatus::Error);
        assert!(entry.error.as_ref().unwrap().contains("enhancement"));
    }

    #[test]
    fn test_stage_enhancement_updates_payload() {
        let recognizer = Arc::new(MockRecognizer::new("base"));
        let enhancer = Arc::new(MockEnhancer::new().with_output(vec![5i16; 32000]));
        let engines = Engines::new(recognizer).with_enhancer(enhancer);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(4.0));

        orchestrator.run_stage(task_id, Stage::Enhanced);

        let decoded = registry.payload(task_id).unwrap().decoded.unwrap();
        assert_eq!(decoded.samples.len(), 32000);
        let snapshot = registry.read(task_id).unwrap();
        match snapshot.stages.get(&Stage::Enhanced).unwrap().result.as_ref().unwrap() {
            StageOutcome::Enhanced { samples, duration } => {
                assert_eq!(*samples, 32000);
                assert!((duration - 2.0).abs() < 1e-6);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_stage_runs_are_additive() {
        let recognizer = Arc::new(MockRecognizer::new("base").with_response("t"));
        let segmenter = Arc::new(
            MockSegmenter::new().with_spans(vec![SpeechSpan::new(0.0, 1.0)]),
        );
        let engines = Engines::new(recognizer).with_segmenter(segmenter);
        let (orchestrator, registry) = orchestrator(engines);
        let task_id = submit(&registry, pcm_payload(4.0));

        orchestrator.run_stage(task_id, Stage::Diarization);
        orchestrator.run_stage(task_id, Stage::Transformer);

        let snapshot = registry.read(task_id).unwrap();
        assert_eq!(snapshot.stages.len(), 2);
        assert!(snapshot.stages.contains_key(&Stage::Diarization));
        assert!(snapshot.stages.contains_key(&Stage::Transformer));
    }
}
