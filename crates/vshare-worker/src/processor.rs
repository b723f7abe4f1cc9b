//! Sensitivity-scan processing.
//!
//! One scan per upload, terminal either way:
//! 1. emit `sensitivity:checking` to the owner's channel;
//! 2. call the classifier under a bounded timeout;
//! 3. persist the terminal status;
//! 4. emit `sensitivity:result` — only after the status write committed.
//!
//! Classifier failure or timeout fails open: the video is persisted as
//! `safe` and the result event carries an error annotation. Exactly one
//! result event is emitted on every path that reaches a terminal state.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use vshare_firestore::VideoRepository;
use vshare_models::{NotificationEvent, VideoId, VideoStatus};
use vshare_queue::{EventSink, SensitivityScanJob};
use vshare_sensitivity::{SensitivityAnalyzer, SensitivityError, SensitivityVerdict};

use crate::error::WorkerResult;

/// Persistence seam for the terminal status write.
pub trait StatusWriter: Send + Sync {
    fn set_status(
        &self,
        video_id: &VideoId,
        status: VideoStatus,
    ) -> impl Future<Output = WorkerResult<()>> + Send;
}

impl StatusWriter for VideoRepository {
    async fn set_status(&self, video_id: &VideoId, status: VideoStatus) -> WorkerResult<()> {
        VideoRepository::set_status(self, video_id, status).await?;
        Ok(())
    }
}

/// Terminal outcome of one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub status: VideoStatus,
    pub confidence: Option<u32>,
    pub labels: Vec<String>,
    pub error: Option<String>,
}

impl ScanOutcome {
    /// Map a classifier result to a terminal outcome. Errors fail open:
    /// availability over caution, so the status is `safe`, annotated.
    pub fn from_classifier(result: Result<SensitivityVerdict, SensitivityError>) -> Self {
        match result {
            Ok(verdict) => ScanOutcome {
                status: if verdict.is_safe {
                    VideoStatus::Safe
                } else {
                    VideoStatus::Flagged
                },
                confidence: Some(verdict.confidence),
                labels: verdict.labels,
                error: None,
            },
            Err(e) => ScanOutcome {
                status: VideoStatus::Safe,
                confidence: None,
                labels: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// The result event for this outcome.
    pub fn into_event(self, video_id: VideoId) -> NotificationEvent {
        match self.error {
            Some(error) => NotificationEvent::result_failed_open(video_id, error),
            None => NotificationEvent::result(
                video_id,
                self.status,
                self.confidence.unwrap_or(0),
                self.labels,
            ),
        }
    }
}

/// Run one sensitivity scan to a terminal state.
///
/// `media_url` is the presigned location of the stored file; `None` means
/// the file could not be made reachable, which takes the fail-open path
/// without calling the classifier.
///
/// Returns an error only when the terminal-status write fails — in that
/// case no result event has been emitted, because clients must never see a
/// result for a status that is not durable.
pub async fn run_sensitivity_scan<S, A, E>(
    store: &S,
    analyzer: &A,
    events: &E,
    job: &SensitivityScanJob,
    media_url: Option<String>,
    timeout: Duration,
) -> WorkerResult<()>
where
    S: StatusWriter,
    A: SensitivityAnalyzer,
    E: EventSink,
{
    // Checking notification goes out before the classifier is invoked.
    // Delivery is best effort.
    if let Err(e) = events
        .emit(&job.owner_id, NotificationEvent::checking(job.video_id.clone()))
        .await
    {
        warn!(video_id = %job.video_id, "Failed to emit checking event: {}", e);
    }

    let classifier_result = match media_url {
        Some(url) => match tokio::time::timeout(timeout, analyzer.analyze(&url)).await {
            Ok(result) => result,
            Err(_) => Err(SensitivityError::Timeout(timeout.as_secs())),
        },
        None => Err(SensitivityError::ServiceUnavailable(
            "stored file unreachable".to_string(),
        )),
    };

    if let Err(e) = &classifier_result {
        warn!(
            video_id = %job.video_id,
            "Sensitivity check failed, failing open to safe: {}",
            e
        );
    }

    let outcome = ScanOutcome::from_classifier(classifier_result);

    // The status write must commit before any result event is observable.
    store.set_status(&job.video_id, outcome.status).await?;

    info!(
        video_id = %job.video_id,
        status = %outcome.status,
        failed_open = outcome.error.is_some(),
        "Sensitivity scan complete"
    );

    let owner = job.owner_id.clone();
    if let Err(e) = events
        .emit(&owner, outcome.into_event(job.video_id.clone()))
        .await
    {
        // The status is durable; a lost notification is not worth a DLQ
        // round-trip.
        warn!(video_id = %job.video_id, "Failed to emit result event: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vshare_models::UserId;
    use vshare_queue::QueueResult;
    use vshare_sensitivity::SensitivityResult;

    struct StubAnalyzer {
        response: fn() -> SensitivityResult<SensitivityVerdict>,
    }

    impl SensitivityAnalyzer for StubAnalyzer {
        async fn analyze(&self, _media_url: &str) -> SensitivityResult<SensitivityVerdict> {
            (self.response)()
        }
    }

    struct HangingAnalyzer;

    impl SensitivityAnalyzer for HangingAnalyzer {
        async fn analyze(&self, _media_url: &str) -> SensitivityResult<SensitivityVerdict> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("the scan timeout should have fired")
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<(VideoId, VideoStatus)>>,
        fail: bool,
    }

    impl StatusWriter for RecordingStore {
        async fn set_status(&self, video_id: &VideoId, status: VideoStatus) -> WorkerResult<()> {
            if self.fail {
                return Err(crate::error::WorkerError::job_failed("store down"));
            }
            self.writes
                .lock()
                .unwrap()
                .push((video_id.clone(), status));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<NotificationEvent>>,
    }

    impl EventSink for RecordingSink {
        async fn emit(&self, _identity: &UserId, event: NotificationEvent) -> QueueResult<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn job() -> SensitivityScanJob {
        SensitivityScanJob::new(
            VideoId::from("v1"),
            UserId::from("owner"),
            "videos/owner/v1/clip.mp4",
        )
    }

    fn result_events(sink: &RecordingSink) -> Vec<NotificationEvent> {
        sink.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, NotificationEvent::SensitivityResult { .. }))
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn test_safe_verdict_persists_safe() {
        let store = RecordingStore::default();
        let sink = RecordingSink::default();
        let analyzer = StubAnalyzer {
            response: || {
                Ok(SensitivityVerdict {
                    is_safe: true,
                    confidence: 92,
                    labels: vec!["No explicit content detected".into()],
                })
            },
        };

        run_sensitivity_scan(
            &store,
            &analyzer,
            &sink,
            &job(),
            Some("https://s/clip".into()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(
            store.writes.lock().unwrap().as_slice(),
            &[(VideoId::from("v1"), VideoStatus::Safe)]
        );

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            NotificationEvent::SensitivityChecking { .. }
        ));
        match &events[1] {
            NotificationEvent::SensitivityResult {
                status,
                confidence,
                error,
                ..
            } => {
                assert_eq!(*status, VideoStatus::Safe);
                assert_eq!(*confidence, Some(92));
                assert!(error.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsafe_verdict_persists_flagged() {
        let store = RecordingStore::default();
        let sink = RecordingSink::default();
        let analyzer = StubAnalyzer {
            response: || {
                Ok(SensitivityVerdict {
                    is_safe: false,
                    confidence: 88,
                    labels: vec!["Potentially explicit content".into()],
                })
            },
        };

        run_sensitivity_scan(
            &store,
            &analyzer,
            &sink,
            &job(),
            Some("https://s/clip".into()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(
            store.writes.lock().unwrap().as_slice(),
            &[(VideoId::from("v1"), VideoStatus::Flagged)]
        );
    }

    #[tokio::test]
    async fn test_classifier_failure_fails_open() {
        let store = RecordingStore::default();
        let sink = RecordingSink::default();
        let analyzer = StubAnalyzer {
            response: || Err(SensitivityError::ServiceUnavailable("503".into())),
        };

        run_sensitivity_scan(
            &store,
            &analyzer,
            &sink,
            &job(),
            Some("https://s/clip".into()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        // Fail-open: the status is safe, not processing or an error state.
        assert_eq!(
            store.writes.lock().unwrap().as_slice(),
            &[(VideoId::from("v1"), VideoStatus::Safe)]
        );

        // Exactly one result event, annotated with the failure.
        let results = result_events(&sink);
        assert_eq!(results.len(), 1);
        match &results[0] {
            NotificationEvent::SensitivityResult { status, error, .. } => {
                assert_eq!(*status, VideoStatus::Safe);
                assert!(error.is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_classifier_times_out_and_fails_open() {
        let store = RecordingStore::default();
        let sink = RecordingSink::default();

        run_sensitivity_scan(
            &store,
            &HangingAnalyzer,
            &sink,
            &job(),
            Some("https://s/clip".into()),
            Duration::from_secs(120),
        )
        .await
        .unwrap();

        assert_eq!(
            store.writes.lock().unwrap().as_slice(),
            &[(VideoId::from("v1"), VideoStatus::Safe)]
        );
        assert_eq!(result_events(&sink).len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_file_fails_open_without_classifier() {
        let store = RecordingStore::default();
        let sink = RecordingSink::default();
        let analyzer = StubAnalyzer {
            response: || panic!("classifier must not be called"),
        };

        run_sensitivity_scan(&store, &analyzer, &sink, &job(), None, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(
            store.writes.lock().unwrap().as_slice(),
            &[(VideoId::from("v1"), VideoStatus::Safe)]
        );
    }

    #[tokio::test]
    async fn test_store_failure_suppresses_result_event() {
        let store = RecordingStore {
            writes: Mutex::new(Vec::new()),
            fail: true,
        };
        let sink = RecordingSink::default();
        let analyzer = StubAnalyzer {
            response: || {
                Ok(SensitivityVerdict {
                    is_safe: true,
                    confidence: 99,
                    labels: vec![],
                })
            },
        };

        let result = run_sensitivity_scan(
            &store,
            &analyzer,
            &sink,
            &job(),
            Some("https://s/clip".into()),
            Duration::from_secs(5),
        )
        .await;

        assert!(result.is_err());
        // No result event may be observed for a status that never became
        // durable.
        assert!(result_events(&sink).is_empty());
    }
}
