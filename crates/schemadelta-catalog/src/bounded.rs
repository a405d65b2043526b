//! Time-bounded probe wrapper

use crate::probe::{DialectProbe, ProbeError, ProbeRequest, TypeFamily};
use crate::type_family::normalize_type;
use schemadelta_core::DialectConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

type Verdict = Result<TypeFamily, ProbeError>;

struct Job {
    request: ProbeRequest,
    reply: mpsc::Sender<Verdict>,
}

/// Runs a live probe on one long-lived worker thread and gives up after a
/// timeout
///
/// Answers are cached per dialect and normalized type. While the worker is
/// still stuck on a request that timed out, further calls fail fast instead
/// of queueing behind it. Offline probes such as
/// [`TypeFamilyProbe`](crate::TypeFamilyProbe) never block and need no
/// wrapper.
pub struct BoundedProbe {
    name: &'static str,
    jobs: Mutex<mpsc::Sender<Job>>,
    in_flight: Arc<AtomicUsize>,
    stalled: AtomicBool,
    verdicts: Mutex<HashMap<(DialectConfig, String), TypeFamily>>,
    timeout: Duration,
}

impl BoundedProbe {
    /// Start the worker thread; it exits once the probe is dropped and its
    /// current request returns
    pub fn new(inner: Arc<dyn DialectProbe>, timeout: Duration) -> Result<Self, ProbeError> {
        let (jobs, queue) = mpsc::channel::<Job>();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker_in_flight = Arc::clone(&in_flight);
        let name = inner.name();

        thread::Builder::new()
            .name("schemadelta-probe".to_string())
            .spawn(move || {
                for job in queue {
                    let verdict = inner.type_family(&job.request);
                    worker_in_flight.fetch_sub(1, Ordering::SeqCst);
                    // Caller may have given up
                    let _ = job.reply.send(verdict);
                }
            })
            .map_err(|e| ProbeError::Unavailable(e.to_string()))?;

        Ok(Self {
            name,
            jobs: Mutex::new(jobs),
            in_flight,
            stalled: AtomicBool::new(false),
            verdicts: Mutex::new(HashMap::new()),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn cached(&self, key: &(DialectConfig, String)) -> Option<TypeFamily> {
        self.verdicts.lock().ok().and_then(|verdicts| verdicts.get(key).copied())
    }

    /// Whether the worker is still running a request that already timed out
    fn still_stalled(&self) -> bool {
        if !self.stalled.load(Ordering::SeqCst) {
            return false;
        }
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return true;
        }
        self.stalled.store(false, Ordering::SeqCst);
        false
    }

    fn submit(&self, request: &ProbeRequest) -> Result<mpsc::Receiver<Verdict>, ProbeError> {
        let (reply, answer) = mpsc::channel();
        let jobs = self
            .jobs
            .lock()
            .map_err(|_| ProbeError::Unavailable("probe queue poisoned".to_string()))?;

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if jobs.send(Job { request: request.clone(), reply }).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(ProbeError::Unavailable("probe worker exited".to_string()));
        }
        Ok(answer)
    }
}

impl DialectProbe for BoundedProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn type_family(&self, request: &ProbeRequest) -> Result<TypeFamily, ProbeError> {
        let key = (request.dialect, normalize_type(&request.data_type));
        if let Some(family) = self.cached(&key) {
            return Ok(family);
        }

        if self.still_stalled() {
            return Err(ProbeError::Unavailable(format!(
                "{} is still busy with a request that timed out",
                self.name
            )));
        }

        let answer = self.submit(request)?;
        match answer.recv_timeout(self.timeout) {
            Ok(Ok(family)) => {
                if let Ok(mut verdicts) = self.verdicts.lock() {
                    verdicts.insert(key, family);
                }
                Ok(family)
            }
            Ok(Err(e)) => Err(e),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.stalled.store(true, Ordering::SeqCst);
                tracing::debug!(probe = self.name, timeout = ?self.timeout, "probe timed out");
                Err(ProbeError::Timeout(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ProbeError::Unavailable(
                "probe worker exited without an answer".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for BoundedProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedProbe")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}
