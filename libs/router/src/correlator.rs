//! Request/response correlation over set-then-wait-for-event
//!
//! The channel only offers "set a property" and "a property changed". A
//! correlated request is written with a fresh request id in its first int32
//! slot; the vehicle answers by changing the same property with that id.
//!
//! Each property is one stream with at most one request in flight:
//!
//! ```text
//! Idle --issue--> Pending --response | timeout | set failure--> Idle
//! Idle --issue while Pending--> CONCURRENT_OPERATION (Pending untouched)
//! ```
//!
//! Responses and timer expiries both run on the worker and remove the
//! pending entry under one lock, so exactly one of them completes a request.

use crate::error::RouterResult;
use crate::router::Router;
use crate::worker::{DelayedTask, WorkerHandle};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use vhal_codec::user_hal::request_id_of;
use vhal_codec::{UserHalRequest, UserHalResponse};
use vhal_types::{Hex, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalCallbackStatus {
    Ok,
    /// The request could not be written to the channel
    HalSetTimeout,
    /// No matching response before the timeout
    HalResponseTimeout,
    /// A matching response arrived but could not be parsed
    WrongHalResponse,
    /// Another request on the same stream is still pending
    ConcurrentOperation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HalResponse<R> {
    pub status: HalCallbackStatus,
    pub response: Option<R>,
}

impl<R> HalResponse<R> {
    pub fn ok(response: R) -> Self {
        Self {
            status: HalCallbackStatus::Ok,
            response: Some(response),
        }
    }

    pub fn status(status: HalCallbackStatus) -> Self {
        Self { status, response: None }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HalCallbackStatus::Ok
    }
}

/// Resolves exactly once with the outcome of a correlated request. The
/// sender is dropped without a value only when the correlator is released.
pub type Completion<R> = oneshot::Receiver<HalResponse<R>>;

type Completer = Box<dyn FnOnce(Result<&PropertyValue, HalCallbackStatus>) + Send>;

struct PendingRequest {
    request_id: i32,
    issued_at: Instant,
    timeout: Duration,
    timer: Option<DelayedTask>,
    complete: Completer,
}

struct Inner {
    router: Arc<Router>,
    worker: WorkerHandle,
    supported: RwLock<HashSet<i32>>,
    /// stream property id -> in-flight request
    pending: Mutex<HashMap<i32, PendingRequest>>,
    next_request_id: AtomicI32,
    released: AtomicBool,
}

#[derive(Clone)]
pub struct RequestCorrelator {
    inner: Arc<Inner>,
}

impl RequestCorrelator {
    pub fn new(router: Arc<Router>, worker: WorkerHandle) -> Self {
        Self {
            inner: Arc::new(Inner {
                router,
                worker,
                supported: RwLock::new(HashSet::new()),
                pending: Mutex::new(HashMap::new()),
                next_request_id: AtomicI32::new(1),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Streams usable from now on; decided once the owning service took
    /// its properties
    pub fn set_supported(&self, property_ids: impl IntoIterator<Item = i32>) {
        let mut supported = self.inner.supported.write();
        supported.clear();
        supported.extend(property_ids);
    }

    pub fn is_supported(&self, property_id: i32) -> bool {
        self.inner.supported.read().contains(&property_id)
    }

    pub fn has_pending(&self, property_id: i32) -> bool {
        self.inner.pending.lock().contains_key(&property_id)
    }

    /// Write `request` and resolve with the matching response.
    ///
    /// # Panics
    ///
    /// If the request's stream is not supported.
    pub fn issue<Req, Resp>(&self, request: &Req, timeout: Duration) -> Completion<Resp>
    where
        Req: UserHalRequest,
        Resp: UserHalResponse + Send + 'static,
    {
        let property_id = Req::PROPERTY_ID;
        self.assert_supported(property_id);
        let (tx, rx) = oneshot::channel();

        if self.inner.released.load(Ordering::SeqCst) {
            warn!("Request on {} issued after release", Hex(property_id));
            return rx;
        }

        let request_id = {
            let mut pending = self.inner.pending.lock();
            if let Some(current) = pending.get(&property_id) {
                warn!(
                    "Request on {} rejected, request {} still pending",
                    Hex(property_id),
                    current.request_id
                );
                let _ = tx.send(HalResponse::status(HalCallbackStatus::ConcurrentOperation));
                return rx;
            }

            let request_id = self.inner.next_request_id();
            let complete: Completer = Box::new(
                move |outcome: Result<&PropertyValue, HalCallbackStatus>| {
                    let response = match outcome {
                        Ok(value) => match Resp::from_property_value(value) {
                            Ok(response) => HalResponse::ok(response),
                            Err(e) => {
                                warn!("Unparseable response on {}: {}", Hex(property_id), e);
                                HalResponse::status(HalCallbackStatus::WrongHalResponse)
                            }
                        },
                        Err(status) => HalResponse::status(status),
                    };
                    if tx.send(response).is_err() {
                        debug!("Caller stopped waiting for {}", Hex(property_id));
                    }
                },
            );
            pending.insert(
                property_id,
                PendingRequest {
                    request_id,
                    issued_at: Instant::now(),
                    timeout,
                    timer: None,
                    complete,
                },
            );
            request_id
        };

        let value = request.to_property_value(request_id);
        if let Err(e) = self.inner.router.set(&value) {
            warn!("Failed to set request {} on {}: {}", request_id, Hex(property_id), e);
            if let Some(entry) = self.inner.take_pending(property_id, request_id) {
                (entry.complete)(Err(HalCallbackStatus::HalSetTimeout));
            }
            return rx;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer = self.inner.worker.post_delayed(timeout, move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_timeout(property_id, request_id);
            }
        });
        match self.inner.pending.lock().get_mut(&property_id) {
            Some(entry) if entry.request_id == request_id => entry.timer = Some(timer),
            // Already answered
            _ => timer.cancel(),
        }
        debug!("Request {} on {} pending", request_id, Hex(property_id));
        rx
    }

    /// Write `request` without waiting for an answer; returns its id
    pub fn send<Req: UserHalRequest>(&self, request: &Req) -> RouterResult<i32> {
        let request_id = self.inner.next_request_id();
        self.send_with_id(request, request_id)?;
        Ok(request_id)
    }

    /// Write `request` under an id chosen by the caller, e.g. to follow up
    /// on an earlier exchange
    pub fn send_with_id<Req: UserHalRequest>(
        &self,
        request: &Req,
        request_id: i32,
    ) -> RouterResult<()> {
        self.assert_supported(Req::PROPERTY_ID);
        self.inner.router.set(&request.to_property_value(request_id))
    }

    /// Complete the pending request this event answers. Returns false for
    /// events that match nothing.
    pub fn on_response(&self, value: &PropertyValue) -> bool {
        if self.inner.released.load(Ordering::SeqCst) {
            return false;
        }
        let property_id = value.property_id();
        let Some(request_id) = request_id_of(value) else {
            warn!("Event on {} carries no request id", Hex(property_id));
            return false;
        };

        let entry = {
            let mut pending = self.inner.pending.lock();
            match pending.get(&property_id).map(|p| p.request_id) {
                Some(expected) if expected == request_id => pending.remove(&property_id),
                Some(expected) => {
                    warn!(
                        "Ignoring response {} on {}, expecting {}",
                        request_id,
                        Hex(property_id),
                        expected
                    );
                    None
                }
                None => {
                    debug!(
                        "No request pending on {} for response {}",
                        Hex(property_id),
                        request_id
                    );
                    None
                }
            }
        };

        let Some(entry) = entry else {
            return false;
        };
        if let Some(timer) = &entry.timer {
            timer.cancel();
        }
        debug!(
            "Response {} on {} after {:?}",
            request_id,
            Hex(property_id),
            entry.issued_at.elapsed()
        );
        (entry.complete)(Ok(value));
        true
    }

    /// Stop completing requests. Pending completions are dropped, so their
    /// receivers observe a closed channel; later timers and responses are
    /// ignored.
    pub fn release(&self) {
        if self.inner.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped: Vec<PendingRequest> =
            self.inner.pending.lock().drain().map(|(_, p)| p).collect();
        for entry in &dropped {
            if let Some(timer) = &entry.timer {
                timer.cancel();
            }
        }
        info!("Request correlator released with {} pending", dropped.len());
    }

    fn assert_supported(&self, property_id: i32) {
        assert!(
            self.is_supported(property_id),
            "property {} is not a supported request stream",
            Hex(property_id)
        );
    }
}

impl Inner {
    /// Monotonic, never zero or negative
    fn next_request_id(&self) -> i32 {
        let previous = self
            .next_request_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| Some(following_request_id(id)));
        match previous {
            Ok(id) | Err(id) => id,
        }
    }

    fn take_pending(&self, property_id: i32, request_id: i32) -> Option<PendingRequest> {
        let mut pending = self.pending.lock();
        if pending.get(&property_id).map(|p| p.request_id) == Some(request_id) {
            pending.remove(&property_id)
        } else {
            None
        }
    }

    fn on_timeout(&self, property_id: i32, request_id: i32) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        if let Some(entry) = self.take_pending(property_id, request_id) {
            warn!(
                "Request {} on {} timed out after {:?} (timeout {:?})",
                request_id,
                Hex(property_id),
                entry.issued_at.elapsed(),
                entry.timeout
            );
            (entry.complete)(Err(HalCallbackStatus::HalResponseTimeout));
        }
    }
}

fn following_request_id(id: i32) -> i32 {
    if id == i32::MAX {
        1
    } else {
        id + 1
    }
}

impl std::fmt::Debug for RequestCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("supported", &self.inner.supported.read().len())
            .field("pending", &self.inner.pending.lock().len())
            .field("released", &self.inner.released.load(Ordering::SeqCst))
            .finish()
    }
}
