//! The skeleton: a listening socket, one listener task, and one service
//! task per accepted connection.
//!
//! The implementation object is anything implementing
//! [`RemoteImplementation`] — a capability-based dispatch table standing in
//! for runtime reflection: the skeleton resolves `(method_name,
//! parameter_type_names)` against the descriptor itself, and only once a
//! method is known to exist does it hand the call to the implementation.

use crate::descriptor::{self, RemoteInterfaceDescriptor};
use crate::error::{FailureValue, RmiError, TRANSPORT_FAILURE_KIND};
use crate::wire::{read_framed, write_framed, Request, Response};
use async_trait::async_trait;
use socket2::Socket;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default bind address used when a skeleton is constructed without one.
/// Port `0` asks the OS to assign one.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 0;

/// The outcome of dispatching one request to the implementation object.
#[derive(Debug, Clone)]
pub enum InvokeOutcome {
    /// The method returned a value.
    Success(serde_json::Value),
    /// The method returned the unit/empty type.
    Void,
    /// The method raised a failure, carried verbatim for transport.
    Failed(FailureValue),
}

/// The implementation object a skeleton dispatches resolved calls to.
///
/// Implementations are shared, uncoordinated, across service tasks — the
/// skeleton never serializes calls onto one task, so thread-safety of the
/// implementation's own state is the caller's responsibility.
#[async_trait]
pub trait RemoteImplementation: Send + Sync {
    async fn invoke(
        &self,
        method_name: &str,
        parameter_type_names: &[String],
        arguments: Vec<serde_json::Value>,
    ) -> InvokeOutcome;
}

/// The skeleton's sole customization points.
pub trait SkeletonHooks: Send + Sync {
    /// Called exactly once per `stop()`, after the listener task has
    /// exited. `cause` is the terminating failure, or `None` for a clean
    /// stop.
    fn stopped(&self, _cause: Option<&RmiError>) {}

    /// Called after a top-level failure in the accept loop. Returning
    /// `true` resumes the loop; the default (`false`) shuts the listener
    /// down.
    fn listen_error(&self, _error: &RmiError) -> bool {
        false
    }

    /// Called for any service-task failure that is not the user method's
    /// own failure (read/decode/dispatch/write errors).
    fn service_error(&self, _error: &RmiError) {}
}

/// Hooks implementation that does nothing, the skeleton's default.
#[derive(Debug, Default)]
pub struct NoopHooks;

impl SkeletonHooks for NoopHooks {}

/// The skeleton's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonState {
    Created,
    Running,
    Stopping,
    Stopped,
}

struct SkeletonInner {
    state: SkeletonState,
    address: Option<SocketAddr>,
    shutdown: Option<oneshot::Sender<()>>,
    listener_task: Option<JoinHandle<()>>,
}

/// Owns a listening socket and dispatches accepted connections to an
/// implementation object.
///
/// Cloning a `Skeleton` shares the same underlying state (the same `Arc`s),
/// so a clone observes the same RUNNING/STOPPED transitions as the
/// original — there is exactly one skeleton instance behind any number of
/// clones.
pub struct Skeleton<I> {
    descriptor: Arc<RemoteInterfaceDescriptor>,
    implementation: Arc<I>,
    hooks: Arc<dyn SkeletonHooks>,
    inner: Arc<Mutex<SkeletonInner>>,
}

impl<I> Clone for Skeleton<I> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            implementation: self.implementation.clone(),
            hooks: self.hooks.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<I> Skeleton<I> {
    /// Replaces the default no-op hooks with a custom implementation
    ///. Intended to be called once, right after construction.
    pub fn with_hooks(mut self, hooks: Arc<dyn SkeletonHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn descriptor(&self) -> &Arc<RemoteInterfaceDescriptor> {
        &self.descriptor
    }

    /// The skeleton's current address: the constructor-supplied address
    /// before `start()`, or the bound (possibly OS-assigned) address after
    /// a successful `start()`. Safe to call in any state.
    pub async fn address(&self) -> Option<SocketAddr> {
        self.inner.lock().await.address
    }

    /// Convenience accessor over [`Skeleton::address`].
    pub async fn port(&self) -> Option<u16> {
        self.address().await.map(|addr| addr.port())
    }

    pub async fn state(&self) -> SkeletonState {
        self.inner.lock().await.state
    }
}

impl<I: RemoteImplementation + 'static> Skeleton<I> {
    /// Constructs a skeleton.
    ///
    /// `descriptor` and `implementation` are modeled as `Option` so the
    /// *null-argument* boundary is directly testable; `address` is already
    /// optional, since a skeleton can be constructed without committing to
    /// one up front.
    pub fn new(
        descriptor: Option<Arc<RemoteInterfaceDescriptor>>,
        implementation: Option<Arc<I>>,
        address: Option<SocketAddr>,
    ) -> Result<Self, RmiError> {
        let descriptor = descriptor.ok_or(RmiError::NullArgument("descriptor"))?;
        let implementation = implementation.ok_or(RmiError::NullArgument("implementation"))?;
        descriptor::validate(&descriptor)?;

        Ok(Self {
            descriptor,
            implementation,
            hooks: Arc::new(NoopHooks),
            inner: Arc::new(Mutex::new(SkeletonInner {
                state: SkeletonState::Created,
                address,
                shutdown: None,
                listener_task: None,
            })),
        })
    }

    /// Binds the listening socket and launches the listener task.
    ///
    /// Idempotent only in the STOPPED → RUNNING direction; calling this on
    /// a RUNNING skeleton fails with `Transport("already running")`. If
    /// binding fails the state is left exactly as it was.
    pub async fn start(&self) -> Result<(), RmiError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SkeletonState::Running | SkeletonState::Stopping => {
                return Err(RmiError::Transport("skeleton is already running".to_string()));
            }
            SkeletonState::Created | SkeletonState::Stopped => {}
        }

        let bind_addr = inner
            .address
            .unwrap_or_else(|| format!("{DEFAULT_HOST}:{DEFAULT_PORT}").parse().unwrap());

        let listener = bind_listener(bind_addr)
            .await
            .map_err(|e| RmiError::Transport(format!("bind failed: {e:#}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RmiError::Transport(format!("local_addr failed: {e}")))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let descriptor = self.descriptor.clone();
        let implementation = self.implementation.clone();
        let hooks = self.hooks.clone();

        let listener_task = tokio::spawn(run_listener(
            listener,
            shutdown_rx,
            descriptor,
            implementation,
            hooks,
        ));

        inner.address = Some(local_addr);
        inner.shutdown = Some(shutdown_tx);
        inner.listener_task = Some(listener_task);
        inner.state = SkeletonState::Running;

        debug!(address = %local_addr, "skeleton started");
        Ok(())
    }

    /// Signals the listener to exit and waits for it to join.
    ///
    /// A no-op (no hook called) if the skeleton is not RUNNING. Never
    /// fails; in-flight service tasks are not cancelled and continue on
    /// their own connections.
    pub async fn stop(&self) {
        let (shutdown_tx, listener_task) = {
            let mut inner = self.inner.lock().await;
            if inner.state != SkeletonState::Running {
                return;
            }
            inner.state = SkeletonState::Stopping;
            (inner.shutdown.take(), inner.listener_task.take())
        };

        if let Some(tx) = shutdown_tx {
            let _ = tx.send(());
        }
        if let Some(task) = listener_task {
            let _ = task.await;
        }

        self.inner.lock().await.state = SkeletonState::Stopped;
    }
}

/// Binds a `TcpListener` with `SO_REUSEADDR` set, the same low-latency
/// socket tuning applied before handing a socket to Tokio elsewhere in this
/// crate.
async fn bind_listener(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        socket2::Domain::IPV4
    } else {
        socket2::Domain::IPV6
    };
    let socket = Socket::new(domain, socket2::Type::STREAM, Some(socket2::Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    Ok(TcpListener::from_std(socket.into())?)
}

/// The listener task: accept, spawn a service task, repeat.
///
/// Exits when the shutdown signal fires, or when [`SkeletonHooks::listen_error`]
/// declines to resume after a top-level accept failure. Either way,
/// [`SkeletonHooks::stopped`] fires exactly once right before this task
/// returns.
async fn run_listener<I: RemoteImplementation + 'static>(
    listener: TcpListener,
    mut shutdown_rx: oneshot::Receiver<()>,
    descriptor: Arc<RemoteInterfaceDescriptor>,
    implementation: Arc<I>,
    hooks: Arc<dyn SkeletonHooks>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        tokio::spawn(service_task(
                            stream,
                            descriptor.clone(),
                            implementation.clone(),
                            hooks.clone(),
                        ));
                    }
                    Err(e) => {
                        let err = RmiError::Transport(format!("accept failed: {e}"));
                        if hooks.listen_error(&err) {
                            warn!(error = %err, "listen_error resumed accept loop");
                            continue;
                        }
                        hooks.stopped(Some(&err));
                        return;
                    }
                }
            }
            _ = &mut shutdown_rx => {
                hooks.stopped(None);
                return;
            }
        }
    }
}

/// One accepted connection: read a request, dispatch it, write a response,
/// close.
async fn service_task<I: RemoteImplementation + 'static>(
    mut stream: TcpStream,
    descriptor: Arc<RemoteInterfaceDescriptor>,
    implementation: Arc<I>,
    hooks: Arc<dyn SkeletonHooks>,
) {
    let _ = stream.set_nodelay(true);

    if let Err(err) = service_one_request(&mut stream, &descriptor, &implementation, &hooks).await
    {
        hooks.service_error(&err);
        let failure = Response::Failed {
            failure: FailureValue::new(TRANSPORT_FAILURE_KIND, serde_json::json!(err.to_string())),
        };
        let _ = write_framed(&mut stream, &failure).await;
    }
}

async fn service_one_request<I: RemoteImplementation + 'static>(
    stream: &mut TcpStream,
    descriptor: &RemoteInterfaceDescriptor,
    implementation: &I,
    hooks: &Arc<dyn SkeletonHooks>,
) -> Result<(), RmiError> {
    let request: Request = read_framed(stream)
        .await
        .map_err(|e| RmiError::Transport(format!("failed to read request: {e}")))?;

    let response = match descriptor.resolve(&request.method_name, &request.parameter_type_names) {
        None => {
            let err = RmiError::Transport(format!(
                "no method `{}({:?})` on `{}`",
                request.method_name, request.parameter_type_names, descriptor.interface_name
            ));
            hooks.service_error(&err);
            Response::Failed {
                failure: FailureValue::new(TRANSPORT_FAILURE_KIND, serde_json::json!(err.to_string())),
            }
        }
        Some(_) => {
            match implementation
                .invoke(
                    &request.method_name,
                    &request.parameter_type_names,
                    request.arguments,
                )
                .await
            {
                InvokeOutcome::Success(payload) => Response::Success { payload },
                InvokeOutcome::Void => Response::Void,
                InvokeOutcome::Failed(failure) => Response::Failed { failure },
            }
        }
    };

    write_framed(stream, &response)
        .await
        .map_err(|e| RmiError::Transport(format!("failed to write response: {e}")))
}
