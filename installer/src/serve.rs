//! Local static file server for the synchronized content root.
//!
//! The listening socket is bound synchronously so a busy port is reported
//! before anything else happens. Requests are then served by `axum` with
//! `tower-http`'s [`ServeDir`] on a background thread that owns its own
//! Tokio runtime. Stopping the handle triggers a graceful shutdown: open
//! connections finish before the thread exits.

use axum::Router;
use camino::Utf8Path;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tower_http::services::ServeDir;

/// Worker threads for the server runtime; traffic is a single local browser.
const WORKER_THREADS: usize = 2;

/// Errors arising from starting or stopping the server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The directory to serve does not exist.
    #[error("content root {path} is not a directory")]
    MissingRoot {
        /// The directory that was requested.
        path: String,
    },

    /// Another process is already listening on the port.
    #[error("port {port} is already in use; choose another with --port")]
    PortInUse {
        /// The requested port.
        port: u16,
    },

    /// The socket could not be bound or configured.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        /// The requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The runtime or its thread could not be started.
    #[error("failed to start the server runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Server(#[source] io::Error),

    /// The server thread panicked.
    #[error("server thread panicked")]
    Panicked,
}

/// A running server. Dropping the handle stops it.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl ServerHandle {
    /// The bound address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The root URL, e.g. `http://127.0.0.1:8080/`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Shut down gracefully and wait for the server thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Server`] if the server failed while running,
    /// or [`ServeError::Panicked`] if its thread panicked.
    pub fn stop(mut self) -> Result<(), ServeError> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<(), ServeError> {
        if let Some(shutdown) = self.shutdown.take()
            && shutdown.send(()).is_err()
        {
            log::debug!("server on {} had already stopped", self.addr);
        }
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        match thread.join() {
            Ok(Ok(())) => {
                log::info!("server on {} stopped", self.addr);
                Ok(())
            }
            Ok(Err(error)) => Err(ServeError::Server(error)),
            Err(_) => Err(ServeError::Panicked),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown_and_join() {
            log::warn!("{error}");
        }
    }
}

/// Serve `root` on `127.0.0.1:<port>`; port `0` picks a free port.
///
/// Directory requests resolve to their `index.html`.
///
/// # Errors
///
/// Returns [`ServeError::MissingRoot`] when `root` is not a directory,
/// [`ServeError::PortInUse`] or [`ServeError::Bind`] when the socket cannot
/// be bound, and [`ServeError::Runtime`] when the runtime cannot start.
pub fn serve(root: &Utf8Path, port: u16) -> Result<ServerHandle, ServeError> {
    if !root.is_dir() {
        return Err(ServeError::MissingRoot {
            path: root.to_string(),
        });
    }
    let requested = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let bind_error = |source: io::Error| {
        if source.kind() == io::ErrorKind::AddrInUse {
            ServeError::PortInUse { port }
        } else {
            ServeError::Bind {
                addr: requested,
                source,
            }
        }
    };
    let listener = TcpListener::bind(requested).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    let addr = listener.local_addr().map_err(bind_error)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(WORKER_THREADS)
        .thread_name("sitesync-http")
        .enable_all()
        .build()
        .map_err(ServeError::Runtime)?;
    let router = site_router(root);
    let (shutdown, signal) = oneshot::channel();
    let thread = std::thread::Builder::new()
        .name("sitesync-server".to_owned())
        .spawn(move || runtime.block_on(run_server(listener, router, signal)))
        .map_err(ServeError::Runtime)?;

    log::info!("serving {root} on {addr}");
    Ok(ServerHandle {
        addr,
        shutdown: Some(shutdown),
        thread: Some(thread),
    })
}

/// Router serving files from `root`.
#[must_use]
pub fn site_router(root: &Utf8Path) -> Router {
    Router::new().fallback_service(ServeDir::new(root.as_std_path()))
}

async fn run_server(
    listener: TcpListener,
    router: Router,
    signal: oneshot::Receiver<()>,
) -> io::Result<()> {
    let listener = tokio::net::TcpListener::from_std(listener)?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if signal.await.is_err() {
                log::debug!("server handle dropped without a stop signal");
            }
        })
        .await
}
