//! # Session
//!
//! One pumping session wrapped in environment setup and teardown.
//!
//! `restore` runs on every exit path once `prepare` has been attempted: after
//! a clean shutdown, after a read error, and after a failed `prepare`.

use std::future::Future;

use tokio::io::AsyncRead;
use tracing::info;

use crate::error::Result;
use crate::mapper::EventTransform;
use crate::pump::EventPump;
use crate::system::Environment;
use crate::virtual_device::EventSink;

/// Prepare the environment, pump until `shutdown` or failure, restore.
///
/// # Errors
///
/// Returns the `prepare` error, or the pump's error, after restoring.
pub async fn run<E, R, T, S, F>(
    environment: &mut E,
    physical_path: &str,
    virtual_name: &str,
    pump: &mut EventPump<R, T, S>,
    shutdown: F,
) -> Result<()>
where
    E: Environment + ?Sized,
    R: AsyncRead + Unpin,
    T: EventTransform,
    S: EventSink,
    F: Future<Output = ()>,
{
    if let Err(e) = environment.prepare(physical_path, virtual_name) {
        environment.restore(physical_path);
        return Err(e);
    }

    info!("Entering event loop. Press Ctrl+C to exit.");
    let result = pump.run(shutdown).await;

    environment.restore(physical_path);
    result
}
