//! # Event Pump
//!
//! Drives the pipeline: read a record from the joystick, decode it, run it
//! through the transform and hand the result to the sink.
//!
//! The pump stops when the shutdown future resolves, when the source fails,
//! or when the source ends. A joystick device never ends on its own, so
//! end-of-stream is reported as [`JoystickShiftError::EndOfStream`].

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, trace, warn};

use crate::error::{JoystickShiftError, Result};
use crate::joystick::codec::{RecordCodec, RECORD_SIZE};
use crate::mapper::EventTransform;
use crate::virtual_device::{Delivery, EventSink};

/// Counters kept while pumping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Records read from the source
    pub records: u64,
    /// Records with an unrecognized type tag
    pub skipped: u64,
    /// Events dropped by the transform
    pub suppressed: u64,
    /// Events the sink emitted
    pub forwarded: u64,
    /// Events the sink accepted but had no control for
    pub dropped: u64,
    /// Events the sink failed to emit
    pub emit_failures: u64,
}

/// Pipeline driver over a byte source `R`, a transform `T` and a sink `S`.
///
/// Pass `&mut` references for `T` and `S` to keep ownership of the mapper
/// and the virtual device outside the pump.
///
/// # Examples
///
/// ```
/// use joystick_shift::joystick::codec::RecordCodec;
/// use joystick_shift::joystick::event::Event;
/// use joystick_shift::mapper::shift::{ShiftConfig, ShiftMapper};
/// use joystick_shift::pump::EventPump;
/// use joystick_shift::virtual_device::{Delivery, EventSink};
///
/// struct Collect(Vec<Event>);
/// impl EventSink for Collect {
///     fn send(&mut self, event: Event) -> joystick_shift::error::Result<Delivery> {
///         self.0.push(event);
///         Ok(Delivery::Emitted)
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> joystick_shift::error::Result<()> {
/// let codec = RecordCodec::default();
/// let mut stream = Vec::new();
/// stream.extend(codec.encode(&Event::button(0, 1), 0));
/// stream.extend(codec.encode(&Event::button(1, 1), 0));
///
/// let mut mapper = ShiftMapper::new(ShiftConfig::for_device(2, 2, 0))?;
/// let mut sink = Collect(Vec::new());
/// let mut pump = EventPump::new(&stream[..], codec, &mut mapper, &mut sink);
///
/// // The slice ends after two records
/// assert!(pump.run(std::future::pending::<()>()).await.is_err());
/// drop(pump);
/// assert_eq!(sink.0, vec![Event::button(3, 1)]);
/// # Ok(())
/// # }
/// ```
pub struct EventPump<R, T, S> {
    source: R,
    codec: RecordCodec,
    transform: T,
    sink: S,
    stats: PumpStats,
}

impl<R, T, S> EventPump<R, T, S>
where
    R: AsyncRead + Unpin,
    T: EventTransform,
    S: EventSink,
{
    pub fn new(source: R, codec: RecordCodec, transform: T, sink: S) -> Self {
        Self {
            source,
            codec,
            transform,
            sink,
            stats: PumpStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> &PumpStats {
        &self.stats
    }

    /// Run until `shutdown` resolves or the source fails.
    ///
    /// A record that has been read completely is always processed before
    /// shutdown is checked again.
    ///
    /// # Errors
    ///
    /// - `EndOfStream` if the source ends
    /// - `Io` if reading fails
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut record = [0u8; RECORD_SIZE];

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping event pump");
                    return Ok(());
                }

                read = self.source.read_exact(&mut record) => {
                    match read {
                        Ok(_) => self.process(&record),
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            return Err(JoystickShiftError::EndOfStream);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }

    /// Process one complete record.
    pub fn process(&mut self, record: &[u8; RECORD_SIZE]) {
        self.stats.records += 1;

        let Some(event) = self.codec.decode(record) else {
            self.stats.skipped += 1;
            trace!("Skipping record with type 0x{:02X}", record[6]);
            return;
        };
        debug!("Joystick received {}", event);

        let Some(mapped) = self.transform.map(event) else {
            self.stats.suppressed += 1;
            return;
        };

        match self.sink.send(mapped) {
            Ok(Delivery::Emitted) => self.stats.forwarded += 1,
            Ok(Delivery::Dropped) => self.stats.dropped += 1,
            Err(e) => {
                self.stats.emit_failures += 1;
                warn!("Failed to forward {}: {}", mapped, e);
            }
        }
    }
}
