// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming value serialization.
//!
//! A value is encoded on a worker thread into a bounded [`pipe`](super::pipe::pipe) while the
//! calling thread hands the reading end to the store. Peak memory is bounded by the pipe
//! capacity rather than the encoded size. The worker's outcome comes back through its join
//! handle, so an encoding failure is reported to the caller even when the store has already
//! started consuming the stream.

use super::pipe::{pipe, PipeWriter, DEFAULT_PIPE_CAPACITY};
use crate::domain::{Codec, CodecError, ConfigError, ConfigKey, Result};
use serde::Serialize;
use std::io::Read;
use std::thread;

/// How the encoding worker finished.
#[derive(Debug)]
enum EncodeOutcome {
    /// Every byte was written and the stream was closed cleanly.
    Complete,
    /// The codec rejected the value; the stream was aborted.
    Failed(CodecError),
    /// The consumer dropped the stream before the value was fully written.
    ReaderClosed,
    /// The codec panicked; the stream was aborted during unwinding.
    Panicked,
}

/// Encodes values into a bounded byte stream consumed concurrently.
///
/// # Examples
///
/// ```rust
/// use std::io::Read;
/// use verscfg::domain::{Codec, ConfigKey};
/// use verscfg::service::StreamingSerializer;
///
/// let serializer = StreamingSerializer::new(Codec::Json, 8);
/// let bytes = serializer
///     .write_with(&ConfigKey::from("k"), &vec!["a long", "list", "of values"], |stream| {
///         let mut bytes = Vec::new();
///         stream.read_to_end(&mut bytes)?;
///         Ok(bytes)
///     })
///     .unwrap();
/// assert_eq!(bytes, br#"["a long","list","of values"]"#);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingSerializer {
    codec: Codec,
    capacity: usize,
}

impl StreamingSerializer {
    /// Creates a serializer using `codec` and a pipe of `capacity` bytes.
    pub fn new(codec: Codec, capacity: usize) -> Self {
        Self {
            codec,
            capacity: capacity.max(1),
        }
    }

    /// Returns the codec values are encoded with.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Returns the pipe capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encodes `value` on a worker thread and passes the byte stream to `consume`.
    ///
    /// Does not return before the worker has finished. Errors are resolved in this order:
    ///
    /// 1. the codec failed or panicked: [`ConfigError::Serialization`]
    /// 2. `consume` failed: its error
    /// 3. `consume` succeeded without draining the stream: [`ConfigError::Storage`]
    pub fn write_with<T, V, F>(&self, key: &ConfigKey, value: &T, consume: F) -> Result<V>
    where
        T: Serialize + Sync + ?Sized,
        F: FnOnce(&mut dyn Read) -> Result<V>,
    {
        let (writer, mut reader) = pipe(self.capacity);
        let codec = self.codec;

        thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name("verscfg-encode".to_string())
                .spawn_scoped(scope, move || encode_into(codec, value, writer))?;

            let consumed = consume(&mut reader);
            let drained = reader.is_drained();
            // Unblocks a worker stuck on a full pipe if `consume` stopped early.
            drop(reader);

            let outcome = worker.join().unwrap_or(EncodeOutcome::Panicked);
            resolve(key, codec, outcome, consumed, drained)
        })
    }
}

impl Default for StreamingSerializer {
    fn default() -> Self {
        Self::new(Codec::default(), DEFAULT_PIPE_CAPACITY)
    }
}

fn encode_into<T>(codec: Codec, value: &T, mut writer: PipeWriter) -> EncodeOutcome
where
    T: Serialize + ?Sized,
{
    match codec.encode(value, &mut writer) {
        Ok(()) => {
            writer.finish();
            EncodeOutcome::Complete
        }
        Err(_) if writer.is_reader_closed() => EncodeOutcome::ReaderClosed,
        Err(e) => EncodeOutcome::Failed(e),
    }
}

fn resolve<V>(
    key: &ConfigKey,
    codec: Codec,
    outcome: EncodeOutcome,
    consumed: Result<V>,
    drained: bool,
) -> Result<V> {
    match outcome {
        EncodeOutcome::Failed(e) => {
            tracing::warn!("failed to encode '{}' as {}: {}", key, codec, e);
            Err(ConfigError::serialization(key.as_str(), e))
        }
        EncodeOutcome::Panicked => {
            tracing::warn!("encoder panicked while writing '{}'", key);
            Err(ConfigError::Serialization {
                key: key.as_str().to_string(),
                message: "encoder panicked".to_string(),
                source: None,
            })
        }
        EncodeOutcome::Complete | EncodeOutcome::ReaderClosed => match consumed {
            Err(e) => Err(e),
            Ok(v) if drained => Ok(v),
            Ok(_) => Err(ConfigError::Storage {
                message: format!("Store stopped reading the value of '{}' before it ended", key),
                source: None,
            }),
        },
    }
}
