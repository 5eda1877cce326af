// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background telemetry sink.
//!
//! Controllers publish [`StepRecord`]s over a bounded channel; a dedicated
//! thread folds them into a [`TelemetryCollector`]. Publishing never blocks
//! the control path: when the buffer is full the record is dropped.

use crate::collector::{
    StepRecord, TelemetryCollector, TelemetryReport, DEFAULT_RECORD_LIMIT,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Configuration for the [`TelemetrySink`].
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Maximum number of records to buffer.
    /// If the buffer is full, new records are dropped.
    pub buffer_size: usize,
    /// How long the worker waits for a record before re-checking shutdown.
    pub poll_interval_ms: u64,
    /// Records the collector retains; older ones are evicted.
    pub record_limit: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            poll_interval_ms: 50,
            record_limit: DEFAULT_RECORD_LIMIT,
        }
    }
}

/// Collects telemetry off the control thread.
pub struct TelemetrySink {
    config: SinkConfig,
    collector: Arc<Mutex<TelemetryCollector>>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    tx: Sender<StepRecord>,
    dropped: Arc<AtomicU64>,
}

impl TelemetrySink {
    /// Creates a stopped sink and the receiver its worker will consume.
    pub fn new(config: SinkConfig) -> (Self, Receiver<StepRecord>) {
        let (tx, rx) = crossbeam_channel::bounded(config.buffer_size);
        let collector = TelemetryCollector::with_limit(config.record_limit);
        let sink = Self {
            config,
            collector: Arc::new(Mutex::new(collector)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// Starts the worker thread. Does nothing if already running.
    pub fn start(&mut self, rx: Receiver<StepRecord>) {
        if self.running.load(Ordering::SeqCst) {
            return;
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let collector = Arc::clone(&self.collector);
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        let handle = thread::spawn(move || {
            log::info!("Telemetry sink thread started.");

            while running.load(Ordering::Relaxed) {
                match rx.recv_timeout(poll) {
                    Ok(record) => ingest(&collector, record),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            // Records published before shutdown are still counted.
            while let Ok(record) = rx.try_recv() {
                ingest(&collector, record);
            }

            log::info!("Telemetry sink thread stopped.");
        });

        self.handle = Some(handle);
    }

    /// Returns a sender handle for publishing from other threads.
    pub fn sender(&self) -> Sender<StepRecord> {
        self.tx.clone()
    }

    /// Publishes a record without blocking.
    ///
    /// Returns `false` if the record was dropped.
    pub fn publish(&self, record: StepRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!("Telemetry: buffer full, {dropped} record(s) dropped so far.");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Telemetry: sink disconnected, record dropped.");
                false
            }
        }
    }

    /// Number of records dropped on a full buffer.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Summary of everything ingested so far.
    pub fn report(&self) -> Option<TelemetryReport> {
        self.collector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .report()
    }

    /// Stops the worker and hands back the collected records.
    pub fn stop(&mut self) -> Option<TelemetryCollector> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.handle.take()?;
        join_worker(handle);
        let mut collector = self.collector.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = TelemetryCollector::with_limit(self.config.record_limit);
        Some(std::mem::replace(&mut *collector, fresh))
    }
}

impl Drop for TelemetrySink {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Joins the worker, logging instead of dropping a panic. Returns `false`
/// if the worker panicked.
fn join_worker(handle: thread::JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            log::warn!("Telemetry: sink worker panicked, keeping records ingested so far.");
            false
        }
    }
}

fn ingest(collector: &Mutex<TelemetryCollector>, record: StepRecord) {
    collector
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record(record);
}
