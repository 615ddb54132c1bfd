// Copyright 2024 FastLabs Developers
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

//! The queue between log call sites and the sinks.
//!
//! Producers push tasks onto a channel, one worker thread pops them in order and writes each
//! record to every sink that accepts it. Reconfiguration travels through the same channel, so
//! a record is always written under the configuration that was current when it was enqueued.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use arc_swap::ArcSwapOption;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use serde::Deserialize;

pub use self::state::DispatchState;
use self::state::AtomicState;
use self::worker::Worker;
use crate::Error;
use crate::ErrorKind;
use crate::Level;
use crate::Trap;
use crate::append::Sink;
use crate::record::Record;

mod state;
mod worker;

/// Overflow policy of a bounded queue.
///
/// When the queue is full, an incoming record is handled according to the specified policy.
/// Before the worker starts nothing drains the queue, so a full queue drops the record under
/// either policy. Control tasks always block.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Overflow {
    /// Blocks until the queue is not full.
    #[default]
    Block,
    /// Drops the incoming record.
    DropIncoming,
}

pub(crate) enum Task {
    Log(Box<Record>),
    Control {
        control: Control,
        done: oneshot::Sender<Result<(), Error>>,
    },
    Shutdown,
}

/// A reconfiguration applied by whoever consumes the queue.
#[derive(Debug)]
pub(crate) enum Control {
    SetLevel { sink: usize, level: Level },
    SetPath { sink: usize, path: PathBuf },
    Flush,
}

impl Control {
    pub(crate) fn apply(self, sinks: &[Sink], trap: &dyn Trap) -> Result<(), Error> {
        match self {
            Control::SetLevel { sink, level } => {
                let sink = find(sinks, sink)?;
                sink.set_min_level(level);
                Ok(())
            }
            Control::SetPath { sink, path } => {
                let sink = find(sinks, sink)?;
                let file = sink.rolling_file().ok_or_else(|| {
                    Error::new(ErrorKind::NotFound, "sink does not write to a file")
                        .with_context("sink", sink.name())
                })?;
                file.set_path(path)
            }
            Control::Flush => {
                for sink in sinks {
                    if let Err(err) = sink.flush() {
                        trap.trap(&err);
                    }
                }
                Ok(())
            }
        }
    }
}

fn find(sinks: &[Sink], index: usize) -> Result<&Sink, Error> {
    sinks
        .get(index)
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "no such sink"))
}

fn shutdown_error() -> Error {
    Error::new(ErrorKind::Shutdown, "the logging facility has been shut down")
}

fn queue_full_error() -> Error {
    Error::new(
        ErrorKind::QueueFull,
        "the log queue is full and not being consumed",
    )
}

/// Owns the queue and the worker thread of one facility.
pub(crate) struct Dispatcher {
    sinks: Arc<[Sink]>,
    trap: Arc<dyn Trap>,
    overflow: Overflow,
    thread_name: String,
    state: Arc<AtomicState>,
    sender: ArcSwapOption<Sender<Task>>,
    receiver: Receiver<Task>,
    handle: Mutex<Option<JoinHandle<()>>>,
    lifecycle: Mutex<()>,
    rejected: AtomicBool,
    overflowed: AtomicBool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sinks", &self.sinks.len())
            .field("overflow", &self.overflow)
            .field("thread_name", &self.thread_name)
            .field("state", &self.state.load())
            .finish()
    }
}

impl Dispatcher {
    pub(crate) fn new(
        sinks: Vec<Sink>,
        trap: Arc<dyn Trap>,
        thread_name: String,
        buffered_lines_limit: Option<usize>,
        overflow: Overflow,
    ) -> Self {
        let (sender, receiver) = match buffered_lines_limit {
            Some(limit) => crossbeam_channel::bounded(limit),
            None => crossbeam_channel::unbounded(),
        };

        Self {
            sinks: sinks.into_boxed_slice().into(),
            trap,
            overflow,
            thread_name,
            state: Arc::new(AtomicState::new(DispatchState::Stopped)),
            sender: ArcSwapOption::from(Some(Arc::new(sender))),
            receiver,
            handle: Mutex::new(None),
            lifecycle: Mutex::new(()),
            rejected: AtomicBool::new(false),
            overflowed: AtomicBool::new(false),
        }
    }

    pub(crate) fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    pub(crate) fn trap(&self) -> &dyn Trap {
        self.trap.as_ref()
    }

    pub(crate) fn state(&self) -> DispatchState {
        self.state.load()
    }

    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn worker(&self) -> Worker {
        Worker::new(
            self.receiver.clone(),
            self.sinks.clone(),
            self.trap.clone(),
            self.state.clone(),
        )
    }

    /// Spawn the worker. Records enqueued so far are delivered first.
    pub(crate) fn start(&self) -> Result<(), Error> {
        let _lifecycle = self.lifecycle();
        if self.sender.load().is_none() {
            return Err(shutdown_error());
        }
        let mut handle = self.handle();
        if handle.is_some() {
            return Ok(());
        }

        self.state.store(DispatchState::Running);
        let worker = self.worker();
        let spawned = std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run());

        match spawned {
            Ok(spawned) => {
                *handle = Some(spawned);
                Ok(())
            }
            Err(err) => {
                // queued records stay put; shutdown delivers them on the caller's thread
                self.state.store(DispatchState::Stopped);
                Err(Error::new(ErrorKind::Io, "failed to spawn logging worker thread")
                    .with_context("thread", &self.thread_name)
                    .with_source(err))
            }
        }
    }

    /// Enqueue a record. Never fails, and never blocks unless a running worker is behind on a
    /// bounded queue with [`Overflow::Block`].
    pub(crate) fn enqueue(&self, record: Record) {
        let sender = self.sender.load();
        let Some(sender) = sender.as_ref() else {
            self.reject();
            return;
        };

        let task = Task::Log(Box::new(record));
        let blocking = self.overflow == Overflow::Block && self.state() != DispatchState::Stopped;
        if blocking {
            if sender.send(task).is_err() {
                self.reject();
            }
            return;
        }

        match sender.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if self.overflow == Overflow::Block {
                    self.report_overflow();
                }
            }
            Err(TrySendError::Disconnected(_)) => self.reject(),
        }
    }

    fn reject(&self) {
        if !self.rejected.swap(true, Ordering::AcqRel) {
            let err = shutdown_error().with_context("action", "record dropped");
            self.trap.trap(&err);
        }
    }

    fn report_overflow(&self) {
        if !self.overflowed.swap(true, Ordering::AcqRel) {
            let err = queue_full_error().with_context("action", "record dropped");
            self.trap.trap(&err);
        }
    }

    /// Apply a reconfiguration in queue order and wait until it took effect.
    ///
    /// Before the worker is started nothing consumes the queue, so the records already queued
    /// are delivered on the caller's thread, then the change applies.
    pub(crate) fn control(&self, control: Control) -> Result<(), Error> {
        let _lifecycle = self.lifecycle();
        let sender = self.sender.load_full().ok_or_else(shutdown_error)?;

        let started = self.handle().is_some();
        if !started {
            self.worker().deliver_pending();
            return control.apply(&self.sinks, self.trap.as_ref());
        }

        let (done, result) = oneshot::channel();
        sender
            .send(Task::Control { control, done })
            .map_err(|_| shutdown_error())?;
        drop(sender);
        result.recv().map_err(|_| shutdown_error())?
    }

    /// Stop accepting records, deliver everything already queued, then flush and close every
    /// sink.
    ///
    /// Calling this more than once is a no-op.
    pub(crate) fn shutdown(&self) {
        let _lifecycle = self.lifecycle();
        let Some(sender) = self.sender.swap(None) else {
            return;
        };

        let handle = self.handle().take();
        if let Some(handle) = handle {
            if sender.send(Task::Shutdown).is_err() {
                self.trap
                    .trap(&Error::new(ErrorKind::Shutdown, "logging worker exited early"));
            }
            drop(sender);
            if handle.join().is_err() {
                self.trap
                    .trap(&Error::new(ErrorKind::Shutdown, "logging worker panicked"));
            }
        } else {
            drop(sender);
        }

        // producers that loaded the sender before it was swapped out may still have sent
        let worker = self.worker();
        worker.drain();
        worker.close_all();
        self.state.store(DispatchState::Stopped);
    }
}
