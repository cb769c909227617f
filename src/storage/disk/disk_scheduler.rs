use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::common::{PageId, Result, SiltError, PAGE_SIZE};

use super::DiskManager;

/// A disk I/O request handed to the background worker.
/// Buffers are owned by the request; completion is signalled through the
/// attached channel.
enum DiskRequest {
    Read {
        page_id: PageId,
        done: Sender<Result<Box<[u8; PAGE_SIZE]>>>,
    },
    Write {
        page_id: PageId,
        data: Box<[u8; PAGE_SIZE]>,
        done: Sender<Result<()>>,
    },
}

/// DiskScheduler funnels page I/O through a single background worker
/// thread fed by a bounded queue. The `_sync` entry points block until
/// the worker has completed the request, so callers observe ordinary
/// blocking I/O semantics.
pub struct DiskScheduler {
    /// The disk manager performing the actual I/O
    disk_manager: Arc<DiskManager>,
    /// Channel sender for queuing requests
    request_sender: Sender<DiskRequest>,
    /// Flag to signal shutdown
    shutdown: Arc<AtomicBool>,
    /// Handle to the background worker thread
    worker_handle: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a new DiskScheduler and spawns its worker thread.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = bounded::<DiskRequest>(128);
        let shutdown = Arc::new(AtomicBool::new(false));

        let dm = Arc::clone(&disk_manager);
        let stop = Arc::clone(&shutdown);
        let worker_handle = thread::spawn(move || Self::run_worker(dm, receiver, stop));

        Self {
            disk_manager,
            request_sender: sender,
            shutdown,
            worker_handle: Some(worker_handle),
        }
    }

    /// Reads a page through the worker and blocks until the bytes arrive.
    pub fn schedule_read_sync(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (tx, rx) = bounded(1);
        self.request_sender
            .send(DiskRequest::Read { page_id, done: tx })
            .map_err(|e| SiltError::DiskScheduler(format!("failed to queue read: {}", e)))?;

        let buf = rx
            .recv()
            .map_err(|e| SiltError::DiskScheduler(format!("read completion lost: {}", e)))??;
        data.copy_from_slice(&buf[..]);
        Ok(())
    }

    /// Writes a page through the worker and blocks until it is on disk.
    pub fn schedule_write_sync(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let mut buf = Box::new([0u8; PAGE_SIZE]);
        buf.copy_from_slice(data);

        let (tx, rx) = bounded(1);
        self.request_sender
            .send(DiskRequest::Write {
                page_id,
                data: buf,
                done: tx,
            })
            .map_err(|e| SiltError::DiskScheduler(format!("failed to queue write: {}", e)))?;

        rx.recv()
            .map_err(|e| SiltError::DiskScheduler(format!("write completion lost: {}", e)))?
    }

    fn run_worker(
        disk_manager: Arc<DiskManager>,
        receiver: Receiver<DiskRequest>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                // Drain remaining requests before exiting
                while let Ok(request) = receiver.try_recv() {
                    Self::process(&disk_manager, request);
                }
                break;
            }

            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(request) => Self::process(&disk_manager, request),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn process(disk_manager: &DiskManager, request: DiskRequest) {
        match request {
            DiskRequest::Read { page_id, done } => {
                let mut buf = Box::new([0u8; PAGE_SIZE]);
                let result = disk_manager
                    .read_page(page_id, &mut buf[..])
                    .map(move |_| buf);
                let _ = done.send(result);
            }
            DiskRequest::Write { page_id, data, done } => {
                let _ = done.send(disk_manager.write_page(page_id, &data[..]));
            }
        }
    }

    /// Returns a reference to the underlying DiskManager.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
