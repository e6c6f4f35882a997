use crate::{
    error::PersistError,
    persist::Storage,
    store::{CanvasStore, Snapshot},
};
use std::{
    io,
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Save the board unless nothing was placed since `saved_len`.
///
/// Returns whether anything was written. On failure `saved_len` stays put so
/// the next call tries again.
pub fn flush(store: &CanvasStore, storage: &Storage, saved_len: &mut Option<usize>) -> bool {
    flush_with(store, saved_len, |snapshot| storage.save(snapshot))
}

/// [`flush`] through an arbitrary save routine. The store's lock is released
/// before `save` runs.
pub fn flush_with<F>(store: &CanvasStore, saved_len: &mut Option<usize>, save: F) -> bool
where
    F: FnOnce(&Snapshot) -> Result<(), PersistError>,
{
    if *saved_len == Some(store.log_len()) {
        return false;
    }

    let snapshot = store.snapshot();
    match save(&snapshot) {
        Ok(()) => {
            *saved_len = Some(snapshot.log.len());
            true
        }
        Err(error) => {
            error!(?error, "saving the board failed, retrying next tick");
            false
        }
    }
}

/// Background thread writing the board to disk once per interval.
///
/// Dropping (or [`Flusher::shutdown`]) stops the ticker after one last flush.
pub struct Flusher {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Flusher {
    pub fn spawn(
        store: Arc<CanvasStore>,
        storage: Storage,
        interval: Duration,
    ) -> io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("pxg-flush".into())
            .spawn(move || {
                info!(?interval, "starting flush ticker");
                let mut saved_len = None;

                loop {
                    let last = match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => false,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                    };

                    flush(&store, &storage, &mut saved_len);

                    if last {
                        info!("flush ticker stopped");
                        break;
                    }
                }
            })?;

        Ok(Self {
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("flush thread panicked");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
