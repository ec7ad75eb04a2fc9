//! Background thread owning one scheduler run over the shared raster.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use raster::{Partition, SharedRaster};
use region_scheduler::{CancellationFlag, RegionScheduler, RunReport, ScheduleError};

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("failed to spawn the region scheduler thread")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("region scheduler thread panicked")]
    Panicked,
}

pub struct ProcessingRuntime {
    cancel: CancellationFlag,
    join_handle: Option<JoinHandle<Result<RunReport, ScheduleError>>>,
}

impl ProcessingRuntime {
    /// Starts processing `regions` on a `region_scheduler` thread.
    ///
    /// The report is also sent on `completion` so a loop can react without joining.
    pub fn start(
        scheduler: RegionScheduler,
        raster: Arc<SharedRaster>,
        regions: Partition,
        cancel: CancellationFlag,
        completion: Sender<RunReport>,
    ) -> Result<Self, ProcessingError> {
        let worker_cancel = cancel.clone();
        let join_handle = std::thread::Builder::new()
            .name("region_scheduler".to_owned())
            .spawn(move || {
                let result = scheduler.run(&raster, regions, &worker_cancel);
                if let Ok(report) = &result {
                    let _ = completion.send(*report);
                }
                result
            })
            .map_err(ProcessingError::Spawn)?;

        Ok(Self {
            cancel,
            join_handle: Some(join_handle),
        })
    }

    /// Waits for the run to end. Does not cancel it.
    pub fn join(mut self) -> Result<RunReport, ProcessingError> {
        let Some(join_handle) = self.join_handle.take() else {
            return Err(ProcessingError::Panicked);
        };
        match join_handle.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProcessingError::Panicked),
        }
    }
}

impl Drop for ProcessingRuntime {
    fn drop(&mut self) {
        if let Some(join_handle) = self.join_handle.take() {
            self.cancel.cancel();
            let _ = join_handle.join();
        }
    }
}
