// * Command dispatcher
// * Routes each queued command to the job manager or the report service

use crate::app::errors::DispatchError;
use crate::command::{Command, Message};
use crate::job::JobManager;
use crate::queue::MessageQueue;
use crate::report::MapReportService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

pub struct Dispatcher {
    jobs: Arc<JobManager>,
    reports: Arc<MapReportService>,
    watch_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(jobs: Arc<JobManager>, reports: Arc<MapReportService>, watch_dir: PathBuf) -> Self {
        Self {
            jobs,
            reports,
            watch_dir,
        }
    }

    /// Executes one command
    pub async fn dispatch(&self, command: Command) -> Result<(), DispatchError> {
        tracing::debug!(command = %command, "Dispatching");
        match command {
            Command::Start { load_jobs } => {
                self.jobs.init(load_jobs, &self.watch_dir).await?;
            }
            Command::Scan(params) => self.jobs.scan(params).await?,
            Command::Status { job_name } => {
                self.jobs.status(job_name.as_deref())?;
            }
            Command::Map => {
                self.reports.print_map();
            }
            Command::ExportMap => {
                self.reports.export_csv().await?;
            }
            Command::Stop { .. } => return Err(DispatchError::Unexpected("STOP")),
        }
        Ok(())
    }

    /// Consumes the queue until a poison pill arrives
    pub async fn run(self: Arc<Self>, queue: Arc<MessageQueue>) {
        loop {
            match queue.take().await {
                Message::PoisonPill { .. } => {
                    info!("Poison pill detected. Exiting consumer...");
                    break;
                }
                Message::Command(command) => {
                    let name = command.name();
                    if let Err(e) = self.dispatch(command).await {
                        error!(command = name, "{}", e);
                    }
                }
            }
        }
    }
}
