// * Application orchestrator
// * Wires the watcher, report service, job manager, queue and console together
// * and runs the ordered shutdown once the console loop ends

pub mod cli;
pub mod dispatcher;
pub mod errors;

pub use cli::run_cli;
pub use dispatcher::Dispatcher;
pub use errors::{AppError, DispatchError};

use crate::command::Message;
use crate::config::AppConfig;
use crate::job::JobManager;
use crate::monitor::{DirectoryWatcher, MapSource};
use crate::queue::MessageQueue;
use crate::report::MapReportService;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{error, info, warn};

/// The running application and all of its services
pub struct App {
    config: AppConfig,
    queue: Arc<MessageQueue>,
    watcher: Arc<DirectoryWatcher>,
    reports: Arc<MapReportService>,
    jobs: Arc<JobManager>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let watcher = Arc::new(DirectoryWatcher::new(
            config.watch_directory.clone(),
            config.monitor.clone(),
        ));
        let source: Arc<dyn MapSource> = watcher.clone();
        let reports = Arc::new(MapReportService::new(source, config.report.clone()));
        let jobs = Arc::new(JobManager::new(config.jobs.clone()));

        Self {
            config,
            queue: Arc::new(MessageQueue::new()),
            watcher,
            reports,
            jobs,
        }
    }

    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    pub fn watcher(&self) -> &Arc<DirectoryWatcher> {
        &self.watcher
    }

    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    pub fn reports(&self) -> &Arc<MapReportService> {
        &self.reports
    }

    /// Runs until the console issues STOP or its input ends
    pub async fn run<R, W>(&self, input: R, output: W)
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Starting Concurrent Mess...");
        info!("Log lines from background tasks may appear right after the prompt; commands are still parsed normally");

        info!("Starting directory monitoring...");
        let monitor_task = {
            let watcher = Arc::clone(&self.watcher);
            tokio::spawn(async move {
                if let Err(e) = watcher.start().await {
                    error!("Failed to start directory watcher: {}", e);
                }
            })
        };

        self.reports.start();

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&self.jobs),
            Arc::clone(&self.reports),
            self.config.watch_directory.clone(),
        ));
        let consumer = tokio::spawn(dispatcher.run(Arc::clone(&self.queue)));

        run_cli(input, output, &self.queue).await;

        // * The pill is sticky, so this sees the same one the consumer does
        let save_jobs = match self.queue.take().await {
            Message::PoisonPill { save_jobs } => save_jobs,
            Message::Command(command) => {
                warn!(command = %command, "Expected poison pill after console exit");
                false
            }
        };

        // * Let the consumer finish the command it is executing
        if let Err(e) = consumer.await {
            error!("Error in queue consumer: {}", e);
        }

        self.jobs.quit(save_jobs).await;
        self.reports.stop().await;

        if !monitor_task.is_finished() {
            monitor_task.abort();
        }
        let _ = monitor_task.await;
        self.watcher.stop().await;

        info!("Exiting...");
    }
}
