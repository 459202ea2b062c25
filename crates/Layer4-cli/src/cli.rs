//! Non-interactive CLI mode
//!
//! Events go to stdout as JSON lines; logs go to stderr.

use crate::GenerationArgs;
use anyhow::{bail, Context};
use cadence_foundation::{
    CadenceConfig, ChannelSink, GenerationKind, JsonStore, SessionEvent, TaskId,
};
use cadence_provider::{GenerationMode, GenerationRequest, Model, RemoteClient, SunoClient};
use cadence_task::{
    SessionContext, SessionHandler, StatusClassifier, TaskPoller, TaskRegistry, TaskState,
    TrackedTask,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print api_log records as well as task events
    pub api_log: bool,
}

/// Build a request from command-line options
pub fn build_request(mode: GenerationMode, args: &GenerationArgs) -> anyhow::Result<GenerationRequest> {
    let model: Model = args.model.parse()?;

    let mut request = GenerationRequest::new(mode, model)
        .prompt(args.prompt.clone())
        .instrumental(args.instrumental);

    if args.custom {
        request = request.custom(args.title.clone(), args.style.clone());
    }
    if let Some(tags) = &args.negative_tags {
        request = request.negative_tags(tags.clone());
    }
    if let Some(gender) = &args.vocal_gender {
        request = request.vocal_gender(gender.clone());
    }
    if let Some(url) = &args.callback_url {
        request = request.callback_url(url.clone());
    }

    Ok(request)
}

/// One session wired to the configured service, plus its event printer
struct Session {
    handler: SessionHandler,
    printer: JoinHandle<()>,
}

impl Session {
    fn open(config: &CadenceConfig, options: RunOptions) -> anyhow::Result<Self> {
        let client = Arc::new(SunoClient::from_config(&config.api)?);
        let registry = Arc::new(TaskRegistry::new());
        let poller = Arc::new(TaskPoller::new(client, registry, config.polling.clone()));

        let (sink, rx) = ChannelSink::new();
        let ctx = SessionContext::new(Arc::new(sink), config.limits.clone());
        let printer = tokio::spawn(print_events(rx, options));

        Ok(Self {
            handler: SessionHandler::new(ctx, poller),
            printer,
        })
    }

    /// Wait for the task; Ctrl-C disconnects the session
    async fn follow(&self, tracked: TrackedTask) -> TaskState {
        let task_id = tracked.task_id.clone();
        let wait = tracked.wait();
        tokio::pin!(wait);

        let finished = tokio::select! {
            state = &mut wait => Some(state),
            _ = tokio::signal::ctrl_c() => None,
        };

        match finished {
            Some(state) => state,
            None => {
                warn!(task_id = %task_id, "Interrupted, cancelling");
                self.handler.disconnect();
                wait.await
            }
        }
    }

    /// Drop the session and let the printer drain
    async fn close(self) {
        let Session { handler, printer } = self;
        drop(handler);
        if let Err(e) = printer.await {
            warn!("Event printer stopped abnormally: {}", e);
        }
    }
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<SessionEvent>, options: RunOptions) {
    while let Some(event) = rx.recv().await {
        if !options.api_log && matches!(event, SessionEvent::ApiLog(_)) {
            continue;
        }
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to encode event: {}", e),
        }
    }
}

fn finish(state: TaskState) -> anyhow::Result<()> {
    info!("{} {}", state.symbol(), state);
    if state.is_success() {
        Ok(())
    } else {
        bail!("task finished as {}", state.display_name())
    }
}

/// Submit a new generation job and follow it
pub async fn run_submit(
    config: &CadenceConfig,
    request: GenerationRequest,
    options: RunOptions,
) -> anyhow::Result<()> {
    let session = Session::open(config, options)?;

    let tracked = match request.kind() {
        GenerationKind::Generate => session.handler.generate(request).await,
        GenerationKind::Cover => session.handler.cover(request).await,
        GenerationKind::Extend => session.handler.extend(request).await,
    };

    let state = match tracked {
        Some(tracked) => session.follow(tracked).await,
        None => TaskState::Errored,
    };

    session.close().await;
    finish(state)
}

/// Follow a task created earlier
pub async fn run_track(config: &CadenceConfig, task_id: String, options: RunOptions) -> anyhow::Result<()> {
    let session = Session::open(config, options)?;

    let tracked = session.handler.track(TaskId::new(task_id)).await?;
    let state = session.follow(tracked).await;

    session.close().await;
    finish(state)
}

/// Check a task once and print the raw status with its classification
pub async fn run_status(config: &CadenceConfig, task_id: String) -> anyhow::Result<()> {
    let client = SunoClient::from_config(&config.api)?;
    let task_id = TaskId::new(task_id);

    let raw = client.check_status(&task_id).await?;
    let class = StatusClassifier::from_config(&config.polling)
        .classify_status(&raw.status, !raw.tracks.is_empty());

    let output = json!({
        "taskId": task_id,
        "status": raw.status,
        "class": format!("{:?}", class).to_lowercase(),
        "tracks": raw.tracks,
        "errorMessage": raw.error_message,
        "errorCode": raw.error_code,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print remaining credits
pub async fn run_credits(config: &CadenceConfig) -> anyhow::Result<()> {
    let client = SunoClient::from_config(&config.api)?;
    let credits = client.credits().await?;
    println!("{}", credits);
    Ok(())
}

/// Write the effective configuration (without the API key) to the project store
pub fn run_init(config: &CadenceConfig, force: bool) -> anyhow::Result<()> {
    let store = JsonStore::current_project()?;
    let path = config.save_to(&store, force).with_context(|| {
        if force {
            "failed to write project configuration"
        } else {
            "failed to write project configuration (use --force to overwrite)"
        }
    })?;

    println!("✓ Wrote {}", path.display());
    Ok(())
}
