//! Command-line driver for the kiosk, the nurse dashboard and the backend.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::api::server::{start_api_server_on, ServerError};
use crate::config::{AppConfig, StoreKind};
use crate::dashboard::{
    ClearResult, DetailPanel, PatientDetail, QueueDashboard, QueueSnapshot, ResolveAction,
    DETAIL_PLACEHOLDER_TEXT,
};
use crate::gate::{AccessGate, GateError};
use crate::kiosk::{KioskController, SubmitOutcome};
use crate::media::{CameraDevice, MediaError, MediaStream, MediaViewer, StreamPolicy, Surface};
use crate::models::Vitals;
use crate::store::{open_store, RemoteQueueStore, StoreError};
use crate::views::{QueuePoller, View, ViewRouter};

#[derive(Parser, Debug)]
#[command(name = "codeblue", version, about = "Patient triage kiosk and nurse queue")]
pub struct Cli {
    /// Queue repository to use.
    #[arg(long, value_enum, global = true)]
    pub store: Option<StoreKind>,

    /// Backend base URL for the remote store.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// SQLite file for the local store.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the queue HTTP API over the local store.
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Patient-facing intake.
    #[command(subcommand)]
    Kiosk(KioskCommand),
    /// Nurse dashboard.
    Nurse(NurseArgs),
    /// Show the backend session state and login/logout routes.
    Session,
    /// Embed a remote stream, or start the camera preview.
    Stream {
        url: Option<String>,
        #[arg(long, conflicts_with = "url")]
        camera: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum KioskCommand {
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub age: String,
    #[arg(long, default_value = "")]
    pub sex: String,
    #[arg(long)]
    pub complaint: String,
    #[arg(long)]
    pub hr: Option<f64>,
    #[arg(long)]
    pub sbp: Option<f64>,
    #[arg(long)]
    pub rr: Option<f64>,
    #[arg(long)]
    pub temp: Option<f64>,
}

#[derive(Args, Debug)]
pub struct NurseArgs {
    /// PIN typed at the lock screen. Checked against `CODEBLUE_NURSE_PIN`.
    #[arg(long, env = "CODEBLUE_PIN", hide_env_values = true)]
    pub pin: Option<String>,

    #[command(subcommand)]
    pub action: NurseCommand,
}

#[derive(Subcommand, Debug)]
pub enum NurseCommand {
    /// Print the ordered queue.
    Queue,
    /// Print one patient's details.
    Show { id: String },
    /// Mark a patient completed.
    Resolve { id: String },
    /// Remove every patient (local store only).
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Reprint the queue whenever the poller refreshes it.
    Watch {
        /// Seconds between refreshes.
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("{0}")]
    Intake(String),

    #[error("Submission failed: {0}")]
    Submit(String),

    #[error("Nurse view is locked. Pass --pin or set CODEBLUE_PIN.")]
    Locked,

    #[error("No patient with id {0}")]
    NotFound(String),

    #[error("Interval must be at least one second")]
    BadInterval,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Cli {
    /// Apply global flags on top of the environment configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(store) = self.store {
            config.store = store;
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
    }
}

pub async fn execute(cli: Cli, config: AppConfig) -> Result<(), CliError> {
    match cli.command {
        Command::Serve { bind } => serve(&config, bind.unwrap_or(config.bind_addr)).await,
        Command::Kiosk(KioskCommand::Submit(args)) => kiosk_submit(&config, args).await,
        Command::Nurse(args) => nurse(&config, args).await,
        Command::Session => session(&config).await,
        Command::Stream { url, camera } => stream(&config, url.as_deref(), camera),
    }
}

async fn serve(config: &AppConfig, bind: SocketAddr) -> Result<(), CliError> {
    let mut local = config.clone();
    local.store = StoreKind::Local;
    let queue = open_store(&local)?;

    let mut server = start_api_server_on(queue, bind).await?;
    println!("Queue API listening on {}", server.session.base_url());

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    server.wait().await;
    Ok(())
}

async fn kiosk_submit(config: &AppConfig, args: SubmitArgs) -> Result<(), CliError> {
    let kiosk = KioskController::new(open_store(config)?);
    kiosk.update_form(|form| {
        form.name = args.name;
        form.age = args.age;
        form.sex = args.sex;
        form.complaint = args.complaint;
        form.vitals = Vitals {
            hr: args.hr,
            sbp: args.sbp,
            rr: args.rr,
            temp: args.temp,
        };
    });

    match kiosk.submit().await {
        SubmitOutcome::Triaged(card) => {
            println!("{}", card.copy_text());
            Ok(())
        }
        SubmitOutcome::Invalid(e) => Err(CliError::Intake(e.to_string())),
        SubmitOutcome::Failed(detail) => Err(CliError::Submit(detail)),
        SubmitOutcome::Superseded | SubmitOutcome::Busy => Ok(()),
    }
}

async fn nurse(config: &AppConfig, args: NurseArgs) -> Result<(), CliError> {
    let dashboard = Arc::new(QueueDashboard::new(open_store(config)?));
    let router = Arc::new(ViewRouter::new(
        dashboard.clone(),
        AccessGate::pin(config.nurse_pin.clone()),
    ));

    router.switch_to(View::Nurse).await;
    let pin = args.pin.ok_or(CliError::Locked)?;
    let snapshot = router.unlock_with_pin(&pin).await?;

    match args.action {
        NurseCommand::Queue => print!("{}", render_snapshot(&snapshot)),
        NurseCommand::Show { id } => {
            let detail = dashboard
                .select_record(&id)
                .ok_or_else(|| CliError::NotFound(id.clone()))?;
            print!("{}", render_detail(&detail));
        }
        NurseCommand::Resolve { id } => {
            let snapshot = dashboard.resolve(&id).await;
            print!("{}", render_snapshot(&snapshot));
        }
        NurseCommand::Clear { yes } => match dashboard.clear(yes).await {
            ClearResult::Cancelled => println!("Nothing cleared. Pass --yes to confirm."),
            ClearResult::Cleared => print!("{}", render_snapshot(&dashboard.snapshot())),
            ClearResult::Info(message) => println!("{message}"),
            ClearResult::Failed => println!("Clearing the queue failed; see the log."),
        },
        NurseCommand::Watch { interval } => {
            let period = match interval {
                Some(0) => return Err(CliError::BadInterval),
                Some(secs) => Duration::from_secs(secs),
                None => config.poll_interval,
            };
            watch(router, period).await?;
        }
    }
    Ok(())
}

async fn watch(router: Arc<ViewRouter>, period: Duration) -> Result<(), CliError> {
    let mut renders = router.dashboard().subscribe();
    let mut poller = QueuePoller::start(router, period);

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                break;
            }
            changed = renders.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = renders.borrow_and_update().clone();
                print!("{}", render_snapshot(&snapshot));
            }
        }
    }

    poller.stop().await;
    Ok(())
}

async fn session(config: &AppConfig) -> Result<(), CliError> {
    let remote = RemoteQueueStore::new(&config.api_url)?;
    let gate = AccessGate::session();
    let logged_in = gate.check_session(&remote).await?;

    println!("Logged in: {}", if logged_in { "yes" } else { "no" });
    println!("Login:  {}", remote.login_url());
    println!("Logout: {}", remote.logout_url());
    Ok(())
}

/// Terminal builds have no capture backend.
struct NoCamera;

impl CameraDevice for NoCamera {
    fn open_video(&self) -> Result<Box<dyn MediaStream>, MediaError> {
        Err(MediaError::Device("no capture device on this build".into()))
    }
}

fn stream(config: &AppConfig, url: Option<&str>, camera: bool) -> Result<(), CliError> {
    let mut viewer = MediaViewer::new(
        Box::new(NoCamera),
        StreamPolicy::with_hosts(&config.stream_hosts),
    );

    if camera {
        let res = viewer.start_camera();
        println!("{}", viewer.hint());
        return res.map_err(CliError::from);
    }

    viewer.load_stream(url.unwrap_or_default())?;
    match viewer.surface() {
        Surface::Embed(frame) => println!("{}", frame.to_html()),
        _ => println!("{}", viewer.hint()),
    }
    Ok(())
}

pub fn render_snapshot(snapshot: &QueueSnapshot) -> String {
    let mut out = format!(
        "Total: {}  Critical: {}\n",
        snapshot.metrics.total, snapshot.metrics.critical
    );

    match snapshot.list.placeholder() {
        Some(text) => {
            out.push_str(text);
            out.push('\n');
        }
        None => {
            for item in snapshot.list.items() {
                out.push_str(&format!(
                    "[{}] {}  {}  {}\n    {}\n",
                    item.badge.short_label(),
                    item.name,
                    item.subline,
                    item.id,
                    item.preview
                ));
            }
        }
    }

    if let DetailPanel::Placeholder(text) = &snapshot.detail {
        if *text != DETAIL_PLACEHOLDER_TEXT {
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

pub fn render_detail(detail: &PatientDetail) -> String {
    let action = match detail.action {
        ResolveAction::Available => "Mark resolved available",
        ResolveAction::AlreadyResolved => "Already resolved",
    };
    format!(
        "{} ({}, {})\nArrived: {}  {}  Status: {}\nVitals: {}\nComplaint: {}\nAnalysis: {}\n{}\n",
        detail.name,
        detail.age,
        detail.sex,
        detail.time,
        detail.esi,
        detail.status,
        detail.vitals,
        detail.complaint,
        detail.analysis,
        action
    )
}
