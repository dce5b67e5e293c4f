//! depot-notify CLI: operator interface to the notification queue and history.

use clap::{Parser, Subcommand};
use depot_notifications::config::Config;
use depot_notifications::config::secrets::ExposeSecret;
use depot_notifications::db::Db;
use depot_notifications::consumer::{AckOutcome, acknowledge};
use depot_notifications::model::{EventId, NotificationEvent};
use depot_notifications::queue::EventQueue;
use depot_notifications::registry::{ProjectRegistry, StaticProjectRegistry};
use depot_notifications::telemetry::{TelemetryConfig, init_telemetry};
use depot_notifications::validator::CoordinateValidator;
use depot_notifications::{Error, NotificationManager};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "depot-notify", about = "Notification queue and event history")]
struct Cli {
    /// Print notifications as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pending notification operations
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Event history operations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Check database connectivity
    Check,
}

#[derive(Subcommand)]
enum QueueAction {
    /// Queue a notification for a project coordinate
    Event {
        project_id: String,
        group_id: String,
        artifact_id: String,
        version_id: String,
        /// Correlation id of the originating request
        #[arg(long)]
        event_id: Option<i64>,
    },
    /// Queue a refresh of every project
    RefreshAll,
    /// List pending notifications
    List,
    /// Drop a pending notification without recording it
    Remove {
        /// Notification ID (full UUID or prefix)
        id: String,
    },
    /// Mark a pending notification processed: remove it and record it in history
    Ack {
        /// Notification ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List history records at or after a point in time
    Since {
        /// Lower bound, e.g. "2019-01-01 12:00:00"
        since: String,
        /// Restrict to one project
        #[arg(long)]
        project: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "depot-notify".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = Arc::new(Db::connect(config.database_url.expose_secret()).await?);
    db.migrate().await?;

    let registry: Arc<dyn ProjectRegistry> = match config.projects_file {
        Some(ref path) => Arc::new(StaticProjectRegistry::load_from_file(path)?),
        None => db.clone(),
    };
    let manager = NotificationManager::new(
        db.clone(),
        db.clone(),
        CoordinateValidator::new(registry, config.validation_mode),
    )
    .with_timestamp_format(config.timestamp_format.clone());

    match cli.command {
        Command::Check => {
            db.health_check().await?;
            println!("ok");
            Ok(())
        }
        Command::Queue { action } => match action {
            QueueAction::Event {
                project_id,
                group_id,
                artifact_id,
                version_id,
                event_id,
            } => {
                let result = manager
                    .queue_event(&project_id, &group_id, &artifact_id, &version_id, event_id)
                    .await;
                report_admission(result)
            }
            QueueAction::RefreshAll => report_admission(manager.queue_refresh_all_event().await),
            QueueAction::List => cmd_queue_list(&manager, cli.json).await,
            QueueAction::Remove { id } => {
                let id = resolve_id(db.as_ref(), &id).await?;
                if db.remove(id).await? {
                    println!("Removed: {id}");
                } else {
                    println!("Already gone: {id}");
                }
                Ok(())
            }
            QueueAction::Ack { id } => cmd_queue_ack(db.as_ref(), &config, &id).await,
        },
        Command::History { action } => match action {
            HistoryAction::Since { since, project } => {
                cmd_history_since(&manager, &since, project.as_deref(), cli.json).await
            }
        },
    }
}

fn report_admission(result: depot_notifications::Result<NotificationEvent>) -> anyhow::Result<()> {
    match result {
        Ok(event) => {
            println!("Queued: {} ({})", event.id, event.target);
            Ok(())
        }
        // Already in flight is not a failure for the operator.
        Err(Error::AlreadyQueued(target)) => {
            println!("Already queued: {target}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_events(
    manager: &NotificationManager,
    events: &[NotificationEvent],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("No notifications found.");
        return Ok(());
    }

    println!(
        "{:<8}  {:<12}  {:<40}  {:<8}  UPDATED",
        "ID", "PROJECT", "COORDINATE", "EVENT"
    );
    println!("{}", "-".repeat(100));

    for event in events {
        let project = event.target.project_id().unwrap_or("*");
        let coordinate = event
            .target
            .coordinate()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "refresh-all".to_string());
        let event_id = event
            .event_id
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8}  {:<12}  {:<40}  {:<8}  {}",
            event.id,
            project,
            coordinate,
            event_id,
            manager.timestamp_format().format(event.last_updated)
        );
    }

    println!("\n{} notification(s)", events.len());
    Ok(())
}

async fn cmd_queue_list(manager: &NotificationManager, json: bool) -> anyhow::Result<()> {
    let events = manager.get_all_events_in_queue().await?;
    print_events(manager, &events, json)
}

async fn cmd_history_since(
    manager: &NotificationManager,
    since: &str,
    project: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let events = manager.get_all_events(since, project).await?;
    print_events(manager, &events, json)
}

async fn cmd_queue_ack(db: &Db, config: &Config, id_str: &str) -> anyhow::Result<()> {
    let id = resolve_id(db, id_str).await?;
    match acknowledge(db, db, id, config.history_id_policy).await? {
        AckOutcome::Recorded(record) => println!(
            "Recorded: {} at {}",
            record.id,
            config.timestamp_format.format(record.last_updated)
        ),
        AckOutcome::NotPending => println!("Already processed: {id}"),
    }
    Ok(())
}

/// Resolve a full UUID or a unique prefix of a pending notification's ID.
async fn resolve_id(db: &Db, id_str: &str) -> anyhow::Result<EventId> {
    if id_str.len() >= 36 {
        return Ok(EventId(uuid::Uuid::parse_str(id_str)?));
    }

    let pending = db.list_all().await?;
    let matches: Vec<_> = pending
        .iter()
        .filter(|event| event.id.0.to_string().starts_with(id_str))
        .collect();
    match matches.len() {
        0 => anyhow::bail!("no pending notification matching prefix '{id_str}'"),
        1 => Ok(matches[0].id),
        n => anyhow::bail!("{n} notifications match prefix '{id_str}'; be more specific"),
    }
}
