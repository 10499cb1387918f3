use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use worknest::actions::{ActionOutcome, RequestBoard, RequestEdit};
use worknest::audit::{AuditSortKey, AuditView};
use worknest::client::{ProfileService, ScheduleScope, ScheduleService, WorknestClient};
use worknest::config;
use worknest::context::{RequestContext, Role};
use worknest::dashboard::{self, RetryPolicy, Snapshot};
use worknest::export;
use worknest::model::{CombinedRecord, Event, NewWfhRequest, RequestAction, WfhRequest};
use worknest::pipeline::{self, RecordFilter, SortDirection, SortKey, SortState};
use worknest::refresh::Refresher;
use worknest::week;

#[derive(Debug, Parser)]
#[command(author, version, about = "WorkNest work-from-home schedules in the terminal")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Caller's staff ID
    #[arg(long, global = true)]
    staff_id: Option<i64>,

    /// Caller's role: staff, manager, hr, director (or numeric code)
    #[arg(long, global = true)]
    role: Option<Role>,

    /// Caller's department
    #[arg(long, global = true)]
    department: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch once and print the schedule table with this week's WFH counts
    Dashboard(ViewArgs),
    /// Keep refreshing the dashboard until interrupted
    Watch(ViewArgs),
    /// Write the filtered and sorted records to a CSV file
    Export {
        #[command(flatten)]
        view: ViewArgs,
        /// Output file (defaults to app.export_path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the caller's WFH requests
    Requests {
        /// List every request instead of only the caller's
        #[arg(long)]
        all: bool,
    },
    /// Submit a new WFH request
    Submit {
        /// ISO date of the WFH day
        #[arg(long)]
        date: String,
        #[arg(long)]
        reason: String,
        /// full_day, am or pm
        #[arg(long, default_value = "full_day")]
        duration: String,
        #[arg(long)]
        manager_id: i64,
        #[arg(long)]
        manager_name: String,
    },
    /// Change the date, duration or reason of a pending or approved request
    Edit {
        #[arg(long)]
        request_id: i64,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Withdraw an approved request
    Withdraw(ActionArgs),
    /// Cancel a pending request
    Cancel(ActionArgs),
    /// Browse the approval audit log
    Audit {
        /// Case-insensitive department substring
        #[arg(long)]
        department_filter: Option<String>,
        /// Column to sort by
        #[arg(long, default_value = "action")]
        sort: AuditSortKey,
        #[arg(long)]
        desc: bool,
    },
    /// List department events
    Events,
    /// Add a department event
    CreateEvent {
        #[arg(long)]
        name: String,
        /// ISO date of the event
        #[arg(long)]
        date: String,
        /// Department the event belongs to (defaults to the caller's)
        #[arg(long = "event-department")]
        event_department: Option<String>,
    },
}

#[derive(Debug, Clone, ClapArgs)]
struct ViewArgs {
    /// Exact work location (OFFICE or REMOTE)
    #[arg(long)]
    location: Option<String>,
    /// Case-insensitive department substring
    #[arg(long = "filter-department")]
    filter_department: Option<String>,
    /// Case-insensitive staff name substring
    #[arg(long)]
    search: Option<String>,
    /// Exact ISO date
    #[arg(long)]
    date: Option<String>,
    /// Column to sort by
    #[arg(long, default_value = "date")]
    sort: SortKey,
    #[arg(long)]
    desc: bool,
    /// Zero-based page
    #[arg(long, default_value_t = 0)]
    page: usize,
    /// Rows per page (defaults to app.page_size)
    #[arg(long)]
    page_size: Option<usize>,
    /// Any date inside the week to chart (defaults to today)
    #[arg(long)]
    week: Option<String>,
    /// Chart this many weeks earlier
    #[arg(long, default_value_t = 0, conflicts_with = "next")]
    prev: u32,
    /// Chart this many weeks later
    #[arg(long, default_value_t = 0)]
    next: u32,
}

#[derive(Debug, Clone, ClapArgs)]
struct ActionArgs {
    #[arg(long)]
    request_id: i64,
    /// Confirm without prompting; without it the action is declined
    #[arg(long)]
    yes: bool,
}

impl Args {
    fn context(&self) -> Result<RequestContext> {
        let staff_id = self.staff_id.ok_or_else(|| anyhow!("--staff-id is required"))?;
        let role = self.role.ok_or_else(|| anyhow!("--role is required"))?;
        let department = self
            .department
            .clone()
            .ok_or_else(|| anyhow!("--department is required"))?;
        RequestContext::new(staff_id, role, department).context("invalid caller identity")
    }
}

impl ViewArgs {
    fn filter(&self) -> RecordFilter {
        RecordFilter {
            work_location: self.location.clone(),
            department: self.filter_department.clone(),
            search_query: self.search.clone(),
            date_filter: self.date.clone(),
        }
    }

    fn sort(&self) -> SortState<SortKey> {
        SortState {
            key: self.sort,
            direction: if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        }
    }

    fn week_start(&self) -> Result<chrono::NaiveDate> {
        let day = match &self.week {
            Some(raw) => week::parse_date(raw).ok_or_else(|| anyhow!("invalid --week date: {}", raw))?,
            None => chrono::Local::now().date_naive(),
        };
        let mut start = week::week_start(day);
        for _ in 0..self.prev {
            start = week::previous_week(start);
        }
        for _ in 0..self.next {
            start = week::next_week(start);
        }
        Ok(start)
    }

    fn page_size(&self, default: usize) -> Result<usize> {
        match self.page_size.unwrap_or(default) {
            0 => bail!("--page-size must be > 0"),
            size => Ok(size),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = WorknestClient::from_config(&cfg)?;
    let retry = RetryPolicy::from_config(&cfg);

    match &args.command {
        Command::Dashboard(view) => {
            let ctx = args.context()?;
            let layout = Layout::from_view(view, cfg.app.page_size)?;
            let scope = ScheduleScope::for_context(&ctx);
            match dashboard::load(&client, &client, scope, retry, 1).await {
                Ok(snapshot) => print_dashboard(&snapshot, view, layout),
                Err(err) => println!("{}", err),
            }
        }
        Command::Watch(view) => {
            let ctx = args.context()?;
            let layout = Layout::from_view(view, cfg.app.page_size)?;
            let shared = Arc::new(client);
            let schedules: Arc<dyn ScheduleService> = shared.clone();
            let profiles: Arc<dyn ProfileService> = shared;
            let refresher = Arc::new(Refresher::new(
                schedules,
                profiles,
                ScheduleScope::for_context(&ctx),
                retry,
                cfg.app.refresh_interval(),
            ));
            let mut updates = refresher.subscribe();
            let cancel = CancellationToken::new();
            let loop_handle = tokio::spawn(Arc::clone(&refresher).run(cancel.clone()));

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("interrupt received; stopping");
                        break;
                    }
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = updates.borrow_and_update().clone();
                        if let Some(message) = &state.last_error {
                            println!("{}", message);
                        } else if let Some(snapshot) = &state.snapshot {
                            print_dashboard(snapshot, view, layout);
                        }
                    }
                }
            }
            cancel.cancel();
            if let Err(err) = loop_handle.await {
                error!(?err, "refresh loop ended abnormally");
            }
        }
        Command::Export { view, out } => {
            let ctx = args.context()?;
            let snapshot = dashboard::load(&client, &client, ScheduleScope::for_context(&ctx), retry, 1)
                .await
                .context("failed to load schedules for export")?;
            let rows = snapshot.select(&view.filter(), view.sort());
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(&cfg.app.export_path));
            let written = export::export_to_path(&path, &rows)?;
            println!("Exported {} rows to {}", written, path.display());
        }
        Command::Requests { all } => {
            let rows = if *all {
                client.all_requests().await?
            } else {
                let ctx = args.context()?;
                client.staff_requests(ctx.staff_id()).await?
            };
            let board = RequestBoard::new(rows);
            if board.rows().is_empty() {
                println!("No requests found.");
            }
            for r in board.rows() {
                print_request(r);
            }
        }
        Command::Submit {
            date,
            reason,
            duration,
            manager_id,
            manager_name,
        } => {
            let ctx = args.context()?;
            week::parse_date(date).ok_or_else(|| anyhow!("invalid --date: {}", date))?;
            let request = NewWfhRequest {
                staff_id: ctx.staff_id(),
                department: ctx.department().to_string(),
                start_date: date.clone(),
                reason: reason.clone(),
                duration: duration.clone(),
                reporting_manager_id: *manager_id,
                reporting_manager_name: manager_name.clone(),
            };
            let message = client
                .submit_request(&ctx, &request)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("{}", message);
        }
        Command::Edit {
            request_id,
            date,
            duration,
            reason,
        } => {
            let ctx = args.context()?;
            if let Some(raw) = date {
                week::parse_date(raw).ok_or_else(|| anyhow!("invalid --date: {}", raw))?;
            }
            let edit = RequestEdit {
                start_date: date.clone(),
                duration: duration.clone(),
                reason: reason.clone(),
            };
            if edit.is_empty() {
                bail!("nothing to change: pass --date, --duration or --reason");
            }
            let mut board = RequestBoard::new(client.staff_requests(ctx.staff_id()).await?);
            let update = board.prepare_edit(*request_id, edit)?;
            let stored = client
                .update_request(&ctx, *request_id, &update)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            board.apply_update(stored)?;
            if let Some(r) = board.get(*request_id) {
                print_request(r);
            }
        }
        Command::Withdraw(action) => {
            run_action(&args, &client, action, RequestAction::Withdraw).await?;
        }
        Command::Cancel(action) => {
            run_action(&args, &client, action, RequestAction::Cancel).await?;
        }
        Command::Audit {
            department_filter,
            sort,
            desc,
        } => {
            let mut view = AuditView::new(client.audit_log().await?);
            if let Some(dept) = department_filter {
                view.set_department_filter(dept.clone());
            }
            view.set_sort(SortState {
                key: *sort,
                direction: if *desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            });
            for log in view.rows() {
                println!(
                    "{:<6} {:<8} {:<10} {:<28} {:<12} {:<10} {}",
                    log.log_id,
                    log.request_id,
                    log.action,
                    log.approver_email,
                    log.start_date,
                    log.duration,
                    log.department
                );
            }
        }
        Command::Events => {
            for ev in client.events().await? {
                println!("{:<12} {:<16} {}", ev.event_date, ev.department, ev.event_name);
            }
        }
        Command::CreateEvent {
            name,
            date,
            event_department,
        } => {
            let ctx = args.context()?;
            week::parse_date(date).ok_or_else(|| anyhow!("invalid --date: {}", date))?;
            let event = Event {
                id: None,
                department: event_department
                    .clone()
                    .unwrap_or_else(|| ctx.department().to_string()),
                event_name: name.clone(),
                event_date: date.clone(),
            };
            let message = client
                .create_event(&ctx, &event)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("{}", message);
        }
    }

    Ok(())
}

async fn run_action(
    args: &Args,
    client: &WorknestClient,
    action_args: &ActionArgs,
    action: RequestAction,
) -> Result<()> {
    let ctx = args.context()?;
    let mut board = RequestBoard::new(client.staff_requests(ctx.staff_id()).await?);
    let pending = board.begin(action_args.request_id, action)?;
    println!("{}", pending.prompt());

    let outcome = if action_args.yes {
        board.confirm(client, &ctx).await?
    } else {
        board.decline()?
    };
    match outcome {
        ActionOutcome::Applied { message, .. } => println!("{}", message),
        ActionOutcome::Declined { request_id } => {
            println!("Request {} left unchanged (pass --yes to confirm).", request_id)
        }
    }
    Ok(())
}

/// Page size and charted week, checked before anything is fetched.
#[derive(Debug, Clone, Copy)]
struct Layout {
    page_size: usize,
    week_start: chrono::NaiveDate,
}

impl Layout {
    fn from_view(view: &ViewArgs, default_page_size: usize) -> Result<Self> {
        Ok(Self {
            page_size: view.page_size(default_page_size)?,
            week_start: view.week_start()?,
        })
    }
}

fn print_dashboard(snapshot: &Snapshot, view: &ViewArgs, layout: Layout) {
    println!("Work from home, {}", week::week_label(layout.week_start));
    for (date, count) in week::wfh_series(&snapshot.wfh_counts, layout.week_start) {
        println!("  {}  {:>3} {}", date, count, "#".repeat(count as usize));
    }

    let rows = snapshot.select(&view.filter(), view.sort());
    let size = layout.page_size;
    let page = pipeline::paginate(&rows, view.page, size);
    println!();
    println!(
        "{:<24} {:<20} {:<16} {:<12} {:<8} {}",
        "Name", "Position", "Department", "Date", "Location", "Status"
    );
    for record in page {
        print_record(record);
    }
    println!(
        "page {}/{} ({} rows)",
        view.page + 1,
        pipeline::page_count(rows.len(), size),
        rows.len()
    );
    if !snapshot.missing_profiles.is_empty() {
        println!("profiles unavailable for: {:?}", snapshot.missing_profiles);
    }
}

fn print_request(r: &WfhRequest) {
    let action = RequestBoard::available_action(r)
        .map(|a| a.as_str())
        .unwrap_or("-");
    println!(
        "{:<8} {:<8} {:<12} {:<10} {:<12} {:<10} {}",
        r.request_id, r.staff_id, r.start_date, r.duration, r.status, action, r.reason
    );
}

fn print_record(record: &CombinedRecord) {
    println!(
        "{:<24} {:<20} {:<16} {:<12} {:<8} {}",
        record.staff_name(),
        record.position,
        record.department,
        record.date,
        record.location,
        record.status
    );
}
