use super::progress_ui::ProgressUi;
use super::{ConnectionArgs, Workspace};
use crate::output::Output;
use addedat_core::{date_to_unix, enumerate_items, plan_jobs, BatchOptions, BatchUpdater, SelectionStore};
use addedat_models::{ItemType, OutcomeReport, QuerySpec, RateBudget, SortOrder, UpdateJob};
use addedat_sources::CatalogClient;
use clap::Args;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Library section id (defaults to the configured section for the type)
    #[arg(long, value_name = "ID")]
    pub section_id: Option<String>,

    /// Item type: movie, show, 1 or 2
    #[arg(long = "type", value_name = "TYPE", default_value = "movie")]
    pub item_type: ItemType,

    /// New added date
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: String,

    /// Server-side year filter
    #[arg(long)]
    pub year: Option<String>,

    /// Case-insensitive title substring, matched locally
    #[arg(long, value_name = "TEXT")]
    pub title_contains: Option<String>,

    /// Explicit rating keys to update (skips fetching)
    #[arg(long, value_name = "ID", num_args = 1.., conflicts_with = "selected")]
    pub ids: Vec<String>,

    /// Update the saved selection for this type
    #[arg(long)]
    pub selected: bool,

    /// Fetch page size
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Stop after N successful updates
    #[arg(long, value_name = "N")]
    pub max_items: Option<usize>,

    /// Seconds to wait between updates
    #[arg(long, value_name = "SECS")]
    pub sleep: Option<f64>,

    /// Maximum updates per minute, fractions allowed (0 = unlimited)
    #[arg(long, value_name = "N")]
    pub max_per_minute: Option<f64>,

    /// Leave the addedAt field unlocked
    #[arg(long)]
    pub no_lock: bool,

    /// Print the planned changes without writing anything
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Where the ids to update come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    Explicit(Vec<String>),
    Query(QuerySpec),
}

/// A fully validated update run.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub section_id: String,
    pub item_type: ItemType,
    pub date: String,
    pub added_at: i64,
    pub lock: bool,
    pub budget: RateBudget,
    pub max_items: Option<usize>,
    pub dry_run: bool,
    pub targets: Targets,
}

impl UpdateRequest {
    /// `selection` is the saved selection when `--selected` was given.
    pub fn from_args(args: &UpdateArgs, ws: &Workspace, selection: Option<&SelectionStore>) -> Result<Self> {
        let added_at = date_to_unix(&args.date)?;
        let defaults = &ws.config.defaults;

        let sleep = args.sleep.unwrap_or(defaults.sleep_seconds);
        if !(sleep.is_finite() && sleep >= 0.0) {
            return Err(eyre!("--sleep must be a non-negative number of seconds"));
        }
        let max_per_minute = args.max_per_minute.unwrap_or(defaults.max_per_minute);
        if !(max_per_minute.is_finite() && max_per_minute >= 0.0) {
            return Err(eyre!("--max-per-minute must be a non-negative number"));
        }
        let page_size = args.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(eyre!("--page-size must be greater than zero"));
        }

        let section_id = ws.section_for(args.section_id.as_deref(), args.item_type);
        let targets = if let Some(store) = selection {
            Targets::Explicit(store.selected_ids())
        } else if !args.ids.is_empty() {
            Targets::Explicit(args.ids.clone())
        } else {
            Targets::Query(
                QuerySpec::new(section_id.clone(), args.item_type)
                    .with_page_size(page_size)
                    .with_sort(SortOrder::AddedDesc)
                    .with_year(args.year.clone())
                    .with_title_contains(args.title_contains.clone()),
            )
        };

        Ok(Self {
            section_id,
            item_type: args.item_type,
            date: args.date.trim().to_string(),
            added_at,
            lock: !args.no_lock && defaults.lock,
            budget: RateBudget::per_minute(max_per_minute)
                .with_fixed_delay(Duration::from_secs_f64(sleep)),
            max_items: args.max_items.filter(|m| *m > 0),
            dry_run: args.dry_run,
            targets,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    pub matched: usize,
    /// Filled on dry runs only
    pub planned: Vec<UpdateJob>,
    /// Filled on real runs only
    pub report: Option<OutcomeReport>,
    /// Stopped by an interrupt before every target was handled
    pub cancelled: bool,
}

/// What an interrupt should do given whether one was already received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Finish the current item, then stop
    Stop,
    /// Second interrupt: leave immediately
    Exit,
}

fn on_interrupt(cancel: &AtomicBool) -> Interrupt {
    if cancel.swap(true, Ordering::SeqCst) {
        Interrupt::Exit
    } else {
        Interrupt::Stop
    }
}

/// Exit status after a second interrupt (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

fn spawn_interrupt_handler(cancel: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&cancel) {
                Interrupt::Stop => {
                    tracing::warn!("Interrupt received, stopping after the current request (press Ctrl-C again to quit now)")
                }
                Interrupt::Exit => {
                    tracing::warn!("Second interrupt, exiting");
                    std::process::exit(EXIT_INTERRUPTED);
                }
            }
        }
    })
}

fn plan_line(job: &UpdateJob, date: &str) -> String {
    format!("Would update id={} to {} (unix={})", job.rating_key, date, job.added_at)
}

/// Walk the query page by page, giving up between pages once cancelled.
async fn collect_targets<C: CatalogClient + ?Sized>(
    client: &C,
    query: &QuerySpec,
    cancel: &AtomicBool,
    ui: &ProgressUi,
) -> Result<Option<Vec<String>>> {
    let mut enumerator = enumerate_items(client, query);
    let mut ids = Vec::new();
    loop {
        if cancel.load(Ordering::SeqCst) {
            tracing::warn!("Enumeration cancelled after {} match(es)", ids.len());
            return Ok(None);
        }
        match enumerator.next_page().await? {
            Some(page) => {
                ids.extend(page.items.into_iter().map(|item| item.rating_key));
                ui.set_percent(enumerator.percent_complete());
            }
            None => break,
        }
    }
    ui.set_percent(100);
    Ok(Some(ids))
}

pub async fn run_update(args: UpdateArgs, output: &Output) -> Result<()> {
    let ws = Workspace::load()?;
    let client = ws.connect(&args.connection)?;

    let selection_file = ws.selection_file(args.item_type);
    let mut selection = if args.selected { Some(selection_file.load()) } else { None };
    let request = UpdateRequest::from_args(&args, &ws, selection.as_ref())?;

    let cancel = Arc::new(AtomicBool::new(false));
    let handler = spawn_interrupt_handler(cancel.clone());
    let summary = execute(&client, &request, cancel, output).await;
    handler.abort();
    let summary = summary?;

    if let (Some(store), Some(report)) = (selection.as_mut(), summary.report.as_ref()) {
        let cleared = store.clear(&report.succeeded_ids);
        selection_file.save(store)?;
        tracing::debug!("Cleared {} updated id(s) from the saved selection", cleared);
    }
    Ok(())
}

/// Resolve targets and either plan or apply the update.
pub async fn execute<C: CatalogClient + ?Sized>(
    client: &C,
    request: &UpdateRequest,
    cancel: Arc<AtomicBool>,
    output: &Output,
) -> Result<UpdateSummary> {
    let progress_enabled = output.is_human() && !output.is_quiet();

    let ids: Vec<String> = match &request.targets {
        Targets::Explicit(ids) => ids.clone(),
        Targets::Query(query) => {
            let ui = ProgressUi::percent("Fetching matching items", progress_enabled);
            let collected = collect_targets(client, query, &cancel, &ui).await;
            ui.finish();
            match collected? {
                Some(ids) => ids,
                None => {
                    output.warn("Cancelled while fetching matching items. Nothing was updated.");
                    output.json(&json!({ "cancelled": true, "dry_run": request.dry_run }));
                    return Ok(UpdateSummary {
                        cancelled: true,
                        ..UpdateSummary::default()
                    });
                }
            }
        }
    };

    let mut summary = UpdateSummary {
        matched: ids.len(),
        ..UpdateSummary::default()
    };

    if ids.is_empty() {
        output.info("No matching items found.");
        output.json(&json!({ "matched": 0, "dry_run": request.dry_run }));
        return Ok(summary);
    }

    output.info(format!(
        "Matched {} item(s).{}",
        ids.len(),
        if request.dry_run { " DRY RUN" } else { "" }
    ));

    if request.dry_run {
        let mut planned = plan_jobs(&ids, request.added_at, request.lock)?;
        if let Some(max) = request.max_items {
            planned.truncate(max);
        }
        for job in &planned {
            output.result(plan_line(job, &request.date));
        }
        output.json(&json!({
            "matched": ids.len(),
            "dry_run": true,
            "planned": planned,
        }));
        summary.planned = planned;
        return Ok(summary);
    }

    let options = BatchOptions::new(request.added_at)
        .with_lock(request.lock)
        .with_budget(request.budget)
        .with_max_items(request.max_items);
    let ui = ProgressUi::items("Updating added dates", ids.len(), progress_enabled);
    let report = BatchUpdater::new(client, request.section_id.clone(), request.item_type)
        .with_cancel_flag(cancel.clone())
        .apply(&ids, &options, |p| ui.item_done(p))
        .await;
    ui.finish();
    let report = report?;
    summary.cancelled = cancel.load(Ordering::SeqCst) && report.attempted < ids.len();

    for failure in &report.failures {
        output.error(format!("Failed id={}: {}", failure.rating_key, failure.error));
    }
    if summary.cancelled {
        output.warn(format!(
            "Cancelled. Updated {}/{} item(s), {} failed, {} not attempted.",
            report.succeeded,
            report.attempted,
            report.failed(),
            ids.len() - report.attempted
        ));
    } else if report.is_clean() {
        output.success(format!("Done. Updated {} item(s).", report.succeeded));
    } else {
        output.warn(format!(
            "Done. Updated {}/{} item(s), {} failed.",
            report.succeeded,
            report.attempted,
            report.failed()
        ));
    }
    output.json(&json!({
        "matched": ids.len(),
        "dry_run": false,
        "cancelled": summary.cancelled,
        "attempted": report.attempted,
        "succeeded": report.succeeded,
        "failures": report.failures,
    }));

    summary.report = Some(report);
    Ok(summary)
}
