use super::progress_ui::ProgressUi;
use super::{ConnectionArgs, ListArgs, Workspace};
use crate::output::Output;
use addedat_core::{parse_date, today, DatePreset, RangeSelector, SelectionFile, SelectionStore};
use addedat_models::{ItemType, SortOrder};
use chrono::NaiveDate;
use clap::Subcommand;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;

#[derive(Subcommand, Debug, Clone)]
pub enum SelectCommands {
    /// Select (or clear) every result added between two dates, inclusive
    Range {
        #[command(flatten)]
        list: ListArgs,

        /// First day, YYYY-MM-DD
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: String,

        /// Last day, YYYY-MM-DD
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: String,

        /// Clear matching items instead of selecting them
        #[arg(long)]
        deselect: bool,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Select results in a range relative to today
    Preset {
        /// last7, last30, last90, last365, this-year or older-than-year
        preset: DatePreset,

        #[command(flatten)]
        list: ListArgs,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Select every result of the query
    All {
        #[command(flatten)]
        list: ListArgs,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Select specific rating keys
    Add {
        #[arg(long = "type", value_name = "TYPE", default_value = "movie")]
        item_type: ItemType,

        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Clear specific rating keys, or the whole selection when none are given
    Clear {
        #[arg(long = "type", value_name = "TYPE", default_value = "movie")]
        item_type: ItemType,

        ids: Vec<String>,
    },
    /// Show the saved selection
    Show {
        #[arg(long = "type", value_name = "TYPE", default_value = "movie")]
        item_type: ItemType,
    },
}

pub async fn run_select(cmd: SelectCommands, output: &Output) -> Result<()> {
    let ws = Workspace::load()?;
    let progress_enabled = output.is_human() && !output.is_quiet();

    match cmd {
        SelectCommands::Range {
            list,
            from,
            to,
            deselect,
            connection,
        } => {
            let from = parse_date(&from)?;
            let to = parse_date(&to)?;
            if from > to {
                output.warn(format!("--from {} is after --to {}, nothing can match", from, to));
            }
            let client = ws.connect(&connection)?;
            let file = ws.selection_file(list.item_type);
            let mut store = file.load();

            let ui = ProgressUi::percent("Scanning results", progress_enabled);
            let touched = RangeSelector::new(&client, &list.query_spec(&ws, SortOrder::AddedDesc))
                .select_in_range(&mut store, from, to, !deselect, |pct| ui.set_percent(pct))
                .await;
            ui.finish();
            let touched = touched?;

            file.save(&store)?;
            let verb = if deselect { "Cleared" } else { "Selected" };
            output.success(format!("{} {} item(s) added between {} and {}", verb, touched, from, to));
            report_selection(&store, list.item_type, output);
        }
        SelectCommands::Preset { preset, list, connection } => {
            let client = ws.connect(&connection)?;
            let file = ws.selection_file(list.item_type);
            let mut store = file.load();
            let today = today();

            let ui = ProgressUi::percent(preset.label(), progress_enabled);
            let touched = RangeSelector::new(&client, &list.query_spec(&ws, SortOrder::AddedDesc))
                .select_preset(&mut store, preset, today, |pct| ui.set_percent(pct))
                .await;
            ui.finish();
            let touched = touched?;

            file.save(&store)?;
            output.success(preset_message(preset, today, touched));
            report_selection(&store, list.item_type, output);
        }
        SelectCommands::All { list, connection } => {
            let client = ws.connect(&connection)?;
            let file = ws.selection_file(list.item_type);
            let mut store = file.load();

            let ui = ProgressUi::percent("Selecting all results", progress_enabled);
            let result = RangeSelector::new(&client, &list.query_spec(&ws, SortOrder::AddedDesc))
                .select_all_results(&mut store, |pct| ui.set_percent(pct))
                .await;
            ui.finish();
            let (selected, total) = result?;

            file.save(&store)?;
            output.success(format!("Selected {} of {} result(s)", selected, total));
            report_selection(&store, list.item_type, output);
        }
        SelectCommands::Add { item_type, ids } => {
            let file = ws.selection_file(item_type);
            let mut store = file.load();
            add_ids(&mut store, &ids)?;
            file.save(&store)?;
            output.success(format!("Selected {} id(s)", ids.len()));
            report_selection(&store, item_type, output);
        }
        SelectCommands::Clear { item_type, ids } => {
            let file = ws.selection_file(item_type);
            clear_ids(&file, &ids, output)?;
            report_selection(&file.load(), item_type, output);
        }
        SelectCommands::Show { item_type } => {
            let store = ws.selection_file(item_type).load();
            if output.is_human() {
                for id in store.selected_ids() {
                    output.println(id);
                }
            }
            report_selection(&store, item_type, output);
        }
    }
    Ok(())
}

/// Summary line for a preset run; the range shown is the one applied for `today`.
fn preset_message(preset: DatePreset, today: NaiveDate, touched: usize) -> String {
    let (from, to) = preset.range(today);
    format!("{}: selected {} item(s) ({} to {})", preset, touched, from, to)
}

fn add_ids(store: &mut SelectionStore, ids: &[String]) -> Result<()> {
    if let Some(index) = ids.iter().position(|id| id.trim().is_empty()) {
        return Err(eyre!("blank rating key at position {}", index));
    }
    for id in ids {
        store.select(id.trim());
    }
    Ok(())
}

fn clear_ids(file: &SelectionFile, ids: &[String], output: &Output) -> Result<()> {
    if ids.is_empty() {
        file.remove()?;
        output.success("Selection cleared");
        return Ok(());
    }
    let mut store = file.load();
    let cleared = store.clear(ids.iter().map(|id| id.trim()));
    file.save(&store)?;
    output.success(format!("Cleared {} id(s)", cleared));
    Ok(())
}

fn report_selection(store: &SelectionStore, item_type: ItemType, output: &Output) {
    output.info(format!("{} {}(s) selected", store.count_selected(), item_type));
    output.json(&json!({
        "type": item_type.as_str(),
        "selected": store.count_selected(),
        "ids": store.selected_ids(),
    }));
}
