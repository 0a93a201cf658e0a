use super::{ConnectionArgs, Workspace};
use crate::output::{new_table, Output};
use addedat_models::{ItemType, LibrarySection};
use color_eyre::Result;
use serde_json::json;

pub async fn run_sections(item_type: Option<ItemType>, connection: ConnectionArgs, output: &Output) -> Result<()> {
    let ws = Workspace::load()?;
    let client = ws.connect(&connection)?;
    let sections = client.list_sections(item_type).await?;
    render_sections(&sections, output);
    Ok(())
}

fn render_sections(sections: &[LibrarySection], output: &Output) {
    if sections.is_empty() {
        output.warn("No library sections found.");
    } else {
        let mut table = new_table(vec!["Key", "Title", "Type"]);
        for section in sections {
            table.add_row(vec![
                section.key.clone(),
                section.title.clone(),
                section.kind.clone().unwrap_or_default(),
            ]);
        }
        output.table(&table);
    }
    output.json(&json!({ "sections": sections }));
}
