//! Show clip statuses in a store.

use std::path::PathBuf;

use serde::Serialize;

use clipforge_clip_model::{ClipRecord, ClipStatus};

use super::open_store;

#[derive(Serialize)]
struct StatusRow<'a> {
    clip_id: &'a str,
    project_id: &'a str,
    start_secs: f64,
    end_secs: f64,
    status: &'a ClipStatus,
}

impl<'a> From<&'a ClipRecord> for StatusRow<'a> {
    fn from(clip: &'a ClipRecord) -> Self {
        Self {
            clip_id: &clip.id,
            project_id: &clip.project_id,
            start_secs: clip.start_secs,
            end_secs: clip.end_secs,
            status: &clip.status,
        }
    }
}

pub fn run(store_path: PathBuf, clip_id: Option<String>, json: bool) -> anyhow::Result<()> {
    let data = open_store(&store_path)?
        .snapshot()
        .map_err(|e| anyhow::anyhow!("Failed to read store: {e}"))?;

    let rows: Vec<StatusRow<'_>> = data
        .clips
        .values()
        .filter(|clip| clip_id.as_deref().map_or(true, |id| clip.id == id))
        .map(StatusRow::from)
        .collect();

    if let Some(id) = &clip_id {
        if rows.is_empty() {
            return Err(anyhow::anyhow!("Unknown clip: {id}"));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Clips in {}:", store_path.display());
    for row in &rows {
        let detail = match row.status {
            ClipStatus::Rendered { output_path } => output_path.display().to_string(),
            ClipStatus::Failed { error } => error.clone(),
            _ => String::new(),
        };
        println!(
            "  {:<16} {:<12} {:>9.2}s - {:>9.2}s  {:<9} {}",
            row.clip_id,
            row.project_id,
            row.start_secs,
            row.end_secs,
            row.status.name(),
            detail
        );
    }
    println!("\n{} clip(s).", rows.len());

    Ok(())
}
