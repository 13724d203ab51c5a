use anyhow::Context;
use mw_core::types::StatusMapping;

use super::CliContext;

pub fn set(
    ctx: &CliContext,
    project: &str,
    created: Option<String>,
    merged: Option<String>,
) -> anyhow::Result<()> {
    let project = project.trim().to_uppercase();
    if project.is_empty() || project.contains('-') {
        anyhow::bail!("project key must be non-empty and contain no '-'");
    }

    let store = ctx.mappings();
    let existing = store.get(&project).context("failed to read status mappings")?;
    let mapping = match existing {
        Some(mut mapping) => {
            if let Some(created) = created {
                mapping.pr_created_status = created;
            }
            if let Some(merged) = merged {
                mapping.pr_merged_status = merged;
            }
            mapping
        }
        None => {
            let Some(merged) = merged else {
                anyhow::bail!("--merged is required for a new mapping");
            };
            StatusMapping {
                project_key: project.clone(),
                pr_created_status: created.unwrap_or_default(),
                pr_merged_status: merged,
            }
        }
    };

    store.save(mapping.clone()).context("failed to save status mapping")?;
    println!(
        "{project}: created -> {:?}, merged -> {:?}",
        mapping.pr_created_status, mapping.pr_merged_status
    );
    Ok(())
}

pub fn list(ctx: &CliContext) -> anyhow::Result<()> {
    let mappings = ctx.mappings().list().context("failed to read status mappings")?;
    if mappings.is_empty() {
        println!("No status mappings. Add one with `mw mapping set <PROJECT> --merged <STATUS>`.");
        return Ok(());
    }
    println!("{:<12} {:<20} MERGED", "PROJECT", "CREATED");
    for m in mappings {
        println!("{:<12} {:<20} {}", m.project_key, m.pr_created_status, m.pr_merged_status);
    }
    Ok(())
}

pub fn remove(ctx: &CliContext, project: &str) -> anyhow::Result<()> {
    let project = project.trim().to_uppercase();
    if ctx.mappings().delete(&project).context("failed to update status mappings")? {
        println!("Removed mapping for {project}");
    } else {
        println!("No mapping for {project}");
    }
    Ok(())
}
