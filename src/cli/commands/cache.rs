//! Cache command - inspect and clear the cache directory

use crate::cache::{CacheEntryInfo, CacheStore};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::ScarletResult;
use crate::ui::{self, UiContext};
use chrono::Utc;
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> ScarletResult<()> {
    let store = CacheStore::attach(&config.cache.dir, config.cache.options());

    match args.action {
        CacheAction::List { format } => list_entries(&store, format).await,
        CacheAction::Clear => clear_entries(&store).await,
    }
}

/// List cached entries
async fn list_entries(store: &CacheStore, format: OutputFormat) -> ScarletResult<()> {
    let entries = if store.dir().exists() {
        store.entries().await?
    } else {
        Vec::new()
    };

    if entries.is_empty() && !matches!(format, OutputFormat::Json) {
        println!("No cache entries found.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_entry_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_entry_table(entries: &[CacheEntryInfo]) {
    println!("{:<48} {:>10} {:<10} {:<20}", "KEY", "SIZE", "AGE", "STATE");
    println!("{}", "-".repeat(90));

    let now = Utc::now();
    for entry in entries {
        let state = if entry.locked {
            style("computing").yellow().to_string()
        } else {
            style("ready").green().to_string()
        };

        println!(
            "{:<48} {:>10} {:<10} {:<20}",
            entry.key,
            format_size(entry.size),
            format_age(now.signed_duration_since(entry.modified)),
            state
        );
    }

    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

/// Remove all idle entries
async fn clear_entries(store: &CacheStore) -> ScarletResult<()> {
    let ctx = UiContext::detect();

    if !store.dir().exists() {
        ui::step_ok(&ctx, "Cache is already empty");
        return Ok(());
    }

    let removed = store.clear().await?;
    ui::step_ok_detail(
        &ctx,
        &format!("Removed {} cache entr{}", removed, if removed == 1 { "y" } else { "ies" }),
        &store.dir().display().to_string(),
    );

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Invalidated entries carry an epoch timestamp and show as expired
fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds();
    if secs < 0 {
        "0s".to_string()
    } else if secs >= 365 * 86_400 {
        "expired".to_string()
    } else if secs >= 86_400 {
        format!("{}d", secs / 86_400)
    } else if secs >= 3_600 {
        format!("{}h", secs / 3_600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
