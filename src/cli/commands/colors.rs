//! Colors command - list the configured block palette

use crate::cli::args::{ColorsArgs, OutputFormat};
use crate::codec::color::Rgba;
use crate::config::Config;
use crate::error::ScarletResult;
use crate::world::Palette;
use serde::Serialize;

/// A palette entry as listed
#[derive(Debug, Serialize, PartialEq, Eq)]
struct ColorEntry {
    id: u16,
    hex: String,
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

/// Execute the colors command
pub async fn execute(args: ColorsArgs, config: &Config) -> ScarletResult<()> {
    let palette = match &config.provider.colors_path {
        Some(path) => Palette::load(path).await?,
        None => Palette::default(),
    };
    let entries = listed_entries(&palette);

    if entries.is_empty() && !matches!(args.format, OutputFormat::Json) {
        println!("No colors configured.");
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_color_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{} {}", entry.id, entry.hex);
            }
        }
    }

    Ok(())
}

/// Entries present in the palette file; unset gaps are skipped
fn listed_entries(palette: &Palette) -> Vec<ColorEntry> {
    palette
        .as_slice()
        .iter()
        .enumerate()
        .filter(|(_, color)| !color.is_unset())
        .filter_map(|(i, color)| u16::try_from(i).ok().map(|id| entry(id, *color)))
        .collect()
}

fn entry(id: u16, color: Rgba) -> ColorEntry {
    ColorEntry {
        id,
        hex: color.to_string(),
        r: color.r,
        g: color.g,
        b: color.b,
        a: color.a,
    }
}

fn print_color_table(entries: &[ColorEntry]) {
    println!("{:>6} {:<10} {:>4} {:>4} {:>4} {:>4}", "ID", "HEX", "R", "G", "B", "A");
    println!("{}", "-".repeat(38));

    for e in entries {
        println!(
            "{:>6} {:<10} {:>4} {:>4} {:>4} {:>4}",
            e.id, e.hex, e.r, e.g, e.b, e.a
        );
    }

    println!();
    println!("Total: {} color{}", entries.len(), if entries.len() == 1 { "" } else { "s" });
}
