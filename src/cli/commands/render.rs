//! Render command - write a world minimap to disk

use crate::cli::args::RenderArgs;
use crate::config::Config;
use crate::error::{ScarletError, ScarletResult};
use crate::service::WorldService;
use crate::ui::{self, UiContext};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Execute the render command
pub async fn execute(args: RenderArgs, config: &Config) -> ScarletResult<()> {
    let service = WorldService::from_config(config).await?;
    let png = service.minimap(&args.world, args.scale).await?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.png", args.world)));

    // `-` streams the image to stdout for piping
    if output.as_os_str() == "-" {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(&png)
            .await
            .map_err(|e| ScarletError::io("writing image to stdout", e))?;
        stdout
            .flush()
            .await
            .map_err(|e| ScarletError::io("flushing stdout", e))?;
        return Ok(());
    }

    fs::write(&output, &png)
        .await
        .map_err(|e| ScarletError::io(format!("writing {}", output.display()), e))?;

    let ctx = UiContext::detect();
    ui::step_ok_detail(
        &ctx,
        &format!(
            "Rendered {} at scale {} ({} bytes)",
            args.world,
            config.render.clamp_scale(args.scale),
            png.len()
        ),
        &output.display().to_string(),
    );

    Ok(())
}
