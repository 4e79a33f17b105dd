//! Update command - expire a world's cached data

use crate::cli::args::UpdateArgs;
use crate::config::Config;
use crate::error::ScarletResult;
use crate::service::WorldService;
use crate::ui::{self, UiContext};

/// Execute the update command
pub async fn execute(args: UpdateArgs, config: &Config) -> ScarletResult<()> {
    let service = WorldService::from_config(config).await?;
    service.update(&args.world).await?;

    let ctx = UiContext::detect();
    ui::step_ok(&ctx, &format!("Expired cached data for {}", args.world));
    ui::remark(&ctx, "The next request refetches the world");
    Ok(())
}
