//! Meta command - print a world's metadata document

use crate::cli::args::MetaArgs;
use crate::config::Config;
use crate::error::ScarletResult;
use crate::service::WorldService;

/// Execute the meta command
pub async fn execute(args: MetaArgs, config: &Config) -> ScarletResult<()> {
    let service = WorldService::from_config(config).await?;
    let metadata = service.metadata(&args.world).await?;
    println!("{}", render_metadata(&metadata));
    Ok(())
}

/// Pretty-print JSON documents; anything else is shown as text
fn render_metadata(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_pretty_printed() {
        let out = render_metadata(br#"{"name":"Lobby"}"#);
        assert!(out.contains("\n"));
        assert!(out.contains("\"name\": \"Lobby\""));
    }

    #[test]
    fn other_bytes_pass_through() {
        assert_eq!(render_metadata(b"plain text"), "plain text");
    }
}
