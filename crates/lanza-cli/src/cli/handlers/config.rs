//! Configuration command handlers

use super::CommandContext;
use crate::error::Result;
use crate::output::json_output;

/// Handle `config show`
pub fn handle_show(ctx: &CommandContext) -> Result<()> {
    if ctx.json {
        return json_output(&ctx.config);
    }

    print!("{}", ctx.config.to_toml()?);
    println!("# authority = \"{}\"", ctx.config.authority());
    println!("# scopes = {:?}", ctx.config.scopes());
    println!("# token cache = \"{}\"", ctx.cache_dir.display());
    Ok(())
}
