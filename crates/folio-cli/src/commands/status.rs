use anyhow::Result;

use super::Context;
use crate::output;

pub async fn execute(ctx: &Context) -> Result<String> {
    let found = ctx.store.status(&ctx.cap).await?;
    output::divergences(ctx.format, &found)
}
