use std::time::Duration;

use anyhow::Context;

use super::CliContext;

const FOLLOW_POLL: Duration = Duration::from_secs(1);

pub async fn run(ctx: &CliContext, follow: bool, last: usize) -> anyhow::Result<()> {
    let log = ctx.log();
    let lines = log
        .read_last_lines(last)
        .with_context(|| format!("failed to read {}", log.path().display()))?;
    if lines.is_empty() && !follow {
        println!("Log is empty ({})", log.path().display());
        return Ok(());
    }
    for line in lines {
        println!("{line}");
    }
    if !follow {
        return Ok(());
    }

    let mut offset = log.size()?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = tokio::time::sleep(FOLLOW_POLL) => {}
        }
        let (chunk, next) = log.read_from(offset)?;
        offset = next;
        print!("{chunk}");
    }
}
