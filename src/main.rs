/*!
 * RTK - Main Entry Point
 *
 * Copies a file through a producer and a consumer process:
 *   rtk [SRC] [DST] [rt|ts]
 * Defaults: rtk.c -> rtk2.c, time-sliced.
 */

use anyhow::Context;
use rtk::{copy_file, init_tracing, Kernel, ProcessClass};
use tracing::info;

const DEFAULT_SRC: &str = "rtk.c";
const DEFAULT_DST: &str = "rtk2.c";

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let src = args.next().unwrap_or_else(|| DEFAULT_SRC.to_string());
    let dst = args.next().unwrap_or_else(|| DEFAULT_DST.to_string());
    let class = match args.next() {
        Some(arg) => ProcessClass::parse(&arg)
            .with_context(|| format!("unknown process class '{}'", arg))?,
        None => ProcessClass::TimeSliced,
    };

    let kernel = Kernel::from_env().context("loading kernel configuration")?;
    info!(config = ?kernel.config(), "RTK starting");

    kernel.start_scheduler()?;
    let copied = copy_file(&kernel, &src, &dst, class);
    let stats = kernel.stats();
    kernel.shutdown();

    let report = copied?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "report": report,
            "stats": stats,
        }))?
    );
    Ok(())
}
