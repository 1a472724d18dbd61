//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `framekit_core` linkage.
//! - Start the log sink from an optional JSON config file given as the
//!   first argument.
//! - Run one bundle through declare, start and stop with deterministic output.

use framekit_core::{
    init_logging_from_config, method, method_set, Framework, FrameworkConfig, FrameworkResult,
};
use serde_json::{json, Value};
use std::error::Error;

fn main() {
    println!("framekit_core ping={}", framekit_core::ping());
    println!("framekit_core version={}", framekit_core::core_version());

    if let Err(err) = run() {
        eprintln!("framekit demo failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => FrameworkConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => FrameworkConfig::default(),
    };
    let fallback_dir = std::env::temp_dir().join("framekit-logs");
    let logging = init_logging_from_config(&config, &fallback_dir)?;
    println!(
        "framekit logging level={} dir={}",
        logging.level,
        logging.log_dir.display()
    );

    run_demo_bundle(config)?;
    Ok(())
}

fn run_demo_bundle(config: FrameworkConfig) -> FrameworkResult<()> {
    let mut framework = Framework::with_config(config)?;
    let mut bundle = framework.bundle_cls(Some("demo"), "framekit.cli.DemoBundle")?;
    bundle.methods(
        None,
        method_set([
            (
                "start",
                method(|instance, _| {
                    instance.set("running", Value::Bool(true));
                    Ok(json!("started"))
                }),
            ),
            (
                "stop",
                method(|instance, _| {
                    instance.set("running", Value::Bool(false));
                    Ok(json!("stopped"))
                }),
            ),
        ]),
    )?;

    let id = bundle.start(Some("cli"))?;
    println!("framekit demo bundle=demo instance={id} state=started");
    let stopped = bundle.stop()?;
    println!("framekit demo bundle=demo instance={id} result={stopped}");
    Ok(())
}
