//! Replays recorded hook invocations from a json file against the noop check:
//!
//! `cargo run --example replay --features test -- tests/replay.json`

pub fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Unable to setup logging");
    let path = std::env::args()
        .nth(1)
        .context("Usage: replay <test_data.json>")?;
    let test_data =
        std::fs::read_to_string(&path).with_context(|| format!("Unable to read {path}"))?;
    for res in ecs_lifecycle_hook::exec_test(&test_data, ecs_lifecycle_hook::Noop)? {
        println!("{}", serde_json::to_string(&res)?);
    }
    Ok(())
}
