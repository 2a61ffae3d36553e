//! Hook lambda running the check selected by the `HOOK_*` environment variables

pub fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Unable to setup logging");
    ecs_lifecycle_hook::exec_tokio()
}
