mod app;
pub use app::App;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saccrec=info".into()),
        )
        .init();

    let app = App::new()?;
    app.run()?;

    Ok(())
}
