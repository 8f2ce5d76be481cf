use notifyg::{Error, Source, SourceConfiguration};
use tracing::info;
use tracing::level_filters::LevelFilter;

const LOG_TARGET: &str = "notifyg_register_example";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_max_level(LevelFilter::INFO).init();

    let source = Source::register(Some("register example"), None, &SourceConfiguration::new()).await?;
    info!(target: LOG_TARGET, "Registered source {}", source.id());

    println!("Configure the source at: {}", source.register_url().unwrap_or_default());
    println!("export NOTIFYG_SOURCE={}", source.id());
    if let Some(secret) = source.secret() {
        println!("export NOTIFYG_SECRET={}", secret.expose());
    }

    source.send("Hello from the register example").await
}
