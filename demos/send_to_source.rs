use notifyg::signer::Secret;
use notifyg::{Error, Source, SourceConfiguration};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

const LOG_TARGET: &str = "notifyg_send_example";
const SOURCE_ID: &str = "src1";
const SECRET: &str = "sek1";
const SERVICE_URL: &str = "http://127.0.0.1:8080/v1/sources/";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_max_level(LevelFilter::DEBUG).init();

    let config = SourceConfiguration::new().with_service_url(SERVICE_URL)?;
    let source = Source::attach(SOURCE_ID, Some(Secret::new(SECRET)), &config)?;

    info!(target: LOG_TARGET, "Sending test messages to {}", source.messages_url());
    for message in get_test_messages() {
        if let Err(error) = source.send(message).await {
            warn!(target: LOG_TARGET, "Unable to send test message: {}", error);
        }
    }

    Ok(())
}

fn get_test_messages() -> Vec<String> {
    let time = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    vec![format!("Simple test message : {}", time), format!("Another test message : {}", time)]
}
