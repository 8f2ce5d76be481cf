use clap::Parser;
use notifyg::payload::{ImageSource, MessageSource};
use notifyg::{ClientConfiguration, Error, Source};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};

const LOG_TARGET: &str = "notifyg_cli";
const ENV_SOURCE: &str = "NOTIFYG_SOURCE";
const ENV_SECRET: &str = "NOTIFYG_SECRET";
const ENV_SERVICE_URL: &str = "NOTIFYG_SERVICE_URL";
const STDIN_PATH: &str = "-";

#[derive(Parser, Debug)]
#[clap(name = "notifyg", author, version, about = "Easy notification tool using notify.guru https://notify.guru", long_about = None)]
struct CliArgs {
    /// Create new source and output environment NOTIFYG_SOURCE and NOTIFYG_SECRET
    #[clap(long)]
    init: bool,
    /// Name of new source
    #[clap(short, long, value_parser)]
    name: Option<String>,
    /// MIME type of an image
    #[clap(long, value_parser)]
    image_type: Option<String>,
    /// Image file to send, "-" means stdin
    #[clap(long = "image-file", value_parser)]
    image: Option<PathBuf>,
    /// Text file to send, "-" means stdin
    #[clap(long = "text-file", value_parser)]
    text: Option<PathBuf>,
    /// Path to notifyg configuration file
    #[clap(short, long, value_parser)]
    configuration: Option<PathBuf>,
    /// Set the logging level [default: Warn]
    #[clap(short, long, value_parser)]
    log_level: Option<LevelFilter>,
    /// Verbose mode
    #[clap(short = 'v', long)]
    verbose: bool,
    /// Message to send
    #[clap(value_name = "MESSAGE")]
    message: Vec<String>,
}

impl CliArgs {
    fn has_payload(&self) -> bool {
        !self.message.is_empty() || self.text.is_some() || self.image.is_some()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();
    let log_level = match cli.verbose {
        true => LevelFilter::DEBUG,
        false => cli.log_level.unwrap_or(LevelFilter::WARN),
    };
    tracing_subscriber::fmt().with_max_level(log_level).with_writer(std::io::stderr).init();

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            error!(target: LOG_TARGET, "{}", error);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<ExitCode, Error> {
    let config = load_configuration(&args, env_value)?;
    execute(args, config).await
}

async fn execute(args: CliArgs, config: ClientConfiguration) -> Result<ExitCode, Error> {
    if config.id().is_none() && !args.init {
        eprintln!("Environment {} is not set. Please perform `eval $(notifyg --init)`", ENV_SOURCE);
        return Ok(ExitCode::FAILURE);
    }
    if !args.has_payload() && !args.init {
        eprintln!("No messages to send");
        return Ok(ExitCode::FAILURE);
    }

    let source = match args.init {
        true => init_source(&config).await?,
        false => config.attach()?,
    };

    if let Some(path) = args.image {
        info!(target: LOG_TARGET, "Sending image...");
        source.send_image(image_source(&path), args.image_type.as_deref()).await?;
    } else if let Some(path) = args.text {
        info!(target: LOG_TARGET, "Sending text file...");
        source.send(message_source(&path)).await?;
    } else if !args.message.is_empty() {
        info!(target: LOG_TARGET, "Sending message...");
        source.send(args.message.join(" ")).await?;
    }

    Ok(ExitCode::SUCCESS)
}

async fn init_source(config: &ClientConfiguration) -> Result<Source, Error> {
    info!(target: LOG_TARGET, "Creating new source...");
    let source = config.register().await?;

    eprintln!("Please configure your notification source: {}", source.register_url().unwrap_or_default());
    println!("export {}={}", ENV_SOURCE, source.id());
    if let Some(secret) = source.secret() {
        println!("export {}={}", ENV_SECRET, secret.expose());
    }
    Ok(source)
}

/// Configuration file, then environment, then command line arguments.
fn load_configuration<E>(args: &CliArgs, env: E) -> Result<ClientConfiguration, Error>
where
    E: Fn(&str) -> Option<String>,
{
    let mut config = match configuration_path(args) {
        Some(path) => {
            info!(target: LOG_TARGET, "Reading configuration from: {}", path.display());
            ClientConfiguration::try_from(std::fs::read_to_string(path)?.as_str())?
        }
        None => ClientConfiguration::default(),
    };

    if let Some(service_url) = env(ENV_SERVICE_URL) {
        config = config.with_service_url(service_url)?;
    }
    if let Some(id) = env(ENV_SOURCE) {
        config = config.with_id(id);
    }
    if let Some(secret) = env(ENV_SECRET) {
        config = config.with_secret(secret);
    }
    if let Some(name) = &args.name {
        config = config.with_name(name);
    }
    Ok(config)
}

/// An explicit path must exist, the default location is skipped when absent.
fn configuration_path(args: &CliArgs) -> Option<PathBuf> {
    if let Some(path) = &args.configuration {
        return Some(path.clone());
    }

    directories::ProjectDirs::from("guru", "notify", "notifyg")
        .map(|dirs| dirs.config_dir().join("notifyg.toml"))
        .filter(|path| path.is_file())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn image_source(path: &Path) -> ImageSource {
    match path.as_os_str() == STDIN_PATH {
        true => ImageSource::stream(tokio::io::stdin()),
        false => ImageSource::file(path),
    }
}

fn message_source(path: &Path) -> MessageSource {
    match path.as_os_str() == STDIN_PATH {
        true => MessageSource::stream(tokio::io::stdin()),
        false => MessageSource::file(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const CONFIG_TOML: &str = r#"
    [source]
    service_url = "http://127.0.0.1:9/v1/sources/"
    id = "file-source"
    secret = "file-secret"
    name = "file-name"
"#;

    fn config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG_TOML.as_bytes()).unwrap();
        file
    }

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn configuration_file_values() {
        let file = config_file();
        let args = CliArgs::parse_from(["notifyg", "-c", file.path().to_str().unwrap(), "hello"]);
        let config = load_configuration(&args, no_env).unwrap();

        assert_eq!(config.source().service_url(), "http://127.0.0.1:9/v1/sources/");
        assert_eq!(config.id(), Some("file-source"));
        assert_eq!(config.secret().map(|s| s.expose()), Some("file-secret"));
        assert_eq!(config.name(), Some("file-name"));
    }

    #[test]
    fn environment_overrides_file_and_flags_override_environment() {
        let file = config_file();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SOURCE, "env-source"),
            (ENV_SECRET, "env-secret"),
            (ENV_SERVICE_URL, "http://127.0.0.1:10/v1/sources/"),
        ]);
        let args = CliArgs::parse_from(["notifyg", "-c", file.path().to_str().unwrap(), "-n", "flag-name", "hello"]);
        let config = load_configuration(&args, |key| env.get(key).map(|value| value.to_string())).unwrap();

        assert_eq!(config.source().service_url(), "http://127.0.0.1:10/v1/sources/");
        assert_eq!(config.id(), Some("env-source"));
        assert_eq!(config.secret().map(|s| s.expose()), Some("env-secret"));
        assert_eq!(config.name(), Some("flag-name"));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let file = config_file();
        let args = CliArgs::parse_from(["notifyg", "-c", file.path().to_str().unwrap(), "hello"]);
        let config = load_configuration(&args, |_| Some("  ".to_string())).unwrap();

        assert_eq!(config.id(), Some("file-source"));
    }

    #[test]
    fn missing_configuration_file() {
        let args = CliArgs::parse_from(["notifyg", "-c", "/this/path/does/not/exist.toml", "hello"]);
        let result = load_configuration(&args, no_env);

        assert!(matches!(result, Err(Error::IOError(_))));
    }

    #[tokio::test]
    async fn missing_source_id_exits_with_failure() {
        let args = CliArgs::parse_from(["notifyg", "hello"]);
        let code = execute(args, ClientConfiguration::default()).await.unwrap();

        assert_eq!(code, ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn nothing_to_send_exits_with_failure() {
        let args = CliArgs::parse_from(["notifyg"]);
        let config = ClientConfiguration::default().with_id("src1").with_secret("sek1");
        let code = execute(args, config).await.unwrap();

        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn message_arguments_are_payload() {
        assert!(CliArgs::parse_from(["notifyg", "a", "b"]).has_payload());
        assert!(CliArgs::parse_from(["notifyg", "--text-file", "-"]).has_payload());
        assert!(!CliArgs::parse_from(["notifyg", "--init"]).has_payload());
    }

    #[tokio::test]
    async fn dash_path_reads_stdin() {
        assert!(matches!(image_source(Path::new(STDIN_PATH)), ImageSource::Stream(_)));
        assert!(matches!(message_source(Path::new(STDIN_PATH)), MessageSource::Stream(_)));
        assert!(matches!(image_source(Path::new("image.png")), ImageSource::FilePath(_)));
        assert!(matches!(message_source(Path::new("message.txt")), MessageSource::FilePath(_)));
    }
}
