use clap::{Arg, Command};
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use xml_config::Loader;
use xml_format::FormatSettings;
use xml_lsp::XmlLanguageServer;

const LOG_ENV: &str = "XML_LSP_LOG";

#[tokio::main]
async fn main() {
    let matches = Command::new("xml-lsp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("XML formatting language server (stdin/stdout)")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("TOML file layered over the built-in defaults"),
        )
        .get_matches();

    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    let loaded = loader.build();

    let level = match &loaded {
        Ok(config) => config.logging.level.clone(),
        Err(_) => "info".to_string(),
    };
    init_tracing(&level);

    let base_settings = match loaded {
        Ok(config) => config.format_settings(),
        Err(err) => {
            warn!(%err, "failed to load configuration, using defaults");
            FormatSettings::default()
        }
    };

    let (service, socket) =
        LspService::new(move |client| XmlLanguageServer::with_settings(client, base_settings));
    Server::new(stdin(), stdout(), socket).serve(service).await;
}

/// Log to stderr; stdout carries the protocol.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
