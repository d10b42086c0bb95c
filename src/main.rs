//! pathecho binary: serve the greeting route on `$PORT` (default 8080).

use std::io::Write;
use std::process::ExitCode;

use env_logger::{Env, Target};

use pathecho::{greeting, HttpServer, ServerConfig, ServerError};

fn init_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .format(|buf, record| {
            // The greeting line is printed exactly as sent to the client
            if record.target() == greeting::LOG_TARGET {
                writeln!(buf, "{}", record.args())
            } else {
                writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args())
            }
        })
        .init();
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::from_env()?;
    let server = HttpServer::new(config, greeting::router());
    server.start().await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pathecho: {e}");
            ExitCode::FAILURE
        }
    }
}
