use clap::Parser;
use sidegate::{app, AppState, Args, ServerConfig, StartupError};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args).await {
        error!("{}. Exiting.", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), StartupError> {
    let config = ServerConfig::from_args(args)?;
    let addr = config.listen_addr();

    info!("Serving local directory {}", config.root().display());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app(AppState::new(config)))
        .await
        .map_err(StartupError::Serve)
}
