use std::path::Path;

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use manifold::{
    AppContext, UniversalAdapter, app,
    config::{AppConfigValidator, load_config},
    ports::ReadyCallback,
    routes, tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "manifold.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "manifold.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "manifold.toml")]
        config: String,
    },
    /// Start the server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "manifold.toml")]
        config: String,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Determine the command to run
    let (command, config_path) = match args.command {
        Some(Commands::Validate { config }) => ("validate", config),
        Some(Commands::Init { config }) => ("init", config),
        Some(Commands::Serve { config }) => ("serve", config),
        None => ("serve", args.config), // Default to serve with config from args
    };

    match command {
        "validate" => return validate_config_command(&config_path),
        "init" => return init_config_command(&config_path),
        "serve" => {
            // Continue with normal server startup
        }
        _ => unreachable!(),
    }

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;
    AppConfigValidator::validate(&config)
        .map_err(|e| eyre!("Invalid configuration in {config_path}: {e}"))?;

    // JSON logs in production unless the config says otherwise
    let json_logs = config.logging.json.unwrap_or(config.server.is_production());
    tracing_setup::init_tracing_with_config(&config.logging.level, json_logs, json_logs)
        .map_err(|e| eyre!("Failed to initialize tracing: {e}"))?;

    tracing::info!("Loaded configuration from {config_path}");

    let port = config.server.port;
    let ctx = AppContext::new(config)?;
    let mut adapter = UniversalAdapter::bind(&ctx)?;
    adapter.setup_baseline(ctx.config());

    let report = ctx.block_on(routes::discover(&app::registry(), &ctx, &mut adapter));
    tracing::info!(
        "Route discovery finished: {} mounted, {} skipped, {} failed",
        report.mounted.len(),
        report.skipped.len(),
        report.failed.len()
    );

    let engine = adapter.engine();
    let on_ready: ReadyCallback = Box::new(move || {
        tracing::info!("Manifold listening on port {port} ({engine} engine)");
        println!("Manifold listening on port {port} ({engine} engine)");
    });
    adapter.listen(port, on_ready)?;

    Ok(())
}

/// Validate configuration file and exit
fn validate_config_command(config_path: &str) -> Result<()> {
    use manifold::config::loader::load_file;

    println!("🔍 Validating configuration file: {config_path}");

    // First check if file exists and is readable
    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    // Try to parse the configuration
    let config = match load_file(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    // Validate the configuration
    match AppConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen: {}:{}", config.server.host, config.server.port);
            println!(
                "   • Engine: {}",
                config.engine.name.as_deref().unwrap_or("auto")
            );
            println!("   • Run Mode: {}", config.server.run_mode);
            println!("   • Static Files: {}", config.static_files.is_some());
            println!(
                "   • Rate Limiting: {}",
                config.security.rate_limit.is_some()
            );
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Engine names are: axum, actix-web, hyper, rouille, tiny-http");
            println!("   • Static URL prefixes must start with '/'");
            println!("   • Rate limit windows use humantime strings (e.g. '15m', '1h')");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Manifold Configuration

[server]
host = "0.0.0.0"
port = 3000
run_mode = "development"
workers = 4

# Engine preference; unset picks the best compiled-in engine.
# One of: axum, actix-web, hyper, rouille, tiny-http
[engine]
# name = "axum"

[handlers]
state_dir = "state"

[logging]
level = "info"

[security.cors]
origins = ["*"]

[security.rate_limit]
window = "15m"
max = 100

# Static file serving
# [static_files]
# root = "./public"
# url_prefix = "/assets"
# index_file = "index.html"
"#;

    std::fs::write(path, default_config).context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'manifold serve --config {config_path}' to start the server");
    Ok(())
}
