// concord/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing::Level;

use cli::{Cli, Commands};

fn init_tracing(verbose: u8) {
    // Log lines go to stderr so stdout stays clean for command output.
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let project_dir = cli.project_dir;

    match cli.command {
        Commands::Compare {
            files,
            keys,
            case_sensitive,
            whitespace_sensitive,
            keys_only,
        } => {
            commands::compare::execute(
                project_dir,
                files,
                keys,
                case_sensitive,
                whitespace_sensitive,
                keys_only,
            )
            .await
        }
        Commands::Merge {
            files,
            keys,
            strategy,
            mappings,
            map_file,
            inner,
            output,
        } => {
            let args = commands::merge::MergeArgs {
                files,
                keys,
                strategy,
                mappings,
                map_file,
                inner,
                output,
            };
            commands::merge::execute(project_dir, args).await
        }
        Commands::Validate { file, rules, check } => {
            commands::validate::execute(project_dir, file, rules, check).await
        }
        Commands::Report { format, output } => commands::report::execute(project_dir, format, output),
        Commands::Preview { file, rows } => commands::preview::execute(project_dir, file, rows).await,
        Commands::Status => commands::status::execute(project_dir),
        Commands::Clear => commands::clear::execute(project_dir),
    }
}
