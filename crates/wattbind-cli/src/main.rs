use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wattbind", version, about = "Dormitory electricity balance bot")]
struct Cli {
    /// Act as this private user id
    #[arg(long, global = true)]
    user: Option<String>,

    /// Act as this group id
    #[arg(long, global = true, conflicts_with = "user")]
    group: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query balance: no args = bound room, 1 arg = list a campus's
    /// buildings, 3 args = campus building room
    Query {
        args: Vec<String>,
    },
    /// Bind this identity to a room
    Bind {
        campus: String,
        building: String,
        room: String,
    },
    /// Remove this identity's binding (also removes its schedule)
    Unbind,
    /// Daily scheduled query management
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Clear the bound room's reading history
    Clear,
    /// Show the usage walkthrough
    Guide,
    /// Run the scheduler daemon
    Serve,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if matches!(cli.command, Commands::Guide) {
        commands::guide::run();
        return Ok(());
    }

    let ctx = commands::common::open_ctx()?;
    match cli.command {
        Commands::Query { args } => {
            let identity = commands::common::resolve_identity(&cli.user, &cli.group)?;
            commands::query::run(&ctx, &identity, &args).await
        }
        Commands::Bind {
            campus,
            building,
            room,
        } => {
            let identity = commands::common::resolve_identity(&cli.user, &cli.group)?;
            commands::bind::run_bind(&ctx, &identity, campus, building, room).await
        }
        Commands::Unbind => {
            let identity = commands::common::resolve_identity(&cli.user, &cli.group)?;
            commands::bind::run_unbind(&ctx, &identity)
        }
        Commands::Schedule { action } => {
            let identity = commands::common::resolve_identity(&cli.user, &cli.group)?;
            commands::schedule::run(&ctx, &identity, action)
        }
        Commands::Clear => {
            let identity = commands::common::resolve_identity(&cli.user, &cli.group)?;
            commands::clear::run(&ctx, &identity)
        }
        Commands::Serve => commands::serve::run(ctx).await,
        Commands::Guide => unreachable!("handled above"),
    }
}
