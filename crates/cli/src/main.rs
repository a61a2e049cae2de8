mod commands;
mod config;
mod logging;
mod wiring;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use commands::cart::{cmd_cart, CartAction};
use commands::order::{cmd_order, parse_quantity_edit, Request, Review};
use commands::parse::cmd_parse;
use commands::Context;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Turn shopping lists, chat messages and recipes into cart items.
#[derive(Parser)]
#[command(
    name = "listcart",
    version,
    about = "Turn shopping lists, chat messages and recipes into cart items"
)]
struct Cli {
    /// Path to listcart.toml (defaults to ./listcart.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Never call the language assistant; use deterministic fallbacks
    #[arg(long, global = true)]
    no_assistant: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct ReviewArgs {
    /// Change a pending line before confirming (PRODUCT_ID=QTY, 0 removes)
    #[arg(long = "set", value_name = "PRODUCT_ID=QTY", value_parser = parse_quantity_edit)]
    set: Vec<(String, i64)>,

    /// Drop a pending line before confirming
    #[arg(long = "drop", value_name = "PRODUCT_ID")]
    drop: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,
}

impl From<ReviewArgs> for Review {
    fn from(args: ReviewArgs) -> Self {
        Review {
            set: args.set,
            drop: args.drop,
            yes: args.yes,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract (name, quantity) items from a list without searching
    Parse {
        /// Text file with one item per line, or - for stdin
        input: PathBuf,
    },

    /// Resolve a written or photographed list and add it to the cart
    Scan {
        /// Text file with one item per line, or - for stdin
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        text: Option<PathBuf>,
        /// Photo of a handwritten or printed list
        #[arg(long)]
        image: Option<PathBuf>,
        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Send a chat message: items, a recipe, or a question
    Chat {
        message: String,
        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Look up a recipe's ingredients and add them to the cart
    Recipe {
        name: String,
        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Show or edit the cart directly
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
}

#[derive(Subcommand)]
enum CartCommand {
    /// List the cart's lines
    Show,
    /// Add a quantity of a product
    Add { product_id: String, quantity: u32 },
    /// Remove a product's line
    Remove { product_id: String },
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e, cli.output, cli.quiet);
            process::exit(1);
        }
    };
    logging::init(&config.logging.level, cli.quiet);

    let ctx = Context {
        config: &config,
        no_assistant: cli.no_assistant,
        output: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Parse { input } => cmd_parse(&input, &ctx),
        Commands::Scan {
            text,
            image,
            review,
        } => {
            let request = match (text, image) {
                (_, Some(image)) => Request::ImageFile(image),
                (Some(text), None) => Request::ListFile(text),
                (None, None) => ctx.fail("one of --text or --image is required"),
            };
            cmd_order(request, &review.into(), &ctx);
        }
        Commands::Chat { message, review } => {
            cmd_order(Request::Chat(message), &review.into(), &ctx);
        }
        Commands::Recipe { name, review } => {
            cmd_order(Request::Recipe(name), &review.into(), &ctx);
        }
        Commands::Cart { action } => {
            let action = match action {
                CartCommand::Show => CartAction::Show,
                CartCommand::Add {
                    product_id,
                    quantity,
                } => CartAction::Add {
                    product_id,
                    quantity,
                },
                CartCommand::Remove { product_id } => CartAction::Remove { product_id },
            };
            cmd_cart(action, &ctx);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
