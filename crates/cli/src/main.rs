//! Sole Society CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! sole products --category sneakers --sort lowtohigh
//! sole product 665f1c2e9b1d4a0012ab34cd --size M
//!
//! # Account
//! sole login -e asha@example.com -p secret
//! sole whoami
//!
//! # Shop
//! sole cart add 665f1c2e9b1d4a0012ab34cd --size M --color Blue
//! sole checkout --address "12 MG Road" --city Pune --postal-code 411001 --country India
//! sole orders --watch
//!
//! # Admin
//! sole admin orders
//! sole admin deliver 66a0...
//! ```
//!
//! # Commands
//!
//! - `products`, `product` - Browse the catalog
//! - `login`, `logout`, `whoami`, `register`, `verify` - Account
//! - `profile-image` - Upload or remove the avatar
//! - `cart`, `wishlist`, `checkout`, `orders` - Shopping
//! - `review` - Rate a product
//! - `admin` - Product and order management
//!
//! Every failure is printed as a notification and exits non-zero.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sole_society_client::views::SortOrder;
use sole_society_client::{ClientConfig, SessionStorage, Storefront};

mod commands;
mod output;

use commands::CliError;

#[derive(Parser)]
#[command(name = "sole")]
#[command(author, version, about = "Sole Society storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products(ListArgs),
    /// Show one product with its variants and reviews
    Product {
        id: String,
        /// Preselect a size
        #[arg(long)]
        size: Option<String>,
        /// Preselect a color
        #[arg(long)]
        color: Option<String>,
    },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account; a verification code is emailed
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },
    /// Confirm a registration with the emailed code
    Verify {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        otp: String,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: Option<WishlistAction>,
    },
    /// Show orders and delivery countdowns
    Orders {
        /// Keep running and refresh the countdown every second
        #[arg(short, long)]
        watch: bool,
    },
    /// Place an order for the cart
    Checkout(AddressArgs),
    /// Create, edit or delete your review of a product
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Upload or remove the profile image
    ProfileImage {
        #[command(subcommand)]
        action: ProfileImageAction,
    },
    /// Store management (admin accounts only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Backend category filter
    #[arg(short, long)]
    category: Option<String>,
    /// Case-insensitive name search
    #[arg(short, long)]
    search: Option<String>,
    /// relevance, lowtohigh or hightolow
    #[arg(long, default_value = "relevance")]
    sort: SortOrder,
    #[arg(long)]
    featured: bool,
    #[arg(long)]
    new_arrivals: bool,
}

#[derive(Args)]
struct LineArgs {
    product: String,
    #[arg(long)]
    size: String,
    #[arg(long)]
    color: String,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with totals
    Show,
    /// Add a variant; size and color default to the first in stock order
    Add {
        product: String,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Set {
        #[command(flatten)]
        line: LineArgs,
        quantity: u32,
    },
    /// Increase a line by one
    Inc(LineArgs),
    /// Decrease a line by one (never below one)
    Dec(LineArgs),
    /// Remove a line
    Remove(LineArgs),
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Add or remove a product
    Toggle { product: String },
}

#[derive(Args)]
struct AddressArgs {
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    postal_code: String,
    #[arg(long)]
    country: String,
}

#[derive(Subcommand)]
enum ReviewAction {
    /// Submit a review, replacing your earlier one if any
    Submit {
        product: String,
        #[arg(short, long)]
        rating: u8,
        #[arg(short, long)]
        comment: String,
    },
    /// Delete your review
    Delete { product: String },
}

#[derive(Subcommand)]
enum ProfileImageAction {
    /// Upload an image file
    Set { path: PathBuf },
    /// Remove the current image
    Remove,
}

#[derive(Subcommand)]
enum AdminAction {
    /// List every order
    Orders {
        /// Only orders awaiting fulfillment
        #[arg(long)]
        pending: bool,
    },
    /// Mark an order delivered
    Deliver { order: String },
    /// Cancel an order
    Cancel { order: String },
    /// Create a product
    CreateProduct(ProductArgs),
    /// Update a product
    UpdateProduct {
        id: String,
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Delete a product
    DeleteProduct { id: String },
}

#[derive(Args)]
struct ProductArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    brand: String,
    #[arg(long, default_value = "")]
    category: String,
    /// Product type
    #[arg(long = "type", default_value = "")]
    kind: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    price: Decimal,
    #[arg(long)]
    original_price: Option<Decimal>,
    /// Percent off, 0-100
    #[arg(long, default_value_t = Decimal::ZERO, allow_negative_numbers = true)]
    discount: Decimal,
    /// SIZE:COLOR:STOCK, repeatable
    #[arg(long = "variant", value_parser = commands::admin::parse_variant)]
    variants: Vec<sole_society_client::validation::VariantInput>,
    /// Image file, repeatable
    #[arg(long = "image")]
    images: Vec<PathBuf>,
    #[arg(long)]
    featured: bool,
    #[arg(long)]
    new_arrival: bool,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::failure(&CliError::from(sole_society_client::ClientError::from(e)));
            return ExitCode::FAILURE;
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sole_society_client=info,sole=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            output::failure(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let storefront = Storefront::new(config, SessionStorage::file(config.session_file.clone()))?;
    storefront.start().await;

    match cli.command {
        Commands::Products(args) => commands::catalog::list(&storefront, args).await,
        Commands::Product { id, size, color } => {
            commands::catalog::show(&storefront, &id, size.as_deref(), color.as_deref()).await
        }
        Commands::Login { email, password } => {
            commands::account::login(&storefront, email, password).await
        }
        Commands::Logout => commands::account::logout(&storefront).await,
        Commands::Whoami => {
            commands::account::whoami(&storefront);
            Ok(())
        }
        Commands::Register {
            username,
            email,
            password,
            confirm,
        } => commands::account::register(&storefront, username, email, password, confirm).await,
        Commands::Verify { email, otp } => {
            commands::account::verify(&storefront, &email, &otp).await
        }
        Commands::ProfileImage { action } => match action {
            ProfileImageAction::Set { path } => {
                commands::account::set_profile_image(&storefront, &path).await
            }
            ProfileImageAction::Remove => commands::account::remove_profile_image(&storefront).await,
        },
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => {
                commands::cart::show(&storefront).await;
                Ok(())
            }
            CartAction::Add {
                product,
                size,
                color,
                quantity,
            } => {
                commands::cart::add(&storefront, &product, size.as_deref(), color.as_deref(), quantity)
                    .await
            }
            CartAction::Set { line, quantity } => {
                commands::cart::set(&storefront, &line.into_key(), quantity).await
            }
            CartAction::Inc(line) => commands::cart::increment(&storefront, &line.into_key()).await,
            CartAction::Dec(line) => commands::cart::decrement(&storefront, &line.into_key()).await,
            CartAction::Remove(line) => commands::cart::remove(&storefront, &line.into_key()).await,
        },
        Commands::Wishlist { action } => match action.unwrap_or(WishlistAction::Show) {
            WishlistAction::Show => {
                commands::cart::show_wishlist(&storefront).await;
                Ok(())
            }
            WishlistAction::Toggle { product } => {
                commands::cart::toggle_wishlist(&storefront, &product).await
            }
        },
        Commands::Checkout(address) => {
            commands::orders::checkout(&storefront, address.into_address()).await
        }
        Commands::Orders { watch } => commands::orders::show(&storefront, watch).await,
        Commands::Review { action } => match action {
            ReviewAction::Submit {
                product,
                rating,
                comment,
            } => commands::catalog::review(&storefront, &product, rating, comment).await,
            ReviewAction::Delete { product } => {
                commands::catalog::delete_review(&storefront, &product).await
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Orders { pending } => commands::admin::orders(&storefront, pending).await,
            AdminAction::Deliver { order } => commands::admin::deliver(&storefront, &order).await,
            AdminAction::Cancel { order } => commands::admin::cancel(&storefront, &order).await,
            AdminAction::CreateProduct(product) => {
                commands::admin::create_product(&storefront, product).await
            }
            AdminAction::UpdateProduct { id, product } => {
                commands::admin::update_product(&storefront, &id, product).await
            }
            AdminAction::DeleteProduct { id } => {
                commands::admin::delete_product(&storefront, &id).await
            }
        },
    }
}

impl LineArgs {
    fn into_key(self) -> sole_society_core::LineKey {
        sole_society_core::LineKey::new(
            sole_society_core::ProductId::new(self.product),
            self.size,
            self.color,
        )
    }
}

impl AddressArgs {
    fn into_address(self) -> sole_society_core::ShippingAddress {
        sole_society_core::ShippingAddress {
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            country: self.country,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_add() {
        let cli = Cli::try_parse_from(["sole", "cart", "add", "P1", "--size", "M", "-q", "2"])
            .expect("valid args");
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: Some(CartAction::Add { quantity: 2, .. })
            }
        ));
    }

    #[test]
    fn test_parse_sort_order() {
        let cli = Cli::try_parse_from(["sole", "products", "--sort", "hightolow"]).expect("valid");
        let Commands::Products(args) = cli.command else {
            panic!("expected products");
        };
        assert_eq!(args.sort, SortOrder::PriceHighToLow);
    }
}
