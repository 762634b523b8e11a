//! Entitlekit Demo CLI
//!
//! Runs the verification sweep, purchase and restore flows against
//! in-memory fake platform capabilities, so the pipeline can be exercised
//! from a terminal without a store account.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use entitlekit::{
    ProductId, PurchaseOrchestrator, ReconciliationStore, RestoreOrchestrator, RestoreOutcome,
    SubscriptionVerifier,
};

mod fakes;

use fakes::{DemoCloud, DemoFetcher, DemoNetwork, DemoPaymentClient, DemoValidator};

#[derive(Parser)]
#[command(name = "entitlekit-demo")]
#[command(about = "Entitlekit demo - exercise the subscription verification pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Simulate an unreachable network
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a verification sweep over the product catalog
    Verify {
        /// Product identifiers to verify
        #[arg(default_values_t = [String::from("sub.monthly"), String::from("sub.yearly")])]
        products: Vec<String>,

        /// Simulate an unavailable cloud account service
        #[arg(long)]
        no_cloud: bool,

        /// Fabricate receipts whose entitlements have already expired
        #[arg(long)]
        expired: bool,
    },

    /// Purchase one subscription and confirm the entitlement
    Purchase {
        /// Product identifier to purchase
        #[arg(default_value = "sub.monthly")]
        product: String,

        /// Simulate the user cancelling the payment sheet
        #[arg(long)]
        cancel: bool,

        /// Fabricate a receipt whose entitlement has already expired
        #[arg(long)]
        expired: bool,
    },

    /// Restore prior purchases
    Restore {
        /// Product identifiers the platform reports as restorable
        #[arg(default_values_t = [String::from("sub.monthly")])]
        products: Vec<String>,

        /// Inject one restoration failure alongside the successes
        #[arg(long)]
        fail_one: bool,

        /// Report an empty restore batch
        #[arg(long)]
        empty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let network = Arc::new(DemoNetwork {
        connected: !cli.offline,
    });

    match cli.command {
        Commands::Verify {
            products,
            no_cloud,
            expired,
        } => {
            let catalog: Vec<ProductId> = products.iter().map(ProductId::new).collect();
            let store = Arc::new(ReconciliationStore::new(catalog.clone()));
            let verifier = SubscriptionVerifier::new(
                store.clone(),
                network,
                Arc::new(DemoCloud {
                    available: !no_cloud,
                }),
                Arc::new(DemoFetcher),
                Arc::new(DemoValidator::with_subscriptions(&catalog, expired)),
            );

            match verifier.verify_all(catalog).await {
                Ok(()) => {
                    for item in store.snapshot() {
                        let state = if item.subscribed { "active" } else { "inactive" };
                        match item.expiry_date {
                            Some(expiry) => {
                                println!("{}: {} (expires {})", item.product_id, state, expiry)
                            }
                            None => println!("{}: {}", item.product_id, state),
                        }
                    }
                    println!("fully processed: {}", store.is_fully_processed());
                }
                Err(err) => println!("sweep failed: {err}"),
            }
        }

        Commands::Purchase {
            product,
            cancel,
            expired,
        } => {
            let product = ProductId::new(product);
            let orchestrator = PurchaseOrchestrator::new(
                Arc::new(DemoPaymentClient::new(cancel)),
                network,
                Arc::new(DemoFetcher),
                Arc::new(DemoValidator::with_subscriptions(
                    std::slice::from_ref(&product),
                    expired,
                )),
            );

            match orchestrator.purchase(&product).await {
                Ok(outcome) => println!(
                    "purchased {} (expires {})",
                    outcome.product_id, outcome.expiry_date
                ),
                Err(err) => println!("purchase failed: {err}"),
            }
        }

        Commands::Restore {
            products,
            fail_one,
            empty,
        } => {
            let catalog: Vec<ProductId> = products.iter().map(ProductId::new).collect();
            let payment = if empty {
                DemoPaymentClient::new(false)
            } else {
                DemoPaymentClient::new(false).with_restorable(&catalog, fail_one)
            };
            let orchestrator = RestoreOrchestrator::new(Arc::new(payment), network);

            match orchestrator.restore().await {
                Ok(RestoreOutcome::Restored(purchases)) => {
                    for purchase in purchases {
                        println!("restored {}", purchase.product_id);
                    }
                }
                Ok(RestoreOutcome::PartiallyFailed(failures)) => {
                    println!("restore partially failed:");
                    for failure in failures {
                        match failure.message {
                            Some(msg) => println!("  {} ({})", failure.cause, msg),
                            None => println!("  {}", failure.cause),
                        }
                    }
                }
                Ok(RestoreOutcome::NothingToRestore) => println!("nothing to restore"),
                Err(err) => println!("restore failed: {err}"),
            }
        }
    }

    Ok(())
}
