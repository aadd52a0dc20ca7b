//! acme-testca CLI application.
//!
//! Bootstraps a throwaway certificate authority and issues certificates
//! through the same order-completion path an ACME test server would use.

use acme_testca::ca::CertificateAuthority;
use acme_testca::cert::certificate::Certificate;
use acme_testca::config::CaConfig;
use acme_testca::crypto::rsa_key::generate_rsa_key;
use acme_testca::error::{CaError, Result};
use acme_testca::order::csr::{encode_csr, ParsedCsr};
use acme_testca::order::{new_object_id, Authorization, Order, Status};
use acme_testca::storage::memory::MemoryStore;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "acme-testca")]
#[command(about = "Minimal test certificate authority", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a root and intermediate issuer and write their certificates
    Bootstrap {
        /// Output directory for root.pem and intermediate.pem
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Complete an order for the given domains and print the issued chain
    Issue {
        /// Domain name to include (repeatable; the first becomes the CN)
        #[arg(long = "domain", required = true)]
        domains: Vec<String>,

        /// Optional output file for the PEM chain (stdout otherwise)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output file for the root certificate the chain verifies against
        #[arg(long, default_value = "root.pem")]
        root_output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("acme_testca=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CaConfig::from_json_file(path)?,
        None => CaConfig::default(),
    };

    match cli.command {
        Commands::Bootstrap { out_dir } => handle_bootstrap(config, &out_dir),
        Commands::Issue {
            domains,
            output,
            root_output,
        } => handle_issue(config, domains, output.as_deref(), &root_output).map(|_| ()),
    }
}

fn handle_bootstrap(config: CaConfig, out_dir: &Path) -> Result<()> {
    let ca = CertificateAuthority::try_new(Arc::new(MemoryStore::new()), config)?;
    let (root, intermediate) = issuers(&ca)?;

    fs::create_dir_all(out_dir)?;
    let root_path = out_dir.join("root.pem");
    let intermediate_path = out_dir.join("intermediate.pem");
    fs::write(&root_path, root.to_pem())?;
    fs::write(&intermediate_path, intermediate.to_pem())?;

    println!("✓ Created root certificate: {}", root_path.display());
    println!("  Serial: {}", root.id());
    println!(
        "✓ Created intermediate certificate: {}",
        intermediate_path.display()
    );
    println!("  Serial: {}", intermediate.id());

    Ok(())
}

fn handle_issue(
    config: CaConfig,
    domains: Vec<String>,
    output: Option<&Path>,
    root_output: &Path,
) -> Result<Arc<Certificate>> {
    let ca = CertificateAuthority::try_new(Arc::new(MemoryStore::new()), config)?;
    let (root, _) = issuers(&ca)?;
    fs::write(root_output, root.to_pem())?;
    eprintln!("✓ Wrote root certificate: {}", root_output.display());

    let subject_key = generate_rsa_key(ca.config().key_bits)?;
    let csr = ParsedCsr::from_der(&encode_csr(&subject_key, &domains)?)?;

    let authorizations = domains
        .iter()
        .map(|domain| {
            Authorization::new(new_object_id(), domain.clone())
                .with_status(Status::Valid)
                .shared()
        })
        .collect();
    let order = Order::new(new_object_id(), csr, authorizations).shared();

    ca.complete_order(&order);

    let order = order
        .lock()
        .map_err(|e| CaError::CertificateError(format!("Order lock poisoned: {}", e)))?;
    let cert = match (&order.status, &order.certificate) {
        (Status::Valid, Some(cert)) => cert.clone(),
        (status, _) => {
            return Err(CaError::CertificateError(format!(
                "Order {} did not complete (status {})",
                order.id, status
            )))
        }
    };

    let chain = cert.chain_pem();
    match output {
        Some(path) => {
            fs::write(path, &chain)?;
            println!("✓ Issued certificate: {}", path.display());
        }
        None => print!("{}", chain),
    }
    eprintln!("  Serial: {}", cert.id());
    eprintln!("  Names: {}", cert.dns_names()?.join(", "));

    Ok(cert)
}

fn issuers(ca: &CertificateAuthority) -> Result<(Arc<Certificate>, Arc<Certificate>)> {
    match (ca.root_certificate(), ca.intermediate_certificate()) {
        (Some(root), Some(intermediate)) => Ok((root.clone(), intermediate.clone())),
        _ => Err(CaError::Precondition(
            "certificate authority has no issuer chain".to_string(),
        )),
    }
}
