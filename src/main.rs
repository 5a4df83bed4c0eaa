//! S3 Photo Vault - CLI
//!
//! Command-line front end for signing, presigning and envelope operations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};

use s3_photo_vault::crypto::md5;
use s3_photo_vault::sigv4::HttpMethod;
use s3_photo_vault::{Configuration, ContentCipher, ObjectRequests, RequestSigner};

#[derive(Parser)]
#[command(name = "photo-vault")]
#[command(version = s3_photo_vault::VERSION)]
#[command(about = "S3 Photo Vault - client-side photo encryption and SigV4 signing")]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, default_value = "./photo-vault.json")]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Presigned URL for an object
    Presign {
        /// Object name under the configured prefix
        key: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: HttpMethod,

        /// Lifetime in seconds (defaults to presignExpirySecs)
        #[arg(short, long)]
        expires: Option<u64>,
    },

    /// Header-signed request for an object
    Sign {
        /// Object name under the configured prefix
        key: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: HttpMethod,
    },

    /// Print SSE-C headers for the configured passphrase
    SseHeaders,

    /// Encrypt a file with the configured passphrase
    Encrypt {
        input: PathBuf,
        output: PathBuf,
    },

    /// Decrypt a file sealed with the configured passphrase
    Decrypt {
        input: PathBuf,
        output: PathBuf,
    },

    /// Seal the configuration into a text envelope
    SealConfig {
        output: PathBuf,

        /// Passphrase protecting the sealed text
        #[arg(short, long)]
        passphrase: String,
    },

    /// Open a sealed configuration and write it as JSON
    OpenConfig {
        input: PathBuf,

        /// Passphrase protecting the sealed text
        #[arg(short, long)]
        passphrase: String,

        /// Where to write the opened configuration
        #[arg(short, long, default_value = "./photo-vault.json")]
        output: PathBuf,
    },

    /// MD5 of a file (hex and base64)
    Md5 { path: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Presign {
            key,
            method,
            expires,
        } => {
            let config = load_config(&cli.config)?;
            let requests = ObjectRequests::new(&config)?;

            let presigned = match method {
                HttpMethod::Get => requests.presign_get(&key, expires)?,
                HttpMethod::Put => requests.presign_put(&key, expires)?,
                HttpMethod::Head => requests.presign_head(&key, expires)?,
                HttpMethod::Delete => requests.presign_delete(&key, expires)?,
            };

            println!("🔗 {} {} (expires in {}s)", presigned.method, key, presigned.expires_in);
            println!("{}", presigned.url);
            if !presigned.required_headers.is_empty() {
                println!("Send with headers:");
                for (name, value) in &presigned.required_headers {
                    println!("   {}: {}", name, value);
                }
            }
        }

        Commands::Sign { key, method } => {
            let config = load_config(&cli.config)?;
            let requests = ObjectRequests::new(&config)?;

            let prepared = match method {
                HttpMethod::Get => requests.get_object(&key)?,
                HttpMethod::Head => requests.head_object(&key)?,
                HttpMethod::Delete => requests.delete_object(&key)?,
                HttpMethod::Put => requests.put_object(&key, &[])?,
            };

            println!("✍️  {} {}", prepared.method, prepared.url);
            for (name, value) in &prepared.headers {
                println!("   {}: {}", name, value);
            }
        }

        Commands::SseHeaders => {
            let config = load_config(&cli.config)?;
            let signer = RequestSigner::new(&config)?;

            match signer.customer_key_headers() {
                Some(headers) => {
                    println!("🔑 SSE-C headers:");
                    for (name, value) in headers.to_pairs() {
                        println!("   {}: {}", name, value);
                    }
                }
                None => println!("⚠️ customerKey is disabled in {}", cli.config.display()),
            }
        }

        Commands::Encrypt { input, output } => {
            let config = load_config(&cli.config)?;
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            println!("🔐 Encrypting {} ({} bytes)...", input.display(), data.len());
            let sealed = ContentCipher::new(&config).seal_bytes(&data)?;
            std::fs::write(&output, &sealed)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("✅ Sealed to {} ({} bytes)", output.display(), sealed.len());
        }

        Commands::Decrypt { input, output } => {
            let config = load_config(&cli.config)?;
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            println!("🔓 Decrypting {}...", input.display());
            let plain = ContentCipher::new(&config).open_bytes(&data)?;
            std::fs::write(&output, &plain)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("✅ Opened to {} ({} bytes)", output.display(), plain.len());
        }

        Commands::SealConfig { output, passphrase } => {
            let config = load_config(&cli.config)?;
            let sealed = config.seal(&passphrase)?;
            std::fs::write(&output, &sealed)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("✅ Sealed configuration written to {}", output.display());
        }

        Commands::OpenConfig {
            input,
            passphrase,
            output,
        } => {
            let sealed = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let config = Configuration::open_sealed(sealed.trim(), &passphrase)?;
            config.to_config_file().save(&output)?;

            println!("✅ Configuration opened");
            println!("   Endpoint: {}", config.endpoint());
            println!("   Bucket:   {}", config.bucket());
            println!("   Region:   {}", config.region());
            println!("   Written:  {}", output.display());
        }

        Commands::Md5 { path } => {
            let data =
                std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let digest = md5(&data);
            println!("{}  {}", hex::encode(digest), path.display());
            println!("base64: {}", STANDARD.encode(digest));
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Configuration> {
    let config = Configuration::from_file(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    log::debug!(
        "loaded configuration for bucket {} in {}",
        config.bucket(),
        config.region()
    );
    Ok(config)
}
