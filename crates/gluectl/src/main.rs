use anyhow::{bail, Context, Result};
use cipher_glue::{AeadRequest, GlueConfig, Registry, ScatterList, SkcipherRequest};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::sync::Once;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let format = std::env::var("GLUE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

        if format.eq_ignore_ascii_case("json") {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter.clone())
                .with_target(true)
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact()
                .init();
        }
    });
}

#[derive(Parser)]
#[command(name = "gluectl")]
#[command(about = "AES scatter-gather glue control utility", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults to GLUE_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register every enabled algorithm and report the result
    Selftest {
        /// Print the loaded algorithms as JSON
        #[arg(long)]
        json: bool,
    },
    /// Encrypt hex input, printing hex output
    Encrypt(CryptArgs),
    /// Decrypt hex input, printing hex output
    Decrypt(CryptArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Cbc,
    Cfb,
    Gcm,
    Xts,
}

impl Mode {
    fn algorithm(self) -> &'static str {
        match self {
            Mode::Cbc => "cbc(aes)",
            Mode::Cfb => "cfb(aes)",
            Mode::Gcm => "gcm(aes)",
            Mode::Xts => "xts(aes)",
        }
    }
}

#[derive(Args)]
struct CryptArgs {
    /// Cipher mode
    #[arg(long, value_enum)]
    mode: Mode,
    /// Key, hex encoded
    #[arg(long)]
    key: String,
    /// IV or tweak, hex encoded (12 bytes for GCM, 16 otherwise)
    #[arg(long)]
    iv: String,
    /// Input, hex encoded. For GCM decryption this includes the tag.
    #[arg(long)]
    input: String,
    /// Associated data for GCM, hex encoded
    #[arg(long, default_value = "")]
    aad: String,
    /// GCM tag length in bytes
    #[arg(long)]
    authsize: Option<usize>,
    /// Comma-separated segment sizes used to scatter the source
    #[arg(long, value_delimiter = ',')]
    segments: Vec<usize>,
}

fn load_config(path: Option<&PathBuf>) -> Result<GlueConfig> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            GlueConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))
        }
        None => GlueConfig::from_env().context("reading GLUE_* environment"),
    }
}

fn decode(label: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).with_context(|| format!("--{label} is not valid hex"))
}

fn selftest(registry: &mut Registry, json: bool) -> Result<()> {
    registry
        .register_all()
        .context("self-test gated registration failed")?;

    let loaded = registry.loaded();
    if json {
        println!("{}", serde_json::to_string_pretty(&loaded)?);
        return Ok(());
    }

    for summary in &loaded {
        println!(
            "{:<10} {:<36} priority {}",
            summary.name, summary.driver_name, summary.priority
        );
    }
    info!(count = loaded.len(), "all enabled algorithms registered");
    Ok(())
}

fn crypt(registry: &mut Registry, args: &CryptArgs, encrypt: bool) -> Result<Vec<u8>> {
    registry
        .register_all()
        .context("self-test gated registration failed")?;

    let key = decode("key", &args.key)?;
    let iv = decode("iv", &args.iv)?;
    let input = decode("input", &args.input)?;
    let name = args.mode.algorithm();

    if let Mode::Gcm = args.mode {
        let aad = decode("aad", &args.aad)?;
        let mut tfm = registry.alloc_aead(name)?;
        tfm.set_key(&key).context("setting GCM key")?;
        if let Some(authsize) = args.authsize {
            tfm.set_authsize(authsize)?;
        }

        let mut data = aad.clone();
        data.extend_from_slice(&input);
        let out_len = if encrypt {
            data.len() + tfm.authsize()
        } else {
            data.len().saturating_sub(tfm.authsize())
        };
        let src = ScatterList::split(&data, &args.segments);
        let mut dst = ScatterList::zeroed(&[out_len]);
        let mut req = AeadRequest::new(&src, &mut dst, aad.len(), input.len(), &iv);
        if encrypt {
            tfm.encrypt(&mut req)?;
        } else {
            tfm.decrypt(&mut req)?;
        }
        drop(req);
        return Ok(dst.to_vec().split_off(aad.len()));
    }

    if !args.aad.is_empty() || args.authsize.is_some() {
        bail!("--aad and --authsize only apply to gcm");
    }
    let iv: [u8; 16] = iv
        .as_slice()
        .try_into()
        .with_context(|| format!("{name} needs a 16-byte IV, got {} bytes", iv.len()))?;

    let mut tfm = registry.alloc_skcipher(name)?;
    tfm.set_key(&key)
        .with_context(|| format!("setting {name} key"))?;

    let src = ScatterList::split(&input, &args.segments);
    let mut dst = ScatterList::zeroed(&[input.len()]);
    let mut req = SkcipherRequest::new(&src, &mut dst, input.len(), iv);
    if encrypt {
        tfm.encrypt(&mut req)?;
    } else {
        tfm.decrypt(&mut req)?;
    }
    drop(req);
    Ok(dst.to_vec())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let mut registry = Registry::new(config)?;

    match &cli.command {
        Commands::Selftest { json } => selftest(&mut registry, *json)?,
        Commands::Encrypt(args) => println!("{}", hex::encode(crypt(&mut registry, args, true)?)),
        Commands::Decrypt(args) => println!("{}", hex::encode(crypt(&mut registry, args, false)?)),
    }

    Ok(())
}
