use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iconbg::{ArchiveFailurePolicy, LoaderConfig, PageLoader, StructuredValue};

#[derive(Parser)]
#[command(name = "iconbg", version, about = "Decode and build icon background page URLs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a page URL and print the page data as JSON
    Decode {
        /// Request URL (absolute, or a bare `?query`)
        url: String,
        /// Treat unreadable icon archives as empty instead of failing
        #[arg(long)]
        degrade: bool,
        /// Archive entry holding the icon configs
        #[arg(long, default_value = iconbg::archive::DEFAULT_ENTRY_NAME)]
        entry: String,
        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// Pack a JSON file of icon configs into a page URL
    Encode {
        /// JSON file holding a list of icon configs
        file: std::path::PathBuf,
        /// Page URL to attach the `options` parameter to
        #[arg(long, default_value = "http://localhost/")]
        base: String,
        /// Archive entry to store the icon configs under
        #[arg(long, default_value = iconbg::archive::DEFAULT_ENTRY_NAME)]
        entry: String,
    },
}

fn decode(url: &str, degrade: bool, entry: String, compact: bool) -> Result<()> {
    let config = LoaderConfig {
        entry_name: entry,
        archive_failure: if degrade {
            ArchiveFailurePolicy::Degrade
        } else {
            ArchiveFailurePolicy::Fail
        },
        ..Default::default()
    };
    let page = PageLoader::new(config)
        .load_url(url)
        .with_context(|| format!("failed to load {}", url))?;

    let out = if compact {
        serde_json::to_string(&page)?
    } else {
        serde_json::to_string_pretty(&page)?
    };
    println!("{}", out);
    Ok(())
}

fn encode(file: &std::path::Path, base: &str, entry: &str) -> Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let configs: Vec<iconbg::IconConfig> = serde_json::from_str(&data)
        .with_context(|| format!("{} does not hold a JSON list", file.display()))?;

    let packed = iconbg::archive::pack_icon_configs(&configs, entry)?;
    let options = StructuredValue::Object(vec![(
        iconbg::page::CONFIGS_KEY.to_string(),
        StructuredValue::String(packed),
    )]);

    let mut url = iconbg::parse_request_url(base)?;
    url.query_pairs_mut().append_pair(
        iconbg::page::OPTIONS_KEY,
        &iconbg::superjson::stringify(&options),
    );
    println!("{}", url);
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let res = match cli.command {
        Command::Decode {
            url,
            degrade,
            entry,
            compact,
        } => decode(&url, degrade, entry, compact),
        Command::Encode { file, base, entry } => encode(&file, &base, &entry),
    };

    if let Err(e) = res {
        eprintln!("iconbg: {:#}", e);
        std::process::exit(1);
    }
}
