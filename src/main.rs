use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use trellis::dump::outcome_to_json;
use trellis::logging::{LoggingConfig, init_logging};
use trellis::traits::ResourceError;
use trellis::{
    BxmlLoader, DictionaryFactory, FilesystemResourceProvider, JsonBundleLoader,
    JsonResourceBundle, LoadError, Locale, NativeScriptEngine, ResourceBundle, ScriptEngineManager,
};

/// Loads a BXML document and prints its object tree and ids as JSON.
///
/// Every instance element becomes a generic dictionary tagged with its type
/// name, so any well-formed document can be inspected without a schema.
#[derive(Parser, Debug)]
#[command(name = "trellis", version)]
struct Cli {
    /// The document to load.
    document: PathBuf,

    /// JSON resource bundle consulted for `%key` attribute values.
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Locale for bundles named by includes, e.g. `en_GB`. Defaults to the environment.
    #[arg(long)]
    locale: Option<String>,

    /// Character set of the document and its includes.
    #[arg(long, default_value = "UTF-8")]
    charset: String,

    /// Log filter, e.g. `debug` or `trellis_loader=debug`.
    #[arg(long)]
    log: Option<String>,

    /// Print compact JSON.
    #[arg(long)]
    compact: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let document = cli.document.canonicalize().map_err(|source| CliError::Io {
        path: cli.document.clone(),
        source,
    })?;
    let base = document.parent().unwrap_or(&document);
    let provider = Arc::new(FilesystemResourceProvider::new(base));
    let root = provider.root_location()?;
    let file_name = document
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let location = provider.location_of(&file_name)?;

    let locale = match &cli.locale {
        Some(tag) => Locale::parse(tag),
        None => Locale::from_env(),
    };
    let bundle_loader = JsonBundleLoader::new(provider.clone(), root.clone()).with_locale(locale);

    // Scripts cannot run here; a placeholder engine makes them log instead of failing.
    let engine = Rc::new(NativeScriptEngine::new(trellis::loader::DEFAULT_LANGUAGE));
    let engines = ScriptEngineManager::new().register(engine, &["js"], &["js"]);

    let mut builder = BxmlLoader::builder()
        .with_type_factory(Rc::new(DictionaryFactory))
        .with_script_engines(Rc::new(engines))
        .with_resource_provider(provider)
        .with_bundle_loader(Rc::new(bundle_loader))
        .with_root_location(root)
        .with_charset(cli.charset.clone());

    if let Some(path) = &cli.resources {
        builder = builder.with_resources(read_bundle(path)?);
    }

    let outcome = builder.build()?.load_url(&location)?;
    log::info!("Loaded {} with {} id(s)", location, outcome.namespace.len());

    let json = outcome_to_json(&outcome);
    let rendered = if cli.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    println!("{rendered}");
    Ok(())
}

fn read_bundle(path: &PathBuf) -> Result<Rc<dyn ResourceBundle>, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Io {
        path: path.clone(),
        source,
    })?;
    let bundle = JsonResourceBundle::from_slice(&bytes)?;
    log::debug!("Read bundle {}", path.display());
    Ok(Rc::new(bundle))
}
