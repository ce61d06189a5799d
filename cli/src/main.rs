use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ballistic_board::catalog::{Catalog, Gadget, GadgetKind};
use ballistic_board::config::{BoardConfig, ConfigError};
use ballistic_board::persist::{CALLOUTS_KEY, CalloutOverrides, KeyValueStore, StorageError, load_json, save_json};
use ballistic_board::store::{BoardStore, Strategy};
use clap::{Args, Parser, Subcommand};


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store file {path} is not a JSON object of strings: {source}")]
    StoreFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("unknown map: {0}")]
    UnknownMap(String),
    #[error("unknown gadget kind: {0}")]
    UnknownKind(String),
    #[error("{0} strategies have broken references")]
    BrokenStrategies(usize),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "board-cli", about = "Inspect and maintain tactical board data")]
struct Cli {
    /// JSON file holding the board's key-value records.
    #[arg(long, env = "BALLISTIC_STORE", default_value = "ballistic-store.json")]
    store: PathBuf,

    /// Board configuration (JSON). Defaults apply when omitted.
    #[arg(long, env = "BALLISTIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List built-in maps.
    Maps,
    /// List built-in gadgets.
    Gadgets {
        #[arg(long)]
        kind: Option<String>,
    },
    Strategies(StrategiesCommand),
    Callouts(CalloutsCommand),
}

#[derive(Args, Debug)]
struct StrategiesCommand {
    #[command(subcommand)]
    command: StrategiesSubcommand,
}

#[derive(Subcommand, Debug)]
enum StrategiesSubcommand {
    List,
    Show { id: String },
    Delete { id: String },
    /// Report strategies whose map or gadget references are missing, or
    /// that exceed gadget limits.
    Check,
}

#[derive(Args, Debug)]
struct CalloutsCommand {
    #[command(subcommand)]
    command: CalloutsSubcommand,
}

#[derive(Subcommand, Debug)]
enum CalloutsSubcommand {
    /// Callouts with custom positions applied; overridden ones are marked `*`.
    Show {
        #[arg(long)]
        map: Option<String>,
    },
    /// Drop custom positions for one map, or for every map.
    Reset {
        #[arg(long)]
        map: Option<String>,
    },
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BoardConfig::from_json(&read_file(path)?)?,
        None => BoardConfig::default(),
    };
    let catalog = Catalog::builtin();

    match cli.command {
        Command::Maps => {
            run_maps(&catalog);
            Ok(())
        }
        Command::Gadgets { kind } => run_gadgets(&catalog, kind.as_deref()),
        Command::Strategies(cmd) => {
            let store = BoardStore::new(catalog, config, Box::new(FileStore::open(&cli.store)?));
            run_strategies(store, cmd)
        }
        Command::Callouts(cmd) => run_callouts(&cli.store, catalog, config, cmd),
    }
}

// =============================================================
// Commands
// =============================================================

fn run_maps(catalog: &Catalog) {
    for map in &catalog.maps {
        println!("{}\t{}\t{} callouts\t{} spike sites", map.id, map.name, map.callouts.len(), map.spike_sites.len());
    }
}

fn run_gadgets(catalog: &Catalog, kind: Option<&str>) -> Result<(), CliError> {
    let gadgets: Vec<&Gadget> = match kind {
        Some(name) => {
            let kind = GadgetKind::parse(name).ok_or_else(|| CliError::UnknownKind(name.to_owned()))?;
            catalog.gadgets_of_kind(kind).collect()
        }
        None => catalog.gadgets.iter().collect(),
    };
    for gadget in gadgets {
        let duration = if gadget.customizable {
            format!("{}s (customizable)", gadget.duration)
        } else {
            format!("{}s", gadget.duration)
        };
        println!("{}\t{}\t{}\t{duration}", gadget.id, gadget.kind.as_str(), gadget.name);
    }
    Ok(())
}

fn run_strategies(mut store: BoardStore, cmd: StrategiesCommand) -> Result<(), CliError> {
    match cmd.command {
        StrategiesSubcommand::List => {
            for s in store.saved_strategies() {
                println!(
                    "{}\t{}\t{}\t{}\t{} elements\t{}",
                    s.id,
                    s.name,
                    s.map,
                    s.side.as_str(),
                    s.elements.len(),
                    s.updated_at.to_rfc3339()
                );
            }
            Ok(())
        }
        StrategiesSubcommand::Show { id } => {
            let strategy = find_strategy(&store, &id)?;
            println!("{}", serde_json::to_string_pretty(strategy)?);
            Ok(())
        }
        StrategiesSubcommand::Delete { id } => {
            if !store.delete_strategy_persisted(&id)? {
                return Err(CliError::UnknownStrategy(id));
            }
            println!("deleted {id}");
            Ok(())
        }
        StrategiesSubcommand::Check => {
            let mut broken = 0;
            for strategy in store.saved_strategies() {
                let problems = check_strategy(store.catalog(), store.config(), strategy);
                if problems.is_empty() {
                    continue;
                }
                broken += 1;
                for problem in problems {
                    println!("{}\t{}\t{problem}", strategy.id, strategy.name);
                }
            }
            if broken > 0 {
                return Err(CliError::BrokenStrategies(broken));
            }
            println!("ok: {} strategies", store.saved_strategies().len());
            Ok(())
        }
    }
}

fn find_strategy<'a>(store: &'a BoardStore, id: &str) -> Result<&'a Strategy, CliError> {
    store
        .saved_strategies()
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| CliError::UnknownStrategy(id.to_owned()))
}

fn run_callouts(path: &Path, catalog: Catalog, config: BoardConfig, cmd: CalloutsCommand) -> Result<(), CliError> {
    match cmd.command {
        CalloutsSubcommand::Show { map } => {
            let store = BoardStore::new(catalog, config, Box::new(FileStore::open(path)?));
            let ids: Vec<String> = match map {
                Some(id) => vec![id],
                None => store.catalog().maps.iter().map(|m| m.id.clone()).collect(),
            };
            for id in ids {
                let map = store.map_with_custom_callouts(&id).ok_or_else(|| CliError::UnknownMap(id.clone()))?;
                let overrides = store.custom_callout_positions().get(&id);
                println!("{} ({})", map.name, map.id);
                for c in &map.callouts {
                    let marker = if overrides.is_some_and(|o| o.contains_key(&c.id)) { "*" } else { " " };
                    println!("  {marker} {}\t{}\t{:.1},{:.1}", c.id, c.name, c.position.x, c.position.y);
                }
            }
            Ok(())
        }
        CalloutsSubcommand::Reset { map } => {
            if let Some(id) = &map
                && catalog.map(id).is_none()
            {
                return Err(CliError::UnknownMap(id.clone()));
            }
            let mut file = FileStore::open(path)?;
            let removed = reset_callouts(&mut file, map.as_deref())?;
            println!("removed {removed} custom callout positions");
            Ok(())
        }
    }
}

// =============================================================
// Checks
// =============================================================

/// A broken reference or rule violation inside a saved strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum Problem {
    #[error("unknown map {0}")]
    UnknownMap(String),
    #[error("element {element} references unknown gadget {gadget_id}")]
    UnknownGadget { element: String, gadget_id: String },
    #[error("gadget {gadget_id} placed {count} times, limit {limit}")]
    OverLimit { gadget_id: String, count: usize, limit: usize },
}

fn check_strategy(catalog: &Catalog, config: &BoardConfig, strategy: &Strategy) -> Vec<Problem> {
    let mut problems = Vec::new();
    if catalog.map(&strategy.map).is_none() {
        problems.push(Problem::UnknownMap(strategy.map.clone()));
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for el in &strategy.elements {
        let Some(gadget_id) = el.gadget_id() else {
            continue;
        };
        if catalog.gadget(gadget_id).is_none() {
            problems.push(Problem::UnknownGadget { element: el.id.clone(), gadget_id: gadget_id.to_owned() });
        } else {
            *counts.entry(gadget_id).or_default() += 1;
        }
    }
    for (gadget_id, count) in counts {
        let limit = config.gadget_limit(gadget_id);
        if count > limit {
            problems.push(Problem::OverLimit { gadget_id: gadget_id.to_owned(), count, limit });
        }
    }
    problems
}

/// Remove callout overrides for `map` (or all maps). Returns how many
/// positions were dropped.
fn reset_callouts(store: &mut dyn KeyValueStore, map: Option<&str>) -> Result<usize, CliError> {
    let mut overrides: CalloutOverrides = load_json(store, CALLOUTS_KEY).unwrap_or_default();
    let removed = match map {
        Some(id) => overrides.remove(id).map_or(0, |positions| positions.len()),
        None => {
            let total = overrides.values().map(BTreeMap::len).sum();
            overrides.clear();
            total
        }
    };
    if removed > 0 {
        save_json(store, CALLOUTS_KEY, &overrides)?;
    }
    Ok(removed)
}

// =============================================================
// File-backed store
// =============================================================

/// Key-value records kept in one JSON object on disk. Every write rewrites
/// the file.
struct FileStore {
    path: PathBuf,
    records: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`; a missing file is an empty store.
    fn open(path: &Path) -> Result<Self, CliError> {
        let records = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|source| CliError::StoreFormat { path: path.to_owned(), source })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "store file missing; starting empty");
                BTreeMap::new()
            }
            Err(source) => return Err(CliError::Read { path: path.to_owned(), source }),
        };
        Ok(Self { path: path.to_owned(), records })
    }

    fn flush(&self, key: &str) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(&self.records)
            .map_err(|source| StorageError::Serialize { key: key.to_owned(), source })?;
        fs::write(&self.path, raw).map_err(|e| StorageError::Write { key: key.to_owned(), message: e.to_string() })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.records.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records.insert(key.to_owned(), value.to_owned());
        self.flush(key)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.records.remove(key).is_some() {
            self.flush(key)?;
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_owned(), source })
}
