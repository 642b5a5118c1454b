use crate::econya_conf;
use crate::econya_domain::{Catalog, Deal, Ledger};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

pub const CATALOG_FILE: &str = "deals.json";
pub const LEDGER_FILE: &str = "deals-stats.json";

static STORE: LazyLock<Arc<FsStore>> =
    LazyLock::new(|| Arc::new(FsStore::new(econya_conf::ECONYA_DATA_DIR.as_str())));

pub fn bootstrap() -> Result<(), SaveError> {
    STORE.seed()
}

pub fn get_store() -> Arc<FsStore> {
    STORE.clone()
}

#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error("serde")]
    Serde(#[from] serde_json::Error),
    #[error("io")]
    IO(#[from] io::Error),
}

/// Both backing documents are loaded on demand and masked to their zero
/// value on failure, but "never been written" and "written then mangled"
/// are different situations; only the latter is worth a warning.
enum LoadOutcome<T> {
    Loaded(T),
    Absent,
    Corrupt,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> LoadOutcome<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return LoadOutcome::Absent,
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "unreadable store file");
            return LoadOutcome::Corrupt;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => LoadOutcome::Loaded(value),
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "corrupt store file");
            LoadOutcome::Corrupt
        }
    }
}

// Temp file + rename in the same directory, so readers only ever observe a
// complete document.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), SaveError> {
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");

    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;

    Ok(())
}

/// Storage seam for the request handlers. The production implementation is
/// [`FsStore`]; tests substitute an in-memory one.
pub trait Store: Send + Sync {
    fn load_catalog(&self) -> Catalog;
    fn load_ledger(&self) -> Ledger;
    fn record_click(&self, deal_id: &str, saving: f64) -> Result<Ledger, SaveError>;
}

pub struct FsStore {
    catalog_path: PathBuf,
    ledger_path: PathBuf,
    ledger_lock: Mutex<()>,
}

impl FsStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();

        Self {
            catalog_path: data_dir.join(CATALOG_FILE),
            ledger_path: data_dir.join(LEDGER_FILE),
            ledger_lock: Mutex::new(()),
        }
    }

    /// First-run seeding: create the data directory and default documents.
    /// Idempotent; an existing file is never overwritten.
    pub fn seed(&self) -> Result<(), SaveError> {
        if let Some(dir) = self.catalog_path.parent() {
            fs::create_dir_all(dir)?;
        }

        if !self.catalog_path.exists() {
            tracing::info!(path = %self.catalog_path.display(), "seeding deal catalog");
            write_json(&self.catalog_path, &default_catalog())?;
        }
        if !self.ledger_path.exists() {
            tracing::info!(path = %self.ledger_path.display(), "seeding click ledger");
            write_json(&self.ledger_path, &Ledger::default())?;
        }

        Ok(())
    }

    fn save_ledger(&self, ledger: &Ledger) -> Result<(), SaveError> {
        write_json(&self.ledger_path, ledger)
    }
}

impl Store for FsStore {
    fn load_catalog(&self) -> Catalog {
        match read_json(&self.catalog_path) {
            LoadOutcome::Loaded(catalog) => catalog,
            LoadOutcome::Absent | LoadOutcome::Corrupt => Catalog::default(),
        }
    }

    fn load_ledger(&self) -> Ledger {
        match read_json(&self.ledger_path) {
            LoadOutcome::Loaded(ledger) => ledger,
            LoadOutcome::Absent | LoadOutcome::Corrupt => Ledger::default(),
        }
    }

    fn record_click(&self, deal_id: &str, saving: f64) -> Result<Ledger, SaveError> {
        // Load+increment+save must not interleave between requests, or
        // concurrent clicks get lost.
        let _guard = self
            .ledger_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut ledger = self.load_ledger();
        ledger.record_click(deal_id, saving);
        self.save_ledger(&ledger)?;

        Ok(ledger)
    }
}

fn default_catalog() -> Catalog {
    let deal = |id: &str, label: &str, partner: &str, link: &str, saving: f64, category: &str| {
        Deal {
            id: id.into(),
            label: label.into(),
            partner: partner.into(),
            link: Some(link.into()),
            saving,
            category: category.into(),
            country: "FR".into(),
        }
    };

    Catalog {
        deals: vec![
            deal(
                "energy-eco",
                "Électricité verte -10%",
                "EnerGreen",
                "https://example.com/aff/energreen",
                120.0,
                "energie",
            ),
            deal(
                "mobile-5g",
                "Forfait 5G 80 Go",
                "MobiZen",
                "https://example.com/aff/mobizen",
                96.0,
                "telecom",
            ),
            deal(
                "bank-cashback",
                "Compte courant + cashback",
                "NeoBanque",
                "https://example.com/aff/neobanque",
                60.0,
                "banque",
            ),
        ],
    }
}
