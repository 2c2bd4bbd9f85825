//! Factorio integration for mapshot
//!
//! This crate knows where a Factorio installation keeps its files, how the
//! `mod-list.json` document is shaped, and how to run the game as a
//! supervised, cancellable child process.
//!
//! # Example
//!
//! ```rust,no_run
//! use mapshot_factorio::{launch_args, Factorio, FactorioSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let factorio = Factorio::new(&FactorioSettings::default())?;
//!     let cancel = CancellationToken::new();
//!
//!     let args = launch_args(&factorio.save_file("base"), &factorio.mods_dir());
//!     let process = factorio.executor().launch(args, cancel.clone())?;
//!
//!     cancel.cancel();
//!     println!("Factorio {}", process.await?);
//!     Ok(())
//! }
//! ```

mod error;
mod executor;
mod modlist;
mod settings;

// Re-export main types
pub use error::FactorioError;
pub use executor::{launch_args, FactorioExecutor, FactorioProcess};
pub use modlist::{ModEntry, ModList, MOD_LIST_FILE};
pub use settings::{Factorio, FactorioSettings};
