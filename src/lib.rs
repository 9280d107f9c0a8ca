#![doc = "cloud-utilities: convenience helpers over Firebase Storage and Cloud Firestore."]

//! Upload a file and get its download URL, update a user document, convert
//! between CSV text and JSON records, and sort records by name.
//!
//! # Usage
//! Build a [`Utilities`] facade, call [`Utilities::init`] with a vendor app
//! (e.g. [`firebase::FirebaseApp`]) to enable the storage and database helpers.
//! Sorting and CSV conversion work without initialisation.

pub mod cli;
pub mod config;
pub mod contract;
pub mod csv;
pub mod error;
pub mod firebase;
pub mod gateway;
pub mod load_config;
pub mod record;
pub mod sink;
pub mod utilities;

pub use cli::{run, Cli, Commands};
pub use error::{UtilitiesError, UtilitiesResult};
pub use record::Record;
pub use utilities::{FirebaseOptions, Options, Utilities, VendorHandles};
