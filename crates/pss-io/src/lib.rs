//! # pss-io: sources and stores for the PSS loader
//!
//! Everything that touches the outside world lives here:
//!
//! - [`tabular`] - spreadsheet workbooks and CSV sheets as [`pss_core::SourceRow`]s
//! - [`schema`] - required-column checks per sheet kind
//! - [`store`] - the [`store::DocumentStore`] trait, the Firestore REST client
//!   and an in-memory fake
//! - [`wire`] - Firestore value encoding
//! - [`credentials`] - store credentials from a file or the environment
//!
//! ## Reading a sheet
//!
//! ```rust,no_run
//! use pss_io::tabular::Workbook;
//!
//! let mut book = Workbook::open("33KV_PSS_Manpower.xlsx")?;
//! let sheet = book.sheet("Sheet1")?;
//! pss_io::schema::STATION.check(sheet.name(), sheet.headers())?;
//! for row in sheet.rows() {
//!     let row = row?;
//!     println!("line {}: {:?}", row.line(), row.get("PSS NAME"));
//! }
//! # Ok::<(), pss_core::PssError>(())
//! ```

pub mod credentials;
pub mod schema;
pub mod store;
pub mod tabular;
pub mod wire;

pub use credentials::{resolve_credentials, Credentials};
pub use store::{DocumentStore, FirestoreConfig, FirestoreStore, MemoryStore, StoreAuth};
pub use tabular::{Sheet, Workbook};
