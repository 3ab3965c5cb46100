//! Dictionary session, tenant-aware compiled-model cache, and bootstrap.
//!
//! This crate ties the dictionary together for its consumers:
//!
//! - [`DictionarySession`]: the explicit registry handle owning the
//!   per-tenant raw-model store, the compiled-dictionary cache, label
//!   bundles, registered constraints, and change observers. All compiler
//!   and cache operations go through a session; there is no process-wide
//!   static state.
//! - The per-tenant cache refreshes asynchronously with at-most-one build
//!   in flight per tenant, serves stale-but-valid data to readers during
//!   refresh, and falls back to caller-runs when its bounded worker pool
//!   is exhausted.
//! - [`DictionaryBootstrap`]: ordered, all-or-nothing loading of model
//!   resources and label bundles at startup.
//!
//! # Example
//!
//! ```
//! use cm_core::{ClassDecl, ModelSchema, PropertyDecl, QName, Tenant};
//! use cm_registry::DictionarySession;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = DictionarySession::default();
//! let tenant = Tenant::default();
//!
//! let mut schema = ModelSchema::new("ex:example");
//! schema.add_namespace("http://ns.example.org/model/1.0", "ex");
//! schema.add_import("urn:cm:datatype/1.0", "d");
//! let mut doc = ClassDecl::new("ex:document");
//! doc.properties.push(PropertyDecl::new("ex:title", "d:text"));
//! schema.types.push(doc);
//!
//! session.put_model(&tenant, schema)?;
//!
//! let dictionary = session.get_dictionary(&tenant).await.map_err(|e| e.to_string())?;
//! let name = QName::new("http://ns.example.org/model/1.0", "document");
//! assert!(dictionary.type_def(&name).is_some());
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod cache;
mod error;
mod session;
mod store;

pub use bootstrap::{BootstrapError, DictionaryBootstrap, ModelResource};
pub use cache::{CacheStats, CacheStatsSnapshot, DEFAULT_REFRESH_WORKERS};
pub use error::RegistryError;
pub use session::{
    ConstraintValidator, DictionarySession, ModelChangeObserver, SessionConfig,
};
