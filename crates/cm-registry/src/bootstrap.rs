//! Ordered, all-or-nothing dictionary bootstrap.
//!
//! [`DictionaryBootstrap`] loads an ordered list of model resources (plus
//! label bundles) into a session at startup. The whole batch is staged
//! first (every model must parse, compile, and register its namespaces
//! without a clash) and committed only when staging succeeds. A failed
//! bootstrap leaves no partially-initialized dictionary state reachable
//! by any later read.

use camino::Utf8PathBuf;
use cm_compiler::{CompileError, ModelCompiler, resolve_model_name};
use cm_core::{NamespaceError, Tenant};
use cm_parser::{ParseError, parse_bundle, parse_model};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::session::{DictionarySession, build_dictionary};
use crate::store::{StoredModel, upsert};

/// A bootstrap resource: a file on disk or an inline document.
#[derive(Debug, Clone)]
pub enum ModelResource {
    /// Load the document from a file.
    Path(Utf8PathBuf),
    /// Use an inline document, labelled for diagnostics.
    Inline {
        /// Diagnostic label for error messages.
        label: String,
        /// The document source.
        source: String,
    },
}

impl ModelResource {
    /// Creates a file-backed resource.
    #[must_use]
    pub fn path(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Creates an inline resource.
    #[must_use]
    pub fn inline(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self::Inline {
            label: label.into(),
            source: source.into(),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Path(path) => path.to_string(),
            Self::Inline { label, .. } => label.clone(),
        }
    }

    fn read(&self) -> Result<String, BootstrapError> {
        match self {
            Self::Path(path) => {
                std::fs::read_to_string(path.as_std_path()).map_err(|source| {
                    BootstrapError::Io {
                        path: path.clone(),
                        source,
                    }
                })
            }
            Self::Inline { source, .. } => Ok(source.clone()),
        }
    }
}

/// Errors that fail the whole bootstrap batch.
///
/// No partial registration ever happens: the first failure aborts the
/// batch before anything is committed to the session.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// A model resource could not be read.
    #[error("failed to read bootstrap resource '{path}': {source}")]
    Io {
        /// The unreadable path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A model document failed to parse.
    #[error("bootstrap model '{resource}' failed to parse: {source}")]
    ModelNotParsed {
        /// The offending resource.
        resource: String,
        /// The parse failure.
        #[source]
        source: ParseError,
    },

    /// A model failed compilation because of a cyclic dependency.
    #[error("bootstrap model '{resource}' could not be imported: {source}")]
    ModelNotImported {
        /// The offending resource.
        resource: String,
        /// The cyclic-inheritance failure.
        #[source]
        source: RegistryError,
    },

    /// A model failed compilation for a non-cyclic reason.
    #[error("bootstrap model '{resource}' failed to compile: {source}")]
    ModelNotCompiled {
        /// The offending resource.
        resource: String,
        /// The compile failure.
        #[source]
        source: RegistryError,
    },

    /// A model's namespace prefixes clashed with another model.
    ///
    /// Prefix resolution is dictionary-wide, so a clash fails the whole
    /// batch, not just the offending model.
    #[error("bootstrap model '{resource}' clashes on a namespace prefix: {source}")]
    NamespaceClash {
        /// The offending resource.
        resource: String,
        /// The clash.
        #[source]
        source: NamespaceError,
    },

    /// A label bundle failed to parse.
    #[error("bootstrap label bundle '{resource}' failed to parse: {source}")]
    LabelsNotParsed {
        /// The offending resource.
        resource: String,
        /// The parse failure.
        #[source]
        source: ParseError,
    },
}

impl BootstrapError {
    /// Returns the stable, machine-checkable identifier for this error.
    ///
    /// Cyclic-dependency failures are distinguished from other compile
    /// failures.
    #[must_use]
    pub const fn message_id(&self) -> &'static str {
        match self {
            Self::Io { .. } => "dictionary.bootstrap.resource_io",
            Self::ModelNotParsed { .. } => "dictionary.bootstrap.model_not_parsed",
            Self::ModelNotImported { .. } => "dictionary.bootstrap.model_not_imported",
            Self::ModelNotCompiled { .. } => "dictionary.bootstrap.model_not_compiled",
            Self::NamespaceClash { .. } => "dictionary.namespace.prefix_clash",
            Self::LabelsNotParsed { .. } => "dictionary.bootstrap.labels_not_parsed",
        }
    }
}

/// Orchestrates ordered loading of model resources into a session.
///
/// # Examples
///
/// ```
/// use cm_registry::{DictionaryBootstrap, DictionarySession, ModelResource};
///
/// let session = DictionarySession::default();
/// let mut bootstrap = DictionaryBootstrap::new();
/// bootstrap.add_model(ModelResource::inline(
///     "example",
///     r#"{
///         "name": "ex:example",
///         "namespaces": [{"uri": "http://ns.example.org/model/1.0", "prefix": "ex"}]
///     }"#,
/// ));
/// bootstrap.bootstrap(&session)?;
/// # Ok::<(), cm_registry::BootstrapError>(())
/// ```
#[derive(Debug, Default)]
pub struct DictionaryBootstrap {
    tenant: Tenant,
    models: Vec<ModelResource>,
    labels: Vec<ModelResource>,
}

impl DictionaryBootstrap {
    /// Creates a bootstrap for the default tenant.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bootstrap for a specific tenant.
    #[must_use]
    pub fn for_tenant(tenant: Tenant) -> Self {
        Self {
            tenant,
            ..Self::default()
        }
    }

    /// Appends a model resource. Order is significant: a model's imports
    /// must be satisfied by models earlier in the list (or already
    /// registered).
    pub fn add_model(&mut self, resource: ModelResource) {
        self.models.push(resource);
    }

    /// Appends a label bundle resource.
    pub fn add_label_bundle(&mut self, resource: ModelResource) {
        self.labels.push(resource);
    }

    /// Stages and commits the batch into the session.
    ///
    /// # Errors
    ///
    /// Fails the entire batch, committing nothing, if any model fails
    /// to read, parse, or compile, or introduces a namespace-prefix
    /// clash. The error identifier distinguishes cyclic-dependency
    /// failures (`dictionary.bootstrap.model_not_imported`) from other
    /// compile failures.
    pub fn bootstrap(&self, session: &DictionarySession) -> Result<(), BootstrapError> {
        info!(
            tenant = %self.tenant,
            models = self.models.len(),
            label_bundles = self.labels.len(),
            "Bootstrapping dictionary"
        );

        // Stage on top of whatever the tenant already has registered.
        let mut staged = session.store_snapshot(&self.tenant).models;

        for resource in &self.models {
            let label = resource.label();
            let source = resource.read()?;
            let schema = parse_model(&source).map_err(|source| {
                BootstrapError::ModelNotParsed {
                    resource: label.clone(),
                    source,
                }
            })?;
            let name = resolve_model_name(&schema)
                .map_err(|source| stage_failure(&label, source.into()))?;
            debug!(model = %schema.name, resource = %label, "Staged bootstrap model");
            upsert(&mut staged, StoredModel { name, schema });
        }

        // Compile the whole staged set in order; any failure aborts the
        // batch before anything becomes visible.
        let dictionary =
            build_dictionary(&staged).map_err(|error| stage_failure("<staged batch>", error))?;

        let mut bundles = Vec::with_capacity(self.labels.len());
        for resource in &self.labels {
            let label = resource.label();
            let source = resource.read()?;
            let bundle = parse_bundle(&source).map_err(|source| {
                BootstrapError::LabelsNotParsed {
                    resource: label,
                    source,
                }
            })?;
            bundles.push(bundle);
        }

        let model_count = staged.len();
        session.apply_bootstrap(&self.tenant, staged, dictionary, bundles);
        info!(tenant = %self.tenant, models = model_count, "Bootstrap committed");
        Ok(())
    }
}

fn stage_failure(resource: &str, error: RegistryError) -> BootstrapError {
    let resource = resource.to_owned();
    match error {
        RegistryError::Namespace(source) => BootstrapError::NamespaceClash { resource, source },
        RegistryError::Compile(CompileError::Namespace(
            source @ NamespaceError::PrefixClash { .. },
        )) => BootstrapError::NamespaceClash { resource, source },
        RegistryError::Parse(source) => BootstrapError::ModelNotParsed { resource, source },
        error if error.is_cyclic() => BootstrapError::ModelNotImported {
            resource,
            source: error,
        },
        error => BootstrapError::ModelNotCompiled {
            resource,
            source: error,
        },
    }
}
