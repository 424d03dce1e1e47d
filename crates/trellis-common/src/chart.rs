//! Chart: the document tree that owns resource identity and synthesis
//!
//! Resources are added under a chart-unique id. The chart assigns each one a
//! stable name, namespace and labels, then keeps a deferred producer for its
//! document. Callers keep mutating resources through the returned [`Handle`];
//! nothing is resolved until [`Chart::synth`] runs.
//!
//! ```rust,ignore
//! let mut chart = Chart::new("shop").with_namespace("prod");
//! let web = chart.add("web", Deployment::new(DeploymentProps::default()))?;
//! web.borrow_mut().add_container(ContainerProps::new("nginx"))?;
//! let manifest = chart.synth()?;
//! manifest.write_to("dist")?;
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{BoxError, Error};
use crate::lazy::Lazy;
use crate::meta::ObjectMeta;
use crate::names::unique_name;
use crate::Result;

// =============================================================================
// ApiObject
// =============================================================================

/// A resource that can live in a chart.
///
/// `to_spec` is the resource's resolution function. It runs at synthesis time
/// and must not mutate builder state.
pub trait ApiObject {
    /// API version, e.g. `apps/v1`
    const API_VERSION: &'static str;
    /// Kind, e.g. `Deployment`
    const KIND: &'static str;

    /// Resource metadata
    fn metadata(&self) -> &ObjectMeta;

    /// Mutable resource metadata
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Resolve the resource's `spec` field
    fn to_spec(&self) -> std::result::Result<Value, BoxError>;
}

// =============================================================================
// Handle
// =============================================================================

/// Shared handle to a resource owned by a chart.
///
/// Single-threaded by construction: the chart and the caller share the
/// resource, and the chart only reads it during synthesis.
pub struct Handle<R> {
    inner: Rc<RefCell<R>>,
}

impl<R> Handle<R> {
    fn new(resource: R) -> Self {
        Self {
            inner: Rc::new(RefCell::new(resource)),
        }
    }

    /// Borrow the resource immutably
    pub fn borrow(&self) -> Ref<'_, R> {
        self.inner.borrow()
    }

    /// Borrow the resource mutably
    pub fn borrow_mut(&self) -> RefMut<'_, R> {
        self.inner.borrow_mut()
    }

    /// Run a closure against the mutable resource
    pub fn update<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.inner.borrow_mut())
    }
}

impl<R> Clone for Handle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handle").field(&self.inner.borrow()).finish()
    }
}

// =============================================================================
// Chart
// =============================================================================

struct Node {
    id: String,
    kind: &'static str,
    document: Lazy<Value>,
}

/// A named collection of resources synthesized into one manifest file
pub struct Chart {
    name: String,
    namespace: Option<String>,
    labels: BTreeMap<String, String>,
    nodes: Vec<Node>,
}

impl Chart {
    /// Create an empty chart
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            labels: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Default namespace for resources that don't set one
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Label applied to every resource in the chart
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Chart name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of resources in the chart
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chart has no resources
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a resource under `id`.
    ///
    /// Fills in `metadata.name` when empty (see [`unique_name`]), the chart
    /// namespace when the resource has none, and chart labels the resource
    /// doesn't already set. Returns a handle for further mutation.
    pub fn add<R>(&mut self, id: impl Into<String>, mut resource: R) -> Result<Handle<R>>
    where
        R: ApiObject + 'static,
    {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::validation_for_field("id", "node id must not be empty"));
        }
        if self.nodes.iter().any(|n| n.id == id) {
            return Err(Error::DuplicateId {
                chart: self.name.clone(),
                id,
            });
        }

        let meta = resource.metadata_mut();
        if meta.name.is_empty() {
            meta.name = unique_name(&[&self.name, &id]);
        }
        if meta.namespace.is_none() {
            meta.namespace = self.namespace.clone();
        }
        for (k, v) in &self.labels {
            meta.labels.entry(k.clone()).or_insert_with(|| v.clone());
        }

        debug!(
            chart = %self.name,
            node = %id,
            kind = R::KIND,
            name = %meta.name,
            "Added resource to chart"
        );

        let handle = Handle::new(resource);
        let reader = handle.clone();
        let document = Lazy::new(move || {
            let resource = reader.inner.try_borrow()?;
            let spec = resource.to_spec()?;
            Ok(json!({
                "apiVersion": R::API_VERSION,
                "kind": R::KIND,
                "metadata": serde_json::to_value(resource.metadata())?,
                "spec": spec,
            }))
        });

        self.nodes.push(Node {
            id,
            kind: R::KIND,
            document,
        });
        Ok(handle)
    }

    /// Resolve every resource into its document.
    ///
    /// Each node's producer runs exactly once per call, in the order the nodes
    /// were added. Calling `synth` again without mutation yields an equal
    /// manifest.
    pub fn synth(&self) -> Result<Manifest> {
        info!(chart = %self.name, resources = self.nodes.len(), "Synthesizing chart");

        let documents = self
            .nodes
            .iter()
            .map(|node| {
                let path = format!("{}/{}", self.name, node.id);
                debug!(node = %path, kind = node.kind, "Resolving node");
                node.document
                    .produce()
                    .map_err(|source| Error::resolution(path, source))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Manifest {
            chart: self.name.clone(),
            documents,
        })
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// The resolved, read-only output of a chart
#[derive(Clone, Debug, PartialEq)]
pub struct Manifest {
    chart: String,
    documents: Vec<Value>,
}

impl Manifest {
    /// Resolved documents in chart order
    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    /// Find a document by kind and metadata name
    pub fn find(&self, kind: &str, name: &str) -> Option<&Value> {
        self.documents
            .iter()
            .find(|d| d["kind"] == kind && d["metadata"]["name"] == name)
    }

    /// All documents of a given kind
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.documents.iter().filter(move |d| d["kind"] == kind)
    }

    /// Render as a multi-document YAML stream
    pub fn to_yaml(&self) -> Result<String> {
        let docs = self
            .documents
            .iter()
            .map(serde_yaml::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs.join("---\n"))
    }

    /// Write `<chart>.k8s.yaml` into `dir`, creating it if needed
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.k8s.yaml", self.chart));
        std::fs::write(&path, self.to_yaml()?)?;
        info!(path = %path.display(), documents = self.documents.len(), "Wrote manifest");
        Ok(path)
    }
}
