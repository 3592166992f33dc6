//! The aggregation tree node: construction, nesting and serialization.
//!
//! Response transformation lives in [`crate::transform`]; this module only
//! deals with the shape of the tree and its wire payload.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{json_type_name, AggError, AggResult};
use crate::ids::{default_ids, IdGenerator};
use crate::kind::{AggConfig, AggregationFamily};
use crate::transform::{BucketStep, PostTransformFn, TransformFn};

/// Engine-native description of one aggregation: its type name and config.
///
/// Serializes as the single-key mapping `{ <kind>: <config> }`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationBody {
    kind: String,
    config: Value,
}

impl AggregationBody {
    /// The aggregation type name, e.g. `terms` or `bucket_script`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The aggregation configuration object.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// The family of the aggregation type.
    pub fn family(&self) -> Option<AggregationFamily> {
        AggregationFamily::of(&self.kind)
    }

    /// Renders the body as `{ <kind>: <config> }`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.kind.clone(), self.config.clone());
        Value::Object(map)
    }
}

/// One node of an aggregation tree.
///
/// A node carries an optional [`AggregationBody`] and an ordered list of
/// children. Nodes without a body are *virtual*: they never appear in the
/// wire payload but still take part in response transformation, which is how
/// client-side values such as [`doc_count`](crate::doc_count) are computed.
///
/// Builder methods consume and return the node, so trees are written as a
/// single expression:
///
/// ```rust
/// use aggtree::{sum, terms, AggregationNode};
/// use serde_json::json;
///
/// let tree = AggregationNode::empty().agg(
///     terms("state")
///         .with_id("states")
///         .agg(sum("amount").with_id("total")),
/// );
///
/// assert_eq!(
///     tree.to_json(),
///     json!({
///         "aggs": {
///             "states": {
///                 "terms": { "field": "state" },
///                 "aggs": { "total": { "sum": { "field": "amount" } } }
///             }
///         }
///     })
/// );
/// ```
///
/// Cloning a node deep-copies its configuration and children. Transform
/// closures are shared, which is safe since they are immutable.
#[derive(Clone)]
pub struct AggregationNode {
    pub(crate) id: String,
    pub(crate) body: Option<AggregationBody>,
    pub(crate) children: Vec<AggregationNode>,
    pub(crate) bucket_step: BucketStep,
    pub(crate) transformer: Option<TransformFn>,
    pub(crate) post_transforms: Vec<PostTransformFn>,
}

impl AggregationNode {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Creates a virtual node with an id from the default generator.
    ///
    /// Typically used as the root of a tree.
    pub fn empty() -> Self {
        Self::empty_with(default_ids())
    }

    /// Creates a virtual node with an id from the given generator.
    pub fn empty_with(ids: &dyn IdGenerator) -> Self {
        Self::with_body(ids.next_id(), None)
    }

    /// Creates a node from an explicit `{ <kind>: <config> }` body.
    ///
    /// # Errors
    ///
    /// Returns [`AggError::InvalidBody`] when `body` is not a mapping with
    /// exactly one key, [`AggError::UnknownAggregationType`] for an unknown
    /// key, and [`AggError::InvalidConfig`] for a non-mapping configuration.
    pub fn from_body(body: Value) -> AggResult<Self> {
        Self::from_body_with(default_ids(), body)
    }

    /// Like [`from_body`](Self::from_body) with an explicit id generator.
    pub fn from_body_with(ids: &dyn IdGenerator, body: Value) -> AggResult<Self> {
        let map = match body {
            Value::Object(map) => map,
            other => {
                return Err(AggError::InvalidBody {
                    reason: format!("expected an object, got {}", json_type_name(&other)),
                })
            }
        };
        if map.len() != 1 {
            return Err(AggError::InvalidBody {
                reason: format!("expected exactly one aggregation type key, found {}", map.len()),
            });
        }
        let Some((kind, config)) = map.into_iter().next() else {
            return Err(AggError::InvalidBody {
                reason: "expected exactly one aggregation type key, found 0".to_string(),
            });
        };
        let config = AggConfig::from_value(&kind, config)?;
        Self::create_with(ids, &kind, config)
    }

    /// Creates a node from an aggregation type name and a configuration.
    ///
    /// A string configuration is shorthand: `create("terms", "state")` is the
    /// same as `{ "terms": { "field": "state" } }`.
    ///
    /// # Errors
    ///
    /// Returns [`AggError::UnknownAggregationType`] for an unknown `kind`, and
    /// [`AggError::InvalidConfig`] when shorthand is used with a type that has
    /// no shorthand key.
    pub fn create(kind: &str, config: impl Into<AggConfig>) -> AggResult<Self> {
        Self::create_with(default_ids(), kind, config)
    }

    /// Like [`create`](Self::create) with an explicit id generator.
    pub fn create_with(
        ids: &dyn IdGenerator,
        kind: &str,
        config: impl Into<AggConfig>,
    ) -> AggResult<Self> {
        let family = AggregationFamily::of(kind)
            .ok_or_else(|| AggError::UnknownAggregationType(kind.to_string()))?;
        let config = config.into().expand(kind, family)?;
        Ok(Self::with_body(
            ids.next_id(),
            Some(AggregationBody {
                kind: kind.to_string(),
                config,
            }),
        ))
    }

    /// Infallible constructor for types whose family takes shorthand.
    pub(crate) fn typed(
        ids: &dyn IdGenerator,
        kind: &str,
        shorthand_key: &str,
        config: AggConfig,
    ) -> Self {
        Self::with_body(
            ids.next_id(),
            Some(AggregationBody {
                kind: kind.to_string(),
                config: config.expand_with_key(shorthand_key),
            }),
        )
    }

    fn with_body(id: String, body: Option<AggregationBody>) -> Self {
        Self {
            id,
            body,
            children: Vec::new(),
            bucket_step: BucketStep::Enrich,
            transformer: None,
            post_transforms: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The node id, used as its key in the wire payload and in responses.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The aggregation body, or `None` for a virtual node.
    pub fn body(&self) -> Option<&AggregationBody> {
        self.body.as_ref()
    }

    /// Returns true if the node has no body and is left out of the payload.
    pub fn is_virtual(&self) -> bool {
        self.body.is_none()
    }

    /// The child nodes in insertion order.
    pub fn children(&self) -> &[AggregationNode] {
        &self.children
    }

    /// Finds a direct child by id.
    pub fn child(&self, id: &str) -> Option<&AggregationNode> {
        self.children.iter().find(|c| c.id == id)
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Renames the node.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Replaces the children with the given nodes.
    pub fn aggs<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = AggregationNode>,
    {
        self.children.clear();
        for node in nodes {
            self.attach(node);
        }
        self
    }

    /// Appends a child.
    ///
    /// A child with the same id as an existing one replaces it in place, so
    /// deterministic ids never produce duplicate siblings.
    pub fn agg(mut self, node: AggregationNode) -> Self {
        self.attach(node);
        self
    }

    /// Replaces the children with the given nodes, each renamed to its key.
    ///
    /// ```rust
    /// use aggtree::{avg, sum, AggregationNode};
    ///
    /// let tree = AggregationNode::empty()
    ///     .named_aggs([("total_sales", sum("amount")), ("average_sales", avg("amount"))]);
    /// assert!(tree.child("total_sales").is_some());
    /// ```
    pub fn named_aggs<I, K>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, AggregationNode)>,
        K: Into<String>,
    {
        self.aggs(entries.into_iter().map(|(key, node)| node.with_id(key)))
    }

    /// Appends a child renamed to `key`.
    pub fn named_agg(self, key: impl Into<String>, node: AggregationNode) -> Self {
        self.agg(node.with_id(key))
    }

    /// Recursively nests groups of nodes into a tree.
    ///
    /// Every node of the first group becomes a child of `self`; each of them
    /// receives its own copy of the nesting of the remaining groups. A group
    /// holding several nodes expands into siblings. The receiver's previous
    /// children are replaced.
    ///
    /// ```rust
    /// use aggtree::{sum, terms, AggregationNode, NestGroup};
    ///
    /// let tree = AggregationNode::empty().nest([
    ///     NestGroup::from(vec![
    ///         terms("salesperson").with_id("salespeople"),
    ///         terms("product").with_id("products"),
    ///     ]),
    ///     terms("country").with_id("countries").into(),
    ///     sum("amount").with_id("total").into(),
    /// ]);
    ///
    /// for top in ["salespeople", "products"] {
    ///     let countries = tree.child(top).unwrap().child("countries").unwrap();
    ///     assert!(countries.child("total").is_some());
    /// }
    /// ```
    pub fn nest<I>(self, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<NestGroup>,
    {
        let groups: Vec<Vec<AggregationNode>> = groups
            .into_iter()
            .map(|g| g.into().into_nodes())
            .collect();
        self.nest_groups(&groups)
    }

    fn nest_groups(self, groups: &[Vec<AggregationNode>]) -> Self {
        match groups.split_first() {
            None => self,
            Some((first, rest)) => {
                let nested: Vec<AggregationNode> = first
                    .iter()
                    .cloned()
                    .map(|child| child.nest_groups(rest))
                    .collect();
                self.aggs(nested)
            }
        }
    }

    /// Merges extra keys into the body configuration.
    ///
    /// Has no effect on virtual nodes or non-object configurations.
    pub fn configure(mut self, settings: Map<String, Value>) -> Self {
        if let Some(Value::Object(config)) = self.body.as_mut().map(|b| &mut b.config) {
            for (key, value) in settings {
                config.insert(key, value);
            }
        }
        self
    }

    fn attach(&mut self, node: AggregationNode) {
        match self.children.iter_mut().find(|c| c.id == node.id) {
            Some(existing) => *existing = node,
            None => self.children.push(node),
        }
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Renders the wire payload for this node and its descendants.
    ///
    /// Produces `{ <kind>: <config>, aggs: { <child id>: <child payload> } }`.
    /// Virtual children are left out, but their own non-virtual descendants
    /// are hoisted into this node's `aggs`. The `aggs` key is omitted when
    /// there is nothing to put in it.
    pub fn to_json(&self) -> Value {
        let mut payload = Map::new();
        if let Some(body) = &self.body {
            payload.insert(body.kind.clone(), body.config.clone());
        }
        let mut aggs = Map::new();
        self.collect_wire_children(&mut aggs);
        if !aggs.is_empty() {
            payload.insert("aggs".to_string(), Value::Object(aggs));
        }
        Value::Object(payload)
    }

    fn collect_wire_children(&self, out: &mut Map<String, Value>) {
        for child in &self.children {
            if child.is_virtual() {
                child.collect_wire_children(out);
            } else {
                out.insert(child.id.clone(), child.to_json());
            }
        }
    }
}

impl fmt::Debug for AggregationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationNode")
            .field("id", &self.id)
            .field("body", &self.body)
            .field("children", &self.children)
            .field("bucket_step", &self.bucket_step)
            .field("custom_transform", &self.transformer.is_some())
            .field("post_transforms", &self.post_transforms.len())
            .finish()
    }
}

/// One argument of [`AggregationNode::nest`]: a single node or a set of
/// sibling nodes.
#[derive(Debug, Clone)]
pub enum NestGroup {
    /// A single node.
    One(AggregationNode),
    /// Sibling nodes, each receiving the full remaining nesting.
    Many(Vec<AggregationNode>),
}

impl NestGroup {
    fn into_nodes(self) -> Vec<AggregationNode> {
        match self {
            NestGroup::One(node) => vec![node],
            NestGroup::Many(nodes) => nodes,
        }
    }
}

impl From<AggregationNode> for NestGroup {
    fn from(node: AggregationNode) -> Self {
        NestGroup::One(node)
    }
}

impl From<Vec<AggregationNode>> for NestGroup {
    fn from(nodes: Vec<AggregationNode>) -> Self {
        NestGroup::Many(nodes)
    }
}

impl<const N: usize> From<[AggregationNode; N]> for NestGroup {
    fn from(nodes: [AggregationNode; N]) -> Self {
        NestGroup::Many(nodes.into())
    }
}
