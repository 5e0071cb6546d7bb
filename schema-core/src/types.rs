//! The schema data model: nodes, fields, links, classes.
//!
//! Every constructor here is validating: a `Schema`, `Node`, `Tensor`,
//! `Category`, `Link` or `Class` that exists is guaranteed to satisfy its
//! invariants. There is no "unchecked" constructor.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::debug;

use crate::dim::{DimElem, DimSubst, DimValue};
use crate::error::{Result, SchemaError};
use crate::ident::{is_dim_name, is_name};

fn check_name(name: &str, path: impl Into<String>) -> Result<()> {
    if is_name(name) {
        Ok(())
    } else {
        Err(SchemaError::at(
            "names may contain lowercase letters, numbers and underscores, and must start with a letter or underscore",
            path,
        ))
    }
}

fn optional_src_name(value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            check_name(s, "src-name")?;
            Ok(Some(s.clone()))
        }
        Some(_) => Err(SchemaError::at("source name must be a string", "src-name")),
    }
}

/// The upper bound of a [`Link`]'s cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkUpper {
    /// A finite, positive upper bound.
    Finite(u64),
    /// No upper bound (`"inf"` on the wire).
    Infinite,
}

/// A constraint on how many instances of the target node a source instance may link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub lo: u64,
    pub hi: LinkUpper,
}

impl Link {
    /// A link that allows exactly `n` outgoing references.
    pub fn exact(n: u64) -> Result<Self> {
        if n < 1 {
            return Err(SchemaError::new("link dimension must be a positive integer"));
        }
        Ok(Self { lo: n, hi: LinkUpper::Finite(n) })
    }

    /// A link allowing between `lo` and `hi` outgoing references.
    pub fn ranged(lo: u64, hi: LinkUpper) -> Result<Self> {
        if let LinkUpper::Finite(h) = hi {
            if h < 1 {
                return Err(SchemaError::new("link upper bound must be a positive integer or 'inf'"));
            }
            if lo > h {
                return Err(SchemaError::new("link lower bound cannot be greater than the upper bound"));
            }
        }
        Ok(Self { lo, hi })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        if let Some(n) = value.as_u64() {
            return Self::exact(n);
        }
        if let Some(items) = value.as_array() {
            if items.len() != 2 {
                return Err(SchemaError::new(
                    "link dimension must be a list of two elements representing the lower and upper bound",
                ));
            }
            let lo = items[0]
                .as_u64()
                .ok_or_else(|| SchemaError::new("link lower bound must be a non-negative integer"))?;
            let hi = if items[1].as_str() == Some("inf") {
                LinkUpper::Infinite
            } else {
                let h = items[1]
                    .as_u64()
                    .ok_or_else(|| SchemaError::new("link upper bound must be a positive integer or 'inf'"))?;
                LinkUpper::Finite(h)
            };
            return Self::ranged(lo, hi);
        }
        Err(SchemaError::new(
            "link dimension must be either a positive integer or a two-element list",
        ))
    }

    #[must_use]
    pub fn to_value(self) -> Value {
        let hi = match self.hi {
            LinkUpper::Finite(n) => Value::from(n),
            LinkUpper::Infinite => Value::String("inf".to_string()),
        };
        Value::Array(vec![Value::from(self.lo), hi])
    }

    /// Whether a concrete `source` link satisfies this (destination) constraint.
    #[must_use]
    pub fn accepts(&self, source: &Link) -> bool {
        if self.lo > source.lo {
            return false;
        }
        match self.hi {
            LinkUpper::Infinite => true,
            LinkUpper::Finite(h) => match source.hi {
                LinkUpper::Infinite => false,
                LinkUpper::Finite(sh) => h >= sh,
            },
        }
    }
}

/// A tensor-valued field: a dense array with a named, possibly variable, shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    pub dim: Vec<DimElem>,
    pub src_name: Option<String>,
    pub src_dim: Option<Vec<DimElem>>,
}

fn check_dim_elem(elem: &DimElem, path: &str) -> Result<()> {
    match elem {
        DimElem::Int(n) => {
            if *n < 1 {
                return Err(SchemaError::at(
                    "integer dim fields must be positive numbers",
                    path.to_string(),
                ));
            }
        }
        DimElem::Var(name, _) => {
            if !is_dim_name(name) {
                return Err(SchemaError::at(
                    "string dim fields must be valid identifiers, optionally suffixed with '?', '+' or '*'",
                    path.to_string(),
                ));
            }
        }
    }
    Ok(())
}

impl Tensor {
    pub fn new(dim: Vec<DimElem>, src_name: Option<String>, src_dim: Option<Vec<DimElem>>) -> Result<Self> {
        if dim.is_empty() {
            return Err(SchemaError::at("tensor must have at least one dimension", "dim"));
        }
        for elem in &dim {
            check_dim_elem(elem, "dim")?;
        }
        if let Some(src_name) = &src_name {
            check_name(src_name, "src-name")?;
        }
        if let Some(src_dim) = &src_dim {
            for elem in src_dim {
                check_dim_elem(elem, "src-dim")?;
            }
        }

        let wildcard_count = dim
            .iter()
            .filter(|d| matches!(d, DimElem::Var(_, Some(_))))
            .count();
        if wildcard_count > 1 {
            return Err(SchemaError::at(
                "tensor can have at most one variable count dimension",
                "dim",
            ));
        }
        if dim.len() == 1 {
            if let DimElem::Var(_, Some(w)) = &dim[0] {
                if matches!(w, crate::dim::Wildcard::Opt | crate::dim::Wildcard::Star) {
                    return Err(SchemaError::at(
                        "tensors cannot have zero dimensions: a single dimension suffixed with '?' or '*' permits this",
                        "dim",
                    ));
                }
            }
        }

        Ok(Self { dim, src_name, src_dim })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let dim_val = value
            .get("dim")
            .ok_or_else(|| SchemaError::new("tensor must have a 'dim' field"))?;
        let dim_list = dim_val
            .as_array()
            .ok_or_else(|| SchemaError::at("tensor 'dim' field must be a list", "dim"))?;
        let dim = dim_list
            .iter()
            .map(DimElem::parse)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SchemaError::at(e, "dim"))?;
        let src_name = optional_src_name(value.get("src-name"))?;
        let src_dim = match value.get("src-dim") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let list = v
                    .as_array()
                    .ok_or_else(|| SchemaError::at("tensor 'src-dim' field must be a list", "src-dim"))?;
                Some(
                    list.iter()
                        .map(DimElem::parse)
                        .collect::<std::result::Result<Vec<_>, _>>()
                        .map_err(|e| SchemaError::at(e, "src-dim"))?,
                )
            }
        };
        Self::new(dim, src_name, src_dim)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String("tensor".to_string()));
        if let Some(src_name) = &self.src_name {
            map.insert("src-name".to_string(), Value::String(src_name.clone()));
        }
        map.insert(
            "dim".to_string(),
            Value::Array(self.dim.iter().map(DimElem::to_value).collect()),
        );
        if let Some(src_dim) = &self.src_dim {
            map.insert(
                "src-dim".to_string(),
                Value::Array(src_dim.iter().map(DimElem::to_value).collect()),
            );
        }
        Value::Object(map)
    }

    /// Whether this tensor's shape has any unbound dimension name.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.dim.iter().any(|d| matches!(d, DimElem::Var(..)))
    }
}

/// A categorical field: an index into a named, schema-level [`Class`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub category_class: String,
    pub src_name: Option<String>,
}

impl Category {
    pub fn new(category_class: String, src_name: Option<String>) -> Result<Self> {
        check_name(&category_class, "class")?;
        if let Some(src_name) = &src_name {
            check_name(src_name, "src-name")?;
        }
        Ok(Self { category_class, src_name })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let category_class = value
            .get("class")
            .ok_or_else(|| SchemaError::new("category must have a 'class' field"))?
            .as_str()
            .ok_or_else(|| SchemaError::at("category 'class' field must be a string", "class"))?
            .to_string();
        let src_name = optional_src_name(value.get("src-name"))?;
        Self::new(category_class, src_name)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String("category".to_string()));
        if let Some(src_name) = &self.src_name {
            map.insert("src-name".to_string(), Value::String(src_name.clone()));
        }
        map.insert("class".to_string(), Value::String(self.category_class.clone()));
        Value::Object(map)
    }
}

/// A node's field: either a dense tensor or a categorical index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Tensor(Tensor),
    Category(Category),
}

impl Field {
    pub fn from_value(value: &Value) -> Result<Self> {
        let field_type = value
            .get("type")
            .ok_or_else(|| SchemaError::new("field must have a 'type' field"))?
            .as_str()
            .ok_or_else(|| SchemaError::new("field 'type' must be a string"))?;
        match field_type {
            "tensor" => Ok(Self::Tensor(Tensor::from_value(value)?)),
            "category" => Ok(Self::Category(Category::from_value(value)?)),
            other => Err(SchemaError::new(format!("unknown field type '{other}'"))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Tensor(t) => t.to_value(),
            Self::Category(c) => c.to_value(),
        }
    }

    #[must_use]
    pub fn src_name(&self) -> Option<&str> {
        match self {
            Self::Tensor(t) => t.src_name.as_deref(),
            Self::Category(c) => c.src_name.as_deref(),
        }
    }

    pub fn set_src_name(&mut self, name: String) {
        match self {
            Self::Tensor(t) => t.src_name = Some(name),
            Self::Category(c) => c.src_name = Some(name),
        }
    }
}

/// A node in the schema graph: a named bag of fields plus outgoing links to other nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub is_singleton: bool,
    pub fields: IndexMap<String, Field>,
    pub links: IndexMap<String, Link>,
    pub src_name: Option<String>,
}

impl Node {
    pub fn new(
        is_singleton: bool,
        fields: IndexMap<String, Field>,
        links: IndexMap<String, Link>,
        src_name: Option<String>,
    ) -> Result<Self> {
        if let Some(src_name) = &src_name {
            check_name(src_name, "src-name")?;
        }
        if is_singleton {
            if fields.len() != 1 {
                return Err(SchemaError::new("singleton nodes must have a single field"));
            }
            if !links.is_empty() {
                return Err(SchemaError::new("singleton nodes cannot have links"));
            }
        }
        if fields.is_empty() && links.is_empty() {
            return Err(SchemaError::new("node must have at least one field or link"));
        }
        for name in fields.keys() {
            check_name(name, format!("fields.{name}"))?;
        }
        for name in links.keys() {
            check_name(name, format!("links.{name}"))?;
        }
        Ok(Self { is_singleton, fields, links, src_name })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::new("node must be a key-value object"))?;
        let is_singleton = obj.get("singleton").and_then(Value::as_bool).unwrap_or(false);
        let src_name = optional_src_name(obj.get("src-name"))?;

        let fields_val = obj.get("fields");
        let fields_empty = fields_val
            .map(|v| v.as_object().is_none_or(Map::is_empty))
            .unwrap_or(true);

        let mut fields = IndexMap::new();
        if is_singleton && fields_empty {
            let field = Field::from_value(value)?;
            fields.insert("field".to_string(), field);
        } else if let Some(obj) = fields_val.and_then(Value::as_object) {
            for (name, fv) in obj {
                let field = Field::from_value(fv).map_err(|e| e.prefixed(format!("fields.{name}")))?;
                fields.insert(name.clone(), field);
            }
        }

        let mut links = IndexMap::new();
        if let Some(obj) = obj.get("links").and_then(Value::as_object) {
            for (name, lv) in obj {
                let link = Link::from_value(lv).map_err(|e| e.prefixed(format!("links.{name}")))?;
                links.insert(name.clone(), link);
            }
        }

        Self::new(is_singleton, fields, links, src_name)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("singleton".to_string(), Value::Bool(self.is_singleton));

        if self.is_singleton {
            if let Some(field) = self.fields.values().next() {
                if let Value::Object(field_obj) = field.to_value() {
                    for (k, v) in field_obj {
                        map.insert(k, v);
                    }
                }
            }
        } else {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect();
            map.insert("fields".to_string(), Value::Object(fields));
            let links = self
                .links
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect();
            map.insert("links".to_string(), Value::Object(links));
        }

        if let Some(src_name) = &self.src_name {
            map.insert("src-name".to_string(), Value::String(src_name.clone()));
        }
        Value::Object(map)
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.fields
            .values()
            .any(|f| matches!(f, Field::Tensor(t) if t.is_variable()))
    }
}

/// A dimension on a [`Class`]: either the class's concrete cardinality or a
/// name shared with other dimensions that must resolve to the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassDim {
    Int(u64),
    Var(String),
}

impl ClassDim {
    #[must_use]
    pub fn as_dim_value(&self) -> DimValue {
        match self {
            Self::Int(n) => DimValue::Int(*n),
            Self::Var(name) => DimValue::Name(name.clone()),
        }
    }
}

/// A category class: the set of values a [`Category`] field may index into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub dim: ClassDim,
    pub src_name: Option<String>,
}

impl Class {
    pub fn new(dim: ClassDim, src_name: Option<String>) -> Result<Self> {
        match &dim {
            ClassDim::Int(n) if *n < 1 => {
                return Err(SchemaError::at("class dimension must be a positive integer", "dim"));
            }
            ClassDim::Var(name) if !is_name(name) => {
                return Err(SchemaError::at(
                    "class dimension name must be a valid identifier",
                    "dim",
                ));
            }
            _ => {}
        }
        if let Some(src_name) = &src_name {
            check_name(src_name, "src-name")?;
        }
        Ok(Self { dim, src_name })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let dim_val = value
            .get("dim")
            .ok_or_else(|| SchemaError::new("class must have a 'dim' field"))?;
        let dim = if let Some(n) = dim_val.as_u64() {
            ClassDim::Int(n)
        } else if let Some(s) = dim_val.as_str() {
            ClassDim::Var(s.to_string())
        } else {
            return Err(SchemaError::at("class dimension must be an integer or a string", "dim"));
        };
        let src_name = optional_src_name(value.get("src-name"))?;
        Self::new(dim, src_name)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        let dim = match &self.dim {
            ClassDim::Int(n) => Value::from(*n),
            ClassDim::Var(name) => Value::String(name.clone()),
        };
        map.insert("dim".to_string(), dim);
        if let Some(src_name) = &self.src_name {
            map.insert("src-name".to_string(), Value::String(src_name.clone()));
        }
        Value::Object(map)
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self.dim, ClassDim::Var(_))
    }
}

/// A complete schema: a graph of nodes plus the category classes they reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub nodes: IndexMap<String, Node>,
    pub category_classes: IndexMap<String, Class>,
    pub cyclic: bool,
    pub undirected: bool,
    pub fanin: bool,
    pub src_dims: Option<DimSubst>,
}

impl Schema {
    pub fn new(
        nodes: IndexMap<String, Node>,
        category_classes: IndexMap<String, Class>,
        cyclic: bool,
        undirected: bool,
        fanin: bool,
        src_dims: Option<DimSubst>,
    ) -> Result<Self> {
        if nodes.is_empty() {
            return Err(SchemaError::new("schema must have at least one node"));
        }
        for name in nodes.keys() {
            check_name(name, format!("nodes.{name}"))?;
        }
        for name in category_classes.keys() {
            check_name(name, format!("classes.{name}"))?;
        }

        let mut orphan_classes: IndexSet<String> = category_classes.keys().cloned().collect();

        for (k, node) in &nodes {
            let mut link_count: u64 = 0;
            for (target, link) in &node.links {
                let target_node = nodes.get(target).ok_or_else(|| {
                    SchemaError::at("node link points to unknown node", format!("nodes.{k}.links.{target}"))
                })?;
                if target_node.is_singleton {
                    return Err(SchemaError::at(
                        "node link points to a singleton node",
                        format!("nodes.{k}.links.{target}"),
                    ));
                }
                if undirected && !fanin {
                    match link.hi {
                        LinkUpper::Infinite => {
                            return Err(SchemaError::at(
                                "nodes in undirected, fan-in-free schemas cannot have infinite outgoing links",
                                format!("nodes.{k}.links.{target}"),
                            ));
                        }
                        LinkUpper::Finite(h) => link_count += h,
                    }
                }
            }

            for (f, field) in &node.fields {
                if let Field::Category(cat) = field {
                    if !category_classes.contains_key(&cat.category_class) {
                        return Err(SchemaError::at(
                            "field category class undefined",
                            format!("nodes.{k}.fields.{f}"),
                        ));
                    }
                    orphan_classes.shift_remove(&cat.category_class);
                }
            }

            if undirected && !fanin && link_count > 2 {
                return Err(SchemaError::at(
                    "nodes in undirected, fan-in-free schemas can have at most 2 outgoing links",
                    format!("nodes.{k}"),
                ));
            }
        }

        if let Some(orphan) = orphan_classes.into_iter().next() {
            return Err(SchemaError::at(
                "every declared class must be referenced by a category field",
                format!("classes.{orphan}"),
            ));
        }

        Ok(Self { nodes, category_classes, cyclic, undirected, fanin, src_dims })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::new("schema must be a key-value object"))?;

        let mut nodes = IndexMap::new();
        if let Some(obj) = obj.get("nodes").and_then(Value::as_object) {
            for (name, nv) in obj {
                let node = Node::from_value(nv).map_err(|e| e.prefixed(format!("nodes.{name}")))?;
                nodes.insert(name.clone(), node);
            }
        }

        let mut category_classes = IndexMap::new();
        if let Some(obj) = obj.get("classes").and_then(Value::as_object) {
            for (name, cv) in obj {
                let class = Class::from_value(cv).map_err(|e| e.prefixed(format!("classes.{name}")))?;
                category_classes.insert(name.clone(), class);
            }
        }

        let constraints = obj.get("ref-constraints").and_then(Value::as_object);
        let cyclic = constraints
            .and_then(|c| c.get("cyclic"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let undirected = constraints
            .and_then(|c| c.get("undirected"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let fanin = constraints
            .and_then(|c| c.get("fan-in"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let src_dims = match obj.get("src-dims") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => {
                let mut subst = DimSubst::new();
                for (k, v) in map {
                    let dv = if let Some(n) = v.as_u64() {
                        DimValue::Int(n)
                    } else if let Some(s) = v.as_str() {
                        DimValue::Name(s.to_string())
                    } else {
                        return Err(SchemaError::at(
                            "source dimension values must be strings or integers",
                            format!("src-dims.{k}"),
                        ));
                    };
                    subst.insert(k.clone(), dv);
                }
                Some(subst)
            }
            Some(_) => return Err(SchemaError::at("source dimensions field must be a key-value object", "src-dims")),
        };

        debug!(nodes = nodes.len(), classes = category_classes.len(), "parsing schema document");
        Self::new(nodes, category_classes, cyclic, undirected, fanin, src_dims)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        let mut constraints = Map::new();
        constraints.insert("cyclic".to_string(), Value::Bool(self.cyclic));
        constraints.insert("undirected".to_string(), Value::Bool(self.undirected));
        constraints.insert("fan-in".to_string(), Value::Bool(self.fanin));
        map.insert("ref-constraints".to_string(), Value::Object(constraints));

        let nodes = self
            .nodes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect();
        map.insert("nodes".to_string(), Value::Object(nodes));

        if !self.category_classes.is_empty() {
            let classes = self
                .category_classes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect();
            map.insert("classes".to_string(), Value::Object(classes));
        }

        if let Some(src_dims) = &self.src_dims {
            let map_val = src_dims
                .iter()
                .map(|(k, v)| {
                    let val = match v {
                        DimValue::Int(n) => Value::from(*n),
                        DimValue::Name(s) => Value::String(s.clone()),
                    };
                    (k.clone(), val)
                })
                .collect();
            map.insert("src-dims".to_string(), Value::Object(map_val));
        }

        Value::Object(map)
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.nodes.values().any(Node::is_variable) || self.category_classes.values().any(Class::is_variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor_node(dim: Vec<DimElem>) -> Node {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Field::Tensor(Tensor::new(dim, None, None).unwrap()));
        Node::new(false, fields, IndexMap::new(), None).unwrap()
    }

    #[test]
    fn singleton_node_requires_exactly_one_field() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Field::Tensor(Tensor::new(vec![DimElem::Int(1)], None, None).unwrap()));
        fields.insert("b".to_string(), Field::Tensor(Tensor::new(vec![DimElem::Int(1)], None, None).unwrap()));
        assert!(Node::new(true, fields, IndexMap::new(), None).is_err());
    }

    #[test]
    fn singleton_node_cannot_have_links() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Field::Tensor(Tensor::new(vec![DimElem::Int(1)], None, None).unwrap()));
        let mut links = IndexMap::new();
        links.insert("other".to_string(), Link::exact(1).unwrap());
        assert!(Node::new(true, fields, links, None).is_err());
    }

    #[test]
    fn schema_rejects_link_to_unknown_node() {
        let mut nodes = IndexMap::new();
        let mut links = IndexMap::new();
        links.insert("ghost".to_string(), Link::exact(1).unwrap());
        let node = Node::new(
            false,
            IndexMap::from([(
                "a".to_string(),
                Field::Tensor(Tensor::new(vec![DimElem::Int(1)], None, None).unwrap()),
            )]),
            links,
            None,
        )
        .unwrap();
        nodes.insert("n".to_string(), node);
        let err = Schema::new(nodes, IndexMap::new(), false, false, false, None).unwrap_err();
        assert!(err.path.contains("links.ghost"));
    }

    #[test]
    fn schema_rejects_orphan_classes() {
        let mut nodes = IndexMap::new();
        nodes.insert("n".to_string(), tensor_node(vec![DimElem::Int(3)]));
        let mut classes = IndexMap::new();
        classes.insert("unused".to_string(), Class::new(ClassDim::Int(2), None).unwrap());
        let err = Schema::new(nodes, classes, false, false, false, None).unwrap_err();
        assert!(err.path.starts_with("classes."));
    }

    #[test]
    fn singleton_node_round_trips_through_wire_format() {
        use pretty_assertions::assert_eq;

        let json = serde_json::json!({
            "singleton": true,
            "type": "tensor",
            "dim": [3, "w*", 5]
        });
        let node = Node::from_value(&json).unwrap();
        let expected = Node::new(
            true,
            IndexMap::from([(
                "field".to_string(),
                Field::Tensor(
                    Tensor::new(
                        vec![DimElem::Int(3), DimElem::Var("w".to_string(), Some(crate::dim::Wildcard::Star)), DimElem::Int(5)],
                        None,
                        None,
                    )
                    .unwrap(),
                ),
            )]),
            IndexMap::new(),
            None,
        )
        .unwrap();
        assert_eq!(node, expected);
        let back = node.to_value();
        assert_eq!(back["dim"], serde_json::json!([3, "w*", 5]));
    }

    #[test]
    fn link_accepts_checks_bound_containment() {
        let permissive = Link::ranged(0, LinkUpper::Infinite).unwrap();
        let strict = Link::exact(3).unwrap();
        assert!(permissive.accepts(&strict));
        assert!(!strict.accepts(&permissive));
    }
}
