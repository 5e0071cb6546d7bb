//! Schema matching: deciding whether a concrete source schema can be
//! accepted by a destination schema, and if so, building the resolved
//! schema that records how.
//!
//! A failed match is `None`, never an error: matching is a search, not a
//! validation pass. Every step threads its substitutions as plain values
//! and returns extended copies rather than mutating in place, so a
//! abandoned search branch simply drops its clone.

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::{debug, trace};

use crate::dim::{bind_name, unify_dim_list, DimSubst};
use crate::types::{Category, Class, Field, Node, Schema, Tensor};

/// Dimension-variable name -> source name substitution, threaded through node and field matching.
type ClassSubst = IndexMap<String, String>;
/// Destination node name -> source node name substitution.
type NodeNameMap = IndexMap<String, String>;

fn sorted_names<'a, I: IntoIterator<Item = &'a String>>(names: I) -> Vec<String> {
    let mut v: Vec<String> = names.into_iter().cloned().collect();
    v.sort();
    v
}

fn match_tensor(dest: &Tensor, source: &Tensor, dim_subst: &DimSubst) -> Option<DimSubst> {
    unify_dim_list(&dest.dim, &source.dim, dim_subst)
}

fn match_category(
    dest: &Category,
    source: &Category,
    dim_subst: &DimSubst,
    class_subst: &ClassSubst,
    dest_classes: &IndexMap<String, Class>,
    source_classes: &IndexMap<String, Class>,
) -> Option<(DimSubst, ClassSubst)> {
    if let Some(mapped) = class_subst.get(&dest.category_class) {
        return if *mapped == source.category_class {
            Some((dim_subst.clone(), class_subst.clone()))
        } else {
            None
        };
    }

    let dest_class = dest_classes.get(&dest.category_class)?;
    let source_class = source_classes.get(&source.category_class)?;

    let dim_subst = match &dest_class.dim {
        crate::types::ClassDim::Int(n) => {
            if source_class.dim.as_dim_value() == crate::dim::DimValue::Int(*n) {
                dim_subst.clone()
            } else {
                return None;
            }
        }
        crate::types::ClassDim::Var(name) => bind_name(dim_subst, name, source_class.dim.as_dim_value())?,
    };

    let mut class_subst = class_subst.clone();
    class_subst.insert(dest.category_class.clone(), source.category_class.clone());
    Some((dim_subst, class_subst))
}

fn match_tensor_set(
    dest: &Node,
    source: &Node,
    dest_names: &[String],
    source_names: &[String],
    dim_subst: &DimSubst,
) -> Option<(IndexMap<String, String>, DimSubst)> {
    if dest_names.is_empty() {
        return Some((IndexMap::new(), dim_subst.clone()));
    }
    if dest_names.len() != source_names.len() {
        return None;
    }
    for perm in source_names.iter().cloned().permutations(source_names.len()) {
        let mut acc = dim_subst.clone();
        let mut ok = true;
        for (d, s) in dest_names.iter().zip(perm.iter()) {
            let (Field::Tensor(dt), Field::Tensor(st)) = (&dest.fields[d], &source.fields[s]) else {
                unreachable!("tensor name lists only contain tensor fields")
            };
            match match_tensor(dt, st, &acc) {
                Some(next) => acc = next,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            let map = dest_names.iter().cloned().zip(perm.into_iter()).collect();
            return Some((map, acc));
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn match_category_set(
    dest: &Node,
    source: &Node,
    dest_names: &[String],
    source_names: &[String],
    dim_subst: &DimSubst,
    class_subst: &ClassSubst,
    dest_classes: &IndexMap<String, Class>,
    source_classes: &IndexMap<String, Class>,
) -> Option<(IndexMap<String, String>, DimSubst, ClassSubst)> {
    if dest_names.is_empty() {
        return Some((IndexMap::new(), dim_subst.clone(), class_subst.clone()));
    }
    if dest_names.len() != source_names.len() {
        return None;
    }
    for perm in source_names.iter().cloned().permutations(source_names.len()) {
        let mut dim_acc = dim_subst.clone();
        let mut class_acc = class_subst.clone();
        let mut ok = true;
        for (d, s) in dest_names.iter().zip(perm.iter()) {
            let (Field::Category(dc), Field::Category(sc)) = (&dest.fields[d], &source.fields[s]) else {
                unreachable!("category name lists only contain category fields")
            };
            match match_category(dc, sc, &dim_acc, &class_acc, dest_classes, source_classes) {
                Some((d2, c2)) => {
                    dim_acc = d2;
                    class_acc = c2;
                }
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            let map = dest_names.iter().cloned().zip(perm.into_iter()).collect();
            return Some((map, dim_acc, class_acc));
        }
    }
    None
}

/// Attempt to match `dest` against `source`, given the node-name assignment
/// already decided for this permutation (needed to resolve link targets).
///
/// On success returns a node with every field's `src_name` (and tensor
/// `src_dim`) filled in, plus the extended substitutions. The node's own
/// `src_name` is set by the caller, which alone knows the source node name.
#[allow(clippy::too_many_arguments)]
fn match_node(
    dest: &Node,
    source: &Node,
    dim_subst: &DimSubst,
    class_subst: &ClassSubst,
    node_name_map: &NodeNameMap,
    dest_classes: &IndexMap<String, Class>,
    source_classes: &IndexMap<String, Class>,
) -> Option<(Node, DimSubst, ClassSubst)> {
    let dest_tensor_names = sorted_names(dest.fields.iter().filter_map(|(n, f)| matches!(f, Field::Tensor(_)).then_some(n)));
    let dest_category_names = sorted_names(dest.fields.iter().filter_map(|(n, f)| matches!(f, Field::Category(_)).then_some(n)));
    let source_tensor_names = sorted_names(source.fields.iter().filter_map(|(n, f)| matches!(f, Field::Tensor(_)).then_some(n)));
    let source_category_names = sorted_names(source.fields.iter().filter_map(|(n, f)| matches!(f, Field::Category(_)).then_some(n)));

    if dest_tensor_names.len() != source_tensor_names.len()
        || dest_category_names.len() != source_category_names.len()
        || dest.links.len() != source.links.len()
    {
        return None;
    }

    for (target, link) in &dest.links {
        let mapped_target = node_name_map.get(target)?;
        let source_link = source.links.get(mapped_target)?;
        if !link.accepts(source_link) {
            return None;
        }
    }

    let (tensor_map, dim_subst) = match_tensor_set(dest, source, &dest_tensor_names, &source_tensor_names, dim_subst)?;
    let (category_map, dim_subst, class_subst) = match_category_set(
        dest,
        source,
        &dest_category_names,
        &source_category_names,
        &dim_subst,
        class_subst,
        dest_classes,
        source_classes,
    )?;

    let mut fields = dest.fields.clone();
    for (name, field) in fields.iter_mut() {
        if let Some(source_name) = tensor_map.get(name).or_else(|| category_map.get(name)) {
            field.set_src_name(source_name.clone());
            if let Field::Tensor(t) = field {
                if let Field::Tensor(source_tensor) = &source.fields[source_name] {
                    t.src_dim = Some(source_tensor.dim.clone());
                }
            }
        }
    }

    let node = Node {
        is_singleton: dest.is_singleton,
        fields,
        links: dest.links.clone(),
        src_name: None,
    };

    Some((node, dim_subst, class_subst))
}

#[allow(clippy::too_many_arguments)]
fn match_node_set(
    dest_names: &[String],
    source_names: &[String],
    dest: &Schema,
    source: &Schema,
    dim_subst: &DimSubst,
    class_subst: &ClassSubst,
    node_name_map: &NodeNameMap,
) -> Option<(IndexMap<String, Node>, DimSubst, ClassSubst, NodeNameMap)> {
    if dest_names.is_empty() {
        return Some((IndexMap::new(), dim_subst.clone(), class_subst.clone(), node_name_map.clone()));
    }
    if dest_names.len() != source_names.len() {
        return None;
    }

    for perm in source_names.iter().cloned().permutations(source_names.len()) {
        trace!(dest = ?dest_names, candidate = ?perm, "trying node permutation");
        let mut trial_name_map = node_name_map.clone();
        for (d, s) in dest_names.iter().zip(perm.iter()) {
            trial_name_map.insert(d.clone(), s.clone());
        }

        let mut dim_acc = dim_subst.clone();
        let mut class_acc = class_subst.clone();
        let mut nodes_acc = IndexMap::new();
        let mut ok = true;

        for (d_name, s_name) in dest_names.iter().zip(perm.iter()) {
            let dest_node = &dest.nodes[d_name];
            let source_node = &source.nodes[s_name];
            match match_node(
                dest_node,
                source_node,
                &dim_acc,
                &class_acc,
                &trial_name_map,
                &dest.category_classes,
                &source.category_classes,
            ) {
                Some((mut resolved, dim2, class2)) => {
                    resolved.src_name = Some(s_name.clone());
                    dim_acc = dim2;
                    class_acc = class2;
                    nodes_acc.insert(d_name.clone(), resolved);
                }
                None => {
                    ok = false;
                    break;
                }
            }
        }

        if ok {
            return Some((nodes_acc, dim_acc, class_acc, trial_name_map));
        }
    }
    None
}

/// Decide whether `source` can be accepted by destination schema `dest`,
/// building the resolved schema (every node, field and class annotated
/// with where it came from) if so.
#[must_use]
pub fn match_schema(dest: &Schema, source: &Schema) -> Option<Schema> {
    debug!(dest_nodes = dest.nodes.len(), source_nodes = source.nodes.len(), "starting schema match");

    let dest_nonsingleton_any = dest.nodes.values().any(|n| !n.is_singleton);
    if dest_nonsingleton_any {
        if source.cyclic && !dest.cyclic {
            debug!("rejected: source is cyclic but destination is not");
            return None;
        }
        if !source.undirected && dest.undirected {
            debug!("rejected: source is directed but destination requires undirected");
            return None;
        }
        if source.fanin && !dest.fanin {
            debug!("rejected: source has fan-in but destination forbids it");
            return None;
        }
    }

    let dest_singleton = sorted_names(dest.nodes.iter().filter_map(|(n, v)| v.is_singleton.then_some(n)));
    let dest_nonsingleton = sorted_names(dest.nodes.iter().filter_map(|(n, v)| (!v.is_singleton).then_some(n)));
    let source_singleton = sorted_names(source.nodes.iter().filter_map(|(n, v)| v.is_singleton.then_some(n)));
    let source_nonsingleton = sorted_names(source.nodes.iter().filter_map(|(n, v)| (!v.is_singleton).then_some(n)));

    let (nodes1, dim1, class1, map1) = match_node_set(
        &dest_singleton,
        &source_singleton,
        dest,
        source,
        &DimSubst::new(),
        &ClassSubst::new(),
        &NodeNameMap::new(),
    )?;
    let (nodes2, dim2, class2, _map2) =
        match_node_set(&dest_nonsingleton, &source_nonsingleton, dest, source, &dim1, &class1, &map1)?;

    let mut nodes = nodes1;
    nodes.extend(nodes2);

    let mut classes = IndexMap::new();
    for (name, class) in &dest.category_classes {
        let src_name = class2.get(name).cloned();
        classes.insert(name.clone(), Class { dim: class.dim.clone(), src_name });
    }

    let result = Schema::new(nodes, classes, dest.cyclic, dest.undirected, dest.fanin, Some(dim2)).ok();
    debug!(matched = result.is_some(), "schema match finished");
    result
}

/// Whether `source` can be accepted by `dest`, without building the resolved schema.
#[must_use]
pub fn matches(dest: &Schema, source: &Schema) -> bool {
    match_schema(dest, source).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::DimElem;
    use crate::types::{ClassDim, Link};

    fn tensor_field(dim: Vec<DimElem>) -> Field {
        Field::Tensor(Tensor::new(dim, None, None).unwrap())
    }

    fn single_field_schema(name: &str, dim: Vec<DimElem>) -> Schema {
        let mut fields = IndexMap::new();
        fields.insert(name.to_string(), tensor_field(dim));
        let node = Node::new(false, fields, IndexMap::new(), None).unwrap();
        let mut nodes = IndexMap::new();
        nodes.insert("n".to_string(), node);
        Schema::new(nodes, IndexMap::new(), false, false, false, None).unwrap()
    }

    #[test]
    fn tensor_field_matches_via_dim_binding() {
        let dest = single_field_schema("x", vec![DimElem::Var("d".to_string(), None), DimElem::Var("d".to_string(), None)]);
        let source = single_field_schema("y", vec![DimElem::Int(4), DimElem::Int(4)]);
        let resolved = match_schema(&dest, &source).expect("should match");
        assert_eq!(resolved.src_dims.unwrap().get("d"), Some(&crate::dim::DimValue::Int(4)));
    }

    #[test]
    fn tensor_field_rejects_inconsistent_binding() {
        let dest = single_field_schema("x", vec![DimElem::Var("d".to_string(), None), DimElem::Var("d".to_string(), None)]);
        let source = single_field_schema("y", vec![DimElem::Int(4), DimElem::Int(5)]);
        assert!(match_schema(&dest, &source).is_none());
    }

    #[test]
    fn graph_constraint_gate_rejects_cyclic_source_for_acyclic_dest() {
        let mut links = IndexMap::new();
        links.insert("n".to_string(), Link::exact(1).unwrap());
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), tensor_field(vec![DimElem::Int(1)]));
        let node = Node::new(false, fields.clone(), links.clone(), None).unwrap();
        let mut nodes = IndexMap::new();
        nodes.insert("n".to_string(), node);
        let dest = Schema::new(nodes.clone(), IndexMap::new(), false, false, false, None).unwrap();
        let source = Schema::new(nodes, IndexMap::new(), true, false, false, None).unwrap();
        assert!(match_schema(&dest, &source).is_none());
    }

    #[test]
    fn category_fields_unify_via_class_dimension() {
        let mut dest_fields = IndexMap::new();
        dest_fields.insert("c".to_string(), Field::Category(Category::new("k".to_string(), None).unwrap()));
        let dest_node = Node::new(false, dest_fields, IndexMap::new(), None).unwrap();
        let mut dest_nodes = IndexMap::new();
        dest_nodes.insert("n".to_string(), dest_node);
        let mut dest_classes = IndexMap::new();
        dest_classes.insert("k".to_string(), Class::new(ClassDim::Var("d".to_string()), None).unwrap());
        let dest = Schema::new(dest_nodes, dest_classes, false, false, false, None).unwrap();

        let mut source_fields = IndexMap::new();
        source_fields.insert("c".to_string(), Field::Category(Category::new("k2".to_string(), None).unwrap()));
        let source_node = Node::new(false, source_fields, IndexMap::new(), None).unwrap();
        let mut source_nodes = IndexMap::new();
        source_nodes.insert("n".to_string(), source_node);
        let mut source_classes = IndexMap::new();
        source_classes.insert("k2".to_string(), Class::new(ClassDim::Int(7), None).unwrap());
        let source = Schema::new(source_nodes, source_classes, false, false, false, None).unwrap();

        let resolved = match_schema(&dest, &source).expect("should match");
        assert_eq!(resolved.category_classes["k"].src_name.as_deref(), Some("k2"));
    }
}
