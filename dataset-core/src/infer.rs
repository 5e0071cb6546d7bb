//! Schema inference: deriving an equivalent schema from a laid-out dataset,
//! detecting graph properties along the way.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use easeml_schema_core::dim::DimElem;
use easeml_schema_core::{Category, Class, ClassDim, Field, Link, Node, Schema, Tensor};

use crate::error::{DatasetError, Result};
use crate::file::{CategoryFile, DatasetFile, DirectoryFile, TensorFile};
use crate::links::{is_cyclic, is_fanin, is_undirected, LinkRecord};

#[derive(Debug, Clone)]
struct NodeBuilder {
    is_singleton: bool,
    fields: IndexMap<String, Field>,
    links: IndexMap<String, Link>,
}

fn int_dims(dims: &[usize]) -> Vec<DimElem> {
    dims.iter().map(|&d| DimElem::Int(d as u64)).collect()
}

fn resolve_category_class(
    labels: &[String],
    class_sets: &IndexMap<String, IndexSet<String>>,
    path: &str,
) -> Result<String> {
    for (class_name, set) in class_sets {
        if labels.iter().all(|l| set.contains(l)) {
            return Ok(class_name.clone());
        }
    }
    Err(DatasetError::at("category file does not match any class", path.to_string()))
}

/// Infer a schema from an already-loaded dataset root.
///
/// `root_children` should have been loaded with `metadata_only = true` so
/// that inferring a schema never reads a tensor's array payload, only its
/// header.
pub fn infer_schema(root_children: &IndexMap<String, DatasetFile>) -> Result<Schema> {
    let mut class_sets: IndexMap<String, IndexSet<String>> = IndexMap::new();
    let mut sch_classes: IndexMap<String, Class> = IndexMap::new();
    let mut samples: IndexMap<String, &DirectoryFile> = IndexMap::new();

    for (name, child) in root_children {
        match child {
            DatasetFile::Class(c) => {
                sch_classes.insert(name.clone(), Class::new(ClassDim::Int(c.categories.len() as u64), None)?);
                class_sets.insert(name.clone(), c.categories.iter().cloned().collect());
            }
            DatasetFile::Directory(d) => {
                samples.insert(name.clone(), d);
            }
            _ => return Err(DatasetError::at("unexpected file at dataset root", format!("/{name}"))),
        }
    }

    let mut sch_nodes: IndexMap<String, NodeBuilder> = IndexMap::new();
    let mut first_sample = true;
    let mut links_file_found = false;
    let mut sch_cyclic = false;
    let mut sch_undirected = true;
    let mut sch_fanin = false;

    for (sample_name, sample) in &samples {
        debug!(sample = %sample_name, "inferring sample");

        let mut top_tensors: IndexMap<&String, &TensorFile> = IndexMap::new();
        let mut top_categories: IndexMap<&String, &CategoryFile> = IndexMap::new();
        let mut node_dirs: IndexMap<&String, &DirectoryFile> = IndexMap::new();
        let mut links_files: Vec<(&String, &IndexSet<LinkRecord>)> = Vec::new();
        let mut sample_node_names: IndexSet<String> = IndexSet::new();

        for (child_name, child) in &sample.children {
            match child {
                DatasetFile::Tensor(t) => {
                    top_tensors.insert(child_name, t);
                    sample_node_names.insert(child_name.clone());
                }
                DatasetFile::Category(c) => {
                    top_categories.insert(child_name, c);
                    sample_node_names.insert(child_name.clone());
                }
                DatasetFile::Directory(d) => {
                    node_dirs.insert(child_name, d);
                    sample_node_names.insert(child_name.clone());
                }
                DatasetFile::Links(l) => links_files.push((child_name, &l.links)),
                DatasetFile::Class(_) => {
                    return Err(DatasetError::at(
                        "class files are only allowed at the dataset root",
                        format!("/{sample_name}/{child_name}"),
                    ));
                }
            }
        }

        if links_files.len() > 1 {
            return Err(DatasetError::at("at most one links file per sample is allowed", format!("/{sample_name}")));
        }
        if (!links_files.is_empty()) != links_file_found && !first_sample {
            return Err(DatasetError::at("links file not found in all data samples", format!("/{sample_name}")));
        }
        if !links_files.is_empty() {
            links_file_found = true;
        }

        if !first_sample {
            let schema_nodes: IndexSet<String> = sch_nodes.keys().cloned().collect();
            if let Some(missing) = schema_nodes.difference(&sample_node_names).next() {
                return Err(DatasetError::at("item expected but not found", format!("/{sample_name}/{missing}")));
            }
            if let Some(extra) = sample_node_names.difference(&schema_nodes).next() {
                return Err(DatasetError::at("item found but not expected", format!("/{sample_name}/{extra}")));
            }
        }

        for (name, tensor) in &top_tensors {
            let dim = int_dims(&tensor.dimensions);
            if first_sample {
                let mut fields = IndexMap::new();
                fields.insert("field".to_string(), Field::Tensor(Tensor::new(dim, None, None)?));
                sch_nodes.insert((*name).clone(), NodeBuilder { is_singleton: true, fields, links: IndexMap::new() });
            } else {
                let node = sch_nodes.get(*name).ok_or_else(|| {
                    DatasetError::at("item found but not expected", format!("/{sample_name}/{name}"))
                })?;
                let path = format!("/{sample_name}/{name}");
                if !node.is_singleton || node.fields.len() != 1 {
                    return Err(DatasetError::at(format!("node '{name}' not the same type in all samples"), path));
                }
                match node.fields.get("field") {
                    Some(Field::Tensor(t)) if t.dim == dim => {}
                    Some(Field::Tensor(_)) => return Err(DatasetError::at("tensor dimensions mismatch", path)),
                    _ => return Err(DatasetError::at(format!("node '{name}' not the same type in all samples"), path)),
                }
            }
        }

        for (name, cat) in &top_categories {
            let path = format!("/{sample_name}/{name}");
            let class_name = resolve_category_class(&cat.categories, &class_sets, &path)?;
            if first_sample {
                let mut fields = IndexMap::new();
                fields.insert("field".to_string(), Field::Category(Category::new(class_name, None)?));
                sch_nodes.insert((*name).clone(), NodeBuilder { is_singleton: true, fields, links: IndexMap::new() });
            } else {
                let node = sch_nodes.get(*name).ok_or_else(|| {
                    DatasetError::at("item found but not expected", path.clone())
                })?;
                if !node.is_singleton || node.fields.len() != 1 {
                    return Err(DatasetError::at(format!("node '{name}' not the same type in all samples"), path));
                }
                match node.fields.get("field") {
                    Some(Field::Category(c)) if c.category_class == class_name => {}
                    Some(Field::Category(_)) => return Err(DatasetError::at("category class mismatch", path)),
                    _ => return Err(DatasetError::at(format!("node '{name}' not the same type in all samples"), path)),
                }
            }
        }

        let mut node_instance_count: IndexMap<String, usize> = IndexMap::new();

        for (node_name, dir) in &node_dirs {
            let node_path = format!("/{sample_name}/{node_name}");
            let mut fields: IndexMap<String, Field> = if first_sample {
                IndexMap::new()
            } else {
                let node = sch_nodes.get(*node_name).ok_or_else(|| {
                    DatasetError::at("item found but not expected", node_path.clone())
                })?;
                if node.is_singleton {
                    return Err(DatasetError::at(format!("node '{node_name}' not the same type in all samples"), node_path));
                }
                node.fields.clone()
            };

            if !first_sample {
                let fields_set: IndexSet<String> = fields.keys().cloned().collect();
                let children_set: IndexSet<String> = dir.children.keys().cloned().collect();
                if let Some(missing) = fields_set.difference(&children_set).next() {
                    return Err(DatasetError::at("item expected but not found", format!("{node_path}/{missing}")));
                }
                if let Some(extra) = children_set.difference(&fields_set).next() {
                    return Err(DatasetError::at("item found but not expected", format!("{node_path}/{extra}")));
                }
            }

            for (field_name, field_file) in &dir.children {
                let field_path = format!("{node_path}/{field_name}");
                match field_file {
                    DatasetFile::Tensor(t) => {
                        let count = *t.dimensions.first().ok_or_else(|| {
                            DatasetError::at("non-singleton tensor must have at least one (instance) dimension", field_path.clone())
                        })?;
                        if let Some(existing) = node_instance_count.insert((*node_name).clone(), count) {
                            if existing != count {
                                return Err(DatasetError::at("tensor instance count mismatch", field_path));
                            }
                        }
                        let trailing = int_dims(&t.dimensions[1..]);
                        if first_sample {
                            fields.insert(field_name.clone(), Field::Tensor(Tensor::new(trailing, None, None)?));
                        } else {
                            match fields.get(field_name) {
                                Some(Field::Tensor(existing)) if existing.dim == trailing => {}
                                Some(Field::Tensor(_)) => return Err(DatasetError::at("tensor dimensions mismatch", field_path)),
                                _ => return Err(DatasetError::at(format!("node '{node_name}' not the same type in all samples"), field_path)),
                            }
                        }
                    }
                    DatasetFile::Category(c) => {
                        let class_name = resolve_category_class(&c.categories, &class_sets, &field_path)?;
                        let count = c.categories.len();
                        if let Some(existing) = node_instance_count.insert((*node_name).clone(), count) {
                            if existing != count {
                                return Err(DatasetError::at("category instance count mismatch", field_path));
                            }
                        }
                        if first_sample {
                            fields.insert(field_name.clone(), Field::Category(Category::new(class_name, None)?));
                        } else {
                            match fields.get(field_name) {
                                Some(Field::Category(existing)) if existing.category_class == class_name => {}
                                Some(Field::Category(_)) => return Err(DatasetError::at("category class mismatch", field_path)),
                                _ => return Err(DatasetError::at(format!("node '{node_name}' not the same type in all samples"), field_path)),
                            }
                        }
                    }
                    _ => {
                        return Err(DatasetError::at("unexpected file type in node directory", field_path));
                    }
                }
            }

            if first_sample {
                sch_nodes.insert((*node_name).clone(), NodeBuilder { is_singleton: false, fields, links: IndexMap::new() });
            }
        }

        match links_files.first() {
            None => {
                for (node_name, node) in sch_nodes.iter_mut() {
                    if !node.is_singleton {
                        node.links.insert(node_name.clone(), Link::exact(1)?);
                        sch_undirected = false;
                    }
                }
            }
            Some((_, links)) => {
                // A sample with only singleton nodes and an empty links
                // file is the degenerate case: nothing below has any links
                // to iterate, so this falls through as a no-op and the
                // graph flags stay at their vacuous defaults. A non-empty
                // links file with no non-singleton nodes to own it is
                // rejected below as a link to an unknown node, same as any
                // other dangling reference.
                for link in links.iter() {
                    let src_count = node_instance_count.get(&link.src_node).copied();
                    let dst_count = node_instance_count.get(&link.dst_node).copied();
                    let (Some(src_count), Some(dst_count)) = (src_count, dst_count) else {
                        return Err(DatasetError::at(
                            format!("link references unknown or singleton node '{}'", if src_count.is_none() { &link.src_node } else { &link.dst_node }),
                            format!("/{sample_name}"),
                        ));
                    };
                    if let Some(i) = link.src_index {
                        if i as usize >= src_count {
                            return Err(DatasetError::at(
                                format!("found link index {i} to node with {src_count} instances"),
                                format!("/{sample_name}"),
                            ));
                        }
                    }
                    if let Some(i) = link.dst_index {
                        if i as usize >= dst_count {
                            return Err(DatasetError::at(
                                format!("found link index {i} to node with {dst_count} instances"),
                                format!("/{sample_name}"),
                            ));
                        }
                    }
                }

                let mut pairs: IndexSet<(String, String)> = IndexSet::new();
                for link in links.iter() {
                    pairs.insert((link.src_node.clone(), link.dst_node.clone()));
                }

                for (src_node, dst_node) in pairs {
                    let src_count = node_instance_count[&src_node];
                    let mut lo = u64::MAX;
                    let mut hi = 0u64;
                    for i in 0..src_count as u64 {
                        let out_degree = links
                            .iter()
                            .filter(|l| l.src_node == src_node && l.src_index == Some(i) && l.dst_node == dst_node)
                            .count() as u64;
                        lo = lo.min(out_degree);
                        hi = hi.max(out_degree);
                    }

                    let node = sch_nodes.get_mut(&src_node).expect("validated above");
                    match node.links.get_mut(&dst_node) {
                        Some(existing) => {
                            let new_lo = existing.lo.min(lo);
                            let new_hi = match existing.hi {
                                easeml_schema_core::LinkUpper::Finite(h) => easeml_schema_core::LinkUpper::Finite(h.max(hi)),
                                easeml_schema_core::LinkUpper::Infinite => easeml_schema_core::LinkUpper::Infinite,
                            };
                            *existing = Link::ranged(new_lo, new_hi)?;
                        }
                        None => {
                            let bound = if hi == 0 {
                                Link::ranged(lo, easeml_schema_core::LinkUpper::Finite(1))?
                            } else {
                                Link::ranged(lo, easeml_schema_core::LinkUpper::Finite(hi))?
                            };
                            node.links.insert(dst_node.clone(), bound);
                        }
                    }
                }

                // Each sample's own undirected-ness decides which fan-in
                // threshold and which cyclic-detection algorithm apply to
                // it; only the aggregate across samples is conjunctive.
                let sample_undirected = is_undirected(links);
                sch_undirected = sch_undirected && sample_undirected;
                if !sch_fanin {
                    sch_fanin = is_fanin(links, sample_undirected);
                }
                if !sch_cyclic {
                    sch_cyclic = is_cyclic(links, sample_undirected);
                }
            }
        }

        first_sample = false;
    }

    let mut nodes = IndexMap::new();
    for (name, builder) in sch_nodes {
        nodes.insert(name, Node::new(builder.is_singleton, builder.fields, builder.links, None)?);
    }

    Schema::new(nodes, sch_classes, sch_cyclic, sch_undirected, sch_fanin, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opener::InMemoryOpener;
    use std::path::Path;

    fn npy_bytes(shape: &[usize], data: &[f64]) -> Vec<u8> {
        let mut buf = Vec::new();
        crate::npy::write_array(&mut buf, shape, data).unwrap();
        buf
    }

    #[test]
    fn infers_cycle_in_single_sample() {
        let opener = InMemoryOpener::new();
        opener.seed("s/n/x.ten.npy", npy_bytes(&[3, 2], &[0.0; 6]));
        opener.seed("s/links.links.csv", b"n/0 n/1\nn/1 n/2\nn/2 n/0\n".to_vec());
        let root = crate::file::load_directory_children(&opener, Path::new(""), true).unwrap();
        let schema = infer_schema(&root).unwrap();
        assert!(schema.cyclic);
        assert!(!schema.undirected);
        assert!(!schema.fanin);
    }

    #[test]
    fn rejects_dangling_link_index() {
        let opener = InMemoryOpener::new();
        opener.seed("s/n/x.ten.npy", npy_bytes(&[2, 2], &[0.0; 4]));
        opener.seed("s/links.links.csv", b"n/0 n/5\n".to_vec());
        let root = crate::file::load_directory_children(&opener, Path::new(""), true).unwrap();
        let err = infer_schema(&root).unwrap_err();
        assert!(err.path.contains("/s"));
    }

    #[test]
    fn accepts_degenerate_sample_with_only_singletons_and_an_empty_links_file() {
        let opener = InMemoryOpener::new();
        opener.seed("s/x.ten.npy", npy_bytes(&[2], &[1.0, 2.0]));
        opener.seed("s/links.links.csv", b"".to_vec());
        let root = crate::file::load_directory_children(&opener, Path::new(""), true).unwrap();
        let schema = infer_schema(&root).unwrap();
        assert!(schema.nodes["x"].is_singleton);
        assert!(!schema.cyclic);
        assert!(schema.undirected);
        assert!(!schema.fanin);
    }

    #[test]
    fn rejects_non_empty_links_file_with_no_non_singleton_nodes() {
        let opener = InMemoryOpener::new();
        opener.seed("s/x.ten.npy", npy_bytes(&[2], &[1.0, 2.0]));
        opener.seed("s/links.links.csv", b"n/0 n/1\n".to_vec());
        let root = crate::file::load_directory_children(&opener, Path::new(""), true).unwrap();
        let err = infer_schema(&root).unwrap_err();
        assert!(err.message.contains("unknown"));
    }

    #[test]
    fn undirected_detection_is_per_sample_not_the_running_aggregate() {
        let opener = InMemoryOpener::new();
        // Sample "a" is purely directed (no reverse edge), so it flips the
        // running `undirected` aggregate to false before "b" is processed.
        opener.seed("a/n/x.ten.npy", npy_bytes(&[2, 2], &[0.0; 4]));
        opener.seed("a/links.links.csv", b"n/0 n/1\n".to_vec());
        // Sample "b" only has a reciprocal pair: undirected, and not cyclic
        // under undirected semantics, but a directed cyclic check would
        // misread it as a 2-cycle if it used the stale running aggregate.
        opener.seed("b/n/x.ten.npy", npy_bytes(&[2, 2], &[0.0; 4]));
        opener.seed("b/links.links.csv", b"n/0 n/1\nn/1 n/0\n".to_vec());

        let root = crate::file::load_directory_children(&opener, Path::new(""), true).unwrap();
        let schema = infer_schema(&root).unwrap();
        assert!(!schema.undirected);
        assert!(!schema.cyclic);
    }

    #[test]
    fn link_lower_bound_is_zero_when_some_instance_has_no_outgoing_link() {
        let opener = InMemoryOpener::new();
        opener.seed("s/n/x.ten.npy", npy_bytes(&[3, 2], &[0.0; 6]));
        // Instance 0 has no outgoing link to n; instances 1 and 2 each have one.
        opener.seed("s/links.links.csv", b"n/1 n/2\nn/2 n/0\n".to_vec());
        let root = crate::file::load_directory_children(&opener, Path::new(""), true).unwrap();
        let schema = infer_schema(&root).unwrap();
        let link = &schema.nodes["n"].links["n"];
        assert_eq!(link.lo, 0);
    }
}
