//! Dataset generation: the inverse of inference. Given a fully
//! concrete schema, synthesizes a random but valid dataset tree.

use indexmap::IndexMap;
use rand::distributions::{Alphanumeric, Uniform};
use rand::prelude::SliceRandom;
use rand::{Rng, RngCore};
use tracing::debug;

use easeml_schema_core::dim::DimElem;
use easeml_schema_core::{ClassDim, Field, LinkUpper, Schema};

use crate::error::{DatasetError, Result};
use crate::file::{CategoryFile, ClassFile, DatasetFile, DirectoryFile, TensorFile, TensorSubtype};
use crate::links::LinkRecord;

/// Number of random, opaque-naming characters used for sample/class directory names.
const NAME_LEN: usize = 16;

/// Tunable knobs controlling how much data generation synthesizes.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub num_samples: usize,
    pub num_node_instances: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { num_samples: 10, num_node_instances: 10 }
    }
}

fn random_name(rng: &mut impl RngCore) -> String {
    rng.sample_iter(&Alphanumeric).take(NAME_LEN).map(char::from).map(|c| c.to_ascii_lowercase()).collect()
}

fn concrete_dim(dim: &[DimElem], path: &str) -> Result<Vec<usize>> {
    dim.iter()
        .map(|d| match d {
            DimElem::Int(n) => Ok(*n as usize),
            DimElem::Var(..) => Err(DatasetError::at("cannot generate data for a variable schema", path.to_string())),
        })
        .collect()
}

fn random_tensor(rng: &mut impl RngCore, dim: &[usize]) -> Vec<f64> {
    let n: usize = dim.iter().product::<usize>().max(1);
    (0..n).map(|_| rng.gen_range(0.0..1.0)).collect()
}

/// Generate a schema's category classes: `dim` random, opaque labels each.
fn generate_classes(rng: &mut impl RngCore, schema: &Schema) -> Result<(IndexMap<String, ClassFile>, IndexMap<String, Vec<String>>)> {
    let mut files = IndexMap::new();
    let mut labels_by_class = IndexMap::new();
    for (class_name, class) in &schema.category_classes {
        let ClassDim::Int(n) = class.dim else {
            return Err(DatasetError::at("cannot generate data for a variable schema", format!("classes.{class_name}")));
        };
        let labels: Vec<String> = (0..n).map(|_| random_name(rng)).collect();
        files.insert(class_name.clone(), ClassFile { name: class_name.clone(), categories: labels.clone() });
        labels_by_class.insert(class_name.clone(), labels);
    }
    Ok((files, labels_by_class))
}

fn choose<'a, T>(rng: &mut impl RngCore, items: &'a [T]) -> &'a T {
    items.choose(rng).expect("caller guarantees a non-empty slice")
}

/// Generate one sample's node files (tensors/categories), without links.
fn generate_sample_nodes(
    rng: &mut impl RngCore,
    schema: &Schema,
    labels_by_class: &IndexMap<String, Vec<String>>,
    opts: GenerateOptions,
) -> Result<IndexMap<String, DatasetFile>> {
    let mut nodes = IndexMap::new();

    for (node_name, node) in &schema.nodes {
        if node.is_singleton {
            let field = node.fields.values().next().expect("singleton node has exactly one field");
            let file = match field {
                Field::Tensor(t) => {
                    let dim = concrete_dim(&t.dim, &format!("nodes.{node_name}"))?;
                    let data = random_tensor(rng, &dim);
                    DatasetFile::Tensor(TensorFile { name: node_name.clone(), dimensions: dim, data: Some(data), subtype: TensorSubtype::Default })
                }
                Field::Category(c) => {
                    let labels = labels_by_class
                        .get(&c.category_class)
                        .ok_or_else(|| DatasetError::new(format!("undefined class '{}'", c.category_class)))?;
                    DatasetFile::Category(CategoryFile { name: node_name.clone(), categories: vec![choose(rng, labels).clone()] })
                }
            };
            nodes.insert(node_name.clone(), file);
        } else {
            let mut children = IndexMap::new();
            for (field_name, field) in &node.fields {
                let file = match field {
                    Field::Tensor(t) => {
                        let mut dim = concrete_dim(&t.dim, &format!("nodes.{node_name}.fields.{field_name}"))?;
                        dim.insert(0, opts.num_node_instances);
                        let data = random_tensor(rng, &dim);
                        DatasetFile::Tensor(TensorFile { name: field_name.clone(), dimensions: dim, data: Some(data), subtype: TensorSubtype::Default })
                    }
                    Field::Category(c) => {
                        let labels = labels_by_class
                            .get(&c.category_class)
                            .ok_or_else(|| DatasetError::new(format!("undefined class '{}'", c.category_class)))?;
                        let categories = (0..opts.num_node_instances).map(|_| choose(rng, labels).clone()).collect();
                        DatasetFile::Category(CategoryFile { name: field_name.clone(), categories })
                    }
                };
                children.insert(field_name.clone(), file);
            }
            nodes.insert(node_name.clone(), DatasetFile::Directory(DirectoryFile { name: node_name.clone(), children }));
        }
    }

    Ok(nodes)
}

/// Generate one sample's link set, honoring the schema's `cyclic`,
/// `undirected` and `fanin` flags.
fn generate_sample_links(rng: &mut impl RngCore, schema: &Schema, opts: GenerateOptions) -> Vec<LinkRecord> {
    let n = opts.num_node_instances;
    let non_singleton: Vec<String> =
        schema.nodes.iter().filter(|(_, node)| !node.is_singleton).map(|(name, _)| name.clone()).collect();

    if non_singleton.is_empty() {
        return Vec::new();
    }

    let mut all_instances: IndexMap<String, Vec<usize>> = IndexMap::new();
    let mut count_in: IndexMap<(String, usize), u64> = IndexMap::new();
    let mut count_out: IndexMap<(String, usize), u64> = IndexMap::new();
    for name in &non_singleton {
        let mut instances: Vec<usize> = (0..n).collect();
        instances.shuffle(rng);
        for i in 0..n {
            count_in.insert((name.clone(), i), 0);
            count_out.insert((name.clone(), i), 0);
        }
        all_instances.insert(name.clone(), instances);
    }
    let mut max_idx_in: IndexMap<(String, usize, String), usize> = IndexMap::new();
    let mut links: Vec<LinkRecord> = Vec::new();

    for node_name in &non_singleton {
        let instances = all_instances[node_name].clone();
        for i in 0..instances.len() {
            let node = &schema.nodes[node_name];
            for (target, link) in &node.links {
                let l_bound = link.lo;
                let u_bound = match link.hi {
                    LinkUpper::Finite(h) => h.min(n as u64),
                    LinkUpper::Infinite => n as u64,
                };
                if l_bound > u_bound {
                    continue;
                }
                let drawn = rng.sample(Uniform::new_inclusive(l_bound, u_bound));
                let out_so_far = count_out[&(node_name.to_string(), i)];
                if drawn <= out_so_far {
                    continue;
                }
                let count = (drawn - out_so_far) as usize;

                let target_instances = &all_instances[target];
                let mut candidates: Vec<usize> = (0..target_instances.len()).collect();

                if !schema.cyclic {
                    if schema.undirected {
                        candidates.retain(|&x| x != i && count_in[&(target.clone(), x)] == 0);
                    } else if target == node_name {
                        candidates.retain(|&x| x > i);
                    } else {
                        let idx = max_idx_in.get(&(node_name.to_string(), i, target.clone())).copied();
                        candidates.retain(|&x| idx.map_or(true, |idx| x > idx));
                    }
                }

                if !schema.fanin {
                    let max_count = if schema.undirected { 2 } else { 1 };
                    candidates.retain(|&x| count_in[&(target.clone(), x)] < max_count);
                }

                for &j in candidates.iter().take(count) {
                    *count_out.get_mut(&(node_name.to_string(), i)).unwrap() += 1;
                    *count_in.get_mut(&(target.clone(), j)).unwrap() += 1;
                    links.push(LinkRecord::new(node_name.to_string(), Some(i as u64), target.clone(), Some(j as u64)));

                    let entry = max_idx_in.entry((node_name.to_string(), i, target.clone())).or_insert(0);
                    *entry = (*entry).max(j);

                    if schema.undirected {
                        *count_out.get_mut(&(target.clone(), j)).unwrap() += 1;
                        *count_in.get_mut(&(node_name.to_string(), i)).unwrap() += 1;
                        links.push(LinkRecord::new(target.clone(), Some(j as u64), node_name.to_string(), Some(i as u64)));

                        let entry = max_idx_in.entry((target.clone(), j, node_name.to_string())).or_insert(0);
                        *entry = (*entry).max(i);
                    }
                }
            }
        }
    }

    links
}

/// Generate a complete synthetic dataset tree from a fully concrete schema.
pub fn generate_from_schema(rng: &mut impl RngCore, schema: &Schema, opts: GenerateOptions) -> Result<IndexMap<String, DatasetFile>> {
    if schema.is_variable() {
        return Err(DatasetError::new("cannot generate a dataset from a schema with unresolved dimension variables"));
    }

    let (class_files, labels_by_class) = generate_classes(rng, schema)?;

    let mut root: IndexMap<String, DatasetFile> = IndexMap::new();
    for (class_name, file) in class_files {
        root.insert(class_name, DatasetFile::Class(file));
    }

    for sample_idx in 0..opts.num_samples {
        let sample_name = random_name(rng);
        debug!(sample = %sample_name, index = sample_idx, "generating sample");

        let mut children = generate_sample_nodes(rng, schema, &labels_by_class, opts)?;
        let links = generate_sample_links(rng, schema, opts);
        if schema.nodes.values().any(|n| !n.is_singleton) {
            children.insert(
                "links".to_string(),
                DatasetFile::Links(crate::file::LinksFile { name: "links".to_string(), links: links.into_iter().collect() }),
            );
        }

        root.insert(sample_name, DatasetFile::Directory(DirectoryFile { name: String::new(), children }));
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer_schema;
    use crate::opener::InMemoryOpener;
    use easeml_schema_core::{Category, Class, Link, Node, Tensor};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::path::Path;

    fn simple_schema() -> Schema {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Field::Tensor(Tensor::new(vec![DimElem::Int(3)], None, None).unwrap()));
        let node = Node::new(false, fields, IndexMap::new(), None).unwrap();
        let mut nodes = IndexMap::new();
        nodes.insert("n".to_string(), node);
        Schema::new(nodes, IndexMap::new(), false, false, false, None).unwrap()
    }

    fn schema_with_class() -> Schema {
        let mut fields = IndexMap::new();
        fields.insert("label".to_string(), Field::Category(Category::new("c".to_string(), None).unwrap()));
        let node = Node::new(true, fields, IndexMap::new(), None).unwrap();
        let mut nodes = IndexMap::new();
        nodes.insert("item".to_string(), node);
        let mut classes = IndexMap::new();
        classes.insert("c".to_string(), Class::new(ClassDim::Int(4), None).unwrap());
        Schema::new(nodes, classes, false, false, false, None).unwrap()
    }

    #[test]
    fn generates_requested_sample_count() {
        let schema = simple_schema();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let opts = GenerateOptions { num_samples: 3, num_node_instances: 5 };
        let root = generate_from_schema(&mut rng, &schema, opts).unwrap();
        assert_eq!(root.len(), 3);
    }

    #[test]
    fn generated_dataset_round_trips_through_inference() {
        let schema = schema_with_class();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let opts = GenerateOptions { num_samples: 2, num_node_instances: 5 };
        let root = generate_from_schema(&mut rng, &schema, opts).unwrap();

        let opener = InMemoryOpener::new();
        crate::file::dump_directory_children(&opener, Path::new(""), &root).unwrap();
        let loaded = crate::file::load_directory_children(&opener, Path::new(""), true).unwrap();
        let inferred = infer_schema(&loaded).unwrap();

        assert!(schema.nodes["item"].is_singleton);
        assert_eq!(inferred.nodes["item"].fields.len(), 1);
    }

    #[test]
    fn undirected_link_generation_has_matching_reverses() {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Field::Tensor(Tensor::new(vec![DimElem::Int(1)], None, None).unwrap()));
        let mut links = IndexMap::new();
        links.insert("n".to_string(), Link::ranged(0, LinkUpper::Finite(2)).unwrap());
        let node = Node::new(false, fields, links, None).unwrap();
        let mut nodes = IndexMap::new();
        nodes.insert("n".to_string(), node);
        let schema = Schema::new(nodes, IndexMap::new(), false, true, false, None).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let links = generate_sample_links(&mut rng, &schema, GenerateOptions { num_samples: 1, num_node_instances: 6 });
        for link in &links {
            assert!(links.iter().any(|l| l == &link.reversed()));
        }
    }
}
