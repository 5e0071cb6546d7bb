//! Generator/inference round trip against a real temporary directory
//! (mirrors the in-memory version in `generate.rs`'s unit tests, but
//! exercises `LocalOpener` end to end).

use easeml_dataset_core::{Dataset, GenerateOptions, LocalOpener};
use easeml_schema_core::dim::DimElem;
use easeml_schema_core::{Category, Class, ClassDim, Field, Link, LinkUpper, Node, Schema, Tensor};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn graph_schema() -> Schema {
    let mut fields = IndexMap::new();
    fields.insert("feature".to_string(), Field::Tensor(Tensor::new(vec![DimElem::Int(3)], None, None).unwrap()));
    fields.insert("kind".to_string(), Field::Category(Category::new("kind".to_string(), None).unwrap()));
    let mut links = IndexMap::new();
    links.insert("vertex".to_string(), Link::ranged(0, LinkUpper::Finite(3)).unwrap());
    let node = Node::new(false, fields, links, None).unwrap();

    let mut nodes = IndexMap::new();
    nodes.insert("vertex".to_string(), node);

    let mut classes = IndexMap::new();
    classes.insert("kind".to_string(), Class::new(ClassDim::Int(3), None).unwrap());

    Schema::new(nodes, classes, true, false, false, None).unwrap()
}

#[test]
fn generated_dataset_on_disk_round_trips_through_inference() {
    let schema = graph_schema();
    let dir = tempfile::tempdir().expect("tempdir");
    let opener = LocalOpener::new(dir.path());

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let opts = GenerateOptions { num_samples: 4, num_node_instances: 6 };
    let dataset = Dataset::generate(&mut rng, &schema, opts).expect("schema is fully concrete");
    dataset.dump(&opener).expect("dataset writes to disk");

    let loaded = Dataset::load(&opener, true).expect("generated dataset reloads");
    let inferred = loaded.infer_schema().expect("generated dataset infers a schema");

    assert!(easeml_schema_core::matches(&schema, &inferred));
}
