//! The typed file tree: directories, tensors, categories, classes and
//! links, identified by extension.

use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};
use crate::links::{parse_links, LinkRecord};
use crate::npy;
use crate::opener::Opener;

/// Subtype of a tensor payload: the default dense binary container, or CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorSubtype {
    Default,
    Csv,
}

/// A single node in the dataset tree, tagged by the kind of file it represents.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetFile {
    Directory(DirectoryFile),
    Tensor(TensorFile),
    Category(CategoryFile),
    Class(ClassFile),
    Links(LinksFile),
}

impl DatasetFile {
    #[must_use]
    pub fn as_directory(&self) -> Option<&DirectoryFile> {
        match self {
            Self::Directory(d) => Some(d),
            _ => None,
        }
    }
}

/// A plain directory: any name not recognized as one of the typed extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryFile {
    pub name: String,
    pub children: IndexMap<String, DatasetFile>,
}

/// A dense array payload, either the default binary container or CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorFile {
    pub name: String,
    pub dimensions: Vec<usize>,
    /// `None` when loaded metadata-only.
    pub data: Option<Vec<f64>>,
    pub subtype: TensorSubtype,
}

/// An ordered list of labels, one per instance (or length 1 for a singleton).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFile {
    pub name: String,
    pub categories: Vec<String>,
}

impl CategoryFile {
    /// Whether every label in this file belongs to `category_set`.
    #[must_use]
    pub fn belongs_to_set(&self, category_set: &IndexSet<String>) -> bool {
        self.categories.iter().all(|c| category_set.contains(c))
    }
}

/// The set of distinct labels a [`CategoryFile`] may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub name: String,
    pub categories: Vec<String>,
}

/// A sample's link set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinksFile {
    pub name: String,
    pub links: IndexSet<LinkRecord>,
}

const TENSOR_DEFAULT_EXT: &str = ".ten.npy";
const TENSOR_CSV_EXT: &str = ".ten.csv";
const CATEGORY_EXT: &str = ".cat.txt";
const CLASS_EXT: &str = ".class.txt";
const LINKS_EXT: &str = ".links.csv";

fn strip_text(body: &[u8]) -> Result<String> {
    String::from_utf8(body.to_vec()).map_err(|e| DatasetError::new(format!("file is not valid UTF-8: {e}")))
}

fn lines_stripped(body: &str) -> Vec<String> {
    body.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect()
}

fn load_csv_tensor(body: &str, metadata_only: bool) -> Result<(Vec<usize>, Option<Vec<f64>>)> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).trim(csv::Trim::All).from_reader(body.as_bytes());

    let mut rows: Vec<csv::StringRecord> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record);
    }

    let n_rows = rows.len();
    let n_cols = rows.first().map(csv::StringRecord::len).unwrap_or(0);
    let shape = if n_cols <= 1 { vec![n_rows] } else { vec![n_rows, n_cols] };

    if metadata_only {
        return Ok((shape, None));
    }

    let mut data = Vec::with_capacity(n_rows * n_cols.max(1));
    for row in &rows {
        for field in row.iter() {
            let v: f64 = field
                .parse()
                .map_err(|_| DatasetError::new(format!("malformed CSV tensor field '{field}'")))?;
            data.push(v);
        }
    }
    Ok((shape, Some(data)))
}

fn dump_csv_tensor(dimensions: &[usize], data: &[f64]) -> Result<Vec<u8>> {
    let (n_rows, n_cols) = match dimensions {
        [n] => (*n, 1),
        [n, m] => (*n, *m),
        _ => return Err(DatasetError::new("CSV tensors must be rank 1 or 2")),
    };
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for row in 0..n_rows {
        let fields: Vec<String> = (0..n_cols).map(|col| data[row * n_cols + col].to_string()).collect();
        writer.write_record(&fields)?;
    }
    writer.into_inner().map_err(|e| DatasetError::new(format!("failed to serialize CSV tensor: {e}")))
}

/// Join a relative path and a child name, treating an empty name as a no-op.
fn join(rel_path: &Path, name: &str) -> PathBuf {
    if name.is_empty() {
        rel_path.to_path_buf()
    } else {
        rel_path.join(name)
    }
}

/// Load the children of a directory, recognizing typed files by extension.
pub fn load_directory_children(
    opener: &dyn Opener,
    rel_path: &Path,
    metadata_only: bool,
) -> Result<IndexMap<String, DatasetFile>> {
    let mut children = IndexMap::new();
    for entry in opener.list(rel_path)? {
        let path_str = entry.as_str();

        let (base, kind) = if let Some(b) = path_str.strip_suffix(TENSOR_DEFAULT_EXT) {
            (b, Some(("tensor", TensorSubtype::Default)))
        } else if let Some(b) = path_str.strip_suffix(TENSOR_CSV_EXT) {
            (b, Some(("tensor", TensorSubtype::Csv)))
        } else if let Some(b) = path_str.strip_suffix(CATEGORY_EXT) {
            (b, Some(("category", TensorSubtype::Default)))
        } else if let Some(b) = path_str.strip_suffix(CLASS_EXT) {
            (b, Some(("class", TensorSubtype::Default)))
        } else if let Some(b) = path_str.strip_suffix(LINKS_EXT) {
            (b, Some(("links", TensorSubtype::Default)))
        } else {
            (path_str, None)
        };

        let child_path = join(rel_path, path_str);
        let child = match kind {
            Some(("tensor", subtype)) => DatasetFile::Tensor(load_tensor(opener, &child_path, base, subtype, metadata_only)?),
            Some(("category", _)) => DatasetFile::Category(load_category(opener, &child_path, base)?),
            Some(("class", _)) => DatasetFile::Class(load_class(opener, &child_path, base)?),
            Some(("links", _)) => DatasetFile::Links(load_links(opener, &child_path, base)?),
            _ => {
                let grandchildren = load_directory_children(opener, &child_path, metadata_only)?;
                DatasetFile::Directory(DirectoryFile { name: base.to_string(), children: grandchildren })
            }
        };
        children.insert(base.to_string(), child);
    }
    Ok(children)
}

fn load_tensor(opener: &dyn Opener, path: &Path, name: &str, subtype: TensorSubtype, metadata_only: bool) -> Result<TensorFile> {
    let path_str = path.display().to_string();
    match subtype {
        TensorSubtype::Default => {
            let mut reader = opener.open_read(path)?;
            if metadata_only {
                let header = npy::read_header(&mut reader).map_err(|e| e.with_path_if_empty(path_str.clone()))?;
                header.check_float64(&path_str)?;
                Ok(TensorFile { name: name.to_string(), dimensions: header.shape, data: None, subtype })
            } else {
                let (shape, data) = npy::read_array(&mut reader).map_err(|e| e.with_path_if_empty(path_str.clone()))?;
                Ok(TensorFile { name: name.to_string(), dimensions: shape, data: Some(data), subtype })
            }
        }
        TensorSubtype::Csv => {
            let bytes = opener.read(path)?;
            let body = strip_text(&bytes).map_err(|e| e.with_path_if_empty(path_str.clone()))?;
            let (shape, data) = load_csv_tensor(&body, metadata_only).map_err(|e| e.with_path_if_empty(path_str.clone()))?;
            Ok(TensorFile { name: name.to_string(), dimensions: shape, data, subtype })
        }
    }
}

fn load_category(opener: &dyn Opener, path: &Path, name: &str) -> Result<CategoryFile> {
    let bytes = opener.read(path)?;
    let body = strip_text(&bytes).map_err(|e| e.with_path_if_empty(path.display().to_string()))?;
    Ok(CategoryFile { name: name.to_string(), categories: lines_stripped(&body) })
}

fn load_class(opener: &dyn Opener, path: &Path, name: &str) -> Result<ClassFile> {
    let bytes = opener.read(path)?;
    let body = strip_text(&bytes).map_err(|e| e.with_path_if_empty(path.display().to_string()))?;
    let categories = lines_stripped(&body);
    let mut seen = IndexSet::new();
    for c in &categories {
        if !seen.insert(c.clone()) {
            return Err(DatasetError::at(
                format!("duplicate class label '{c}'"),
                path.display().to_string(),
            ));
        }
    }
    Ok(ClassFile { name: name.to_string(), categories })
}

fn load_links(opener: &dyn Opener, path: &Path, name: &str) -> Result<LinksFile> {
    let bytes = opener.read(path)?;
    let body = strip_text(&bytes).map_err(|e| e.with_path_if_empty(path.display().to_string()))?;
    let links = parse_links(&body).map_err(|e| e.with_path_if_empty(path.display().to_string()))?;
    Ok(LinksFile { name: name.to_string(), links })
}

/// Dump a directory's children back to an opener.
pub fn dump_directory_children(opener: &dyn Opener, rel_path: &Path, children: &IndexMap<String, DatasetFile>) -> Result<()> {
    opener.ensure_dir(rel_path)?;
    for (name, child) in children {
        dump_file(opener, rel_path, name, child)?;
    }
    Ok(())
}

fn dump_file(opener: &dyn Opener, rel_path: &Path, name: &str, file: &DatasetFile) -> Result<()> {
    match file {
        DatasetFile::Directory(d) => {
            let path = join(rel_path, name);
            dump_directory_children(opener, &path, &d.children)
        }
        DatasetFile::Tensor(t) => dump_tensor(opener, rel_path, name, t),
        DatasetFile::Category(c) => {
            let path = join(rel_path, &format!("{name}{CATEGORY_EXT}"));
            let body: String = c.categories.iter().map(|l| format!("{l}\n")).collect();
            opener.write(&path, body.as_bytes())
        }
        DatasetFile::Class(c) => {
            let path = join(rel_path, &format!("{name}{CLASS_EXT}"));
            let body: String = c.categories.iter().map(|l| format!("{l}\n")).collect();
            opener.write(&path, body.as_bytes())
        }
        DatasetFile::Links(l) => {
            let path = join(rel_path, &format!("{name}{LINKS_EXT}"));
            opener.write(&path, crate::links::dump_links(&l.links).as_bytes())
        }
    }
}

fn dump_tensor(opener: &dyn Opener, rel_path: &Path, name: &str, tensor: &TensorFile) -> Result<()> {
    let data = tensor
        .data
        .as_ref()
        .ok_or_else(|| DatasetError::new("cannot dump a tensor loaded metadata-only"))?;
    match tensor.subtype {
        TensorSubtype::Default => {
            let path = join(rel_path, &format!("{name}{TENSOR_DEFAULT_EXT}"));
            let mut buf = Vec::new();
            npy::write_array(&mut buf, &tensor.dimensions, data).map_err(DatasetError::from)?;
            opener.write(&path, &buf)
        }
        TensorSubtype::Csv => {
            let path = join(rel_path, &format!("{name}{TENSOR_CSV_EXT}"));
            let body = dump_csv_tensor(&tensor.dimensions, data)?;
            opener.write(&path, &body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opener::InMemoryOpener;

    #[test]
    fn recognizes_extensions_and_strips_them() {
        let opener = InMemoryOpener::new();
        opener.seed("a.cat.txt", b"red\nblue\n".to_vec());
        let children = load_directory_children(&opener, Path::new(""), false).unwrap();
        assert!(children.contains_key("a"));
        assert!(matches!(children["a"], DatasetFile::Category(_)));
    }

    #[test]
    fn class_file_rejects_duplicates() {
        let opener = InMemoryOpener::new();
        opener.seed("c.class.txt", b"red\nred\n".to_vec());
        let err = load_directory_children(&opener, Path::new(""), false).unwrap_err();
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn csv_tensor_shape_is_rows_by_cols() {
        let opener = InMemoryOpener::new();
        opener.seed("t.ten.csv", b"1,2,3\n4,5,6\n".to_vec());
        let children = load_directory_children(&opener, Path::new(""), false).unwrap();
        let DatasetFile::Tensor(t) = &children["t"] else { panic!("expected tensor") };
        assert_eq!(t.dimensions, vec![2, 3]);
        assert_eq!(t.data.as_ref().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
