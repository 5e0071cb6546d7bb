//! The default tensor payload container: a dense array format with an
//! embedded shape and dtype header, designed so a reader can parse the
//! header and stop.
//!
//! This is the widely used `.npy` container format: a fixed magic string,
//! a version, a little-endian header length, and a Python-dict-literal
//! header describing `descr` (dtype), `fortran_order` and `shape`,
//! followed by the raw array bytes in C (row-major) order.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Read, Write};

use crate::error::{DatasetError, Result};

const MAGIC: &[u8] = b"\x93NUMPY";

static DESCR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'descr':\s*'([^']+)'").expect("static regex"));
static SHAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'shape':\s*\(([^)]*)\)").expect("static regex"));

/// The header of a tensor container: its shape and declared dtype string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    pub shape: Vec<usize>,
    pub descr: String,
}

impl NpyHeader {
    /// Dtype must be 64-bit float; any other value is a dataset error.
    pub fn check_float64(&self, path: &str) -> Result<()> {
        if matches!(self.descr.as_str(), "<f8" | ">f8" | "=f8" | "|f8") {
            Ok(())
        } else {
            Err(DatasetError::at(
                format!("tensor datatype must be 64-bit float, found '{}'", self.descr),
                path.to_string(),
            ))
        }
    }
}

/// Read just the header (shape + dtype), leaving the reader positioned at
/// the start of the array payload. Used by metadata-only loads so that
/// validating a large dataset never reads an array body.
pub fn read_header<R: Read>(r: &mut R) -> Result<NpyHeader> {
    let mut magic = [0u8; 6];
    r.read_exact(&mut magic).map_err(|_| DatasetError::new("truncated tensor file: missing magic"))?;
    if magic != MAGIC {
        return Err(DatasetError::new("not a recognized tensor container (bad magic)"));
    }
    let mut version = [0u8; 2];
    r.read_exact(&mut version).map_err(|_| DatasetError::new("truncated tensor file: missing version"))?;

    let header_len = if version[0] == 1 {
        r.read_u16::<LittleEndian>().map_err(|_| DatasetError::new("truncated tensor file: missing header length"))? as usize
    } else {
        r.read_u32::<LittleEndian>().map_err(|_| DatasetError::new("truncated tensor file: missing header length"))? as usize
    };

    let mut header_bytes = vec![0u8; header_len];
    r.read_exact(&mut header_bytes).map_err(|_| DatasetError::new("truncated tensor file: missing header"))?;
    let header = String::from_utf8_lossy(&header_bytes);

    let descr = DESCR_RE
        .captures(&header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| DatasetError::new("tensor header missing 'descr'"))?;
    let shape_str = SHAPE_RE
        .captures(&header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| DatasetError::new("tensor header missing 'shape'"))?;
    let shape = shape_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| DatasetError::new("tensor header has a non-numeric shape entry")))
        .collect::<Result<Vec<usize>>>()?;

    Ok(NpyHeader { shape, descr })
}

/// Read the header and the full array payload as row-major `f64`s.
pub fn read_array<R: Read>(r: &mut R) -> Result<(Vec<usize>, Vec<f64>)> {
    let header = read_header(r)?;
    header.check_float64("")?;
    let n: usize = if header.shape.is_empty() { 1 } else { header.shape.iter().product() };
    let mut data = Vec::with_capacity(n);
    for _ in 0..n {
        data.push(r.read_f64::<LittleEndian>().map_err(|_| DatasetError::new("truncated tensor payload"))?);
    }
    Ok((header.shape, data))
}

/// Write a dense `f64` array in row-major order with an embedded shape/dtype header.
pub fn write_array<W: Write>(w: &mut W, shape: &[usize], data: &[f64]) -> std::io::Result<()> {
    let shape_tuple = if shape.len() == 1 {
        format!("({},)", shape[0])
    } else {
        format!("({})", shape.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))
    };
    let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {shape_tuple}, }}");
    // Pad so that magic(6) + version(2) + header_len(2) + header + '\n' is a multiple of 64.
    let prefix_len = 6 + 2 + 2;
    let total_unpadded = prefix_len + header.len() + 1;
    let pad = (64 - (total_unpadded % 64)) % 64;
    header.push_str(&" ".repeat(pad));
    header.push('\n');

    w.write_all(MAGIC)?;
    w.write_all(&[1, 0])?;
    w.write_u16::<LittleEndian>(header.len() as u16)?;
    w.write_all(header.as_bytes())?;
    for &v in data {
        w.write_f64::<LittleEndian>(v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_shape_and_data() {
        let mut buf = Vec::new();
        write_array(&mut buf, &[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let (shape, data) = read_array(&mut std::io::Cursor::new(buf)).unwrap();
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn header_only_read_skips_payload() {
        let mut buf = Vec::new();
        write_array(&mut buf, &[4], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let header = read_header(&mut cursor).unwrap();
        assert_eq!(header.shape, vec![4]);
        assert_eq!(header.descr, "<f8");
    }

    #[test]
    fn rejects_non_float64_dtype() {
        let header = NpyHeader { shape: vec![1], descr: "<i8".to_string() };
        assert!(header.check_float64("x").is_err());
    }
}
