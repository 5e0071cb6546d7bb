//! Link records and the three graph-property detectors.
//!
//! The cycle detector is iterative with an explicit stack rather than
//! recursive: graphs in ML datasets can easily exceed recursion limits.

use indexmap::{IndexMap, IndexSet};

use crate::error::{DatasetError, Result};

/// Reserved pseudo-node marking an implicit root (no index on the source side).
pub const SOURCE: &str = "SOURCE";
/// Reserved pseudo-node marking an implicit leaf (no index on the destination side).
pub const SINK: &str = "SINK";

/// A node-instance endpoint: `None` index only for the `SOURCE`/`SINK` sentinels.
pub type Endpoint = (String, Option<u64>);

/// One edge between an instance of one non-singleton node and an instance
/// of another (or the same).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkRecord {
    pub src_node: String,
    pub src_index: Option<u64>,
    pub dst_node: String,
    pub dst_index: Option<u64>,
}

impl LinkRecord {
    #[must_use]
    pub fn new(src_node: impl Into<String>, src_index: Option<u64>, dst_node: impl Into<String>, dst_index: Option<u64>) -> Self {
        Self { src_node: src_node.into(), src_index, dst_node: dst_node.into(), dst_index }
    }

    #[must_use]
    pub fn src(&self) -> Endpoint {
        (self.src_node.clone(), self.src_index)
    }

    #[must_use]
    pub fn dst(&self) -> Endpoint {
        (self.dst_node.clone(), self.dst_index)
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            src_node: self.dst_node.clone(),
            src_index: self.dst_index,
            dst_node: self.src_node.clone(),
            dst_index: self.src_index,
        }
    }

    fn parse_endpoint(token: &str, sentinel: &str) -> std::result::Result<(String, Option<u64>), String> {
        if let Some((name, idx)) = token.split_once('/') {
            let idx: u64 = idx.parse().map_err(|_| format!("endpoint '{token}' has a non-numeric index"))?;
            if name == sentinel {
                return Err(format!("sentinel '{sentinel}' must not carry an index, found '{token}'"));
            }
            Ok((name.to_string(), Some(idx)))
        } else if token == sentinel {
            Ok((token.to_string(), None))
        } else {
            Err(format!("endpoint '{token}' must include an index unless it is '{sentinel}'"))
        }
    }

    /// Parse one line of the link textual format: `SRC DST`.
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let src_tok = parts.next().ok_or_else(|| DatasetError::new("malformed link line: missing source endpoint"))?;
        let dst_tok = parts.next().ok_or_else(|| DatasetError::new("malformed link line: missing destination endpoint"))?;
        if parts.next().is_some() {
            return Err(DatasetError::new(format!("malformed link line: too many fields in '{line}'")));
        }
        let (src_node, src_index) = Self::parse_endpoint(src_tok, SOURCE).map_err(DatasetError::new)?;
        let (dst_node, dst_index) = Self::parse_endpoint(dst_tok, SINK).map_err(DatasetError::new)?;
        Ok(Self::new(src_node, src_index, dst_node, dst_index))
    }

    fn format_endpoint(name: &str, index: Option<u64>) -> String {
        match index {
            Some(i) => format!("{name}/{i}"),
            None => name.to_string(),
        }
    }

    /// Render back to the link textual format.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{} {}",
            Self::format_endpoint(&self.src_node, self.src_index),
            Self::format_endpoint(&self.dst_node, self.dst_index)
        )
    }
}

/// Parse a `.links.csv`-style body: one link per non-blank line.
pub fn parse_links(body: &str) -> Result<IndexSet<LinkRecord>> {
    let mut links = IndexSet::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        links.insert(LinkRecord::parse_line(line)?);
    }
    Ok(links)
}

/// Render a link set back to its textual form, one line per link.
#[must_use]
pub fn dump_links(links: &IndexSet<LinkRecord>) -> String {
    let mut out = String::new();
    for link in links {
        out.push_str(&link.to_line());
        out.push('\n');
    }
    out
}

/// Build the adjacency map for a sample's link set, adding the implicit
/// `SOURCE` edge to every node with no incoming link and the implicit
/// `SINK` edge from every node with no outgoing link. Used for exposition
/// and downstream tooling, not by the fan-in/cyclic/undirected outcomes
/// themselves, which operate on concrete node/index pairs only.
#[must_use]
pub fn adjacency_map(nodes: &IndexSet<Endpoint>, links: &IndexSet<LinkRecord>) -> IndexMap<Endpoint, Vec<Endpoint>> {
    let mut remaining: IndexSet<Endpoint> = nodes.clone();
    let mut adjacency: IndexMap<Endpoint, Vec<Endpoint>> = nodes.iter().map(|n| (n.clone(), Vec::new())).collect();

    for link in links {
        adjacency.entry(link.src()).or_default().push(link.dst());
        remaining.shift_remove(&link.dst());
    }

    for (node, adj) in &mut adjacency {
        if node.0 != SOURCE && adj.is_empty() {
            adj.push((SINK.to_string(), None));
        }
    }
    adjacency.insert((SOURCE.to_string(), None), remaining.into_iter().collect());
    adjacency
}

/// Fan-in: a destination instance receiving more than one
/// incoming link (directed), or more than two incident links (undirected,
/// since each undirected edge is represented by links in both directions).
#[must_use]
pub fn is_fanin(links: &IndexSet<LinkRecord>, undirected: bool) -> bool {
    let threshold: u32 = if undirected { 2 } else { 1 };
    let mut counts: IndexMap<Endpoint, u32> = IndexMap::new();
    for link in links {
        let count = counts.entry(link.dst()).or_insert(0);
        if *count >= threshold {
            return true;
        }
        *count += 1;
    }
    false
}

/// Undirected: every link has its reverse present.
#[must_use]
pub fn is_undirected(links: &IndexSet<LinkRecord>) -> bool {
    links.iter().all(|link| links.contains(&link.reversed()))
}

/// Cyclic: iterative DFS, with the undirected case treating
/// the immediate parent as already visited, and the directed case
/// tracking an explicit ancestor set on the (simulated) recursion stack.
#[must_use]
pub fn is_cyclic(links: &IndexSet<LinkRecord>, undirected: bool) -> bool {
    let mut adjacency: IndexMap<Endpoint, Vec<Endpoint>> = IndexMap::new();
    let mut nodes: IndexSet<Endpoint> = IndexSet::new();
    for link in links {
        nodes.insert(link.src());
        nodes.insert(link.dst());
        adjacency.entry(link.src()).or_default().push(link.dst());
    }

    if undirected {
        while let Some(start) = nodes.pop() {
            let mut stack: Vec<(Endpoint, Endpoint)> =
                adjacency.get(&start).cloned().unwrap_or_default().into_iter().map(|y| (start.clone(), y)).collect();
            while let Some((parent, x)) = stack.pop() {
                if !nodes.shift_remove(&x) {
                    return true;
                }
                for y in adjacency.get(&x).cloned().unwrap_or_default() {
                    if y != parent {
                        stack.push((x.clone(), y));
                    }
                }
            }
        }
    } else {
        while let Some(start) = nodes.iter().next().cloned() {
            let mut ancestors: IndexSet<Endpoint> = IndexSet::new();
            let mut stack = vec![start];
            while let Some(x) = stack.last().cloned() {
                if !ancestors.contains(&x) {
                    nodes.shift_remove(&x);
                    ancestors.insert(x.clone());
                    let adj = adjacency.get(&x).cloned().unwrap_or_default();
                    if adj.iter().any(|y| ancestors.contains(y)) {
                        return true;
                    }
                    for y in adj.into_iter().rev() {
                        if nodes.contains(&y) {
                            stack.push(y);
                        }
                    }
                } else {
                    stack.pop();
                    ancestors.shift_remove(&x);
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(src: &str, si: u64, dst: &str, di: u64) -> LinkRecord {
        LinkRecord::new(src, Some(si), dst, Some(di))
    }

    #[test]
    fn parses_and_renders_sentinel_endpoints() {
        let parsed = LinkRecord::parse_line("SOURCE n/2").unwrap();
        assert_eq!(parsed, LinkRecord::new(SOURCE, None, "n", Some(2)));
        assert_eq!(parsed.to_line(), "SOURCE n/2");
    }

    #[test]
    fn rejects_sentinel_with_index() {
        assert!(LinkRecord::parse_line("SOURCE/1 n/2").is_err());
    }

    #[test]
    fn detects_three_cycle() {
        let links: IndexSet<LinkRecord> =
            [l("n", 0, "n", 1), l("n", 1, "n", 2), l("n", 2, "n", 0)].into_iter().collect();
        assert!(is_cyclic(&links, false));
        assert!(!is_undirected(&links));
        assert!(!is_fanin(&links, false));
    }

    #[test]
    fn directed_chain_is_acyclic() {
        let links: IndexSet<LinkRecord> = [l("n", 0, "n", 1), l("n", 1, "n", 2)].into_iter().collect();
        assert!(!is_cyclic(&links, false));
    }

    #[test]
    fn fanin_detected_on_second_incoming_directed_link() {
        let links: IndexSet<LinkRecord> = [l("a", 0, "b", 0), l("a", 1, "b", 0)].into_iter().collect();
        assert!(is_fanin(&links, false));
    }

    #[test]
    fn undirected_pair_is_not_a_cycle() {
        let links: IndexSet<LinkRecord> = [l("n", 0, "n", 1), l("n", 1, "n", 0)].into_iter().collect();
        assert!(is_undirected(&links));
        assert!(!is_cyclic(&links, true));
    }
}
