//! Deterministic presentation order for per-node results.
//!
//! Results are ordered by (cluster name, node name) using natural ordering,
//! so `mx2` sorts before `mx10`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::node::Node;

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Digits(&'a str),
    Text(&'a str),
}

/// Splits a string into alternating runs of ASCII digits and other text
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());

        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;

        Some(if digits {
            Segment::Digits(run)
        } else {
            Segment::Text(run)
        })
    }
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_value = a.trim_start_matches('0');
    let b_value = b.trim_start_matches('0');

    a_value
        .len()
        .cmp(&b_value.len())
        .then_with(|| a_value.cmp(b_value))
        // Same value: fewer leading zeros first
        .then_with(|| a.len().cmp(&b.len()))
}

fn compare_segment(a: Segment<'_>, b: Segment<'_>) -> Ordering {
    match (a, b) {
        (Segment::Digits(x), Segment::Digits(y)) => compare_digits(x, y),
        (Segment::Digits(_), Segment::Text(_)) => Ordering::Less,
        (Segment::Text(_), Segment::Digits(_)) => Ordering::Greater,
        (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
    }
}

/// Compare two strings, treating embedded digit runs as numbers
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Segments { rest: a };
    let mut right = Segments { rest: b };

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_segment(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Order two nodes by cluster name, then node name
pub fn node_cmp(a: &Node, b: &Node) -> Ordering {
    natural_cmp(&a.cluster, &b.cluster).then_with(|| natural_cmp(&a.name, &b.name))
}

/// Sort a slice of nodes in place
pub fn sort_nodes(nodes: &mut [Arc<Node>]) {
    nodes.sort_by(|a, b| node_cmp(a, b));
}

/// Turn an unordered `{node: value}` map into a stably ordered sequence
pub fn sort_by_node<V>(results: HashMap<Arc<Node>, V>) -> Vec<(Arc<Node>, V)> {
    let mut ordered: Vec<(Arc<Node>, V)> = results.into_iter().collect();
    ordered.sort_by(|(a, _), (b, _)| node_cmp(a, b));
    ordered
}
