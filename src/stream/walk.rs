// src/stream/walk.rs

//! Depth-first walk over a JSON value.
//!
//! Stack-based pre-order walk: children are pushed in document order and
//! popped last-first, so of two sibling subtrees the later one is visited
//! first. Object keys keep their source order (`serde_json` is built with
//! `preserve_order`), so the order is fixed for a given input and "first
//! match wins" searches are deterministic.

use serde_json::Value;

#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a Value>,
}

pub fn walk(root: &Value) -> Walk<'_> {
    Walk { stack: vec![root] }
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        let node = self.stack.pop()?;
        match node {
            Value::Object(map) => self.stack.extend(map.values()),
            Value::Array(items) => self.stack.extend(items.iter()),
            _ => {}
        }
        Some(node)
    }
}

/// First non-empty string stored under any of `keys` in any object reachable
/// from `root`. Within one object, `keys` are tried in the given order.
pub fn find_string<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a str> {
    walk(root)
        .filter_map(Value::as_object)
        .find_map(|obj| {
            keys.iter().find_map(|key| {
                obj.get(*key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
        })
}
