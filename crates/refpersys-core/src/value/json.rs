//! Boxed JSON values (spec §4.4 `Boxed JSON`): an owned, reference-counted
//! pointer to an external JSON tree with a structural hash (spec §4.3).

use super::nonzero;
use std::sync::Arc;

/// A JSON value owned by a single reference-counted allocation.
#[derive(Debug, Clone)]
pub struct BoxedJson {
    tree: Arc<serde_json::Value>,
    hash: u32,
}

impl BoxedJson {
    pub fn new(tree: serde_json::Value) -> BoxedJson {
        let hash = json_hash(&tree);
        BoxedJson {
            tree: Arc::new(tree),
            hash,
        }
    }

    pub fn get(&self) -> &serde_json::Value {
        &self.tree
    }

    pub fn hash32(&self) -> u32 {
        self.hash
    }
}

impl PartialEq for BoxedJson {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

/// Structural hash: object keys are sorted before hashing so permuting keys
/// never changes the hash; arrays are order-sensitive; numeric and boolean
/// leaves contribute typed constants so `1` and `"1"` and `true` never
/// collide.
pub fn json_hash(v: &serde_json::Value) -> u32 {
    use serde_json::Value as J;
    let h = match v {
        J::Null => 0x9E37_79B1,
        J::Bool(false) => 0xB001_0000,
        J::Bool(true) => 0xB001_0001,
        J::Number(n) => hash_bytes(n.to_string().as_bytes()) ^ 0x4E55_4D00,
        J::String(s) => hash_bytes(s.as_bytes()) ^ 0x5354_5200,
        J::Array(items) => items
            .iter()
            .fold(0x4152_5200u32, |acc, item| acc.rotate_left(5) ^ json_hash(item)),
        J::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            keys.iter().fold(0x4F42_4A00u32, |acc, key| {
                let key_hash = hash_bytes(key.as_bytes());
                let val_hash = json_hash(&map[*key]);
                acc ^ key_hash.rotate_left((val_hash % 31) as u32)
            })
        }
    };
    nonzero(h)
}

fn hash_bytes(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(2_166_136_261u32, |acc, &b| (acc ^ b as u32).wrapping_mul(16_777_619))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn permuting_object_keys_does_not_change_the_hash() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(json_hash(&a), json_hash(&b));
    }

    #[test]
    fn array_order_matters() {
        let a = json!([1, 2]);
        let b = json!([2, 1]);
        assert_ne!(json_hash(&a), json_hash(&b));
    }

    #[test]
    fn typed_leaves_do_not_collide() {
        assert_ne!(json_hash(&json!(1)), json_hash(&json!("1")));
        assert_ne!(json_hash(&json!(true)), json_hash(&json!(1)));
    }
}
