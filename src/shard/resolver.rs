use serde::Serialize;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Placeholder in the shard URL template that is replaced by the shard index.
pub const SHARD_PLACEHOLDER: char = '#';

/// A backend shard: its 1-based index and the base URL that file keys are appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardAddress {
    pub index: u32,
    pub url: String,
}

pub struct ShardResolver {
    shard_count: u32,
    shards: Vec<ShardAddress>,
}

impl ShardResolver {
    /// Derives every shard address from `template` up front.
    ///
    /// A template containing `#` has each `#` replaced by the shard index. Any
    /// other template is treated as a base URL and becomes
    /// `{template}/{index}/api/fileserver`.
    ///
    /// `shard_count` must be at least 1.
    pub fn new(template: &str, shard_count: u32) -> Self {
        assert!(shard_count > 0, "shard_count must be at least 1");

        let template = template.trim_end_matches('/');
        let shards = (1..=shard_count)
            .map(|index| ShardAddress {
                index,
                url: expand_template(template, index),
            })
            .collect();

        Self {
            shard_count,
            shards,
        }
    }

    /// Returns the 1-based shard index that owns `key`.
    pub fn resolve(&self, key: &str) -> u32 {
        (fnv1a_32(key.as_bytes()) % self.shard_count) + 1
    }

    pub fn shard_for(&self, key: &str) -> &ShardAddress {
        let index = self.resolve(key);
        &self.shards[(index - 1) as usize]
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    pub fn shards(&self) -> &[ShardAddress] {
        &self.shards
    }
}

fn expand_template(template: &str, index: u32) -> String {
    if template.contains(SHARD_PLACEHOLDER) {
        template.replace(SHARD_PLACEHOLDER, &index.to_string())
    } else {
        format!("{}/{}/api/fileserver", template, index)
    }
}

/// 32-bit FNV-1a. Keeps placement compatible with shards populated by
/// other FNV-1a based clients.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

