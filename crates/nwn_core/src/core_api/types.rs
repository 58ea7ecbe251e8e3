use serde::{Deserialize, Serialize};

use crate::creature::{ClassId, RaceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassEntry {
    pub class: ClassId,
    pub name: Option<String>,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub race: RaceId,
    pub race_name: Option<String>,
    pub classes: Vec<ClassEntry>,
    pub total_level: u32,
    pub base_attack: u32,
    pub feat_count: usize,
}
