use crate::modules::store::GroupDocument;
use crate::utils::users::models::UserProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub event_id: String,
    pub members: Vec<String>,
    pub member_count: usize,
    #[serde(skip)]
    pub version: i64,
}

impl Group {
    pub fn contains(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }

    pub fn has_room(&self, max_size: usize) -> bool {
        self.members.len() < max_size
    }
}

impl From<GroupDocument> for Group {
    /// Repairs what the store handed back: repeated members are dropped and the
    /// count is recomputed. Either defect is logged as data corruption.
    fn from(doc: GroupDocument) -> Self {
        let mut seen = HashSet::new();
        let members: Vec<String> = doc
            .members
            .iter()
            .filter(|member| seen.insert(member.as_str()))
            .cloned()
            .collect();

        if members.len() != doc.members.len() {
            warn!(group_id = %doc.id, "DataCorruption: repeated group members");
        }
        if usize::try_from(doc.member_count).ok() != Some(members.len()) {
            warn!(
                group_id = %doc.id,
                stored = doc.member_count,
                actual = members.len(),
                "DataCorruption: memberCount disagrees with members"
            );
        }

        Group {
            id: doc.id,
            event_id: doc.event_id,
            member_count: members.len(),
            members,
            version: doc.version,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroup {
    pub max_size: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedGroup {
    pub group_id: Uuid,
}

/// Group with member ids resolved to display profiles.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: Uuid,
    pub event_id: String,
    pub members: Vec<UserProfile>,
    pub member_count: usize,
}
