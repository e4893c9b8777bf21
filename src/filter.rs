//! Client-side derived views: free-text search and status tabs.
//!
//! Both are pure functions over a cached snapshot and are recomputed on every
//! query change. Nothing here talks to the backend.

use crate::models::ban::{Ban, BanStatus};
use crate::models::log::AuditLog;
use crate::models::server::{Player, ServerGroup};
use crate::models::user::AdminAccount;
use crate::models::verification::{VerificationRecord, VerificationStatus};
use crate::models::whitelist::{WhitelistEntry, WhitelistStatus};

/// The string fields a search box looks at.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;

    fn matches(&self, needle: &str) -> bool {
        self.search_fields()
            .into_iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Order-preserving subsequence of `items` matching `query`; everything when
/// the query is blank.
pub fn filter<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items.iter().filter(|item| item.matches(&needle)).collect()
}

/// A record that belongs to one status tab.
pub trait Bucketed {
    fn bucket(&self) -> &'static str;
}

/// Filtered records split into fixed named tabs.
///
/// Tab names are fixed up front so an empty tab still shows with count 0.
/// Records whose status is unknown land in `other`.
#[derive(Debug)]
pub struct StatusBuckets<'a, T> {
    buckets: Vec<(&'static str, Vec<&'a T>)>,
}

impl<'a, T: Bucketed> StatusBuckets<'a, T> {
    pub fn partition(names: &[&'static str], items: Vec<&'a T>) -> Self {
        let mut buckets: Vec<(&'static str, Vec<&'a T>)> =
            names.iter().map(|name| (*name, Vec::new())).collect();

        for item in items {
            let name = item.bucket();
            match buckets.iter_mut().find(|(n, _)| *n == name) {
                Some((_, bucket)) => bucket.push(item),
                None => {
                    if let Some((_, other)) = buckets.iter_mut().find(|(n, _)| *n == "other") {
                        other.push(item);
                    } else {
                        buckets.push(("other", vec![item]));
                    }
                }
            }
        }

        Self { buckets }
    }

    pub fn get(&self, name: &str) -> &[&'a T] {
        self.buckets
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, items)| items.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, name: &str) -> usize {
        self.get(name).len()
    }

    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        self.buckets.iter().map(|(n, items)| (*n, items.len())).collect()
    }
}

pub const WHITELIST_TABS: &[&str] = &["pending", "approved", "rejected"];
pub const VERIFICATION_TABS: &[&str] = &["pending", "allowed", "denied"];
pub const BAN_TABS: &[&str] = &["active", "expired"];

fn push_opt<'a>(fields: &mut Vec<&'a str>, value: &'a Option<String>) {
    if let Some(v) = value {
        fields.push(v.as_str());
    }
}

impl Searchable for Ban {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.steam_id.as_str()];
        push_opt(&mut fields, &self.name);
        push_opt(&mut fields, &self.steam_id_64);
        push_opt(&mut fields, &self.steam_id_3);
        push_opt(&mut fields, &self.ip);
        push_opt(&mut fields, &self.reason);
        fields
    }
}

impl Bucketed for Ban {
    fn bucket(&self) -> &'static str {
        match self.status {
            BanStatus::Active => "active",
            BanStatus::Expired => "expired",
            BanStatus::Other(_) => "other",
        }
    }
}

impl Searchable for WhitelistEntry {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.steam_id.as_str()];
        push_opt(&mut fields, &self.steam_id_64);
        push_opt(&mut fields, &self.steam_id_3);
        fields
    }
}

impl Bucketed for WhitelistEntry {
    fn bucket(&self) -> &'static str {
        match self.status {
            WhitelistStatus::Pending => "pending",
            WhitelistStatus::Approved => "approved",
            WhitelistStatus::Rejected => "rejected",
            WhitelistStatus::Other(_) => "other",
        }
    }
}

impl Searchable for VerificationRecord {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.steam_id.as_str()];
        push_opt(&mut fields, &self.reason);
        fields
    }
}

impl Bucketed for VerificationRecord {
    fn bucket(&self) -> &'static str {
        match self.status {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Allowed => "allowed",
            VerificationStatus::Denied => "denied",
            VerificationStatus::Other(_) => "other",
        }
    }
}

impl Searchable for AdminAccount {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.username.as_str(), self.role.as_str()];
        push_opt(&mut fields, &self.steam_id);
        push_opt(&mut fields, &self.steam_id_64);
        push_opt(&mut fields, &self.remark);
        fields
    }
}

impl Searchable for AuditLog {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.admin_username.as_str(), self.action.as_str()];
        push_opt(&mut fields, &self.target);
        push_opt(&mut fields, &self.details);
        fields
    }
}

impl Searchable for ServerGroup {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        for server in &self.servers {
            fields.push(server.name.as_str());
            fields.push(server.ip.as_str());
        }
        fields
    }
}

impl Searchable for Player {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.steam_id.as_str()]
    }
}
