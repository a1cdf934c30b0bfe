use crate::model::LogicalPhoto;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A duplicate group as consumed by the rule engine: the keeper plus its
/// confirmed copies.
#[derive(Debug, Clone)]
pub struct DuplicateGroup<'a> {
    pub members: Vec<&'a LogicalPhoto>,
}

/// Rebuild duplicate groups from an annotated photo list.
pub fn duplicate_groups(photos: &[LogicalPhoto]) -> Vec<DuplicateGroup<'_>> {
    let mut by_keeper: HashMap<&str, Vec<&LogicalPhoto>> = HashMap::new();
    for photo in photos {
        if let Some(keeper_id) = photo.duplicate_of.as_deref() {
            by_keeper.entry(keeper_id).or_default().push(photo);
        }
    }

    let mut groups = Vec::with_capacity(by_keeper.len());
    for photo in photos {
        if let Some(mut members) = by_keeper.remove(photo.id.as_str()) {
            members.insert(0, photo);
            groups.push(DuplicateGroup { members });
        }
    }
    groups
}

struct Rule {
    name: &'static str,
    preferred: fn(&SelectRules, &LogicalPhoto) -> bool,
}

/// Ordered, narrowing rule engine over duplicate groups.
///
/// Each rule that splits a group's surviving candidates moves the
/// non-preferred side into the deletion set and narrows to the preferred
/// side; a rule that would keep or drop everyone is skipped. At least one
/// member of every group always survives.
pub struct SelectRules {
    organized_year: Regex,
    human_date: Regex,
    camera_uploads: Regex,
    rules: Vec<Rule>,
}

impl SelectRules {
    pub fn new() -> Self {
        Self {
            // `/Camera Uploads/2019/...` — an organized year folder.
            organized_year: Regex::new(r"/Camera Uploads/\d{4}/").expect("valid pattern"),
            // Filenames like `2022-07-04 10.00.00.jpg`.
            human_date: Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid pattern"),
            // Accepts `/Dropbox/` and display-shortened `/Dropbox (Work)/`.
            camera_uploads: Regex::new(r"/Dropbox[^/]*/Camera Uploads/").expect("valid pattern"),
            rules: vec![
                Rule {
                    name: "organized-year-folder",
                    preferred: |rules, photo| rules.organized_year.is_match(&photo.path),
                },
                Rule {
                    name: "human-date-filename",
                    preferred: |rules, photo| rules.human_date.is_match(&photo.name),
                },
                Rule {
                    name: "inside-camera-uploads",
                    preferred: |rules, photo| rules.camera_uploads.is_match(&photo.path),
                },
            ],
        }
    }

    /// Photo ids recommended for deletion across all groups.
    pub fn recommend_deletions(&self, groups: &[DuplicateGroup<'_>]) -> HashSet<String> {
        let mut deletions: HashSet<String> = HashSet::new();

        for group in groups {
            let mut survivors: Vec<&LogicalPhoto> = group.members.clone();

            for rule in &self.rules {
                let (preferred, other): (Vec<&LogicalPhoto>, Vec<&LogicalPhoto>) = survivors
                    .iter()
                    .copied()
                    .partition(|photo| (rule.preferred)(self, photo));

                // No split: everyone on one side, rule does not apply.
                if preferred.is_empty() || other.is_empty() {
                    continue;
                }

                debug!(
                    "rule {} drops {} of {} candidates",
                    rule.name,
                    other.len(),
                    preferred.len() + other.len()
                );
                for photo in other {
                    deletions.insert(photo.id.clone());
                }
                survivors = preferred;
            }
        }

        deletions
    }
}

impl Default for SelectRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Count of groups whose every member is in `selection` — deleting the
/// selection would erase all copies of those photos. Used by the
/// presentation layer as a blocking warning.
pub fn fully_selected_groups(groups: &[DuplicateGroup<'_>], selection: &HashSet<String>) -> usize {
    groups
        .iter()
        .filter(|group| {
            !group.members.is_empty()
                && group.members.iter().all(|photo| selection.contains(&photo.id))
        })
        .count()
}
