//! Cluster summarization: prompt rendering and ACL derivation for the
//! generated summary fragments.

use trellis_core::fragment::{Fragment, FragmentMetadata, Sensitivity};

/// Built-in prompt used when the KB config does not override it.
/// `{chunks}` is replaced with the cluster's member texts.
pub const DEFAULT_SUMMARY_PROMPT: &str = "Write a detailed summary that covers every passage \
below. Preserve concrete facts, names, and figures.\n\n{chunks}\n\nSummary:";

/// Placeholder the template must contain.
pub const CHUNKS_PLACEHOLDER: &str = "{chunks}";

/// Render the summarization prompt for one cluster.
///
/// A custom template without the placeholder gets the chunks appended so the
/// model always sees the member texts.
pub fn render_prompt(template: Option<&str>, member_texts: &[&str]) -> String {
    let joined = member_texts.join("\n\n---\n\n");
    let template = template.unwrap_or(DEFAULT_SUMMARY_PROMPT);
    if template.contains(CHUNKS_PLACEHOLDER) {
        template.replace(CHUNKS_PLACEHOLDER, &joined)
    } else {
        format!("{template}\n\n{joined}")
    }
}

/// Derive the ACL metadata of a summary from its children.
///
/// A summary's text covers every member, so it must be at least as guarded
/// as the most guarded member: if any child is restricted the summary is
/// restricted, and each grant list is the intersection over the restricted
/// children — a principal may see the summary only if every restricted
/// member would already be visible to someone holding that grant.
pub fn merge_acl(children: &[&Fragment]) -> FragmentMetadata {
    let restricted: Vec<&&Fragment> = children
        .iter()
        .filter(|f| f.metadata.sensitivity == Sensitivity::Restricted)
        .collect();

    if restricted.is_empty() {
        return FragmentMetadata::default();
    }

    FragmentMetadata {
        sensitivity: Sensitivity::Restricted,
        acl_roles: intersect_all(restricted.iter().map(|f| &f.metadata.acl_roles)),
        acl_groups: intersect_all(restricted.iter().map(|f| &f.metadata.acl_groups)),
        acl_users: intersect_all(restricted.iter().map(|f| &f.metadata.acl_users)),
        extra: Default::default(),
    }
}

fn intersect_all<'a>(mut lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let Some(first) = lists.next() else {
        return Vec::new();
    };
    let mut result: Vec<String> = first.clone();
    for list in lists {
        result.retain(|item| list.contains(item));
    }
    result
}
