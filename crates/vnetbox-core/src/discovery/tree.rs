// ── Management-group hierarchy ──
//
// Groups nest groups and subscriptions. Traversal collects subscription
// leaves depth-first in declaration order, skipping other node kinds.

use serde::{Deserialize, Serialize};

use crate::model::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[serde(alias = "Microsoft.Management/managementGroups")]
    ManagementGroup,
    #[serde(alias = "/subscriptions")]
    Subscription,
    #[serde(other)]
    Other,
}

/// One node of the hierarchy. For subscription leaves `id` is the
/// subscription id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Every subscription leaf under (and including) this node.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node.kind {
                NodeKind::Subscription => {
                    out.push(Subscription::new(&node.id, &node.display_name));
                }
                NodeKind::ManagementGroup => stack.extend(node.children.iter().rev()),
                NodeKind::Other => {}
            }
        }
        out
    }

    /// First management group matching `id` or display `name`.
    pub fn find_group(&self, id: Option<&str>, name: Option<&str>) -> Option<&HierarchyNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.kind == NodeKind::ManagementGroup {
                let id_match = id.is_some_and(|id| node.id.eq_ignore_ascii_case(id));
                let name_match = name.is_some_and(|name| node.display_name == name);
                if id_match || name_match {
                    return Some(node);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        None
    }
}
