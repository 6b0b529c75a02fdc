use std::collections::{BTreeSet, HashMap, VecDeque};
use wardencore::ac::{Role, RoleAssignment};

pub type RoleSet = BTreeSet<i64>;

/// The role forest, indexed both ways.
#[derive(Clone, Debug, Default)]
pub struct RoleGraph {
    parents: HashMap<i64, i64>,
    children: HashMap<i64, Vec<i64>>,
}

impl FromIterator<Role> for RoleGraph {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut graph = RoleGraph::default();
        for role in iter {
            if let Some(parent) = role.parent_role_id {
                graph.parents.insert(role.id, parent);
                graph.children.entry(parent)
                    .or_default()
                    .push(role.id);
            }
        }
        graph
    }
}

fn closure(
    seeds: impl IntoIterator<Item = i64>,
    next: impl Fn(i64) -> Vec<i64>,
) -> RoleSet {
    let mut visited = RoleSet::new();
    let mut queue = seeds.into_iter().collect::<VecDeque<_>>();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            log::trace!("role {id} revisited");
            continue;
        }
        queue.extend(next(id));
    }
    visited
}

impl RoleGraph {
    pub fn parent(&self, role_id: i64) -> Option<i64> {
        self.parents.get(&role_id).copied()
    }

    /// The seeds and every role reachable by following parent links.
    pub fn ancestors(&self, seeds: impl IntoIterator<Item = i64>) -> RoleSet {
        closure(seeds, |id| self.parent(id).into_iter().collect())
    }

    /// The seeds and every role reachable by following child links.
    pub fn descendants(&self, seeds: impl IntoIterator<Item = i64>) -> RoleSet {
        closure(seeds, |id| self.children.get(&id).cloned().unwrap_or_default())
    }

    /// The effective roles conferred by the current assignments.
    pub fn resolve(&self, assignments: &[RoleAssignment], as_of: i64) -> RoleSet {
        self.ancestors(assignments.iter()
            .filter(|ra| ra.is_current(as_of))
            .map(|ra| ra.role_id)
        )
    }

    /// The effective roles conferred by the current assignments other than
    /// those of `role_id`; the role itself may still be reached as the
    /// ancestor of another assigned role.
    pub fn resolve_without(
        &self,
        assignments: &[RoleAssignment],
        as_of: i64,
        role_id: i64,
    ) -> RoleSet {
        self.ancestors(assignments.iter()
            .filter(|ra| ra.is_current(as_of) && ra.role_id != role_id)
            .map(|ra| ra.role_id)
        )
    }
}
