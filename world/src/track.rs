use std::collections::VecDeque;

use branch_hop_core::{BranchId, BranchSnapshot, RejectionReason, TrackView};
use glam::Vec3;

/// Live branches in spawn order. Spawn order is z order, so the front is
/// always the branch furthest behind the player.
#[derive(Debug, Default)]
pub(crate) struct TrackWindow {
    branches: VecDeque<Branch>,
    next_id: u32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Branch {
    pub(crate) id: BranchId,
    pub(crate) position: Vec3,
    focus: Option<Vec3>,
    next: Option<BranchId>,
}

impl TrackWindow {
    pub(crate) fn len(&self) -> usize {
        self.branches.len()
    }

    pub(crate) fn get(&self, branch: BranchId) -> Option<&Branch> {
        self.index(branch)
            .and_then(|index| self.branches.get(index))
    }

    pub(crate) fn oldest(&self) -> Option<&Branch> {
        self.branches.front()
    }

    /// Appends a branch and links the previous tail to it.
    pub(crate) fn push(
        &mut self,
        position: Vec3,
        focus: Option<Vec3>,
    ) -> Result<BranchId, RejectionReason> {
        if let Some(tail) = self.branches.back() {
            if position.z <= tail.position.z {
                return Err(RejectionReason::BackwardLink);
            }
        }

        let Some(following) = self.next_id.checked_add(1) else {
            return Err(RejectionReason::IdentifiersExhausted);
        };
        let id = BranchId::new(self.next_id);
        self.next_id = following;

        if let Some(tail) = self.branches.back_mut() {
            tail.next = Some(id);
        }

        self.branches.push_back(Branch {
            id,
            position,
            focus,
            next: None,
        });
        Ok(id)
    }

    pub(crate) fn pop_oldest(&mut self, branch: BranchId) -> Result<(), RejectionReason> {
        let Some(front) = self.branches.front() else {
            return Err(RejectionReason::UnknownBranch);
        };

        if front.id != branch {
            return Err(if self.get(branch).is_some() {
                RejectionReason::NotOldestBranch
            } else {
                RejectionReason::UnknownBranch
            });
        }

        let _ = self.branches.pop_front();
        Ok(())
    }

    pub(crate) fn link(&mut self, from: BranchId, to: BranchId) -> Result<(), RejectionReason> {
        let target_z = self
            .get(to)
            .map(|branch| branch.position.z)
            .ok_or(RejectionReason::UnknownBranch)?;
        let index = self.index(from).ok_or(RejectionReason::UnknownBranch)?;
        let source = &mut self.branches[index];

        if source.next.is_some() {
            return Err(RejectionReason::AlreadyLinked);
        }
        if target_z <= source.position.z {
            return Err(RejectionReason::BackwardLink);
        }

        source.next = Some(to);
        Ok(())
    }

    /// Drops every branch. Identifiers keep counting so stale handles stay dangling-free.
    pub(crate) fn clear(&mut self) {
        self.branches.clear();
    }

    pub(crate) fn view(&self) -> TrackView {
        TrackView::from_snapshots(
            self.branches
                .iter()
                .map(|branch| BranchSnapshot {
                    id: branch.id,
                    position: branch.position,
                    focus: branch.focus,
                    next: branch.next,
                })
                .collect(),
        )
    }

    fn index(&self, branch: BranchId) -> Option<usize> {
        self.branches
            .binary_search_by_key(&branch, |candidate| candidate.id)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(z: f32) -> Vec3 {
        Vec3::new(0.0, 2.0, z)
    }

    #[test]
    fn push_links_previous_tail() {
        let mut window = TrackWindow::default();
        let first = window.push(at(4.0), None).expect("first");
        let second = window.push(at(8.0), None).expect("second");
        assert_eq!(window.get(first).and_then(|b| b.next), Some(second));
        assert_eq!(window.get(second).and_then(|b| b.next), None);
    }

    #[test]
    fn push_rejects_non_increasing_depth() {
        let mut window = TrackWindow::default();
        let _ = window.push(at(4.0), None).expect("first");
        assert_eq!(
            window.push(at(4.0), None),
            Err(RejectionReason::BackwardLink)
        );
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn only_oldest_branch_can_be_popped() {
        let mut window = TrackWindow::default();
        let first = window.push(at(4.0), None).expect("first");
        let second = window.push(at(8.0), None).expect("second");
        assert_eq!(
            window.pop_oldest(second),
            Err(RejectionReason::NotOldestBranch)
        );
        assert_eq!(window.pop_oldest(first), Ok(()));
        assert_eq!(window.oldest().map(|b| b.id), Some(second));
        assert_eq!(
            window.pop_oldest(first),
            Err(RejectionReason::UnknownBranch)
        );
    }

    #[test]
    fn exhausted_identifiers_are_never_reused() {
        let mut window = TrackWindow {
            next_id: u32::MAX - 1,
            ..TrackWindow::default()
        };
        let last = window.push(at(4.0), None).expect("last identifier");
        assert_eq!(last, BranchId::new(u32::MAX - 1));
        assert_eq!(
            window.push(at(8.0), None),
            Err(RejectionReason::IdentifiersExhausted)
        );
        assert_eq!(window.len(), 1);
        assert_eq!(window.get(last).and_then(|b| b.next), None);
    }

    #[test]
    fn identifiers_survive_clear() {
        let mut window = TrackWindow::default();
        let first = window.push(at(4.0), None).expect("first");
        window.clear();
        let second = window.push(at(4.0), None).expect("second");
        assert_ne!(first, second);
        assert!(window.get(first).is_none());
    }
}
