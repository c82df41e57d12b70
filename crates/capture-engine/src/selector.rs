//! The set of discovered groups and the user's current choice.

use crate::discovery::DeviceGroup;

/// Holds the groups from the last discovery pass and the selected group id.
///
/// The selection is stored verbatim; an id that matches no group is only
/// detected when a session is started from it.
#[derive(Debug, Clone, Default)]
pub struct DeviceGroupSelector {
    groups: Vec<DeviceGroup>,
    selected_group_id: String,
    user_chosen: bool,
}

impl DeviceGroupSelector {
    /// Take a fresh discovery result. The first group becomes the selection
    /// (empty when nothing was discovered).
    pub fn new(groups: Vec<DeviceGroup>) -> Self {
        let selected_group_id = groups
            .first()
            .map(|g| g.group_id.clone())
            .unwrap_or_default();
        Self {
            groups,
            selected_group_id,
            user_chosen: false,
        }
    }

    /// Take a later discovery result. A selection the user made survives
    /// verbatim; otherwise the first group becomes the default again.
    pub fn refresh(&mut self, groups: Vec<DeviceGroup>) {
        if self.user_chosen {
            self.groups = groups;
        } else {
            *self = Self::new(groups);
        }
    }

    pub fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }

    pub fn selected_group_id(&self) -> &str {
        &self.selected_group_id
    }

    pub fn set_selection(&mut self, group_id: impl Into<String>) {
        self.selected_group_id = group_id.into();
        self.user_chosen = true;
        tracing::debug!(group = %self.selected_group_id, "Selection changed");
    }

    /// The group matching the selection, if any.
    pub fn selected_group(&self) -> Option<&DeviceGroup> {
        self.groups
            .iter()
            .find(|g| g.group_id == self.selected_group_id)
    }
}
