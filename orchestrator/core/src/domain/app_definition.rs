// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::protocol::fields;
use crate::domain::value::{objects, objects_mut, ConfigObject};

/// One deployable unit from the `marathon_app` resource block.
pub type AppDefinition = ConfigObject;

/// Materializes the runtime blocks (`container[*].docker[*]`) of an
/// application in declaration order. The position in the returned list is
/// the container ordinal used for entrypoint numbering.
pub fn runtime_blocks_mut(app: &mut AppDefinition) -> Vec<&mut ConfigObject> {
    let Some(containers) = app.get_mut(fields::CONTAINER) else {
        return Vec::new();
    };

    objects_mut(containers)
        .into_iter()
        .filter_map(|group| group.get_mut(fields::DOCKER))
        .flat_map(objects_mut)
        .collect()
}

/// Number of runtime blocks [`runtime_blocks_mut`] would return.
pub fn runtime_block_count(app: &AppDefinition) -> usize {
    objects(app.get(fields::CONTAINER))
        .into_iter()
        .map(|group| objects(group.get(fields::DOCKER)).len())
        .sum()
}
