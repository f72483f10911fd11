use std::sync::Arc;

use crate::sunspec::{
    GroupDefinition,
    ModelDefinition,
    ModelInstance,
    Point,
    PointDefinition,
    PointError,
    PointKey,
    Value,
};

/// Flat keyed view over every instance of one model id.
#[must_use]
#[derive(Clone, Debug)]
pub struct ModelWrapper {
    definition: Arc<ModelDefinition>,
    instances: Vec<ModelInstance>,
}

impl ModelWrapper {
    pub const fn new(definition: Arc<ModelDefinition>, instances: Vec<ModelInstance>) -> Self {
        Self { definition, instances }
    }

    #[must_use]
    pub fn id(&self) -> u16 {
        self.definition.id
    }

    #[must_use]
    pub const fn num_models(&self) -> usize {
        self.instances.len()
    }

    /// Exposable point keys of the first instance: root points first, then the points of
    /// every first-level group instance.
    #[must_use]
    pub fn keys(&self) -> Vec<PointKey> {
        let Some(instance) = self.instances.first() else {
            return Vec::new();
        };
        let root = instance
            .root
            .points
            .iter()
            .filter(|(_, point)| point.is_exposable())
            .map(|(name, _)| PointKey::Point(name.clone()));
        let grouped = instance.root.groups.iter().flat_map(|(group, instances)| {
            instances.iter().enumerate().flat_map(move |(index, instance)| {
                instance.points.iter().filter(|(_, point)| point.is_exposable()).map(
                    move |(point, _)| PointKey::Grouped {
                        group: group.clone(),
                        index,
                        point: point.clone(),
                    },
                )
            })
        });
        root.chain(grouped).collect()
    }

    /// Raw point of the instance.
    pub fn point(&self, key: &PointKey, index: usize) -> Result<&Point, PointError> {
        let not_found = || PointError::NotFound { key: key.to_string(), index };
        let root = &self.instances.get(index).ok_or_else(not_found)?.root;
        match key {
            PointKey::Point(point) => root.points.get(point),
            PointKey::Grouped { group, index: group_index, point } => root
                .groups
                .get(group)
                .and_then(|instances| instances.get(*group_index))
                .and_then(|instance| instance.points.get(point)),
        }
        .ok_or_else(not_found)
    }

    /// Computed value of the point, `None` when the device does not provide it.
    pub fn value(&self, key: &str, index: usize) -> Result<Option<Value>, PointError> {
        let key = key
            .parse::<PointKey>()
            .map_err(|_| PointError::NotFound { key: key.to_string(), index })?;
        self.point(&key, index)?.computed()
    }

    /// Definition of the point.
    #[must_use]
    pub fn meta(&self, key: &PointKey) -> Option<&Arc<PointDefinition>> {
        match key {
            PointKey::Point(point) => self.definition.group.point(point),
            PointKey::Grouped { group, point, .. } => {
                self.definition.group.group(group).and_then(|group| group.point(point))
            }
        }
    }

    pub fn group_meta(&self) -> &GroupDefinition {
        &self.definition.group
    }
}
