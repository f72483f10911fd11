use std::{collections::BTreeMap, sync::Arc};

use indexmap::IndexMap;

use crate::{
    modbus::{DeviceError, Transport},
    prelude::*,
    sunspec::{
        GroupCount,
        GroupDefinition,
        ModelDefinition,
        Point,
        RawValue,
        Scale,
        ScaleFactor,
    },
};

/// Scanned model instances by model id, in device order within an id.
pub type Models = BTreeMap<u16, Vec<ModelInstance>>;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("group `{group}` has an invalid count `{count}`")]
    InvalidCount { group: String, count: String },
}

/// Points and repeated sub-groups of one group instance.
#[derive(Clone, Debug, Default)]
pub struct GroupInstance {
    pub points: IndexMap<String, Point>,
    pub groups: IndexMap<String, Vec<Self>>,
}

/// A single model block on the device.
#[derive(Clone, Debug)]
pub struct ModelInstance {
    pub definition: Arc<ModelDefinition>,

    /// Register address of the model's `ID` header.
    pub address: u16,

    /// Body length in registers, as advertised by the device.
    pub length: u16,

    /// Empty until the instance is read.
    pub root: GroupInstance,
}

impl ModelInstance {
    pub fn new(definition: Arc<ModelDefinition>, address: u16, length: u16) -> Self {
        Self { definition, address, length, root: GroupInstance::default() }
    }

    #[must_use]
    pub fn id(&self) -> u16 {
        self.definition.id
    }

    /// Refresh the point values from the device.
    #[instrument(skip_all, level = "debug", fields(id = self.id(), address = self.address))]
    pub async fn read<T: Transport>(&mut self, transport: &mut T) -> Result<(), DeviceError> {
        if self.definition.is_opaque() {
            debug!("no definition, nothing to read");
            return Ok(());
        }
        let words = transport.read_range(self.address, self.length.saturating_add(2)).await?;
        self.decode(&words).map_err(|error| DeviceError::connection(error.to_string()))
    }

    /// Decode the registers, starting with the `ID` header.
    ///
    /// A block shorter than the definition leaves the trailing points absent
    /// and drops the group instances that start past its end.
    pub fn decode(&mut self, words: &[u16]) -> Result<(), DecodeError> {
        let mut cursor = Cursor { words, offset: 0 };
        self.root = decode_group(&self.definition.group, &mut cursor, &[])?;
        if cursor.is_exhausted() {
            debug!(n_registers = words.len(), "the block is shorter than the definition");
        }
        trace!(n_points = self.root.points.len(), "decoded");
        Ok(())
    }
}

struct Cursor<'a> {
    words: &'a [u16],
    offset: usize,
}

impl<'a> Cursor<'a> {
    /// Next `size` registers, `None` once the point does not fit into the block.
    fn take(&mut self, size: u16) -> Option<&'a [u16]> {
        let end = self.offset + usize::from(size);
        let words = self.words.get(self.offset..end);
        self.offset = if words.is_some() { end } else { self.words.len().max(end) };
        words
    }

    const fn is_exhausted(&self) -> bool {
        self.offset >= self.words.len()
    }
}

/// Decode a group, `scope` lists the point sets of its ancestors, innermost first.
fn decode_group(
    definition: &GroupDefinition,
    cursor: &mut Cursor<'_>,
    scope: &[&IndexMap<String, Point>],
) -> Result<GroupInstance, DecodeError> {
    let mut points = IndexMap::with_capacity(definition.points.len());
    for point_definition in &definition.points {
        let value = cursor
            .take(point_definition.size)
            .and_then(|words| RawValue::decode(point_definition.data_type, words));
        points.insert(point_definition.name.clone(), Point::new(point_definition.clone(), value));
    }

    // Scale factors may follow the points they scale, so resolve them in a second pass.
    let scales: Vec<Scale> = points
        .values()
        .map(|point| resolve_scale(point.definition.scale_factor.as_ref(), &points, scope))
        .collect();
    for (point, scale) in points.values_mut().zip(scales) {
        point.scale = scale;
    }

    let mut groups = IndexMap::with_capacity(definition.groups.len());
    let inner_scope = std::iter::once(&points).chain(scope.iter().copied()).collect::<Vec<_>>();
    for group_definition in &definition.groups {
        let count = resolve_count(group_definition, &inner_scope)?;
        let mut instances = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            if cursor.is_exhausted() {
                break;
            }
            instances.push(decode_group(group_definition, cursor, &inner_scope)?);
        }
        groups.insert(group_definition.name.clone(), instances);
    }
    drop(inner_scope);

    Ok(GroupInstance { points, groups })
}

fn lookup<'a>(
    name: &str,
    points: &'a IndexMap<String, Point>,
    scope: &[&'a IndexMap<String, Point>],
) -> Option<&'a Point> {
    std::iter::once(points).chain(scope.iter().copied()).find_map(|points| points.get(name))
}

fn resolve_scale(
    scale_factor: Option<&ScaleFactor>,
    points: &IndexMap<String, Point>,
    scope: &[&IndexMap<String, Point>],
) -> Scale {
    match scale_factor {
        None => Scale::Unscaled,
        Some(ScaleFactor::Fixed(factor)) => Scale::Factor(*factor),
        Some(ScaleFactor::Point(name)) => {
            match lookup(name, points, scope).map(|point| &point.value) {
                Some(Some(RawValue::Signed(factor))) => {
                    i16::try_from(*factor).map_or(Scale::Unavailable, Scale::Factor)
                }
                _ => Scale::Unavailable,
            }
        }
    }
}

fn resolve_count(
    definition: &GroupDefinition,
    scope: &[&IndexMap<String, Point>],
) -> Result<u16, DecodeError> {
    let invalid =
        |count: String| DecodeError::InvalidCount { group: definition.name.clone(), count };
    match &definition.count {
        None => Ok(1),
        Some(GroupCount::Fixed(count)) => Ok(*count),
        Some(GroupCount::Point(name)) => {
            let Some((points, scope)) = scope.split_first() else {
                return Err(invalid(name.clone()));
            };
            match lookup(name, points, scope).map(|point| &point.value) {
                Some(Some(RawValue::Unsigned(count))) => {
                    u16::try_from(*count).map_err(|_| invalid(count.to_string()))
                }
                // Not implemented by the device: no repetitions.
                Some(None) => Ok(0),
                _ => Err(invalid(name.clone())),
            }
        }
    }
}
