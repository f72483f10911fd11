use std::{fs, path::Path, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{
    prelude::*,
    sunspec::{DefinitionError, ModelDefinition},
};

const BUNDLED: [&str; 38] = [
    include_str!("../../models/model_1.json"),
    include_str!("../../models/model_101.json"),
    include_str!("../../models/model_102.json"),
    include_str!("../../models/model_103.json"),
    include_str!("../../models/model_160.json"),
    include_str!("../../models/model_201.json"),
    include_str!("../../models/model_202.json"),
    include_str!("../../models/model_203.json"),
    include_str!("../../models/model_204.json"),
    include_str!("../../models/model_307.json"),
    include_str!("../../models/model_308.json"),
    include_str!("../../models/model_401.json"),
    include_str!("../../models/model_402.json"),
    include_str!("../../models/model_403.json"),
    include_str!("../../models/model_404.json"),
    include_str!("../../models/model_501.json"),
    include_str!("../../models/model_502.json"),
    include_str!("../../models/model_601.json"),
    include_str!("../../models/model_701.json"),
    include_str!("../../models/model_702.json"),
    include_str!("../../models/model_703.json"),
    include_str!("../../models/model_704.json"),
    include_str!("../../models/model_705.json"),
    include_str!("../../models/model_706.json"),
    include_str!("../../models/model_707.json"),
    include_str!("../../models/model_708.json"),
    include_str!("../../models/model_709.json"),
    include_str!("../../models/model_710.json"),
    include_str!("../../models/model_711.json"),
    include_str!("../../models/model_712.json"),
    include_str!("../../models/model_713.json"),
    include_str!("../../models/model_714.json"),
    include_str!("../../models/model_715.json"),
    include_str!("../../models/model_801.json"),
    include_str!("../../models/model_802.json"),
    include_str!("../../models/model_803.json"),
    include_str!("../../models/model_804.json"),
    include_str!("../../models/model_805.json"),
];

/// Model definitions by model id.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    definitions: FxHashMap<u16, Arc<ModelDefinition>>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with the definitions shipped with the crate.
    pub fn bundled() -> Result<Self, DefinitionError> {
        let mut catalog = Self::empty();
        for json in BUNDLED {
            catalog.insert_json(json)?;
        }
        Ok(catalog)
    }

    /// Insert the definition, replacing the one with the same id.
    pub fn insert(&mut self, definition: ModelDefinition) -> Result<(), DefinitionError> {
        definition.validate()?;
        let id = definition.id;
        if self.definitions.insert(id, Arc::new(definition)).is_some() {
            debug!(id, "replaced the definition");
        }
        Ok(())
    }

    pub fn insert_json(&mut self, json: &str) -> Result<u16, DefinitionError> {
        let definition: ModelDefinition = serde_json::from_str(json)?;
        let id = definition.id;
        self.insert(definition)?;
        Ok(id)
    }

    /// Load every `*.json` definition from the directory, overriding the existing ones.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_dir(&mut self, path: &Path) -> Result<usize, DefinitionError> {
        let mut n_loaded = 0;
        for entry in fs::read_dir(path)? {
            let path = entry?.path();
            if path.extension().is_none_or(|extension| extension != "json") {
                continue;
            }
            let id = self.insert_json(&fs::read_to_string(&path)?)?;
            debug!(id, file = %path.display(), "loaded");
            n_loaded += 1;
        }
        info!(n_loaded, "loaded model definitions");
        Ok(n_loaded)
    }

    #[must_use]
    pub fn get(&self, id: u16) -> Option<Arc<ModelDefinition>> {
        self.definitions.get(&id).cloned()
    }

    /// Definition of the model, or an opaque placeholder for an unknown one.
    pub fn get_or_opaque(&self, id: u16) -> Arc<ModelDefinition> {
        self.get(id).unwrap_or_else(|| Arc::new(ModelDefinition::opaque(id)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sunspec::{DataType, GroupCount, GroupDefinition, PointKind, ScaleFactor};

    #[test]
    fn bundled_ok() -> Result<(), DefinitionError> {
        let catalog = Catalog::bundled()?;
        assert_eq!(catalog.len(), 38);

        let inverter = catalog.get(103).unwrap();
        assert_eq!(inverter.group.name, "inverter");
        let power = inverter.group.point("W").unwrap();
        assert_eq!(power.data_type, DataType::Int16);
        assert_eq!(power.units.as_deref(), Some("W"));
        assert!(matches!(inverter.group.point("St").unwrap().kind, PointKind::Enum(_)));

        let mppt = catalog.get(160).unwrap();
        assert_eq!(mppt.group.group("module").unwrap().points.len(), 10);

        let measure_ac = catalog.get(701).unwrap();
        let power = measure_ac.group.point("W").unwrap();
        assert_eq!(power.label.as_deref(), Some("Active Power"));
        assert_eq!(power.scale_factor, Some(ScaleFactor::Point("W_SF".into())));
        Ok(())
    }

    /// Registers covered by the group, excluding ones repeated by a count point.
    fn fixed_length(group: &GroupDefinition) -> u16 {
        let nested: u16 = group
            .groups
            .iter()
            .map(|group| match group.count {
                None => fixed_length(group),
                Some(GroupCount::Fixed(count)) => count * fixed_length(group),
                Some(GroupCount::Point(_)) => 0,
            })
            .sum();
        group.points.iter().map(|point| point.size).sum::<u16>() + nested
    }

    #[test]
    fn bundled_lengths_ok() -> Result<(), DefinitionError> {
        let catalog = Catalog::bundled()?;
        for (id, length) in [
            (1, 66),
            (103, 50),
            (201, 105),
            (204, 105),
            (307, 11),
            (308, 4),
            (501, 31),
            (502, 28),
            (701, 153),
            (702, 50),
            (703, 17),
            (704, 65),
            (705, 13),
            (713, 7),
            (715, 7),
            (802, 62),
        ] {
            let definition = catalog.get(id).unwrap();
            assert_eq!(fixed_length(&definition.group) - 2, length, "model {id}");
        }
        Ok(())
    }

    #[test]
    fn opaque_ok() -> Result<(), DefinitionError> {
        let definition = Catalog::bundled()?.get_or_opaque(304);
        assert_eq!(definition.id, 304);
        assert!(definition.is_opaque());
        Ok(())
    }

    #[test]
    fn missing_header_fails() {
        let json = r#"{"id": 9, "group": {"name": "x", "points": [
            {"name": "L", "type": "uint16"}, {"name": "ID", "type": "uint16"}
        ]}}"#;
        assert!(matches!(
            Catalog::empty().insert_json(json),
            Err(DefinitionError::MissingHeader(9)),
        ));
    }
}
